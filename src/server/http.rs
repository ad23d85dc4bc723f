//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling. Routing is a prefix
//! dispatch: each route module claims its URL subtree and returns None for
//! everything else.

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::{AdminRoster, JwtValidator};
use crate::blobs::BlobStore;
use crate::config::Args;
use crate::db::mongo::{MongoClient, MongoCollection};
use crate::db::schemas::{
    ContributionDoc, FeedbackDoc, ProgramDoc, TestimonialDoc, UserDoc, CONTRIBUTION_COLLECTION,
    FEEDBACK_COLLECTION, PROGRAM_COLLECTION, TESTIMONIAL_COLLECTION, USER_COLLECTION,
};
use crate::routes;
use crate::routes::helpers::{cors_preflight, json_response, BoxBody, ErrorResponse};
use crate::types::AgoraError;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub mongo: MongoClient,
    pub users: MongoCollection<UserDoc>,
    pub feedback: MongoCollection<FeedbackDoc>,
    pub contributions: MongoCollection<ContributionDoc>,
    pub programs: MongoCollection<ProgramDoc>,
    pub testimonials: MongoCollection<TestimonialDoc>,
    pub blobs: Arc<dyn BlobStore>,
    pub jwt: JwtValidator,
    pub admins: AdminRoster,
    pub started_at: Instant,
}

impl AppState {
    /// Create AppState, opening every collection (which applies its indexes)
    pub async fn new(
        args: Args,
        mongo: MongoClient,
        blobs: Arc<dyn BlobStore>,
    ) -> Result<Self, AgoraError> {
        let users = mongo.collection::<UserDoc>(USER_COLLECTION).await?;
        let feedback = mongo.collection::<FeedbackDoc>(FEEDBACK_COLLECTION).await?;
        let contributions = mongo
            .collection::<ContributionDoc>(CONTRIBUTION_COLLECTION)
            .await?;
        let programs = mongo.collection::<ProgramDoc>(PROGRAM_COLLECTION).await?;
        let testimonials = mongo
            .collection::<TestimonialDoc>(TESTIMONIAL_COLLECTION)
            .await?;

        let jwt = JwtValidator::new(&args.jwt_secret(), args.jwt_expiry_seconds as i64);
        let admins = AdminRoster::new(args.admin_ids());

        Ok(Self {
            args,
            mongo,
            users,
            feedback,
            contributions,
            programs,
            testimonials,
            blobs,
            jwt,
            admins,
            started_at: Instant::now(),
        })
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<(), AgoraError> {
    let listener = TcpListener::bind(state.args.listen)
        .await
        .map_err(|e| AgoraError::Internal(format!("Failed to bind {}: {}", state.args.listen, e)))?;

    info!("Agora listening on {}", state.args.listen);

    if state.args.dev_mode {
        warn!("Development mode enabled - using the built-in JWT secret");
    }
    if state.admins.is_empty() {
        warn!("Admin allowlist is empty - no user can access /api/admin");
    } else {
        info!("Admin allowlist has {} user(s)", state.admins.len());
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .title_case_headers(true)
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    // Probes outside the /api prefix
    match (&method, path.as_str()) {
        (&Method::GET, "/health") | (&Method::GET, "/healthz") => {
            return Ok(routes::health_check(state));
        }
        (&Method::GET, "/version") => {
            return Ok(routes::version_info());
        }
        _ => {}
    }

    // Route modules consume the request; each claims its own prefix
    let response = if path.starts_with("/api/auth") {
        routes::handle_auth_request(req, state).await
    } else if path.starts_with("/api/programs") {
        routes::handle_programs_request(req, state).await
    } else if path.starts_with("/api/users") {
        routes::handle_users_request(req, state).await
    } else if path.starts_with("/api/contributions") {
        routes::handle_contributions_request(req, state).await
    } else if path.starts_with("/api/admin") {
        routes::handle_admin_request(req, state).await
    } else if path.starts_with("/api/testimonials") {
        routes::handle_testimonials_request(req, state).await
    } else if path.starts_with("/api/resume") {
        routes::handle_resume_request(req, state).await
    } else if path.starts_with(state.args.blob_base_url.trim_end_matches('/')) {
        routes::handle_files_request(req, state).await
    } else if method == Method::OPTIONS {
        Some(cors_preflight())
    } else {
        None
    };

    Ok(response.unwrap_or_else(|| not_found(&path)))
}

fn not_found(path: &str) -> Response<BoxBody> {
    json_response(
        StatusCode::NOT_FOUND,
        &ErrorResponse {
            error: format!("Not found: {}", path),
        },
    )
}
