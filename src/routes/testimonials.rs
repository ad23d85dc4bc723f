//! Video testimonial routes
//!
//! Reads are public; writes require an admin token. Video uploads are raw
//! request bodies with the file name in X-File-Name and the text fields in
//! the query string.
//!
//! - GET    /api/testimonials?page=&limit= - Paginated list, newest first
//! - GET    /api/testimonials/{id}
//! - POST   /api/testimonials?title=&description=&programName= - Upload
//! - PUT    /api/testimonials/{id} - Metadata update, or video replacement
//!          when X-File-Name is present
//! - DELETE /api/testimonials/{id}

use bson::doc;
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::blobs::blob_path;
use crate::db::mongo::{parse_object_id, sort_by_created_desc};
use crate::db::schemas::TestimonialDoc;
use crate::routes::helpers::{
    cors_preflight, error_response, get_file_name, json_response, parse_json_body,
    parse_query_params, read_body_limited, require_admin, BoxBody, ErrorResponse, SuccessResponse,
};
use crate::server::AppState;
use crate::types::{AgoraError, Result};

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov"];
const DEFAULT_PAGE_SIZE: usize = 10;
const MAX_PAGE_SIZE: usize = 50;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTestimonialRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub program_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestimonialResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub program_name: String,
    pub video_url: String,
    pub thumbnail_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<bson::DateTime>,
}

impl From<&TestimonialDoc> for TestimonialResponse {
    fn from(t: &TestimonialDoc) -> Self {
        Self {
            id: t.id_hex(),
            title: t.title.clone(),
            description: t.description.clone(),
            program_name: t.program_name.clone(),
            video_url: t.video_url.clone(),
            thumbnail_url: t.thumbnail_url.clone(),
            created_at: t.metadata.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestimonialPage {
    pub testimonials: Vec<TestimonialResponse>,
    pub total: usize,
    pub page: usize,
    pub total_pages: usize,
}

fn validate_video_name(file_name: &str) -> Result<()> {
    let ext = file_name.rsplit('.').next().unwrap_or("").to_lowercase();
    if !VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        return Err(AgoraError::Validation(
            "Only mp4, webm, or mov videos are allowed".into(),
        ));
    }
    Ok(())
}

async fn fetch_all_sorted(state: &AppState) -> Result<Vec<TestimonialDoc>> {
    match state
        .testimonials
        .find_sorted(doc! {}, doc! { "metadata.created_at": -1 }, None)
        .await
    {
        Ok(docs) => Ok(docs),
        Err(AgoraError::IndexMissing(hint)) => {
            warn!("Falling back to unordered testimonial fetch: {}", hint);
            let mut docs = state.testimonials.find_many(doc! {}).await?;
            sort_by_created_desc(&mut docs);
            Ok(docs)
        }
        Err(e) => Err(e),
    }
}

async fn handle_list(state: &AppState, query: Option<&str>) -> Response<BoxBody> {
    let params = parse_query_params(query.unwrap_or(""));
    let page = params
        .get("page")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(1)
        .max(1);
    let limit = params
        .get("limit")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let docs = match fetch_all_sorted(state).await {
        Ok(d) => d,
        Err(e) => return error_response(&e),
    };

    let total = docs.len();
    let total_pages = total.div_ceil(limit).max(1);
    let testimonials: Vec<TestimonialResponse> = docs
        .iter()
        .skip((page - 1) * limit)
        .take(limit)
        .map(Into::into)
        .collect();

    json_response(
        StatusCode::OK,
        &TestimonialPage {
            testimonials,
            total,
            page,
            total_pages,
        },
    )
}

async fn handle_get(state: &AppState, id: &str) -> Response<BoxBody> {
    match state.testimonials.find_by_id(id).await {
        Ok(Some(t)) => json_response(StatusCode::OK, &TestimonialResponse::from(&t)),
        Ok(None) => error_response(&AgoraError::NotFound("testimonial".into())),
        Err(e) => error_response(&e),
    }
}

async fn handle_create(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let claims = match require_admin(&state, &req) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let params = parse_query_params(req.uri().query().unwrap_or(""));
    let title = params.get("title").map(|s| s.trim().to_string()).unwrap_or_default();
    if title.is_empty() {
        return error_response(&AgoraError::Validation("title is required".into()));
    }
    let description = params.get("description").cloned().unwrap_or_default();
    let program_name = params.get("programName").cloned().unwrap_or_default();

    let file_name = match get_file_name(&req) {
        Some(n) => n,
        None => return error_response(&AgoraError::Validation("X-File-Name header required".into())),
    };
    if let Err(e) = validate_video_name(&file_name) {
        return error_response(&e);
    }

    let data = match read_body_limited(req, state.args.max_video_bytes).await {
        Ok(d) => d,
        Err(e) => return error_response(&e),
    };

    let path = blob_path("testimonials", &claims.sub, &file_name);
    let video_url = match state.blobs.put(&path, data).await {
        Ok(u) => u,
        Err(e) => return error_response(&e),
    };

    let testimonial = TestimonialDoc {
        _id: None,
        metadata: crate::db::schemas::Metadata::new(),
        title,
        description,
        program_name,
        video_url,
        file_name: path.clone(),
        thumbnail_url: String::new(),
        created_by: claims.sub.clone(),
        updated_by: None,
    };

    let id = match state.testimonials.insert_one(testimonial).await {
        Ok(id) => id.to_hex(),
        Err(e) => {
            warn!(path = %path, "Video stored but testimonial insert failed; blob orphaned");
            return error_response(&e);
        }
    };

    info!(testimonial_id = %id, admin = %claims.sub, "Testimonial created");

    match state.testimonials.find_by_id(&id).await {
        Ok(Some(t)) => json_response(StatusCode::CREATED, &TestimonialResponse::from(&t)),
        Ok(None) => error_response(&AgoraError::NotFound("testimonial".into())),
        Err(e) => error_response(&e),
    }
}

async fn handle_update(
    req: Request<Incoming>,
    state: Arc<AppState>,
    id: String,
) -> Response<BoxBody> {
    let claims = match require_admin(&state, &req) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let existing = match state.testimonials.find_by_id(&id).await {
        Ok(Some(t)) => t,
        Ok(None) => return error_response(&AgoraError::NotFound("testimonial".into())),
        Err(e) => return error_response(&e),
    };
    let oid = match parse_object_id(&id) {
        Ok(o) => o,
        Err(e) => return error_response(&e),
    };

    let mut set = doc! { "updated_by": &claims.sub };

    if let Some(file_name) = get_file_name(&req) {
        // Video replacement: metadata fields ride in the query string
        if let Err(e) = validate_video_name(&file_name) {
            return error_response(&e);
        }
        let params = parse_query_params(req.uri().query().unwrap_or(""));
        if let Some(title) = params.get("title").filter(|t| !t.trim().is_empty()) {
            set.insert("title", title.trim());
        }
        if let Some(description) = params.get("description") {
            set.insert("description", description.as_str());
        }
        if let Some(program_name) = params.get("programName") {
            set.insert("program_name", program_name.as_str());
        }

        let data = match read_body_limited(req, state.args.max_video_bytes).await {
            Ok(d) => d,
            Err(e) => return error_response(&e),
        };

        let path = blob_path("testimonials", &claims.sub, &file_name);
        let video_url = match state.blobs.put(&path, data).await {
            Ok(u) => u,
            Err(e) => return error_response(&e),
        };
        set.insert("video_url", video_url);
        set.insert("file_name", path);

        // Old video goes away best-effort
        if let Err(e) = state.blobs.delete(&existing.file_name).await {
            warn!(path = %existing.file_name, "Failed to delete replaced video: {}", e);
        }
    } else {
        let body: UpdateTestimonialRequest = match parse_json_body(req).await {
            Ok(b) => b,
            Err(e) => return error_response(&e),
        };
        if let Some(title) = body.title {
            let title = title.trim().to_string();
            if title.is_empty() {
                return error_response(&AgoraError::Validation("title cannot be empty".into()));
            }
            set.insert("title", title);
        }
        if let Some(description) = body.description {
            set.insert("description", description);
        }
        if let Some(program_name) = body.program_name {
            set.insert("program_name", program_name);
        }
    }

    if let Err(e) = state
        .testimonials
        .update_one(doc! { "_id": oid }, doc! { "$set": set })
        .await
    {
        return error_response(&e);
    }

    match state.testimonials.find_by_id(&id).await {
        Ok(Some(t)) => json_response(StatusCode::OK, &TestimonialResponse::from(&t)),
        Ok(None) => error_response(&AgoraError::NotFound("testimonial".into())),
        Err(e) => error_response(&e),
    }
}

async fn handle_delete(state: &AppState, id: &str) -> Response<BoxBody> {
    let existing = match state.testimonials.find_by_id(id).await {
        Ok(Some(t)) => t,
        Ok(None) => return error_response(&AgoraError::NotFound("testimonial".into())),
        Err(e) => return error_response(&e),
    };
    let oid = match parse_object_id(id) {
        Ok(o) => o,
        Err(e) => return error_response(&e),
    };

    match state.testimonials.delete_one(doc! { "_id": oid }).await {
        Ok(true) => {}
        Ok(false) => return error_response(&AgoraError::NotFound("testimonial".into())),
        Err(e) => return error_response(&e),
    }

    if let Err(e) = state.blobs.delete(&existing.file_name).await {
        warn!(path = %existing.file_name, "Failed to delete testimonial video: {}", e);
    }

    json_response(
        StatusCode::OK,
        &SuccessResponse {
            success: true,
            message: "Testimonial deleted".into(),
        },
    )
}

/// Handle testimonial requests under /api/testimonials
pub async fn handle_testimonials_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path();
    let method = req.method().clone();

    if !path.starts_with("/api/testimonials") {
        return None;
    }

    if method == Method::OPTIONS {
        return Some(cors_preflight());
    }

    let query = req.uri().query().map(str::to_string);
    let path = path.split('?').next().unwrap_or(path).to_string();

    let response = match (method, path.as_str()) {
        (Method::GET, "/api/testimonials") => handle_list(&state, query.as_deref()).await,
        (Method::POST, "/api/testimonials") => handle_create(req, state).await,

        (method, p) if p.starts_with("/api/testimonials/") => {
            let id = p.strip_prefix("/api/testimonials/").unwrap_or("").to_string();
            if id.is_empty() || id.contains('/') {
                json_response(
                    StatusCode::NOT_FOUND,
                    &ErrorResponse {
                        error: "Testimonial endpoint not found".into(),
                    },
                )
            } else {
                match method {
                    Method::GET => handle_get(&state, &id).await,
                    Method::PUT => handle_update(req, state, id).await,
                    Method::DELETE => match require_admin(&state, &req) {
                        Ok(_) => handle_delete(&state, &id).await,
                        Err(e) => error_response(&e),
                    },
                    _ => json_response(
                        StatusCode::METHOD_NOT_ALLOWED,
                        &ErrorResponse {
                            error: "Method not allowed".into(),
                        },
                    ),
                }
            }
        }

        (_, "/api/testimonials") => json_response(
            StatusCode::METHOD_NOT_ALLOWED,
            &ErrorResponse {
                error: "Method not allowed".into(),
            },
        ),

        _ => json_response(
            StatusCode::NOT_FOUND,
            &ErrorResponse {
                error: "Testimonial endpoint not found".into(),
            },
        ),
    };

    Some(response)
}
