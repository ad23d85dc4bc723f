//! Program contribution routes
//!
//! - POST /api/contributions - Submit a program for review (pending)
//! - GET  /api/contributions/mine - The caller's submissions, newest first

use bson::doc;
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::mongo::sort_by_created_desc;
use crate::db::schemas::{ContributionDoc, ContributionStatus};
use crate::routes::helpers::{
    cors_preflight, error_response, json_response, parse_json_body, require_auth, BoxBody,
    ErrorResponse,
};
use crate::server::AppState;
use crate::types::AgoraError;

#[derive(Debug, Deserialize)]
pub struct SubmitContributionRequest {
    pub name: String,
    pub website: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionResponse {
    pub id: String,
    pub name: String,
    pub website: String,
    pub description: String,
    pub status: ContributionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<bson::DateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_month: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

impl From<&ContributionDoc> for ContributionResponse {
    fn from(c: &ContributionDoc) -> Self {
        Self {
            id: c.id_hex(),
            name: c.name.clone(),
            website: c.website.clone(),
            description: c.description.clone(),
            status: c.status,
            created_at: c.metadata.created_at,
            application_month: c.application_month.clone(),
            rejection_reason: c.rejection_reason.clone(),
        }
    }
}

async fn handle_submit(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let claims = match require_auth(&state, &req) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let body: SubmitContributionRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    let name = body.name.trim().to_string();
    let website = body.website.trim().to_string();
    if name.is_empty() || website.is_empty() {
        return error_response(&AgoraError::Validation(
            "name and website are required".into(),
        ));
    }

    let contribution = ContributionDoc::new(
        name,
        website,
        body.description.trim().to_string(),
        claims.sub.clone(),
        claims.email.clone(),
        claims.name.clone(),
    );

    let id = match state.contributions.insert_one(contribution).await {
        Ok(id) => id.to_hex(),
        Err(e) => return error_response(&e),
    };

    info!(contribution_id = %id, user_id = %claims.sub, "Contribution submitted");

    match state.contributions.find_by_id(&id).await {
        Ok(Some(c)) => json_response(StatusCode::CREATED, &ContributionResponse::from(&c)),
        Ok(None) => error_response(&AgoraError::NotFound("contribution".into())),
        Err(e) => error_response(&e),
    }
}

async fn handle_mine(req: &Request<Incoming>, state: &AppState) -> Response<BoxBody> {
    let claims = match require_auth(state, req) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let filter = doc! { "user_id": &claims.sub };
    let docs = match state
        .contributions
        .find_sorted(filter.clone(), doc! { "metadata.created_at": -1 }, None)
        .await
    {
        Ok(docs) => docs,
        Err(AgoraError::IndexMissing(hint)) => {
            warn!("Falling back to unordered contribution fetch: {}", hint);
            match state.contributions.find_many(filter).await {
                Ok(mut docs) => {
                    sort_by_created_desc(&mut docs);
                    docs
                }
                Err(e) => return error_response(&e),
            }
        }
        Err(e) => return error_response(&e),
    };

    let contributions: Vec<ContributionResponse> = docs.iter().map(Into::into).collect();
    json_response(StatusCode::OK, &contributions)
}

/// Handle contribution requests under /api/contributions
pub async fn handle_contributions_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path();
    let method = req.method();

    if !path.starts_with("/api/contributions") {
        return None;
    }

    if method == Method::OPTIONS {
        return Some(cors_preflight());
    }

    let path = path.split('?').next().unwrap_or(path).to_string();

    let response = match (method, path.as_str()) {
        (&Method::POST, "/api/contributions") => handle_submit(req, state).await,
        (&Method::GET, "/api/contributions/mine") => handle_mine(&req, &state).await,

        (_, "/api/contributions") | (_, "/api/contributions/mine") => json_response(
            StatusCode::METHOD_NOT_ALLOWED,
            &ErrorResponse {
                error: "Method not allowed".into(),
            },
        ),

        _ => json_response(
            StatusCode::NOT_FOUND,
            &ErrorResponse {
                error: "Contribution endpoint not found".into(),
            },
        ),
    };

    Some(response)
}
