//! Admin moderation routes
//!
//! All endpoints require a bearer token whose user id is on the configured
//! admin allowlist.
//!
//! - GET    /api/admin/contributions?status=&limit=&last_id= - Review queue
//! - GET    /api/admin/contributions/{id} - Single contribution
//! - PUT    /api/admin/contributions/{id}/status - Approve or reject
//! - DELETE /api/admin/contributions/{id} - Remove a contribution
//! - GET    /api/admin/dashboard-stats - Status counts and recent activity

use bson::doc;
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::mongo::{parse_object_id, sort_by_created_desc};
use crate::db::schemas::{ContributionDoc, ContributionStatus};
use crate::moderation;
use crate::routes::contributions::ContributionResponse;
use crate::routes::helpers::{
    cors_preflight, error_response, json_response, parse_json_body, parse_query_params,
    require_admin, BoxBody, ErrorResponse, SuccessResponse,
};
use crate::server::AppState;
use crate::types::AgoraError;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    pub status: String,
    #[serde(default)]
    pub application_month: Option<String>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminContributionResponse {
    #[serde(flatten)]
    pub contribution: ContributionResponse,
    pub user_id: String,
    pub user_email: String,
    pub user_display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<bson::DateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_at: Option<bson::DateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_by: Option<String>,
}

impl From<&ContributionDoc> for AdminContributionResponse {
    fn from(c: &ContributionDoc) -> Self {
        Self {
            contribution: c.into(),
            user_id: c.user_id.clone(),
            user_email: c.user_email.clone(),
            user_display_name: c.user_display_name.clone(),
            approved_at: c.approved_at,
            approved_by: c.approved_by.clone(),
            rejected_at: c.rejected_at,
            rejected_by: c.rejected_by.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionPage {
    pub contributions: Vec<AdminContributionResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_id: Option<String>,
    pub has_more: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
    pub total: u64,
    pub recent: Vec<AdminContributionResponse>,
}

/// Cursor-paginated review queue, newest first. Falls back to an unordered
/// fetch plus in-memory sort and scan when the ordered query is rejected.
async fn handle_list(state: &AppState, query: Option<&str>) -> Response<BoxBody> {
    let params = parse_query_params(query.unwrap_or(""));

    let status = match params.get("status").map(String::as_str) {
        None | Some("") | Some("all") => None,
        Some(s) => match s.parse::<ContributionStatus>() {
            Ok(parsed) => Some(parsed),
            Err(()) => {
                return error_response(&AgoraError::Validation(format!(
                    "invalid status filter '{s}'"
                )))
            }
        },
    };

    let limit = params
        .get("limit")
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let last_id = params.get("last_id").cloned().filter(|s| !s.is_empty());

    let mut filter = doc! {};
    if let Some(s) = status {
        filter.insert("status", s.to_string());
    }

    // Cursor: everything created before the last document of the prior page
    if let Some(ref last) = last_id {
        let anchor = match state.contributions.find_by_id(last).await {
            Ok(Some(doc)) => doc,
            Ok(None) => return error_response(&AgoraError::NotFound("cursor contribution".into())),
            Err(e) => return error_response(&e),
        };
        if let Some(created) = anchor.metadata.created_at {
            filter.insert("metadata.created_at", doc! { "$lt": created });
        }
    }

    // Fetch one extra row to learn whether another page exists
    let docs = match state
        .contributions
        .find_sorted(
            filter.clone(),
            doc! { "metadata.created_at": -1 },
            Some(limit + 1),
        )
        .await
    {
        Ok(docs) => docs,
        Err(AgoraError::IndexMissing(hint)) => {
            warn!("Falling back to unordered review queue fetch: {}", hint);
            match state.contributions.find_many(filter).await {
                Ok(mut docs) => {
                    sort_by_created_desc(&mut docs);
                    docs.truncate((limit + 1) as usize);
                    docs
                }
                Err(e) => return error_response(&e),
            }
        }
        Err(e) => return error_response(&e),
    };

    let has_more = docs.len() as i64 > limit;
    let page: Vec<&ContributionDoc> = docs.iter().take(limit as usize).collect();
    let last_id = page.last().map(|c| c.id_hex());

    json_response(
        StatusCode::OK,
        &ContributionPage {
            contributions: page.into_iter().map(Into::into).collect(),
            last_id,
            has_more,
        },
    )
}

async fn handle_get(state: &AppState, id: &str) -> Response<BoxBody> {
    match state.contributions.find_by_id(id).await {
        Ok(Some(c)) => json_response(StatusCode::OK, &AdminContributionResponse::from(&c)),
        Ok(None) => error_response(&AgoraError::NotFound("contribution".into())),
        Err(e) => error_response(&e),
    }
}

async fn handle_status_update(
    req: Request<Incoming>,
    state: Arc<AppState>,
    id: String,
) -> Response<BoxBody> {
    let claims = match require_admin(&state, &req) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let body: StatusUpdateRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    let contribution = match state.contributions.find_by_id(&id).await {
        Ok(Some(c)) => c,
        Ok(None) => return error_response(&AgoraError::NotFound("contribution".into())),
        Err(e) => return error_response(&e),
    };

    let oid = match parse_object_id(&id) {
        Ok(o) => o,
        Err(e) => return error_response(&e),
    };

    match body.status.as_str() {
        "approved" => {
            let month = body.application_month.as_deref().unwrap_or("");
            let approval = match moderation::approve(&contribution, &claims.sub, month) {
                Ok(a) => a,
                Err(e) => return error_response(&e),
            };

            // Publish first, then mark the contribution. A failure after the
            // insert lets a retry create a second program (at-least-once).
            let program_id = match state.programs.insert_one(approval.program).await {
                Ok(id) => id.to_hex(),
                Err(e) => return error_response(&e),
            };

            if let Err(e) = state
                .contributions
                .update_one(doc! { "_id": oid }, approval.update)
                .await
            {
                warn!(
                    contribution_id = %id,
                    program_id = %program_id,
                    "Program published but contribution not marked approved"
                );
                return error_response(&e);
            }

            info!(contribution_id = %id, program_id = %program_id, admin = %claims.sub, "Contribution approved");

            json_response(
                StatusCode::OK,
                &serde_json::json!({ "status": "approved", "programId": program_id }),
            )
        }
        "rejected" => {
            let reason = body.rejection_reason.as_deref().unwrap_or("");
            let rejection = match moderation::reject(&contribution, &claims.sub, reason) {
                Ok(r) => r,
                Err(e) => return error_response(&e),
            };

            if let Err(e) = state
                .contributions
                .update_one(doc! { "_id": oid }, rejection.update)
                .await
            {
                return error_response(&e);
            }

            info!(contribution_id = %id, admin = %claims.sub, "Contribution rejected");

            json_response(
                StatusCode::OK,
                &serde_json::json!({ "status": "rejected" }),
            )
        }
        other => error_response(&AgoraError::Validation(format!(
            "invalid status '{other}'; expected 'approved' or 'rejected'"
        ))),
    }
}

async fn handle_delete(state: &AppState, id: &str) -> Response<BoxBody> {
    let oid = match parse_object_id(id) {
        Ok(o) => o,
        Err(e) => return error_response(&e),
    };

    match state.contributions.delete_one(doc! { "_id": oid }).await {
        Ok(true) => json_response(
            StatusCode::OK,
            &SuccessResponse {
                success: true,
                message: "Contribution deleted".into(),
            },
        ),
        Ok(false) => error_response(&AgoraError::NotFound("contribution".into())),
        Err(e) => error_response(&e),
    }
}

async fn handle_dashboard_stats(state: &AppState) -> Response<BoxBody> {
    let pending = state.contributions.count(doc! { "status": "pending" }).await;
    let approved = state.contributions.count(doc! { "status": "approved" }).await;
    let rejected = state.contributions.count(doc! { "status": "rejected" }).await;

    let (pending, approved, rejected) = match (pending, approved, rejected) {
        (Ok(p), Ok(a), Ok(r)) => (p, a, r),
        (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => return error_response(&e),
    };

    let recent = match state
        .contributions
        .find_sorted(doc! {}, doc! { "metadata.created_at": -1 }, Some(5))
        .await
    {
        Ok(docs) => docs,
        Err(AgoraError::IndexMissing(hint)) => {
            warn!("Falling back to unordered recent-activity fetch: {}", hint);
            match state.contributions.find_many(doc! {}).await {
                Ok(mut docs) => {
                    sort_by_created_desc(&mut docs);
                    docs.truncate(5);
                    docs
                }
                Err(e) => return error_response(&e),
            }
        }
        Err(e) => return error_response(&e),
    };

    json_response(
        StatusCode::OK,
        &DashboardStats {
            pending,
            approved,
            rejected,
            total: pending + approved + rejected,
            recent: recent.iter().map(Into::into).collect(),
        },
    )
}

/// Handle admin requests under /api/admin
pub async fn handle_admin_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path();
    let method = req.method();

    if !path.starts_with("/api/admin") {
        return None;
    }

    if method == Method::OPTIONS {
        return Some(cors_preflight());
    }

    let query = req.uri().query().map(str::to_string);
    let path = path.split('?').next().unwrap_or(path).to_string();

    // Status update reads the body, so the admin check happens inside; all
    // other handlers check before touching the store.
    if method == Method::PUT {
        if let Some(id) = path
            .strip_prefix("/api/admin/contributions/")
            .and_then(|p| p.strip_suffix("/status"))
        {
            let id = id.to_string();
            return Some(handle_status_update(req, state, id).await);
        }
    }

    if let Err(e) = require_admin(&state, &req) {
        return Some(error_response(&e));
    }

    let response = match (method, path.as_str()) {
        (&Method::GET, "/api/admin/contributions") => {
            handle_list(&state, query.as_deref()).await
        }
        (&Method::GET, "/api/admin/dashboard-stats") => handle_dashboard_stats(&state).await,

        (&Method::GET, p) if p.starts_with("/api/admin/contributions/") => {
            let id = p.strip_prefix("/api/admin/contributions/").unwrap_or("");
            if id.is_empty() || id.contains('/') {
                json_response(
                    StatusCode::NOT_FOUND,
                    &ErrorResponse {
                        error: "Admin endpoint not found".into(),
                    },
                )
            } else {
                handle_get(&state, id).await
            }
        }

        (&Method::DELETE, p) if p.starts_with("/api/admin/contributions/") => {
            let id = p.strip_prefix("/api/admin/contributions/").unwrap_or("");
            if id.is_empty() || id.contains('/') {
                json_response(
                    StatusCode::NOT_FOUND,
                    &ErrorResponse {
                        error: "Admin endpoint not found".into(),
                    },
                )
            } else {
                handle_delete(&state, id).await
            }
        }

        (_, "/api/admin/contributions") | (_, "/api/admin/dashboard-stats") => json_response(
            StatusCode::METHOD_NOT_ALLOWED,
            &ErrorResponse {
                error: "Method not allowed".into(),
            },
        ),

        _ => json_response(
            StatusCode::NOT_FOUND,
            &ErrorResponse {
                error: "Admin endpoint not found".into(),
            },
        ),
    };

    Some(response)
}
