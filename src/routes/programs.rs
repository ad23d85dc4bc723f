//! Public program catalog routes
//!
//! - GET /api/programs - List programs, newest first
//! - GET /api/programs/filter?search=&month= - In-memory filter
//! - GET /api/programs/{id} - Single program

use bson::doc;
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::db::mongo::sort_by_created_desc;
use crate::db::schemas::ProgramDoc;
use crate::routes::helpers::{
    cors_preflight, error_response, json_response, parse_query_params, BoxBody, ErrorResponse,
};
use crate::server::AppState;
use crate::types::{AgoraError, Result};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramResponse {
    pub id: String,
    pub name: String,
    pub application_link: String,
    pub description: String,
    pub application_month: String,
    pub logo: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<bson::DateTime>,
}

impl From<&ProgramDoc> for ProgramResponse {
    fn from(p: &ProgramDoc) -> Self {
        Self {
            id: p.id_hex(),
            name: p.name.clone(),
            application_link: p.application_link.clone(),
            description: p.description.clone(),
            application_month: p.application_month.clone(),
            logo: p.logo.clone(),
            created_at: p.metadata.created_at,
        }
    }
}

/// Fetch all programs newest first, degrading to an unordered fetch plus
/// in-memory sort when the ordered query is rejected
async fn fetch_programs(state: &AppState) -> Result<Vec<ProgramDoc>> {
    match state
        .programs
        .find_sorted(doc! {}, doc! { "metadata.created_at": -1 }, None)
        .await
    {
        Ok(docs) => Ok(docs),
        Err(AgoraError::IndexMissing(hint)) => {
            warn!("Falling back to unordered program fetch: {}", hint);
            let mut docs = state.programs.find_many(doc! {}).await?;
            sort_by_created_desc(&mut docs);
            Ok(docs)
        }
        Err(e) => Err(e),
    }
}

async fn handle_list(state: &AppState) -> Response<BoxBody> {
    match fetch_programs(state).await {
        Ok(docs) => {
            let programs: Vec<ProgramResponse> = docs.iter().map(Into::into).collect();
            json_response(StatusCode::OK, &programs)
        }
        Err(e) => error_response(&e),
    }
}

async fn handle_filter(state: &AppState, query: Option<&str>) -> Response<BoxBody> {
    let params = parse_query_params(query.unwrap_or(""));
    let search = params.get("search").map(|s| s.to_lowercase());
    let month = params.get("month").map(|s| s.to_lowercase());

    let docs = match fetch_programs(state).await {
        Ok(d) => d,
        Err(e) => return error_response(&e),
    };

    let programs: Vec<ProgramResponse> = docs
        .iter()
        .filter(|p| {
            let search_ok = search.as_deref().map_or(true, |s| {
                p.name.to_lowercase().contains(s) || p.description.to_lowercase().contains(s)
            });
            let month_ok = month
                .as_deref()
                .map_or(true, |m| p.application_month.to_lowercase() == m);
            search_ok && month_ok
        })
        .map(Into::into)
        .collect();

    json_response(StatusCode::OK, &programs)
}

async fn handle_get(state: &AppState, id: &str) -> Response<BoxBody> {
    match state.programs.find_by_id(id).await {
        Ok(Some(program)) => json_response(StatusCode::OK, &ProgramResponse::from(&program)),
        Ok(None) => error_response(&AgoraError::NotFound("program".into())),
        Err(e) => error_response(&e),
    }
}

/// Handle program catalog requests under /api/programs
pub async fn handle_programs_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path();
    let method = req.method();

    if !path.starts_with("/api/programs") {
        return None;
    }

    if method == Method::OPTIONS {
        return Some(cors_preflight());
    }

    let query = req.uri().query();
    let path = path.split('?').next().unwrap_or(path);

    let response = match (method, path) {
        (&Method::GET, "/api/programs") => handle_list(&state).await,
        (&Method::GET, "/api/programs/filter") => handle_filter(&state, query).await,
        (&Method::GET, p) => {
            let id = p.strip_prefix("/api/programs/").unwrap_or("");
            if id.is_empty() || id.contains('/') {
                json_response(
                    StatusCode::NOT_FOUND,
                    &ErrorResponse {
                        error: "Program endpoint not found".into(),
                    },
                )
            } else {
                handle_get(&state, id).await
            }
        }
        _ => json_response(
            StatusCode::METHOD_NOT_ALLOWED,
            &ErrorResponse {
                error: "Method not allowed".into(),
            },
        ),
    };

    Some(response)
}
