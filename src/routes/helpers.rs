//! Shared plumbing for route handlers
//!
//! JSON/CORS response builders, body parsing with size caps, and the
//! bearer-token / admin guards every authenticated route goes through.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::error;

use crate::auth::{extract_token_from_header, Claims};
use crate::server::AppState;
use crate::types::AgoraError;

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// JSON bodies are small; uploads go through `read_body_limited` instead
const MAX_JSON_BODY: usize = 10240;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, PUT, DELETE, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization, X-File-Name")
        .body(full_body(json))
        .unwrap_or_else(|_| {
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(full_body(r#"{"error":"Internal error"}"#))
                .unwrap()
        })
}

/// Map a domain error to its HTTP response
///
/// 5xx details stay in the log; the index-missing case keeps its
/// remediation hint since it is an operator-facing condition.
pub fn error_response(err: &AgoraError) -> Response<BoxBody> {
    let (status, message) = match err {
        AgoraError::Validation(m) => (StatusCode::BAD_REQUEST, m.clone()),
        AgoraError::Http(m) => (StatusCode::BAD_REQUEST, m.clone()),
        AgoraError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{what} not found")),
        AgoraError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m.clone()),
        AgoraError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
        AgoraError::IndexMissing(m) => {
            error!("Index missing: {}", m);
            (StatusCode::INTERNAL_SERVER_ERROR, m.clone())
        }
        AgoraError::Database(m) | AgoraError::Storage(m) | AgoraError::Internal(m) => {
            error!("Internal error: {}", m);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    };

    json_response(status, &ErrorResponse { error: message })
}

pub fn cors_preflight() -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, PUT, DELETE, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization, X-File-Name")
        .header("Access-Control-Max-Age", "86400")
        .body(empty_body())
        .unwrap()
}

pub fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub fn empty_body() -> BoxBody {
    Full::new(Bytes::new())
        .map_err(|never| match never {})
        .boxed()
}

pub async fn parse_json_body<T: for<'de> Deserialize<'de>>(
    req: Request<Incoming>,
) -> Result<T, AgoraError> {
    let body = req
        .collect()
        .await
        .map_err(|e| AgoraError::Http(format!("Failed to read body: {}", e)))?;

    let bytes = body.to_bytes();
    if bytes.len() > MAX_JSON_BODY {
        return Err(AgoraError::Http("Request body too large".into()));
    }

    serde_json::from_slice(&bytes).map_err(|e| AgoraError::Http(format!("Invalid JSON: {}", e)))
}

/// Read a raw upload body, rejecting anything over `max_bytes`
pub async fn read_body_limited(
    req: Request<Incoming>,
    max_bytes: usize,
) -> Result<Bytes, AgoraError> {
    let body = req
        .collect()
        .await
        .map_err(|e| AgoraError::Http(format!("Failed to read body: {}", e)))?;

    let bytes = body.to_bytes();
    if bytes.len() > max_bytes {
        return Err(AgoraError::Validation(format!(
            "File too large (max {} bytes)",
            max_bytes
        )));
    }
    if bytes.is_empty() {
        return Err(AgoraError::Validation("Empty file".into()));
    }
    Ok(bytes)
}

pub fn get_auth_header(req: &Request<Incoming>) -> Option<&str> {
    req.headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

/// The uploaded file's name, from the X-File-Name header
pub fn get_file_name(req: &Request<Incoming>) -> Option<String> {
    req.headers()
        .get("x-file-name")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Validate the bearer token and return its claims
pub fn require_auth(state: &AppState, req: &Request<Incoming>) -> Result<Claims, AgoraError> {
    let header = get_auth_header(req)
        .ok_or_else(|| AgoraError::Unauthorized("Missing Authorization header".into()))?;
    let token = extract_token_from_header(header)
        .ok_or_else(|| AgoraError::Unauthorized("Expected a bearer token".into()))?;
    state.jwt.validate(token)
}

/// Like `require_auth`, but the user must also be on the admin allowlist
pub fn require_admin(state: &AppState, req: &Request<Incoming>) -> Result<Claims, AgoraError> {
    let claims = require_auth(state, req)?;
    if !state.admins.is_admin(&claims.sub) {
        return Err(AgoraError::Forbidden("Admin access required".into()));
    }
    Ok(claims)
}

/// Parse a query string into a key-value map, percent-decoding values
pub fn parse_query_params(query: &str) -> HashMap<String, String> {
    if query.is_empty() {
        return HashMap::new();
    }

    query
        .split('&')
        .filter_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let key = parts.next()?;
            let value = parts.next().unwrap_or("");
            let decoded = urlencoding::decode(value)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| value.to_string());
            Some((key.to_string(), decoded.replace('+', " ")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_params() {
        let params = parse_query_params("status=pending&limit=20");
        assert_eq!(params.get("status"), Some(&"pending".to_string()));
        assert_eq!(params.get("limit"), Some(&"20".to_string()));
    }

    #[test]
    fn test_parse_query_params_decodes() {
        let params = parse_query_params("search=summer%20research&month=May");
        assert_eq!(params.get("search"), Some(&"summer research".to_string()));
    }

    #[test]
    fn test_parse_query_params_empty() {
        assert!(parse_query_params("").is_empty());
    }

    #[test]
    fn test_error_response_status_mapping() {
        let cases = [
            (AgoraError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (AgoraError::NotFound("thing".into()), StatusCode::NOT_FOUND),
            (
                AgoraError::Unauthorized("x".into()),
                StatusCode::UNAUTHORIZED,
            ),
            (AgoraError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (
                AgoraError::Database("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(error_response(&err).status(), expected);
        }
    }
}
