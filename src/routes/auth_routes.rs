//! HTTP routes for authentication
//!
//! - POST /api/auth/signup - Create an account and get a token
//! - POST /api/auth/login  - Authenticate and get a token
//! - POST /api/auth/logout - Acknowledge logout (tokens are client-held)
//! - GET  /api/auth/verify - Validate the presented token

use bson::doc;
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::{hash_password, verify_password};
use crate::db::schemas::UserDoc;
use crate::routes::helpers::{
    cors_preflight, error_response, json_response, parse_json_body, require_auth, BoxBody,
    ErrorResponse, SuccessResponse,
};
use crate::server::AppState;
use crate::types::AgoraError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub college: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub user: UserSummary,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub email: String,
    pub full_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub valid: bool,
    pub user: UserSummary,
}

async fn handle_signup(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let body: SignupRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    let email = body.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return error_response(&AgoraError::Validation("A valid email is required".into()));
    }
    if body.password.len() < 6 {
        return error_response(&AgoraError::Validation(
            "Password must be at least 6 characters".into(),
        ));
    }

    match state.users.find_one(doc! { "email": &email }).await {
        Ok(Some(_)) => {
            return error_response(&AgoraError::Validation(
                "An account with this email already exists".into(),
            ));
        }
        Ok(None) => {}
        Err(e) => return error_response(&e),
    }

    let password_hash = match hash_password(&body.password) {
        Ok(h) => h,
        Err(e) => return error_response(&e),
    };

    let full_name = if body.full_name.trim().is_empty() {
        email.split('@').next().unwrap_or("User").to_string()
    } else {
        body.full_name.trim().to_string()
    };

    let user = UserDoc::new(email.clone(), password_hash, full_name.clone(), body.college);
    let user_id = match state.users.insert_one(user).await {
        Ok(id) => id.to_hex(),
        Err(e) => return error_response(&e),
    };

    let token = match state.jwt.issue(&user_id, &email, &full_name) {
        Ok(t) => t,
        Err(e) => return error_response(&e),
    };

    info!(user_id = %user_id, "New account created");

    json_response(
        StatusCode::CREATED,
        &AuthResponse {
            token,
            user: UserSummary {
                id: user_id,
                email,
                full_name,
            },
        },
    )
}

async fn handle_login(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let body: LoginRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    let email = body.email.trim().to_lowercase();
    let user = match state.users.find_one(doc! { "email": &email }).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            return json_response(
                StatusCode::UNAUTHORIZED,
                &ErrorResponse {
                    error: "Invalid email or password".into(),
                },
            );
        }
        Err(e) => return error_response(&e),
    };

    match verify_password(&body.password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => {
            warn!(email = %email, "Failed login attempt");
            return json_response(
                StatusCode::UNAUTHORIZED,
                &ErrorResponse {
                    error: "Invalid email or password".into(),
                },
            );
        }
        Err(e) => return error_response(&e),
    }

    let user_id = user.id_hex();
    if let Err(e) = state
        .users
        .update_one(
            doc! { "email": &email },
            doc! { "$set": { "last_login": bson::DateTime::now() } },
        )
        .await
    {
        warn!("Failed to record last login: {}", e);
    }

    let token = match state.jwt.issue(&user_id, &user.email, &user.full_name) {
        Ok(t) => t,
        Err(e) => return error_response(&e),
    };

    json_response(
        StatusCode::OK,
        &AuthResponse {
            token,
            user: UserSummary {
                id: user_id,
                email: user.email,
                full_name: user.full_name,
            },
        },
    )
}

fn handle_logout(req: &Request<Incoming>, state: &AppState) -> Response<BoxBody> {
    if let Err(e) = require_auth(state, req) {
        return error_response(&e);
    }

    // Tokens are held client-side; logout just acknowledges the discard
    json_response(
        StatusCode::OK,
        &SuccessResponse {
            success: true,
            message: "Logged out".into(),
        },
    )
}

fn handle_verify(req: &Request<Incoming>, state: &AppState) -> Response<BoxBody> {
    let claims = match require_auth(state, req) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    json_response(
        StatusCode::OK,
        &VerifyResponse {
            valid: true,
            user: UserSummary {
                id: claims.sub,
                email: claims.email,
                full_name: claims.name,
            },
        },
    )
}

/// Handle auth-related HTTP requests.
///
/// Returns Some(response) if the request was handled, None if it is not an
/// auth route.
pub async fn handle_auth_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path();
    let method = req.method();

    if !path.starts_with("/api/auth") {
        return None;
    }

    if method == Method::OPTIONS {
        return Some(cors_preflight());
    }

    let path = path.split('?').next().unwrap_or(path);

    let response = match (method, path) {
        (&Method::POST, "/api/auth/signup") => handle_signup(req, state).await,
        (&Method::POST, "/api/auth/login") => handle_login(req, state).await,
        (&Method::POST, "/api/auth/logout") => handle_logout(&req, &state),
        (&Method::GET, "/api/auth/verify") => handle_verify(&req, &state),

        (_, "/api/auth/signup")
        | (_, "/api/auth/login")
        | (_, "/api/auth/logout")
        | (_, "/api/auth/verify") => json_response(
            StatusCode::METHOD_NOT_ALLOWED,
            &ErrorResponse {
                error: "Method not allowed".into(),
            },
        ),

        _ => json_response(
            StatusCode::NOT_FOUND,
            &ErrorResponse {
                error: "Auth endpoint not found".into(),
            },
        ),
    };

    Some(response)
}
