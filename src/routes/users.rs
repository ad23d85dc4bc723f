//! User profile routes
//!
//! - GET  /api/users/profile - Own profile (created on first read if missing)
//! - PUT  /api/users/profile - Update profile fields; email is not updatable
//! - POST /api/users/profile-image - Raw image upload

use bson::doc;
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::blobs::blob_path;
use crate::db::mongo::parse_object_id;
use crate::db::schemas::UserDoc;
use crate::routes::helpers::{
    cors_preflight, error_response, get_file_name, json_response, read_body_limited, require_auth,
    BoxBody, ErrorResponse,
};
use crate::server::AppState;
use crate::types::AgoraError;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];
const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub college: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub college: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub resume_public: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_name: Option<String>,
}

impl From<&UserDoc> for ProfileResponse {
    fn from(u: &UserDoc) -> Self {
        Self {
            id: u.id_hex(),
            email: u.email.clone(),
            full_name: u.full_name.clone(),
            college: u.college.clone(),
            phone_number: (!u.phone_number.is_empty()).then(|| u.phone_number.clone()),
            photo_url: u.photo_url.clone(),
            resume_public: u.resume_public,
            resume_url: u.resume_url.clone(),
            resume_name: u.resume_name.clone(),
        }
    }
}

/// Load the caller's user document, creating it from token claims when the
/// account record is missing
pub async fn load_or_create_user(
    state: &AppState,
    user_id: &str,
    email: &str,
    name: &str,
) -> Result<UserDoc, AgoraError> {
    if let Some(user) = state.users.find_by_id(user_id).await? {
        return Ok(user);
    }

    warn!(user_id = %user_id, "Profile missing for valid token; creating");
    let mut user = UserDoc::new(email.to_string(), String::new(), name.to_string(), String::new());
    user._id = Some(parse_object_id(user_id)?);
    state.users.insert_one(user.clone()).await?;
    Ok(user)
}

async fn handle_get_profile(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let claims = match require_auth(&state, &req) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    match load_or_create_user(&state, &claims.sub, &claims.email, &claims.name).await {
        Ok(user) => json_response(StatusCode::OK, &ProfileResponse::from(&user)),
        Err(e) => error_response(&e),
    }
}

async fn handle_update_profile(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let claims = match require_auth(&state, &req) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let body: UpdateProfileRequest = match crate::routes::helpers::parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    let mut set = doc! {};
    if let Some(name) = body.full_name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return error_response(&AgoraError::Validation("fullName cannot be empty".into()));
        }
        set.insert("full_name", name);
    }
    if let Some(college) = body.college {
        set.insert("college", college.trim());
    }
    if let Some(phone) = body.phone_number {
        set.insert("phone_number", phone.trim());
    }

    if set.is_empty() {
        return error_response(&AgoraError::Validation("No updatable fields provided".into()));
    }

    let oid = match parse_object_id(&claims.sub) {
        Ok(o) => o,
        Err(e) => return error_response(&e),
    };

    if let Err(e) = state
        .users
        .update_one(doc! { "_id": oid }, doc! { "$set": set })
        .await
    {
        return error_response(&e);
    }

    match state.users.find_by_id(&claims.sub).await {
        Ok(Some(user)) => json_response(StatusCode::OK, &ProfileResponse::from(&user)),
        Ok(None) => error_response(&AgoraError::NotFound("user".into())),
        Err(e) => error_response(&e),
    }
}

async fn handle_profile_image(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let claims = match require_auth(&state, &req) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let file_name = match get_file_name(&req) {
        Some(n) => n,
        None => return error_response(&AgoraError::Validation("X-File-Name header required".into())),
    };

    let ext = file_name.rsplit('.').next().unwrap_or("").to_lowercase();
    if !IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        return error_response(&AgoraError::Validation(
            "Only png, jpg, jpeg, gif, or webp images are allowed".into(),
        ));
    }

    let data = match read_body_limited(req, MAX_IMAGE_BYTES).await {
        Ok(d) => d,
        Err(e) => return error_response(&e),
    };

    let user = match load_or_create_user(&state, &claims.sub, &claims.email, &claims.name).await {
        Ok(u) => u,
        Err(e) => return error_response(&e),
    };

    // Blob first, then metadata. A failure between the two leaves an
    // orphaned blob; logged and accepted.
    let path = blob_path("profile-images", &claims.sub, &file_name);
    let url = match state.blobs.put(&path, data).await {
        Ok(u) => u,
        Err(e) => return error_response(&e),
    };

    if let Some(old_path) = &user.photo_path {
        if let Err(e) = state.blobs.delete(old_path).await {
            warn!(path = %old_path, "Failed to delete replaced profile image: {}", e);
        }
    }

    let oid = match parse_object_id(&claims.sub) {
        Ok(o) => o,
        Err(e) => return error_response(&e),
    };
    if let Err(e) = state
        .users
        .update_one(
            doc! { "_id": oid },
            doc! { "$set": { "photo_url": &url, "photo_path": &path } },
        )
        .await
    {
        warn!(path = %path, "Profile image stored but metadata write failed; blob orphaned");
        return error_response(&e);
    }

    json_response(
        StatusCode::OK,
        &serde_json::json!({ "photoUrl": url }),
    )
}

/// Handle user profile requests under /api/users
pub async fn handle_users_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path();
    let method = req.method();

    if !path.starts_with("/api/users") {
        return None;
    }

    if method == Method::OPTIONS {
        return Some(cors_preflight());
    }

    let path = path.split('?').next().unwrap_or(path).to_string();

    let response = match (method, path.as_str()) {
        (&Method::GET, "/api/users/profile") => handle_get_profile(req, state).await,
        (&Method::PUT, "/api/users/profile") => handle_update_profile(req, state).await,
        (&Method::POST, "/api/users/profile-image") => handle_profile_image(req, state).await,

        (_, "/api/users/profile") | (_, "/api/users/profile-image") => json_response(
            StatusCode::METHOD_NOT_ALLOWED,
            &ErrorResponse {
                error: "Method not allowed".into(),
            },
        ),

        _ => json_response(
            StatusCode::NOT_FOUND,
            &ErrorResponse {
                error: "User endpoint not found".into(),
            },
        ),
    };

    Some(response)
}
