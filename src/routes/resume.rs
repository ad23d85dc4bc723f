//! Resume and resume-feedback routes
//!
//! Resume management:
//! - POST   /api/resume - Upload (pdf/doc/docx, size-capped raw body)
//! - GET    /api/resume - Own resume info
//! - DELETE /api/resume - Remove resume
//! - PUT    /api/resume/visibility - Toggle public visibility
//! - GET    /api/resume/public - All publicly shared resumes
//! - GET    /api/resume/user/{id} - Someone's resume (public or self only)
//!
//! Feedback threads:
//! - POST   /api/resume/feedback/{user_id} - Comment or reply
//! - GET    /api/resume/feedback/{user_id} - Assembled thread
//! - DELETE /api/resume/feedback/{id}?cascade=true|false
//! - POST   /api/resume/feedback/{id}/upvote
//! - POST   /api/resume/feedback/{id}/downvote

use async_trait::async_trait;
use bson::doc;
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::blobs::blob_path;
use crate::db::mongo::{parse_object_id, sort_by_created_desc, MongoCollection};
use crate::db::schemas::{FeedbackDoc, UserDoc};
use crate::feedback::{apply_vote, build_tree, delete_feedback, DeleteMode, ReplyStore, VoteDirection};
use crate::routes::helpers::{
    cors_preflight, error_response, get_file_name, json_response, parse_json_body,
    parse_query_params, read_body_limited, require_auth, BoxBody, ErrorResponse, SuccessResponse,
};
use crate::routes::users::load_or_create_user;
use crate::server::AppState;
use crate::types::{AgoraError, Result};

const RESUME_EXTENSIONS: &[&str] = &["pdf", "doc", "docx"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityRequest {
    pub public: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub content: String,
    #[serde(default)]
    pub parent_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeResponse {
    pub resume_url: String,
    pub resume_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_updated_at: Option<bson::DateTime>,
    pub resume_public: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicResumeEntry {
    pub user_id: String,
    pub full_name: String,
    pub college: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub resume_url: String,
    pub resume_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_updated_at: Option<bson::DateTime>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    pub votes: i64,
    pub active: bool,
}

fn resume_response(user: &UserDoc) -> Option<ResumeResponse> {
    match (&user.resume_url, &user.resume_name) {
        (Some(url), Some(name)) => Some(ResumeResponse {
            resume_url: url.clone(),
            resume_name: name.clone(),
            resume_updated_at: user.resume_updated_at,
            resume_public: user.resume_public,
        }),
        _ => None,
    }
}

// ============================================================================
// Resume management
// ============================================================================

async fn handle_upload(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let claims = match require_auth(&state, &req) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let file_name = match get_file_name(&req) {
        Some(n) => n,
        None => return error_response(&AgoraError::Validation("X-File-Name header required".into())),
    };

    let ext = file_name.rsplit('.').next().unwrap_or("").to_lowercase();
    if !RESUME_EXTENSIONS.contains(&ext.as_str()) {
        return error_response(&AgoraError::Validation(
            "Only pdf, doc, or docx files are allowed".into(),
        ));
    }

    let data = match read_body_limited(req, state.args.max_resume_bytes).await {
        Ok(d) => d,
        Err(e) => return error_response(&e),
    };

    let user = match load_or_create_user(&state, &claims.sub, &claims.email, &claims.name).await {
        Ok(u) => u,
        Err(e) => return error_response(&e),
    };

    let path = blob_path("resumes", &claims.sub, &file_name);
    let url = match state.blobs.put(&path, data).await {
        Ok(u) => u,
        Err(e) => return error_response(&e),
    };

    // Replaced file goes away best-effort
    if let Some(old_path) = &user.resume_path {
        if let Err(e) = state.blobs.delete(old_path).await {
            warn!(path = %old_path, "Failed to delete replaced resume: {}", e);
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
            doc! { "$set": {
                "resume_url": &url,
                "resume_path": &path,
                "resume_name": &file_name,
                "resume_updated_at": bson::DateTime::now(),
            }},
        )
        .await
    {
        warn!(path = %path, "Resume stored but metadata write failed; blob orphaned");
        return error_response(&e);
    }

    info!(user_id = %claims.sub, "Resume uploaded");

    json_response(
        StatusCode::OK,
        &ResumeResponse {
            resume_url: url,
            resume_name: file_name,
            resume_updated_at: Some(bson::DateTime::now()),
            resume_public: user.resume_public,
        },
    )
}

async fn handle_get_own(req: &Request<Incoming>, state: &AppState) -> Response<BoxBody> {
    let claims = match require_auth(state, req) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let user = match load_or_create_user(state, &claims.sub, &claims.email, &claims.name).await {
        Ok(u) => u,
        Err(e) => return error_response(&e),
    };

    match resume_response(&user) {
        Some(r) => json_response(StatusCode::OK, &r),
        None => error_response(&AgoraError::NotFound("resume".into())),
    }
}

async fn handle_delete_own(req: &Request<Incoming>, state: &AppState) -> Response<BoxBody> {
    let claims = match require_auth(state, req) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let user = match state.users.find_by_id(&claims.sub).await {
        Ok(Some(u)) => u,
        Ok(None) => return error_response(&AgoraError::NotFound("user".into())),
        Err(e) => return error_response(&e),
    };

    let path = match user.resume_path {
        Some(p) => p,
        None => return error_response(&AgoraError::NotFound("resume".into())),
    };

    if let Err(e) = state.blobs.delete(&path).await {
        warn!(path = %path, "Failed to delete resume blob: {}", e);
    }

    let oid = match parse_object_id(&claims.sub) {
        Ok(o) => o,
        Err(e) => return error_response(&e),
    };
    if let Err(e) = state
        .users
        .update_one(
            doc! { "_id": oid },
            doc! {
                "$unset": {
                    "resume_url": "",
                    "resume_path": "",
                    "resume_name": "",
                    "resume_updated_at": "",
                },
                "$set": { "resume_public": false },
            },
        )
        .await
    {
        return error_response(&e);
    }

    json_response(
        StatusCode::OK,
        &SuccessResponse {
            success: true,
            message: "Resume deleted".into(),
        },
    )
}

async fn handle_visibility(req: Request<Incoming>, state: Arc<AppState>) -> Response<BoxBody> {
    let claims = match require_auth(&state, &req) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let body: VisibilityRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    let user = match state.users.find_by_id(&claims.sub).await {
        Ok(Some(u)) => u,
        Ok(None) => return error_response(&AgoraError::NotFound("user".into())),
        Err(e) => return error_response(&e),
    };
    if user.resume_url.is_none() {
        return error_response(&AgoraError::Validation(
            "Upload a resume before changing its visibility".into(),
        ));
    }

    let oid = match parse_object_id(&claims.sub) {
        Ok(o) => o,
        Err(e) => return error_response(&e),
    };
    if let Err(e) = state
        .users
        .update_one(
            doc! { "_id": oid },
            doc! { "$set": { "resume_public": body.public } },
        )
        .await
    {
        return error_response(&e);
    }

    json_response(
        StatusCode::OK,
        &serde_json::json!({ "resumePublic": body.public }),
    )
}

async fn handle_public_list(req: &Request<Incoming>, state: &AppState) -> Response<BoxBody> {
    if let Err(e) = require_auth(state, req) {
        return error_response(&e);
    }

    let users = match state
        .users
        .find_many(doc! { "resume_public": true, "resume_url": { "$ne": null } })
        .await
    {
        Ok(u) => u,
        Err(e) => return error_response(&e),
    };

    let entries: Vec<PublicResumeEntry> = users
        .iter()
        .filter_map(|u| {
            let url = u.resume_url.clone()?;
            Some(PublicResumeEntry {
                user_id: u.id_hex(),
                full_name: u.full_name.clone(),
                college: u.college.clone(),
                photo_url: u.photo_url.clone(),
                resume_url: url,
                resume_name: u.resume_name.clone().unwrap_or_default(),
                resume_updated_at: u.resume_updated_at,
            })
        })
        .collect();

    json_response(StatusCode::OK, &entries)
}

async fn handle_get_user_resume(
    req: &Request<Incoming>,
    state: &AppState,
    user_id: &str,
) -> Response<BoxBody> {
    let claims = match require_auth(state, req) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let user = match state.users.find_by_id(user_id).await {
        Ok(Some(u)) => u,
        Ok(None) => return error_response(&AgoraError::NotFound("user".into())),
        Err(e) => return error_response(&e),
    };

    if !user.resume_public && claims.sub != user_id {
        return error_response(&AgoraError::Forbidden(
            "This resume is not shared publicly".into(),
        ));
    }

    match resume_response(&user) {
        Some(r) => json_response(StatusCode::OK, &r),
        None => error_response(&AgoraError::NotFound("resume".into())),
    }
}

// ============================================================================
// Feedback threads
// ============================================================================

/// ReplyStore over the feedback collection, for the delete engine
struct FeedbackReplyStore<'a> {
    collection: &'a MongoCollection<FeedbackDoc>,
}

#[async_trait]
impl ReplyStore for FeedbackReplyStore<'_> {
    async fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.collection.find_by_id(id).await?.is_some())
    }

    async fn reply_ids(&self, parent_id: &str) -> Result<Vec<String>> {
        let replies = self
            .collection
            .find_many(doc! { "parent_id": parent_id })
            .await?;
        Ok(replies.iter().map(|r| r.id_hex()).collect())
    }

    async fn delete_ids(&self, ids: &[String]) -> Result<u64> {
        let oids = ids
            .iter()
            .map(|id| parse_object_id(id))
            .collect::<Result<Vec<_>>>()?;
        self.collection
            .delete_many(doc! { "_id": { "$in": oids } })
            .await
    }

    async fn clear_parent(&self, ids: &[String]) -> Result<()> {
        let oids = ids
            .iter()
            .map(|id| parse_object_id(id))
            .collect::<Result<Vec<_>>>()?;
        self.collection
            .update_many(
                doc! { "_id": { "$in": oids } },
                doc! { "$unset": { "parent_id": "" } },
            )
            .await?;
        Ok(())
    }
}

async fn handle_post_feedback(
    req: Request<Incoming>,
    state: Arc<AppState>,
    owner_id: String,
) -> Response<BoxBody> {
    let claims = match require_auth(&state, &req) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let body: FeedbackRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(&e),
    };

    let content = body.content.trim().to_string();
    if content.is_empty() {
        return error_response(&AgoraError::Validation("content is required".into()));
    }

    let owner = match state.users.find_by_id(&owner_id).await {
        Ok(Some(u)) => u,
        Ok(None) => return error_response(&AgoraError::NotFound("user".into())),
        Err(e) => return error_response(&e),
    };
    if owner.resume_url.is_none() {
        return error_response(&AgoraError::Validation(
            "This user has no resume to review".into(),
        ));
    }

    // Replies must point at a real entry in the same thread
    if let Some(parent_id) = &body.parent_id {
        match state.feedback.find_by_id(parent_id).await {
            Ok(Some(parent)) if parent.resume_owner_id == owner_id => {}
            Ok(Some(_)) => {
                return error_response(&AgoraError::Validation(
                    "parentId belongs to a different thread".into(),
                ))
            }
            Ok(None) => return error_response(&AgoraError::NotFound("parent feedback".into())),
            Err(e) => return error_response(&e),
        }
    }

    let reviewer_photo = match state.users.find_by_id(&claims.sub).await {
        Ok(Some(u)) => u.photo_url,
        _ => None,
    };

    let feedback = FeedbackDoc::new(
        owner_id,
        claims.sub.clone(),
        claims.name.clone(),
        reviewer_photo,
        content,
        body.parent_id,
    );

    let id = match state.feedback.insert_one(feedback).await {
        Ok(id) => id.to_hex(),
        Err(e) => return error_response(&e),
    };

    match state.feedback.find_by_id(&id).await {
        Ok(Some(doc)) => {
            let tree = build_tree(std::slice::from_ref(&doc), Some(&claims.sub));
            json_response(StatusCode::CREATED, &tree[0])
        }
        Ok(None) => error_response(&AgoraError::NotFound("feedback".into())),
        Err(e) => error_response(&e),
    }
}

async fn handle_get_thread(
    req: &Request<Incoming>,
    state: &AppState,
    owner_id: &str,
) -> Response<BoxBody> {
    let claims = match require_auth(state, req) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let filter = doc! { "resume_owner_id": owner_id };
    let docs = match state
        .feedback
        .find_sorted(filter.clone(), doc! { "metadata.created_at": -1 }, None)
        .await
    {
        Ok(docs) => docs,
        Err(AgoraError::IndexMissing(hint)) => {
            warn!("Falling back to unordered feedback fetch: {}", hint);
            match state.feedback.find_many(filter).await {
                Ok(mut docs) => {
                    sort_by_created_desc(&mut docs);
                    docs
                }
                Err(e) => return error_response(&e),
            }
        }
        Err(e) => return error_response(&e),
    };

    let tree = build_tree(&docs, Some(&claims.sub));
    json_response(StatusCode::OK, &tree)
}

async fn handle_delete_feedback(
    req: &Request<Incoming>,
    state: &AppState,
    id: &str,
    query: Option<&str>,
) -> Response<BoxBody> {
    let claims = match require_auth(state, req) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let target = match state.feedback.find_by_id(id).await {
        Ok(Some(f)) => f,
        Ok(None) => return error_response(&AgoraError::NotFound("feedback".into())),
        Err(e) => return error_response(&e),
    };

    // Only the author or the reviewed resume's owner may delete
    if claims.sub != target.reviewer_id && claims.sub != target.resume_owner_id {
        return error_response(&AgoraError::Forbidden(
            "Only the author or the resume owner can delete feedback".into(),
        ));
    }

    let params = parse_query_params(query.unwrap_or(""));
    let mode = match params.get("cascade").map(String::as_str) {
        Some("true") => DeleteMode::Cascade,
        _ => DeleteMode::Orphan,
    };

    let store = FeedbackReplyStore {
        collection: &state.feedback,
    };
    match delete_feedback(&store, id, mode).await {
        Ok(deleted) => {
            info!(feedback_id = %id, deleted, ?mode, "Feedback deleted");
            json_response(
                StatusCode::OK,
                &serde_json::json!({ "deleted": deleted }),
            )
        }
        Err(e) => error_response(&e),
    }
}

async fn handle_vote(
    req: &Request<Incoming>,
    state: &AppState,
    id: &str,
    direction: VoteDirection,
) -> Response<BoxBody> {
    let claims = match require_auth(state, req) {
        Ok(c) => c,
        Err(e) => return error_response(&e),
    };

    let target = match state.feedback.find_by_id(id).await {
        Ok(Some(f)) => f,
        Ok(None) => return error_response(&AgoraError::NotFound("feedback".into())),
        Err(e) => return error_response(&e),
    };

    // Read-modify-write; concurrent votes are last-write-wins
    let outcome = apply_vote(target.upvoted_by, target.downvoted_by, &claims.sub, direction);

    let oid = match parse_object_id(id) {
        Ok(o) => o,
        Err(e) => return error_response(&e),
    };
    if let Err(e) = state
        .feedback
        .update_one(
            doc! { "_id": oid },
            doc! { "$set": {
                "votes": outcome.votes,
                "upvoted_by": outcome.upvoted_by.clone(),
                "downvoted_by": outcome.downvoted_by.clone(),
            }},
        )
        .await
    {
        return error_response(&e);
    }

    json_response(
        StatusCode::OK,
        &VoteResponse {
            votes: outcome.votes,
            active: outcome.active,
        },
    )
}

// ============================================================================
// Dispatch
// ============================================================================

/// Handle resume and feedback requests under /api/resume
pub async fn handle_resume_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let path = req.uri().path();
    let method = req.method().clone();

    if !path.starts_with("/api/resume") {
        return None;
    }

    if method == Method::OPTIONS {
        return Some(cors_preflight());
    }

    let query = req.uri().query().map(str::to_string);
    let path = path.split('?').next().unwrap_or(path).to_string();

    // Feedback subtree first; the rest is resume management
    if let Some(rest) = path.strip_prefix("/api/resume/feedback/") {
        let rest = rest.to_string();
        let response = if let Some(id) = rest.strip_suffix("/upvote") {
            if method == Method::POST {
                handle_vote(&req, &state, id, VoteDirection::Up).await
            } else {
                method_not_allowed()
            }
        } else if let Some(id) = rest.strip_suffix("/downvote") {
            if method == Method::POST {
                handle_vote(&req, &state, id, VoteDirection::Down).await
            } else {
                method_not_allowed()
            }
        } else if rest.is_empty() || rest.contains('/') {
            json_response(
                StatusCode::NOT_FOUND,
                &ErrorResponse {
                    error: "Feedback endpoint not found".into(),
                },
            )
        } else {
            match method {
                Method::POST => handle_post_feedback(req, state, rest).await,
                Method::GET => handle_get_thread(&req, &state, &rest).await,
                Method::DELETE => {
                    handle_delete_feedback(&req, &state, &rest, query.as_deref()).await
                }
                _ => method_not_allowed(),
            }
        };
        return Some(response);
    }

    let response = match (method, path.as_str()) {
        (Method::POST, "/api/resume") => handle_upload(req, state).await,
        (Method::GET, "/api/resume") => handle_get_own(&req, &state).await,
        (Method::DELETE, "/api/resume") => handle_delete_own(&req, &state).await,
        (Method::PUT, "/api/resume/visibility") => handle_visibility(req, state).await,
        (Method::GET, "/api/resume/public") => handle_public_list(&req, &state).await,

        (Method::GET, p) if p.starts_with("/api/resume/user/") => {
            let id = p.strip_prefix("/api/resume/user/").unwrap_or("");
            if id.is_empty() || id.contains('/') {
                json_response(
                    StatusCode::NOT_FOUND,
                    &ErrorResponse {
                        error: "Resume endpoint not found".into(),
                    },
                )
            } else {
                handle_get_user_resume(&req, &state, id).await
            }
        }

        (_, "/api/resume") | (_, "/api/resume/visibility") | (_, "/api/resume/public") => {
            method_not_allowed()
        }

        _ => json_response(
            StatusCode::NOT_FOUND,
            &ErrorResponse {
                error: "Resume endpoint not found".into(),
            },
        ),
    };

    Some(response)
}

fn method_not_allowed() -> Response<BoxBody> {
    json_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &ErrorResponse {
            error: "Method not allowed".into(),
        },
    )
}
