//! Stored file serving
//!
//! Serves uploaded blobs (resumes, profile images, testimonial videos) from
//! the blob store under the configured public base URL.

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use std::sync::Arc;

use crate::routes::helpers::{
    cors_preflight, error_response, full_body, json_response, BoxBody, ErrorResponse,
};
use crate::server::AppState;

fn content_type_for(path: &str) -> &'static str {
    match path.rsplit('.').next().unwrap_or("").to_lowercase().as_str() {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        _ => "application/octet-stream",
    }
}

/// Handle blob downloads under the public files prefix
pub async fn handle_files_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Option<Response<BoxBody>> {
    let prefix = format!("{}/", state.args.blob_base_url.trim_end_matches('/'));
    let path = req.uri().path().to_string();

    let blob_path = path.strip_prefix(&prefix)?.to_string();

    if req.method() == Method::OPTIONS {
        return Some(cors_preflight());
    }
    if req.method() != Method::GET {
        return Some(json_response(
            StatusCode::METHOD_NOT_ALLOWED,
            &ErrorResponse {
                error: "Method not allowed".into(),
            },
        ));
    }

    let response = match state.blobs.get(&blob_path).await {
        Ok(Some(data)) => Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", content_type_for(&blob_path))
            .header("Access-Control-Allow-Origin", "*")
            .header("Cache-Control", "public, max-age=3600")
            .body(full_body(data))
            .unwrap_or_else(|_| {
                Response::builder()
                    .status(StatusCode::INTERNAL_SERVER_ERROR)
                    .body(full_body(r#"{"error":"Internal error"}"#))
                    .unwrap()
            }),
        Ok(None) => json_response(
            StatusCode::NOT_FOUND,
            &ErrorResponse {
                error: "File not found".into(),
            },
        ),
        Err(e) => error_response(&e),
    };

    Some(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_mapping() {
        assert_eq!(content_type_for("resumes/u1/cv.pdf"), "application/pdf");
        assert_eq!(content_type_for("a/b/clip.MP4"), "video/mp4");
        assert_eq!(content_type_for("unknown.bin"), "application/octet-stream");
    }
}
