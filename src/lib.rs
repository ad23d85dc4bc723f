//! Agora - REST backend for the community platform
//!
//! Agora is a thin orchestration layer over MongoDB and a blob store:
//! users submit and browse program listings (moderated by an admin
//! allowlist), upload resumes and exchange threaded feedback on them,
//! and browse video testimonials.
//!
//! ## Modules
//!
//! - **routes**: REST handlers under `/api/*`
//! - **feedback**: the threaded-feedback core (vote ledger, reply tree,
//!   cascade/orphan deletion)
//! - **moderation**: contribution approval/rejection workflow
//! - **db**: MongoDB client and document schemas
//! - **blobs**: blob storage for resumes, videos, and profile images

pub mod auth;
pub mod blobs;
pub mod config;
pub mod db;
pub mod feedback;
pub mod moderation;
pub mod routes;
pub mod server;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{AgoraError, Result};
