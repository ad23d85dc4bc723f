//! Configuration for Agora
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Agora - REST backend for the community platform
#[derive(Parser, Debug, Clone)]
#[command(name = "agora")]
#[command(about = "REST backend for programs, resume feedback, and testimonials")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:5001")]
    pub listen: SocketAddr,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "agora")]
    pub mongodb_db: String,

    /// JWT secret for token signing (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// JWT token expiry in seconds (default 7 days)
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "604800")]
    pub jwt_expiry_seconds: u64,

    /// Comma-separated list of user ids granted admin access.
    /// Empty means no admins; there is no built-in default.
    #[arg(long, env = "ADMIN_USER_IDS")]
    pub admin_user_ids: Option<String>,

    /// Root directory for blob storage (resumes, videos, profile images)
    #[arg(long, env = "BLOB_ROOT", default_value = "./data/blobs")]
    pub blob_root: PathBuf,

    /// Public base URL under which stored blobs are served
    #[arg(long, env = "BLOB_BASE_URL", default_value = "/files")]
    pub blob_base_url: String,

    /// Maximum resume upload size in bytes (default 5 MB)
    #[arg(long, env = "MAX_RESUME_BYTES", default_value = "5242880")]
    pub max_resume_bytes: usize,

    /// Maximum video upload size in bytes (default 100 MB)
    #[arg(long, env = "MAX_VIDEO_BYTES", default_value = "104857600")]
    pub max_video_bytes: usize,

    /// Enable development mode (allows a default JWT secret)
    #[arg(long, env = "DEV_MODE", default_value = "false", action = clap::ArgAction::Set)]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Get effective JWT secret. `validate()` guarantees a real secret is
    /// present outside dev mode; the fallback only ever serves dev mode.
    pub fn jwt_secret(&self) -> String {
        self.jwt_secret
            .clone()
            .unwrap_or_else(|| "dev-only-insecure-secret".to_string())
    }

    /// Parse the admin allowlist into a list of user ids
    pub fn admin_ids(&self) -> Vec<String> {
        self.admin_user_ids
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !self.dev_mode && self.jwt_secret.is_none() {
            return Err("JWT_SECRET is required in production mode".to_string());
        }

        if self.max_resume_bytes == 0 || self.max_video_bytes == 0 {
            return Err("Upload size limits must be non-zero".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args::parse_from(["agora", "--dev-mode", "true"])
    }

    #[test]
    fn test_admin_ids_empty_by_default() {
        let args = base_args();
        assert!(args.admin_ids().is_empty());
    }

    #[test]
    fn test_admin_ids_parsing() {
        let mut args = base_args();
        args.admin_user_ids = Some("alice, bob,,carol".to_string());
        assert_eq!(args.admin_ids(), vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn test_production_requires_jwt_secret() {
        let mut args = base_args();
        args.dev_mode = false;
        assert!(args.validate().is_err());

        args.jwt_secret = Some("secret".into());
        assert!(args.validate().is_ok());
    }
}
