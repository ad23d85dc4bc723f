//! Authentication and authorization for Agora
//!
//! Provides:
//! - JWT token generation and validation
//! - Password hashing with Argon2
//! - Admin allowlist checks

pub mod admin;
pub mod jwt;
pub mod password;

pub use admin::AdminRoster;
pub use jwt::{extract_token_from_header, Claims, JwtValidator};
pub use password::{hash_password, verify_password};
