//! HTTP route handlers
//!
//! Each module owns one URL prefix and exposes a `handle_*_request`
//! dispatcher returning `Some(response)` when the path belongs to it.

pub mod admin;
pub mod auth_routes;
pub mod contributions;
pub mod files;
pub mod health;
pub mod helpers;
pub mod programs;
pub mod resume;
pub mod testimonials;
pub mod users;

pub use admin::handle_admin_request;
pub use auth_routes::handle_auth_request;
pub use contributions::handle_contributions_request;
pub use files::handle_files_request;
pub use health::{health_check, version_info};
pub use programs::handle_programs_request;
pub use resume::handle_resume_request;
pub use testimonials::handle_testimonials_request;
pub use users::handle_users_request;
