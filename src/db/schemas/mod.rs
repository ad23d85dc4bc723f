//! Database schemas for Agora
//!
//! Defines MongoDB document structures for users, resume feedback,
//! contributions, programs, and testimonials.

mod contribution;
mod feedback;
mod metadata;
mod program;
mod testimonial;
mod user;

pub use contribution::{ContributionDoc, ContributionStatus, CONTRIBUTION_COLLECTION};
pub use feedback::{FeedbackDoc, FEEDBACK_COLLECTION};
pub use metadata::Metadata;
pub use program::{ProgramDoc, PROGRAM_COLLECTION};
pub use testimonial::{TestimonialDoc, TESTIMONIAL_COLLECTION};
pub use user::{UserDoc, USER_COLLECTION};
