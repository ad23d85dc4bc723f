//! Resume feedback threads
//!
//! The pieces of the review system that are pure logic over stored
//! documents: vote toggling, thread assembly, and reply-aware deletion.
//! HTTP wiring lives in `crate::routes::resume`.

pub mod delete;
pub mod tree;
pub mod votes;

pub use delete::{collect_subtree, delete_feedback, DeleteMode, ReplyStore};
pub use tree::{build_tree, FeedbackNode};
pub use votes::{apply_vote, VoteDirection, VoteOutcome};
