//! Resume feedback document schema
//!
//! One comment or reply in a resume review thread. Replies reference their
//! parent by id only; the nested tree is rebuilt on every read
//! (see `crate::feedback::tree`).

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for resume feedback
pub const FEEDBACK_COLLECTION: &str = "resumeFeedback";

/// Feedback document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct FeedbackDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Id of the user whose resume is being reviewed
    pub resume_owner_id: String,

    /// Id of the author of this feedback
    pub reviewer_id: String,

    /// Display name of the author, denormalized for listing
    pub reviewer_name: String,

    /// Author's profile image, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewer_photo_url: Option<String>,

    /// Feedback text (non-empty)
    pub content: String,

    /// Parent feedback id for replies; None for a top-level comment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    /// Net score: upvotes minus downvotes
    #[serde(default)]
    pub votes: i64,

    /// User ids that upvoted. A user appears in at most one of the
    /// two vote lists at any time.
    #[serde(default)]
    pub upvoted_by: Vec<String>,

    /// User ids that downvoted
    #[serde(default)]
    pub downvoted_by: Vec<String>,
}

impl FeedbackDoc {
    /// Create a new feedback document
    pub fn new(
        resume_owner_id: String,
        reviewer_id: String,
        reviewer_name: String,
        reviewer_photo_url: Option<String>,
        content: String,
        parent_id: Option<String>,
    ) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            resume_owner_id,
            reviewer_id,
            reviewer_name,
            reviewer_photo_url,
            content,
            parent_id,
            votes: 0,
            upvoted_by: Vec::new(),
            downvoted_by: Vec::new(),
        }
    }

    /// The feedback id as a hex string; empty before insertion
    pub fn id_hex(&self) -> String {
        self._id.map(|id| id.to_hex()).unwrap_or_default()
    }
}

impl IntoIndexes for FeedbackDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Thread listing: all feedback for one resume, newest first
            (
                doc! { "resume_owner_id": 1, "metadata.created_at": -1 },
                Some(
                    IndexOptions::builder()
                        .name("owner_created_index".to_string())
                        .build(),
                ),
            ),
            // Reply discovery for cascade/orphan deletion
            (
                doc! { "parent_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("parent_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for FeedbackDoc {
    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
