//! User document schema
//!
//! Stores credentials, profile fields, and resume metadata. The resume
//! fields live on the user document (one resume per user); the blob
//! itself is in the blob store at `resume_path`.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for users
pub const USER_COLLECTION: &str = "users";

/// User document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UserDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Login identifier (email)
    pub email: String,

    /// Argon2 password hash
    pub password_hash: String,

    /// Display name
    pub full_name: String,

    /// College/school affiliation
    #[serde(default)]
    pub college: String,

    /// Phone number
    #[serde(default)]
    pub phone_number: String,

    /// Profile image URL (blob store)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,

    /// Profile image blob path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_path: Option<String>,

    /// Resume download URL (blob store)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_url: Option<String>,

    /// Resume blob path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_path: Option<String>,

    /// Original resume filename
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_name: Option<String>,

    /// When the resume was last uploaded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_updated_at: Option<DateTime>,

    /// Whether the resume is visible to other users for feedback
    #[serde(default)]
    pub resume_public: bool,

    /// Last successful login
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime>,
}

impl UserDoc {
    /// Create a new user document
    pub fn new(email: String, password_hash: String, full_name: String, college: String) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            email,
            password_hash,
            full_name,
            college,
            last_login: Some(DateTime::now()),
            ..Default::default()
        }
    }

    /// The user's id as a hex string; empty before insertion
    pub fn id_hex(&self) -> String {
        self._id.map(|id| id.to_hex()).unwrap_or_default()
    }
}

impl IntoIndexes for UserDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Unique index on email
            (
                doc! { "email": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("email_unique".to_string())
                        .build(),
                ),
            ),
            // Index for the public-resume listing
            (
                doc! { "resume_public": 1 },
                Some(
                    IndexOptions::builder()
                        .name("resume_public_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for UserDoc {
    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
