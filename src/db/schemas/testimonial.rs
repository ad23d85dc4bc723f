//! Testimonial document schema
//!
//! A video testimonial published by an admin. The video bytes live in the
//! blob store at `file_name`; replacing the video deletes the old blob
//! best-effort.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for testimonials
pub const TESTIMONIAL_COLLECTION: &str = "testimonials";

/// Testimonial document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct TestimonialDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Testimonial title
    pub title: String,

    /// Free-form description
    #[serde(default)]
    pub description: String,

    /// Program the testimonial is about
    #[serde(default)]
    pub program_name: String,

    /// Video download URL (blob store)
    pub video_url: String,

    /// Video blob path, kept for later replacement/deletion
    pub file_name: String,

    /// Thumbnail URL
    #[serde(default)]
    pub thumbnail_url: String,

    /// Admin who created the testimonial
    pub created_by: String,

    /// Admin who last updated the testimonial
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

impl TestimonialDoc {
    /// The testimonial id as a hex string; empty before insertion
    pub fn id_hex(&self) -> String {
        self._id.map(|id| id.to_hex()).unwrap_or_default()
    }
}

impl IntoIndexes for TestimonialDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "metadata.created_at": -1 },
            Some(
                IndexOptions::builder()
                    .name("created_index".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for TestimonialDoc {
    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
