//! Published program document schema
//!
//! A catalog entry created from an approved contribution. Programs have an
//! independent lifecycle after creation; editing or deleting one does not
//! touch the contribution it came from.

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for published programs
pub const PROGRAM_COLLECTION: &str = "programs";

/// Program document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ProgramDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Program name
    pub name: String,

    /// Where to apply (the contribution's website)
    pub application_link: String,

    /// Free-form description
    #[serde(default)]
    pub description: String,

    /// Month applications open, set by the approving admin
    #[serde(default)]
    pub application_month: String,

    /// Logo URL
    #[serde(default)]
    pub logo: String,

    /// Id of the user whose contribution produced this program
    #[serde(default)]
    pub contributed_by: String,

    /// Id of the originating contribution (provenance only; no link back)
    #[serde(default)]
    pub contribution_id: String,
}

impl ProgramDoc {
    /// The program id as a hex string; empty before insertion
    pub fn id_hex(&self) -> String {
        self._id.map(|id| id.to_hex()).unwrap_or_default()
    }
}

impl IntoIndexes for ProgramDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![(
            doc! { "name": 1 },
            Some(
                IndexOptions::builder()
                    .name("name_index".to_string())
                    .build(),
            ),
        )]
    }
}

impl MutMetadata for ProgramDoc {
    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
