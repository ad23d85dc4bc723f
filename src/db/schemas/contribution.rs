//! Program contribution document schema
//!
//! A user-submitted candidate program awaiting moderation. Approval copies
//! the submission into the public `programs` collection; the contribution
//! itself keeps its transition metadata.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for contributions
pub const CONTRIBUTION_COLLECTION: &str = "programstd";

/// Moderation status of a contribution
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContributionStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for ContributionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContributionStatus::Pending => write!(f, "pending"),
            ContributionStatus::Approved => write!(f, "approved"),
            ContributionStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl FromStr for ContributionStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ContributionStatus::Pending),
            "approved" => Ok(ContributionStatus::Approved),
            "rejected" => Ok(ContributionStatus::Rejected),
            _ => Err(()),
        }
    }
}

/// Contribution document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ContributionDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at)
    #[serde(default)]
    pub metadata: Metadata,

    /// Program name
    pub name: String,

    /// Program website
    pub website: String,

    /// Free-form description
    #[serde(default)]
    pub description: String,

    /// Submitter's user id
    pub user_id: String,

    /// Submitter's email, denormalized for the admin view
    #[serde(default)]
    pub user_email: String,

    /// Submitter's display name, denormalized for the admin view
    #[serde(default)]
    pub user_display_name: String,

    /// Moderation status
    #[serde(default)]
    pub status: ContributionStatus,

    // --- approval metadata ---
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_month: Option<String>,

    // --- rejection metadata ---
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_at: Option<DateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

impl ContributionDoc {
    /// Create a new pending contribution
    pub fn new(
        name: String,
        website: String,
        description: String,
        user_id: String,
        user_email: String,
        user_display_name: String,
    ) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            name,
            website,
            description,
            user_id,
            user_email,
            user_display_name,
            status: ContributionStatus::Pending,
            ..Default::default()
        }
    }

    /// The contribution id as a hex string; empty before insertion
    pub fn id_hex(&self) -> String {
        self._id.map(|id| id.to_hex()).unwrap_or_default()
    }
}

impl IntoIndexes for ContributionDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Per-user listing, newest first
            (
                doc! { "user_id": 1, "metadata.created_at": -1 },
                Some(
                    IndexOptions::builder()
                        .name("user_created_index".to_string())
                        .build(),
                ),
            ),
            // Admin queue, newest first per status
            (
                doc! { "status": 1, "metadata.created_at": -1 },
                Some(
                    IndexOptions::builder()
                        .name("status_created_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for ContributionDoc {
    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for s in ["pending", "approved", "rejected"] {
            assert_eq!(s.parse::<ContributionStatus>().unwrap().to_string(), s);
        }
        assert!("published".parse::<ContributionStatus>().is_err());
    }
}
