//! Contribution moderation
//!
//! Status transitions are computed here as pure values and persisted by the
//! admin routes. Only pending contributions can move; approval requires an
//! application month and produces the program document to publish, rejection
//! requires a reason.

use bson::{doc, DateTime, Document};

use crate::db::schemas::{ContributionDoc, ContributionStatus, ProgramDoc};
use crate::types::{AgoraError, Result};

/// The effects of approving a contribution
#[derive(Clone, Debug)]
pub struct Approval {
    /// `$set` update to apply to the contribution
    pub update: Document,
    /// Program to publish to the public catalog
    pub program: ProgramDoc,
}

/// The effects of rejecting a contribution
#[derive(Clone, Debug)]
pub struct Rejection {
    /// `$set` update to apply to the contribution
    pub update: Document,
}

fn require_pending(contribution: &ContributionDoc) -> Result<()> {
    if contribution.status != ContributionStatus::Pending {
        return Err(AgoraError::Validation(format!(
            "contribution is already {}",
            contribution.status
        )));
    }
    Ok(())
}

/// Approve a pending contribution
///
/// Fails with Validation if the contribution is not pending or the
/// application month is blank. Nothing is persisted here.
pub fn approve(
    contribution: &ContributionDoc,
    actor_id: &str,
    application_month: &str,
) -> Result<Approval> {
    require_pending(contribution)?;

    let month = application_month.trim();
    if month.is_empty() {
        return Err(AgoraError::Validation(
            "applicationMonth is required for approval".to_string(),
        ));
    }

    let now = DateTime::now();
    let update = doc! {
        "$set": {
            "status": ContributionStatus::Approved.to_string(),
            "approved_at": now,
            "approved_by": actor_id,
            "application_month": month,
        }
    };

    let program = ProgramDoc {
        _id: None,
        metadata: crate::db::schemas::Metadata::new(),
        name: contribution.name.clone(),
        application_link: contribution.website.clone(),
        description: contribution.description.clone(),
        application_month: month.to_string(),
        logo: String::new(),
        contributed_by: contribution.user_id.clone(),
        contribution_id: contribution.id_hex(),
    };

    Ok(Approval { update, program })
}

/// Reject a pending contribution
///
/// Fails with Validation if the contribution is not pending or the reason
/// is blank.
pub fn reject(contribution: &ContributionDoc, actor_id: &str, reason: &str) -> Result<Rejection> {
    require_pending(contribution)?;

    let reason = reason.trim();
    if reason.is_empty() {
        return Err(AgoraError::Validation(
            "rejectionReason is required for rejection".to_string(),
        ));
    }

    let now = DateTime::now();
    Ok(Rejection {
        update: doc! {
            "$set": {
                "status": ContributionStatus::Rejected.to_string(),
                "rejected_at": now,
                "rejected_by": actor_id,
                "rejection_reason": reason,
            }
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> ContributionDoc {
        ContributionDoc::new(
            "Foo".to_string(),
            "http://foo".to_string(),
            "A program".to_string(),
            "user-1".to_string(),
            "u@example.com".to_string(),
            "User One".to_string(),
        )
    }

    #[test]
    fn test_approve_builds_program_from_submission() {
        let c = pending();
        let approval = approve(&c, "admin-1", "March").unwrap();

        assert_eq!(approval.program.name, "Foo");
        assert_eq!(approval.program.application_link, "http://foo");
        assert_eq!(approval.program.description, "A program");
        assert_eq!(approval.program.application_month, "March");
        assert_eq!(approval.program.contributed_by, "user-1");

        let set = approval.update.get_document("$set").unwrap();
        assert_eq!(set.get_str("status").unwrap(), "approved");
        assert_eq!(set.get_str("approved_by").unwrap(), "admin-1");
        assert_eq!(set.get_str("application_month").unwrap(), "March");
    }

    #[test]
    fn test_approve_requires_month() {
        let c = pending();
        assert!(matches!(
            approve(&c, "admin-1", "  "),
            Err(AgoraError::Validation(_))
        ));
    }

    #[test]
    fn test_reject_requires_reason() {
        let c = pending();
        assert!(matches!(
            reject(&c, "admin-1", ""),
            Err(AgoraError::Validation(_))
        ));

        let rejection = reject(&c, "admin-1", "duplicate").unwrap();
        let set = rejection.update.get_document("$set").unwrap();
        assert_eq!(set.get_str("status").unwrap(), "rejected");
        assert_eq!(set.get_str("rejection_reason").unwrap(), "duplicate");
    }

    #[test]
    fn test_only_pending_can_transition() {
        let mut c = pending();
        c.status = ContributionStatus::Approved;
        assert!(approve(&c, "admin-1", "March").is_err());
        assert!(reject(&c, "admin-1", "reason").is_err());

        c.status = ContributionStatus::Rejected;
        assert!(approve(&c, "admin-1", "March").is_err());
    }
}
