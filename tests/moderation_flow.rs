//! Contribution moderation scenarios: submit, approve into the public
//! catalog, reject with a reason, and the transitions that must not happen.

use agora::db::schemas::{ContributionDoc, ContributionStatus};
use agora::moderation;
use agora::types::AgoraError;

fn submission() -> ContributionDoc {
    ContributionDoc::new(
        "Foo".to_string(),
        "http://foo".to_string(),
        "A mentorship program".to_string(),
        "user-1".to_string(),
        "user@example.com".to_string(),
        "User One".to_string(),
    )
}

#[test]
fn approval_publishes_the_submission() {
    let contribution = submission();
    let approval = moderation::approve(&contribution, "admin-1", "March").unwrap();

    // Program carries the submitted fields
    assert_eq!(approval.program.name, "Foo");
    assert_eq!(approval.program.application_link, "http://foo");
    assert_eq!(approval.program.description, "A mentorship program");
    assert_eq!(approval.program.application_month, "March");
    assert_eq!(approval.program.contributed_by, "user-1");

    // Contribution update records who approved and when
    let set = approval.update.get_document("$set").unwrap();
    assert_eq!(set.get_str("status").unwrap(), "approved");
    assert_eq!(set.get_str("approved_by").unwrap(), "admin-1");
    assert_eq!(set.get_str("application_month").unwrap(), "March");
    assert!(set.get_datetime("approved_at").is_ok());
}

#[test]
fn approval_without_month_produces_no_program() {
    let contribution = submission();
    let err = moderation::approve(&contribution, "admin-1", "   ").unwrap_err();
    assert!(matches!(err, AgoraError::Validation(_)));
}

#[test]
fn rejection_records_the_reason() {
    let contribution = submission();
    let rejection = moderation::reject(&contribution, "admin-1", "duplicate listing").unwrap();

    let set = rejection.update.get_document("$set").unwrap();
    assert_eq!(set.get_str("status").unwrap(), "rejected");
    assert_eq!(set.get_str("rejected_by").unwrap(), "admin-1");
    assert_eq!(set.get_str("rejection_reason").unwrap(), "duplicate listing");
}

#[test]
fn settled_contributions_cannot_move_again() {
    for status in [ContributionStatus::Approved, ContributionStatus::Rejected] {
        let mut contribution = submission();
        contribution.status = status;

        assert!(matches!(
            moderation::approve(&contribution, "admin-1", "March"),
            Err(AgoraError::Validation(_))
        ));
        assert!(matches!(
            moderation::reject(&contribution, "admin-1", "reason"),
            Err(AgoraError::Validation(_))
        ));
    }
}

#[test]
fn approval_month_is_trimmed() {
    let contribution = submission();
    let approval = moderation::approve(&contribution, "admin-1", "  March  ").unwrap();
    assert_eq!(approval.program.application_month, "March");
}
