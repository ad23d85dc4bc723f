//! Feedback thread assembly
//!
//! Feedback is stored flat with parent references; the nested thread is
//! rebuilt on every read. Replies whose parent is missing (deleted in
//! orphan mode) are promoted to top level rather than dropped.

use bson::DateTime;
use serde::Serialize;

use crate::db::schemas::FeedbackDoc;

/// One node of an assembled feedback thread, shaped for the API
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackNode {
    pub id: String,
    pub resume_owner_id: String,
    pub reviewer_id: String,
    pub reviewer_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviewer_photo_url: Option<String>,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub votes: i64,
    /// Whether the requesting viewer has an active upvote here
    pub upvoted: bool,
    /// Whether the requesting viewer has an active downvote here
    pub downvoted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
    pub replies: Vec<FeedbackNode>,
}

impl FeedbackNode {
    fn from_doc(doc: &FeedbackDoc, viewer: Option<&str>) -> Self {
        let upvoted = viewer.is_some_and(|v| doc.upvoted_by.iter().any(|id| id == v));
        let downvoted = viewer.is_some_and(|v| doc.downvoted_by.iter().any(|id| id == v));
        Self {
            id: doc.id_hex(),
            resume_owner_id: doc.resume_owner_id.clone(),
            reviewer_id: doc.reviewer_id.clone(),
            reviewer_name: doc.reviewer_name.clone(),
            reviewer_photo_url: doc.reviewer_photo_url.clone(),
            content: doc.content.clone(),
            parent_id: doc.parent_id.clone(),
            votes: doc.votes,
            upvoted,
            downvoted,
            created_at: doc.metadata.created_at,
            replies: Vec::new(),
        }
    }
}

/// Assemble a flat feedback list into a nested thread
///
/// Top-level entries are ordered newest first; replies within a parent are
/// ordered oldest first. `viewer` controls the per-node vote flags.
pub fn build_tree(docs: &[FeedbackDoc], viewer: Option<&str>) -> Vec<FeedbackNode> {
    // First pass: index every node by id
    let mut nodes: Vec<FeedbackNode> = docs.iter().map(|d| FeedbackNode::from_doc(d, viewer)).collect();
    let known: std::collections::HashSet<String> =
        nodes.iter().map(|n| n.id.clone()).collect();

    // Second pass: group children under their parents. Entries whose parent
    // is not in the set are treated as top-level (orphan promotion).
    let mut children: std::collections::HashMap<String, Vec<FeedbackNode>> =
        std::collections::HashMap::new();
    let mut roots: Vec<FeedbackNode> = Vec::new();

    for node in nodes.drain(..) {
        match node.parent_id.as_deref() {
            Some(parent) if known.contains(parent) => {
                children.entry(parent.to_string()).or_default().push(node);
            }
            _ => roots.push(node),
        }
    }

    roots.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    for node in &mut roots {
        attach_replies(node, &mut children);
    }
    roots
}

fn attach_replies(
    node: &mut FeedbackNode,
    children: &mut std::collections::HashMap<String, Vec<FeedbackNode>>,
) {
    if let Some(mut replies) = children.remove(&node.id) {
        replies.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        for reply in &mut replies {
            attach_replies(reply, children);
        }
        node.replies = replies;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::Metadata;
    use bson::oid::ObjectId;

    fn feedback(id_seed: u32, parent: Option<&str>, at_millis: i64) -> FeedbackDoc {
        let mut bytes = [0u8; 12];
        bytes[8..].copy_from_slice(&id_seed.to_be_bytes());
        FeedbackDoc {
            _id: Some(ObjectId::from_bytes(bytes)),
            metadata: Metadata {
                created_at: Some(DateTime::from_millis(at_millis)),
                updated_at: None,
            },
            resume_owner_id: "owner".to_string(),
            reviewer_id: "reviewer".to_string(),
            reviewer_name: "Reviewer".to_string(),
            reviewer_photo_url: None,
            content: format!("comment {id_seed}"),
            parent_id: parent.map(str::to_string),
            votes: 0,
            upvoted_by: Vec::new(),
            downvoted_by: Vec::new(),
        }
    }

    fn id_of(doc: &FeedbackDoc) -> String {
        doc.id_hex()
    }

    #[test]
    fn test_roots_newest_first_replies_oldest_first() {
        let root_a = feedback(1, None, 100);
        let root_b = feedback(2, None, 200);
        let a_id = id_of(&root_a);
        let reply_late = feedback(3, Some(&a_id), 400);
        let reply_early = feedback(4, Some(&a_id), 300);

        let tree = build_tree(&[root_a, root_b, reply_late, reply_early], None);

        assert_eq!(tree.len(), 2);
        // Newest root first
        assert_eq!(tree[0].content, "comment 2");
        assert_eq!(tree[1].content, "comment 1");
        // Replies oldest first
        let replies = &tree[1].replies;
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].content, "comment 4");
        assert_eq!(replies[1].content, "comment 3");
    }

    #[test]
    fn test_nested_replies() {
        let root = feedback(1, None, 100);
        let root_id = id_of(&root);
        let reply = feedback(2, Some(&root_id), 200);
        let reply_id = id_of(&reply);
        let nested = feedback(3, Some(&reply_id), 300);

        let tree = build_tree(&[root, reply, nested], None);

        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].replies.len(), 1);
        assert_eq!(tree[0].replies[0].replies.len(), 1);
        assert_eq!(tree[0].replies[0].replies[0].content, "comment 3");
    }

    #[test]
    fn test_orphans_promoted_to_top_level() {
        let orphan = feedback(1, Some("deadbeefdeadbeefdeadbeef"), 100);
        let root = feedback(2, None, 50);

        let tree = build_tree(&[orphan, root], None);

        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].content, "comment 1");
        assert!(tree[0].parent_id.is_some());
    }

    #[test]
    fn test_viewer_vote_flags() {
        let mut doc = feedback(1, None, 100);
        doc.upvoted_by = vec!["alice".to_string()];
        doc.downvoted_by = vec!["bob".to_string()];

        let as_alice = build_tree(std::slice::from_ref(&doc), Some("alice"));
        assert!(as_alice[0].upvoted);
        assert!(!as_alice[0].downvoted);

        let as_bob = build_tree(std::slice::from_ref(&doc), Some("bob"));
        assert!(!as_bob[0].upvoted);
        assert!(as_bob[0].downvoted);

        let anonymous = build_tree(&[doc], None);
        assert!(!anonymous[0].upvoted);
        assert!(!anonymous[0].downvoted);
    }

    #[test]
    fn test_empty_input() {
        assert!(build_tree(&[], None).is_empty());
    }
}
