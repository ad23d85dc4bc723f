//! Threaded feedback scenarios: assembling reply trees, voting, and the
//! two deletion modes, driven through an in-memory reply store.

use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::DateTime;
use std::collections::HashMap;
use tokio::sync::Mutex;

use agora::db::schemas::{FeedbackDoc, Metadata};
use agora::feedback::{
    apply_vote, build_tree, delete_feedback, DeleteMode, ReplyStore, VoteDirection,
};
use agora::types::{AgoraError, Result};

fn entry(seed: u32, parent: Option<&str>, at_millis: i64, content: &str) -> FeedbackDoc {
    let mut bytes = [0u8; 12];
    bytes[8..].copy_from_slice(&seed.to_be_bytes());
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
        content: content.to_string(),
        parent_id: parent.map(str::to_string),
        votes: 0,
        upvoted_by: Vec::new(),
        downvoted_by: Vec::new(),
    }
}

/// id -> parent_id map standing in for the feedback collection
struct MemStore {
    entries: Mutex<HashMap<String, Option<String>>>,
}

impl MemStore {
    fn new(pairs: &[(&str, Option<&str>)]) -> Self {
        Self {
            entries: Mutex::new(
                pairs
                    .iter()
                    .map(|(id, p)| (id.to_string(), p.map(str::to_string)))
                    .collect(),
            ),
        }
    }

    async fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl ReplyStore for MemStore {
    async fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.entries.lock().await.contains_key(id))
    }

    async fn reply_ids(&self, parent_id: &str) -> Result<Vec<String>> {
        Ok(self
            .entries
            .lock()
            .await
            .iter()
            .filter(|(_, p)| p.as_deref() == Some(parent_id))
            .map(|(id, _)| id.clone())
            .collect())
    }

    async fn delete_ids(&self, ids: &[String]) -> Result<u64> {
        let mut entries = self.entries.lock().await;
        let mut n = 0;
        for id in ids {
            if entries.remove(id).is_some() {
                n += 1;
            }
        }
        Ok(n)
    }

    async fn clear_parent(&self, ids: &[String]) -> Result<()> {
        let mut entries = self.entries.lock().await;
        for id in ids {
            if let Some(parent) = entries.get_mut(id) {
                *parent = None;
            }
        }
        Ok(())
    }
}

#[test]
fn thread_assembly_orders_roots_and_replies() {
    let question = entry(1, None, 100, "question");
    let question_id = question.id_hex();
    let answer = entry(2, Some(&question_id), 200, "answer");
    let answer_id = answer.id_hex();
    let followup = entry(3, Some(&answer_id), 300, "followup");
    let aside = entry(4, None, 400, "aside");

    let tree = build_tree(&[question, answer, followup, aside], None);

    // Newest root first, replies nested oldest first
    assert_eq!(tree.len(), 2);
    assert_eq!(tree[0].content, "aside");
    assert_eq!(tree[1].content, "question");
    assert_eq!(tree[1].replies.len(), 1);
    assert_eq!(tree[1].replies[0].content, "answer");
    assert_eq!(tree[1].replies[0].replies[0].content, "followup");
}

#[test]
fn votes_flow_into_thread_flags() {
    let mut doc = entry(1, None, 100, "comment");

    let out = apply_vote(
        doc.upvoted_by.clone(),
        doc.downvoted_by.clone(),
        "alice",
        VoteDirection::Up,
    );
    doc.votes = out.votes;
    doc.upvoted_by = out.upvoted_by;
    doc.downvoted_by = out.downvoted_by;

    let as_alice = build_tree(std::slice::from_ref(&doc), Some("alice"));
    assert_eq!(as_alice[0].votes, 1);
    assert!(as_alice[0].upvoted);

    // Switching sides moves the flags with it
    let out = apply_vote(doc.upvoted_by.clone(), doc.downvoted_by.clone(), "alice", VoteDirection::Down);
    doc.votes = out.votes;
    doc.upvoted_by = out.upvoted_by;
    doc.downvoted_by = out.downvoted_by;

    let as_alice = build_tree(std::slice::from_ref(&doc), Some("alice"));
    assert_eq!(as_alice[0].votes, -1);
    assert!(!as_alice[0].upvoted);
    assert!(as_alice[0].downvoted);
}

#[tokio::test]
async fn cascade_delete_clears_entire_discussion() {
    let store = MemStore::new(&[
        ("question", None),
        ("answer", Some("question")),
        ("followup", Some("answer")),
        ("second_answer", Some("question")),
        ("unrelated", None),
    ]);

    let deleted = delete_feedback(&store, "question", DeleteMode::Cascade)
        .await
        .unwrap();

    assert_eq!(deleted, 4);
    assert_eq!(store.ids().await, vec!["unrelated"]);
}

#[tokio::test]
async fn orphan_delete_promotes_replies_without_touching_grandchildren() {
    let store = MemStore::new(&[
        ("question", None),
        ("answer", Some("question")),
        ("followup", Some("answer")),
    ]);

    let deleted = delete_feedback(&store, "question", DeleteMode::Orphan)
        .await
        .unwrap();

    assert_eq!(deleted, 1);
    let entries = store.entries.lock().await;
    // Direct reply detached, grandchild untouched
    assert_eq!(entries.get("answer"), Some(&None));
    assert_eq!(entries.get("followup"), Some(&Some("answer".to_string())));
}

#[tokio::test]
async fn delete_of_missing_entry_changes_nothing() {
    let store = MemStore::new(&[("a", None), ("b", Some("a"))]);

    for mode in [DeleteMode::Cascade, DeleteMode::Orphan] {
        let err = delete_feedback(&store, "ghost", mode).await.unwrap_err();
        assert!(matches!(err, AgoraError::NotFound(_)));
    }
    assert_eq!(store.ids().await, vec!["a", "b"]);
}

#[tokio::test]
async fn orphaned_replies_reappear_at_top_level() {
    // Orphan-delete a root, then rebuild the tree from the survivors:
    // the detached reply must surface at top level, not vanish.
    let question = entry(1, None, 100, "question");
    let question_id = question.id_hex();
    let answer = entry(2, Some(&question_id), 200, "answer");
    let answer_id = answer.id_hex();
    let followup = entry(3, Some(&answer_id), 300, "followup");

    let store = MemStore::new(&[
        (question_id.as_str(), None),
        (answer_id.as_str(), Some(question_id.as_str())),
        (followup.id_hex().as_str(), Some(answer_id.as_str())),
    ]);
    delete_feedback(&store, &question_id, DeleteMode::Orphan)
        .await
        .unwrap();

    let mut survivor = answer.clone();
    survivor.parent_id = None;
    let tree = build_tree(&[survivor, followup], None);

    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].content, "answer");
    assert_eq!(tree[0].replies[0].content, "followup");
}
