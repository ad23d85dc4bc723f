//! Feedback deletion
//!
//! Deleting an entry either cascades through its whole reply subtree or
//! removes only the entry and detaches its direct replies. Subtree
//! collection is iterative with a visited set, so a corrupt parent cycle
//! cannot loop forever.

use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use tracing::debug;

use crate::types::{AgoraError, Result};

/// How to handle replies when deleting a feedback entry
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteMode {
    /// Delete the entry and every transitive reply
    Cascade,
    /// Delete only the entry; direct replies lose their parent reference
    Orphan,
}

/// Storage operations the delete engine needs, kept narrow so tests can
/// run against an in-memory double
#[async_trait]
pub trait ReplyStore: Send + Sync {
    /// True if an entry with this id exists
    async fn exists(&self, id: &str) -> Result<bool>;

    /// Ids of entries whose parent is `parent_id`
    async fn reply_ids(&self, parent_id: &str) -> Result<Vec<String>>;

    /// Delete all entries with the given ids, returning how many went away
    async fn delete_ids(&self, ids: &[String]) -> Result<u64>;

    /// Clear the parent reference on all entries with the given ids
    async fn clear_parent(&self, ids: &[String]) -> Result<()>;
}

/// Collect the entry and its transitive replies, breadth-first
///
/// The returned list starts with `root_id`. A visited set guards against
/// parent cycles in corrupt data.
pub async fn collect_subtree(store: &dyn ReplyStore, root_id: &str) -> Result<Vec<String>> {
    let mut ids = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<String> = VecDeque::new();

    seen.insert(root_id.to_string());
    queue.push_back(root_id.to_string());

    while let Some(id) = queue.pop_front() {
        for reply in store.reply_ids(&id).await? {
            if seen.insert(reply.clone()) {
                queue.push_back(reply);
            }
        }
        ids.push(id);
    }

    Ok(ids)
}

/// Delete a feedback entry
///
/// Returns the number of entries removed. Fails with NotFound, without
/// touching anything, if the entry does not exist.
pub async fn delete_feedback(
    store: &dyn ReplyStore,
    id: &str,
    mode: DeleteMode,
) -> Result<u64> {
    if !store.exists(id).await? {
        return Err(AgoraError::NotFound("feedback".to_string()));
    }

    let deleted = match mode {
        DeleteMode::Cascade => {
            let ids = collect_subtree(store, id).await?;
            debug!(root = %id, count = ids.len(), "Cascading feedback delete");
            store.delete_ids(&ids).await?
        }
        DeleteMode::Orphan => {
            let replies = store.reply_ids(id).await?;
            if !replies.is_empty() {
                store.clear_parent(&replies).await?;
            }
            store.delete_ids(std::slice::from_ref(&id.to_string())).await?
        }
    };

    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    /// In-memory entry map: id -> parent_id
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

        async fn parent_of(&self, id: &str) -> Option<Option<String>> {
            self.entries.lock().await.get(id).cloned()
        }

        async fn len(&self) -> usize {
            self.entries.lock().await.len()
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

    #[tokio::test]
    async fn test_cascade_removes_whole_subtree() {
        let store = MemStore::new(&[
            ("root", None),
            ("r1", Some("root")),
            ("r2", Some("root")),
            ("r1a", Some("r1")),
            ("other", None),
        ]);

        let deleted = delete_feedback(&store, "root", DeleteMode::Cascade)
            .await
            .unwrap();

        assert_eq!(deleted, 4);
        assert_eq!(store.len().await, 1);
        assert!(store.parent_of("other").await.is_some());
    }

    #[tokio::test]
    async fn test_orphan_detaches_direct_replies_only() {
        let store = MemStore::new(&[
            ("root", None),
            ("r1", Some("root")),
            ("r1a", Some("r1")),
        ]);

        let deleted = delete_feedback(&store, "root", DeleteMode::Orphan)
            .await
            .unwrap();

        assert_eq!(deleted, 1);
        // Direct reply detached
        assert_eq!(store.parent_of("r1").await, Some(None));
        // Grandchild keeps its parent
        assert_eq!(store.parent_of("r1a").await, Some(Some("r1".to_string())));
    }

    #[tokio::test]
    async fn test_missing_entry_is_not_found_and_nothing_changes() {
        let store = MemStore::new(&[("a", None), ("b", Some("a"))]);

        let err = delete_feedback(&store, "ghost", DeleteMode::Cascade)
            .await
            .unwrap_err();

        assert!(matches!(err, AgoraError::NotFound(_)));
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_cycle_terminates() {
        // Corrupt data: a and b point at each other
        let store = MemStore::new(&[("a", Some("b")), ("b", Some("a"))]);

        let ids = collect_subtree(&store, "a").await.unwrap();
        assert_eq!(ids.len(), 2);
    }

    #[tokio::test]
    async fn test_leaf_cascade_equals_single_delete() {
        let store = MemStore::new(&[("root", None), ("leaf", Some("root"))]);

        let deleted = delete_feedback(&store, "leaf", DeleteMode::Cascade)
            .await
            .unwrap();

        assert_eq!(deleted, 1);
        assert_eq!(store.len().await, 1);
    }
}
