//! Admin access control
//!
//! Admin rights come from a configured allowlist of user ids. An empty
//! allowlist means no one is an admin.

use std::collections::HashSet;

/// The set of user ids with admin access
#[derive(Clone, Debug, Default)]
pub struct AdminRoster {
    ids: HashSet<String>,
}

impl AdminRoster {
    pub fn new(ids: Vec<String>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        self.ids.contains(user_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_roster_denies_everyone() {
        let roster = AdminRoster::default();
        assert!(!roster.is_admin("anyone"));
    }

    #[test]
    fn test_listed_ids_are_admins() {
        let roster = AdminRoster::new(vec!["a".to_string(), "b".to_string()]);
        assert!(roster.is_admin("a"));
        assert!(roster.is_admin("b"));
        assert!(!roster.is_admin("c"));
    }
}
