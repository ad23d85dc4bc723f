//! Vote ledger for feedback entries
//!
//! Each entry keeps explicit voter rosters alongside the net score. Voting
//! is a toggle: a repeat vote in the same direction removes it, a vote in
//! the opposite direction switches sides. A user is never in both rosters.

use serde::{Deserialize, Serialize};

/// Vote direction
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

/// Result of applying one vote action
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoteOutcome {
    /// New net score (upvotes minus downvotes)
    pub votes: i64,
    /// New upvoter roster
    pub upvoted_by: Vec<String>,
    /// New downvoter roster
    pub downvoted_by: Vec<String>,
    /// True if the user now holds a vote in the requested direction
    pub active: bool,
}

/// Apply a vote toggle to the given rosters
///
/// The score is recomputed from the rosters rather than adjusted by delta,
/// so the returned state is consistent even if the stored score drifted.
pub fn apply_vote(
    mut upvoted_by: Vec<String>,
    mut downvoted_by: Vec<String>,
    user_id: &str,
    direction: VoteDirection,
) -> VoteOutcome {
    let had_up = upvoted_by.iter().any(|id| id == user_id);
    let had_down = downvoted_by.iter().any(|id| id == user_id);

    upvoted_by.retain(|id| id != user_id);
    downvoted_by.retain(|id| id != user_id);

    let active = match direction {
        VoteDirection::Up => {
            if !had_up {
                upvoted_by.push(user_id.to_string());
            }
            !had_up
        }
        VoteDirection::Down => {
            if !had_down {
                downvoted_by.push(user_id.to_string());
            }
            !had_down
        }
    };

    VoteOutcome {
        votes: upvoted_by.len() as i64 - downvoted_by.len() as i64,
        upvoted_by,
        downvoted_by,
        active,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_first_upvote() {
        let out = apply_vote(vec![], vec![], "u1", VoteDirection::Up);
        assert_eq!(out.votes, 1);
        assert_eq!(out.upvoted_by, ids(&["u1"]));
        assert!(out.downvoted_by.is_empty());
        assert!(out.active);
    }

    #[test]
    fn test_repeat_upvote_toggles_off() {
        let out = apply_vote(ids(&["u1"]), vec![], "u1", VoteDirection::Up);
        assert_eq!(out.votes, 0);
        assert!(out.upvoted_by.is_empty());
        assert!(!out.active);
    }

    #[test]
    fn test_switch_direction_moves_score_by_two() {
        let before = apply_vote(vec![], vec![], "u1", VoteDirection::Up);
        assert_eq!(before.votes, 1);

        let after = apply_vote(
            before.upvoted_by,
            before.downvoted_by,
            "u1",
            VoteDirection::Down,
        );
        assert_eq!(after.votes, -1);
        assert!(after.upvoted_by.is_empty());
        assert_eq!(after.downvoted_by, ids(&["u1"]));
        assert!(after.active);
    }

    #[test]
    fn test_never_in_both_rosters() {
        let mut up = ids(&["a", "b"]);
        let mut down = ids(&["c"]);
        for (user, dir) in [
            ("a", VoteDirection::Down),
            ("c", VoteDirection::Up),
            ("b", VoteDirection::Up),
            ("d", VoteDirection::Down),
        ] {
            let out = apply_vote(up, down, user, dir);
            for id in &out.upvoted_by {
                assert!(!out.downvoted_by.contains(id));
            }
            assert_eq!(
                out.votes,
                out.upvoted_by.len() as i64 - out.downvoted_by.len() as i64
            );
            up = out.upvoted_by;
            down = out.downvoted_by;
        }
    }

    #[test]
    fn test_other_voters_untouched() {
        let out = apply_vote(ids(&["a", "b"]), ids(&["c"]), "b", VoteDirection::Up);
        assert_eq!(out.upvoted_by, ids(&["a"]));
        assert_eq!(out.downvoted_by, ids(&["c"]));
        assert_eq!(out.votes, 0);
    }
}
