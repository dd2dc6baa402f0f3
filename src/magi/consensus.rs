//! Vote classification and strict-majority tallying.

use std::collections::HashMap;

use super::types::{Decision, Vote};

/// Classify a model reply into a vote.
///
/// Keyword containment on the uppercased reply, approve checked before
/// reject; anything without a recognized keyword is an abstention.
pub fn classify_vote(reply: &str) -> Vote {
    let upper = reply.to_uppercase();
    if upper.contains("APPROVE") || upper.contains("赞成") {
        Vote::Approve
    } else if upper.contains("REJECT") || upper.contains("反对") {
        Vote::Reject
    } else {
        Vote::Abstain
    }
}

/// Tally votes into a collective decision.
///
/// A decision needs a strict majority of the full roster (`count * 2 >
/// agent_count`); abstentions count against both sides, so a split roster
/// lands on `Undecided`.
pub fn tally(votes: &HashMap<String, Vote>, agent_count: usize) -> Decision {
    let approve = votes.values().filter(|v| **v == Vote::Approve).count();
    let reject = votes.values().filter(|v| **v == Vote::Reject).count();

    if approve * 2 > agent_count {
        Decision::Approved
    } else if reject * 2 > agent_count {
        Decision::Rejected
    } else {
        Decision::Undecided
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn votes(entries: &[(&str, Vote)]) -> HashMap<String, Vote> {
        entries
            .iter()
            .map(|(id, v)| (id.to_string(), *v))
            .collect()
    }

    #[test]
    fn test_classify_keywords() {
        assert_eq!(classify_vote("APPROVE - looks solid"), Vote::Approve);
        assert_eq!(classify_vote("i approve of this"), Vote::Approve);
        assert_eq!(classify_vote("我赞成这个方案"), Vote::Approve);
        assert_eq!(classify_vote("REJECT, too risky"), Vote::Reject);
        assert_eq!(classify_vote("必须反对"), Vote::Reject);
        assert_eq!(classify_vote("I am not sure"), Vote::Abstain);
        assert_eq!(classify_vote(""), Vote::Abstain);
    }

    #[test]
    fn test_classify_approve_wins_when_both_present() {
        // Approve is checked first.
        assert_eq!(
            classify_vote("I REJECT the old plan but APPROVE the new one"),
            Vote::Approve
        );
    }

    #[test]
    fn test_majority_approves() {
        let v = votes(&[
            ("a", Vote::Approve),
            ("b", Vote::Approve),
            ("c", Vote::Reject),
        ]);
        assert_eq!(tally(&v, 3), Decision::Approved);
    }

    #[test]
    fn test_majority_rejects() {
        let v = votes(&[
            ("a", Vote::Reject),
            ("b", Vote::Reject),
            ("c", Vote::Approve),
        ]);
        assert_eq!(tally(&v, 3), Decision::Rejected);
    }

    #[test]
    fn test_split_roster_is_undecided() {
        let v = votes(&[
            ("a", Vote::Approve),
            ("b", Vote::Reject),
            ("c", Vote::Abstain),
        ]);
        assert_eq!(tally(&v, 3), Decision::Undecided);
    }

    #[test]
    fn test_majority_is_strict_over_full_roster() {
        // 2 of 4 approvals is exactly half, not a strict majority.
        let v = votes(&[
            ("a", Vote::Approve),
            ("b", Vote::Approve),
            ("c", Vote::Abstain),
            ("d", Vote::Abstain),
        ]);
        assert_eq!(tally(&v, 4), Decision::Undecided);
    }

    #[test]
    fn test_missing_votes_count_against_majority() {
        // Tally is over agent_count, not over recorded votes.
        let v = votes(&[("a", Vote::Approve)]);
        assert_eq!(tally(&v, 3), Decision::Undecided);
        assert_eq!(tally(&v, 1), Decision::Approved);
    }

    #[test]
    fn test_tally_symmetry() {
        let approve_heavy = votes(&[("a", Vote::Approve), ("b", Vote::Approve)]);
        let reject_heavy = votes(&[("a", Vote::Reject), ("b", Vote::Reject)]);
        assert_eq!(tally(&approve_heavy, 3), Decision::Approved);
        assert_eq!(tally(&reject_heavy, 3), Decision::Rejected);
    }
}
