//! Approval status state machine.
//!
//! Every pipeline field of every segment (script, image, video, audio,
//! final) carries one [`ApprovalStatus`]. Changes are only legal along the
//! directed edges of the transition table:
//!
//! ```text
//! draft      -> submitted
//! submitted  -> processing, draft
//! processing -> approved, rejected
//! approved   -> draft
//! rejected   -> draft
//! ```
//!
//! Illegal transitions are rejected, never coerced.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// ApprovalStatus
// ---------------------------------------------------------------------------

/// Canonical approval status of a single pipeline field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Draft,
    Submitted,
    Processing,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    /// Every status, in table order.
    pub const ALL: [ApprovalStatus; 5] = [
        ApprovalStatus::Draft,
        ApprovalStatus::Submitted,
        ApprovalStatus::Processing,
        ApprovalStatus::Approved,
        ApprovalStatus::Rejected,
    ];

    /// Database / wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            ApprovalStatus::Draft => "draft",
            ApprovalStatus::Submitted => "submitted",
            ApprovalStatus::Processing => "processing",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }

    /// Statuses reachable from `self` in one step.
    pub fn next_states(self) -> &'static [ApprovalStatus] {
        match self {
            ApprovalStatus::Draft => &[ApprovalStatus::Submitted],
            ApprovalStatus::Submitted => &[ApprovalStatus::Processing, ApprovalStatus::Draft],
            ApprovalStatus::Processing => &[ApprovalStatus::Approved, ApprovalStatus::Rejected],
            ApprovalStatus::Approved => &[ApprovalStatus::Draft],
            ApprovalStatus::Rejected => &[ApprovalStatus::Draft],
        }
    }

    /// `true` iff `to` is a direct successor of `self` in the table.
    pub fn can_transition_to(self, to: ApprovalStatus) -> bool {
        self.next_states().contains(&to)
    }

    /// Work is in flight (submitted or processing).
    pub fn is_processing(self) -> bool {
        matches!(self, ApprovalStatus::Submitted | ApprovalStatus::Processing)
    }

    /// The field is waiting on the user (draft or rejected).
    pub fn needs_user_action(self) -> bool {
        matches!(self, ApprovalStatus::Draft | ApprovalStatus::Rejected)
    }

    /// Only an approved field unlocks the next stage.
    pub fn is_ready_for_next(self) -> bool {
        self == ApprovalStatus::Approved
    }

    /// Actions a caller may take from this status, one per outgoing edge.
    pub fn available_actions(self) -> Vec<ApprovalAction> {
        self.next_states()
            .iter()
            .filter_map(|&to| ApprovalAction::for_transition(self, to))
            .collect()
    }
}

/// Free-function form of [`ApprovalStatus::can_transition_to`].
pub fn is_valid_transition(from: ApprovalStatus, to: ApprovalStatus) -> bool {
    from.can_transition_to(to)
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApprovalStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ApprovalStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Invalid approval status '{s}'. Must be one of: draft, submitted, processing, approved, rejected"
                ))
            })
    }
}

/// Shortest sequence of legal hops from `from` to `to`.
///
/// The returned path excludes `from` and ends with `to`. It is empty when
/// `from == to`, and `None` when `to` is unreachable.
pub fn transition_path(from: ApprovalStatus, to: ApprovalStatus) -> Option<Vec<ApprovalStatus>> {
    if from == to {
        return Some(Vec::new());
    }

    let index = |s: ApprovalStatus| ApprovalStatus::ALL.iter().position(|&x| x == s);
    let mut previous: [Option<ApprovalStatus>; 5] = [None; 5];
    let mut visited = [false; 5];
    let mut queue = VecDeque::from([from]);
    visited[index(from)?] = true;

    while let Some(current) = queue.pop_front() {
        for &next in current.next_states() {
            let i = index(next)?;
            if visited[i] {
                continue;
            }
            visited[i] = true;
            previous[i] = Some(current);
            if next == to {
                let mut path = vec![to];
                let mut cursor = current;
                while cursor != from {
                    path.push(cursor);
                    cursor = previous[index(cursor)?]?;
                }
                path.reverse();
                return Some(path);
            }
            queue.push_back(next);
        }
    }

    None
}

// ---------------------------------------------------------------------------
// ApprovalAction
// ---------------------------------------------------------------------------

/// A named user intent corresponding to one edge of the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalAction {
    /// draft -> submitted
    Submit,
    /// submitted -> processing
    StartProcessing,
    /// submitted -> draft
    Withdraw,
    /// processing -> approved
    Approve,
    /// processing -> rejected
    Reject,
    /// approved / rejected -> draft
    Reopen,
}

impl ApprovalAction {
    /// Name the edge `from -> to`, or `None` if the edge does not exist.
    pub fn for_transition(from: ApprovalStatus, to: ApprovalStatus) -> Option<Self> {
        if !from.can_transition_to(to) {
            return None;
        }
        let action = match (from, to) {
            (_, ApprovalStatus::Submitted) => ApprovalAction::Submit,
            (_, ApprovalStatus::Processing) => ApprovalAction::StartProcessing,
            (ApprovalStatus::Submitted, ApprovalStatus::Draft) => ApprovalAction::Withdraw,
            (_, ApprovalStatus::Approved) => ApprovalAction::Approve,
            (_, ApprovalStatus::Rejected) => ApprovalAction::Reject,
            (_, ApprovalStatus::Draft) => ApprovalAction::Reopen,
        };
        Some(action)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ApprovalAction::Submit => "submit",
            ApprovalAction::StartProcessing => "start_processing",
            ApprovalAction::Withdraw => "withdraw",
            ApprovalAction::Approve => "approve",
            ApprovalAction::Reject => "reject",
            ApprovalAction::Reopen => "reopen",
        }
    }
}

// ---------------------------------------------------------------------------
// Legacy four-value view
// ---------------------------------------------------------------------------

/// Narrower status vocabulary still expected by some collaborators.
///
/// It has no submitted/processing granularity; in-flight work is reported
/// as `Regenerating`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegacyApprovalStatus {
    Draft,
    Approved,
    Rejected,
    Regenerating,
}

/// Project a canonical status onto the legacy view.
pub fn to_legacy(status: ApprovalStatus) -> LegacyApprovalStatus {
    match status {
        ApprovalStatus::Draft => LegacyApprovalStatus::Draft,
        ApprovalStatus::Submitted | ApprovalStatus::Processing => {
            LegacyApprovalStatus::Regenerating
        }
        ApprovalStatus::Approved => LegacyApprovalStatus::Approved,
        ApprovalStatus::Rejected => LegacyApprovalStatus::Rejected,
    }
}

/// Lift a legacy status into the canonical enum. `Regenerating` maps to
/// `Processing`, the furthest in-flight state.
pub fn from_legacy(status: LegacyApprovalStatus) -> ApprovalStatus {
    match status {
        LegacyApprovalStatus::Draft => ApprovalStatus::Draft,
        LegacyApprovalStatus::Approved => ApprovalStatus::Approved,
        LegacyApprovalStatus::Rejected => ApprovalStatus::Rejected,
        LegacyApprovalStatus::Regenerating => ApprovalStatus::Processing,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    use ApprovalStatus::*;

    const TABLE: &[(ApprovalStatus, ApprovalStatus)] = &[
        (Draft, Submitted),
        (Submitted, Processing),
        (Submitted, Draft),
        (Processing, Approved),
        (Processing, Rejected),
        (Approved, Draft),
        (Rejected, Draft),
    ];

    #[test]
    fn transition_closure_matches_table_exactly() {
        for from in ApprovalStatus::ALL {
            for to in ApprovalStatus::ALL {
                let expected = TABLE.contains(&(from, to));
                assert_eq!(
                    is_valid_transition(from, to),
                    expected,
                    "{from} -> {to} should be {expected}"
                );
            }
        }
    }

    #[test]
    fn no_self_loops() {
        for status in ApprovalStatus::ALL {
            assert!(!is_valid_transition(status, status), "{status} self-loop");
        }
    }

    #[test]
    fn predicates() {
        assert!(Submitted.is_processing());
        assert!(Processing.is_processing());
        assert!(!Draft.is_processing());

        assert!(Draft.needs_user_action());
        assert!(Rejected.needs_user_action());
        assert!(!Approved.needs_user_action());

        assert!(Approved.is_ready_for_next());
        for status in [Draft, Submitted, Processing, Rejected] {
            assert!(!status.is_ready_for_next());
        }
    }

    #[test]
    fn available_actions_follow_outgoing_edges() {
        assert_eq!(Draft.available_actions(), vec![ApprovalAction::Submit]);
        assert_eq!(
            Submitted.available_actions(),
            vec![ApprovalAction::StartProcessing, ApprovalAction::Withdraw]
        );
        assert_eq!(
            Processing.available_actions(),
            vec![ApprovalAction::Approve, ApprovalAction::Reject]
        );
        assert_eq!(Approved.available_actions(), vec![ApprovalAction::Reopen]);
        assert_eq!(Rejected.available_actions(), vec![ApprovalAction::Reopen]);
    }

    #[test]
    fn action_for_missing_edge_is_none() {
        assert_eq!(ApprovalAction::for_transition(Draft, Approved), None);
    }

    #[test]
    fn parse_round_trips_and_rejects_unknown() {
        for status in ApprovalStatus::ALL {
            assert_eq!(status.as_str().parse::<ApprovalStatus>().unwrap(), status);
        }
        assert_matches!("regenerating".parse::<ApprovalStatus>(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn path_from_draft_to_processing() {
        assert_eq!(transition_path(Draft, Processing), Some(vec![Submitted, Processing]));
    }

    #[test]
    fn path_from_rejected_to_processing_goes_through_draft() {
        assert_eq!(
            transition_path(Rejected, Processing),
            Some(vec![Draft, Submitted, Processing])
        );
    }

    #[test]
    fn path_to_self_is_empty() {
        assert_eq!(transition_path(Approved, Approved), Some(vec![]));
    }

    #[test]
    fn every_path_hop_is_legal() {
        for from in ApprovalStatus::ALL {
            for to in ApprovalStatus::ALL {
                let path = transition_path(from, to).expect("graph is strongly connected");
                let mut cursor = from;
                for hop in path {
                    assert!(is_valid_transition(cursor, hop));
                    cursor = hop;
                }
                assert_eq!(cursor, to);
            }
        }
    }

    #[test]
    fn legacy_mapping_collapses_in_flight_states() {
        assert_eq!(to_legacy(Submitted), LegacyApprovalStatus::Regenerating);
        assert_eq!(to_legacy(Processing), LegacyApprovalStatus::Regenerating);
        assert_eq!(from_legacy(LegacyApprovalStatus::Regenerating), Processing);
    }

    #[test]
    fn legacy_round_trip_is_stable_on_legacy_values() {
        for legacy in [
            LegacyApprovalStatus::Draft,
            LegacyApprovalStatus::Approved,
            LegacyApprovalStatus::Rejected,
            LegacyApprovalStatus::Regenerating,
        ] {
            assert_eq!(to_legacy(from_legacy(legacy)), legacy);
        }
    }
}
