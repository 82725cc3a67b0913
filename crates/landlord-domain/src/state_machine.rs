use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Tenant lifecycle status. The set of legal transitions is fixed and
/// enforced centrally rather than left implicit at call sites — see
/// [`validate_transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Requested,
    Planning,
    Provisioning,
    Ready,
    Updating,
    Deleting,
    Archiving,
    Archived,
    Failed,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::Requested => "requested",
            Status::Planning => "planning",
            Status::Provisioning => "provisioning",
            Status::Ready => "ready",
            Status::Updating => "updating",
            Status::Deleting => "deleting",
            Status::Archiving => "archiving",
            Status::Archived => "archived",
            Status::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

impl Status {
    const ALL: [Status; 9] = [
        Status::Requested,
        Status::Planning,
        Status::Provisioning,
        Status::Ready,
        Status::Updating,
        Status::Deleting,
        Status::Archiving,
        Status::Archived,
        Status::Failed,
    ];

    /// Allowed `to` statuses for this `from` status.
    fn allowed_targets(self) -> &'static [Status] {
        match self {
            Status::Requested => &[Status::Provisioning, Status::Failed],
            Status::Planning => &[Status::Provisioning, Status::Failed],
            Status::Provisioning => &[Status::Ready, Status::Failed],
            Status::Ready => &[Status::Updating, Status::Deleting, Status::Archiving],
            Status::Updating => &[Status::Ready, Status::Failed],
            Status::Deleting => &[Status::Archived, Status::Failed],
            Status::Archiving => &[Status::Archived, Status::Failed],
            Status::Archived => &[],
            // Recovery only — initiated by an operator or a future retry policy, never automatically.
            Status::Failed => &[Status::Deleting, Status::Archiving],
        }
    }

    /// Whether no further transitions occur without explicit external action.
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Ready | Status::Archived | Status::Failed)
    }

    /// Whether the controller should pick this tenant up on its next poll.
    pub fn should_reconcile(self) -> bool {
        matches!(
            self,
            Status::Requested
                | Status::Planning
                | Status::Provisioning
                | Status::Updating
                | Status::Deleting
                | Status::Archiving
        )
    }

    pub fn all() -> &'static [Status] {
        &Self::ALL
    }
}

/// Validate a proposed transition against the fixed table above. Unknown
/// `from` values can't occur (the enum is exhaustive) but an unreachable
/// `to` fails exactly like any other disallowed edge.
pub fn validate_transition(from: Status, to: Status) -> Result<(), DomainError> {
    if from.allowed_targets().contains(&to) {
        Ok(())
    } else {
        Err(DomainError::InvalidTransition { from, to })
    }
}

/// The deterministic successor for simple progressions — used by the
/// controller only as a guide for terminal-success handling, never to
/// bypass `validate_transition`.
pub fn next_status(current: Status) -> Option<Status> {
    match current {
        Status::Requested | Status::Planning => Some(Status::Provisioning),
        Status::Provisioning => Some(Status::Ready),
        Status::Updating => Some(Status::Ready),
        Status::Deleting => Some(Status::Archived),
        Status::Archiving => Some(Status::Archived),
        Status::Ready | Status::Archived | Status::Failed => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses_are_ready_archived_failed() {
        for s in Status::all() {
            let expect = matches!(s, Status::Ready | Status::Archived | Status::Failed);
            assert_eq!(s.is_terminal(), expect, "{s:?}");
        }
    }

    #[test]
    fn reconcilable_statuses_exclude_terminal_ones() {
        for s in Status::all() {
            let expect = matches!(
                s,
                Status::Requested
                    | Status::Planning
                    | Status::Provisioning
                    | Status::Updating
                    | Status::Deleting
                    | Status::Archiving
            );
            assert_eq!(s.should_reconcile(), expect, "{s:?}");
        }
    }

    #[test]
    fn archived_is_fully_terminal() {
        for s in Status::all() {
            assert!(validate_transition(Status::Archived, *s).is_err());
        }
    }

    #[test]
    fn ready_allows_three_paths() {
        assert!(validate_transition(Status::Ready, Status::Updating).is_ok());
        assert!(validate_transition(Status::Ready, Status::Deleting).is_ok());
        assert!(validate_transition(Status::Ready, Status::Archiving).is_ok());
        assert!(validate_transition(Status::Ready, Status::Provisioning).is_err());
    }

    #[test]
    fn failed_recovery_only() {
        assert!(validate_transition(Status::Failed, Status::Deleting).is_ok());
        assert!(validate_transition(Status::Failed, Status::Archiving).is_ok());
        assert!(validate_transition(Status::Failed, Status::Ready).is_err());
    }

    #[test]
    fn next_status_guides_simple_progressions() {
        assert_eq!(next_status(Status::Provisioning), Some(Status::Ready));
        assert_eq!(next_status(Status::Deleting), Some(Status::Archived));
        assert_eq!(next_status(Status::Ready), None);
    }

    proptest::proptest! {
        #[test]
        fn validate_transition_never_panics(a in 0usize..9, b in 0usize..9) {
            let from = Status::all()[a];
            let to = Status::all()[b];
            let _ = validate_transition(from, to);
        }
    }
}
