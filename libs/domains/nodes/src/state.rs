//! Central transition table for the dedicated-node state machine.
//!
//! Every status write checks here first; an edge not in the table is an
//! `InvalidState` error, never a silent write.

use crate::error::NodeError;
use crate::models::NodeStatus;

/// User-driven node actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeAction {
    Start,
    Stop,
    Reboot,
    Delete,
}

impl std::fmt::Display for NodeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NodeAction::Start => "start",
            NodeAction::Stop => "stop",
            NodeAction::Reboot => "reboot",
            NodeAction::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// Whether `from → to` is a legal edge.
pub fn transition_allowed(from: NodeStatus, to: NodeStatus) -> bool {
    use NodeStatus::*;

    match (from, to) {
        (Provisioning, Ready) => true,
        (Ready, Stopping) | (Ready, Rebooting) | (Ready, Deleting) => true,
        (Stopping, Stopped) => true,
        (Stopped, Starting) => true,
        (Starting, Ready) => true,
        (Rebooting, Ready) => true,
        (Deleting, Deleted) => true,
        (Failed, Deleting) => true,
        // Unrecoverable errors force any non-terminal state to failed
        (from, Failed) => !from.is_terminal(),
        _ => false,
    }
}

/// The transient state an action moves a node into.
///
/// `Ok(None)` means the action is a no-op in the current state (starting an
/// already-running node).
pub fn action_transition(
    current: NodeStatus,
    action: NodeAction,
) -> Result<Option<NodeStatus>, NodeError> {
    use NodeStatus::*;

    let target = match (current, action) {
        (Ready, NodeAction::Start) => None,
        (Ready, NodeAction::Stop) => Some(Stopping),
        (Ready, NodeAction::Reboot) => Some(Rebooting),
        (Ready, NodeAction::Delete) => Some(Deleting),
        (Stopped, NodeAction::Start) => Some(Starting),
        (Failed, NodeAction::Delete) => Some(Deleting),
        (current, action) => {
            return Err(NodeError::InvalidState(format!(
                "cannot {} a node in state '{}'",
                action, current
            )))
        }
    };
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use NodeStatus::*;

    #[test]
    fn test_legal_edges() {
        let legal = [
            (Provisioning, Ready),
            (Provisioning, Failed),
            (Ready, Stopping),
            (Ready, Rebooting),
            (Ready, Deleting),
            (Stopping, Stopped),
            (Stopping, Failed),
            (Stopped, Starting),
            (Starting, Ready),
            (Starting, Failed),
            (Rebooting, Ready),
            (Rebooting, Failed),
            (Deleting, Deleted),
            (Failed, Deleting),
        ];
        for (from, to) in legal {
            assert!(transition_allowed(from, to), "{from} -> {to} should be legal");
        }
    }

    #[test]
    fn test_illegal_edges() {
        let illegal = [
            (Ready, Starting),
            (Stopped, Stopping),
            (Deleted, Deleting),
            (Deleted, Failed),
            (Provisioning, Stopped),
            (Stopping, Ready),
        ];
        for (from, to) in illegal {
            assert!(!transition_allowed(from, to), "{from} -> {to} should be illegal");
        }
    }

    #[test]
    fn test_force_failed_from_any_non_terminal() {
        for from in [Provisioning, Ready, Starting, Stopping, Stopped, Rebooting, Deleting] {
            assert!(transition_allowed(from, Failed));
        }
        assert!(!transition_allowed(Deleted, Failed));
    }

    #[test]
    fn test_start_on_ready_is_noop() {
        assert_eq!(action_transition(Ready, NodeAction::Start).unwrap(), None);
    }

    #[test]
    fn test_actions_map_to_transients() {
        assert_eq!(
            action_transition(Ready, NodeAction::Stop).unwrap(),
            Some(Stopping)
        );
        assert_eq!(
            action_transition(Stopped, NodeAction::Start).unwrap(),
            Some(Starting)
        );
        assert_eq!(
            action_transition(Failed, NodeAction::Delete).unwrap(),
            Some(Deleting)
        );
    }

    #[test]
    fn test_illegal_actions_fail_invalid_state() {
        assert!(matches!(
            action_transition(Stopped, NodeAction::Stop),
            Err(NodeError::InvalidState(_))
        ));
        assert!(matches!(
            action_transition(Provisioning, NodeAction::Reboot),
            Err(NodeError::InvalidState(_))
        ));
        assert!(matches!(
            action_transition(Deleted, NodeAction::Delete),
            Err(NodeError::InvalidState(_))
        ));
    }
}
