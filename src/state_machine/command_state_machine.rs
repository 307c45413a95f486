use super::{
    errors::{StateMachineError, StateMachineResult},
    events::CommandEvent,
    states::CommandState,
};

/// Determine the next command state for an event.
///
/// Every transition out of `Completed` is rejected; the caller treats that as
/// "command is inert" and drops the event.
pub fn determine_target_state(
    current_state: CommandState,
    event: &CommandEvent,
) -> StateMachineResult<CommandState> {
    let target = match (current_state, event) {
        (CommandState::Pending, CommandEvent::Execute) => CommandState::Connecting,
        // session was already connected when the command got the slot
        (CommandState::Pending, CommandEvent::SessionConnected) => CommandState::Executing,
        (CommandState::Connecting, CommandEvent::SessionConnected) => CommandState::Executing,

        (CommandState::Connecting, CommandEvent::SessionFailed(_)) => CommandState::Completed,
        (CommandState::Executing, CommandEvent::OperationSucceeded) => CommandState::Completed,
        (CommandState::Executing, CommandEvent::OperationFailed(_)) => CommandState::Completed,
        (CommandState::Connecting | CommandState::Executing, CommandEvent::TimedOut) => {
            CommandState::Completed
        }

        (from_state, _) => {
            return Err(StateMachineError::InvalidTransition {
                from: from_state.to_string(),
                event: event.event_type().to_string(),
            })
        }
    };

    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let connecting =
            determine_target_state(CommandState::Pending, &CommandEvent::Execute).unwrap();
        assert_eq!(connecting, CommandState::Connecting);

        let executing =
            determine_target_state(connecting, &CommandEvent::SessionConnected).unwrap();
        assert_eq!(executing, CommandState::Executing);

        let completed =
            determine_target_state(executing, &CommandEvent::OperationSucceeded).unwrap();
        assert_eq!(completed, CommandState::Completed);
    }

    #[test]
    fn test_connection_failure_completes() {
        assert_eq!(
            determine_target_state(
                CommandState::Connecting,
                &CommandEvent::SessionFailed("unreachable".to_string())
            )
            .unwrap(),
            CommandState::Completed
        );
    }

    #[test]
    fn test_already_connected_session_skips_connecting() {
        assert_eq!(
            determine_target_state(CommandState::Pending, &CommandEvent::SessionConnected)
                .unwrap(),
            CommandState::Executing
        );
    }

    #[test]
    fn test_completed_is_inert() {
        for event in [
            CommandEvent::Execute,
            CommandEvent::SessionConnected,
            CommandEvent::OperationSucceeded,
            CommandEvent::TimedOut,
        ] {
            assert!(determine_target_state(CommandState::Completed, &event).is_err());
        }
    }

    #[test]
    fn test_invalid_transitions() {
        // operation results only make sense while executing
        assert!(
            determine_target_state(CommandState::Connecting, &CommandEvent::OperationSucceeded)
                .is_err()
        );
        // a pending command has no timer running
        assert!(determine_target_state(CommandState::Pending, &CommandEvent::TimedOut).is_err());

        let err = determine_target_state(CommandState::Executing, &CommandEvent::Execute)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid command transition from executing on event execute"
        );
    }
}
