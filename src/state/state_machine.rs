use thiserror::Error;

use crate::state::game::GameStatus;

/// Lifecycle events a scorer can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Begin play from setup.
    Start,
    /// Suspend live play.
    Pause,
    /// Continue after a pause.
    Resume,
    /// Finish the game.
    Complete,
    /// Abandon the game.
    Cancel,
}

/// Error returned when a lifecycle event does not apply to the current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while {from}")]
pub struct InvalidTransition {
    /// Status the game was in when the event was received.
    pub from: GameStatus,
    /// The rejected event.
    pub event: LifecycleEvent,
}

/// Resolve the status reached by applying `event` to `from`.
///
/// `setup -> live <-> paused -> completed`, with `cancelled` reachable from every
/// status before completion. Completed and cancelled games are terminal.
pub fn compute_transition(
    from: GameStatus,
    event: LifecycleEvent,
) -> Result<GameStatus, InvalidTransition> {
    use GameStatus::*;
    use LifecycleEvent::*;

    let next = match (from, event) {
        (Setup, Start) => Live,
        (Live, Pause) => Paused,
        (Paused, Resume) => Live,
        (Live | Paused, Complete) => Completed,
        (Setup | Live | Paused, Cancel) => Cancelled,
        _ => return Err(InvalidTransition { from, event }),
    };

    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(status: GameStatus, event: LifecycleEvent) -> GameStatus {
        compute_transition(status, event).unwrap()
    }

    #[test]
    fn full_happy_path_through_game() {
        let mut status = GameStatus::Setup;
        status = apply(status, LifecycleEvent::Start);
        assert_eq!(status, GameStatus::Live);
        status = apply(status, LifecycleEvent::Pause);
        assert_eq!(status, GameStatus::Paused);
        status = apply(status, LifecycleEvent::Resume);
        assert_eq!(status, GameStatus::Live);
        status = apply(status, LifecycleEvent::Complete);
        assert_eq!(status, GameStatus::Completed);
    }

    #[test]
    fn paused_games_can_be_completed_directly() {
        assert_eq!(
            apply(GameStatus::Paused, LifecycleEvent::Complete),
            GameStatus::Completed
        );
    }

    #[test]
    fn cancel_is_allowed_before_completion_only() {
        for status in [GameStatus::Setup, GameStatus::Live, GameStatus::Paused] {
            assert_eq!(apply(status, LifecycleEvent::Cancel), GameStatus::Cancelled);
        }
        for status in [GameStatus::Completed, GameStatus::Cancelled] {
            assert!(compute_transition(status, LifecycleEvent::Cancel).is_err());
        }
    }

    #[test]
    fn rejects_invalid_transitions() {
        let err = compute_transition(GameStatus::Setup, LifecycleEvent::Pause).unwrap_err();
        assert_eq!(err.from, GameStatus::Setup);
        assert_eq!(err.event, LifecycleEvent::Pause);

        assert!(compute_transition(GameStatus::Live, LifecycleEvent::Start).is_err());
        assert!(compute_transition(GameStatus::Live, LifecycleEvent::Resume).is_err());
        assert!(compute_transition(GameStatus::Setup, LifecycleEvent::Complete).is_err());
        assert!(compute_transition(GameStatus::Completed, LifecycleEvent::Start).is_err());
    }
}
