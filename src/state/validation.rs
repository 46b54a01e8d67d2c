//! Outcome values shared by the engine and sport rulebooks.

use thiserror::Error;

use crate::state::{
    game::{GameStatus, Side},
    state_machine::InvalidTransition,
};

/// Outcome of an engine operation or a rulebook check.
///
/// Rejections are ordinary values: nothing was mutated and no snapshot was produced.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    /// The operation was applied.
    Valid,
    /// The operation was refused.
    Invalid(Rejection),
}

impl Validation {
    /// Refusal carrying a rulebook reason.
    pub fn rule(reason: impl Into<String>) -> Self {
        Validation::Invalid(Rejection::Rule(reason.into()))
    }

    /// Whether the operation was applied.
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid)
    }

    /// The rejection, if any.
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Validation::Valid => None,
            Validation::Invalid(rejection) => Some(rejection),
        }
    }

    /// Convert into a `Result` so callers can use `?`.
    pub fn into_result(self) -> Result<(), Rejection> {
        match self {
            Validation::Valid => Ok(()),
            Validation::Invalid(rejection) => Err(rejection),
        }
    }
}

impl From<Rejection> for Validation {
    fn from(rejection: Rejection) -> Self {
        Validation::Invalid(rejection)
    }
}

/// Reason an operation was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// The catalog has no entry with this id.
    #[error("unknown action `{0}`")]
    UnknownAction(String),
    /// The side has no player with this id.
    #[error("unknown player `{player_id}` on side {side}")]
    UnknownPlayer {
        /// Side searched.
        side: Side,
        /// Requested player.
        player_id: String,
    },
    /// A player with this id already exists on the side.
    #[error("player `{player_id}` already exists on side {side}")]
    DuplicatePlayer {
        /// Side searched.
        side: Side,
        /// Requested player.
        player_id: String,
    },
    /// Scoring and clock changes require a live game.
    #[error("game is not live (status: {0})")]
    GameNotLive(GameStatus),
    /// Rosters are frozen once a game is over.
    #[error("game is closed (status: {0})")]
    GameClosed(GameStatus),
    /// The side has used its whole allowance.
    #[error("no timeouts remaining for side {0}")]
    NoTimeoutsRemaining(Side),
    /// No further period can be started.
    #[error("game is complete")]
    GameComplete,
    /// The log has no entry left to undo.
    #[error("no actions to undo")]
    NothingToUndo,
    /// Lifecycle event not valid from the current status.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    /// Refused by the sport's rulebook.
    #[error("{0}")]
    Rule(String),
}

impl Rejection {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Rejection::UnknownAction(_) => "unknown_action",
            Rejection::UnknownPlayer { .. } => "unknown_player",
            Rejection::DuplicatePlayer { .. } => "duplicate_player",
            Rejection::GameNotLive(_) => "game_not_live",
            Rejection::GameClosed(_) => "game_closed",
            Rejection::NoTimeoutsRemaining(_) => "no_timeouts_remaining",
            Rejection::GameComplete => "game_complete",
            Rejection::NothingToUndo => "nothing_to_undo",
            Rejection::InvalidTransition(_) => "invalid_transition",
            Rejection::Rule(_) => "rule_violation",
        }
    }
}

/// Structural misuse: the operation does not exist for the configured sport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Unsupported {
    /// The sport runs without a game clock.
    #[error("sport `{sport}` has no game clock")]
    NoGameClock {
        /// Sport identifier.
        sport: String,
    },
    /// The sport runs without a secondary clock.
    #[error("sport `{sport}` has no secondary clock")]
    NoSecondaryClock {
        /// Sport identifier.
        sport: String,
    },
    /// The sport does not track possession.
    #[error("sport `{sport}` does not track possession")]
    NoPossessionTracking {
        /// Sport identifier.
        sport: String,
    },
}
