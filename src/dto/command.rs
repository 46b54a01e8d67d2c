use serde::Deserialize;
use utoipa::ToSchema;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    dto::validation::validate_identifier,
    state::{
        engine::GameEngine,
        game::{Side, TimeValue},
        validation::{Unsupported, Validation},
    },
};

/// Longest clock reading a scorer may set, in minutes.
const MAX_CLOCK_MINUTES: u32 = 180;
/// Longest secondary clock reading, in seconds.
const MAX_SECONDARY_SECONDS: u32 = 3_600;
const MAX_NOTES_LEN: usize = 500;

/// Scorer command applied to an attached game, tagged by `type`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameCommand {
    /// Score a catalog action for a side.
    #[serde(rename_all = "camelCase")]
    RecordScore {
        /// Scoring side.
        side: Side,
        /// Scoring action id from the sport catalog.
        action_id: String,
        /// Player credited, when stats are tracked.
        #[serde(default)]
        player_id: Option<String>,
    },
    /// Record a catalog violation against a side.
    #[serde(rename_all = "camelCase")]
    RecordViolation {
        /// Offending side.
        side: Side,
        /// Violation id from the sport catalog.
        violation_id: String,
        /// Offending player.
        #[serde(default)]
        player_id: Option<String>,
    },
    /// Record a non-scoring catalog event.
    #[serde(rename_all = "camelCase")]
    RecordEvent {
        /// Side the event belongs to.
        side: Side,
        /// Event id from the sport catalog.
        event_id: String,
        /// Player involved.
        #[serde(default)]
        player_id: Option<String>,
        /// Free-form note kept in the action log.
        #[serde(default)]
        notes: Option<String>,
    },
    /// Spend one of a side's timeouts.
    CallTimeout {
        /// Side calling the timeout.
        side: Side,
    },
    /// Start or stop the game clock.
    ToggleGameClock,
    /// Set the game clock.
    UpdateGameTime {
        /// New clock reading.
        time: TimeValue,
    },
    /// Resets to the sport's default when `seconds` is omitted.
    ResetSecondaryClock {
        /// New reading in seconds.
        #[serde(default)]
        seconds: Option<u32>,
    },
    /// Set the secondary clock.
    UpdateSecondaryClock {
        /// New reading in seconds.
        seconds: u32,
    },
    /// Move to the next period or into overtime.
    AdvancePeriod,
    /// Hand possession to the other side.
    TogglePossession,
    /// Give possession to a side.
    SetPossession {
        /// Side taking possession.
        side: Side,
    },
    /// Take back the most recent action still in effect.
    UndoLastAction,
    /// Leave `setup` and go live.
    Start,
    /// Suspend a live game.
    Pause,
    /// Resume a paused game.
    Resume,
    /// Finish the game.
    EndGame,
    /// Abandon the game.
    Cancel,
}

impl GameCommand {
    /// Name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            GameCommand::RecordScore { .. } => "record_score",
            GameCommand::RecordViolation { .. } => "record_violation",
            GameCommand::RecordEvent { .. } => "record_event",
            GameCommand::CallTimeout { .. } => "call_timeout",
            GameCommand::ToggleGameClock => "toggle_game_clock",
            GameCommand::UpdateGameTime { .. } => "update_game_time",
            GameCommand::ResetSecondaryClock { .. } => "reset_secondary_clock",
            GameCommand::UpdateSecondaryClock { .. } => "update_secondary_clock",
            GameCommand::AdvancePeriod => "advance_period",
            GameCommand::TogglePossession => "toggle_possession",
            GameCommand::SetPossession { .. } => "set_possession",
            GameCommand::UndoLastAction => "undo_last_action",
            GameCommand::Start => "start",
            GameCommand::Pause => "pause",
            GameCommand::Resume => "resume",
            GameCommand::EndGame => "end_game",
            GameCommand::Cancel => "cancel",
        }
    }

    /// Run the command against `engine`.
    pub fn apply(self, engine: &mut GameEngine) -> Result<Validation, Unsupported> {
        let outcome = match self {
            GameCommand::RecordScore {
                side,
                action_id,
                player_id,
            } => engine.record_score(side, &action_id, player_id.as_deref()),
            GameCommand::RecordViolation {
                side,
                violation_id,
                player_id,
            } => engine.record_violation(side, &violation_id, player_id.as_deref()),
            GameCommand::RecordEvent {
                side,
                event_id,
                player_id,
                notes,
            } => engine.record_event(side, &event_id, player_id.as_deref(), notes),
            GameCommand::CallTimeout { side } => engine.call_timeout(side),
            GameCommand::ToggleGameClock => engine.toggle_game_clock()?,
            GameCommand::UpdateGameTime { time } => engine.update_game_time(time)?,
            GameCommand::ResetSecondaryClock { seconds } => engine.reset_secondary_clock(seconds)?,
            GameCommand::UpdateSecondaryClock { seconds } => {
                engine.update_secondary_clock(seconds)?
            }
            GameCommand::AdvancePeriod => engine.advance_period(),
            GameCommand::TogglePossession => engine.toggle_possession()?,
            GameCommand::SetPossession { side } => engine.set_possession(side)?,
            GameCommand::UndoLastAction => engine.undo_last_action(),
            GameCommand::Start => engine.start(),
            GameCommand::Pause => engine.pause(),
            GameCommand::Resume => engine.resume(),
            GameCommand::EndGame => engine.end_game(),
            GameCommand::Cancel => engine.cancel(),
        };
        Ok(outcome)
    }
}

impl Validate for GameCommand {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        match self {
            GameCommand::RecordScore {
                action_id: id,
                player_id,
                ..
            }
            | GameCommand::RecordViolation {
                violation_id: id,
                player_id,
                ..
            } => {
                check_ids(&mut errors, id, player_id.as_deref());
            }
            GameCommand::RecordEvent {
                event_id,
                player_id,
                notes,
                ..
            } => {
                check_ids(&mut errors, event_id, player_id.as_deref());
                if notes.as_ref().is_some_and(|notes| notes.len() > MAX_NOTES_LEN) {
                    errors.add("notes", out_of_range("notes", MAX_NOTES_LEN as u32));
                }
            }
            GameCommand::UpdateGameTime { time } => {
                if time.as_tenths() > u64::from(MAX_CLOCK_MINUTES) * 600 {
                    errors.add("time", out_of_range("time", MAX_CLOCK_MINUTES));
                }
            }
            GameCommand::ResetSecondaryClock {
                seconds: Some(seconds),
            }
            | GameCommand::UpdateSecondaryClock { seconds } => {
                if *seconds > MAX_SECONDARY_SECONDS {
                    errors.add("seconds", out_of_range("seconds", MAX_SECONDARY_SECONDS));
                }
            }
            _ => {}
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn check_ids(errors: &mut ValidationErrors, id: &str, player_id: Option<&str>) {
    if let Err(e) = validate_identifier(id) {
        errors.add("id", e);
    }
    if let Some(player_id) = player_id {
        if let Err(e) = validate_identifier(player_id) {
            errors.add("player_id", e);
        }
    }
}

fn out_of_range(field: &str, max: u32) -> ValidationError {
    let mut err = ValidationError::new("range");
    err.message = Some(format!("{field} must not exceed {max}").into());
    err
}
