//! Entries of the game action log.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::game::{Side, TimeValue};

/// Category of a log entry; part of the persisted wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Points awarded through the score catalog.
    Score,
    /// Infraction from the violation catalog.
    Violation,
    /// Timeout charged to a side.
    Timeout,
    /// Roster change.
    Substitution,
    /// Neutral marker appended when a period ends.
    PeriodEnd,
    /// Entry from the custom event catalog.
    Custom,
}

/// Per-side score delta.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreChange {
    /// Delta for side A.
    #[serde(rename = "A")]
    pub a: i32,
    /// Delta for side B.
    #[serde(rename = "B")]
    pub b: i32,
}

impl ScoreChange {
    /// Delta for `side`.
    pub fn get(&self, side: Side) -> i32 {
        match side {
            Side::A => self.a,
            Side::B => self.b,
        }
    }

    /// Add `points` to the delta of `side`.
    pub fn add(&mut self, side: Side, points: i32) {
        match side {
            Side::A => self.a += points,
            Side::B => self.b += points,
        }
    }

    /// Whether neither side's score moves.
    pub fn is_empty(&self) -> bool {
        self.a == 0 && self.b == 0
    }
}

/// Where a stat delta was booked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "target", rename_all = "camelCase")]
pub enum StatTarget {
    /// Team stat sheet.
    Team,
    /// A player's stat sheet.
    #[serde(rename_all = "camelCase")]
    Player {
        /// Player identifier.
        player_id: String,
    },
}

/// A stat delta applied by an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatChange {
    /// Side owning the sheet.
    pub side: Side,
    /// Sheet the delta was applied to.
    #[serde(flatten)]
    pub target: StatTarget,
    /// Stat identifier.
    pub stat: String,
    /// Applied delta.
    pub delta: i64,
}

/// Effects an action had when it was applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    /// Score delta per side.
    pub score_change: ScoreChange,
    /// Possession changed hands.
    #[serde(default)]
    pub possession_change: bool,
    /// Clocks were stopped.
    #[serde(default)]
    pub clock_stop: bool,
    /// Stat deltas booked.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stat_changes: Vec<StatChange>,
}

/// One entry of the append-only action log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameAction {
    /// Entry identifier.
    pub id: Uuid,
    /// Wall-clock time of the entry, epoch milliseconds.
    pub timestamp: u64,
    /// Entry category.
    #[serde(rename = "type")]
    pub kind: ActionKind,
    /// Acting side; neutral entries such as `period_end` have none.
    #[serde(rename = "team", default)]
    pub side: Option<Side>,
    /// Acting player.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<String>,
    /// Acting player's name at the time of the action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_name: Option<String>,
    /// Catalog identifier (score, violation or event id).
    pub action: String,
    /// Point value, penalty value or timeouts charged.
    pub value: i32,
    /// Period the action happened in.
    pub period: u32,
    /// Game clock when the action happened.
    pub game_time: TimeValue,
    /// Applied effects.
    pub result: ActionResult,
    /// Free notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Tombstone set by undo.
    #[serde(default)]
    pub undone: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_entries_use_the_document_field_names() {
        let action = GameAction {
            id: Uuid::nil(),
            timestamp: 42,
            kind: ActionKind::PeriodEnd,
            side: None,
            player_id: None,
            player_name: None,
            action: "period_end".into(),
            value: 0,
            period: 2,
            game_time: TimeValue::default(),
            result: ActionResult {
                clock_stop: true,
                ..ActionResult::default()
            },
            notes: None,
            undone: false,
        };

        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "period_end");
        assert_eq!(json["team"], serde_json::Value::Null);
        assert_eq!(json["gameTime"]["minutes"], 0);
        assert_eq!(json["result"]["scoreChange"], serde_json::json!({ "A": 0, "B": 0 }));
        assert_eq!(json["result"]["clockStop"], true);
    }

    #[test]
    fn player_stat_changes_flatten_their_target() {
        let change = StatChange {
            side: Side::B,
            target: StatTarget::Player {
                player_id: "p7".into(),
            },
            stat: "fouls".into(),
            delta: 1,
        };

        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "side": "B",
                "target": "player",
                "playerId": "p7",
                "stat": "fouls",
                "delta": 1
            })
        );
        let back: StatChange = serde_json::from_value(json).unwrap();
        assert_eq!(back, change);
    }
}
