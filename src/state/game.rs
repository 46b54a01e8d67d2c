//! Sport-agnostic game document: the aggregate that engines mutate and stores persist.

use std::{
    fmt,
    time::{SystemTime, UNIX_EPOCH},
};

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    sports::SportRules,
    state::{
        action::{ActionKind, GameAction},
        stats::StatSheet,
    },
};

/// Symbols used for join codes; `0/O` and `1/I` are left out.
pub const GAME_CODE_ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
/// Number of symbols in a join code.
pub const GAME_CODE_LENGTH: usize = 6;

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}

/// One of the two competing sides. Sides are fixed for the whole game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Side {
    /// Home / first listed side.
    A,
    /// Away / second listed side.
    B,
}

impl Side {
    /// Both sides, in display order.
    pub const BOTH: [Side; 2] = [Side::A, Side::B];

    /// The other side.
    pub fn opponent(self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::A => f.write_str("A"),
            Side::B => f.write_str("B"),
        }
    }
}

/// Short join code shared with scorers and viewers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameCode(String);

/// Raised when a string cannot be used as a join code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid game code `{0}`: expected {GAME_CODE_LENGTH} characters from the join alphabet")]
pub struct InvalidGameCode(pub String);

impl GameCode {
    /// Draw a random code from [`GAME_CODE_ALPHABET`].
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let code = (0..GAME_CODE_LENGTH)
            .map(|_| char::from(GAME_CODE_ALPHABET[rng.random_range(0..GAME_CODE_ALPHABET.len())]))
            .collect();
        Self(code)
    }

    /// Parse user input, accepting lowercase and surrounding whitespace.
    pub fn parse(input: &str) -> Result<Self, InvalidGameCode> {
        let normalized = input.trim().to_ascii_uppercase();
        let valid = normalized.len() == GAME_CODE_LENGTH
            && normalized
                .bytes()
                .all(|symbol| GAME_CODE_ALPHABET.contains(&symbol));
        if valid {
            Ok(Self(normalized))
        } else {
            Err(InvalidGameCode(input.to_owned()))
        }
    }

    /// Borrow the code as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle status of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    /// Created, rosters may still change.
    Setup,
    /// In progress; the only status accepting scoring and clock changes.
    Live,
    /// Suspended by the scorer.
    Paused,
    /// Finished.
    Completed,
    /// Abandoned before completion.
    Cancelled,
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            GameStatus::Setup => "setup",
            GameStatus::Live => "live",
            GameStatus::Paused => "paused",
            GameStatus::Completed => "completed",
            GameStatus::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// Clock reading with tenth-of-second precision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TimeValue {
    /// Whole minutes.
    pub minutes: u32,
    /// Seconds, `0..60`.
    pub seconds: u32,
    /// Tenths of a second, `0..10`.
    #[serde(default)]
    pub tenths: u32,
}

impl TimeValue {
    /// A reading of exactly `minutes`.
    pub fn from_minutes(minutes: u32) -> Self {
        Self {
            minutes,
            seconds: 0,
            tenths: 0,
        }
    }

    /// Build a reading from a total count of tenths.
    pub fn from_tenths(total: u64) -> Self {
        let total_seconds = total / 10;
        Self {
            minutes: u32::try_from(total_seconds / 60).unwrap_or(u32::MAX),
            seconds: (total_seconds % 60) as u32,
            tenths: (total % 10) as u32,
        }
    }

    /// Total tenths represented by the reading (fields out of range are carried).
    pub fn as_tenths(&self) -> u64 {
        (u64::from(self.minutes) * 60 + u64::from(self.seconds)) * 10 + u64::from(self.tenths)
    }

    /// Whether the reading is 0:00.0.
    pub fn is_zero(&self) -> bool {
        self.as_tenths() == 0
    }

    /// Carry out-of-range seconds and tenths into the larger units.
    pub fn normalized(&self) -> Self {
        Self::from_tenths(self.as_tenths())
    }
}

impl fmt::Display for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}.{}", self.minutes, self.seconds, self.tenths)
    }
}

/// Primary and secondary clocks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockState {
    /// Primary game clock.
    pub game: TimeValue,
    /// Whether the game clock is running.
    pub game_running: bool,
    /// Secondary clock (shot clock, raid clock) in whole seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<u32>,
    /// Whether the secondary clock is running.
    #[serde(default)]
    pub secondary_running: bool,
}

impl ClockState {
    /// Stop both clocks.
    pub fn stop_all(&mut self) {
        self.game_running = false;
        self.secondary_running = false;
    }
}

/// Live state of play.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    /// Current period, 1-based; overtime periods continue the count.
    pub current_period: u32,
    /// Clock readings.
    pub clock: ClockState,
    /// Side in possession, for sports that track it.
    #[serde(default)]
    pub possession: Option<Side>,
    /// Set once the current period has ended, cleared when the next one starts.
    #[serde(default)]
    pub period_over: bool,
    /// Sport-specific scratch values.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub custom: Map<String, Value>,
}

/// One roster entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    /// Identifier, unique within the team.
    pub id: String,
    /// Jersey number as printed.
    pub number: String,
    /// Display name.
    pub name: String,
    /// Playing position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    /// On the court/field right now.
    pub is_active: bool,
    /// Part of the starting lineup.
    pub is_starter: bool,
    /// Stats seeded from the sport's player stat definitions.
    pub stats: StatSheet,
    /// Ejected from the game.
    #[serde(default)]
    pub disqualified: bool,
    /// Flagged as injured.
    #[serde(default)]
    pub injured: bool,
}

/// One of the two sides' documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    /// Side this team plays as.
    pub id: Side,
    /// Display name.
    pub name: String,
    /// Display color (CSS color string).
    pub color: String,
    /// Optional logo URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    /// Cumulative score across all periods.
    pub score: i32,
    /// Team stats seeded from the sport's team stat definitions.
    pub stats: StatSheet,
    /// Roster in display order.
    pub players: Vec<Player>,
    /// Timeout allowance for the current period.
    pub timeouts: u32,
    /// Timeouts charged in the current period.
    pub timeouts_used: u32,
    /// Sport-specific scratch values.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub custom: Map<String, Value>,
}

impl Team {
    /// Look up a player by id.
    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|player| player.id == player_id)
    }

    /// Look up a player by id for mutation.
    pub fn player_mut(&mut self, player_id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|player| player.id == player_id)
    }

    /// Timeouts still available this period.
    pub fn timeouts_remaining(&self) -> u32 {
        self.timeouts.saturating_sub(self.timeouts_used)
    }
}

/// Both sides, keyed by their fixed identifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Teams {
    /// Side A.
    #[serde(rename = "A")]
    pub a: Team,
    /// Side B.
    #[serde(rename = "B")]
    pub b: Team,
}

impl Teams {
    /// Borrow a side's team.
    pub fn get(&self, side: Side) -> &Team {
        match side {
            Side::A => &self.a,
            Side::B => &self.b,
        }
    }

    /// Borrow a side's team mutably.
    pub fn get_mut(&mut self, side: Side) -> &mut Team {
        match side {
            Side::A => &mut self.a,
            Side::B => &mut self.b,
        }
    }
}

/// Settings fixed when the game is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSettings {
    /// Display name of the fixture.
    pub game_name: String,
    /// Venue name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    /// Scheduled start, epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<u64>,
    /// Snapshot of the sport rules in force when the game was created.
    pub rules: SportRules,
    /// Whether per-player stats are recorded.
    pub track_player_stats: bool,
    /// Whether passive viewers may follow the game.
    pub allow_spectators: bool,
    /// Whether a live stream is attached.
    pub enable_live_stream: bool,
}

/// Reference to the tournament a game belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentRef {
    /// Tournament identifier.
    pub id: String,
    /// Tournament display name.
    pub name: String,
    /// Round label, e.g. "Semi-final".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round: Option<String>,
}

/// Match officials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Officials {
    /// Referee / umpire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referee: Option<String>,
    /// Official scorer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scorer: Option<String>,
    /// Timekeeper.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer: Option<String>,
}

/// Descriptive data that never affects play.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameMetadata {
    /// Identifier of the scorer who created the game.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_id: Option<String>,
    /// Display name of that scorer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,
    /// Tournament context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tournament: Option<TournamentRef>,
    /// Officials assigned to the game.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub officials: Option<Officials>,
    /// Free tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Free notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Root aggregate persisted as a single document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    /// Document identifier.
    pub id: Uuid,
    /// Join code.
    pub code: GameCode,
    /// Sport identifier, resolved through the registry.
    pub sport: String,
    /// Lifecycle status.
    pub status: GameStatus,
    /// Creation time, epoch milliseconds.
    pub created_at: u64,
    /// Merge ordering key, epoch milliseconds.
    pub last_update: u64,
    /// Settings.
    pub settings: GameSettings,
    /// State of play.
    pub state: GameState,
    /// Sides A and B.
    pub teams: Teams,
    /// Append-only history; only the `undone` flag of an entry may change.
    pub action_log: Vec<GameAction>,
    /// Descriptive metadata.
    #[serde(default)]
    pub metadata: GameMetadata,
}

impl Game {
    /// Borrow a side's team.
    pub fn team(&self, side: Side) -> &Team {
        self.teams.get(side)
    }

    /// Borrow a side's team mutably.
    pub fn team_mut(&mut self, side: Side) -> &mut Team {
        self.teams.get_mut(side)
    }

    /// Points scored by `side` in the current period, derived from the log.
    pub fn period_score(&self, side: Side) -> i32 {
        self.score_in_period(side, self.state.current_period)
    }

    /// Points scored by `side` in `period`, derived from the log.
    pub fn score_in_period(&self, side: Side, period: u32) -> i32 {
        self.active_actions()
            .filter(|action| action.period == period)
            .map(|action| action.result.score_change.get(side))
            .sum()
    }

    /// Sum of every applied, non-undone score change for `side`.
    ///
    /// Matches `team(side).score` for any game only ever mutated by an engine.
    pub fn score_from_log(&self, side: Side) -> i32 {
        self.active_actions()
            .map(|action| action.result.score_change.get(side))
            .sum()
    }

    /// Log entries that have not been undone.
    pub fn active_actions(&self) -> impl Iterator<Item = &GameAction> {
        self.action_log.iter().filter(|action| !action.undone)
    }

    /// Number of periods already closed by a `period_end` entry.
    pub fn completed_periods(&self) -> usize {
        self.action_log
            .iter()
            .filter(|action| action.kind == ActionKind::PeriodEnd)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_use_the_join_alphabet() {
        for _ in 0..200 {
            let code = GameCode::generate();
            assert_eq!(code.as_str().len(), GAME_CODE_LENGTH);
            assert!(
                code.as_str()
                    .bytes()
                    .all(|symbol| GAME_CODE_ALPHABET.contains(&symbol))
            );
        }
    }

    #[test]
    fn alphabet_has_no_ambiguous_symbols() {
        for ambiguous in [b'0', b'O', b'1', b'I'] {
            assert!(!GAME_CODE_ALPHABET.contains(&ambiguous));
        }
        let mut sorted = GAME_CODE_ALPHABET.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 32);
    }

    #[test]
    fn parse_normalizes_case_and_rejects_foreign_symbols() {
        assert_eq!(GameCode::parse(" ab3xyz ").unwrap().as_str(), "AB3XYZ");
        assert!(GameCode::parse("AB0XYZ").is_err());
        assert!(GameCode::parse("ABCDE").is_err());
        assert!(GameCode::parse("ABCDEFG").is_err());
    }

    #[test]
    fn time_value_carries_into_larger_units() {
        let time = TimeValue {
            minutes: 1,
            seconds: 75,
            tenths: 12,
        };
        assert_eq!(
            time.normalized(),
            TimeValue {
                minutes: 2,
                seconds: 16,
                tenths: 2
            }
        );
        assert!(TimeValue::default().is_zero());
        assert_eq!(TimeValue::from_minutes(10).to_string(), "10:00.0");
    }

    #[test]
    fn opponent_is_an_involution() {
        for side in Side::BOTH {
            assert_ne!(side.opponent(), side);
            assert_eq!(side.opponent().opponent(), side);
        }
    }
}
