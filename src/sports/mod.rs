//! Sport plugin contract: declarative rules and catalogs plus a pure rulebook.

pub mod badminton;
pub mod basketball;
pub mod kabaddi;
pub mod registry;

use std::{collections::HashSet, fmt, sync::Arc};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Map;
use uuid::Uuid;

use crate::state::{
    action::GameAction,
    game::{
        ClockState, Game, GameCode, GameMetadata, GameSettings, GameState, GameStatus, Player,
        Side, Team, Teams, TimeValue, now_millis,
    },
    stats::{StatDefinition, StatKind, StatSheet},
    validation::Validation,
};

pub use registry::{RegistryError, SportRegistry};

/// Descriptive data shown when picking a sport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SportMeta {
    /// Stable identifier, stored on every game.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Emoji or icon name.
    pub icon: String,
    /// One-line description.
    pub description: String,
    /// Accent color.
    pub color: String,
    /// Disabled sports cannot be resolved by the registry.
    pub enabled: bool,
}

/// Unit a sport divides play into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodKind {
    /// Labelled `Q1`..`Q4`.
    Quarter,
    /// Labelled `Half 1`, `Half 2`.
    Half,
    /// Labelled `Set 1`, `Set 2`, ...
    Set,
    /// Labelled `Period 1`, ...
    Period,
    /// Labelled `Inning 1`, ...
    Inning,
}

/// How play is divided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodConfig {
    /// Period unit.
    #[serde(rename = "type")]
    pub kind: PeriodKind,
    /// Regulation periods.
    pub count: u32,
    /// Minutes per period; zero for untimed sports.
    pub duration: u32,
}

impl PeriodConfig {
    /// Human label for period `n`; periods past `count` are numbered as overtime.
    pub fn label(&self, n: u32) -> String {
        if n > self.count && self.kind != PeriodKind::Set {
            return format!("OT{}", n - self.count);
        }
        match self.kind {
            PeriodKind::Quarter => format!("Q{n}"),
            PeriodKind::Half => format!("Half {n}"),
            PeriodKind::Set => format!("Set {n}"),
            PeriodKind::Period => format!("Period {n}"),
            PeriodKind::Inning => format!("Inning {n}"),
        }
    }
}

/// Direction the game clock runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockDirection {
    /// Counts down to 0:00.0.
    Down,
    /// Counts up from 0:00.0.
    Up,
}

/// Clock setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingRules {
    /// Whether a primary game clock exists.
    pub has_game_clock: bool,
    /// Direction of the primary clock.
    pub clock_direction: ClockDirection,
    /// Whether a secondary clock exists.
    pub has_secondary_clock: bool,
    /// Secondary clock reset value, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_clock_duration: Option<u32>,
    /// Display label of the secondary clock.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_clock_label: Option<String>,
}

/// How a game is won.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WinCondition {
    /// Highest cumulative score at the end of regulation/overtime.
    HighestScore,
    /// Reach a target score first.
    FirstToScore,
    /// Win a majority of sets.
    BestOfSets,
}

/// Score thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringRules {
    /// Win condition.
    pub win_condition: WinCondition,
    /// Points needed to close a period or game.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_score: Option<i32>,
    /// Sets needed to win the game.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sets_to_win: Option<i64>,
    /// Lead required when reaching the target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub win_by_margin: Option<i32>,
    /// Hard cap that closes a period regardless of margin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_score: Option<i32>,
}

/// Roster and discipline limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamRules {
    /// Minimum roster size.
    pub min_players: u32,
    /// Maximum roster size.
    pub max_players: u32,
    /// Whether substitutions are allowed.
    pub allow_substitutions: bool,
    /// Timeouts granted each period.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeouts_per_period: Option<u32>,
    /// Personal fouls after which a player is out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fouls: Option<i64>,
}

/// Overtime policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OvertimeRules {
    /// Whether tied games go to overtime.
    pub enabled: bool,
    /// Minutes per overtime period.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    /// Whether the first score in overtime wins.
    #[serde(default)]
    pub sudden_death: bool,
}

/// Overtime length used when a sport enables overtime without a duration.
pub const DEFAULT_OVERTIME_MINUTES: u32 = 5;

/// Static rule parameters; a copy is stored on each game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SportRules {
    /// Period setup.
    pub period_config: PeriodConfig,
    /// Clock setup.
    pub timing: TimingRules,
    /// Score thresholds.
    pub scoring: ScoringRules,
    /// Roster limits.
    pub team: TeamRules,
    /// Overtime policy.
    pub overtime: OvertimeRules,
    /// Whether the sport tracks possession (ball, serve, raid).
    pub tracks_possession: bool,
}

impl SportRules {
    /// Clock readings at the start of a period.
    pub fn fresh_clock(&self, minutes: u32) -> ClockState {
        ClockState {
            game: TimeValue::from_minutes(minutes),
            game_running: false,
            secondary: self.secondary_reset(),
            secondary_running: false,
        }
    }

    /// Secondary clock reset value, if the sport has one.
    pub fn secondary_reset(&self) -> Option<u32> {
        self.timing
            .has_secondary_clock
            .then(|| self.timing.secondary_clock_duration.unwrap_or_default())
    }

    /// Timeout allowance per period.
    pub fn timeouts_per_period(&self) -> u32 {
        self.team.timeouts_per_period.unwrap_or_default()
    }
}

/// Amount a stat update adds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatAmount {
    /// The action's point or penalty value.
    Value,
    /// One occurrence.
    One,
}

/// Stat bumped when a catalog action is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatUpdate {
    /// Stat identifier.
    pub stat: String,
    /// Amount added.
    pub amount: StatAmount,
}

impl StatUpdate {
    /// Update adding the action's value.
    pub fn value(stat: &str) -> Self {
        Self {
            stat: stat.to_owned(),
            amount: StatAmount::Value,
        }
    }

    /// Update counting one occurrence.
    pub fn count(stat: &str) -> Self {
        Self {
            stat: stat.to_owned(),
            amount: StatAmount::One,
        }
    }

    /// Delta contributed for an action worth `value`.
    pub fn delta(&self, value: i32) -> i64 {
        match self.amount {
            StatAmount::Value => i64::from(value),
            StatAmount::One => 1,
        }
    }
}

/// Scoring action available to the scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreAction {
    /// Stable identifier.
    pub id: String,
    /// Button label.
    pub label: String,
    /// Short label.
    pub short_label: String,
    /// Points awarded.
    pub value: i32,
    /// Button color.
    pub color: String,
    /// Button icon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Player stats bumped.
    #[serde(default)]
    pub player_stats: Vec<StatUpdate>,
    /// Team stats bumped.
    #[serde(default)]
    pub team_stats: Vec<StatUpdate>,
}

/// Effect a violation has on play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PenaltyKind {
    /// Opponent is credited `penalty_value` points.
    Score,
    /// Possession goes to the opponent.
    Possession,
    /// The offending side is charged a timeout.
    Timeout,
    /// The offending player is disqualified.
    Disqualify,
    /// Stats only.
    None,
}

/// Infraction available to the scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationAction {
    /// Stable identifier.
    pub id: String,
    /// Button label.
    pub label: String,
    /// Button color.
    pub color: String,
    /// Effect on play.
    pub penalty_type: PenaltyKind,
    /// Points for score penalties; informative otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub penalty_value: Option<i32>,
    /// Player stats bumped.
    #[serde(default)]
    pub player_stats: Vec<StatUpdate>,
    /// Team stats bumped.
    #[serde(default)]
    pub team_stats: Vec<StatUpdate>,
}

/// Category of a non-scoring event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Roster change.
    Substitution,
    /// Player injury; flags the player.
    Injury,
    /// Review or challenge.
    Challenge,
    /// Anything else.
    Custom,
}

/// Non-scoring event available to the scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomEvent {
    /// Stable identifier.
    pub id: String,
    /// Button label.
    pub label: String,
    /// Event category.
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Whether a player must be named.
    pub requires_player: bool,
}

/// Every action a scorer can record for a sport.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionCatalog {
    /// Scoring actions.
    pub scores: Vec<ScoreAction>,
    /// Infractions.
    pub violations: Vec<ViolationAction>,
    /// Other events.
    pub events: Vec<CustomEvent>,
}

impl ActionCatalog {
    /// Look up a scoring action.
    pub fn score(&self, id: &str) -> Option<&ScoreAction> {
        self.scores.iter().find(|action| action.id == id)
    }

    /// Look up an infraction.
    pub fn violation(&self, id: &str) -> Option<&ViolationAction> {
        self.violations.iter().find(|action| action.id == id)
    }

    /// Look up an event.
    pub fn event(&self, id: &str) -> Option<&CustomEvent> {
        self.events.iter().find(|event| event.id == id)
    }
}

/// Team stat delta produced by a rulebook hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamStatDelta {
    /// Side credited.
    pub side: Side,
    /// Stat identifier.
    pub stat: String,
    /// Delta.
    pub delta: i64,
}

/// Behavioural half of a sport plugin. Every hook is pure.
pub trait Rulebook: Send + Sync + fmt::Debug {
    /// Accept or refuse an action built against `game`.
    fn validate_action(&self, action: &GameAction, game: &Game) -> Validation;

    /// Whether the current period is over.
    fn should_end_period(&self, game: &Game) -> bool;

    /// Whether the game has been decided.
    fn should_end_game(&self, game: &Game) -> bool;

    /// Winning side, if any.
    fn winner(&self, game: &Game) -> Option<Side>;

    /// Ratios and percentages computed from a player's stats. Never persisted.
    fn derived_stats(&self, _player: &Player) -> IndexMap<String, String> {
        IndexMap::new()
    }

    /// Team stat deltas booked when a period ends (e.g. sets won).
    fn settle_period(&self, _game: &Game) -> Vec<TeamStatDelta> {
        Vec::new()
    }

    /// Team stats reset to their defaults when the next period starts.
    fn period_scoped_team_stats(&self) -> &[&'static str] {
        &[]
    }
}

/// Complete plugin for one sport.
#[derive(Debug, Clone)]
pub struct SportConfig {
    /// Descriptive data.
    pub meta: SportMeta,
    /// Static rules.
    pub rules: SportRules,
    /// Action catalogs.
    pub actions: ActionCatalog,
    /// Player stat declarations.
    pub player_stats: Vec<StatDefinition>,
    /// Team stat declarations.
    pub team_stats: Vec<StatDefinition>,
    /// Decision functions.
    pub rulebook: Arc<dyn Rulebook>,
}

/// Inputs describing one side of a new game.
#[derive(Debug, Clone, Default)]
pub struct TeamSetup {
    /// Display name.
    pub name: String,
    /// Display color.
    pub color: String,
    /// Optional logo URL.
    pub logo: Option<String>,
    /// Initial roster.
    pub players: Vec<PlayerSetup>,
}

/// Inputs describing a roster entry.
#[derive(Debug, Clone, Default)]
pub struct PlayerSetup {
    /// Identifier; generated when absent.
    pub id: Option<String>,
    /// Jersey number.
    pub number: String,
    /// Display name.
    pub name: String,
    /// Playing position.
    pub position: Option<String>,
    /// Starting lineup flag.
    pub is_starter: bool,
}

/// Inputs describing a new game.
#[derive(Debug, Clone, Default)]
pub struct GameSetup {
    /// Display name of the fixture.
    pub game_name: String,
    /// Venue.
    pub venue: Option<String>,
    /// Scheduled start, epoch milliseconds.
    pub date: Option<u64>,
    /// Whether per-player stats are recorded; rosters are dropped otherwise.
    pub track_player_stats: bool,
    /// Side A.
    pub team_a: TeamSetup,
    /// Side B.
    pub team_b: TeamSetup,
    /// Descriptive metadata; the sport id is added to its tags.
    pub metadata: GameMetadata,
}

impl SportConfig {
    /// Player stat sheet with every declared stat at its default.
    pub fn default_player_stats(&self) -> StatSheet {
        StatSheet::seeded(&self.player_stats)
    }

    /// Team stat sheet with every declared stat at its default.
    pub fn default_team_stats(&self) -> StatSheet {
        StatSheet::seeded(&self.team_stats)
    }

    /// Label for period `n`.
    pub fn period_label(&self, n: u32) -> String {
        self.rules.period_config.label(n)
    }

    /// State of play before the first action.
    pub fn initial_state(&self) -> GameState {
        GameState {
            current_period: 1,
            clock: self.rules.fresh_clock(self.rules.period_config.duration),
            possession: self.rules.tracks_possession.then_some(Side::A),
            period_over: false,
            custom: Map::new(),
        }
    }

    /// Build a roster entry with seeded stats.
    pub fn new_player(&self, setup: PlayerSetup) -> Player {
        Player {
            id: setup
                .id
                .unwrap_or_else(|| Uuid::new_v4().simple().to_string()),
            number: setup.number,
            name: setup.name,
            position: setup.position,
            is_active: setup.is_starter,
            is_starter: setup.is_starter,
            stats: self.default_player_stats(),
            disqualified: false,
            injured: false,
        }
    }

    fn new_team(&self, side: Side, setup: TeamSetup, track_player_stats: bool) -> Team {
        let players = if track_player_stats {
            setup
                .players
                .into_iter()
                .map(|player| self.new_player(player))
                .collect()
        } else {
            Vec::new()
        };

        Team {
            id: side,
            name: setup.name,
            color: setup.color,
            logo: setup.logo,
            score: 0,
            stats: self.default_team_stats(),
            players,
            timeouts: self.rules.timeouts_per_period(),
            timeouts_used: 0,
            custom: Map::new(),
        }
    }

    /// Build a fresh game document in `setup` status.
    pub fn create_game(&self, code: GameCode, setup: GameSetup) -> Game {
        let now = now_millis();
        let mut metadata = setup.metadata;
        if !metadata.tags.iter().any(|tag| tag == &self.meta.id) {
            metadata.tags.insert(0, self.meta.id.clone());
        }

        Game {
            id: Uuid::new_v4(),
            code,
            sport: self.meta.id.clone(),
            status: GameStatus::Setup,
            created_at: now,
            last_update: now,
            settings: GameSettings {
                game_name: setup.game_name,
                venue: setup.venue,
                date: setup.date,
                rules: self.rules.clone(),
                track_player_stats: setup.track_player_stats,
                allow_spectators: true,
                enable_live_stream: true,
            },
            state: self.initial_state(),
            teams: Teams {
                a: self.new_team(Side::A, setup.team_a, setup.track_player_stats),
                b: self.new_team(Side::B, setup.team_b, setup.track_player_stats),
            },
            action_log: Vec::new(),
            metadata,
        }
    }

    /// Check the configuration's internal consistency, returning every problem found.
    pub fn schema_problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.meta.id.trim().is_empty() {
            problems.push("sport id must not be empty".to_owned());
        }
        if self.rules.period_config.count == 0 {
            problems.push("period count must be at least 1".to_owned());
        }
        if self.rules.timing.has_secondary_clock && !self.rules.timing.has_game_clock {
            problems.push("a secondary clock requires a game clock".to_owned());
        }
        if self.rules.timing.has_game_clock
            && self.rules.timing.clock_direction == ClockDirection::Down
            && self.rules.period_config.duration == 0
        {
            problems.push("a countdown clock needs a period duration".to_owned());
        }
        if self.rules.team.min_players > self.rules.team.max_players {
            problems.push("minimum roster size exceeds the maximum".to_owned());
        }

        check_declarations("player", &self.player_stats, &mut problems);
        check_declarations("team", &self.team_stats, &mut problems);

        let mut action_ids = HashSet::new();
        let catalog_ids = self
            .actions
            .scores
            .iter()
            .map(|action| action.id.as_str())
            .chain(self.actions.violations.iter().map(|action| action.id.as_str()))
            .chain(self.actions.events.iter().map(|event| event.id.as_str()));
        for id in catalog_ids {
            if !action_ids.insert(id) {
                problems.push(format!("action id `{id}` is declared more than once"));
            }
        }

        for action in &self.actions.scores {
            if action.value <= 0 {
                problems.push(format!("score action `{}` must be worth points", action.id));
            }
            self.check_updates(&action.id, &action.player_stats, &action.team_stats, &mut problems);
        }
        for violation in &self.actions.violations {
            if violation.penalty_type == PenaltyKind::Score
                && violation.penalty_value.unwrap_or_default() <= 0
            {
                problems.push(format!(
                    "violation `{}` awards score without a penalty value",
                    violation.id
                ));
            }
            self.check_updates(
                &violation.id,
                &violation.player_stats,
                &violation.team_stats,
                &mut problems,
            );
        }
        for stat in self.rulebook.period_scoped_team_stats() {
            if !declares_number(&self.team_stats, stat) {
                problems.push(format!("period-scoped team stat `{stat}` is not declared"));
            }
        }

        problems
    }

    fn check_updates(
        &self,
        action_id: &str,
        player_updates: &[StatUpdate],
        team_updates: &[StatUpdate],
        problems: &mut Vec<String>,
    ) {
        for update in player_updates {
            if !declares_number(&self.player_stats, &update.stat) {
                problems.push(format!(
                    "action `{action_id}` updates undeclared player stat `{}`",
                    update.stat
                ));
            }
        }
        for update in team_updates {
            if !declares_number(&self.team_stats, &update.stat) {
                problems.push(format!(
                    "action `{action_id}` updates undeclared team stat `{}`",
                    update.stat
                ));
            }
        }
    }
}

fn check_declarations(scope: &str, definitions: &[StatDefinition], problems: &mut Vec<String>) {
    let mut seen = HashSet::new();
    for definition in definitions {
        if !seen.insert(definition.id.as_str()) {
            problems.push(format!("{scope} stat `{}` is declared twice", definition.id));
        }
        if definition.default_value.kind() != definition.kind {
            problems.push(format!(
                "{scope} stat `{}` has a default that does not match its type",
                definition.id
            ));
        }
    }
}

fn declares_number(definitions: &[StatDefinition], id: &str) -> bool {
    definitions
        .iter()
        .any(|definition| definition.id == id && definition.kind == StatKind::Number)
}

/// Whether the primary clock reads 0:00.0.
pub(crate) fn clock_expired(game: &Game) -> bool {
    game.state.clock.game.is_zero()
}

/// Winner by cumulative score, `None` on a tie.
pub(crate) fn higher_score(game: &Game) -> Option<Side> {
    let a = game.team(Side::A).score;
    let b = game.team(Side::B).score;
    match a.cmp(&b) {
        std::cmp::Ordering::Greater => Some(Side::A),
        std::cmp::Ordering::Less => Some(Side::B),
        std::cmp::Ordering::Equal => None,
    }
}

/// Format `made / attempted` as a percentage with one decimal.
pub(crate) fn percentage(player: &Player, made: &str, attempted: &str) -> String {
    let made = player.stats.number(made).unwrap_or_default();
    match player.stats.number(attempted) {
        Some(attempted) if attempted > 0 => {
            format!("{:.1}", made as f64 / attempted as f64 * 100.0)
        }
        _ => "0.0".to_owned(),
    }
}
