//! Sport-agnostic scoring engine.
//!
//! Every operation plans a complete next snapshot from the current one and either
//! commits it (one snapshot, one notification) or returns a [`Rejection`] without
//! touching anything. Structural misuse, such as asking a clockless sport to toggle its
//! clock, is reported separately through [`Unsupported`].

use std::sync::Arc;

use indexmap::IndexMap;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::{
    sports::{DEFAULT_OVERTIME_MINUTES, EventKind, PenaltyKind, PlayerSetup, SportConfig, StatUpdate},
    state::{
        action::{ActionKind, ActionResult, GameAction, ScoreChange, StatChange, StatTarget},
        game::{Game, GameStatus, Player, Side, TimeValue, now_millis},
        state_machine::{LifecycleEvent, compute_transition},
        stats::StatValue,
        validation::{Rejection, Unsupported, Validation},
    },
};

/// Team stat kept equal to the team's cumulative score.
pub const SCORE_STAT: &str = "score";
const NOTIFICATION_CAPACITY: usize = 64;

/// Where a snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Produced by an engine operation.
    Local,
    /// Installed from the store by the sync layer.
    Remote,
}

/// Sent to subscribers after every committed snapshot.
#[derive(Debug, Clone)]
pub struct Notification {
    /// The new snapshot.
    pub snapshot: Arc<Game>,
    /// Where it came from.
    pub origin: Origin,
}

/// Owns one game while attached and applies scorer operations to it.
pub struct GameEngine {
    game: Arc<Game>,
    config: Arc<SportConfig>,
    notifier: broadcast::Sender<Notification>,
}

impl GameEngine {
    /// Attach an engine to `game`, interpreted with `config`.
    pub fn new(game: Game, config: Arc<SportConfig>) -> Self {
        let (notifier, _receiver) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            game: Arc::new(game),
            config,
            notifier,
        }
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<Game> {
        Arc::clone(&self.game)
    }

    /// Borrow the current game.
    pub fn game(&self) -> &Game {
        &self.game
    }

    /// Plugin the engine interprets the game with.
    pub fn config(&self) -> &Arc<SportConfig> {
        &self.config
    }

    /// Receive a [`Notification`] for every subsequent snapshot.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifier.subscribe()
    }

    /// Label of the current period.
    pub fn period_label(&self) -> String {
        self.config.period_label(self.game.state.current_period)
    }

    /// Winning side according to the sport, `None` while level.
    pub fn winner(&self) -> Option<Side> {
        self.config.rulebook.winner(&self.game)
    }

    /// Whether the sport considers the game decided.
    pub fn should_end_game(&self) -> bool {
        self.config.rulebook.should_end_game(&self.game)
    }

    /// Derived stats for a player, computed on demand.
    pub fn derived_stats(&self, side: Side, player_id: &str) -> Option<IndexMap<String, String>> {
        self.game
            .team(side)
            .player(player_id)
            .map(|player| self.config.rulebook.derived_stats(player))
    }

    /// Award a scoring action to `side`.
    pub fn record_score(
        &mut self,
        side: Side,
        action_id: &str,
        player_id: Option<&str>,
    ) -> Validation {
        let outcome = self.plan_score(side, action_id, player_id);
        self.settle("record_score", outcome)
    }

    /// Book an infraction committed by `side`.
    pub fn record_violation(
        &mut self,
        side: Side,
        violation_id: &str,
        player_id: Option<&str>,
    ) -> Validation {
        let outcome = self.plan_violation(side, violation_id, player_id);
        self.settle("record_violation", outcome)
    }

    /// Log a non-scoring event from the sport's event catalog.
    pub fn record_event(
        &mut self,
        side: Side,
        event_id: &str,
        player_id: Option<&str>,
        notes: Option<String>,
    ) -> Validation {
        let outcome = self.plan_event(side, event_id, player_id, notes);
        self.settle("record_event", outcome)
    }

    /// Charge a timeout to `side` and stop both clocks.
    pub fn call_timeout(&mut self, side: Side) -> Validation {
        let outcome = self.plan_timeout(side);
        self.settle("call_timeout", outcome)
    }

    /// Start or stop the game clock; the secondary clock follows it.
    pub fn toggle_game_clock(&mut self) -> Result<Validation, Unsupported> {
        self.require_game_clock()?;
        let outcome = self.ensure_live().map(|()| {
            let mut next = self.draft();
            let running = !next.state.clock.game_running;
            next.state.clock.game_running = running;
            if next.settings.rules.timing.has_secondary_clock {
                next.state.clock.secondary_running = running;
            }
            next
        });
        Ok(self.settle("toggle_game_clock", outcome))
    }

    /// Set the game clock, ending the period when the sport says it is over.
    pub fn update_game_time(&mut self, time: TimeValue) -> Result<Validation, Unsupported> {
        self.require_game_clock()?;
        let outcome = self.ensure_live().map(|()| {
            let mut next = self.draft();
            next.state.clock.game = time.normalized();
            self.close_period_if_over(&mut next);
            next
        });
        Ok(self.settle("update_game_time", outcome))
    }

    /// Reset the secondary clock to `seconds`, or to the sport's default.
    pub fn reset_secondary_clock(&mut self, seconds: Option<u32>) -> Result<Validation, Unsupported> {
        self.require_secondary_clock()?;
        let reset = self.game.settings.rules.secondary_reset().unwrap_or_default();
        let outcome = self.ensure_live().map(|()| {
            let mut next = self.draft();
            next.state.clock.secondary = Some(seconds.unwrap_or(reset));
            next
        });
        Ok(self.settle("reset_secondary_clock", outcome))
    }

    /// Set the secondary clock. A clock reaching zero stops.
    pub fn update_secondary_clock(&mut self, seconds: u32) -> Result<Validation, Unsupported> {
        self.require_secondary_clock()?;
        let outcome = self.ensure_live().map(|()| {
            let mut next = self.draft();
            next.state.clock.secondary = Some(seconds);
            if seconds == 0 {
                next.state.clock.secondary_running = false;
            }
            next
        });
        Ok(self.settle("update_secondary_clock", outcome))
    }

    /// Move to the next period, or into overtime when regulation is over.
    pub fn advance_period(&mut self) -> Validation {
        let outcome = self.plan_advance();
        self.settle("advance_period", outcome)
    }

    /// Hand possession to the other side.
    pub fn toggle_possession(&mut self) -> Result<Validation, Unsupported> {
        self.require_possession()?;
        let outcome = self.ensure_live().map(|()| {
            let mut next = self.draft();
            next.state.possession = Some(next.state.possession.map_or(Side::A, Side::opponent));
            next
        });
        Ok(self.settle("toggle_possession", outcome))
    }

    /// Give possession to `side`.
    pub fn set_possession(&mut self, side: Side) -> Result<Validation, Unsupported> {
        self.require_possession()?;
        let outcome = self.ensure_live().map(|()| {
            let mut next = self.draft();
            next.state.possession = Some(side);
            next
        });
        Ok(self.settle("set_possession", outcome))
    }

    /// Tombstone the newest live log entry and reverse its score delta.
    ///
    /// Stats, possession, clock stops and timeout usage are left as they are.
    pub fn undo_last_action(&mut self) -> Validation {
        let outcome = self.plan_undo();
        self.settle("undo_last_action", outcome)
    }

    /// Move from setup to live.
    pub fn start(&mut self) -> Validation {
        self.lifecycle(LifecycleEvent::Start, "start")
    }

    /// Suspend play and stop both clocks.
    pub fn pause(&mut self) -> Validation {
        self.lifecycle(LifecycleEvent::Pause, "pause")
    }

    /// Continue after a pause.
    pub fn resume(&mut self) -> Validation {
        self.lifecycle(LifecycleEvent::Resume, "resume")
    }

    /// Finish the game and stop both clocks.
    pub fn end_game(&mut self) -> Validation {
        self.lifecycle(LifecycleEvent::Complete, "end_game")
    }

    /// Abandon the game and stop both clocks.
    pub fn cancel(&mut self) -> Validation {
        self.lifecycle(LifecycleEvent::Cancel, "cancel")
    }

    /// Add a player to `side`, seeding stats from the sport's declarations.
    pub fn add_player(&mut self, side: Side, setup: PlayerSetup) -> Validation {
        let outcome = self.plan_add_player(side, setup);
        self.settle("add_player", outcome)
    }

    /// Install a snapshot received from the store. `last_update` is kept as received.
    pub fn replace_state(&mut self, game: Game) {
        self.game = Arc::new(game);
        debug!(
            code = %self.game.code,
            last_update = self.game.last_update,
            "engine installed remote snapshot"
        );
        let _ = self.notifier.send(Notification {
            snapshot: Arc::clone(&self.game),
            origin: Origin::Remote,
        });
    }

    fn plan_score(
        &self,
        side: Side,
        action_id: &str,
        player_id: Option<&str>,
    ) -> Result<Game, Rejection> {
        self.ensure_live()?;
        let definition = self
            .config
            .actions
            .score(action_id)
            .ok_or_else(|| Rejection::UnknownAction(action_id.to_owned()))?;
        let player = self.resolve_player(side, player_id)?;
        let mut action = log_entry(
            &self.game,
            ActionKind::Score,
            Some(side),
            &definition.id,
            definition.value,
            player,
        );
        self.config
            .rulebook
            .validate_action(&action, &self.game)
            .into_result()?;

        let mut next = self.draft();
        action.result.score_change.add(side, definition.value);
        book_stats(
            &mut next,
            &mut action,
            side,
            &definition.player_stats,
            &definition.team_stats,
        );
        apply_score(&mut next, action.result.score_change);
        next.action_log.push(action);
        self.close_period_if_over(&mut next);
        Ok(next)
    }

    fn plan_violation(
        &self,
        side: Side,
        violation_id: &str,
        player_id: Option<&str>,
    ) -> Result<Game, Rejection> {
        self.ensure_live()?;
        let definition = self
            .config
            .actions
            .violation(violation_id)
            .ok_or_else(|| Rejection::UnknownAction(violation_id.to_owned()))?;
        let player = self.resolve_player(side, player_id)?;
        let value = definition.penalty_value.unwrap_or_default();
        let mut action = log_entry(
            &self.game,
            ActionKind::Violation,
            Some(side),
            &definition.id,
            value,
            player,
        );
        self.config
            .rulebook
            .validate_action(&action, &self.game)
            .into_result()?;

        let mut next = self.draft();
        match definition.penalty_type {
            PenaltyKind::Score => action.result.score_change.add(side.opponent(), value),
            PenaltyKind::Possession => {
                if next.settings.rules.tracks_possession {
                    next.state.possession = Some(side.opponent());
                    action.result.possession_change = true;
                }
            }
            PenaltyKind::Timeout => {
                let team = next.team_mut(side);
                team.timeouts_used = (team.timeouts_used + 1).min(team.timeouts);
            }
            PenaltyKind::Disqualify => {
                if let Some(player) = action
                    .player_id
                    .as_deref()
                    .and_then(|id| next.teams.get_mut(side).player_mut(id))
                {
                    player.disqualified = true;
                    player.is_active = false;
                }
            }
            PenaltyKind::None => {}
        }
        book_stats(
            &mut next,
            &mut action,
            side,
            &definition.player_stats,
            &definition.team_stats,
        );
        apply_score(&mut next, action.result.score_change);
        next.action_log.push(action);
        self.close_period_if_over(&mut next);
        Ok(next)
    }

    fn plan_event(
        &self,
        side: Side,
        event_id: &str,
        player_id: Option<&str>,
        notes: Option<String>,
    ) -> Result<Game, Rejection> {
        self.ensure_live()?;
        let definition = self
            .config
            .actions
            .event(event_id)
            .ok_or_else(|| Rejection::UnknownAction(event_id.to_owned()))?;
        if definition.requires_player && player_id.is_none() {
            return Err(Rejection::Rule(format!(
                "event `{}` requires a player",
                definition.id
            )));
        }
        let kind = match definition.kind {
            EventKind::Substitution if !self.game.settings.rules.team.allow_substitutions => {
                return Err(Rejection::Rule("substitutions are not allowed".to_owned()));
            }
            EventKind::Substitution => ActionKind::Substitution,
            EventKind::Injury | EventKind::Challenge | EventKind::Custom => ActionKind::Custom,
        };
        let player = self.resolve_player(side, player_id)?;
        let mut action = log_entry(&self.game, kind, Some(side), &definition.id, 0, player);
        action.notes = notes;

        let mut next = self.draft();
        if let Some(player) = action
            .player_id
            .as_deref()
            .and_then(|id| next.teams.get_mut(side).player_mut(id))
        {
            match definition.kind {
                EventKind::Substitution => player.is_active = !player.is_active,
                EventKind::Injury => player.injured = true,
                EventKind::Challenge | EventKind::Custom => {}
            }
        }
        next.action_log.push(action);
        Ok(next)
    }

    fn plan_timeout(&self, side: Side) -> Result<Game, Rejection> {
        self.ensure_live()?;
        if self.game.team(side).timeouts_remaining() == 0 {
            return Err(Rejection::NoTimeoutsRemaining(side));
        }

        let mut action = log_entry(&self.game, ActionKind::Timeout, Some(side), "timeout", 1, None);
        action.result.clock_stop = true;

        let mut next = self.draft();
        next.team_mut(side).timeouts_used += 1;
        next.state.clock.stop_all();
        next.action_log.push(action);
        Ok(next)
    }

    fn plan_advance(&self) -> Result<Game, Rejection> {
        self.ensure_live()?;
        if self.config.rulebook.should_end_game(&self.game) {
            return Err(Rejection::GameComplete);
        }

        let rules = &self.game.settings.rules;
        let current = self.game.state.current_period;
        let minutes = if current < rules.period_config.count {
            rules.period_config.duration
        } else if rules.overtime.enabled {
            rules.overtime.duration.unwrap_or(DEFAULT_OVERTIME_MINUTES)
        } else {
            return Err(Rejection::GameComplete);
        };

        let mut next = self.draft();
        next.state.current_period = current + 1;
        next.state.clock = rules.fresh_clock(minutes);
        next.state.period_over = false;

        let allowance = rules.timeouts_per_period();
        for side in Side::BOTH {
            let team = next.team_mut(side);
            team.timeouts = allowance;
            team.timeouts_used = 0;
            for stat in self.config.rulebook.period_scoped_team_stats() {
                let default = self
                    .config
                    .team_stats
                    .iter()
                    .find(|definition| definition.id == *stat)
                    .map(|definition| definition.default_value.clone())
                    .unwrap_or(StatValue::Number(0));
                team.stats.set(stat, default);
            }
        }
        Ok(next)
    }

    fn plan_undo(&self) -> Result<Game, Rejection> {
        self.ensure_live()?;
        let index = self
            .game
            .action_log
            .iter()
            .rposition(|action| !action.undone)
            .ok_or(Rejection::NothingToUndo)?;

        let mut next = self.draft();
        let change = next.action_log[index].result.score_change;
        apply_score(
            &mut next,
            ScoreChange {
                a: -change.a,
                b: -change.b,
            },
        );
        next.action_log[index].undone = true;

        // reopening a period also takes back what its close settled
        let entry = &next.action_log[index];
        if entry.kind == ActionKind::PeriodEnd && entry.period == next.state.current_period {
            let settled = entry.result.stat_changes.clone();
            next.state.period_over = false;
            for change in settled {
                let team = next.team_mut(change.side);
                match &change.target {
                    StatTarget::Team => {
                        team.stats.add(&change.stat, -change.delta);
                    }
                    StatTarget::Player { player_id } => {
                        if let Some(player) = team.player_mut(player_id) {
                            player.stats.add(&change.stat, -change.delta);
                        }
                    }
                }
            }
        }
        Ok(next)
    }

    fn plan_add_player(&self, side: Side, setup: PlayerSetup) -> Result<Game, Rejection> {
        if matches!(
            self.game.status,
            GameStatus::Completed | GameStatus::Cancelled
        ) {
            return Err(Rejection::GameClosed(self.game.status));
        }
        if !self.game.settings.track_player_stats {
            return Err(Rejection::Rule(
                "player stats are not tracked for this game".to_owned(),
            ));
        }
        let team = self.game.team(side);
        let limit = self.game.settings.rules.team.max_players;
        if team.players.len() >= limit as usize {
            return Err(Rejection::Rule(format!(
                "roster for side {side} is full ({limit} players)"
            )));
        }

        let player = self.config.new_player(setup);
        if team.player(&player.id).is_some() {
            return Err(Rejection::DuplicatePlayer {
                side,
                player_id: player.id,
            });
        }

        let mut next = self.draft();
        next.team_mut(side).players.push(player);
        Ok(next)
    }

    fn lifecycle(&mut self, event: LifecycleEvent, operation: &'static str) -> Validation {
        let outcome = compute_transition(self.game.status, event)
            .map_err(Rejection::from)
            .map(|status| {
                let mut next = self.draft();
                next.status = status;
                if event != LifecycleEvent::Start && event != LifecycleEvent::Resume {
                    next.state.clock.stop_all();
                }
                next
            });
        self.settle(operation, outcome)
    }

    fn close_period_if_over(&self, next: &mut Game) {
        if next.state.period_over || !self.config.rulebook.should_end_period(next) {
            return;
        }

        next.state.clock.stop_all();
        next.state.period_over = true;
        let mut marker = log_entry(next, ActionKind::PeriodEnd, None, "period_end", 0, None);
        marker.result.clock_stop = true;
        for delta in self.config.rulebook.settle_period(next) {
            if next
                .team_mut(delta.side)
                .stats
                .add(&delta.stat, delta.delta)
                .is_some()
            {
                marker.result.stat_changes.push(StatChange {
                    side: delta.side,
                    target: StatTarget::Team,
                    stat: delta.stat,
                    delta: delta.delta,
                });
            }
        }
        debug!(
            code = %next.code,
            period = next.state.current_period,
            "period ended"
        );
        next.action_log.push(marker);
    }

    fn ensure_live(&self) -> Result<(), Rejection> {
        match self.game.status {
            GameStatus::Live => Ok(()),
            status => Err(Rejection::GameNotLive(status)),
        }
    }

    fn resolve_player(
        &self,
        side: Side,
        player_id: Option<&str>,
    ) -> Result<Option<&Player>, Rejection> {
        let Some(player_id) = player_id else {
            return Ok(None);
        };
        self.game
            .team(side)
            .player(player_id)
            .map(Some)
            .ok_or_else(|| Rejection::UnknownPlayer {
                side,
                player_id: player_id.to_owned(),
            })
    }

    fn require_game_clock(&self) -> Result<(), Unsupported> {
        if self.game.settings.rules.timing.has_game_clock {
            Ok(())
        } else {
            Err(Unsupported::NoGameClock {
                sport: self.game.sport.clone(),
            })
        }
    }

    fn require_secondary_clock(&self) -> Result<(), Unsupported> {
        if self.game.settings.rules.timing.has_secondary_clock {
            Ok(())
        } else {
            Err(Unsupported::NoSecondaryClock {
                sport: self.game.sport.clone(),
            })
        }
    }

    fn require_possession(&self) -> Result<(), Unsupported> {
        if self.game.settings.rules.tracks_possession {
            Ok(())
        } else {
            Err(Unsupported::NoPossessionTracking {
                sport: self.game.sport.clone(),
            })
        }
    }

    fn draft(&self) -> Game {
        (*self.game).clone()
    }

    fn settle(&mut self, operation: &'static str, outcome: Result<Game, Rejection>) -> Validation {
        match outcome {
            Ok(next) => {
                self.commit(next, operation);
                Validation::Valid
            }
            Err(rejection) => {
                debug!(
                    code = %self.game.code,
                    operation,
                    reason = %rejection,
                    "engine rejected operation"
                );
                Validation::Invalid(rejection)
            }
        }
    }

    fn commit(&mut self, mut next: Game, operation: &'static str) {
        next.last_update = now_millis().max(self.game.last_update + 1);
        self.game = Arc::new(next);
        debug!(
            code = %self.game.code,
            operation,
            last_update = self.game.last_update,
            "engine transition committed"
        );
        let _ = self.notifier.send(Notification {
            snapshot: Arc::clone(&self.game),
            origin: Origin::Local,
        });
    }
}

fn log_entry(
    game: &Game,
    kind: ActionKind,
    side: Option<Side>,
    action: &str,
    value: i32,
    player: Option<&Player>,
) -> GameAction {
    GameAction {
        id: Uuid::new_v4(),
        timestamp: now_millis(),
        kind,
        side,
        player_id: player.map(|player| player.id.clone()),
        player_name: player.map(|player| player.name.clone()),
        action: action.to_owned(),
        value,
        period: game.state.current_period,
        game_time: game.state.clock.game,
        result: ActionResult::default(),
        notes: None,
        undone: false,
    }
}

/// Apply catalog stat updates for the acting player and team, recording each delta.
fn book_stats(
    next: &mut Game,
    action: &mut GameAction,
    side: Side,
    player_updates: &[StatUpdate],
    team_updates: &[StatUpdate],
) {
    let value = action.value;
    if let Some(player_id) = action.player_id.clone() {
        if let Some(player) = next.team_mut(side).player_mut(&player_id) {
            for update in player_updates {
                let delta = update.delta(value);
                if player.stats.add(&update.stat, delta).is_some() {
                    action.result.stat_changes.push(StatChange {
                        side,
                        target: StatTarget::Player {
                            player_id: player_id.clone(),
                        },
                        stat: update.stat.clone(),
                        delta,
                    });
                }
            }
        }
    }

    let team = next.team_mut(side);
    for update in team_updates {
        let delta = update.delta(value);
        if team.stats.add(&update.stat, delta).is_some() {
            action.result.stat_changes.push(StatChange {
                side,
                target: StatTarget::Team,
                stat: update.stat.clone(),
                delta,
            });
        }
    }
}

fn apply_score(next: &mut Game, change: ScoreChange) {
    for side in Side::BOTH {
        let team = next.team_mut(side);
        team.score += change.get(side);
        if team.stats.get(SCORE_STAT).is_some() {
            team.stats
                .set(SCORE_STAT, StatValue::Number(i64::from(team.score)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        sports::{GameSetup, TeamSetup, badminton, basketball, kabaddi},
        state::game::GameCode,
    };

    fn setup() -> GameSetup {
        GameSetup {
            game_name: "Test".into(),
            track_player_stats: true,
            team_a: TeamSetup {
                name: "Home".into(),
                color: "#EF4444".into(),
                players: vec![PlayerSetup {
                    id: Some("a1".into()),
                    number: "4".into(),
                    name: "Ana".into(),
                    ..PlayerSetup::default()
                }],
                ..TeamSetup::default()
            },
            team_b: TeamSetup {
                name: "Away".into(),
                color: "#3B82F6".into(),
                players: vec![PlayerSetup {
                    id: Some("b1".into()),
                    number: "9".into(),
                    name: "Bo".into(),
                    ..PlayerSetup::default()
                }],
                ..TeamSetup::default()
            },
            ..GameSetup::default()
        }
    }

    fn engine_for(config: SportConfig) -> GameEngine {
        let config = Arc::new(config);
        let game = config.create_game(GameCode::generate(), setup());
        GameEngine::new(game, config)
    }

    fn live(config: SportConfig) -> GameEngine {
        let mut engine = engine_for(config);
        assert!(engine.start().is_valid());
        engine
    }

    #[test]
    fn scoring_requires_a_live_game() {
        let mut engine = engine_for(basketball::config());
        assert_eq!(
            engine.record_score(Side::A, "two_pointer", None),
            Validation::Invalid(Rejection::GameNotLive(GameStatus::Setup))
        );
        assert_eq!(engine.game().team(Side::A).score, 0);
    }

    #[test]
    fn score_updates_player_and_mirrored_team_stats() {
        let mut engine = live(basketball::config());
        assert!(
            engine
                .record_score(Side::A, "three_pointer", Some("a1"))
                .is_valid()
        );

        let game = engine.game();
        let team = game.team(Side::A);
        assert_eq!(team.score, 3);
        assert_eq!(team.stats.number(SCORE_STAT), Some(3));
        let player = team.player("a1").unwrap();
        assert_eq!(player.stats.number("points"), Some(3));
        assert_eq!(player.stats.number("threePointsMade"), Some(1));
        assert_eq!(player.stats.number("fieldGoalsMade"), Some(1));

        let action = game.action_log.last().unwrap();
        assert_eq!(action.player_name.as_deref(), Some("Ana"));
        assert_eq!(action.result.score_change, ScoreChange { a: 3, b: 0 });
        assert!(!action.result.stat_changes.is_empty());
    }

    #[test]
    fn unknown_player_is_rejected_without_mutation() {
        let mut engine = live(basketball::config());
        let before = engine.snapshot();
        assert_eq!(
            engine.record_score(Side::A, "two_pointer", Some("b1")),
            Validation::Invalid(Rejection::UnknownPlayer {
                side: Side::A,
                player_id: "b1".into()
            })
        );
        assert_eq!(*engine.snapshot(), *before);
    }

    #[test]
    fn every_commit_notifies_once_with_a_newer_snapshot() {
        let mut engine = live(basketball::config());
        let mut receiver = engine.subscribe();
        let before = engine.game().last_update;

        assert!(engine.record_score(Side::B, "free_throw", None).is_valid());
        let notification = receiver.try_recv().unwrap();
        assert_eq!(notification.origin, Origin::Local);
        assert!(notification.snapshot.last_update > before);
        assert!(receiver.try_recv().is_err());

        let before = engine.snapshot();
        assert_eq!(
            engine.record_score(Side::B, "dunk", None),
            Validation::Invalid(Rejection::UnknownAction("dunk".into()))
        );
        assert!(receiver.try_recv().is_err());
        assert_eq!(*engine.snapshot(), *before);
    }

    #[test]
    fn toggling_the_clock_twice_restores_it() {
        let mut engine = live(basketball::config());
        let clock = |engine: &GameEngine| {
            let clock = &engine.game().state.clock;
            (clock.game_running, clock.secondary_running)
        };
        assert_eq!(clock(&engine), (false, false));

        assert!(engine.toggle_game_clock().unwrap().is_valid());
        assert_eq!(clock(&engine), (true, true));
        assert!(engine.toggle_game_clock().unwrap().is_valid());
        assert_eq!(clock(&engine), (false, false));
    }

    #[test]
    fn disqualify_penalty_flags_the_player_only() {
        let mut engine = live(basketball::config());
        assert!(
            engine
                .record_violation(Side::B, "flagrant_foul", Some("b1"))
                .is_valid()
        );
        let game = engine.game();
        assert!(game.team(Side::B).player("b1").unwrap().disqualified);
        assert_eq!(game.team(Side::A).score, 0);

        assert_eq!(
            engine.record_score(Side::B, "two_pointer", Some("b1")),
            Validation::rule("Player is disqualified")
        );
    }

    #[test]
    fn possession_penalty_flips_possession() {
        let mut engine = live(kabaddi::config());
        assert_eq!(engine.game().state.possession, Some(Side::A));
        assert!(engine.record_violation(Side::A, "empty_raid", None).is_valid());
        assert_eq!(engine.game().state.possession, Some(Side::B));
        assert!(
            engine
                .game()
                .action_log
                .last()
                .unwrap()
                .result
                .possession_change
        );
    }

    #[test]
    fn timeout_penalty_never_exceeds_the_allowance() {
        let mut config = basketball::config();
        config.actions.violations[0].penalty_type = PenaltyKind::Timeout;
        let mut engine = live(config);

        for _ in 0..4 {
            assert!(engine.record_violation(Side::A, "personal_foul", None).is_valid());
        }
        let team = engine.game().team(Side::A);
        assert_eq!(team.timeouts_used, team.timeouts);
    }

    #[test]
    fn timeouts_stop_clocks_and_reset_each_period() {
        let mut engine = live(basketball::config());
        assert!(engine.toggle_game_clock().unwrap().is_valid());
        assert!(engine.call_timeout(Side::A).is_valid());
        assert!(!engine.game().state.clock.game_running);
        assert!(!engine.game().state.clock.secondary_running);
        assert!(engine.call_timeout(Side::A).is_valid());
        assert_eq!(
            engine.call_timeout(Side::A),
            Validation::Invalid(Rejection::NoTimeoutsRemaining(Side::A))
        );

        assert!(engine.advance_period().is_valid());
        assert_eq!(engine.game().team(Side::A).timeouts_used, 0);
        assert!(engine.call_timeout(Side::A).is_valid());
    }

    #[test]
    fn clockless_sports_report_structural_misuse() {
        let mut engine = live(badminton::config());
        assert_eq!(
            engine.toggle_game_clock(),
            Err(Unsupported::NoGameClock {
                sport: "badminton".into()
            })
        );
        assert!(engine.update_game_time(TimeValue::default()).is_err());
        assert!(matches!(
            engine.reset_secondary_clock(None),
            Err(Unsupported::NoSecondaryClock { .. })
        ));
    }

    #[test]
    fn possession_requires_tracking() {
        let mut config = kabaddi::config();
        config.rules.tracks_possession = false;
        let mut engine = live(config);
        assert_eq!(engine.game().state.possession, None);
        assert!(matches!(
            engine.toggle_possession(),
            Err(Unsupported::NoPossessionTracking { .. })
        ));
        assert!(engine.set_possession(Side::B).is_err());
    }

    #[test]
    fn possession_toggles_between_sides() {
        let mut engine = live(basketball::config());
        assert!(engine.toggle_possession().unwrap().is_valid());
        assert_eq!(engine.game().state.possession, Some(Side::B));
        assert!(engine.set_possession(Side::B).unwrap().is_valid());
        assert_eq!(engine.game().state.possession, Some(Side::B));
    }

    #[test]
    fn clock_expiry_ends_the_period_once() {
        let mut engine = live(basketball::config());
        assert!(engine.toggle_game_clock().unwrap().is_valid());
        assert!(
            engine
                .update_game_time(TimeValue {
                    minutes: 0,
                    seconds: 0,
                    tenths: 1
                })
                .unwrap()
                .is_valid()
        );
        assert!(!engine.game().state.period_over);

        assert!(engine.update_game_time(TimeValue::default()).unwrap().is_valid());
        assert!(engine.update_game_time(TimeValue::default()).unwrap().is_valid());

        let game = engine.game();
        assert!(game.state.period_over);
        assert!(!game.state.clock.game_running);
        assert!(!game.state.clock.secondary_running);
        let markers: Vec<_> = game
            .action_log
            .iter()
            .filter(|action| action.kind == ActionKind::PeriodEnd)
            .collect();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].side, None);
    }

    #[test]
    fn advancing_resets_clocks_and_quarter_fouls() {
        let mut engine = live(basketball::config());
        assert!(engine.record_violation(Side::A, "personal_foul", None).is_valid());
        assert_eq!(
            engine.game().team(Side::A).stats.number("foulsThisQuarter"),
            Some(1)
        );
        assert!(engine.update_game_time(TimeValue::default()).unwrap().is_valid());
        assert!(engine.advance_period().is_valid());

        let game = engine.game();
        assert_eq!(game.state.current_period, 2);
        assert!(!game.state.period_over);
        assert_eq!(game.state.clock.game, TimeValue::from_minutes(10));
        assert_eq!(game.state.clock.secondary, Some(24));
        assert_eq!(game.team(Side::A).stats.number("foulsThisQuarter"), Some(0));
        assert_eq!(game.team(Side::A).stats.number("teamFouls"), Some(1));
        assert_eq!(engine.period_label(), "Q2");
    }

    #[test]
    fn overtime_follows_a_tied_regulation() {
        let mut engine = live(basketball::config());
        for _ in 0..3 {
            assert!(engine.advance_period().is_valid());
        }
        assert!(engine.update_game_time(TimeValue::default()).unwrap().is_valid());
        assert!(!engine.should_end_game());

        assert!(engine.advance_period().is_valid());
        assert_eq!(engine.game().state.current_period, 5);
        assert_eq!(engine.game().state.clock.game, TimeValue::from_minutes(5));
        assert_eq!(engine.period_label(), "OT1");
    }

    #[test]
    fn decided_games_cannot_advance() {
        let mut engine = live(basketball::config());
        for _ in 0..3 {
            assert!(engine.advance_period().is_valid());
        }
        assert!(engine.record_score(Side::A, "two_pointer", None).is_valid());
        assert!(engine.update_game_time(TimeValue::default()).unwrap().is_valid());
        assert!(engine.should_end_game());
        assert_eq!(engine.winner(), Some(Side::A));
        assert_eq!(
            engine.advance_period(),
            Validation::Invalid(Rejection::GameComplete)
        );
    }

    #[test]
    fn regulation_without_overtime_stops_at_the_period_count() {
        let mut config = basketball::config();
        config.rules.overtime.enabled = false;
        let mut engine = live(config);
        for _ in 0..3 {
            assert!(engine.advance_period().is_valid());
        }
        assert_eq!(engine.game().state.current_period, 4);
        assert!(!engine.should_end_game());

        let before = engine.snapshot();
        assert_eq!(
            engine.advance_period(),
            Validation::Invalid(Rejection::GameComplete)
        );
        assert_eq!(engine.game().state.current_period, 4);
        assert_eq!(*engine.snapshot(), *before);
    }

    #[test]
    fn undoing_a_set_point_reopens_the_set() {
        let mut engine = live(badminton::config());
        for _ in 0..21 {
            assert!(engine.record_score(Side::B, "point", None).is_valid());
        }
        assert_eq!(engine.game().team(Side::B).stats.number(badminton::SETS_WON), Some(1));

        // the period_end marker goes first and takes the set credit with it
        assert!(engine.undo_last_action().is_valid());
        let game = engine.game();
        assert!(!game.state.period_over);
        assert_eq!(game.team(Side::B).stats.number(badminton::SETS_WON), Some(0));
        assert_eq!(game.team(Side::B).score, 21);

        assert!(engine.undo_last_action().is_valid());
        let game = engine.game();
        assert_eq!(game.team(Side::B).score, 20);
        assert_eq!(game.period_score(Side::B), 20);
        assert!(!engine.should_end_game());

        assert!(engine.record_score(Side::A, "point", None).is_valid());
        assert_eq!(engine.game().team(Side::A).score, 1);
        assert!(!engine.game().state.period_over);
    }

    #[test]
    fn badminton_sets_are_settled_from_the_period_score() {
        let mut engine = live(badminton::config());
        for _ in 0..21 {
            assert!(engine.record_score(Side::B, "point", None).is_valid());
        }
        let game = engine.game();
        assert!(game.state.period_over);
        assert_eq!(game.team(Side::B).stats.number(badminton::SETS_WON), Some(1));
        assert_eq!(
            engine.record_score(Side::A, "point", None),
            Validation::rule("Set is over; start the next set")
        );

        assert!(engine.advance_period().is_valid());
        assert_eq!(engine.game().period_score(Side::B), 0);
        assert_eq!(engine.game().team(Side::B).score, 21);
        for _ in 0..21 {
            assert!(engine.record_score(Side::B, "point", None).is_valid());
        }
        assert!(engine.should_end_game());
        assert_eq!(engine.winner(), Some(Side::B));
        assert_eq!(
            engine.advance_period(),
            Validation::Invalid(Rejection::GameComplete)
        );
    }

    #[test]
    fn lifecycle_operations_follow_the_transition_table() {
        let mut engine = live(basketball::config());
        assert!(engine.toggle_game_clock().unwrap().is_valid());
        assert!(engine.pause().is_valid());
        assert_eq!(engine.game().status, GameStatus::Paused);
        assert!(!engine.game().state.clock.game_running);
        assert!(matches!(
            engine.record_score(Side::A, "free_throw", None),
            Validation::Invalid(Rejection::GameNotLive(GameStatus::Paused))
        ));
        assert!(matches!(
            engine.start(),
            Validation::Invalid(Rejection::InvalidTransition(_))
        ));
        assert!(engine.resume().is_valid());
        assert!(engine.end_game().is_valid());
        assert_eq!(engine.game().status, GameStatus::Completed);
        assert!(!engine.cancel().is_valid());
    }

    #[test]
    fn events_flag_players_and_respect_requirements() {
        let mut engine = live(basketball::config());
        assert!(matches!(
            engine.record_event(Side::A, "injury", None, None),
            Validation::Invalid(Rejection::Rule(_))
        ));
        assert!(
            engine
                .record_event(Side::A, "injury", Some("a1"), Some("ankle".into()))
                .is_valid()
        );
        let game = engine.game();
        assert!(game.team(Side::A).player("a1").unwrap().injured);
        let entry = game.action_log.last().unwrap();
        assert_eq!(entry.kind, ActionKind::Custom);
        assert_eq!(entry.notes.as_deref(), Some("ankle"));

        let mut badminton = live(badminton::config());
        assert_eq!(
            badminton.record_event(Side::A, "substitution", Some("a1"), None),
            Validation::Invalid(Rejection::UnknownAction("substitution".into()))
        );
    }

    #[test]
    fn players_can_be_added_until_the_roster_is_full() {
        let mut engine = engine_for(badminton::config());
        assert!(
            engine
                .add_player(
                    Side::A,
                    PlayerSetup {
                        id: Some("a2".into()),
                        name: "Cy".into(),
                        ..PlayerSetup::default()
                    }
                )
                .is_valid()
        );
        assert_eq!(
            engine.game().team(Side::A).player("a2").unwrap().stats.number("aces"),
            Some(0)
        );
        assert!(matches!(
            engine.add_player(Side::A, PlayerSetup::default()),
            Validation::Invalid(Rejection::Rule(_))
        ));
        assert_eq!(
            engine.add_player(
                Side::B,
                PlayerSetup {
                    id: Some("b1".into()),
                    ..PlayerSetup::default()
                }
            ),
            Validation::Invalid(Rejection::DuplicatePlayer {
                side: Side::B,
                player_id: "b1".into()
            })
        );
    }

    #[test]
    fn secondary_clock_resets_to_the_sport_default() {
        let mut engine = live(kabaddi::config());
        assert!(engine.update_secondary_clock(12).unwrap().is_valid());
        assert_eq!(engine.game().state.clock.secondary, Some(12));
        assert!(engine.reset_secondary_clock(None).unwrap().is_valid());
        assert_eq!(engine.game().state.clock.secondary, Some(30));
        assert!(engine.reset_secondary_clock(Some(14)).unwrap().is_valid());
        assert_eq!(engine.game().state.clock.secondary, Some(14));
    }

    #[test]
    fn remote_snapshots_are_installed_as_received() {
        let mut engine = live(basketball::config());
        let mut receiver = engine.subscribe();
        let mut remote = (*engine.snapshot()).clone();
        remote.team_mut(Side::B).score = 7;
        remote.last_update += 1_000;

        engine.replace_state(remote.clone());
        assert_eq!(*engine.snapshot(), remote);
        assert_eq!(receiver.try_recv().unwrap().origin, Origin::Remote);
    }

    #[test]
    fn derived_stats_are_computed_on_demand() {
        let mut engine = live(basketball::config());
        assert!(engine.record_score(Side::A, "free_throw", Some("a1")).is_valid());
        let derived = engine.derived_stats(Side::A, "a1").unwrap();
        assert_eq!(derived["ftPercentage"], "100.0");
        assert!(engine.derived_stats(Side::A, "zz").is_none());
    }
}
