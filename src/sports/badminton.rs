//! Badminton: rally scoring, best of three sets to 21 (win by 2, capped at 30).

use std::sync::Arc;

use crate::{
    sports::{
        ActionCatalog, ClockDirection, CustomEvent, EventKind, OvertimeRules, PenaltyKind,
        PeriodConfig, PeriodKind, Rulebook, ScoreAction, ScoringRules, SportConfig, SportMeta,
        SportRules, StatUpdate, TeamRules, TeamStatDelta, TimingRules, ViolationAction,
        WinCondition,
    },
    state::{
        action::GameAction,
        game::{Game, Side},
        stats::StatDefinition,
        validation::Validation,
    },
};

/// Sport identifier.
pub const ID: &str = "badminton";
/// Team stat counting sets won.
pub const SETS_WON: &str = "setsWon";

const TARGET_SCORE: i32 = 21;
const WIN_BY_MARGIN: i32 = 2;
const MAX_SCORE: i32 = 30;
const SETS_TO_WIN: i64 = 2;

/// Build the badminton plugin.
pub fn config() -> SportConfig {
    SportConfig {
        meta: SportMeta {
            id: ID.to_owned(),
            name: "Badminton".to_owned(),
            icon: "🏸".to_owned(),
            description: "Racquet sport with shuttlecock".to_owned(),
            color: "#10B981".to_owned(),
            enabled: true,
        },
        rules: SportRules {
            period_config: PeriodConfig {
                kind: PeriodKind::Set,
                count: 3,
                duration: 0,
            },
            timing: TimingRules {
                has_game_clock: false,
                clock_direction: ClockDirection::Up,
                has_secondary_clock: false,
                secondary_clock_duration: None,
                secondary_clock_label: None,
            },
            scoring: ScoringRules {
                win_condition: WinCondition::BestOfSets,
                target_score: Some(TARGET_SCORE),
                sets_to_win: Some(SETS_TO_WIN),
                win_by_margin: Some(WIN_BY_MARGIN),
                max_score: Some(MAX_SCORE),
            },
            team: TeamRules {
                min_players: 1,
                max_players: 2,
                allow_substitutions: false,
                timeouts_per_period: Some(0),
                max_fouls: None,
            },
            overtime: OvertimeRules {
                enabled: false,
                duration: None,
                sudden_death: false,
            },
            tracks_possession: true,
        },
        actions: ActionCatalog {
            scores: vec![
                ScoreAction {
                    id: "point".to_owned(),
                    label: "Point".to_owned(),
                    short_label: "+1".to_owned(),
                    value: 1,
                    color: "#10B981".to_owned(),
                    icon: Some("🏸".to_owned()),
                    player_stats: vec![StatUpdate::value("points")],
                    team_stats: Vec::new(),
                },
                ScoreAction {
                    id: "ace".to_owned(),
                    label: "Ace (Service Winner)".to_owned(),
                    short_label: "ACE".to_owned(),
                    value: 1,
                    color: "#3B82F6".to_owned(),
                    icon: Some("⚡".to_owned()),
                    player_stats: vec![StatUpdate::value("points"), StatUpdate::count("aces")],
                    team_stats: Vec::new(),
                },
            ],
            violations: vec![
                ViolationAction {
                    id: "fault".to_owned(),
                    label: "Fault".to_owned(),
                    color: "#EF4444".to_owned(),
                    penalty_type: PenaltyKind::Possession,
                    penalty_value: Some(1),
                    player_stats: vec![StatUpdate::count("faults")],
                    team_stats: Vec::new(),
                },
                ViolationAction {
                    id: "let".to_owned(),
                    label: "Let (Replay)".to_owned(),
                    color: "#F59E0B".to_owned(),
                    penalty_type: PenaltyKind::None,
                    penalty_value: Some(0),
                    player_stats: Vec::new(),
                    team_stats: Vec::new(),
                },
                ViolationAction {
                    id: "misconduct".to_owned(),
                    label: "Misconduct".to_owned(),
                    color: "#DC2626".to_owned(),
                    penalty_type: PenaltyKind::Score,
                    penalty_value: Some(1),
                    player_stats: vec![StatUpdate::count("misconducts")],
                    team_stats: Vec::new(),
                },
            ],
            events: vec![
                CustomEvent {
                    id: "injury".to_owned(),
                    label: "Injury Timeout".to_owned(),
                    kind: EventKind::Injury,
                    requires_player: true,
                },
                CustomEvent {
                    id: "challenge".to_owned(),
                    label: "Challenge".to_owned(),
                    kind: EventKind::Challenge,
                    requires_player: false,
                },
            ],
        },
        player_stats: vec![
            StatDefinition::counter("points", "Points", "PTS"),
            StatDefinition::counter("aces", "Aces", "ACE"),
            StatDefinition::counter("smashes", "Smashes", "SMH"),
            StatDefinition::counter("drops", "Drop Shots", "DRP"),
            StatDefinition::counter("clears", "Clears", "CLR"),
            StatDefinition::counter("faults", "Faults", "FLT"),
            StatDefinition::hidden_counter("misconducts", "Misconducts"),
        ],
        team_stats: vec![
            StatDefinition::counter("score", "Score", "PTS"),
            StatDefinition::counter(SETS_WON, "Sets Won", "SETS"),
        ],
        rulebook: Arc::new(BadmintonRules),
    }
}

#[derive(Debug)]
struct BadmintonRules;

impl BadmintonRules {
    fn sets_won(game: &Game, side: Side) -> i64 {
        game.team(side).stats.number(SETS_WON).unwrap_or_default()
    }
}

/// Whether a set standing at `leader`-`trailer` is over.
fn set_decided(leader: i32, trailer: i32, scoring: &ScoringRules) -> bool {
    let target = scoring.target_score.unwrap_or(TARGET_SCORE);
    let margin = scoring.win_by_margin.unwrap_or(WIN_BY_MARGIN);
    let cap = scoring.max_score.unwrap_or(MAX_SCORE);

    leader >= cap || (leader >= target && leader - trailer >= margin)
}

impl Rulebook for BadmintonRules {
    fn validate_action(&self, action: &GameAction, game: &Game) -> Validation {
        if game.state.period_over {
            return Validation::rule("Set is over; start the next set");
        }
        let Some(side) = action.side else {
            return Validation::Valid;
        };

        let cap = game.settings.rules.scoring.max_score.unwrap_or(MAX_SCORE);
        if game.period_score(side) >= cap || game.period_score(side.opponent()) >= cap {
            return Validation::rule("Maximum score reached");
        }

        Validation::Valid
    }

    fn should_end_period(&self, game: &Game) -> bool {
        let a = game.period_score(Side::A);
        let b = game.period_score(Side::B);
        let scoring = &game.settings.rules.scoring;

        set_decided(a, b, scoring) || set_decided(b, a, scoring)
    }

    fn should_end_game(&self, game: &Game) -> bool {
        let needed = game.settings.rules.scoring.sets_to_win.unwrap_or(SETS_TO_WIN);
        Side::BOTH
            .into_iter()
            .any(|side| Self::sets_won(game, side) >= needed)
    }

    fn winner(&self, game: &Game) -> Option<Side> {
        let a = Self::sets_won(game, Side::A);
        let b = Self::sets_won(game, Side::B);
        match a.cmp(&b) {
            std::cmp::Ordering::Greater => Some(Side::A),
            std::cmp::Ordering::Less => Some(Side::B),
            std::cmp::Ordering::Equal => None,
        }
    }

    fn settle_period(&self, game: &Game) -> Vec<TeamStatDelta> {
        let a = game.period_score(Side::A);
        let b = game.period_score(Side::B);
        let set_winner = match a.cmp(&b) {
            std::cmp::Ordering::Greater => Side::A,
            std::cmp::Ordering::Less => Side::B,
            std::cmp::Ordering::Equal => return Vec::new(),
        };

        vec![TeamStatDelta {
            side: set_winner,
            stat: SETS_WON.to_owned(),
            delta: 1,
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scoring() -> ScoringRules {
        config().rules.scoring
    }

    #[test]
    fn set_needs_target_and_margin() {
        let scoring = scoring();
        assert!(!set_decided(20, 19, &scoring));
        assert!(!set_decided(21, 20, &scoring));
        assert!(set_decided(21, 19, &scoring));
        assert!(set_decided(25, 23, &scoring));
        assert!(!set_decided(29, 28, &scoring));
    }

    #[test]
    fn cap_closes_the_set_regardless_of_margin() {
        let scoring = scoring();
        assert!(set_decided(30, 29, &scoring));
        assert!(set_decided(30, 28, &scoring));
    }
}
