//! Basketball: four timed quarters with a shot clock.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::{
    sports::{
        ActionCatalog, ClockDirection, CustomEvent, EventKind, OvertimeRules, PenaltyKind,
        PeriodConfig, PeriodKind, Rulebook, ScoreAction, ScoringRules, SportConfig, SportMeta,
        SportRules, StatUpdate, TeamRules, TimingRules, ViolationAction, WinCondition,
        clock_expired, higher_score, percentage,
    },
    state::{
        action::GameAction,
        game::{Game, Player, Side},
        stats::StatDefinition,
        validation::Validation,
    },
};

/// Sport identifier.
pub const ID: &str = "basketball";

/// Build the basketball plugin.
pub fn config() -> SportConfig {
    SportConfig {
        meta: SportMeta {
            id: ID.to_owned(),
            name: "Basketball".to_owned(),
            icon: "🏀".to_owned(),
            description: "5v5 court sport with hoops".to_owned(),
            color: "#F97316".to_owned(),
            enabled: true,
        },
        rules: SportRules {
            period_config: PeriodConfig {
                kind: PeriodKind::Quarter,
                count: 4,
                duration: 10,
            },
            timing: TimingRules {
                has_game_clock: true,
                clock_direction: ClockDirection::Down,
                has_secondary_clock: true,
                secondary_clock_duration: Some(24),
                secondary_clock_label: Some("Shot Clock".to_owned()),
            },
            scoring: ScoringRules {
                win_condition: WinCondition::HighestScore,
                target_score: None,
                sets_to_win: None,
                win_by_margin: None,
                max_score: None,
            },
            team: TeamRules {
                min_players: 5,
                max_players: 15,
                allow_substitutions: true,
                timeouts_per_period: Some(2),
                max_fouls: Some(5),
            },
            overtime: OvertimeRules {
                enabled: true,
                duration: Some(5),
                sudden_death: false,
            },
            tracks_possession: true,
        },
        actions: ActionCatalog {
            scores: vec![
                score(
                    "free_throw",
                    "Free Throw",
                    "+1",
                    1,
                    "#FFFFFF",
                    &["freeThrowsMade", "freeThrowsAttempted"],
                ),
                score(
                    "two_pointer",
                    "2-Point Field Goal",
                    "+2",
                    2,
                    "#3B82F6",
                    &["fieldGoalsMade", "fieldGoalsAttempted"],
                ),
                score(
                    "three_pointer",
                    "3-Point Field Goal",
                    "+3",
                    3,
                    "#10B981",
                    &[
                        "threePointsMade",
                        "threePointsAttempted",
                        "fieldGoalsMade",
                        "fieldGoalsAttempted",
                    ],
                ),
            ],
            violations: vec![
                foul("personal_foul", "Personal Foul", "#EAB308", PenaltyKind::Score, 1, true),
                foul("technical_foul", "Technical Foul", "#EF4444", PenaltyKind::Score, 1, false),
                foul(
                    "flagrant_foul",
                    "Flagrant Foul",
                    "#DC2626",
                    PenaltyKind::Disqualify,
                    2,
                    false,
                ),
            ],
            events: vec![
                CustomEvent {
                    id: "substitution".to_owned(),
                    label: "Substitution".to_owned(),
                    kind: EventKind::Substitution,
                    requires_player: true,
                },
                CustomEvent {
                    id: "injury".to_owned(),
                    label: "Injury Timeout".to_owned(),
                    kind: EventKind::Injury,
                    requires_player: true,
                },
            ],
        },
        player_stats: vec![
            StatDefinition::counter("points", "Points", "PTS"),
            StatDefinition::counter("rebounds", "Rebounds", "REB"),
            StatDefinition::counter("assists", "Assists", "AST"),
            StatDefinition::counter("steals", "Steals", "STL"),
            StatDefinition::counter("blocks", "Blocks", "BLK"),
            StatDefinition::counter("turnovers", "Turnovers", "TO"),
            StatDefinition::counter("fouls", "Fouls", "PF"),
            StatDefinition::hidden_counter("fieldGoalsMade", "Field Goals Made"),
            StatDefinition::hidden_counter("fieldGoalsAttempted", "Field Goals Attempted"),
            StatDefinition::hidden_counter("threePointsMade", "3-Pointers Made"),
            StatDefinition::hidden_counter("threePointsAttempted", "3-Pointers Attempted"),
            StatDefinition::hidden_counter("freeThrowsMade", "Free Throws Made"),
            StatDefinition::hidden_counter("freeThrowsAttempted", "Free Throws Attempted"),
        ],
        team_stats: vec![
            StatDefinition::counter("score", "Score", "PTS"),
            StatDefinition::counter("teamFouls", "Team Fouls", "TF"),
            StatDefinition::counter("foulsThisQuarter", "Fouls This Quarter", "QF"),
        ],
        rulebook: Arc::new(BasketballRules),
    }
}

fn score(
    id: &str,
    label: &str,
    short_label: &str,
    value: i32,
    color: &str,
    counters: &[&str],
) -> ScoreAction {
    let mut player_stats = vec![StatUpdate::value("points")];
    player_stats.extend(counters.iter().map(|stat| StatUpdate::count(stat)));
    ScoreAction {
        id: id.to_owned(),
        label: label.to_owned(),
        short_label: short_label.to_owned(),
        value,
        color: color.to_owned(),
        icon: None,
        player_stats,
        team_stats: Vec::new(),
    }
}

fn foul(
    id: &str,
    label: &str,
    color: &str,
    penalty_type: PenaltyKind,
    penalty_value: i32,
    counts_for_quarter: bool,
) -> ViolationAction {
    let mut team_stats = vec![StatUpdate::count("teamFouls")];
    if counts_for_quarter {
        team_stats.push(StatUpdate::count("foulsThisQuarter"));
    }
    ViolationAction {
        id: id.to_owned(),
        label: label.to_owned(),
        color: color.to_owned(),
        penalty_type,
        penalty_value: Some(penalty_value),
        player_stats: vec![StatUpdate::count("fouls")],
        team_stats,
    }
}

#[derive(Debug)]
struct BasketballRules;

impl Rulebook for BasketballRules {
    fn validate_action(&self, action: &GameAction, game: &Game) -> Validation {
        let (Some(side), Some(player_id)) = (action.side, action.player_id.as_deref()) else {
            return Validation::Valid;
        };
        let Some(player) = game.team(side).player(player_id) else {
            return Validation::Valid;
        };

        if player.disqualified {
            return Validation::rule("Player is disqualified");
        }
        let max_fouls = game.settings.rules.team.max_fouls;
        if let (Some(limit), Some(fouls)) = (max_fouls, player.stats.number("fouls")) {
            if fouls >= limit {
                return Validation::rule("Player has fouled out");
            }
        }

        Validation::Valid
    }

    fn should_end_period(&self, game: &Game) -> bool {
        clock_expired(game)
    }

    fn should_end_game(&self, game: &Game) -> bool {
        game.state.current_period >= game.settings.rules.period_config.count
            && clock_expired(game)
            && higher_score(game).is_some()
    }

    fn winner(&self, game: &Game) -> Option<Side> {
        higher_score(game)
    }

    fn derived_stats(&self, player: &Player) -> IndexMap<String, String> {
        IndexMap::from([
            (
                "fgPercentage".to_owned(),
                percentage(player, "fieldGoalsMade", "fieldGoalsAttempted"),
            ),
            (
                "threePercentage".to_owned(),
                percentage(player, "threePointsMade", "threePointsAttempted"),
            ),
            (
                "ftPercentage".to_owned(),
                percentage(player, "freeThrowsMade", "freeThrowsAttempted"),
            ),
        ])
    }

    fn period_scoped_team_stats(&self) -> &[&'static str] {
        &["foulsThisQuarter"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        sports::{GameSetup, PlayerSetup, TeamSetup},
        state::{
            action::{ActionKind, ActionResult},
            game::{GameCode, TimeValue},
            stats::StatValue,
        },
    };

    fn game() -> Game {
        config().create_game(
            GameCode::generate(),
            GameSetup {
                track_player_stats: true,
                team_a: TeamSetup {
                    players: vec![PlayerSetup {
                        id: Some("p1".into()),
                        ..PlayerSetup::default()
                    }],
                    ..TeamSetup::default()
                },
                ..GameSetup::default()
            },
        )
    }

    fn action_by(player_id: &str) -> GameAction {
        GameAction {
            id: uuid::Uuid::new_v4(),
            timestamp: 0,
            kind: ActionKind::Score,
            side: Some(Side::A),
            player_id: Some(player_id.to_owned()),
            player_name: None,
            action: "two_pointer".into(),
            value: 2,
            period: 1,
            game_time: TimeValue::default(),
            result: ActionResult::default(),
            notes: None,
            undone: false,
        }
    }

    #[test]
    fn fouled_out_players_are_refused() {
        let mut game = game();
        let rules = BasketballRules;
        assert!(rules.validate_action(&action_by("p1"), &game).is_valid());

        game.team_mut(Side::A).players[0]
            .stats
            .set("fouls", StatValue::Number(5));
        assert_eq!(
            rules.validate_action(&action_by("p1"), &game),
            Validation::rule("Player has fouled out")
        );
    }

    #[test]
    fn disqualified_players_are_refused() {
        let mut game = game();
        game.team_mut(Side::A).players[0].disqualified = true;
        assert_eq!(
            BasketballRules.validate_action(&action_by("p1"), &game),
            Validation::rule("Player is disqualified")
        );
    }

    #[test]
    fn game_ends_only_after_regulation_with_a_leader() {
        let mut game = game();
        let rules = BasketballRules;
        game.state.clock.game = TimeValue::default();
        assert!(rules.should_end_period(&game));
        assert!(!rules.should_end_game(&game));

        game.state.current_period = 4;
        assert!(!rules.should_end_game(&game), "tied after regulation");

        game.team_mut(Side::B).score = 88;
        assert!(rules.should_end_game(&game));
        assert_eq!(rules.winner(&game), Some(Side::B));
    }

    #[test]
    fn derived_percentages_use_one_decimal() {
        let mut player = game().team(Side::A).players[0].clone();
        player.stats.set("fieldGoalsMade", StatValue::Number(1));
        player.stats.set("fieldGoalsAttempted", StatValue::Number(3));

        let derived = BasketballRules.derived_stats(&player);
        assert_eq!(derived["fgPercentage"], "33.3");
        assert_eq!(derived["threePercentage"], "0.0");
    }
}
