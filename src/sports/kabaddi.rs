//! Kabaddi: two timed halves of raids, with a raid timer.

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
pub const ID: &str = "kabaddi";

/// Build the kabaddi plugin.
pub fn config() -> SportConfig {
    SportConfig {
        meta: SportMeta {
            id: ID.to_owned(),
            name: "Kabaddi".to_owned(),
            icon: "🤼".to_owned(),
            description: "Contact team sport with raids".to_owned(),
            color: "#DC2626".to_owned(),
            enabled: true,
        },
        rules: SportRules {
            period_config: PeriodConfig {
                kind: PeriodKind::Half,
                count: 2,
                duration: 20,
            },
            timing: TimingRules {
                has_game_clock: true,
                clock_direction: ClockDirection::Down,
                has_secondary_clock: true,
                secondary_clock_duration: Some(30),
                secondary_clock_label: Some("Raid Timer".to_owned()),
            },
            scoring: ScoringRules {
                win_condition: WinCondition::HighestScore,
                target_score: None,
                sets_to_win: None,
                win_by_margin: None,
                max_score: None,
            },
            team: TeamRules {
                min_players: 7,
                max_players: 12,
                allow_substitutions: true,
                timeouts_per_period: Some(2),
                max_fouls: None,
            },
            overtime: OvertimeRules {
                enabled: true,
                duration: Some(7),
                sudden_death: false,
            },
            tracks_possession: true,
        },
        actions: ActionCatalog {
            scores: vec![
                raid_point("touch_point", "Touch Point", "Touch", 1, "#3B82F6", "touchPoints"),
                raid_point("bonus_point", "Bonus Point", "Bonus", 1, "#10B981", "bonusPoints"),
                ScoreAction {
                    id: "all_out".to_owned(),
                    label: "All Out".to_owned(),
                    short_label: "All Out".to_owned(),
                    value: 2,
                    color: "#F59E0B".to_owned(),
                    icon: Some("💥".to_owned()),
                    player_stats: Vec::new(),
                    team_stats: vec![StatUpdate::count("allOuts")],
                },
                ScoreAction {
                    id: "super_tackle".to_owned(),
                    label: "Super Tackle".to_owned(),
                    short_label: "S.Tackle".to_owned(),
                    value: 2,
                    color: "#8B5CF6".to_owned(),
                    icon: Some("🛡️".to_owned()),
                    player_stats: vec![
                        StatUpdate::value("points"),
                        StatUpdate::count("superTackles"),
                        StatUpdate::count("tackles"),
                    ],
                    team_stats: Vec::new(),
                },
            ],
            violations: vec![
                ViolationAction {
                    id: "out".to_owned(),
                    label: "Out".to_owned(),
                    color: "#EF4444".to_owned(),
                    penalty_type: PenaltyKind::Score,
                    penalty_value: Some(1),
                    player_stats: vec![StatUpdate::count("outs")],
                    team_stats: Vec::new(),
                },
                ViolationAction {
                    id: "technical_point".to_owned(),
                    label: "Technical Point".to_owned(),
                    color: "#F59E0B".to_owned(),
                    penalty_type: PenaltyKind::Score,
                    penalty_value: Some(1),
                    player_stats: Vec::new(),
                    team_stats: Vec::new(),
                },
                ViolationAction {
                    id: "empty_raid".to_owned(),
                    label: "Empty Raid".to_owned(),
                    color: "#6B7280".to_owned(),
                    penalty_type: PenaltyKind::Possession,
                    penalty_value: None,
                    player_stats: vec![StatUpdate::count("raids"), StatUpdate::count("emptyRaids")],
                    team_stats: Vec::new(),
                },
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
                CustomEvent {
                    id: "review".to_owned(),
                    label: "Video Review".to_owned(),
                    kind: EventKind::Challenge,
                    requires_player: false,
                },
            ],
        },
        player_stats: vec![
            StatDefinition::counter("points", "Total Points", "PTS"),
            StatDefinition::counter("touchPoints", "Touch Points", "TP"),
            StatDefinition::counter("bonusPoints", "Bonus Points", "BP"),
            StatDefinition::counter("superTackles", "Super Tackles", "ST"),
            StatDefinition::counter("tackles", "Tackles", "T"),
            StatDefinition::counter("raids", "Raids", "R"),
            StatDefinition::counter("successfulRaids", "Successful Raids", "SR"),
            StatDefinition::hidden_counter("emptyRaids", "Empty Raids"),
            StatDefinition::hidden_counter("outs", "Outs"),
        ],
        team_stats: vec![
            StatDefinition::counter("score", "Score", "PTS"),
            StatDefinition::counter("allOuts", "All Outs", "AO"),
        ],
        rulebook: Arc::new(KabaddiRules),
    }
}

fn raid_point(
    id: &str,
    label: &str,
    short_label: &str,
    value: i32,
    color: &str,
    counter: &str,
) -> ScoreAction {
    ScoreAction {
        id: id.to_owned(),
        label: label.to_owned(),
        short_label: short_label.to_owned(),
        value,
        color: color.to_owned(),
        icon: None,
        player_stats: vec![
            StatUpdate::value("points"),
            StatUpdate::value(counter),
            StatUpdate::count("raids"),
            StatUpdate::count("successfulRaids"),
        ],
        team_stats: Vec::new(),
    }
}

#[derive(Debug)]
struct KabaddiRules;

impl Rulebook for KabaddiRules {
    fn validate_action(&self, _action: &GameAction, _game: &Game) -> Validation {
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
        IndexMap::from([(
            "raidSuccessRate".to_owned(),
            percentage(player, "successfulRaids", "raids"),
        )])
    }
}
