use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::{
    config::AppConfig,
    dto::{
        format_epoch_millis,
        validation::{validate_hex_color, validate_identifier},
    },
    sports::{GameSetup, PlayerSetup, SportConfig, TeamSetup},
    state::{
        engine::GameEngine,
        game::{Game, GameMetadata, GameStatus, Officials, Side, TournamentRef},
        stats::StatSheet,
    },
    sync::SyncError,
};

/// Payload used to create a game in `setup` status.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameRequest {
    /// Sport identifier, see `GET /sports`.
    #[validate(length(min = 1, max = 64))]
    pub sport: String,
    /// Display name of the fixture.
    #[validate(length(min = 1, max = 120))]
    pub game_name: String,
    /// Venue name.
    #[serde(default)]
    #[validate(length(max = 120))]
    pub venue: Option<String>,
    /// Scheduled start, epoch milliseconds.
    #[serde(default)]
    pub date: Option<u64>,
    /// Record per-player stats for this game.
    #[serde(default)]
    pub track_player_stats: bool,
    /// Side A.
    #[validate(nested)]
    pub team_a: TeamInput,
    /// Side B.
    #[validate(nested)]
    pub team_b: TeamInput,
    /// Host, tournament and officials.
    #[serde(default)]
    #[validate(nested)]
    pub metadata: Option<MetadataInput>,
}

/// Incoming definition of one side.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TeamInput {
    /// Team name.
    #[validate(length(min = 1, max = 60))]
    pub name: String,
    /// `#RRGGBB`. If omitted, the configured default color of the side is used.
    #[serde(default)]
    #[validate(custom(function = "validate_hex_color"))]
    pub color: Option<String>,
    /// Logo URL.
    #[serde(default)]
    #[validate(url)]
    pub logo: Option<String>,
    /// Initial roster.
    #[serde(default)]
    #[validate(nested)]
    pub players: Vec<PlayerInput>,
}

/// Incoming roster entry.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInput {
    /// Generated when omitted.
    #[serde(default)]
    #[validate(custom(function = "validate_identifier"))]
    pub id: Option<String>,
    /// Shirt number.
    #[validate(length(max = 8))]
    pub number: String,
    /// Player name.
    #[validate(length(min = 1, max = 60))]
    pub name: String,
    /// Free-form position, e.g. `PG`.
    #[serde(default)]
    pub position: Option<String>,
    /// Part of the starting lineup.
    #[serde(default)]
    pub is_starter: bool,
}

/// Descriptive data attached at creation.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetadataInput {
    /// Organising user id.
    #[serde(default)]
    pub host_id: Option<String>,
    /// Organising user name.
    #[serde(default)]
    pub host_name: Option<String>,
    /// Set together with `tournamentName`.
    #[serde(default)]
    pub tournament_id: Option<String>,
    /// Set together with `tournamentId`.
    #[serde(default)]
    pub tournament_name: Option<String>,
    /// Tournament round, e.g. `semi-final`.
    #[serde(default)]
    pub round: Option<String>,
    /// Referee name.
    #[serde(default)]
    pub referee: Option<String>,
    /// Scorer name.
    #[serde(default)]
    pub scorer: Option<String>,
    /// Timekeeper name.
    #[serde(default)]
    pub timer: Option<String>,
    /// Search tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Free-form notes.
    #[serde(default)]
    pub notes: Option<String>,
}

impl Validate for MetadataInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        // a tournament needs both halves
        if self.tournament_id.is_some() != self.tournament_name.is_some() {
            let mut err = validator::ValidationError::new("tournament");
            err.message = Some("tournamentId and tournamentName go together".into());
            errors.add("tournament_id", err);
        }

        if self.tags.iter().any(|tag| tag.trim().is_empty()) {
            errors.add("tags", validator::ValidationError::new("empty_tag"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl From<PlayerInput> for PlayerSetup {
    fn from(input: PlayerInput) -> Self {
        Self {
            id: input.id,
            number: input.number,
            name: input.name,
            position: input.position,
            is_starter: input.is_starter,
        }
    }
}

impl From<MetadataInput> for GameMetadata {
    fn from(input: MetadataInput) -> Self {
        let tournament = match (input.tournament_id, input.tournament_name) {
            (Some(id), Some(name)) => Some(TournamentRef {
                id,
                name,
                round: input.round,
            }),
            _ => None,
        };
        let officials = Officials {
            referee: input.referee,
            scorer: input.scorer,
            timer: input.timer,
        };
        let has_officials = officials != Officials::default();

        Self {
            host_id: input.host_id,
            host_name: input.host_name,
            tournament,
            officials: has_officials.then_some(officials),
            tags: input.tags,
            notes: input.notes,
        }
    }
}

impl TeamInput {
    fn into_setup(self, side: Side, config: &AppConfig) -> TeamSetup {
        TeamSetup {
            name: self.name,
            color: self
                .color
                .unwrap_or_else(|| config.default_color(side).to_owned()),
            logo: self.logo,
            players: self.players.into_iter().map(Into::into).collect(),
        }
    }
}

impl CreateGameRequest {
    /// Engine-facing setup, with default colors filled in.
    pub fn into_setup(self, config: &AppConfig) -> GameSetup {
        GameSetup {
            game_name: self.game_name,
            venue: self.venue,
            date: self.date,
            track_player_stats: self.track_player_stats,
            team_a: self.team_a.into_setup(Side::A, config),
            team_b: self.team_b.into_setup(Side::B, config),
            metadata: self.metadata.map(Into::into).unwrap_or_default(),
        }
    }
}

/// Full game snapshot plus values derived from it.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    /// Join code.
    pub code: String,
    /// Sport identifier.
    pub sport: String,
    /// Lifecycle status.
    pub status: GameStatus,
    /// Label of the current period, e.g. `Q3` or `OT1`.
    pub period_label: String,
    /// Score of side A.
    pub score_a: i32,
    /// Score of side B.
    pub score_b: i32,
    /// Set once the game is decided.
    pub winner: Option<Side>,
    /// Last update, RFC 3339.
    pub updated_at: String,
    /// The stored document.
    #[schema(value_type = Object)]
    pub game: Game,
}

impl GameView {
    /// Build a view from a snapshot and the values the engine derived from it.
    pub fn new(game: Game, period_label: String, winner: Option<Side>) -> Self {
        Self {
            code: game.code.to_string(),
            sport: game.sport.clone(),
            status: game.status,
            period_label,
            score_a: game.team(Side::A).score,
            score_b: game.team(Side::B).score,
            winner,
            updated_at: format_epoch_millis(game.last_update),
            game,
        }
    }
}

impl GameView {
    /// Build a view of `game` interpreted with its sport plugin.
    pub fn from_snapshot(game: Game, config: &SportConfig) -> Self {
        let period_label = config.period_label(game.state.current_period);
        let winner = decided_winner(&game, config);
        Self::new(game, period_label, winner)
    }
}

impl From<&GameEngine> for GameView {
    fn from(engine: &GameEngine) -> Self {
        Self::from_snapshot(engine.game().clone(), engine.config())
    }
}

/// Winner of a finished or decided game; `None` while play goes on or when level.
pub fn decided_winner(game: &Game, config: &SportConfig) -> Option<Side> {
    let over = game.status == GameStatus::Completed || config.rulebook.should_end_game(game);
    over.then(|| config.rulebook.winner(game)).flatten()
}

/// Result of pushing the new snapshot to the store.
#[derive(Debug, Serialize, ToSchema)]
pub struct SyncStatus {
    /// The snapshot reached the store.
    pub persisted: bool,
    /// Why it did not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncStatus {
    /// The snapshot reached the store.
    pub fn persisted() -> Self {
        Self {
            persisted: true,
            error: None,
        }
    }

    /// The snapshot stayed local.
    pub fn failed(reason: impl ToString) -> Self {
        Self {
            persisted: false,
            error: Some(reason.to_string()),
        }
    }

    /// Status matching a persist attempt.
    pub fn from_result(result: &Result<(), SyncError>) -> Self {
        match result {
            Ok(()) => Self::persisted(),
            Err(err) => Self::failed(err),
        }
    }
}

/// Response to every applied command.
#[derive(Debug, Serialize, ToSchema)]
pub struct CommandOutcome {
    /// Game after the command.
    pub game: GameView,
    /// Outcome of the push to the store.
    pub sync: SyncStatus,
}

/// Winner lookup.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WinnerResponse {
    /// Completed, or decided by the sport's rules.
    pub game_over: bool,
    /// `None` while play goes on or when level.
    pub winner: Option<Side>,
}

/// Stored and derived stats of one player.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStatsResponse {
    /// Player id.
    pub player_id: String,
    /// Side the player is on.
    pub side: Side,
    /// Stats recorded by the engine.
    #[schema(value_type = Object)]
    pub stats: StatSheet,
    /// Ratios and percentages, never stored.
    pub derived: IndexMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: &str) -> CreateGameRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn missing_colors_fall_back_to_config() {
        let payload = request(
            r##"{
                "sport": "basketball",
                "gameName": "Final",
                "teamA": {"name": "Hawks", "color": "#000000"},
                "teamB": {"name": "Owls"}
            }"##,
        );
        assert!(payload.validate().is_ok());

        let setup = payload.into_setup(&AppConfig::default());
        assert_eq!(setup.team_a.color, "#000000");
        assert_eq!(setup.team_b.color, "#3B82F6");
    }

    #[test]
    fn invalid_color_and_empty_name_are_rejected() {
        let payload = request(
            r##"{
                "sport": "basketball",
                "gameName": "",
                "teamA": {"name": "Hawks", "color": "blue"},
                "teamB": {"name": "Owls", "players": [{"number": "4", "name": ""}]}
            }"##,
        );
        let errors = payload.validate().unwrap_err();
        // game name, team A color, team B roster
        assert_eq!(errors.errors().len(), 3);
    }

    #[test]
    fn metadata_builds_tournament_and_officials() {
        let input = MetadataInput {
            tournament_id: Some("t1".into()),
            tournament_name: Some("Spring Cup".into()),
            round: Some("Final".into()),
            referee: Some("Kim".into()),
            ..MetadataInput::default()
        };
        assert!(input.validate().is_ok());

        let metadata = GameMetadata::from(input);
        assert_eq!(metadata.tournament.unwrap().round.as_deref(), Some("Final"));
        assert_eq!(metadata.officials.unwrap().referee.as_deref(), Some("Kim"));
    }

    #[test]
    fn half_a_tournament_is_rejected() {
        let input = MetadataInput {
            tournament_id: Some("t1".into()),
            ..MetadataInput::default()
        };
        assert!(input.validate().is_err());
    }
}
