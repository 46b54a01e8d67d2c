use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the multisport scoreboard backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sports::list_sports,
        crate::routes::game::create_game,
        crate::routes::game::get_game,
        crate::routes::game::delete_game,
        crate::routes::game::execute_command,
        crate::routes::game::winner,
        crate::routes::game::add_player,
        crate::routes::game::player_stats,
        crate::routes::sse::game_stream,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::sports::SportSummary,
            crate::dto::game::CreateGameRequest,
            crate::dto::game::TeamInput,
            crate::dto::game::PlayerInput,
            crate::dto::game::MetadataInput,
            crate::dto::game::GameView,
            crate::dto::game::SyncStatus,
            crate::dto::game::CommandOutcome,
            crate::dto::game::WinnerResponse,
            crate::dto::game::PlayerStatsResponse,
            crate::dto::command::GameCommand,
            crate::dto::sse::Handshake,
            crate::dto::sse::SystemStatus,
            crate::dto::sse::SnapshotOrigin,
            crate::dto::sse::SnapshotEvent,
            crate::dto::sse::GameClosedEvent,
            crate::error::ErrorBody,
            crate::state::game::Side,
            crate::state::game::GameStatus,
            crate::state::game::TimeValue,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sports", description = "Registered sports and their rules"),
        (name = "game", description = "Game lifecycle and scorer commands"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
/// OpenAPI document of the whole HTTP surface.
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_game_routes() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();
        assert!(paths.contains(&"/games"));
        assert!(paths.contains(&"/games/{code}/commands"));
        assert!(paths.contains(&"/games/{code}/sse"));
    }

    #[test]
    fn derived_stats_are_documented_as_a_string_map() {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().unwrap().schemas;
        let player_stats = serde_json::to_value(&schemas["PlayerStatsResponse"]).unwrap();

        let derived = &player_stats["properties"]["derived"];
        assert_eq!(derived["type"], "object");
        assert_eq!(derived["additionalProperties"]["type"], "string");
    }
}
