use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::{
        command::GameCommand,
        game::{
            CommandOutcome, CreateGameRequest, GameView, PlayerInput, PlayerStatsResponse,
            WinnerResponse,
        },
    },
    error::AppError,
    services::game_service,
    state::{SharedState, game::Side},
};

/// Routes creating games and driving them with scorer commands.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games", post(create_game))
        .route("/games/{code}", get(get_game).delete(delete_game))
        .route("/games/{code}/commands", post(execute_command))
        .route("/games/{code}/winner", get(winner))
        .route("/games/{code}/teams/{side}/players", post(add_player))
        .route(
            "/games/{code}/teams/{side}/players/{player_id}/stats",
            get(player_stats),
        )
}

/// Create a game for a registered sport and store it under a fresh join code.
#[utoipa::path(
    post,
    path = "/games",
    tag = "game",
    request_body = CreateGameRequest,
    responses(
        (status = 201, description = "Game created", body = GameView),
        (status = 400, description = "Invalid request or unknown sport", body = crate::error::ErrorBody),
        (status = 503, description = "No healthy store", body = crate::error::ErrorBody)
    )
)]
pub async fn create_game(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateGameRequest>>,
) -> Result<(StatusCode, Json<GameView>), AppError> {
    let view = game_service::create_game(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// Current state of a game.
#[utoipa::path(
    get,
    path = "/games/{code}",
    tag = "game",
    params(("code" = String, Path, description = "Six character join code")),
    responses(
        (status = 200, description = "Game", body = GameView),
        (status = 404, description = "Unknown game", body = crate::error::ErrorBody)
    )
)]
pub async fn get_game(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<GameView>, AppError> {
    Ok(Json(game_service::get_game(&state, &code).await?))
}

/// Delete a game from the store; viewers receive `game.closed`.
#[utoipa::path(
    delete,
    path = "/games/{code}",
    tag = "game",
    params(("code" = String, Path, description = "Six character join code")),
    responses(
        (status = 204, description = "Game deleted"),
        (status = 404, description = "Unknown game", body = crate::error::ErrorBody)
    )
)]
pub async fn delete_game(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<StatusCode, AppError> {
    game_service::delete_game(&state, &code).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Apply one scorer command.
///
/// A rejected command leaves the game untouched. An accepted command whose snapshot
/// could not be stored still returns `200` with `sync.persisted = false`.
#[utoipa::path(
    post,
    path = "/games/{code}/commands",
    tag = "game",
    params(("code" = String, Path, description = "Six character join code")),
    request_body = GameCommand,
    responses(
        (status = 200, description = "Command applied", body = CommandOutcome),
        (status = 409, description = "Command not allowed in the current status", body = crate::error::ErrorBody),
        (status = 422, description = "Command rejected by the sport rules", body = crate::error::ErrorBody)
    )
)]
pub async fn execute_command(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Valid(Json(command)): Valid<Json<GameCommand>>,
) -> Result<Json<CommandOutcome>, AppError> {
    Ok(Json(game_service::execute_command(&state, &code, command).await?))
}

/// Whether the game is decided and by whom.
#[utoipa::path(
    get,
    path = "/games/{code}/winner",
    tag = "game",
    params(("code" = String, Path, description = "Six character join code")),
    responses((status = 200, description = "Winner", body = WinnerResponse))
)]
pub async fn winner(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<WinnerResponse>, AppError> {
    Ok(Json(game_service::winner(&state, &code).await?))
}

/// Add a player to a roster.
#[utoipa::path(
    post,
    path = "/games/{code}/teams/{side}/players",
    tag = "game",
    params(
        ("code" = String, Path, description = "Six character join code"),
        ("side" = Side, Path, description = "`A` or `B`")
    ),
    request_body = PlayerInput,
    responses(
        (status = 200, description = "Player added", body = CommandOutcome),
        (status = 422, description = "Roster full or duplicate player", body = crate::error::ErrorBody)
    )
)]
pub async fn add_player(
    State(state): State<SharedState>,
    Path((code, side)): Path<(String, Side)>,
    Valid(Json(player)): Valid<Json<PlayerInput>>,
) -> Result<Json<CommandOutcome>, AppError> {
    Ok(Json(game_service::add_player(&state, &code, side, player).await?))
}

/// Recorded and derived stats of one player.
#[utoipa::path(
    get,
    path = "/games/{code}/teams/{side}/players/{player_id}/stats",
    tag = "game",
    params(
        ("code" = String, Path, description = "Six character join code"),
        ("side" = Side, Path, description = "`A` or `B`"),
        ("player_id" = String, Path, description = "Player identifier")
    ),
    responses(
        (status = 200, description = "Player stats", body = PlayerStatsResponse),
        (status = 404, description = "Unknown game or player", body = crate::error::ErrorBody)
    )
)]
pub async fn player_stats(
    State(state): State<SharedState>,
    Path((code, side, player_id)): Path<(String, Side, String)>,
) -> Result<Json<PlayerStatsResponse>, AppError> {
    Ok(Json(
        game_service::player_stats(&state, &code, side, &player_id).await?,
    ))
}
