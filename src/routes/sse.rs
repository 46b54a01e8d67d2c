use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    response::sse::{Event, Sse},
    routing::get,
};
use futures::Stream;

use crate::{error::AppError, services::sse_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/games/{code}/sse",
    tag = "sse",
    params(("code" = String, Path, description = "Six character join code")),
    responses(
        (status = 200, description = "Game event stream", content_type = "text/event-stream", body = String),
        (status = 404, description = "Unknown game", body = crate::error::ErrorBody)
    )
)]
/// Follow a game: a handshake and the current snapshot, then every change.
pub async fn game_stream(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let (receiver, initial, code) = sse_service::subscribe_game(&state, &code).await?;
    Ok(sse_service::to_sse_stream(receiver, initial, code))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/games/{code}/sse", get(game_stream))
}
