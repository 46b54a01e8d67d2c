use axum::Router;

use crate::state::SharedState;

/// Swagger UI and the OpenAPI document.
pub mod docs;
/// Game lifecycle and scorer commands.
pub mod game;
/// Health check.
pub mod health;
/// Registered sports.
pub mod sports;
/// Live game streams.
pub mod sse;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    health::router()
        .merge(sports::router())
        .merge(game::router())
        .merge(sse::router())
        .merge(docs::router())
        .with_state(state)
}
