use axum::{Json, Router, extract::State, routing::get};

use crate::{dto::sports::SportSummary, services::game_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/sports",
    tag = "sports",
    responses((status = 200, description = "Enabled sports", body = [SportSummary]))
)]
/// List the sports games can be created for.
pub async fn list_sports(State(state): State<SharedState>) -> Json<Vec<SportSummary>> {
    Json(game_service::list_sports(&state))
}

/// Configure the sports routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/sports", get(list_sports))
}
