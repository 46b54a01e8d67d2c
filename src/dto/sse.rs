use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::game::GameView;

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    /// SSE event name; unnamed events reach `onmessage`.
    pub event: Option<String>,
    /// JSON payload.
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Code of the followed game.
    pub code: String,
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Whether the backend is running without a healthy storage backend.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    /// Whether the backend is now degraded.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
/// Producer of a snapshot.
pub enum SnapshotOrigin {
    /// A command applied on this instance.
    Local,
    /// A change made by another instance and received from the store.
    Remote,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast after every committed snapshot.
pub struct SnapshotEvent {
    /// Instance that produced the snapshot.
    pub origin: SnapshotOrigin,
    /// The new game view.
    pub view: GameView,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the followed game disappears from the store.
pub struct GameClosedEvent {
    /// Code of the closed game.
    pub code: String,
    /// Human-readable cause.
    pub reason: String,
}
