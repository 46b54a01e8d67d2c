use std::sync::Arc;

use serde::Serialize;
use tokio::{sync::broadcast::error::RecvError, task::JoinHandle};
use tracing::{debug, warn};

use crate::{
    dto::{
        game::GameView,
        sse::{GameClosedEvent, Handshake, ServerEvent, SnapshotEvent, SnapshotOrigin, SystemStatus},
    },
    sports::SportConfig,
    state::{
        SharedState, SseHub,
        engine::{GameEngine, Notification, Origin},
        session::GameSession,
    },
};

const EVENT_HANDSHAKE: &str = "handshake";
const EVENT_SNAPSHOT: &str = "game.snapshot";
const EVENT_GAME_CLOSED: &str = "game.closed";
const EVENT_SYSTEM_STATUS: &str = "system.status";

/// Relay every engine notification of the game to its SSE hub.
///
/// The task ends once the engine, and with it the notification channel, is dropped.
pub fn spawn_snapshot_forwarder(engine: &GameEngine, hub: SseHub) -> JoinHandle<()> {
    let mut notifications = engine.subscribe();
    let config = Arc::clone(engine.config());
    tokio::spawn(async move {
        loop {
            match notifications.recv().await {
                Ok(notification) => {
                    let view = snapshot_view(&notification, &config);
                    send_event(&hub, EVENT_SNAPSHOT, &view);
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "snapshot forwarder lagged; newer snapshots follow");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn snapshot_view(notification: &Notification, config: &SportConfig) -> SnapshotEvent {
    SnapshotEvent {
        origin: match notification.origin {
            Origin::Local => SnapshotOrigin::Local,
            Origin::Remote => SnapshotOrigin::Remote,
        },
        view: GameView::from_snapshot(notification.snapshot.as_ref().clone(), config),
    }
}

/// Send the connection handshake and the current snapshot to a new viewer.
pub fn initial_events(session: &GameSession, view: GameView, degraded: bool) -> Vec<ServerEvent> {
    let handshake = Handshake {
        code: session.code().to_string(),
        message: format!("following {} game {}", session.sport(), session.code()),
        degraded,
    };
    let snapshot = SnapshotEvent {
        origin: SnapshotOrigin::Local,
        view,
    };

    [
        ServerEvent::json(Some(EVENT_HANDSHAKE.to_string()), &handshake),
        ServerEvent::json(Some(EVENT_SNAPSHOT.to_string()), &snapshot),
    ]
    .into_iter()
    .filter_map(|event| match event {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(error = %err, "failed to serialize initial SSE payload");
            None
        }
    })
    .collect()
}

/// Tell the viewers of a game that it no longer exists.
pub fn broadcast_game_closed(session: &GameSession, reason: &str) {
    let payload = GameClosedEvent {
        code: session.code().to_string(),
        reason: reason.to_string(),
    };
    send_event(session.sse(), EVENT_GAME_CLOSED, &payload);
}

/// Broadcast the degraded flag to the viewers of every attached game.
pub fn broadcast_system_status(state: &SharedState, degraded: bool) {
    let payload = SystemStatus { degraded };
    for session in state.sessions() {
        send_event(session.sse(), EVENT_SYSTEM_STATUS, &payload);
    }
}

fn send_event(hub: &SseHub, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => hub.broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize SSE payload"),
    }
}
