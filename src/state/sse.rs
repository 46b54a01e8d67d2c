use tokio::sync::broadcast;

use crate::dto::sse::ServerEvent;

/// Capacity of each game's SSE channel.
pub const GAME_SSE_CAPACITY: usize = 32;

/// Broadcast hub fanning one game's events out to its SSE viewers.
#[derive(Clone)]
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }

    /// Number of connected viewers.
    pub fn viewer_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for SseHub {
    fn default() -> Self {
        Self::new(GAME_SSE_CAPACITY)
    }
}
