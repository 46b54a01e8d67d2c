use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::info;

use crate::{
    dto::{game::GameView, sse::ServerEvent},
    error::ServiceError,
    services::{game_service, sse_events},
    state::{SharedState, game::GameCode},
};

/// Attach the game if needed and subscribe to its stream, returning the receiver together
/// with the events a new viewer gets before any broadcast.
pub async fn subscribe_game(
    state: &SharedState,
    code: &str,
) -> Result<(broadcast::Receiver<ServerEvent>, Vec<ServerEvent>, GameCode), ServiceError> {
    let session = game_service::attach(state, code).await?;
    // subscribe before reading the snapshot so nothing falls in between
    let receiver = session.sse().subscribe();
    let view = {
        let engine = session.engine().lock().await;
        GameView::from(&*engine)
    };
    let initial = sse_events::initial_events(&session, view, state.is_degraded());
    info!(code = %session.code(), viewers = session.sse().viewer_count(), "new game SSE connection");
    Ok((receiver, initial, session.code().clone()))
}

/// Convert a broadcast receiver into an SSE response, forwarding events and
/// cleaning up once the client disconnects.
pub fn to_sse_stream(
    mut receiver: broadcast::Receiver<ServerEvent>,
    initial: Vec<ServerEvent>,
    code: GameCode,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    // forwarder task: reads from broadcast and pushes into mpsc
    tokio::spawn(async move {
        for payload in initial {
            if tx.send(Ok(to_event(payload))).await.is_err() {
                return;
            }
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if tx.send(Ok(to_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(_)) => {
                            // Skip lagged messages but keep the stream alive.
                            continue;
                        }
                    }
                }
            }
        }

        info!(code = %code, "game SSE stream disconnected");
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn to_event(payload: ServerEvent) -> Event {
    let mut event = Event::default().data(payload.data);
    if let Some(name) = payload.event {
        event = event.event(name);
    }
    event
}
