use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::{
    dto::sse::{Handshake, ServerEvent},
    state::RoomHandle,
};

/// Subscribe to a room's SSE stream.
pub fn subscribe(room: &RoomHandle) -> broadcast::Receiver<ServerEvent> {
    room.sse().subscribe()
}

/// Convert a broadcast receiver into an SSE response. The connection opens
/// with a handshake event for this subscriber alone, then forwards room
/// events until the client disconnects.
pub fn to_sse_stream(
    receiver: broadcast::Receiver<ServerEvent>,
    room_id: Uuid,
    degraded: bool,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    Sse::new(event_stream(receiver, room_id, degraded)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Bridge one subscriber's broadcast receiver into a bounded response stream,
/// prepending the handshake so it never travels through the room hub.
fn event_stream(
    mut receiver: broadcast::Receiver<ServerEvent>,
    room_id: Uuid,
    degraded: bool,
) -> ReceiverStream<Result<Event, Infallible>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    // forwarder task: greets the subscriber, then reads from broadcast and
    // pushes into mpsc
    tokio::spawn(async move {
        if let Some(hello) = handshake(room_id, degraded) {
            if tx.send(Ok(to_event(hello))).await.is_err() {
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

        tracing::info!(room_id = %room_id, "room SSE stream disconnected");
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    ReceiverStream::new(rx)
}

fn to_event(payload: ServerEvent) -> Event {
    let mut event = Event::default().data(payload.data);
    if let Some(name) = payload.event {
        event = event.event(name);
    }
    event
}

fn handshake(room_id: Uuid, degraded: bool) -> Option<ServerEvent> {
    ServerEvent::json(
        Some("info".to_string()),
        &Handshake {
            room_id: room_id.to_string(),
            message: "subscribed to room events".into(),
            degraded,
        },
    )
    .ok()
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use tokio::sync::broadcast::error::TryRecvError;

    use super::*;
    use crate::state::SseHub;

    #[tokio::test]
    async fn handshake_reaches_only_the_new_subscriber() {
        let hub = SseHub::new(8);
        let mut earlier = hub.subscribe();

        let mut stream = event_stream(hub.subscribe(), Uuid::new_v4(), false);
        assert!(stream.next().await.is_some());

        assert!(matches!(earlier.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn hub_events_flow_after_the_handshake() {
        let hub = SseHub::new(8);
        let mut stream = event_stream(hub.subscribe(), Uuid::new_v4(), true);
        assert!(stream.next().await.is_some());

        hub.broadcast(ServerEvent::new(
            Some("countdown".into()),
            "{\"remainingSec\":5}".into(),
        ));
        assert!(stream.next().await.is_some());
    }
}
