//! Push connections
//!
//! Glue between the hub's registries and the two push transports. Each
//! connection gets a bounded channel; the registry pushes frames into it and
//! the connection's writer drains it. Dropping the writer side unregisters
//! the subscriber through `SubscriptionGuard`.

use std::borrow::Cow;
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::{SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use warp::sse::Event;
use warp::ws::{Message, WebSocket};

use crate::hub::BroadcastHub;
use crate::registry::{SubscriberId, Transport, UpdateFrame};
use crate::state::MatchId;

/// SSE event name for score updates
pub const SCORE_EVENT: &str = "score";

/// SSE event name for the greeting sent on connect
pub const HELLO_EVENT: &str = "hello";

/// Unregisters a push subscriber when dropped
pub struct SubscriptionGuard {
    hub: Arc<BroadcastHub>,
    transport: Transport,
    match_id: MatchId,
    id: SubscriberId,
}

impl SubscriptionGuard {
    /// Subscribe a new bounded channel; the guard owns the registration
    pub fn subscribe(
        hub: Arc<BroadcastHub>,
        transport: Transport,
        match_id: MatchId,
        capacity: usize,
    ) -> Option<(Self, mpsc::Receiver<UpdateFrame>)> {
        let (tx, rx) = mpsc::channel(capacity);

        match hub.subscribe(transport, &match_id, tx) {
            Ok(id) => {
                let guard = Self {
                    hub,
                    transport,
                    match_id,
                    id,
                };
                Some((guard, rx))
            }
            Err(e) => {
                tracing::warn!(
                    transport = %transport,
                    match_id = %match_id,
                    error = %e,
                    "Push subscription failed"
                );
                None
            }
        }
    }

    /// Subscriber id
    pub fn id(&self) -> SubscriberId {
        self.id
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.hub.unsubscribe(self.transport, &self.match_id, self.id);
    }
}

/// Stream of frames for one push connection; unsubscribes on drop
pub struct FrameStream {
    rx: mpsc::Receiver<UpdateFrame>,
    guard: SubscriptionGuard,
}

impl FrameStream {
    /// Subscribe to a match and stream its frames, starting with the catch-up
    pub fn subscribe(
        hub: Arc<BroadcastHub>,
        transport: Transport,
        match_id: MatchId,
    ) -> Option<Self> {
        let capacity = hub.config().registry.channel_capacity;
        let (guard, rx) = SubscriptionGuard::subscribe(hub, transport, match_id, capacity)?;
        Some(Self { rx, guard })
    }

    /// Subscriber id
    pub fn id(&self) -> SubscriberId {
        self.guard.id()
    }
}

impl Stream for FrameStream {
    type Item = UpdateFrame;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// SSE event stream: one `hello`, then the catch-up and every later update
pub fn event_stream(
    hub: Arc<BroadcastHub>,
    match_id: MatchId,
) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
    let hello = Event::default().event(HELLO_EVENT).data(r#"{"ok":true}"#);

    let updates = FrameStream::subscribe(hub, Transport::EventStream, match_id)
        .map(|frames| frames.map(|frame| Event::default().event(SCORE_EVENT).data(frame.text())));

    futures::stream::once(async move { hello })
        .chain(futures::stream::iter(updates).flatten())
        .map(Ok)
}

/// Serve one WebSocket connection until either side closes it
///
/// Outbound: the catch-up snapshot, then every update as JSON text.
/// Inbound: text and binary messages are logged and echoed back as text;
/// binary payloads are decoded lossily. Ping and pong frames are only logged.
pub async fn serve_socket(socket: WebSocket, hub: Arc<BroadcastHub>, match_id: MatchId) {
    let Some(mut frames) = FrameStream::subscribe(hub, Transport::Socket, match_id.clone()) else {
        return;
    };
    let subscriber_id = frames.id();
    let (mut ws_tx, mut ws_rx) = socket.split();

    tracing::debug!(match_id = %match_id, subscriber_id = subscriber_id, "WebSocket connected");

    loop {
        tokio::select! {
            frame = frames.next() => {
                let Some(frame) = frame else {
                    // Evicted by the registry
                    break;
                };
                if ws_tx.send(Message::text(frame.text())).await.is_err() {
                    break;
                }
            }
            inbound = ws_rx.next() => {
                match inbound {
                    Some(Ok(msg)) if msg.is_close() => break,
                    Some(Ok(msg)) => {
                        let Some(text) = inbound_text(&msg) else {
                            tracing::debug!(
                                match_id = %match_id,
                                subscriber_id = subscriber_id,
                                "WebSocket control frame ignored"
                            );
                            continue;
                        };
                        tracing::info!(
                            match_id = %match_id,
                            subscriber_id = subscriber_id,
                            binary = msg.is_binary(),
                            message = %text,
                            "WebSocket message received"
                        );
                        let echo = Message::text(format!("Echo: {}", text));
                        if ws_tx.send(echo).await.is_err() {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        tracing::debug!(
                            match_id = %match_id,
                            subscriber_id = subscriber_id,
                            error = %e,
                            "WebSocket read error"
                        );
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    let _ = ws_tx.close().await;
    tracing::debug!(match_id = %match_id, subscriber_id = subscriber_id, "WebSocket closed");
}

/// Text of an inbound data message; `None` for control frames
fn inbound_text(msg: &Message) -> Option<Cow<'_, str>> {
    if let Ok(text) = msg.to_str() {
        Some(Cow::Borrowed(text))
    } else if msg.is_binary() {
        Some(String::from_utf8_lossy(msg.as_bytes()))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ScoreCard;

    #[test]
    fn test_inbound_text() {
        assert_eq!(inbound_text(&Message::text("hi")).as_deref(), Some("hi"));
        assert_eq!(inbound_text(&Message::binary(b"hi".to_vec())).as_deref(), Some("hi"));
        assert_eq!(
            inbound_text(&Message::binary(vec![0x68, 0xff])).as_deref(),
            Some("h\u{fffd}")
        );
        assert_eq!(inbound_text(&Message::ping(Vec::new())), None);
        assert_eq!(inbound_text(&Message::pong(Vec::new())), None);
    }

    #[tokio::test]
    async fn test_frame_stream_unsubscribes_on_drop() {
        let hub = Arc::new(BroadcastHub::new());
        let id = MatchId::new("M");

        let mut frames = FrameStream::subscribe(Arc::clone(&hub), Transport::EventStream, id.clone())
            .unwrap();
        assert_eq!(hub.registry(Transport::EventStream).subscriber_count(&id), 1);

        assert_eq!(frames.next().await.unwrap().version, 1);
        hub.commit(&id, |_| ScoreCard::default());
        assert_eq!(frames.next().await.unwrap().version, 2);

        drop(frames);
        assert_eq!(hub.registry(Transport::EventStream).subscriber_count(&id), 0);
    }

    #[tokio::test]
    async fn test_event_stream_starts_with_hello_and_catch_up() {
        let hub = Arc::new(BroadcastHub::new());
        let id = MatchId::new("M");

        let stream = event_stream(Arc::clone(&hub), id.clone());
        futures::pin_mut!(stream);

        // Subscription happens eagerly, before the first poll
        assert_eq!(hub.registry(Transport::EventStream).subscriber_count(&id), 1);

        let hello = stream.next().await.unwrap().unwrap().to_string();
        assert_eq!(hello, "event:hello\ndata:{\"ok\":true}\n\n");

        let catch_up = stream.next().await.unwrap().unwrap().to_string();
        assert!(
            catch_up.starts_with("event:score\ndata:{\"matchId\":\"M\",\"version\":1,"),
            "{}",
            catch_up
        );

        hub.commit(&id, |_| ScoreCard::default());
        let update = stream.next().await.unwrap().unwrap().to_string();
        assert!(
            update.starts_with("event:score\ndata:{\"matchId\":\"M\",\"version\":2,"),
            "{}",
            update
        );
    }
}
