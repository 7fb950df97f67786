use std::{sync::Arc, time::Duration};

use async_stream::stream;
use futures::{SinkExt, StreamExt, stream::BoxStream};
use tokio::time::sleep;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::{
    channel::{ChannelEvent, PushChannel},
    dto::ws::MatchUpdateFrame,
    state::{EventId, MatchUpdate},
};

/// Connection settings for [`WebSocketChannel`].
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Base URL under which `events/{id}` lives, e.g. `ws://localhost:3000/ws`.
    pub base_url: String,
    /// First reconnection delay.
    pub reconnect_initial: Duration,
    /// Upper bound for the doubling reconnection delay.
    pub reconnect_max: Duration,
}

impl ChannelConfig {
    /// Settings for `base_url` with 1 s to 10 s reconnection backoff.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            reconnect_initial: Duration::from_millis(1_000),
            reconnect_max: Duration::from_secs(10),
        }
    }

    /// Override the reconnection backoff bounds.
    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.reconnect_initial = initial;
        self.reconnect_max = max.max(initial);
        self
    }
}

/// WebSocket push channel, one connection per event at `{base}/events/{id}`.
///
/// After a close or a failure the channel reconnects by itself with capped
/// exponential backoff, emitting [`ChannelEvent::Connecting`] again.
#[derive(Debug, Clone)]
pub struct WebSocketChannel {
    config: Arc<ChannelConfig>,
}

impl WebSocketChannel {
    /// Build a channel; nothing connects until [`PushChannel::open`].
    pub fn new(config: ChannelConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    fn url_for(&self, event_id: EventId) -> String {
        format!(
            "{}/events/{}",
            self.config.base_url.trim_end_matches('/'),
            event_id
        )
    }
}

impl PushChannel for WebSocketChannel {
    fn open(&self, event_id: EventId) -> BoxStream<'static, ChannelEvent> {
        let url = self.url_for(event_id);
        let initial = self.config.reconnect_initial;
        let max = self.config.reconnect_max;

        Box::pin(stream! {
            let mut attempt: u32 = 0;
            let mut delay = initial;

            loop {
                attempt = attempt.saturating_add(1);
                yield ChannelEvent::Connecting { attempt };

                match connect_async(url.as_str()).await {
                    Ok((mut socket, _)) => {
                        info!(%url, %event_id, attempt, "match channel connected");
                        delay = initial;
                        yield ChannelEvent::Opened;

                        let mut fault = None;
                        while let Some(frame) = socket.next().await {
                            match frame {
                                Ok(Message::Text(text)) => {
                                    if let Some(update) = decode_frame(&text) {
                                        yield ChannelEvent::Message(update);
                                    }
                                }
                                Ok(Message::Ping(payload)) => {
                                    if let Err(err) = socket.send(Message::Pong(payload)).await {
                                        fault = Some(err.to_string());
                                        break;
                                    }
                                }
                                Ok(Message::Close(frame)) => {
                                    info!(%url, ?frame, "match channel closed by peer");
                                    break;
                                }
                                Ok(_) => {}
                                Err(err) => {
                                    fault = Some(err.to_string());
                                    break;
                                }
                            }
                        }

                        match fault {
                            Some(reason) => {
                                warn!(%url, error = %reason, "match channel failed");
                                yield ChannelEvent::Faulted { reason };
                            }
                            None => {
                                yield ChannelEvent::Closed;
                            }
                        }
                    }
                    Err(err) => {
                        warn!(%url, attempt, error = %err, "match channel connection attempt failed");
                        yield ChannelEvent::Faulted { reason: err.to_string() };
                    }
                }

                sleep(delay).await;
                delay = (delay * 2).min(max);
            }
        })
    }
}

/// Parse a text frame, logging and skipping anything unusable.
fn decode_frame(raw: &str) -> Option<MatchUpdate> {
    match MatchUpdateFrame::from_json_str(raw) {
        Ok(frame) => {
            let update = frame.into_update();
            if update.is_none() {
                debug!(payload = raw, "ignoring match frame without winner");
            }
            update
        }
        Err(err) => {
            warn!(error = %err, payload = raw, "failed to parse or validate match frame");
            None
        }
    }
}
