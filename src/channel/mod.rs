//! Live push channel delivering incremental match updates for one event.

/// WebSocket implementation of [`PushChannel`].
#[cfg(feature = "ws-channel")]
pub mod websocket;

use futures::stream::BoxStream;

use crate::state::{EventId, MatchUpdate};

/// Everything a push channel reports: lifecycle changes and messages.
///
/// Lifecycle events are distinct from messages so consumers can tell
/// "no updates" apart from "disconnected".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// A (re)connection attempt started; `attempt` counts from 1.
    Connecting {
        /// Attempt number since the channel was opened.
        attempt: u32,
    },
    /// The connection is open.
    Opened,
    /// An incremental update arrived.
    Message(MatchUpdate),
    /// The peer closed the connection.
    Closed,
    /// The connection failed or could not be established.
    Faulted {
        /// Transport error description.
        reason: String,
    },
}

/// Source of live match updates for an event.
///
/// Delivery is at-least-once and may be out of order. Implementations own
/// their reconnection policy; dropping the returned stream closes the
/// connection.
pub trait PushChannel: Send + Sync {
    /// Start delivering events for `event_id` until the stream is dropped.
    fn open(&self, event_id: EventId) -> BoxStream<'static, ChannelEvent>;
}
