/// REST implementation of [`EventStore`].
#[cfg(feature = "http-store")]
pub mod http;

use crate::dao::{error::FetchResult, models::NewEvent};
use crate::state::{Event, EventId, Match, MatchId};
use futures::future::BoxFuture;

/// Abstraction over the remote event service.
///
/// Implementations carry no retry policy of their own and must be safe to call
/// concurrently with themselves and with an open push channel.
pub trait EventStore: Send + Sync {
    /// Point-in-time read of one event, including its matches.
    fn fetch_event(&self, id: EventId) -> BoxFuture<'static, FetchResult<Event>>;
    /// Every event known to the service.
    fn list_events(&self) -> BoxFuture<'static, FetchResult<Vec<Event>>>;
    /// Create an event and return it as stored.
    fn create_event(&self, event: NewEvent) -> BoxFuture<'static, FetchResult<Event>>;
    /// Record a match winner and return the match as stored by the service.
    fn set_winner(
        &self,
        event_id: EventId,
        match_id: MatchId,
        winner: String,
    ) -> BoxFuture<'static, FetchResult<Match>>;
}
