//! Errors returned by the public synchronizer API.

use thiserror::Error;

use crate::{
    dao::error::FetchError,
    state::{EventId, InvalidTransition, MatchId},
};

/// Errors surfaced by the [`Synchronizer`](crate::services::synchronizer::Synchronizer).
#[derive(Debug, Error)]
pub enum SyncError {
    /// The requested winner is not one of the match's players.
    #[error("winner `{winner}` is not a player of match {match_id}")]
    InvalidWinner {
        /// Target match.
        match_id: MatchId,
        /// Refused gamertag.
        winner: String,
    },
    /// The match already carries a confirmed winner; corrections are not supported.
    #[error("match {match_id} is already decided for `{winner}`")]
    AlreadyDecided {
        /// Target match.
        match_id: MatchId,
        /// Winner already recorded.
        winner: String,
    },
    /// No such match is known locally or remotely.
    #[error("unknown match {0}")]
    UnknownMatch(MatchId),
    /// The event does not exist on the service.
    #[error("event {0} not found")]
    NotFound(EventId),
    /// The event service failed after retries were exhausted.
    #[error("event service request failed")]
    Remote(#[source] FetchError),
    /// A live session already exists for this event.
    #[error("already subscribed to event {0}")]
    AlreadySubscribed(EventId),
    /// The operation needs a live session.
    #[error("no live session")]
    NotSubscribed,
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl SyncError {
    /// Map a failed fetch of `event_id`, keeping not-found distinct.
    pub(crate) fn from_fetch(err: FetchError, event_id: EventId) -> Self {
        match err {
            FetchError::NotFound(_) => SyncError::NotFound(event_id),
            other => SyncError::Remote(other),
        }
    }

    /// Map a failed winner request for `match_id`.
    pub(crate) fn from_winner_request(err: FetchError, match_id: MatchId) -> Self {
        match err {
            FetchError::NotFound(_) => SyncError::UnknownMatch(match_id),
            other => SyncError::Remote(other),
        }
    }
}

impl From<InvalidTransition> for SyncError {
    fn from(err: InvalidTransition) -> Self {
        SyncError::InvalidState(err.to_string())
    }
}
