use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::state::bracket::EventId;

/// Lifecycle phases of a live subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// No live subscription; the store only serves what it already holds.
    Unsubscribed,
    /// Initial fetch and channel connection are in flight.
    Subscribing,
    /// A fetch has completed and the channel is open.
    Active,
    /// The channel dropped; the store keeps serving last-known state.
    Degraded,
}

/// Connection state of the push channel as seen by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No channel open.
    Disconnected,
    /// A connection attempt is in flight.
    Connecting,
    /// Messages are flowing.
    Connected,
    /// The last attempt or connection failed.
    Error,
}

/// Inputs that drive the session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTrigger {
    /// Consumer asked for live updates.
    Subscribe,
    /// A full fetch was applied to the store.
    FetchCompleted,
    /// The channel started a (re)connection attempt.
    ChannelConnecting,
    /// The channel is open and delivering messages.
    ChannelOpened,
    /// The channel failed.
    ChannelFaulted,
    /// The peer closed the channel.
    ChannelClosed,
    /// Consumer tore the subscription down.
    Unsubscribe,
}

/// Error returned when a trigger is not valid in the current phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid session transition: {trigger:?} cannot be applied while {from:?}")]
pub struct InvalidTransition {
    /// Phase the session was in.
    pub from: SessionPhase,
    /// Refused trigger.
    pub trigger: SessionTrigger,
}

/// Result of a successfully applied trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Phase before the trigger.
    pub from: SessionPhase,
    /// Phase after the trigger.
    pub to: SessionPhase,
    /// New connection state, when it changed.
    pub connection: Option<ConnectionState>,
}

impl Transition {
    /// True when the phase moved.
    pub fn phase_changed(&self) -> bool {
        self.from != self.to
    }
}

/// One active subscription to an event's live matches.
#[derive(Debug, Clone)]
pub struct SyncSession {
    id: Uuid,
    event_id: EventId,
    phase: SessionPhase,
    connection: ConnectionState,
    fetched: bool,
    last_fetch_at: Option<OffsetDateTime>,
    consecutive_faults: u32,
    connection_lost: bool,
    version: usize,
}

impl SyncSession {
    /// Create a session in the `Unsubscribed` phase.
    pub fn new(event_id: EventId) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id,
            phase: SessionPhase::Unsubscribed,
            connection: ConnectionState::Disconnected,
            fetched: false,
            last_fetch_at: None,
            consecutive_faults: 0,
            connection_lost: false,
            version: 0,
        }
    }

    /// Unique session identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Tracked event.
    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Current channel connection state.
    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    /// Time of the last full fetch applied to the store.
    pub fn last_fetch_at(&self) -> Option<OffsetDateTime> {
        self.last_fetch_at
    }

    /// Channel faults or closes since the last successful open.
    pub fn consecutive_faults(&self) -> u32 {
        self.consecutive_faults
    }

    /// True once the fault ceiling was exceeded and live updates stopped.
    pub fn connection_lost(&self) -> bool {
        self.connection_lost
    }

    /// Number of applied transitions.
    pub fn version(&self) -> usize {
        self.version
    }

    pub(crate) fn mark_connection_lost(&mut self) {
        self.connection_lost = true;
    }

    /// Apply a trigger, updating phase, connection state and bookkeeping.
    pub fn apply(&mut self, trigger: SessionTrigger) -> Result<Transition, InvalidTransition> {
        let (phase, connection) = self.compute_transition(trigger)?;

        match trigger {
            SessionTrigger::Subscribe => {
                self.fetched = false;
                self.consecutive_faults = 0;
                self.connection_lost = false;
            }
            SessionTrigger::FetchCompleted => {
                self.fetched = true;
                self.last_fetch_at = Some(OffsetDateTime::now_utc());
            }
            SessionTrigger::ChannelOpened => self.consecutive_faults = 0,
            SessionTrigger::ChannelFaulted | SessionTrigger::ChannelClosed => {
                self.consecutive_faults = self.consecutive_faults.saturating_add(1);
            }
            SessionTrigger::ChannelConnecting | SessionTrigger::Unsubscribe => {}
        }

        let transition = Transition {
            from: self.phase,
            to: phase,
            connection: (connection != self.connection).then_some(connection),
        };
        self.phase = phase;
        self.connection = connection;
        self.version += 1;

        Ok(transition)
    }

    fn compute_transition(
        &self,
        trigger: SessionTrigger,
    ) -> Result<(SessionPhase, ConnectionState), InvalidTransition> {
        use SessionPhase::*;
        use SessionTrigger::*;

        let next = match (self.phase, trigger) {
            (Unsubscribed, Subscribe) => (Subscribing, ConnectionState::Disconnected),
            (from @ Unsubscribed, trigger) | (from, trigger @ Subscribe) => {
                return Err(InvalidTransition { from, trigger });
            }
            (_, Unsubscribe) => (Unsubscribed, ConnectionState::Disconnected),
            (Subscribing, FetchCompleted) if self.connection == ConnectionState::Connected => {
                (Active, self.connection)
            }
            (phase, FetchCompleted) => (phase, self.connection),
            (phase, ChannelConnecting) => (phase, ConnectionState::Connecting),
            (_, ChannelOpened) if self.fetched => (Active, ConnectionState::Connected),
            (_, ChannelOpened) => (Subscribing, ConnectionState::Connected),
            (_, ChannelFaulted) => (Degraded, ConnectionState::Error),
            (_, ChannelClosed) => (Degraded, ConnectionState::Disconnected),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscribed() -> SyncSession {
        let mut session = SyncSession::new(EventId(1));
        session.apply(SessionTrigger::Subscribe).unwrap();
        session
    }

    #[test]
    fn initial_phase_is_unsubscribed() {
        let session = SyncSession::new(EventId(1));
        assert_eq!(session.phase(), SessionPhase::Unsubscribed);
        assert_eq!(session.connection(), ConnectionState::Disconnected);
    }

    #[test]
    fn active_requires_fetch_and_open_channel() {
        let mut session = subscribed();
        assert_eq!(session.phase(), SessionPhase::Subscribing);

        session.apply(SessionTrigger::ChannelConnecting).unwrap();
        let opened = session.apply(SessionTrigger::ChannelOpened).unwrap();
        assert_eq!(opened.to, SessionPhase::Subscribing);
        assert_eq!(opened.connection, Some(ConnectionState::Connected));

        let fetched = session.apply(SessionTrigger::FetchCompleted).unwrap();
        assert!(fetched.phase_changed());
        assert_eq!(fetched.to, SessionPhase::Active);
        assert!(session.last_fetch_at().is_some());
    }

    #[test]
    fn fetch_first_then_channel_also_activates() {
        let mut session = subscribed();
        session.apply(SessionTrigger::FetchCompleted).unwrap();
        assert_eq!(session.phase(), SessionPhase::Subscribing);
        session.apply(SessionTrigger::ChannelOpened).unwrap();
        assert_eq!(session.phase(), SessionPhase::Active);
    }

    #[test]
    fn faults_degrade_and_reopen_recovers() {
        let mut session = subscribed();
        session.apply(SessionTrigger::FetchCompleted).unwrap();
        session.apply(SessionTrigger::ChannelOpened).unwrap();

        session.apply(SessionTrigger::ChannelFaulted).unwrap();
        session.apply(SessionTrigger::ChannelConnecting).unwrap();
        session.apply(SessionTrigger::ChannelClosed).unwrap();
        assert_eq!(session.phase(), SessionPhase::Degraded);
        assert_eq!(session.consecutive_faults(), 2);

        // A refresh while degraded does not pretend the channel is back.
        session.apply(SessionTrigger::FetchCompleted).unwrap();
        assert_eq!(session.phase(), SessionPhase::Degraded);

        session.apply(SessionTrigger::ChannelOpened).unwrap();
        assert_eq!(session.phase(), SessionPhase::Active);
        assert_eq!(session.consecutive_faults(), 0);
    }

    #[test]
    fn fault_before_first_fetch_degrades() {
        let mut session = subscribed();
        session.apply(SessionTrigger::ChannelFaulted).unwrap();
        assert_eq!(session.phase(), SessionPhase::Degraded);
        session.apply(SessionTrigger::ChannelOpened).unwrap();
        assert_eq!(session.phase(), SessionPhase::Subscribing);
    }

    #[test]
    fn triggers_are_invalid_while_unsubscribed() {
        let mut session = SyncSession::new(EventId(1));
        let err = session.apply(SessionTrigger::ChannelOpened).unwrap_err();
        assert_eq!(
            err,
            InvalidTransition {
                from: SessionPhase::Unsubscribed,
                trigger: SessionTrigger::ChannelOpened,
            }
        );
        assert_eq!(session.version(), 0);
    }

    #[test]
    fn double_subscribe_is_invalid() {
        let mut session = subscribed();
        let err = session.apply(SessionTrigger::Subscribe).unwrap_err();
        assert_eq!(err.from, SessionPhase::Subscribing);
    }

    #[test]
    fn unsubscribe_from_any_live_phase() {
        let mut session = subscribed();
        session.apply(SessionTrigger::ChannelFaulted).unwrap();
        let transition = session.apply(SessionTrigger::Unsubscribe).unwrap();
        assert_eq!(transition.to, SessionPhase::Unsubscribed);
        assert_eq!(transition.connection, Some(ConnectionState::Disconnected));
    }
}
