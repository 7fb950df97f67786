use std::sync::Arc;

use futures::StreamExt;
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    channel::{ChannelEvent, PushChannel},
    dao::event_store::EventStore,
    dto::session::SessionSnapshot,
    error::SyncError,
    services::retry::{RetryPolicy, retry_transient},
    state::{
        ApplyResult, ConnectionState, Event, EventDetails, EventId, FullApplyReport, Match,
        MatchId, MatchStore, MatchUpdate, Observer, ObserverHub, SessionPhase, SessionTrigger,
        StoreChange, SyncSession, Transition,
    },
};

const DEFAULT_FAULT_CEILING: u32 = 5;

/// Session-level notifications, separate from store changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The session moved to a new phase.
    PhaseChanged {
        /// Phase entered.
        phase: SessionPhase,
    },
    /// The channel connection state changed.
    ConnectionChanged {
        /// New connection state.
        state: ConnectionState,
    },
    /// The initial fetch gave up; the channel keeps running.
    FetchFailed {
        /// Final error of the fetch.
        message: String,
    },
    /// Terminal: the channel faulted too often and live updates stopped.
    ConnectionLost {
        /// Consecutive faults observed when giving up.
        faults: u32,
    },
}

/// Tuning knobs for a [`Synchronizer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Backoff applied to event service calls.
    pub retry: RetryPolicy,
    /// Consecutive channel faults tolerated before giving up.
    pub fault_ceiling: u32,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            fault_ceiling: DEFAULT_FAULT_CEILING,
        }
    }
}

enum PumpControl {
    Continue,
    Stop,
}

struct Core {
    store: MatchStore,
    session: Option<SyncSession>,
    details: Option<EventDetails>,
    tasks: Vec<JoinHandle<()>>,
}

struct Inner {
    event_id: EventId,
    events: Arc<dyn EventStore>,
    channel: Arc<dyn PushChannel>,
    options: SyncOptions,
    core: Mutex<Core>,
    store_observers: Arc<ObserverHub<StoreChange>>,
    session_observers: ObserverHub<SessionEvent>,
}

/// Keeps the local view of one event's matches consistent with the event
/// service and its live channel.
///
/// The synchronizer is the only writer of its [`MatchStore`]. Fetch results,
/// channel messages and confirmed winner requests all go through one mutex,
/// and network waits never hold it. Cloning is cheap and shares the state.
/// Background tasks run until [`Synchronizer::unsubscribe`] is called.
#[derive(Clone)]
pub struct Synchronizer {
    inner: Arc<Inner>,
}

impl Synchronizer {
    /// Create an idle synchronizer for `event_id`. Nothing runs until
    /// [`Synchronizer::subscribe`].
    pub fn new(
        event_id: EventId,
        events: Arc<dyn EventStore>,
        channel: Arc<dyn PushChannel>,
        options: SyncOptions,
    ) -> Self {
        let store = MatchStore::new();
        let store_observers = store.observers();
        Self {
            inner: Arc::new(Inner {
                event_id,
                events,
                channel,
                options,
                core: Mutex::new(Core {
                    store,
                    session: None,
                    details: None,
                    tasks: Vec::new(),
                }),
                store_observers,
                session_observers: ObserverHub::new(),
            }),
        }
    }

    /// Event this synchronizer tracks.
    pub fn event_id(&self) -> EventId {
        self.inner.event_id
    }

    /// Start a live session: open the channel and fetch concurrently.
    pub async fn subscribe(&self) -> Result<Uuid, SyncError> {
        let inner = &self.inner;
        let mut core = inner.core.lock().await;
        if core.session.is_some() {
            return Err(SyncError::AlreadySubscribed(inner.event_id));
        }

        let mut session = SyncSession::new(inner.event_id);
        let transition = session.apply(SessionTrigger::Subscribe)?;
        let session_id = session.id();
        core.session = Some(session);
        inner.publish_transition(transition);
        info!(event_id = %inner.event_id, %session_id, "subscribing to live matches");

        let pump = tokio::spawn(run_channel_pump(Arc::clone(inner), session_id));
        let fetch = tokio::spawn(run_initial_fetch(Arc::clone(inner), session_id));
        core.tasks.extend([pump, fetch]);

        Ok(session_id)
    }

    /// End the live session. The store keeps its contents.
    ///
    /// Background work is cancelled and any result still in flight is
    /// discarded, so no store notification fires after this returns.
    pub async fn unsubscribe(&self) -> Result<(), SyncError> {
        let inner = &self.inner;
        let mut core = inner.core.lock().await;
        let Some(mut session) = core.session.take() else {
            return Err(SyncError::NotSubscribed);
        };

        for task in core.tasks.drain(..) {
            task.abort();
        }

        let transition = session.apply(SessionTrigger::Unsubscribe)?;
        inner.publish_transition(transition);
        info!(event_id = %inner.event_id, session_id = %session.id(), "unsubscribed from live matches");
        Ok(())
    }

    /// Pull the full event again (pull-to-refresh, screen focus).
    pub async fn refresh(&self) -> Result<FullApplyReport, SyncError> {
        let inner = &self.inner;
        let session_id = self.session_id().await.ok_or(SyncError::NotSubscribed)?;

        let event = inner
            .fetch_with_retry()
            .await
            .map_err(|err| SyncError::from_fetch(err, inner.event_id))?;

        inner
            .apply_fetched(session_id, event)
            .await
            .ok_or(SyncError::NotSubscribed)
    }

    /// Ask the event service to record `winner` for `match_id`.
    ///
    /// Needs a live session. The request is validated against the local store
    /// before any network call: a winner that is not a player, or a match whose
    /// winner is already confirmed, is refused locally. Repeating the confirmed
    /// winner returns the stored match without a call. The confirmed result is
    /// applied like a push, so the channel echo of the same change is ignored
    /// as stale. When the session ends while the call is in flight, the
    /// service's answer is returned but the store is left untouched.
    pub async fn request_winner(
        &self,
        match_id: MatchId,
        winner: impl Into<String>,
    ) -> Result<Match, SyncError> {
        let inner = &self.inner;
        let winner = winner.into();

        let session_id = {
            let core = inner.core.lock().await;
            let session_id = core
                .session
                .as_ref()
                .map(SyncSession::id)
                .ok_or(SyncError::NotSubscribed)?;
            let current = core
                .store
                .get(match_id)
                .ok_or(SyncError::UnknownMatch(match_id))?;
            if !current.accepts_winner(&winner) {
                return Err(SyncError::InvalidWinner { match_id, winner });
            }
            if core.store.version(match_id).is_some_and(|v| v >= 1) {
                return match current.winner() {
                    Some(decided) if decided == winner => Ok(current.clone()),
                    decided => Err(SyncError::AlreadyDecided {
                        match_id,
                        winner: decided.unwrap_or_default().to_owned(),
                    }),
                };
            }
            session_id
        };

        let events = Arc::clone(&inner.events);
        let event_id = inner.event_id;
        let confirmed = retry_transient(&inner.options.retry, "set_winner", || {
            events.set_winner(event_id, match_id, winner.clone())
        })
        .await
        .map_err(|err| SyncError::from_winner_request(err, match_id))?;

        let Some(confirmed_winner) = confirmed.winner().map(str::to_owned) else {
            warn!(%event_id, %match_id, "service confirmed winner request without a winner");
            return Ok(confirmed);
        };

        let mut core = inner.core.lock().await;
        if core.session.as_ref().map(SyncSession::id) != Some(session_id) {
            debug!(%event_id, %match_id, %session_id, "session ended before winner confirmation; not applied");
            return Ok(confirmed);
        }
        let result = core.store.apply_incremental(&MatchUpdate {
            match_id,
            winner: confirmed_winner,
        });
        log_apply(event_id, match_id, "request", result);

        Ok(core.store.get(match_id).cloned().unwrap_or(confirmed))
    }

    /// Consistent copy of all matches, ordered by round then id.
    pub async fn snapshot(&self) -> Vec<Match> {
        self.inner.core.lock().await.store.snapshot()
    }

    /// Current state of one match.
    pub async fn get_match(&self, id: MatchId) -> Option<Match> {
        self.inner.core.lock().await.store.get(id).cloned()
    }

    /// Accepted winner transitions for the match.
    pub async fn match_version(&self, id: MatchId) -> Option<u64> {
        self.inner.core.lock().await.store.version(id)
    }

    /// Non-match fields of the last applied fetch.
    pub async fn event_details(&self) -> Option<EventDetails> {
        self.inner.core.lock().await.details.clone()
    }

    /// Serializable view of the live session, if any.
    pub async fn session(&self) -> Option<SessionSnapshot> {
        let core = self.inner.core.lock().await;
        core.session.as_ref().map(SessionSnapshot::from)
    }

    /// Current phase; [`SessionPhase::Unsubscribed`] without a session.
    pub async fn phase(&self) -> SessionPhase {
        let core = self.inner.core.lock().await;
        core.session
            .as_ref()
            .map_or(SessionPhase::Unsubscribed, SyncSession::phase)
    }

    /// Wipe the store. Allowed with or without a live session.
    pub async fn clear_store(&self) {
        let mut core = self.inner.core.lock().await;
        core.store.clear();
        core.details = None;
    }

    /// Observe every accepted store mutation.
    pub fn observe_matches(&self) -> Observer<StoreChange> {
        self.inner.store_observers.subscribe()
    }

    /// Observe session lifecycle notifications.
    pub fn observe_session(&self) -> Observer<SessionEvent> {
        self.inner.session_observers.subscribe()
    }

    async fn session_id(&self) -> Option<Uuid> {
        let core = self.inner.core.lock().await;
        core.session.as_ref().map(SyncSession::id)
    }
}

impl Inner {
    async fn fetch_with_retry(&self) -> Result<Event, crate::dao::error::FetchError> {
        let event_id = self.event_id;
        retry_transient(&self.options.retry, "fetch_event", || {
            self.events.fetch_event(event_id)
        })
        .await
    }

    /// Merge a fetched event, unless the session that asked for it is gone.
    async fn apply_fetched(&self, session_id: Uuid, event: Event) -> Option<FullApplyReport> {
        let mut core = self.core.lock().await;
        let Core {
            store,
            session,
            details,
            ..
        } = &mut *core;

        let Some(session) = session.as_mut().filter(|s| s.id() == session_id) else {
            debug!(event_id = %self.event_id, %session_id, "discarding fetch for ended session");
            return None;
        };

        let Event {
            details: fetched_details,
            matches,
            ..
        } = event;
        let report = store.apply_full(matches);
        *details = Some(fetched_details);
        self.transition(session, SessionTrigger::FetchCompleted);

        Some(report)
    }

    async fn report_fetch_failure(&self, session_id: Uuid, message: String) {
        let core = self.core.lock().await;
        if core.session.as_ref().map(SyncSession::id) == Some(session_id) {
            self.session_observers
                .publish(SessionEvent::FetchFailed { message });
        }
    }

    async fn handle_channel_event(&self, session_id: Uuid, event: ChannelEvent) -> PumpControl {
        let mut core = self.core.lock().await;
        let Core { store, session, .. } = &mut *core;
        let Some(session) = session.as_mut().filter(|s| s.id() == session_id) else {
            return PumpControl::Stop;
        };

        match event {
            ChannelEvent::Message(update) => {
                let result = store.apply_incremental(&update);
                log_apply(self.event_id, update.match_id, "channel", result);
            }
            ChannelEvent::Connecting { attempt } => {
                debug!(event_id = %self.event_id, attempt, "match channel connecting");
                self.transition(session, SessionTrigger::ChannelConnecting);
            }
            ChannelEvent::Opened => {
                self.transition(session, SessionTrigger::ChannelOpened);
            }
            ChannelEvent::Faulted { reason } => {
                warn!(event_id = %self.event_id, %reason, "match channel faulted");
                return self.record_fault(session, SessionTrigger::ChannelFaulted);
            }
            ChannelEvent::Closed => {
                return self.record_fault(session, SessionTrigger::ChannelClosed);
            }
        }

        PumpControl::Continue
    }

    fn record_fault(&self, session: &mut SyncSession, trigger: SessionTrigger) -> PumpControl {
        self.transition(session, trigger);

        let faults = session.consecutive_faults();
        if faults <= self.options.fault_ceiling {
            return PumpControl::Continue;
        }

        warn!(
            event_id = %self.event_id,
            faults,
            ceiling = self.options.fault_ceiling,
            "match channel exceeded fault ceiling; live updates stopped"
        );
        session.mark_connection_lost();
        self.session_observers
            .publish(SessionEvent::ConnectionLost { faults });
        PumpControl::Stop
    }

    fn transition(&self, session: &mut SyncSession, trigger: SessionTrigger) {
        match session.apply(trigger) {
            Ok(transition) => self.publish_transition(transition),
            Err(err) => warn!(event_id = %self.event_id, error = %err, "ignoring session trigger"),
        }
    }

    fn publish_transition(&self, transition: Transition) {
        if let Some(state) = transition.connection {
            self.session_observers
                .publish(SessionEvent::ConnectionChanged { state });
        }
        if transition.phase_changed() {
            info!(
                event_id = %self.event_id,
                from = ?transition.from,
                to = ?transition.to,
                "session phase changed"
            );
            self.session_observers.publish(SessionEvent::PhaseChanged {
                phase: transition.to,
            });
        }
    }
}

async fn run_initial_fetch(inner: Arc<Inner>, session_id: Uuid) {
    match inner.fetch_with_retry().await {
        Ok(event) => {
            if let Some(report) = inner.apply_fetched(session_id, event).await {
                info!(
                    event_id = %inner.event_id,
                    added = report.added,
                    retained = report.retained,
                    "initial fetch applied"
                );
            }
        }
        Err(err) => {
            warn!(event_id = %inner.event_id, error = %err, "initial fetch failed; continuing with live channel only");
            inner.report_fetch_failure(session_id, err.to_string()).await;
        }
    }
}

async fn run_channel_pump(inner: Arc<Inner>, session_id: Uuid) {
    let mut events = inner.channel.open(inner.event_id);
    while let Some(event) = events.next().await {
        if let PumpControl::Stop = inner.handle_channel_event(session_id, event).await {
            break;
        }
    }
    debug!(event_id = %inner.event_id, %session_id, "match channel pump stopped");
}

fn log_apply(event_id: EventId, match_id: MatchId, source: &'static str, result: ApplyResult) {
    match result {
        ApplyResult::Applied => {
            debug!(%event_id, %match_id, source, "winner applied");
        }
        ApplyResult::Ignored(reason) => {
            debug!(%event_id, %match_id, source, ?reason, "winner update ignored");
        }
        ApplyResult::Rejected(reason) => {
            warn!(%event_id, %match_id, source, ?reason, "winner update rejected");
        }
    }
}
