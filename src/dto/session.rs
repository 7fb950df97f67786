use serde::Serialize;
use uuid::Uuid;

use crate::{
    dto::format_timestamp,
    state::{ConnectionState, EventId, SessionPhase, SyncSession},
};

/// Serializable read view of the live subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    /// Session identifier.
    pub id: Uuid,
    /// Tracked event.
    pub event_id: EventId,
    /// Lifecycle phase.
    pub phase: SessionPhase,
    /// Live channel connection state.
    pub connection: ConnectionState,
    /// RFC 3339 time of the last full fetch applied to the store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_fetch_at: Option<String>,
    /// Channel faults since the last successful open.
    pub consecutive_faults: u32,
    /// Live updates stopped after too many channel faults.
    pub connection_lost: bool,
    /// Number of transitions applied to the session.
    pub version: usize,
}

impl From<&SyncSession> for SessionSnapshot {
    fn from(session: &SyncSession) -> Self {
        Self {
            id: session.id(),
            event_id: session.event_id(),
            phase: session.phase(),
            connection: session.connection(),
            last_fetch_at: session.last_fetch_at().map(format_timestamp),
            consecutive_faults: session.consecutive_faults(),
            connection_lost: session.connection_lost(),
            version: session.version(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::state::SessionTrigger;

    #[test]
    fn snapshot_serializes_phase_and_timestamp() {
        let mut session = SyncSession::new(EventId(12));
        session.apply(SessionTrigger::Subscribe).unwrap();
        session.apply(SessionTrigger::FetchCompleted).unwrap();

        let value = serde_json::to_value(SessionSnapshot::from(&session)).unwrap();
        assert_eq!(value["event_id"], json!(12));
        assert_eq!(value["phase"], json!("subscribing"));
        assert_eq!(value["connection"], json!("disconnected"));
        assert!(value["last_fetch_at"].as_str().unwrap().contains('T'));
    }
}
