//! Client-side state: domain records, the match store, observers and the
//! session state machine.

/// Events, matches and participants.
pub mod bracket;
/// Versioned match store and its reconciliation rule.
pub mod match_store;
/// Observer fan-out.
pub mod observers;
/// Live session state machine.
pub mod session;

pub use self::bracket::{Event, EventDetails, EventId, Match, MatchId, ModelError, Participant};
pub use self::match_store::{
    ApplyResult, FullApplyReport, IgnoreReason, MatchStore, MatchUpdate, RejectReason,
    StoreChange,
};
pub use self::observers::{Observer, ObserverHub};
pub use self::session::{
    ConnectionState, InvalidTransition, SessionPhase, SessionTrigger, SyncSession, Transition,
};
