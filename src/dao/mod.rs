//! Access to the remote event service.

/// Fetch-side error taxonomy shared by every event store.
pub mod error;
/// Event service abstraction and its implementations.
pub mod event_store;
/// Wire representations of the event service payloads.
pub mod models;
