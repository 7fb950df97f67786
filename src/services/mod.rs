//! Orchestration services.

/// Bounded exponential backoff for event service calls.
pub mod retry;
/// Session orchestration: fetch, live channel and winner requests.
pub mod synchronizer;
