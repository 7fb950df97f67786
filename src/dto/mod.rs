//! Serializable views and wire frames exchanged with consumers and the live channel.

use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Read view of the live session.
pub mod session;
/// Validation helpers for incoming frames.
pub mod validation;
/// Live-channel frames.
pub mod ws;

fn format_timestamp(time: OffsetDateTime) -> String {
    time.format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
