//! Client-side synchronizer keeping a live, consistent view of a tournament
//! event's matches, reconciling REST snapshots with pushed winner updates.

pub mod channel;
pub mod config;
pub mod dao;
pub mod dto;
mod error;
pub mod services;
pub mod state;

pub use error::SyncError;
