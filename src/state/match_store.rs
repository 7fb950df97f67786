use std::{collections::HashMap, sync::Arc};

use tracing::{debug, warn};

use crate::state::{
    bracket::{Match, MatchId},
    observers::{Observer, ObserverHub},
};

/// Incremental winner notification for a single match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchUpdate {
    /// Target match.
    pub match_id: MatchId,
    /// Gamertag of the winner.
    pub winner: String,
}

/// Why an incremental update was dropped without changing the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The match already carries a push-confirmed winner.
    Stale,
    /// No match with that identifier is held locally.
    UnknownMatch,
}

/// Why an incremental update was refused as malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The winner is neither of the match's players.
    InvalidWinner,
}

/// Outcome of [`MatchStore::apply_incremental`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyResult {
    /// The winner was recorded and the version advanced.
    Applied,
    /// Dropped without effect; not an error.
    Ignored(IgnoreReason),
    /// Refused as malformed.
    Rejected(RejectReason),
}

/// Summary of a full-snapshot merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FullApplyReport {
    /// Matches that were not held before the fetch.
    pub added: usize,
    /// Matches dropped because the fetch no longer lists them.
    pub removed: usize,
    /// Push-confirmed winners kept over the fetched value.
    pub retained: usize,
    /// Whether the visible state changed at all.
    pub changed: bool,
}

/// Notification emitted for every accepted store mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    /// The snapshot was merged with a full fetch.
    Replaced {
        /// Store revision after the merge.
        revision: u64,
        /// Full snapshot after the merge.
        matches: Vec<Match>,
    },
    /// A single winner was accepted.
    MatchUpdated {
        /// Store revision after the update.
        revision: u64,
        /// Version of the updated match.
        version: u64,
        /// Match as now stored.
        updated: Match,
    },
    /// The caller wiped the store.
    Cleared {
        /// Store revision after the wipe.
        revision: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    current: Match,
    version: u64,
}

/// Canonical in-memory state of one event's matches.
///
/// Every match carries a version counting accepted push-equivalent winner
/// transitions. A winner learned only from a fetch stays at version 0, so a
/// later push may still confirm it, while a fetch can never overwrite a winner
/// whose version is at least 1.
#[derive(Debug)]
pub struct MatchStore {
    entries: HashMap<MatchId, Entry>,
    revision: u64,
    observers: Arc<ObserverHub<StoreChange>>,
}

impl Default for MatchStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchStore {
    /// Empty store with no observers.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            revision: 0,
            observers: Arc::new(ObserverHub::new()),
        }
    }

    /// Shared handle to the hub notified on every accepted mutation.
    pub fn observers(&self) -> Arc<ObserverHub<StoreChange>> {
        Arc::clone(&self.observers)
    }

    /// Register an observer for subsequent mutations.
    pub fn subscribe(&self) -> Observer<StoreChange> {
        self.observers.subscribe()
    }

    /// Merge a full fetch into the store.
    ///
    /// The fetched set defines which matches exist and all non-winner fields.
    /// A local winner with version >= 1 survives unless it is no longer one of
    /// the fetched players.
    pub fn apply_full(&mut self, fetched: Vec<Match>) -> FullApplyReport {
        let mut report = FullApplyReport::default();
        let mut next = HashMap::with_capacity(fetched.len());

        for incoming in fetched {
            let id = incoming.id();
            let entry = match self.entries.get(&id) {
                None => {
                    report.added += 1;
                    Entry {
                        current: incoming,
                        version: 0,
                    }
                }
                Some(local) => match local.current.winner() {
                    Some(winner) if local.version >= 1 && incoming.accepts_winner(winner) => {
                        if incoming.winner() != Some(winner) {
                            debug!(
                                match_id = %id,
                                local = winner,
                                fetched = ?incoming.winner(),
                                "keeping push-confirmed winner over fetched value"
                            );
                        }
                        report.retained += 1;
                        Entry {
                            current: incoming.with_winner(winner.to_owned()),
                            version: local.version,
                        }
                    }
                    Some(winner) if local.version >= 1 => {
                        warn!(
                            match_id = %id,
                            winner,
                            "confirmed winner is no longer a player of the fetched match; taking fetched state"
                        );
                        Entry {
                            current: incoming,
                            version: 0,
                        }
                    }
                    _ => Entry {
                        current: incoming,
                        version: 0,
                    },
                },
            };
            next.insert(id, entry);
        }

        report.removed = self
            .entries
            .keys()
            .filter(|id| !next.contains_key(id))
            .count();
        report.changed = next != self.entries;
        self.entries = next;

        if report.changed {
            self.revision += 1;
            self.observers.publish(StoreChange::Replaced {
                revision: self.revision,
                matches: self.snapshot(),
            });
        }

        report
    }

    /// Apply a single winner update through the reconciliation rule.
    ///
    /// Checks run in a fixed order: unknown match, invalid winner, staleness.
    pub fn apply_incremental(&mut self, update: &MatchUpdate) -> ApplyResult {
        let Some(entry) = self.entries.get_mut(&update.match_id) else {
            return ApplyResult::Ignored(IgnoreReason::UnknownMatch);
        };

        if !entry.current.accepts_winner(&update.winner) {
            return ApplyResult::Rejected(RejectReason::InvalidWinner);
        }

        if entry.version >= 1 {
            return ApplyResult::Ignored(IgnoreReason::Stale);
        }

        entry.current = entry.current.clone().with_winner(update.winner.clone());
        entry.version += 1;
        self.revision += 1;

        self.observers.publish(StoreChange::MatchUpdated {
            revision: self.revision,
            version: entry.version,
            updated: entry.current.clone(),
        });

        ApplyResult::Applied
    }

    /// Consistent copy of every match, ordered by round then identifier.
    pub fn snapshot(&self) -> Vec<Match> {
        let mut matches = self
            .entries
            .values()
            .map(|entry| entry.current.clone())
            .collect::<Vec<_>>();
        matches.sort_by_key(|m| (m.round(), m.id()));
        matches
    }

    /// Current state of one match.
    pub fn get(&self, id: MatchId) -> Option<&Match> {
        self.entries.get(&id).map(|entry| &entry.current)
    }

    /// Number of accepted winner transitions for the match.
    pub fn version(&self, id: MatchId) -> Option<u64> {
        self.entries.get(&id).map(|entry| entry.version)
    }

    /// Store-wide counter of accepted mutations.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of matches held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no match is held.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every match. Only notifies when something was actually held.
    pub fn clear(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        self.entries.clear();
        self.revision += 1;
        self.observers.publish(StoreChange::Cleared {
            revision: self.revision,
        });
    }
}
