use std::{collections::HashSet, fmt};

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of a tournament event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of a match, unique within its event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(pub u64);

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Errors raised while building domain records from untrusted input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// Round numbers start at 1.
    #[error("match {match_id} has round {round}; rounds start at 1")]
    InvalidRound {
        /// Offending match.
        match_id: MatchId,
        /// Round as received.
        round: u32,
    },
    /// A player slot holds a blank name.
    #[error("match {match_id} has an empty player name")]
    EmptyPlayer {
        /// Offending match.
        match_id: MatchId,
    },
    /// The winner is neither player.
    #[error("winner `{winner}` is not a player of match {match_id}")]
    InvalidWinner {
        /// Offending match.
        match_id: MatchId,
        /// Winner as received.
        winner: String,
    },
    /// Two matches share an identifier.
    #[error("match {0} appears more than once in the event")]
    DuplicateMatch(MatchId),
    /// A participant name is blank.
    #[error("participant name must not be empty")]
    EmptyParticipant,
}

/// Display name (gamertag) of someone taking part in an event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Participant(String);

impl Participant {
    /// Build a participant from a raw name, trimming surrounding whitespace.
    pub fn new(name: impl AsRef<str>) -> Result<Self, ModelError> {
        let trimmed = name.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ModelError::EmptyParticipant);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Trimmed gamertag.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single pairing within a round, with an optional recorded winner.
///
/// Instances can only be obtained through [`Match::new`], so a stored winner is
/// always one of the two players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Match {
    id: MatchId,
    round: u32,
    player1: String,
    player2: Option<String>,
    winner: Option<String>,
}

impl Match {
    /// Validate and build a match. A missing `player2` denotes a bye.
    pub fn new(
        id: MatchId,
        round: u32,
        player1: impl Into<String>,
        player2: Option<String>,
        winner: Option<String>,
    ) -> Result<Self, ModelError> {
        if round == 0 {
            return Err(ModelError::InvalidRound {
                match_id: id,
                round,
            });
        }

        let player1 = player1.into();
        if player1.trim().is_empty() {
            return Err(ModelError::EmptyPlayer { match_id: id });
        }

        let candidate = Self {
            id,
            round,
            player1,
            player2,
            winner: None,
        };

        match winner {
            Some(winner) if !candidate.accepts_winner(&winner) => Err(ModelError::InvalidWinner {
                match_id: id,
                winner,
            }),
            winner => Ok(Self { winner, ..candidate }),
        }
    }

    /// Match identifier.
    pub fn id(&self) -> MatchId {
        self.id
    }

    /// Round, starting at 1.
    pub fn round(&self) -> u32 {
        self.round
    }

    /// First player.
    pub fn player1(&self) -> &str {
        &self.player1
    }

    /// Second player; `None` for a bye.
    pub fn player2(&self) -> Option<&str> {
        self.player2.as_deref()
    }

    /// Recorded winner, if any.
    pub fn winner(&self) -> Option<&str> {
        self.winner.as_deref()
    }

    /// True when the match has no second player.
    pub fn is_bye(&self) -> bool {
        self.player2.is_none()
    }

    /// Whether `name` is one of the players and can therefore be recorded as winner.
    pub fn accepts_winner(&self, name: &str) -> bool {
        self.player1 == name || self.player2.as_deref() == Some(name)
    }

    /// Replace the winner. Callers must have checked [`Match::accepts_winner`].
    pub(crate) fn with_winner(self, winner: String) -> Self {
        debug_assert!(self.accepts_winner(&winner));
        Self {
            winner: Some(winner),
            ..self
        }
    }
}

/// Descriptive, non-match fields of an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EventDetails {
    /// Display title.
    pub title: String,
    /// Free-form description.
    pub description: String,
    /// Date as entered by the organiser.
    pub date: String,
    /// Venue.
    pub location: String,
    /// Gamertags in order of first appearance.
    pub participants: IndexSet<Participant>,
}

/// Read-only client projection of a tournament event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    /// Event identifier.
    pub id: EventId,
    /// Descriptive fields.
    #[serde(flatten)]
    pub details: EventDetails,
    /// Matches in fetch order.
    pub matches: Vec<Match>,
}

impl Event {
    /// Assemble an event, rejecting duplicate match identifiers.
    pub fn new(id: EventId, details: EventDetails, matches: Vec<Match>) -> Result<Self, ModelError> {
        let mut seen = HashSet::with_capacity(matches.len());
        if let Some(duplicate) = matches.iter().map(Match::id).find(|id| !seen.insert(*id)) {
            return Err(ModelError::DuplicateMatch(duplicate));
        }

        Ok(Self {
            id,
            details,
            matches,
        })
    }
}
