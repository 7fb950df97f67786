use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, PickFirst, serde_as};

use crate::state::{Event, EventDetails, EventId, Match, MatchId, ModelError, Participant};

/// Match as served by the event service.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchEntity {
    /// Numeric identifier; numeric strings are accepted too.
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub id: u64,
    /// Round number, starting at 1.
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub round: u32,
    /// First player's gamertag.
    pub player1: String,
    /// Absent, `null` or empty for a bye.
    #[serde(default)]
    pub player2: Option<String>,
    /// Absent, `null` or empty while undecided.
    #[serde(default)]
    pub winner: Option<String>,
}

/// Event as served by the event service.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventEntity {
    /// Numeric identifier; numeric strings are accepted too.
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub id: u64,
    /// Display title.
    #[serde(default)]
    pub title: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Date as entered by the organiser.
    #[serde(default)]
    pub date: String,
    /// Venue.
    #[serde(default)]
    pub location: String,
    /// Gamertags; blank entries are dropped on conversion.
    #[serde(default)]
    pub participants: Vec<String>,
    /// Every match of the bracket.
    #[serde(default)]
    pub matches: Vec<MatchEntity>,
}

/// `GET /events/{id}` and `POST /events` response body.
#[derive(Debug, Deserialize, Serialize)]
pub struct EventEnvelope {
    /// Wrapped event.
    pub event: EventEntity,
}

/// `GET /events` response body.
#[derive(Debug, Deserialize, Serialize)]
pub struct EventsEnvelope {
    /// Wrapped events.
    #[serde(default)]
    pub events: Vec<EventEntity>,
}

/// `PATCH /events/{id}/matches/{match_id}` response body.
#[derive(Debug, Deserialize, Serialize)]
pub struct MatchEnvelope {
    /// Wrapped match, under the `match` key.
    #[serde(rename = "match")]
    pub entry: MatchEntity,
}

/// `PATCH /events/{id}/matches/{match_id}` request body.
#[derive(Debug, Serialize)]
pub struct WinnerPatch<'a> {
    /// Requested winner.
    pub winner: &'a str,
}

/// `POST /events` request body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewEvent {
    /// Display title.
    pub title: String,
    /// Date as entered by the organiser.
    pub date: String,
    /// Venue.
    pub location: String,
    /// Free-form description.
    pub description: String,
    /// Gamertags of the entrants.
    pub participants: Vec<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl TryFrom<MatchEntity> for Match {
    type Error = ModelError;

    fn try_from(entity: MatchEntity) -> Result<Self, Self::Error> {
        Match::new(
            MatchId(entity.id),
            entity.round,
            entity.player1,
            non_empty(entity.player2),
            non_empty(entity.winner),
        )
    }
}

impl TryFrom<EventEntity> for Event {
    type Error = ModelError;

    fn try_from(entity: EventEntity) -> Result<Self, Self::Error> {
        // Blank participant lines are dropped rather than failing the whole event.
        let participants = entity
            .participants
            .iter()
            .filter_map(|name| Participant::new(name).ok())
            .collect();

        let matches = entity
            .matches
            .into_iter()
            .map(Match::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Event::new(
            EventId(entity.id),
            EventDetails {
                title: entity.title,
                description: entity.description,
                date: entity.date,
                location: entity.location,
                participants,
            },
            matches,
        )
    }
}
