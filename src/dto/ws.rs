use serde::Deserialize;
use serde_with::{DisplayFromStr, PickFirst, serde_as};
use thiserror::Error;
use validator::{Validate, ValidationErrors};

use crate::{
    dto::validation::validate_gamertag,
    state::{MatchId, MatchUpdate},
};

/// Reasons a live-channel text frame could not be used.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Not JSON, or not shaped like a match frame.
    #[error("malformed match frame")]
    Parse(#[from] serde_json::Error),
    /// Parsed but failed validation.
    #[error("invalid match frame: {0}")]
    Invalid(#[from] ValidationErrors),
}

#[derive(Debug, Deserialize, Validate)]
/// Message pushed on the per-event channel whenever a match changes upstream.
pub struct MatchUpdateFrame {
    /// Changed match, under the `match` key.
    #[serde(rename = "match")]
    #[validate(nested)]
    pub entry: MatchUpdatePayload,
}

#[serde_as]
#[derive(Debug, Deserialize, Validate)]
/// Match fields carried by a frame. Extra fields are ignored.
pub struct MatchUpdatePayload {
    /// Match identifier; numeric strings are accepted too.
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub id: u64,
    /// Winner gamertag; absent or `null` while undecided.
    #[serde(default)]
    #[validate(custom(function = "validate_gamertag"))]
    pub winner: Option<String>,
}

impl MatchUpdateFrame {
    /// Parse and validate a raw text frame.
    pub fn from_json_str(raw: &str) -> Result<Self, FrameError> {
        let frame: Self = serde_json::from_str(raw)?;
        frame.validate()?;
        Ok(frame)
    }

    /// Convert into a store update. Frames without a winner carry nothing to apply.
    pub fn into_update(self) -> Option<MatchUpdate> {
        let MatchUpdatePayload { id, winner } = self.entry;
        winner.map(|winner| MatchUpdate {
            match_id: MatchId(id),
            winner,
        })
    }
}
