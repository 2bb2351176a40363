//! The provider-independent programme record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a candidate programme was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProgrammeError {
    /// End is not after start.
    #[error("programme ends at {end} which is not after its start {start}")]
    EmptyInterval {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    /// Title is empty after trimming.
    #[error("programme has an empty title")]
    MissingTitle,
}

/// One scheduled broadcast on a logical channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Programme {
    /// Id of the logical channel it belongs to.
    pub channel_id: String,
    /// Start instant.
    pub start: DateTime<Utc>,
    /// End instant, strictly after `start`.
    pub end: DateTime<Utc>,
    /// Trimmed, non-empty title.
    pub title: String,
    /// Trimmed description, `None` when absent or blank.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Programme {
    /// Builds a programme, enforcing a non-empty title and a positive duration.
    pub fn new(
        channel_id: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        title: &str,
    ) -> Result<Self, ProgrammeError> {
        if end <= start {
            return Err(ProgrammeError::EmptyInterval { start, end });
        }
        let title = title.trim();
        if title.is_empty() {
            return Err(ProgrammeError::MissingTitle);
        }
        Ok(Self {
            channel_id: channel_id.into(),
            start,
            end,
            title: title.to_string(),
            description: None,
        })
    }

    /// Builder method to attach a description. Blank text is dropped.
    pub fn with_description(mut self, description: Option<&str>) -> Self {
        self.description = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);
        self
    }
}
