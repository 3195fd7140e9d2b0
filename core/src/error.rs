use thiserror::Error;

use crate::types::{ClueId, ContactId, CycleId};

#[derive(Error, Debug)]
pub enum GameError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("No save found for '{identifier}'")]
    NotFound { identifier: String },

    #[error("Save '{identifier}' is corrupt: {source}")]
    CorruptData {
        identifier: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Participant '{participant}' failed during {operation}: {reason}")]
    ParticipantFailure {
        participant: String,
        operation: &'static str,
        reason: String,
    },

    #[error("A save is already in flight; request did not start a new save")]
    SaveInFlight,

    #[error("Save stamped for cycle {stamped} but the current cycle is {current}")]
    StaleStamp { stamped: CycleId, current: CycleId },

    #[error("Clue {id} is not in the catalog")]
    UnknownClue { id: ClueId },

    #[error("Contact {id} is not in the catalog")]
    UnknownContact { id: ContactId },

    #[error("No message thread for contact {id}")]
    UnknownThread { id: ContactId },

    #[error("Invalid player pose: {reason}")]
    InvalidPose { reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GameError {
    /// True for the outcomes a load treats as "start from an empty save".
    pub fn is_recoverable_load(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::CorruptData { .. })
    }
}

pub type GameResult<T> = Result<T, GameError>;
