use crate::types::Cadence;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObligoError {
    #[error("not initialized: run 'obligo init'")]
    NotInitialized,

    /// A frequency config field is missing or malformed for its cadence.
    #[error("invalid {cadence} config field '{field}': {reason}")]
    ConfigValidation {
        cadence: Cadence,
        field: &'static str,
        reason: String,
    },

    /// A derived due date does not exist on the calendar.
    #[error("cannot compute {cadence} due date: {reason}")]
    DateComputation { cadence: Cadence, reason: String },

    #[error("obligation not found: {0}")]
    ObligationNotFound(String),

    #[error("obligation already exists: {0}")]
    ObligationExists(String),

    #[error("sub-obligation not found: {0}")]
    SubObligationNotFound(String),

    #[error("client not found: {0}")]
    ClientNotFound(String),

    #[error("client already exists: {0}")]
    ClientExists(String),

    #[error("timeline not found: {0}")]
    TimelineNotFound(String),

    #[error("invalid id '{0}': must be lowercase alphanumeric with hyphens or underscores")]
    InvalidId(String),

    #[error("invalid cadence: {0}")]
    InvalidCadence(String),

    #[error("invalid timeline status: {0}")]
    InvalidStatus(String),

    #[error("unknown timezone: {0}")]
    InvalidTimezone(String),

    #[error("timeline store error: {0}")]
    Store(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A definition file on disk is not valid YAML for its type.
    #[error("cannot parse {}: {source}", path.display())]
    Document {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ObligoError {
    pub(crate) fn config(cadence: Cadence, field: &'static str, reason: impl Into<String>) -> Self {
        Self::ConfigValidation {
            cadence,
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn date(cadence: Cadence, reason: impl Into<String>) -> Self {
        Self::DateComputation {
            cadence,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ObligoError>;
