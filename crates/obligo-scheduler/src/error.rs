use obligo_core::types::Cadence;
use obligo_core::ObligoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid trigger expression '{expression}' for {cadence}: {reason}")]
    InvalidExpression {
        cadence: Cadence,
        expression: String,
        reason: String,
    },

    #[error("no trigger configured for {0}")]
    NoTrigger(Cadence),

    #[error("batch task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Core(#[from] ObligoError),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
