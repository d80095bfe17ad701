//! Director error types.

use thiserror::Error;

use racecast_llm::LlmError;

use crate::director::DirectorState;

pub type DirectorResult<T> = Result<T, DirectorError>;

#[derive(Debug, Error)]
pub enum DirectorError {
    #[error("operation rejected: {0} is in progress")]
    Busy(DirectorState),

    #[error("invalid frame range: start {start} must precede end {end}")]
    InvalidRange { start: i64, end: i64 },

    #[error("scan a replay before generating a plan")]
    NoScanResult,

    #[error("no generated plan to apply")]
    NoPlan,

    #[error("remote provider '{0}' is not configured")]
    ProviderNotConfigured(String),

    #[error("plan provider error: {0}")]
    Provider(#[from] LlmError),
}
