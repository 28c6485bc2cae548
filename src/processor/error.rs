//! Error types for the processor module

use crate::error::Error as CrateError;
use thiserror::Error;

/// Error type for enrichment operations
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The completion call failed
    #[error("LLM error: {0}")]
    Llm(#[from] rig::completion::CompletionError),
}

impl From<ProcessError> for CrateError {
    fn from(err: ProcessError) -> Self {
        CrateError::Process(err.to_string())
    }
}
