use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::oura::OuraError;

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum AgentError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Tool execution failed: {0}")]
    ExecutionError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AgentResult<T> = Result<T, AgentError>;

impl From<OuraError> for AgentError {
    fn from(err: OuraError) -> Self {
        match err {
            // a bad date is something the model can correct on its next attempt
            OuraError::InvalidDate(_) | OuraError::InvalidSubscriptionId(_) => {
                AgentError::InvalidParameters(err.to_string())
            }
            _ => AgentError::ExecutionError(err.to_string()),
        }
    }
}
