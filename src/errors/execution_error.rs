use std::time::Duration;

use thiserror::Error;

/// Failure of an external tool invocation.
/// Never recovered inside a workflow, halts all remaining inputs.
///
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Unable to start `{0}`:\n\t{1}")]
    SpawnError(String, std::io::Error),
    #[error("`{tool}` exited with {status}:\n\t{stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },
    #[error("`{0}` did not finish within {1:?}")]
    Timeout(String, Duration),
    #[error("`{0}` was cancelled")]
    Cancelled(String),
    #[error("Unable to write parameter file for `{0}`:\n\t{1}")]
    ParameterFileError(String, std::io::Error),
    #[error("Unable to serialize parameters for `{0}`:\n\t{1}")]
    ParameterSerializationError(String, serde_json::Error),
}
