use thiserror::Error;

/// A workflow was started without selecting a required input.
/// Recovered by the caller, the workflow does not run.
///
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("{message}")]
    MissingInput { role: String, message: String },
}

impl SelectionError {
    pub fn missing_input(role: &str, message: &str) -> Self {
        Self::MissingInput {
            role: role.to_string(),
            message: message.to_string(),
        }
    }

    /// Input role which was not selected
    ///
    pub fn role(&self) -> &str {
        match self {
            Self::MissingInput { role, .. } => role,
        }
    }
}
