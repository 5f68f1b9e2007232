use thiserror::Error;

use super::{
    archive_error::ArchiveError, execution_error::ExecutionError, parse_error::ParseError,
    workspace_error::WorkspaceError,
};

/// Merges all errors which are not recovered inside a workflow
///
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Execution error: {0}")]
    ExecutionError(#[from] ExecutionError),
    #[error("Parse error: {0}")]
    ParseError(#[from] ParseError),
    #[error("Workspace error: {0}")]
    WorkspaceError(#[from] WorkspaceError),
    #[error("Archive error: {0}")]
    ArchiveError(#[from] ArchiveError),
    #[error("Unable to create directory `{0}`:\n\t{1}")]
    DirectoryCreationError(String, std::io::Error),
    #[error("Unable to list directory `{0}`:\n\t{1}")]
    DirectoryListingError(String, std::io::Error),
    #[error("Unable to remove directory `{0}`:\n\t{1}")]
    DirectoryRemovalError(String, std::io::Error),
    #[error("Unable to copy `{0}`:\n\t{1}")]
    FileCopyError(String, std::io::Error),
    #[error("`{0}` has no valid file name")]
    InvalidInputFileName(String),
}
