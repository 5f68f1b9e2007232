use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("Unable to create directory `{0}`:\n\t{1}")]
    DirectoryCreationError(PathBuf, std::io::Error),
    #[error("Unable to list directory `{0}`:\n\t{1}")]
    DirectoryListingError(PathBuf, std::io::Error),
    #[error("Unable to remove directory `{0}`:\n\t{1}")]
    DirectoryRemovalError(PathBuf, std::io::Error),
    #[error("Unable to write file `{0}`:\n\t{1}")]
    FileWriteError(PathBuf, std::io::Error),
    #[error("Unable to copy `{0}` into the workspace:\n\t{1}")]
    FileCopyError(PathBuf, std::io::Error),
    #[error("Unable to read file `{0}`:\n\t{1}")]
    FileReadError(PathBuf, std::io::Error),
    #[error("Unable to resolve `{0}`:\n\t{1}")]
    PathResolutionError(PathBuf, std::io::Error),
    #[error("`{0}` has no valid file name")]
    InvalidFileName(PathBuf),
    #[error("Invalid glob pattern `{0}`:\n\t{1}")]
    GlobPatternError(String, glob::PatternError),
}
