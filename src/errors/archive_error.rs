use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Unable to create archive `{0}`:\n\t{1}")]
    CreationError(PathBuf, std::io::Error),
    #[error("Unable to read `{0}` for archiving:\n\t{1}")]
    ReadError(PathBuf, std::io::Error),
    #[error("Unable to write `{0}` into the archive:\n\t{1}")]
    ZipError(String, zip::result::ZipError),
    #[error("Archiving task failed:\n\t{0}")]
    TaskError(#[from] tokio::task::JoinError),
}
