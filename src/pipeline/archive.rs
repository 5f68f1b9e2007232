// std imports
use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

// 3rd party imports
use tokio::task::spawn_blocking;
use tracing::debug;
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

// internal imports
use crate::errors::archive_error::ArchiveError;

/// Writes a deflated zip archive with all given files which exist.
/// Entries are named by the file name only, missing files are left out.
/// Returns the archived files. Compression runs on the blocking thread pool.
///
/// # Arguments
/// * `archive_path` - Path of the archive
/// * `files` - Files to archive
///
pub async fn write_bundle(
    archive_path: &Path,
    files: &[PathBuf],
) -> Result<Vec<PathBuf>, ArchiveError> {
    let archive_path = archive_path.to_path_buf();
    let files = files.to_vec();
    spawn_blocking(move || write_bundle_blocking(&archive_path, &files)).await?
}

fn write_bundle_blocking(
    archive_path: &Path,
    files: &[PathBuf],
) -> Result<Vec<PathBuf>, ArchiveError> {
    let archive_file = File::create(archive_path)
        .map_err(|err| ArchiveError::CreationError(archive_path.to_path_buf(), err))?;
    let mut writer = ZipWriter::new(archive_file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut archived = Vec::with_capacity(files.len());
    for file in files {
        if !file.is_file() {
            debug!("`{}` not produced, skipped", file.display());
            continue;
        }
        let entry_name = match file.file_name() {
            Some(name) => name.to_string_lossy().to_string(),
            None => continue,
        };
        let content =
            std::fs::read(file).map_err(|err| ArchiveError::ReadError(file.clone(), err))?;
        writer
            .start_file(entry_name.clone(), options)
            .map_err(|err| ArchiveError::ZipError(entry_name.clone(), err))?;
        writer
            .write_all(&content)
            .map_err(|err| ArchiveError::ZipError(entry_name, err.into()))?;
        archived.push(file.clone());
    }

    writer
        .finish()
        .map_err(|err| ArchiveError::ZipError(archive_path.display().to_string(), err))?;
    Ok(archived)
}
