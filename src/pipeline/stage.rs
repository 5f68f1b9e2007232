use std::path::{Path, PathBuf};

use tokio::fs::{copy, rename};

use crate::errors::pipeline_error::PipelineError;

/// Prefix of files which are still copied
///
const PARTIAL_FILE_PREFIX: &str = ".partial_";

/// Output role of a stage with its file naming, resulting in `{base}{suffix}.{extension}`
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSpec {
    pub role: &'static str,
    pub suffix: &'static str,
    pub extension: &'static str,
}

impl OutputSpec {
    pub const fn new(role: &'static str, suffix: &'static str, extension: &'static str) -> Self {
        Self {
            role,
            suffix,
            extension,
        }
    }

    /// File name for the given base name
    ///
    /// # Arguments
    /// * `base_name` - Input file name without extension
    ///
    pub fn file_name(&self, base_name: &str) -> String {
        format!("{}{}.{}", base_name, self.suffix, self.extension)
    }

    /// Path of the output in the given directory
    ///
    /// # Arguments
    /// * `dir` - Output directory
    /// * `base_name` - Input file name without extension
    ///
    pub fn path_in(&self, dir: &Path, base_name: &str) -> PathBuf {
        dir.join(self.file_name(base_name))
    }
}

/// Base name of an input file, which is the file name without its extension,
/// e.g. `/data/run_01.mzML` -> `run_01`
///
/// # Arguments
/// * `input` - Path to the input file
///
pub fn base_name(input: &Path) -> Result<String, PipelineError> {
    input
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| PipelineError::InvalidInputFileName(input.display().to_string()))
}

/// Copies the file byte by byte. The copy is placed next to the destination first
/// and renamed afterwards, an existing destination is replaced.
///
/// # Arguments
/// * `source` - File to copy
/// * `destination` - Destination path
///
pub async fn copy_file(source: &Path, destination: &Path) -> Result<(), PipelineError> {
    let file_name = destination
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .ok_or_else(|| PipelineError::InvalidInputFileName(destination.display().to_string()))?;
    let partial = destination.with_file_name(format!("{}{}", PARTIAL_FILE_PREFIX, file_name));
    copy(source, &partial)
        .await
        .map_err(|err| PipelineError::FileCopyError(source.display().to_string(), err))?;
    rename(&partial, destination)
        .await
        .map_err(|err| PipelineError::FileCopyError(source.display().to_string(), err))?;
    Ok(())
}
