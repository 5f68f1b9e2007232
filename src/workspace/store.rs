use std::{
    collections::HashMap,
    ffi::OsStr,
    path::{Path, PathBuf},
};

use glob::glob;
use metrics::counter;
use tokio::fs::{copy, create_dir_all, metadata, read_dir, remove_dir_all, rename, write};
use tracing::{debug, info, warn};

use crate::{
    constants::{
        FASTA_FILE_EXTENSION, SPECTRA_FILE_EXTENSION, STORED_FILES_COUNTER, TSV_FILE_EXTENSION,
    },
    errors::workspace_error::WorkspaceError,
};

use super::category::Category;

/// Prefix of partially written files, they are never tracked
///
const PARTIAL_FILE_PREFIX: &str = ".partial_";

/// What to do when a file with an already tracked name arrives
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Keep the tracked file, the new content is dropped without comparing it
    #[default]
    IgnoreDuplicateByName,
}

/// Result of placing a single file into the workspace
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOutcome {
    /// File was written and is tracked now
    Stored {
        category: Category,
        file_name: String,
    },
    /// A file with the same name was already tracked
    Duplicate {
        category: Category,
        file_name: String,
    },
    /// File name does not belong to any category
    Unrecognized { file_name: String },
}

/// Directory backed storage of the uploaded files, one directory per category,
/// mirrored by an in-memory list of the tracked file names.
///
pub struct WorkspaceStore {
    /// Workspace root, unique per session
    root: PathBuf,

    /// Tracked file names per category
    file_lists: HashMap<Category, Vec<String>>,

    /// Policy for files with already tracked names
    duplicate_policy: DuplicatePolicy,
}

impl WorkspaceStore {
    /// Creates a new store. Nothing is touched on disk until
    /// [WorkspaceStore::ensure_category_directories] is called.
    ///
    /// # Arguments
    /// * `root` - Workspace root directory
    ///
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            file_lists: HashMap::new(),
            duplicate_policy: DuplicatePolicy::default(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        self.duplicate_policy
    }

    /// Directory of the given category
    ///
    pub fn category_dir(&self, category: Category) -> PathBuf {
        self.root.join(category.dir_name())
    }

    /// Tracked file names of the given category, empty if the category is not tracked
    ///
    pub fn file_list(&self, category: Category) -> &[String] {
        self.file_lists
            .get(&category)
            .map(|files| files.as_slice())
            .unwrap_or(&[])
    }

    /// Tracked file names of all categories
    ///
    pub fn file_lists(&self) -> &HashMap<Category, Vec<String>> {
        &self.file_lists
    }

    /// Checks if the category contains a file with the given name
    ///
    pub fn is_tracked(&self, category: Category, file_name: &str) -> bool {
        self.file_list(category)
            .iter()
            .any(|tracked| tracked == file_name)
    }

    /// Creates missing category directories and starts tracking categories
    /// which are not tracked yet. Already tracked lists are kept.
    ///
    /// # Arguments
    /// * `categories` - Categories to prepare
    ///
    pub async fn ensure_category_directories(
        &mut self,
        categories: &[Category],
    ) -> Result<(), WorkspaceError> {
        for category in categories {
            let dir = self.category_dir(*category);
            if !dir.is_dir() {
                create_dir_all(&dir)
                    .await
                    .map_err(|err| WorkspaceError::DirectoryCreationError(dir.clone(), err))?;
                debug!("Created `{}`", dir.display());
            }
            self.file_lists.entry(*category).or_default();
        }
        Ok(())
    }

    /// Replaces the tracked lists with the current directory content,
    /// picking up files which were placed or removed outside of the store.
    ///
    /// # Arguments
    /// * `categories` - Categories to synchronize
    ///
    pub async fn sync_file_lists(&mut self, categories: &[Category]) -> Result<(), WorkspaceError> {
        for category in categories {
            let dir = self.category_dir(*category);
            let mut entries = read_dir(&dir)
                .await
                .map_err(|err| WorkspaceError::DirectoryListingError(dir.clone(), err))?;
            let mut file_names = Vec::new();
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|err| WorkspaceError::DirectoryListingError(dir.clone(), err))?
            {
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|err| WorkspaceError::DirectoryListingError(dir.clone(), err))?;
                if !file_type.is_file() {
                    continue;
                }
                let file_name = entry.file_name().to_string_lossy().to_string();
                if file_name.starts_with(PARTIAL_FILE_PREFIX) {
                    continue;
                }
                file_names.push(file_name);
            }
            file_names.sort();
            self.file_lists.insert(*category, file_names);
        }
        Ok(())
    }

    /// Writes the content into the category directory unless a file with the same name is tracked.
    /// The file is written next to its destination first and renamed afterwards,
    /// so the directory never contains a half written tracked file.
    ///
    /// # Arguments
    /// * `category` - Category of the file
    /// * `file_name` - Plain file name, names containing directories are rejected
    /// * `content` - File content
    ///
    pub async fn store(
        &mut self,
        category: Category,
        file_name: &str,
        content: &[u8],
    ) -> Result<StoreOutcome, WorkspaceError> {
        if Path::new(file_name).file_name() != Some(OsStr::new(file_name)) {
            return Err(WorkspaceError::InvalidFileName(PathBuf::from(file_name)));
        }
        if self.is_tracked(category, file_name) {
            return Ok(self.duplicate(category, file_name));
        }
        let destination = self.category_dir(category).join(file_name);
        let partial = self.partial_path(category, file_name);
        write(&partial, content)
            .await
            .map_err(|err| WorkspaceError::FileWriteError(destination.clone(), err))?;
        rename(&partial, &destination)
            .await
            .map_err(|err| WorkspaceError::FileWriteError(destination.clone(), err))?;
        Ok(self.track(category, file_name))
    }

    /// Places an existing file into the workspace, the category is inferred from the file name.
    /// Files already located in their category directory (e.g. tool outputs) are only tracked
    /// if they exist, all others are copied.
    ///
    /// # Arguments
    /// * `path` - Path to the file
    ///
    pub async fn ingest_file(&mut self, path: &Path) -> Result<StoreOutcome, WorkspaceError> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .ok_or_else(|| WorkspaceError::InvalidFileName(path.to_path_buf()))?;

        let category = match Self::accepted_category(&file_name) {
            Some(category) => category,
            None => {
                warn!("`{}` does not belong to any category, skipped", file_name);
                return Ok(StoreOutcome::Unrecognized { file_name });
            }
        };

        if self.is_tracked(category, &file_name) {
            return Ok(self.duplicate(category, &file_name));
        }

        let category_dir = self.category_dir(category);
        if path.parent() == Some(category_dir.as_path()) {
            metadata(path)
                .await
                .map_err(|err| WorkspaceError::FileReadError(path.to_path_buf(), err))?;
        } else {
            let destination = category_dir.join(&file_name);
            let partial = self.partial_path(category, &file_name);
            copy(path, &partial)
                .await
                .map_err(|err| WorkspaceError::FileCopyError(path.to_path_buf(), err))?;
            rename(&partial, &destination)
                .await
                .map_err(|err| WorkspaceError::FileCopyError(path.to_path_buf(), err))?;
        }

        Ok(self.track(category, &file_name))
    }

    /// Copies the example files of the required categories from the given directory
    /// (`*annotated.mzML`, `*deconv.mzML`, `*tagged.tsv`, `*protein.tsv`).
    ///
    /// # Arguments
    /// * `example_dir` - Directory containing the example files
    ///
    pub async fn load_examples(
        &mut self,
        example_dir: &Path,
    ) -> Result<Vec<StoreOutcome>, WorkspaceError> {
        let mut outcomes = Vec::new();
        for category in [
            Category::AnnotatedSpectra,
            Category::DeconvolvedSpectra,
            Category::TagResults,
            Category::ProteinResults,
        ] {
            let pattern = example_dir
                .join(format!("*{}", category.file_suffix()))
                .to_string_lossy()
                .to_string();
            let mut paths: Vec<PathBuf> = glob(&pattern)
                .map_err(|err| WorkspaceError::GlobPatternError(pattern.clone(), err))?
                .filter_map(|entry| match entry {
                    Ok(path) => Some(path),
                    Err(err) => {
                        warn!("Unable to access example file: {}", err);
                        None
                    }
                })
                .collect();
            paths.sort();
            for path in paths {
                outcomes.push(self.ingest_file(&path).await?);
            }
        }
        Ok(outcomes)
    }

    /// Removes the category directory including its content and recreates it empty.
    /// The tracked list of the category is cleared.
    ///
    /// # Arguments
    /// * `category` - Category to reset
    ///
    pub async fn reset(&mut self, category: Category) -> Result<(), WorkspaceError> {
        let dir = self.category_dir(category);
        if dir.exists() {
            remove_dir_all(&dir)
                .await
                .map_err(|err| WorkspaceError::DirectoryRemovalError(dir.clone(), err))?;
        }
        create_dir_all(&dir)
            .await
            .map_err(|err| WorkspaceError::DirectoryCreationError(dir.clone(), err))?;
        self.file_lists.insert(category, Vec::new());
        info!("Reset `{}`", dir.display());
        Ok(())
    }

    /// Category for uploads. Only spectra, TSV and FASTA files are accepted.
    ///
    fn accepted_category(file_name: &str) -> Option<Category> {
        let accepted = [SPECTRA_FILE_EXTENSION, TSV_FILE_EXTENSION, FASTA_FILE_EXTENSION]
            .iter()
            .any(|extension| file_name.ends_with(extension));
        if !accepted {
            return None;
        }
        Category::from_file_name(file_name)
    }

    fn partial_path(&self, category: Category, file_name: &str) -> PathBuf {
        self.category_dir(category)
            .join(format!("{}{}", PARTIAL_FILE_PREFIX, file_name))
    }

    fn track(&mut self, category: Category, file_name: &str) -> StoreOutcome {
        self.file_lists
            .entry(category)
            .or_default()
            .push(file_name.to_string());
        counter!(STORED_FILES_COUNTER).increment(1);
        debug!("Stored `{}` in `{}`", file_name, category);
        StoreOutcome::Stored {
            category,
            file_name: file_name.to_string(),
        }
    }

    fn duplicate(&self, category: Category, file_name: &str) -> StoreOutcome {
        match self.duplicate_policy {
            DuplicatePolicy::IgnoreDuplicateByName => {
                info!(
                    "`{}` is already part of `{}`, keeping the existing file",
                    file_name, category
                );
            }
        }
        StoreOutcome::Duplicate {
            category,
            file_name: file_name.to_string(),
        }
    }
}
