// std imports
use std::path::{Path, PathBuf};

// 3rd party imports
use tokio::{
    fs::{canonicalize, create_dir_all},
    sync::watch,
};
use tracing::info;
use uuid::Uuid;

// internal imports
use crate::{
    errors::{
        parse_error::ParseError, validation_error::ValidationError,
        workspace_error::WorkspaceError,
    },
    parsing::{
        cache::ParseCache,
        incremental::{IncrementalParser, ParseOutcome, ParseStatus},
        parser::ResultParser,
    },
    validation::{pairing::PairingStrategy, validator::ExperimentTable, FilePairValidator},
    workspace::{Category, StoreOutcome, WorkspaceStore},
};

/// State of a single user session: the workspace with its tracked files,
/// the parsed tables and the parser.
/// Sessions never share a workspace root.
///
pub struct Session<P: ResultParser> {
    id: String,
    store: WorkspaceStore,
    cache: ParseCache,
    parser: IncrementalParser<P>,
    validator: FilePairValidator,
}

impl<P: ResultParser> Session<P> {
    /// Creates a new session with a fresh workspace below the given directory
    ///
    /// # Arguments
    /// * `base_dir` - Directory containing the workspaces
    /// * `parser` - Parser for single experiments
    /// * `strategy` - How files are grouped into experiments
    ///
    pub async fn create(
        base_dir: &Path,
        parser: P,
        strategy: PairingStrategy,
    ) -> Result<Self, WorkspaceError> {
        let id = Uuid::new_v4().to_string();
        let root = base_dir.join(&id);
        create_dir_all(&root)
            .await
            .map_err(|err| WorkspaceError::DirectoryCreationError(root.clone(), err))?;
        info!("Created session `{}` in `{}`", id, root.display());
        Self::open(root, parser, strategy).await
    }

    /// Opens the session of an existing workspace.
    /// Files placed into the category directories are picked up, nothing is parsed yet.
    /// The root is made absolute, so parsers and tools always receive absolute paths.
    ///
    /// # Arguments
    /// * `root` - Workspace root, the last path component is used as session ID
    /// * `parser` - Parser for single experiments
    /// * `strategy` - How files are grouped into experiments
    ///
    pub async fn open(
        root: PathBuf,
        parser: P,
        strategy: PairingStrategy,
    ) -> Result<Self, WorkspaceError> {
        let id = root
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .ok_or_else(|| WorkspaceError::InvalidFileName(root.clone()))?;
        create_dir_all(&root)
            .await
            .map_err(|err| WorkspaceError::DirectoryCreationError(root.clone(), err))?;
        let root = canonicalize(&root)
            .await
            .map_err(|err| WorkspaceError::PathResolutionError(root.clone(), err))?;
        let mut store = WorkspaceStore::new(root);
        store.ensure_category_directories(&Category::ALL).await?;
        store.sync_file_lists(&Category::ALL).await?;
        Ok(Self {
            id,
            store,
            cache: ParseCache::new(),
            parser: IncrementalParser::new(parser, strategy),
            validator: FilePairValidator::new(strategy),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn root(&self) -> &Path {
        self.store.root()
    }

    pub fn store(&self) -> &WorkspaceStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut WorkspaceStore {
        &mut self.store
    }

    pub fn cache(&self) -> &ParseCache {
        &self.cache
    }

    pub fn parser(&self) -> &P {
        self.parser.parser()
    }

    /// Receiver for the parsing progress
    ///
    pub fn subscribe_progress(&self) -> watch::Receiver<ParseStatus> {
        self.parser.subscribe()
    }

    /// Places the given files into the workspace, routed by their suffix.
    /// Unrecognised files and duplicates are reported in the outcomes.
    ///
    /// # Arguments
    /// * `paths` - Files to upload
    ///
    pub async fn upload(&mut self, paths: &[PathBuf]) -> Result<Vec<StoreOutcome>, WorkspaceError> {
        let mut outcomes = Vec::with_capacity(paths.len());
        for path in paths {
            outcomes.push(self.store.ingest_file(path).await?);
        }
        Ok(outcomes)
    }

    /// Copies the example files into the workspace
    ///
    /// # Arguments
    /// * `example_dir` - Directory with the example files
    ///
    pub async fn load_examples(
        &mut self,
        example_dir: &Path,
    ) -> Result<Vec<StoreOutcome>, WorkspaceError> {
        self.store.load_examples(example_dir).await
    }

    /// Parses all tracked files which are not cached yet, or all files if forced
    ///
    /// # Arguments
    /// * `force` - Reparse every tracked file
    ///
    pub fn parse_delta(&mut self, force: bool) -> Result<ParseOutcome, ParseError> {
        self.parser.parse_delta(
            self.store.root(),
            self.store.file_lists(),
            &mut self.cache,
            force,
        )
    }

    /// Overview of the parsed experiments
    ///
    pub fn experiment_table(&self) -> Result<ExperimentTable, ValidationError> {
        self.validator.validate(&self.cache.file_lists())
    }

    /// Overview of the uploaded files, parsed or not
    ///
    pub fn uploaded_table(&self) -> Result<ExperimentTable, ValidationError> {
        self.validator.validate(self.store.file_lists())
    }

    /// Empties the category directory and drops its parsed tables
    ///
    /// # Arguments
    /// * `category` - Category to reset
    ///
    pub async fn reset(&mut self, category: Category) -> Result<(), WorkspaceError> {
        self.store.reset(category).await?;
        self.cache.clear(category);
        Ok(())
    }

    /// Deletes all uploaded data
    ///
    pub async fn reset_all(&mut self) -> Result<(), WorkspaceError> {
        for category in Category::REQUIRED {
            self.reset(category).await?;
        }
        Ok(())
    }
}
