// std imports
use std::{
    collections::HashMap,
    future::Future,
    path::{Path, PathBuf},
};

// 3rd party imports
use tokio::fs::{create_dir_all, read_dir};
use tracing::{debug, info};

// internal imports
use crate::{
    configuration::{ToolParameters, WorkflowParameters},
    constants::WORKFLOW_INPUT_DIR,
    errors::{
        execution_error::ExecutionError, pipeline_error::PipelineError,
        selection_error::SelectionError,
    },
    parsing::{incremental::ParseOutcome, parser::ResultParser},
    session::Session,
    workspace::StoreOutcome,
};

use super::{
    executor::{CustomInvocation, ExecutionControl, ToolExecutor, ToolInvocation},
    stage::copy_file,
};

/// Input role of a workflow
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputDeclaration {
    /// Role, also the key of the upload directory and of the selection
    pub role: &'static str,
    /// Shown when nothing could be resolved for the role
    pub missing_message: &'static str,
    /// Files from the example data directory used when nothing was uploaded
    pub fallback: &'static [&'static str],
}

/// Resolved files per input role
///
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedInputs {
    files: HashMap<String, Vec<PathBuf>>,
}

impl ResolvedInputs {
    /// Resolved files of the role, empty for unknown roles
    ///
    pub fn files(&self, role: &str) -> &[PathBuf] {
        self.files
            .get(role)
            .map(|files| files.as_slice())
            .unwrap_or(&[])
    }
}

/// Summary of a completed workflow run
///
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Number of tool and custom step invocations
    pub invocations: usize,
    /// Output files which exist after the run
    pub produced: Vec<PathBuf>,
    /// Written archives
    pub bundles: Vec<PathBuf>,
    /// Outcomes of placing the outputs into the workspace
    pub stored: Vec<StoreOutcome>,
    /// Outcome of the forced reparse after the outputs were placed
    pub parse_outcome: Option<ParseOutcome>,
}

/// Result of a workflow which did not fail
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Completed(ExecutionReport),
    /// A required input role was not selected, nothing was run
    MissingSelection(SelectionError),
}

/// Everything a workflow needs during execution
///
pub struct WorkflowContext<'a, E: ToolExecutor, P: ResultParser> {
    pub session: &'a mut Session<P>,
    executor: &'a E,
    control: &'a ExecutionControl,
    /// Directory of the workflow below the workspace root
    pub workflow_dir: PathBuf,
    pub inputs: ResolvedInputs,
    invocations: usize,
}

impl<'a, E: ToolExecutor, P: ResultParser> WorkflowContext<'a, E, P> {
    pub fn new(
        session: &'a mut Session<P>,
        executor: &'a E,
        control: &'a ExecutionControl,
        workflow_dir: PathBuf,
        inputs: ResolvedInputs,
    ) -> Self {
        Self {
            session,
            executor,
            control,
            workflow_dir,
            inputs,
            invocations: 0,
        }
    }

    /// Workspace root of the session
    ///
    pub fn root(&self) -> &Path {
        self.session.root()
    }

    /// Number of invocations so far
    ///
    pub fn invocations(&self) -> usize {
        self.invocations
    }

    /// Runs a tool, failures are returned to the workflow
    ///
    pub async fn run_tool(&mut self, invocation: ToolInvocation) -> Result<(), ExecutionError> {
        self.invocations += 1;
        self.executor.run_tool(&invocation, self.control).await
    }

    /// Runs a custom step, failures are returned to the workflow
    ///
    pub async fn run_custom(&mut self, invocation: CustomInvocation) -> Result<(), ExecutionError> {
        self.invocations += 1;
        self.executor.run_custom(&invocation, self.control).await
    }
}

/// A sequence of tool invocations over the selected inputs
///
pub trait Workflow: Send + Sync {
    /// Name, also the directory of the workflow below the workspace root
    ///
    fn name(&self) -> &'static str;

    /// Declared input roles, all of them are required
    ///
    fn inputs(&self) -> &'static [InputDeclaration];

    /// Parameters which are never forwarded to the tool
    ///
    /// # Arguments
    /// * `tool` - Tool name
    ///
    fn excluded_parameters(&self, _tool: &str) -> &'static [&'static str] {
        &[]
    }

    /// Parameters forwarded to the tool
    ///
    /// # Arguments
    /// * `parameters` - Workflow parameters
    /// * `tool` - Tool name
    ///
    fn tool_parameters(&self, parameters: &WorkflowParameters, tool: &str) -> ToolParameters {
        parameters.tool_parameters(tool, self.excluded_parameters(tool))
    }

    /// Runs the workflow on the resolved inputs.
    /// The first failing invocation halts the remaining inputs.
    ///
    /// # Arguments
    /// * `context` - Session, executor and resolved inputs
    /// * `parameters` - Workflow parameters
    ///
    fn execute<E: ToolExecutor, P: ResultParser>(
        &self,
        context: &mut WorkflowContext<'_, E, P>,
        parameters: &WorkflowParameters,
    ) -> impl Future<Output = Result<ExecutionReport, PipelineError>> + Send;

    /// Collects outputs of an earlier run. Nothing to do by default.
    ///
    /// # Arguments
    /// * `context` - Session, executor and resolved inputs
    /// * `parameters` - Workflow parameters
    ///
    fn pull_results<E: ToolExecutor, P: ResultParser>(
        &self,
        _context: &mut WorkflowContext<'_, E, P>,
        _parameters: &WorkflowParameters,
    ) -> impl Future<Output = Result<ExecutionReport, PipelineError>> + Send {
        async { Ok(ExecutionReport::default()) }
    }
}

/// Resolves workflow inputs and runs workflows strictly sequentially
///
pub struct WorkflowRunner<E: ToolExecutor> {
    executor: E,
    control: ExecutionControl,
    example_data_dir: PathBuf,
}

impl<E: ToolExecutor> WorkflowRunner<E> {
    /// Creates a new runner
    ///
    /// # Arguments
    /// * `executor` - Executor for tools and custom steps
    /// * `control` - Timeout and cancellation for every invocation
    /// * `example_data_dir` - Directory containing the fallback files
    ///
    pub fn new(executor: E, control: ExecutionControl, example_data_dir: PathBuf) -> Self {
        Self {
            executor,
            control,
            example_data_dir,
        }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn control(&self) -> &ExecutionControl {
        &self.control
    }

    /// Directory of the workflow below the workspace root
    ///
    pub fn workflow_dir<P: ResultParser, W: Workflow>(session: &Session<P>, workflow: &W) -> PathBuf {
        session.root().join(workflow.name())
    }

    /// Directory of uploaded files of the given input role
    ///
    pub fn input_dir<P: ResultParser, W: Workflow>(
        session: &Session<P>,
        workflow: &W,
        role: &str,
    ) -> PathBuf {
        Self::workflow_dir(session, workflow)
            .join(WORKFLOW_INPUT_DIR)
            .join(role)
    }

    /// Copies files into the upload directory of the input role.
    /// Returns the paths of the copies.
    ///
    /// # Arguments
    /// * `session` - Session
    /// * `workflow` - Workflow
    /// * `role` - Input role
    /// * `files` - Files to upload
    ///
    pub async fn upload<P: ResultParser, W: Workflow>(
        &self,
        session: &Session<P>,
        workflow: &W,
        role: &str,
        files: &[PathBuf],
    ) -> Result<Vec<PathBuf>, PipelineError> {
        let input_dir = Self::input_dir(session, workflow, role);
        Self::ensure_dir(&input_dir).await?;
        let mut uploaded = Vec::with_capacity(files.len());
        for file in files {
            let file_name = file
                .file_name()
                .ok_or_else(|| PipelineError::InvalidInputFileName(file.display().to_string()))?;
            let destination = input_dir.join(file_name);
            copy_file(file, &destination).await?;
            debug!("Uploaded `{}` to `{}`", file.display(), destination.display());
            uploaded.push(destination);
        }
        Ok(uploaded)
    }

    /// Resolves the files of every declared input role:
    /// 1. the selected files, relative ones are looked up in the upload directory of the role
    /// 2. all uploaded files of the role
    /// 3. the fallback files, which are copied into the upload directory
    ///
    /// A role without files results in a [SelectionError].
    ///
    /// # Arguments
    /// * `session` - Session
    /// * `workflow` - Workflow
    /// * `parameters` - Workflow parameters with the selection
    ///
    pub async fn resolve_inputs<P: ResultParser, W: Workflow>(
        &self,
        session: &Session<P>,
        workflow: &W,
        parameters: &WorkflowParameters,
    ) -> Result<Result<ResolvedInputs, SelectionError>, PipelineError> {
        let mut resolved = ResolvedInputs::default();
        for declaration in workflow.inputs() {
            let input_dir = Self::input_dir(session, workflow, declaration.role);
            let selection = parameters.selection(declaration.role);

            let mut files: Vec<PathBuf> = if !selection.is_empty() {
                selection
                    .iter()
                    .map(|selected| {
                        let selected = Path::new(selected);
                        if selected.is_absolute() {
                            selected.to_path_buf()
                        } else {
                            input_dir.join(selected)
                        }
                    })
                    .collect()
            } else {
                let uploaded = Self::list_files(&input_dir).await?;
                if uploaded.is_empty() {
                    self.copy_fallback(&input_dir, declaration).await?
                } else {
                    uploaded
                }
            };

            if files.is_empty() {
                return Ok(Err(SelectionError::missing_input(
                    declaration.role,
                    declaration.missing_message,
                )));
            }
            files.sort();
            resolved
                .files
                .insert(declaration.role.to_string(), files);
        }
        Ok(Ok(resolved))
    }

    /// Resolves the inputs and runs the workflow
    ///
    /// # Arguments
    /// * `session` - Session receiving the outputs
    /// * `workflow` - Workflow to run
    /// * `parameters` - Selection and tool parameters
    ///
    pub async fn execute<P: ResultParser, W: Workflow>(
        &self,
        session: &mut Session<P>,
        workflow: &W,
        parameters: &WorkflowParameters,
    ) -> Result<ExecutionOutcome, PipelineError> {
        let inputs = match self.resolve_inputs(session, workflow, parameters).await? {
            Ok(inputs) => inputs,
            Err(err) => {
                info!("{}", err);
                return Ok(ExecutionOutcome::MissingSelection(err));
            }
        };
        info!("Running {}", workflow.name());
        let workflow_dir = Self::workflow_dir(session, workflow);
        let mut context =
            WorkflowContext::new(session, &self.executor, &self.control, workflow_dir, inputs);
        let report = workflow.execute(&mut context, parameters).await?;
        info!(
            "{} finished after {} invocations",
            workflow.name(),
            report.invocations
        );
        Ok(ExecutionOutcome::Completed(report))
    }

    /// Resolves the inputs and collects the outputs of an earlier run
    ///
    /// # Arguments
    /// * `session` - Session receiving the outputs
    /// * `workflow` - Workflow which was run before
    /// * `parameters` - Selection of the earlier run
    ///
    pub async fn pull_results<P: ResultParser, W: Workflow>(
        &self,
        session: &mut Session<P>,
        workflow: &W,
        parameters: &WorkflowParameters,
    ) -> Result<ExecutionOutcome, PipelineError> {
        let inputs = match self.resolve_inputs(session, workflow, parameters).await? {
            Ok(inputs) => inputs,
            Err(err) => return Ok(ExecutionOutcome::MissingSelection(err)),
        };
        let workflow_dir = Self::workflow_dir(session, workflow);
        let mut context =
            WorkflowContext::new(session, &self.executor, &self.control, workflow_dir, inputs);
        let report = workflow.pull_results(&mut context, parameters).await?;
        Ok(ExecutionOutcome::Completed(report))
    }

    async fn copy_fallback(
        &self,
        input_dir: &Path,
        declaration: &InputDeclaration,
    ) -> Result<Vec<PathBuf>, PipelineError> {
        let mut files = Vec::new();
        for fallback in declaration.fallback {
            let source = self.example_data_dir.join(fallback);
            if !source.is_file() {
                continue;
            }
            Self::ensure_dir(input_dir).await?;
            let destination = input_dir.join(fallback);
            copy_file(&source, &destination).await?;
            info!("Using fallback `{}` for `{}`", fallback, declaration.role);
            files.push(destination);
        }
        Ok(files)
    }

    async fn list_files(dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut entries = read_dir(dir)
            .await
            .map_err(|err| PipelineError::DirectoryListingError(dir.display().to_string(), err))?;
        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|err| PipelineError::DirectoryListingError(dir.display().to_string(), err))?
        {
            let path = entry.path();
            let is_partial = entry.file_name().to_string_lossy().starts_with('.');
            if path.is_file() && !is_partial {
                files.push(path);
            }
        }
        Ok(files)
    }

    async fn ensure_dir(dir: &Path) -> Result<(), PipelineError> {
        create_dir_all(dir)
            .await
            .map_err(|err| PipelineError::DirectoryCreationError(dir.display().to_string(), err))
    }
}
