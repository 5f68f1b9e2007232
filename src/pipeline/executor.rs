// std imports
use std::{
    future::Future,
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

// 3rd party imports
use metrics::counter;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use uuid::Uuid;

// internal imports
use crate::{
    configuration::{ToolConfiguration, ToolParameters},
    constants::{TOOL_FAILURES_COUNTER, TOOL_INVOCATIONS_COUNTER},
    errors::execution_error::ExecutionError,
};

/// Files bound to the input and output roles of a tool, in declaration order
///
pub type RoleBindings = Vec<(String, Vec<PathBuf>)>;

/// Invocation of an external tool
///
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub tool: String,
    pub files: RoleBindings,
    pub parameters: ToolParameters,
}

impl ToolInvocation {
    pub fn new(tool: &str) -> Self {
        Self {
            tool: tool.to_string(),
            files: Vec::new(),
            parameters: ToolParameters::new(),
        }
    }

    /// Binds the files to the role
    ///
    pub fn with_files(mut self, role: &str, files: Vec<PathBuf>) -> Self {
        self.files.push((role.to_string(), files));
        self
    }

    /// Binds a single file to the role
    ///
    pub fn with_file(self, role: &str, file: &Path) -> Self {
        self.with_files(role, vec![file.to_path_buf()])
    }

    pub fn with_parameters(mut self, parameters: ToolParameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// Files bound to the role
    ///
    pub fn files_of(&self, role: &str) -> &[PathBuf] {
        self.files
            .iter()
            .find(|(bound_role, _)| bound_role == role)
            .map(|(_, files)| files.as_slice())
            .unwrap_or(&[])
    }
}

/// Invocation of a custom step which only receives parameters
///
#[derive(Debug, Clone, PartialEq)]
pub struct CustomInvocation {
    pub step: String,
    pub files: RoleBindings,
    pub parameters: ToolParameters,
}

impl CustomInvocation {
    pub fn new(step: &str, parameters: ToolParameters) -> Self {
        Self {
            step: step.to_string(),
            files: Vec::new(),
            parameters,
        }
    }

    pub fn with_files(mut self, role: &str, files: Vec<PathBuf>) -> Self {
        self.files.push((role.to_string(), files));
        self
    }
}

/// Limits of a single invocation
///
#[derive(Debug, Clone, Default)]
pub struct ExecutionControl {
    /// Maximum runtime, unlimited if `None`
    pub timeout: Option<Duration>,
    /// Cancels the running invocation when triggered
    pub cancellation: CancellationToken,
}

impl ExecutionControl {
    pub fn new(timeout: Option<Duration>, cancellation: CancellationToken) -> Self {
        Self {
            timeout,
            cancellation,
        }
    }
}

/// Runs external tools. Invocations either complete or fail, nothing is retried.
///
pub trait ToolExecutor: Send + Sync {
    /// Runs the tool and waits for it to finish
    ///
    /// # Arguments
    /// * `invocation` - Tool, files and parameters
    /// * `control` - Timeout and cancellation
    ///
    fn run_tool(
        &self,
        invocation: &ToolInvocation,
        control: &ExecutionControl,
    ) -> impl Future<Output = Result<(), ExecutionError>> + Send;

    /// Runs a custom step and waits for it to finish
    ///
    /// # Arguments
    /// * `invocation` - Step and parameters
    /// * `control` - Timeout and cancellation
    ///
    fn run_custom(
        &self,
        invocation: &CustomInvocation,
        control: &ExecutionControl,
    ) -> impl Future<Output = Result<(), ExecutionError>> + Send;
}

/// Executes TOPP tools and python scripts as child processes.
/// TOPP tools receive `-role file...` and `-parameter value`,
/// python scripts a JSON file with files and parameters.
///
pub struct ProcessToolExecutor {
    topp_dir: Option<PathBuf>,
    python: PathBuf,
    python_tools_dir: PathBuf,
}

impl ProcessToolExecutor {
    pub fn new(topp_dir: Option<PathBuf>, python: PathBuf, python_tools_dir: PathBuf) -> Self {
        Self {
            topp_dir,
            python,
            python_tools_dir,
        }
    }

    pub fn from_config(config: &ToolConfiguration) -> Self {
        Self::new(
            config.topp_dir.clone(),
            config.python.clone(),
            config.python_tools_dir.clone(),
        )
    }

    /// Command line arguments of a TOPP tool invocation
    ///
    /// # Arguments
    /// * `invocation` - Tool invocation
    ///
    pub fn topp_arguments(invocation: &ToolInvocation) -> Vec<String> {
        let mut args = Vec::new();
        for (role, files) in invocation.files.iter() {
            args.push(format!("-{}", role));
            args.extend(files.iter().map(|file| file.to_string_lossy().to_string()));
        }
        for (name, value) in invocation.parameters.iter() {
            match value {
                toml::Value::Boolean(true) => args.push(format!("-{}", name)),
                toml::Value::Boolean(false) => {}
                toml::Value::Array(values) => {
                    args.push(format!("-{}", name));
                    args.extend(values.iter().map(Self::plain_value));
                }
                value => {
                    args.push(format!("-{}", name));
                    args.push(Self::plain_value(value));
                }
            }
        }
        args
    }

    /// JSON document handed to custom steps, containing files and parameters
    ///
    /// # Arguments
    /// * `invocation` - Custom step invocation
    ///
    pub fn custom_parameters(
        invocation: &CustomInvocation,
    ) -> Result<serde_json::Value, ExecutionError> {
        let mut document = serde_json::Map::new();
        for (name, value) in invocation.parameters.iter() {
            document.insert(
                name.clone(),
                serde_json::to_value(value).map_err(|err| {
                    ExecutionError::ParameterSerializationError(invocation.step.clone(), err)
                })?,
            );
        }
        for (role, files) in invocation.files.iter() {
            document.insert(
                role.clone(),
                serde_json::Value::Array(
                    files
                        .iter()
                        .map(|file| serde_json::Value::String(file.to_string_lossy().to_string()))
                        .collect(),
                ),
            );
        }
        Ok(serde_json::Value::Object(document))
    }

    fn plain_value(value: &toml::Value) -> String {
        match value {
            toml::Value::String(value) => value.clone(),
            value => value.to_string(),
        }
    }

    fn tool_path(&self, tool: &str) -> PathBuf {
        match &self.topp_dir {
            Some(topp_dir) => topp_dir.join(tool),
            None => PathBuf::from(tool),
        }
    }

    /// Runs the command until it finishes, times out or is cancelled.
    /// The child is killed when it does not finish.
    ///
    async fn run_command(
        name: &str,
        mut command: Command,
        control: &ExecutionControl,
    ) -> Result<(), ExecutionError> {
        command
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        counter!(TOOL_INVOCATIONS_COUNTER).increment(1);
        let result = Self::wait_for_command(name, command, control).await;
        if let Err(err) = &result {
            counter!(TOOL_FAILURES_COUNTER).increment(1);
            error!("{}", err);
        }
        result
    }

    async fn wait_for_command(
        name: &str,
        mut command: Command,
        control: &ExecutionControl,
    ) -> Result<(), ExecutionError> {
        let child = command
            .spawn()
            .map_err(|err| ExecutionError::SpawnError(name.to_string(), err))?;
        let output = child.wait_with_output();

        let finished = async {
            let output = match control.timeout {
                Some(timeout) => match tokio::time::timeout(timeout, output).await {
                    Ok(output) => output,
                    Err(_) => return Err(ExecutionError::Timeout(name.to_string(), timeout)),
                },
                None => output.await,
            };
            output.map_err(|err| ExecutionError::SpawnError(name.to_string(), err))
        };

        let output = tokio::select! {
            biased;
            _ = control.cancellation.cancelled() => {
                return Err(ExecutionError::Cancelled(name.to_string()));
            }
            output = finished => output?,
        };

        debug!("{}", String::from_utf8_lossy(&output.stdout));
        if !output.status.success() {
            return Err(ExecutionError::ToolFailed {
                tool: name.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }
        Ok(())
    }
}

impl ToolExecutor for ProcessToolExecutor {
    async fn run_tool(
        &self,
        invocation: &ToolInvocation,
        control: &ExecutionControl,
    ) -> Result<(), ExecutionError> {
        let args = Self::topp_arguments(invocation);
        info!("Running {} {}", invocation.tool, args.join(" "));
        let mut command = Command::new(self.tool_path(&invocation.tool));
        command.args(&args);
        Self::run_command(&invocation.tool, command, control).await
    }

    async fn run_custom(
        &self,
        invocation: &CustomInvocation,
        control: &ExecutionControl,
    ) -> Result<(), ExecutionError> {
        let document = Self::custom_parameters(invocation)?;
        let parameter_file =
            std::env::temp_dir().join(format!("{}-{}.json", invocation.step, Uuid::new_v4()));
        let content = serde_json::to_vec_pretty(&document).map_err(|err| {
            ExecutionError::ParameterSerializationError(invocation.step.clone(), err)
        })?;
        tokio::fs::write(&parameter_file, content)
            .await
            .map_err(|err| ExecutionError::ParameterFileError(invocation.step.clone(), err))?;

        let script = self
            .python_tools_dir
            .join(format!("{}.py", invocation.step));
        info!(
            "Running {} {} {}",
            self.python.display(),
            script.display(),
            parameter_file.display()
        );
        let mut command = Command::new(&self.python);
        command.arg(&script).arg(&parameter_file);
        let result = Self::run_command(&invocation.step, command, control).await;

        if let Err(err) = tokio::fs::remove_file(&parameter_file).await {
            debug!(
                "Unable to remove `{}`: {}",
                parameter_file.display(),
                err
            );
        }
        result
    }
}
