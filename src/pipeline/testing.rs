use std::{collections::HashSet, sync::Mutex};

use crate::errors::execution_error::ExecutionError;

use super::executor::{CustomInvocation, ExecutionControl, ToolExecutor, ToolInvocation};

/// Executor for tests. Records every invocation and writes every file bound to an `out*` role
/// unless the role is skipped. Fails for inputs with the given file names.
///
#[derive(Default)]
pub struct RecordingExecutor {
    failing_inputs: HashSet<String>,
    skipped_outputs: HashSet<String>,
    tools: Mutex<Vec<ToolInvocation>>,
    custom: Mutex<Vec<CustomInvocation>>,
}

impl RecordingExecutor {
    pub fn failing_for(file_names: &[&str]) -> Self {
        Self {
            failing_inputs: file_names.iter().map(|name| name.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn skipping_outputs(roles: &[&str]) -> Self {
        Self {
            skipped_outputs: roles.iter().map(|role| role.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn invocations(&self) -> Vec<ToolInvocation> {
        self.tools.lock().unwrap().clone()
    }

    pub fn custom_invocations(&self) -> Vec<CustomInvocation> {
        self.custom.lock().unwrap().clone()
    }
}

impl ToolExecutor for RecordingExecutor {
    async fn run_tool(
        &self,
        invocation: &ToolInvocation,
        _control: &ExecutionControl,
    ) -> Result<(), ExecutionError> {
        self.tools.lock().unwrap().push(invocation.clone());

        let failing = invocation.files_of("in").iter().any(|input| {
            input
                .file_name()
                .is_some_and(|name| self.failing_inputs.contains(name.to_string_lossy().as_ref()))
        });
        if failing {
            return Err(ExecutionError::ToolFailed {
                tool: invocation.tool.clone(),
                status: "exit status: 1".to_string(),
                stderr: "broken input".to_string(),
            });
        }

        for (role, files) in invocation.files.iter() {
            if !role.starts_with("out") || self.skipped_outputs.contains(role) {
                continue;
            }
            for file in files {
                std::fs::write(file, format!("{} {}", invocation.tool, role)).map_err(|err| {
                    ExecutionError::ToolFailed {
                        tool: invocation.tool.clone(),
                        status: "exit status: 1".to_string(),
                        stderr: err.to_string(),
                    }
                })?;
            }
        }
        Ok(())
    }

    async fn run_custom(
        &self,
        invocation: &CustomInvocation,
        _control: &ExecutionControl,
    ) -> Result<(), ExecutionError> {
        self.custom.lock().unwrap().push(invocation.clone());
        Ok(())
    }
}
