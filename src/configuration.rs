use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};

use crate::validation::pairing::PairingStrategy;

/// Parameters of a single tool, forwarded as `-name value`
///
pub type ToolParameters = BTreeMap<String, toml::Value>;

/// Workspace configuration
///
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
pub struct WorkspaceConfiguration {
    /// Directory containing one workspace per session
    pub base_dir: PathBuf,
    /// Directory with example files and workflow fallbacks
    pub example_data_dir: PathBuf,
}

impl Default for WorkspaceConfiguration {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("workspaces"),
            example_data_dir: PathBuf::from("example-data"),
        }
    }
}

/// External tool configuration
///
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
pub struct ToolConfiguration {
    /// Directory of the TOPP binaries, tools are looked up in `PATH` if not set
    pub topp_dir: Option<PathBuf>,
    /// Python interpreter for custom steps
    pub python: PathBuf,
    /// Directory with the python scripts of custom steps
    pub python_tools_dir: PathBuf,
    /// Maximum runtime of a single invocation in seconds, unlimited if not set
    pub timeout: Option<u64>,
}

impl ToolConfiguration {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }
}

impl Default for ToolConfiguration {
    fn default() -> Self {
        Self {
            topp_dir: None,
            python: PathBuf::from("python3"),
            python_tools_dir: PathBuf::from("python-tools"),
            timeout: None,
        }
    }
}

/// Parsing configuration
///
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Default)]
pub struct ParsingConfiguration {
    /// How files are grouped into experiments
    pub pairing_strategy: PairingStrategy,
}

/// Configuration for flashpipe
///
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Default)]
pub struct FlashpipeConfiguration {
    pub workspace: WorkspaceConfiguration,
    pub tools: ToolConfiguration,
    pub parsing: ParsingConfiguration,
}

impl FlashpipeConfiguration {
    /// Create a new default configuration
    ///
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the TOML file
    ///
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Error when reading `{}`", path.display()))?;
        toml::from_str(&content).context(format!("Error when parsing `{}`", path.display()))
    }
}

/// Selected inputs and tool parameters of a workflow run
///
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Default, PartialEq)]
pub struct WorkflowParameters {
    /// Selected files per input role
    #[serde(default)]
    pub selection: HashMap<String, Vec<String>>,
    /// Switches controlling optional steps
    #[serde(default)]
    pub flags: HashMap<String, bool>,
    /// Parameters per tool
    #[serde(default)]
    pub tools: HashMap<String, ToolParameters>,
    /// Parameters per custom step
    #[serde(default)]
    pub custom: HashMap<String, ToolParameters>,
}

impl WorkflowParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the parameters from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the TOML file
    ///
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Error when reading `{}`", path.display()))?;
        toml::from_str(&content).context(format!("Error when parsing `{}`", path.display()))
    }

    /// Selected files of the role, empty if nothing was selected
    ///
    pub fn selection(&self, role: &str) -> &[String] {
        self.selection
            .get(role)
            .map(|files| files.as_slice())
            .unwrap_or(&[])
    }

    /// Flag value, `false` if not set
    ///
    pub fn flag(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    /// Parameters of the tool without the excluded ones
    ///
    /// # Arguments
    /// * `tool` - Tool name
    /// * `excluded` - Parameters which must not be forwarded
    ///
    pub fn tool_parameters(&self, tool: &str, excluded: &[&str]) -> ToolParameters {
        self.tools
            .get(tool)
            .map(|parameters| {
                parameters
                    .iter()
                    .filter(|(name, _)| !excluded.contains(&name.as_str()))
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Parameters of a custom step
    ///
    pub fn custom_parameters(&self, step: &str) -> ToolParameters {
        self.custom.get(step).cloned().unwrap_or_default()
    }
}
