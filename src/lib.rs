// Include readme in doc
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/Readme.md"))]

/// Configuration of flashpipe and workflow parameters
pub mod configuration;
/// Shared constants
pub mod constants;
/// Errors of the different modules
pub mod errors;
/// Readers for result files
pub mod io;
/// Incremental parsing of the workspace files
pub mod parsing;
/// Workflows of external tools
pub mod pipeline;
/// Session bundling workspace, parse cache and validation
pub mod session;
/// Validation and pairing of the uploaded files
pub mod validation;
/// Workspace directories and file tracking
pub mod workspace;
