/// Errors related to archiving run outputs
pub mod archive_error;
/// Errors of external tool invocations
pub mod execution_error;
/// Errors parsing experiments into tables
pub mod parse_error;
/// Errors shared by the workflows
pub mod pipeline_error;
/// Errors when required workflow inputs are not selected
pub mod selection_error;
/// Errors validating the uploaded file sets
pub mod validation_error;
/// Errors related to the workspace directories
pub mod workspace_error;
