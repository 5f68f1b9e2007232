/// Zip bundles of run outputs
pub mod archive;
/// FLASHDeconv on selected spectra files
pub mod deconvolution_workflow;
/// Execution of external tools and custom python steps
pub mod executor;
/// Feature detection template workflow
pub mod feature_workflow;
/// Output naming and file placement shared by the workflows
pub mod stage;
/// FLASHDeconv followed by FLASHTagger, feeding the workspace
pub mod tagging_workflow;
/// Workflow trait, input resolution and the sequential runner
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;
