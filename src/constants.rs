/// Extension of spectra files written by FLASHDeconv
///
pub const SPECTRA_FILE_EXTENSION: &str = "mzML";

/// Extension of tag and protein result files
///
pub const TSV_FILE_EXTENSION: &str = "tsv";

/// Extension of protein database files
///
pub const FASTA_FILE_EXTENSION: &str = "fasta";

/// Separator used in FLASHTagger TSV files
///
pub const TSV_SEPARATOR: &str = "\t";

/// Directory (below the workspace root) holding one folder per FLASHDeconv run
///
pub const DECONVOLUTION_OUTPUT_DIR: &str = "FLASHDeconvOutput";

/// Name of the archive bundling the outputs of a FLASHDeconv run
///
pub const OUTPUT_BUNDLE_NAME: &str = "output.zip";

/// Directory (below a workflow directory) for uploaded workflow inputs
///
pub const WORKFLOW_INPUT_DIR: &str = "input-files";

/// Directory (below a workflow directory) for workflow results
///
pub const WORKFLOW_RESULTS_DIR: &str = "results";

/// Name of the user parameter in annotated mzML files carrying the calibration values
///
pub const DECONV_MASS_INFO: &str = "DeconvMassInfo";

/// Metric counter names
///
pub const TOOL_INVOCATIONS_COUNTER: &str = "flashpipe_tool_invocations";
pub const TOOL_FAILURES_COUNTER: &str = "flashpipe_tool_failures";
pub const PARSED_EXPERIMENTS_COUNTER: &str = "flashpipe_parsed_experiments";
pub const STORED_FILES_COUNTER: &str = "flashpipe_stored_files";
