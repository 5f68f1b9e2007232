/// Cache of the parsed tables
pub mod cache;
/// Default parser for FLASHDeconv and FLASHTagger results
pub mod flash_parser;
/// Parsing of newly added files
pub mod incremental;
/// Collaborator interface for parsing a single experiment
pub mod parser;

pub use cache::{ParseCache, ParsedTable};
pub use flash_parser::FlashResultParser;
pub use incremental::{IncrementalParser, ParseOutcome, ParseStatus};
pub use parser::{Calibration, ExperimentPaths, ParsedExperiment, ResultParser};
