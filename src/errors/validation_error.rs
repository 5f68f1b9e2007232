use thiserror::Error;

use crate::workspace::category::Category;

/// Incomplete or mismatching file sets.
/// Recovered by the caller and shown as a message, never mutates state.
///
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{}", .0.missing_message())]
    CategoryMissing(Category),
    #[error("The same number of deconvolved and annotated files should be uploaded!")]
    CountMismatch {
        deconvolved: usize,
        annotated: usize,
        tags: usize,
        proteins: usize,
    },
    #[error("Some files have no counterpart of the same experiment:\n\t{}", .0.join("\n\t"))]
    UnmatchedExperiments(Vec<String>),
}
