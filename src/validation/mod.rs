/// Association of files to experiments
pub mod pairing;
/// Completeness checks of the uploaded file sets
pub mod validator;

pub use pairing::{AlignedRecord, PairingStrategy};
pub use validator::{ExperimentRow, ExperimentTable, FilePairValidator};
