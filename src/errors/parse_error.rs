use thiserror::Error;

/// Failure while parsing an experiment. Aborts the remaining batch.
///
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Unable to parse experiment `{experiment}` (annotated file `{file_name}`):\n\t{cause}")]
    ExperimentParsingError {
        experiment: String,
        file_name: String,
        cause: anyhow::Error,
    },
}
