// std imports
use std::path::PathBuf;

// 3rd party imports
use anyhow::Result;
use polars::prelude::*;

/// Absolute paths of the four files of one experiment
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentPaths {
    pub annotated: PathBuf,
    pub deconvolved: PathBuf,
    pub tags: PathBuf,
    pub proteins: PathBuf,
}

/// Scalars FLASHDeconv used for the deconvolution of an experiment
///
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// Mass tolerance in ppm
    pub tolerance: f64,
    pub mass_offset: f64,
    /// Mass of the charge carrier
    pub charge_mass: f64,
}

/// Tables of one parsed experiment
///
#[derive(Debug, Clone)]
pub struct ParsedExperiment {
    /// Deconvolved spectra
    pub spectra: DataFrame,
    /// Annotated spectra
    pub annotations: DataFrame,
    pub calibration: Calibration,
    pub tags: DataFrame,
    pub proteins: DataFrame,
}

/// Turns the files of one experiment into tables.
///
pub trait ResultParser: Send + Sync {
    /// Parses the given experiment.
    ///
    /// # Arguments
    /// * `paths` - Files of the experiment
    ///
    fn parse(&self, paths: &ExperimentPaths) -> Result<ParsedExperiment>;
}
