// std imports
use std::collections::HashMap;

// 3rd party imports
use anyhow::{bail, Context, Result};
use tracing::debug;

// internal imports
use crate::{
    constants::DECONV_MASS_INFO,
    io::{flash_tsv::FlashTsv, mzml::spectrum_scanner::SpectrumScanner},
};

use super::parser::{Calibration, ExperimentPaths, ParsedExperiment, ResultParser};

/// Reads FLASHDeconv spectra and FLASHTagger result files.
/// Only the spectrum metadata is kept, peak arrays are not decoded.
///
#[derive(Debug, Clone, Copy, Default)]
pub struct FlashResultParser;

impl FlashResultParser {
    /// Parses the value of the `DeconvMassInfo` user parameter,
    /// e.g. `tol=10;massoffset=0.000000;chargemass=1.007276;peaks=3`
    ///
    /// # Arguments
    /// * `mass_info` - Value of the user parameter
    ///
    pub fn parse_mass_info(mass_info: &str) -> Result<Calibration> {
        let values: HashMap<&str, &str> = mass_info
            .split(';')
            .filter_map(|pair| pair.split_once('='))
            .map(|(key, value)| (key.trim(), value.trim()))
            .collect();

        let value = |key: &str| -> Result<f64> {
            match values.get(key) {
                Some(value) => value
                    .parse::<f64>()
                    .context(format!("Invalid `{}` in `{}`", key, mass_info)),
                None => bail!("`{}` is missing in `{}`", key, mass_info),
            }
        };

        Ok(Calibration {
            tolerance: value("tol")?,
            mass_offset: value("massoffset")?,
            charge_mass: value("chargemass")?,
        })
    }
}

impl ResultParser for FlashResultParser {
    fn parse(&self, paths: &ExperimentPaths) -> Result<ParsedExperiment> {
        let annotated = SpectrumScanner::read(&paths.annotated)?;
        let calibration = match annotated
            .iter()
            .find_map(|spectrum| spectrum.user_params.get(DECONV_MASS_INFO))
        {
            Some(mass_info) => Self::parse_mass_info(mass_info)?,
            None => bail!(
                "No `{}` found in `{}`",
                DECONV_MASS_INFO,
                paths.annotated.display()
            ),
        };
        let annotations = SpectrumScanner::to_dataframe(&annotated, &[DECONV_MASS_INFO])?;

        let deconvolved = SpectrumScanner::read(&paths.deconvolved)?;
        let spectra = SpectrumScanner::to_dataframe(&deconvolved, &[])?;

        let tags = FlashTsv::read_or_empty(&paths.tags)?;
        let proteins = FlashTsv::read_or_empty(&paths.proteins)?;

        debug!(
            "Parsed {} deconvolved spectra, {} annotated spectra, {} tags and {} proteins",
            spectra.height(),
            annotations.height(),
            tags.height(),
            proteins.height()
        );

        Ok(ParsedExperiment {
            spectra,
            annotations,
            calibration,
            tags,
            proteins,
        })
    }
}
