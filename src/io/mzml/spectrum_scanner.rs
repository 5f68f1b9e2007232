// std imports
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

// 3rd party imports
use anyhow::{Context, Result};
use dihardts_omicstools::proteomics::io::mzml::{
    elements::{has_cv_params::HasCvParams, is_list::IsList, spectrum::Spectrum},
    indexer::Indexer,
    reader::Reader as MzmlReader,
};
use polars::prelude::*;

/// Accession of the scan start time
const SCAN_START_TIME_ACCESSION: &str = "MS:1000016";

/// Accession of the selected ion m/z of a precursor
const SELECTED_ION_MZ_ACCESSION: &str = "MS:1000744";

/// Unit accession for minutes
const MINUTE_UNIT_ACCESSION: &str = "UO:0000031";

/// Metadata of a single spectrum.
/// The peak arrays are only decoded to count the peaks.
///
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumRecord {
    pub index: i64,
    pub native_id: String,
    pub ms_level: Option<i64>,
    /// Retention time in seconds
    pub retention_time: Option<f64>,
    pub peak_count: i64,
    pub precursor_mz: Option<f64>,
    /// User parameters by name
    pub user_params: HashMap<String, String>,
}

/// Reads the spectrum metadata of mzML files
///
pub struct SpectrumScanner;

impl SpectrumScanner {
    /// Indexes the given mzML file and reads its spectra in order of appearance
    ///
    /// # Arguments
    /// * `mzml_file_path` - Path to the mzML file
    ///
    pub fn read(mzml_file_path: &Path) -> Result<Vec<SpectrumRecord>> {
        let open = || -> Result<BufReader<File>> {
            Ok(BufReader::new(File::open(mzml_file_path).context(
                format!("Error when opening `{}`", mzml_file_path.display()),
            )?))
        };

        let index = Indexer::create_index(&mut open()?, None)
            .context(format!("Error when indexing `{}`", mzml_file_path.display()))?;

        let mut mzml_bytes_reader = open()?;
        let mut mzml_file = MzmlReader::read_pre_indexed(&mut mzml_bytes_reader, index, None, false)
            .context(format!("Error when reading `{}`", mzml_file_path.display()))?;

        let mut offsets = mzml_file
            .get_index()
            .get_spectra()
            .iter()
            .map(|(spectrum_id, offset)| (spectrum_id.clone(), *offset))
            .collect::<Vec<_>>();
        offsets.sort_by_key(|(_, offset)| *offset);

        let mut records = Vec::with_capacity(offsets.len());
        for (index, (native_id, _)) in offsets.into_iter().enumerate() {
            let spectrum = mzml_file.get_spectrum(&native_id).context(format!(
                "Error when reading spectrum `{}` of `{}`",
                native_id,
                mzml_file_path.display()
            ))?;
            records.push(Self::to_record(index as i64, native_id, &spectrum)?);
        }
        Ok(records)
    }

    /// Converts the records into a dataframe with the columns
    /// `index`, `native_id`, `ms_level`, `retention_time`, `peak_count`, `precursor_mz`
    /// and one column per given user parameter name.
    ///
    /// # Arguments
    /// * `records` - Scanned spectra
    /// * `user_params` - Names of user parameters to add as columns
    ///
    pub fn to_dataframe(records: &[SpectrumRecord], user_params: &[&str]) -> Result<DataFrame> {
        let mut columns = vec![
            Series::new(
                "index",
                records.iter().map(|record| record.index).collect::<Vec<i64>>(),
            ),
            Series::new(
                "native_id",
                records
                    .iter()
                    .map(|record| record.native_id.as_str())
                    .collect::<Vec<&str>>(),
            ),
            Series::new(
                "ms_level",
                records
                    .iter()
                    .map(|record| record.ms_level)
                    .collect::<Vec<Option<i64>>>(),
            ),
            Series::new(
                "retention_time",
                records
                    .iter()
                    .map(|record| record.retention_time)
                    .collect::<Vec<Option<f64>>>(),
            ),
            Series::new(
                "peak_count",
                records
                    .iter()
                    .map(|record| record.peak_count)
                    .collect::<Vec<i64>>(),
            ),
            Series::new(
                "precursor_mz",
                records
                    .iter()
                    .map(|record| record.precursor_mz)
                    .collect::<Vec<Option<f64>>>(),
            ),
        ];
        for user_param in user_params {
            columns.push(Series::new(
                user_param,
                records
                    .iter()
                    .map(|record| record.user_params.get(*user_param).map(|value| value.as_str()))
                    .collect::<Vec<Option<&str>>>(),
            ));
        }
        Ok(DataFrame::new(columns)?)
    }

    fn to_record(index: i64, native_id: String, spectrum: &Spectrum) -> Result<SpectrumRecord> {
        let peak_count = spectrum
            .binary_data_array_list
            .get_mz_array()
            .context(format!("Spectrum `{}` has no m/z array", native_id))?
            .deflate_data()
            .context(format!("Error when decoding the m/z array of `{}`", native_id))?
            .len() as i64;

        let retention_time = match Some(&spectrum.scan_list) {
            Some(scan_list) => scan_list.scans.iter().find_map(|scan| {
                scan.get_cv_param(SCAN_START_TIME_ACCESSION)
                    .first()
                    .and_then(|param| {
                        let factor = match param.unit_accession.as_deref() {
                            Some(MINUTE_UNIT_ACCESSION) => 60.0,
                            _ => 1.0,
                        };
                        param.value.parse::<f64>().ok().map(|time| time * factor)
                    })
            }),
            None => None,
        };

        // only the first precursor is kept
        let precursor_mz = match spectrum.precursor_list.as_ref() {
            Some(precursor_list) => precursor_list
                .iter()
                .filter_map(|precursor| precursor.selected_ion_list.as_ref())
                .flat_map(|ions| ions.iter())
                .find_map(|ion| {
                    ion.get_cv_param(SELECTED_ION_MZ_ACCESSION)
                        .first()
                        .and_then(|param| param.value.parse::<f64>().ok())
                }),
            None => None,
        };

        let user_params = spectrum
            .user_params
            .iter()
            .map(|param| (param.name.clone(), param.value.clone()))
            .collect();

        Ok(SpectrumRecord {
            index,
            native_id,
            ms_level: spectrum.get_ms_level().map(i64::from),
            retention_time,
            peak_count,
            precursor_mz,
            user_params,
        })
    }
}
