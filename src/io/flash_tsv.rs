// std imports
use std::path::Path;

// 3rd party imports
use anyhow::{bail, Context, Result};
use polars::prelude::*;

// internal imports
use crate::constants::TSV_SEPARATOR;

/// Reader for the tab separated tag and protein files written by FLASHTagger
///
pub struct FlashTsv;

impl FlashTsv {
    /// Reads a FLASHTagger TSV file into a dataframe.
    /// Returns `None` if the file has no content at all.
    ///
    /// # Arguments
    /// * `tsv_file_path` - Path to the TSV file
    ///
    pub fn read(tsv_file_path: &Path) -> Result<Option<DataFrame>> {
        let reader = match CsvReadOptions::default()
            .with_parse_options(
                CsvParseOptions::default().with_separator(TSV_SEPARATOR.as_bytes()[0]),
            )
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(tsv_file_path.to_path_buf()))
        {
            Ok(reader) => reader,
            Err(err) => {
                return Self::handle_polars_error(err).context(format!(
                    "Error when opening `{}` for reading",
                    tsv_file_path.display()
                ));
            }
        };

        match reader.finish() {
            Ok(df) => Ok(Some(df)),
            Err(err) => Self::handle_polars_error(err).context(format!(
                "Error when parsing `{}` to dataframe",
                tsv_file_path.display()
            )),
        }
    }

    /// Same as [FlashTsv::read] but returns an empty dataframe for files without content
    ///
    /// # Arguments
    /// * `tsv_file_path` - Path to the TSV file
    ///
    pub fn read_or_empty(tsv_file_path: &Path) -> Result<DataFrame> {
        Ok(Self::read(tsv_file_path)?.unwrap_or_else(DataFrame::empty))
    }

    fn handle_polars_error(error: PolarsError) -> Result<Option<DataFrame>> {
        match error {
            PolarsError::NoData(_) => Ok(None),
            _ => bail!(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_read_tag_file() {
        let df = FlashTsv::read(Path::new("test_files/sample_tagged.tsv"))
            .unwrap()
            .unwrap();
        assert_eq!(df.height(), 3);
        assert!(df.get_column_names().contains(&"TagSequence"));
    }

    #[test]
    fn test_read_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty_protein.tsv");
        fs::write(&path, "").unwrap();

        assert!(FlashTsv::read(&path).unwrap().is_none());
        assert_eq!(FlashTsv::read_or_empty(&path).unwrap().height(), 0);
    }

    #[test]
    fn test_read_missing_file() {
        assert!(FlashTsv::read(Path::new("test_files/does_not_exist.tsv")).is_err());
    }
}
