use std::{fmt, str::FromStr};

use crate::constants::{FASTA_FILE_EXTENSION, SPECTRA_FILE_EXTENSION, TSV_FILE_EXTENSION};

/// Kind of file tracked by the workspace.
/// Each category owns one directory below the workspace root and is recognised by its file suffix.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    DeconvolvedSpectra,
    AnnotatedSpectra,
    TagResults,
    ProteinResults,
    Database,
}

impl Category {
    /// Categories which have to be present for an experiment to be parsed,
    /// in the order deconvolved, annotated, tags, proteins
    ///
    pub const REQUIRED: [Category; 4] = [
        Category::DeconvolvedSpectra,
        Category::AnnotatedSpectra,
        Category::TagResults,
        Category::ProteinResults,
    ];

    /// All categories including the optional protein database
    ///
    pub const ALL: [Category; 5] = [
        Category::DeconvolvedSpectra,
        Category::AnnotatedSpectra,
        Category::TagResults,
        Category::ProteinResults,
        Category::Database,
    ];

    /// Directory name below the workspace root
    ///
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::DeconvolvedSpectra => "deconv-mzMLs",
            Self::AnnotatedSpectra => "anno-mzMLs",
            Self::TagResults => "tags-tsv",
            Self::ProteinResults => "proteins-tsv",
            Self::Database => "db-fasta",
        }
    }

    /// Suffix of the file stem, e.g. `_deconv`
    ///
    pub fn stem_suffix(&self) -> &'static str {
        match self {
            Self::DeconvolvedSpectra => "_deconv",
            Self::AnnotatedSpectra => "_annotated",
            Self::TagResults => "_tagged",
            Self::ProteinResults => "_protein",
            Self::Database => "_db",
        }
    }

    /// File extension without the leading dot
    ///
    pub fn extension(&self) -> &'static str {
        match self {
            Self::DeconvolvedSpectra | Self::AnnotatedSpectra => SPECTRA_FILE_EXTENSION,
            Self::TagResults | Self::ProteinResults => TSV_FILE_EXTENSION,
            Self::Database => FASTA_FILE_EXTENSION,
        }
    }

    /// Complete file suffix, e.g. `_deconv.mzML`
    ///
    pub fn file_suffix(&self) -> String {
        format!("{}.{}", self.stem_suffix(), self.extension())
    }

    /// File name for the given base name, e.g. `sample` -> `sample_deconv.mzML`
    ///
    /// # Arguments
    /// * `base_name` - File name without category suffix and extension
    ///
    pub fn file_name_for(&self, base_name: &str) -> String {
        format!("{}{}", base_name, self.file_suffix())
    }

    /// Infers the category from the file name suffix
    ///
    /// # Arguments
    /// * `file_name` - Plain file name
    ///
    pub fn from_file_name(file_name: &str) -> Option<Category> {
        Self::ALL
            .into_iter()
            .find(|category| file_name.ends_with(&category.file_suffix()))
    }

    /// Experiment key of a file, which is the file name without the category suffix,
    /// e.g. `sample_deconv.mzML` -> `sample`.
    /// Returns `None` if the file does not carry this category's suffix.
    ///
    /// # Arguments
    /// * `file_name` - Plain file name
    ///
    pub fn experiment_key<'a>(&self, file_name: &'a str) -> Option<&'a str> {
        file_name.strip_suffix(self.file_suffix().as_str())
    }

    /// Message shown when no file of this category was added
    ///
    pub fn missing_message(&self) -> &'static str {
        match self {
            Self::DeconvolvedSpectra => "FLASHDeconv deconvolved mzML file is not added yet!",
            Self::AnnotatedSpectra => "FLASHDeconv annotated mzML file is not added yet!",
            Self::TagResults => "FLASHTagger tag file is not added yet!",
            Self::ProteinResults => "FLASHTagger protein file is not added yet!",
            Self::Database => "Protein database file is not added yet!",
        }
    }

    /// Column header when listing files of this category
    ///
    pub fn column_name(&self) -> &'static str {
        match self {
            Self::DeconvolvedSpectra => "Deconvolved Files",
            Self::AnnotatedSpectra => "Annotated Files",
            Self::TagResults => "Tag Files",
            Self::ProteinResults => "Protein Files",
            Self::Database => "DB Files",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.dir_name())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deconv-mzMLs" | "deconvolved" => Ok(Self::DeconvolvedSpectra),
            "anno-mzMLs" | "annotated" => Ok(Self::AnnotatedSpectra),
            "tags-tsv" | "tags" => Ok(Self::TagResults),
            "proteins-tsv" | "proteins" => Ok(Self::ProteinResults),
            "db-fasta" | "database" => Ok(Self::Database),
            _ => Err(format!("Unknown category `{}`", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_file_name() {
        assert_eq!(
            Category::from_file_name("sample_deconv.mzML"),
            Some(Category::DeconvolvedSpectra)
        );
        assert_eq!(
            Category::from_file_name("sample_annotated.mzML"),
            Some(Category::AnnotatedSpectra)
        );
        assert_eq!(
            Category::from_file_name("sample_tagged.tsv"),
            Some(Category::TagResults)
        );
        assert_eq!(
            Category::from_file_name("sample_protein.tsv"),
            Some(Category::ProteinResults)
        );
        assert_eq!(
            Category::from_file_name("sample_db.fasta"),
            Some(Category::Database)
        );
        assert_eq!(Category::from_file_name("sample.mzML"), None);
        assert_eq!(Category::from_file_name("sample_deconv.tsv"), None);
    }

    #[test]
    fn test_experiment_key() {
        assert_eq!(
            Category::TagResults.experiment_key("run_01_tagged.tsv"),
            Some("run_01")
        );
        assert_eq!(Category::TagResults.experiment_key("run_01_protein.tsv"), None);
    }

    #[test]
    fn test_category_round_trips_through_dir_name() {
        for category in Category::ALL {
            assert_eq!(category.dir_name().parse::<Category>(), Ok(category));
        }
        assert!("unknown".parse::<Category>().is_err());
    }
}
