use std::{collections::HashMap, path::Path};

use polars::prelude::*;

use crate::{errors::validation_error::ValidationError, workspace::Category};

use super::pairing::{align, PairingStrategy};

/// Row of the experiment overview
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentRow {
    pub experiment_name: String,
    pub deconvolved: String,
    pub annotated: String,
    pub tags: String,
    pub proteins: String,
}

/// Overview of the complete experiments
///
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExperimentTable {
    rows: Vec<ExperimentRow>,
}

impl ExperimentTable {
    pub fn rows(&self) -> &[ExperimentRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Converts the overview into a dataframe for display
    ///
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let mut experiment_names = Vec::with_capacity(self.rows.len());
        let mut deconvolved = Vec::with_capacity(self.rows.len());
        let mut annotated = Vec::with_capacity(self.rows.len());
        let mut tags = Vec::with_capacity(self.rows.len());
        let mut proteins = Vec::with_capacity(self.rows.len());
        for row in self.rows.iter() {
            experiment_names.push(row.experiment_name.as_str());
            deconvolved.push(row.deconvolved.as_str());
            annotated.push(row.annotated.as_str());
            tags.push(row.tags.as_str());
            proteins.push(row.proteins.as_str());
        }
        df!(
            "Experiment Name" => experiment_names,
            Category::DeconvolvedSpectra.column_name() => deconvolved,
            Category::AnnotatedSpectra.column_name() => annotated,
            Category::TagResults.column_name() => tags,
            Category::ProteinResults.column_name() => proteins
        )
    }
}

/// Checks that the required categories form complete experiment sets
///
#[derive(Debug, Clone, Copy, Default)]
pub struct FilePairValidator {
    strategy: PairingStrategy,
}

impl FilePairValidator {
    /// Creates a new validator
    ///
    /// # Arguments
    /// * `strategy` - How files are paired to experiments
    ///
    pub fn new(strategy: PairingStrategy) -> Self {
        Self { strategy }
    }

    /// Validates the given file lists. The first failing rule is reported:
    /// 1. a required category is empty (checked in the order deconvolved, annotated, tags, proteins)
    /// 2. the number of tag files differs from the number of deconvolved, annotated or protein files
    ///
    /// On success, one row per experiment is returned.
    ///
    /// # Arguments
    /// * `file_lists` - File names (or paths) per category, missing categories count as empty
    ///
    pub fn validate(
        &self,
        file_lists: &HashMap<Category, Vec<String>>,
    ) -> Result<ExperimentTable, ValidationError> {
        let [deconvolved, annotated, tags, proteins] =
            Category::REQUIRED.map(|category| Self::file_names(file_lists.get(&category)));

        for (category, files) in Category::REQUIRED
            .iter()
            .zip([&deconvolved, &annotated, &tags, &proteins])
        {
            if files.is_empty() {
                return Err(ValidationError::CategoryMissing(*category));
            }
        }

        if [&deconvolved, &annotated, &proteins]
            .iter()
            .any(|files| files.len() != tags.len())
        {
            return Err(ValidationError::CountMismatch {
                deconvolved: deconvolved.len(),
                annotated: annotated.len(),
                tags: tags.len(),
                proteins: proteins.len(),
            });
        }

        let records = align(
            [&deconvolved, &annotated, &tags, &proteins],
            self.strategy,
        )
        .map_err(ValidationError::UnmatchedExperiments)?;

        Ok(ExperimentTable {
            rows: records
                .into_iter()
                .map(|record| ExperimentRow {
                    experiment_name: record.experiment_name().to_string(),
                    deconvolved: record.deconvolved,
                    annotated: record.annotated,
                    tags: record.tags,
                    proteins: record.proteins,
                })
                .collect(),
        })
    }

    /// Leaves only the file names
    ///
    fn file_names(files: Option<&Vec<String>>) -> Vec<String> {
        files
            .map(|files| {
                files
                    .iter()
                    .map(|file| {
                        Path::new(file)
                            .file_name()
                            .map(|name| name.to_string_lossy().to_string())
                            .unwrap_or_else(|| file.clone())
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}
