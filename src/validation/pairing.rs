use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::workspace::Category;

/// How files of the required categories are associated to experiments
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingStrategy {
    /// Sort each category and pair by position.
    /// Equal counts are checked beforehand, the names are not compared.
    #[default]
    Positional,
    /// Pair by the file name without the category suffix, e.g. `sample_deconv.mzML` -> `sample`.
    /// Files without counterparts in every required category are reported.
    ExperimentKey,
}

/// One file of each required category belonging to the same experiment
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignedRecord {
    pub deconvolved: String,
    pub annotated: String,
    pub tags: String,
    pub proteins: String,
}

impl AlignedRecord {
    /// Experiment name derived from the annotated file
    ///
    pub fn experiment_name(&self) -> &str {
        experiment_name(&self.annotated)
    }
}

/// Experiment name of an annotated file, which is everything before the last underscore.
/// A name without underscore is used as it is.
///
/// # Arguments
/// * `annotated_file_name` - File name of the annotated spectra
///
pub fn experiment_name(annotated_file_name: &str) -> &str {
    match annotated_file_name.rfind('_') {
        Some(idx) => &annotated_file_name[..idx],
        None => annotated_file_name,
    }
}

/// Aligns the files of the required categories into records.
/// Returns the file names which could not be paired when using [PairingStrategy::ExperimentKey].
///
/// # Arguments
/// * `files` - File names in the order of [Category::REQUIRED]
/// * `strategy` - Pairing strategy
///
pub fn align(
    files: [&[String]; 4],
    strategy: PairingStrategy,
) -> Result<Vec<AlignedRecord>, Vec<String>> {
    match strategy {
        PairingStrategy::Positional => Ok(align_by_position(files)),
        PairingStrategy::ExperimentKey => align_by_experiment_key(files),
    }
}

fn align_by_position(files: [&[String]; 4]) -> Vec<AlignedRecord> {
    let [deconvolved, annotated, tags, proteins] = files.map(|category_files| {
        let mut sorted = category_files.to_vec();
        sorted.sort();
        sorted
    });

    annotated
        .into_iter()
        .zip(deconvolved)
        .zip(tags)
        .zip(proteins)
        .map(|(((annotated, deconvolved), tags), proteins)| AlignedRecord {
            deconvolved,
            annotated,
            tags,
            proteins,
        })
        .collect()
}

fn align_by_experiment_key(files: [&[String]; 4]) -> Result<Vec<AlignedRecord>, Vec<String>> {
    let mut experiments: BTreeMap<String, [Option<String>; 4]> = BTreeMap::new();
    let mut unmatched: Vec<String> = Vec::new();

    for (category_idx, (category, category_files)) in
        Category::REQUIRED.iter().zip(files).enumerate()
    {
        for file_name in category_files {
            let key = category
                .experiment_key(file_name)
                .unwrap_or_else(|| experiment_name(file_name))
                .to_string();
            let slot = &mut experiments.entry(key).or_default()[category_idx];
            if slot.is_some() {
                unmatched.push(file_name.clone());
            } else {
                *slot = Some(file_name.clone());
            }
        }
    }

    let mut records = Vec::with_capacity(experiments.len());
    for (_, slots) in experiments {
        match slots {
            [Some(deconvolved), Some(annotated), Some(tags), Some(proteins)] => {
                records.push(AlignedRecord {
                    deconvolved,
                    annotated,
                    tags,
                    proteins,
                })
            }
            partial => unmatched.extend(partial.into_iter().flatten()),
        }
    }

    if !unmatched.is_empty() {
        unmatched.sort();
        return Err(unmatched);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn test_experiment_name() {
        assert_eq!(experiment_name("sample_annotated.mzML"), "sample");
        assert_eq!(experiment_name("run_01_annotated.mzML"), "run_01");
        assert_eq!(experiment_name("plain.mzML"), "plain.mzML");
    }

    #[test]
    fn test_positional_alignment_sorts_each_category() {
        let deconvolved = names(&["b_deconv.mzML", "a_deconv.mzML"]);
        let annotated = names(&["b_annotated.mzML", "a_annotated.mzML"]);
        let tags = names(&["b_tagged.tsv", "a_tagged.tsv"]);
        let proteins = names(&["a_protein.tsv", "b_protein.tsv"]);

        let records = align(
            [&deconvolved, &annotated, &tags, &proteins],
            PairingStrategy::Positional,
        )
        .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].annotated, "a_annotated.mzML");
        assert_eq!(records[0].deconvolved, "a_deconv.mzML");
        assert_eq!(records[1].proteins, "b_protein.tsv");
    }

    #[test]
    fn test_positional_alignment_ignores_names() {
        let deconvolved = names(&["x_deconv.mzML"]);
        let annotated = names(&["y_annotated.mzML"]);
        let tags = names(&["z_tagged.tsv"]);
        let proteins = names(&["w_protein.tsv"]);

        let records = align(
            [&deconvolved, &annotated, &tags, &proteins],
            PairingStrategy::Positional,
        )
        .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].experiment_name(), "y");
    }

    #[test]
    fn test_key_alignment_reports_unmatched_files() {
        let deconvolved = names(&["a_deconv.mzML", "b_deconv.mzML"]);
        let annotated = names(&["a_annotated.mzML", "c_annotated.mzML"]);
        let tags = names(&["a_tagged.tsv", "b_tagged.tsv"]);
        let proteins = names(&["a_protein.tsv", "b_protein.tsv"]);

        let unmatched = align(
            [&deconvolved, &annotated, &tags, &proteins],
            PairingStrategy::ExperimentKey,
        )
        .unwrap_err();
        assert_eq!(
            unmatched,
            names(&[
                "b_deconv.mzML",
                "b_protein.tsv",
                "b_tagged.tsv",
                "c_annotated.mzML"
            ])
        );
    }

    #[test]
    fn test_key_alignment_pairs_by_stem() {
        let deconvolved = names(&["b_deconv.mzML", "a_deconv.mzML"]);
        let annotated = names(&["a_annotated.mzML", "b_annotated.mzML"]);
        let tags = names(&["a_tagged.tsv", "b_tagged.tsv"]);
        let proteins = names(&["b_protein.tsv", "a_protein.tsv"]);

        let records = align(
            [&deconvolved, &annotated, &tags, &proteins],
            PairingStrategy::ExperimentKey,
        )
        .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].deconvolved, "b_deconv.mzML");
        assert_eq!(records[1].proteins, "b_protein.tsv");
    }
}
