// std imports
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

// 3rd party imports
use metrics::counter;
use tokio::sync::watch;
use tracing::{debug, info, warn};

// internal imports
use crate::{
    constants::{PARSED_EXPERIMENTS_COUNTER, SPECTRA_FILE_EXTENSION},
    errors::parse_error::ParseError,
    validation::pairing::{align, AlignedRecord, PairingStrategy},
    workspace::Category,
};

use super::{
    cache::{ParseCache, ParsedTable},
    parser::{ExperimentPaths, ResultParser},
};

/// Observable progress of the incremental parser
///
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ParseStatus {
    /// No batch is running
    #[default]
    Idle,
    Parsing {
        experiment: String,
    },
    Parsed {
        experiment: String,
    },
}

/// Result of a parse pass which did not fail
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// No new files in any category
    NothingToParse,
    /// The new files do not form complete experiments, nothing was parsed.
    /// Contains all new files in the order deconvolved, annotated, tags, proteins.
    Unpaired(Vec<String>),
    /// Experiments which were parsed and annotated files which were skipped
    Parsed {
        experiments: Vec<String>,
        skipped: Vec<String>,
    },
}

/// Parses files which are not cached yet
///
pub struct IncrementalParser<P: ResultParser> {
    parser: P,
    strategy: PairingStrategy,
    progress: watch::Sender<ParseStatus>,
}

impl<P: ResultParser> IncrementalParser<P> {
    /// Creates a new incremental parser
    ///
    /// # Arguments
    /// * `parser` - Parser for a single experiment
    /// * `strategy` - How new files are grouped into experiments
    ///
    pub fn new(parser: P, strategy: PairingStrategy) -> Self {
        let (progress, _) = watch::channel(ParseStatus::Idle);
        Self {
            parser,
            strategy,
            progress,
        }
    }

    pub fn parser(&self) -> &P {
        &self.parser
    }

    /// Receiver for the progress of the running batch
    ///
    pub fn subscribe(&self) -> watch::Receiver<ParseStatus> {
        self.progress.subscribe()
    }

    /// Parses every experiment with files missing in the cache, or all files if forced.
    ///
    /// # Arguments
    /// * `root` - Workspace root
    /// * `file_lists` - Tracked file names per category
    /// * `cache` - Cache receiving the parsed tables
    /// * `force` - Reparse all tracked files
    ///
    pub fn parse_delta(
        &self,
        root: &Path,
        file_lists: &HashMap<Category, Vec<String>>,
        cache: &mut ParseCache,
        force: bool,
    ) -> Result<ParseOutcome, ParseError> {
        let deltas = Category::REQUIRED.map(|category| {
            file_lists
                .get(&category)
                .map(|files| {
                    files
                        .iter()
                        .filter(|file| force || !cache.contains(category, file))
                        .cloned()
                        .collect::<Vec<String>>()
                })
                .unwrap_or_default()
        });

        if deltas.iter().all(|delta| delta.is_empty()) {
            debug!("No new files to parse");
            return Ok(ParseOutcome::NothingToParse);
        }

        let tag_count = deltas[2].len();
        if deltas.iter().any(|delta| delta.len() != tag_count) {
            let unpaired: Vec<String> = deltas.into_iter().flatten().collect();
            warn!(
                "Added files are not in pair, so not parsed: {}",
                unpaired.join(", ")
            );
            return Ok(ParseOutcome::Unpaired(unpaired));
        }

        let records = match align(
            [&deltas[0], &deltas[1], &deltas[2], &deltas[3]],
            self.strategy,
        ) {
            Ok(records) => records,
            Err(unmatched) => {
                warn!(
                    "Added files have no counterparts, so not parsed: {}",
                    unmatched.join(", ")
                );
                return Ok(ParseOutcome::Unpaired(unmatched));
            }
        };

        let mut experiments = Vec::with_capacity(records.len());
        let mut skipped = Vec::new();
        let result = self.parse_records(root, records, cache, &mut experiments, &mut skipped);
        self.report(ParseStatus::Idle);
        result?;

        Ok(ParseOutcome::Parsed {
            experiments,
            skipped,
        })
    }

    /// Parses the records in order and stops at the first failure.
    /// Records parsed before the failure stay cached.
    ///
    fn parse_records(
        &self,
        root: &Path,
        records: Vec<AlignedRecord>,
        cache: &mut ParseCache,
        experiments: &mut Vec<String>,
        skipped: &mut Vec<String>,
    ) -> Result<(), ParseError> {
        for record in records {
            if !record
                .annotated
                .ends_with(&format!(".{}", SPECTRA_FILE_EXTENSION))
            {
                debug!("Skipping `{}`, not a spectra file", record.annotated);
                skipped.push(record.annotated);
                continue;
            }
            let experiment = record.experiment_name().to_string();
            self.report(ParseStatus::Parsing {
                experiment: experiment.clone(),
            });
            info!("Parsing the experiment {}...", experiment);

            let paths = ExperimentPaths {
                annotated: Self::file_path(root, Category::AnnotatedSpectra, &record.annotated),
                deconvolved: Self::file_path(
                    root,
                    Category::DeconvolvedSpectra,
                    &record.deconvolved,
                ),
                tags: Self::file_path(root, Category::TagResults, &record.tags),
                proteins: Self::file_path(root, Category::ProteinResults, &record.proteins),
            };
            let parsed =
                self.parser
                    .parse(&paths)
                    .map_err(|cause| ParseError::ExperimentParsingError {
                        experiment: experiment.clone(),
                        file_name: record.annotated.clone(),
                        cause,
                    })?;

            cache.insert(
                Category::AnnotatedSpectra,
                record.annotated,
                ParsedTable::with_calibration(parsed.annotations, parsed.calibration),
            );
            cache.insert(
                Category::DeconvolvedSpectra,
                record.deconvolved,
                ParsedTable::new(parsed.spectra),
            );
            cache.insert(
                Category::TagResults,
                record.tags,
                ParsedTable::new(parsed.tags),
            );
            cache.insert(
                Category::ProteinResults,
                record.proteins,
                ParsedTable::new(parsed.proteins),
            );

            counter!(PARSED_EXPERIMENTS_COUNTER).increment(1);
            info!("Done parsing the experiment {}!", experiment);
            self.report(ParseStatus::Parsed {
                experiment: experiment.clone(),
            });
            experiments.push(experiment);
        }
        Ok(())
    }

    fn report(&self, status: ParseStatus) {
        debug!("Parse status: {:?}", status);
        self.progress.send_replace(status);
    }

    fn file_path(root: &Path, category: Category, file_name: &str) -> PathBuf {
        root.join(category.dir_name()).join(file_name)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };

    use anyhow::bail;
    use polars::prelude::*;
    use tracing_test::traced_test;

    use super::*;
    use crate::parsing::parser::{Calibration, ParsedExperiment};

    /// Counts invocations, fails for annotated files listed in `failing`.
    /// Records the progress status seen while parsing if a receiver is set.
    ///
    #[derive(Default)]
    struct CountingParser {
        invocations: AtomicUsize,
        failing: Vec<String>,
        parsed: Mutex<Vec<ExperimentPaths>>,
        progress: Mutex<Option<watch::Receiver<ParseStatus>>>,
        observed: Mutex<Vec<ParseStatus>>,
    }

    impl ResultParser for CountingParser {
        fn parse(&self, paths: &ExperimentPaths) -> anyhow::Result<ParsedExperiment> {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            if let Some(progress) = self.progress.lock().unwrap().as_mut() {
                self.observed
                    .lock()
                    .unwrap()
                    .push(progress.borrow_and_update().clone());
            }
            let annotated = paths
                .annotated
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_default();
            if self.failing.contains(&annotated) {
                bail!("broken file");
            }
            self.parsed.lock().unwrap().push(paths.clone());
            Ok(ParsedExperiment {
                spectra: df!("index" => [0i64]).unwrap(),
                annotations: df!("index" => [0i64]).unwrap(),
                calibration: Calibration {
                    tolerance: 10.0,
                    mass_offset: 0.0,
                    charge_mass: 1.007276,
                },
                tags: DataFrame::empty(),
                proteins: DataFrame::empty(),
            })
        }
    }

    fn file_lists(bases: &[&str]) -> HashMap<Category, Vec<String>> {
        Category::REQUIRED
            .iter()
            .map(|category| {
                (
                    *category,
                    bases
                        .iter()
                        .map(|base| category.file_name_for(base))
                        .collect(),
                )
            })
            .collect()
    }

    fn parser(failing: &[&str]) -> IncrementalParser<CountingParser> {
        IncrementalParser::new(
            CountingParser {
                failing: failing.iter().map(|name| name.to_string()).collect(),
                ..Default::default()
            },
            PairingStrategy::Positional,
        )
    }

    fn invocations(parser: &IncrementalParser<CountingParser>) -> usize {
        parser.parser().invocations.load(Ordering::SeqCst)
    }

    #[test]
    fn test_second_pass_parses_nothing() {
        let parser = parser(&[]);
        let mut cache = ParseCache::new();
        let lists = file_lists(&["a", "b"]);

        let outcome = parser
            .parse_delta(Path::new("/ws"), &lists, &mut cache, false)
            .unwrap();
        assert_eq!(
            outcome,
            ParseOutcome::Parsed {
                experiments: vec!["a".to_string(), "b".to_string()],
                skipped: vec![]
            }
        );
        assert_eq!(invocations(&parser), 2);

        let outcome = parser
            .parse_delta(Path::new("/ws"), &lists, &mut cache, false)
            .unwrap();
        assert_eq!(outcome, ParseOutcome::NothingToParse);
        assert_eq!(invocations(&parser), 2);
    }

    #[test]
    fn test_only_new_experiments_are_parsed() {
        let parser = parser(&[]);
        let mut cache = ParseCache::new();
        parser
            .parse_delta(Path::new("/ws"), &file_lists(&["a"]), &mut cache, false)
            .unwrap();
        parser
            .parse_delta(Path::new("/ws"), &file_lists(&["a", "b"]), &mut cache, false)
            .unwrap();

        assert_eq!(invocations(&parser), 2);
        let parsed = parser.parser().parsed.lock().unwrap();
        assert_eq!(
            parsed[1].tags,
            Path::new("/ws/tags-tsv/b_tagged.tsv").to_path_buf()
        );
    }

    #[test]
    fn test_forced_reparse_overwrites_every_entry() {
        let parser = parser(&[]);
        let mut cache = ParseCache::new();
        let lists = file_lists(&["a", "b"]);
        parser
            .parse_delta(Path::new("/ws"), &lists, &mut cache, false)
            .unwrap();
        parser
            .parse_delta(Path::new("/ws"), &lists, &mut cache, true)
            .unwrap();

        assert_eq!(invocations(&parser), 4);
        for category in Category::REQUIRED {
            assert_eq!(cache.len(category), 2);
        }
    }

    #[test]
    #[traced_test]
    fn test_unequal_deltas_leave_cache_untouched() {
        let parser = parser(&[]);
        let mut cache = ParseCache::new();
        let mut lists = file_lists(&["a"]);
        lists
            .get_mut(&Category::DeconvolvedSpectra)
            .unwrap()
            .push("b_deconv.mzML".to_string());

        let outcome = parser
            .parse_delta(Path::new("/ws"), &lists, &mut cache, false)
            .unwrap();
        assert_eq!(
            outcome,
            ParseOutcome::Unpaired(vec![
                "a_deconv.mzML".to_string(),
                "b_deconv.mzML".to_string(),
                "a_annotated.mzML".to_string(),
                "a_tagged.tsv".to_string(),
                "a_protein.tsv".to_string(),
            ])
        );
        assert_eq!(invocations(&parser), 0);
        assert!(cache.is_empty());
        assert!(logs_contain("Added files are not in pair"));
    }

    #[test]
    fn test_failure_keeps_earlier_records() {
        let parser = parser(&["b_annotated.mzML"]);
        let mut cache = ParseCache::new();
        let mut progress = parser.subscribe();

        let err = parser
            .parse_delta(
                Path::new("/ws"),
                &file_lists(&["a", "b", "c"]),
                &mut cache,
                false,
            )
            .unwrap_err();

        match err {
            ParseError::ExperimentParsingError { file_name, .. } => {
                assert_eq!(file_name, "b_annotated.mzML")
            }
        }
        assert_eq!(invocations(&parser), 2);
        assert!(cache.contains(Category::AnnotatedSpectra, "a_annotated.mzML"));
        assert!(!cache.contains(Category::AnnotatedSpectra, "b_annotated.mzML"));
        assert!(!cache.contains(Category::AnnotatedSpectra, "c_annotated.mzML"));
        assert_eq!(*progress.borrow_and_update(), ParseStatus::Idle);
    }

    #[test]
    #[traced_test]
    fn test_progress_follows_each_experiment() {
        let parser = parser(&[]);
        let mut cache = ParseCache::new();
        *parser.parser().progress.lock().unwrap() = Some(parser.subscribe());
        let mut progress = parser.subscribe();

        parser
            .parse_delta(Path::new("/ws"), &file_lists(&["a", "b"]), &mut cache, false)
            .unwrap();

        assert_eq!(
            *parser.parser().observed.lock().unwrap(),
            [
                ParseStatus::Parsing {
                    experiment: "a".to_string()
                },
                ParseStatus::Parsing {
                    experiment: "b".to_string()
                },
            ]
        );
        for experiment in ["a", "b"] {
            assert!(logs_contain(&format!(
                "Parse status: Parsing {{ experiment: \"{}\" }}",
                experiment
            )));
            assert!(logs_contain(&format!(
                "Parse status: Parsed {{ experiment: \"{}\" }}",
                experiment
            )));
        }
        assert!(progress.has_changed().unwrap());
        assert_eq!(*progress.borrow_and_update(), ParseStatus::Idle);
    }

    #[test]
    fn test_non_spectra_annotated_files_are_skipped() {
        let parser = parser(&[]);
        let mut cache = ParseCache::new();
        let mut lists = file_lists(&["a"]);
        lists.insert(
            Category::AnnotatedSpectra,
            vec!["a_annotated.mzML.gz".to_string()],
        );

        let outcome = parser
            .parse_delta(Path::new("/ws"), &lists, &mut cache, false)
            .unwrap();
        assert_eq!(
            outcome,
            ParseOutcome::Parsed {
                experiments: vec![],
                skipped: vec!["a_annotated.mzML.gz".to_string()]
            }
        );
        assert_eq!(invocations(&parser), 0);
    }

    #[test]
    fn test_calibration_is_cached_with_annotations() {
        let parser = parser(&[]);
        let mut cache = ParseCache::new();
        parser
            .parse_delta(Path::new("/ws"), &file_lists(&["a"]), &mut cache, false)
            .unwrap();
        let annotated = cache
            .get(Category::AnnotatedSpectra, "a_annotated.mzML")
            .unwrap();
        assert_eq!(annotated.calibration.unwrap().tolerance, 10.0);
        assert!(cache
            .get(Category::DeconvolvedSpectra, "a_deconv.mzML")
            .unwrap()
            .calibration
            .is_none());
    }
}
