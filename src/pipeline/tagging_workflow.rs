// std imports
use std::path::{Path, PathBuf};

// 3rd party imports
use tokio::fs::create_dir_all;
use tracing::{debug, info, warn};

// internal imports
use crate::{
    configuration::WorkflowParameters,
    constants::WORKFLOW_RESULTS_DIR,
    errors::pipeline_error::PipelineError,
    parsing::parser::ResultParser,
    workspace::Category,
};

use super::{
    executor::{ToolExecutor, ToolInvocation},
    stage::{base_name, copy_file},
    workflow::{ExecutionReport, InputDeclaration, Workflow, WorkflowContext},
};

const DECONVOLUTION_TOOL: &str = "FLASHDeconv";

const TAGGING_TOOL: &str = "FLASHTagger";

const SPECTRA_ROLE: &str = "mzML-files";

const DATABASE_ROLE: &str = "fasta-file";

const INPUTS: &[InputDeclaration] = &[
    InputDeclaration {
        role: SPECTRA_ROLE,
        missing_message: "Please select at least one mzML file.",
        fallback: &["example_spectrum_1.mzML", "example_spectrum_2.mzML"],
    },
    InputDeclaration {
        role: DATABASE_ROLE,
        missing_message: "Please select a database.",
        fallback: &["example_database.fasta"],
    },
];

/// Files of one input in the workspace categories
///
struct ExperimentOutputs {
    database: PathBuf,
    annotated: PathBuf,
    deconvolved: PathBuf,
    tags: PathBuf,
    proteins: PathBuf,
}

impl ExperimentOutputs {
    fn new(root: &Path, base: &str) -> Self {
        let path = |category: Category| {
            root.join(category.dir_name())
                .join(category.file_name_for(base))
        };
        Self {
            database: path(Category::Database),
            annotated: path(Category::AnnotatedSpectra),
            deconvolved: path(Category::DeconvolvedSpectra),
            tags: path(Category::TagResults),
            proteins: path(Category::ProteinResults),
        }
    }

    /// Outputs which are parsed afterwards
    ///
    fn parsed(&self) -> [&PathBuf; 4] {
        [&self.annotated, &self.deconvolved, &self.tags, &self.proteins]
    }
}

/// Runs FLASHDeconv followed by FLASHTagger on each selected spectra file.
/// The database is copied per input, all outputs land in the workspace categories
/// and are parsed right away.
///
#[derive(Debug, Clone, Copy, Default)]
pub struct TaggingWorkflow;

impl TaggingWorkflow {
    /// Places the files into the workspace and reparses everything.
    /// Files which were not written are skipped.
    ///
    async fn ingest<E: ToolExecutor, P: ResultParser>(
        context: &mut WorkflowContext<'_, E, P>,
        files: Vec<PathBuf>,
        report: &mut ExecutionReport,
    ) -> Result<(), PipelineError> {
        context
            .session
            .store_mut()
            .ensure_category_directories(&Category::REQUIRED)
            .await?;
        let (files, missing): (Vec<PathBuf>, Vec<PathBuf>) =
            files.into_iter().partition(|file| file.is_file());
        for file in missing.iter() {
            warn!("`{}` was not produced, skipped", file.display());
        }
        for file in files.iter() {
            report
                .stored
                .push(context.session.store_mut().ingest_file(file).await?);
        }
        report.produced.extend(files);
        report.parse_outcome = Some(context.session.parse_delta(true)?);
        Ok(())
    }
}

impl Workflow for TaggingWorkflow {
    fn name(&self) -> &'static str {
        "flashtagger"
    }

    fn inputs(&self) -> &'static [InputDeclaration] {
        INPUTS
    }

    fn excluded_parameters(&self, tool: &str) -> &'static [&'static str] {
        match tool {
            DECONVOLUTION_TOOL => &[
                "max_tag_count",
                "min_length",
                "max_length",
                "flanking_mass_tol",
                "max_iso_error_count",
                "min_matched_aa",
                "fdr",
                "keep_decoy",
                "ida_log",
                "write_detail",
                "report_FDR",
                "quant_method",
            ],
            TAGGING_TOOL => &[
                "min_mz",
                "max_mz",
                "min_rt",
                "max_rt",
                "max_ms_level",
                "use_RNA_averagine",
                "tol",
                "min_mass",
                "max_mass",
                "min_charge",
                "max_charge",
                "precursor_charge",
                "precursor_mz",
                "min_cos",
                "min_snr",
            ],
            _ => &[],
        }
    }

    async fn execute<E: ToolExecutor, P: ResultParser>(
        &self,
        context: &mut WorkflowContext<'_, E, P>,
        parameters: &WorkflowParameters,
    ) -> Result<ExecutionReport, PipelineError> {
        let inputs = context.inputs.files(SPECTRA_ROLE).to_vec();
        let database = match context.inputs.files(DATABASE_ROLE).first() {
            Some(database) => database.clone(),
            None => return Ok(ExecutionReport::default()),
        };

        context
            .session
            .store_mut()
            .ensure_category_directories(&Category::ALL)
            .await?;
        let scratch_dir = context.workflow_dir.join(WORKFLOW_RESULTS_DIR);
        create_dir_all(&scratch_dir).await.map_err(|err| {
            PipelineError::DirectoryCreationError(scratch_dir.display().to_string(), err)
        })?;

        let mut produced = Vec::new();
        for input in inputs {
            let base = base_name(&input)?;
            let outputs = ExperimentOutputs::new(context.root(), &base);

            copy_file(&database, &outputs.database).await?;

            context
                .run_tool(
                    ToolInvocation::new(DECONVOLUTION_TOOL)
                        .with_file("in", &input)
                        .with_file("out", &scratch_dir.join(format!("{}.tsv", base)))
                        .with_file("out_annotated_mzml", &outputs.annotated)
                        .with_file("out_mzml", &outputs.deconvolved)
                        .with_parameters(self.tool_parameters(parameters, DECONVOLUTION_TOOL)),
                )
                .await?;

            context
                .run_tool(
                    ToolInvocation::new(TAGGING_TOOL)
                        .with_file("in", &outputs.deconvolved)
                        .with_file("fasta", &outputs.database)
                        .with_file("out_tag", &outputs.tags)
                        .with_file("out_protein", &outputs.proteins)
                        .with_parameters(self.tool_parameters(parameters, TAGGING_TOOL)),
                )
                .await?;

            info!("Tagged {}", base);
            produced.push(outputs.database.clone());
            produced.extend(outputs.parsed().into_iter().cloned());
        }

        let mut report = ExecutionReport::default();
        Self::ingest(context, produced, &mut report).await?;
        report.invocations = context.invocations();
        Ok(report)
    }

    async fn pull_results<E: ToolExecutor, P: ResultParser>(
        &self,
        context: &mut WorkflowContext<'_, E, P>,
        _parameters: &WorkflowParameters,
    ) -> Result<ExecutionReport, PipelineError> {
        let mut existing = Vec::new();
        for input in context.inputs.files(SPECTRA_ROLE).to_vec() {
            let base = base_name(&input)?;
            let outputs = ExperimentOutputs::new(context.root(), &base);
            if !outputs.tags.exists() {
                debug!("No results for {}", base);
                continue;
            }
            existing.extend(outputs.parsed().into_iter().cloned());
        }

        let mut report = ExecutionReport::default();
        Self::ingest(context, existing, &mut report).await?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;
    use crate::{
        errors::execution_error::ExecutionError,
        parsing::{
            incremental::ParseOutcome,
            parser::{Calibration, ExperimentPaths, ParsedExperiment},
        },
        pipeline::{
            executor::ExecutionControl,
            testing::RecordingExecutor,
            workflow::{ExecutionOutcome, WorkflowRunner},
        },
        session::Session,
        validation::pairing::PairingStrategy,
    };
    use polars::prelude::DataFrame;

    /// Parser accepting anything, the recorded outputs are no valid mzML
    ///
    struct AcceptingParser;

    impl ResultParser for AcceptingParser {
        fn parse(&self, _paths: &ExperimentPaths) -> anyhow::Result<ParsedExperiment> {
            Ok(ParsedExperiment {
                spectra: DataFrame::empty(),
                annotations: DataFrame::empty(),
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

    fn parameters(inputs: &[&Path], database: &Path) -> WorkflowParameters {
        let mut parameters = WorkflowParameters::new();
        parameters.selection.insert(
            SPECTRA_ROLE.to_string(),
            inputs
                .iter()
                .map(|input| input.to_string_lossy().to_string())
                .collect(),
        );
        parameters.selection.insert(
            DATABASE_ROLE.to_string(),
            vec![database.to_string_lossy().to_string()],
        );
        parameters
    }

    struct Fixture {
        _upload_dir: tempfile::TempDir,
        inputs: Vec<PathBuf>,
        database: PathBuf,
    }

    fn fixture() -> Fixture {
        let upload_dir = tempdir().unwrap();
        let inputs: Vec<PathBuf> = ["a.mzML", "b.mzML"]
            .iter()
            .map(|name| upload_dir.path().join(name))
            .collect();
        for input in inputs.iter() {
            fs::write(input, "<mzML/>").unwrap();
        }
        let database = upload_dir.path().join("human.fasta");
        fs::write(&database, ">P1\nPEPTIDE\n").unwrap();
        Fixture {
            _upload_dir: upload_dir,
            inputs,
            database,
        }
    }

    #[tokio::test]
    async fn test_stages_are_chained_and_outputs_parsed() {
        let dir = tempdir().unwrap();
        let fixture = fixture();
        let mut session = Session::create(dir.path(), AcceptingParser, PairingStrategy::default())
            .await
            .unwrap();
        let runner = WorkflowRunner::new(
            RecordingExecutor::default(),
            ExecutionControl::default(),
            PathBuf::from("example-data"),
        );
        let inputs: Vec<&Path> = fixture.inputs.iter().map(|input| input.as_path()).collect();

        let outcome = runner
            .execute(
                &mut session,
                &TaggingWorkflow,
                &parameters(&inputs, &fixture.database),
            )
            .await
            .unwrap();
        let report = match outcome {
            ExecutionOutcome::Completed(report) => report,
            _ => panic!("workflow should run"),
        };

        assert_eq!(report.invocations, 4);
        let invocations = runner.executor().invocations();
        assert_eq!(invocations[0].tool, "FLASHDeconv");
        assert_eq!(invocations[1].tool, "FLASHTagger");
        assert_eq!(
            invocations[1].files_of("in"),
            invocations[0].files_of("out_mzml")
        );
        let database = session
            .store()
            .category_dir(Category::Database)
            .join("a_db.fasta");
        assert_eq!(invocations[1].files_of("fasta"), [database.clone()]);
        assert_eq!(fs::read_to_string(&database).unwrap(), ">P1\nPEPTIDE\n");

        for category in Category::ALL {
            assert_eq!(session.store().file_list(category).len(), 2);
        }
        assert_eq!(
            report.parse_outcome,
            Some(ParseOutcome::Parsed {
                experiments: vec!["a".to_string(), "b".to_string()],
                skipped: vec![]
            })
        );
        assert_eq!(session.experiment_table().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_outputs_not_written_are_not_tracked() {
        let dir = tempdir().unwrap();
        let fixture = fixture();
        let mut session = Session::create(dir.path(), AcceptingParser, PairingStrategy::default())
            .await
            .unwrap();
        let runner = WorkflowRunner::new(
            RecordingExecutor::skipping_outputs(&["out_protein"]),
            ExecutionControl::default(),
            PathBuf::from("example-data"),
        );
        let inputs: Vec<&Path> = vec![fixture.inputs[0].as_path()];

        let outcome = runner
            .execute(
                &mut session,
                &TaggingWorkflow,
                &parameters(&inputs, &fixture.database),
            )
            .await
            .unwrap();
        let report = match outcome {
            ExecutionOutcome::Completed(report) => report,
            _ => panic!("workflow should run"),
        };

        assert!(session.store().file_list(Category::ProteinResults).is_empty());
        assert_eq!(session.store().file_list(Category::TagResults), ["a_tagged.tsv"]);
        for category in Category::ALL {
            for file_name in session.store().file_list(category) {
                assert!(session
                    .store()
                    .category_dir(category)
                    .join(file_name)
                    .is_file());
            }
        }
        assert!(report
            .produced
            .iter()
            .all(|file| !file.ends_with("a_protein.tsv")));
        assert!(matches!(
            report.parse_outcome,
            Some(ParseOutcome::Unpaired(_))
        ));
        assert!(session.cache().is_empty());
    }

    #[tokio::test]
    async fn test_failing_first_input_halts_second() {
        let dir = tempdir().unwrap();
        let fixture = fixture();
        let mut session = Session::create(dir.path(), AcceptingParser, PairingStrategy::default())
            .await
            .unwrap();
        let runner = WorkflowRunner::new(
            RecordingExecutor::failing_for(&["a.mzML"]),
            ExecutionControl::default(),
            PathBuf::from("example-data"),
        );
        let inputs: Vec<&Path> = fixture.inputs.iter().map(|input| input.as_path()).collect();

        let result = runner
            .execute(
                &mut session,
                &TaggingWorkflow,
                &parameters(&inputs, &fixture.database),
            )
            .await;
        assert!(matches!(
            result,
            Err(PipelineError::ExecutionError(ExecutionError::ToolFailed { .. }))
        ));

        assert_eq!(runner.executor().invocations().len(), 1);
        let root = session.root();
        for category in Category::REQUIRED {
            assert!(!root
                .join(category.dir_name())
                .join(category.file_name_for("b"))
                .exists());
        }
        assert!(session.cache().is_empty());
    }

    #[tokio::test]
    async fn test_missing_database() {
        let dir = tempdir().unwrap();
        let fixture = fixture();
        let mut session = Session::create(dir.path(), AcceptingParser, PairingStrategy::default())
            .await
            .unwrap();
        let runner = WorkflowRunner::new(
            RecordingExecutor::default(),
            ExecutionControl::default(),
            PathBuf::from("does-not-exist"),
        );
        let mut parameters = WorkflowParameters::new();
        parameters.selection.insert(
            SPECTRA_ROLE.to_string(),
            vec![fixture.inputs[0].to_string_lossy().to_string()],
        );

        let outcome = runner
            .execute(&mut session, &TaggingWorkflow, &parameters)
            .await
            .unwrap();
        match outcome {
            ExecutionOutcome::MissingSelection(err) => {
                assert_eq!(err.to_string(), "Please select a database.")
            }
            _ => panic!("workflow should not run"),
        }
        assert!(runner.executor().invocations().is_empty());
    }

    #[tokio::test]
    async fn test_pull_results_only_takes_tagged_inputs() {
        let dir = tempdir().unwrap();
        let fixture = fixture();
        let mut session = Session::create(dir.path(), AcceptingParser, PairingStrategy::default())
            .await
            .unwrap();
        let root = session.root().to_path_buf();
        for category in Category::REQUIRED {
            fs::write(
                root.join(category.dir_name())
                    .join(category.file_name_for("a")),
                "",
            )
            .unwrap();
        }
        // `b` was never tagged
        fs::write(
            root.join(Category::AnnotatedSpectra.dir_name())
                .join(Category::AnnotatedSpectra.file_name_for("b")),
            "",
        )
        .unwrap();

        let runner = WorkflowRunner::new(
            RecordingExecutor::default(),
            ExecutionControl::default(),
            PathBuf::from("example-data"),
        );
        let inputs: Vec<&Path> = fixture.inputs.iter().map(|input| input.as_path()).collect();
        let outcome = runner
            .pull_results(
                &mut session,
                &TaggingWorkflow,
                &parameters(&inputs, &fixture.database),
            )
            .await
            .unwrap();
        let report = match outcome {
            ExecutionOutcome::Completed(report) => report,
            _ => panic!("results should be pulled"),
        };

        assert_eq!(report.produced.len(), 4);
        assert!(runner.executor().invocations().is_empty());
        assert_eq!(session.cache().len(Category::TagResults), 1);
    }
}
