// std imports
use std::path::PathBuf;

// 3rd party imports
use tokio::fs::{create_dir_all, remove_dir_all};
use tracing::info;

// internal imports
use crate::{
    configuration::WorkflowParameters,
    constants::{DECONVOLUTION_OUTPUT_DIR, OUTPUT_BUNDLE_NAME},
    errors::pipeline_error::PipelineError,
    parsing::parser::ResultParser,
};

use super::{
    archive::write_bundle,
    executor::{ToolExecutor, ToolInvocation},
    stage::{base_name, OutputSpec},
    workflow::{ExecutionReport, InputDeclaration, Workflow, WorkflowContext},
};

const TOOL: &str = "FLASHDeconv";

const SPECTRA_ROLE: &str = "mzML-files";

const INPUTS: &[InputDeclaration] = &[InputDeclaration {
    role: SPECTRA_ROLE,
    missing_message: "Please select at least one mzML file.",
    fallback: &["example_spectrum_1.mzML", "example_spectrum_2.mzML"],
}];

/// Outputs of FLASHDeconv, written to `FLASHDeconvOutput/{base}/`
///
pub const OUTPUTS: [OutputSpec; 12] = [
    OutputSpec::new("out", "", "tsv"),
    OutputSpec::new("out_spec1", "_spec1", "tsv"),
    OutputSpec::new("out_spec2", "_spec2", "tsv"),
    OutputSpec::new("out_spec3", "_spec3", "tsv"),
    OutputSpec::new("out_spec4", "_spec4", "tsv"),
    OutputSpec::new("out_mzml", "", "mzML"),
    OutputSpec::new("out_quant", "_quant", "tsv"),
    OutputSpec::new("out_annotated_mzml", "_annotated", "mzML"),
    OutputSpec::new("out_msalign1", "_msalign1", "msalign"),
    OutputSpec::new("out_msalign2", "_msalign2", "msalign"),
    OutputSpec::new("out_feature1", "_feature1", "feature"),
    OutputSpec::new("out_feature2", "_feature2", "feature"),
];

/// Runs FLASHDeconv on each selected spectra file and bundles the outputs of each run
/// into one archive. The outputs stay in their run folder and are not added to the workspace.
///
#[derive(Debug, Clone, Copy, Default)]
pub struct DeconvolutionWorkflow;

impl Workflow for DeconvolutionWorkflow {
    fn name(&self) -> &'static str {
        "flashdeconv"
    }

    fn inputs(&self) -> &'static [InputDeclaration] {
        INPUTS
    }

    fn excluded_parameters(&self, tool: &str) -> &'static [&'static str] {
        match tool {
            TOOL => &["ida_log", "keep_empty_out"],
            _ => &[],
        }
    }

    async fn execute<E: ToolExecutor, P: ResultParser>(
        &self,
        context: &mut WorkflowContext<'_, E, P>,
        parameters: &WorkflowParameters,
    ) -> Result<ExecutionReport, PipelineError> {
        let output_root = context.root().join(DECONVOLUTION_OUTPUT_DIR);
        create_dir_all(&output_root).await.map_err(|err| {
            PipelineError::DirectoryCreationError(output_root.display().to_string(), err)
        })?;

        let mut report = ExecutionReport::default();
        for input in context.inputs.files(SPECTRA_ROLE).to_vec() {
            let base = base_name(&input)?;
            let run_dir = output_root.join(&base);
            if run_dir.exists() {
                remove_dir_all(&run_dir).await.map_err(|err| {
                    PipelineError::DirectoryRemovalError(run_dir.display().to_string(), err)
                })?;
            }
            create_dir_all(&run_dir).await.map_err(|err| {
                PipelineError::DirectoryCreationError(run_dir.display().to_string(), err)
            })?;

            let outputs: Vec<PathBuf> = OUTPUTS
                .iter()
                .map(|output| output.path_in(&run_dir, &base))
                .collect();
            let mut invocation = ToolInvocation::new(TOOL).with_file("in", &input);
            for (output, path) in OUTPUTS.iter().zip(outputs.iter()) {
                invocation = invocation.with_file(output.role, path);
            }
            context
                .run_tool(invocation.with_parameters(self.tool_parameters(parameters, TOOL)))
                .await?;

            info!("Creating zip file for {}...", base);
            let bundle = run_dir.join(OUTPUT_BUNDLE_NAME);
            report.produced.extend(write_bundle(&bundle, &outputs).await?);
            report.bundles.push(bundle);
        }

        report.invocations = context.invocations();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, fs::File};

    use tempfile::tempdir;
    use zip::ZipArchive;

    use super::*;
    use crate::{
        parsing::flash_parser::FlashResultParser,
        pipeline::{
            executor::ExecutionControl,
            testing::RecordingExecutor,
            workflow::{ExecutionOutcome, WorkflowRunner},
        },
        session::Session,
        validation::pairing::PairingStrategy,
    };

    #[tokio::test]
    async fn test_outputs_and_bundle() {
        let dir = tempdir().unwrap();
        let input_dir = tempdir().unwrap();
        let input = input_dir.path().join("x.mzML");
        fs::write(&input, "<mzML/>").unwrap();

        let mut session = Session::create(dir.path(), FlashResultParser, PairingStrategy::default())
            .await
            .unwrap();
        let runner = WorkflowRunner::new(
            RecordingExecutor::skipping_outputs(&["out_msalign1", "out_msalign2", "out_quant"]),
            ExecutionControl::default(),
            PathBuf::from("example-data"),
        );
        let mut parameters = WorkflowParameters::new();
        parameters.selection.insert(
            SPECTRA_ROLE.to_string(),
            vec![input.to_string_lossy().to_string()],
        );

        // stale files of an earlier run are removed
        let run_dir = session.root().join(DECONVOLUTION_OUTPUT_DIR).join("x");
        fs::create_dir_all(&run_dir).unwrap();
        fs::write(run_dir.join("stale.txt"), "").unwrap();

        let outcome = runner
            .execute(&mut session, &DeconvolutionWorkflow, &parameters)
            .await
            .unwrap();
        let report = match outcome {
            ExecutionOutcome::Completed(report) => report,
            _ => panic!("workflow should run"),
        };

        assert_eq!(report.invocations, 1);
        assert!(run_dir.join("x.tsv").is_file());
        assert!(!run_dir.join("stale.txt").exists());
        assert_eq!(report.produced.len(), 9);
        assert_eq!(report.bundles, [run_dir.join(OUTPUT_BUNDLE_NAME)]);

        let archive = ZipArchive::new(File::open(&report.bundles[0]).unwrap()).unwrap();
        let mut names: Vec<&str> = archive.file_names().collect();
        names.sort();
        assert_eq!(
            names,
            [
                "x.mzML",
                "x.tsv",
                "x_annotated.mzML",
                "x_feature1.feature",
                "x_feature2.feature",
                "x_spec1.tsv",
                "x_spec2.tsv",
                "x_spec3.tsv",
                "x_spec4.tsv",
            ]
        );

        let invocation = &runner.executor().invocations()[0];
        assert_eq!(invocation.files_of("out_spec2"), [run_dir.join("x_spec2.tsv")]);
        assert_eq!(invocation.files.len(), 13);

        // outputs are not added to the workspace
        assert!(session.store().file_lists().values().all(|files| files.is_empty()));
    }
}
