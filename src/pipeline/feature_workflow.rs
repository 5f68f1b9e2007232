// std imports
use std::path::PathBuf;

// 3rd party imports
use tokio::fs::create_dir_all;
use tracing::info;

// internal imports
use crate::{
    configuration::WorkflowParameters,
    constants::WORKFLOW_RESULTS_DIR,
    errors::pipeline_error::PipelineError,
    parsing::parser::ResultParser,
};

use super::{
    executor::{CustomInvocation, ToolExecutor, ToolInvocation},
    stage::{base_name, OutputSpec},
    workflow::{ExecutionReport, InputDeclaration, Workflow, WorkflowContext},
};

const FEATURE_DETECTION_TOOL: &str = "FeatureFinderMetabo";

const ADDUCT_DETECTION_TOOL: &str = "MetaboliteAdductDecharger";

const EXPORT_TOOL: &str = "SiriusExport";

const CUSTOM_STEP: &str = "example";

const SPECTRA_ROLE: &str = "mzML-files";

/// Enables the adduct detection
///
pub const ADDUCT_DETECTION_FLAG: &str = "run-adduct-detection";

const INPUTS: &[InputDeclaration] = &[InputDeclaration {
    role: SPECTRA_ROLE,
    missing_message: "Please select at least one mzML file.",
    fallback: &[],
}];

const FEATURES: OutputSpec = OutputSpec::new("out", "", "featureXML");

/// Feature detection template: FeatureFinderMetabo per input, optional adduct detection
/// on the detected features, a custom python step and a SIRIUS export over all inputs.
///
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureWorkflow;

impl Workflow for FeatureWorkflow {
    fn name(&self) -> &'static str {
        "topp-workflow"
    }

    fn inputs(&self) -> &'static [InputDeclaration] {
        INPUTS
    }

    async fn execute<E: ToolExecutor, P: ResultParser>(
        &self,
        context: &mut WorkflowContext<'_, E, P>,
        parameters: &WorkflowParameters,
    ) -> Result<ExecutionReport, PipelineError> {
        let inputs = context.inputs.files(SPECTRA_ROLE).to_vec();
        info!("Number of input mzML files: {}", inputs.len());

        let results_dir = context.workflow_dir.join(WORKFLOW_RESULTS_DIR);
        let feature_dir = results_dir.join("feature-detection");
        let export_dir = results_dir.join("sirius-export");
        for dir in [&feature_dir, &export_dir] {
            create_dir_all(dir).await.map_err(|err| {
                PipelineError::DirectoryCreationError(dir.display().to_string(), err)
            })?;
        }

        let mut features: Vec<PathBuf> = Vec::with_capacity(inputs.len());
        for input in inputs.iter() {
            let feature_file = FEATURES.path_in(&feature_dir, &base_name(input)?);
            context
                .run_tool(
                    ToolInvocation::new(FEATURE_DETECTION_TOOL)
                        .with_file("in", input)
                        .with_file(FEATURES.role, &feature_file)
                        .with_parameters(self.tool_parameters(parameters, FEATURE_DETECTION_TOOL)),
                )
                .await?;
            features.push(feature_file);
        }

        if parameters.flag(ADDUCT_DETECTION_FLAG) {
            // overwrites the feature files
            for feature_file in features.iter() {
                context
                    .run_tool(
                        ToolInvocation::new(ADDUCT_DETECTION_TOOL)
                            .with_file("in", feature_file)
                            .with_file("out_fm", feature_file)
                            .with_parameters(
                                self.tool_parameters(parameters, ADDUCT_DETECTION_TOOL),
                            ),
                    )
                    .await?;
            }
        }

        context
            .run_custom(
                CustomInvocation::new(CUSTOM_STEP, parameters.custom_parameters(CUSTOM_STEP))
                    .with_files("in", inputs.clone()),
            )
            .await?;

        let export = export_dir.join("sirius.ms");
        context
            .run_tool(
                ToolInvocation::new(EXPORT_TOOL)
                    .with_files("in", inputs)
                    .with_files("in_featureinfo", features.clone())
                    .with_file("out", &export)
                    .with_parameters(self.tool_parameters(parameters, EXPORT_TOOL)),
            )
            .await?;

        let mut report = ExecutionReport {
            invocations: context.invocations(),
            ..Default::default()
        };
        report.produced = features
            .into_iter()
            .chain(std::iter::once(export))
            .filter(|output| output.is_file())
            .collect();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

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

    async fn run(adduct_detection: bool) -> (WorkflowRunner<RecordingExecutor>, ExecutionReport) {
        let dir = tempdir().unwrap();
        let mut session = Session::create(dir.path(), FlashResultParser, PairingStrategy::default())
            .await
            .unwrap();
        let runner = WorkflowRunner::new(
            RecordingExecutor::default(),
            ExecutionControl::default(),
            PathBuf::from("example-data"),
        );

        let upload_dir = tempdir().unwrap();
        let files: Vec<PathBuf> = ["a.mzML", "b.mzML"]
            .iter()
            .map(|name| upload_dir.path().join(name))
            .collect();
        for file in files.iter() {
            fs::write(file, "<mzML/>").unwrap();
        }
        runner
            .upload(&session, &FeatureWorkflow, SPECTRA_ROLE, &files)
            .await
            .unwrap();

        let mut parameters = WorkflowParameters::new();
        parameters
            .flags
            .insert(ADDUCT_DETECTION_FLAG.to_string(), adduct_detection);
        let outcome = runner
            .execute(&mut session, &FeatureWorkflow, &parameters)
            .await
            .unwrap();
        let report = match outcome {
            ExecutionOutcome::Completed(report) => report,
            _ => panic!("workflow should run"),
        };
        (runner, report)
    }

    #[tokio::test]
    async fn test_without_adduct_detection() {
        let (runner, report) = run(false).await;
        let executor = runner.executor();
        let tools: Vec<String> = executor
            .invocations()
            .iter()
            .map(|invocation| invocation.tool.clone())
            .collect();
        assert_eq!(
            tools,
            ["FeatureFinderMetabo", "FeatureFinderMetabo", "SiriusExport"]
        );
        assert_eq!(executor.custom_invocations().len(), 1);
        assert_eq!(executor.custom_invocations()[0].step, "example");
        assert_eq!(report.invocations, 4);
        assert_eq!(report.produced.len(), 3);

        let export = &executor.invocations()[2];
        assert_eq!(export.files_of("in").len(), 2);
        assert_eq!(export.files_of("in_featureinfo").len(), 2);
        assert!(export.files_of("out")[0].ends_with("results/sirius-export/sirius.ms"));
    }

    #[tokio::test]
    async fn test_adduct_detection_overwrites_features() {
        let (runner, report) = run(true).await;
        let invocations = runner.executor().invocations();
        assert_eq!(invocations.len(), 5);
        let decharger = &invocations[2];
        assert_eq!(decharger.tool, "MetaboliteAdductDecharger");
        assert_eq!(decharger.files_of("in"), decharger.files_of("out_fm"));
        assert_eq!(decharger.files_of("in"), invocations[0].files_of("out"));
        assert_eq!(report.invocations, 6);
    }
}
