// std imports
use std::path::{Path, PathBuf};

// 3rd party imports
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use glob::glob;
use metrics_exporter_prometheus::PrometheusBuilder;
use signal_hook::{consts::SIGINT, iterator::Signals};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// internal imports
use flashpipe::configuration::{FlashpipeConfiguration, WorkflowParameters};
use flashpipe::parsing::{FlashResultParser, ParseOutcome};
use flashpipe::pipeline::deconvolution_workflow::DeconvolutionWorkflow;
use flashpipe::pipeline::executor::{ExecutionControl, ProcessToolExecutor};
use flashpipe::pipeline::feature_workflow::FeatureWorkflow;
use flashpipe::pipeline::tagging_workflow::TaggingWorkflow;
use flashpipe::pipeline::workflow::{ExecutionOutcome, Workflow, WorkflowRunner};
use flashpipe::session::Session;
use flashpipe::workspace::{Category, StoreOutcome};

/// Target for tracing
///
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum TracingTarget {
    File,
    Terminal,
    All,
}

/// Log rotation values for CLI
///
#[derive(clap::ValueEnum, Clone, Debug)]
enum TracingLogRotation {
    Minutely,
    Hourly,
    Daily,
    Never,
}

impl From<TracingLogRotation> for Rotation {
    fn from(rotation: TracingLogRotation) -> Self {
        match rotation {
            TracingLogRotation::Minutely => Rotation::MINUTELY,
            TracingLogRotation::Hourly => Rotation::HOURLY,
            TracingLogRotation::Daily => Rotation::DAILY,
            TracingLogRotation::Never => Rotation::NEVER,
        }
    }
}

/// Available workflows
///
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum WorkflowKind {
    /// FLASHDeconv only, outputs are bundled per run
    Deconvolution,
    /// FLASHDeconv followed by FLASHTagger, outputs are added to the workspace
    Tagging,
    /// Feature detection template
    Feature,
}

#[derive(Debug, Subcommand)]
enum SessionCommand {
    /// Creates a new session and prints its ID
    New {},
    /// Adds files to the workspace. The category is derived from the file name.
    Upload {
        /// Paths to the files
        /// Glob patterns are allowed. e.g. /path/to/**/*.mzML, put them in quotes if your shell expands them.
        #[arg(value_delimiter = ' ', num_args = 1..)]
        file_paths: Vec<String>,
    },
    /// Adds the example files to the workspace
    LoadExamples {},
    /// Parses all new complete experiments
    Parse {
        /// Parse even if no new annotated files were added
        #[arg(short, long, default_value = "false")]
        force: bool,
    },
    /// Prints the uploaded files grouped by experiment
    Show {},
    /// Removes the files of a category, e.g. `deconv-mzMLs`, `tags-tsv`, `db-fasta`
    Reset {
        /// Category to reset
        category: Option<Category>,
        /// Reset all required categories
        #[arg(short, long, default_value = "false")]
        all: bool,
    },
}

#[derive(Debug, Parser)]
struct SessionCLI {
    #[command(subcommand)]
    command: SessionCommand,
}

#[derive(Debug, Subcommand)]
enum WorkflowCommand {
    /// Prints new workflow parameters to stdout
    NewParameters {},
    /// Uploads input files for an input role of the workflow
    Upload {
        workflow: WorkflowKind,
        /// Input role, e.g. `mzML-files` or `fasta-file`
        role: String,
        /// Paths to the files
        /// Glob patterns are allowed. e.g. /path/to/**/*.mzML, put them in quotes if your shell expands them.
        #[arg(value_delimiter = ' ', num_args = 1..)]
        file_paths: Vec<String>,
    },
    /// Runs the workflow
    Run {
        workflow: WorkflowKind,
        /// Workflow parameters file (TOML)
        #[arg(short, long)]
        parameters: Option<PathBuf>,
    },
    /// Collects the outputs of an earlier run
    Pull {
        workflow: WorkflowKind,
        /// Workflow parameters file (TOML)
        #[arg(short, long)]
        parameters: Option<PathBuf>,
    },
}

#[derive(Debug, Parser)]
struct WorkflowCLI {
    #[command(subcommand)]
    command: WorkflowCommand,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Prints a new configuration to stdout
    Config {},
    /// Workspace and parsing of a session
    Session(SessionCLI),
    /// Workflows of a session
    Workflow(WorkflowCLI),
}

#[derive(Debug, Parser)]
#[command(name = "flashpipe")]
struct Cli {
    /// Verbosity level
    /// 0 - Error
    /// 1 - Warn
    /// 2 - Info
    /// 3 - Debug
    /// > 3 - Trace
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    /// How to log tracing. Can be used multiple times
    #[arg(short, long, value_enum, action = clap::ArgAction::Append)]
    tracing_target: Vec<TracingTarget>,
    /// Tracing log file. Only used if `file` is set in `tracing_target`.
    #[arg(short, long, default_value = "./logs/flashpipe.log")]
    file: PathBuf,
    /// Tracing log rotation. Only used if `file` is set in `tracing_target`.
    #[arg(short, long, value_enum, default_value = "never")]
    rotation: TracingLogRotation,
    /// Local address to serve the Prometheus metrics endpoint.
    /// Port zero will automatically use a free port.
    /// Metrics are not exported if not set.
    #[arg(short, long)]
    prometheus: Option<String>,
    /// Path to the configuration file, defaults are used if not set
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Session ID, required by all commands except `session new`
    #[arg(short, long)]
    session: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    //// Set up tracing
    let verbosity = match args.verbose {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(verbosity.into())
        .add_directive("polars=error".parse()?);

    // Tracing layers
    let mut tracing_indicatif_layer = None;
    let mut tracing_terminal_layer = None;
    let mut tracing_file_layer = None;

    // Tracing guards
    let mut _tracing_log_writer_guard = None;

    let log_to_terminal = args.tracing_target.is_empty()
        || args.tracing_target.contains(&TracingTarget::Terminal)
        || args.tracing_target.contains(&TracingTarget::All);

    if log_to_terminal {
        let layer = IndicatifLayer::new()
            .with_span_child_prefix_symbol("\t")
            .with_span_child_prefix_indent("")
            .with_max_progress_bars(20, None);
        tracing_terminal_layer =
            Some(tracing_subscriber::fmt::layer().with_writer(layer.get_stderr_writer()));
        tracing_indicatif_layer = Some(layer);
    }

    if args.tracing_target.contains(&TracingTarget::File)
        || args.tracing_target.contains(&TracingTarget::All)
    {
        let log_dir = args.file.parent().unwrap_or(Path::new("."));
        let log_file_name = args
            .file
            .file_name()
            .context("Tracing log file has no file name")?;
        let file_appender = RollingFileAppender::new(args.rotation.into(), log_dir, log_file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        tracing_file_layer = Some(tracing_subscriber::fmt::layer().with_writer(non_blocking));
        _tracing_log_writer_guard = Some(guard);
    }

    tracing_subscriber::registry()
        .with(tracing_terminal_layer)
        .with(tracing_indicatif_layer)
        .with(tracing_file_layer)
        .with(filter)
        .init();

    //// Setup (prometheus) metrics
    if let Some(prometheus) = &args.prometheus {
        // Bind first to check the port is available, port 0 lets the OS choose
        let prometheus_scrape_socket_tmp = TcpListener::bind(prometheus)
            .await
            .context("Creating TCP listener for Prometheus scrape endpoint")?;
        let prometheus_scrape_socket = prometheus_scrape_socket_tmp.local_addr()?;
        drop(prometheus_scrape_socket_tmp);

        PrometheusBuilder::new()
            .with_http_listener(prometheus_scrape_socket)
            .install()?;
        info!(
            "Metrics available at http://{}/metrics",
            prometheus_scrape_socket
        );
    }

    let config = match &args.config {
        Some(path) => FlashpipeConfiguration::from_file(path)?,
        None => FlashpipeConfiguration::new(),
    };

    match args.command {
        Commands::Config {} => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
        Commands::Session(session_command) => match session_command.command {
            SessionCommand::New {} => {
                let session = Session::create(
                    &config.workspace.base_dir,
                    FlashResultParser,
                    config.parsing.pairing_strategy,
                )
                .await?;
                println!("{}", session.id());
            }
            SessionCommand::Upload { file_paths } => {
                let mut session = open_session(&config, args.session.as_deref()).await?;
                let file_paths = convert_str_paths_and_resolve_globs(file_paths)?;
                let outcomes = session.upload(&file_paths).await?;
                print_store_outcomes(&outcomes);
            }
            SessionCommand::LoadExamples {} => {
                let mut session = open_session(&config, args.session.as_deref()).await?;
                let outcomes = session
                    .load_examples(&config.workspace.example_data_dir)
                    .await?;
                print_store_outcomes(&outcomes);
            }
            SessionCommand::Parse { force } => {
                let mut session = open_session(&config, args.session.as_deref()).await?;
                print_parse_outcome(&session.parse_delta(force)?);
                match session.experiment_table() {
                    Ok(table) => println!("{}", table.to_dataframe()?),
                    Err(err) => warn!("{}", err),
                }
            }
            SessionCommand::Show {} => {
                let session = open_session(&config, args.session.as_deref()).await?;
                match session.uploaded_table() {
                    Ok(table) => println!("{}", table.to_dataframe()?),
                    Err(err) => println!("{}", err),
                }
            }
            SessionCommand::Reset { category, all } => {
                let mut session = open_session(&config, args.session.as_deref()).await?;
                if all {
                    session.reset_all().await?;
                    info!("All files removed");
                } else if let Some(category) = category {
                    session.reset(category).await?;
                    info!("Files of `{}` removed", category.dir_name());
                } else {
                    bail!("Either a category or `--all` is required");
                }
            }
        },
        Commands::Workflow(WorkflowCLI {
            command: WorkflowCommand::NewParameters {},
        }) => {
            println!("{}", toml::to_string_pretty(&WorkflowParameters::new())?);
        }
        Commands::Workflow(workflow_command) => {
            let mut session = open_session(&config, args.session.as_deref()).await?;

            let cancellation = CancellationToken::new();
            let mut signals = Signals::new([SIGINT])?;
            let signal_cancellation = cancellation.clone();
            std::thread::spawn(move || {
                for sig in signals.forever() {
                    if sig == SIGINT {
                        info!("Gracefully stopping.");
                        signal_cancellation.cancel();
                    }
                }
            });

            let runner = WorkflowRunner::new(
                ProcessToolExecutor::from_config(&config.tools),
                ExecutionControl::new(config.tools.timeout(), cancellation),
                config.workspace.example_data_dir.clone(),
            );

            match workflow_command.command {
                WorkflowCommand::NewParameters {} => {}
                WorkflowCommand::Upload {
                    workflow,
                    role,
                    file_paths,
                } => {
                    let file_paths = convert_str_paths_and_resolve_globs(file_paths)?;
                    let uploaded = match workflow {
                        WorkflowKind::Deconvolution => {
                            runner
                                .upload(&session, &DeconvolutionWorkflow, &role, &file_paths)
                                .await?
                        }
                        WorkflowKind::Tagging => {
                            runner
                                .upload(&session, &TaggingWorkflow, &role, &file_paths)
                                .await?
                        }
                        WorkflowKind::Feature => {
                            runner
                                .upload(&session, &FeatureWorkflow, &role, &file_paths)
                                .await?
                        }
                    };
                    for path in uploaded {
                        println!("{}", path.display());
                    }
                }
                WorkflowCommand::Run {
                    workflow,
                    parameters,
                } => {
                    let parameters = read_workflow_parameters(parameters.as_deref())?;
                    let outcome = match workflow {
                        WorkflowKind::Deconvolution => {
                            run_workflow(&runner, &mut session, &DeconvolutionWorkflow, &parameters)
                                .await?
                        }
                        WorkflowKind::Tagging => {
                            run_workflow(&runner, &mut session, &TaggingWorkflow, &parameters)
                                .await?
                        }
                        WorkflowKind::Feature => {
                            run_workflow(&runner, &mut session, &FeatureWorkflow, &parameters)
                                .await?
                        }
                    };
                    print_execution_outcome(&outcome);
                }
                WorkflowCommand::Pull {
                    workflow,
                    parameters,
                } => {
                    let parameters = read_workflow_parameters(parameters.as_deref())?;
                    let outcome = match workflow {
                        WorkflowKind::Deconvolution => {
                            runner
                                .pull_results(&mut session, &DeconvolutionWorkflow, &parameters)
                                .await?
                        }
                        WorkflowKind::Tagging => {
                            runner
                                .pull_results(&mut session, &TaggingWorkflow, &parameters)
                                .await?
                        }
                        WorkflowKind::Feature => {
                            runner
                                .pull_results(&mut session, &FeatureWorkflow, &parameters)
                                .await?
                        }
                    };
                    print_execution_outcome(&outcome);
                }
            }
        }
    };
    Ok(())
}

/// Opens the session with the given ID below the configured base directory
///
/// # Arguments
/// * `config` - Configuration
/// * `session_id` - Session ID
///
async fn open_session(
    config: &FlashpipeConfiguration,
    session_id: Option<&str>,
) -> Result<Session<FlashResultParser>> {
    let session_id = session_id.context("`--session` is required, use `session new` first")?;
    let root = config.workspace.base_dir.join(session_id);
    if !root.is_dir() {
        bail!("Session `{}` does not exist", session_id);
    }
    Ok(Session::open(root, FlashResultParser, config.parsing.pairing_strategy).await?)
}

/// Runs the workflow and logs the outcome
///
async fn run_workflow<W: Workflow>(
    runner: &WorkflowRunner<ProcessToolExecutor>,
    session: &mut Session<FlashResultParser>,
    workflow: &W,
    parameters: &WorkflowParameters,
) -> Result<ExecutionOutcome> {
    let outcome = runner.execute(session, workflow, parameters).await;
    if runner.control().cancellation.is_cancelled() {
        warn!("{} was cancelled", workflow.name());
    }
    Ok(outcome?)
}

fn read_workflow_parameters(path: Option<&Path>) -> Result<WorkflowParameters> {
    match path {
        Some(path) => WorkflowParameters::from_file(path),
        None => Ok(WorkflowParameters::new()),
    }
}

fn print_store_outcomes(outcomes: &[StoreOutcome]) {
    for outcome in outcomes {
        match outcome {
            StoreOutcome::Stored {
                category,
                file_name,
            } => println!("stored\t{}/{}", category.dir_name(), file_name),
            StoreOutcome::Duplicate {
                category,
                file_name,
            } => println!("duplicate\t{}/{}", category.dir_name(), file_name),
            StoreOutcome::Unrecognized { file_name } => println!("unrecognized\t{}", file_name),
        }
    }
}

fn print_parse_outcome(outcome: &ParseOutcome) {
    match outcome {
        ParseOutcome::NothingToParse => println!("Nothing to parse"),
        ParseOutcome::Unpaired(files) => {
            println!("Files do not form complete experiments:");
            for file in files {
                println!("\t{}", file);
            }
        }
        ParseOutcome::Parsed {
            experiments,
            skipped,
        } => {
            for experiment in experiments {
                println!("parsed\t{}", experiment);
            }
            for file in skipped {
                println!("skipped\t{}", file);
            }
        }
    }
}

fn print_execution_outcome(outcome: &ExecutionOutcome) {
    match outcome {
        ExecutionOutcome::MissingSelection(err) => println!("{}", err),
        ExecutionOutcome::Completed(report) => {
            println!("Invocations: {}", report.invocations);
            for path in report.produced.iter() {
                println!("produced\t{}", path.display());
            }
            for path in report.bundles.iter() {
                println!("bundle\t{}", path.display());
            }
            if let Some(parse_outcome) = &report.parse_outcome {
                print_parse_outcome(parse_outcome);
            }
        }
    }
}

/// Converts a vector of strings to a vector of paths and resolves glob patterns.
///
/// # Arguments
/// * `paths` - Vector of paths as strings
///
fn convert_str_paths_and_resolve_globs(paths: Vec<String>) -> Result<Vec<PathBuf>> {
    Ok(paths
        .into_iter()
        .map(|path| {
            if !path.contains('*') {
                Ok(vec![PathBuf::from(&path)])
            } else {
                Ok(glob(&path)?
                    .map(|x| Ok(x?))
                    .collect::<Result<Vec<PathBuf>>>()?)
            }
        })
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .flatten()
        .collect())
}
