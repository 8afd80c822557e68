//! mx-export: write measurement exports from the command line.
//!
//! ```bash
//! # delimited files plus a setup script
//! mx-export export --input measurements.json --output-dir out
//!
//! # one SQL script with the DDL and every INSERT
//! mx-export export --input measurements.json --config export.toml --format sql
//!
//! # just the table definitions
//! mx-export schema --input measurements.json
//! ```

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use mx_common::Result;
use mx_config::{DatabaseType, ExportConfig};
use mx_core::exit_codes::ExitCode;
use mx_core::{
    CommitMode, ExportContext, ExportSummary, InMemoryMeasurements, ScriptExecutor, SqlExecutor,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Measurement export command-line interface
#[derive(Parser, Debug)]
#[command(
    name = "mx-export",
    version,
    about = "Export measurements to Per_Image/Per_Object tables"
)]
struct Cli {
    /// Enable debug logging
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export every image set
    Export(ExportArgs),
    /// Print the table definitions
    Schema(InputArgs),
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Measurements JSON file
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// Export configuration (.toml or .json)
    #[arg(short, long, value_name = "FILE", env = "MX_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ExportArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Output directory; overrides the configuration
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "csv")]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Delimited data files plus a setup script
    Csv,
    /// One SQL script with table definitions and inserts
    Sql,
}

fn init_logging(verbose: bool, json: bool) {
    let filter = EnvFilter::try_from_env("MX_LOG")
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load(input: &InputArgs) -> Result<(InMemoryMeasurements, ExportConfig)> {
    let measurements = InMemoryMeasurements::from_path(&input.input)?;
    let config = match &input.config {
        Some(path) => ExportConfig::from_path(path)?,
        None => ExportConfig::default(),
    };
    Ok((measurements, config))
}

fn run_schema(input: &InputArgs) -> Result<ExitCode> {
    let (measurements, config) = load(input)?;
    let ctx = ExportContext::initialize(&measurements.column_catalog(), config)?;
    for statement in ctx.schema_statements() {
        println!("{};", statement);
    }
    Ok(ExitCode::Clean)
}

fn run_export(args: &ExportArgs) -> Result<ExitCode> {
    let (measurements, mut config) = load(&args.input)?;
    if let Some(dir) = &args.output_dir {
        config.output_directory = dir.clone();
    }
    let ctx = ExportContext::initialize(&measurements.column_catalog(), config)?;

    let summary = match args.format {
        OutputFormat::Csv => {
            let base_name = ctx.base_name(&measurements)?;
            let (mut sink, outputs) = ctx.file_sink(&base_name)?;
            info!(setup = %outputs.setup_script.display(), "wrote setup script");
            ctx.export_all(&measurements, &mut sink)?
        }
        OutputFormat::Sql => export_script(&ctx, &measurements)?,
    };

    println!("{}", serde_json::to_string_pretty(&summary)?);
    if summary.warnings.is_empty() {
        Ok(ExitCode::Clean)
    } else {
        Ok(ExitCode::CompletedWithWarnings)
    }
}

fn export_script(
    ctx: &ExportContext,
    measurements: &InMemoryMeasurements,
) -> Result<ExportSummary> {
    let config = ctx.config();
    let dir: &Path = &config.output_directory;
    std::fs::create_dir_all(dir)?;
    let path = dir.join(config.export_script_name());
    let mut executor = ScriptExecutor::new(BufWriter::new(File::create(&path)?));

    if config.db_type == DatabaseType::MySql {
        executor.execute(&format!("CREATE DATABASE IF NOT EXISTS {}", config.db_name))?;
        executor.execute(&format!("USE {}", config.db_name))?;
    }
    ctx.create_tables(&mut executor, true)?;

    let mut sink = ctx
        .relational_sink(executor)
        .with_commit_mode(CommitMode::OnFinish);
    let summary = ctx.export_all(measurements, &mut sink)?;
    info!(
        path = %path.display(),
        statements = sink.executor().statement_count(),
        "wrote export script"
    );
    Ok(summary)
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);

    let result = match &cli.command {
        Command::Export(args) => run_export(args),
        Command::Schema(input) => run_schema(input),
    };
    match result {
        Ok(code) => code.into(),
        Err(e) => {
            error!(code = e.code(), error = %e, "export failed");
            eprintln!("mx-export: {}", e);
            ExitCode::for_error(&e).into()
        }
    }
}
