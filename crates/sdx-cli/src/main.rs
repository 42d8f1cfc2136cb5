//! sdx-report: command-line front end for the report export engine.
//!
//! - `generate`: render a JSON job into `report.pdf`, `report.docx` and a
//!   `manifest.json` in an output directory
//! - `validate`: check a job and optional branding file without rendering

mod error;
mod exit_codes;
mod logging;
mod manifest;

use clap::{Args, Parser, Subcommand};
use error::{CliError, Result};
use exit_codes::ExitCode;
use logging::{init_logging, LogConfig, LogFormat};
use manifest::{file_name, Manifest, MANIFEST_FILE};
use sdx_report::{GeneratorConfig, OutputFormat, ReportGenerator, ReportJob};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info};

/// Paginated PDF and DOCX export for service-desk analytics reports
#[derive(Parser)]
#[command(name = "sdx-report")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log format on stderr: human or jsonl
    #[arg(long, global = true, default_value = "human", env = "SDX_LOG_FORMAT")]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a report job
    Generate(GenerateArgs),

    /// Check a report job and branding without rendering
    Validate(ValidateArgs),
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Report job (JSON)
    #[arg(long)]
    job: PathBuf,

    /// Output directory (created if missing)
    #[arg(long)]
    out: PathBuf,

    /// Branding and layout configuration (TOML)
    #[arg(long)]
    brand: Option<PathBuf>,

    /// Output format; repeat for several. Overrides the job's formats.
    #[arg(long = "format", value_name = "FORMAT")]
    formats: Vec<OutputFormat>,

    /// Table body rows per page
    #[arg(long)]
    rows_per_page: Option<usize>,
}

#[derive(Args, Debug)]
struct ValidateArgs {
    /// Report job (JSON)
    #[arg(long)]
    job: PathBuf,

    /// Branding and layout configuration (TOML)
    #[arg(long)]
    brand: Option<PathBuf>,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // --help and --version also arrive here and go to stdout.
            let _ = err.print();
            let code = if err.use_stderr() {
                ExitCode::ArgsError
            } else {
                ExitCode::Clean
            };
            std::process::exit(code.as_i32());
        }
    };

    let log_config = LogConfig::from_flags(cli.global.verbose, cli.global.quiet, cli.global.log_format);
    init_logging(&log_config);

    let result = match &cli.command {
        Commands::Generate(args) => run_generate(args),
        Commands::Validate(args) => run_validate(args),
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(err) => {
            let code = err.exit_code();
            error!(error = %err, code = code.code_name(), "Command failed");
            eprintln!("error: {}", err);
            code
        }
    };

    std::process::exit(exit_code.as_i32());
}

fn read_job(path: &Path) -> Result<ReportJob> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CliError::Job {
        path: path.to_path_buf(),
        source,
    })
}

fn read_config(brand: Option<&Path>) -> Result<GeneratorConfig> {
    let Some(path) = brand else {
        return Ok(GeneratorConfig::default());
    };
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = GeneratorConfig::from_toml(&text).map_err(|source| CliError::Brand {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "Loaded branding configuration");
    Ok(config)
}

fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    std::fs::write(path, data).map_err(|source| CliError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn run_generate(args: &GenerateArgs) -> Result<ExitCode> {
    let started = Instant::now();
    let mut job = read_job(&args.job)?;
    if !args.formats.is_empty() {
        job.requested_formats = args.formats.clone();
    }
    let mut config = read_config(args.brand.as_deref())?;
    if let Some(rows) = args.rows_per_page {
        config = config.with_rows_per_page(rows);
    }

    // Pin the timestamp so the manifest and the documents agree.
    let generated_at = *job
        .cover
        .generated_at
        .get_or_insert_with(chrono::Utc::now);

    let generator = ReportGenerator::new(config);
    let report = generator.generate(&job)?;

    std::fs::create_dir_all(&args.out).map_err(|source| CliError::Write {
        path: args.out.clone(),
        source,
    })?;
    for (format, bytes) in &report.outputs {
        let path = args.out.join(file_name(*format));
        write_file(&path, bytes)?;
        info!(path = %path.display(), bytes = bytes.len(), "Wrote output");
    }

    let manifest = Manifest::new(
        &report,
        &job.cover.client_name,
        &job.cover.period_label,
        generated_at,
    );
    let json = serde_json::to_string_pretty(&manifest).map_err(CliError::Manifest)?;
    write_file(&args.out.join(MANIFEST_FILE), json.as_bytes())?;
    println!("{}", json);

    let code = if report.has_warnings() {
        ExitCode::Warnings
    } else {
        ExitCode::Clean
    };
    info!(
        out = %args.out.display(),
        pages = report.page_count,
        warnings = report.warnings.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        code = code.code_name(),
        "Generate finished"
    );
    Ok(code)
}

fn run_validate(args: &ValidateArgs) -> Result<ExitCode> {
    let job = read_job(&args.job)?;
    let config = read_config(args.brand.as_deref())?;
    let generator = ReportGenerator::new(config);
    generator.validate(&job)?;

    let summary = serde_json::json!({
        "status": "ok",
        "client_name": job.cover.client_name,
        "period_label": job.cover.period_label,
        "formats": job.requested_formats,
        "modules": job.modules.len(),
        "charts": job.modules.iter().map(|m| m.charts.len()).sum::<usize>(),
    });
    println!("{}", summary);
    info!(modules = job.modules.len(), "Job is valid");
    Ok(ExitCode::Clean)
}
