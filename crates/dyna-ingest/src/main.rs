//! CLI entry point for the dataset ingestion pipeline.

use anyhow::{Context, Result, anyhow};
use clap::{Args as ClapArgs, Parser, Subcommand};
use dotenv::dotenv;
use dyna_ingest::formats;
use dyna_ingest::{
    ColumnStats, DataProfiler, DatasetProcessor, DatasetProfile, DatasetRecord, FileFormat,
    PipelineConfig, TablePreview, UploadRequest,
};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Dataset ingestion, cleaning and profiling pipeline",
    long_about = "Cleans uploaded CSV/JSON files and profiles them for visualization.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  DYNA_UPLOAD_DIR        Directory cleaned uploads are stored in\n  \
                  DYNA_PROFILE_MAX_ROWS  Rows fed to the profiler (0 = all)\n\n\
                  EXAMPLES:\n  \
                  # Clean an upload and store it\n  \
                  dyna-ingest clean -i sales.csv --owner 7\n\n  \
                  # Profile a file without cleaning it\n  \
                  dyna-ingest profile -i sales.json --json | jq .grouped_info"
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output JSON to stdout instead of a human-readable summary
    ///
    /// Disables all logs so the output can be piped to other tools.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store a copy of a file as an upload, clean it and create a dataset record
    Clean(CleanArgs),
    /// Profile a file as-is, without cleaning it
    Profile(ProfileArgs),
}

#[derive(ClapArgs, Debug)]
struct InputArgs {
    /// Path to the CSV or JSON file
    #[arg(short, long)]
    input: PathBuf,

    /// File type (csv or json); defaults to the file extension
    #[arg(short = 't', long = "type")]
    file_type: Option<String>,
}

#[derive(ClapArgs, Debug)]
struct CleanArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Owner id recorded on the dataset
    #[arg(long, default_value = "0")]
    owner: u64,

    /// Mark the dataset as public
    #[arg(long)]
    public: bool,

    /// Directory the cleaned upload is stored in (overrides DYNA_UPLOAD_DIR)
    #[arg(long)]
    upload_dir: Option<PathBuf>,
}

#[derive(ClapArgs, Debug)]
struct ProfileArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Profile at most this many rows (0 = all rows)
    #[arg(long)]
    max_rows: Option<usize>,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level, cli.quiet, cli.json);

    // Load environment variables from .env file
    dotenv().ok();

    let config = PipelineConfig::from_env().context("Invalid configuration")?;

    let result = match &cli.command {
        Command::Clean(args) => run_clean(&cli, args, config),
        Command::Profile(args) => run_profile(&cli, args, config),
    };

    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}

fn run_clean(cli: &Cli, args: &CleanArgs, mut config: PipelineConfig) -> Result<()> {
    let (path, file_type) = resolve_input(&args.input)?;
    if let Some(dir) = &args.upload_dir {
        config.upload_dir = dir.clone();
    }

    let quiet = cli.quiet || cli.json;
    let processor = DatasetProcessor::builder()
        .config(config)
        .on_progress(move |update| {
            if !quiet {
                info!("[{:>3}%] {}", update.percent, update.message);
            }
        })
        .build()?;

    let original_filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let request = UploadRequest::new(original_filename, file_type.as_str())
        .owner(args.owner)
        .public(args.public);

    let upload = File::open(&path).with_context(|| format!("Opening {}", path.display()))?;
    let record = processor.process(upload, &request)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    let preview = processor.preview(record.id, None)?;
    print_record(&record);
    print_preview(&preview);
    Ok(())
}

fn run_profile(cli: &Cli, args: &ProfileArgs, mut config: PipelineConfig) -> Result<()> {
    let (path, file_type) = resolve_input(&args.input)?;
    if let Some(rows) = args.max_rows {
        config.profile_max_rows = if rows == 0 { None } else { Some(rows) };
    }

    info!("Loading dataset from: {}", path.display());
    let df = formats::read_table(&path, file_type)?;

    let original_filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let profile = DataProfiler::new(&config).build_profile(&df, &original_filename, file_type);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
    } else {
        print_profile(&profile);
    }
    Ok(())
}

/// Validate the input path and settle on a file type.
fn resolve_input(input: &InputArgs) -> Result<(PathBuf, FileFormat)> {
    if !input.input.exists() {
        return Err(anyhow!("Input file not found: {}", input.input.display()));
    }

    let tag = match &input.file_type {
        Some(tag) => tag.clone(),
        None => extension_of(&input.input)
            .ok_or_else(|| anyhow!("Cannot tell the file type of {}; pass --type", input.input.display()))?,
    };
    let file_type: FileFormat = tag.parse()?;

    Ok((input.input.clone(), file_type))
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().into_owned())
}

// Printing uses `println!` on purpose: it is the command's output, not a log.

fn print_record(record: &DatasetRecord) {
    println!("\n{}", "=".repeat(60));
    println!("DATASET {}", record.id);
    println!("{}", "=".repeat(60));
    println!("  Original file: {}", record.original_filename);
    println!("  Stored as:     {}", record.file_path.display());
    println!("  Type:          {}", record.file_type);
    println!("  Rows:          {}", record.n_rows);
    println!("  Columns:       {}", record.n_columns);
    println!("  Owner:         {}", record.owner_id);
    println!("  Public:        {}", record.is_public);
    println!("  Uploaded at:   {}", record.uploaded_at.to_rfc3339());
}

fn print_preview(preview: &TablePreview) {
    println!("\nPREVIEW ({} rows)", preview.rows.len());
    println!("{}", "-".repeat(60));
    println!("{}", preview.columns.join(" | "));
    for row in &preview.rows {
        let cells: Vec<String> = row
            .iter()
            .map(|v| match v {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Null => String::new(),
                other => other.to_string(),
            })
            .collect();
        println!("{}", cells.join(" | "));
    }
}

fn print_profile(profile: &DatasetProfile) {
    println!("\n{}", "=".repeat(80));
    println!("PROFILE: {}", profile.original_filename);
    println!("{}", "=".repeat(80));
    println!("  Rows: {}", profile.n_rows);
    println!("  Columns: {}", profile.n_columns);
    if let Some(rows) = profile.sampled_rows {
        println!("  Sampled rows: {}", rows);
    }
    println!();

    println!("{:<24} {:<12} {:<40}", "Column", "Type", "Summary");
    println!("{}", "-".repeat(80));
    for (name, stats) in profile.column_info.iter() {
        println!("{:<24} {:<12} {:<40}", truncate_str(name, 23), stats.dtype(), summarize(stats));
    }

    if !profile.grouped_info.is_empty() {
        println!("\nGROUPABLE COLUMNS");
        println!("{}", "-".repeat(40));
        for (name, info) in profile.grouped_info.iter() {
            let top: Vec<String> = info
                .top_values
                .iter()
                .map(|(value, count)| format!("{} ({})", value, count))
                .collect();
            println!("  {} [{} values]: {}", name, info.unique_values, top.join(", "));
        }
    }
}

fn summarize(stats: &ColumnStats) -> String {
    let num = |v: Option<f64>| v.map_or("-".to_string(), |v| format!("{:.2}", v));
    match stats {
        ColumnStats::Numeric(s) => format!(
            "min {} / median {} / max {}",
            num(s.min),
            num(s.median),
            num(s.max)
        ),
        ColumnStats::DateTime(s) => format!(
            "{} .. {}",
            s.min.as_deref().unwrap_or("-"),
            s.max.as_deref().unwrap_or("-")
        ),
        ColumnStats::Categorical(s) => format!("{} distinct values", s.unique_values),
        ColumnStats::Minimal(_) => "statistics unavailable".to_string(),
    }
}

/// Truncate a string to a maximum length, adding "..." if truncated.
fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
