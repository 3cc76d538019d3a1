use anyhow::bail;
use chrono::NaiveDateTime;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use provider_audit::{DirStore, PipelineConfig, PipelineRunner};

const SECONDS_PER_DAY: u64 = 86_400;

#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
enum SummaryFormat {
    #[value(name = "text", help = "Human-readable stage summary")]
    Text,
    #[value(name = "json", help = "Stage summary as a JSON object")]
    Json,
}

#[derive(Parser)]
#[command(name = "provider-audit")]
#[command(about = "Flag unproductive service providers from a provider roster and a monthly service-order log")]
#[command(
    long_about = "Flag unproductive service providers from a provider roster and a monthly service-order log.\n\n\
Exit codes: 0 when at least one provider was flagged, 2 when the run succeeded but flagged nobody, 1 on error."
)]
#[command(version)]
struct Args {
    /// Provider roster (CSV/TSV in any supported encoding, or a spreadsheet)
    #[arg(short = 'r', long, value_name = "FILE")]
    roster: PathBuf,

    /// Monthly service-order log (CSV/TSV in any supported encoding, or a spreadsheet)
    #[arg(short = 'm', long, value_name = "FILE")]
    monthly: PathBuf,

    /// Directory for stage artifacts; existing artifacts are overwritten
    #[arg(short = 'o', long = "output-dir", value_name = "DIR", default_value = "outputs")]
    output_dir: PathBuf,

    /// YAML file overriding column names, labels and the inactivity window
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Inactivity window, e.g. "180days" or "26weeks" (whole days only)
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    inactivity_window: Option<Duration>,

    /// Reference time instead of the current local time ("YYYY-MM-DD HH:MM:SS")
    #[arg(long, value_name = "DATETIME", value_parser = parse_reference_time)]
    now: Option<NaiveDateTime>,

    /// Format of the run summary printed on stdout
    #[arg(long, value_enum, default_value_t = SummaryFormat::Text)]
    summary: SummaryFormat,

    /// Debug mode - log every loader attempt and stage
    #[arg(long)]
    debug: bool,
}

fn parse_reference_time(value: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .map_err(|e| format!("expected \"YYYY-MM-DD HH:MM:SS\": {}", e))
}

fn init_logging(debug: bool) {
    let default_filter = if debug { "warn,provider_audit=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    match run(args) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run(args: Args) -> anyhow::Result<i32> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_yaml_file(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(window) = args.inactivity_window {
        if window.as_secs() % SECONDS_PER_DAY != 0 || window.subsec_nanos() != 0 {
            bail!(
                "inactivity window must be a whole number of days (got {})",
                humantime::format_duration(window)
            );
        }
        config.inactivity_days = i64::try_from(window.as_secs() / SECONDS_PER_DAY)?;
    }

    let store = DirStore::new(&args.output_dir)?;
    let mut runner = PipelineRunner::new(store, config);

    let output = match args.now {
        Some(now) => runner.run_at(&args.roster, &args.monthly, now)?,
        None => runner.run(&args.roster, &args.monthly)?,
    };

    match args.summary {
        SummaryFormat::Text => println!("{}", output),
        SummaryFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
    }

    Ok(if output.flagged() > 0 { 0 } else { 2 })
}
