//! Site Resolver CLI
//!
//! Resolves the address fragments of an asset CSV against a region master
//! CSV and writes timestamped results into the output directory:
//!
//! - `asset_enriched_<ts>.csv`: resolved assets with their internal site IDs
//! - `unmapped_<ts>.csv`: rows that could not be resolved, with the reason
//! - `summary_<ts>.txt`: run accounting
//!
//! Usage:
//!   cargo run --bin site_resolver -- \
//!     --master data/master_city.csv \
//!     --input data/assets.csv \
//!     --config config/site_resolver.yaml \
//!     --parallel
//!
//! Log level follows `RUST_LOG` (default `site_resolver=info`).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tracing::{info, warn};

use site_resolver::csv_io::{read_table, write_resolved, write_unresolved};
use site_resolver::{pipeline, ResolverConfig, TracingSink};

/// Number of generated IDs echoed after a run
const SAMPLE_IDS: usize = 10;

/// Resolve asset address fragments to master regions
#[derive(Parser, Debug)]
#[command(name = "site_resolver")]
#[command(about = "Resolve asset address fragments to regions and assign internal site IDs")]
struct Args {
    /// Master region CSV (City, CityCode, RegionalCode, Province, Region)
    #[arg(long, short = 'm')]
    master: PathBuf,

    /// Asset CSV with facility id and address fragment columns
    #[arg(long, short = 'i')]
    input: PathBuf,

    /// Directory for result files (created if missing)
    #[arg(long, short = 'o', default_value = "data")]
    output_dir: PathBuf,

    /// YAML configuration (column names, matching knobs)
    #[arg(long, short = 'c', env = "SITE_RESOLVER_CONFIG")]
    config: Option<PathBuf>,

    /// Resolve rows in parallel
    #[arg(long)]
    parallel: bool,

    /// Print the run summary as JSON instead of the text report
    #[arg(long)]
    json: bool,
}

fn load_config(path: Option<&Path>) -> Result<ResolverConfig> {
    match path {
        Some(path) => ResolverConfig::from_file(path)
            .with_context(|| format!("Failed to load config file: {}", path.display())),
        None => Ok(ResolverConfig::default()),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "site_resolver=info".into()),
        )
        .init();

    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    config.parallel |= args.parallel;

    let master = read_table(&args.master, "master")
        .with_context(|| format!("Failed to read master CSV: {}", args.master.display()))?;
    let input = read_table(&args.input, "assets")
        .with_context(|| format!("Failed to read input CSV: {}", args.input.display()))?;
    info!(
        master_rows = master.len(),
        input_rows = input.len(),
        "Loaded input tables"
    );

    let outcome = pipeline::run(&master, &input, &config, &TracingSink)
        .context("Resolution run aborted")?;

    std::fs::create_dir_all(&args.output_dir).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            args.output_dir.display()
        )
    })?;
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");

    if !outcome.resolved.is_empty() {
        let path = args
            .output_dir
            .join(format!("asset_enriched_{timestamp}.csv"));
        write_resolved(&path, &outcome.resolved)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(rows = outcome.resolved.len(), path = %path.display(), "Resolved assets written");
    }

    if !outcome.unresolved.is_empty() {
        let path = args.output_dir.join(format!("unmapped_{timestamp}.csv"));
        write_unresolved(&path, &outcome.unresolved)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        warn!(rows = outcome.unresolved.len(), path = %path.display(), "Unmapped assets written");

        for pattern in &outcome.summary.top_unmapped {
            warn!(candidate = %pattern.candidate, count = pattern.count, "Unmapped pattern");
        }
    }

    let summary_path = args.output_dir.join(format!("summary_{timestamp}.txt"));
    std::fs::write(&summary_path, outcome.summary.to_string())
        .with_context(|| format!("Failed to write {}", summary_path.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome.summary)?);
        return Ok(());
    }

    println!("{}", outcome.summary);
    if !outcome.resolved.is_empty() {
        println!("Sample of generated IDs:");
        for identified in outcome.resolved.iter().take(SAMPLE_IDS) {
            println!(
                "  {}  {}  ({})",
                identified.internal_site_id(),
                identified.record.facility_id,
                identified.record.region.raw_name
            );
        }
    }

    Ok(())
}
