//! cospend CLI - Co-spend address clustering over a transaction event log.

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use cospend_cluster::{
    export_to_path, read_events_parallel, replay, ClusterConfig, ClusterEngine, EventReader,
    ExportFormat, MembershipMode, MergePolicy, ReplaySummary,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// JSON output for clustering results.
#[derive(Serialize)]
struct JsonOutput {
    input: String,
    output: Option<String>,
    events: u64,
    blocks: u64,
    degenerate_events: u64,
    addresses: usize,
    clusters: usize,
    largest_cluster: Option<u64>,
    largest_cluster_size: usize,
    elapsed_secs: f64,
}

/// File format for the exported partition.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
enum Format {
    /// Auto-detect from file extension
    Auto,
    /// `address,cluster` CSV
    Csv,
    /// JSON Lines
    Jsonl,
}

/// Survivor policy on merge.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
enum Policy {
    /// Larger cluster survives
    Size,
    /// First input's cluster survives
    Anchor,
}

/// Membership enumeration strategy.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
enum Membership {
    /// Scan all addresses per query
    OnDemand,
    /// Maintain member lists during merges
    Incremental,
}

/// Cluster addresses by common input ownership.
///
/// Every address spent together as an input of one transaction is assigned to
/// the same cluster. Reads a JSONL event log and writes the final partition.
#[derive(Parser, Debug)]
#[command(name = "cospend")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input event log (JSONL).
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Output file for address,cluster assignments.
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Output format (auto-detect from file extension by default).
    #[arg(long, value_enum, default_value = "auto")]
    format: Format,

    /// Which cluster id survives a merge.
    #[arg(long, value_enum)]
    policy: Option<Policy>,

    /// How cluster membership is tracked.
    #[arg(long, value_enum)]
    membership: Option<Membership>,

    /// Blocks between progress reports (0 disables).
    #[arg(long)]
    report_interval: Option<u64>,

    /// JSON config file; command-line flags override it.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Decode the whole log in parallel before clustering.
    #[arg(long)]
    parallel_decode: bool,

    /// Print statistics only, don't write output.
    #[arg(long)]
    stats_only: bool,

    /// Verbose output.
    #[arg(short, long)]
    verbose: bool,

    /// Output results as JSON.
    #[arg(long)]
    json: bool,

    /// Show progress spinner.
    #[arg(long)]
    progress: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Create a spinner for indeterminate progress.
fn create_spinner(msg: &str) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    Ok(pb)
}

/// Install the tracing subscriber. `RUST_LOG` overrides the default level.
fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Determine the effective export format for a file path.
fn detect_format(path: &Path, explicit_format: Format) -> Result<ExportFormat, String> {
    match explicit_format {
        Format::Auto => ExportFormat::from_path(path).ok_or_else(|| {
            format!(
                "Cannot detect format from file extension: {}",
                path.display()
            )
        }),
        Format::Csv => Ok(ExportFormat::Csv),
        Format::Jsonl => Ok(ExportFormat::Jsonl),
    }
}

/// Merge the config file (if any) with command-line overrides.
fn build_config(args: &Cli) -> Result<ClusterConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => ClusterConfig::from_json_file(path)?,
        None => ClusterConfig::default(),
    };

    if let Some(policy) = args.policy {
        config.merge_policy = match policy {
            Policy::Size => MergePolicy::BySize,
            Policy::Anchor => MergePolicy::Anchor,
        };
    }
    if let Some(membership) = args.membership {
        config.membership = match membership {
            Membership::OnDemand => MembershipMode::OnDemand,
            Membership::Incremental => MembershipMode::Incremental,
        };
    }
    if let Some(interval) = args.report_interval {
        config.report_interval = interval;
    }

    Ok(config)
}

fn run(args: &Cli, input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();

    let export_format = match &args.output {
        Some(path) if !args.stats_only => Some(detect_format(path, args.format)?),
        _ => None,
    };

    let config = build_config(args)?;
    let mut engine = ClusterEngine::new(config);

    let pb = if args.progress && !args.json {
        Some(create_spinner("Clustering addresses...")?)
    } else {
        None
    };

    let summary: ReplaySummary = if args.parallel_decode {
        let events = read_events_parallel(input)?;
        replay(events.into_iter().map(Ok), &mut engine)?
    } else {
        replay(EventReader::open(input)?, &mut engine)?
    };

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    if let (Some(path), Some(format)) = (&args.output, export_format) {
        let written = export_to_path(&mut engine, path, format)?;
        tracing::info!(
            addresses = written.addresses,
            clusters = written.clusters,
            path = %path.display(),
            "partition exported"
        );
    }

    let stats = engine.stats();
    let largest = engine.largest_cluster();
    let elapsed = start.elapsed().as_secs_f64();

    if args.json {
        let output = JsonOutput {
            input: input.display().to_string(),
            output: args.output.as_ref().map(|p| p.display().to_string()),
            events: summary.events,
            blocks: summary.blocks,
            degenerate_events: summary.degenerate_events,
            addresses: stats.address_count,
            clusters: stats.cluster_count,
            largest_cluster: largest.map(|(id, _)| id.get()),
            largest_cluster_size: largest.map_or(0, |(_, size)| size),
            elapsed_secs: elapsed,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("Clustering complete:");
        println!("  Events:          {}", summary.events);
        println!("  Blocks:          {}", summary.blocks);
        println!("  Degenerate:      {}", summary.degenerate_events);
        println!("  Addresses:       {}", stats.address_count);
        println!("  Clusters:        {}", stats.cluster_count);
        if let Some((id, size)) = largest {
            println!("  Largest cluster: {id} ({size} addresses)");
        }
        println!("  Time:            {elapsed:.2}s");
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();

    // Handle completions subcommand
    if let Some(Commands::Completions { shell }) = args.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "cospend", &mut io::stdout());
        return Ok(());
    }

    let input = args.input.clone().ok_or("Input file is required")?;

    if !args.stats_only && args.output.is_none() {
        eprintln!("Error: output file required (use -o/--output or --stats-only)");
        std::process::exit(1);
    }

    init_logging(args.verbose);

    if args.verbose && !args.json {
        eprintln!("Configuration:");
        eprintln!("  Input: {}", input.display());
        if let Some(ref output) = args.output {
            eprintln!("  Output: {}", output.display());
        }
        eprintln!("  Parallel decode: {}", args.parallel_decode);
        eprintln!();
    }

    if let Err(e) = run(&args, &input) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    Ok(())
}
