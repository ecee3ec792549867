// get-fasta - merge a UniProt reference proteome, extra reviewed entries and isoforms
// into one priority-ordered FASTA file

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use lab_utils::{config, init_logging, local_sources, output_filename, run_merge, MergeConfig};

/// Proteome merger CLI
#[derive(Parser)]
#[command(name = "get-fasta")]
#[command(version)]
#[command(about = "Download, merge and sort UniProt FASTA for a proteome", long_about = None)]
struct Cli {
    /// Proteome id (e.g., "UP000005640")
    proteome_id: String,

    /// Species taxon id (e.g., "9606")
    taxon_id: String,

    /// Drop entries with protein existence level 5
    #[arg(long)]
    drop_dubious: bool,

    /// Seed for the tie-breaker hash
    #[arg(long, conflicts_with = "no_tie_breaker")]
    seed: Option<u64>,

    /// Keep input order for records that tie on every other key
    #[arg(long)]
    no_tie_breaker: bool,

    /// Sequence line width
    #[arg(long)]
    width: Option<usize>,

    /// Output path (default: YYYY-MM-DD_Uniprot_<PROTEOME>_<TAXON>_sorted.fasta)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Read REFERENCE ADDITIONAL ISOFORMS from disk instead of downloading
    #[arg(long, num_args = 3, value_names = ["REFERENCE", "ADDITIONAL", "ISOFORMS"])]
    local: Option<Vec<PathBuf>>,

    /// JSON config file (defaults to $LAB_UTILS_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn merge_config(cli: &Cli) -> Result<MergeConfig> {
    let mut config: MergeConfig = config::load(cli.config.as_deref())?;
    if cli.drop_dubious {
        config.drop_dubious = true;
    }
    if let Some(seed) = cli.seed {
        config.tie_breaker_seed = Some(seed);
    }
    if cli.no_tie_breaker {
        config.tie_breaker_seed = None;
    }
    if let Some(width) = cli.width {
        config.wrap_width = width;
    }
    Ok(config)
}

fn run(cli: Cli) -> Result<()> {
    let config = merge_config(&cli)?;
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| output_filename(chrono::Local::now().date_naive(), &cli.proteome_id, &cli.taxon_id));

    let sources = match &cli.local {
        Some(paths) => {
            let paths = <[PathBuf; 3]>::try_from(paths.clone())
                .map_err(|_| anyhow::anyhow!("--local expects exactly three files"))?;
            local_sources(&paths)
        }
        None => remote(&cli)?,
    };

    let stats = run_merge(&sources, &config, &output)?;
    println!("✓ Wrote {} sequences to {}", stats.output, output.display());
    if stats.duplicates_dropped > 0 || stats.dubious_dropped > 0 || stats.invalid_dropped > 0 {
        println!(
            "  ({} duplicates, {} dubious and {} empty entries dropped)",
            stats.duplicates_dropped, stats.dubious_dropped, stats.invalid_dropped
        );
    }
    Ok(())
}

#[cfg(feature = "fetch")]
fn remote(cli: &Cli) -> Result<Vec<(lab_utils::SourceGroup, Box<dyn lab_utils::SequenceSource>)>> {
    Ok(lab_utils::remote_sources(&cli.proteome_id, &cli.taxon_id))
}

#[cfg(not(feature = "fetch"))]
fn remote(_cli: &Cli) -> Result<Vec<(lab_utils::SourceGroup, Box<dyn lab_utils::SequenceSource>)>> {
    anyhow::bail!("Downloads not available. Rebuild with: cargo build --features fetch, or pass --local")
}

fn main() -> ExitCode {
    init_logging("info");

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}
