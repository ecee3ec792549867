// Lab Utils - Core Library
// Shared by the `punch` time tracker and the `get-fasta` proteome merger

pub mod config;
pub mod error;

// Sequence merger
pub mod fasta;
pub mod sources;
pub mod proteome;
pub mod merger;

// Punch ledger
pub mod punch;
pub mod ledger;
pub mod weeks;
pub mod app;

// Re-export commonly used types
pub use config::{LedgerLocation, MergeConfig, PunchConfig};
pub use error::{MergeError, PunchError};
pub use fasta::{fold, parse_fasta, write_fasta, FastaRecord};
pub use sources::{local_sources, LocalFileSource, SequenceSource, SourceGroup};
#[cfg(feature = "fetch")]
pub use sources::{remote_sources, RemoteSource};
pub use proteome::{MergeStats, ProteomeMerger, RankedRecord};
pub use merger::{output_filename, run_merge};
pub use punch::{PairGroup, PunchEvent, PunchKind, Timesheet};
pub use ledger::{load_ledger, save_ledger};
pub use weeks::{format_duration, Summary, WeeklyReport};
pub use app::{resolve_request, run_punch, Command, PunchRequest};

/// Sibling `<path>.part` file that output is staged in before replacing `path`
pub(crate) fn part_path(path: &std::path::Path) -> std::path::PathBuf {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".part");
    std::path::PathBuf::from(tmp)
}

/// Install the stderr log subscriber. `RUST_LOG` overrides `default_level`.
pub fn init_logging(default_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
