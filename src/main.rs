// punch - clock in/out against a tab-separated timesheet

use anyhow::Result;
use clap::Parser;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use lab_utils::punch::now_local;
use lab_utils::{config, init_logging, resolve_request, run_punch, PunchConfig};

/// Punch clock CLI
#[derive(Parser)]
#[command(name = "punch")]
#[command(version)]
#[command(about = "Record work/vacation punches and summarize weekly hours", long_about = None)]
struct Cli {
    /// One of: in, out, vin, vout, check, summarize
    command: String,

    /// [LEDGER_PATH] [HOUR MINUTE | YEAR MONTH DAY HOUR MINUTE]
    args: Vec<String>,

    /// JSON config file (defaults to $LAB_UTILS_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print `summarize` output as JSON
    #[arg(long)]
    json: bool,
}

fn run(cli: Cli) -> Result<()> {
    let config: PunchConfig = config::load(cli.config.as_deref())?;
    let now = now_local();

    let (request, notes) = resolve_request(&cli.command, &cli.args, &config, now.date(), cli.json)?;
    for note in notes {
        println!("{}", note);
    }

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();
    run_punch(&request, &config, now, &mut input, &mut output)
}

fn main() -> ExitCode {
    init_logging("warn");

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}
