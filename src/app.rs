// 🕹️ Punch command flow - resolve arguments, open the ledger, run one command

use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::str::FromStr;

use crate::config::{LedgerLocation, PunchConfig};
use crate::error::PunchError;
use crate::ledger::{open_or_create, save_ledger};
use crate::punch::{time_from_args, PairGroup, PunchKind, Timesheet};
use crate::weeks::{format_duration, WeeklyReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Punch(PunchKind),
    Check,
    Summarize,
}

impl Command {
    pub fn name(&self) -> &str {
        match self {
            Command::Punch(kind) => kind.as_str(),
            Command::Check => "check",
            Command::Summarize => "summarize",
        }
    }
}

impl FromStr for Command {
    type Err = PunchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "check" => Ok(Command::Check),
            "summarize" => Ok(Command::Summarize),
            other => other.parse().map(Command::Punch),
        }
    }
}

/// A fully resolved invocation
#[derive(Debug, Clone, PartialEq)]
pub struct PunchRequest {
    pub command: Command,
    pub ledger: PathBuf,
    /// Explicit punch time; `None` means "now" at execution
    pub time: Option<NaiveDateTime>,
    pub json: bool,
}

/// Turn the raw positional arguments into a request.
/// Returns notes to show the user (ignored arguments and flags).
pub fn resolve_request(
    command: &str,
    args: &[String],
    config: &PunchConfig,
    today: NaiveDate,
    json: bool,
) -> Result<(PunchRequest, Vec<String>)> {
    let command: Command = command.parse()?;
    if let Command::Punch(kind) = command {
        if kind.group() == PairGroup::Vacation && !config.track_vacation {
            return Err(PunchError::VacationDisabled(kind.to_string()).into());
        }
    }

    let (ledger, rest) = match config.ledger_location {
        LedgerLocation::Argument => match args.split_first() {
            Some((path, rest)) => (PathBuf::from(path), rest),
            None => {
                return Err(PunchError::Usage(
                    "Insufficient number of arguments passed. Please specify 'in', 'out', 'vin', 'vout', \
                     'check', or 'summarize' and a path to a timesheet tsv file."
                        .to_string(),
                )
                .into())
            }
        },
        LedgerLocation::Fixed => (config.fixed_ledger_path()?, args),
    };

    let mut notes = Vec::new();
    let time = match command {
        Command::Check | Command::Summarize => {
            if !rest.is_empty() {
                notes.push(format!("Note: Ignoring extra args after '{}'", command.name()));
            }
            None
        }
        Command::Punch(_) if rest.is_empty() => None,
        Command::Punch(_) => {
            let parts = rest
                .iter()
                .map(|a| {
                    a.parse::<u32>()
                        .map_err(|_| PunchError::Usage(format!("Expected a non-negative number, got '{}'", a)))
                })
                .collect::<Result<Vec<u32>, PunchError>>()?;
            Some(time_from_args(&parts, today)?)
        }
    };

    let json = match command {
        Command::Summarize => json,
        _ if json => {
            notes.push(format!("Note: Ignoring --json for '{}'", command.name()));
            false
        }
        _ => false,
    };

    Ok((
        PunchRequest {
            command,
            ledger,
            time,
            json,
        },
        notes,
    ))
}

fn print_current_week<W: Write>(report: &WeeklyReport, sheet: &Timesheet, now: NaiveDateTime, output: &mut W) -> Result<()> {
    match report.current_week(sheet, now) {
        Some(week) => writeln!(
            output,
            "Week of {}: {}",
            week.week_start.format("%Y-%m-%d"),
            format_duration(week.worked)
        )?,
        None => writeln!(output, "No punches recorded yet.")?,
    }
    Ok(())
}

/// Execute one request against the ledger. `now` is the wall clock for this call.
pub fn run_punch<R: BufRead, W: Write>(
    request: &PunchRequest,
    config: &PunchConfig,
    now: NaiveDateTime,
    input: &mut R,
    output: &mut W,
) -> Result<()> {
    let mut sheet = match open_or_create(&request.ledger, config.track_vacation, input, output)? {
        Some(sheet) => sheet,
        None => {
            tracing::info!(ledger = %request.ledger.display(), "ledger creation declined");
            return Ok(());
        }
    };
    let report = WeeklyReport::from_config(config);

    match request.command {
        Command::Check => {
            sheet.validate()?;
            print_current_week(&report, &sheet, now, output)?;
        }
        Command::Summarize => {
            sheet.validate()?;
            let summary = report.summarize(&sheet, now);
            if request.json {
                writeln!(output, "{}", serde_json::to_string_pretty(&summary)?)?;
            } else {
                writeln!(output, "{}", summary.render_text())?;
            }
        }
        Command::Punch(kind) => {
            let time = request.time.unwrap_or(now);
            sheet.punch(kind, time)?;
            print_current_week(&report, &sheet, now, output)?;
            save_ledger(&request.ledger, &sheet)?;
            tracing::info!(%kind, %time, ledger = %request.ledger.display(), "punch recorded");
        }
    }

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        today().and_hms_opt(h, m, 0).unwrap()
    }

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_command_parse() {
        assert_eq!("check".parse::<Command>().unwrap(), Command::Check);
        assert_eq!("vout".parse::<Command>().unwrap(), Command::Punch(PunchKind::VacationOut));
        assert!("clock".parse::<Command>().is_err());
    }

    #[test]
    fn test_resolve_argument_ledger_with_time() {
        let config = PunchConfig::default();
        let (req, notes) = resolve_request("in", &strings(&["t.tsv", "2024", "1", "1", "9", "0"]), &config, today(), false).unwrap();

        assert_eq!(req.command, Command::Punch(PunchKind::In));
        assert_eq!(req.ledger, PathBuf::from("t.tsv"));
        assert_eq!(req.time, Some(at(9, 0)));
        assert!(notes.is_empty());
    }

    #[test]
    fn test_resolve_short_time_is_today() {
        let config = PunchConfig::default();
        let (req, _) = resolve_request("out", &strings(&["t.tsv", "17", "30"]), &config, today(), false).unwrap();
        assert_eq!(req.time, Some(at(17, 30)));
    }

    #[test]
    fn test_resolve_missing_ledger_argument() {
        let err = resolve_request("in", &[], &PunchConfig::default(), today(), false).unwrap_err();
        assert!(matches!(err.downcast_ref::<PunchError>(), Some(PunchError::Usage(_))));
    }

    #[test]
    fn test_resolve_fixed_location() {
        let config = PunchConfig {
            ledger_location: LedgerLocation::Fixed,
            ledger_path: Some(PathBuf::from("/data/hours.tsv")),
            ..PunchConfig::default()
        };
        let (req, _) = resolve_request("in", &strings(&["8", "15"]), &config, today(), false).unwrap();

        assert_eq!(req.ledger, PathBuf::from("/data/hours.tsv"));
        assert_eq!(req.time, Some(at(8, 15)));
    }

    #[test]
    fn test_resolve_check_ignores_extra_args() {
        let (req, notes) = resolve_request("check", &strings(&["t.tsv", "9"]), &PunchConfig::default(), today(), false).unwrap();
        assert_eq!(req.time, None);
        assert_eq!(notes, vec!["Note: Ignoring extra args after 'check'".to_string()]);
    }

    #[test]
    fn test_resolve_json_flag() {
        let config = PunchConfig::default();
        let (req, notes) = resolve_request("summarize", &strings(&["t.tsv"]), &config, today(), true).unwrap();
        assert!(req.json);
        assert!(notes.is_empty());

        let (req, notes) = resolve_request("in", &strings(&["t.tsv"]), &config, today(), true).unwrap();
        assert!(!req.json);
        assert_eq!(notes, vec!["Note: Ignoring --json for 'in'".to_string()]);
    }

    #[test]
    fn test_resolve_rejects_vacation_when_disabled() {
        let config = PunchConfig { track_vacation: false, ..PunchConfig::default() };
        let err = resolve_request("vin", &strings(&["t.tsv"]), &config, today(), false).unwrap_err();
        assert!(matches!(err.downcast_ref::<PunchError>(), Some(PunchError::VacationDisabled(_))));
    }

    #[test]
    fn test_resolve_rejects_non_numeric_time() {
        let err = resolve_request("in", &strings(&["t.tsv", "nine", "0"]), &PunchConfig::default(), today(), false).unwrap_err();
        assert!(err.to_string().contains("'nine'"));
    }

    #[test]
    fn test_run_punch_creates_and_reports() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = dir.path().join("t.tsv");
        let config = PunchConfig::default();
        let mut out = Vec::new();

        let request = PunchRequest { command: Command::Punch(PunchKind::In), ledger: ledger.clone(), time: Some(at(9, 0)), json: false };
        run_punch(&request, &config, at(9, 0), &mut Cursor::new("y\n"), &mut out).unwrap();

        let request = PunchRequest { command: Command::Punch(PunchKind::Out), ledger: ledger.clone(), time: None, json: false };
        run_punch(&request, &config, at(17, 0), &mut Cursor::new(""), &mut out).unwrap();

        let shown = String::from_utf8(out).unwrap();
        assert!(shown.contains("Creating new timesheet"));
        assert!(shown.ends_with("Week of 2023-12-30: 08:00:00\n"));
        assert_eq!(fs::read_to_string(&ledger).unwrap().lines().count(), 3);
    }

    #[test]
    fn test_run_duplicate_leaves_ledger_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = dir.path().join("t.tsv");
        fs::write(&ledger, "io\ttime\nin\t2024-01-01 09:00:00\n").unwrap();
        let before = fs::read_to_string(&ledger).unwrap();

        let request = PunchRequest { command: Command::Punch(PunchKind::In), ledger: ledger.clone(), time: Some(at(9, 0)), json: false };
        let err = run_punch(&request, &PunchConfig::default(), at(10, 0), &mut Cursor::new(""), &mut Vec::new()).unwrap_err();

        assert!(matches!(err.downcast_ref::<PunchError>(), Some(PunchError::Duplicate { .. })));
        assert_eq!(fs::read_to_string(&ledger).unwrap(), before);
    }

    #[test]
    fn test_run_declined_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = dir.path().join("t.tsv");
        let request = PunchRequest { command: Command::Punch(PunchKind::In), ledger: ledger.clone(), time: None, json: false };

        run_punch(&request, &PunchConfig::default(), at(9, 0), &mut Cursor::new("n\n"), &mut Vec::new()).unwrap();
        assert!(!ledger.exists());
    }

    #[test]
    fn test_run_summarize_json() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = dir.path().join("t.tsv");
        fs::write(&ledger, "io\ttime\nin\t2024-01-01 09:00:00\nout\t2024-01-01 17:00:00\n").unwrap();

        let request = PunchRequest { command: Command::Summarize, ledger, time: None, json: true };
        let mut out = Vec::new();
        run_punch(&request, &PunchConfig::default(), at(18, 0), &mut Cursor::new(""), &mut out).unwrap();

        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["total"], "08:00:00");
    }
}
