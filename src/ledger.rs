// 🗄️ Ledger storage - tab-separated `io` / `time` file, rewritten in full on save

use anyhow::{Context, Result};
use std::fs;
use std::io::{BufRead, Write};
use std::path::Path;

use crate::punch::{PunchEvent, Timesheet};

pub fn load_ledger(path: &Path, track_vacation: bool) -> Result<Timesheet> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Failed to open ledger: {}", path.display()))?;

    let mut events = Vec::new();
    for (line_num, result) in rdr.deserialize().enumerate() {
        let event: PunchEvent = result.with_context(|| {
            format!("Failed to parse ledger line {} in {}", line_num + 2, path.display())
        })?;
        events.push(event);
    }

    tracing::debug!(path = %path.display(), rows = events.len(), "ledger loaded");
    Ok(Timesheet::new(events, track_vacation))
}

/// Rewrite the whole ledger. Data goes to a sibling temp file first, then replaces the original.
pub fn save_ledger(path: &Path, sheet: &Timesheet) -> Result<()> {
    let tmp = crate::part_path(path);

    {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .from_path(&tmp)
            .with_context(|| format!("Failed to create {}", tmp.display()))?;

        if sheet.is_empty() {
            wtr.write_record(["io", "time"]).context("Failed to write ledger header")?;
        }
        for event in sheet.events() {
            wtr.serialize(event).context("Failed to write ledger row")?;
        }
        wtr.flush().context("Failed to flush ledger")?;
    }

    fs::rename(&tmp, path).with_context(|| format!("Failed to replace ledger: {}", path.display()))?;
    tracing::debug!(path = %path.display(), rows = sheet.events().len(), "ledger saved");
    Ok(())
}

/// Ask until the answer is `y` or `n`
pub fn confirm_create<R: BufRead, W: Write>(path: &Path, input: &mut R, output: &mut W) -> Result<bool> {
    write!(
        output,
        "Existing timesheet not found. Did you mistype the path? If not, and you would like to create a new \
         timesheet at '{}', enter 'y'. Otherwise enter 'n': ",
        path.display()
    )?;
    output.flush()?;

    loop {
        let mut answer = String::new();
        let read = input.read_line(&mut answer).context("Failed to read answer")?;
        if read == 0 {
            // stdin closed: treat as "no"
            writeln!(output)?;
            return Ok(false);
        }

        match answer.trim() {
            "y" => {
                writeln!(output, "Creating new timesheet at '{}'.", path.display())?;
                return Ok(true);
            }
            "n" => return Ok(false),
            _ => {
                write!(output, "Invalid response. Please enter 'y' or 'n': ")?;
                output.flush()?;
            }
        }
    }
}

/// Load `path`, or offer to start an empty ledger when it does not exist.
/// `None` means the user declined.
pub fn open_or_create<R: BufRead, W: Write>(
    path: &Path,
    track_vacation: bool,
    input: &mut R,
    output: &mut W,
) -> Result<Option<Timesheet>> {
    if path.is_file() {
        return load_ledger(path, track_vacation).map(Some);
    }

    if confirm_create(path, input, output)? {
        Ok(Some(Timesheet::empty(track_vacation)))
    } else {
        Ok(None)
    }
}

// ============================================================================
// TESTS
// ============================================================================
