// 🧬 FASTA format - read and write (header, sequence) records

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};

use crate::error::MergeError;

/// A single FASTA entry. `header` is stored without the leading `>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FastaRecord {
    pub header: String,
    pub sequence: String,
}

impl FastaRecord {
    pub fn new(header: impl Into<String>, sequence: impl Into<String>) -> Self {
        FastaRecord {
            header: header.into(),
            sequence: sequence.into(),
        }
    }
}

// ============================================================================
// READING
// ============================================================================

/// Parse FASTA text into records.
///
/// Every line starting with `>` opens a record; the following lines up to the next
/// header are concatenated into its sequence with all whitespace removed. Blank lines are skipped.
/// Sequence lines that appear before any header have no owner and are dropped.
pub fn parse_fasta<R: BufRead>(reader: R) -> Result<Vec<FastaRecord>> {
    let mut records: Vec<FastaRecord> = Vec::new();
    let mut orphan_lines = 0usize;

    for (line_num, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read FASTA line {}", line_num + 1))?;
        let line = line.trim();

        if let Some(header) = line.strip_prefix('>') {
            records.push(FastaRecord::new(header.trim(), String::new()));
            continue;
        }

        if line.is_empty() {
            continue;
        }

        match records.last_mut() {
            Some(current) => current.sequence.extend(line.split_whitespace()),
            None => orphan_lines += 1,
        }
    }

    if orphan_lines > 0 {
        tracing::warn!(lines = orphan_lines, "dropped sequence lines found before the first header");
    }

    Ok(records)
}

// ============================================================================
// WRITING
// ============================================================================

/// Split `text` into chunks of at most `width` characters (the last may be shorter)
pub fn fold(text: &str, width: usize) -> Vec<&str> {
    if width == 0 {
        return vec![text];
    }

    let mut lines = Vec::with_capacity(text.len() / width + 1);
    let mut rest = text;
    while !rest.is_empty() {
        let cut = rest
            .char_indices()
            .nth(width)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let (line, tail) = rest.split_at(cut);
        lines.push(line);
        rest = tail;
    }
    lines
}

/// Write records as `>header` followed by the sequence folded to `width` columns
pub fn write_fasta<W: Write>(writer: &mut W, records: &[FastaRecord], width: usize) -> Result<()> {
    if width == 0 {
        return Err(MergeError::ZeroWidth.into());
    }

    for record in records {
        writeln!(writer, ">{}", record.header).context("Failed to write FASTA header")?;
        for line in fold(&record.sequence, width) {
            writeln!(writer, "{}", line).context("Failed to write FASTA sequence")?;
        }
    }

    writer.flush().context("Failed to flush FASTA output")?;
    Ok(())
}

/// Why a record cannot be written as-is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordIssue {
    /// Would break the `>header` line framing of the output; the merge stops
    Framing(&'static str),
    /// No usable sequence; the record is left out with a warning
    Unusable(&'static str),
}

impl RecordIssue {
    pub fn reason(&self) -> &'static str {
        match self {
            RecordIssue::Framing(reason) | RecordIssue::Unusable(reason) => reason,
        }
    }
}

/// Check that a record projects cleanly to one header line plus sequence lines
pub fn record_issue(record: &FastaRecord) -> Option<RecordIssue> {
    if record.header.is_empty() {
        Some(RecordIssue::Framing("empty header"))
    } else if record.header.contains(['\n', '\r']) {
        Some(RecordIssue::Framing("header spans multiple lines"))
    } else if record.sequence.is_empty() {
        Some(RecordIssue::Unusable("empty sequence"))
    } else if record.sequence.contains('>') {
        Some(RecordIssue::Unusable("sequence contains '>'"))
    } else if record.sequence.chars().any(char::is_whitespace) {
        Some(RecordIssue::Unusable("sequence contains whitespace"))
    } else {
        None
    }
}

// ============================================================================
// TESTS
// ============================================================================
