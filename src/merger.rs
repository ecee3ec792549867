// 📦 Merge pipeline - sources → screen → rank → dedup → FASTA file

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::config::MergeConfig;
use crate::error::MergeError;
use crate::fasta::{record_issue, write_fasta, FastaRecord, RecordIssue};
use crate::proteome::{MergeStats, ProteomeMerger};
use crate::sources::{SequenceSource, SourceGroup};

/// `YYYY-MM-DD_Uniprot_<PROTEOME>_<TAXON>_sorted.fasta`
pub fn output_filename(date: NaiveDate, proteome_id: &str, taxon_id: &str) -> PathBuf {
    PathBuf::from(format!(
        "{}_Uniprot_{}_{}_sorted.fasta",
        date.format("%Y-%m-%d"),
        proteome_id,
        taxon_id
    ))
}

/// Read every source in order; the first failure aborts
pub fn collect_sources(
    sources: &[(SourceGroup, Box<dyn SequenceSource>)],
) -> Result<Vec<(SourceGroup, Vec<FastaRecord>)>> {
    let mut collected = Vec::with_capacity(sources.len());
    for (group, source) in sources {
        tracing::info!(group = group.name(), source = %source.describe(), "reading sequences");
        let records = source
            .read_records()
            .with_context(|| format!("Failed to load {} sequences", group.name()))?;
        tracing::info!(group = group.name(), records = records.len(), "parsed");
        collected.push((*group, records));
    }
    Ok(collected)
}

/// Drop records without a usable sequence. A record that would break the output
/// framing fails the merge. Returns the number of records dropped.
pub fn screen_records(collected: &mut [(SourceGroup, Vec<FastaRecord>)]) -> Result<usize, MergeError> {
    let mut dropped = 0;
    for (group, records) in collected.iter_mut() {
        let mut position = 0;
        let mut failure = None;
        records.retain(|record| {
            position += 1;
            match record_issue(record) {
                None => true,
                Some(RecordIssue::Unusable(reason)) => {
                    tracing::warn!(group = group.name(), record = position, header = %record.header, reason, "record skipped");
                    dropped += 1;
                    false
                }
                Some(RecordIssue::Framing(reason)) => {
                    failure.get_or_insert(MergeError::InvalidRecord {
                        group: group.name().to_string(),
                        index: position,
                        header: record.header.clone(),
                        reason: reason.to_string(),
                    });
                    true
                }
            }
        });
        if let Some(err) = failure {
            return Err(err);
        }
    }
    Ok(dropped)
}

/// Run the full merge and write `output`.
/// The file only appears once it is complete; nothing is created on failure.
pub fn run_merge(
    sources: &[(SourceGroup, Box<dyn SequenceSource>)],
    config: &MergeConfig,
    output: &Path,
) -> Result<MergeStats> {
    let mut collected = collect_sources(sources)?;
    let invalid_dropped = screen_records(&mut collected)?;

    let merger = ProteomeMerger::from_config(config);
    let (records, mut stats) = merger.merge(collected);
    stats.input += invalid_dropped;
    stats.invalid_dropped = invalid_dropped;
    tracing::info!(
        input = stats.input,
        invalid_dropped = stats.invalid_dropped,
        dubious_dropped = stats.dubious_dropped,
        duplicates_dropped = stats.duplicates_dropped,
        output = stats.output,
        "merged"
    );

    let tmp = crate::part_path(output);
    if let Err(e) = write_output(&tmp, &records, config.wrap_width) {
        let _ = fs::remove_file(&tmp);
        return Err(e.context(format!("Failed to write {}", output.display())));
    }
    fs::rename(&tmp, output).with_context(|| format!("Failed to create output file: {}", output.display()))?;

    Ok(stats)
}

fn write_output(path: &Path, records: &[FastaRecord], width: usize) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write_fasta(&mut writer, records, width)
}

// ============================================================================
// TESTS
// ============================================================================
