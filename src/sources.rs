// 🌐 Sequence Sources - where the three UniProt collections come from
// A source yields raw FASTA records; the merger tags them with their group.

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;

use crate::fasta::{parse_fasta, FastaRecord};

// ============================================================================
// SOURCE GROUP
// ============================================================================

/// Which of the three collections a record came from.
/// The discriminant is the primary sort key: lower wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SourceGroup {
    /// Reference proteome, one canonical protein per gene
    Reference = 0,
    /// Reviewed entries for the organism that are not in the proteome
    Additional = 1,
    /// Isoforms and unreviewed extras for the proteome
    Isoform = 2,
}

impl SourceGroup {
    pub const ALL: [SourceGroup; 3] = [SourceGroup::Reference, SourceGroup::Additional, SourceGroup::Isoform];

    pub fn name(&self) -> &str {
        match self {
            SourceGroup::Reference => "reference",
            SourceGroup::Additional => "additional",
            SourceGroup::Isoform => "isoforms",
        }
    }

    /// Download location for this group
    pub fn url(&self, proteome_id: &str, taxon_id: &str) -> String {
        const PROTEOMES: &str =
            "https://ftp.uniprot.org/pub/databases/uniprot/current_release/knowledgebase/reference_proteomes/Eukaryota";

        match self {
            SourceGroup::Reference => {
                format!("{PROTEOMES}/{proteome_id}/{proteome_id}_{taxon_id}.fasta.gz")
            }
            SourceGroup::Additional => format!(
                "https://rest.uniprot.org/uniprotkb/stream?compressed=true&format=fasta&includeIsoform=true\
                 &query=%28%28organism_id%3A{taxon_id}%29+AND+%28reviewed%3Atrue%29+NOT+%28proteome%3A{proteome_id}%29%29"
            ),
            SourceGroup::Isoform => {
                format!("{PROTEOMES}/{proteome_id}/{proteome_id}_{taxon_id}_additional.fasta.gz")
            }
        }
    }
}

// ============================================================================
// SOURCE TRAIT
// ============================================================================

/// SequenceSource - anything that can produce FASTA records
pub trait SequenceSource {
    /// Fetch and parse all records
    fn read_records(&self) -> Result<Vec<FastaRecord>>;

    /// Where the records come from, for logs and errors
    fn describe(&self) -> String;
}

/// Wrap a reader in a gzip decoder when `gzipped` is set, then parse it
fn parse_maybe_gzipped<R: Read>(reader: R, gzipped: bool) -> Result<Vec<FastaRecord>> {
    let inner: Box<dyn Read + '_> = if gzipped {
        Box::new(GzDecoder::new(reader))
    } else {
        Box::new(reader)
    };
    let mut reader = BufReader::new(inner);

    if !looks_like_fasta(&mut reader)? && !reader.fill_buf()?.is_empty() {
        tracing::warn!("input does not start with a '>' header line");
    }
    parse_fasta(reader)
}

/// FASTA on disk; `.gz` files are decompressed on the fly
pub struct LocalFileSource {
    path: PathBuf,
}

impl LocalFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        LocalFileSource { path: path.into() }
    }

    fn is_gzipped(&self) -> bool {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("gz"))
    }
}

impl SequenceSource for LocalFileSource {
    fn read_records(&self) -> Result<Vec<FastaRecord>> {
        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open file: {}", self.path.display()))?;

        parse_maybe_gzipped(file, self.is_gzipped())
            .with_context(|| format!("Failed to parse FASTA from {}", self.path.display()))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Gzipped FASTA served over HTTP(S)
#[cfg(feature = "fetch")]
pub struct RemoteSource {
    url: String,
}

#[cfg(feature = "fetch")]
impl RemoteSource {
    pub fn new(url: impl Into<String>) -> Self {
        RemoteSource { url: url.into() }
    }
}

#[cfg(feature = "fetch")]
impl SequenceSource for RemoteSource {
    fn read_records(&self) -> Result<Vec<FastaRecord>> {
        let response = reqwest::blocking::get(&self.url)
            .with_context(|| format!("Failed to download {}", self.url))?
            .error_for_status()
            .with_context(|| format!("Server refused {}", self.url))?;

        let body = response
            .bytes()
            .with_context(|| format!("Failed to read response body from {}", self.url))?;
        tracing::debug!(url = %self.url, bytes = body.len(), "downloaded");

        parse_maybe_gzipped(&body[..], true)
            .with_context(|| format!("Failed to parse gzipped FASTA from {}", self.url))
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

// ============================================================================
// FACTORY FUNCTIONS
// ============================================================================

/// Sources for the three groups, in group order, downloading from UniProt
#[cfg(feature = "fetch")]
pub fn remote_sources(proteome_id: &str, taxon_id: &str) -> Vec<(SourceGroup, Box<dyn SequenceSource>)> {
    SourceGroup::ALL
        .iter()
        .map(|group| {
            let source: Box<dyn SequenceSource> = Box::new(RemoteSource::new(group.url(proteome_id, taxon_id)));
            (*group, source)
        })
        .collect()
}

/// Sources for the three groups read from local files (reference, additional, isoforms)
pub fn local_sources(paths: &[PathBuf; 3]) -> Vec<(SourceGroup, Box<dyn SequenceSource>)> {
    SourceGroup::ALL
        .iter()
        .zip(paths.iter())
        .map(|(group, path)| {
            let source: Box<dyn SequenceSource> = Box::new(LocalFileSource::new(path.clone()));
            (*group, source)
        })
        .collect()
}

/// Peek at the first bytes of a reader to see whether it holds FASTA text
pub fn looks_like_fasta<R: BufRead>(reader: &mut R) -> Result<bool> {
    let buf = reader.fill_buf().context("Failed to peek at input")?;
    Ok(buf.first() == Some(&b'>'))
}

// ============================================================================
// TESTS
// ============================================================================
