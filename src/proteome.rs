// 🔀 Proteome Merge Engine - rank, order and deduplicate sequence records
//
// Priority (first wins):
// 1. Reference proteome, then additional reviewed proteins, then isoforms
// 2. Swiss-Prot (sp) before TrEMBL (tr)
// 3. Better protein existence level first ("1" .. "5", missing = "6")
// 4. Canonical before isoform
// 5. Longer before shorter
// 6. Seeded hash of the record, so ties do not depend on input order

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cmp::{Ordering, Reverse};
use std::collections::HashSet;

use crate::config::MergeConfig;
use crate::fasta::FastaRecord;
use crate::sources::SourceGroup;

/// Existence rank given to headers without a ` PE=<d> ` field
pub const MISSING_EXISTENCE_RANK: &str = "6";

/// Existence level UniProt uses for dubious sequences
pub const DUBIOUS_EXISTENCE_RANK: &str = "5";

// ============================================================================
// HEADER FIELDS
// ============================================================================

/// Database tag: text before the first `|` (`sp`, `tr`)
pub fn database_tag(header: &str) -> &str {
    header.split('|').next().unwrap_or(header)
}

/// Digit from the first ` PE=<d> ` occurrence, or `"6"`
pub fn existence_rank(header: &str) -> String {
    let bytes = header.as_bytes();
    let mut from = 0;

    while let Some(pos) = header[from..].find(" PE=") {
        let digit_at = from + pos + 4;
        if let (Some(d), Some(b' ')) = (bytes.get(digit_at), bytes.get(digit_at + 1)) {
            if d.is_ascii_digit() {
                return (*d as char).to_string();
            }
        }
        from += pos + 1;
    }

    MISSING_EXISTENCE_RANK.to_string()
}

/// Header mentions an isoform
pub fn is_isoform(header: &str) -> bool {
    header.contains("Isoform")
}

/// Accession used to collapse duplicates across sources.
///
/// `sp|P12345-2|NAME_HUMAN ...` → `P12345-2`; headers without `|` fall back to
/// their first whitespace-delimited token.
pub fn identity(header: &str) -> &str {
    let mut fields = header.split('|');
    match (fields.next(), fields.next()) {
        (Some(_), Some(accession)) if !accession.is_empty() => accession,
        _ => header.split_whitespace().next().unwrap_or(header),
    }
}

/// Deterministic tie-breaker: first 8 bytes of SHA-256(seed, header, sequence)
pub fn tie_breaker(seed: u64, record: &FastaRecord) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(seed.to_le_bytes());
    hasher.update(record.header.as_bytes());
    hasher.update(b"\n");
    hasher.update(record.sequence.as_bytes());
    let digest = hasher.finalize();

    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix)
}

// ============================================================================
// RANKED RECORD
// ============================================================================

/// A record plus the derived fields used for ordering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedRecord {
    pub record: FastaRecord,
    pub group: SourceGroup,
    pub database: String,
    pub existence_rank: String,
    pub is_isoform: bool,
    pub length: usize,
    pub tie_breaker: Option<u64>,
}

impl RankedRecord {
    pub fn new(record: FastaRecord, group: SourceGroup, seed: Option<u64>) -> Self {
        RankedRecord {
            group,
            database: database_tag(&record.header).to_string(),
            existence_rank: existence_rank(&record.header),
            is_isoform: is_isoform(&record.header),
            length: record.sequence.chars().count(),
            tie_breaker: seed.map(|s| tie_breaker(s, &record)),
            record,
        }
    }

    pub fn is_dubious(&self) -> bool {
        self.existence_rank == DUBIOUS_EXISTENCE_RANK
    }

    /// Composite key; `Reverse` on length gives longest-first
    #[allow(clippy::type_complexity)]
    fn sort_key(&self) -> (SourceGroup, &str, &str, bool, Reverse<usize>, Option<u64>) {
        (
            self.group,
            self.database.as_str(),
            self.existence_rank.as_str(),
            self.is_isoform,
            Reverse(self.length),
            self.tie_breaker,
        )
    }

    pub fn priority_cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

// ============================================================================
// MERGE ENGINE
// ============================================================================

/// Counts reported after a merge
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeStats {
    pub input: usize,
    pub invalid_dropped: usize,
    pub dubious_dropped: usize,
    pub duplicates_dropped: usize,
    pub output: usize,
}

pub struct ProteomeMerger {
    /// Remove existence level 5 records before sorting
    pub drop_dubious: bool,

    /// Seed for the tie-breaker (None = stable input order on ties)
    pub tie_breaker_seed: Option<u64>,
}

impl ProteomeMerger {
    /// Engine with default policy
    pub fn new() -> Self {
        ProteomeMerger::from_config(&MergeConfig::default())
    }

    pub fn from_config(config: &MergeConfig) -> Self {
        ProteomeMerger {
            drop_dubious: config.drop_dubious,
            tie_breaker_seed: config.tie_breaker_seed,
        }
    }

    /// Derive sort fields for every record of every group
    pub fn rank(&self, sources: Vec<(SourceGroup, Vec<FastaRecord>)>) -> Vec<RankedRecord> {
        sources
            .into_iter()
            .flat_map(|(group, records)| {
                let seed = self.tie_breaker_seed;
                records.into_iter().map(move |r| RankedRecord::new(r, group, seed))
            })
            .collect()
    }

    /// Sort by priority (stable) and keep the first record per identity
    pub fn merge(&self, sources: Vec<(SourceGroup, Vec<FastaRecord>)>) -> (Vec<FastaRecord>, MergeStats) {
        let mut ranked = self.rank(sources);
        let mut stats = MergeStats {
            input: ranked.len(),
            ..MergeStats::default()
        };

        if self.drop_dubious {
            let before = ranked.len();
            ranked.retain(|r| !r.is_dubious());
            stats.dubious_dropped = before - ranked.len();
        }

        ranked.sort_by(|a, b| a.priority_cmp(b));

        let mut seen: HashSet<String> = HashSet::with_capacity(ranked.len());
        let mut merged = Vec::with_capacity(ranked.len());
        for r in ranked {
            if seen.insert(identity(&r.record.header).to_string()) {
                merged.push(r.record);
            } else {
                tracing::debug!(header = %r.record.header, group = r.group.name(), "dropping lower-priority duplicate");
                stats.duplicates_dropped += 1;
            }
        }

        stats.output = merged.len();
        (merged, stats)
    }
}

impl Default for ProteomeMerger {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(header: &str, sequence: &str) -> FastaRecord {
        FastaRecord::new(header, sequence)
    }

    fn headers(records: &[FastaRecord]) -> Vec<&str> {
        records.iter().map(|r| r.header.as_str()).collect()
    }

    #[test]
    fn test_database_tag() {
        assert_eq!(database_tag("sp|P1|A_HUMAN x"), "sp");
        assert_eq!(database_tag("tr|Q1|B_HUMAN"), "tr");
        assert_eq!(database_tag("plain header"), "plain header");
    }

    #[test]
    fn test_existence_rank() {
        assert_eq!(existence_rank("sp|P1|A OS=Homo sapiens OX=9606 GN=A PE=1 SV=2"), "1");
        assert_eq!(existence_rank("tr|Q1|B OS=Homo sapiens PE=5 SV=1"), "5");
        assert_eq!(existence_rank("sp|P1-2|A Isoform 2 of Protein A OS=Homo sapiens"), "6");
        // Needs a trailing space after the digit
        assert_eq!(existence_rank("sp|P1|A PE=1"), "6");
        assert_eq!(existence_rank("sp|P1|A PE=x PE=3 SV=1"), "3");
    }

    #[test]
    fn test_identity() {
        assert_eq!(identity("sp|P12345|NAME_HUMAN Protein"), "P12345");
        assert_eq!(identity("sp|P12345-2|NAME_HUMAN Isoform 2"), "P12345-2");
        assert_eq!(identity("seq1 some description"), "seq1");
    }

    #[test]
    fn test_tie_breaker_depends_on_seed_and_content() {
        let r = rec("sp|P1|A", "MKT");
        assert_eq!(tie_breaker(0, &r), tie_breaker(0, &r));
        assert_ne!(tie_breaker(0, &r), tie_breaker(1, &r));
        assert_ne!(tie_breaker(0, &r), tie_breaker(0, &rec("sp|P1|A", "MKV")));
    }

    #[test]
    fn test_three_disjoint_sources_keep_group_order() {
        let merger = ProteomeMerger::new();
        let a = rec("tr|Q3|C PE=1 ", "M");
        let b = rec("sp|P2|B PE=4 ", "MKTAYIAK");
        let c = rec("sp|P1|A PE=1 ", "MKTAYIAKQRQISFVK");

        // Concatenation order differs from group order
        let (merged, stats) = merger.merge(vec![
            (SourceGroup::Isoform, vec![c.clone()]),
            (SourceGroup::Reference, vec![a.clone()]),
            (SourceGroup::Additional, vec![b.clone()]),
        ]);

        assert_eq!(stats.output, 3);
        assert_eq!(merged, vec![a, b, c]);
    }

    #[test]
    fn test_sort_within_group() {
        let merger = ProteomeMerger::new();
        let records = vec![
            rec("tr|T1|X PE=1 ", "MMMMMMMM"),
            rec("sp|S3|Z Isoform 2 of Z", "MMMMMMMMMMMM"),
            rec("sp|S2|Y PE=2 ", "MMMMMMMMMM"),
            rec("sp|S1|W PE=1 ", "MM"),
            rec("sp|S4|V PE=1 ", "MMMMMM"),
        ];

        let (merged, _) = merger.merge(vec![(SourceGroup::Reference, records)]);
        assert_eq!(
            headers(&merged),
            vec![
                "sp|S4|V PE=1 ",          // sp, PE 1, longer
                "sp|S1|W PE=1 ",          // sp, PE 1, shorter
                "sp|S2|Y PE=2 ",          // sp, PE 2
                "sp|S3|Z Isoform 2 of Z", // sp, PE missing (6)
                "tr|T1|X PE=1 ",          // tr after sp
            ]
        );
    }

    #[test]
    fn test_isoform_flag_breaks_rank_ties() {
        let merger = ProteomeMerger::new();
        let records = vec![
            rec("sp|P1-2|A Isoform 2 of A PE=1 ", "MMMMMMMMMM"),
            rec("sp|P1|A PE=1 ", "MM"),
        ];

        let (merged, _) = merger.merge(vec![(SourceGroup::Isoform, records)]);
        assert_eq!(merged[0].header, "sp|P1|A PE=1 ");
    }

    #[test]
    fn test_duplicate_identity_keeps_highest_priority() {
        let merger = ProteomeMerger::new();
        let (merged, stats) = merger.merge(vec![
            (SourceGroup::Isoform, vec![rec("sp|P1|A PE=1 ", "MKTAYIAKQR")]),
            (SourceGroup::Reference, vec![rec("sp|P1|A PE=1 ", "MKT")]),
        ]);

        assert_eq!(merged, vec![rec("sp|P1|A PE=1 ", "MKT")]);
        assert_eq!(stats.duplicates_dropped, 1);
        assert_eq!(stats.input, 2);
    }

    #[test]
    fn test_drop_dubious_policy() {
        let records = vec![rec("tr|Q1|A PE=5 ", "MK"), rec("tr|Q2|B PE=3 ", "MK")];

        let keep = ProteomeMerger::new().merge(vec![(SourceGroup::Additional, records.clone())]);
        assert_eq!(keep.0.len(), 2);

        let drop = ProteomeMerger { drop_dubious: true, tie_breaker_seed: Some(0) }
            .merge(vec![(SourceGroup::Additional, records)]);
        assert_eq!(headers(&drop.0), vec!["tr|Q2|B PE=3 "]);
        assert_eq!(drop.1.dubious_dropped, 1);
    }

    #[test]
    fn test_order_is_independent_of_input_order() {
        let merger = ProteomeMerger::new();
        let records: Vec<FastaRecord> = (0..20)
            .map(|i| rec(&format!("tr|Q{i}|N{i} PE=2 "), "MKTA"))
            .collect();
        let mut reversed = records.clone();
        reversed.reverse();

        let (forward, _) = merger.merge(vec![(SourceGroup::Reference, records)]);
        let (backward, _) = merger.merge(vec![(SourceGroup::Reference, reversed)]);
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_without_tie_breaker_ties_keep_input_order() {
        let merger = ProteomeMerger { drop_dubious: false, tie_breaker_seed: None };
        let records = vec![rec("tr|Q2|B PE=2 ", "MK"), rec("tr|Q1|A PE=2 ", "MK")];

        let (merged, _) = merger.merge(vec![(SourceGroup::Reference, records)]);
        assert_eq!(headers(&merged), vec!["tr|Q2|B PE=2 ", "tr|Q1|A PE=2 "]);
    }
}
