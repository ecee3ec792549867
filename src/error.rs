// ❗ Domain errors
// Typed failures for the punch ledger and the sequence merger.
// Everything else (I/O, network, parsing) travels as anyhow::Error with context.

use chrono::NaiveDateTime;

/// Errors raised while mutating or reading a punch ledger.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PunchError {
    #[error("Invalid punch. Creates duplicate row: {kind}\t{time}")]
    Duplicate { kind: String, time: NaiveDateTime },

    /// Alternation broken inside a pair-group. `tail` holds the last rows of the log.
    #[error("Punch mismatch in {group} punches:\n{tail}")]
    Mismatch { group: String, tail: String },

    #[error("Invalid punch type '{0}'. Please pass 'in', 'out', 'vin', 'vout', 'check', or 'summarize'.")]
    UnknownKind(String),

    #[error("Vacation tracking is disabled; '{0}' is not accepted")]
    VacationDisabled(String),

    #[error("{0}")]
    Usage(String),
}

/// Errors raised by the sequence merger before anything is written.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    /// `index` is the record's position within its source, counting from 1
    #[error("Invalid {group} record #{index} ('{header}'): {reason}")]
    InvalidRecord {
        group: String,
        index: usize,
        header: String,
        reason: String,
    },

    #[error("Wrap width must be at least 1")]
    ZeroWidth,
}
