// ⏱️ Punch Ledger - clock-in / clock-out events and their invariants
//
// Two pair-groups share one log:
// - work:     in  / out
// - vacation: vin / vout
// Within a group, events sorted by time must alternate starting with the "in" kind.

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::PunchError;

/// Rows shown when a mismatch is reported
pub const TAIL_ROWS: usize = 5;

// ============================================================================
// CORE TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PunchKind {
    #[serde(rename = "in")]
    In,
    #[serde(rename = "out")]
    Out,
    #[serde(rename = "vin")]
    VacationIn,
    #[serde(rename = "vout")]
    VacationOut,
}

impl PunchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PunchKind::In => "in",
            PunchKind::Out => "out",
            PunchKind::VacationIn => "vin",
            PunchKind::VacationOut => "vout",
        }
    }

    pub fn group(&self) -> PairGroup {
        match self {
            PunchKind::In | PunchKind::Out => PairGroup::Work,
            PunchKind::VacationIn | PunchKind::VacationOut => PairGroup::Vacation,
        }
    }

    pub fn is_in(&self) -> bool {
        matches!(self, PunchKind::In | PunchKind::VacationIn)
    }
}

impl fmt::Display for PunchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PunchKind {
    type Err = PunchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in" => Ok(PunchKind::In),
            "out" => Ok(PunchKind::Out),
            "vin" => Ok(PunchKind::VacationIn),
            "vout" => Ok(PunchKind::VacationOut),
            other => Err(PunchError::UnknownKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PairGroup {
    Work,
    Vacation,
}

impl PairGroup {
    pub fn name(&self) -> &str {
        match self {
            PairGroup::Work => "work",
            PairGroup::Vacation => "vacation",
        }
    }

    pub fn in_kind(&self) -> PunchKind {
        match self {
            PairGroup::Work => PunchKind::In,
            PairGroup::Vacation => PunchKind::VacationIn,
        }
    }

    pub fn out_kind(&self) -> PunchKind {
        match self {
            PairGroup::Work => PunchKind::Out,
            PairGroup::Vacation => PunchKind::VacationOut,
        }
    }
}

/// One row of the ledger (`io`, `time`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PunchEvent {
    #[serde(rename = "io")]
    pub kind: PunchKind,

    #[serde(with = "ledger_time")]
    pub time: NaiveDateTime,
}

impl PunchEvent {
    pub fn new(kind: PunchKind, time: NaiveDateTime) -> Self {
        PunchEvent { kind, time }
    }
}

/// Timestamp text used in the ledger file
pub mod ledger_time {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const WRITE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
    const READ_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"];

    pub fn format(time: &NaiveDateTime) -> String {
        time.format(WRITE_FORMAT).to_string()
    }

    pub fn parse(text: &str) -> Option<NaiveDateTime> {
        let text = text.trim();
        READ_FORMATS
            .iter()
            .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
    }

    pub fn serialize<S: Serializer>(time: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse(&text).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", text)))
    }
}

// ============================================================================
// TIMESHEET
// ============================================================================

/// In-memory ledger, always sorted by time (stable for equal timestamps)
#[derive(Debug, Clone, PartialEq)]
pub struct Timesheet {
    events: Vec<PunchEvent>,
    track_vacation: bool,
}

impl Timesheet {
    pub fn new(mut events: Vec<PunchEvent>, track_vacation: bool) -> Self {
        events.sort_by_key(|e| e.time);
        Timesheet { events, track_vacation }
    }

    pub fn empty(track_vacation: bool) -> Self {
        Timesheet::new(Vec::new(), track_vacation)
    }

    pub fn events(&self) -> &[PunchEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn tracks_vacation(&self) -> bool {
        self.track_vacation
    }

    /// Groups that are validated and reported
    pub fn groups(&self) -> Vec<PairGroup> {
        if self.track_vacation {
            vec![PairGroup::Work, PairGroup::Vacation]
        } else {
            vec![PairGroup::Work]
        }
    }

    /// Append one event. On any error the timesheet is left untouched.
    pub fn punch(&mut self, kind: PunchKind, time: NaiveDateTime) -> Result<(), PunchError> {
        if kind.group() == PairGroup::Vacation && !self.track_vacation {
            return Err(PunchError::VacationDisabled(kind.to_string()));
        }

        let mut candidate = self.events.clone();
        candidate.push(PunchEvent::new(kind, time));

        let mut seen = HashSet::with_capacity(candidate.len());
        if candidate.iter().any(|e| !seen.insert(e)) {
            return Err(PunchError::Duplicate {
                kind: kind.to_string(),
                time,
            });
        }

        let candidate = Timesheet::new(candidate, self.track_vacation);
        candidate.validate()?;

        tracing::debug!(%kind, %time, rows = candidate.events.len(), "punch accepted");
        *self = candidate;
        Ok(())
    }

    /// Check alternation for every tracked group
    pub fn validate(&self) -> Result<(), PunchError> {
        for group in self.groups() {
            self.validate_group(group)?;
        }
        Ok(())
    }

    fn validate_group(&self, group: PairGroup) -> Result<(), PunchError> {
        let alternates = self
            .group_events(group)
            .enumerate()
            .all(|(i, e)| e.kind == if i % 2 == 0 { group.in_kind() } else { group.out_kind() });

        if alternates {
            Ok(())
        } else {
            Err(PunchError::Mismatch {
                group: group.name().to_string(),
                tail: self.tail(TAIL_ROWS),
            })
        }
    }

    pub fn group_events(&self, group: PairGroup) -> impl Iterator<Item = &PunchEvent> {
        self.events.iter().filter(move |e| e.kind.group() == group)
    }

    /// Last `n` rows rendered like the ledger file
    pub fn tail(&self, n: usize) -> String {
        let start = self.events.len().saturating_sub(n);
        let mut out = String::from("io\ttime");
        for e in &self.events[start..] {
            out.push('\n');
            out.push_str(e.kind.as_str());
            out.push('\t');
            out.push_str(&ledger_time::format(&e.time));
        }
        out
    }

    /// (in, out) pairs for a group. A trailing open "in" is closed at `now`.
    pub fn intervals(&self, group: PairGroup, now: NaiveDateTime) -> Vec<(NaiveDateTime, NaiveDateTime)> {
        let events: Vec<&PunchEvent> = self.group_events(group).collect();
        let mut intervals = Vec::with_capacity(events.len() / 2 + 1);

        for pair in events.chunks(2) {
            match pair {
                [start, end] => intervals.push((start.time, end.time)),
                [open] if open.kind == group.in_kind() => intervals.push((open.time, now)),
                _ => {}
            }
        }
        intervals
    }
}

// ============================================================================
// TIME ARGUMENTS
// ============================================================================

/// Current local time at whole-second precision
pub fn now_local() -> NaiveDateTime {
    let now = chrono::Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

/// Build a punch time from CLI numbers: `[HOUR, MINUTE]` (today) or
/// `[YEAR, MONTH, DAY, HOUR, MINUTE]`. Seconds are always 0.
pub fn time_from_args(parts: &[u32], today: NaiveDate) -> Result<NaiveDateTime, PunchError> {
    let (date, hour, minute) = match parts {
        [hour, minute] => (Some(today), *hour, *minute),
        [year, month, day, hour, minute] => {
            let year = i32::try_from(*year).map_err(|_| PunchError::Usage(format!("Invalid year {}", year)))?;
            (NaiveDate::from_ymd_opt(year, *month, *day), *hour, *minute)
        }
        _ => {
            return Err(PunchError::Usage(format!(
                "Expected HOUR MINUTE or YEAR MONTH DAY HOUR MINUTE, got {} number(s)",
                parts.len()
            )))
        }
    };

    date.and_then(|d| d.and_hms_opt(hour, minute, 0))
        .ok_or_else(|| PunchError::Usage(format!("Invalid date/time: {:?}", parts)))
}

// ============================================================================
// TESTS
// ============================================================================
