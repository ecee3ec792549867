// 📅 Weekly Aggregation - worked time per week bucket
//
// An interval counts toward the week that contains its start ("in") time.
// Weeks end on a configurable weekday and are labeled by their first day.
// Weeks between the first and last punched week are reported even when empty.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::config::PunchConfig;
use crate::punch::{PairGroup, Timesheet};

// ============================================================================
// FORMATTING
// ============================================================================

/// Signed `HH:MM:SS`; hours are not wrapped at 24 and sub-second parts truncate
pub fn format_duration(d: Duration) -> String {
    let total = d.num_seconds();
    let sign = if total < 0 { "-" } else { "" };
    let secs = total.unsigned_abs();
    format!("{}{:02}:{:02}:{:02}", sign, secs / 3600, secs % 3600 / 60, secs % 60)
}

fn serialize_hms<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_duration(*d))
}

fn serialize_opt_hms<S: Serializer>(d: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
    match d {
        Some(d) => serializer.serialize_some(&format_duration(*d)),
        None => serializer.serialize_none(),
    }
}

fn sum(durations: impl IntoIterator<Item = Duration>) -> Duration {
    durations.into_iter().fold(Duration::zero(), |acc, d| acc + d)
}

// ============================================================================
// WEEK CALENDAR
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekCalendar {
    ends_on: Weekday,
}

impl WeekCalendar {
    pub fn new(ends_on: Weekday) -> Self {
        WeekCalendar { ends_on }
    }

    pub fn starts_on(&self) -> Weekday {
        self.ends_on.succ()
    }

    /// First day of the bucket containing `date`
    pub fn week_start(&self, date: NaiveDate) -> NaiveDate {
        let offset = (date.weekday().num_days_from_monday() + 7 - self.starts_on().num_days_from_monday()) % 7;
        date - Duration::days(i64::from(offset))
    }

    /// Sum interval lengths per week, filling gaps between the first and last week with zero
    pub fn weekly_totals(&self, intervals: &[(NaiveDateTime, NaiveDateTime)]) -> Vec<(NaiveDate, Duration)> {
        let mut buckets: BTreeMap<NaiveDate, Duration> = BTreeMap::new();
        for (start, end) in intervals {
            let week = self.week_start(start.date());
            *buckets.entry(week).or_insert_with(Duration::zero) += *end - *start;
        }

        let (first, last) = match (buckets.keys().next(), buckets.keys().next_back()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Vec::new(),
        };

        let mut weeks = Vec::new();
        let mut week = first;
        while week <= last {
            weeks.push((week, buckets.get(&week).copied().unwrap_or_else(Duration::zero)));
            week += Duration::days(7);
        }
        weeks
    }
}

// ============================================================================
// SUMMARY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekRow {
    pub week_start: NaiveDate,
    #[serde(serialize_with = "serialize_hms")]
    pub worked: Duration,
}

/// Everything `summarize` reports
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    /// Work time per week
    pub weeks: Vec<WeekRow>,

    #[serde(serialize_with = "serialize_hms")]
    pub total: Duration,

    #[serde(serialize_with = "serialize_opt_hms")]
    pub vacation_total: Option<Duration>,

    /// Mean of combined work + vacation over completed weeks (all but the last)
    #[serde(serialize_with = "serialize_opt_hms")]
    pub weekly_mean: Option<Duration>,

    /// Combined time over completed weeks minus the expected weekly hours
    #[serde(serialize_with = "serialize_hms")]
    pub balance: Duration,
}

impl Summary {
    /// Most recent week, as shown by `check`
    pub fn current_week(&self) -> Option<&WeekRow> {
        self.weeks.last()
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for row in &self.weeks {
            let _ = writeln!(out, "{}    {}", row.week_start.format("%Y-%m-%d"), format_duration(row.worked));
        }
        let _ = writeln!(out, "Total: {}", format_duration(self.total));
        if let Some(vacation) = self.vacation_total {
            let _ = writeln!(out, "Vacation total: {}", format_duration(vacation));
        }
        let mean = self.weekly_mean.map(format_duration).unwrap_or_else(|| "n/a".to_string());
        let _ = writeln!(out, "Weekly mean: {}", mean);
        let _ = write!(out, "Total lack/excess: {}", format_duration(self.balance));
        out
    }
}

/// Aggregates a timesheet into weekly figures
pub struct WeeklyReport {
    calendar: WeekCalendar,
    weekly_hours: i64,
}

impl WeeklyReport {
    pub fn new(ends_on: Weekday, weekly_hours: i64) -> Self {
        WeeklyReport {
            calendar: WeekCalendar::new(ends_on),
            weekly_hours,
        }
    }

    pub fn from_config(config: &PunchConfig) -> Self {
        WeeklyReport::new(config.week_ends_on, config.weekly_hours)
    }

    /// Work time per week; open intervals run until `now`
    pub fn work_weeks(&self, sheet: &Timesheet, now: NaiveDateTime) -> Vec<WeekRow> {
        self.calendar
            .weekly_totals(&sheet.intervals(PairGroup::Work, now))
            .into_iter()
            .map(|(week_start, worked)| WeekRow { week_start, worked })
            .collect()
    }

    /// Most recent work week only
    pub fn current_week(&self, sheet: &Timesheet, now: NaiveDateTime) -> Option<WeekRow> {
        self.work_weeks(sheet, now).pop()
    }

    pub fn summarize(&self, sheet: &Timesheet, now: NaiveDateTime) -> Summary {
        let weeks = self.work_weeks(sheet, now);
        let total = sum(weeks.iter().map(|w| w.worked));

        let mut combined_intervals = sheet.intervals(PairGroup::Work, now);
        let vacation_total = if sheet.tracks_vacation() {
            let vacation = sheet.intervals(PairGroup::Vacation, now);
            let vacation_sum = sum(vacation.iter().map(|(s, e)| *e - *s));
            combined_intervals.extend(vacation);
            Some(vacation_sum)
        } else {
            None
        };

        let combined = self.calendar.weekly_totals(&combined_intervals);
        let completed = &combined[..combined.len().saturating_sub(1)];
        let completed_sum = sum(completed.iter().map(|(_, d)| *d));

        let weekly_mean = if completed.is_empty() {
            None
        } else {
            Some(completed_sum / completed.len() as i32)
        };
        let expected = Duration::hours(self.weekly_hours) * completed.len() as i32;

        Summary {
            weeks,
            total,
            vacation_total,
            weekly_mean,
            balance: completed_sum - expected,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
