//! Stats ledger: completed intervals grouped by ISO week and session.
//!
//! On disk the ledger is a nested JSON object:
//!
//! ```text
//! { "2024_01": { "2024.01.01_09:00:00": { "pomodoro_2024.01.01_09:25:00": 1500 } } }
//! ```
//!
//! A session key gains a `-<end>` suffix once the session is closed; the one
//! session per week without it is the open session. Keys are parsed into
//! structured values on load and only turned back into strings on save.
//! Entries that do not parse are kept verbatim and ignored by aggregation.

use crate::models::IntervalKind;
use crate::persistence::{self, LoadError, StorageError};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Timestamp format embedded in session and interval keys.
const TIMESTAMP_FORMAT: &str = "%Y.%m.%d_%H:%M:%S";

#[derive(Error, Debug, PartialEq)]
#[error("Malformed ledger key: {0}")]
pub struct KeyError(String);

fn parse_timestamp(s: &str) -> Result<NaiveDateTime, KeyError> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).map_err(|_| KeyError(s.to_string()))
}

/// Accepts `key` only if it prints back as exactly `s`, so that loose
/// spellings like `2024_1` stay unparsed instead of being rewritten.
fn canonical<K: fmt::Display>(s: &str, key: K) -> Result<K, KeyError> {
    if key.to_string() == s {
        Ok(key)
    } else {
        Err(KeyError(s.to_string()))
    }
}

fn truncate_to_second(at: NaiveDateTime) -> NaiveDateTime {
    at.with_nanosecond(0).unwrap_or(at)
}

/// ISO year and week number of a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WeekKey {
    pub year: i32,
    pub week: u32,
}

impl WeekKey {
    pub fn of(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        Self {
            year: iso.year(),
            week: iso.week(),
        }
    }
}

impl fmt::Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{:02}", self.year, self.week)
    }
}

impl FromStr for WeekKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || KeyError(s.to_string());
        let (year, week) = s.split_once('_').ok_or_else(err)?;
        let year = year.parse().map_err(|_| err())?;
        let week = week.parse().map_err(|_| err())?;
        if !(1..=53).contains(&week) {
            return Err(err());
        }
        canonical(s, Self { year, week })
    }
}

/// A session is identified by its start time, plus its end time once closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionKey {
    pub start: NaiveDateTime,
    pub end: Option<NaiveDateTime>,
}

impl SessionKey {
    pub fn open(start: NaiveDateTime) -> Self {
        Self {
            start: truncate_to_second(start),
            end: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.start.format(TIMESTAMP_FORMAT))?;
        if let Some(end) = self.end {
            write!(f, "-{}", end.format(TIMESTAMP_FORMAT))?;
        }
        Ok(())
    }
}

impl FromStr for SessionKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = match s.split_once('-') {
            Some((start, end)) => Self {
                start: parse_timestamp(start)?,
                end: Some(parse_timestamp(end)?),
            },
            None => Self {
                start: parse_timestamp(s)?,
                end: None,
            },
        };
        canonical(s, key)
    }
}

/// An interval entry: when it was logged and what kind it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IntervalKey {
    pub at: NaiveDateTime,
    pub kind: IntervalKind,
}

impl IntervalKey {
    pub fn new(kind: IntervalKind, at: NaiveDateTime) -> Self {
        Self {
            at: truncate_to_second(at),
            kind,
        }
    }
}

impl fmt::Display for IntervalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.kind, self.at.format(TIMESTAMP_FORMAT))
    }
}

impl FromStr for IntervalKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, at) = s.split_once('_').ok_or_else(|| KeyError(s.to_string()))?;
        let kind = kind.parse().map_err(|_| KeyError(s.to_string()))?;
        let key = Self {
            at: parse_timestamp(at)?,
            kind,
        };
        canonical(s, key)
    }
}

/// Intervals logged within one session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionRecord {
    intervals: BTreeMap<IntervalKey, i64>,
    unparsed: Map<String, Value>,
}

impl SessionRecord {
    #[cfg(test)]
    pub fn intervals(&self) -> &BTreeMap<IntervalKey, i64> {
        &self.intervals
    }

    fn add(&mut self, key: IntervalKey, elapsed: i64) {
        *self.intervals.entry(key).or_insert(0) += elapsed;
    }

    fn merge(&mut self, other: SessionRecord) {
        for (key, elapsed) in other.intervals {
            self.add(key, elapsed);
        }
        self.unparsed.extend(other.unparsed);
    }

    fn from_json(map: Map<String, Value>) -> Self {
        let mut record = Self::default();
        for (key, value) in map {
            match (key.parse::<IntervalKey>(), value.as_i64()) {
                (Ok(parsed), Some(elapsed)) => record.add(parsed, elapsed),
                _ => {
                    log::debug!("Skipping malformed interval entry {}", key);
                    record.unparsed.insert(key, value);
                }
            }
        }
        record
    }

    fn to_json(&self) -> Map<String, Value> {
        let mut map = self.unparsed.clone();
        for (key, elapsed) in &self.intervals {
            map.insert(key.to_string(), Value::from(*elapsed));
        }
        map
    }
}

/// All sessions within one ISO week.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeekBucket {
    sessions: BTreeMap<SessionKey, SessionRecord>,
    unparsed: Map<String, Value>,
}

impl WeekBucket {
    #[cfg(test)]
    pub fn sessions(&self) -> &BTreeMap<SessionKey, SessionRecord> {
        &self.sessions
    }

    /// The most recently started session without an end marker.
    pub fn open_session(&self) -> Option<SessionKey> {
        self.sessions.keys().rev().find(|key| key.is_open()).copied()
    }

    #[cfg(test)]
    pub fn open_session_count(&self) -> usize {
        self.sessions.keys().filter(|key| key.is_open()).count()
    }

    fn from_json(map: Map<String, Value>) -> Self {
        let mut bucket = Self::default();
        for (key, value) in map {
            match (key.parse::<SessionKey>(), value) {
                (Ok(parsed), Value::Object(intervals)) => {
                    let record = SessionRecord::from_json(intervals);
                    bucket.sessions.entry(parsed).or_default().merge(record);
                }
                (_, value) => {
                    log::debug!("Skipping malformed session entry {}", key);
                    bucket.unparsed.insert(key, value);
                }
            }
        }
        bucket
    }

    fn to_json(&self) -> Map<String, Value> {
        let mut map = self.unparsed.clone();
        for (key, record) in &self.sessions {
            map.insert(key.to_string(), Value::Object(record.to_json()));
        }
        map
    }
}

/// What `save_interval` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Nothing was written because no time elapsed.
    Skipped,
    /// Added to the week's open session.
    Appended,
    /// No session was open, so a new one was started.
    OpenedSession,
}

/// Which intervals an aggregate covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Intervals logged on the same calendar day as `now`.
    Today,
    /// Every interval in the ISO week of `now`.
    Week,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub count: u32,
    pub total_seconds: u64,
}

impl Tally {
    fn add(&mut self, seconds: i64) {
        self.count += 1;
        self.total_seconds += seconds as u64;
    }
}

/// Aggregated stats. Short and long breaks share the `breaks` tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub pomodoros: Tally,
    pub breaks: Tally,
}

/// In-memory ledger.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    weeks: BTreeMap<WeekKey, WeekBucket>,
    unparsed: Map<String, Value>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn week(&self, key: WeekKey) -> Option<&WeekBucket> {
        self.weeks.get(&key)
    }

    #[cfg(test)]
    pub fn week_count(&self) -> usize {
        self.weeks.len()
    }

    /// Logs an interval into the open session of `now`'s week, opening a
    /// session keyed by `now` if there is none. Non-positive durations are
    /// ignored.
    pub fn save_interval(&mut self, kind: IntervalKind, elapsed: i64, now: NaiveDateTime) -> SaveOutcome {
        if elapsed <= 0 {
            return SaveOutcome::Skipped;
        }

        let bucket = self.weeks.entry(WeekKey::of(now.date())).or_default();
        let (session, outcome) = match bucket.open_session() {
            Some(open) => (open, SaveOutcome::Appended),
            None => (SessionKey::open(now), SaveOutcome::OpenedSession),
        };

        bucket
            .sessions
            .entry(session)
            .or_default()
            .add(IntervalKey::new(kind, now), elapsed);

        outcome
    }

    /// Marks the open session of `now`'s week as ended at `now`. Returns
    /// false when there was no open session.
    pub fn close_current_session(&mut self, now: NaiveDateTime) -> bool {
        let Some(bucket) = self.weeks.get_mut(&WeekKey::of(now.date())) else {
            return false;
        };
        let Some(open) = bucket.open_session() else {
            return false;
        };
        let Some(record) = bucket.sessions.remove(&open) else {
            return false;
        };

        let closed = SessionKey {
            start: open.start,
            end: Some(truncate_to_second(now)),
        };
        bucket.sessions.entry(closed).or_default().merge(record);
        true
    }

    pub fn aggregate(&self, scope: Scope, now: NaiveDateTime) -> Totals {
        let mut totals = Totals::default();
        let Some(bucket) = self.weeks.get(&WeekKey::of(now.date())) else {
            return totals;
        };

        let today = now.date();
        let intervals = bucket
            .sessions
            .values()
            .flat_map(|record| record.intervals.iter());

        for (key, elapsed) in intervals {
            if *elapsed <= 0 {
                continue;
            }
            if scope == Scope::Today && key.at.date() != today {
                continue;
            }
            if key.kind.is_break() {
                totals.breaks.add(*elapsed);
            } else {
                totals.pomodoros.add(*elapsed);
            }
        }

        totals
    }

    pub fn from_json(map: Map<String, Value>) -> Self {
        let mut ledger = Self::default();
        for (key, value) in map {
            match (key.parse::<WeekKey>(), value) {
                (Ok(parsed), Value::Object(sessions)) => {
                    let bucket = WeekBucket::from_json(sessions);
                    let entry = ledger.weeks.entry(parsed).or_default();
                    for (session, record) in bucket.sessions {
                        entry.sessions.entry(session).or_default().merge(record);
                    }
                    entry.unparsed.extend(bucket.unparsed);
                }
                (_, value) => {
                    log::debug!("Skipping malformed week entry {}", key);
                    ledger.unparsed.insert(key, value);
                }
            }
        }
        ledger
    }

    pub fn to_json(&self) -> Map<String, Value> {
        let mut map = self.unparsed.clone();
        for (key, bucket) in &self.weeks {
            map.insert(key.to_string(), Value::Object(bucket.to_json()));
        }
        map
    }
}

/// Ledger bound to its file. Every operation reads the file, and every
/// mutation rewrites it whole.
pub struct StatsStore {
    path: PathBuf,
}

impl StatsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the ledger. A missing or empty file yields an empty ledger. Any
    /// other failure also yields an empty ledger, but the file is copied
    /// aside first so the next write does not destroy it.
    pub fn load(&self) -> Ledger {
        match persistence::read_json_object(&self.path) {
            Ok(map) => Ledger::from_json(map),
            Err(LoadError::NotFound(_) | LoadError::Empty(_)) => Ledger::new(),
            Err(e) => {
                log::warn!("Could not load stats, starting empty: {}", e);
                match persistence::back_up_corrupt(&self.path) {
                    Ok(backup) => log::warn!("Old stats kept in {}", backup.display()),
                    Err(e) => log::error!("Failed to back up stats file: {}", e),
                }
                Ledger::new()
            }
        }
    }

    fn write(&self, ledger: &Ledger) -> Result<(), StorageError> {
        persistence::write_json(&self.path, &Value::Object(ledger.to_json()))
    }

    pub fn save_interval(
        &self,
        kind: IntervalKind,
        elapsed: i64,
        now: NaiveDateTime,
    ) -> Result<SaveOutcome, StorageError> {
        if elapsed <= 0 {
            return Ok(SaveOutcome::Skipped);
        }
        let mut ledger = self.load();
        let outcome = ledger.save_interval(kind, elapsed, now);
        self.write(&ledger)?;
        Ok(outcome)
    }

    pub fn close_current_session(&self, now: NaiveDateTime) -> Result<bool, StorageError> {
        let mut ledger = self.load();
        if !ledger.close_current_session(now) {
            return Ok(false);
        }
        self.write(&ledger)?;
        Ok(true)
    }

    pub fn aggregate(&self, scope: Scope, now: NaiveDateTime) -> Totals {
        self.load().aggregate(scope, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_week_key_format_and_parse() {
        let key = WeekKey::of(at("2024-01-01T09:00:00").date());
        assert_eq!(key, WeekKey { year: 2024, week: 1 });
        assert_eq!(key.to_string(), "2024_01");
        assert_eq!("2024_01".parse::<WeekKey>(), Ok(key));
        assert!("2024_60".parse::<WeekKey>().is_err());
        assert!("2024".parse::<WeekKey>().is_err());
    }

    #[test]
    fn test_week_key_uses_iso_year() {
        // 2024-12-30 belongs to ISO week 1 of 2025
        let key = WeekKey::of(at("2024-12-30T12:00:00").date());
        assert_eq!(key, WeekKey { year: 2025, week: 1 });
    }

    #[test]
    fn test_session_key_format_and_parse() {
        let open = SessionKey::open(at("2024-01-01T09:00:00"));
        assert_eq!(open.to_string(), "2024.01.01_09:00:00");
        assert_eq!("2024.01.01_09:00:00".parse::<SessionKey>(), Ok(open));

        let closed = SessionKey {
            end: Some(at("2024-01-01T11:30:00")),
            ..open
        };
        assert_eq!(closed.to_string(), "2024.01.01_09:00:00-2024.01.01_11:30:00");
        assert_eq!(closed.to_string().parse::<SessionKey>(), Ok(closed));
        assert!(!closed.is_open());
        assert!("yesterday".parse::<SessionKey>().is_err());
    }

    #[test]
    fn test_loose_keys_are_rejected() {
        assert!("2024_1".parse::<WeekKey>().is_err());
        assert!("+2024_01".parse::<WeekKey>().is_err());
        assert!("2024.1.1_9:00:00".parse::<SessionKey>().is_err());
        assert!("2024.01.01_09:00:00-2024.1.1_10:00:00"
            .parse::<SessionKey>()
            .is_err());
        assert!("pomodoro_2024.1.1_9:25:00".parse::<IntervalKey>().is_err());
    }

    #[test]
    fn test_loose_keys_are_kept_verbatim() {
        let raw = json!({
            "2024_1": { "2024.01.01_09:00:00": { "pomodoro_2024.01.01_09:25:00": 1 } },
            "2024_01": {
                "2024.1.1_9:00:00": { "pomodoro_2024.01.01_09:25:00": 10 },
                "2024.01.01_09:00:00": {
                    "pomodoro_2024.1.1_9:25:00": 10,
                    "pomodoro_2024.01.01_09:25:00": 5
                }
            }
        });

        let ledger = Ledger::from_json(object(raw.clone()));

        assert_eq!(Value::Object(ledger.to_json()), raw);
        let totals = ledger.aggregate(Scope::Week, at("2024-01-01T12:00:00"));
        assert_eq!(totals.pomodoros.count, 1);
        assert_eq!(totals.pomodoros.total_seconds, 5);
    }

    #[test]
    fn test_interval_key_format_and_parse() {
        let key = IntervalKey::new(IntervalKind::LongBreak, at("2024-01-01T10:45:10"));
        assert_eq!(key.to_string(), "long_2024.01.01_10:45:10");
        assert_eq!("long_2024.01.01_10:45:10".parse::<IntervalKey>(), Ok(key));
        assert!("nap_2024.01.01_10:45:10".parse::<IntervalKey>().is_err());
        assert!("pomodoro".parse::<IntervalKey>().is_err());
    }

    #[test]
    fn test_first_interval_creates_week_session_and_entry() {
        let mut ledger = Ledger::new();
        let now = at("2024-01-01T09:00:00");

        let outcome = ledger.save_interval(IntervalKind::Pomodoro, 1500, now);

        assert_eq!(outcome, SaveOutcome::OpenedSession);
        assert_eq!(
            Value::Object(ledger.to_json()),
            json!({
                "2024_01": {
                    "2024.01.01_09:00:00": {
                        "pomodoro_2024.01.01_09:00:00": 1500
                    }
                }
            })
        );
    }

    #[test]
    fn test_non_positive_intervals_are_ignored() {
        let mut ledger = Ledger::new();
        let now = at("2024-01-01T09:00:00");

        assert_eq!(
            ledger.save_interval(IntervalKind::Pomodoro, 0, now),
            SaveOutcome::Skipped
        );
        assert_eq!(
            ledger.save_interval(IntervalKind::Pomodoro, -5, now),
            SaveOutcome::Skipped
        );
        assert_eq!(ledger, Ledger::new());
    }

    #[test]
    fn test_intervals_share_the_open_session() {
        let mut ledger = Ledger::new();
        ledger.save_interval(IntervalKind::Pomodoro, 1500, at("2024-01-01T09:25:00"));
        let outcome = ledger.save_interval(IntervalKind::ShortBreak, 300, at("2024-01-01T09:30:00"));

        assert_eq!(outcome, SaveOutcome::Appended);
        let bucket = ledger.week(WeekKey { year: 2024, week: 1 }).unwrap();
        assert_eq!(bucket.sessions().len(), 1);
        let record = &bucket.sessions()[&SessionKey::open(at("2024-01-01T09:25:00"))];
        assert_eq!(record.intervals().len(), 2);
    }

    #[test]
    fn test_same_second_entries_are_summed() {
        let mut ledger = Ledger::new();
        let now = at("2024-01-01T09:25:00");
        ledger.save_interval(IntervalKind::Pomodoro, 10, now);
        ledger.save_interval(IntervalKind::Pomodoro, 5, now);

        let totals = ledger.aggregate(Scope::Week, now);
        assert_eq!(totals.pomodoros.count, 1);
        assert_eq!(totals.pomodoros.total_seconds, 15);
    }

    #[test]
    fn test_close_session_then_save_opens_new_session() {
        let mut ledger = Ledger::new();
        ledger.save_interval(IntervalKind::Pomodoro, 1500, at("2024-01-01T09:25:00"));

        assert!(ledger.close_current_session(at("2024-01-01T10:00:00")));
        let outcome = ledger.save_interval(IntervalKind::Pomodoro, 1500, at("2024-01-01T11:00:00"));

        assert_eq!(outcome, SaveOutcome::OpenedSession);
        let json = Value::Object(ledger.to_json());
        let week = json["2024_01"].as_object().unwrap();
        assert_eq!(week.len(), 2);
        assert_eq!(
            week["2024.01.01_09:25:00-2024.01.01_10:00:00"],
            json!({ "pomodoro_2024.01.01_09:25:00": 1500 })
        );
        assert_eq!(
            week["2024.01.01_11:00:00"],
            json!({ "pomodoro_2024.01.01_11:00:00": 1500 })
        );
    }

    #[test]
    fn test_close_reduces_open_sessions_by_one() {
        let mut ledger = Ledger::new();
        let week = WeekKey { year: 2024, week: 1 };
        ledger.save_interval(IntervalKind::Pomodoro, 1500, at("2024-01-01T09:25:00"));
        assert_eq!(ledger.week(week).unwrap().open_session_count(), 1);

        assert!(ledger.close_current_session(at("2024-01-01T10:00:00")));
        assert_eq!(ledger.week(week).unwrap().open_session_count(), 0);

        // Nothing left to close
        let before = ledger.clone();
        assert!(!ledger.close_current_session(at("2024-01-01T10:05:00")));
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_close_without_week_is_noop() {
        let mut ledger = Ledger::new();
        assert!(!ledger.close_current_session(at("2024-01-01T10:00:00")));
        assert_eq!(ledger.week_count(), 0);
    }

    #[test]
    fn test_new_week_starts_new_bucket() {
        let mut ledger = Ledger::new();
        ledger.save_interval(IntervalKind::Pomodoro, 1500, at("2024-01-07T22:00:00"));
        let outcome = ledger.save_interval(IntervalKind::Pomodoro, 1500, at("2024-01-08T09:00:00"));

        assert_eq!(outcome, SaveOutcome::OpenedSession);
        assert_eq!(ledger.week_count(), 2);
    }

    #[test]
    fn test_aggregate_today_excludes_earlier_days_of_open_session() {
        let mut ledger = Ledger::new();
        ledger.save_interval(IntervalKind::Pomodoro, 1500, at("2024-01-02T23:50:00"));
        ledger.save_interval(IntervalKind::ShortBreak, 300, at("2024-01-03T00:10:00"));
        ledger.save_interval(IntervalKind::Pomodoro, 1200, at("2024-01-03T00:40:00"));
        ledger.save_interval(IntervalKind::LongBreak, 900, at("2024-01-03T01:00:00"));

        let now = at("2024-01-03T10:00:00");
        let today = ledger.aggregate(Scope::Today, now);
        let week = ledger.aggregate(Scope::Week, now);

        assert_eq!(today.pomodoros, Tally { count: 1, total_seconds: 1200 });
        assert_eq!(today.breaks, Tally { count: 2, total_seconds: 1200 });
        assert_eq!(week.pomodoros, Tally { count: 2, total_seconds: 2700 });
        assert_eq!(week.breaks, Tally { count: 2, total_seconds: 1200 });
    }

    #[test]
    fn test_aggregate_ignores_other_weeks() {
        let mut ledger = Ledger::new();
        ledger.save_interval(IntervalKind::Pomodoro, 1500, at("2024-01-05T09:00:00"));

        let totals = ledger.aggregate(Scope::Week, at("2024-01-10T09:00:00"));
        assert_eq!(totals, Totals::default());
    }

    #[test]
    fn test_malformed_entries_are_skipped_and_preserved() {
        let raw = object(json!({
            "notes": "hello",
            "2024_01": {
                "garbage": { "pomodoro_2024.01.01_09:00:00": 1500 },
                "2024.01.01_09:00:00": {
                    "pomodoro_2024.01.01_09:25:00": 1500,
                    "pomodoro_2024.01.01_10:00:00": "lots",
                    "nap_2024.01.01_10:30:00": 600,
                    "break_2024.01.01_10:35:00": -3
                }
            }
        }));

        let ledger = Ledger::from_json(raw.clone());
        let totals = ledger.aggregate(Scope::Week, at("2024-01-01T12:00:00"));

        assert_eq!(totals.pomodoros, Tally { count: 1, total_seconds: 1500 });
        assert_eq!(totals.breaks, Tally::default());
        assert_eq!(ledger.to_json(), raw);
    }

    #[test]
    fn test_store_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = StatsStore::new(dir.path().join("stats.json"));
        assert_eq!(store.load(), Ledger::new());
        assert_eq!(
            store.aggregate(Scope::Today, at("2024-01-01T09:00:00")),
            Totals::default()
        );
    }

    #[test]
    fn test_store_persists_every_mutation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stats.json");
        let store = StatsStore::new(path.clone());

        store
            .save_interval(IntervalKind::Pomodoro, 1500, at("2024-01-01T09:25:00"))
            .unwrap();
        store
            .save_interval(IntervalKind::ShortBreak, 300, at("2024-01-01T09:30:00"))
            .unwrap();
        assert!(store.close_current_session(at("2024-01-01T09:31:00")).unwrap());

        let reopened = StatsStore::new(path);
        let ledger = reopened.load();
        let bucket = ledger.week(WeekKey { year: 2024, week: 1 }).unwrap();
        assert_eq!(bucket.open_session_count(), 0);
        assert_eq!(bucket.sessions().len(), 1);

        let totals = reopened.aggregate(Scope::Today, at("2024-01-01T18:00:00"));
        assert_eq!(totals.pomodoros.count, 1);
        assert_eq!(totals.breaks.total_seconds, 300);
    }

    #[test]
    fn test_store_skips_zero_without_creating_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stats.json");
        let store = StatsStore::new(path.clone());

        let outcome = store
            .save_interval(IntervalKind::Pomodoro, 0, at("2024-01-01T09:25:00"))
            .unwrap();

        assert_eq!(outcome, SaveOutcome::Skipped);
        assert!(!path.exists());
    }

    #[test]
    fn test_store_backs_up_file_with_invalid_utf8() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stats.json");
        let original: &[u8] = b"{\"2024_01\":{\"2024.01.01_08:00:00-2024.01.01_09:00:00\":\
            {\"pomodoro_2024.01.01_08:25:00\":1500}},\"note\":\"\xff\xfe\"}";
        fs::write(&path, original).unwrap();
        let store = StatsStore::new(path.clone());

        store
            .save_interval(IntervalKind::Pomodoro, 60, at("2024-01-01T10:00:00"))
            .unwrap();

        let backup = dir.path().join("stats.json.corrupt");
        assert_eq!(fs::read(backup).unwrap(), original);
    }

    #[test]
    fn test_store_backs_up_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stats.json");
        fs::write(&path, "{ not json").unwrap();
        let store = StatsStore::new(path.clone());

        store
            .save_interval(IntervalKind::Pomodoro, 60, at("2024-01-01T09:25:00"))
            .unwrap();

        let backup = dir.path().join("stats.json.corrupt");
        assert_eq!(fs::read_to_string(backup).unwrap(), "{ not json");
        assert_eq!(
            store.aggregate(Scope::Week, at("2024-01-01T10:00:00")).pomodoros.count,
            1
        );
    }
}
