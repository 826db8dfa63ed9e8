//! Data models shared by the session engine, timer, and stats ledger.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The kind of a single timed interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IntervalKind {
    /// Focus block.
    Pomodoro,
    /// Short break between pomodoros.
    ShortBreak,
    /// Long break closing a session.
    LongBreak,
}

#[derive(Error, Debug, PartialEq)]
#[error("Unknown interval kind: {0}")]
pub struct UnknownKind(pub String);

impl IntervalKind {
    pub const ALL: [IntervalKind; 3] = [Self::Pomodoro, Self::ShortBreak, Self::LongBreak];

    /// Name used in preference keys and ledger interval keys.
    pub fn storage_name(&self) -> &'static str {
        match self {
            Self::Pomodoro => "pomodoro",
            Self::ShortBreak => "break",
            Self::LongBreak => "long",
        }
    }

    /// Human readable name for menu titles.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Pomodoro => "Pomodoro",
            Self::ShortBreak => "Break",
            Self::LongBreak => "Long Break",
        }
    }

    pub fn is_break(&self) -> bool {
        matches!(self, Self::ShortBreak | Self::LongBreak)
    }
}

impl fmt::Display for IntervalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.storage_name())
    }
}

impl FromStr for IntervalKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pomodoro" => Ok(Self::Pomodoro),
            "break" => Ok(Self::ShortBreak),
            "long" => Ok(Self::LongBreak),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}

/// Ordered sequence of intervals making up one full session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTemplate {
    kinds: Vec<IntervalKind>,
}

impl SessionTemplate {
    /// `pairs` × [Pomodoro, ShortBreak] with the final break replaced by a long break.
    pub fn standard(pairs: usize) -> Self {
        let mut kinds = Vec::with_capacity(pairs * 2);
        for _ in 0..pairs {
            kinds.push(IntervalKind::Pomodoro);
            kinds.push(IntervalKind::ShortBreak);
        }
        if let Some(last) = kinds.last_mut() {
            *last = IntervalKind::LongBreak;
        }
        Self { kinds }
    }

    pub fn kinds(&self) -> &[IntervalKind] {
        &self.kinds
    }

    pub fn get(&self, index: usize) -> Option<IntervalKind> {
        self.kinds.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

impl Default for SessionTemplate {
    fn default() -> Self {
        Self::standard(4)
    }
}

/// State of one interval slot within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Slot {
    /// Not executed yet.
    #[default]
    NotStarted,
    /// Completed or skipped, with the seconds actually spent.
    Completed(u32),
}

impl Slot {
    pub fn is_started(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}
