//! Display formatting for durations and the tray title.

use crate::models::IntervalKind;
use crate::timer::{IntervalTimer, TimerStatus};

/// Formats time in MM:SS format.
pub fn format_time(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Formats a longer total as `Hh MMm`.
pub fn format_hours(secs: u64) -> String {
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    format!("{}h {:02}m", hours, mins)
}

/// Emoji shown next to the countdown for each interval kind.
pub fn kind_symbol(kind: IntervalKind) -> &'static str {
    match kind {
        IntervalKind::Pomodoro => "🍅",
        IntervalKind::ShortBreak => "☕",
        IntervalKind::LongBreak => "🌻",
    }
}

/// Formats the tray title based on the loaded interval.
pub fn format_tray_title(timer: &IntervalTimer) -> String {
    let symbol = match timer.status() {
        TimerStatus::Paused => "⏸",
        TimerStatus::Idle | TimerStatus::Running => kind_symbol(timer.kind()),
    };
    format!("{} {}", symbol, format_time(timer.remaining_secs()))
}

/// Tooltip with the loaded interval's progress and the session count.
pub fn format_tooltip(timer: &IntervalTimer, completed_pomodoros: usize) -> String {
    format!(
        "{} {} / {} ({:.0}%), {} done this session",
        timer.kind().display_name(),
        format_time(timer.count()),
        format_time(timer.duration()),
        timer.progress_percent() * 100.0,
        completed_pomodoros
    )
}
