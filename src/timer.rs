//! Interval countdown and the one-second ticker that drives it.

use crate::app::Message;
use crate::models::IntervalKind;
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

/// Whether the countdown is moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimerStatus {
    /// Interval loaded but not counting.
    #[default]
    Idle,
    Running,
    Paused,
}

/// Outcome of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Timer is idle or paused, nothing changed.
    Ignored,
    /// One more second counted.
    Counted { remaining: u32 },
    /// The interval ran past its duration. The timer is idle again.
    Expired { kind: IntervalKind, elapsed: u32 },
}

/// Countdown state for the loaded interval.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalTimer {
    kind: IntervalKind,
    duration: u32,
    count: u32,
    status: TimerStatus,
}

impl IntervalTimer {
    pub fn new(kind: IntervalKind, duration: u32) -> Self {
        Self {
            kind,
            duration,
            count: 0,
            status: TimerStatus::Idle,
        }
    }

    /// Loads a new interval without starting it.
    pub fn load(&mut self, kind: IntervalKind, duration: u32) {
        *self = Self::new(kind, duration);
    }

    /// Loads a new interval and starts counting from zero.
    pub fn start(&mut self, kind: IntervalKind, duration: u32) {
        self.load(kind, duration);
        self.status = TimerStatus::Running;
    }

    /// Advances the timer by one second.
    ///
    /// Expiry fires on the tick after the nominal duration is reached, so
    /// `00:00` stays visible for one second.
    pub fn tick(&mut self) -> Tick {
        if self.status != TimerStatus::Running {
            return Tick::Ignored;
        }
        self.count += 1;
        if self.count > self.duration {
            let kind = self.kind;
            let elapsed = self.duration;
            self.status = TimerStatus::Idle;
            self.count = 0;
            Tick::Expired { kind, elapsed }
        } else {
            Tick::Counted {
                remaining: self.remaining_secs(),
            }
        }
    }

    pub fn pause(&mut self) {
        if self.status == TimerStatus::Running {
            self.status = TimerStatus::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.status == TimerStatus::Paused {
            self.status = TimerStatus::Running;
        }
    }

    /// Stops the interval without expiring it and returns the seconds counted.
    pub fn cancel(&mut self) -> u32 {
        let counted = self.count;
        self.status = TimerStatus::Idle;
        self.count = 0;
        counted
    }

    pub fn kind(&self) -> IntervalKind {
        self.kind
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn status(&self) -> TimerStatus {
        self.status
    }

    pub fn remaining_secs(&self) -> u32 {
        self.duration.saturating_sub(self.count)
    }

    /// True once the interval has been started, even if it is paused now.
    pub fn has_run(&self) -> bool {
        self.status != TimerStatus::Idle || self.count > 0
    }

    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }

    pub fn is_paused(&self) -> bool {
        self.status == TimerStatus::Paused
    }

    /// Progress through the interval (0.0 to 1.0).
    pub fn progress_percent(&self) -> f32 {
        if self.duration == 0 {
            return 1.0;
        }
        (self.count.min(self.duration) as f32) / (self.duration as f32)
    }
}

/// Sends a tick message every second until the receiver goes away.
pub fn run_ticker(tx: Sender<Message>) {
    loop {
        thread::sleep(Duration::from_secs(1));
        if tx.send(Message::Tick).is_err() {
            log::debug!("Tick receiver dropped, stopping ticker");
            break;
        }
    }
}
