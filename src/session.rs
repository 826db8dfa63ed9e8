//! Session engine: which interval of the current session is active and
//! how long each finished interval actually ran.

use crate::models::{IntervalKind, SessionTemplate, Slot};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum SessionError {
    #[error("Interval {index} is not the current interval")]
    NotCurrent { index: usize },
    #[error("Session is already complete")]
    Complete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    template: SessionTemplate,
    slots: Vec<Slot>,
}

impl Session {
    /// Creates a session with every interval of the template unstarted.
    pub fn new(template: SessionTemplate) -> Self {
        let slots = vec![Slot::NotStarted; template.len()];
        Self { template, slots }
    }

    /// Lowest index still unstarted, or `None` when the session is complete.
    pub fn current_interval_index(&self) -> Option<usize> {
        self.slots.iter().position(|slot| !slot.is_started())
    }

    pub fn current_interval_kind(&self) -> Option<IntervalKind> {
        self.current_interval_index()
            .and_then(|index| self.template.get(index))
    }

    /// Records the seconds spent in the current interval, clamped to zero.
    pub fn record_elapsed(&mut self, index: usize, seconds: i64) -> Result<(), SessionError> {
        let current = self.current_interval_index().ok_or(SessionError::Complete)?;
        if index != current {
            return Err(SessionError::NotCurrent { index });
        }
        let seconds = seconds.clamp(0, u32::MAX as i64) as u32;
        self.slots[index] = Slot::Completed(seconds);
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.current_interval_index().is_none()
    }

    /// Replaces the state with a fresh, fully unstarted session.
    pub fn new_session(&mut self) {
        self.slots = vec![Slot::NotStarted; self.template.len()];
    }

    /// Marks every unstarted interval as run for zero seconds.
    pub fn finish_remaining(&mut self) {
        for slot in &mut self.slots {
            if !slot.is_started() {
                *slot = Slot::Completed(0);
            }
        }
    }

    /// Slots paired with their template kinds, in order.
    pub fn slots(&self) -> impl Iterator<Item = (IntervalKind, Slot)> + '_ {
        self.template
            .kinds()
            .iter()
            .copied()
            .zip(self.slots.iter().copied())
    }

    pub fn completed_pomodoros(&self) -> usize {
        self.slots()
            .filter(|(kind, slot)| *kind == IntervalKind::Pomodoro && slot.is_started())
            .count()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionTemplate::default())
    }
}
