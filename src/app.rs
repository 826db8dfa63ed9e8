//! Main application state and the update function every action goes through.

use crate::config::AppConfig;
use crate::models::IntervalKind;
use crate::persistence::StorageError;
use crate::prefs::{Autostart, Preferences, PreferencesStore};
use crate::session::Session;
use crate::stats::{Scope, StatsStore, Totals};
use crate::timer::{IntervalTimer, Tick};
use chrono::{NaiveDate, NaiveDateTime};

/// Everything that can change the application state.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// One second has passed.
    Tick,
    Start,
    Pause,
    Resume,
    /// Restart the current interval from its full length.
    Reset,
    /// Finish the current interval now and move to the next one.
    Skip,
    EndSession,
    /// New length in seconds for an interval kind.
    SetLength(IntervalKind, u32),
    ToggleAutostart(Autostart),
    ToggleSound,
    SelectSound(String),
    Quit,
}

/// Side effects the menu adapter has to carry out after an update.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Tray title and menu need to be redrawn.
    Redraw,
    /// A button was pressed; play the click if sounds are allowed.
    ButtonSound,
    /// An interval ran out; notify and play the timer sound.
    IntervalEnded(IntervalKind),
    /// Writing stats or preferences failed.
    StorageFailed(String),
    Quit,
}

/// Today's and this week's totals, as shown in the menu.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatsView {
    pub today: Totals,
    pub week: Totals,
}

/// Main application state. Owned by the event loop and only mutated
/// through [`App::update`].
pub struct App {
    pub prefs: PreferencesStore,
    pub session: Session,
    pub timer: IntervalTimer,
    stats: StatsStore,
    stats_view: StatsView,
    stats_date: NaiveDate,
}

impl App {
    /// Loads preferences and stats and seeds a fresh session.
    ///
    /// A session left open in the ledger by a previous run is closed first,
    /// so this run's intervals never land in it.
    pub fn new(config: &AppConfig, now: NaiveDateTime) -> Self {
        let prefs = PreferencesStore::open(config.prefs_path());
        let stats = StatsStore::new(config.stats_path());
        log::debug!(
            "Preferences at {}, stats at {}",
            prefs.path().display(),
            stats.path().display()
        );

        match stats.close_current_session(now) {
            Ok(true) => log::info!("Closed session left open by a previous run"),
            Ok(false) => {}
            Err(e) => log::error!("Failed to close previous session: {}", e),
        }

        let session = Session::default();
        let kind = session
            .current_interval_kind()
            .unwrap_or(IntervalKind::Pomodoro);
        let timer = IntervalTimer::new(kind, prefs.get().length(kind));

        let mut app = Self {
            prefs,
            session,
            timer,
            stats,
            stats_view: StatsView::default(),
            stats_date: now.date(),
        };
        app.refresh_stats(now);
        app
    }

    pub fn settings(&self) -> &Preferences {
        self.prefs.get()
    }

    pub fn stats_view(&self) -> &StatsView {
        &self.stats_view
    }

    /// Kind of the interval loaded in the timer.
    pub fn current_kind(&self) -> IntervalKind {
        self.timer.kind()
    }

    /// Applies `message` and returns what the adapter has to do about it.
    pub fn update(&mut self, message: Message, now: NaiveDateTime) -> Vec<Effect> {
        let mut effects = Vec::new();

        match message {
            Message::Tick => {
                if now.date() != self.stats_date {
                    self.refresh_stats(now);
                    effects.push(Effect::Redraw);
                }
                match self.timer.tick() {
                    Tick::Ignored => {}
                    Tick::Counted { .. } => effects.push(Effect::Redraw),
                    Tick::Expired { kind, elapsed } => {
                        log::info!("{} ended after {}s", kind.display_name(), elapsed);
                        effects.push(Effect::IntervalEnded(kind));
                        self.finish_current(elapsed, now, &mut effects);
                        let rolled_over = self.advance(now, &mut effects);
                        self.autostart(rolled_over);
                        effects.push(Effect::Redraw);
                    }
                }
            }
            Message::Start => {
                if !self.timer.has_run() {
                    self.start_loaded();
                    effects.extend([Effect::ButtonSound, Effect::Redraw]);
                }
            }
            Message::Pause => {
                if self.timer.is_running() {
                    self.timer.pause();
                    effects.extend([Effect::ButtonSound, Effect::Redraw]);
                }
            }
            Message::Resume => {
                if self.timer.is_paused() {
                    self.timer.resume();
                    effects.extend([Effect::ButtonSound, Effect::Redraw]);
                }
            }
            Message::Reset => {
                if self.timer.has_run() {
                    self.timer.cancel();
                    self.start_loaded();
                    effects.extend([Effect::ButtonSound, Effect::Redraw]);
                }
            }
            Message::Skip => {
                let counted = self.timer.cancel();
                log::info!("Skipping {} after {}s", self.timer.kind().display_name(), counted);
                self.finish_current(counted, now, &mut effects);
                let rolled_over = self.advance(now, &mut effects);
                if rolled_over {
                    self.autostart(true);
                } else {
                    self.start_loaded();
                }
                effects.extend([Effect::ButtonSound, Effect::Redraw]);
            }
            Message::EndSession => {
                self.end_session(now, &mut effects);
                effects.extend([Effect::ButtonSound, Effect::Redraw]);
            }
            Message::SetLength(kind, secs) => {
                self.update_prefs(|p| p.set_length(kind, secs), &mut effects);
                if !self.timer.has_run() && self.timer.kind() == kind {
                    self.timer.load(kind, secs);
                }
                effects.push(Effect::Redraw);
            }
            Message::ToggleAutostart(which) => {
                self.update_prefs(|p| p.toggle_autostart(which), &mut effects);
                effects.push(Effect::Redraw);
            }
            Message::ToggleSound => {
                self.update_prefs(|p| p.allow_sound = !p.allow_sound, &mut effects);
                effects.push(Effect::Redraw);
            }
            Message::SelectSound(id) => {
                self.update_prefs(|p| p.timer_sound = id, &mut effects);
                effects.push(Effect::Redraw);
            }
            Message::Quit => {
                self.end_session(now, &mut effects);
                effects.push(Effect::Quit);
            }
        }

        effects
    }

    /// Records `elapsed` for the current interval and logs it to the ledger.
    fn finish_current(&mut self, elapsed: u32, now: NaiveDateTime, effects: &mut Vec<Effect>) {
        let Some(index) = self.session.current_interval_index() else {
            return;
        };
        let Some(kind) = self.session.current_interval_kind() else {
            return;
        };

        if let Err(e) = self.session.record_elapsed(index, elapsed as i64) {
            log::error!("Failed to record interval {}: {}", index, e);
            return;
        }

        match self.stats.save_interval(kind, elapsed as i64, now) {
            Ok(outcome) => {
                log::debug!("Saved {} ({}s): {:?}", kind, elapsed, outcome);
                self.refresh_stats(now);
            }
            Err(e) => self.storage_failed("Failed to save interval", e, effects),
        }
    }

    /// Loads the next interval into the timer, closing the session and
    /// seeding a new one if it is complete. Returns true on a new session.
    fn advance(&mut self, now: NaiveDateTime, effects: &mut Vec<Effect>) -> bool {
        let rolled_over = self.session.is_complete();
        if rolled_over {
            log::info!("Session complete, starting a new one");
            self.close_ledger_session(now, effects);
            self.session.new_session();
        }
        self.load_current();
        rolled_over
    }

    fn end_session(&mut self, now: NaiveDateTime, effects: &mut Vec<Effect>) {
        let counted = self.timer.cancel();
        self.finish_current(counted, now, effects);
        self.session.finish_remaining();
        self.close_ledger_session(now, effects);
        self.session.new_session();
        self.load_current();
        log::info!("Session ended");
    }

    fn close_ledger_session(&mut self, now: NaiveDateTime, effects: &mut Vec<Effect>) {
        match self.stats.close_current_session(now) {
            Ok(_) => self.refresh_stats(now),
            Err(e) => self.storage_failed("Failed to close session", e, effects),
        }
    }

    fn autostart(&mut self, rolled_over: bool) {
        let prefs = self.prefs.get();
        let start = if rolled_over {
            prefs.autostart_session
        } else {
            prefs.autostart(self.timer.kind())
        };
        if start {
            self.start_loaded();
        }
    }

    fn load_current(&mut self) {
        let kind = self
            .session
            .current_interval_kind()
            .unwrap_or(IntervalKind::Pomodoro);
        self.timer.load(kind, self.prefs.get().length(kind));
    }

    fn start_loaded(&mut self) {
        let kind = self.timer.kind();
        self.timer.start(kind, self.prefs.get().length(kind));
    }

    fn update_prefs<F>(&mut self, updater: F, effects: &mut Vec<Effect>)
    where
        F: FnOnce(&mut Preferences),
    {
        if let Err(e) = self.prefs.update(updater) {
            self.storage_failed("Failed to save preferences", e, effects);
        }
    }

    fn storage_failed(&self, context: &str, err: StorageError, effects: &mut Vec<Effect>) {
        log::error!("{}: {}", context, err);
        effects.push(Effect::StorageFailed(format!("{}: {}", context, err)));
    }

    fn refresh_stats(&mut self, now: NaiveDateTime) {
        self.stats_view = StatsView {
            today: self.stats.aggregate(Scope::Today, now),
            week: self.stats.aggregate(Scope::Week, now),
        };
        self.stats_date = now.date();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Slot;
    use crate::timer::TimerStatus;
    use serde_json::Value;
    use std::fs;
    use tempfile::TempDir;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    fn now() -> NaiveDateTime {
        at("2024-01-01T09:00:00")
    }

    fn create_test_app(dir: &TempDir) -> App {
        App::new(&AppConfig::in_dir(dir.path()), now())
    }

    /// App with short intervals: pomodoro 3s, break 2s, long break 4s.
    fn create_short_app(dir: &TempDir) -> App {
        let mut app = create_test_app(dir);
        app.update(Message::SetLength(IntervalKind::Pomodoro, 3), now());
        app.update(Message::SetLength(IntervalKind::ShortBreak, 2), now());
        app.update(Message::SetLength(IntervalKind::LongBreak, 4), now());
        app
    }

    fn tick_until_ended(app: &mut App) -> Vec<Effect> {
        for _ in 0..10_000 {
            let effects = app.update(Message::Tick, now());
            if effects
                .iter()
                .any(|e| matches!(e, Effect::IntervalEnded(_)))
            {
                return effects;
            }
        }
        panic!("interval never ended");
    }

    fn ledger_json(app: &App) -> Value {
        Value::Object(app.stats.load().to_json())
    }

    #[test]
    fn test_app_initial_state() {
        let dir = TempDir::new().unwrap();
        let app = create_test_app(&dir);

        assert_eq!(app.current_kind(), IntervalKind::Pomodoro);
        assert_eq!(app.timer.status(), TimerStatus::Idle);
        assert_eq!(app.timer.remaining_secs(), 1500);
        assert_eq!(app.settings(), &Preferences::default());
        assert_eq!(app.stats_view(), &StatsView::default());
        // Defaults are written on first launch
        assert!(dir.path().join("prefs.json").exists());
    }

    #[test]
    fn test_start_pomodoro() {
        let dir = TempDir::new().unwrap();
        let mut app = create_test_app(&dir);

        let effects = app.update(Message::Start, now());

        assert_eq!(effects, vec![Effect::ButtonSound, Effect::Redraw]);
        assert!(app.timer.is_running());
        assert_eq!(app.update(Message::Start, now()), vec![]);
    }

    #[test]
    fn test_pause_and_resume() {
        let dir = TempDir::new().unwrap();
        let mut app = create_test_app(&dir);
        app.update(Message::Start, now());
        for _ in 0..10 {
            app.update(Message::Tick, now());
        }

        app.update(Message::Pause, now());
        assert!(app.timer.is_paused());
        assert_eq!(app.update(Message::Tick, now()), vec![]);
        assert_eq!(app.timer.remaining_secs(), 1490);

        app.update(Message::Resume, now());
        assert!(app.timer.is_running());
        app.update(Message::Tick, now());
        assert_eq!(app.timer.remaining_secs(), 1489);
    }

    #[test]
    fn test_pomodoro_expiry_saves_and_autostarts_break() {
        let dir = TempDir::new().unwrap();
        let mut app = create_short_app(&dir);
        app.update(Message::Start, now());

        let effects = tick_until_ended(&mut app);

        assert!(effects.contains(&Effect::IntervalEnded(IntervalKind::Pomodoro)));
        assert_eq!(
            app.session.slots().next(),
            Some((IntervalKind::Pomodoro, Slot::Completed(3)))
        );
        assert_eq!(app.current_kind(), IntervalKind::ShortBreak);
        assert!(app.timer.is_running());
        assert_eq!(app.stats_view().today.pomodoros.count, 1);
        assert_eq!(app.stats_view().today.pomodoros.total_seconds, 3);
        assert_eq!(
            ledger_json(&app)["2024_01"]["2024.01.01_09:00:00"]["pomodoro_2024.01.01_09:00:00"],
            3
        );
    }

    #[test]
    fn test_expiry_without_autostart_leaves_next_idle() {
        let dir = TempDir::new().unwrap();
        let mut app = create_short_app(&dir);
        app.update(Message::ToggleAutostart(Autostart::Break), now());
        app.update(Message::Start, now());

        tick_until_ended(&mut app);

        assert_eq!(app.current_kind(), IntervalKind::ShortBreak);
        assert_eq!(app.timer.status(), TimerStatus::Idle);
        assert_eq!(app.timer.remaining_secs(), 2);
    }

    #[test]
    fn test_skip_records_counted_seconds_and_starts_next() {
        let dir = TempDir::new().unwrap();
        let mut app = create_test_app(&dir);
        app.update(Message::Start, now());
        for _ in 0..10 {
            app.update(Message::Tick, now());
        }

        app.update(Message::Skip, now());

        assert_eq!(
            app.session.slots().next(),
            Some((IntervalKind::Pomodoro, Slot::Completed(10)))
        );
        assert_eq!(app.current_kind(), IntervalKind::ShortBreak);
        assert!(app.timer.is_running());
        assert_eq!(app.stats_view().week.pomodoros.total_seconds, 10);
    }

    #[test]
    fn test_skip_before_start_records_zero() {
        let dir = TempDir::new().unwrap();
        let mut app = create_test_app(&dir);

        app.update(Message::Skip, now());

        assert_eq!(
            app.session.slots().next(),
            Some((IntervalKind::Pomodoro, Slot::Completed(0)))
        );
        assert!(!dir.path().join("stats.json").exists());
    }

    #[test]
    fn test_reset_restarts_without_recording() {
        let dir = TempDir::new().unwrap();
        let mut app = create_test_app(&dir);
        app.update(Message::Start, now());
        for _ in 0..30 {
            app.update(Message::Tick, now());
        }

        app.update(Message::Reset, now());

        assert!(app.timer.is_running());
        assert_eq!(app.timer.remaining_secs(), 1500);
        assert_eq!(app.session.current_interval_index(), Some(0));
        assert!(!dir.path().join("stats.json").exists());
    }

    #[test]
    fn test_reset_when_idle_is_noop() {
        let dir = TempDir::new().unwrap();
        let mut app = create_test_app(&dir);
        assert_eq!(app.update(Message::Reset, now()), vec![]);
        assert_eq!(app.timer.status(), TimerStatus::Idle);
    }

    #[test]
    fn test_full_session_rolls_over() {
        let dir = TempDir::new().unwrap();
        let mut app = create_short_app(&dir);
        app.update(Message::Start, now());

        for _ in 0..8 {
            tick_until_ended(&mut app);
        }

        // Fresh session, not autostarted
        assert_eq!(app.session.current_interval_index(), Some(0));
        assert_eq!(app.current_kind(), IntervalKind::Pomodoro);
        assert_eq!(app.timer.status(), TimerStatus::Idle);

        let json = ledger_json(&app);
        let week = json["2024_01"].as_object().unwrap();
        assert_eq!(week.len(), 1);
        let (key, intervals) = week.iter().next().unwrap();
        assert_eq!(key, "2024.01.01_09:00:00-2024.01.01_09:00:00");
        // All intervals share a timestamp here, so entries of one kind merge
        assert_eq!(intervals["pomodoro_2024.01.01_09:00:00"], 12);
        assert_eq!(intervals["break_2024.01.01_09:00:00"], 6);
        assert_eq!(intervals["long_2024.01.01_09:00:00"], 4);
    }

    #[test]
    fn test_session_rollover_autostarts_when_enabled() {
        let dir = TempDir::new().unwrap();
        let mut app = create_short_app(&dir);
        app.update(Message::ToggleAutostart(Autostart::Session), now());
        app.update(Message::Start, now());

        for _ in 0..8 {
            tick_until_ended(&mut app);
        }

        assert_eq!(app.current_kind(), IntervalKind::Pomodoro);
        assert!(app.timer.is_running());
    }

    #[test]
    fn test_end_session_closes_ledger_session() {
        let dir = TempDir::new().unwrap();
        let mut app = create_test_app(&dir);
        app.update(Message::Start, now());
        for _ in 0..5 {
            app.update(Message::Tick, now());
        }

        app.update(Message::EndSession, at("2024-01-01T09:30:00"));

        assert_eq!(app.session.current_interval_index(), Some(0));
        assert_eq!(app.timer.status(), TimerStatus::Idle);
        let json = ledger_json(&app);
        assert_eq!(
            json["2024_01"]["2024.01.01_09:30:00-2024.01.01_09:30:00"]
                ["pomodoro_2024.01.01_09:30:00"],
            5
        );
    }

    #[test]
    fn test_quit_ends_session() {
        let dir = TempDir::new().unwrap();
        let mut app = create_test_app(&dir);
        app.update(Message::Start, now());
        app.update(Message::Tick, now());

        let effects = app.update(Message::Quit, now());

        assert_eq!(effects.last(), Some(&Effect::Quit));
        let ledger = app.stats.load();
        assert_eq!(ledger.aggregate(Scope::Today, now()).pomodoros.count, 1);
        let json = ledger_json(&app);
        let week = json["2024_01"].as_object().unwrap();
        assert!(week.keys().all(|key| key.contains('-')));
    }

    #[test]
    fn test_startup_closes_dangling_session() {
        let dir = TempDir::new().unwrap();
        let stats = StatsStore::new(dir.path().join("stats.json"));
        stats
            .save_interval(IntervalKind::Pomodoro, 1500, at("2024-01-01T08:00:00"))
            .unwrap();

        let mut app = create_test_app(&dir);
        app.update(Message::Skip, now());
        app.update(Message::Start, now());
        app.update(Message::Tick, now());
        app.update(Message::Skip, at("2024-01-01T09:10:00"));

        let json = ledger_json(&app);
        let week = json["2024_01"].as_object().unwrap();
        assert!(week.contains_key("2024.01.01_08:00:00-2024.01.01_09:00:00"));
        assert!(week.contains_key("2024.01.01_09:10:00"));
        assert_eq!(app.stats_view().today.pomodoros.count, 1);
        assert_eq!(app.stats_view().today.breaks.count, 1);
    }

    #[test]
    fn test_set_length_reloads_idle_timer() {
        let dir = TempDir::new().unwrap();
        let mut app = create_test_app(&dir);

        app.update(Message::SetLength(IntervalKind::Pomodoro, 1800), now());
        assert_eq!(app.timer.remaining_secs(), 1800);

        app.update(Message::SetLength(IntervalKind::ShortBreak, 600), now());
        assert_eq!(app.timer.remaining_secs(), 1800);
        assert_eq!(app.settings().break_length, 600);
    }

    #[test]
    fn test_set_length_leaves_running_timer_alone() {
        let dir = TempDir::new().unwrap();
        let mut app = create_test_app(&dir);
        app.update(Message::Start, now());
        app.update(Message::Tick, now());

        app.update(Message::SetLength(IntervalKind::Pomodoro, 1800), now());

        assert_eq!(app.timer.remaining_secs(), 1499);
        assert_eq!(app.settings().pomodoro_length, 1800);
    }

    #[test]
    fn test_preference_toggles_persist() {
        let dir = TempDir::new().unwrap();
        let mut app = create_test_app(&dir);

        app.update(Message::ToggleSound, now());
        app.update(Message::SelectSound("sounds/wood.mp3".to_string()), now());

        let reopened = create_test_app(&dir);
        assert!(!reopened.settings().allow_sound);
        assert_eq!(reopened.settings().timer_sound, "sounds/wood.mp3");
    }

    #[test]
    fn test_stats_write_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("stats.json")).unwrap();
        let mut app = create_test_app(&dir);
        app.update(Message::Start, now());
        app.update(Message::Tick, now());

        let effects = app.update(Message::Skip, now());

        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::StorageFailed(_))));
        // The session still moves on
        assert_eq!(app.current_kind(), IntervalKind::ShortBreak);
    }

    #[test]
    fn test_day_rollover_refreshes_stats() {
        let dir = TempDir::new().unwrap();
        let mut app = create_test_app(&dir);
        app.update(Message::Start, now());
        app.update(Message::Tick, now());
        app.update(Message::Skip, now());
        assert_eq!(app.stats_view().today.pomodoros.count, 1);

        let effects = app.update(Message::Tick, at("2024-01-02T00:00:01"));

        assert!(effects.contains(&Effect::Redraw));
        assert_eq!(app.stats_view().today.pomodoros.count, 0);
        assert_eq!(app.stats_view().week.pomodoros.count, 1);
    }
}
