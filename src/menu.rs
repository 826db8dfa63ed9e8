//! Menu building and updating for the tray dropdown.

use crate::app::{App, StatsView};
use crate::config::{self, APP_NAME, SOUND_OPTIONS};
use crate::format::format_hours;
use crate::models::IntervalKind;
use crate::prefs::{Autostart, Preferences};
use crate::session::Session;
use crate::stats::Tally;
use crate::timer::IntervalTimer;
use muda::accelerator::Accelerator;
use muda::{
    AboutMetadata, CheckMenuItem, Menu, MenuId, MenuItem, PredefinedMenuItem, Submenu,
};
use std::collections::HashMap;
use thiserror::Error;

// Menu item IDs as constants
pub const ID_START: &str = "start";
pub const ID_PAUSE: &str = "pause";
pub const ID_RESUME: &str = "resume";
pub const ID_RESET: &str = "reset";
pub const ID_SKIP: &str = "skip";
pub const ID_SESSION_INFO: &str = "session_info";
pub const ID_END_SESSION: &str = "end_session";
pub const ID_AUTOSTART_POMODORO: &str = "autostart_pomodoro";
pub const ID_AUTOSTART_BREAK: &str = "autostart_break";
pub const ID_AUTOSTART_SESSION: &str = "autostart_session";
pub const ID_SOUND_TOGGLE: &str = "sound_toggle";
pub const ID_QUIT: &str = "quit";

/// Prefix of length option IDs, followed by `<kind>_<minutes>`.
pub const LENGTH_PREFIX: &str = "length_";
/// Prefix of sound option IDs, followed by the sound identifier.
pub const SOUND_PREFIX: &str = "sound_";

#[derive(Error, Debug)]
pub enum MenuError {
    #[error("Menu error: {0}")]
    Muda(#[from] muda::Error),
}

/// Today's or this week's stats lines.
pub struct StatsItems {
    pub pomodoros: MenuItem,
    pub breaks: MenuItem,
}

/// Holds references to menu items that need dynamic updates.
pub struct MenuItems {
    pub start: MenuItem,
    pub pause: MenuItem,
    pub resume: MenuItem,
    pub reset: MenuItem,
    pub skip: MenuItem,
    pub session_info: MenuItem,
    pub today: StatsItems,
    pub week: StatsItems,
    pub length_checks: HashMap<IntervalKind, HashMap<u32, CheckMenuItem>>,
    pub autostart_pomodoro: CheckMenuItem,
    pub autostart_break: CheckMenuItem,
    pub autostart_session: CheckMenuItem,
    pub sound_toggle: CheckMenuItem,
    pub sound_checks: Vec<(String, CheckMenuItem)>,
}

fn info_item(id: &str, text: String) -> MenuItem {
    MenuItem::with_id(MenuId::new(id), text, false, None::<Accelerator>)
}

fn action_item(id: &str, text: String, enabled: bool) -> MenuItem {
    MenuItem::with_id(MenuId::new(id), text, enabled, None::<Accelerator>)
}

fn toggle_item(id: String, text: &str, checked: bool) -> CheckMenuItem {
    CheckMenuItem::with_id(MenuId::new(id), text, true, checked, None::<Accelerator>)
}

/// Builds the complete menu structure.
pub fn build_menu(app: &App) -> Result<(Menu, MenuItems), MenuError> {
    let menu = Menu::new();
    let kind = app.current_kind();
    let timer = &app.timer;

    // Timer controls
    let start = action_item(ID_START, control_title("Start", kind), !timer.has_run());
    let pause = action_item(ID_PAUSE, control_title("Pause", kind), timer.is_running());
    let resume = action_item(ID_RESUME, control_title("Continue", kind), timer.is_paused());
    let reset = action_item(ID_RESET, control_title("Reset", kind), timer.has_run());
    let skip = action_item(ID_SKIP, control_title("Skip", kind), true);

    menu.append(&start)?;
    menu.append(&pause)?;
    menu.append(&resume)?;
    menu.append(&reset)?;
    menu.append(&skip)?;

    menu.append(&PredefinedMenuItem::separator())?;

    // Session
    let session_info = info_item(ID_SESSION_INFO, format_session_info(&app.session, timer));
    menu.append(&session_info)?;
    let end_session = action_item(ID_END_SESSION, "End Session".to_string(), true);
    menu.append(&end_session)?;

    menu.append(&PredefinedMenuItem::separator())?;

    // Stats
    let view = app.stats_view();
    let (today_menu, today) = build_stats_submenu("Today's Stats", "today", view, true)?;
    let (week_menu, week) = build_stats_submenu("This Week's Stats", "week", view, false)?;
    menu.append(&today_menu)?;
    menu.append(&week_menu)?;

    menu.append(&PredefinedMenuItem::separator())?;

    // Preferences
    let prefs = build_preferences_submenu(app.settings())?;
    menu.append(&prefs.submenu)?;

    menu.append(&PredefinedMenuItem::separator())?;

    let about = PredefinedMenuItem::about(
        Some(&format!("About {}", APP_NAME)),
        Some(AboutMetadata {
            name: Some(APP_NAME.to_string()),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
            authors: Some(vec![env!("CARGO_PKG_AUTHORS").to_string()]),
            license: Some(env!("CARGO_PKG_LICENSE").to_string()),
            ..Default::default()
        }),
    );
    menu.append(&about)?;

    // Quit
    let quit = action_item(ID_QUIT, format!("Quit {}", APP_NAME), true);
    menu.append(&quit)?;

    let items = MenuItems {
        start,
        pause,
        resume,
        reset,
        skip,
        session_info,
        today,
        week,
        length_checks: prefs.length_checks,
        autostart_pomodoro: prefs.autostart_pomodoro,
        autostart_break: prefs.autostart_break,
        autostart_session: prefs.autostart_session,
        sound_toggle: prefs.sound_toggle,
        sound_checks: prefs.sound_checks,
    };

    Ok((menu, items))
}

fn build_stats_submenu(
    title: &str,
    id_prefix: &str,
    view: &StatsView,
    today: bool,
) -> Result<(Submenu, StatsItems), MenuError> {
    let totals = if today { view.today } else { view.week };
    let submenu = Submenu::new(title, true);
    let pomodoros = info_item(
        &format!("{}_pomodoros", id_prefix),
        format_tally("Pomodoros", &totals.pomodoros),
    );
    let breaks = info_item(
        &format!("{}_breaks", id_prefix),
        format_tally("Breaks", &totals.breaks),
    );
    submenu.append(&pomodoros)?;
    submenu.append(&breaks)?;
    Ok((submenu, StatsItems { pomodoros, breaks }))
}

/// Items of the preferences submenu that need updating later.
struct PreferenceItems {
    submenu: Submenu,
    length_checks: HashMap<IntervalKind, HashMap<u32, CheckMenuItem>>,
    autostart_pomodoro: CheckMenuItem,
    autostart_break: CheckMenuItem,
    autostart_session: CheckMenuItem,
    sound_toggle: CheckMenuItem,
    sound_checks: Vec<(String, CheckMenuItem)>,
}

fn build_preferences_submenu(prefs: &Preferences) -> Result<PreferenceItems, MenuError> {
    let submenu = Submenu::new("Preferences", true);

    // Interval length submenus
    let mut length_checks = HashMap::new();
    for kind in IntervalKind::ALL {
        let sub = Submenu::new(format!("{} Length", length_label(kind)), true);
        let mut checks = HashMap::new();
        for &mins in config::length_options(kind) {
            let item = toggle_item(
                length_id(kind, mins),
                &format!("{} Minutes", mins),
                mins * 60 == prefs.length(kind),
            );
            sub.append(&item)?;
            checks.insert(mins, item);
        }
        submenu.append(&sub)?;
        length_checks.insert(kind, checks);
    }

    submenu.append(&PredefinedMenuItem::separator())?;

    let autostart_pomodoro = toggle_item(
        ID_AUTOSTART_POMODORO.to_string(),
        "Autostart Pomodoros",
        prefs.autostart_pomodoro,
    );
    let autostart_break = toggle_item(
        ID_AUTOSTART_BREAK.to_string(),
        "Autostart Breaks",
        prefs.autostart_break,
    );
    let autostart_session = toggle_item(
        ID_AUTOSTART_SESSION.to_string(),
        "Autostart New Session",
        prefs.autostart_session,
    );
    submenu.append(&autostart_pomodoro)?;
    submenu.append(&autostart_break)?;
    submenu.append(&autostart_session)?;

    submenu.append(&PredefinedMenuItem::separator())?;

    let sound_toggle = toggle_item(ID_SOUND_TOGGLE.to_string(), "Allow Sounds", prefs.allow_sound);
    submenu.append(&sound_toggle)?;

    let sound_sub = Submenu::new("Timer Sound", true);
    let mut sound_checks = Vec::new();
    for name in SOUND_OPTIONS {
        let id = config::sound_id(name);
        let item = toggle_item(
            format!("{}{}", SOUND_PREFIX, id),
            name,
            id == prefs.timer_sound,
        );
        sound_sub.append(&item)?;
        sound_checks.push((id, item));
    }
    submenu.append(&sound_sub)?;

    Ok(PreferenceItems {
        submenu,
        length_checks,
        autostart_pomodoro,
        autostart_break,
        autostart_session,
        sound_toggle,
        sound_checks,
    })
}

/// Updates the menu items based on the current state.
pub fn update_menu_items(items: &MenuItems, app: &App) {
    let kind = app.current_kind();
    let timer = &app.timer;

    items.start.set_text(control_title("Start", kind));
    items.pause.set_text(control_title("Pause", kind));
    items.resume.set_text(control_title("Continue", kind));
    items.reset.set_text(control_title("Reset", kind));
    items.skip.set_text(control_title("Skip", kind));

    items.start.set_enabled(!timer.has_run());
    items.pause.set_enabled(timer.is_running());
    items.resume.set_enabled(timer.is_paused());
    items.reset.set_enabled(timer.has_run());

    items
        .session_info
        .set_text(format_session_info(&app.session, timer));

    let view = app.stats_view();
    items
        .today
        .pomodoros
        .set_text(format_tally("Pomodoros", &view.today.pomodoros));
    items
        .today
        .breaks
        .set_text(format_tally("Breaks", &view.today.breaks));
    items
        .week
        .pomodoros
        .set_text(format_tally("Pomodoros", &view.week.pomodoros));
    items
        .week
        .breaks
        .set_text(format_tally("Breaks", &view.week.breaks));

    update_preference_checks(items, app.settings());
}

fn update_preference_checks(items: &MenuItems, prefs: &Preferences) {
    for (kind, checks) in &items.length_checks {
        for (&mins, check) in checks {
            check.set_checked(mins * 60 == prefs.length(*kind));
        }
    }
    items
        .autostart_pomodoro
        .set_checked(prefs.autostart_flag(Autostart::Pomodoro));
    items
        .autostart_break
        .set_checked(prefs.autostart_flag(Autostart::Break));
    items
        .autostart_session
        .set_checked(prefs.autostart_flag(Autostart::Session));
    items.sound_toggle.set_checked(prefs.allow_sound);
    for (id, check) in &items.sound_checks {
        check.set_checked(*id == prefs.timer_sound);
    }
}

/// Menu ID of a length option.
pub fn length_id(kind: IntervalKind, mins: u32) -> String {
    format!("{}{}_{}", LENGTH_PREFIX, kind.storage_name(), mins)
}

fn length_label(kind: IntervalKind) -> &'static str {
    match kind {
        IntervalKind::Pomodoro => "Pomodoro",
        IntervalKind::ShortBreak => "Short Break",
        IntervalKind::LongBreak => "Long Break",
    }
}

/// Title of a timer control button, e.g. `Start Long Break`.
pub fn control_title(action: &str, kind: IntervalKind) -> String {
    format!("{} {}", action, kind.display_name())
}

/// One glyph per pomodoro: done, running, or still to come.
pub fn format_session_info(session: &Session, timer: &IntervalTimer) -> String {
    let current = session.current_interval_index();
    let glyphs: String = session
        .slots()
        .enumerate()
        .filter(|(_, (kind, _))| *kind == IntervalKind::Pomodoro)
        .map(|(index, (_, slot))| {
            if Some(index) == current && timer.has_run() {
                "⏳"
            } else if slot.is_started() {
                "🍅"
            } else {
                "◯"
            }
        })
        .collect();
    format!("Session: {}", glyphs)
}

/// Stats line such as `3 Pomodoros = 1h 15m`.
pub fn format_tally(label: &str, tally: &Tally) -> String {
    format!(
        "{} {} = {}",
        tally.count,
        label,
        format_hours(tally.total_seconds)
    )
}
