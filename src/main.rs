//! Tomado - a native macOS menubar Pomodoro timer.
//!
//! Runs sessions of pomodoros and breaks from the menubar and keeps weekly
//! stats of the time actually spent in each interval.

use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use muda::MenuEvent;
use tray_icon::{TrayIcon, TrayIconBuilder};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::WindowId;

mod app;
mod audio;
mod config;
mod event;
mod format;
mod menu;
mod models;
mod notifications;
mod persistence;
mod prefs;
mod session;
mod stats;
mod timer;
mod tray;

use app::{App, Effect, Message};
use audio::AudioPlayer;
use config::AppConfig;
use menu::MenuItems;
use models::IntervalKind;

/// How long the event loop sleeps between checks for ticks and menu clicks.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Application handler for the winit event loop.
struct Tomado {
    app: App,
    config: AppConfig,
    tray: TrayIcon,
    menu_items: MenuItems,
    tick_rx: Receiver<Message>,
    audio: Option<AudioPlayer>,
    icon_kind: IntervalKind,
}

impl Tomado {
    fn new(
        app: App,
        config: AppConfig,
        tray: TrayIcon,
        menu_items: MenuItems,
        tick_rx: Receiver<Message>,
    ) -> Self {
        // Audio is created on the main thread to avoid Send issues
        let audio = match AudioPlayer::new() {
            Ok(player) => Some(player),
            Err(e) => {
                log::warn!("Sounds disabled: {}", e);
                None
            }
        };
        let icon_kind = app.current_kind();

        Self {
            app,
            config,
            tray,
            menu_items,
            tick_rx,
            audio,
            icon_kind,
        }
    }

    fn redraw(&mut self) {
        self.tray
            .set_title(Some(format::format_tray_title(&self.app.timer)));
        let tooltip =
            format::format_tooltip(&self.app.timer, self.app.session.completed_pomodoros());
        if let Err(e) = self.tray.set_tooltip(Some(tooltip)) {
            log::error!("Failed to set tray tooltip: {}", e);
        }
        menu::update_menu_items(&self.menu_items, &self.app);

        let kind = self.app.current_kind();
        if kind != self.icon_kind {
            match tray::load_icon(kind) {
                Ok(icon) => {
                    if let Err(e) = self.tray.set_icon(Some(icon)) {
                        log::error!("Failed to set tray icon: {}", e);
                    }
                }
                Err(e) => log::error!("{}", e),
            }
            self.icon_kind = kind;
        }
    }

    fn dispatch(&mut self, message: Message, event_loop: &ActiveEventLoop) {
        let effects = self.app.update(message, local_now());
        let allow_sound = self.app.settings().allow_sound;

        for effect in effects {
            match effect {
                Effect::Redraw => self.redraw(),
                Effect::ButtonSound => {
                    if let (true, Some(audio)) = (allow_sound, &self.audio) {
                        audio.play_click();
                    }
                }
                Effect::IntervalEnded(kind) => {
                    notifications::notify_interval_ended(kind);
                    if let (true, Some(audio)) = (allow_sound, &self.audio) {
                        let sound = self.config.resource(&self.app.settings().timer_sound);
                        audio.play_timer_sound(&sound);
                    }
                }
                Effect::StorageFailed(message) => {
                    notifications::notify_storage_failure(&message);
                }
                Effect::Quit => event_loop.exit(),
            }
        }
    }

    fn process_ticks(&mut self, event_loop: &ActiveEventLoop) {
        while let Ok(message) = self.tick_rx.try_recv() {
            self.dispatch(message, event_loop);
        }
    }

    fn process_menu_events(&mut self, event_loop: &ActiveEventLoop) {
        while let Ok(event) = MenuEvent::receiver().try_recv() {
            if let Some(message) = event::handle_menu_event(&event) {
                self.dispatch(message, event_loop);
            }
        }
    }
}

impl ApplicationHandler for Tomado {
    fn resumed(&mut self, _event_loop: &ActiveEventLoop) {
        // Nothing to do on resume for a tray-only app
    }

    fn window_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        _event: WindowEvent,
    ) {
        // No window events for a tray-only app
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::wait_duration(POLL_INTERVAL));

        self.process_ticks(event_loop);
        self.process_menu_events(event_loop);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env();
    log::info!("Using data directory {}", config.data_dir.display());

    let app = App::new(&config, local_now());

    // Create event loop (required for tray on macOS)
    let event_loop = EventLoop::new()?;

    let (built_menu, menu_items) = menu::build_menu(&app)?;

    let tray = TrayIconBuilder::new()
        .with_menu(Box::new(built_menu))
        .with_icon(tray::load_icon(app.current_kind())?)
        .with_title(format::format_tray_title(&app.timer))
        .with_tooltip(format!("{} - Pomodoro Timer", config::APP_NAME))
        .build()?;

    // Ticks are the only thing coming from another thread; all state
    // changes happen on the main thread in `App::update`.
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || timer::run_ticker(tx));

    let mut tomado = Tomado::new(app, config, tray, menu_items, rx);
    event_loop.run_app(&mut tomado)?;

    Ok(())
}
