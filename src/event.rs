//! Menu event handling: every menu click becomes an [`app::Message`].
//!
//! [`app::Message`]: crate::app::Message

use crate::app::Message;
use crate::menu::{
    ID_AUTOSTART_BREAK, ID_AUTOSTART_POMODORO, ID_AUTOSTART_SESSION, ID_END_SESSION, ID_PAUSE,
    ID_QUIT, ID_RESET, ID_RESUME, ID_SKIP, ID_SOUND_TOGGLE, ID_START, LENGTH_PREFIX, SOUND_PREFIX,
};
use crate::models::IntervalKind;
use crate::prefs::Autostart;
use muda::MenuEvent;

/// Translates a menu event into the message it stands for.
pub fn handle_menu_event(event: &MenuEvent) -> Option<Message> {
    let message = message_for_id(event.id().as_ref());
    if message.is_none() {
        log::debug!("Ignoring menu event {:?}", event.id());
    }
    message
}

/// Maps a menu item ID to a message. Informational items map to `None`.
pub fn message_for_id(id: &str) -> Option<Message> {
    let message = match id {
        ID_START => Message::Start,
        ID_PAUSE => Message::Pause,
        ID_RESUME => Message::Resume,
        ID_RESET => Message::Reset,
        ID_SKIP => Message::Skip,
        ID_END_SESSION => Message::EndSession,
        ID_AUTOSTART_POMODORO => Message::ToggleAutostart(Autostart::Pomodoro),
        ID_AUTOSTART_BREAK => Message::ToggleAutostart(Autostart::Break),
        ID_AUTOSTART_SESSION => Message::ToggleAutostart(Autostart::Session),
        ID_SOUND_TOGGLE => Message::ToggleSound,
        ID_QUIT => Message::Quit,
        _ => return preference_change(id),
    };
    Some(message)
}

/// Handles length and sound choices from the preference submenus.
fn preference_change(id: &str) -> Option<Message> {
    if let Some(rest) = id.strip_prefix(LENGTH_PREFIX) {
        let (kind, mins) = rest.rsplit_once('_')?;
        let kind = kind.parse::<IntervalKind>().ok()?;
        let mins = mins.parse::<u32>().ok()?;
        return Some(Message::SetLength(kind, mins * 60));
    }

    if let Some(sound) = id.strip_prefix(SOUND_PREFIX) {
        return Some(Message::SelectSound(sound.to_string()));
    }

    None
}
