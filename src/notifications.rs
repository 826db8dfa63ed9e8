//! macOS system notifications for timer events.

use crate::config::{interval_end_message, APP_NAME};
use crate::models::IntervalKind;
use notify_rust::Notification;
use std::thread;

/// Shows a notification in a background thread to avoid blocking.
fn show(body: String) {
    thread::spawn(move || {
        if let Err(e) = Notification::new().summary(APP_NAME).body(&body).show() {
            log::error!("Failed to show notification: {}", e);
        }
    });
}

/// Shows a notification when an interval runs out.
pub fn notify_interval_ended(kind: IntervalKind) {
    show(interval_end_message(kind).to_string());
}

/// Tells the user their stats or preferences could not be saved.
pub fn notify_storage_failure(message: &str) {
    show(format!("Could not save your data. {}", message));
}
