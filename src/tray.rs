//! Tray icon generation for the menubar.

use crate::models::IntervalKind;
use thiserror::Error;
use tray_icon::Icon;

#[derive(Error, Debug)]
pub enum TrayError {
    #[error("Failed to load icon: {0}")]
    IconLoad(#[from] tray_icon::BadIcon),
}

/// Standard macOS tray icon size.
const ICON_SIZE: u32 = 22;

fn icon_color(kind: IntervalKind) -> [u8; 3] {
    match kind {
        IntervalKind::Pomodoro => [220, 50, 47],
        IntervalKind::ShortBreak => [76, 153, 0],
        IntervalKind::LongBreak => [230, 170, 20],
    }
}

/// RGBA pixels of a filled, anti-aliased circle in the color of `kind`.
fn icon_rgba(kind: IntervalKind) -> Vec<u8> {
    let size = ICON_SIZE;
    let [r, g, b] = icon_color(kind);
    let mut rgba = Vec::with_capacity((size * size * 4) as usize);

    let center = size as f32 / 2.0;
    let radius = (size as f32 / 2.0) - 2.0;

    for y in 0..size {
        for x in 0..size {
            let dx = x as f32 + 0.5 - center;
            let dy = y as f32 + 0.5 - center;
            let distance = (dx * dx + dy * dy).sqrt();

            let alpha = if distance <= radius {
                255
            } else if distance <= radius + 1.0 {
                ((radius + 1.0 - distance) * 255.0) as u8
            } else {
                0
            };
            rgba.extend_from_slice(&[r, g, b, alpha]);
        }
    }

    rgba
}

/// Builds the tray icon shown while an interval of `kind` is loaded.
pub fn load_icon(kind: IntervalKind) -> Result<Icon, TrayError> {
    Icon::from_rgba(icon_rgba(kind), ICON_SIZE, ICON_SIZE).map_err(TrayError::IconLoad)
}
