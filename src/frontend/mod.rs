//! The egui presentation shell.
//!
//! A thin layer over the [`SignalStore`](crate::store::SignalStore): it
//! renders the quad layout (plot, tree, insight readout, scrubber), turns
//! user interactions into store operations and reacts to store events.
//! Everything stateful lives in the store; the shell keeps only display
//! concerns (filter text, scrub position, plot colors).

pub mod app;

pub use app::QuadViewApp;

use egui::Color32;

/// Golden ratio conjugate, used to spread plot hues evenly
const GOLDEN_RATIO: f32 = 0.618033988749895;

/// Generate a distinct plot color for the n-th selected signal.
///
/// Medium saturation and value keep the colors readable on both light and
/// dark themes.
pub fn signal_color(index: usize) -> Color32 {
    let hue = ((index as f32 * GOLDEN_RATIO) % 1.0) * 360.0;
    let (r, g, b) = hsv_to_rgb(hue, 0.7, 0.85);
    Color32::from_rgb(r, g, b)
}

/// Convert HSV (hue 0-360, saturation 0-1, value 0-1) to RGB
fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> (u8, u8, u8) {
    let c = value * saturation;
    let x = c * (1.0 - ((hue / 60.0) % 2.0 - 1.0).abs());
    let m = value - c;

    let (r, g, b) = match (hue / 60.0) as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    (
        ((r + m) * 255.0) as u8,
        ((g + m) * 255.0) as u8,
        ((b + m) * 255.0) as u8,
    )
}
