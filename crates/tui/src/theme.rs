//! Color mapping for health tones.

use chirp_types::StatusTone;
use ratatui::style::Color;

/// Terminal color for a status tone. `Alert` stays visually distinct from
/// `Failure` so a backend-reported error reads differently from
/// unreachability.
pub fn tone_color(tone: StatusTone) -> Color {
    match tone {
        StatusTone::Pending => Color::DarkGray,
        StatusTone::Affirmative => Color::Green,
        StatusTone::Caution => Color::Yellow,
        StatusTone::Alert => Color::Magenta,
        StatusTone::Failure => Color::Red,
    }
}

/// Frames for the execution throbber.
pub const THROBBER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
