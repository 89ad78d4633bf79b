//! Presentation seam: what the frame loop hands to a renderer each frame.

pub mod colors;
pub mod console;

use chat_bus::{ChatEvent, DisplayLog};
use now_playing::{CoverImage, PlaybackSnapshot};

pub use colors::{ColorStore, Rgb, derive_color};
pub use console::ConsoleRenderer;

/// Everything visible in one frame.
pub struct FrameView<'a> {
    /// Events drained from the bus this frame, in arrival order
    pub new_events: &'a [ChatEvent],
    pub log: &'a DisplayLog,
    pub playback: Option<&'a PlaybackSnapshot>,
    /// True while the "track changed" window is open
    pub track_changed: bool,
    pub cover: Option<&'a CoverImage>,
}

/// Draws frames. Called once per tick from the frame loop.
pub trait Renderer: Send {
    fn render(&mut self, frame: &FrameView<'_>) -> std::io::Result<()>;
}
