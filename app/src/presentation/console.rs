//! Headless renderer that writes the feed to a terminal.

use std::io::Write;

use chat_bus::ChatEvent;
use now_playing::PlaybackSnapshot;

use super::{ColorStore, FrameView, Renderer, Rgb};

/// Writes each new chat line as `[Platform] author: text`, with the
/// author in their derived color, plus a now-playing line whenever the
/// track or its play state changes.
pub struct ConsoleRenderer<W> {
    out: W,
    colors: ColorStore,
    ansi: bool,
    announced: Option<(String, bool)>,
}

impl<W: Write + Send> ConsoleRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            colors: ColorStore::default(),
            ansi: true,
            announced: None,
        }
    }

    /// Plain text without color escapes.
    pub fn plain(out: W) -> Self {
        Self {
            ansi: false,
            ..Self::new(out)
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn chat_line(&mut self, event: &ChatEvent) -> String {
        let author = if self.ansi {
            paint(self.colors.color_for(event.author()), event.author())
        } else {
            event.author().to_string()
        };
        format!("[{}] {}: {}", event.platform(), author, event.text())
    }

    fn playback_line(&self, snapshot: &PlaybackSnapshot, changed: bool) -> String {
        let status = if snapshot.is_playing { "playing" } else { "paused" };
        let label = if changed { "Track changed" } else { "Now playing" };
        let mut line = format!("♪ {label}: {}", snapshot.title);
        if !snapshot.artists.is_empty() {
            line.push_str(&format!(" - {}", snapshot.artist_line()));
        }
        if let Some(album) = &snapshot.album {
            line.push_str(&format!(" ({album})"));
        }
        line.push_str(&format!(" [{status}]"));
        line
    }
}

fn paint(color: Rgb, text: &str) -> String {
    format!("\x1b[38;2;{};{};{}m{text}\x1b[0m", color.r, color.g, color.b)
}

impl<W: Write + Send> Renderer for ConsoleRenderer<W> {
    fn render(&mut self, frame: &FrameView<'_>) -> std::io::Result<()> {
        if frame.new_events.is_empty() && frame.playback.is_none() {
            return Ok(());
        }
        for event in frame.new_events {
            let line = self.chat_line(event);
            writeln!(self.out, "{line}")?;
        }

        if let Some(snapshot) = frame.playback {
            let key = (snapshot.title.clone(), snapshot.is_playing);
            if self.announced.as_ref() != Some(&key) {
                let line = self.playback_line(snapshot, frame.track_changed);
                writeln!(self.out, "{line}")?;
                self.announced = Some(key);
            }
        }
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use chat_bus::{DisplayLog, Platform};
    use chrono::Utc;

    use super::*;

    fn event(platform: Platform, author: &str, text: &str) -> ChatEvent {
        ChatEvent::new(platform, author, text).unwrap()
    }

    fn snapshot(title: &str, playing: bool) -> PlaybackSnapshot {
        PlaybackSnapshot {
            title: title.into(),
            artists: vec!["Artist One".into(), "Artist Two".into()],
            album: Some("Album X".into()),
            cover_url: None,
            is_playing: playing,
            observed_at: Utc::now(),
        }
    }

    fn render(
        renderer: &mut ConsoleRenderer<Vec<u8>>,
        events: &[ChatEvent],
        playback: Option<&PlaybackSnapshot>,
        track_changed: bool,
    ) {
        let log = DisplayLog::default();
        renderer
            .render(&FrameView {
                new_events: events,
                log: &log,
                playback,
                track_changed,
                cover: None,
            })
            .unwrap();
    }

    fn output(renderer: ConsoleRenderer<Vec<u8>>) -> String {
        String::from_utf8(renderer.into_inner()).unwrap()
    }

    #[test]
    fn writes_platform_prefixed_lines() {
        let mut renderer = ConsoleRenderer::plain(Vec::new());
        render(
            &mut renderer,
            &[
                event(Platform::Twitch, "alice", "hello: world"),
                event(Platform::YouTube, "Bob", "hi"),
            ],
            None,
            false,
        );
        assert_eq!(
            output(renderer),
            "[Twitch] alice: hello: world\n[YouTube] Bob: hi\n"
        );
    }

    #[test]
    fn colored_author_uses_truecolor_escape() {
        let mut renderer = ConsoleRenderer::new(Vec::new());
        render(&mut renderer, &[event(Platform::TikTok, "carol", "yo")], None, false);
        let color = super::super::derive_color("carol");
        let expected = format!(
            "[TikTok] \x1b[38;2;{};{};{}mcarol\x1b[0m: yo\n",
            color.r, color.g, color.b
        );
        assert_eq!(output(renderer), expected);
    }

    #[test]
    fn now_playing_printed_once_per_change() {
        let mut renderer = ConsoleRenderer::plain(Vec::new());
        let a = snapshot("Song A", true);
        let a_paused = snapshot("Song A", false);
        let b = snapshot("Song B", true);

        render(&mut renderer, &[], Some(&a), false);
        render(&mut renderer, &[], Some(&a), false);
        render(&mut renderer, &[], Some(&a_paused), false);
        render(&mut renderer, &[], Some(&b), true);
        render(&mut renderer, &[], Some(&b), true);

        assert_eq!(
            output(renderer),
            "♪ Now playing: Song A - Artist One, Artist Two (Album X) [playing]\n\
             ♪ Now playing: Song A - Artist One, Artist Two (Album X) [paused]\n\
             ♪ Track changed: Song B - Artist One, Artist Two (Album X) [playing]\n"
        );
    }
}
