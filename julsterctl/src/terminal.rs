//! Terminal implementations of the presentation collaborators.

use std::io::Write;
use std::sync::Mutex;

use julster_core::pulse::PulsePhase;
use julster_core::{
    AlertSink, Notice, Notifier, RenderSnapshot, RenderSurface, RoundState, Severity,
    TrackMetadata,
};
use tracing::{info, warn};

/// The parts of a snapshot worth a line of output when they change.
#[derive(Debug, Clone, PartialEq)]
struct View {
    state: RoundState,
    chosen_category: Option<String>,
    track_title: Option<String>,
    pulse_phase: Option<PulsePhase>,
}

impl From<&RenderSnapshot> for View {
    fn from(snapshot: &RenderSnapshot) -> Self {
        Self {
            state: snapshot.state,
            chosen_category: snapshot.chosen_category.clone(),
            track_title: snapshot.track.as_ref().map(|t| t.title.clone()),
            pulse_phase: snapshot.pulse_phase,
        }
    }
}

/// Prints round progress as it happens. Animation frames that only move the
/// wheel produce no output.
#[derive(Debug, Default)]
pub struct TerminalSurface {
    last: Mutex<Option<View>>,
}

impl TerminalSurface {
    fn changes(&self, snapshot: &RenderSnapshot) -> Vec<String> {
        let view = View::from(snapshot);
        let mut last = match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let lines = describe_changes(last.as_ref(), &view, snapshot);
        *last = Some(view);
        lines
    }
}

impl RenderSurface for TerminalSurface {
    fn render(&self, snapshot: &RenderSnapshot) {
        for line in self.changes(snapshot) {
            println!("{line}");
        }
    }
}

fn describe_changes(
    previous: Option<&View>,
    view: &View,
    snapshot: &RenderSnapshot,
) -> Vec<String> {
    let mut lines = Vec::new();

    if previous.map(|p| p.state) != Some(view.state) {
        lines.push(match view.state {
            RoundState::Idle => format!(
                "Ready. {} songs left. [s] spin{}",
                snapshot.remaining,
                if snapshot.categories.is_empty() {
                    ""
                } else {
                    " the wheel"
                }
            ),
            RoundState::Spinning => "The wheel is spinning...".to_string(),
            RoundState::CategoryChosen => "Starting the song...".to_string(),
            RoundState::Playing => "Playing. [p] start the countdown, [n] next song".to_string(),
            RoundState::Pulsing => "Countdown running!".to_string(),
            RoundState::Ended => "Time's up. [n] next round".to_string(),
        });
    }

    if let Some(category) = &view.chosen_category
        && previous.and_then(|p| p.chosen_category.as_ref()) != Some(category)
    {
        lines.push(format!("Category: {category}"));
    }

    if let Some(track) = &snapshot.track
        && previous.and_then(|p| p.track_title.as_ref()) != view.track_title.as_ref()
    {
        lines.push(format!("Song: {}", track_line(track)));
    }

    if view.pulse_phase != previous.and_then(|p| p.pulse_phase) {
        match view.pulse_phase {
            Some(PulsePhase::Warn) => lines.push("Guess now!".to_string()),
            Some(PulsePhase::Critical) => lines.push("Last seconds!".to_string()),
            None => {}
        }
    }

    lines
}

/// `Title - Artist, Artist (Album, 1985) added by someone`
pub fn track_line(track: &TrackMetadata) -> String {
    let mut line = track.title.clone();
    if !track.artists.is_empty() {
        line.push_str(" - ");
        line.push_str(&track.artist_line());
    }
    match (&track.album, track.release_year) {
        (Some(album), Some(year)) => line.push_str(&format!(" ({album}, {year})")),
        (Some(album), None) => line.push_str(&format!(" ({album})")),
        (None, Some(year)) => line.push_str(&format!(" ({year})")),
        (None, None) => {}
    }
    if let Some(user) = &track.added_by {
        line.push_str(&format!(" added by {user}"));
    }
    line
}

/// Shows notices on stderr.
#[derive(Debug, Default)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, notice: &Notice) {
        match notice.severity {
            Severity::Info => info!(kind = ?notice.kind, "{}", notice.message),
            Severity::Warning | Severity::Error => warn!(kind = ?notice.kind, "{}", notice.message),
        }
        eprintln!("* {notice}");
    }
}

/// Rings the terminal bell.
#[derive(Debug, Default)]
pub struct TerminalBell;

impl AlertSink for TerminalBell {
    fn sound_alert(&self) {
        let mut stdout = std::io::stdout();
        let _ = write!(stdout, "\x07");
        let _ = stdout.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(state: RoundState) -> RenderSnapshot {
        RenderSnapshot {
            state,
            rotation: 0.0,
            categories: vec!["80s".into(), "Movie".into()],
            chosen_category: None,
            track: None,
            pulse_phase: None,
            remaining: 12,
        }
    }

    #[test]
    fn frames_without_changes_are_silent() {
        let surface = TerminalSurface::default();
        let mut frame = snapshot(RoundState::Spinning);
        assert_eq!(surface.changes(&frame).len(), 1);

        frame.rotation = 720.0;
        assert!(surface.changes(&frame).is_empty());
    }

    #[test]
    fn reveal_prints_category_and_song_once() {
        let surface = TerminalSurface::default();
        surface.changes(&snapshot(RoundState::Spinning));

        let mut playing = snapshot(RoundState::Playing);
        playing.chosen_category = Some("Movie".into());
        playing.track = Some(TrackMetadata {
            title: "Take On Me".into(),
            artists: vec!["a-ha".into()],
            album: Some("Hunting High and Low".into()),
            release_year: Some(1985),
            added_by: Some("anna".into()),
        });

        let lines = surface.changes(&playing);
        assert_eq!(lines.len(), 3, "{lines:?}");
        assert_eq!(lines[1], "Category: Movie");
        assert_eq!(
            lines[2],
            "Song: Take On Me - a-ha (Hunting High and Low, 1985) added by anna"
        );
        assert!(surface.changes(&playing).is_empty());
    }

    #[test]
    fn pulse_phases_are_announced() {
        let surface = TerminalSurface::default();
        let mut pulsing = snapshot(RoundState::Pulsing);
        pulsing.pulse_phase = Some(PulsePhase::Warn);
        assert!(surface.changes(&pulsing).contains(&"Guess now!".to_string()));

        pulsing.pulse_phase = Some(PulsePhase::Critical);
        assert_eq!(surface.changes(&pulsing), vec!["Last seconds!".to_string()]);
    }

    #[test]
    fn track_line_without_extras() {
        let track = TrackMetadata {
            title: "Untitled".into(),
            ..Default::default()
        };
        assert_eq!(track_line(&track), "Untitled");
    }
}
