//! Play songs one after another from scanned share links.
//!
//! Each line on the reader is a track link, as a card scanner or a pasted QR
//! code would produce. The song already playing is stopped before the next
//! one starts, and the last one is stopped when the input ends.

use julster_core::{PlaybackService, TrackId};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

/// What happened to the lines of one scan run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub played: usize,
    pub rejected: usize,
    pub failed: usize,
}

pub async fn scan_and_play<R>(reader: R, playback: &dyn PlaybackService) -> ScanReport
where
    R: AsyncBufRead + Unpin,
{
    let mut report = ScanReport::default();
    let mut playing = false;
    let mut lines = reader.lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(error) => {
                warn!(%error, "failed to read link");
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "q" | "quit" | "exit") {
            break;
        }

        let track = match TrackId::from_share_link(line) {
            Ok(track) => track,
            Err(error) => {
                debug!(link = line, %error, "not a track link");
                eprintln!("not a track link: {line}");
                report.rejected += 1;
                continue;
            }
        };

        if playing {
            stop(playback).await;
            playing = false;
        }

        match playback.start_playback(&track).await {
            Ok(()) => {
                info!(track = %track.as_str(), "scanned track started");
                println!("playing {}", track.as_str());
                playing = true;
                report.played += 1;
            }
            Err(error) => {
                eprintln!("could not play {}: {error}", track.as_str());
                report.failed += 1;
            }
        }
    }

    if playing {
        stop(playback).await;
    }
    report
}

async fn stop(playback: &dyn PlaybackService) {
    if let Err(error) = playback.stop_playback().await {
        warn!(%error, "failed to stop playback");
    }
}
