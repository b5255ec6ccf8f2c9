use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use julster_config::{ConfigWarnings, Settings};
use julster_core::{BingoSession, Collaborators, TrackId};
use julster_spotify::{SessionStatus, SpotifyClient};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::input;
use crate::scan;
use crate::terminal::{TerminalBell, TerminalNotifier, TerminalSurface};

pub const DEFAULT_CONFIG_FILE: &str = "julster.toml";

/// Store the playlist and wheel categories, keeping any other settings
/// already in `path`.
pub fn setup(path: &Path, playlist: &str, categories: &[String]) -> Result<Settings> {
    let mut settings = if path.exists() {
        Settings::load_from_file(path)?
    } else {
        Settings::default()
    };

    let playlist = settings.game.set_playlist(playlist)?;
    settings.game.set_categories(categories);
    settings.save(path)?;

    info!(playlist = %playlist.id(), categories = settings.game.categories.len(), "setup stored");
    Ok(settings)
}

pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let (settings, source) = Settings::load(path)?;
    info!(?source, "using settings");
    report_warnings(&settings.validate());
    Ok(settings)
}

fn report_warnings(warnings: &ConfigWarnings) {
    for warning in warnings.iter() {
        warn!("{warning}");
    }
}

/// Play rounds against the configured playlist until stdin closes or the
/// host types `q`.
pub async fn play(config: Option<PathBuf>, seed: Option<u64>) -> Result<()> {
    let settings = load_settings(config.as_deref())?;
    let client = SpotifyClient::new(&settings.spotify)?;

    let refresher = if settings.spotify.refresh_interval_secs > 0
        && client.credentials().await.refresh_token.is_some()
    {
        let every = Duration::from_secs(settings.spotify.refresh_interval_secs);
        Some(tokio::spawn(client.clone().keep_token_fresh(every)))
    } else {
        None
    };

    let session_config = settings.session.clone();
    let client = Arc::new(client);
    let services = Collaborators {
        playback: client.clone(),
        catalog: client,
        settings: Arc::new(settings),
        notifier: Arc::new(TerminalNotifier),
        render: Arc::new(TerminalSurface::default()),
        alert: Arc::new(TerminalBell),
    };

    let mut builder = BingoSession::builder(services).config(session_config);
    if let Some(seed) = seed {
        builder = builder.rng(seed);
    }
    let mut session = builder.build();

    let loaded = session.load().await.context("could not load the playlist")?;
    if loaded == 0 {
        bail!("the playlist has no playable songs");
    }

    let (tx, rx) = mpsc::channel(16);
    let reader = tokio::spawn(input::read_stdin(tx));

    session.run(rx).await;

    reader.abort();
    if let Some(refresher) = refresher {
        refresher.abort();
    }
    Ok(())
}

/// Print configuration warnings and whether the stored token still works.
pub async fn check(config: Option<PathBuf>) -> Result<()> {
    let (settings, source) = Settings::load(config.as_deref())?;
    println!("settings: {source:?}");

    let warnings = settings.validate();
    if warnings.is_empty() {
        println!("configuration looks good");
    }
    for warning in warnings.iter() {
        println!("warning: {warning}");
    }

    let client = SpotifyClient::new(&settings.spotify)?;
    let mut status = client.check_session().await?;
    if status == SessionStatus::LoggedOut && client.credentials().await.refresh_token.is_some() {
        match client.refresh_access_token().await {
            Ok(()) => status = client.check_session().await?,
            Err(error) => warn!(%error, "token refresh failed"),
        }
    }

    match status {
        SessionStatus::LoggedIn(profile) => println!(
            "logged in as {}",
            profile.display_name.as_deref().unwrap_or(&profile.id)
        ),
        SessionStatus::LoggedOut => println!("not logged in to Spotify"),
    }
    Ok(())
}

/// Play each track link read from stdin, stopping the previous song first.
pub async fn scan(config: Option<PathBuf>) -> Result<()> {
    let settings = load_settings(config.as_deref())?;
    let client = SpotifyClient::new(&settings.spotify)?;

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let report = scan::scan_and_play(stdin, &client).await;
    info!(?report, "scan finished");
    println!(
        "played {} ({} not links, {} failed)",
        report.played, report.rejected, report.failed
    );
    Ok(())
}

/// Turn a share link into a playable track URI.
pub fn link(input: &str) -> Result<String> {
    let id = TrackId::from_share_link(input)?;
    Ok(id.as_str().to_string())
}
