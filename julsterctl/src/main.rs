use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use julsterctl::commands::{self, DEFAULT_CONFIG_FILE};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "julsterctl", about = "Julster music bingo in the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store the playlist and wheel categories
    Setup {
        /// Playlist link or spotify:playlist URI
        #[arg(long)]
        playlist: String,
        /// Wheel category; repeat for more, omit to play without the wheel
        #[arg(long = "category")]
        categories: Vec<String>,
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,
    },
    /// Play rounds until you type q
    Play {
        /// Settings file; defaults to the environment and julster.toml
        #[arg(long)]
        config: Option<PathBuf>,
        /// Seed for reproducible song and wheel picks
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Validate settings and the Spotify login
    Check {
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Play track links read from stdin, one after another
    Scan {
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Convert a track share link into a Spotify URI
    Link { url: String },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Setup {
            playlist,
            categories,
            config,
        } => {
            let settings = commands::setup(&config, &playlist, &categories)?;
            println!(
                "saved {} ({} categories)",
                config.display(),
                settings.game.categories.len()
            );
        }
        Command::Play { config, seed } => commands::play(config, seed).await?,
        Command::Check { config } => commands::check(config).await?,
        Command::Scan { config } => commands::scan(config).await?,
        Command::Link { url } => println!("{}", commands::link(&url)?),
    }

    Ok(())
}
