//! `simplplayr`: local music library manager.
//!
//! Each subcommand sends one request to the library service and prints the
//! response as JSON on stdout. Logs go to stderr.

mod cover_art;
mod extractor;
mod library;
mod playlist;
mod service;
mod settings;
mod storage;
mod walker;

#[cfg(test)]
mod test_support;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use simplplayr_types::{PlaylistEntry, Request, Response};
use tracing_subscriber::EnvFilter;

use crate::cover_art::{CoverArtFinder, MusicBrainzCoverArt, NoCoverArt};
use crate::extractor::SymphoniaExtractor;
use crate::service::{AppState, spawn_service};
use crate::storage::AppPaths;

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_SHA"),
    ", ",
    env!("BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "simplplayr", version = VERSION)]
struct Args {
    /// Directory for settings, library and playlist snapshots (default ~/.simplplayr).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Do not query MusicBrainz for cover art.
    #[arg(long, global = true)]
    no_cover_art: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the default view of the stored library.
    View,
    /// Rescan the music directory.
    Scan {
        /// Field to group the scanned songs by.
        #[arg(long, default_value = "artist")]
        group: String,
    },
    /// Distinct values of a field.
    List { field: String },
    /// Search the values of a field.
    Search { field: String, phrase: String },
    /// File path of the song with this artist and title.
    Path { artist: String, title: String },
    /// Songs whose field equals a value.
    Songs { field: String, value: String },
    /// First song with this title.
    Song { title: String },
    Settings {
        #[command(subcommand)]
        action: SettingsCommand,
    },
    Playlist {
        #[command(subcommand)]
        action: PlaylistCommand,
    },
    /// Cover image URLs for an album.
    Cover { artist: String, album: String },
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    Get,
    /// Whether searches currently ignore case.
    IgnoreCase,
    /// Replace the settings with a JSON object.
    Set { json: String },
}

#[derive(Subcommand, Debug)]
enum PlaylistCommand {
    /// Save a JSON array of playlist entries.
    Save { json: String },
    Show,
}

impl Command {
    /// The service request for this command; `None` for `view`.
    fn into_request(self) -> Result<Option<Request>> {
        let request = match self {
            Command::View => return Ok(None),
            Command::Scan { group } => Request::ScanLibrary { group_field: group },
            Command::List { field } => Request::GetByField { field },
            Command::Search { field, phrase } => Request::SearchByField {
                field,
                search_phrase: phrase,
            },
            Command::Path { artist, title } => Request::GetSongPath { artist, title },
            Command::Songs { field, value } => Request::GetSongsBy { field, value },
            Command::Song { title } => Request::GetSong { title },
            Command::Settings {
                action: SettingsCommand::Get,
            } => Request::GetSettings,
            Command::Settings {
                action: SettingsCommand::IgnoreCase,
            } => Request::GetSearchIgnoreCase,
            Command::Settings {
                action: SettingsCommand::Set { json },
            } => Request::SetSettings {
                candidate: serde_json::from_str(&json).context("settings must be valid JSON")?,
            },
            Command::Playlist {
                action: PlaylistCommand::Save { json },
            } => {
                let items: Vec<PlaylistEntry> =
                    serde_json::from_str(&json).context("playlist must be a JSON array")?;
                Request::SavePlaylist { items }
            }
            Command::Playlist {
                action: PlaylistCommand::Show,
            } => Request::GetSavedPlaylist,
            Command::Cover { artist, album } => Request::GetCoverArt { artist, album },
        };
        Ok(Some(request))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,simplplayr=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let paths = match args.data_dir {
        Some(dir) => AppPaths::in_dir(dir),
        None => AppPaths::default_location()?,
    };
    let cover_art: Arc<dyn CoverArtFinder> = if args.no_cover_art {
        Arc::new(NoCoverArt)
    } else {
        Arc::new(MusicBrainzCoverArt::new())
    };
    let state = AppState::open(&paths, Arc::new(SymphoniaExtractor), cover_art);

    let Some(request) = args.command.into_request()? else {
        let view = state
            .initial_view()
            .unwrap_or(Response::FinderResult { values: Vec::new() });
        return print_json(&view);
    };
    let service = spawn_service(state);
    let response = service.request(request).await?;
    print_json(&response)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("response serialization failed")?;
    println!("{rendered}");
    Ok(())
}
