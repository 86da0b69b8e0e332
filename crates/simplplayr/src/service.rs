//! Request handling for the UI boundary.
//!
//! [`AppState`] owns every store. [`spawn_service`] moves it into a single
//! task that answers requests one at a time.

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use simplplayr_types::{Field, PlaylistEntry, Request, Response};
use tokio::sync::{mpsc, oneshot};

use crate::cover_art::CoverArtFinder;
use crate::extractor::MetadataExtractor;
use crate::library::{Library, ScanOptions, ScanStep};
use crate::playlist::PlaylistStore;
use crate::settings::{Settings, SettingsStore};
use crate::storage::AppPaths;

const REQUEST_QUEUE: usize = 32;

pub struct AppState {
    pub library: Library,
    pub settings: SettingsStore,
    pub playlist: PlaylistStore,
    pub extractor: Arc<dyn MetadataExtractor>,
    pub cover_art: Arc<dyn CoverArtFinder>,
    pub scan_options: ScanOptions,
}

impl AppState {
    /// Open every store under `paths`; the library root comes from settings.
    pub fn open(
        paths: &AppPaths,
        extractor: Arc<dyn MetadataExtractor>,
        cover_art: Arc<dyn CoverArtFinder>,
    ) -> Self {
        let settings = SettingsStore::open(&paths.settings);
        let root = settings
            .settings()
            .music_directory()
            .or_else(|| Settings::defaults().music_directory())
            .unwrap_or_default();
        tracing::info!(
            data_dir = %paths.data_dir.display(),
            root = %root.display(),
            "opening library"
        );
        Self {
            library: Library::open(root, &paths.library),
            settings,
            playlist: PlaylistStore::new(&paths.playlist),
            extractor,
            cover_art,
            scan_options: ScanOptions::default(),
        }
    }

    /// Values for the configured default view, pushed once at startup.
    ///
    /// `None` until the library has been scanned.
    pub fn initial_view(&self) -> Option<Response> {
        if self.library.is_empty() {
            return None;
        }
        let field = self
            .settings
            .settings()
            .default_view()
            .unwrap_or(Field::Artist);
        Some(Response::FinderResult {
            values: self.library.get_by_field(field),
        })
    }

    pub async fn handle(&mut self, request: Request) -> Response {
        match request {
            Request::ScanLibrary { group_field } => self.scan_library(&group_field).await,
            Request::GetByField { field } => Response::FinderResult {
                values: parse_field(&field)
                    .map(|field| self.library.get_by_field(field))
                    .unwrap_or_default(),
            },
            Request::SearchByField {
                field,
                search_phrase,
            } => {
                let options = self.settings.settings().search_options();
                Response::SearchResult {
                    values: parse_field(&field)
                        .map(|field| self.library.search_by_field(field, &search_phrase, options))
                        .unwrap_or_default(),
                }
            }
            Request::GetSongPath { artist, title } => Response::SongPathResult {
                filepath: self.library.get_filepath(&artist, &title).map(str::to_owned),
            },
            Request::GetSongsBy { field, value } => {
                let songs = parse_field(&field)
                    .and_then(|field| match self.library.get_songs_by(field, &value) {
                        Ok(songs) => Some(songs),
                        Err(err) => {
                            tracing::debug!(error = %err, "songs-by request rejected");
                            None
                        }
                    })
                    .unwrap_or_default();
                Response::ListSongsResult { songs }
            }
            Request::GetSong { title } => Response::SongResult {
                song: self.library.get_song(&title).cloned(),
            },
            Request::GetSettings => Response::SettingsResult {
                settings: self.settings.settings().as_map().clone(),
                schema: self.settings.schema().options().to_vec(),
            },
            Request::GetSearchIgnoreCase => Response::SearchIgnoreCaseResult {
                value: self.settings.settings().search_ignore_case(),
            },
            Request::SetSettings { candidate } => self.set_settings(candidate),
            Request::SavePlaylist { items } => {
                self.save_playlist(&items);
                Response::PlaylistSaved
            }
            Request::GetSavedPlaylist => Response::SavedPlaylistResult {
                items: self
                    .playlist
                    .load(self.settings.settings().save_playlist(), &self.library),
            },
            Request::GetCoverArt { artist, album } => Response::CoverArtResult {
                urls: self.find_cover_art(artist, album).await,
            },
        }
    }

    async fn scan_library(&mut self, group_field: &str) -> Response {
        let outcome = self
            .library
            .scan_with_progress(
                self.extractor.clone(),
                &self.scan_options,
                |position, total, step| match step {
                    ScanStep::Indexed(song) => {
                        tracing::debug!(position, total, path = %song.filepath, "indexed")
                    }
                    ScanStep::Failed(failure) => {
                        tracing::debug!(position, total, path = %failure.filepath, "skipped")
                    }
                },
            )
            .await;

        let (failures, error) = match outcome {
            Ok(report) => {
                if let Err(err) = self.library.save() {
                    tracing::warn!(error = %format!("{err:#}"), "library snapshot not saved");
                }
                (report.failures, None)
            }
            Err(err) => {
                let message = format!("{err:#}");
                tracing::warn!(error = %message, "library scan aborted");
                (Vec::new(), Some(message))
            }
        };
        Response::ScanResult {
            values: parse_field(group_field)
                .map(|field| self.library.get_by_field(field))
                .unwrap_or_default(),
            failures,
            error,
        }
    }

    fn set_settings(&mut self, candidate: serde_json::Value) -> Response {
        let reason = match self.settings.replace(candidate) {
            Ok(()) => {
                if let Some(root) = self.settings.settings().music_directory() {
                    if root != self.library.root() {
                        tracing::info!(root = %root.display(), "music directory changed");
                        self.library.set_root(root);
                    }
                }
                String::new()
            }
            Err(err) => {
                tracing::debug!(error = %err, "settings rejected");
                err.to_string()
            }
        };
        Response::SetSettingsResult { reason }
    }

    fn save_playlist(&self, items: &[PlaylistEntry]) {
        let enabled = self.settings.settings().save_playlist();
        if let Err(err) = self.playlist.save(enabled, items) {
            tracing::warn!(error = %format!("{err:#}"), "playlist not saved");
        }
    }

    async fn find_cover_art(&self, artist: String, album: String) -> Option<Vec<String>> {
        let finder = self.cover_art.clone();
        let lookup = tokio::task::spawn_blocking(move || finder.find_cover_art(&artist, &album))
            .await
            .context("cover art task");
        match lookup {
            Ok(Ok(urls)) => urls,
            Ok(Err(err)) | Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "cover art lookup failed");
                None
            }
        }
    }
}

fn parse_field(raw: &str) -> Option<Field> {
    match raw.parse() {
        Ok(field) => Some(field),
        Err(err) => {
            tracing::debug!(error = %err, "unrecognized field");
            None
        }
    }
}

type Envelope = (Request, oneshot::Sender<Response>);

/// Cloneable sender side of the running service.
#[derive(Clone)]
pub struct ServiceHandle {
    tx: mpsc::Sender<Envelope>,
}

impl ServiceHandle {
    pub async fn request(&self, request: Request) -> Result<Response> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send((request, reply))
            .await
            .map_err(|_| anyhow!("service is not running"))?;
        response.await.context("service dropped the request")
    }
}

/// Run `state` on its own task; it stops once every handle is dropped.
pub fn spawn_service(mut state: AppState) -> ServiceHandle {
    let (tx, mut rx) = mpsc::channel::<Envelope>(REQUEST_QUEUE);
    tokio::spawn(async move {
        while let Some((request, reply)) = rx.recv().await {
            let response = state.handle(request).await;
            if reply.send(response).is_err() {
                tracing::debug!("requester went away before the response");
            }
        }
        tracing::debug!("service stopped");
    });
    ServiceHandle { tx }
}
