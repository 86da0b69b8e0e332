//! Song catalog: scanning, indexing, and queries.
//!
//! A scan walks the music root, extracts tags one file at a time, and replaces
//! the song list wholesale. Queries run over the in-memory list.

use std::borrow::Cow;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use simplplayr_types::{Field, FieldError, ScanFailure, Song};

use crate::extractor::MetadataExtractor;
use crate::storage::{read_snapshot, write_snapshot};
use crate::walker::walk_level_order;

const DEFAULT_EXTRACT_TIMEOUT: Duration = Duration::from_secs(30);

/// Scan tuning.
#[derive(Clone, Debug)]
pub struct ScanOptions {
    /// Upper bound for a single extraction; `None` waits forever.
    pub extract_timeout: Option<Duration>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            extract_timeout: Some(DEFAULT_EXTRACT_TIMEOUT),
        }
    }
}

/// Outcome of a completed scan.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScanReport {
    /// Plain files found under the root.
    pub discovered: usize,
    /// Songs now in the catalog.
    pub indexed: usize,
    pub failures: Vec<ScanFailure>,
}

/// Per-file progress reported while a scan runs.
#[derive(Debug)]
pub enum ScanStep<'a> {
    Indexed(&'a Song),
    Failed(&'a ScanFailure),
}

/// Search behaviour flags, normally taken from settings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchOptions {
    pub ignore_case: bool,
    pub partial: bool,
}

/// The authoritative in-memory song list plus its snapshot location.
#[derive(Clone, Debug)]
pub struct Library {
    root: PathBuf,
    snapshot: PathBuf,
    songs: Vec<Song>,
}

impl Library {
    /// Restore the catalog from `snapshot`, or start empty when there is none.
    pub fn open(root: impl Into<PathBuf>, snapshot: impl Into<PathBuf>) -> Self {
        let mut library = Self::with_songs(root, snapshot, Vec::new());
        match library.load() {
            Ok(Some(songs)) => {
                tracing::info!(songs = songs.len(), "library snapshot loaded");
                library.songs = songs;
            }
            Ok(None) => tracing::info!(path = %library.snapshot.display(), "library is not found"),
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "library snapshot unreadable; starting empty")
            }
        }
        library
    }

    pub fn with_songs(
        root: impl Into<PathBuf>,
        snapshot: impl Into<PathBuf>,
        songs: Vec<Song>,
    ) -> Self {
        Self {
            root: root.into(),
            snapshot: snapshot.into(),
            songs,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Point the next scan at a different music directory.
    pub fn set_root(&mut self, root: impl Into<PathBuf>) {
        self.root = root.into();
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    /// Full rescan using default options and no progress reporting.
    pub async fn scan(&mut self, extractor: Arc<dyn MetadataExtractor>) -> Result<ScanReport> {
        self.scan_with_progress(extractor, &ScanOptions::default(), |_, _, _| {})
            .await
    }

    /// Walk the root, then extract every file strictly one after another.
    ///
    /// A walk error aborts the scan and keeps the previous song list. A file
    /// that fails or times out is logged, reported, and skipped.
    pub async fn scan_with_progress<F>(
        &mut self,
        extractor: Arc<dyn MetadataExtractor>,
        options: &ScanOptions,
        mut on_step: F,
    ) -> Result<ScanReport>
    where
        F: FnMut(usize, usize, ScanStep<'_>),
    {
        let root = self.root.clone();
        tracing::info!(root = %root.display(), "scanning library");
        let stubs = tokio::task::spawn_blocking(move || walk_level_order(&root))
            .await
            .context("library walk task")??;

        let total = stubs.len();
        let mut songs = Vec::with_capacity(total);
        let mut failures = Vec::new();

        for (position, stub) in stubs.into_iter().enumerate() {
            let filepath = stub.filepath.clone();
            match extract_one(extractor.clone(), stub, options.extract_timeout).await {
                Ok(song) => {
                    on_step(position, total, ScanStep::Indexed(&song));
                    songs.push(song);
                }
                Err(reason) => {
                    tracing::warn!(path = %filepath, error = %reason, "metadata extraction failed");
                    let failure = ScanFailure { filepath, reason };
                    on_step(position, total, ScanStep::Failed(&failure));
                    failures.push(failure);
                }
            }
        }

        self.songs = songs;
        let report = ScanReport {
            discovered: total,
            indexed: self.songs.len(),
            failures,
        };
        tracing::info!(
            root = %self.root.display(),
            discovered = report.discovered,
            indexed = report.indexed,
            failures = report.failures.len(),
            "library scan complete"
        );
        Ok(report)
    }

    /// Distinct values of `field`, in first-occurrence order.
    pub fn get_by_field(&self, field: Field) -> Vec<String> {
        unique(self.songs.iter().map(|song| field.value_of(song)))
    }

    /// Songs whose `field` equals `value` exactly, in catalog order.
    pub fn get_songs_by(&self, field: Field, value: &str) -> Result<Vec<Song>, FieldError> {
        if !field.is_filterable() {
            return Err(FieldError::NotFilterable(field));
        }
        Ok(self
            .songs
            .iter()
            .filter(|song| field.value_of(song) == value)
            .cloned()
            .collect())
    }

    pub fn get_song(&self, title: &str) -> Option<&Song> {
        self.songs.iter().find(|song| song.title == title)
    }

    pub fn get_filepath(&self, artist: &str, title: &str) -> Option<&str> {
        self.songs
            .iter()
            .find(|song| song.artist == artist && song.title == title)
            .map(|song| song.filepath.as_str())
    }

    /// Matching values of `field`.
    ///
    /// Partial mode collects every subsequence match; exact mode stops at the
    /// first equal value.
    pub fn search_by_field(&self, field: Field, phrase: &str, options: SearchOptions) -> Vec<String> {
        let phrase = fold_case(phrase, options.ignore_case);
        let mut matched = Vec::new();

        for song in &self.songs {
            let raw = field.value_of(song);
            let candidate = fold_case(raw, options.ignore_case);
            if options.partial {
                if fuzzy_match(&phrase, &candidate) {
                    matched.push(raw);
                }
            } else if candidate == phrase {
                matched.push(raw);
                break;
            }
        }

        unique(matched)
    }

    /// Persist the current song list.
    pub fn save(&self) -> Result<()> {
        write_snapshot(&self.snapshot, &self.songs)?;
        tracing::debug!(path = %self.snapshot.display(), songs = self.songs.len(), "library saved");
        Ok(())
    }

    /// Read the persisted song list; `Ok(None)` when nothing was saved yet.
    pub fn load(&self) -> Result<Option<Vec<Song>>> {
        read_snapshot(&self.snapshot)
    }
}

async fn extract_one(
    extractor: Arc<dyn MetadataExtractor>,
    mut song: Song,
    timeout: Option<Duration>,
) -> Result<Song, String> {
    let path = PathBuf::from(&song.filepath);
    let mut task = tokio::task::spawn_blocking(move || extractor.extract(&path));
    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, &mut task).await {
            Ok(joined) => joined,
            Err(_) => {
                // A blocking extraction cannot be cancelled; it must finish
                // before the next file starts.
                tracing::warn!(path = %song.filepath, limit_ms = limit.as_millis() as u64, "extraction over time limit");
                let _ = task.await;
                return Err(format!("extraction timed out after {}ms", limit.as_millis()));
            }
        },
        None => task.await,
    };
    match joined {
        Ok(Ok(tags)) => {
            tags.apply(&mut song);
            Ok(song)
        }
        Ok(Err(err)) => Err(format!("{err:#}")),
        Err(err) => Err(format!("extraction task failed: {err}")),
    }
}

/// `true` when every char of `needle` appears in `haystack` in order.
pub fn fuzzy_match(needle: &str, haystack: &str) -> bool {
    let mut hay = haystack.chars();
    needle.chars().all(|wanted| hay.any(|ch| ch == wanted))
}

fn fold_case(value: &str, ignore_case: bool) -> Cow<'_, str> {
    if ignore_case {
        Cow::Owned(value.to_lowercase())
    } else {
        Cow::Borrowed(value)
    }
}

fn unique<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|value| seen.insert(*value))
        .map(str::to_owned)
        .collect()
}
