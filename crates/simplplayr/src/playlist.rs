//! Saved playback queue.

use std::path::{Path, PathBuf};

use anyhow::Result;
use simplplayr_types::PlaylistEntry;

use crate::library::Library;
use crate::storage::{read_snapshot, write_snapshot};

#[derive(Clone, Debug)]
pub struct PlaylistStore {
    path: PathBuf,
}

impl PlaylistStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Restore the saved queue if every entry is still in `library`.
    ///
    /// Returns an empty queue when saving is disabled, nothing was saved,
    /// the snapshot is unreadable, or any entry no longer matches a song.
    pub fn load(&self, save_playlist: bool, library: &Library) -> Vec<PlaylistEntry> {
        if !save_playlist {
            return Vec::new();
        }
        let items: Vec<PlaylistEntry> = match read_snapshot(&self.path) {
            Ok(Some(items)) => items,
            Ok(None) => {
                tracing::info!(path = %self.path.display(), "playlist is not found");
                return Vec::new();
            }
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "playlist unreadable; starting empty");
                return Vec::new();
            }
        };

        for item in &items {
            if !library.songs().iter().any(|song| item.matches(song)) {
                tracing::warn!(
                    artist = %item.artist,
                    album = %item.album,
                    genre = %item.genre,
                    title = %item.title,
                    "could not find song ({}, {}, {}, {}) in library",
                    item.artist,
                    item.album,
                    item.genre,
                    item.title
                );
                return Vec::new();
            }
        }
        tracing::debug!(items = items.len(), "playlist restored");
        items
    }

    /// Overwrite the saved queue; a no-op when saving is disabled.
    pub fn save(&self, save_playlist: bool, items: &[PlaylistEntry]) -> Result<()> {
        if !save_playlist {
            return Ok(());
        }
        write_snapshot(&self.path, items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::tests::song;
    use crate::test_support::temp_root;

    fn library() -> Library {
        Library::with_songs(
            "/music",
            "/nonexistent/library.json",
            vec![
                song("Abba", "Waterloo", "Waterloo", "Pop"),
                song("Queen", "Bicycle Race", "Jazz", "Rock"),
            ],
        )
    }

    fn entry(artist: &str, title: &str, album: &str, genre: &str) -> PlaylistEntry {
        PlaylistEntry {
            artist: artist.into(),
            title: title.into(),
            album: album.into(),
            genre: genre.into(),
            ..Default::default()
        }
    }

    #[test]
    fn round_trips_when_every_entry_matches() {
        let store = PlaylistStore::new(temp_root("playlist-ok").join("playlist.json"));
        let items = vec![
            entry("Queen", "Bicycle Race", "Jazz", "Rock"),
            entry("Abba", "Waterloo", "Waterloo", "Pop"),
        ];
        store.save(true, &items).unwrap();
        assert_eq!(store.load(true, &library()), items);
    }

    #[test]
    fn one_missing_entry_discards_everything() {
        let store = PlaylistStore::new(temp_root("playlist-miss").join("playlist.json"));
        let items = vec![
            entry("Abba", "Waterloo", "Waterloo", "Pop"),
            entry("Abba", "Waterloo", "Waterloo", "Disco"),
        ];
        store.save(true, &items).unwrap();
        assert!(store.load(true, &library()).is_empty());
    }

    #[test]
    fn disabled_flag_skips_both_directions() {
        let store = PlaylistStore::new(temp_root("playlist-off").join("playlist.json"));
        store
            .save(false, &[entry("Abba", "Waterloo", "Waterloo", "Pop")])
            .unwrap();
        assert!(!store.path().exists());

        store
            .save(true, &[entry("Abba", "Waterloo", "Waterloo", "Pop")])
            .unwrap();
        assert!(store.load(false, &library()).is_empty());
        assert_eq!(store.load(true, &library()).len(), 1);
    }

    #[test]
    fn missing_or_corrupt_snapshot_loads_empty() {
        let root = temp_root("playlist-corrupt");
        let store = PlaylistStore::new(root.join("playlist.json"));
        assert!(store.load(true, &library()).is_empty());

        std::fs::write(store.path(), b"{ not a list").unwrap();
        assert!(store.load(true, &library()).is_empty());
    }

    #[test]
    fn extra_entry_fields_survive_a_round_trip() {
        let store = PlaylistStore::new(temp_root("playlist-extra").join("playlist.json"));
        let mut item = entry("Abba", "Waterloo", "Waterloo", "Pop");
        item.extra
            .insert("filepath".into(), serde_json::json!("/music/Abba/Waterloo.mp3"));
        store.save(true, std::slice::from_ref(&item)).unwrap();
        assert_eq!(store.load(true, &library()), vec![item]);
    }
}
