//! On-disk locations and JSON snapshot persistence.
//!
//! Every store persists a single JSON document under the per-user data
//! directory. Writes go to a sibling temp file and are renamed into place.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

const DATA_DIR_NAME: &str = ".simplplayr";
const SETTINGS_FILE: &str = "settings.json";
const LIBRARY_FILE: &str = "library.json";
const PLAYLIST_FILE: &str = "playlist.json";

/// Resolved snapshot locations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppPaths {
    pub data_dir: PathBuf,
    pub settings: PathBuf,
    pub library: PathBuf,
    pub playlist: PathBuf,
}

impl AppPaths {
    /// `$HOME/.simplplayr`.
    pub fn default_location() -> Result<Self> {
        let home = dirs::home_dir().context("home directory is not available")?;
        Ok(Self::in_dir(home.join(DATA_DIR_NAME)))
    }

    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            settings: data_dir.join(SETTINGS_FILE),
            library: data_dir.join(LIBRARY_FILE),
            playlist: data_dir.join(PLAYLIST_FILE),
            data_dir,
        }
    }
}

/// Read a JSON snapshot; `Ok(None)` when the file does not exist yet.
pub fn read_snapshot<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err).with_context(|| format!("read snapshot {:?}", path)),
    };
    let value = serde_json::from_slice(&raw)
        .with_context(|| format!("parse snapshot {:?}", path))?;
    Ok(Some(value))
}

/// Write a JSON snapshot, creating the parent directory when needed.
pub fn write_snapshot<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("create data dir {:?}", dir))?;
    }
    let body = serde_json::to_vec(value).context("serialize snapshot")?;
    let tmp = temp_path(path);
    fs::write(&tmp, body).with_context(|| format!("write snapshot {:?}", tmp))?;
    fs::rename(&tmp, path).with_context(|| format!("replace snapshot {:?}", path))?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::temp_root;

    #[test]
    fn in_dir_places_every_snapshot_under_data_dir() {
        let paths = AppPaths::in_dir("/tmp/player");
        assert_eq!(paths.settings, PathBuf::from("/tmp/player/settings.json"));
        assert_eq!(paths.library, PathBuf::from("/tmp/player/library.json"));
        assert_eq!(paths.playlist, PathBuf::from("/tmp/player/playlist.json"));
    }

    #[test]
    fn read_snapshot_missing_file_is_none() {
        let root = temp_root("storage-missing");
        let value: Option<Vec<String>> = read_snapshot(&root.join("absent.json")).unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn write_snapshot_creates_dir_and_leaves_no_temp_file() {
        let root = temp_root("storage-write");
        let path = root.join("nested").join("library.json");
        write_snapshot(&path, &vec!["a", "b"]).unwrap();

        let back: Option<Vec<String>> = read_snapshot(&path).unwrap();
        assert_eq!(back, Some(vec!["a".to_string(), "b".to_string()]));
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn read_snapshot_reports_corrupt_json() {
        let root = temp_root("storage-corrupt");
        let path = root.join("settings.json");
        std::fs::write(&path, b"{not json").unwrap();
        let result: Result<Option<Vec<String>>> = read_snapshot(&path);
        assert!(result.is_err());
    }
}
