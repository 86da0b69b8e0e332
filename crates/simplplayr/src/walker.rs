//! Filesystem walk for library scans.
//!
//! Reads one directory level at a time: plain files become song stubs,
//! subdirectories are deferred to the next level.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use simplplayr_types::Song;

/// Direct children of one or more directories.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DirListing {
    pub files: Vec<Song>,
    pub directories: Vec<PathBuf>,
}

impl DirListing {
    fn extend(&mut self, other: DirListing) {
        self.files.extend(other.files);
        self.directories.extend(other.directories);
    }
}

/// List the direct children of `dir`, ordered by file name.
pub fn list_directory(dir: &Path) -> Result<DirListing> {
    let mut children = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read_dir {:?}", dir))? {
        let entry = entry.with_context(|| format!("read_dir entry in {:?}", dir))?;
        children.push(entry.path());
    }
    children.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let mut listing = DirListing::default();
    for path in children {
        // Follows symlinks, so a linked directory is walked like a real one.
        let meta = fs::metadata(&path).with_context(|| format!("stat {:?}", path))?;
        if meta.is_dir() {
            listing.directories.push(path);
        } else {
            // Song paths are stored as strings, so the name must round-trip.
            let (Some(filepath), Some(filename)) =
                (path.to_str(), path.file_name().and_then(OsStr::to_str))
            else {
                tracing::warn!(path = %path.display(), "skipping file with non UTF-8 path");
                continue;
            };
            listing.files.push(Song::stub(filepath, filename));
        }
    }
    Ok(listing)
}

/// Concatenate the listings of several directories, in the given order.
pub fn list_directories(dirs: &[PathBuf]) -> Result<DirListing> {
    let mut listing = DirListing::default();
    for dir in dirs {
        listing.extend(list_directory(dir)?);
    }
    Ok(listing)
}

/// Breadth-first walk from `root`, returning every plain file found.
///
/// No depth limit and no cycle detection: a symlink loop keeps producing
/// levels until the filesystem refuses the path.
pub fn walk_level_order(root: &Path) -> Result<Vec<Song>> {
    let mut level = list_directory(root)?;
    let mut songs = std::mem::take(&mut level.files);
    let mut depth = 0usize;

    while !level.directories.is_empty() {
        depth += 1;
        tracing::debug!(depth, dirs = level.directories.len(), "walking library level");
        level = list_directories(&level.directories)?;
        songs.append(&mut level.files);
    }

    tracing::debug!(root = %root.display(), files = songs.len(), depth, "library walk complete");
    Ok(songs)
}
