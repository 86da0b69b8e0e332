//! Tag extraction for discovered files.
//!
//! The catalog only depends on [`MetadataExtractor`]; the default
//! implementation probes the file with symphonia.

use std::ffi::OsStr;
use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use simplplayr_types::{Song, SongDuration, UNKNOWN};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::{MetadataOptions, MetadataRevision, StandardTagKey};
use symphonia::core::probe::Hint;

/// Reads tag fields from one file. An `Err` means the file could not be parsed.
pub trait MetadataExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<TrackTags>;
}

/// Tag fields as found in the file; `None` when the tag is absent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackTags {
    pub artist: Option<String>,
    pub title: Option<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub duration_secs: Option<f64>,
}

impl TrackTags {
    /// Populate `song`, substituting `"Unknown"` for missing tags.
    pub fn apply(self, song: &mut Song) {
        song.artist = or_unknown(self.artist);
        song.title = or_unknown(self.title);
        song.album = or_unknown(self.album);
        song.genre = or_unknown(self.genre);
        song.duration = Some(
            self.duration_secs
                .map(SongDuration::Seconds)
                .unwrap_or(SongDuration::Unknown),
        );
    }
}

fn or_unknown(value: Option<String>) -> String {
    value
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// Container probe + standard tag keys via symphonia.
#[derive(Clone, Copy, Debug, Default)]
pub struct SymphoniaExtractor;

impl MetadataExtractor for SymphoniaExtractor {
    fn extract(&self, path: &Path) -> Result<TrackTags> {
        let ext = path
            .extension()
            .and_then(OsStr::to_str)
            .unwrap_or("")
            .to_ascii_lowercase();
        let file = File::open(path).with_context(|| format!("open {:?}", path))?;

        let mut hint = Hint::new();
        if !ext.is_empty() {
            hint.with_extension(&ext);
        }
        let mss = MediaSourceStream::new(Box::new(file), Default::default());
        let mut probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .with_context(|| format!("probe {:?}", path))?;

        let mut tags = TrackTags::default();
        if let Some(track) = probed.format.default_track() {
            let params = &track.codec_params;
            if let (Some(frames), Some(rate)) = (params.n_frames, params.sample_rate) {
                if rate > 0 {
                    tags.duration_secs = Some(frames as f64 / f64::from(rate));
                }
            }
        }

        if let Some(rev) = probed.format.metadata().current() {
            collect_tags(rev, &mut tags);
        }
        // ID3v2 and similar tags sit in front of the container.
        if let Some(meta) = probed.metadata.get() {
            if let Some(rev) = meta.current() {
                collect_tags(rev, &mut tags);
            }
        }

        Ok(tags)
    }
}

fn collect_tags(rev: &MetadataRevision, tags: &mut TrackTags) {
    for tag in rev.tags() {
        let slot = match tag.std_key {
            Some(StandardTagKey::Artist) => &mut tags.artist,
            Some(StandardTagKey::TrackTitle) => &mut tags.title,
            Some(StandardTagKey::Album) => &mut tags.album,
            Some(StandardTagKey::Genre) => &mut tags.genre,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(tag.value.to_string());
        }
    }
}
