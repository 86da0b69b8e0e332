//! Shared data models for the simplplayr library engine and its UI shell.
//!
//! Everything here is plain serde data: songs, grouping fields, playlist
//! entries, the settings schema vocabulary, and the request/response pairs
//! exchanged across the UI boundary.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Label used for tags that were absent after extraction.
pub const UNKNOWN: &str = "Unknown";

/// One indexed audio file.
///
/// `filepath` is the stable key within a catalog. Tag fields are empty until
/// extraction completes, then either the tag value or [`UNKNOWN`].
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Song {
    /// Absolute path to the media file.
    pub filepath: String,
    /// File name for display.
    pub filename: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub album: String,
    #[serde(default)]
    pub genre: String,
    /// Track length, once extracted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<SongDuration>,
}

impl Song {
    /// Build an unextracted song for a discovered file.
    pub fn stub(filepath: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            filepath: filepath.into(),
            filename: filename.into(),
            ..Self::default()
        }
    }

    /// `true` once tag extraction has populated the song.
    pub fn is_extracted(&self) -> bool {
        !(self.artist.is_empty()
            && self.title.is_empty()
            && self.album.is_empty()
            && self.genre.is_empty())
    }
}

/// Track length in seconds, or the `"Unknown"` marker.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SongDuration {
    Seconds(f64),
    Unknown,
}

impl SongDuration {
    pub fn seconds(self) -> Option<f64> {
        match self {
            SongDuration::Seconds(secs) => Some(secs),
            SongDuration::Unknown => None,
        }
    }
}

impl Serialize for SongDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SongDuration::Seconds(secs) => serializer.serialize_f64(*secs),
            SongDuration::Unknown => serializer.serialize_str(UNKNOWN),
        }
    }
}

impl<'de> Deserialize<'de> for SongDuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(secs) => Ok(SongDuration::Seconds(secs)),
            Raw::Text(_) => Ok(SongDuration::Unknown),
        }
    }
}

/// Tag field used to group, filter, or search songs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Artist,
    Album,
    Genre,
    Title,
}

impl Field {
    pub const ALL: [Field; 4] = [Field::Artist, Field::Album, Field::Genre, Field::Title];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Artist => "artist",
            Field::Album => "album",
            Field::Genre => "genre",
            Field::Title => "title",
        }
    }

    /// Title is a grouping/search field only; it is never a filter key.
    pub fn is_filterable(self) -> bool {
        !matches!(self, Field::Title)
    }

    /// Read this field from a song.
    pub fn value_of(self, song: &Song) -> &str {
        match self {
            Field::Artist => &song.artist,
            Field::Album => &song.album,
            Field::Genre => &song.genre,
            Field::Title => &song.title,
        }
    }

    /// Parse a field name and require it to be usable as a filter.
    pub fn parse_filterable(raw: &str) -> Result<Self, FieldError> {
        let field = raw.parse::<Field>()?;
        if field.is_filterable() {
            Ok(field)
        } else {
            Err(FieldError::NotFilterable(field))
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = FieldError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "artist" => Ok(Field::Artist),
            "album" => Ok(Field::Album),
            "genre" => Ok(Field::Genre),
            "title" => Ok(Field::Title),
            other => Err(FieldError::Unrecognized(other.to_string())),
        }
    }
}

/// Rejected field names.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("unrecognized field: {0}")]
    Unrecognized(String),
    #[error("field {0} cannot be used to filter songs")]
    NotFilterable(Field),
}

/// A queued song reference, matched against the catalog by its tags.
///
/// Any extra keys the UI stores alongside the four tags are kept in `extra`
/// so a saved queue round-trips unchanged.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct PlaylistEntry {
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub album: String,
    #[serde(default)]
    pub genre: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PlaylistEntry {
    pub fn from_song(song: &Song) -> Self {
        Self {
            artist: song.artist.clone(),
            title: song.title.clone(),
            album: song.album.clone(),
            genre: song.genre.clone(),
            extra: Map::new(),
        }
    }

    /// Exact match on (artist, album, genre, title).
    pub fn matches(&self, song: &Song) -> bool {
        self.artist == song.artist
            && self.album == song.album
            && self.genre == song.genre
            && self.title == song.title
    }
}

/// Type of a single settings option.
///
/// Serialized the way the UI expects the schema: a primitive type tag
/// (`"string"`, `"boolean"`, `"number"`) or an object keyed by the allowed
/// variants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OptionType {
    String,
    Boolean,
    Number,
    Enum(Vec<String>),
}

impl OptionType {
    pub fn type_tag(&self) -> Option<&'static str> {
        match self {
            OptionType::String => Some("string"),
            OptionType::Boolean => Some("boolean"),
            OptionType::Number => Some("number"),
            OptionType::Enum(_) => None,
        }
    }
}

impl Serialize for OptionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            OptionType::Enum(variants) => {
                let mut map = serializer.serialize_map(Some(variants.len()))?;
                for (idx, variant) in variants.iter().enumerate() {
                    map.serialize_entry(variant, &idx)?;
                }
                map.end()
            }
            primitive => serializer.serialize_str(primitive.type_tag().unwrap_or_default()),
        }
    }
}

impl<'de> Deserialize<'de> for OptionType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Tag(String),
            Variants(Map<String, Value>),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Tag(tag) => match tag.as_str() {
                "string" => Ok(OptionType::String),
                "boolean" => Ok(OptionType::Boolean),
                "number" => Ok(OptionType::Number),
                other => Err(de::Error::custom(format!("unknown option type {other}"))),
            },
            Raw::Variants(map) => {
                let mut variants = map
                    .into_iter()
                    .map(|(name, idx)| (idx.as_u64().unwrap_or(u64::MAX), name))
                    .collect::<Vec<_>>();
                variants.sort_by_key(|(idx, _)| *idx);
                Ok(OptionType::Enum(
                    variants.into_iter().map(|(_, name)| name).collect(),
                ))
            }
        }
    }
}

/// One named entry of the settings schema.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaOption {
    pub name: String,
    #[serde(rename = "type")]
    pub option_type: OptionType,
}

/// Serde adapter for a schema as a `{name: type}` object.
///
/// Entries are written and read in sequence, so option order survives
/// without relying on the map type's ordering.
pub mod schema_map {
    use std::fmt;

    use serde::de::{MapAccess, Visitor};
    use serde::ser::{SerializeMap, Serializer};
    use serde::Deserializer;

    use super::{OptionType, SchemaOption};

    pub fn serialize<S: Serializer>(options: &[SchemaOption], serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(options.len()))?;
        for option in options {
            map.serialize_entry(&option.name, &option.option_type)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<SchemaOption>, D::Error> {
        struct SchemaVisitor;

        impl<'de> Visitor<'de> for SchemaVisitor {
            type Value = Vec<SchemaOption>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object of option types keyed by name")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut options = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, option_type)) = access.next_entry::<String, OptionType>()? {
                    options.push(SchemaOption { name, option_type });
                }
                Ok(options)
            }
        }

        deserializer.deserialize_map(SchemaVisitor)
    }
}

/// A file that could not be extracted during a scan.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanFailure {
    pub filepath: String,
    pub reason: String,
}

/// Requests accepted from the UI shell.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Request {
    /// Rescan the library, then return the values of `group_field`.
    #[serde(rename_all = "camelCase")]
    ScanLibrary { group_field: String },
    GetByField { field: String },
    #[serde(rename_all = "camelCase")]
    SearchByField { field: String, search_phrase: String },
    GetSongPath { artist: String, title: String },
    GetSongsBy { field: String, value: String },
    GetSong { title: String },
    GetSettings,
    GetSearchIgnoreCase,
    /// Candidate settings object; replaces the current settings when valid.
    SetSettings { candidate: Value },
    SavePlaylist { items: Vec<PlaylistEntry> },
    GetSavedPlaylist,
    GetCoverArt { artist: String, album: String },
}

/// Responses sent back to the UI shell.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Response {
    FinderResult {
        values: Vec<String>,
    },
    ScanResult {
        values: Vec<String>,
        failures: Vec<ScanFailure>,
        /// Set when the directory walk aborted the scan.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    SearchResult {
        values: Vec<String>,
    },
    SongPathResult {
        filepath: Option<String>,
    },
    ListSongsResult {
        songs: Vec<Song>,
    },
    SongResult {
        song: Option<Song>,
    },
    SettingsResult {
        settings: Map<String, Value>,
        /// Sent as an object keyed by option name, in schema order.
        #[serde(with = "schema_map")]
        schema: Vec<SchemaOption>,
    },
    SearchIgnoreCaseResult {
        value: bool,
    },
    /// Empty reason means the settings were accepted.
    SetSettingsResult {
        reason: String,
    },
    PlaylistSaved,
    SavedPlaylistResult {
        items: Vec<PlaylistEntry>,
    },
    CoverArtResult {
        urls: Option<Vec<String>>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_parses_known_names() {
        assert_eq!("genre".parse::<Field>().unwrap(), Field::Genre);
        assert_eq!(
            "year".parse::<Field>(),
            Err(FieldError::Unrecognized("year".to_string()))
        );
    }

    #[test]
    fn title_is_not_filterable() {
        assert_eq!(
            Field::parse_filterable("title"),
            Err(FieldError::NotFilterable(Field::Title))
        );
        assert_eq!(Field::parse_filterable("album"), Ok(Field::Album));
    }

    #[test]
    fn song_json_omits_missing_duration() {
        let song = Song::stub("/music/a.mp3", "a.mp3");
        let value = serde_json::to_value(&song).unwrap();
        assert!(value.get("duration").is_none());
        assert_eq!(value["artist"], "");
        assert!(!song.is_extracted());
    }

    #[test]
    fn duration_accepts_number_or_unknown() {
        let known: SongDuration = serde_json::from_str("215.5").unwrap();
        let unknown: SongDuration = serde_json::from_str("\"Unknown\"").unwrap();
        assert_eq!(known, SongDuration::Seconds(215.5));
        assert_eq!(unknown, SongDuration::Unknown);
        assert_eq!(
            serde_json::to_string(&SongDuration::Unknown).unwrap(),
            "\"Unknown\""
        );
    }

    #[test]
    fn enum_option_type_serializes_as_variant_object() {
        let kind = OptionType::Enum(vec!["artist".into(), "album".into()]);
        let value = serde_json::to_value(&kind).unwrap();
        assert_eq!(value, serde_json::json!({"artist": 0, "album": 1}));
        let back: OptionType = serde_json::from_value(value).unwrap();
        assert_eq!(back, kind);
        assert_eq!(
            serde_json::to_value(OptionType::Number).unwrap(),
            serde_json::json!("number")
        );
    }

    #[test]
    fn playlist_entry_keeps_extra_keys() {
        let raw = serde_json::json!({
            "artist": "A", "title": "T", "album": "B", "genre": "G", "filepath": "/x.mp3"
        });
        let entry: PlaylistEntry = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(entry.extra.get("filepath"), Some(&Value::from("/x.mp3")));
        assert_eq!(serde_json::to_value(&entry).unwrap(), raw);
    }

    #[test]
    fn settings_schema_is_sent_as_object_in_order() {
        let response = Response::SettingsResult {
            settings: Map::new(),
            schema: vec![
                SchemaOption {
                    name: "seekTime".into(),
                    option_type: OptionType::Number,
                },
                SchemaOption {
                    name: "defaultView".into(),
                    option_type: OptionType::Enum(vec!["artist".into(), "album".into()]),
                },
            ],
        };
        let text = serde_json::to_string(&response).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert!(value["schema"].is_object());
        assert_eq!(value["schema"]["seekTime"], "number");
        assert_eq!(value["schema"]["defaultView"]["album"], 1);
        assert!(text.find("seekTime").unwrap() < text.find("defaultView").unwrap());

        let back: Response = serde_json::from_str(&text).unwrap();
        let Response::SettingsResult { schema, .. } = back else {
            panic!("unexpected response");
        };
        assert_eq!(schema[0].name, "seekTime");
        assert_eq!(schema[1].option_type, OptionType::Enum(vec!["artist".into(), "album".into()]));
    }

    #[test]
    fn request_uses_camel_case_tags() {
        let req: Request = serde_json::from_value(serde_json::json!({
            "kind": "searchByField", "field": "artist", "searchPhrase": "btl"
        }))
        .unwrap();
        assert!(matches!(
            req,
            Request::SearchByField { ref field, ref search_phrase }
                if field == "artist" && search_phrase == "btl"
        ));
    }
}
