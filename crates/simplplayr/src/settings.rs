//! Schema-validated user settings.
//!
//! Settings are a JSON object keyed by option name. Updates are validated
//! against [`Schema`] and replace the stored object wholesale.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use simplplayr_types::{Field, OptionType, SchemaOption};

use crate::library::SearchOptions;
use crate::storage::{read_snapshot, write_snapshot};

pub const MUSIC_DIRECTORY: &str = "musicDirectory";
pub const DEFAULT_VIEW: &str = "defaultView";
pub const SEARCH_IGNORE_CASE: &str = "searchIgnoreCase";
pub const PARTIAL_SEARCH: &str = "partialSearch";
pub const SEEK_TIME: &str = "seekTime";
pub const SAVE_PLAYLIST: &str = "savePlaylist";

/// Why a candidate settings object was rejected.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("Settings must be an object")]
    NotAnObject,
    /// Reported with the same wording as a bad enum value.
    #[error("Value of {0} is incorrect")]
    UnknownKey(String),
    #[error("Type of {0} is incorrect")]
    WrongType(String),
    #[error("Value of {0} is incorrect")]
    InvalidValue(String),
    #[error("Could not save settings: {0}")]
    Persist(String),
}

/// Ordered option definitions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Schema {
    options: Vec<SchemaOption>,
}

impl Schema {
    pub fn standard() -> Self {
        let views = Field::ALL.iter().map(|field| field.as_str().to_string()).collect();
        let option = |name: &str, option_type| SchemaOption {
            name: name.to_string(),
            option_type,
        };
        Self {
            options: vec![
                option(MUSIC_DIRECTORY, OptionType::String),
                option(DEFAULT_VIEW, OptionType::Enum(views)),
                option(SEARCH_IGNORE_CASE, OptionType::Boolean),
                option(PARTIAL_SEARCH, OptionType::Boolean),
                option(SEEK_TIME, OptionType::Number),
                option(SAVE_PLAYLIST, OptionType::Boolean),
            ],
        }
    }

    pub fn get(&self, name: &str) -> Option<&OptionType> {
        self.options
            .iter()
            .find(|option| option.name == name)
            .map(|option| &option.option_type)
    }

    pub fn options(&self) -> &[SchemaOption] {
        &self.options
    }

    /// Check every key present in `candidate`, stopping at the first bad one.
    ///
    /// Keys the candidate omits are not checked.
    pub fn validate(&self, candidate: &Value) -> Result<(), SettingsError> {
        let Some(object) = candidate.as_object() else {
            return Err(SettingsError::NotAnObject);
        };
        for (key, value) in object {
            let Some(option_type) = self.get(key) else {
                return Err(SettingsError::UnknownKey(key.clone()));
            };
            let valid_type = match option_type {
                OptionType::String => value.is_string(),
                OptionType::Boolean => value.is_boolean(),
                OptionType::Number => value.is_number(),
                OptionType::Enum(variants) => {
                    let member = value
                        .as_str()
                        .is_some_and(|value| variants.iter().any(|variant| variant == value));
                    if !member {
                        return Err(SettingsError::InvalidValue(key.clone()));
                    }
                    true
                }
            };
            if !valid_type {
                return Err(SettingsError::WrongType(key.clone()));
            }
        }
        Ok(())
    }
}

/// A settings object with typed accessors.
///
/// Accessors treat a missing or mistyped key as unset (`None` / `false`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings(Map<String, Value>);

impl Settings {
    /// Defaults used when no settings snapshot exists.
    pub fn defaults() -> Self {
        let music = dirs::home_dir()
            .map(|home| home.join("Music"))
            .unwrap_or_else(|| PathBuf::from("Music"));
        let mut map = Map::new();
        map.insert(
            MUSIC_DIRECTORY.into(),
            Value::from(music.to_string_lossy().to_string()),
        );
        map.insert(DEFAULT_VIEW.into(), Value::from(Field::Artist.as_str()));
        map.insert(SEARCH_IGNORE_CASE.into(), Value::from(true));
        map.insert(PARTIAL_SEARCH.into(), Value::from(true));
        map.insert(SEEK_TIME.into(), Value::from(10));
        map.insert(SAVE_PLAYLIST.into(), Value::from(false));
        Self(map)
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn music_directory(&self) -> Option<PathBuf> {
        self.0
            .get(MUSIC_DIRECTORY)
            .and_then(Value::as_str)
            .map(PathBuf::from)
    }

    pub fn default_view(&self) -> Option<Field> {
        self.0
            .get(DEFAULT_VIEW)
            .and_then(Value::as_str)
            .and_then(|raw| raw.parse().ok())
    }

    pub fn search_ignore_case(&self) -> bool {
        self.flag(SEARCH_IGNORE_CASE)
    }

    pub fn partial_search(&self) -> bool {
        self.flag(PARTIAL_SEARCH)
    }

    pub fn seek_time(&self) -> Option<f64> {
        self.0.get(SEEK_TIME).and_then(Value::as_f64)
    }

    pub fn save_playlist(&self) -> bool {
        self.flag(SAVE_PLAYLIST)
    }

    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            ignore_case: self.search_ignore_case(),
            partial: self.partial_search(),
        }
    }

    fn flag(&self, key: &str) -> bool {
        self.0.get(key).and_then(Value::as_bool).unwrap_or(false)
    }
}

/// Settings plus their schema and snapshot path.
#[derive(Clone, Debug)]
pub struct SettingsStore {
    path: PathBuf,
    schema: Schema,
    settings: Settings,
}

impl SettingsStore {
    /// Load the snapshot, or fall back to [`Settings::defaults`] as a whole.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let mut store = Self::with_settings(path, Settings::defaults());
        match store.load() {
            Ok(Some(settings)) => store.settings = settings,
            Ok(None) => tracing::info!(path = %store.path.display(), "settings not found; using defaults"),
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "settings unreadable; using defaults")
            }
        }
        store
    }

    pub fn with_settings(path: impl Into<PathBuf>, settings: Settings) -> Self {
        Self {
            path: path.into(),
            schema: Schema::standard(),
            settings,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn validate(&self, candidate: &Value) -> Result<(), SettingsError> {
        self.schema.validate(candidate)
    }

    /// Validate `candidate`, persist it, then make it the current settings.
    ///
    /// Nothing changes unless the whole candidate is valid and written.
    pub fn replace(&mut self, candidate: Value) -> Result<(), SettingsError> {
        self.validate(&candidate)?;
        let Value::Object(map) = candidate else {
            return Err(SettingsError::NotAnObject);
        };
        let next = Settings::from_map(map);
        write_snapshot(&self.path, &next).map_err(|err| SettingsError::Persist(format!("{err:#}")))?;
        tracing::info!(path = %self.path.display(), "settings updated");
        self.settings = next;
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        write_snapshot(&self.path, &self.settings)
    }

    /// Read the persisted settings; `Ok(None)` when nothing was saved yet.
    pub fn load(&self) -> Result<Option<Settings>> {
        read_snapshot(&self.path)
    }
}
