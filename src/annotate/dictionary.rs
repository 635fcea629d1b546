//! Hanja reading dictionary
//!
//! Maps single ideographs to their Hangul reading. The bundled dictionary
//! is compiled into the module and parsed once on first use.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde_json::Value;
use thiserror::Error;

const BUNDLED_READINGS: &str = include_str!("../../data/hanja_readings.json");

static BUNDLED: OnceLock<ReadingMap> = OnceLock::new();

#[derive(Error, Debug)]
pub enum DictionaryError {
    #[error("Failed to parse dictionary JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Dictionary must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Immutable character to reading lookup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadingMap {
    readings: HashMap<char, String>,
}

impl ReadingMap {
    /// The dictionary shipped with the module
    pub fn bundled() -> &'static ReadingMap {
        BUNDLED.get_or_init(|| match Self::from_json(BUNDLED_READINGS) {
            Ok(map) => {
                tracing::debug!("Loaded {} bundled Hanja readings", map.len());
                map
            }
            Err(e) => {
                tracing::error!("Bundled Hanja dictionary is unusable: {}", e);
                Self::default()
            }
        })
    }

    /// Parse a `{ "漢": "한", ... }` JSON object.
    ///
    /// Entries with a multi-character key or a non-string value are skipped.
    pub fn from_json(json: &str) -> Result<Self, DictionaryError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Build from an already-parsed JSON value
    pub fn from_value(value: Value) -> Result<Self, DictionaryError> {
        let object = match value {
            Value::Object(object) => object,
            Value::Null => return Err(DictionaryError::NotAnObject("null")),
            Value::Bool(_) => return Err(DictionaryError::NotAnObject("bool")),
            Value::Number(_) => return Err(DictionaryError::NotAnObject("number")),
            Value::String(_) => return Err(DictionaryError::NotAnObject("string")),
            Value::Array(_) => return Err(DictionaryError::NotAnObject("array")),
        };

        let entries = object.into_iter().filter_map(|(key, value)| match value {
            Value::String(reading) => Some((key, reading)),
            other => {
                tracing::debug!("Skipping dictionary entry '{}': non-string reading {}", key, other);
                None
            }
        });

        Ok(Self::from_entries(entries))
    }

    /// Build from `(character, reading)` pairs
    pub fn from_entries<I, K, R>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, R)>,
        K: AsRef<str>,
        R: Into<String>,
    {
        let mut readings = HashMap::new();
        for (key, reading) in entries {
            let mut chars = key.as_ref().chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => {
                    readings.insert(c, reading.into());
                }
                _ => {
                    tracing::debug!("Skipping dictionary key '{}': not a single character", key.as_ref());
                }
            }
        }
        Self { readings }
    }

    /// Reading for `c`, if one is known and non-empty
    pub fn get(&self, c: char) -> Option<&str> {
        self.readings
            .get(&c)
            .map(String::as_str)
            .filter(|r| !r.is_empty())
    }

    /// Reading for `c`, or `""` when unknown
    pub fn reading_or_empty(&self, c: char) -> &str {
        self.get(c).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}
