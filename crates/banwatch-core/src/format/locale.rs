// # Locale Table
//
// Maps a language code to the labels used in notifications.
//
// ## File Format
//
// ```json
// {
//   "de": { "new_ban": "Neuer Bann", "name": "Name:", ... },
//   "en": { "new_ban": "New ban", "name": "Name:", ... }
// }
// ```
//
// Every label except `and` and `by` is required. A language code that is not
// in the table is a configuration error raised at startup, never at render
// time.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{Error, Result};

/// Label strings for one language
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Labels {
    pub new_ban: String,
    pub name: String,
    pub steam_id: String,
    pub ban_time: String,
    pub on_blacklist: String,
    pub yes: String,
    pub no: String,
    pub steam_url: String,
    pub total_playtime: String,
    pub hours: String,
    pub minutes: String,
    pub reason: String,
    pub ban_enforced_by: String,
    pub ban_type: String,
    pub player_comments: String,
    pub unknown: String,

    /// Conjunction between hours and minutes
    #[serde(default = "default_and")]
    pub and: String,

    /// Word introducing a comment's author
    #[serde(default = "default_by")]
    pub by: String,
}

fn default_and() -> String {
    "und".to_string()
}

fn default_by() -> String {
    "von".to_string()
}

/// All configured languages
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct LocaleTable {
    languages: BTreeMap<String, Labels>,
}

impl LocaleTable {
    /// Parse a locale table from JSON
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::locale(format!("Malformed locale table: {}", e)))
    }

    /// Load a locale table from a JSON file
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            Error::locale(format!(
                "Failed to read locale file {}: {}",
                path.display(),
                e
            ))
        })?;

        let table = Self::from_json_str(&content)?;
        tracing::debug!(
            path = %path.display(),
            languages = table.languages.len(),
            "Loaded locale table"
        );
        Ok(table)
    }

    /// Labels for a language code
    ///
    /// # Returns
    ///
    /// - `Ok(&Labels)`: the language is configured
    /// - `Err(Error::Config)`: unknown language code
    pub fn labels(&self, code: &str) -> Result<&Labels> {
        self.languages.get(code).ok_or_else(|| {
            Error::config(format!(
                "Language '{}' is not defined in the locale table. Available: {}",
                code,
                self.language_codes().collect::<Vec<_>>().join(", ")
            ))
        })
    }

    /// Configured language codes, sorted
    pub fn language_codes(&self) -> impl Iterator<Item = &str> {
        self.languages.keys().map(String::as_str)
    }
}
