//! Moderator comments returned by `GET /api/get_player_comment`

use chrono::NaiveDateTime;
use serde::Deserialize;

use super::lenient;
use super::timestamp;
use crate::error::Result;

/// A comment left on a player's record
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Comment {
    /// `YYYY-MM-DDTHH:MM:SS.ffffff`
    #[serde(deserialize_with = "lenient::string_or_empty")]
    pub creation_time: String,
    #[serde(deserialize_with = "lenient::string_or_empty")]
    pub content: String,
    #[serde(deserialize_with = "lenient::string_or_empty")]
    pub by: String,
}

impl Comment {
    pub fn new(
        creation_time: impl Into<String>,
        content: impl Into<String>,
        by: impl Into<String>,
    ) -> Self {
        Self {
            creation_time: creation_time.into(),
            content: content.into(),
            by: by.into(),
        }
    }

    /// Parsed creation time
    pub fn created_at(&self) -> Result<NaiveDateTime> {
        timestamp::parse_api_time(&self.creation_time)
    }
}

/// Select the most recent comment by creation time
///
/// Fails on the first comment whose `creation_time` does not parse. Returns
/// `Ok(None)` for an empty slice. On equal timestamps the later entry wins.
pub fn latest(comments: &[Comment]) -> Result<Option<(&Comment, NaiveDateTime)>> {
    let mut latest: Option<(&Comment, NaiveDateTime)> = None;
    for comment in comments {
        let created_at = comment.created_at()?;
        if latest.is_none_or(|(_, best)| created_at >= best) {
            latest = Some((comment, created_at));
        }
    }
    Ok(latest)
}
