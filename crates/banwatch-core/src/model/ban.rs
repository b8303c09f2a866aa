//! Ban records
//!
//! [`RawBan`] mirrors one entry of the `get_bans` result as delivered by the
//! API, with every field optional. [`Ban`] is the validated form: all required
//! fields present and `ban_time` parsed.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::lenient;
use super::timestamp::{self, BAN_TIME_FORMAT};

/// A ban list entry as received from the API
///
/// Fields other than the three below are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawBan {
    /// Ban kind (e.g. `temp`, `perma`)
    #[serde(rename = "type", default, deserialize_with = "lenient::string_or_number")]
    pub kind: Option<String>,

    /// SteamID64 of the banned player
    #[serde(default, deserialize_with = "lenient::string_or_number")]
    pub steam_id_64: Option<String>,

    /// Time the ban was issued, `YYYY.MM.DD-HH.MM.SS`
    #[serde(default, deserialize_with = "lenient::string_or_number")]
    pub ban_time: Option<String>,
}

impl RawBan {
    /// Create a raw ban with all required fields set
    pub fn new(
        kind: impl Into<String>,
        steam_id_64: impl Into<String>,
        ban_time: impl Into<String>,
    ) -> Self {
        Self {
            kind: Some(kind.into()),
            steam_id_64: Some(steam_id_64.into()),
            ban_time: Some(ban_time.into()),
        }
    }
}

/// Why a raw ban record is not actionable
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BanRejection {
    /// A required field is absent or null
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    /// `ban_time` does not match `YYYY.MM.DD-HH.MM.SS`
    #[error("invalid ban_time '{value}': {reason}")]
    InvalidBanTime {
        /// The raw value
        value: String,
        /// Parser diagnostic
        reason: String,
    },
}

/// A validated, actionable ban
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ban {
    /// Ban kind
    pub kind: String,
    /// SteamID64 of the banned player
    pub steam_id_64: String,
    /// Time the ban was issued
    pub ban_time: NaiveDateTime,
}

impl Ban {
    /// The ban time in the API's own format
    pub fn ban_time_str(&self) -> String {
        self.ban_time.format(BAN_TIME_FORMAT).to_string()
    }
}

impl TryFrom<RawBan> for Ban {
    type Error = BanRejection;

    fn try_from(raw: RawBan) -> Result<Self, Self::Error> {
        let kind = required(raw.kind, "type")?;
        let steam_id_64 = required(raw.steam_id_64, "steam_id_64")?;
        let ban_time_raw = required(raw.ban_time, "ban_time")?;

        let ban_time = timestamp::parse_ban_time(&ban_time_raw).map_err(|e| {
            BanRejection::InvalidBanTime {
                reason: match e {
                    crate::Error::Timestamp { reason, .. } => reason,
                    other => other.to_string(),
                },
                value: ban_time_raw,
            }
        })?;

        Ok(Self {
            kind,
            steam_id_64,
            ban_time,
        })
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, BanRejection> {
    value.ok_or(BanRejection::MissingField(field))
}
