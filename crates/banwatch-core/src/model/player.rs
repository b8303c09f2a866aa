//! Player profile returned by `GET /api/player`
//!
//! Every field has a defined default so partial payloads still produce a
//! usable profile. `received_actions` is assumed most-recent-first.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

use super::lenient;

/// Aggregated player record
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlayerProfile {
    /// Known display names, normalized from `[{"name": ...}]`
    #[serde(deserialize_with = "lenient::names")]
    pub names: Vec<String>,

    /// SteamID64
    #[serde(deserialize_with = "lenient::string_or_number")]
    pub steam_id_64: Option<String>,

    /// Total playtime across all sessions, in seconds
    #[serde(deserialize_with = "lenient::counter")]
    pub total_playtime_seconds: u64,

    /// Playtime in the current session, in seconds
    #[serde(deserialize_with = "lenient::counter")]
    pub current_playtime_seconds: u64,

    /// Blacklist status
    #[serde(deserialize_with = "lenient::null_as_default")]
    pub blacklist: Blacklist,

    /// Disciplinary actions, most recent first
    #[serde(deserialize_with = "lenient::null_as_default")]
    pub received_actions: Vec<PlayerAction>,

    /// Session history (shape varies across API versions)
    #[serde(deserialize_with = "lenient::null_as_default")]
    pub sessions: Vec<Value>,

    /// Number of recorded sessions
    #[serde(deserialize_with = "lenient::counter")]
    pub sessions_count: u64,

    /// Penalty counters keyed by kind (`KICK`, `TEMPBAN`, ...)
    #[serde(deserialize_with = "lenient::counters")]
    pub penalty_count: BTreeMap<String, u64>,

    /// Moderator flags
    #[serde(deserialize_with = "lenient::null_as_default")]
    pub flags: Vec<PlayerFlag>,

    /// Watchlist entry, if any
    pub watchlist: Option<Value>,

    /// Cached Steam profile information, if any
    pub steaminfo: Option<Value>,

    /// VIP grants
    #[serde(deserialize_with = "lenient::null_as_default")]
    pub vips: Vec<VipEntry>,
}

impl PlayerProfile {
    /// The primary display name
    pub fn display_name(&self) -> Option<&str> {
        self.names.first().map(String::as_str)
    }

    /// The most recent disciplinary action
    pub fn latest_action(&self) -> Option<&PlayerAction> {
        self.received_actions.first()
    }

    /// Whether the player is currently blacklisted
    pub fn is_blacklisted(&self) -> bool {
        self.blacklist.is_blacklisted
    }

    /// Total playtime split into whole hours and remaining minutes
    pub fn playtime(&self) -> Playtime {
        Playtime::from_seconds(self.total_playtime_seconds)
    }

    /// Whether the player holds any VIP grant
    pub fn is_vip(&self) -> bool {
        !self.vips.is_empty()
    }
}

/// Blacklist status of a player
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Blacklist {
    #[serde(deserialize_with = "lenient::flag")]
    pub is_blacklisted: bool,
    #[serde(deserialize_with = "lenient::string_or_number")]
    pub reason: Option<String>,
    #[serde(deserialize_with = "lenient::string_or_number")]
    pub by: Option<String>,
}

/// One disciplinary action received by a player
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PlayerAction {
    #[serde(deserialize_with = "lenient::string_or_number")]
    pub action_type: Option<String>,
    #[serde(deserialize_with = "lenient::string_or_number")]
    pub reason: Option<String>,
    #[serde(deserialize_with = "lenient::string_or_number")]
    pub by: Option<String>,
    /// `YYYY-MM-DDTHH:MM:SS.ffffff`
    #[serde(deserialize_with = "lenient::string_or_number")]
    pub time: Option<String>,
}

/// A moderator flag on a player
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PlayerFlag {
    #[serde(deserialize_with = "lenient::string_or_number")]
    pub flag: Option<String>,
    #[serde(deserialize_with = "lenient::string_or_number")]
    pub comment: Option<String>,
    #[serde(deserialize_with = "lenient::string_or_number")]
    pub modified: Option<String>,
}

/// A VIP grant
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VipEntry {
    #[serde(deserialize_with = "lenient::string_or_number")]
    pub server_number: Option<String>,
    #[serde(deserialize_with = "lenient::string_or_number")]
    pub expiration: Option<String>,
}

/// Playtime as whole hours plus remaining minutes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Playtime {
    pub hours: u64,
    pub minutes: u64,
}

impl Playtime {
    pub fn from_seconds(seconds: u64) -> Self {
        Self {
            hours: seconds / 3600,
            minutes: (seconds % 3600) / 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_full_payload() {
        let profile: PlayerProfile = serde_json::from_value(json!({
            "names": [{"name": "Alpha"}, {"id": 3}, {"name": "Bravo"}],
            "steam_id_64": "76561198000000001",
            "total_playtime_seconds": 7384,
            "current_playtime_seconds": 12.7,
            "blacklist": {"is_blacklisted": true, "reason": "cheating", "by": "mod"},
            "received_actions": [
                {"action_type": "TEMPBAN", "reason": "teamkill", "by": "admin1",
                 "time": "2024-01-02T10:00:00.000"}
            ],
            "sessions_count": "4",
            "penalty_count": {"KICK": 1, "TEMPBAN": 2, "NOTE": "n/a"},
            "flags": [{"flag": "🚩", "comment": "watch"}],
            "vips": [{"server_number": 1, "expiration": "2030-01-01T00:00:00"}],
            "watchlist": null
        }))
        .unwrap();

        assert_eq!(profile.names, vec!["Alpha", "Bravo"]);
        assert_eq!(profile.display_name(), Some("Alpha"));
        assert_eq!(profile.current_playtime_seconds, 12);
        assert_eq!(profile.sessions_count, 4);
        assert!(profile.is_blacklisted());
        assert_eq!(profile.penalty_count.get("TEMPBAN"), Some(&2));
        assert!(!profile.penalty_count.contains_key("NOTE"));
        assert_eq!(profile.flags[0].flag.as_deref(), Some("🚩"));
        assert_eq!(profile.vips[0].server_number.as_deref(), Some("1"));
        assert!(profile.is_vip());
        assert_eq!(
            profile.latest_action().and_then(|a| a.reason.as_deref()),
            Some("teamkill")
        );
        assert_eq!(profile.watchlist, None);
    }

    #[test]
    fn test_sparse_payload_uses_defaults() {
        let profile: PlayerProfile = serde_json::from_value(json!({
            "steam_id_64": 76561198000000001u64,
            "blacklist": null,
            "received_actions": null,
            "names": null
        }))
        .unwrap();

        assert_eq!(profile.steam_id_64.as_deref(), Some("76561198000000001"));
        assert!(profile.names.is_empty());
        assert!(!profile.is_blacklisted());
        assert!(profile.latest_action().is_none());
        assert_eq!(profile.total_playtime_seconds, 0);
    }

    #[test]
    fn test_playtime_split() {
        assert_eq!(Playtime::from_seconds(7384), Playtime { hours: 2, minutes: 3 });
        assert_eq!(Playtime::from_seconds(59), Playtime { hours: 0, minutes: 0 });
        assert_eq!(Playtime::from_seconds(3600), Playtime { hours: 1, minutes: 0 });
    }
}
