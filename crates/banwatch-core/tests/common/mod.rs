//! Test doubles and common utilities for contract tests
//!
//! The doubles are scripted rather than simulated: each test states exactly
//! what the upstream API answers and inspects what reached the sink and the
//! watermark store.

#![allow(dead_code)]

use banwatch_core::error::{Error, Result};
use banwatch_core::{
    BanNotifier, BanSource, Comment, Credentials, Labels, LocaleTable, LoginRetryConfig,
    NotificationSink, NotifierConfig, NotifierEvent, PlayerProfile, RawBan, Watermark,
    WatermarkStore, WatermarkStoreConfig,
};
use banwatch_core::model::PlayerAction;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Locale table used by the contract tests
///
/// `en` leaves `and` and `by` unset, so the built-in defaults apply.
pub const TEST_LOCALES: &str = r#"{
    "en": {
        "new_ban": "New ban",
        "name": "Name:",
        "steam_id": "Steam ID:",
        "ban_time": "Ban time:",
        "on_blacklist": "Blacklisted:",
        "yes": "yes",
        "no": "no",
        "steam_url": "Steam profile:",
        "total_playtime": "Total playtime:",
        "hours": "hours",
        "minutes": "minutes",
        "reason": "Reason:",
        "ban_enforced_by": "Enforced by:",
        "ban_type": "Ban type:",
        "player_comments": "Latest comment:",
        "unknown": "unknown"
    }
}"#;

pub fn labels_en() -> Labels {
    LocaleTable::from_json_str(TEST_LOCALES)
        .expect("test locales parse")
        .labels("en")
        .expect("en is defined")
        .clone()
}

/// A BanSource that answers from a script
///
/// - Logins pop from `logins`; once empty, `login_default` applies
/// - Ban lists pop from `ban_lists`; once empty, the list is empty
/// - Players and comments are looked up by steam id; unknown ids give `None`
pub struct ScriptedBanSource {
    logins: Arc<Mutex<VecDeque<bool>>>,
    login_default: bool,
    ban_lists: Arc<Mutex<VecDeque<Option<Vec<RawBan>>>>>,
    players: Arc<Mutex<HashMap<String, PlayerProfile>>>,
    comments: Arc<Mutex<HashMap<String, Vec<Comment>>>>,
    login_calls: Arc<AtomicUsize>,
    list_calls: Arc<AtomicUsize>,
    player_calls: Arc<AtomicUsize>,
}

impl ScriptedBanSource {
    /// A source that accepts every login and lists no bans
    pub fn new() -> Self {
        Self {
            logins: Arc::new(Mutex::new(VecDeque::new())),
            login_default: true,
            ban_lists: Arc::new(Mutex::new(VecDeque::new())),
            players: Arc::new(Mutex::new(HashMap::new())),
            comments: Arc::new(Mutex::new(HashMap::new())),
            login_calls: Arc::new(AtomicUsize::new(0)),
            list_calls: Arc::new(AtomicUsize::new(0)),
            player_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A source that rejects every login
    pub fn rejecting_logins() -> Self {
        Self {
            login_default: false,
            ..Self::new()
        }
    }

    /// Answer the first logins from `results`
    pub fn with_logins(self, results: Vec<bool>) -> Self {
        *self.logins.lock().unwrap() = results.into();
        self
    }

    /// Queue one `list_bans` answer per cycle
    pub fn with_ban_lists(self, lists: Vec<Option<Vec<RawBan>>>) -> Self {
        *self.ban_lists.lock().unwrap() = lists.into();
        self
    }

    pub fn with_player(self, profile: PlayerProfile) -> Self {
        self.players
            .lock()
            .unwrap()
            .insert(profile.steam_id_64.clone().unwrap_or_default(), profile);
        self
    }

    pub fn with_comments(self, steam_id_64: &str, comments: Vec<Comment>) -> Self {
        self.comments
            .lock()
            .unwrap()
            .insert(steam_id_64.to_string(), comments);
        self
    }

    /// Queue another `list_bans` answer
    pub fn push_ban_list(&self, list: Option<Vec<RawBan>>) {
        self.ban_lists.lock().unwrap().push_back(list);
    }

    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn player_calls(&self) -> usize {
        self.player_calls.load(Ordering::SeqCst)
    }

    /// Create a new ScriptedBanSource that shares script and counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            logins: Arc::clone(&other.logins),
            login_default: other.login_default,
            ban_lists: Arc::clone(&other.ban_lists),
            players: Arc::clone(&other.players),
            comments: Arc::clone(&other.comments),
            login_calls: Arc::clone(&other.login_calls),
            list_calls: Arc::clone(&other.list_calls),
            player_calls: Arc::clone(&other.player_calls),
        }
    }
}

#[async_trait::async_trait]
impl BanSource for ScriptedBanSource {
    async fn authenticate(&self, _username: &str, _password: &str) -> bool {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        self.logins
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.login_default)
    }

    async fn list_bans(&self) -> Option<Vec<RawBan>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.ban_lists
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Some(Vec::new()))
    }

    async fn get_player(&self, steam_id_64: &str) -> Option<PlayerProfile> {
        self.player_calls.fetch_add(1, Ordering::SeqCst);
        self.players.lock().unwrap().get(steam_id_64).cloned()
    }

    async fn get_player_comments(&self, steam_id_64: &str) -> Option<Vec<Comment>> {
        self.comments.lock().unwrap().get(steam_id_64).cloned()
    }

    fn source_name(&self) -> &str {
        "scripted"
    }
}

/// A NotificationSink that records every message
///
/// Messages containing `fail_on` are rejected (and not recorded).
pub struct RecordingSink {
    delivered: Arc<Mutex<Vec<String>>>,
    attempts: Arc<AtomicUsize>,
    fail_on: Option<String>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            delivered: Arc::new(Mutex::new(Vec::new())),
            attempts: Arc::new(AtomicUsize::new(0)),
            fail_on: None,
        }
    }

    /// Reject messages containing `needle`
    pub fn failing_on(needle: &str) -> Self {
        Self {
            fail_on: Some(needle.to_string()),
            ..Self::new()
        }
    }

    pub fn delivered(&self) -> Vec<String> {
        self.delivered.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Create a new RecordingSink that shares counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            delivered: Arc::clone(&other.delivered),
            attempts: Arc::clone(&other.attempts),
            fail_on: other.fail_on.clone(),
        }
    }
}

#[async_trait::async_trait]
impl NotificationSink for RecordingSink {
    async fn deliver(&self, content: &str) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(needle) = &self.fail_on
            && content.contains(needle.as_str())
        {
            return Err(Error::sink("Unexpected webhook status 500"));
        }
        self.delivered.lock().unwrap().push(content.to_string());
        Ok(())
    }

    fn sink_name(&self) -> &'static str {
        "recording"
    }
}

/// A WatermarkStore whose saves can be switched to fail
pub struct SwitchableWatermarkStore {
    value: Arc<Mutex<Watermark>>,
    failing: Arc<AtomicBool>,
    save_calls: Arc<AtomicUsize>,
}

impl SwitchableWatermarkStore {
    pub fn new(initial: Watermark) -> Self {
        Self {
            value: Arc::new(Mutex::new(initial)),
            failing: Arc::new(AtomicBool::new(false)),
            save_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// The value currently on "storage"
    pub fn stored(&self) -> Watermark {
        *self.value.lock().unwrap()
    }

    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    /// Create a new SwitchableWatermarkStore that shares state with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            value: Arc::clone(&other.value),
            failing: Arc::clone(&other.failing),
            save_calls: Arc::clone(&other.save_calls),
        }
    }
}

#[async_trait::async_trait]
impl WatermarkStore for SwitchableWatermarkStore {
    async fn load(&self) -> Watermark {
        *self.value.lock().unwrap()
    }

    async fn save(&self, watermark: Watermark) -> Result<()> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::watermark("disk full"));
        }
        *self.value.lock().unwrap() = watermark;
        Ok(())
    }

    fn location(&self) -> String {
        "switchable".to_string()
    }
}

/// Helper to create a minimal NotifierConfig for testing
///
/// Login retries are short so that exhausting them takes milliseconds.
pub fn minimal_config(target: &str) -> NotifierConfig {
    NotifierConfig::new(target, Credentials::new("admin", "secret"))
        .with_poll_interval_secs(1)
        .with_login_retry(LoginRetryConfig {
            max_attempts: 3,
            initial_delay_ms: 10,
            max_delay_ms: 40,
        })
        .with_watermark_store(WatermarkStoreConfig::Memory)
}

/// Build a notifier from test doubles
pub fn notifier(
    config: NotifierConfig,
    source: ScriptedBanSource,
    sink: RecordingSink,
    store: impl WatermarkStore + 'static,
) -> (BanNotifier, mpsc::Receiver<NotifierEvent>) {
    BanNotifier::new(
        config,
        Box::new(source),
        Box::new(sink),
        Box::new(store),
        labels_en(),
    )
    .expect("notifier construction succeeds")
}

pub fn wm(value: &str) -> Watermark {
    Watermark::parse(value).expect("valid watermark")
}

pub fn ban(steam_id_64: &str, ban_time: &str) -> RawBan {
    RawBan::new("temp", steam_id_64, ban_time)
}

/// A player with one received action
pub fn player(steam_id_64: &str, name: &str, playtime_seconds: u64) -> PlayerProfile {
    PlayerProfile {
        names: vec![name.to_string()],
        steam_id_64: Some(steam_id_64.to_string()),
        total_playtime_seconds: playtime_seconds,
        received_actions: vec![PlayerAction {
            action_type: Some("TEMPBAN".to_string()),
            reason: Some("teamkill".to_string()),
            by: Some("admin1".to_string()),
            time: Some("2024-01-02T10:00:00.000000".to_string()),
        }],
        ..PlayerProfile::default()
    }
}

/// Collect every event currently in the channel
pub fn drain_events(rx: &mut mpsc::Receiver<NotifierEvent>) -> Vec<NotifierEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
