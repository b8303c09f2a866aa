//! Ban notifier loop
//!
//! The [`BanNotifier`] watches one administration API:
//! - Logging in via [`BanSource`] with bounded, escalating retries
//! - Polling the ban list and selecting bans past the watermark
//! - Persisting the advanced watermark via [`WatermarkStore`]
//! - Enriching, rendering and delivering each new ban via [`NotificationSink`]
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  BanSource  │─── ban list ───┐
//! └─────────────┘                │
//!                                ▼
//!                       ┌──────────────┐
//!                       │ BanNotifier  │
//!                       └──────────────┘
//!                                │
//!       ┌────────────────────────┼────────────────────────┐
//!       │                        │                        │
//!       ▼                        ▼                        ▼
//! ┌────────────────┐   ┌──────────────────┐      ┌─────────────┐
//! │ WatermarkStore │   │ NotificationSink │      │   Events    │
//! │ (persist)      │   │ (deliver)        │      │  (observe)  │
//! └────────────────┘   └──────────────────┘      └─────────────┘
//! ```
//!
//! ## Cycle
//!
//! 1. Fetch the ban list; on failure keep the watermark and wait for the next cycle
//! 2. Select bans with `ban_time > watermark`
//! 3. Persist the advanced watermark before any notification goes out
//! 4. For each new ban: fetch profile and comments, render, deliver
//!
//! A failure while handling one ban is logged and reported as an event; it
//! never affects the remaining bans or the loop.

pub mod supervisor;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::config::{Credentials, LoginRetryConfig, NotifierConfig};
use crate::dedup;
use crate::error::Result;
use crate::format::{Labels, render};
use crate::model::{Ban, Watermark};
use crate::traits::{BanSource, NotificationSink, WatermarkStore};

pub use supervisor::{Supervisor, SupervisorReport, TargetSummary};

/// Events emitted by the BanNotifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifierEvent {
    /// Notifier started with the persisted watermark
    Started { watermark: Watermark },

    /// The API accepted the login
    LoginSucceeded { attempts: u32 },

    /// A login attempt was rejected
    LoginFailed { attempt: u32, will_retry: bool },

    /// The ban list could not be fetched this cycle
    PollFailed,

    /// Bans past the watermark were found
    NewBansDetected { count: usize },

    /// The watermark moved forward
    WatermarkAdvanced {
        from: Watermark,
        to: Watermark,
        persisted: bool,
    },

    /// The advanced watermark could not be persisted
    WatermarkPersistFailed { watermark: Watermark, error: String },

    /// A ban was not announced because enrichment data was unavailable
    BanSkipped { steam_id_64: String, reason: String },

    /// A notification was accepted by the sink
    NotificationDelivered { steam_id_64: String },

    /// Rendering or delivery failed for a ban
    NotificationFailed { steam_id_64: String, error: String },

    /// Notifier stopped
    Stopped { reason: StopReason },
}

/// Why a notifier stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Shutdown was requested
    Shutdown,
    /// Every login attempt was rejected
    LoginFailed,
}

/// Outcome of a single polling cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Number of records in the fetched list, `None` if the fetch failed
    pub fetched: Option<usize>,
    /// Bans past the watermark
    pub new_bans: usize,
    /// Whether the advanced watermark reached storage
    pub watermark_persisted: bool,
    /// Batch held back because its watermark could not be persisted
    pub withheld: bool,
    /// Notifications accepted by the sink
    pub delivered: usize,
    /// Bans skipped for missing enrichment data
    pub skipped: usize,
    /// Bans whose rendering or delivery failed
    pub failed: usize,
}

impl CycleReport {
    /// Whether the ban list could not be fetched
    pub fn poll_failed(&self) -> bool {
        self.fetched.is_none()
    }
}

enum BanOutcome {
    Delivered,
    Skipped(String),
}

enum LoginOutcome {
    LoggedIn,
    GaveUp,
    Interrupted,
}

type Shutdown = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Notifier for one monitored API
///
/// ## Lifecycle
///
/// 1. Create with [`BanNotifier::new()`]
/// 2. Start with [`BanNotifier::run()`] or [`BanNotifier::run_with_shutdown()`]
/// 3. The notifier logs in, then polls until shutdown
/// 4. If every login attempt fails it stops on its own and returns `Ok(())`
///
/// ## Threading
///
/// Everything inside one notifier is sequential. Several targets run as
/// independent tasks under a [`Supervisor`].
pub struct BanNotifier {
    /// Monitored base URL (for logging)
    target: String,

    /// Upstream API
    source: Box<dyn BanSource>,

    /// Delivery channel for rendered messages
    sink: Box<dyn NotificationSink>,

    /// Persistence for the watermark
    store: Box<dyn WatermarkStore>,

    /// Resolved labels for rendering
    labels: Labels,

    credentials: Credentials,

    poll_interval: Duration,

    login_retry: LoginRetryConfig,

    require_durable_watermark: bool,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<NotifierEvent>,
}

impl BanNotifier {
    /// Create a new notifier
    ///
    /// # Parameters
    ///
    /// - `config`: validated before use
    /// - `source`: API client for the configured target
    /// - `sink`: notification delivery
    /// - `store`: watermark persistence private to this target
    /// - `labels`: labels for the configured language
    ///
    /// # Returns
    ///
    /// A tuple of (notifier, event_receiver) where event_receiver yields notifier events
    pub fn new(
        config: NotifierConfig,
        source: Box<dyn BanSource>,
        sink: Box<dyn NotificationSink>,
        store: Box<dyn WatermarkStore>,
        labels: Labels,
    ) -> Result<(Self, mpsc::Receiver<NotifierEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);
        let poll_interval = config.poll_interval();

        let notifier = Self {
            target: config.target,
            source,
            sink,
            store,
            labels,
            credentials: config.credentials,
            poll_interval,
            login_retry: config.login_retry,
            require_durable_watermark: config.require_durable_watermark,
            event_tx: tx,
        };

        Ok((notifier, rx))
    }

    /// Monitored base URL
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Run the notifier until Ctrl-C
    ///
    /// # Returns
    ///
    /// `Ok(())` on shutdown and when login attempts are exhausted
    pub async fn run(&self) -> Result<()> {
        self.run_internal(Box::pin(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        }))
        .await
    }

    /// Run the notifier until `shutdown_rx` fires
    ///
    /// Used by the [`Supervisor`] and by tests. `None` behaves like
    /// [`BanNotifier::run()`]. A dropped sender counts as a shutdown request.
    pub async fn run_with_shutdown(&self, shutdown_rx: Option<oneshot::Receiver<()>>) -> Result<()> {
        match shutdown_rx {
            Some(rx) => {
                self.run_internal(Box::pin(async {
                    let _ = rx.await;
                }))
                .await
            }
            None => self.run().await,
        }
    }

    async fn run_internal(&self, mut shutdown: Shutdown) -> Result<()> {
        let mut watermark = self.store.load().await;
        info!(
            target_url = %self.target,
            source = self.source.source_name(),
            sink = self.sink.sink_name(),
            store = %self.store.location(),
            %watermark,
            "Ban notifier starting"
        );
        self.emit_event(NotifierEvent::Started { watermark });

        match self.login(&mut shutdown).await {
            LoginOutcome::LoggedIn => {}
            LoginOutcome::GaveUp => {
                self.emit_event(NotifierEvent::Stopped {
                    reason: StopReason::LoginFailed,
                });
                return Ok(());
            }
            LoginOutcome::Interrupted => {
                info!(target_url = %self.target, "Shutdown during login");
                self.emit_event(NotifierEvent::Stopped {
                    reason: StopReason::Shutdown,
                });
                return Ok(());
            }
        }

        loop {
            let report = self.poll_once(&mut watermark).await;
            debug!(target_url = %self.target, ?report, "Cycle finished");

            if !Self::sleep_or_shutdown(self.poll_interval, &mut shutdown).await {
                break;
            }
        }

        info!(target_url = %self.target, %watermark, "Ban notifier stopped");
        self.emit_event(NotifierEvent::Stopped {
            reason: StopReason::Shutdown,
        });
        Ok(())
    }

    /// Log in, retrying with exponential backoff
    async fn login(&self, shutdown: &mut Shutdown) -> LoginOutcome {
        let max_attempts = self.login_retry.max_attempts;

        for attempt in 1..=max_attempts {
            if self
                .source
                .authenticate(&self.credentials.username, &self.credentials.password)
                .await
            {
                info!(target_url = %self.target, attempt, "Logged in");
                self.emit_event(NotifierEvent::LoginSucceeded { attempts: attempt });
                return LoginOutcome::LoggedIn;
            }

            let will_retry = attempt < max_attempts;
            self.emit_event(NotifierEvent::LoginFailed {
                attempt,
                will_retry,
            });

            if !will_retry {
                break;
            }

            let delay = self.login_retry.delay_after(attempt);
            warn!(
                target_url = %self.target,
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                "Login rejected, retrying"
            );
            if !Self::sleep_or_shutdown(delay, shutdown).await {
                return LoginOutcome::Interrupted;
            }
        }

        error!(
            target_url = %self.target,
            max_attempts,
            "Login failed, giving up on this target"
        );
        LoginOutcome::GaveUp
    }

    /// Run a single polling cycle
    ///
    /// `watermark` is the in-memory watermark; it is advanced when the batch
    /// is accepted for notification.
    pub async fn poll_once(&self, watermark: &mut Watermark) -> CycleReport {
        let mut report = CycleReport::default();

        let Some(bans) = self.source.list_bans().await else {
            warn!(
                target_url = %self.target,
                %watermark,
                "Could not fetch ban list, retrying next cycle"
            );
            self.emit_event(NotifierEvent::PollFailed);
            return report;
        };
        report.fetched = Some(bans.len());

        let new_bans = dedup::select_new(&bans, *watermark);
        report.new_bans = new_bans.len();
        if new_bans.is_empty() {
            debug!(target_url = %self.target, total = bans.len(), "No new bans");
            return report;
        }

        info!(
            target_url = %self.target,
            count = new_bans.len(),
            "New bans detected"
        );
        self.emit_event(NotifierEvent::NewBansDetected {
            count: new_bans.len(),
        });

        let previous = *watermark;
        let next = dedup::advance_watermark(previous, &new_bans);
        match self.store.save(next).await {
            Ok(()) => report.watermark_persisted = true,
            Err(e) => {
                self.emit_event(NotifierEvent::WatermarkPersistFailed {
                    watermark: next,
                    error: e.to_string(),
                });

                if self.require_durable_watermark {
                    warn!(
                        target_url = %self.target,
                        count = new_bans.len(),
                        "Holding back notifications until the watermark can be persisted"
                    );
                    report.withheld = true;
                    return report;
                }

                warn!(
                    target_url = %self.target,
                    "Watermark not persisted, a restart may repeat these notifications"
                );
            }
        }

        *watermark = next;
        if next != previous {
            self.emit_event(NotifierEvent::WatermarkAdvanced {
                from: previous,
                to: next,
                persisted: report.watermark_persisted,
            });
        }

        for ban in &new_bans {
            match self.process_ban(ban).await {
                Ok(BanOutcome::Delivered) => {
                    report.delivered += 1;
                    self.emit_event(NotifierEvent::NotificationDelivered {
                        steam_id_64: ban.steam_id_64.clone(),
                    });
                }
                Ok(BanOutcome::Skipped(reason)) => {
                    report.skipped += 1;
                    self.emit_event(NotifierEvent::BanSkipped {
                        steam_id_64: ban.steam_id_64.clone(),
                        reason,
                    });
                }
                Err(e) => {
                    error!(
                        target_url = %self.target,
                        steam_id = %ban.steam_id_64,
                        ban_time = %ban.ban_time_str(),
                        error = %e,
                        "Failed to notify ban"
                    );
                    report.failed += 1;
                    self.emit_event(NotifierEvent::NotificationFailed {
                        steam_id_64: ban.steam_id_64.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        report
    }

    /// Enrich, render and deliver one ban
    async fn process_ban(&self, ban: &Ban) -> Result<BanOutcome> {
        let steam_id = ban.steam_id_64.as_str();

        let Some(player) = self.source.get_player(steam_id).await else {
            warn!(
                target_url = %self.target,
                steam_id,
                "No player profile available, skipping ban"
            );
            return Ok(BanOutcome::Skipped("player profile unavailable".to_string()));
        };

        let comments = self.source.get_player_comments(steam_id).await;
        if comments.is_none() {
            debug!(steam_id, "No comments available, rendering without them");
        }

        let message = render(ban, &player, comments.as_deref(), &self.labels)?;
        self.sink.deliver(&message).await?;

        info!(
            target_url = %self.target,
            steam_id,
            kind = %ban.kind,
            ban_time = %ban.ban_time_str(),
            "Ban notification delivered"
        );
        Ok(BanOutcome::Delivered)
    }

    /// Sleep for `duration`
    ///
    /// Returns `false` if shutdown was requested first.
    async fn sleep_or_shutdown(duration: Duration, shutdown: &mut Shutdown) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = shutdown => {
                info!("Shutdown signal received");
                false
            }
        }
    }

    /// Emit a notifier event
    ///
    /// A full channel drops the event with a warning. Nobody listening is fine.
    fn emit_event(&self, event: NotifierEvent) {
        if let Err(mpsc::error::TrySendError::Full(_)) = self.event_tx.try_send(event) {
            warn!(
                target_url = %self.target,
                "Event channel full, dropping event. Consider increasing event_channel_capacity."
            );
        }
    }
}
