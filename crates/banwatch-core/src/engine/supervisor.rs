//! Multi-target supervision
//!
//! Runs one [`BanNotifier`] per monitored API as an independent task. A
//! target that halts (for example after exhausting its login attempts) does
//! not affect the others.
//!
//! Events from all notifiers are fanned in and tallied per target into a
//! [`SupervisorReport`], which is returned once the supervisor stops.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tokio_stream::StreamExt;
use tokio_stream::StreamMap;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info, warn};

use super::{BanNotifier, NotifierEvent, StopReason};
use crate::error::{Error, Result};
use crate::model::Watermark;

const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-target tally of notifier events
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetSummary {
    pub logged_in: bool,
    pub login_failures: usize,
    pub polls_failed: usize,
    pub bans_detected: usize,
    pub delivered: usize,
    pub delivery_failed: usize,
    pub skipped: usize,
    pub persist_failures: usize,
    /// Latest in-memory watermark reported by the notifier
    pub watermark: Option<Watermark>,
    pub stop_reason: Option<StopReason>,
    /// Set when the notifier task returned an error
    pub error: Option<String>,
}

/// Outcome of a supervisor run
#[derive(Debug, Clone, Default)]
pub struct SupervisorReport {
    pub targets: BTreeMap<String, TargetSummary>,
    /// Tasks aborted after the drain timeout
    pub aborted: usize,
    /// Tasks that panicked
    pub panicked: usize,
}

impl SupervisorReport {
    /// Summary for one target key
    pub fn target(&self, key: &str) -> Option<&TargetSummary> {
        self.targets.get(key)
    }

    fn record(&mut self, key: &str, event: &NotifierEvent) {
        debug!(target_key = key, ?event, "Notifier event");
        let summary = self.targets.entry(key.to_string()).or_default();

        match event {
            NotifierEvent::Started { watermark } => summary.watermark = Some(*watermark),
            NotifierEvent::LoginSucceeded { .. } => summary.logged_in = true,
            NotifierEvent::LoginFailed { .. } => summary.login_failures += 1,
            NotifierEvent::PollFailed => summary.polls_failed += 1,
            NotifierEvent::NewBansDetected { count } => summary.bans_detected += count,
            NotifierEvent::WatermarkAdvanced { to, .. } => summary.watermark = Some(*to),
            NotifierEvent::WatermarkPersistFailed { .. } => summary.persist_failures += 1,
            NotifierEvent::BanSkipped { .. } => summary.skipped += 1,
            NotifierEvent::NotificationDelivered { .. } => summary.delivered += 1,
            NotifierEvent::NotificationFailed { .. } => summary.delivery_failed += 1,
            NotifierEvent::Stopped { reason } => summary.stop_reason = Some(*reason),
        }
    }

    fn record_exit(
        &mut self,
        joined: std::result::Result<(String, Result<()>), tokio::task::JoinError>,
    ) {
        match joined {
            Ok((key, Ok(()))) => debug!(target_key = %key, "Notifier task finished"),
            Ok((key, Err(e))) => {
                error!(target_key = %key, error = %e, "Notifier task failed");
                self.targets.entry(key).or_default().error = Some(e.to_string());
            }
            Err(e) if e.is_cancelled() => self.aborted += 1,
            Err(e) => {
                error!(error = %e, "Notifier task panicked");
                self.panicked += 1;
            }
        }
    }
}

/// Supervisor for a set of notifiers
///
/// # Example
///
/// ```rust,ignore
/// let mut supervisor = Supervisor::new();
/// for (key, notifier, events) in notifiers {
///     supervisor.add(key, notifier, events)?;
/// }
/// let report = supervisor.run().await?;
/// ```
pub struct Supervisor {
    notifiers: Vec<(String, BanNotifier, mpsc::Receiver<NotifierEvent>)>,
    drain_timeout: Duration,
}

impl Supervisor {
    pub fn new() -> Self {
        Self {
            notifiers: Vec::new(),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }

    /// How long to wait for notifiers to stop before aborting them
    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    /// Register a notifier under a unique key
    pub fn add(
        &mut self,
        key: impl Into<String>,
        notifier: BanNotifier,
        events: mpsc::Receiver<NotifierEvent>,
    ) -> Result<()> {
        let key = key.into();
        if self.notifiers.iter().any(|(existing, _, _)| *existing == key) {
            return Err(Error::config(format!(
                "Target '{}' is already supervised",
                key
            )));
        }
        self.notifiers.push((key, notifier, events));
        Ok(())
    }

    /// Number of registered notifiers
    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }

    /// Run all notifiers until Ctrl-C or until every notifier has stopped
    pub async fn run(self) -> Result<SupervisorReport> {
        self.run_internal(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Run all notifiers until `shutdown_rx` fires or every notifier has stopped
    ///
    /// `None` behaves like [`Supervisor::run()`].
    pub async fn run_with_shutdown(
        self,
        shutdown_rx: Option<oneshot::Receiver<()>>,
    ) -> Result<SupervisorReport> {
        match shutdown_rx {
            Some(rx) => {
                self.run_internal(async {
                    let _ = rx.await;
                })
                .await
            }
            None => self.run().await,
        }
    }

    async fn run_internal<F>(self, shutdown: F) -> Result<SupervisorReport>
    where
        F: std::future::Future<Output = ()>,
    {
        if self.notifiers.is_empty() {
            return Err(Error::config("No targets to supervise"));
        }

        let mut report = SupervisorReport::default();
        let mut tasks = JoinSet::new();
        let mut stops = Vec::with_capacity(self.notifiers.len());
        let mut events = StreamMap::new();

        info!(targets = self.notifiers.len(), "Starting notifiers");

        for (key, notifier, rx) in self.notifiers {
            let (stop_tx, stop_rx) = oneshot::channel();
            stops.push(stop_tx);
            report.targets.insert(key.clone(), TargetSummary::default());
            events.insert(key.clone(), ReceiverStream::new(rx));

            tasks.spawn(async move {
                let result = notifier.run_with_shutdown(Some(stop_rx)).await;
                (key, result)
            });
        }

        tokio::pin!(shutdown);
        let mut events_done = false;

        loop {
            tokio::select! {
                next = events.next(), if !events_done => match next {
                    Some((key, event)) => report.record(&key, &event),
                    None => events_done = true,
                },
                joined = tasks.join_next(), if !tasks.is_empty() => {
                    if let Some(joined) = joined {
                        report.record_exit(joined);
                    }
                }
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping notifiers");
                    break;
                }
            }

            if tasks.is_empty() && events_done {
                info!("All notifiers stopped");
                return Ok(report);
            }
        }

        for stop in stops {
            let _ = stop.send(());
        }

        let drained = tokio::time::timeout(self.drain_timeout, async {
            while let Some(joined) = tasks.join_next().await {
                report.record_exit(joined);
            }
        })
        .await;

        if drained.is_err() {
            warn!(
                remaining = tasks.len(),
                timeout_ms = self.drain_timeout.as_millis() as u64,
                "Notifiers did not stop in time, aborting"
            );
            tasks.abort_all();
            while let Some(joined) = tasks.join_next().await {
                report.record_exit(joined);
            }
        }

        // All senders are gone now, so the stream ends after the backlog.
        while let Some((key, event)) = events.next().await {
            report.record(&key, &event);
        }

        info!(
            targets = report.targets.len(),
            aborted = report.aborted,
            "Supervisor stopped"
        );
        Ok(report)
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}
