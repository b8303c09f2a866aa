// # Notification Sink Trait
//
// Defines the interface for delivering rendered notifications.
//
// ## Implementations
//
// - Discord webhook: `banwatch-sink-discord` crate

use async_trait::async_trait;

/// Trait for notification sinks
///
/// Delivery is fire-and-forget from the notifier's point of view: a failed
/// delivery is reported once and never retried.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver one rendered message
    ///
    /// # Returns
    ///
    /// - `Ok(())`: the sink acknowledged the message
    /// - `Err(Error)`: transport failure or unexpected status
    async fn deliver(&self, content: &str) -> Result<(), crate::Error>;

    /// Sink name (for logging)
    fn sink_name(&self) -> &'static str;
}
