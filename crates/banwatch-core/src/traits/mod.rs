//! Core traits for the banwatch system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`BanSource`]: Fetch bans, players and comments from the upstream API
//! - [`WatermarkStore`]: Persist the "last checked" watermark
//! - [`NotificationSink`]: Deliver rendered notifications

pub mod ban_source;
pub mod notification_sink;
pub mod watermark_store;

pub use ban_source::BanSource;
pub use notification_sink::NotificationSink;
pub use watermark_store::WatermarkStore;
