// # banwatch-core
//
// Core library for the ban notifier.
//
// ## Architecture Overview
//
// - **BanSource**: Trait for the upstream administration API (login, bans, players, comments)
// - **WatermarkStore**: Trait for persisting the "last checked" watermark
// - **NotificationSink**: Trait for delivering rendered messages
// - **BanNotifier**: Loop that orchestrates poll → dedup → persist → notify for one target
// - **Supervisor**: Runs one notifier per target and collects their events
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from HTTP implementations
// 2. **Boundary Validation**: Payloads become typed records before any logic sees them
// 3. **Watermark First**: The watermark is persisted before notifications go out
// 4. **Isolation**: A failure for one ban or one target never stops the others

pub mod config;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod format;
pub mod model;
pub mod state;
pub mod traits;

// Re-export core types for convenience
pub use config::{Credentials, LoginRetryConfig, NotifierConfig, WatermarkStoreConfig, target_key};
pub use engine::{
    BanNotifier, CycleReport, NotifierEvent, StopReason, Supervisor, SupervisorReport,
    TargetSummary,
};
pub use error::{Error, Result};
pub use format::{Labels, LocaleTable, render};
pub use model::{Ban, Comment, PlayerProfile, RawBan, Watermark};
pub use state::{FileWatermarkStore, MemoryWatermarkStore};
pub use traits::{BanSource, NotificationSink, WatermarkStore};
