// # Watermark Store Trait
//
// Defines the interface for persisting the "last checked" watermark.
//
// ## Purpose
//
// The watermark is the only state that survives a restart. It prevents
// re-notifying bans that were already announced before the process stopped.
//
// ## Implementations
//
// - `FileWatermarkStore`: single-line text file, atomic replace
// - `MemoryWatermarkStore`: process-local, for tests and ephemeral runs
//
// ## Usage
//
// ```rust,ignore
// use banwatch_core::{Watermark, WatermarkStore};
//
// let store = /* WatermarkStore implementation */;
// let mut watermark = store.load().await;
// watermark = Watermark::parse("2024.01.02-10.00.00")?;
// store.save(watermark).await?;
// ```

use async_trait::async_trait;

use crate::model::Watermark;

/// Trait for watermark persistence
///
/// # Trust Level: Trusted (Core Component)
///
/// ## Allowed Capabilities
/// - ✅ Perform I/O against its own storage location
/// - ✅ Keep backups of the previous value
///
/// ## Forbidden Capabilities
/// - ❌ Decide when the watermark advances (owned by `BanNotifier`)
/// - ❌ Share a storage location with another target or process
#[async_trait]
pub trait WatermarkStore: Send + Sync {
    /// Load the persisted watermark
    ///
    /// Never fails: an absent or unreadable value is logged and reported as
    /// [`Watermark::MIN`].
    async fn load(&self) -> Watermark;

    /// Persist a watermark, replacing the previous value
    ///
    /// A crash during `save` must leave either the old or the new value on
    /// storage, never a partial write. Implementations log failures before
    /// returning them.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: the value is durable
    /// - `Err(Error)`: the previous value is still in effect on storage
    async fn save(&self, watermark: Watermark) -> Result<(), crate::Error>;

    /// Human-readable location (for logging)
    fn location(&self) -> String;
}
