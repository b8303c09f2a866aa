// # Memory Watermark Store
//
// Process-local implementation of WatermarkStore.
//
// ## Crash Behavior
//
// - The watermark is lost on restart
// - The first cycle after a restart treats every listed ban as new
//
// ## When to Use
//
// - Tests
// - Ephemeral deployments where a burst of repeat notifications after a
//   restart is acceptable

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::model::Watermark;
use crate::traits::WatermarkStore;

/// In-memory watermark store
///
/// Clones share the same value.
///
/// # Example
///
/// ```rust,no_run
/// use banwatch_core::{MemoryWatermarkStore, Watermark, WatermarkStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryWatermarkStore::new();
///     assert!(store.load().await.is_min());
///
///     store.save(Watermark::parse("2024.01.02-10.00.00")?).await?;
///     assert!(!store.load().await.is_min());
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryWatermarkStore {
    inner: Arc<RwLock<Watermark>>,
}

impl MemoryWatermarkStore {
    /// Create a store starting at `Watermark::MIN`
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store starting at `watermark`
    pub fn with_watermark(watermark: Watermark) -> Self {
        Self {
            inner: Arc::new(RwLock::new(watermark)),
        }
    }
}

#[async_trait]
impl WatermarkStore for MemoryWatermarkStore {
    async fn load(&self) -> Watermark {
        *self.inner.read().await
    }

    async fn save(&self, watermark: Watermark) -> Result<(), Error> {
        *self.inner.write().await = watermark;
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
