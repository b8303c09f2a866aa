// # File Watermark Store
//
// Persists the watermark as a single line of text.
//
// ## File Format
//
// ```text
// 2024.01.02-10.00.00
// ```
//
// Surrounding whitespace is tolerated on load.
//
// ## Crash Recovery
//
// - Atomic writes: the new value goes to `<path>.tmp`, is synced, then renamed
//   over `<path>`
// - Backup: the previous value is copied to `<path>.backup` before the rename
// - Recovery: an unparseable main file falls back to the backup; if both are
//   unusable the store reports `Watermark::MIN`

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::Error;
use crate::model::Watermark;
use crate::traits::WatermarkStore;

/// File-based watermark store
///
/// Each monitored target needs its own path; the store takes no lock and
/// assumes it is the only writer.
///
/// # Example
///
/// ```rust,no_run
/// use banwatch_core::{FileWatermarkStore, Watermark, WatermarkStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileWatermarkStore::new("/var/lib/banwatch/last_checked.txt").await?;
///
///     store.save(Watermark::parse("2024.01.02-10.00.00")?).await?;
///     assert_eq!(store.load().await.to_string(), "2024.01.02-10.00.00");
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileWatermarkStore {
    path: PathBuf,
}

impl FileWatermarkStore {
    /// Create a store for `path`, creating parent directories if needed
    ///
    /// The file itself is not touched until the first `save`.
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    Error::config(format!(
                        "Failed to create watermark directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        Ok(Self { path })
    }

    /// Path of the main file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse one watermark file
    ///
    /// `Ok(None)` means the file does not exist.
    async fn read_watermark(path: &Path) -> Result<Option<Watermark>, Error> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::watermark(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        Watermark::parse(&content).map(Some)
    }

    async fn load_backup(&self) -> Option<Watermark> {
        let backup_path = self.backup_path();
        match Self::read_watermark(&backup_path).await {
            Ok(Some(watermark)) => {
                tracing::info!(
                    path = %backup_path.display(),
                    %watermark,
                    "Recovered watermark from backup"
                );
                Some(watermark)
            }
            Ok(None) => {
                tracing::warn!("No watermark backup found");
                None
            }
            Err(e) => {
                tracing::error!(error = %e, "Watermark backup is unusable too");
                None
            }
        }
    }

    async fn write_watermark(&self, watermark: Watermark) -> Result<(), Error> {
        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::watermark(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(watermark.to_string().as_bytes())
                .await
                .map_err(|e| {
                    Error::watermark(format!(
                        "Failed to write to temp file {}: {}",
                        temp_path.display(),
                        e
                    ))
                })?;

            file.sync_all().await.map_err(|e| {
                Error::watermark(format!(
                    "Failed to sync temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        if self.path.exists() {
            if let Err(e) = fs::copy(&self.path, self.backup_path()).await {
                tracing::warn!(error = %e, "Failed to back up previous watermark");
            }
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::watermark(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        Self::sibling(&self.path, "tmp")
    }

    fn backup_path(&self) -> PathBuf {
        Self::sibling(&self.path, "backup")
    }

    /// `<path>.<suffix>`, keeping the original extension
    fn sibling(path: &Path, suffix: &str) -> PathBuf {
        let mut name = OsString::from(path.as_os_str());
        name.push(".");
        name.push(suffix);
        PathBuf::from(name)
    }
}

#[async_trait]
impl WatermarkStore for FileWatermarkStore {
    async fn load(&self) -> Watermark {
        match Self::read_watermark(&self.path).await {
            Ok(Some(watermark)) => {
                tracing::debug!(path = %self.path.display(), %watermark, "Loaded watermark");
                watermark
            }
            Ok(None) => {
                tracing::info!(
                    path = %self.path.display(),
                    "No watermark on record, every listed ban counts as new"
                );
                Watermark::MIN
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Watermark file is unusable, attempting recovery from backup"
                );
                self.load_backup().await.unwrap_or(Watermark::MIN)
            }
        }
    }

    async fn save(&self, watermark: Watermark) -> Result<(), Error> {
        match self.write_watermark(watermark).await {
            Ok(()) => {
                tracing::trace!(path = %self.path.display(), %watermark, "Watermark written");
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    path = %self.path.display(),
                    %watermark,
                    error = %e,
                    "Failed to persist watermark"
                );
                Err(e)
            }
        }
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
