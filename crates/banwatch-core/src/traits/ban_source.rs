// # Ban Source Trait
//
// Defines the interface to the upstream game-administration API.
//
// ## Implementations
//
// - CRCON web API: `banwatch-source-crcon` crate
//
// ## Usage
//
// ```rust,ignore
// use banwatch_core::BanSource;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* BanSource implementation */;
//
//     if !source.authenticate("admin", "secret").await {
//         anyhow::bail!("login rejected");
//     }
//
//     if let Some(bans) = source.list_bans().await {
//         println!("{} bans on record", bans.len());
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::model::{Comment, PlayerProfile, RawBan};

/// Trait for ban source implementations
///
/// All methods degrade instead of failing: transport errors, unexpected
/// status codes and malformed payloads are logged by the implementation and
/// surface as `false` / `None`. A single polling cycle must never abort
/// because of the upstream API.
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS calls to the configured base URL only
/// - ✅ Keep session credentials (bearer token, session cookie) between calls
/// - ✅ Parse and normalize API payloads
///
/// ## Forbidden Capabilities
/// - ❌ Retry or back off (owned by `BanNotifier`)
/// - ❌ Decide which bans are new (owned by the deduplicator)
/// - ❌ Touch the watermark store
/// - ❌ Spawn tasks
#[async_trait]
pub trait BanSource: Send + Sync {
    /// Establish a session with the given credentials
    ///
    /// # Returns
    ///
    /// `true` if the API accepted the login
    async fn authenticate(&self, username: &str, password: &str) -> bool;

    /// Fetch the full current ban list
    ///
    /// # Returns
    ///
    /// - `Some(bans)`: the raw ban records, unvalidated
    /// - `None`: transport error, non-200 status, or missing `result` envelope
    async fn list_bans(&self) -> Option<Vec<RawBan>>;

    /// Fetch and normalize a player's profile
    ///
    /// # Returns
    ///
    /// `None` when the payload has no `result` envelope or on any error
    async fn get_player(&self, steam_id_64: &str) -> Option<PlayerProfile>;

    /// Fetch the comments attached to a player
    ///
    /// # Returns
    ///
    /// `None` when the payload has no `result` envelope or on any error
    async fn get_player_comments(&self, steam_id_64: &str) -> Option<Vec<Comment>>;

    /// Identifier of the monitored API (for logging)
    fn source_name(&self) -> &str;
}
