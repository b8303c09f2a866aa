// # CRCON Ban Source
//
// This crate provides a `BanSource` for the CRCON game-administration web API.
//
// ## Behavior
//
// - One HTTP request per trait call
// - Session cookie kept by the client's cookie store after login
// - Every request carries `Authorization: Bearer <token>`
// - Per-request timeout (30 seconds by default)
// - Non-success statuses classified in the log line (401/403, 404, 429, 5xx)
// - Failures are logged and surface as `false` / `None`; no retries here
//
// ## Trust Level: Untrusted (Ban Source)
//
// **Allowed Capabilities**:
// - ✅ Perform HTTP/HTTPS calls to the configured base URL only
// - ✅ Parse and normalize API payloads
//
// **Forbidden Capabilities**:
// - ❌ Spawn tasks or threads
// - ❌ Retry or back off (owned by BanNotifier)
// - ❌ Touch the watermark store
//
// ## Security Requirements
//
// - The API token and the login password NEVER appear in logs
// - The client refuses to start with an empty token
//
// ## API Reference
//
// - Login: POST `/api/login` `{"username": ..., "password": ...}`
// - Ban list: GET `/api/get_bans` → `{"result": [Ban]}`
// - Player: GET `/api/player?steam_id_64=X` → `{"result": PlayerProfile}`
// - Comments: GET `/api/get_player_comment?steam_id_64=X` → `{"result": [Comment]}`

use async_trait::async_trait;
use banwatch_core::{BanSource, Comment, Error, PlayerProfile, RawBan, Result};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::Value;
use std::time::Duration;

/// Default HTTP timeout for API requests (30 seconds)
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest response body excerpt included in an error message
const MAX_BODY_EXCERPT: usize = 200;

/// CRCON web API client
///
/// # Security
///
/// The Debug implementation does NOT expose the API token.
pub struct CrconClient {
    /// Base URL without trailing slash
    base_url: String,

    /// HTTP client with bearer header, cookie store and timeout
    /// ⚠️ Its default headers hold the API token; never log them
    client: reqwest::Client,
}

impl std::fmt::Debug for CrconClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrconClient")
            .field("base_url", &self.base_url)
            .field("api_token", &"<REDACTED>")
            .finish()
    }
}

impl CrconClient {
    /// Create a client with the default timeout
    ///
    /// # Errors
    ///
    /// - `Error::Config`: empty token or a token that is not a valid header value
    /// - `Error::Http`: the HTTP client could not be built
    pub fn new(base_url: impl Into<String>, api_token: &str) -> Result<Self> {
        Self::with_timeout(base_url, api_token, DEFAULT_HTTP_TIMEOUT)
    }

    /// Create a client with a custom per-request timeout
    pub fn with_timeout(
        base_url: impl Into<String>,
        api_token: &str,
        timeout: Duration,
    ) -> Result<Self> {
        if api_token.trim().is_empty() {
            return Err(Error::config("API token cannot be empty"));
        }

        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", api_token))
            .map_err(|_| Error::config("API token contains characters not allowed in a header"))?;
        bearer.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Base URL of the monitored API
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST /api/login
    async fn login(&self, username: &str, password: &str) -> Result<()> {
        let response = self
            .client
            .post(self.url("/api/login"))
            .json(&serde_json::json!({
                "username": username,
                "password": password,
            }))
            .send()
            .await
            .map_err(|e| Error::http(format!("Login request failed: {}", e)))?;

        // Only a plain 200 counts as a successful login.
        if response.status() != StatusCode::OK {
            return Err(Self::status_error("Login", response).await);
        }
        Ok(())
    }

    /// GET a path and unwrap the `{"result": ...}` envelope
    ///
    /// `strict` accepts only 200; otherwise any 2xx status is fine.
    async fn get_result(&self, what: &str, path: &str, query: &[(&str, &str)], strict: bool) -> Result<Value> {
        let response = self
            .client
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .map_err(|e| Error::http(format!("{} request failed: {}", what, e)))?;

        let status = response.status();
        let accepted = if strict {
            status == StatusCode::OK
        } else {
            status.is_success()
        };
        if !accepted {
            return Err(Self::status_error(what, response).await);
        }

        let mut body: Value = response
            .json()
            .await
            .map_err(|e| Error::source(format!("{}: failed to parse response: {}", what, e)))?;

        match body.get_mut("result").map(Value::take) {
            Some(Value::Null) | None => Err(Error::source(format!(
                "{}: response has no result envelope",
                what
            ))),
            Some(result) => Ok(result),
        }
    }

    async fn fetch_bans(&self) -> Result<Vec<RawBan>> {
        let result = self.get_result("Ban list", "/api/get_bans", &[], true).await?;
        let Value::Array(items) = result else {
            return Err(Error::source("Ban list: result is not an array"));
        };

        Ok(items
            .into_iter()
            .map(|item| {
                serde_json::from_value::<RawBan>(item).unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "Unreadable ban record");
                    RawBan::default()
                })
            })
            .collect())
    }

    async fn fetch_player(&self, steam_id_64: &str) -> Result<PlayerProfile> {
        let result = self
            .get_result("Player", "/api/player", &[("steam_id_64", steam_id_64)], false)
            .await?;
        serde_json::from_value(result)
            .map_err(|e| Error::source(format!("Player: malformed profile: {}", e)))
    }

    async fn fetch_comments(&self, steam_id_64: &str) -> Result<Vec<Comment>> {
        let result = self
            .get_result(
                "Comments",
                "/api/get_player_comment",
                &[("steam_id_64", steam_id_64)],
                false,
            )
            .await?;
        let Value::Array(items) = result else {
            return Err(Error::source("Comments: result is not an array"));
        };

        Ok(items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<Comment>(item) {
                Ok(comment) => Some(comment),
                Err(e) => {
                    tracing::warn!(steam_id = steam_id_64, error = %e, "Dropping unreadable comment");
                    None
                }
            })
            .collect())
    }

    /// Map a non-accepted response to an error
    async fn status_error(what: &str, response: reqwest::Response) -> Error {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());
        let excerpt: String = body.chars().take(MAX_BODY_EXCERPT).collect();

        match status.as_u16() {
            401 | 403 => Error::auth(format!(
                "{}: rejected, check API token and credentials. Status: {}",
                what, status
            )),
            404 => Error::source(format!("{}: endpoint not found. Status: {}", what, status)),
            429 => Error::source(format!(
                "{}: rate limit exceeded. Status: {}",
                what, status
            )),
            500..=599 => Error::source(format!(
                "{}: server error (transient): {} - {}",
                what, status, excerpt
            )),
            _ => Error::source(format!("{}: unexpected status {} - {}", what, status, excerpt)),
        }
    }
}

#[async_trait]
impl BanSource for CrconClient {
    async fn authenticate(&self, username: &str, password: &str) -> bool {
        match self.login(username, password).await {
            Ok(()) => {
                tracing::debug!(base_url = %self.base_url, username, "Login accepted");
                true
            }
            Err(e) => {
                tracing::warn!(base_url = %self.base_url, username, error = %e, "Login failed");
                false
            }
        }
    }

    async fn list_bans(&self) -> Option<Vec<RawBan>> {
        match self.fetch_bans().await {
            Ok(bans) => {
                tracing::trace!(base_url = %self.base_url, count = bans.len(), "Fetched ban list");
                Some(bans)
            }
            Err(e) => {
                tracing::error!(base_url = %self.base_url, error = %e, "Failed to fetch ban list");
                None
            }
        }
    }

    async fn get_player(&self, steam_id_64: &str) -> Option<PlayerProfile> {
        match self.fetch_player(steam_id_64).await {
            Ok(profile) => Some(profile),
            Err(e) => {
                tracing::error!(
                    base_url = %self.base_url,
                    steam_id = steam_id_64,
                    error = %e,
                    "Failed to fetch player profile"
                );
                None
            }
        }
    }

    async fn get_player_comments(&self, steam_id_64: &str) -> Option<Vec<Comment>> {
        match self.fetch_comments(steam_id_64).await {
            Ok(comments) => Some(comments),
            Err(e) => {
                tracing::error!(
                    base_url = %self.base_url,
                    steam_id = steam_id_64,
                    error = %e,
                    "Failed to fetch player comments"
                );
                None
            }
        }
    }

    fn source_name(&self) -> &str {
        "crcon"
    }
}
