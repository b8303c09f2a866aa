// # banwatchd - Ban Notification Daemon
//
// This daemon is a thin integration layer. All polling, deduplication and
// watermark logic lives in banwatch-core; this binary only:
//
// 1. Reads configuration from the environment (and an optional `.env` file)
// 2. Initializes logging and the runtime
// 3. Builds one API client, webhook sink and watermark store per target
// 4. Runs the targets under a supervisor until SIGTERM/SIGINT
//
// ## Configuration
//
// ### Upstream API
// - `API_BASE_URLS`: Comma-separated base URLs (takes precedence)
// - `API_BASE_URL`: Single base URL when `API_BASE_URLS` is unset
// - `API_TOKEN`: Bearer token
// - `USERNAME`, `PASSWORD`: Login credentials
// - `CHECK_INTERVAL`: Poll interval in seconds (default 60)
//
// ### Notifications
// - `DISCORD_WEBHOOK_URL`: Webhook receiving the messages
// - `LANGUAGE`: Locale code (default `de`)
// - `LANGUAGES_FILE`: Locale table (default `languages.json`)
//
// ### State
// - `LAST_CHECKED_FILE`: Watermark file (default `last_checked.txt`); with
//   several targets each gets its own `<stem>-<target>.<ext>` file
// - `BANWATCH_REQUIRE_DURABLE_WATERMARK`: Withhold a batch whose watermark
//   could not be saved (default `true`)
//
// ### Runtime
// - `BANWATCH_HTTP_TIMEOUT_SECS`: Per-request timeout (default 30)
// - `BANWATCH_LOGIN_MAX_ATTEMPTS`: Logins before a target halts (default 5)
// - `BANWATCH_LOGIN_RETRY_DELAY_SECS`: First login backoff (default 5)
// - `BANWATCH_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Example
//
// ```bash
// export API_BASE_URL=https://rcon.example.org
// export API_TOKEN=...
// export USERNAME=admin PASSWORD=...
// export DISCORD_WEBHOOK_URL=https://discord.com/api/webhooks/...
//
// banwatchd
// ```

use anyhow::{Context, Result};
use banwatch_core::{
    BanNotifier, Credentials, Labels, LocaleTable, LoginRetryConfig, NotifierConfig, StopReason,
    Supervisor, SupervisorReport, WatermarkStoreConfig, target_key,
};
use banwatch_sink_discord::DiscordWebhookSink;
use banwatch_source_crcon::CrconClient;
use std::collections::HashSet;
use std::env;
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Upper bound for the login backoff, whatever the initial delay
const MAX_LOGIN_RETRY_DELAY_SECS: u64 = 300;

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BanwatchExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<BanwatchExitCode> for ExitCode {
    fn from(code: BanwatchExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    targets: Vec<String>,
    api_token: String,
    username: String,
    password: String,
    check_interval_secs: u64,
    language: String,
    webhook_url: String,
    languages_file: String,
    last_checked_file: String,
    http_timeout_secs: u64,
    login_max_attempts: u32,
    login_retry_delay_secs: u64,
    require_durable_watermark: bool,
    log_level: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("targets", &self.targets)
            .field("api_token", &"<REDACTED>")
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .field("check_interval_secs", &self.check_interval_secs)
            .field("language", &self.language)
            .field("webhook_url", &"<REDACTED>")
            .field("languages_file", &self.languages_file)
            .field("last_checked_file", &self.last_checked_file)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("login_max_attempts", &self.login_max_attempts)
            .field("login_retry_delay_secs", &self.login_retry_delay_secs)
            .field("require_durable_watermark", &self.require_durable_watermark)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value lookup
    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string());

        let targets = match var("API_BASE_URLS").filter(|v| !v.is_empty()) {
            Some(list) => split_list(&list),
            None => var("API_BASE_URL")
                .filter(|v| !v.is_empty())
                .into_iter()
                .collect(),
        };

        Ok(Self {
            targets,
            api_token: var("API_TOKEN").unwrap_or_default(),
            username: var("USERNAME").unwrap_or_default(),
            password: lookup("PASSWORD").unwrap_or_default(),
            check_interval_secs: parse_or("CHECK_INTERVAL", var("CHECK_INTERVAL"), 60)?,
            language: var("LANGUAGE").unwrap_or_else(|| "de".to_string()),
            webhook_url: var("DISCORD_WEBHOOK_URL").unwrap_or_default(),
            languages_file: var("LANGUAGES_FILE")
                .unwrap_or_else(|| "languages.json".to_string()),
            last_checked_file: var("LAST_CHECKED_FILE")
                .unwrap_or_else(|| "last_checked.txt".to_string()),
            http_timeout_secs: parse_or(
                "BANWATCH_HTTP_TIMEOUT_SECS",
                var("BANWATCH_HTTP_TIMEOUT_SECS"),
                30,
            )?,
            login_max_attempts: parse_or(
                "BANWATCH_LOGIN_MAX_ATTEMPTS",
                var("BANWATCH_LOGIN_MAX_ATTEMPTS"),
                5,
            )?,
            login_retry_delay_secs: parse_or(
                "BANWATCH_LOGIN_RETRY_DELAY_SECS",
                var("BANWATCH_LOGIN_RETRY_DELAY_SECS"),
                5,
            )?,
            require_durable_watermark: parse_bool(
                "BANWATCH_REQUIRE_DURABLE_WATERMARK",
                var("BANWATCH_REQUIRE_DURABLE_WATERMARK"),
                true,
            )?,
            log_level: var("BANWATCH_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// Everything checked here is fatal: the daemon refuses to start rather
    /// than poll with a half-working setup.
    fn validate(&self) -> Result<()> {
        if self.targets.is_empty() {
            anyhow::bail!(
                "API_BASE_URL (or API_BASE_URLS) is required. \
                Set it via: export API_BASE_URL=https://rcon.example.org"
            );
        }

        let mut keys = HashSet::new();
        for target in &self.targets {
            if !target.starts_with("https://") && !target.starts_with("http://") {
                anyhow::bail!(
                    "API base URL must use HTTP or HTTPS scheme. Got: {}",
                    target
                );
            }
            if !keys.insert(target_key(target)) {
                anyhow::bail!(
                    "API base URL '{}' is listed more than once in API_BASE_URLS",
                    target
                );
            }
        }

        if self.api_token.is_empty() {
            anyhow::bail!(
                "API_TOKEN is required. \
                Set it via: export API_TOKEN=your_token"
            );
        }

        if self.username.is_empty() || self.password.is_empty() {
            anyhow::bail!(
                "USERNAME and PASSWORD are required for the API login. \
                Set them via: export USERNAME=admin PASSWORD=..."
            );
        }

        if self.webhook_url.is_empty() {
            anyhow::bail!(
                "DISCORD_WEBHOOK_URL is required. \
                Create a webhook in the channel settings and export its URL"
            );
        }
        if !self.webhook_url.starts_with("https://") && !self.webhook_url.starts_with("http://")
        {
            anyhow::bail!("DISCORD_WEBHOOK_URL must use HTTP or HTTPS scheme");
        }

        if !(1..=banwatch_core::config::MAX_POLL_INTERVAL_SECS).contains(&self.check_interval_secs)
        {
            anyhow::bail!(
                "CHECK_INTERVAL must be between 1 and {} seconds. Got: {}",
                banwatch_core::config::MAX_POLL_INTERVAL_SECS,
                self.check_interval_secs
            );
        }

        if !(1..=300).contains(&self.http_timeout_secs) {
            anyhow::bail!(
                "BANWATCH_HTTP_TIMEOUT_SECS must be between 1 and 300 seconds. Got: {}",
                self.http_timeout_secs
            );
        }

        if !(1..=100).contains(&self.login_max_attempts) {
            anyhow::bail!(
                "BANWATCH_LOGIN_MAX_ATTEMPTS must be between 1 and 100. Got: {}",
                self.login_max_attempts
            );
        }

        if !(1..=MAX_LOGIN_RETRY_DELAY_SECS).contains(&self.login_retry_delay_secs) {
            anyhow::bail!(
                "BANWATCH_LOGIN_RETRY_DELAY_SECS must be between 1 and {} seconds. Got: {}",
                MAX_LOGIN_RETRY_DELAY_SECS,
                self.login_retry_delay_secs
            );
        }

        if self.last_checked_file.is_empty() {
            anyhow::bail!("LAST_CHECKED_FILE cannot be empty");
        }

        if self.language.is_empty() {
            anyhow::bail!("LANGUAGE cannot be empty. Example: export LANGUAGE=en");
        }

        self.log_level()?;

        Ok(())
    }

    fn log_level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => anyhow::bail!(
                "BANWATCH_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }
    }

    fn login_retry(&self) -> LoginRetryConfig {
        LoginRetryConfig {
            max_attempts: self.login_max_attempts,
            initial_delay_ms: self.login_retry_delay_secs * 1000,
            max_delay_ms: MAX_LOGIN_RETRY_DELAY_SECS * 1000,
        }
    }

    /// Watermark store for one target
    ///
    /// A single target keeps `LAST_CHECKED_FILE` as is, so existing state
    /// files are picked up unchanged.
    fn watermark_store(&self, key: &str) -> WatermarkStoreConfig {
        let store = WatermarkStoreConfig::File {
            path: self.last_checked_file.clone(),
        };
        if self.targets.len() > 1 {
            store.for_target(key)
        } else {
            store
        }
    }

    /// Library configuration for one target
    fn notifier_config(&self, target: &str) -> NotifierConfig {
        NotifierConfig::new(
            target,
            Credentials::new(self.username.clone(), self.password.clone()),
        )
        .with_poll_interval_secs(self.check_interval_secs)
        .with_login_retry(self.login_retry())
        .with_require_durable_watermark(self.require_durable_watermark)
        .with_watermark_store(self.watermark_store(&target_key(target)))
    }
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_or<T>(key: &str, value: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value.filter(|v| !v.is_empty()) {
        Some(v) => v
            .parse()
            .with_context(|| format!("{} must be a number. Got: {}", key, v)),
        None => Ok(default),
    }
}

fn parse_bool(key: &str, value: Option<String>, default: bool) -> Result<bool> {
    match value.filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(v) => match v.to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => anyhow::bail!("{} must be true or false. Got: {}", key, v),
        },
    }
}

fn main() -> ExitCode {
    // A missing .env file is normal; real environment variables win.
    let dotenv_result = dotenvy::dotenv();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return BanwatchExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return BanwatchExitCode::ConfigError.into();
    }

    let log_level = config.log_level().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return BanwatchExitCode::ConfigError.into();
    }

    info!("Starting banwatchd daemon");
    match dotenv_result {
        Ok(path) => info!(path = %path.display(), "Loaded .env file"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!(error = %e, "Ignoring unreadable .env file"),
    }
    info!(
        targets = config.targets.len(),
        interval_secs = config.check_interval_secs,
        language = %config.language,
        "Configuration loaded"
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return BanwatchExitCode::RuntimeError.into();
        }
    };

    let code = rt.block_on(async {
        let supervisor = match build_supervisor(&config).await {
            Ok(supervisor) => supervisor,
            Err(e) => {
                error!("Startup error: {:#}", e);
                return BanwatchExitCode::ConfigError;
            }
        };

        match run_daemon(supervisor).await {
            Ok(report) => {
                log_report(&report);
                BanwatchExitCode::CleanShutdown
            }
            Err(e) => {
                error!("Daemon error: {:#}", e);
                BanwatchExitCode::RuntimeError
            }
        }
    });

    code.into()
}

/// Load the locale and wire one notifier per target
async fn build_supervisor(config: &Config) -> Result<Supervisor> {
    let locales = LocaleTable::load(&config.languages_file)
        .await
        .with_context(|| format!("Cannot load LANGUAGES_FILE '{}'", config.languages_file))?;
    let labels: Labels = locales
        .labels(&config.language)
        .context("Unsupported LANGUAGE")?
        .clone();

    let timeout = Duration::from_secs(config.http_timeout_secs);
    let mut supervisor = Supervisor::new();

    for target in &config.targets {
        let key = target_key(target);
        let notifier_config = config.notifier_config(target);

        let source = CrconClient::with_timeout(target, &config.api_token, timeout)
            .with_context(|| format!("Cannot create API client for target '{}'", key))?;
        let sink = DiscordWebhookSink::with_timeout(config.webhook_url.clone(), timeout)
            .context("Cannot create webhook sink")?;
        let store = notifier_config
            .watermark_store
            .build()
            .await
            .with_context(|| format!("Cannot open watermark store for target '{}'", key))?;

        info!(
            target_key = %key,
            store = %store.location(),
            "Target configured"
        );

        let (notifier, events) = BanNotifier::new(
            notifier_config,
            Box::new(source),
            Box::new(sink),
            store,
            labels.clone(),
        )?;
        supervisor.add(key, notifier, events)?;
    }

    Ok(supervisor)
}

/// Run the supervisor until a shutdown signal or until every target halts
async fn run_daemon(supervisor: Supervisor) -> Result<SupervisorReport> {
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let signals = wait_for_shutdown_signal().await?;

    let signal_task = tokio::spawn(async move {
        let name = signals.await;
        info!("Received shutdown signal: {}", name);
        let _ = shutdown_tx.send(());
    });

    let report = supervisor.run_with_shutdown(Some(shutdown_rx)).await;
    signal_task.abort();

    Ok(report?)
}

/// Install SIGTERM and SIGINT handlers
///
/// Handlers are installed before the returned future is polled, so a signal
/// arriving during startup is not lost.
#[cfg(unix)]
async fn wait_for_shutdown_signal()
-> Result<impl std::future::Future<Output = &'static str> + Send + 'static> {
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;

    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        }
    })
}

/// Fallback for non-Unix platforms: Ctrl-C only
#[cfg(not(unix))]
async fn wait_for_shutdown_signal()
-> Result<impl std::future::Future<Output = &'static str> + Send + 'static> {
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to wait for CTRL-C: {}", e);
            std::future::pending::<()>().await;
        }
        "SIGINT"
    })
}

fn log_report(report: &SupervisorReport) {
    for (key, summary) in &report.targets {
        let watermark = summary
            .watermark
            .map(|w| w.to_string())
            .unwrap_or_else(|| "-".to_string());

        info!(
            target_key = %key,
            delivered = summary.delivered,
            failed = summary.delivery_failed,
            skipped = summary.skipped,
            polls_failed = summary.polls_failed,
            watermark = %watermark,
            "Target summary"
        );

        if summary.stop_reason == Some(StopReason::LoginFailed) {
            warn!(target_key = %key, "Target halted after failed logins");
        }
        if let Some(e) = &summary.error {
            error!(target_key = %key, error = %e, "Target stopped with error");
        }
    }

    if report.aborted > 0 || report.panicked > 0 {
        warn!(
            aborted = report.aborted,
            panicked = report.panicked,
            "Some targets did not stop cleanly"
        );
    }
    info!("Shutting down daemon");
}
