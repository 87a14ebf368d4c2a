//! Configuration management for QQMusic-Oxide

use crate::engine::{RetryPolicy, WaitCondition};
use crate::session::BrowserOptions;
use crate::{Error, Result};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Engine configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Portal root URL
    pub base_url: String,

    /// Persistent browser profile directory (cookies survive restarts)
    pub profile_dir: PathBuf,

    /// Chrome executable path
    pub chrome_path: Option<String>,

    /// Launch without a visible window
    pub headless: bool,

    /// Remote debugging port for the launched browser
    pub debug_port: u16,

    /// Viewport width
    pub window_width: u32,

    /// Viewport height
    pub window_height: u32,

    /// Default per-element wait in milliseconds
    pub default_timeout_ms: u64,

    /// Navigation wait in milliseconds
    pub navigation_timeout_ms: u64,

    /// Reload wait used by recovery in milliseconds
    pub reload_timeout_ms: u64,

    /// Attempts per retryable operation
    pub max_attempts: u32,

    /// Pause between retry attempts in milliseconds
    pub retry_pause_ms: u64,

    /// Pause after navigation before reading the page, in milliseconds
    pub settle_delay_ms: u64,

    /// Total login confirmation wait in seconds
    pub login_wait_secs: u64,

    /// Login poll interval in seconds
    pub login_poll_secs: u64,

    /// Reload the page every N seconds while waiting for login
    pub login_recovery_secs: Option<u64>,

    /// Append-only debug log
    pub debug_log_path: Option<PathBuf>,

    /// Screenshot output directory
    pub screenshot_dir: Option<PathBuf>,

    /// Log level
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://y.qq.com".to_string(),
            profile_dir: PathBuf::from("browser_data"),
            chrome_path: None,
            headless: false,
            debug_port: 9222,
            window_width: 1280,
            window_height: 800,
            default_timeout_ms: 10_000,
            navigation_timeout_ms: 60_000,
            reload_timeout_ms: 60_000,
            max_attempts: 3,
            retry_pause_ms: 2_000,
            settle_delay_ms: 3_000,
            login_wait_secs: 180,
            login_poll_secs: 5,
            login_recovery_secs: Some(60),
            debug_log_path: None,
            screenshot_dir: None,
            log_level: "info".to_string(),
        }
    }
}

fn parse_var<T: FromStr>(name: &str, value: String) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::configuration(format!("Invalid {}", name)))
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(base_url) = env::var("QQMUSIC_BASE_URL") {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }

        if let Ok(dir) = env::var("QQMUSIC_PROFILE_DIR") {
            config.profile_dir = PathBuf::from(dir);
        }

        if let Ok(chrome_path) = env::var("QQMUSIC_CHROME_PATH") {
            config.chrome_path = Some(chrome_path);
        }

        if let Ok(headless) = env::var("QQMUSIC_HEADLESS") {
            config.headless = parse_var("QQMUSIC_HEADLESS", headless)?;
        }

        if let Ok(port) = env::var("QQMUSIC_DEBUG_PORT") {
            config.debug_port = parse_var("QQMUSIC_DEBUG_PORT", port)?;
        }

        if let Ok(width) = env::var("QQMUSIC_WINDOW_WIDTH") {
            config.window_width = parse_var("QQMUSIC_WINDOW_WIDTH", width)?;
        }

        if let Ok(height) = env::var("QQMUSIC_WINDOW_HEIGHT") {
            config.window_height = parse_var("QQMUSIC_WINDOW_HEIGHT", height)?;
        }

        if let Ok(timeout) = env::var("QQMUSIC_DEFAULT_TIMEOUT") {
            config.default_timeout_ms = parse_var("QQMUSIC_DEFAULT_TIMEOUT", timeout)?;
        }

        if let Ok(timeout) = env::var("QQMUSIC_NAVIGATION_TIMEOUT") {
            config.navigation_timeout_ms = parse_var("QQMUSIC_NAVIGATION_TIMEOUT", timeout)?;
        }

        if let Ok(timeout) = env::var("QQMUSIC_RELOAD_TIMEOUT") {
            config.reload_timeout_ms = parse_var("QQMUSIC_RELOAD_TIMEOUT", timeout)?;
        }

        if let Ok(attempts) = env::var("QQMUSIC_MAX_ATTEMPTS") {
            config.max_attempts = parse_var("QQMUSIC_MAX_ATTEMPTS", attempts)?;
        }

        if let Ok(pause) = env::var("QQMUSIC_RETRY_PAUSE") {
            config.retry_pause_ms = parse_var("QQMUSIC_RETRY_PAUSE", pause)?;
        }

        if let Ok(delay) = env::var("QQMUSIC_SETTLE_DELAY") {
            config.settle_delay_ms = parse_var("QQMUSIC_SETTLE_DELAY", delay)?;
        }

        if let Ok(wait) = env::var("QQMUSIC_LOGIN_WAIT") {
            config.login_wait_secs = parse_var("QQMUSIC_LOGIN_WAIT", wait)?;
        }

        if let Ok(poll) = env::var("QQMUSIC_LOGIN_POLL") {
            config.login_poll_secs = parse_var("QQMUSIC_LOGIN_POLL", poll)?;
        }

        if let Ok(recovery) = env::var("QQMUSIC_LOGIN_RECOVERY") {
            let secs: u64 = parse_var("QQMUSIC_LOGIN_RECOVERY", recovery)?;
            config.login_recovery_secs = (secs > 0).then_some(secs);
        }

        if let Ok(path) = env::var("QQMUSIC_DEBUG_LOG") {
            config.debug_log_path = Some(PathBuf::from(path));
        }

        if let Ok(dir) = env::var("QQMUSIC_SCREENSHOT_DIR") {
            config.screenshot_dir = Some(PathBuf::from(dir));
        }

        if let Ok(log_level) = env::var("QQMUSIC_LOG_LEVEL") {
            config.log_level = log_level;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::configuration(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::configuration(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::configuration("max_attempts must be at least 1"));
        }
        if self.login_poll_secs == 0 {
            return Err(Error::configuration("login_poll_secs must be at least 1"));
        }
        Ok(())
    }

    /// Options used to launch the browser
    pub fn browser_options(&self) -> BrowserOptions {
        BrowserOptions {
            profile_dir: self.profile_dir.clone(),
            headless: self.headless,
            window_width: self.window_width,
            window_height: self.window_height,
            executable_path: self.chrome_path.clone(),
            debug_port: self.debug_port,
            default_timeout_ms: self.default_timeout_ms,
            ..Default::default()
        }
    }

    /// Retry policy for page operations
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            reload_timeout: Duration::from_millis(self.reload_timeout_ms),
            pause: Duration::from_millis(self.retry_pause_ms),
        }
    }

    /// Wait condition for login confirmation
    pub fn login_wait(&self) -> WaitCondition {
        let condition = WaitCondition::new(
            Duration::from_secs(self.login_wait_secs),
            Duration::from_secs(self.login_poll_secs),
        )
        .with_reload_timeout(Duration::from_millis(self.reload_timeout_ms));
        match self.login_recovery_secs {
            Some(secs) => condition.with_recovery_every(Duration::from_secs(secs)),
            None => condition,
        }
    }
}
