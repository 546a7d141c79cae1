//! Configuration for the meeting bot.
//!
//! Paths follow one layout under a single state directory:
//!
//! ```text
//! ~/.meetbot/
//! ├── db/           # SQLite database
//! │   └── meetbot.sqlite3
//! └── config/       # User configuration
//!     └── .env.local
//! ```
//!
//! # Environment Variables
//!
//! - `MEETBOT_STATE_DIR`: Override the base state directory
//! - `MEETBOT_CONFIG_DIR`: Override the config directory
//! - `MEETBOT_DB_PATH`: Override the database file
//! - `MEETBOT_EXPORT_BASE_URL`: Base URL of the export service
//! - `MEETBOT_SESSION_IDLE_TIMEOUT_SECS`: Drop dialogs idle this long (unset: never)
//! - `MEETBOT_INVITATION_TTL_HOURS`: Decline invitations unanswered this long (unset: never)
//! - `MEETBOT_MAINTENANCE_INTERVAL_SECS`: Period of the cleanup loop

use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use tracing::warn;
use url::Url;

/// Environment variable for custom state directory.
pub const STATE_DIR_ENV: &str = "MEETBOT_STATE_DIR";

/// Environment variable for custom config directory.
pub const CONFIG_DIR_ENV: &str = "MEETBOT_CONFIG_DIR";

/// Environment variable for a custom database file.
pub const DB_PATH_ENV: &str = "MEETBOT_DB_PATH";

pub const EXPORT_BASE_URL_ENV: &str = "MEETBOT_EXPORT_BASE_URL";
pub const SESSION_IDLE_TIMEOUT_ENV: &str = "MEETBOT_SESSION_IDLE_TIMEOUT_SECS";
pub const INVITATION_TTL_ENV: &str = "MEETBOT_INVITATION_TTL_HOURS";
pub const MAINTENANCE_INTERVAL_ENV: &str = "MEETBOT_MAINTENANCE_INTERVAL_SECS";

/// Default state directory name under home.
const DEFAULT_STATE_DIR: &str = ".meetbot";

const DB_SUBDIR: &str = "db";
const CONFIG_SUBDIR: &str = "config";
const DB_FILE: &str = "meetbot.sqlite3";

pub const DEFAULT_EXPORT_BASE_URL: &str = "http://localhost:8000/";
pub const DEFAULT_MAINTENANCE_INTERVAL: Duration = Duration::from_secs(60);

static STATE_DIR_CACHE: OnceLock<PathBuf> = OnceLock::new();

/// Get the state directory.
///
/// The state directory is determined by:
/// 1. `MEETBOT_STATE_DIR` environment variable if set
/// 2. `~/.meetbot` if home directory is available
/// 3. `.meetbot` in current directory as fallback
pub fn state_dir() -> PathBuf {
    STATE_DIR_CACHE
        .get_or_init(|| {
            std::env::var(STATE_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    dirs::home_dir()
                        .map(|h| h.join(DEFAULT_STATE_DIR))
                        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR))
                })
        })
        .clone()
}

/// Get the user config directory.
///
/// Defaults to `~/.meetbot/config/` or `MEETBOT_CONFIG_DIR` env var.
pub fn config_dir() -> PathBuf {
    std::env::var(CONFIG_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| state_dir().join(CONFIG_SUBDIR))
}

/// Get the database file path.
///
/// Defaults to `~/.meetbot/db/meetbot.sqlite3` or `MEETBOT_DB_PATH` env var.
pub fn db_file() -> PathBuf {
    std::env::var(DB_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| state_dir().join(DB_SUBDIR).join(DB_FILE))
}

/// Get the .env.local file path.
///
/// Environment file for secrets (bot token).
pub fn env_file() -> PathBuf {
    config_dir().join(".env.local")
}

/// Ensure the state directory and its subdirectories exist.
///
/// # Errors
/// Returns an error if any directory cannot be created.
pub fn ensure_all_dirs() -> std::io::Result<()> {
    std::fs::create_dir_all(state_dir().join(DB_SUBDIR))?;
    std::fs::create_dir_all(config_dir())?;
    Ok(())
}

/// Runtime tunables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Base URL export links are built on. Always ends with `/`.
    pub export_base_url: Url,
    /// Dialogs untouched for this long are dropped; `None` keeps them forever.
    pub session_idle_timeout: Option<Duration>,
    /// Invitations unanswered for this long are declined; `None` never expires them.
    pub invitation_ttl: Option<Duration>,
    /// How often the cleanup loop runs when either expiry is enabled.
    pub maintenance_interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            export_base_url: Url::parse(DEFAULT_EXPORT_BASE_URL).expect("default export URL is valid"),
            session_idle_timeout: None,
            invitation_ttl: None,
            maintenance_interval: DEFAULT_MAINTENANCE_INTERVAL,
        }
    }
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`. Invalid values are logged and
    /// replaced by defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let export_base_url = lookup(EXPORT_BASE_URL_ENV)
            .and_then(|raw| parse_base_url(&raw))
            .unwrap_or(defaults.export_base_url);

        let secs = |key: &str| -> Option<u64> {
            let raw = lookup(key)?;
            match raw.trim().parse::<u64>() {
                Ok(0) => None,
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(key = key, value = %raw, error = %e, "Ignoring invalid setting");
                    None
                }
            }
        };

        Self {
            export_base_url,
            session_idle_timeout: secs(SESSION_IDLE_TIMEOUT_ENV).map(Duration::from_secs),
            invitation_ttl: secs(INVITATION_TTL_ENV).map(|hours| Duration::from_secs(hours * 3600)),
            maintenance_interval: secs(MAINTENANCE_INTERVAL_ENV)
                .map(Duration::from_secs)
                .unwrap_or(defaults.maintenance_interval),
        }
    }

    /// Whether the cleanup loop has anything to do.
    pub fn needs_maintenance(&self) -> bool {
        self.session_idle_timeout.is_some() || self.invitation_ttl.is_some()
    }
}

fn parse_base_url(raw: &str) -> Option<Url> {
    let mut normalized = raw.trim().to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    match Url::parse(&normalized) {
        Ok(url) => Some(url),
        Err(e) => {
            warn!(value = %raw, error = %e, "Ignoring invalid export base URL");
            None
        }
    }
}
