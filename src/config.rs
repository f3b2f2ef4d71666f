//! Configuration types and loading.
//!
//! Loaded once at startup from a TOML file and shared read-only by all
//! concurrent handlers via `Arc<Config>`; nothing in the core mutates it.

use std::path::Path;

use secrecy::SecretString;
use serde::Deserialize;

use crate::error::ConfigError;

/// Default for `max_concurrent_jobs` — the classifier is assumed to be
/// resource-constrained, so classification is serialized unless the
/// operator raises the limit.
const DEFAULT_MAX_CONCURRENT_JOBS: usize = 1;

/// Default cap on downloaded image payloads (10 MiB).
const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Bot configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Maximum classification calls in flight at once.
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,
    /// Routing hints appended to message permalinks.
    #[serde(default)]
    pub via_servers: Vec<String>,
    /// What to do with each classification result.
    #[serde(default)]
    pub actions: ActionConfig,
    /// Homeserver connection settings.
    pub homeserver: HomeserverConfig,
    /// Scoring endpoint settings.
    pub classifier: ClassifierConfig,
}

/// Per-outcome action switches. Actions are not mutually exclusive.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionConfig {
    /// Stay silent about images classified SFW.
    #[serde(default)]
    pub ignore_sfw: bool,
    /// Redact the originating message when an image is NSFW.
    #[serde(default)]
    pub redact_nsfw: bool,
    /// Reply with the report in the room of origin.
    #[serde(default)]
    pub direct_reply: bool,
    /// Room ID (`!...`) or alias (`#...`) to send NSFW reports to.
    #[serde(default)]
    pub report_to_room: Option<String>,
}

/// Homeserver connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct HomeserverConfig {
    /// Client-server API base URL, e.g. `https://matrix.example.org`.
    pub base_url: String,
    /// Access token for the bot account.
    pub access_token: SecretString,
    /// The bot's own user ID; its messages are never moderated.
    pub user_id: String,
}

/// Scoring endpoint settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    /// URL that accepts raw image bytes and returns `{"score": <f64>}`.
    pub endpoint: String,
    /// Downloads larger than this fail the image's job.
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
}

fn default_max_concurrent_jobs() -> usize {
    DEFAULT_MAX_CONCURRENT_JOBS
}

fn default_max_image_bytes() -> usize {
    DEFAULT_MAX_IMAGE_BYTES
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: DEFAULT_MAX_CONCURRENT_JOBS,
            via_servers: Vec::new(),
            actions: ActionConfig::default(),
            homeserver: HomeserverConfig::default(),
            classifier: ClassifierConfig::default(),
        }
    }
}

impl Default for HomeserverConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8008".to_string(),
            access_token: SecretString::from(""),
            user_id: String::new(),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:5000/classify".to_string(),
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}

impl Config {
    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_jobs < 1 {
            return Err(ConfigError::InvalidValue {
                key: "max_concurrent_jobs".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.homeserver.base_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "homeserver.base_url".into(),
                message: "must not be empty".into(),
            });
        }
        if self.classifier.endpoint.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "classifier.endpoint".into(),
                message: "must not be empty".into(),
            });
        }
        if let Some(target) = &self.actions.report_to_room {
            if !target.starts_with('#') && !target.starts_with('!') {
                return Err(ConfigError::InvalidValue {
                    key: "actions.report_to_room".into(),
                    message: format!("'{target}' is neither a room ID nor an alias"),
                });
            }
        }
        Ok(())
    }
}
