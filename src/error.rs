//! Error types for NSFW Sentinel.

/// Top-level error type for the bot.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Classification error: {0}")]
    Classify(#[from] ClassifyError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

/// Configuration-related errors. The only fatal errors in the system, and
/// only at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Per-element markup extraction failures.
///
/// Caught inside the extractor and logged at debug level; a bad element is
/// skipped and the walk continues over the remaining well-formed elements.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Image element has no source attribute")]
    MissingLocator,

    #[error("Image source is not a content URI: {0}")]
    NonContentLocator(String),

    #[error("Malformed element attributes: {0}")]
    Attributes(String),
}

/// Content retrieval errors. Fail a single image's job; siblings in the
/// same message are unaffected.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Content not found: {0}")]
    NotFound(String),

    #[error("Invalid content locator: {0}")]
    InvalidLocator(String),

    #[error("Payload too large: {size} bytes (limit {limit})")]
    TooLarge { size: usize, limit: usize },

    #[error("Transfer failed: {0}")]
    Transport(String),
}

/// Classification errors. Same isolation as [`FetchError`]: the affected
/// image is omitted from the report, nothing else is aborted.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Scorer failed: {0}")]
    Scorer(String),

    #[error("Score {0} is outside [0, 1]")]
    ScoreOutOfRange(f64),
}

/// HTTP-level failures from the homeserver adapter.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Homeserver returned {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid content locator: {0}")]
    InvalidLocator(String),

    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        TransportError::Request(e.to_string())
    }
}

/// Action side-effect errors. Logged, never fatal; one failed action does
/// not abort sibling actions or the overall reply.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Failed to resolve alias {alias}: {reason}")]
    AliasResolution { alias: String, reason: String },

    #[error("Invalid report target: {0}")]
    InvalidTarget(String),
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;
