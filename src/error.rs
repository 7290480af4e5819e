use thiserror::Error;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Failures surfaced by the request dispatcher.
///
/// `RateLimited` and `ConnectionReset` are transient and retried inside the
/// dispatcher; every other variant reaches the caller as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("rate limited by upstream: {target}")]
    RateLimited { target: String },

    #[error("connection reset: {target}")]
    ConnectionReset { target: String },

    #[error("request timed out: {target}")]
    Timeout { target: String },

    #[error("upstream error from {target}: {message}")]
    Upstream {
        target: String,
        status: Option<u16>,
        message: String,
    },

    #[error("malformed response from {target}: {reason}")]
    Malformed { target: String, reason: String },

    #[error("gave up on {target} after {attempts} attempts: {last}")]
    RetriesExhausted {
        target: String,
        attempts: u32,
        last: Box<DispatchError>,
    },

    #[error("dispatcher closed before {target} completed")]
    Closed { target: String },
}

impl DispatchError {
    /// Whether the dispatcher may retry this failure.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::ConnectionReset { .. })
    }

    /// The request target this failure belongs to.
    #[must_use]
    pub fn target(&self) -> &str {
        match self {
            Self::RateLimited { target }
            | Self::ConnectionReset { target }
            | Self::Timeout { target }
            | Self::Upstream { target, .. }
            | Self::Malformed { target, .. }
            | Self::RetriesExhausted { target, .. }
            | Self::Closed { target } => target,
        }
    }
}

/// Errors from holder reconstruction and winner derivation.
#[derive(Error, Debug)]
pub enum ReconstructError {
    #[error("transfer query failed for blocks {from}..={to}: {source}")]
    Window {
        from: u64,
        to: u64,
        #[source]
        source: DispatchError,
    },

    #[error("failed to read chain head: {0}")]
    Head(#[source] DispatchError),

    #[error("invalid position id '{0}'")]
    InvalidPosition(String),

    #[error("unknown market {0}")]
    UnknownMarket(String),

    #[error("market {market_id} has no outcome labelled '{label}'")]
    UnknownOutcome { market_id: String, label: String },

    #[error("market {market_id} is unresolved or ambiguous: no outcome priced above {threshold}")]
    Ambiguous {
        market_id: String,
        threshold: rust_decimal::Decimal,
    },
}

/// Snapshot persistence errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to access snapshot at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode or decode snapshot: {0}")]
    Json(#[from] serde_json::Error),
}

/// Delivery failure reported by a subscriber; the subscriber is dropped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("subscriber is closed")]
    Closed,

    #[error("subscriber is not keeping up")]
    Lagging,

    #[error("delivery failed: {0}")]
    Failed(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Reconstruct(#[from] ReconstructError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("WebSocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Error::WebSocket(Box::new(err))
    }
}
