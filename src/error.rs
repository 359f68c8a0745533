use thiserror::Error;

/// Errors raised while updating, merging or evaluating a [`crate::metric::Metric`].
#[derive(Debug, Error)]
pub enum MetricError {
    #[error("cannot merge {left} with {right}: incompatible metric kinds")]
    Incompatible { left: &'static str, right: &'static str },

    #[error("metric {0} has no samples to evaluate")]
    Empty(&'static str),

    #[error("weight must be finite and non-negative, got {0}")]
    InvalidWeight(f64),

    #[error("sample must be positive for a geometric/harmonic mean, got {0}")]
    NonPositiveSample(f64),
}

/// Errors raised by the handler layer while dispatching or flushing a snapshot.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("i/o error talking to backend: {0}")]
    Io(#[from] std::io::Error),

    #[error("backend url {0:?} could not be parsed")]
    BadUrl(String),

    #[error("unknown handler backend {0:?}")]
    UnknownBackend(String),

    #[error("handler is backed off until retry, skipping flush")]
    Backoff,

    #[error("value for {name:?} could not be encoded: {reason}")]
    Encode { name: String, reason: String },

    #[error(transparent)]
    Metric(#[from] MetricError),
}

/// Errors raised while parsing a `stats.ini`-style configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {0:?} not found")]
    NotFound(String),

    #[error("failed to read or parse ini file: {0}")]
    Ini(String),

    #[error("handler section {0:?} is missing a backend")]
    MissingBackend(String),

    #[error(transparent)]
    Handler(#[from] HandlerError),
}
