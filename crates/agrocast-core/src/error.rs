//! Error types shared by every Agrocast crate.
//!
//! Upstream failures are classified per source and never abort a round on
//! their own. Each type can say what to show the user via `user_message()`;
//! the `Display` form keeps the detail for logs.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("network: {0}")]
    Network(#[from] NetworkError),

    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("source: {0}")]
    Source(#[from] SourceError),

    /// Geolocation produced no coordinate; nothing was fetched or served.
    #[error("no coordinate: {0}")]
    NoCoordinate(String),

    /// The round produced nothing worth showing.
    #[error("every weather source failed")]
    AllSourcesFailed,

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Network(e) => e.user_message(),
            Self::Config(e) => e.user_message(),
            Self::Source(e) => e.user_message(),
            Self::NoCoordinate(_) => {
                "Location unavailable. Allow location access or set latitude and longitude in config.toml."
            }
            Self::AllSourcesFailed => "No weather data could be fetched. Try again in a few minutes.",
            Self::Io(_) => "Could not read or write local data.",
            Self::Other(_) => "Something went wrong.",
        }
    }
}

/// How an HTTP exchange failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("could not connect: {0}")]
    Unreachable(String),

    #[error("timed out")]
    Timeout,

    #[error("HTTP {code}: {detail}")]
    Status { code: u16, detail: String },

    #[error("unreadable body: {0}")]
    BadBody(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Unreachable(_) => "No connection to the weather service. Check your network.",
            Self::Timeout => "The weather service took too long to answer.",
            Self::Status { code, .. } if *code >= 500 => "The weather service is having trouble.",
            Self::Status { .. } => "The weather service refused the request.",
            Self::BadBody(_) => "The weather service sent something unexpected.",
        }
    }
}

/// Why a single upstream source produced no usable value.
///
/// These never abort an aggregation round on their own.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("{name} unavailable: {error}")]
    Unavailable { name: String, error: NetworkError },

    #[error("{name} returned a malformed payload: {message}")]
    MalformedPayload { name: String, message: String },

    #[error("{name} returned nothing usable")]
    Empty { name: String },
}

impl SourceError {
    pub fn unavailable(name: impl Into<String>, error: NetworkError) -> Self {
        Self::Unavailable {
            name: name.into(),
            error,
        }
    }

    pub fn malformed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedPayload {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn empty(name: impl Into<String>) -> Self {
        Self::Empty { name: name.into() }
    }

    /// Name of the source this error belongs to.
    pub fn source_name(&self) -> &str {
        match self {
            Self::Unavailable { name, .. }
            | Self::MalformedPayload { name, .. }
            | Self::Empty { name } => name,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Unavailable { error, .. } => error.user_message(),
            Self::MalformedPayload { .. } => "Some data could not be read and was skipped.",
            Self::Empty { .. } => "Some data is not available right now.",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    /// Validation found at least one error-level issue
    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("no per-user config directory on this platform")]
    NoConfigDir,
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Invalid(_) => "config.toml has invalid settings; see the log for details.",
            Self::NoConfigDir => "Could not locate a folder for config.toml.",
        }
    }
}

/// Classify a reqwest failure.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            return NetworkError::Timeout;
        }
        if let Some(status) = self.status() {
            return NetworkError::Status {
                code: status.as_u16(),
                detail: self.to_string(),
            };
        }
        if self.is_decode() || self.is_body() {
            return NetworkError::BadBody(self.to_string());
        }
        NetworkError::Unreachable(self.to_string())
    }
}
