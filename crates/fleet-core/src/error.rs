//! Error types for the drone fleet monitor

use thiserror::Error;

/// Core error type for report validation and decoding
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Report is missing a registration")]
    MissingRegistration,

    #[error("Report for {registration} is missing a position")]
    MissingPosition { registration: String },

    #[error("Invalid position for {registration}: longitude={lng}, latitude={lat}")]
    InvalidPosition {
        registration: String,
        lng: f64,
        lat: f64,
    },

    #[error("Telemetry message carries no features")]
    EmptyMessage,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl CoreError {
    pub fn missing_position(registration: impl Into<String>) -> Self {
        Self::MissingPosition {
            registration: registration.into(),
        }
    }

    pub fn invalid_position(registration: impl Into<String>, lng: f64, lat: f64) -> Self {
        Self::InvalidPosition {
            registration: registration.into(),
            lng,
            lat,
        }
    }

    /// True for errors raised by a malformed report rather than by decoding
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingRegistration | Self::MissingPosition { .. } | Self::InvalidPosition { .. }
        )
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
