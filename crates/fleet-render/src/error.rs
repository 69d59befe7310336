//! Error types for the render layer

use thiserror::Error;

/// Errors raised while bringing up or driving a map surface
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("Map surface is not ready")]
    SurfaceUnavailable,

    #[error("No map access credential configured")]
    MissingCredential,

    #[error("Map initialization failed: {0}")]
    InitializationFailed(String),
}

impl RenderError {
    pub fn initialization_failed(msg: impl Into<String>) -> Self {
        Self::InitializationFailed(msg.into())
    }

    /// Whether a new credential could fix this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::MissingCredential | Self::InitializationFailed(_))
    }
}

pub type RenderResult<T> = Result<T, RenderError>;
