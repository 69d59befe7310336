//! Telemetry channel error types

use fleet_core::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Undecodable telemetry frame: {0}")]
    Decode(#[from] CoreError),

    #[error("Invalid telemetry URL: {0}")]
    InvalidUrl(String),

    #[error("Event receiver dropped")]
    ReceiverDropped,
}

pub type ChannelResult<T> = Result<T, ChannelError>;
