//! Error types for the audio link monitor

use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum Error {
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Metrics error: {0}")]
    Metrics(#[from] MetricsError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Audio subsystem errors
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to open stream: {0}")]
    StreamError(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Capture stopped")]
    CaptureStopped,
}

/// Network errors
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Socket bind failed: {0}")]
    BindFailed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    #[error("Packet too large: {0} bytes")]
    PacketTooLarge(usize),

    #[error("Invalid packet format: {0} bytes, need at least 2")]
    InvalidPacket(usize),
}

/// Metrics log errors
#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Log write failed: {0}")]
    Write(#[from] std::io::Error),

    #[error("Missing or wrong header: {0:?}")]
    BadHeader(String),

    #[error("Malformed row {line}: {reason}")]
    BadRow { line: usize, reason: String },
}

impl From<cpal::DefaultStreamConfigError> for AudioError {
    fn from(e: cpal::DefaultStreamConfigError) -> Self {
        AudioError::UnsupportedFormat(e.to_string())
    }
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;
