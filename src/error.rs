//! Error types for the command and configuration boundaries

use thiserror::Error;

/// A front-end command that cannot be applied
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("speed {0} must be between 0.1 and 10.0")]
    SpeedOutOfRange(f32),
    #[error("unknown power-up type: {0}")]
    UnknownPowerUp(String),
    #[error("canvas size {width}x{height} must be positive and finite")]
    InvalidDimensions { width: f32, height: f32 },
    #[error("point coordinates must be finite")]
    NonFinitePoint,
    #[error("malformed command: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Failure reading a settings file
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid settings JSON: {0}")]
    Json(#[from] serde_json::Error),
}
