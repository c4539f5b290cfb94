//! Error types shared by capture, storage and replay

use crate::device::DeviceError;
use thiserror::Error;

/// Errors that can occur while recording, storing or replaying macros
#[derive(Error, Debug)]
pub enum MacroError {
    #[error("Invalid macro name: {0:?}")]
    InvalidName(String),

    #[error("Macro has no events")]
    EmptySequence,

    #[error("Macro not found")]
    NotFound(String),

    #[error("Invalid playback speed: {0}")]
    InvalidSpeed(f64),

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MacroError {
    /// True for errors caused by the caller's input rather than the system.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            MacroError::InvalidName(_)
                | MacroError::EmptySequence
                | MacroError::NotFound(_)
                | MacroError::InvalidSpeed(_)
        )
    }
}

/// Result type for macro operations
pub type MacroResult<T> = Result<T, MacroError>;
