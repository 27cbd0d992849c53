//! Error type shared by every stage of the codec.
//!
//! Expected "nothing hidden here" outcomes are not errors: per-frame channel
//! misses are reported through [`crate::frame::FrameRead`] and the final
//! decode result through [`crate::orchestrator::Recovery`].

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StegoError {
    #[error("Message cannot be empty")]
    EmptyMessage,

    #[error("Video contains no frames")]
    NoFrames,

    #[error("Video has {found} frames, limit is {limit}")]
    TooManyFrames { found: usize, limit: usize },

    #[error("Payload needs {needed} bits but the frame holds {available}")]
    CapacityExceeded { needed: usize, available: usize },

    #[error("Frame {width}x{height} is smaller than the {min}x{min} border layout")]
    FrameTooSmall { width: u32, height: u32, min: u32 },

    #[error("Encryption failed")]
    Encryption,

    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Invalid key material: {0}")]
    KeyMaterial(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Media tool error: {0}")]
    Media(String),

    #[error("File operation error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Configuration parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StegoError {
    /// Whether the caller supplied bad input (as opposed to an internal failure).
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            StegoError::EmptyMessage
                | StegoError::NoFrames
                | StegoError::TooManyFrames { .. }
                | StegoError::CapacityExceeded { .. }
                | StegoError::FrameTooSmall { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, StegoError>;
