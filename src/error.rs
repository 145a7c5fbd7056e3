use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EditError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("Failed to decode image: {0}")]
    ImageDecode(#[source] image::ImageError),

    #[error("Unsupported image dimensions {width}x{height}: {reason}")]
    UnsupportedDimensions {
        width: u32,
        height: u32,
        reason: String,
    },

    #[error("Failed to load pipeline {model} with LoRA {lora}: {reason}")]
    PipelineLoad {
        model: String,
        lora: String,
        reason: String,
    },

    #[error("Inference error: {0}")]
    Inference(String),

    /// The pipeline returned an image whose size differs from the requested one.
    #[error(
        "Pipeline output shape mismatch: expected {}x{}, got {}x{}",
        .expected.0, .expected.1, .actual.0, .actual.1
    )]
    ShapeMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("Storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to save image to {path}: {source}")]
    ImageSave {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl EditError {
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        EditError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error was caused by the caller's input rather than by the
    /// pipeline or the filesystem.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            EditError::InvalidParameter { .. }
                | EditError::ImageDecode(_)
                | EditError::UnsupportedDimensions { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, EditError>;
