use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MrzError {
    #[error("Failed to load image {path:?}: {reason}")]
    Load { path: PathBuf, reason: String },

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Recognition engine init error: {0}")]
    EngineInit(String),

    #[error("Recognition error: {0}")]
    Recognition(String),

    #[error("Recognition did not finish within {0:?}")]
    RecognitionTimeout(Duration),

    #[error("Recognition engine is no longer running")]
    EngineUnavailable,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MrzError {
    pub fn load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        MrzError::Load {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// True when the document itself could not be read, as opposed to a
    /// failure inside the recognition engine.
    pub fn is_load_error(&self) -> bool {
        matches!(self, MrzError::Load { .. })
    }
}

pub type Result<T> = std::result::Result<T, MrzError>;
