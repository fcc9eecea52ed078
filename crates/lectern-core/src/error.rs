use std::path::PathBuf;

use thiserror::Error;

/// Fatal per-video errors. A batch reports these per item and keeps going;
/// none of them aborts sibling videos.
#[derive(Debug, Error)]
pub enum Error {
    /// The input could not be resolved to a decodable video.
    #[error("invalid video source `{input}`: {reason}")]
    InvalidSource { input: String, reason: String },

    /// An accepted frame's image could not be written to the working area.
    #[error("failed to persist frame {frame_number} to {}: {source}", .path.display())]
    Persistence {
        frame_number: u32,
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// A document could not be assembled or written.
    #[error("failed to write document {}: {reason}", .path.display())]
    Document { path: PathBuf, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn invalid_source(input: impl Into<String>, reason: impl ToString) -> Self {
        Error::InvalidSource {
            input: input.into(),
            reason: reason.to_string(),
        }
    }

    pub fn document(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::Document {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Caption retrieval failures. Never fatal: slide extraction proceeds and the
/// transcript document is generated with empty bucket text.
#[derive(Debug, Error)]
pub enum CaptionError {
    #[error("video has no caption tracks")]
    NoCaptions,

    #[error("no caption track for language `{0}`")]
    LanguageUnavailable(String),

    #[error("caption request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("caption payload malformed: {0}")]
    Malformed(String),
}
