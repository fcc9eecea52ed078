//! Core library for turning a video into a compact set of visually distinct
//! slide images and a time-aligned transcript, rendered as paginated PDFs.

pub mod captions;
pub mod debug;
pub mod document;
pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod sampler;
pub mod similarity;
pub mod video;

pub use error::{CaptionError, Error, Result};
