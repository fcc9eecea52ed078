pub mod youtube;

use crate::error::CaptionError;

/// A single timed caption entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cue {
    /// Start of the cue, milliseconds from the start of the video.
    pub start_ms: u64,
    /// How long the cue stays on screen.
    pub duration_ms: u64,
    pub text: String,
}

/// Supplies caption cues for a video, ordered by start time as published.
/// The core never re-sorts them.
///
/// Failures are typed and never abort slide extraction; the pipeline falls
/// back to an empty transcript.
pub trait CaptionSource: Send + Sync {
    /// Cues for `video_id` in the preferred `language`.
    fn cues(&self, video_id: &str, language: &str) -> Result<Vec<Cue>, CaptionError>;
}
