use image::RgbImage;

/// A single decoded video frame with metadata.
pub struct Frame {
    /// The frame's image data.
    pub image: RgbImage,
    /// Absolute frame number from the start of the source (0-based).
    pub frame_number: u32,
    /// Elapsed milliseconds from the start of the source, derived from the
    /// nominal frame rate.
    pub timestamp_ms: u64,
}
