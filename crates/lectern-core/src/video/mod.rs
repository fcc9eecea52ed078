pub mod decoder;
pub mod frame;

use crate::error::Result;

use frame::Frame;

/// Sequential access to a video's frames in display order.
///
/// Implementations must yield every decoded frame exactly once, in order,
/// and report end-of-stream as `Ok(None)`. The nominal frame rate is read
/// once per run and held constant, so it must not change mid-stream.
pub trait FrameSource {
    /// Nominal frames per second, always at least 1.
    fn nominal_fps(&self) -> u32;

    /// The next frame, or `None` once the stream is exhausted.
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}
