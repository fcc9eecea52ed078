use std::path::{Path, PathBuf};

use image::GrayImage;
use tracing::{debug, info, warn};

use crate::debug::DebugRenderer;
use crate::error::{Error, Result};
use crate::similarity;
use crate::video::frame::Frame;
use crate::video::FrameSource;

/// When the sampler moves its comparison reference.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReferenceUpdate {
    /// The reference follows every stride candidate, accepted or not.
    #[default]
    EveryCandidate,
    /// The reference only ever points at the last accepted slide.
    AcceptedOnly,
}

/// Parameters for slide sampling.
#[derive(Clone, Debug)]
pub struct SamplerConfig {
    /// Evaluate every Nth decoded frame as a slide candidate (1 = every frame).
    pub stride: u32,
    /// SSIM score below which a candidate counts as new content.
    pub similarity_threshold: f64,
    /// When the comparison reference moves to the latest candidate.
    pub reference_update: ReferenceUpdate,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            stride: 3,
            similarity_threshold: 0.8,
            reference_update: ReferenceUpdate::EveryCandidate,
        }
    }
}

/// A kept frame: one visually distinct moment of the source video.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Slide {
    /// Sequence index of the accepted frame.
    pub frame_number: u32,
    /// Whole seconds from the start of the video (frame_number / fps).
    pub timestamp_seconds: u64,
    /// PNG written at accept time. The filename encodes the frame number so
    /// a lexical sort reproduces sequence order, but ordering is always taken
    /// from the slide list itself, never from directory listings.
    pub image_path: PathBuf,
}

/// Per-candidate decision, with the similarity score where one was computed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Verdict {
    /// Not a stride candidate.
    Skipped,
    /// First stride candidate, accepted unconditionally.
    FirstSlide,
    /// Accepted as new content.
    NewSlide { similarity: f64 },
    /// At or above the similarity threshold.
    TooSimilar { similarity: f64 },
    /// Below the threshold but within the cooldown window.
    CoolingDown { similarity: f64 },
}

struct Reference {
    thumb: GrayImage,
    last_accepted: u32,
}

/// The frame-deduplication state machine.
///
/// Feed decoded frames in sequence order through [`SlideSampler::observe`],
/// then take the accepted slides with [`SlideSampler::into_slides`]. Accepted
/// frames are persisted to the frames directory as they are kept.
pub struct SlideSampler {
    config: SamplerConfig,
    fps: u32,
    frames_dir: PathBuf,
    reference: Option<Reference>,
    slides: Vec<Slide>,
}

impl SlideSampler {
    /// `fps` is the source's nominal rate. It doubles as the cooldown: at
    /// most one accept per nominal second of video.
    pub fn new(config: SamplerConfig, fps: u32, frames_dir: impl Into<PathBuf>) -> Self {
        assert!(config.stride >= 1, "stride must be >= 1");
        assert!(fps >= 1, "fps must be >= 1");
        Self {
            config,
            fps,
            frames_dir: frames_dir.into(),
            reference: None,
            slides: Vec::new(),
        }
    }

    /// Judge one decoded frame. Frames must arrive in sequence order.
    pub fn observe(&mut self, frame: &Frame) -> Result<Verdict> {
        if frame.frame_number % self.config.stride != 0 {
            return Ok(Verdict::Skipped);
        }

        let thumb = similarity::thumbnail(&frame.image);

        let (score, cooled_down) = match &self.reference {
            None => {
                self.accept(frame, thumb)?;
                return Ok(Verdict::FirstSlide);
            }
            Some(reference) => (
                similarity::ssim(&thumb, &reference.thumb),
                frame.frame_number - reference.last_accepted > self.fps,
            ),
        };

        if score < self.config.similarity_threshold && cooled_down {
            self.accept(frame, thumb)?;
            return Ok(Verdict::NewSlide { similarity: score });
        }

        if self.config.reference_update == ReferenceUpdate::EveryCandidate {
            if let Some(reference) = self.reference.as_mut() {
                reference.thumb = thumb;
            }
        }

        if score >= self.config.similarity_threshold {
            Ok(Verdict::TooSimilar { similarity: score })
        } else {
            Ok(Verdict::CoolingDown { similarity: score })
        }
    }

    /// Finalize and return the accepted slides in sequence order.
    pub fn into_slides(self) -> Vec<Slide> {
        self.slides
    }

    fn accept(&mut self, frame: &Frame, thumb: GrayImage) -> Result<()> {
        let path = self
            .frames_dir
            .join(format!("frame_{:08}.png", frame.frame_number));
        frame.image.save(&path).map_err(|source| Error::Persistence {
            frame_number: frame.frame_number,
            path: path.clone(),
            source,
        })?;

        let timestamp_seconds = (frame.frame_number / self.fps) as u64;
        debug!(
            frame_number = frame.frame_number,
            timestamp_seconds,
            ?path,
            "slide accepted"
        );

        self.slides.push(Slide {
            frame_number: frame.frame_number,
            timestamp_seconds,
            image_path: path,
        });
        self.reference = Some(Reference {
            thumb,
            last_accepted: frame.frame_number,
        });
        Ok(())
    }
}

/// Walk a frame source to exhaustion and return the accepted slides.
///
/// The nominal frame rate is read once up front and held constant for the
/// run. Every stride candidate is also handed to the debug renderer when one
/// is present; debug failures warn and never abort sampling.
pub fn collect_slides(
    source: &mut dyn FrameSource,
    config: &SamplerConfig,
    frames_dir: &Path,
    debug_renderer: Option<&DebugRenderer>,
) -> Result<Vec<Slide>> {
    let fps = source.nominal_fps();
    let mut sampler = SlideSampler::new(config.clone(), fps, frames_dir);

    info!(
        fps,
        stride = config.stride,
        threshold = config.similarity_threshold,
        reference_update = ?config.reference_update,
        "slide sampling starting"
    );

    while let Some(frame) = source.next_frame()? {
        let verdict = sampler.observe(&frame)?;
        match verdict {
            Verdict::Skipped => continue,
            Verdict::FirstSlide => {
                info!(frame_number = frame.frame_number, "first slide accepted");
            }
            Verdict::NewSlide { similarity } => {
                info!(frame_number = frame.frame_number, similarity, "new slide accepted");
            }
            Verdict::TooSimilar { similarity } => {
                debug!(frame_number = frame.frame_number, similarity, "candidate too similar");
            }
            Verdict::CoolingDown { similarity } => {
                debug!(frame_number = frame.frame_number, similarity, "candidate within cooldown");
            }
        }

        if let Some(renderer) = debug_renderer {
            if let Err(e) = renderer.save_candidate(&frame, verdict) {
                warn!(frame_number = frame.frame_number, error = %e, "failed to save debug frame");
            }
        }
    }

    let slides = sampler.into_slides();
    info!(slide_count = slides.len(), "slide sampling complete");
    Ok(slides)
}
