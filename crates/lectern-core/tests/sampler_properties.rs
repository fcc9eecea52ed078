//! Property-based tests for the slide sampler.
//!
//! Drives `collect_slides` with arbitrary sequences of a few distinct test
//! patterns and checks the invariants that must hold regardless of what the
//! similarity scorer decides: ordering, stride alignment, the cooldown gap,
//! timestamp arithmetic, and the files left on disk.

use std::path::Path;

use image::{Rgb, RgbImage};
use proptest::prelude::*;
use tempfile::TempDir;

use lectern_core::sampler::{collect_slides, ReferenceUpdate, SamplerConfig, Slide};
use lectern_core::video::frame::Frame;
use lectern_core::video::FrameSource;
use lectern_core::Result;

/// One of three distinct textures, so runs mix similar and dissimilar
/// candidates without depending on exact scores.
fn pattern(kind: u8) -> RgbImage {
    RgbImage::from_fn(128, 72, |x, y| {
        let on = match kind % 3 {
            0 => (x / 8 + y / 8) % 2 == 0,
            1 => (x / 8 + y / 8) % 2 == 1,
            _ => (x / 8) % 2 == 0,
        };
        if on {
            Rgb([255, 255, 255])
        } else {
            Rgb([0, 0, 0])
        }
    })
}

fn frame(n: u32, fps: u32, kind: u8) -> Frame {
    Frame {
        image: pattern(kind),
        frame_number: n,
        timestamp_ms: n as u64 * 1000 / fps as u64,
    }
}

struct ScriptedSource {
    fps: u32,
    frames: std::vec::IntoIter<Frame>,
}

impl FrameSource for ScriptedSource {
    fn nominal_fps(&self) -> u32 {
        self.fps
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        Ok(self.frames.next())
    }
}

fn config(stride: u32, threshold: f64, accepted_only: bool) -> SamplerConfig {
    SamplerConfig {
        stride,
        similarity_threshold: threshold,
        reference_update: if accepted_only {
            ReferenceUpdate::AcceptedOnly
        } else {
            ReferenceUpdate::EveryCandidate
        },
    }
}

fn run_sampler(kinds: &[u8], fps: u32, config: &SamplerConfig, frames_dir: &Path) -> Vec<Slide> {
    let frames = kinds
        .iter()
        .enumerate()
        .map(|(n, kind)| frame(n as u32, fps, *kind))
        .collect::<Vec<_>>();
    let mut source = ScriptedSource {
        fps,
        frames: frames.into_iter(),
    };
    collect_slides(&mut source, config, frames_dir, None).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Accepted slides arrive in order, land on stride candidates, and
    /// consecutive accepts are separated by more than one second of frames.
    #[test]
    fn slides_respect_stride_and_cooldown(
        kinds in prop::collection::vec(0u8..3, 0..60),
        stride in 1u32..5,
        fps in 1u32..40,
        threshold in 0.0f64..=1.0,
        accepted_only in any::<bool>(),
    ) {
        let dir = TempDir::new().unwrap();
        let slides = run_sampler(&kinds, fps, &config(stride, threshold, accepted_only), dir.path());

        for slide in &slides {
            prop_assert_eq!(slide.frame_number % stride, 0);
        }
        for pair in slides.windows(2) {
            prop_assert!(pair[0].frame_number < pair[1].frame_number);
            prop_assert!(pair[1].frame_number - pair[0].frame_number > fps);
        }
    }

    /// The first decoded frame always opens the deck, whatever it shows.
    #[test]
    fn first_frame_opens_the_deck(
        kinds in prop::collection::vec(0u8..3, 1..60),
        stride in 1u32..5,
        fps in 1u32..40,
        accepted_only in any::<bool>(),
    ) {
        let dir = TempDir::new().unwrap();
        let slides = run_sampler(&kinds, fps, &config(stride, 0.8, accepted_only), dir.path());

        prop_assert!(!slides.is_empty());
        prop_assert_eq!(slides[0].frame_number, 0);
        prop_assert_eq!(slides[0].timestamp_seconds, 0);
    }

    /// Timestamps derive from the frame number, and the files on disk match
    /// the slide list one to one, in the same order under a lexical sort.
    #[test]
    fn slide_files_mirror_the_slide_list(
        kinds in prop::collection::vec(0u8..3, 0..60),
        stride in 1u32..5,
        fps in 1u32..40,
        accepted_only in any::<bool>(),
    ) {
        let dir = TempDir::new().unwrap();
        let slides = run_sampler(&kinds, fps, &config(stride, 0.8, accepted_only), dir.path());

        for slide in &slides {
            prop_assert_eq!(slide.timestamp_seconds, (slide.frame_number / fps) as u64);
            prop_assert!(slide.image_path.is_file());
            let expected_name = format!("frame_{:08}.png", slide.frame_number);
            prop_assert_eq!(
                slide.image_path.file_name().and_then(|name| name.to_str()),
                Some(expected_name.as_str())
            );
        }

        let mut on_disk = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect::<Vec<_>>();
        on_disk.sort();
        let listed = slides
            .iter()
            .filter_map(|slide| slide.image_path.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        prop_assert_eq!(on_disk, listed);
    }
}
