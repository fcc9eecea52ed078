use std::path::PathBuf;

use ab_glyph::{FontVec, PxScale};
use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_text_mut;
use tracing::{debug, info, warn};

use crate::document::format_timestamp;
use crate::sampler::Verdict;
use crate::video::frame::Frame;

const FONT_PATHS: [&str; 4] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/TTF/DejaVuSansMono.ttf",
    "/System/Library/Fonts/Monaco.ttf",
    "C:\\Windows\\Fonts\\consola.ttf",
];

const TEXT_SCALE: f32 = 28.0;
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const TEXT_LINE_HEIGHT: i32 = 30;

/// Saves every stride candidate annotated with its frame number, timestamp,
/// and sampling verdict. Without a usable font the frames are still saved,
/// just unannotated.
pub struct DebugRenderer {
    font: Option<FontVec>,
    dir: PathBuf,
}

impl DebugRenderer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            font: Self::load_font(),
            dir: dir.into(),
        }
    }

    pub fn save_candidate(&self, frame: &Frame, verdict: Verdict) -> Result<()> {
        let Some(label) = verdict_label(verdict) else {
            return Ok(());
        };

        let mut img = frame.image.clone();
        self.draw_text_overlay(&mut img, frame, &label);

        let path = self.dir.join(format!("frame_{:08}.png", frame.frame_number));
        img.save(&path)
            .with_context(|| format!("failed to save debug frame to {}", path.display()))?;

        debug!(?path, "saved debug frame");
        Ok(())
    }

    fn draw_text_overlay(&self, img: &mut RgbImage, frame: &Frame, label: &str) {
        let Some(font) = &self.font else { return };
        let scale = PxScale::from(TEXT_SCALE);
        let x = 10;
        let mut y = 10;

        let header = format!("F:{}", frame.frame_number);
        draw_text_mut(img, TEXT_COLOR, x, y, scale, font, &header);
        y += TEXT_LINE_HEIGHT;

        let time = format!("T:{}", format_timestamp(frame.timestamp_ms / 1000));
        draw_text_mut(img, TEXT_COLOR, x, y, scale, font, &time);
        y += TEXT_LINE_HEIGHT;

        draw_text_mut(img, TEXT_COLOR, x, y, scale, font, label);
    }

    fn load_font() -> Option<FontVec> {
        for path in FONT_PATHS {
            let Ok(data) = std::fs::read(path) else {
                continue;
            };
            match FontVec::try_from_vec(data) {
                Ok(font) => {
                    info!(path, "loaded debug font");
                    return Some(font);
                }
                Err(e) => warn!(path, error = %e, "failed to parse font file"),
            }
        }
        warn!("no monospace font found, debug frames will be saved without annotations");
        None
    }
}

/// Overlay text for a verdict, or `None` for frames that were not stride
/// candidates.
fn verdict_label(verdict: Verdict) -> Option<String> {
    match verdict {
        Verdict::Skipped => None,
        Verdict::FirstSlide => Some("first slide".to_string()),
        Verdict::NewSlide { similarity } => Some(format!("SSIM:{similarity:.3} new slide")),
        Verdict::TooSimilar { similarity } => Some(format!("SSIM:{similarity:.3} too similar")),
        Verdict::CoolingDown { similarity } => Some(format!("SSIM:{similarity:.3} cooling down")),
    }
}
