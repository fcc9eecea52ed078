use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{info, warn};

use crate::captions::{CaptionSource, Cue};
use crate::debug::DebugRenderer;
use crate::document::{bucket_cues, DocumentAssembler};
use crate::error::{Error, Result};
use crate::fetch;
use crate::sampler::{collect_slides, SamplerConfig};
use crate::video::decoder::FfmpegFrameSource;

/// Parameters for the extraction pipeline.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Sampling parameters.
    pub sampler: SamplerConfig,
    /// Preferred caption language code.
    pub language: String,
    /// Directory the output documents are written to.
    pub output_dir: PathBuf,
    /// Directory to write annotated candidate frames, or None to skip.
    pub debug_frames_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sampler: SamplerConfig::default(),
            language: "en".to_string(),
            output_dir: PathBuf::from("output"),
            debug_frames_dir: None,
        }
    }
}

/// What one processed video produced.
#[derive(Clone, Debug)]
pub struct VideoOutput {
    /// Stem used for the output document filenames.
    pub label: String,
    /// Number of slides kept.
    pub slide_count: usize,
    /// Slide image document, or None when no slides were kept.
    pub slides_pdf: Option<PathBuf>,
    /// Transcript document, or None when no slides were kept.
    pub transcript_pdf: Option<PathBuf>,
}

/// One input's outcome in a batch run.
#[derive(Debug)]
pub struct BatchItem {
    pub input: String,
    pub outcome: Result<VideoOutput>,
}

/// Run the full pipeline for one input: fetch, decode, sample, bucket, and
/// assemble the two documents.
///
/// Intermediate artifacts (the downloaded video, accepted frame images) live
/// in a per-video temporary directory that is removed on every exit path.
/// Caption failures are logged and degrade to empty transcripts; a video
/// yielding zero slides succeeds with no document paths.
pub fn process_video(
    input: &str,
    config: &PipelineConfig,
    captions: &dyn CaptionSource,
    assembler: &dyn DocumentAssembler,
) -> Result<VideoOutput> {
    validate(config)?;

    let label = output_label(input);
    info!(input, label, "pipeline starting");

    let workdir = tempfile::Builder::new().prefix("lectern-").tempdir()?;

    let video_path = fetch::resolve(input, workdir.path())?;
    let cues = fetch_cues(input, config, captions);

    let mut source = FfmpegFrameSource::open(&video_path)?;

    let frames_dir = workdir.path().join("frames");
    fs::create_dir_all(&frames_dir)?;

    let debug_renderer = debug_renderer(config.debug_frames_dir.as_deref());

    let slides = collect_slides(
        &mut source,
        &config.sampler,
        &frames_dir,
        debug_renderer.as_ref(),
    )?;

    if slides.is_empty() {
        warn!(input, "no slides extracted, skipping document assembly");
        return Ok(VideoOutput {
            label,
            slide_count: 0,
            slides_pdf: None,
            transcript_pdf: None,
        });
    }

    fs::create_dir_all(&config.output_dir)?;

    let transcripts = bucket_cues(&slides, &cues);

    let slides_pdf = config.output_dir.join(format!("{label}_slides.pdf"));
    assembler.slide_document(&slides, &slides_pdf)?;

    let transcript_pdf = config.output_dir.join(format!("{label}_transcript.pdf"));
    assembler.transcript_document(&slides, &transcripts, &transcript_pdf)?;

    info!(
        input,
        slide_count = slides.len(),
        ?slides_pdf,
        ?transcript_pdf,
        "pipeline complete"
    );

    Ok(VideoOutput {
        label,
        slide_count: slides.len(),
        slides_pdf: Some(slides_pdf),
        transcript_pdf: Some(transcript_pdf),
    })
}

/// Process independent inputs in parallel, one isolated pipeline per video.
///
/// A failing input never aborts its siblings; outcomes come back in input
/// order.
pub fn process_batch(
    inputs: &[String],
    config: &PipelineConfig,
    captions: &dyn CaptionSource,
    assembler: &dyn DocumentAssembler,
) -> Vec<BatchItem> {
    info!(input_count = inputs.len(), "batch starting");

    let items: Vec<BatchItem> = inputs
        .par_iter()
        .map(|input| BatchItem {
            input: input.clone(),
            outcome: process_video(input, config, captions, assembler),
        })
        .collect();

    let failed = items.iter().filter(|item| item.outcome.is_err()).count();
    info!(input_count = inputs.len(), failed, "batch complete");
    items
}

fn validate(config: &PipelineConfig) -> Result<()> {
    if config.sampler.stride < 1 {
        return Err(Error::Config(format!(
            "stride must be >= 1, got {}",
            config.sampler.stride
        )));
    }
    let tau = config.sampler.similarity_threshold;
    if !tau.is_finite() || !(0.0..=1.0).contains(&tau) {
        return Err(Error::Config(format!(
            "similarity threshold must be within [0, 1], got {tau}"
        )));
    }
    if config.language.is_empty() {
        return Err(Error::Config("caption language must not be empty".to_string()));
    }
    Ok(())
}

fn fetch_cues(input: &str, config: &PipelineConfig, captions: &dyn CaptionSource) -> Vec<Cue> {
    let Some(id) = fetch::video_id(input) else {
        info!(input, "input has no recognizable video id, proceeding without captions");
        return Vec::new();
    };
    match captions.cues(&id, &config.language) {
        Ok(cues) => {
            info!(video_id = id, cue_count = cues.len(), "captions ready");
            cues
        }
        Err(e) => {
            warn!(video_id = id, error = %e, "captions unavailable, transcripts will be empty");
            Vec::new()
        }
    }
}

/// Debug frames are best-effort: an unusable directory downgrades the run to
/// no debug output instead of failing the video.
fn debug_renderer(dir: Option<&Path>) -> Option<DebugRenderer> {
    let dir = dir?;
    match fs::create_dir_all(dir) {
        Ok(()) => {
            info!(?dir, "debug frames directory ready");
            Some(DebugRenderer::new(dir))
        }
        Err(e) => {
            warn!(?dir, error = %e, "cannot create debug frames directory, continuing without debug frames");
            None
        }
    }
}

/// Stem for the output filenames: the video id when the input has one,
/// otherwise the input's file stem reduced to filename-safe characters.
fn output_label(input: &str) -> String {
    if let Some(id) = fetch::video_id(input) {
        return id;
    }
    let stem = Path::new(input)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    let cleaned: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "video".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CaptionError;
    use tempfile::TempDir;
    use tracing_test::traced_test;

    struct NoCaptionsSource;

    impl CaptionSource for NoCaptionsSource {
        fn cues(
            &self,
            _video_id: &str,
            _language: &str,
        ) -> std::result::Result<Vec<Cue>, CaptionError> {
            Err(CaptionError::NoCaptions)
        }
    }

    #[test]
    fn youtube_inputs_label_by_video_id() {
        assert_eq!(
            output_label("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            "dQw4w9WgXcQ"
        );
    }

    #[test]
    fn local_inputs_label_by_sanitized_stem() {
        assert_eq!(output_label("talks/Lecture 01 (final).mp4"), "Lecture_01__final_");
    }

    #[test]
    fn invalid_stride_is_a_config_error() {
        let config = PipelineConfig {
            sampler: SamplerConfig {
                stride: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(validate(&config), Err(Error::Config(_))));
    }

    #[test]
    fn out_of_range_threshold_is_a_config_error() {
        let config = PipelineConfig {
            sampler: SamplerConfig {
                similarity_threshold: 1.5,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(validate(&config), Err(Error::Config(_))));
    }

    #[test]
    #[traced_test]
    fn unusable_debug_dir_degrades_to_no_renderer() {
        let dir = TempDir::new().unwrap();
        // A file where a directory is needed makes create_dir_all fail.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let unusable = blocker.join("frames");

        assert!(debug_renderer(Some(unusable.as_path())).is_none());
        assert!(logs_contain("continuing without debug frames"));
    }

    #[test]
    fn no_debug_dir_means_no_renderer() {
        assert!(debug_renderer(None).is_none());
    }

    #[test]
    #[traced_test]
    fn caption_failures_degrade_to_empty_cues() {
        let config = PipelineConfig::default();
        let cues = fetch_cues("https://youtu.be/abc123xyz00", &config, &NoCaptionsSource);
        assert!(cues.is_empty());
        assert!(logs_contain("captions unavailable"));
    }

    #[test]
    #[traced_test]
    fn inputs_without_a_video_id_skip_caption_fetch() {
        let config = PipelineConfig::default();
        let cues = fetch_cues("lecture.mp4", &config, &NoCaptionsSource);
        assert!(cues.is_empty());
        assert!(logs_contain("no recognizable video id"));
    }
}
