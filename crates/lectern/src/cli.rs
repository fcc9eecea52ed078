use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use lectern_core::sampler::ReferenceUpdate;

#[derive(Parser)]
#[command(name = "lectern", about = "Turns videos into slide and transcript PDFs")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Extract slides and per-slide transcripts from one or more videos.
    Process {
        /// Video URLs or local file paths.
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Directory to write the generated PDF documents.
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        /// Evaluate every Nth decoded frame as a slide candidate.
        #[arg(long, default_value_t = 3)]
        stride: u32,

        /// SSIM score below which a candidate counts as a new slide.
        #[arg(long, default_value_t = 0.8)]
        threshold: f64,

        /// Preferred caption language code.
        #[arg(long, default_value = "en")]
        language: String,

        /// When the similarity reference moves to the latest candidate.
        #[arg(long, value_enum, default_value = "every-candidate")]
        reference_update: ReferencePolicy,

        /// Directory to save candidate frames annotated with their verdicts.
        #[arg(long)]
        debug_frames: Option<PathBuf>,
    },
}

/// CLI mirror of the sampler's reference-update policy; the core stays free
/// of clap types.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ReferencePolicy {
    EveryCandidate,
    AcceptedOnly,
}

impl From<ReferencePolicy> for ReferenceUpdate {
    fn from(policy: ReferencePolicy) -> Self {
        match policy {
            ReferencePolicy::EveryCandidate => ReferenceUpdate::EveryCandidate,
            ReferencePolicy::AcceptedOnly => ReferenceUpdate::AcceptedOnly,
        }
    }
}
