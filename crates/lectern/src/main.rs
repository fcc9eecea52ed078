mod cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use lectern_core::captions::youtube::YouTubeCaptions;
use lectern_core::document::pdf::PdfAssembler;
use lectern_core::pipeline::{self, PipelineConfig};
use lectern_core::sampler::SamplerConfig;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = cli::Cli::parse();

    match cli.command {
        cli::Command::Process {
            inputs,
            output,
            stride,
            threshold,
            language,
            reference_update,
            debug_frames,
        } => {
            info!(
                input_count = inputs.len(),
                ?output,
                stride,
                threshold,
                "starting extraction"
            );

            let config = PipelineConfig {
                sampler: SamplerConfig {
                    stride,
                    similarity_threshold: threshold,
                    reference_update: reference_update.into(),
                },
                language,
                output_dir: output,
                debug_frames_dir: debug_frames,
            };

            let captions = YouTubeCaptions::new().context("failed to build caption client")?;
            let assembler = PdfAssembler::new();

            let items = pipeline::process_batch(&inputs, &config, &captions, &assembler);

            let mut failed = 0usize;
            for item in &items {
                match &item.outcome {
                    Ok(result) if result.slide_count == 0 => {
                        warn!(input = %item.input, "no slides extracted");
                    }
                    Ok(result) => {
                        info!(
                            input = %item.input,
                            slide_count = result.slide_count,
                            slides_pdf = ?result.slides_pdf,
                            transcript_pdf = ?result.transcript_pdf,
                            "video processed"
                        );
                    }
                    Err(e) => {
                        failed += 1;
                        error!(input = %item.input, error = %e, "video failed");
                    }
                }
            }

            if failed > 0 {
                bail!("{failed} of {} inputs failed", items.len());
            }

            Ok(())
        }
    }
}
