use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use regex::Regex;
use tracing::{info, warn};

use crate::error::{Error, Result};

/// Extract a YouTube video id from a watch, share, or shorts URL.
pub fn video_id(input: &str) -> Option<String> {
    const PATTERNS: [&str; 3] = [
        r"[?&]v=([A-Za-z0-9_-]+)",
        r"youtu\.be/([A-Za-z0-9_-]+)",
        r"/shorts/([A-Za-z0-9_-]+)",
    ];
    for pattern in PATTERNS {
        let regex = Regex::new(pattern).ok()?;
        if let Some(captures) = regex.captures(input) {
            return Some(captures[1].to_string());
        }
    }
    None
}

/// Resolve an input to a local, decodable video file.
///
/// Local paths are used in place. YouTube URLs are fetched with yt-dlp and
/// any other http(s) URL is downloaded directly; both land inside `workdir`
/// so the file shares the per-video cleanup.
pub fn resolve(input: &str, workdir: &Path) -> Result<PathBuf> {
    let path = Path::new(input);
    if path.exists() {
        info!(?path, "using local video file");
        return Ok(path.to_path_buf());
    }

    if !input.starts_with("http://") && !input.starts_with("https://") {
        return Err(Error::invalid_source(
            input,
            "not an existing file or an http(s) URL",
        ));
    }

    let dest = workdir.join("source.mp4");
    let is_youtube =
        video_id(input).is_some() || input.contains("youtube.com") || input.contains("youtu.be");
    if is_youtube {
        fetch_with_ytdlp(input, &dest)?;
    } else {
        download_direct(input, &dest)?;
    }
    Ok(dest)
}

fn fetch_with_ytdlp(input: &str, dest: &Path) -> Result<()> {
    info!(input, ?dest, "downloading with yt-dlp");

    let output = Command::new("yt-dlp")
        .args(["-f", "best", "--no-playlist", "-o"])
        .arg(dest)
        .arg(input)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| {
            Error::invalid_source(input, format!("failed to run yt-dlp ({e}); is yt-dlp installed?"))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!(%stderr, input, "yt-dlp failed");
        return Err(Error::invalid_source(
            input,
            format!("yt-dlp failed: {}", stderr.trim()),
        ));
    }
    if !dest.exists() {
        return Err(Error::invalid_source(
            input,
            "yt-dlp reported success but wrote no file",
        ));
    }
    Ok(())
}

fn download_direct(input: &str, dest: &Path) -> Result<()> {
    info!(input, ?dest, "downloading video over http");

    // No request timeout: large videos legitimately take minutes.
    let client = reqwest::blocking::Client::builder()
        .timeout(None)
        .build()
        .map_err(|e| Error::invalid_source(input, format!("http client setup failed: {e}")))?;

    let mut response = client
        .get(input)
        .send()
        .and_then(|r| r.error_for_status())
        .map_err(|e| Error::invalid_source(input, format!("download failed: {e}")))?;

    let mut file = File::create(dest)?;
    let bytes = response
        .copy_to(&mut file)
        .map_err(|e| Error::invalid_source(input, format!("download interrupted: {e}")))?;

    info!(bytes, ?dest, "download complete");
    Ok(())
}
