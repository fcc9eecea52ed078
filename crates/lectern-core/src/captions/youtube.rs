use scraper::{Html, Selector};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::CaptionError;

use super::{CaptionSource, Cue};

const WATCH_URL: &str = "https://www.youtube.com/watch?v=";
const PLAYER_RESPONSE_PREFIX: &str = "var ytInitialPlayerResponse = ";
const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Fetches caption tracks from the player metadata embedded in YouTube's
/// watch page, then downloads the selected track in the json3 format.
pub struct YouTubeCaptions {
    client: reqwest::blocking::Client,
}

impl YouTubeCaptions {
    pub fn new() -> Result<Self, CaptionError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }
}

impl CaptionSource for YouTubeCaptions {
    fn cues(&self, video_id: &str, language: &str) -> Result<Vec<Cue>, CaptionError> {
        info!(video_id, language, "fetching captions");

        let watch_url = format!("{WATCH_URL}{video_id}");
        let html = self
            .client
            .get(&watch_url)
            .send()?
            .error_for_status()?
            .text()?;

        let player_response = extract_player_response(&html)?;
        let track_url = select_track_url(&player_response, language)?;

        let transcript_url = format!("{track_url}&fmt=json3");
        let payload = self
            .client
            .get(&transcript_url)
            .send()?
            .error_for_status()?
            .text()?;

        let cues = parse_transcript(&payload)?;
        info!(video_id, cue_count = cues.len(), "captions fetched");
        Ok(cues)
    }
}

fn extract_player_response(html: &str) -> Result<Value, CaptionError> {
    let document = Html::parse_document(html);
    let script_selector = Selector::parse("script")
        .map_err(|_| CaptionError::Malformed("invalid script selector".to_string()))?;

    for element in document.select(&script_selector) {
        let script_content = element.inner_html();
        let Some(stripped) = script_content.trim_start().strip_prefix(PLAYER_RESPONSE_PREFIX)
        else {
            continue;
        };
        // The script carries further statements after the JSON object, so
        // parse just the first value off the stream.
        let mut stream = serde_json::Deserializer::from_str(stripped).into_iter::<Value>();
        return match stream.next() {
            Some(Ok(value)) => Ok(value),
            Some(Err(e)) => Err(CaptionError::Malformed(format!(
                "player response is not valid JSON: {e}"
            ))),
            None => Err(CaptionError::Malformed(
                "player response script is empty".to_string(),
            )),
        };
    }

    Err(CaptionError::Malformed(
        "no player response found in watch page".to_string(),
    ))
}

fn language_code(track: &Value) -> Option<&str> {
    track.get("languageCode").and_then(Value::as_str)
}

fn select_track_url(player_response: &Value, language: &str) -> Result<String, CaptionError> {
    let tracks = player_response
        .pointer("/captions/playerCaptionsTracklistRenderer/captionTracks")
        .and_then(Value::as_array)
        .ok_or(CaptionError::NoCaptions)?;

    // Exact language match first, then a regional variant ("en" -> "en-US").
    let chosen = tracks
        .iter()
        .find(|t| language_code(t) == Some(language))
        .or_else(|| {
            tracks
                .iter()
                .find(|t| language_code(t).is_some_and(|code| code.starts_with(language)))
        })
        .ok_or_else(|| CaptionError::LanguageUnavailable(language.to_string()))?;

    let base_url = chosen
        .get("baseUrl")
        .and_then(Value::as_str)
        .ok_or_else(|| CaptionError::Malformed("caption track has no baseUrl".to_string()))?;

    let code = language_code(chosen);
    debug!(language_code = code, "caption track selected");
    Ok(base_url.to_string())
}

#[derive(Deserialize)]
struct TranscriptPayload {
    #[serde(default)]
    events: Vec<TranscriptEvent>,
}

#[derive(Deserialize)]
struct TranscriptEvent {
    #[serde(rename = "tStartMs", default)]
    start_ms: u64,
    #[serde(rename = "dDurationMs", default)]
    duration_ms: u64,
    #[serde(default)]
    segs: Vec<Segment>,
}

#[derive(Deserialize)]
struct Segment {
    #[serde(default)]
    utf8: String,
}

fn parse_transcript(json: &str) -> Result<Vec<Cue>, CaptionError> {
    let payload: TranscriptPayload = serde_json::from_str(json)
        .map_err(|e| CaptionError::Malformed(format!("transcript payload: {e}")))?;

    // Events without segments are styling/window records; newline-only
    // segments carry no spoken text. Both are dropped.
    let cues = payload
        .events
        .into_iter()
        .filter_map(|event| {
            let text: String = event.segs.iter().map(|s| s.utf8.as_str()).collect();
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            Some(Cue {
                start_ms: event.start_ms,
                duration_ms: event.duration_ms,
                text: text.to_string(),
            })
        })
        .collect();

    Ok(cues)
}
