use super::{get, FetchError};
use once_cell::sync::Lazy;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info};

static VIDEO_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:https?://)?(?:[\w-]+\.)*(?:youtube\.com/(?:(?:embed|shorts|live|v|e)/|[^/\s]+/.+/|\S*?[?&]v=)|youtu\.be/)([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)",
    )
    .expect("video id pattern is valid")
});

/// Pull the 11-character video id out of a watch, short-link or embed URL.
pub fn extract_video_id(url: &str) -> Result<String, FetchError> {
    VIDEO_ID_RE
        .captures(url.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| FetchError::InvalidVideoUrl(url.to_string()))
}

pub fn embed_url(video_id: &str) -> String {
    format!("https://www.youtube.com/embed/{video_id}")
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTrack {
    base_url: String,
    #[serde(default)]
    language_code: String,
    #[serde(default)]
    kind: Option<String>,
}

/// Fetch the transcript of a video as plain text, one caption per line.
pub async fn fetch_transcript(base_url: &str, video_id: &str) -> Result<String, FetchError> {
    let base_url = base_url.trim_end_matches('/');
    let watch_url = format!("{base_url}/watch?v={video_id}");
    let page = get(&watch_url).await?.text().await?;

    let tracks = caption_tracks(&page).ok_or_else(|| {
        FetchError::NoContent(format!("No captions are available for video {video_id}"))
    })?;
    let track = pick_track(&tracks).ok_or_else(|| {
        FetchError::NoContent(format!("No captions are available for video {video_id}"))
    })?;
    debug!(language = %track.language_code, kind = ?track.kind, "caption track selected");

    let track_url = if track.base_url.starts_with("http") {
        track.base_url.clone()
    } else {
        format!("{base_url}{}", track.base_url)
    };
    let xml = get(&track_url).await?.text().await?;
    let transcript = parse_timed_text(&xml).map_err(|detail| FetchError::Parse {
        url: track_url.clone(),
        detail,
    })?;
    if transcript.is_empty() {
        return Err(FetchError::NoContent(format!(
            "Transcript for video {video_id} is empty"
        )));
    }

    info!(video_id, lines = transcript.lines().count(), "transcript fetched");
    Ok(transcript)
}

fn caption_tracks(page: &str) -> Option<Vec<CaptionTrack>> {
    const KEY: &str = "\"captionTracks\":";
    let start = page.find(KEY)? + KEY.len();
    let array = json_array_at(&page[start..])?;
    serde_json::from_str(array).ok()
}

/// Manual English captions first, then generated English, then anything.
fn pick_track(tracks: &[CaptionTrack]) -> Option<&CaptionTrack> {
    let english = |t: &&CaptionTrack| t.language_code.starts_with("en");
    let generated = |t: &&CaptionTrack| t.kind.as_deref() == Some("asr");
    tracks
        .iter()
        .filter(english)
        .find(|t| !generated(t))
        .or_else(|| tracks.iter().find(english))
        .or_else(|| tracks.first())
}

/// The balanced `[...]` at the start of `s`, skipping brackets inside strings.
fn json_array_at(s: &str) -> Option<&str> {
    let s = s.trim_start();
    if !s.starts_with('[') {
        return None;
    }
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Caption lines from a timed-text document (`<text>` or `<p>` cues).
pub fn parse_timed_text(xml: &str) -> Result<String, String> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut lines = Vec::new();
    let mut current = String::new();
    let mut in_cue = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if matches!(e.name().as_ref(), b"text" | b"p") => {
                in_cue = true;
                current.clear();
            }
            Ok(Event::Text(t)) if in_cue => {
                let text = t.unescape().map_err(|e| e.to_string())?;
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(&text);
            }
            Ok(Event::End(e)) if matches!(e.name().as_ref(), b"text" | b"p") => {
                in_cue = false;
                // Captions arrive entity-encoded twice.
                let line = html_escape::decode_html_entities(&current);
                let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
                if !line.is_empty() {
                    lines.push(line);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.to_string()),
            _ => {}
        }
    }

    Ok(lines.join("\n"))
}
