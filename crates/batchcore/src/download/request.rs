//! Request model and the input-line grammar.
//!
//! One line of the input file describes one download:
//!
//! ```text
//! https://www.youtube.com/watch?v=dQw4w9WgXcQ                          full video, best quality
//! https://www.youtube.com/watch?v=dQw4w9WgXcQ 1080p                    full video, at most 1080p
//! https://www.youtube.com/watch?v=dQw4w9WgXcQ 00:00:00-00:01:00        first minute only
//! https://www.youtube.com/watch?v=dQw4w9WgXcQ 720p 00:01:00-00:02:00   clip at most 720p
//! https://www.youtube.com/watch?v=dQw4w9WgXcQ audio                    best audio stream
//! ```

use chrono::NaiveTime;
use std::path::Path;

use crate::core::error::{AppError, AppResult};
use crate::core::utils::format_duration;

const AUDIO_TOKEN: &str = "audio";
const TIME_FORMAT: &str = "%H:%M:%S";

/// One media item to fetch. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Source URL handed to yt-dlp as-is
    pub locator: String,
    /// Maximum vertical resolution; ignored for audio-only requests
    pub quality_cap: Option<u32>,
    /// Raw `HH:MM:SS-HH:MM:SS` range; validated when the download starts
    pub clip_range: Option<String>,
    pub is_audio_only: bool,
}

impl DownloadRequest {
    pub fn new(locator: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            quality_cap: None,
            clip_range: None,
            is_audio_only: false,
        }
    }

    pub fn with_quality_cap(mut self, cap: u32) -> Self {
        self.quality_cap = Some(cap);
        self
    }

    pub fn with_clip_range(mut self, range: impl Into<String>) -> Self {
        self.clip_range = Some(range.into());
        self
    }

    pub fn audio_only(mut self) -> Self {
        self.is_audio_only = true;
        self
    }

    pub fn is_clip(&self) -> bool {
        self.clip_range.is_some()
    }

    /// Quality cap that actually applies: audio downloads have no height.
    pub fn effective_quality_cap(&self) -> Option<u32> {
        if self.is_audio_only {
            None
        } else {
            self.quality_cap
        }
    }
}

/// Parse one input line into a request.
///
/// The first token is the locator. Later tokens: anything containing `-` is
/// the clip range, `<N>p` is a quality cap, `audio` selects audio-only.
/// Unknown tokens are ignored with a warning.
pub fn parse_request(line: &str) -> AppResult<DownloadRequest> {
    let mut tokens = line.split_whitespace();
    let locator = tokens
        .next()
        .ok_or_else(|| AppError::Validation("empty request line".to_string()))?;

    let mut request = DownloadRequest::new(locator);

    for token in tokens {
        if token.contains('-') {
            request.clip_range = Some(token.to_string());
        } else if token.eq_ignore_ascii_case(AUDIO_TOKEN) {
            request.is_audio_only = true;
        } else if let Some(cap) = parse_quality_token(token) {
            request.quality_cap = Some(cap);
        } else {
            log::warn!("Ignoring unrecognized token '{}' for {}", token, locator);
        }
    }

    Ok(request)
}

fn parse_quality_token(token: &str) -> Option<u32> {
    let digits = token.strip_suffix('p').or_else(|| token.strip_suffix('P'))?;
    digits.parse::<u32>().ok().filter(|cap| *cap > 0)
}

/// Length of a `HH:MM:SS-HH:MM:SS` range in whole seconds.
///
/// # Errors
///
/// Returns [`AppError::ClipRange`] when the range has no `-`, a side is not a
/// valid wall-clock time, or the end is not after the start.
pub fn clip_duration_secs(range: &str) -> AppResult<u32> {
    let (start, end) = split_range(range)?;

    let start_time =
        NaiveTime::parse_from_str(start, TIME_FORMAT).map_err(|e| AppError::clip_range(range, format!("invalid start time: {}", e)))?;
    let end_time =
        NaiveTime::parse_from_str(end, TIME_FORMAT).map_err(|e| AppError::clip_range(range, format!("invalid end time: {}", e)))?;

    let seconds = (end_time - start_time).num_seconds();
    if seconds <= 0 {
        return Err(AppError::clip_range(range, "end time must be after start time"));
    }

    u32::try_from(seconds).map_err(|_| AppError::clip_range(range, "duration out of range"))
}

fn split_range(range: &str) -> AppResult<(&str, &str)> {
    let parts: Vec<&str> = range.split('-').collect();
    match parts.as_slice() {
        [start, end] => Ok((start.trim(), end.trim())),
        _ => Err(AppError::clip_range(range, "expected HH:MM:SS-HH:MM:SS")),
    }
}

/// Human readable summary of a clip, e.g. `clip of 30s (from 00:00:10 to 00:00:40)`.
///
/// Returns `None` for a malformed range.
pub fn describe_clip(range: &str) -> Option<String> {
    let seconds = clip_duration_secs(range).ok()?;
    let (start, end) = split_range(range).ok()?;
    Some(format!("clip of {} (from {} to {})", format_duration(seconds), start, end))
}

/// Read request lines from a file, trimming whitespace and skipping blank lines.
pub fn read_request_lines(path: &Path) -> AppResult<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
