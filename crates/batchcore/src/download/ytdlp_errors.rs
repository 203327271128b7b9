//! Classification of yt-dlp `ERROR:` messages.
//!
//! Used for logging and for the hints shown next to the final error report.
//! The collector itself always stores the raw message.

/// Kinds of yt-dlp failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum YtDlpErrorType {
    /// Site requires a login or the cookies are stale
    InvalidCookies,
    /// Site detected automated access (HTTP 403, extraction blocked)
    BotDetection,
    /// Media is private, removed or geo-blocked
    VideoUnavailable,
    /// No stream satisfies the `-f` expression
    FormatUnavailable,
    /// URL not handled by any extractor
    UnsupportedUrl,
    /// Timeouts, DNS and connection failures
    NetworkError,
    /// ffmpeg failed while cutting, merging or re-encoding
    PostProcessing,
    Unknown,
}

impl YtDlpErrorType {
    pub fn as_str(self) -> &'static str {
        match self {
            YtDlpErrorType::InvalidCookies => "invalid_cookies",
            YtDlpErrorType::BotDetection => "bot_detection",
            YtDlpErrorType::VideoUnavailable => "video_unavailable",
            YtDlpErrorType::FormatUnavailable => "format_unavailable",
            YtDlpErrorType::UnsupportedUrl => "unsupported_url",
            YtDlpErrorType::NetworkError => "network",
            YtDlpErrorType::PostProcessing => "postprocessing",
            YtDlpErrorType::Unknown => "unknown",
        }
    }
}

/// Determine the error kind from a yt-dlp error message
pub fn analyze_ytdlp_error(message: &str) -> YtDlpErrorType {
    let lower = message.to_lowercase();

    if lower.contains("cookies are no longer valid")
        || lower.contains("sign in to confirm")
        || lower.contains("please sign in")
        || lower.contains("use --cookies")
        || lower.contains("login required")
    {
        return YtDlpErrorType::InvalidCookies;
    }

    if lower.contains("bot detection")
        || lower.contains("http error 403")
        || lower.contains("http error 429")
        || lower.contains("unable to extract")
        || lower.contains("signature extraction failed")
    {
        return YtDlpErrorType::BotDetection;
    }

    if lower.contains("requested format is not available") {
        return YtDlpErrorType::FormatUnavailable;
    }

    if lower.contains("private video")
        || lower.contains("video unavailable")
        || lower.contains("is not available")
        || lower.contains("has been removed")
        || lower.contains("does not exist")
        || lower.contains("http error 404")
    {
        return YtDlpErrorType::VideoUnavailable;
    }

    if lower.contains("unsupported url") || lower.contains("is not a valid url") {
        return YtDlpErrorType::UnsupportedUrl;
    }

    if lower.contains("postprocessing") || lower.contains("ffmpeg") || lower.contains("conversion failed") {
        return YtDlpErrorType::PostProcessing;
    }

    if lower.contains("timed out")
        || lower.contains("timeout")
        || lower.contains("connection")
        || lower.contains("network")
        || lower.contains("getaddrinfo")
        || lower.contains("name resolution")
    {
        return YtDlpErrorType::NetworkError;
    }

    YtDlpErrorType::Unknown
}

/// One-line hint printed below the error report
pub fn get_fix_hint(error_type: YtDlpErrorType) -> &'static str {
    match error_type {
        YtDlpErrorType::InvalidCookies => "the site wants a signed-in session; export browser cookies for yt-dlp",
        YtDlpErrorType::BotDetection => "the site blocked the request; update yt-dlp and retry later",
        YtDlpErrorType::VideoUnavailable => "the media is private, removed or blocked in your region",
        YtDlpErrorType::FormatUnavailable => "no stream matches; try a different quality or container policy",
        YtDlpErrorType::UnsupportedUrl => "check the link, yt-dlp has no extractor for it",
        YtDlpErrorType::NetworkError => "check the connection; yt-dlp already retried",
        YtDlpErrorType::PostProcessing => "ffmpeg failed; try without re-encoding or with the CPU encoder",
        YtDlpErrorType::Unknown => "see the log file for the full yt-dlp output",
    }
}
