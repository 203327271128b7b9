use url::Url;

/// Hosts that always publish video and audio as separate streams.
const SPLIT_STREAM_HOSTS: &[&str] = &["youtube.com", "youtu.be", "youtube-nocookie.com"];

/// Returns true for YouTube links (including `m.`, `music.` and `www.` subdomains).
///
/// Locators that are not valid URLs are treated as non-YouTube.
///
/// # Example
///
/// ```
/// use batchcore::core::utils::is_youtube_url;
///
/// assert!(is_youtube_url("https://youtu.be/dQw4w9WgXcQ"));
/// assert!(is_youtube_url("https://music.youtube.com/watch?v=x"));
/// assert!(!is_youtube_url("https://vimeo.com/123"));
/// ```
pub fn is_youtube_url(locator: &str) -> bool {
    let Ok(url) = Url::parse(locator) else {
        return false;
    };
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.to_lowercase();
    SPLIT_STREAM_HOSTS
        .iter()
        .any(|h| host == *h || host.ends_with(&format!(".{}", h)))
}

/// Formats a duration in seconds as `"2m 30s"` or `"45s"`.
pub fn format_duration(seconds: u32) -> String {
    let minutes = seconds / 60;
    let secs = seconds % 60;
    if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}
