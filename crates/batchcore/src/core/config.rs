//! Configuration read from the environment.
//!
//! Every value is read once on first access. CLI flags in the `batchdl`
//! binary take priority over these.

use once_cell::sync::Lazy;
use std::env;

/// Explicit yt-dlp binary path
/// Read from YTDL_BIN environment variable
/// When unset, the tools directory and then PATH are searched
pub static YTDL_BIN: Lazy<Option<String>> = Lazy::new(|| non_empty_var("YTDL_BIN"));

/// Explicit ffmpeg binary path
/// Read from FFMPEG_BIN environment variable
pub static FFMPEG_BIN: Lazy<Option<String>> = Lazy::new(|| non_empty_var("FFMPEG_BIN"));

/// Explicit deno binary path (JavaScript runtime used by yt-dlp extractors)
/// Read from DENO_BIN environment variable
pub static DENO_BIN: Lazy<Option<String>> = Lazy::new(|| non_empty_var("DENO_BIN"));

/// Directory holding bundled tool binaries
/// Read from TOOLS_DIR environment variable
/// Default: bin
pub static TOOLS_DIR: Lazy<String> = Lazy::new(|| env::var("TOOLS_DIR").unwrap_or_else(|_| "bin".to_string()));

/// Download folder path
/// Read from DOWNLOAD_FOLDER environment variable
/// Default: Downloads (relative to the working directory)
pub static DOWNLOAD_FOLDER: Lazy<String> =
    Lazy::new(|| env::var("DOWNLOAD_FOLDER").unwrap_or_else(|_| "Downloads".to_string()));

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: batchdl.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "batchdl.log".to_string()));

/// File with one download request per line
/// Read from URLS_FILE environment variable
/// Default: urls.txt
pub static URLS_FILE: Lazy<String> = Lazy::new(|| env::var("URLS_FILE").unwrap_or_else(|_| "urls.txt".to_string()));

/// Encoder used when clips are re-encoded
/// Read from CLIP_ENCODER environment variable
/// Default: the CPU encoder
pub static CLIP_ENCODER: Lazy<String> =
    Lazy::new(|| env::var("CLIP_ENCODER").unwrap_or_else(|_| encoder::CPU.to_string()));

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Encoder identifiers understood by ffmpeg
pub mod encoder {
    /// Software H.264 encoder, always available
    pub const CPU: &str = "libx264";
    pub const NVIDIA: &str = "h264_nvenc";
    pub const AMD: &str = "h264_amf";
    pub const INTEL: &str = "h264_qsv";

    /// Encoders the clip re-encode step is known to work with
    pub const KNOWN: &[&str] = &[CPU, NVIDIA, AMD, INTEL];

    pub fn is_known(name: &str) -> bool {
        KNOWN.contains(&name)
    }
}

/// Container targets for the `Prefer` / `Force` policies
pub mod container {
    /// Video container
    pub const VIDEO: &str = "mp4";
    /// Audio stream extension that pairs with the video container
    pub const AUDIO: &str = "m4a";
}

/// Fixed yt-dlp tuning passed on every invocation
pub mod ytdlp {
    /// `--user-agent` value passed on every invocation
    pub const USER_AGENT: &str = "random";

    /// Socket timeout (seconds)
    pub const SOCKET_TIMEOUT_SECS: u32 = 20;

    /// Retry count for the whole download
    pub const RETRIES: u32 = 3;

    /// Fixed sleep between retries (seconds)
    pub const RETRY_SLEEP_SECS: u32 = 3;

    /// Fragments fetched in parallel for segmented streams
    pub const CONCURRENT_FRAGMENTS: u32 = 3;

    /// Download buffer size
    pub const BUFFER_SIZE: &str = "64K";

    /// Title length cap in the output template, keeps paths under OS limits
    pub const TITLE_MAX_CHARS: usize = 150;
}
