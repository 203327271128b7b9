//! Download pipeline: request model, yt-dlp command construction, progress
//! parsing and the concurrent orchestrator.

pub mod builder;
pub mod downloader;
pub mod error_collector;
pub mod format;
pub mod progress;
pub mod request;
pub mod ytdlp_errors;

// Re-exports for convenience
pub use builder::{build_invocation, Configuration, ConfigurationBuilder, ProcessInvocation};
pub use downloader::Downloader;
pub use error_collector::ErrorCollector;
pub use format::ContainerPolicy;
pub use progress::{ProgressMode, ProgressTracker};
pub use request::{clip_duration_secs, parse_request, DownloadRequest};
pub use ytdlp_errors::{analyze_ytdlp_error, get_fix_hint, YtDlpErrorType};
