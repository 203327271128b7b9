//! batchcore - concurrent media downloads driven by yt-dlp
//!
//! Reads download requests (locator plus optional quality cap, clip range and
//! audio-only flag), turns each one into a yt-dlp invocation and reports
//! progress as a per-request channel of percentages. Failures from all
//! downloads are gathered in one shared collector.
//!
//! # Module Structure
//!
//! - `core`: configuration, tool resolution, errors and logging
//! - `download`: request model, command builder, progress parser, orchestrator

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod core;
pub mod download;

// Re-export commonly used types for convenience
pub use self::core::{AppError, AppResult, ToolPaths};
pub use download::{parse_request, Configuration, ContainerPolicy, DownloadRequest, Downloader, ErrorCollector};
