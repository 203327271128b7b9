//! Runs one yt-dlp process per request and exposes its progress as a channel.

use std::sync::Arc;
use tokio::process::Child;
use tokio::sync::mpsc;

use crate::download::builder::{build_invocation, Configuration};
use crate::download::error_collector::ErrorCollector;
use crate::download::progress::{track_progress, ProgressMode};
use crate::download::request::{clip_duration_secs, describe_clip, DownloadRequest};

/// Launches downloads that share one configuration and one error list.
///
/// Cloning is cheap; clones report into the same [`ErrorCollector`].
#[derive(Debug, Clone)]
pub struct Downloader {
    config: Arc<Configuration>,
    errors: ErrorCollector,
}

impl Downloader {
    pub fn new(config: Configuration) -> Self {
        Self::with_collector(Arc::new(config), ErrorCollector::new())
    }

    pub fn with_collector(config: Arc<Configuration>, errors: ErrorCollector) -> Self {
        Self { config, errors }
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Every failure recorded by downloads started from this handle.
    pub fn errors(&self) -> &ErrorCollector {
        &self.errors
    }

    /// Start downloading `request` and return its progress stream.
    ///
    /// The receiver yields strictly increasing percentages and is closed once
    /// the process has exited. Failures never travel over the channel; they
    /// land in [`Downloader::errors`]. When the process cannot be started the
    /// receiver is returned already closed.
    ///
    /// Must be called from within a tokio runtime.
    pub fn download(&self, request: DownloadRequest) -> mpsc::Receiver<u8> {
        let (tx, rx) = mpsc::channel(1);
        let label = request.locator.clone();
        let invocation = build_invocation(&request, &self.config);

        let mode = match &request.clip_range {
            Some(range) => match clip_duration_secs(range) {
                Ok(total_secs) => {
                    if let Some(description) = describe_clip(range) {
                        log::info!("[{}] downloading {}", label, description);
                    }
                    ProgressMode::Clip { total_secs }
                }
                Err(e) => {
                    log::error!("[{}] {}", label, e);
                    self.errors.add(format!("failed to calculate clip duration: {}", e));
                    return rx;
                }
            },
            None => ProgressMode::Full,
        };

        log::debug!("[{}] running: {}", label, invocation.display());

        let mut child = match invocation.to_command().spawn() {
            Ok(child) => child,
            Err(e) => {
                log::error!("[{}] failed to spawn {}: {}", label, invocation.program.display(), e);
                self.errors.add(format!("failed to start download: {}", e));
                return rx;
            }
        };
        log::info!("[{}] yt-dlp started (pid {:?})", label, child.id());

        let (stdout, stderr) = match (child.stdout.take(), child.stderr.take()) {
            (Some(stdout), Some(stderr)) => (stdout, stderr),
            (stdout, _) => {
                let stream = if stdout.is_none() { "stdout" } else { "stderr" };
                log::error!("[{}] no {} pipe, killing yt-dlp", label, stream);
                self.errors.add(format!("failed to get {} pipe", stream));
                tokio::spawn(reap(child, label));
                return rx;
            }
        };

        let errors = self.errors.clone();
        tokio::spawn(async move {
            track_progress(mode, stdout, stderr, &tx, &errors, &label).await;

            match child.wait().await {
                Ok(status) if status.success() => log::info!("[{}] yt-dlp finished", label),
                Ok(status) => log::warn!("[{}] yt-dlp exited with {}", label, status),
                Err(e) => log::error!("[{}] failed to wait for yt-dlp: {}", label, e),
            }
            // closes the progress stream
            drop(tx);
        });

        rx
    }
}

async fn reap(mut child: Child, label: String) {
    if let Err(e) = child.kill().await {
        log::warn!("[{}] failed to kill yt-dlp: {}", label, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tools::ToolPaths;
    use std::path::PathBuf;

    fn config_with_ytdlp(ytdlp: &str) -> Configuration {
        Configuration::builder("/tmp")
            .tools(ToolPaths {
                ytdlp: PathBuf::from(ytdlp),
                ffmpeg: PathBuf::from("ffmpeg"),
                deno: PathBuf::from("deno"),
            })
            .build()
    }

    #[tokio::test]
    async fn test_bad_clip_range_closes_immediately() {
        let downloader = Downloader::new(config_with_ytdlp("yt-dlp"));
        let request = DownloadRequest::new("https://youtu.be/abc").with_clip_range("00:00:40-00:00:10");

        let mut rx = downloader.download(request);
        assert_eq!(rx.recv().await, None);

        let errors = downloader.errors().get_all();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("failed to calculate clip duration: "), "{}", errors[0]);
    }

    #[tokio::test]
    async fn test_missing_binary_records_start_failure() {
        let downloader = Downloader::new(config_with_ytdlp("/nonexistent/batchdl-test/yt-dlp"));

        let mut rx = downloader.download(DownloadRequest::new("https://youtu.be/abc"));
        assert_eq!(rx.recv().await, None);

        let errors = downloader.errors().get_all();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("failed to start download: "), "{}", errors[0]);
    }

    #[tokio::test]
    async fn test_clones_share_collector() {
        let downloader = Downloader::new(config_with_ytdlp("/nonexistent/batchdl-test/yt-dlp"));
        let other = downloader.clone();

        let mut rx = other.download(DownloadRequest::new("https://vimeo.com/1"));
        while rx.recv().await.is_some() {}

        assert!(downloader.errors().has_errors());
        assert_eq!(downloader.config(), other.config());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_quiet_process_closes_without_progress() {
        // echo prints its arguments: no progress, no errors
        let downloader = Downloader::new(config_with_ytdlp("/bin/echo"));

        let mut rx = downloader.download(DownloadRequest::new("https://vimeo.com/1").with_quality_cap(480));
        let mut values = Vec::new();
        while let Some(p) = rx.recv().await {
            values.push(p);
        }

        assert!(values.is_empty());
        assert!(!downloader.errors().has_errors());
    }
}
