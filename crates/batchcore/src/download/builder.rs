//! Run configuration and yt-dlp command construction.
//!
//! [`build_invocation`] is a pure function: the same request and
//! configuration always produce the same argument vector.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use crate::core::config::{self, container, ytdlp};
use crate::core::tools::ToolPaths;
use crate::core::utils::is_youtube_url;
use crate::download::format::{video_format, ContainerPolicy, BEST_AUDIO};
use crate::download::request::DownloadRequest;

/// Settings shared read-only by every download of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub output_dir: PathBuf,
    pub container: ContainerPolicy,
    /// `Some(encoder)` when clips are re-encoded instead of remuxed
    pub clip_encoder: Option<String>,
    pub tools: ToolPaths,
}

impl Configuration {
    pub fn builder(output_dir: impl Into<PathBuf>) -> ConfigurationBuilder {
        ConfigurationBuilder::new(output_dir)
    }

    pub fn reencodes_clips(&self) -> bool {
        self.clip_encoder.is_some()
    }
}

/// Builder for [`Configuration`].
///
/// # Example
///
/// ```
/// use batchcore::download::builder::Configuration;
/// use batchcore::download::format::ContainerPolicy;
///
/// let cfg = Configuration::builder("Downloads")
///     .container(ContainerPolicy::Force)
///     .reencode_clips("libx264")
///     .build();
/// assert!(cfg.reencodes_clips());
/// ```
pub struct ConfigurationBuilder {
    output_dir: PathBuf,
    container: ContainerPolicy,
    clip_encoder: Option<String>,
    tools: Option<ToolPaths>,
}

impl ConfigurationBuilder {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            container: ContainerPolicy::default(),
            clip_encoder: None,
            tools: None,
        }
    }

    pub fn container(mut self, policy: ContainerPolicy) -> Self {
        self.container = policy;
        self
    }

    /// Re-encode clips with `encoder` (e.g. "libx264", "h264_nvenc").
    pub fn reencode_clips(mut self, encoder: &str) -> Self {
        self.clip_encoder = Some(encoder.to_string());
        self
    }

    /// Override tool locations; resolved from the environment otherwise.
    pub fn tools(mut self, tools: ToolPaths) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn build(self) -> Configuration {
        Configuration {
            output_dir: self.output_dir,
            container: self.container,
            clip_encoder: self.clip_encoder,
            tools: self.tools.unwrap_or_else(ToolPaths::resolve),
        }
    }
}

/// Fully resolved external command for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInvocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl ProcessInvocation {
    /// Command with both output streams piped and stdin closed.
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    /// Value following `flag`, if the flag is present.
    pub fn arg_value(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.args.iter().any(|a| a == flag)
    }

    /// Shell-like rendering for logs.
    pub fn display(&self) -> String {
        let mut out = self.program.display().to_string();
        for arg in &self.args {
            out.push(' ');
            if arg.contains(char::is_whitespace) {
                out.push('"');
                out.push_str(arg);
                out.push('"');
            } else {
                out.push_str(arg);
            }
        }
        out
    }
}

/// Map a request and the run configuration to a yt-dlp invocation.
pub fn build_invocation(request: &DownloadRequest, cfg: &Configuration) -> ProcessInvocation {
    let (template, format) = if request.is_audio_only {
        (audio_template(), BEST_AUDIO.to_string())
    } else {
        (
            video_template(),
            video_format(
                is_youtube_url(&request.locator),
                request.effective_quality_cap(),
                cfg.container,
            ),
        )
    };

    let mut args: Vec<String> = vec!["-f".into(), format];

    if let Some(range) = &request.clip_range {
        args.push("--download-sections".into());
        args.push(format!("*{}", range));
    }

    args.extend(resilience_args());
    args.push("--ffmpeg-location".into());
    args.push(path_arg(&cfg.tools.ffmpeg));
    args.push("--js-runtimes".into());
    args.push(format!("deno:{}", path_arg(&cfg.tools.deno)));
    args.push("-o".into());
    args.push(path_arg(&cfg.output_dir.join(template)));

    if !request.is_audio_only {
        args.extend(container_args(request.is_clip(), cfg));
    }

    args.push(request.locator.clone());

    ProcessInvocation {
        program: cfg.tools.ytdlp.clone(),
        args,
    }
}

/// Post-processing for video. Clip re-encoding replaces the remux step.
fn container_args(is_clip: bool, cfg: &Configuration) -> Vec<String> {
    let mut args = Vec::new();
    match (&cfg.clip_encoder, is_clip) {
        (Some(encoder), true) => {
            args.push("--postprocessor-args".into());
            args.push(format!("ffmpeg=-c:v {}", encoder));
            if cfg.container.forces_container() {
                args.push("--merge-output-format".into());
                args.push(container::VIDEO.into());
            }
        }
        _ => {
            if cfg.container.forces_container() {
                args.push("--remux-video".into());
                args.push(container::VIDEO.into());
            }
        }
    }
    args
}

fn resilience_args() -> Vec<String> {
    vec![
        "--user-agent".into(),
        ytdlp::USER_AGENT.into(),
        "--no-playlist".into(),
        "--audio-quality".into(),
        "0".into(),
        "--socket-timeout".into(),
        ytdlp::SOCKET_TIMEOUT_SECS.to_string(),
        "--retries".into(),
        ytdlp::RETRIES.to_string(),
        "--retry-sleep".into(),
        ytdlp::RETRY_SLEEP_SECS.to_string(),
        "--force-overwrites".into(),
        "--concurrent-fragments".into(),
        ytdlp::CONCURRENT_FRAGMENTS.to_string(),
        "--buffer-size".into(),
        ytdlp::BUFFER_SIZE.into(),
        "--newline".into(),
    ]
}

fn video_template() -> String {
    format!("%(title).{}s-%(height)sp.%(ext)s", config::ytdlp::TITLE_MAX_CHARS)
}

fn audio_template() -> String {
    format!("%(title).{}s-audio.%(ext)s", config::ytdlp::TITLE_MAX_CHARS)
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
