use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use batchcore::core::config::{self, encoder};
use batchcore::download::{Configuration, ContainerPolicy};

#[derive(Parser, Debug)]
#[command(name = "batchdl")]
#[command(author, version, about = "Download every link of a request file concurrently with yt-dlp", long_about = None)]
pub struct Cli {
    /// Output directory (default: $DOWNLOAD_FOLDER or "Downloads")
    #[arg(short, long)]
    pub path: Option<PathBuf>,

    /// Request file, one request per line (default: $URLS_FILE or "urls.txt")
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Output container policy for video downloads
    #[arg(short, long, value_enum, default_value_t = ContainerArg::Any)]
    pub container: ContainerArg,

    /// Re-encode clips instead of cutting on keyframes
    #[arg(long)]
    pub reencode: bool,

    /// Encoder used with --reencode (default: $CLIP_ENCODER or "libx264")
    #[arg(long, requires = "reencode")]
    pub encoder: Option<String>,

    /// Exit right away instead of waiting for Enter
    #[arg(long)]
    pub no_wait: bool,

    /// Show debug output on the console
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContainerArg {
    /// Keep whatever container the source provides
    Any,
    /// Prefer mp4/m4a streams, fall back to anything
    PreferMp4,
    /// Remux (or merge) the result into mp4
    ForceMp4,
}

impl From<ContainerArg> for ContainerPolicy {
    fn from(arg: ContainerArg) -> Self {
        match arg {
            ContainerArg::Any => ContainerPolicy::Any,
            ContainerArg::PreferMp4 => ContainerPolicy::Prefer,
            ContainerArg::ForceMp4 => ContainerPolicy::Force,
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn output_dir(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| PathBuf::from(config::DOWNLOAD_FOLDER.as_str()))
    }

    pub fn input_file(&self) -> PathBuf {
        self.input
            .clone()
            .unwrap_or_else(|| PathBuf::from(config::URLS_FILE.as_str()))
    }

    /// Encoder for clip re-encoding, `None` when clips are only cut.
    pub fn clip_encoder(&self) -> Option<String> {
        if !self.reencode {
            return None;
        }
        let name = self.encoder.clone().unwrap_or_else(|| config::CLIP_ENCODER.clone());
        if !encoder::is_known(&name) {
            log::warn!(
                "Encoder '{}' is not one of {:?}; ffmpeg may reject it",
                name,
                encoder::KNOWN
            );
        }
        Some(name)
    }

    pub fn configuration(&self) -> Configuration {
        let builder = Configuration::builder(self.output_dir()).container(self.container.into());
        match self.clip_encoder() {
            Some(name) => builder.reencode_clips(&name).build(),
            None => builder.build(),
        }
    }
}
