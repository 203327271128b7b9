//! Resolution of logical tool names (`yt-dlp`, `ffmpeg`, `deno`) to executables.

use std::path::{Path, PathBuf};

use crate::core::config;

pub const YTDLP: &str = "yt-dlp";
pub const FFMPEG: &str = "ffmpeg";
pub const DENO: &str = "deno";

/// Executable locations for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub ytdlp: PathBuf,
    pub ffmpeg: PathBuf,
    pub deno: PathBuf,
}

impl ToolPaths {
    /// Resolve all tools from the environment and the tools directory.
    pub fn resolve() -> Self {
        Self {
            ytdlp: resolve_tool(YTDLP),
            ffmpeg: resolve_tool(FFMPEG),
            deno: resolve_tool(DENO),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Path)> {
        [
            (YTDLP, self.ytdlp.as_path()),
            (FFMPEG, self.ffmpeg.as_path()),
            (DENO, self.deno.as_path()),
        ]
        .into_iter()
    }
}

/// Resolve a logical tool name using the `*_BIN` overrides and `TOOLS_DIR`.
pub fn resolve_tool(name: &str) -> PathBuf {
    let explicit = match name {
        YTDLP => config::YTDL_BIN.as_deref(),
        FFMPEG => config::FFMPEG_BIN.as_deref(),
        DENO => config::DENO_BIN.as_deref(),
        _ => None,
    };
    resolve_in(name, explicit, Path::new(config::TOOLS_DIR.as_str()))
}

/// Lookup order: explicit override, `<tools_dir>/<name>[.exe]` made absolute
/// when the file exists, then the bare name so the OS searches PATH.
pub fn resolve_in(name: &str, explicit: Option<&str>, tools_dir: &Path) -> PathBuf {
    if let Some(path) = explicit {
        return shellexpand::tilde(path).into_owned().into();
    }

    let bundled = tools_dir.join(executable_name(name));
    if bundled.is_file() {
        return std::path::absolute(&bundled).unwrap_or(bundled);
    }

    PathBuf::from(name)
}

fn executable_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{}.exe", name)
    } else {
        name.to_string()
    }
}
