//! Logging initialization and tool configuration checking
//!
//! This module provides:
//! - Logger initialization (console + file)
//! - Startup diagnostics for the external tools

use anyhow::Result;
use simplelog::*;
use std::fs::File;

use crate::core::tools::ToolPaths;

/// Initialize logger for both console and file output
///
/// # Arguments
/// * `log_file_path` - Path to the log file
/// * `verbose` - Lower the console level to debug
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(anyhow::Error)` - Failed to create the file or a logger is already set
pub fn init_logger(log_file_path: &str, verbose: bool) -> Result<()> {
    let log_file = File::create(log_file_path).map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;

    let console_level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };

    CombinedLogger::init(vec![
        TermLogger::new(console_level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto),
        WriteLogger::new(LevelFilter::Debug, Config::default(), log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Logs which external binaries will be used for this run
///
/// A tool that resolved to a bare name is looked up on PATH when the
/// process starts, so a missing one only shows up as a start failure later.
pub fn log_tool_configuration(tools: &ToolPaths) {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("🔧 External tools");
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    for (name, path) in tools.iter() {
        if path.is_absolute() {
            if path.exists() {
                log::info!("✅ {}: {}", name, path.display());
            } else {
                log::error!("❌ {}: {} (FILE NOT FOUND!)", name, path.display());
            }
        } else {
            log::info!("🔎 {}: {} (resolved from PATH)", name, path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_init_logger_second_call_fails() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.log");
        let second = dir.path().join("second.log");

        // Whichever test initializes the global logger first wins; the
        // second attempt in this process must be refused.
        let _ = init_logger(first.to_str().unwrap(), false);
        assert!(init_logger(second.to_str().unwrap(), false).is_err());
        assert!(second.exists());
    }

    #[test]
    fn test_init_logger_bad_path() {
        assert!(init_logger("/nonexistent-dir/for/sure/batchdl.log", false).is_err());
    }

    #[test]
    fn test_log_tool_configuration_runs() {
        let tools = ToolPaths {
            ytdlp: PathBuf::from("yt-dlp"),
            ffmpeg: PathBuf::from("/definitely/missing/ffmpeg"),
            deno: PathBuf::from("deno"),
        };
        log_tool_configuration(&tools);
    }
}
