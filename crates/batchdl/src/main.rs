#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use batchcore::core::{config, init_logger, log_tool_configuration};
use batchcore::download::request::read_request_lines;
use batchcore::download::{parse_request, DownloadRequest, Downloader};

mod cli;
mod status;

use cli::Cli;
use status::{error_report, StatusBoard, StatusEvent};

/// Entry point: read the request file, download everything at once, report.
///
/// # Errors
/// Returns an error if the logger, the request file or the output directory
/// cannot be set up. Individual download failures end up in the report.
#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env before any config is read
    let _ = dotenv();

    let cli = Cli::parse_args();

    init_logger(&config::LOG_FILE_PATH, cli.verbose)?;

    let input = cli.input_file();
    let lines =
        read_request_lines(&input).with_context(|| format!("failed to read request file {}", input.display()))?;
    let requests = parse_requests(&lines);
    if requests.is_empty() {
        log::warn!("No download requests in {}", input.display());
        return Ok(());
    }

    let cfg = cli.configuration();
    std::fs::create_dir_all(&cfg.output_dir)
        .with_context(|| format!("failed to create output directory {}", cfg.output_dir.display()))?;
    log_tool_configuration(&cfg.tools);
    log::info!(
        "Starting {} download(s) into {} (container: {}, clip re-encode: {})",
        requests.len(),
        cfg.output_dir.display(),
        cfg.container,
        cfg.clip_encoder.as_deref().unwrap_or("off")
    );

    let downloader = Downloader::new(cfg);
    let mut board = StatusBoard::new();
    run_all(&downloader, requests, &mut board).await;

    log::info!("{}", board.summary());
    report_errors(&downloader);

    if !cli.no_wait {
        wait_for_enter();
    }
    Ok(())
}

fn parse_requests(lines: &[String]) -> Vec<DownloadRequest> {
    lines
        .iter()
        .filter_map(|line| match parse_request(line) {
            Ok(request) => Some(request),
            Err(e) => {
                log::warn!("Skipping request line '{}': {}", line, e);
                None
            }
        })
        .collect()
}

/// Start every request immediately and wait until all progress streams close.
async fn run_all(downloader: &Downloader, requests: Vec<DownloadRequest>, board: &mut StatusBoard) {
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let mut tasks = JoinSet::new();

    for request in requests {
        let id = board.register(&request);
        let mut progress = downloader.download(request);
        let events = events_tx.clone();
        tasks.spawn(async move {
            while let Some(percent) = progress.recv().await {
                let _ = events.send(StatusEvent::Progress { id, percent });
            }
            let _ = events.send(StatusEvent::Finished { id });
        });
    }
    drop(events_tx);

    while let Some(event) = events_rx.recv().await {
        board.apply(event);
    }

    while let Some(result) = tasks.join_next().await {
        if let Err(e) = result {
            log::error!("Progress task failed: {}", e);
        }
    }
}

fn report_errors(downloader: &Downloader) {
    let errors = downloader.errors().get_all();
    if errors.is_empty() {
        log::info!("All downloads finished without errors");
        return;
    }
    for line in error_report(&errors) {
        log::error!("{}", line);
    }
}

fn wait_for_enter() {
    println!("Press Enter to exit...");
    let mut line = String::new();
    if let Err(e) = std::io::stdin().read_line(&mut line) {
        log::debug!("stdin closed: {}", e);
    }
}
