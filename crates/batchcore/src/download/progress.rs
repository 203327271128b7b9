//! Turns yt-dlp's two output streams into progress percentages.
//!
//! Which stream carries progress depends on the request:
//!
//! - full downloads: yt-dlp prints `[download]` lines on stdout (one per line
//!   thanks to `--newline`), either as `(frag N/M)` or as a plain percentage;
//! - clips: the cut is done by ffmpeg, which rewrites a single
//!   `time=HH:MM:SS.xx` status line on stderr using bare `\r`, so that stream
//!   is reassembled byte by byte.
//!
//! The other stream is only scanned for `ERROR:` lines. Percentages leave on a
//! channel strictly increasing; nothing else ever goes through it.

use once_cell::sync::Lazy;
use regex::Regex;
use std::io::{self, ErrorKind};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::sync::mpsc;

use crate::download::error_collector::ErrorCollector;
use crate::download::ytdlp_errors::analyze_ytdlp_error;

/// `ERROR: <message>`
#[allow(clippy::expect_used)]
static ERROR_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"ERROR:\s*(.+)").expect("error regex"));

/// `(frag 3/38)` as printed at the end of `[download]` lines
#[allow(clippy::expect_used)]
static FRAGMENT_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(frag\s+(\d+)/(\d+)\)").expect("fragment regex"));

/// `[download]  21.2% of 9.13MiB at 2.35MiB/s ETA 00:03`
#[allow(clippy::expect_used)]
static PERCENT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[download\]\s+(\d+(?:\.\d+)?)%").expect("percent regex"));

/// ffmpeg `time=00:00:05.84`; the last three pairs win when more are present
#[allow(clippy::expect_used)]
static TIME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"time=(?:\d{2}:)*(\d{2}):(\d{2}):(\d{2})").expect("time regex"));

/// Which grammar the primary stream speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressMode {
    /// Whole item; progress on stdout
    Full,
    /// Section download of `total_secs` seconds; progress on stderr
    Clip { total_secs: u32 },
}

/// Trimmed message of an `ERROR:` line.
pub fn error_message(line: &str) -> Option<&str> {
    let caps = ERROR_REGEX.captures(line)?;
    let message = caps.get(1)?.as_str().trim();
    (!message.is_empty()).then_some(message)
}

/// Per-request progress state: last emitted value and highest fragment seen.
#[derive(Debug, Default, Clone)]
pub struct ProgressTracker {
    last_emitted: Option<u8>,
    max_fragment: u64,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_emitted(&self) -> Option<u8> {
        self.last_emitted
    }

    /// Interpret a stdout line of a full download.
    ///
    /// Returns a value only when it is higher than everything emitted so far.
    pub fn full_line(&mut self, line: &str) -> Option<u8> {
        let percent = if let Some(caps) = FRAGMENT_REGEX.captures(line) {
            let current: u64 = caps[1].parse().ok()?;
            let total: u64 = caps[2].parse().ok()?;
            if total == 0 {
                return None;
            }
            self.max_fragment = self.max_fragment.max(current);
            clamp_percent(self.max_fragment.saturating_mul(100) / total)
        } else if let Some(caps) = PERCENT_REGEX.captures(line) {
            let value: f64 = caps[1].parse().ok()?;
            clamp_percent(value as u64)
        } else {
            return None;
        };

        self.accept(percent)
    }

    /// Interpret a reassembled ffmpeg status line of a clip download.
    pub fn clip_line(&mut self, line: &str, total_secs: u32) -> Option<u8> {
        if total_secs == 0 {
            return None;
        }
        let caps = TIME_REGEX.captures(line)?;
        let hours: u64 = caps[1].parse().ok()?;
        let minutes: u64 = caps[2].parse().ok()?;
        let seconds: u64 = caps[3].parse().ok()?;

        let elapsed = hours * 3600 + minutes * 60 + seconds;
        self.accept(clamp_percent(elapsed * 100 / u64::from(total_secs)))
    }

    fn accept(&mut self, percent: u8) -> Option<u8> {
        match self.last_emitted {
            Some(last) if percent <= last => None,
            _ => {
                self.last_emitted = Some(percent);
                Some(percent)
            }
        }
    }
}

fn clamp_percent(value: u64) -> u8 {
    // min(100) makes the cast lossless
    value.min(100) as u8
}

/// Splits bytes into lines on either `\r` or `\n`.
///
/// Empty segments (as in `\r\n`) produce nothing.
#[derive(Debug, Default)]
pub struct LineAssembler {
    buf: Vec<u8>,
}

impl LineAssembler {
    pub fn push(&mut self, byte: u8) -> Option<String> {
        match byte {
            b'\r' | b'\n' => {
                if self.buf.is_empty() {
                    return None;
                }
                let line = String::from_utf8_lossy(&self.buf).into_owned();
                self.buf.clear();
                Some(line)
            }
            other => {
                self.buf.push(other);
                None
            }
        }
    }

    /// Bytes received since the last terminator.
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }
}

/// Byte-wise line reader for streams that rewrite lines with `\r`.
///
/// A trailing segment without terminator is dropped at end of input.
pub struct RewrittenLines<R> {
    reader: BufReader<R>,
    assembler: LineAssembler,
}

impl<R: AsyncRead + Unpin> RewrittenLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            assembler: LineAssembler::default(),
        }
    }

    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        loop {
            let byte = match self.reader.read_u8().await {
                Ok(byte) => byte,
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                    if !self.assembler.pending().is_empty() {
                        log::trace!(
                            "Dropping unterminated output: {}",
                            String::from_utf8_lossy(self.assembler.pending())
                        );
                        self.assembler = LineAssembler::default();
                    }
                    return Ok(None);
                }
                Err(e) => return Err(e),
            };
            if let Some(line) = self.assembler.push(byte) {
                return Ok(Some(line));
            }
        }
    }
}

/// Newline-delimited reader that tolerates invalid UTF-8 and strips `\r\n`.
///
/// A final line without terminator is still returned.
struct TextLines<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> TextLines<R> {
    fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            buf: Vec::new(),
        }
    }

    async fn next_line(&mut self) -> io::Result<Option<String>> {
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf).await? == 0 {
            return Ok(None);
        }
        let line = String::from_utf8_lossy(&self.buf);
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

/// Sends percentages until the consumer goes away, then silently drops them.
struct ProgressSender<'a> {
    tx: &'a mpsc::Sender<u8>,
    open: bool,
}

impl<'a> ProgressSender<'a> {
    fn new(tx: &'a mpsc::Sender<u8>) -> Self {
        Self { tx, open: true }
    }

    async fn emit(&mut self, percent: u8, label: &str) {
        if !self.open {
            return;
        }
        if self.tx.send(percent).await.is_err() {
            log::debug!("[{}] progress receiver dropped, still draining output", label);
            self.open = false;
        }
    }
}

fn record_error(errors: &ErrorCollector, label: &str, message: &str) {
    let kind = analyze_ytdlp_error(message);
    log::warn!("[{}] yt-dlp error ({}): {}", label, kind.as_str(), message);
    errors.add(message);
}

/// Read both streams of one yt-dlp process until end of input.
///
/// `stdout` / `stderr` are assigned to the primary and secondary role
/// according to `mode`. The secondary stream is scanned on its own task.
/// `tx` is only borrowed: the caller closes the channel once the process
/// has exited.
pub async fn track_progress<O, E>(
    mode: ProgressMode,
    stdout: O,
    stderr: E,
    tx: &mpsc::Sender<u8>,
    errors: &ErrorCollector,
    label: &str,
) where
    O: AsyncRead + Unpin + Send + 'static,
    E: AsyncRead + Unpin + Send + 'static,
{
    match mode {
        ProgressMode::Full => {
            let scanner = spawn_error_scanner(stderr, errors.clone(), label.to_string(), "stderr");
            stream_full_progress(stdout, tx, errors, label).await;
            join_scanner(scanner, label).await;
        }
        ProgressMode::Clip { total_secs } => {
            let scanner = spawn_error_scanner(stdout, errors.clone(), label.to_string(), "stdout");
            stream_clip_progress(stderr, total_secs, tx, errors, label).await;
            join_scanner(scanner, label).await;
        }
    }
}

/// Primary stream of a full download: fragments first, percentages otherwise.
pub async fn stream_full_progress<R>(primary: R, tx: &mpsc::Sender<u8>, errors: &ErrorCollector, label: &str)
where
    R: AsyncRead + Unpin,
{
    let mut lines = TextLines::new(primary);
    let mut tracker = ProgressTracker::new();
    let mut sender = ProgressSender::new(tx);

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                log::warn!("[{}] failed reading yt-dlp stdout: {}", label, e);
                break;
            }
        };

        if let Some(message) = error_message(&line) {
            record_error(errors, label, message);
            continue;
        }

        match tracker.full_line(&line) {
            Some(percent) => sender.emit(percent, label).await,
            None => log::trace!("[{}] stdout: {}", label, line),
        }
    }
}

/// Primary stream of a clip download: ffmpeg's `\r`-rewritten status line.
pub async fn stream_clip_progress<R>(
    primary: R,
    total_secs: u32,
    tx: &mpsc::Sender<u8>,
    errors: &ErrorCollector,
    label: &str,
) where
    R: AsyncRead + Unpin,
{
    let mut lines = RewrittenLines::new(primary);
    let mut tracker = ProgressTracker::new();
    let mut sender = ProgressSender::new(tx);

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                log::warn!("[{}] failed reading yt-dlp stderr: {}", label, e);
                break;
            }
        };

        if let Some(message) = error_message(&line) {
            record_error(errors, label, message);
            continue;
        }

        match tracker.clip_line(&line, total_secs) {
            Some(percent) => sender.emit(percent, label).await,
            None => log::trace!("[{}] stderr: {}", label, line),
        }
    }
}

/// Scan a stream for `ERROR:` lines only, on a separate task.
fn spawn_error_scanner<R>(
    stream: R,
    errors: ErrorCollector,
    label: String,
    stream_name: &'static str,
) -> tokio::task::JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = TextLines::new(stream);
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    log::debug!("[{}] {}: {}", label, stream_name, line);
                    if let Some(message) = error_message(&line) {
                        record_error(&errors, &label, message);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    log::warn!("[{}] failed reading yt-dlp {}: {}", label, stream_name, e);
                    break;
                }
            }
        }
    })
}

async fn join_scanner(scanner: tokio::task::JoinHandle<()>, label: &str) {
    if let Err(e) = scanner.await {
        log::error!("[{}] error scanner task failed: {}", label, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn drain(mut rx: mpsc::Receiver<u8>) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(p) = rx.recv().await {
            out.push(p);
        }
        out
    }

    /// Runs `track_progress` against in-memory streams and returns what the
    /// channel delivered.
    async fn run(mode: ProgressMode, stdout: &'static [u8], stderr: &'static [u8], errors: &ErrorCollector) -> Vec<u8> {
        let (tx, rx) = mpsc::channel(1);
        let consumer = tokio::spawn(drain(rx));
        track_progress(mode, stdout, stderr, &tx, errors, "test").await;
        drop(tx);
        consumer.await.unwrap()
    }

    #[test]
    fn test_line_assembler_cr_and_lf() {
        let mut assembler = LineAssembler::default();
        let lines: Vec<String> = b"abc\rdef\r\n".iter().filter_map(|b| assembler.push(*b)).collect();
        assert_eq!(lines, vec!["abc", "def"]);
        assert!(assembler.pending().is_empty());
    }

    #[test]
    fn test_line_assembler_keeps_partial() {
        let mut assembler = LineAssembler::default();
        let lines: Vec<String> = b"\n\nabc\nxy".iter().filter_map(|b| assembler.push(*b)).collect();
        assert_eq!(lines, vec!["abc"]);
        assert_eq!(assembler.pending(), b"xy");
    }

    #[tokio::test]
    async fn test_rewritten_lines_drops_unterminated_tail() {
        let mut lines = RewrittenLines::new(&b"abc\rdef\r\nghi"[..]);
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("abc"));
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("def"));
        assert_eq!(lines.next_line().await.unwrap(), None);
        assert_eq!(lines.next_line().await.unwrap(), None);
    }

    #[test]
    fn test_error_message() {
        assert_eq!(
            error_message("ERROR: [youtube] abc: Video unavailable  "),
            Some("[youtube] abc: Video unavailable")
        );
        assert_eq!(error_message("WARNING: something"), None);
        assert_eq!(error_message("ERROR:    "), None);
    }

    #[test]
    fn test_fragment_progress_keeps_max() {
        let mut tracker = ProgressTracker::new();
        assert_eq!(tracker.full_line("[download] 1.0% of ~1MiB (frag 3/10)"), Some(30));
        assert_eq!(tracker.full_line("[download] 1.0% of ~1MiB (frag 2/10)"), None);
        assert_eq!(tracker.full_line("[download] 1.0% of ~1MiB (frag 5/10)"), Some(50));
        assert_eq!(tracker.last_emitted(), Some(50));
    }

    #[test]
    fn test_fragment_example_line() {
        let mut tracker = ProgressTracker::new();
        assert_eq!(
            tracker.full_line("[download]   6.5% of ~20.20MiB ETA Unknown (frag 1/38)"),
            Some(2)
        );
        assert_eq!(tracker.full_line("(frag 3/38)"), Some(7));
        assert_eq!(tracker.full_line("(frag 1/38)"), None);
        assert_eq!(tracker.full_line("(frag 3/38)"), None);
    }

    #[test]
    fn test_fragment_wins_over_percent() {
        let mut tracker = ProgressTracker::new();
        // 90% in the line, but only 1 of 10 fragments done
        assert_eq!(tracker.full_line("[download]  90.0% of ~5MiB (frag 1/10)"), Some(10));
    }

    #[test]
    fn test_zero_fragment_total_ignored() {
        let mut tracker = ProgressTracker::new();
        assert_eq!(tracker.full_line("[download] (frag 0/0)"), None);
    }

    #[test]
    fn test_percent_progress() {
        let mut tracker = ProgressTracker::new();
        assert_eq!(tracker.full_line("[download]   0.0% of 9.13MiB at 1MiB/s ETA 00:09"), Some(0));
        assert_eq!(tracker.full_line("[download]  21.2% of 9.13MiB at 2.35MiB/s ETA 00:03"), Some(21));
        assert_eq!(tracker.full_line("[download]  21.9% of 9.13MiB at 2.35MiB/s ETA 00:03"), None);
        assert_eq!(tracker.full_line("[download] 100% of 9.13MiB in 00:04"), Some(100));
        assert_eq!(tracker.full_line("[download] Destination: video.mp4"), None);
        assert_eq!(tracker.full_line("[Merger] Merging formats into \"video.mp4\""), None);
    }

    #[test]
    fn test_clip_progress() {
        let mut tracker = ProgressTracker::new();
        assert_eq!(
            tracker.clip_line("frame=  10 fps=0.0 size=256kB time=00:00:05.84 bitrate=N/A", 30),
            Some(16)
        );
        assert_eq!(tracker.clip_line("time=00:00:00:25", 30), Some(83));
        assert_eq!(tracker.clip_line("time=00:00:20.00", 30), None);
        assert_eq!(tracker.clip_line("time=00:01:00.00", 30), Some(100));
        assert_eq!(tracker.clip_line("time=N/A", 30), None);
        assert_eq!(tracker.clip_line("time=00:00:10.00", 0), None);
    }

    #[tokio::test]
    async fn test_track_full_progress() {
        let errors = ErrorCollector::new();
        let stdout: &'static [u8] = b"[youtube] Extracting URL\n\
            [download]   6.5% of ~20.20MiB ETA Unknown (frag 1/38)\n\
            [download]  10.0% of ~20.20MiB ETA Unknown (frag 1/38)\n\
            [download]  12.0% of ~20.20MiB ETA Unknown (frag 3/38)\r\n\
            [download]  11.0% of ~20.20MiB ETA Unknown (frag 2/38)\n\
            [download] 100% of 20.20MiB (frag 38/38)\n";
        let values = run(ProgressMode::Full, stdout, b"", &errors).await;
        assert_eq!(values, vec![2, 7, 100]);
        assert!(!errors.has_errors());
    }

    #[tokio::test]
    async fn test_track_full_errors_from_both_streams() {
        let errors = ErrorCollector::new();
        let stdout: &'static [u8] = b"[download]  50.0% of 1MiB\nERROR: stdout failure \n[download]  75.0% of 1MiB\n";
        let stderr: &'static [u8] = b"WARNING: slow\nERROR: [youtube] x: Video unavailable\n";
        let values = run(ProgressMode::Full, stdout, stderr, &errors).await;

        assert_eq!(values, vec![50, 75]);
        let mut all = errors.get_all();
        all.sort();
        assert_eq!(all, vec!["[youtube] x: Video unavailable", "stdout failure"]);
    }

    #[tokio::test]
    async fn test_track_clip_progress() {
        let errors = ErrorCollector::new();
        let stderr: &'static [u8] = b"[download] Destination: clip.mp4\n\
            frame=1 time=00:00:03.00 bitrate=1\rframe=2 time=00:00:15.50 bitrate=1\r\
            frame=3 time=00:00:15.90 bitrate=1\rframe=4 time=00:00:30.00 bitrate=1\r\n\
            frame=5 time=00:00:31.00";
        let values = run(ProgressMode::Clip { total_secs: 30 }, b"", stderr, &errors).await;
        assert_eq!(values, vec![10, 50, 100]);
    }

    #[tokio::test]
    async fn test_full_mode_parses_unterminated_last_line() {
        let errors = ErrorCollector::new();
        let stdout: &'static [u8] = b"[download]  40.0% of 1MiB\n[download] 100% of 1MiB";
        let stderr: &'static [u8] = b"ERROR: no newline at the end";
        let values = run(ProgressMode::Full, stdout, stderr, &errors).await;

        assert_eq!(values, vec![40, 100]);
        assert_eq!(errors.get_all(), vec!["no newline at the end"]);
    }

    #[tokio::test]
    async fn test_track_clip_errors_on_both_streams() {
        let errors = ErrorCollector::new();
        let stdout: &'static [u8] = b"[info] x\nERROR: from stdout\n";
        let stderr: &'static [u8] = b"time=00:00:01.00\rERROR: from stderr\rtime=00:00:02.00\r";
        let values = run(ProgressMode::Clip { total_secs: 4 }, stdout, stderr, &errors).await;

        assert_eq!(values, vec![25, 50]);
        let mut all = errors.get_all();
        all.sort();
        assert_eq!(all, vec!["from stderr", "from stdout"]);
    }

    #[tokio::test]
    async fn test_dropped_receiver_still_drains() {
        let errors = ErrorCollector::new();
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let stdout: &'static [u8] = b"[download] 10.0% of 1MiB\n[download] 20.0% of 1MiB\nERROR: late failure\n";
        track_progress(ProgressMode::Full, stdout, &b""[..], &tx, &errors, "test").await;
        assert_eq!(errors.get_all(), vec!["late failure"]);
    }

    #[tokio::test]
    async fn test_values_strictly_increase_and_stay_in_range() {
        let errors = ErrorCollector::new();
        let stdout: &'static [u8] = b"[download] 5.0% of 1MiB\n[download] 3.0% of 1MiB\n\
            [download] 5.5% of 1MiB\n[download] 150.0% of 1MiB\n[download] 99.0% of 1MiB\n";
        let values = run(ProgressMode::Full, stdout, b"", &errors).await;
        assert_eq!(values, vec![5, 100]);
        assert!(values.windows(2).all(|w| w[0] < w[1]));
        assert!(values.iter().all(|v| *v <= 100));
    }
}
