//! Per-run status reporting.
//!
//! `main` owns one [`StatusBoard`]. Download tasks never touch it directly;
//! they send [`StatusEvent`]s that `main` applies in arrival order.

use std::fmt;

use batchcore::download::{analyze_ytdlp_error, get_fix_hint, DownloadRequest, YtDlpErrorType};

/// Progress is logged each time a request crosses another multiple of this.
const MILESTONE_STEP: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEvent {
    Progress { id: usize, percent: u8 },
    Finished { id: usize },
}

#[derive(Debug)]
struct Entry {
    label: String,
    last: Option<u8>,
    milestone: u8,
    finished: bool,
}

#[derive(Debug, Default)]
pub struct StatusBoard {
    entries: Vec<Entry>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a request; returns the id used in its events.
    pub fn register(&mut self, request: &DownloadRequest) -> usize {
        self.entries.push(Entry {
            label: request_label(request),
            last: None,
            milestone: 0,
            finished: false,
        });
        self.entries.len() - 1
    }

    pub fn apply(&mut self, event: StatusEvent) {
        match event {
            StatusEvent::Progress { id, percent } => {
                self.update(id, percent);
            }
            StatusEvent::Finished { id } => self.finish(id),
        }
    }

    /// Record a percentage. Returns true when a milestone was logged.
    pub fn update(&mut self, id: usize, percent: u8) -> bool {
        let Some(entry) = self.entries.get_mut(id) else {
            log::warn!("Progress for unknown download #{}", id);
            return false;
        };

        if entry.last.is_none() {
            log::info!("⬇️  [{}] started", entry.label);
        }
        entry.last = Some(percent);

        let reached = percent - percent % MILESTONE_STEP;
        if reached > entry.milestone {
            entry.milestone = reached;
            log::info!("⏳ [{}] {}%", entry.label, reached);
            return true;
        }
        false
    }

    pub fn finish(&mut self, id: usize) {
        let Some(entry) = self.entries.get_mut(id) else {
            return;
        };
        entry.finished = true;
        match entry.last {
            Some(100) => log::info!("✅ [{}] done", entry.label),
            Some(p) => log::warn!("⚠️  [{}] stopped at {}%", entry.label, p),
            None => log::warn!("⚠️  [{}] finished without reporting progress", entry.label),
        }
    }

    pub fn summary(&self) -> Summary {
        let mut summary = Summary {
            total: self.entries.len(),
            ..Summary::default()
        };
        for entry in &self.entries {
            match entry.last {
                Some(100) => summary.completed += 1,
                Some(_) => summary.partial += 1,
                None => summary.silent += 1,
            }
            if !entry.finished {
                summary.unfinished += 1;
            }
        }
        summary
    }
}

/// Counts at the end of a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    /// Reached 100%
    pub completed: usize,
    /// Reported progress but stopped short of 100%
    pub partial: usize,
    /// Never reported progress
    pub silent: usize,
    pub unfinished: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} request(s): {} completed, {} incomplete, {} without progress",
            self.total, self.completed, self.partial, self.silent
        )?;
        if self.unfinished > 0 {
            write!(f, ", {} still running", self.unfinished)?;
        }
        Ok(())
    }
}

fn request_label(request: &DownloadRequest) -> String {
    let mut details = Vec::new();
    if request.is_audio_only {
        details.push("audio".to_string());
    } else if let Some(cap) = request.quality_cap {
        details.push(format!("{}p", cap));
    }
    if let Some(range) = &request.clip_range {
        details.push(range.clone());
    }

    if details.is_empty() {
        request.locator.clone()
    } else {
        format!("{} ({})", request.locator, details.join(", "))
    }
}

/// Lines of the final error report: every message numbered, then one hint per
/// error category in order of first appearance.
pub fn error_report(messages: &[String]) -> Vec<String> {
    let mut lines = Vec::with_capacity(messages.len() + 2);
    lines.push(format!("{} error(s) occurred:", messages.len()));

    let mut kinds: Vec<YtDlpErrorType> = Vec::new();
    for (i, message) in messages.iter().enumerate() {
        lines.push(format!("  {}. {}", i + 1, message));
        let kind = analyze_ytdlp_error(message);
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }

    for kind in kinds {
        lines.push(format!("hint [{}]: {}", kind.as_str(), get_fix_hint(kind)));
    }
    lines
}
