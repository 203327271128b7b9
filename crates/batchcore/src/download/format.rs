//! yt-dlp format selection expressions.
//!
//! An expression is a `/`-separated fallback chain; yt-dlp takes the first
//! alternative that matches. Each alternative is a video selector optionally
//! merged (`+`) with an audio selector.

use std::fmt;

use crate::core::config::container;

/// How strongly the output container is steered towards mp4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContainerPolicy {
    /// Whatever yt-dlp picks
    #[default]
    Any,
    /// Try mp4/m4a streams first, fall back to anything
    Prefer,
    /// Select like `Any`, then remux (or merge) into mp4
    Force,
}

impl ContainerPolicy {
    /// Whether a post-processing step must produce the target container.
    pub fn forces_container(self) -> bool {
        matches!(self, ContainerPolicy::Force)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContainerPolicy::Any => "any",
            ContainerPolicy::Prefer => "prefer-mp4",
            ContainerPolicy::Force => "force-mp4",
        }
    }
}

impl fmt::Display for ContainerPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Best audio only.
pub const BEST_AUDIO: &str = "ba";

const BEST_VIDEO_ANY: &str = "bv*";
const BEST_COMBINED: &str = "best";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Selector {
    base: &'static str,
    filters: Vec<String>,
}

impl Selector {
    fn new(base: &'static str) -> Self {
        Self {
            base,
            filters: Vec::new(),
        }
    }

    fn ext(mut self, ext: &str) -> Self {
        self.filters.push(format!("[ext={}]", ext));
        self
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.base)?;
        for filter in &self.filters {
            f.write_str(filter)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Alternative {
    video: Selector,
    audio: Option<Selector>,
}

impl Alternative {
    fn single(video: Selector) -> Self {
        Self { video, audio: None }
    }

    fn merged(video: Selector, audio: Selector) -> Self {
        Self {
            video,
            audio: Some(audio),
        }
    }
}

impl fmt::Display for Alternative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.video)?;
        if let Some(audio) = &self.audio {
            write!(f, "+{}", audio)?;
        }
        Ok(())
    }
}

/// Ordered fallback chain of format alternatives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatChain {
    alternatives: Vec<Alternative>,
}

impl FormatChain {
    /// Uncapped chain for a source.
    ///
    /// `split_streams` sources (YouTube) must merge a video-only and an
    /// audio-only stream to reach high resolutions, so the merge comes first.
    pub fn for_source(split_streams: bool, policy: ContainerPolicy) -> Self {
        let separate = || Alternative::merged(Selector::new(BEST_VIDEO_ANY), Selector::new(BEST_AUDIO));
        let combined = || Alternative::single(Selector::new(BEST_COMBINED));

        let alternatives = match (split_streams, policy) {
            (true, ContainerPolicy::Prefer) => vec![
                Alternative::merged(
                    Selector::new(BEST_VIDEO_ANY).ext(container::VIDEO),
                    Selector::new(BEST_AUDIO).ext(container::AUDIO),
                ),
                separate(),
                combined(),
            ],
            (true, _) => vec![separate(), combined()],
            (false, ContainerPolicy::Prefer) => vec![
                Alternative::single(Selector::new(BEST_COMBINED).ext(container::VIDEO)),
                combined(),
            ],
            (false, _) => vec![combined(), separate()],
        };

        Self { alternatives }
    }

    /// Same chain with every video selector limited to `max_height`.
    ///
    /// The height predicate goes right after the base token so it reads
    /// `bv*[height<=720][ext=mp4]`.
    pub fn capped(&self, max_height: u32) -> Self {
        let alternatives = self
            .alternatives
            .iter()
            .cloned()
            .map(|mut alt| {
                alt.video.filters.insert(0, height_filter(max_height));
                alt
            })
            .collect();
        Self { alternatives }
    }

    /// Append `fallback` after this chain.
    pub fn then(mut self, fallback: FormatChain) -> Self {
        self.alternatives.extend(fallback.alternatives);
        self
    }

    pub fn len(&self) -> usize {
        self.alternatives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alternatives.is_empty()
    }

    /// Alternatives rendered individually, in fallback order.
    pub fn alternatives(&self) -> Vec<String> {
        self.alternatives.iter().map(ToString::to_string).collect()
    }

    pub fn expression(&self) -> String {
        self.alternatives().join("/")
    }
}

fn height_filter(max_height: u32) -> String {
    format!("[height<={}]", max_height)
}

/// Full `-f` expression for a video download.
///
/// With a cap, the capped chain is tried first and the uncapped chain is kept
/// as the final fallback so sources without height metadata still download.
/// `Any` and `Force` select identically; `Force` is applied later as a remux.
pub fn video_format(split_streams: bool, quality_cap: Option<u32>, policy: ContainerPolicy) -> String {
    let base = FormatChain::for_source(split_streams, policy);
    match quality_cap {
        Some(cap) => base.capped(cap).then(base).expression(),
        None => base.expression(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_youtube_any() {
        assert_eq!(video_format(true, None, ContainerPolicy::Any), "bv*+ba/best");
        assert_eq!(
            video_format(true, Some(1080), ContainerPolicy::Any),
            "bv*[height<=1080]+ba/best[height<=1080]/bv*+ba/best"
        );
    }

    #[test]
    fn test_other_any() {
        assert_eq!(video_format(false, None, ContainerPolicy::Any), "best/bv*+ba");
        assert_eq!(
            video_format(false, Some(720), ContainerPolicy::Any),
            "best[height<=720]/bv*[height<=720]+ba/best/bv*+ba"
        );
    }

    #[test]
    fn test_youtube_prefer() {
        assert_eq!(
            video_format(true, None, ContainerPolicy::Prefer),
            "bv*[ext=mp4]+ba[ext=m4a]/bv*+ba/best"
        );
        assert_eq!(
            video_format(true, Some(720), ContainerPolicy::Prefer),
            "bv*[height<=720][ext=mp4]+ba[ext=m4a]/bv*[height<=720]+ba/best[height<=720]/bv*[ext=mp4]+ba[ext=m4a]/bv*+ba/best"
        );
    }

    #[test]
    fn test_other_prefer() {
        assert_eq!(video_format(false, None, ContainerPolicy::Prefer), "best[ext=mp4]/best");
        assert_eq!(
            video_format(false, Some(480), ContainerPolicy::Prefer),
            "best[height<=480][ext=mp4]/best[height<=480]/best[ext=mp4]/best"
        );
    }

    #[test]
    fn test_force_selects_like_any() {
        for split in [true, false] {
            for cap in [None, Some(360), Some(2160)] {
                assert_eq!(
                    video_format(split, cap, ContainerPolicy::Force),
                    video_format(split, cap, ContainerPolicy::Any)
                );
            }
        }
    }

    #[test]
    fn test_split_stream_chain_ends_in_generic_best() {
        for policy in [ContainerPolicy::Any, ContainerPolicy::Prefer, ContainerPolicy::Force] {
            for cap in [None, Some(144), Some(1440)] {
                let expr = video_format(true, cap, policy);
                assert!(expr.contains('/'), "{} has no fallback", expr);
                assert_eq!(expr.rsplit('/').next(), Some("best"));
            }
        }
    }

    #[test]
    fn test_capped_chain_keeps_order_and_cap() {
        for split in [true, false] {
            for policy in [ContainerPolicy::Any, ContainerPolicy::Prefer] {
                let base = FormatChain::for_source(split, policy);
                let capped = base.capped(720);
                assert_eq!(capped.len(), base.len());

                for (capped_alt, base_alt) in capped.alternatives().iter().zip(base.alternatives()) {
                    assert_eq!(capped_alt.matches("[height<=").count(), 1);
                    assert!(capped_alt.contains("[height<=720]"));
                    assert_eq!(capped_alt.replace("[height<=720]", ""), base_alt);
                }
            }
        }
    }

    #[test]
    fn test_policy_display() {
        assert_eq!(ContainerPolicy::Prefer.to_string(), "prefer-mp4");
        assert!(ContainerPolicy::Force.forces_container());
        assert!(!ContainerPolicy::Prefer.forces_container());
    }
}
