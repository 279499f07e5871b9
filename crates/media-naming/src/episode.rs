//! Episode number extraction.
//!
//! A filename either carries a TV-style episode marker or it doesn't; the
//! latter is the normal "this is a movie" outcome and is reported as `None`.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::debug;

use crate::cascade::{Cascade, group};

/// `S01E05`, `s1ep12`
const SEASON_EPISODE: &str = r"(?i)S(\d+)(?:E|EP)(\d+)";
/// `S01 E05`, `S01 EP05`, `S01 - EP05`
const SEASON_SEPARATED_EPISODE: &str = r"(?i)S(\d+)\s*(?:E|EP|-\s*EP)(\d+)";
/// `[EP05]`, `(E 5)`, `{ep12}`, `<E03>`
const BRACKETED_EPISODE: &str = r"(?i)[(\[{<]\s*(?:E|EP)\s*(\d+)\s*[)\]}>]";
/// `Show - 05`
const DASH_NUMBER: &str = r"\s*-\s*(\d+)\s*";
/// `S01xyz05`: season marker, any non-digit run, then a number
const SEASON_TRAILING_NUMBER: &str = r"(?i)S(\d+)[^\d]*(\d+)";
/// A standalone 1-3 digit number between separators, e.g. `Album 03.mp3`
const TRACK_NUMBER: &str = r"(?:^|[\s._\-\[(])(\d{1,3})(?:[\s._\-\])]|$)";

static STANDARD: LazyLock<EpisodeCascade> = LazyLock::new(EpisodeCascade::standard);

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("episode patterns are valid")
}

fn first_group(caps: &Captures<'_>) -> Option<String> {
    group(caps, 1)
}

/// Skips the season group and reports the episode.
fn second_group(caps: &Captures<'_>) -> Option<String> {
    group(caps, 2)
}

/// Ordered episode patterns, most constrained first.
#[derive(Debug)]
pub struct EpisodeCascade {
    cascade: Cascade<String>,
}

impl EpisodeCascade {
    /// The five-rule cascade used by default.
    pub fn standard() -> Self {
        let cascade = Cascade::new()
            .push("season_episode", compile(SEASON_EPISODE), second_group)
            .push(
                "season_separated_episode",
                compile(SEASON_SEPARATED_EPISODE),
                second_group,
            )
            .push("bracketed_episode", compile(BRACKETED_EPISODE), first_group)
            .push("dash_number", compile(DASH_NUMBER), first_group)
            .push(
                "season_trailing_number",
                compile(SEASON_TRAILING_NUMBER),
                second_group,
            );
        Self { cascade }
    }

    /// The standard cascade plus a final bare-number rule.
    ///
    /// This rule also fires on plain track numbers (`Album 03.mp3`), so it is
    /// opt-in.
    pub fn with_track_number_fallback() -> Self {
        let Self { cascade } = Self::standard();
        Self {
            cascade: cascade.push("track_number", compile(TRACK_NUMBER), first_group),
        }
    }

    /// Episode number found in `file_name`, or `None` when the name has no
    /// episode marker.
    pub fn extract(&self, file_name: &str) -> Option<String> {
        let hit = self.cascade.evaluate(file_name)?;
        debug!(rule = hit.rule, episode = %hit.value, file_name, "episode extracted");
        Some(hit.value)
    }

    /// Name of the rule that would decide `file_name`.
    pub fn matching_rule(&self, file_name: &str) -> Option<&'static str> {
        self.cascade.evaluate(file_name).map(|hit| hit.rule)
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.cascade.rule_names().collect()
    }
}

impl Default for EpisodeCascade {
    fn default() -> Self {
        Self::standard()
    }
}

/// Extract the episode number using the standard cascade.
pub fn extract_episode(file_name: &str) -> Option<String> {
    STANDARD.extract(file_name)
}
