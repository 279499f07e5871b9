//! Video quality tag extraction.
//!
//! Unlike episode extraction this never fails: names without a recognisable
//! tag get [`UNKNOWN_QUALITY`].

use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::debug;

use crate::cascade::{Cascade, group};

/// Returned when no quality rule matches.
pub const UNKNOWN_QUALITY: &str = "Unknown";

/// Resolution token such as `720p` or `1080p`. The first alternative also
/// accepts a non-digit run between the digits and the `p` (`1080 HD p`).
const RESOLUTION: &str = r"(?i)\b(?:.*?(\d{3,4}[^\dp]*p).*?|.*?(\d{3,4}p))\b";
const FOUR_K: &str = r"(?i)[(\[{<]?\s*4k\s*[)\]}>]?";
const TWO_K: &str = r"(?i)[(\[{<]?\s*2k\s*[)\]}>]?";
const HDRIP: &str = r"(?i)[(\[{<]?\s*HdRip\s*[)\]}>]?|\bHdRip\b";
const FOUR_K_X264: &str = r"(?i)[(\[{<]?\s*4kX264\s*[)\]}>]?";
const FOUR_K_X265: &str = r"(?i)[(\[{<]?\s*4kx265\s*[)\]}>]?";

static CASCADE: LazyLock<Cascade<String>> = LazyLock::new(|| {
    Cascade::new()
        .push("resolution", compile(RESOLUTION), resolution)
        .push("4k", compile(FOUR_K), |_| Some("4k".to_string()))
        .push("2k", compile(TWO_K), |_| Some("2k".to_string()))
        .push("hdrip", compile(HDRIP), |_| Some("HdRip".to_string()))
        .push("4kx264", compile(FOUR_K_X264), |_| Some("4kX264".to_string()))
        .push("4kx265", compile(FOUR_K_X265), |_| Some("4kx265".to_string()))
});

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("quality patterns are valid")
}

/// The `p`-suffixed capture takes precedence over the bare one.
fn resolution(caps: &Captures<'_>) -> Option<String> {
    group(caps, 1).or_else(|| group(caps, 2))
}

/// Extract the quality tag from `file_name`, falling back to `"Unknown"`.
pub fn extract_quality(file_name: &str) -> String {
    match CASCADE.evaluate(file_name) {
        Some(hit) => {
            debug!(rule = hit.rule, quality = %hit.value, file_name, "quality extracted");
            hit.value
        }
        None => {
            debug!(file_name, "no quality tag found");
            UNKNOWN_QUALITY.to_string()
        }
    }
}

/// Name of the quality rule that decides `file_name`.
pub fn quality_rule(file_name: &str) -> Option<&'static str> {
    CASCADE.evaluate(file_name).map(|hit| hit.rule)
}
