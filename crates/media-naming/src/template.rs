//! Rename template rendering.
//!
//! A template is free text with a handful of recognised placeholders:
//!
//! | Placeholder | Aliases | Replaced |
//! |---|---|---|
//! | episode | `{episode}`, `episode`, `Episode`, `EPISODE` | first alias found, first occurrence only |
//! | quality | `{quality}`, `quality`, `Quality`, `QUALITY` | every alias, every occurrence |
//! | old name | `{old_name}` | every occurrence |
//!
//! Substitution runs in that order. The braced alias is tried before the bare
//! words so that `{episode}` is consumed whole instead of leaving `{07}` behind.

use serde::Serialize;

use crate::{extract_episode, extract_quality};

pub const EPISODE_PLACEHOLDERS: [&str; 4] = ["{episode}", "episode", "Episode", "EPISODE"];
pub const QUALITY_PLACEHOLDERS: [&str; 4] = ["{quality}", "quality", "Quality", "QUALITY"];
pub const OLD_NAME_PLACEHOLDER: &str = "{old_name}";

/// Values extracted from an inbound filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Extraction {
    /// `None` means the file is not part of a series.
    pub episode: Option<String>,
    /// Always present; `"Unknown"` when nothing matched.
    pub quality: String,
}

impl Extraction {
    /// Run both extractors over `file_name`.
    pub fn from_file_name(file_name: &str) -> Self {
        Self {
            episode: extract_episode(file_name),
            quality: extract_quality(file_name),
        }
    }
}

/// Split `name` into stem and extension, keeping the dot on the extension.
///
/// Leading dots are part of the stem, so `.hidden` has no extension.
pub fn split_extension(name: &str) -> (&str, &str) {
    let file_start = name.rfind(['/', '\\']).map_or(0, |i| i + 1);
    let file = &name[file_start..];
    match file.rfind('.') {
        Some(dot) if file[..dot].chars().any(|c| c != '.') => {
            name.split_at(file_start + dot)
        }
        _ => (name, ""),
    }
}

/// Render `template` for a file originally called `original_name`.
///
/// The result is a base name; the caller appends the original extension.
/// Placeholders that cannot be filled (no episode) are left as written.
pub fn render(template: &str, extraction: &Extraction, original_name: &str) -> String {
    let mut rendered = template.to_string();

    if let Some(episode) = &extraction.episode
        && let Some(alias) = EPISODE_PLACEHOLDERS
            .iter()
            .find(|alias| rendered.contains(**alias))
    {
        rendered = rendered.replacen(alias, episode, 1);
    }

    for alias in QUALITY_PLACEHOLDERS {
        if rendered.contains(alias) {
            rendered = rendered.replace(alias, &extraction.quality);
        }
    }

    if rendered.contains(OLD_NAME_PLACEHOLDER) {
        let (stem, _) = split_extension(original_name);
        rendered = rendered.replace(OLD_NAME_PLACEHOLDER, stem);
    }

    rendered
}

/// The new identity of a file after rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenamedFile {
    pub base_name: String,
    /// Extension of the original name, including the dot, possibly empty.
    pub extension: String,
    pub extraction: Extraction,
}

impl RenamedFile {
    /// Base name plus original extension.
    pub fn file_name(&self) -> String {
        format!("{}{}", self.base_name, self.extension)
    }
}

/// Extract, render and re-attach the extension in one step.
pub fn plan_rename(template: &str, original_name: &str) -> RenamedFile {
    let extraction = Extraction::from_file_name(original_name);
    let base_name = render(template, &extraction, original_name);
    let (_, extension) = split_extension(original_name);
    RenamedFile {
        base_name,
        extension: extension.to_string(),
        extraction,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extraction(episode: Option<&str>, quality: &str) -> Extraction {
        Extraction {
            episode: episode.map(str::to_string),
            quality: quality.to_string(),
        }
    }

    #[test]
    fn test_end_to_end_rename() {
        let plan = plan_rename(
            "{old_name} - Episode {episode} [{quality}]",
            "Show.Name.S02E07.1080p.mkv",
        );
        assert_eq!(plan.extraction, extraction(Some("07"), "1080p"));
        assert_eq!(plan.base_name, "Show.Name.S02E07.1080p - Episode 07 [1080p]");
        assert_eq!(plan.extension, ".mkv");
        assert_eq!(
            plan.file_name(),
            "Show.Name.S02E07.1080p - Episode 07 [1080p].mkv"
        );
    }

    #[test]
    fn test_template_without_placeholders_is_unchanged() {
        let template = "My Favourite Show [x265]";
        let rendered = render(template, &extraction(Some("05"), "720p"), "a.mkv");
        assert_eq!(rendered, template);
    }

    #[test]
    fn test_episode_is_replaced_once() {
        let rendered = render(
            "episode and episode",
            &extraction(Some("05"), "Unknown"),
            "a.mkv",
        );
        assert_eq!(rendered, "05 and episode");
    }

    #[test]
    fn test_only_first_episode_alias_is_used() {
        let rendered = render(
            "Episode {episode}",
            &extraction(Some("05"), "Unknown"),
            "a.mkv",
        );
        assert_eq!(rendered, "Episode 05");
    }

    #[test]
    fn test_missing_episode_leaves_placeholder() {
        let rendered = render(
            "Movie {episode} {quality}",
            &extraction(None, "4k"),
            "a.mkv",
        );
        assert_eq!(rendered, "Movie {episode} 4k");
    }

    #[test]
    fn test_quality_is_replaced_globally() {
        let rendered = render(
            "{quality} Quality QUALITY {quality}",
            &extraction(None, "720p"),
            "a.mkv",
        );
        assert_eq!(rendered, "720p 720p 720p 720p");
    }

    #[test]
    fn test_old_name_is_inserted_last() {
        // the original name contains "Episode", which must survive untouched
        let rendered = render(
            "[{quality}] {old_name}",
            &extraction(Some("01"), "1080p"),
            "Episode One Quality.mp4",
        );
        assert_eq!(rendered, "[1080p] Episode One Quality");
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("a.mkv"), ("a", ".mkv"));
        assert_eq!(split_extension("archive.tar.gz"), ("archive.tar", ".gz"));
        assert_eq!(split_extension("noext"), ("noext", ""));
        assert_eq!(split_extension(".hidden"), (".hidden", ""));
        assert_eq!(split_extension("dir.d/file"), ("dir.d/file", ""));
        assert_eq!(split_extension("show.mp4.mp4"), ("show.mp4", ".mp4"));
    }

    #[test]
    fn test_plan_rename_movie() {
        let plan = plan_rename("{old_name} {quality}", "Movie.mkv");
        assert_eq!(plan.extraction, extraction(None, "Unknown"));
        assert_eq!(plan.file_name(), "Movie Unknown.mkv");
    }
}
