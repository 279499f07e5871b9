//! Caption rendering for the outbound message.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::format::{format_duration, human_bytes};

static CAPTION_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{(filename|filesize|duration|quality)\}")
        .expect("caption token pattern is valid")
});

/// Values available to caption templates.
#[derive(Debug, Clone)]
pub struct CaptionContext<'a> {
    pub file_name: &'a str,
    pub file_size: u64,
    pub duration_secs: u64,
    pub quality: &'a str,
}

/// Render the caption from the chat's template, or the default layout when
/// the chat has none.
///
/// Recognised tokens are `{filename}`, `{filesize}`, `{duration}` and
/// `{quality}`; anything else in braces is left as written. Substitution is a
/// single pass, so token text inside a value is never expanded again.
pub fn render_caption(template: Option<&str>, ctx: &CaptionContext<'_>) -> String {
    let size = human_bytes(ctx.file_size);
    let duration = format_duration(ctx.duration_secs);

    match template.filter(|t| !t.trim().is_empty()) {
        Some(template) => CAPTION_TOKEN
            .replace_all(template, |caps: &Captures<'_>| match &caps[1] {
                "filename" => ctx.file_name,
                "filesize" => size.as_str(),
                "duration" => duration.as_str(),
                _ => ctx.quality,
            })
            .into_owned(),
        None => format!(
            "📕Name ➠ : {}\n\n🔗 Size ➠ : {}\n\n⏰ Duration ➠ : {}\n\n🎥 Quality ➠ : {}",
            ctx.file_name, size, duration, ctx.quality
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> CaptionContext<'static> {
        CaptionContext {
            file_name: "Show - 07.mkv",
            file_size: 1536,
            duration_secs: 125,
            quality: "1080p",
        }
    }

    #[test]
    fn test_custom_template() {
        let caption = render_caption(Some("{filename} | {filesize} | {duration} | {quality}"), &ctx());
        assert_eq!(caption, "Show - 07.mkv | 1.5 KB | 0:02:05 | 1080p");
    }

    #[test]
    fn test_unknown_tokens_are_kept() {
        let caption = render_caption(Some("{filename} {uploader}"), &ctx());
        assert_eq!(caption, "Show - 07.mkv {uploader}");
    }

    #[test]
    fn test_values_are_not_expanded_again() {
        let ctx = CaptionContext {
            file_name: "Show {quality} {duration}.mkv",
            ..ctx()
        };
        let caption = render_caption(Some("{filename} / {quality}"), &ctx);
        assert_eq!(caption, "Show {quality} {duration}.mkv / 1080p");
    }

    #[test]
    fn test_default_caption() {
        let caption = render_caption(None, &ctx());
        assert!(caption.contains("Name ➠ : Show - 07.mkv"));
        assert!(caption.contains("Size ➠ : 1.5 KB"));
        assert!(caption.contains("Duration ➠ : 0:02:05"));
        assert!(caption.contains("Quality ➠ : 1080p"));
    }

    #[test]
    fn test_blank_template_uses_default() {
        assert_eq!(render_caption(Some("  "), &ctx()), render_caption(None, &ctx()));
    }
}
