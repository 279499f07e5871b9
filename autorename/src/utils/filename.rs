//! Make rendered names safe to use as a single path component.
//!
//! Templates are user text, so a rendered name may contain path separators or
//! characters some filesystems reject. Unicode text is kept as-is.

/// Characters rejected by at least one mainstream filesystem.
const FORBIDDEN_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Device names Windows refuses as file stems.
const RESERVED_STEMS: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Most filesystems cap a component at 255 bytes.
pub const MAX_FILE_NAME_BYTES: usize = 255;

/// Longest extension carried over to a renamed file, dot included.
pub const MAX_EXTENSION_BYTES: usize = 32;

/// Sanitize a rendered base name (no extension).
///
/// `reserve` bytes are kept free for the extension the caller appends.
///
/// ```
/// use autorename::utils::filename::sanitize_file_name;
///
/// assert_eq!(sanitize_file_name("a/b", 0), "a_b");
/// assert_eq!(sanitize_file_name("  ", 0), "file");
/// ```
pub fn sanitize_file_name(name: &str, reserve: usize) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_control() || FORBIDDEN_CHARS.contains(&c) {
            if !out.ends_with('_') {
                out.push('_');
            }
        } else {
            out.push(c);
        }
    }

    let budget = MAX_FILE_NAME_BYTES.saturating_sub(reserve);
    if out.len() > budget {
        let mut cut = budget;
        while !out.is_char_boundary(cut) {
            cut -= 1;
        }
        out.truncate(cut);
    }

    let trimmed = out.trim_matches(|c: char| c == ' ' || c == '.');
    if trimmed.is_empty() {
        return "file".to_string();
    }

    if RESERVED_STEMS.iter().any(|r| trimmed.eq_ignore_ascii_case(r)) {
        return format!("_{trimmed}");
    }

    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_template_output() {
        let name = "Show.Name.S02E07.1080p - Episode 07 [1080p]";
        assert_eq!(sanitize_file_name(name, 4), name);
    }

    #[test]
    fn test_replaces_separators() {
        assert_eq!(sanitize_file_name("../../etc/passwd", 0), "_.._etc_passwd");
        assert_eq!(sanitize_file_name("a\\b:c", 0), "a_b_c");
        assert_eq!(sanitize_file_name("what???", 0), "what_");
    }

    #[test]
    fn test_keeps_unicode() {
        assert_eq!(sanitize_file_name("進撃の巨人 第05話", 0), "進撃の巨人 第05話");
    }

    #[test]
    fn test_reserved_stem() {
        assert_eq!(sanitize_file_name("con", 0), "_con");
    }

    #[test]
    fn test_truncates_on_char_boundary() {
        let long = "é".repeat(200);
        let out = sanitize_file_name(&long, 4);
        assert!(out.len() <= MAX_FILE_NAME_BYTES - 4);
        assert!(out.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_empty_falls_back() {
        assert_eq!(sanitize_file_name("", 0), "file");
        assert_eq!(sanitize_file_name(" . ", 0), "file");
    }
}
