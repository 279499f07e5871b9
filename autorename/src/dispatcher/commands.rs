//! Preference commands.

/// A bot command with its argument text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    AutoRename(String),
    SetCaption(String),
    DelCaption,
    SeeCaption,
    SetMedia(String),
    DelThumb,
    ViewThumb,
}

impl Command {
    /// Parse `/name[@bot] [args]`. Unknown commands and plain text are `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let rest = text.strip_prefix('/')?;

        let (head, args) = match rest.find(char::is_whitespace) {
            Some(idx) => (&rest[..idx], rest[idx..].trim()),
            None => (rest, ""),
        };
        let name = head.split('@').next().unwrap_or(head).to_ascii_lowercase();
        let args = args.to_string();

        Some(match name.as_str() {
            "start" => Self::Start,
            "autorename" => Self::AutoRename(args),
            "set_caption" => Self::SetCaption(args),
            "del_caption" => Self::DelCaption,
            "see_caption" | "view_caption" => Self::SeeCaption,
            "setmedia" => Self::SetMedia(args),
            "del_thumb" | "delthumb" => Self::DelThumb,
            "view_thumb" | "viewthumb" => Self::ViewThumb,
            _ => return None,
        })
    }
}

pub const START_TEXT: &str = "Send me a document, video or audio file and I will rename it.\n\n\
Set your format with /autorename, e.g.\n\
/autorename Show S01 - EP{episode} [{quality}]\n\n\
Placeholders: {episode}, {quality}, {old_name}.\n\
Captions: /set_caption, /see_caption, /del_caption.\n\
Send a photo to set a custom thumbnail; /view_thumb, /del_thumb.\n\
Upload type: /setmedia document|video|audio.";

pub const AUTORENAME_USAGE: &str = "Please provide a new name after the command /autorename\n\n\
Example: /autorename Show S01 - EP{episode} [{quality}]";

pub const SET_CAPTION_USAGE: &str = "Give the caption after the command /set_caption\n\n\
Example: /set_caption {filename}\n\nSize: {filesize}\nDuration: {duration}";

pub const SET_MEDIA_USAGE: &str = "Usage: /setmedia document|video|audio";
