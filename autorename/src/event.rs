//! Inbound media events.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Media kinds the pipeline accepts and can send back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Document,
    Video,
    Audio,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }

    /// Extension appended to names reported for this kind, if any.
    fn implied_extension(&self) -> Option<&'static str> {
        match self {
            Self::Document => None,
            Self::Video => Some(".mp4"),
            Self::Audio => Some(".mp3"),
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "document" => Ok(Self::Document),
            "video" => Ok(Self::Video),
            "audio" => Ok(Self::Audio),
            other => Err(Error::UnsupportedMedia(format!(
                "'{other}' is not one of document, video, audio"
            ))),
        }
    }
}

/// An embedded preview image offered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailCandidate {
    pub reference: String,
    pub width: u32,
    pub height: u32,
}

impl ThumbnailCandidate {
    fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Immutable snapshot of one inbound media item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    /// Unique per underlying binary; the debounce key.
    pub identity: String,
    /// Handle the transport needs to fetch the binary.
    pub source: String,
    pub name: String,
    pub size: u64,
    pub kind: MediaKind,
    pub duration_hint: Option<u64>,
    pub thumbnails: Vec<ThumbnailCandidate>,
    /// Requesting user; keys the format template and media preference.
    pub user_id: i64,
    /// Chat the reply goes to; keys the caption and thumbnail.
    pub chat_id: i64,
    /// Message that carried the file, for threaded replies.
    pub message_id: i64,
}

/// Fields of a [`FileEvent`] as reported by the transport.
#[derive(Debug, Clone, Default)]
pub struct MediaDescriptor {
    pub identity: String,
    pub source: String,
    pub name: Option<String>,
    pub size: u64,
    pub duration_hint: Option<u64>,
    pub thumbnails: Vec<ThumbnailCandidate>,
}

impl FileEvent {
    /// Build an event, normalising the reported name for `kind`.
    ///
    /// Videos and audio get `.mp4` / `.mp3` appended unless already present;
    /// a missing name is synthesized from the identity.
    pub fn from_media(
        kind: MediaKind,
        media: MediaDescriptor,
        user_id: i64,
        chat_id: i64,
        message_id: i64,
    ) -> Self {
        let name = normalize_name(kind, media.name.as_deref(), &media.identity);
        Self {
            identity: media.identity,
            source: media.source,
            name,
            size: media.size,
            kind,
            duration_hint: media.duration_hint,
            thumbnails: media.thumbnails,
            user_id,
            chat_id,
            message_id,
        }
    }

    /// The highest-resolution embedded thumbnail.
    pub fn best_thumbnail(&self) -> Option<&ThumbnailCandidate> {
        self.thumbnails.iter().max_by_key(|t| t.area())
    }
}

fn normalize_name(kind: MediaKind, reported: Option<&str>, identity: &str) -> String {
    let base = reported
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(identity);

    match kind.implied_extension() {
        Some(ext) if !base.to_ascii_lowercase().ends_with(ext) => format!("{base}{ext}"),
        _ => base.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn media(name: Option<&str>) -> MediaDescriptor {
        MediaDescriptor {
            identity: "uniq-1".to_string(),
            source: "file-1".to_string(),
            name: name.map(str::to_string),
            size: 42,
            ..Default::default()
        }
    }

    #[test]
    fn test_document_name_kept() {
        let event = FileEvent::from_media(MediaKind::Document, media(Some("a.pdf")), 1, 1, 1);
        assert_eq!(event.name, "a.pdf");
    }

    #[test]
    fn test_video_gets_extension() {
        let event = FileEvent::from_media(MediaKind::Video, media(Some("clip")), 1, 1, 1);
        assert_eq!(event.name, "clip.mp4");

        let event = FileEvent::from_media(MediaKind::Video, media(Some("clip.MP4")), 1, 1, 1);
        assert_eq!(event.name, "clip.MP4");
    }

    #[test]
    fn test_missing_name_synthesized() {
        let event = FileEvent::from_media(MediaKind::Audio, media(None), 1, 1, 1);
        assert_eq!(event.name, "uniq-1.mp3");

        let event = FileEvent::from_media(MediaKind::Document, media(Some("  ")), 1, 1, 1);
        assert_eq!(event.name, "uniq-1");
    }

    #[test]
    fn test_best_thumbnail_is_largest() {
        let mut descriptor = media(Some("v.mp4"));
        descriptor.thumbnails = vec![
            ThumbnailCandidate {
                reference: "small".to_string(),
                width: 90,
                height: 50,
            },
            ThumbnailCandidate {
                reference: "large".to_string(),
                width: 320,
                height: 180,
            },
        ];
        let event = FileEvent::from_media(MediaKind::Video, descriptor, 1, 1, 1);
        assert_eq!(event.best_thumbnail().unwrap().reference, "large");
    }

    #[test]
    fn test_media_kind_parse() {
        assert_eq!("Video".parse::<MediaKind>().unwrap(), MediaKind::Video);
        assert!("sticker".parse::<MediaKind>().is_err());
    }
}
