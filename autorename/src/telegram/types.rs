//! Bot API objects, limited to the fields the bot reads.

use serde::Deserialize;

use crate::event::{MediaDescriptor, MediaKind, ThumbnailCandidate};

/// Envelope of every Bot API response.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error_code: Option<i64>,
    #[serde(default)]
    pub parameters: Option<ResponseParameters>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResponseParameters {
    pub retry_after: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    pub file_unique_id: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub file_size: Option<u64>,
}

impl PhotoSize {
    fn candidate(&self) -> ThumbnailCandidate {
        ThumbnailCandidate {
            reference: self.file_id.clone(),
            width: self.width,
            height: self.height,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub file_id: String,
    pub file_unique_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default, alias = "thumb")]
    pub thumbnail: Option<PhotoSize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Video {
    pub file_id: String,
    pub file_unique_id: String,
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default, alias = "thumb")]
    pub thumbnail: Option<PhotoSize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Audio {
    pub file_id: String,
    pub file_unique_id: String,
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default, alias = "thumb")]
    pub thumbnail: Option<PhotoSize>,
}

/// Result of `getFile`.
#[derive(Debug, Clone, Deserialize)]
pub struct File {
    pub file_id: String,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub document: Option<Document>,
    #[serde(default)]
    pub video: Option<Video>,
    #[serde(default)]
    pub audio: Option<Audio>,
    #[serde(default)]
    pub photo: Option<Vec<PhotoSize>>,
    #[serde(default)]
    pub voice: Option<serde_json::Value>,
    #[serde(default)]
    pub animation: Option<serde_json::Value>,
    #[serde(default)]
    pub sticker: Option<serde_json::Value>,
    #[serde(default)]
    pub video_note: Option<serde_json::Value>,
}

impl Message {
    pub fn is_private(&self) -> bool {
        self.chat.kind == "private"
    }

    /// Sender id, falling back to the chat for anonymous senders.
    pub fn sender_id(&self) -> i64 {
        self.from.as_ref().map_or(self.chat.id, |user| user.id)
    }

    /// The renameable attachment, if the message carries one.
    ///
    /// Animations arrive with a `document` field as well, so they are
    /// rejected here rather than treated as documents.
    pub fn media(&self) -> Option<(MediaKind, MediaDescriptor)> {
        if self.animation.is_some() {
            return None;
        }

        if let Some(doc) = &self.document {
            return Some((
                MediaKind::Document,
                MediaDescriptor {
                    identity: doc.file_unique_id.clone(),
                    source: doc.file_id.clone(),
                    name: doc.file_name.clone(),
                    size: doc.file_size.unwrap_or(0),
                    duration_hint: None,
                    thumbnails: doc.thumbnail.iter().map(PhotoSize::candidate).collect(),
                },
            ));
        }

        if let Some(video) = &self.video {
            return Some((
                MediaKind::Video,
                MediaDescriptor {
                    identity: video.file_unique_id.clone(),
                    source: video.file_id.clone(),
                    name: video.file_name.clone(),
                    size: video.file_size.unwrap_or(0),
                    duration_hint: video.duration,
                    thumbnails: video.thumbnail.iter().map(PhotoSize::candidate).collect(),
                },
            ));
        }

        self.audio.as_ref().map(|audio| {
            (
                MediaKind::Audio,
                MediaDescriptor {
                    identity: audio.file_unique_id.clone(),
                    source: audio.file_id.clone(),
                    name: audio.file_name.clone(),
                    size: audio.file_size.unwrap_or(0),
                    duration_hint: audio.duration,
                    thumbnails: audio.thumbnail.iter().map(PhotoSize::candidate).collect(),
                },
            )
        })
    }

    /// Media the bot cannot rename.
    pub fn has_unsupported_media(&self) -> bool {
        self.voice.is_some()
            || self.animation.is_some()
            || self.sticker.is_some()
            || self.video_note.is_some()
    }

    /// `file_id` of the largest photo size.
    pub fn largest_photo(&self) -> Option<&str> {
        self.photo
            .as_ref()?
            .iter()
            .max_by_key(|p| u64::from(p.width) * u64::from(p.height))
            .map(|p| p.file_id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_message() {
        let json = r#"{
            "message_id": 10,
            "chat": {"id": 42, "type": "private"},
            "from": {"id": 42, "first_name": "A"},
            "video": {
                "file_id": "vid-file",
                "file_unique_id": "vid-uniq",
                "width": 1920, "height": 1080,
                "duration": 1425,
                "file_name": "Show.S01E05.mkv",
                "file_size": 1048576,
                "thumb": {"file_id": "th", "file_unique_id": "thu", "width": 320, "height": 180}
            }
        }"#;
        let message: Message = serde_json::from_str(json).unwrap();
        assert!(message.is_private());
        assert_eq!(message.sender_id(), 42);

        let (kind, media) = message.media().unwrap();
        assert_eq!(kind, MediaKind::Video);
        assert_eq!(media.identity, "vid-uniq");
        assert_eq!(media.source, "vid-file");
        assert_eq!(media.duration_hint, Some(1425));
        assert_eq!(media.thumbnails.len(), 1);
        assert_eq!(media.thumbnails[0].reference, "th");
    }

    #[test]
    fn test_animation_is_unsupported() {
        let json = r#"{
            "message_id": 1,
            "chat": {"id": 1, "type": "private"},
            "animation": {"file_id": "a"},
            "document": {"file_id": "a", "file_unique_id": "u"}
        }"#;
        let message: Message = serde_json::from_str(json).unwrap();
        assert!(message.media().is_none());
        assert!(message.has_unsupported_media());
    }

    #[test]
    fn test_largest_photo() {
        let json = r#"{
            "message_id": 1,
            "chat": {"id": 1, "type": "group"},
            "photo": [
                {"file_id": "s", "file_unique_id": "1", "width": 90, "height": 90},
                {"file_id": "l", "file_unique_id": "2", "width": 800, "height": 800}
            ]
        }"#;
        let message: Message = serde_json::from_str(json).unwrap();
        assert!(!message.is_private());
        assert_eq!(message.largest_photo(), Some("l"));
    }

    #[test]
    fn test_error_response() {
        let json = r#"{"ok": false, "error_code": 429, "description": "Too Many Requests", "parameters": {"retry_after": 7}}"#;
        let response: ApiResponse<serde_json::Value> = serde_json::from_str(json).unwrap();
        assert!(!response.ok);
        assert_eq!(response.parameters.unwrap().retry_after, Some(7));
    }
}
