//! Thumbnail normalization with the `image` crate.
//!
//! Telegram only accepts JPEG thumbnails, so whatever the user or the source
//! message supplied is decoded, flattened to RGB and written back as JPEG.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::{ImageFormat, imageops::FilterType};
use tracing::debug;

use crate::services::ImageNormalizer;
use crate::{Error, Result};

/// Default bounding width for thumbnails.
pub const DEFAULT_MAX_WIDTH: u32 = 320;

/// Converts images to RGB JPEG, shrinking anything wider than `max_width`.
#[derive(Debug, Clone, Copy)]
pub struct ImageThumbnailNormalizer {
    max_width: u32,
}

impl ImageThumbnailNormalizer {
    pub fn new(max_width: u32) -> Self {
        Self {
            max_width: max_width.max(1),
        }
    }

    pub fn max_width(&self) -> u32 {
        self.max_width
    }
}

impl Default for ImageThumbnailNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WIDTH)
    }
}

#[async_trait]
impl ImageNormalizer for ImageThumbnailNormalizer {
    async fn normalize(&self, path: &Path) -> Result<PathBuf> {
        let path = path.to_path_buf();
        let max_width = self.max_width;

        tokio::task::spawn_blocking(move || normalize_in_place(&path, max_width).map(|_| path))
            .await
            .map_err(|e| Error::Other(format!("thumbnail task failed: {e}")))?
    }
}

fn normalize_in_place(path: &Path, max_width: u32) -> Result<()> {
    let decoded = image::ImageReader::open(path)
        .map_err(|e| Error::io_path("opening thumbnail", path, e))?
        .with_guessed_format()
        .map_err(|e| Error::io_path("reading thumbnail", path, e))?
        .decode()?;

    let (width, height) = (decoded.width(), decoded.height());
    let rgb = if width > max_width {
        let new_height = ((u64::from(height) * u64::from(max_width)) / u64::from(width)).max(1);
        debug!(width, height, max_width, new_height, "Resizing thumbnail");
        decoded
            .resize_exact(max_width, new_height as u32, FilterType::Triangle)
            .to_rgb8()
    } else {
        decoded.to_rgb8()
    };

    rgb.save_with_format(path, ImageFormat::Jpeg)?;
    Ok(())
}
