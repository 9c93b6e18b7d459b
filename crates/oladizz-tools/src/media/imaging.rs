//! In-process image re-encoding.
//!
//! These functions are CPU bound; call them through
//! [`tokio::task::spawn_blocking`].

use std::io::Cursor;
use std::str::FromStr;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, RgbaImage};

use crate::error::{ToolError, ToolResult};

/// Edge length of a sticker.
pub const STICKER_SIZE: u32 = 512;

/// Image conversion targets offered in the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFormat {
    Jpg,
    Png,
    Bmp,
}

impl TargetFormat {
    pub const ALL: [TargetFormat; 3] = [Self::Jpg, Self::Png, Self::Bmp];

    /// Lowercase name, also the file extension.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Png => "png",
            Self::Bmp => "bmp",
        }
    }

    /// Uppercase name shown to users.
    pub fn label(&self) -> String {
        self.as_str().to_uppercase()
    }

    fn encoding(&self) -> ImageFormat {
        match self {
            Self::Jpg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
            Self::Bmp => ImageFormat::Bmp,
        }
    }
}

impl FromStr for TargetFormat {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(Self::Jpg),
            "png" => Ok(Self::Png),
            "bmp" => Ok(Self::Bmp),
            other => Err(ToolError::Unsupported(format!("image format '{other}'"))),
        }
    }
}

fn encode(image: &DynamicImage, format: ImageFormat) -> ToolResult<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, format)?;
    Ok(out.into_inner())
}

/// Decodes any supported image and re-encodes it as `target`.
pub fn convert(bytes: &[u8], target: TargetFormat) -> ToolResult<Vec<u8>> {
    let image = image::load_from_memory(bytes)?;
    let image = match target {
        // JPEG has no alpha channel.
        TargetFormat::Jpg => DynamicImage::ImageRgb8(image.to_rgb8()),
        _ => image,
    };
    encode(&image, target.encoding())
}

/// Fits an image into a transparent 512×512 square and encodes it as WebP.
pub fn sticker(bytes: &[u8]) -> ToolResult<Vec<u8>> {
    let image = image::load_from_memory(bytes)?;
    let fitted = image
        .resize(STICKER_SIZE, STICKER_SIZE, FilterType::Lanczos3)
        .to_rgba8();

    let mut canvas = RgbaImage::new(STICKER_SIZE, STICKER_SIZE);
    let x = i64::from((STICKER_SIZE - fitted.width()) / 2);
    let y = i64::from((STICKER_SIZE - fitted.height()) / 2);
    imageops::overlay(&mut canvas, &fitted, x, y);

    encode(&DynamicImage::ImageRgba8(canvas), ImageFormat::WebP)
}
