//! Image element attributes and image source references.

use super::StylePatch;
use base64::{Engine, engine::general_purpose::STANDARD};
use kurbo::Size;
use serde::{Deserialize, Serialize};

/// Source used for image elements created without one.
pub const PLACEHOLDER_IMAGE: &str = "/placeholder-image.jpg";

/// Image format for embedded image data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageFormat {
    Png,
    Jpeg,
    WebP,
}

impl ImageFormat {
    /// Get MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::WebP => "image/webp",
        }
    }

    /// Detect format from a MIME type.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/png" => Some(ImageFormat::Png),
            "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
            "image/webp" => Some(ImageFormat::WebP),
            _ => None,
        }
    }

    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "webp" => Some(ImageFormat::WebP),
            _ => None,
        }
    }

    /// Detect format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Some(ImageFormat::Png);
        }
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(ImageFormat::Jpeg);
        }
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Some(ImageFormat::WebP);
        }
        None
    }
}

/// A parsed image source reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Image bytes embedded in a `data:` URL.
    Embedded {
        format: Option<ImageFormat>,
        data: Vec<u8>,
    },
    /// Anything else: a URL or a path understood by the resolver.
    Reference(String),
}

impl ImageSource {
    /// Parse a source string. Malformed `data:` URLs are kept as references.
    pub fn parse(source: &str) -> Self {
        Self::decode_data_url(source).unwrap_or_else(|| ImageSource::Reference(source.to_string()))
    }

    fn decode_data_url(source: &str) -> Option<Self> {
        let rest = source.strip_prefix("data:")?;
        let (header, payload) = rest.split_once(',')?;
        let mime = header.strip_suffix(";base64")?;
        let data = STANDARD.decode(payload.trim()).ok()?;
        let format = ImageFormat::from_mime_type(mime).or_else(|| ImageFormat::from_magic_bytes(&data));
        Some(ImageSource::Embedded { format, data })
    }

    /// Encode raw image bytes as a `data:` URL.
    pub fn data_url(data: &[u8]) -> String {
        let mime = ImageFormat::from_magic_bytes(data)
            .map(|f| f.mime_type())
            .unwrap_or("application/octet-stream");
        format!("data:{};base64,{}", mime, STANDARD.encode(data))
    }
}

/// Attributes of an image element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageStyle {
    /// URL or embedded `data:` reference.
    pub source: String,
    pub flip_x: bool,
    pub flip_y: bool,
}

impl ImageStyle {
    /// Size of an image element created without explicit dimensions.
    pub const DEFAULT_SIZE: Size = Size::new(100.0, 100.0);

    pub(super) fn apply(&mut self, patch: &StylePatch) {
        if let Some(source) = &patch.source {
            self.source.clone_from(source);
        }
        if let Some(flip_x) = patch.flip_x {
            self.flip_x = flip_x;
        }
        if let Some(flip_y) = patch.flip_y {
            self.flip_y = flip_y;
        }
    }
}

impl Default for ImageStyle {
    fn default() -> Self {
        Self {
            source: PLACEHOLDER_IMAGE.to_string(),
            flip_x: false,
            flip_y: false,
        }
    }
}
