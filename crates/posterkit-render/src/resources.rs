//! Image resource resolution.
//!
//! Image elements only reach the surface once their source has been fetched
//! and decoded. Resolution is asynchronous and single-threaded: resolvers
//! return boxed futures that the bridge drives on its local executor.

use image::RgbaImage;
use kurbo::Size;
use posterkit_core::element::{ImageSource, PLACEHOLDER_IMAGE};
use posterkit_core::BoxFuture;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Errors while resolving an image source.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResourceError {
    #[error("Unsupported image source: {0}")]
    Unsupported(String),
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("IO error: {0}")]
    Io(String),
}

/// Result type for resource resolution.
pub type ResourceResult<T> = Result<T, ResourceError>;

/// A decoded image, shared between every node that shows it.
#[derive(Clone)]
pub struct ImageResource {
    source: String,
    pixels: Arc<RgbaImage>,
}

impl ImageResource {
    pub fn new(source: impl Into<String>, pixels: RgbaImage) -> Self {
        Self {
            source: source.into(),
            pixels: Arc::new(pixels),
        }
    }

    /// Decode encoded image bytes.
    pub fn decode(source: impl Into<String>, bytes: &[u8]) -> ResourceResult<Self> {
        let decoded =
            image::load_from_memory(bytes).map_err(|e| ResourceError::Decode(e.to_string()))?;
        Ok(Self::new(source, decoded.to_rgba8()))
    }

    /// A flat gray stand-in of the given pixel size.
    pub fn placeholder(source: impl Into<String>, width: u32, height: u32) -> Self {
        Self::new(
            source,
            RgbaImage::from_pixel(width.max(1), height.max(1), image::Rgba([200, 200, 200, 255])),
        )
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Intrinsic size in pixels.
    pub fn natural_size(&self) -> Size {
        Size::new(self.pixels.width() as f64, self.pixels.height() as f64)
    }
}

impl fmt::Debug for ImageResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageResource")
            .field("source", &self.source)
            .field("width", &self.pixels.width())
            .field("height", &self.pixels.height())
            .finish()
    }
}

/// Fetches and decodes image sources.
pub trait ImageResolver {
    fn resolve(&self, source: &str) -> BoxFuture<'static, ResourceResult<ImageResource>>;
}

/// Resolver for embedded `data:` URLs and files below a base directory.
///
/// Remote URLs are not fetched.
#[derive(Debug, Clone, Default)]
pub struct DecodingResolver {
    base_dir: Option<PathBuf>,
    /// Pixel size of the stand-in used when the placeholder file is missing.
    placeholder: Option<(u32, u32)>,
}

impl DecodingResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative and root-relative paths against `base_dir`.
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    /// Serve a generated gray image for the placeholder source when the file
    /// itself cannot be read.
    pub fn with_placeholder(mut self, width: u32, height: u32) -> Self {
        self.placeholder = Some((width, height));
        self
    }

    fn path_for(&self, reference: &str) -> PathBuf {
        let relative = reference.trim_start_matches('/');
        match &self.base_dir {
            Some(base) => base.join(relative),
            None => PathBuf::from(reference),
        }
    }

    fn load(&self, source: &str) -> ResourceResult<ImageResource> {
        match ImageSource::parse(source) {
            ImageSource::Embedded { data, .. } => ImageResource::decode(source, &data),
            ImageSource::Reference(reference) => {
                if reference.starts_with("http://") || reference.starts_with("https://") {
                    return Err(ResourceError::Unsupported(reference));
                }
                let path = self.path_for(&reference);
                match std::fs::read(&path) {
                    Ok(bytes) => ImageResource::decode(source, &bytes),
                    Err(_) if reference == PLACEHOLDER_IMAGE && self.placeholder.is_some() => {
                        let (width, height) = self.placeholder.unwrap_or((1, 1));
                        Ok(ImageResource::placeholder(source, width, height))
                    }
                    Err(e) => Err(ResourceError::Io(format!("{}: {}", path.display(), e))),
                }
            }
        }
    }
}

impl ImageResolver for DecodingResolver {
    fn resolve(&self, source: &str) -> BoxFuture<'static, ResourceResult<ImageResource>> {
        let result = self.load(source);
        Box::pin(async move { result })
    }
}
