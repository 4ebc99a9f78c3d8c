//! Boundaries to the services the editor depends on.
//!
//! Authentication, uploads and the template catalog are owned elsewhere;
//! the editor only sees these traits.

use crate::element::{ImageFormat, ImageSource};
use crate::storage::StorageError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Boxed future for async operations (compatible with WASM).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Errors reported by external services.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("No valid session")]
    Unauthenticated,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Upload failed: {0}")]
    Upload(String),
    #[error("Template catalog error: {0}")]
    Catalog(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result type for service calls.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Subscription level of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    #[default]
    Free,
    Premium,
    Pro,
}

/// An authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    pub user_id: String,
    pub email: String,
    #[serde(default)]
    pub tier: SubscriptionTier,
}

/// Supplies the current user session, if any.
#[cfg(not(target_arch = "wasm32"))]
pub trait SessionProvider: Send + Sync {
    fn current_session(&self) -> Option<UserSession>;
}

/// Supplies the current user session, if any (WASM version without Send + Sync).
#[cfg(target_arch = "wasm32")]
pub trait SessionProvider {
    fn current_session(&self) -> Option<UserSession>;
}

/// Editing is only available with a valid session.
pub fn require_session<P: SessionProvider + ?Sized>(provider: &P) -> ServiceResult<UserSession> {
    provider.current_session().ok_or(ServiceError::Unauthenticated)
}

/// A fixed session, for offline use and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSession {
    session: Option<UserSession>,
}

impl StaticSession {
    /// A provider that always reports `session`.
    pub fn signed_in(session: UserSession) -> Self {
        Self {
            session: Some(session),
        }
    }

    /// A provider with no session.
    pub fn signed_out() -> Self {
        Self::default()
    }
}

impl SessionProvider for StaticSession {
    fn current_session(&self) -> Option<UserSession> {
        self.session.clone()
    }
}

/// Result of an image upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedImage {
    /// Stable reference usable as an image element source.
    pub url: String,
}

/// Stores image bytes and returns a stable reference to them.
#[cfg(not(target_arch = "wasm32"))]
pub trait UploadService: Send + Sync {
    fn upload_image(&self, data: Vec<u8>, file_name: &str) -> BoxFuture<'_, ServiceResult<UploadedImage>>;
}

/// Stores image bytes and returns a stable reference to them (WASM version).
#[cfg(target_arch = "wasm32")]
pub trait UploadService {
    fn upload_image(&self, data: Vec<u8>, file_name: &str) -> BoxFuture<'_, ServiceResult<UploadedImage>>;
}

/// Upload service that embeds the image as a `data:` URL instead of sending it anywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddingUploadService;

impl UploadService for EmbeddingUploadService {
    fn upload_image(&self, data: Vec<u8>, file_name: &str) -> BoxFuture<'_, ServiceResult<UploadedImage>> {
        let file_name = file_name.to_string();
        Box::pin(async move {
            if ImageFormat::from_magic_bytes(&data).is_none() {
                return Err(ServiceError::Upload(format!(
                    "{} is not a PNG, JPEG or WebP image",
                    file_name
                )));
            }
            Ok(UploadedImage {
                url: ImageSource::data_url(&data),
            })
        })
    }
}
