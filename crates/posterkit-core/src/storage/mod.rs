//! Persistence of saved designs.

mod autosave;
mod memory;

#[cfg(not(target_arch = "wasm32"))]
mod file;

pub use autosave::{
    AutoSaveManager,
    PlatformAutoSaveManager,
    PlatformStorage,
    create_autosave_manager,
    create_default_storage,
    DEFAULT_AUTOSAVE_INTERVAL_SECS,
    last_design_key,
    LAST_DESIGN_KEY,
};
pub use memory::MemoryStorage;

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStorage;

use crate::category::DesignCategory;
use crate::document::DocumentState;
use crate::services::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Design not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// A saved design: the document plus what is needed to list it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignRecord {
    /// Assigned on first save.
    #[serde(default)]
    pub id: Option<String>,
    pub owner: String,
    pub title: String,
    #[serde(default)]
    pub category: DesignCategory,
    pub document: DocumentState,
}

impl DesignRecord {
    /// Create an unsaved record.
    pub fn new(owner: impl Into<String>, title: impl Into<String>, document: DocumentState) -> Self {
        Self {
            id: None,
            owner: owner.into(),
            title: title.into(),
            category: document.category(),
            document,
        }
    }

    /// The record's ID, or a freshly generated one.
    pub(crate) fn id_or_new(&self) -> String {
        self.id.clone().unwrap_or_else(|| Uuid::new_v4().to_string())
    }

    /// Listing entry for this record.
    pub fn summary(&self, design_id: &str) -> DesignSummary {
        DesignSummary {
            design_id: design_id.to_string(),
            title: self.title.clone(),
            category: self.category,
            element_count: self.document.len(),
        }
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> StorageResult<Self> {
        let record: Self =
            serde_json::from_str(json).map_err(|e| StorageError::Serialization(e.to_string()))?;
        record
            .document
            .validate()
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        Ok(record)
    }
}

/// Listing entry for a saved design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignSummary {
    pub design_id: String,
    pub title: String,
    pub category: DesignCategory,
    pub element_count: usize,
}

/// Trait for design storage backends.
///
/// Note: On native platforms, implementations must be Send + Sync.
/// On WASM, these bounds are relaxed since it's single-threaded.
#[cfg(not(target_arch = "wasm32"))]
pub trait DesignStore: Send + Sync {
    /// Save a design, returning its ID (assigned if the record had none).
    fn save_design(&self, design: &DesignRecord) -> BoxFuture<'_, StorageResult<String>>;

    /// Load a design.
    fn load_design(&self, design_id: &str) -> BoxFuture<'_, StorageResult<DesignRecord>>;

    /// List the designs owned by a user.
    fn list_designs(&self, user_id: &str) -> BoxFuture<'_, StorageResult<Vec<DesignSummary>>>;

    /// Delete a design. Deleting a missing design succeeds.
    fn delete_design(&self, design_id: &str) -> BoxFuture<'_, StorageResult<()>>;

    /// Check if a design exists.
    fn exists(&self, design_id: &str) -> BoxFuture<'_, StorageResult<bool>>;
}

/// Trait for design storage backends (WASM version without Send + Sync).
#[cfg(target_arch = "wasm32")]
pub trait DesignStore {
    /// Save a design, returning its ID (assigned if the record had none).
    fn save_design(&self, design: &DesignRecord) -> BoxFuture<'_, StorageResult<String>>;

    /// Load a design.
    fn load_design(&self, design_id: &str) -> BoxFuture<'_, StorageResult<DesignRecord>>;

    /// List the designs owned by a user.
    fn list_designs(&self, user_id: &str) -> BoxFuture<'_, StorageResult<Vec<DesignSummary>>>;

    /// Delete a design. Deleting a missing design succeeds.
    fn delete_design(&self, design_id: &str) -> BoxFuture<'_, StorageResult<()>>;

    /// Check if a design exists.
    fn exists(&self, design_id: &str) -> BoxFuture<'_, StorageResult<bool>>;
}
