//! In-memory storage implementation.

use super::{DesignRecord, DesignStore, DesignSummary, StorageError, StorageResult};
use crate::services::BoxFuture;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory storage for testing and ephemeral use.
#[derive(Default)]
pub struct MemoryStorage {
    designs: RwLock<HashMap<String, DesignRecord>>,
}

impl MemoryStorage {
    /// Create a new empty memory storage.
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(e: impl std::fmt::Display) -> StorageError {
    StorageError::Other(format!("Lock error: {}", e))
}

impl DesignStore for MemoryStorage {
    fn save_design(&self, design: &DesignRecord) -> BoxFuture<'_, StorageResult<String>> {
        let id = design.id_or_new();
        let mut record = design.clone();
        record.id = Some(id.clone());
        Box::pin(async move {
            let mut designs = self.designs.write().map_err(lock_error)?;
            designs.insert(id.clone(), record);
            Ok(id)
        })
    }

    fn load_design(&self, design_id: &str) -> BoxFuture<'_, StorageResult<DesignRecord>> {
        let id = design_id.to_string();
        Box::pin(async move {
            let designs = self.designs.read().map_err(lock_error)?;
            designs.get(&id).cloned().ok_or(StorageError::NotFound(id))
        })
    }

    fn list_designs(&self, user_id: &str) -> BoxFuture<'_, StorageResult<Vec<DesignSummary>>> {
        let owner = user_id.to_string();
        Box::pin(async move {
            let designs = self.designs.read().map_err(lock_error)?;
            let mut summaries: Vec<DesignSummary> = designs
                .iter()
                .filter(|(_, record)| record.owner == owner)
                .map(|(id, record)| record.summary(id))
                .collect();
            summaries.sort_by(|a, b| a.title.cmp(&b.title));
            Ok(summaries)
        })
    }

    fn delete_design(&self, design_id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let id = design_id.to_string();
        Box::pin(async move {
            let mut designs = self.designs.write().map_err(lock_error)?;
            designs.remove(&id);
            Ok(())
        })
    }

    fn exists(&self, design_id: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let id = design_id.to_string();
        Box::pin(async move {
            let designs = self.designs.read().map_err(lock_error)?;
            Ok(designs.contains_key(&id))
        })
    }
}
