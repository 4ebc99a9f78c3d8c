//! Auto-save functionality for design persistence.
//!
//! Provides automatic periodic saving of the open design to prevent data loss.

use crate::storage::{DesignRecord, DesignStore, DesignSummary, StorageResult};
use std::sync::Arc;

#[cfg(not(target_arch = "wasm32"))]
use std::time::{Duration, Instant};

#[cfg(target_arch = "wasm32")]
use web_time::{Duration, Instant};

/// Default auto-save interval in seconds.
pub const DEFAULT_AUTOSAVE_INTERVAL_SECS: u64 = 30;

/// Prefix of each user's "last saved" design key.
pub const LAST_DESIGN_KEY: &str = "__last_design__";

/// Key under which `owner`'s most recent save is kept.
pub fn last_design_key(owner: &str) -> String {
    format!("{}{}", LAST_DESIGN_KEY, owner)
}

/// Manages automatic design persistence.
pub struct AutoSaveManager<S: DesignStore> {
    /// Storage backend.
    storage: Arc<S>,
    /// Auto-save interval.
    interval: Duration,
    /// Last save timestamp.
    last_save: Option<Instant>,
    /// Whether the design has unsaved changes.
    dirty: bool,
    /// ID of the design being edited, once it has been saved.
    current_design_id: Option<String>,
}

impl<S: DesignStore> AutoSaveManager<S> {
    /// Create a new auto-save manager with the given storage backend.
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            storage,
            interval: Duration::from_secs(DEFAULT_AUTOSAVE_INTERVAL_SECS),
            last_save: None,
            dirty: false,
            current_design_id: None,
        }
    }

    /// Set the auto-save interval.
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    /// Get the auto-save interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Mark the design as having unsaved changes.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Check if the design has unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Get the current design ID.
    pub fn design_id(&self) -> Option<&str> {
        self.current_design_id.as_deref()
    }

    /// Check if enough time has passed for an auto-save.
    pub fn should_save(&self) -> bool {
        if !self.dirty {
            return false;
        }

        match self.last_save {
            Some(last) => last.elapsed() >= self.interval,
            None => true,
        }
    }

    /// Save the design if needed (dirty + interval elapsed).
    /// Returns true if save was performed.
    pub async fn maybe_save(&mut self, design: &DesignRecord) -> StorageResult<bool> {
        if !self.should_save() {
            return Ok(false);
        }

        self.save(design).await?;
        Ok(true)
    }

    /// Force save the design immediately. Returns the design ID.
    pub async fn save(&mut self, design: &DesignRecord) -> StorageResult<String> {
        let mut record = design.clone();
        if record.id.is_none() {
            record.id = self.current_design_id.clone();
        }

        let id = self.storage.save_design(&record).await?;
        record.id = Some(last_design_key(&record.owner));
        self.storage.save_design(&record).await?;

        log::info!("Auto-saved design {}", id);
        self.current_design_id = Some(id.clone());
        self.last_save = Some(Instant::now());
        self.dirty = false;

        Ok(id)
    }

    /// Load a design by ID.
    pub async fn load(&mut self, id: &str) -> StorageResult<DesignRecord> {
        let record = self.storage.load_design(id).await?;
        self.current_design_id = Some(id.to_string());
        self.dirty = false;
        self.last_save = Some(Instant::now());
        Ok(record)
    }

    /// Try to load `user_id`'s last saved design as an unsaved copy.
    /// Returns None if there is none.
    pub async fn load_last(&mut self, user_id: &str) -> Option<DesignRecord> {
        match self.storage.load_design(&last_design_key(user_id)).await {
            Ok(record) if record.owner != user_id => {
                log::warn!("Last design key for {} holds a design of {}", user_id, record.owner);
                None
            }
            Ok(mut record) => {
                record.id = None;
                self.current_design_id = None;
                self.dirty = false;
                self.last_save = Some(Instant::now());
                Some(record)
            }
            Err(_) => None,
        }
    }

    /// List a user's saved designs.
    pub async fn list_designs(&self, user_id: &str) -> StorageResult<Vec<DesignSummary>> {
        let mut designs = self.storage.list_designs(user_id).await?;
        designs.retain(|s| !s.design_id.starts_with(LAST_DESIGN_KEY));
        Ok(designs)
    }

    /// Get a reference to the storage backend.
    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }
}

/// Create a platform-appropriate storage backend.
#[cfg(not(target_arch = "wasm32"))]
pub fn create_default_storage() -> StorageResult<Arc<crate::storage::FileStorage>> {
    Ok(Arc::new(crate::storage::FileStorage::default_location()?))
}

#[cfg(target_arch = "wasm32")]
pub fn create_default_storage() -> StorageResult<Arc<crate::storage::MemoryStorage>> {
    Ok(Arc::new(crate::storage::MemoryStorage::new()))
}

/// Convenience type alias for platform-specific storage.
#[cfg(not(target_arch = "wasm32"))]
pub type PlatformStorage = crate::storage::FileStorage;

#[cfg(target_arch = "wasm32")]
pub type PlatformStorage = crate::storage::MemoryStorage;

/// Type alias for the auto-save manager with platform-specific storage.
pub type PlatformAutoSaveManager = AutoSaveManager<PlatformStorage>;

/// Convenience function to create an auto-save manager with default storage.
pub fn create_autosave_manager() -> StorageResult<PlatformAutoSaveManager> {
    let storage = create_default_storage()?;
    Ok(AutoSaveManager::new(storage))
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use crate::document::DocumentState;
    use crate::element::Element;
    use crate::storage::MemoryStorage;
    use futures::executor::block_on;

    fn record(title: &str) -> DesignRecord {
        owned_record("u-1", title)
    }

    fn owned_record(owner: &str, title: &str) -> DesignRecord {
        let document = DocumentState::default().add_element(Element::text(title)).unwrap();
        DesignRecord::new(owner, title, document)
    }

    #[test]
    fn test_autosave_manager_creation() {
        let manager = AutoSaveManager::new(Arc::new(MemoryStorage::new()));

        assert!(!manager.is_dirty());
        assert!(!manager.should_save());
        assert!(manager.design_id().is_none());
    }

    #[test]
    fn test_autosave_dirty_flag() {
        let mut manager = AutoSaveManager::new(Arc::new(MemoryStorage::new()));

        manager.mark_dirty();
        assert!(manager.is_dirty());
        assert!(manager.should_save());
    }

    #[test]
    fn test_autosave_respects_interval() {
        let mut manager = AutoSaveManager::new(Arc::new(MemoryStorage::new()));
        manager.set_interval(Duration::from_secs(3600));

        manager.mark_dirty();
        assert!(block_on(manager.maybe_save(&record("First"))).unwrap());

        manager.mark_dirty();
        assert!(!block_on(manager.maybe_save(&record("Second"))).unwrap());
        assert!(manager.is_dirty());
    }

    #[test]
    fn test_autosave_reuses_design_id() {
        let mut manager = AutoSaveManager::new(Arc::new(MemoryStorage::new()));

        let first = block_on(manager.save(&record("Draft"))).unwrap();
        let second = block_on(manager.save(&record("Draft v2"))).unwrap();

        assert_eq!(first, second);
        assert_eq!(block_on(manager.list_designs("u-1")).unwrap().len(), 1);
    }

    #[test]
    fn test_autosave_load_last() {
        let mut manager = AutoSaveManager::new(Arc::new(MemoryStorage::new()));
        block_on(manager.save(&record("Poster"))).unwrap();

        let mut manager2 = AutoSaveManager::new(manager.storage().clone());
        let loaded = block_on(manager2.load_last("u-1")).expect("Should load last design");
        assert_eq!(loaded.title, "Poster");
        assert!(loaded.id.is_none());
    }

    #[test]
    fn test_autosave_load_last_is_per_user() {
        let storage = Arc::new(MemoryStorage::new());
        let mut alice = AutoSaveManager::new(storage.clone());
        let mut bob = AutoSaveManager::new(storage);

        block_on(alice.save(&owned_record("alice", "Alice's poster"))).unwrap();
        assert!(block_on(bob.load_last("bob")).is_none());

        block_on(bob.save(&owned_record("bob", "Bob's flyer"))).unwrap();
        let last = block_on(alice.load_last("alice")).unwrap();
        assert_eq!(last.title, "Alice's poster");
        assert_eq!(block_on(bob.load_last("bob")).unwrap().title, "Bob's flyer");
    }

    #[test]
    fn test_autosave_list_excludes_special_key() {
        let mut manager = AutoSaveManager::new(Arc::new(MemoryStorage::new()));
        block_on(manager.save(&record("Poster"))).unwrap();

        let list = block_on(manager.list_designs("u-1")).unwrap();
        assert!(list.iter().all(|s| !s.design_id.starts_with(LAST_DESIGN_KEY)));
        assert_eq!(list.len(), 1);
    }
}
