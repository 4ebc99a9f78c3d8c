//! File-based storage implementation for native platforms.

use super::{DesignRecord, DesignStore, DesignSummary, StorageError, StorageResult};
use crate::services::BoxFuture;
use std::fs;
use std::path::{Path, PathBuf};

/// File-based storage for native platforms.
///
/// Stores each design as a JSON file in a specified directory.
pub struct FileStorage {
    /// Base directory for design storage.
    base_path: PathBuf,
}

impl FileStorage {
    /// Create a new file storage with the given base directory.
    ///
    /// Creates the directory if it doesn't exist.
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                StorageError::Io(format!("Failed to create storage directory: {}", e))
            })?;
        }
        Ok(Self { base_path })
    }

    /// Create file storage in the default location.
    ///
    /// On Unix: `~/.local/share/posterkit/designs/`
    /// On Windows: `%LOCALAPPDATA%\posterkit\designs\`
    pub fn default_location() -> StorageResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;

        Self::new(base.join("posterkit").join("designs"))
    }

    /// Get the file path for a design ID.
    ///
    /// Bytes other than ASCII alphanumerics, `-` and `_` are written as
    /// `%XX`, so distinct IDs never share a file.
    fn design_path(&self, id: &str) -> PathBuf {
        let mut file_name = String::with_capacity(id.len() + 5);
        for byte in id.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
                file_name.push(char::from(byte));
            } else {
                file_name.push_str(&format!("%{:02X}", byte));
            }
        }
        file_name.push_str(".json");
        self.base_path.join(file_name)
    }

    /// Get the base path.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

fn read_record(path: &Path) -> StorageResult<DesignRecord> {
    let json = fs::read_to_string(path)
        .map_err(|e| StorageError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
    DesignRecord::from_json(&json).map_err(|e| {
        StorageError::Serialization(format!("Failed to parse {}: {}", path.display(), e))
    })
}

impl DesignStore for FileStorage {
    fn save_design(&self, design: &DesignRecord) -> BoxFuture<'_, StorageResult<String>> {
        let id = design.id_or_new();
        let path = self.design_path(&id);
        let mut record = design.clone();
        record.id = Some(id.clone());

        Box::pin(async move {
            let json = record
                .to_json()
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            fs::write(&path, json).map_err(|e| {
                StorageError::Io(format!("Failed to write {}: {}", path.display(), e))
            })?;
            log::debug!("Saved design {} to {}", id, path.display());
            Ok(id)
        })
    }

    fn load_design(&self, design_id: &str) -> BoxFuture<'_, StorageResult<DesignRecord>> {
        let path = self.design_path(design_id);
        let id_owned = design_id.to_string();

        Box::pin(async move {
            if !path.exists() {
                return Err(StorageError::NotFound(id_owned));
            }
            read_record(&path)
        })
    }

    fn list_designs(&self, user_id: &str) -> BoxFuture<'_, StorageResult<Vec<DesignSummary>>> {
        let base = self.base_path.clone();
        let owner = user_id.to_string();

        Box::pin(async move {
            if !base.exists() {
                return Ok(vec![]);
            }

            let entries = fs::read_dir(&base)
                .map_err(|e| StorageError::Io(format!("Failed to read directory: {}", e)))?;

            let mut summaries = Vec::new();
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().map(|e| e != "json").unwrap_or(true) {
                    continue;
                }
                match read_record(&path) {
                    Ok(record) if record.owner == owner => {
                        let id = record.id.clone().unwrap_or_default();
                        summaries.push(record.summary(&id));
                    }
                    Ok(_) => {}
                    Err(e) => log::warn!("Skipping unreadable design file: {}", e),
                }
            }
            summaries.sort_by(|a, b| a.title.cmp(&b.title));
            Ok(summaries)
        })
    }

    fn delete_design(&self, design_id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.design_path(design_id);

        Box::pin(async move {
            if path.exists() {
                fs::remove_file(&path).map_err(|e| {
                    StorageError::Io(format!("Failed to delete {}: {}", path.display(), e))
                })?;
            }
            Ok(())
        })
    }

    fn exists(&self, design_id: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let path = self.design_path(design_id);
        Box::pin(async move { Ok(path.exists()) })
    }
}
