//! PosterKit Core Library
//!
//! Platform-agnostic document model for the PosterKit poster editor:
//! elements, the immutable document state, snapshot undo history, templates
//! and the traits through which the editor talks to outside services.

pub mod category;
pub mod config;
pub mod document;
pub mod element;
pub mod history;
pub mod services;
pub mod storage;
pub mod template;

pub use category::DesignCategory;
pub use config::{ConfigError, EditorConfig};
pub use document::{Background, BackgroundFill, DocumentError, DocumentResult, DocumentState, ReorderDirection};
pub use element::{
    clone_element, create_element, Element, ElementError, ElementId, ElementKind, ElementPatch,
    ElementResult, ElementStyle, SerializableColor, ShapeType, StylePatch,
};
pub use history::{History, HistoryError, HistoryResult};
pub use services::{
    require_session, BoxFuture, ServiceError, ServiceResult, SessionProvider, UploadService, UserSession,
};
pub use storage::{DesignRecord, DesignStore, DesignSummary, StorageError, StorageResult};
pub use template::{BuiltinCatalog, ElementDescriptor, ImageRequest, Materialized, Template, TemplateCatalog};
