//! Editing session: the single owner of the live document.
//!
//! An [`EditorSession`] ties document state, undo history and a render
//! bridge together. Every document mutation goes through one commit step
//! that records a history entry and re-syncs the surface, so a user action
//! produces exactly one entry. Selection lives in the bridge and is never
//! recorded.

use crate::bridge::{BridgeSettings, Gesture, LoadFailure, RenderBridge};
use crate::lifecycle::LifecycleState;
use crate::loader::{materialize_template, SkippedEntry};
use crate::resources::ImageResolver;
use crate::surface::{Overlays, RasterFormat, Surface, SurfaceError};
use kurbo::{Point, Size};
use posterkit_core::element::{LayoutBlock, TextPreset};
use posterkit_core::history::HistoryResult;
use posterkit_core::storage::DesignStore;
use posterkit_core::{
    require_session, DesignCategory, DesignRecord, DocumentError, DocumentResult, DocumentState,
    EditorConfig, Element, ElementId, ElementPatch, History, ImageRequest, ReorderDirection,
    SerializableColor, ServiceError, SessionProvider, ShapeType, StorageError, StylePatch,
    Template, TemplateCatalog, UploadService, UserSession,
};
use std::rc::Rc;
use thiserror::Error;

/// Errors from session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Surface(#[from] SurfaceError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("No element is selected")]
    NothingSelected,
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Title given to designs that have not been named.
pub const UNTITLED: &str = "Untitled Design";

/// An open editor for one design.
pub struct EditorSession<S: Surface + 'static> {
    user: UserSession,
    config: EditorConfig,
    title: String,
    design_id: Option<String>,
    document: DocumentState,
    history: History,
    bridge: RenderBridge<S>,
    /// Bumped on every committed change.
    revision: u64,
}

impl<S: Surface + 'static> EditorSession<S> {
    /// Open a blank design on `surface`.
    ///
    /// Fails with [`ServiceError::Unauthenticated`] when there is no session.
    pub fn open<P: SessionProvider + ?Sized>(
        provider: &P,
        surface: S,
        resolver: Rc<dyn ImageResolver>,
        config: EditorConfig,
    ) -> SessionResult<Self> {
        let user = require_session(provider)?;
        let category = config.default_category;
        let document = DocumentState::for_category(category);
        let history = History::with_limit(document.clone(), config.history_limit);

        let mut bridge = RenderBridge::new(resolver, BridgeSettings::from(&config));
        bridge.mount(surface, &document)?;

        log::info!("Opened editor for {} ({})", user.email, category);
        Ok(Self {
            user,
            config,
            title: UNTITLED.to_string(),
            design_id: None,
            document,
            history,
            bridge,
            revision: 0,
        })
    }

    pub fn user(&self) -> &UserSession {
        &self.user
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// The live document.
    pub fn document(&self) -> &DocumentState {
        &self.document
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn bridge(&self) -> &RenderBridge<S> {
        &self.bridge
    }

    pub fn bridge_mut(&mut self) -> &mut RenderBridge<S> {
        &mut self.bridge
    }

    pub fn category(&self) -> DesignCategory {
        self.document.category()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// ID assigned by the last save or open.
    pub fn design_id(&self) -> Option<&str> {
        self.design_id.as_deref()
    }

    /// Changes whenever the document does.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn state(&self) -> LifecycleState {
        self.bridge.state()
    }

    /// Make `next` the live document and record it.
    ///
    /// Returns false, recording nothing, if `next` equals the live document.
    fn commit(&mut self, next: DocumentState) -> bool {
        if next == self.document {
            return false;
        }
        self.history.record(next.clone());
        self.document = next;
        self.revision += 1;
        self.bridge.sync(&self.document);
        true
    }

    fn commit_result(&mut self, next: DocumentResult<DocumentState>) -> SessionResult<bool> {
        Ok(self.commit(next?))
    }

    /// Replace the live document without recording, e.g. from history.
    fn restore(&mut self, state: DocumentState) {
        self.document = state;
        self.revision += 1;
        self.bridge.rebuild(&self.document);
    }

    /// Start over from `document` with a fresh history.
    fn replace_document(&mut self, document: DocumentState) {
        self.bridge.supersede_image_requests();
        self.bridge.deselect();
        self.history.reset(document.clone());
        self.restore(document);
    }

    // --- Element editing ---

    /// Add an element on top of the z-order.
    pub fn add_element(&mut self, element: Element) -> SessionResult<ElementId> {
        let id = element.id();
        let next = self.document.add_element(element)?;
        self.commit(next);
        Ok(id)
    }

    pub fn add_text(&mut self, content: impl Into<String>) -> SessionResult<ElementId> {
        self.add_element(Element::text(content))
    }

    pub fn add_text_preset(&mut self, preset: TextPreset) -> SessionResult<ElementId> {
        self.add_element(preset.element())
    }

    pub fn add_layout(&mut self, block: LayoutBlock) -> SessionResult<ElementId> {
        self.add_element(block.element())
    }

    pub fn add_shape(&mut self, shape_type: ShapeType) -> SessionResult<ElementId> {
        self.add_element(Element::shape(shape_type))
    }

    /// Merge `patch` into an element. Returns whether anything changed.
    pub fn update_element(&mut self, id: ElementId, patch: &ElementPatch) -> SessionResult<bool> {
        let next = self.document.update_element(id, patch);
        self.commit_result(next)
    }

    /// Remove an element. Removing an absent element changes nothing.
    pub fn remove_element(&mut self, id: ElementId) -> bool {
        let next = self.document.remove_element(id);
        self.commit(next)
    }

    pub fn reorder(&mut self, id: ElementId, direction: ReorderDirection) -> bool {
        let next = self.document.reorder_element(id, direction);
        self.commit(next)
    }

    pub fn bring_to_front(&mut self, id: ElementId) -> bool {
        let next = self.document.bring_to_front(id);
        self.commit(next)
    }

    pub fn send_to_back(&mut self, id: ElementId) -> bool {
        let next = self.document.send_to_back(id);
        self.commit(next)
    }

    // --- Canvas ---

    pub fn set_background_color(&mut self, color: SerializableColor) -> bool {
        let next = self.document.set_background_color(color);
        self.commit(next)
    }

    pub fn set_background_image(&mut self, source: impl Into<String>) -> bool {
        let next = self.document.set_background_image(source);
        self.commit(next)
    }

    pub fn remove_background_image(&mut self) -> bool {
        let next = self.document.remove_background_image();
        self.commit(next)
    }

    /// Switch category. The canvas takes the category size; elements keep
    /// their coordinates and sizes.
    pub fn set_category(&mut self, category: DesignCategory) -> bool {
        let next = self.document.set_category(category);
        self.commit(next)
    }

    /// Custom canvas size, in pixels.
    pub fn set_canvas_size(&mut self, size: Size) -> bool {
        let next = self.document.set_canvas_size(size);
        self.commit(next)
    }

    // --- Selection ---

    pub fn selected(&self) -> Option<ElementId> {
        self.bridge.selected()
    }

    /// Select an element. Returns false if it is not in the document.
    pub fn select(&mut self, id: ElementId) -> bool {
        self.bridge.select(id)
    }

    pub fn deselect(&mut self) {
        self.bridge.deselect();
    }

    /// The selected element, which is always in the document.
    pub fn selected_element(&self) -> Option<&Element> {
        self.selected().and_then(|id| self.document.element(id))
    }

    fn require_selection(&self) -> SessionResult<ElementId> {
        self.selected().ok_or(SessionError::NothingSelected)
    }

    pub fn delete_selected(&mut self) -> SessionResult<ElementId> {
        let id = self.require_selection()?;
        self.remove_element(id);
        Ok(id)
    }

    /// Copy the selection, offset by the configured amount, and select the
    /// copy.
    pub fn duplicate_selected(&mut self) -> SessionResult<ElementId> {
        let id = self.require_selection()?;
        let (next, copy) = self.document.duplicate_element(id, self.config.duplicate_offset)?;
        self.commit(next);
        self.bridge.select(copy);
        Ok(copy)
    }

    /// Rotate the selection by one rotation step.
    pub fn rotate_selected(&mut self, clockwise: bool) -> SessionResult<()> {
        let id = self.require_selection()?;
        let step = if clockwise {
            self.config.rotation_step
        } else {
            -self.config.rotation_step
        };
        self.rotate_by(id, step)?;
        Ok(())
    }

    /// Mirror the selected image.
    pub fn flip_selected(&mut self, horizontal: bool) -> SessionResult<()> {
        let id = self.require_selection()?;
        let flipped = self
            .document
            .element(id)
            .and_then(|e| e.image_style())
            .map(|style| if horizontal { style.flip_x } else { style.flip_y })
            .unwrap_or(false);
        let mut style = StylePatch::default();
        if horizontal {
            style.flip_x = Some(!flipped);
        } else {
            style.flip_y = Some(!flipped);
        }
        self.update_element(id, &ElementPatch::style(style))?;
        Ok(())
    }

    pub fn reorder_selected(&mut self, direction: ReorderDirection) -> SessionResult<()> {
        let id = self.require_selection()?;
        self.reorder(id, direction);
        Ok(())
    }

    fn rotate_by(&mut self, id: ElementId, delta: f64) -> SessionResult<bool> {
        let rotation = self
            .document
            .element(id)
            .map(|e| e.rotation)
            .ok_or(DocumentError::NotFound(id))?;
        self.update_element(id, &ElementPatch::new().with_rotation(rotation + delta))
    }

    // --- History ---

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Step back one edit. At the oldest entry nothing changes.
    pub fn undo(&mut self) -> HistoryResult<()> {
        let state = self.history.undo()?.clone();
        self.restore(state);
        Ok(())
    }

    /// Step forward one edit. At the newest entry nothing changes.
    pub fn redo(&mut self) -> HistoryResult<()> {
        let state = self.history.redo()?.clone();
        self.restore(state);
        Ok(())
    }

    // --- Surface interaction ---

    /// Apply user manipulation reported by the surface.
    ///
    /// Each completed gesture becomes one history entry. Returns the number
    /// of entries recorded.
    pub fn process_gestures(&mut self) -> usize {
        let mut recorded = 0;
        for gesture in self.bridge.poll_gestures() {
            let result = match gesture {
                Gesture::Select(_) | Gesture::Deselect => continue,
                Gesture::Move { id, position } => {
                    self.update_element(id, &ElementPatch::new().with_position(position))
                }
                Gesture::Resize { id, size } => {
                    let size = Size::new(
                        self.config.clamp_dimension(size.width),
                        self.config.clamp_dimension(size.height),
                    );
                    self.update_element(id, &ElementPatch::new().with_size(size))
                }
                Gesture::Rotate { id, delta } => self.rotate_by(id, delta),
            };
            match result {
                Ok(true) => recorded += 1,
                Ok(false) => {}
                Err(e) => log::warn!("Ignoring {:?}: {}", gesture, e),
            }
        }
        recorded
    }

    pub fn overlays(&self) -> Overlays {
        self.bridge.overlays()
    }

    /// Toggle guides. Guides are surface-only and never recorded.
    pub fn set_overlays(&mut self, overlays: Overlays) {
        self.bridge.set_overlays(overlays);
    }

    pub fn zoom(&self) -> f64 {
        self.bridge.zoom()
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.bridge.set_zoom(zoom);
    }

    /// Rasterize the current surface.
    pub fn export(&self, format: RasterFormat) -> SessionResult<Vec<u8>> {
        let bytes = self.bridge.export_raster(format)?;
        log::info!("Exported {} ({} bytes)", format.extension(), bytes.len());
        Ok(bytes)
    }

    // --- Templates and images ---

    /// Replace the document with a template.
    ///
    /// Text and shapes are added at once and become the new history
    /// baseline. Images are added by [`EditorSession::tick`] as they
    /// resolve. Entries that cannot be interpreted are skipped and returned.
    pub fn load_template(&mut self, template: &Template) -> Vec<SkippedEntry> {
        let load = materialize_template(template, &self.document);
        self.replace_document(load.document);
        self.bridge.fetch_images(load.images);
        load.skipped
    }

    /// Fetch a template from `catalog` and load it.
    pub async fn load_template_by_id<C: TemplateCatalog + ?Sized>(
        &mut self,
        catalog: &C,
        template_id: &str,
    ) -> SessionResult<Vec<SkippedEntry>> {
        let template = catalog.template(template_id).await?;
        Ok(self.load_template(&template))
    }

    /// Place an image at the configured insert position once it resolves.
    pub fn insert_image(&mut self, source: impl Into<String>) {
        let position: Point = self.config.image_insert_position;
        self.bridge.fetch_images(vec![ImageRequest {
            source: source.into(),
            position,
            rotation: 0.0,
            size: None,
            scale: None,
            flip_x: false,
            flip_y: false,
        }]);
    }

    /// Upload image bytes and insert the result.
    ///
    /// Returns the uploaded reference. A failed upload leaves the document
    /// untouched.
    pub async fn upload_image<U: UploadService + ?Sized>(
        &mut self,
        uploader: &U,
        data: Vec<u8>,
        file_name: &str,
    ) -> SessionResult<String> {
        let uploaded = uploader.upload_image(data, file_name).await?;
        log::info!("Uploaded {}", file_name);
        self.insert_image(uploaded.url.clone());
        Ok(uploaded.url)
    }

    /// Drive pending image loads and add the images that arrived.
    ///
    /// Each arrival is recorded as its own history entry. Returns the number
    /// of elements added.
    pub fn tick(&mut self) -> usize {
        self.bridge.run_pending();
        let mut added = 0;
        for element in self.bridge.take_arrivals() {
            match self.add_element(element) {
                Ok(_) => added += 1,
                Err(e) => log::error!("Failed to add loaded image: {}", e),
            }
        }
        added
    }

    /// Number of image loads still outstanding.
    pub fn pending_loads(&self) -> usize {
        self.bridge.pending_loads()
    }

    /// Image loads that failed since the last call.
    pub fn take_failures(&mut self) -> Vec<LoadFailure> {
        self.bridge.take_failures()
    }

    // --- Persistence ---

    /// Snapshot of the design for saving.
    pub fn record(&self) -> DesignRecord {
        let mut record = DesignRecord::new(&self.user.user_id, &self.title, self.document.clone());
        record.id = self.design_id.clone();
        record
    }

    /// Save the design, keeping the assigned ID for later saves.
    pub async fn save<D: DesignStore + ?Sized>(&mut self, store: &D) -> SessionResult<String> {
        let record = self.record();
        let id = store.save_design(&record).await?;
        log::info!("Saved design {} ({} elements)", id, self.document.len());
        self.design_id = Some(id.clone());
        Ok(id)
    }

    /// Open a saved design, replacing the document and history.
    ///
    /// Designs owned by another user are reported as not found.
    pub async fn open_design<D: DesignStore + ?Sized>(
        &mut self,
        store: &D,
        design_id: &str,
    ) -> SessionResult<()> {
        let record = store.load_design(design_id).await?;
        if record.owner != self.user.user_id {
            return Err(StorageError::NotFound(design_id.to_string()).into());
        }
        self.load_record(record);
        if self.design_id.is_none() {
            self.design_id = Some(design_id.to_string());
        }
        log::info!("Opened design {}", design_id);
        Ok(())
    }

    /// Replace the document with a record's contents.
    ///
    /// The record's category wins if its document disagrees.
    pub fn load_record(&mut self, record: DesignRecord) {
        let mut document = record.document;
        if document.category() != record.category {
            log::debug!("Design category {} overrides {}", record.category, document.category());
            document = document.set_category(record.category);
        }
        self.title = record.title;
        self.design_id = record.id;
        self.replace_document(document);
    }

    /// Dispose the surface. Safe to call more than once.
    pub fn close(&mut self) -> bool {
        let closed = self.bridge.unmount();
        if closed {
            log::info!("Closed editor for {}", self.user.email);
        }
        closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{ImageResource, ResourceResult};
    use crate::scene::SceneSurface;
    use crate::surface::SurfaceEvent;
    use futures::executor::block_on;
    use posterkit_core::element::TextStyle;
    use posterkit_core::services::{EmbeddingUploadService, StaticSession};
    use posterkit_core::storage::MemoryStorage;
    use posterkit_core::template::ElementDescriptor;
    use posterkit_core::{BoxFuture, BuiltinCatalog};
    use serde_json::json;

    /// Resolves every source to a 40x20 image.
    struct FixedResolver;

    impl ImageResolver for FixedResolver {
        fn resolve(&self, source: &str) -> BoxFuture<'static, ResourceResult<ImageResource>> {
            let resource = ImageResource::placeholder(source, 40, 20);
            Box::pin(async move { Ok(resource) })
        }
    }

    fn alice() -> UserSession {
        UserSession {
            user_id: "u-1".to_string(),
            email: "alice@example.com".to_string(),
            tier: Default::default(),
        }
    }

    fn session() -> EditorSession<SceneSurface> {
        let config = EditorConfig::default();
        let surface = SceneSurface::new(config.default_category.canvas_size());
        EditorSession::open(&StaticSession::signed_in(alice()), surface, Rc::new(FixedResolver), config)
            .unwrap()
    }

    fn font_size(session: &EditorSession<SceneSurface>, id: ElementId) -> f64 {
        session.document().element(id).unwrap().text_style().unwrap().font_size
    }

    #[test]
    fn test_open_requires_session() {
        let result = EditorSession::open(
            &StaticSession::signed_out(),
            SceneSurface::new(Size::new(100.0, 100.0)),
            Rc::new(FixedResolver),
            EditorConfig::default(),
        );
        assert!(matches!(result, Err(SessionError::Service(ServiceError::Unauthenticated))));
    }

    #[test]
    fn test_hello_font_size_undo() {
        let mut session = session();
        let id = session.add_text("Hello").unwrap();
        session
            .update_element(id, &ElementPatch::style(StylePatch::default().with_font_size(40.0)))
            .unwrap();
        assert!((font_size(&session, id) - 40.0).abs() < f64::EPSILON);

        session.undo().unwrap();
        assert!((font_size(&session, id) - TextStyle::DEFAULT_FONT_SIZE).abs() < f64::EPSILON);
        let text = session.document().element(id).unwrap().text_style().unwrap();
        assert_eq!(text.content, "Hello");
        assert_eq!(session.bridge().rendered_elements(), vec![id]);
    }

    #[test]
    fn test_selection_is_not_recorded() {
        let mut session = session();
        let id = session.add_shape(ShapeType::Circle).unwrap();
        let entries = session.history().len();

        assert!(session.select(id));
        session.deselect();
        session.select(id);
        assert_eq!(session.history().len(), entries);
        assert_eq!(session.selected(), Some(id));
    }

    #[test]
    fn test_noop_edits_are_not_recorded() {
        let mut session = session();
        let id = session.add_shape(ShapeType::Square).unwrap();
        let entries = session.history().len();

        assert!(!session.remove_element(ElementId::new_v4()));
        assert!(!session.reorder(id, ReorderDirection::Up));
        assert!(!session.set_background_color(SerializableColor::white()));
        assert_eq!(session.history().len(), entries);
    }

    #[test]
    fn test_update_absent_element_is_not_found() {
        let mut session = session();
        let missing = ElementId::new_v4();
        let result = session.update_element(missing, &ElementPatch::new().with_rotation(5.0));
        assert!(matches!(result, Err(SessionError::Document(DocumentError::NotFound(id))) if id == missing));
    }

    #[test]
    fn test_gestures_record_one_entry_each() {
        let mut session = session();
        let id = session.add_shape(ShapeType::Square).unwrap();
        let node = session.bridge().node_handle(id).unwrap();
        let entries = session.history().len();

        session
            .bridge_mut()
            .with_surface_mut(|s| {
                s.push_event(SurfaceEvent::Selected(node));
                s.push_event(SurfaceEvent::Moved {
                    node,
                    position: Point::new(200.0, 150.0),
                });
                s.push_event(SurfaceEvent::Resized {
                    node,
                    size: Size::new(5.0, 900.0),
                });
                s.push_event(SurfaceEvent::Rotated { node, delta: 15.0 });
            })
            .unwrap();

        assert_eq!(session.process_gestures(), 3);
        assert_eq!(session.history().len(), entries + 3);
        assert_eq!(session.selected(), Some(id));

        let element = session.document().element(id).unwrap();
        assert_eq!(element.position, Point::new(200.0, 150.0));
        assert_eq!(element.size, Size::new(30.0, 600.0));
        assert!((element.rotation - 15.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_selection_actions() {
        let mut session = session();
        assert!(matches!(session.delete_selected(), Err(SessionError::NothingSelected)));

        let id = session.add_shape(ShapeType::Star).unwrap();
        session.select(id);
        let copy = session.duplicate_selected().unwrap();
        assert_ne!(copy, id);
        assert_eq!(session.selected(), Some(copy));
        let original = session.document().element(id).unwrap().position;
        let moved = session.document().element(copy).unwrap().position;
        assert_eq!(moved, original + session.config().duplicate_offset);

        session.rotate_selected(true).unwrap();
        session.rotate_selected(true).unwrap();
        session.rotate_selected(false).unwrap();
        assert!((session.selected_element().unwrap().rotation - 10.0).abs() < f64::EPSILON);

        session.reorder_selected(ReorderDirection::Down).unwrap();
        assert_eq!(session.document().index_of(copy), Some(0));

        assert_eq!(session.delete_selected().unwrap(), copy);
        assert_eq!(session.selected(), None);
        assert_eq!(session.document().len(), 1);
    }

    #[test]
    fn test_flip_applies_to_images_only() {
        let mut session = session();
        let shape = session.add_shape(ShapeType::Square).unwrap();
        session.select(shape);
        assert!(matches!(session.flip_selected(true), Err(SessionError::Document(_))));

        let image = session.add_element(Element::image("/photo.png")).unwrap();
        session.select(image);
        session.flip_selected(true).unwrap();
        let style = session.document().element(image).unwrap().image_style().unwrap();
        assert!(style.flip_x);
        assert!(!style.flip_y);
    }

    #[test]
    fn test_category_keeps_element_geometry() {
        let mut session = session();
        let id = session.add_shape(ShapeType::Square).unwrap();
        let before = session.document().element(id).cloned();

        assert!(session.set_category(DesignCategory::SocialMediaGraphic));
        assert_eq!(session.document().canvas_size(), Size::new(1080.0, 1080.0));
        assert_eq!(session.document().element(id).cloned(), before);
        assert_eq!(
            session.bridge().with_surface(|s| s.size()).unwrap(),
            Size::new(1080.0, 1080.0)
        );
    }

    #[test]
    fn test_undo_restores_category_with_canvas() {
        let mut session = session();
        let original = session.category();
        session.set_category(DesignCategory::SocialMediaGraphic);

        session.undo().unwrap();
        assert_eq!(session.category(), original);
        assert_eq!(session.document().canvas_size(), original.canvas_size());
        let record = session.record();
        assert_eq!(record.category, original);
        assert_eq!(record.document.canvas_size(), original.canvas_size());

        session.redo().unwrap();
        assert_eq!(session.category(), DesignCategory::SocialMediaGraphic);
        assert_eq!(
            session.bridge().with_surface(|s| s.size()).unwrap(),
            Size::new(1080.0, 1080.0)
        );
    }

    #[test]
    fn test_tick_inside_async_code() {
        let mut session = session();
        let catalog = BuiltinCatalog::new().unwrap();
        let added = block_on(async {
            session.load_template_by_id(&catalog, "business-poster-1").await.unwrap();
            session.tick()
        });
        assert_eq!(added, 1);
        assert_eq!(session.pending_loads(), 0);
    }

    #[test]
    fn test_template_resets_history_and_images_arrive_later() {
        let mut session = session();
        session.add_text("scratch").unwrap();
        let template = Template {
            id: "t".to_string(),
            name: "T".to_string(),
            category: "Event Flyer".to_string(),
            preview: None,
            elements: vec![
                ElementDescriptor::new(json!({ "type": "text", "x": 10, "y": 10, "content": "Title" })),
                ElementDescriptor::new(json!({ "type": "hologram" })),
                ElementDescriptor::new(json!({ "type": "image", "x": 0, "y": 0, "src": "/a.png" })),
            ],
        };

        let skipped = session.load_template(&template);
        assert_eq!(skipped.len(), 1);
        assert_eq!(session.document().len(), 1);
        assert!(!session.can_undo());
        assert_eq!(session.pending_loads(), 1);

        assert_eq!(session.tick(), 1);
        assert_eq!(session.document().len(), 2);
        let image = &session.document().elements()[1];
        assert_eq!(image.size, Size::new(20.0, 10.0));
        assert_eq!(session.bridge().rendered_elements().len(), 2);

        session.undo().unwrap();
        assert_eq!(session.document().len(), 1);
        assert!(!session.can_undo());
    }

    #[test]
    fn test_second_template_supersedes_images() {
        let mut session = session();
        let catalog = BuiltinCatalog::new().unwrap();
        block_on(session.load_template_by_id(&catalog, "business-poster-1")).unwrap();
        block_on(session.load_template_by_id(&catalog, "event-flyer-1")).unwrap();

        assert_eq!(session.tick(), 0);
        assert!(session.document().elements().iter().all(|e| e.image_style().is_none()));
        assert_eq!(session.pending_loads(), 0);
    }

    #[test]
    fn test_upload_inserts_image() {
        let mut session = session();
        let png = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        let url = block_on(session.upload_image(&EmbeddingUploadService, png, "logo.png")).unwrap();
        assert!(url.starts_with("data:image/png"));

        assert_eq!(session.tick(), 1);
        let element = &session.document().elements()[0];
        assert_eq!(element.position, session.config().image_insert_position);
        assert_eq!(element.image_style().unwrap().source, url);
    }

    #[test]
    fn test_failed_upload_changes_nothing() {
        let mut session = session();
        let result = block_on(session.upload_image(&EmbeddingUploadService, b"text".to_vec(), "a.txt"));
        assert!(matches!(result, Err(SessionError::Service(ServiceError::Upload(_)))));
        assert_eq!(session.tick(), 0);
        assert!(session.document().is_empty());
    }

    #[test]
    fn test_save_and_open() {
        let store = MemoryStorage::new();
        let mut session = session();
        session.set_title("Spring Fair");
        let id = session.add_text("Spring Fair").unwrap();
        let design_id = block_on(session.save(&store)).unwrap();
        assert_eq!(session.design_id(), Some(design_id.as_str()));

        let mut other = self::session();
        block_on(other.open_design(&store, &design_id)).unwrap();
        assert_eq!(other.title(), "Spring Fair");
        assert!(other.document().contains(id));
        assert!(!other.can_undo());
        assert_eq!(other.bridge().rendered_elements(), vec![id]);
    }

    #[test]
    fn test_open_design_of_other_user() {
        let store = MemoryStorage::new();
        let record = DesignRecord::new("u-2", "Not yours", DocumentState::default());
        let design_id = block_on(store.save_design(&record)).unwrap();

        let mut session = session();
        let result = block_on(session.open_design(&store, &design_id));
        assert!(matches!(result, Err(SessionError::Storage(StorageError::NotFound(_)))));
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut session = session();
        session.insert_image("/late.png");

        assert!(session.close());
        assert!(!session.close());
        assert_eq!(session.state(), LifecycleState::Disposed);
        assert_eq!(session.tick(), 0);
        assert!(session.document().is_empty());
        assert!(matches!(
            session.export(RasterFormat::Png),
            Err(SessionError::Surface(SurfaceError::Disposed))
        ));
    }
}
