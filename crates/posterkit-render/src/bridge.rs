//! Render bridge: keeps a surface in step with the document.
//!
//! The bridge owns the surface through a [`SurfaceLifecycle`] and is the only
//! code that touches it. Document state flows in through [`RenderBridge::sync`]
//! and [`RenderBridge::rebuild`]; user manipulation flows out through
//! [`RenderBridge::poll_gestures`].
//!
//! Image elements appear on the surface only once their resource has been
//! resolved. Loads are held as a set of local tasks polled by
//! [`RenderBridge::run_pending`], and every completion re-checks that the
//! surface is still mounted before mutating anything.

use crate::lifecycle::{LifecycleState, SurfaceLifecycle};
use crate::resources::{ImageResolver, ImageResource, ResourceError, ResourceResult};
use crate::surface::{
    BackgroundLayer, NodeHandle, Overlays, RasterFormat, SceneNode, Surface, SurfaceError,
    SurfaceEvent, SurfaceResult,
};
use futures::future::{FutureExt, LocalBoxFuture};
use futures::stream::{FuturesUnordered, StreamExt};
use futures::task::{waker, ArcWake};
use kurbo::{Point, Size};
use posterkit_core::document::BackgroundFill;
use posterkit_core::element::ElementId;
use posterkit_core::{DocumentState, EditorConfig, Element, ImageRequest};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

/// Surface policy taken from the editor configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BridgeSettings {
    pub grid_spacing: f64,
    pub bleed: f64,
    pub default_image_scale: f64,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self::from(&EditorConfig::default())
    }
}

impl From<&EditorConfig> for BridgeSettings {
    fn from(config: &EditorConfig) -> Self {
        Self {
            grid_spacing: config.grid_spacing,
            bleed: config.bleed,
            default_image_scale: config.default_image_scale,
        }
    }
}

/// A completed user manipulation, addressed by element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    Select(ElementId),
    Deselect,
    Move { id: ElementId, position: Point },
    Resize { id: ElementId, size: Size },
    Rotate { id: ElementId, delta: f64 },
}

impl Gesture {
    /// Whether the gesture edits the document (as opposed to selection).
    pub fn is_edit(&self) -> bool {
        !matches!(self, Gesture::Select(_) | Gesture::Deselect)
    }
}

/// An image source that could not be resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadFailure {
    pub source: String,
    pub error: ResourceError,
}

struct BridgeInner<S> {
    lifecycle: SurfaceLifecycle<S>,
    /// Last document pushed to the surface.
    document: DocumentState,
    /// Surface nodes in document order. Images still loading are absent.
    nodes: Vec<(ElementId, NodeHandle)>,
    selected: Option<ElementId>,
    resources: HashMap<String, ImageResource>,
    in_flight: HashSet<String>,
    failed: HashSet<String>,
    failures: Vec<LoadFailure>,
    /// Current image request generation; older completions are stale.
    generation: u64,
    requests_pending: usize,
    arrivals: Vec<Element>,
    overlays: Overlays,
    zoom: f64,
    settings: BridgeSettings,
}

impl<S: Surface> BridgeInner<S> {
    fn node_for(&self, element: &Element) -> Option<SceneNode> {
        match element.image_style() {
            Some(style) => self
                .resources
                .get(&style.source)
                .map(|resource| SceneNode::image(element, resource.clone())),
            None => SceneNode::from_element(element),
        }
    }

    fn position_of(&self, id: ElementId) -> Option<usize> {
        self.nodes.iter().position(|(other, _)| *other == id)
    }

    fn element_for(&self, handle: NodeHandle) -> Option<ElementId> {
        self.nodes.iter().find(|(_, h)| *h == handle).map(|(id, _)| *id)
    }

    /// Image sources referenced by the document that still need fetching.
    fn missing_sources(&self) -> Vec<String> {
        let background = self.document.background().image.as_deref();
        let mut sources = Vec::new();
        let referenced = self
            .document
            .elements()
            .iter()
            .filter_map(|e| e.image_style().map(|s| s.source.as_str()))
            .chain(background);
        for source in referenced {
            let known = self.resources.contains_key(source)
                || self.in_flight.contains(source)
                || self.failed.contains(source);
            if !known && !sources.iter().any(|s| s == source) {
                sources.push(source.to_string());
            }
        }
        sources
    }

    /// Insert a node at the surface index matching its document position.
    fn insert_in_order(&mut self, id: ElementId, node: SceneNode) {
        let Some(doc_index) = self.document.index_of(id) else {
            return;
        };
        let index = self
            .nodes
            .iter()
            .filter(|(other, _)| self.document.index_of(*other).is_some_and(|i| i < doc_index))
            .count();
        if let Some(handle) = self.lifecycle.with_live(|surface| surface.insert_node(index, node)) {
            self.nodes.insert(index, (id, handle));
        }
    }

    fn remove_at(&mut self, position: usize) {
        let (_, handle) = self.nodes.remove(position);
        self.lifecycle.with_live(|surface| surface.remove_node(handle));
    }

    fn rebuild(&mut self, state: &DocumentState) {
        let resized = self.document.canvas_size() != state.canvas_size();
        self.document = state.clone();
        if resized {
            let size = state.canvas_size();
            self.lifecycle.with_live(|surface| surface.set_size(size));
            self.apply_guides();
        }
        let nodes: Vec<(ElementId, SceneNode)> = state
            .elements()
            .iter()
            .filter_map(|e| self.node_for(e).map(|node| (e.id(), node)))
            .collect();
        self.nodes = self
            .lifecycle
            .with_live(|surface| {
                surface.clear_nodes();
                nodes
                    .into_iter()
                    .enumerate()
                    .map(|(index, (id, node))| (id, surface.insert_node(index, node)))
                    .collect()
            })
            .unwrap_or_default();
        self.apply_background();
        self.apply_selection();
    }

    fn sync(&mut self, state: &DocumentState) {
        let previous = std::mem::replace(&mut self.document, state.clone());

        let stale: Vec<usize> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, (id, _))| !state.contains(*id))
            .map(|(position, _)| position)
            .collect();
        for position in stale.into_iter().rev() {
            self.remove_at(position);
        }

        let in_order = self
            .nodes
            .windows(2)
            .all(|pair| state.index_of(pair[0].0) < state.index_of(pair[1].0));
        if !in_order {
            self.rebuild(state);
            return;
        }

        for element in state.elements() {
            let id = element.id();
            match self.position_of(id) {
                Some(position) if previous.element(id) != Some(element) => {
                    match self.node_for(element) {
                        Some(node) => {
                            let handle = self.nodes[position].1;
                            let updated = self
                                .lifecycle
                                .with_live(|surface| surface.update_node(handle, node));
                            if let Some(Err(e)) = updated {
                                log::warn!("Failed to update scene node: {}", e);
                            }
                        }
                        // Image whose new source is not loaded yet.
                        None => self.remove_at(position),
                    }
                }
                Some(_) => {}
                None => {
                    if let Some(node) = self.node_for(element) {
                        self.insert_in_order(id, node);
                    }
                }
            }
        }

        if previous.background() != state.background() || previous.canvas_size() != state.canvas_size() {
            self.apply_background();
        }
        if previous.canvas_size() != state.canvas_size() {
            let size = state.canvas_size();
            self.lifecycle.with_live(|surface| surface.set_size(size));
            self.apply_guides();
        }
        self.apply_selection();
    }

    fn apply_background(&mut self) {
        let background = self.document.background();
        let layer = match background.fill() {
            BackgroundFill::Image(source) => match self.resources.get(source) {
                Some(resource) => BackgroundLayer::Image {
                    resource: resource.clone(),
                    size: self.document.canvas_size(),
                },
                None => BackgroundLayer::Color(background.color.into()),
            },
            BackgroundFill::Color(color) => BackgroundLayer::Color(color.into()),
        };
        self.lifecycle.with_live(|surface| surface.set_background(layer));
    }

    fn apply_guides(&mut self) {
        let guides = self.overlays.guides(
            self.document.canvas_size(),
            self.settings.grid_spacing,
            self.settings.bleed,
        );
        self.lifecycle.with_live(|surface| surface.set_guides(guides));
    }

    fn apply_selection(&mut self) {
        if self.selected.is_some_and(|id| !self.document.contains(id)) {
            self.selected = None;
        }
        let handle = self
            .selected
            .and_then(|id| self.position_of(id))
            .map(|position| self.nodes[position].1);
        self.lifecycle.with_live(|surface| surface.set_active(handle));
    }

    fn record_failure(&mut self, source: String, error: ResourceError) {
        log::warn!("Failed to load image {}: {}", source, error);
        self.failed.insert(source.clone());
        self.failures.push(LoadFailure { source, error });
    }

    /// Completion of a load started for an element already in the document.
    fn resource_ready(&mut self, source: String, result: ResourceResult<ImageResource>) {
        self.in_flight.remove(&source);
        if !self.lifecycle.is_live() {
            log::debug!("Discarding image {} resolved after surface disposal", source);
            return;
        }
        let resource = match result {
            Ok(resource) => resource,
            Err(e) => return self.record_failure(source, e),
        };
        self.resources.insert(source.clone(), resource);

        let waiting: Vec<(ElementId, SceneNode)> = self
            .document
            .elements()
            .iter()
            .filter(|e| e.image_style().is_some_and(|s| s.source == source))
            .filter(|e| self.position_of(e.id()).is_none())
            .filter_map(|e| self.node_for(e).map(|node| (e.id(), node)))
            .collect();
        for (id, node) in waiting {
            self.insert_in_order(id, node);
        }
        if self.document.background().image.as_deref() == Some(source.as_str()) {
            self.apply_background();
        }
        self.apply_selection();
    }

    /// Completion of a requested image; the element is not in the document
    /// yet.
    fn requested_image_ready(
        &mut self,
        generation: u64,
        request: ImageRequest,
        result: ResourceResult<ImageResource>,
    ) {
        if !self.lifecycle.is_live() {
            log::debug!("Discarding image {} resolved after surface disposal", request.source);
            return;
        }
        if generation != self.generation {
            log::debug!("Discarding image {} from a superseded load", request.source);
            return;
        }
        self.requests_pending = self.requests_pending.saturating_sub(1);
        match result {
            Ok(resource) => {
                let element = request.to_element(resource.natural_size(), self.settings.default_image_scale);
                self.resources.insert(request.source, resource);
                self.arrivals.push(element);
            }
            Err(e) => self.record_failure(request.source, e),
        }
    }
}

/// Adapter between document state and a retained-mode surface.
pub struct RenderBridge<S: Surface + 'static> {
    inner: Rc<RefCell<BridgeInner<S>>>,
    tasks: FuturesUnordered<LocalBoxFuture<'static, ()>>,
    woken: Arc<WakeFlag>,
    resolver: Rc<dyn ImageResolver>,
}

impl<S: Surface + 'static> RenderBridge<S> {
    pub fn new(resolver: Rc<dyn ImageResolver>, settings: BridgeSettings) -> Self {
        let inner = BridgeInner {
            lifecycle: SurfaceLifecycle::new(),
            document: DocumentState::default(),
            nodes: Vec::new(),
            selected: None,
            resources: HashMap::new(),
            in_flight: HashSet::new(),
            failed: HashSet::new(),
            failures: Vec::new(),
            generation: 0,
            requests_pending: 0,
            arrivals: Vec::new(),
            overlays: Overlays::default(),
            zoom: 1.0,
            settings,
        };
        Self {
            inner: Rc::new(RefCell::new(inner)),
            tasks: FuturesUnordered::new(),
            woken: Arc::new(WakeFlag::default()),
            resolver,
        }
    }

    /// Take ownership of `surface` and populate it from `initial`.
    pub fn mount(&mut self, surface: S, initial: &DocumentState) -> SurfaceResult<()> {
        {
            let mut inner = self.inner.borrow_mut();
            inner.lifecycle.mount(surface)?;
            let zoom = inner.zoom;
            let size = initial.canvas_size();
            inner.lifecycle.with_live(|surface| {
                surface.set_size(size);
                surface.set_zoom(zoom);
            });
            inner.document = initial.clone();
            inner.apply_guides();
            inner.rebuild(initial);
        }
        self.request_missing();
        Ok(())
    }

    /// Dispose the surface. Safe to call any number of times.
    pub fn unmount(&mut self) -> bool {
        let mut inner = self.inner.borrow_mut();
        let disposed = inner.lifecycle.dispose();
        if disposed {
            inner.nodes.clear();
            inner.selected = None;
            inner.arrivals.clear();
            inner.requests_pending = 0;
        }
        disposed
    }

    pub fn state(&self) -> LifecycleState {
        self.inner.borrow().lifecycle.state()
    }

    pub fn is_live(&self) -> bool {
        self.inner.borrow().lifecycle.is_live()
    }

    /// Reconcile the surface with `state`, touching only what changed.
    pub fn sync(&mut self, state: &DocumentState) {
        self.inner.borrow_mut().sync(state);
        self.request_missing();
    }

    /// Clear the surface and re-add everything in `state`.
    pub fn rebuild(&mut self, state: &DocumentState) {
        self.inner.borrow_mut().rebuild(state);
        self.request_missing();
    }

    pub fn selected(&self) -> Option<ElementId> {
        self.inner.borrow().selected
    }

    /// Select an element. Returns false if it is not in the synced document.
    pub fn select(&mut self, id: ElementId) -> bool {
        let mut inner = self.inner.borrow_mut();
        if !inner.document.contains(id) {
            return false;
        }
        inner.selected = Some(id);
        inner.apply_selection();
        true
    }

    pub fn deselect(&mut self) {
        let mut inner = self.inner.borrow_mut();
        inner.selected = None;
        inner.apply_selection();
    }

    pub fn overlays(&self) -> Overlays {
        self.inner.borrow().overlays
    }

    pub fn set_overlays(&mut self, overlays: Overlays) {
        let mut inner = self.inner.borrow_mut();
        inner.overlays = overlays;
        inner.apply_guides();
    }

    pub fn zoom(&self) -> f64 {
        self.inner.borrow().zoom
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        let mut inner = self.inner.borrow_mut();
        inner.zoom = zoom.max(0.01);
        let zoom = inner.zoom;
        inner.lifecycle.with_live(|surface| surface.set_zoom(zoom));
    }

    /// Drain surface events and translate them into gestures.
    ///
    /// Selection changes are applied here; edits are returned for the caller
    /// to turn into document mutations.
    pub fn poll_gestures(&mut self) -> Vec<Gesture> {
        let mut inner = self.inner.borrow_mut();
        let events = inner
            .lifecycle
            .with_live(|surface| surface.poll_events())
            .unwrap_or_default();

        let mut gestures = Vec::with_capacity(events.len());
        for event in events {
            let gesture = match event {
                SurfaceEvent::Selected(node) => inner.element_for(node).map(Gesture::Select),
                SurfaceEvent::Deselected => Some(Gesture::Deselect),
                SurfaceEvent::Moved { node, position } => {
                    inner.element_for(node).map(|id| Gesture::Move { id, position })
                }
                SurfaceEvent::Resized { node, size } => {
                    inner.element_for(node).map(|id| Gesture::Resize { id, size })
                }
                SurfaceEvent::Rotated { node, delta } => {
                    inner.element_for(node).map(|id| Gesture::Rotate { id, delta })
                }
            };
            match gesture {
                Some(Gesture::Select(id)) => {
                    inner.selected = Some(id);
                    inner.apply_selection();
                }
                Some(Gesture::Deselect) => {
                    inner.selected = None;
                    inner.apply_selection();
                }
                Some(_) => {}
                None => log::debug!("Ignoring event for unknown node: {:?}", event),
            }
            gestures.extend(gesture);
        }
        gestures
    }

    /// Invalidate every image request still in flight.
    ///
    /// Called when a new template replaces the document, so images of the
    /// previous template never land in the new one.
    pub fn supersede_image_requests(&mut self) -> u64 {
        let mut inner = self.inner.borrow_mut();
        inner.generation += 1;
        inner.requests_pending = 0;
        inner.arrivals.clear();
        inner.generation
    }

    /// Start resolving images that are not in the document yet.
    ///
    /// Resolved images are turned into elements and collected by
    /// [`RenderBridge::take_arrivals`] in completion order.
    pub fn fetch_images(&mut self, requests: Vec<ImageRequest>) {
        let generation = {
            let mut inner = self.inner.borrow_mut();
            if !inner.lifecycle.is_live() {
                return;
            }
            inner.requests_pending += requests.len();
            inner.generation
        };

        for request in requests {
            let future = self.resolver.resolve(&request.source);
            let weak = Rc::downgrade(&self.inner);
            let source = request.source.clone();
            let task = async move {
                let result = future.await;
                with_inner(&weak, &request.source, |inner| {
                    inner.requested_image_ready(generation, request.clone(), result)
                });
            };
            log::debug!("Requested image {}", source);
            self.tasks.push(task.boxed_local());
        }
    }

    /// Drive outstanding image loads as far as they can go without blocking.
    ///
    /// Polls in place rather than entering an executor, so it is safe to call
    /// from async code.
    pub fn run_pending(&mut self) {
        let waker = waker(self.woken.clone());
        let mut cx = Context::from_waker(&waker);
        loop {
            self.woken.0.store(false, Ordering::SeqCst);
            match self.tasks.poll_next_unpin(&mut cx) {
                Poll::Ready(Some(())) => continue,
                Poll::Ready(None) => break,
                Poll::Pending if self.woken.0.load(Ordering::SeqCst) => continue,
                Poll::Pending => break,
            }
        }
    }

    /// Requested image elements that are ready to be added, in completion order.
    pub fn take_arrivals(&mut self) -> Vec<Element> {
        std::mem::take(&mut self.inner.borrow_mut().arrivals)
    }

    /// Image failures since the last call.
    pub fn take_failures(&mut self) -> Vec<LoadFailure> {
        std::mem::take(&mut self.inner.borrow_mut().failures)
    }

    /// Number of image loads not yet completed.
    pub fn pending_loads(&self) -> usize {
        let inner = self.inner.borrow();
        inner.in_flight.len() + inner.requests_pending
    }

    /// Cached resource for an image source.
    pub fn resource(&self, source: &str) -> Option<ImageResource> {
        self.inner.borrow().resources.get(source).cloned()
    }

    /// Elements currently shown on the surface, in paint order.
    pub fn rendered_elements(&self) -> Vec<ElementId> {
        self.inner.borrow().nodes.iter().map(|(id, _)| *id).collect()
    }

    /// Surface node currently showing an element.
    pub fn node_handle(&self, id: ElementId) -> Option<NodeHandle> {
        let inner = self.inner.borrow();
        inner.position_of(id).map(|position| inner.nodes[position].1)
    }

    /// Inspect the mounted surface.
    pub fn with_surface<R>(&self, f: impl FnOnce(&S) -> R) -> SurfaceResult<R> {
        let inner = self.inner.borrow();
        inner.lifecycle.get().map(f)
    }

    /// Mutate the mounted surface directly, e.g. to feed it input.
    pub fn with_surface_mut<R>(&mut self, f: impl FnOnce(&mut S) -> R) -> SurfaceResult<R> {
        let mut inner = self.inner.borrow_mut();
        match inner.lifecycle.state() {
            LifecycleState::Mounted => inner.lifecycle.with_live(f).ok_or(SurfaceError::NotMounted),
            LifecycleState::Uninitialized => Err(SurfaceError::NotMounted),
            LifecycleState::Disposed => Err(SurfaceError::Disposed),
        }
    }

    /// Rasterize the surface.
    pub fn export_raster(&self, format: RasterFormat) -> SurfaceResult<Vec<u8>> {
        let inner = self.inner.borrow();
        inner.lifecycle.get()?.export_raster(format)
    }

    /// Start loads for every image the synced document references but that
    /// is not cached, in flight, or known to fail.
    fn request_missing(&mut self) {
        let sources = {
            let mut inner = self.inner.borrow_mut();
            if !inner.lifecycle.is_live() {
                return;
            }
            let sources = inner.missing_sources();
            inner.in_flight.extend(sources.iter().cloned());
            sources
        };

        for source in sources {
            let future = self.resolver.resolve(&source);
            let weak = Rc::downgrade(&self.inner);
            let key = source.clone();
            let task = async move {
                let result = future.await;
                with_inner(&weak, &key, |inner| inner.resource_ready(key.clone(), result));
            };
            self.tasks.push(task.boxed_local());
        }
    }
}

impl<S: Surface + 'static> Drop for RenderBridge<S> {
    fn drop(&mut self) {
        self.unmount();
    }
}

/// Set whenever an image task is woken, so `run_pending` knows to poll again.
#[derive(Default)]
struct WakeFlag(AtomicBool);

impl ArcWake for WakeFlag {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        arc_self.0.store(true, Ordering::SeqCst);
    }
}

/// Run `f` on the bridge state if the bridge still exists.
fn with_inner<S: Surface>(
    weak: &Weak<RefCell<BridgeInner<S>>>,
    source: &str,
    f: impl FnOnce(&mut BridgeInner<S>),
) {
    match weak.upgrade() {
        Some(inner) => f(&mut inner.borrow_mut()),
        None => log::debug!("Bridge dropped before image {} resolved", source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneSurface;
    use crate::surface::{Guide, NodeContent};
    use futures::channel::oneshot;
    use image::RgbaImage;
    use posterkit_core::element::SerializableColor;
    use posterkit_core::{ElementPatch, ReorderDirection, ShapeType};
    use posterkit_core::BoxFuture;

    /// Resolver whose loads complete only when the test says so.
    #[derive(Default)]
    struct ManualResolver {
        waiting: RefCell<Vec<(String, oneshot::Sender<ResourceResult<ImageResource>>)>>,
    }

    impl ManualResolver {
        fn complete(&self, source: &str, width: u32, height: u32) {
            let resource = ImageResource::new(source, RgbaImage::new(width, height));
            self.finish(source, Ok(resource));
        }

        fn fail(&self, source: &str) {
            self.finish(source, Err(ResourceError::Io("unreachable".to_string())));
        }

        fn finish(&self, source: &str, result: ResourceResult<ImageResource>) {
            let mut waiting = self.waiting.borrow_mut();
            let index = waiting.iter().position(|(s, _)| s == source).unwrap();
            let (_, sender) = waiting.remove(index);
            sender.send(result).ok();
        }

        fn requested(&self) -> Vec<String> {
            self.waiting.borrow().iter().map(|(s, _)| s.clone()).collect()
        }
    }

    impl ImageResolver for ManualResolver {
        fn resolve(&self, source: &str) -> BoxFuture<'static, ResourceResult<ImageResource>> {
            let (sender, receiver) = oneshot::channel();
            self.waiting.borrow_mut().push((source.to_string(), sender));
            Box::pin(async move {
                receiver
                    .await
                    .unwrap_or_else(|_| Err(ResourceError::Io("cancelled".to_string())))
            })
        }
    }

    fn bridge() -> (RenderBridge<SceneSurface>, Rc<ManualResolver>) {
        let resolver = Rc::new(ManualResolver::default());
        let bridge = RenderBridge::new(resolver.clone(), BridgeSettings::default());
        (bridge, resolver)
    }

    fn surface() -> SceneSurface {
        SceneSurface::new(Size::new(400.0, 300.0))
    }

    fn document(elements: Vec<Element>) -> DocumentState {
        elements
            .into_iter()
            .fold(DocumentState::new(Size::new(400.0, 300.0)), |doc, e| {
                doc.add_element(e).unwrap()
            })
    }

    #[test]
    fn test_mount_creates_nodes_in_order() {
        let (mut bridge, _) = bridge();
        let text = Element::text("Title");
        let shape = Element::shape(ShapeType::Star);
        let ids = vec![text.id(), shape.id()];
        let doc = document(vec![text, shape]);

        bridge.mount(surface(), &doc).unwrap();

        assert_eq!(bridge.state(), LifecycleState::Mounted);
        assert_eq!(bridge.rendered_elements(), ids);
        let elements: Vec<ElementId> = bridge
            .with_surface(|s| s.nodes().map(|n| n.element).collect())
            .unwrap();
        assert_eq!(elements, ids);
    }

    #[test]
    fn test_incremental_sync() {
        let (mut bridge, _) = bridge();
        let a = Element::shape(ShapeType::Square);
        let b = Element::shape(ShapeType::Circle);
        let (a_id, b_id) = (a.id(), b.id());
        let doc = document(vec![a, b]);
        bridge.mount(surface(), &doc).unwrap();
        let handles_before = bridge.with_surface(|s| s.node_count()).unwrap();

        let moved = doc
            .update_element(a_id, &ElementPatch::new().with_position(Point::new(5.0, 6.0)))
            .unwrap()
            .remove_element(b_id);
        bridge.sync(&moved);

        assert_eq!(handles_before, 2);
        assert_eq!(bridge.rendered_elements(), vec![a_id]);
        let position = bridge
            .with_surface(|s| s.nodes().next().map(|n| n.transform.translation()))
            .unwrap()
            .unwrap();
        assert_eq!(position, kurbo::Vec2::new(5.0, 6.0));
    }

    #[test]
    fn test_sync_reorder_rebuilds() {
        let (mut bridge, _) = bridge();
        let a = Element::shape(ShapeType::Square);
        let b = Element::shape(ShapeType::Circle);
        let (a_id, b_id) = (a.id(), b.id());
        let doc = document(vec![a, b]);
        bridge.mount(surface(), &doc).unwrap();

        bridge.sync(&doc.reorder_element(a_id, ReorderDirection::Up));
        assert_eq!(bridge.rendered_elements(), vec![b_id, a_id]);
        let order: Vec<ElementId> = bridge
            .with_surface(|s| s.nodes().map(|n| n.element).collect())
            .unwrap();
        assert_eq!(order, vec![b_id, a_id]);
    }

    #[test]
    fn test_image_inserted_at_document_index_when_loaded() {
        let (mut bridge, resolver) = bridge();
        let below = Element::shape(ShapeType::Square);
        let image = Element::image("/photo.png");
        let above = Element::text("Caption");
        let ids = vec![below.id(), image.id(), above.id()];
        bridge.mount(surface(), &document(vec![below, image, above])).unwrap();

        assert_eq!(bridge.rendered_elements(), vec![ids[0], ids[2]]);
        assert_eq!(bridge.pending_loads(), 1);

        resolver.complete("/photo.png", 8, 8);
        bridge.run_pending();

        assert_eq!(bridge.rendered_elements(), ids);
        assert_eq!(bridge.pending_loads(), 0);
        assert!(bridge.resource("/photo.png").is_some());
    }

    #[test]
    fn test_cached_image_rebuild_is_synchronous() {
        let (mut bridge, resolver) = bridge();
        let image = Element::image("/photo.png");
        let doc = document(vec![image]);
        bridge.mount(surface(), &doc).unwrap();
        resolver.complete("/photo.png", 8, 8);
        bridge.run_pending();

        bridge.rebuild(&doc);
        assert_eq!(bridge.rendered_elements().len(), 1);
        assert!(resolver.requested().is_empty());
    }

    #[test]
    fn test_failed_image_is_reported_once() {
        let (mut bridge, resolver) = bridge();
        let doc = document(vec![Element::image("/missing.png"), Element::text("ok")]);
        bridge.mount(surface(), &doc).unwrap();

        resolver.fail("/missing.png");
        bridge.run_pending();
        let failures = bridge.take_failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].source, "/missing.png");

        bridge.rebuild(&doc);
        assert!(resolver.requested().is_empty());
        assert_eq!(bridge.rendered_elements().len(), 1);
    }

    #[test]
    fn test_late_image_after_unmount_touches_nothing() {
        let (mut bridge, resolver) = bridge();
        bridge.mount(surface(), &document(vec![Element::image("/slow.png")])).unwrap();

        assert!(bridge.unmount());
        resolver.complete("/slow.png", 4, 4);
        bridge.run_pending();

        assert_eq!(bridge.state(), LifecycleState::Disposed);
        assert!(bridge.rendered_elements().is_empty());
        assert!(bridge.resource("/slow.png").is_none());
        assert!(!bridge.unmount());
    }

    #[test]
    fn test_requested_images_arrive_in_completion_order() {
        let (mut bridge, resolver) = bridge();
        bridge.mount(surface(), &DocumentState::default()).unwrap();

        let request = |source: &str| ImageRequest {
            source: source.to_string(),
            position: Point::new(10.0, 10.0),
            rotation: 0.0,
            size: None,
            scale: None,
            flip_x: false,
            flip_y: false,
        };
        bridge.fetch_images(vec![request("/first.png"), request("/second.png")]);
        assert_eq!(bridge.pending_loads(), 2);

        bridge.run_pending();
        resolver.complete("/second.png", 100, 40);
        bridge.run_pending();
        resolver.complete("/first.png", 10, 10);
        bridge.run_pending();

        let arrivals = bridge.take_arrivals();
        let sources: Vec<&str> = arrivals
            .iter()
            .filter_map(|e| e.image_style().map(|s| s.source.as_str()))
            .collect();
        assert_eq!(sources, vec!["/second.png", "/first.png"]);
        // Natural size scaled by the default 0.5.
        assert_eq!(arrivals[0].size, Size::new(50.0, 20.0));
        assert_eq!(bridge.pending_loads(), 0);
    }

    #[test]
    fn test_superseded_image_requests_are_dropped() {
        let (mut bridge, resolver) = bridge();
        bridge.mount(surface(), &DocumentState::default()).unwrap();
        let request = ImageRequest {
            source: "/old.png".to_string(),
            position: Point::ZERO,
            rotation: 0.0,
            size: Some(Size::new(20.0, 20.0)),
            scale: None,
            flip_x: false,
            flip_y: false,
        };

        bridge.fetch_images(vec![request]);
        bridge.supersede_image_requests();
        resolver.complete("/old.png", 4, 4);
        bridge.run_pending();

        assert!(bridge.take_arrivals().is_empty());
    }

    #[test]
    fn test_selection_from_surface_events() {
        let (mut bridge, _) = bridge();
        let shape = Element::shape(ShapeType::Square).at(Point::new(10.0, 10.0));
        let id = shape.id();
        bridge.mount(surface(), &document(vec![shape])).unwrap();

        bridge.with_surface_mut(|s| s.click(Point::new(20.0, 20.0))).unwrap();
        assert_eq!(bridge.poll_gestures(), vec![Gesture::Select(id)]);
        assert_eq!(bridge.selected(), Some(id));
        assert!(bridge.with_surface(|s| s.active().is_some()).unwrap());

        bridge.with_surface_mut(|s| s.click(Point::new(300.0, 250.0))).unwrap();
        assert_eq!(bridge.poll_gestures(), vec![Gesture::Deselect]);
        assert_eq!(bridge.selected(), None);
        assert!(bridge.with_surface(|s| s.active().is_none()).unwrap());
    }

    #[test]
    fn test_selection_cleared_when_element_removed() {
        let (mut bridge, _) = bridge();
        let shape = Element::shape(ShapeType::Square);
        let id = shape.id();
        let doc = document(vec![shape]);
        bridge.mount(surface(), &doc).unwrap();

        assert!(bridge.select(id));
        bridge.sync(&doc.remove_element(id));
        assert_eq!(bridge.selected(), None);
        assert!(!bridge.select(id));
    }

    #[test]
    fn test_background_image_takes_precedence() {
        let (mut bridge, resolver) = bridge();
        let doc = DocumentState::new(Size::new(400.0, 300.0))
            .set_background_color(SerializableColor::rgb(0, 0, 255))
            .set_background_image("/bg.png");
        bridge.mount(surface(), &doc).unwrap();

        // Color shows while the image loads.
        assert!(bridge
            .with_surface(|s| matches!(s.background(), BackgroundLayer::Color(_)))
            .unwrap());

        resolver.complete("/bg.png", 10, 10);
        bridge.run_pending();
        let size = bridge
            .with_surface(|s| match s.background() {
                BackgroundLayer::Image { size, .. } => Some(*size),
                BackgroundLayer::Color(_) => None,
            })
            .unwrap();
        assert_eq!(size, Some(Size::new(400.0, 300.0)));

        bridge.sync(&doc.remove_background_image());
        assert!(bridge
            .with_surface(|s| matches!(s.background(), BackgroundLayer::Color(_)))
            .unwrap());
    }

    #[test]
    fn test_overlays_and_zoom_stay_on_surface() {
        let (mut bridge, _) = bridge();
        let doc = DocumentState::new(Size::new(300.0, 300.0));
        bridge.mount(surface(), &doc).unwrap();

        bridge.set_overlays(Overlays {
            folds: true,
            bleed: true,
            ..Default::default()
        });
        bridge.set_zoom(1.5);

        let guides = bridge.with_surface(|s| s.guides().to_vec()).unwrap();
        assert_eq!(guides.iter().filter(|g| matches!(g, Guide::Fold(_))).count(), 2);
        assert!(guides.iter().any(|g| matches!(g, Guide::Bleed(_))));
        assert!((bridge.with_surface(|s| s.zoom()).unwrap() - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_canvas_resize_reaches_surface() {
        let (mut bridge, _) = bridge();
        let doc = DocumentState::new(Size::new(300.0, 300.0));
        bridge.mount(surface(), &doc).unwrap();
        assert_eq!(bridge.with_surface(|s| s.size()).unwrap(), Size::new(300.0, 300.0));

        bridge.sync(&doc.set_canvas_size(Size::new(600.0, 200.0)));
        assert_eq!(bridge.with_surface(|s| s.size()).unwrap(), Size::new(600.0, 200.0));
    }

    #[test]
    fn test_updated_shape_node_content() {
        let (mut bridge, _) = bridge();
        let shape = Element::shape(ShapeType::Square);
        let id = shape.id();
        let doc = document(vec![shape]);
        bridge.mount(surface(), &doc).unwrap();

        let patch = ElementPatch::style(
            posterkit_core::StylePatch::default().with_shape_type(ShapeType::Line),
        );
        bridge.sync(&doc.update_element(id, &patch).unwrap());

        let open = bridge
            .with_surface(|s| {
                s.nodes()
                    .next()
                    .is_some_and(|n| matches!(n.content, NodeContent::Shape { fill: None, .. }))
            })
            .unwrap();
        assert!(open);
    }

    #[test]
    fn test_operations_after_unmount_are_silent() {
        let (mut bridge, _) = bridge();
        let doc = document(vec![Element::text("x")]);
        bridge.mount(surface(), &doc).unwrap();
        bridge.unmount();

        bridge.sync(&doc);
        bridge.rebuild(&doc);
        bridge.set_zoom(2.0);
        assert!(bridge.poll_gestures().is_empty());
        assert!(matches!(bridge.export_raster(RasterFormat::Png), Err(SurfaceError::Disposed)));
        assert!(matches!(bridge.mount(surface(), &doc), Err(SurfaceError::Disposed)));
    }
}
