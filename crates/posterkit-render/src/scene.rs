//! Headless in-memory surface.
//!
//! Keeps the retained scene as plain data so it can be inspected, driven by
//! injected manipulation events, and rasterized with the `image` crate.
//! Text nodes are laid out but not glyph-rasterized.

use crate::surface::{
    BackgroundLayer, Guide, NodeContent, NodeHandle, RasterFormat, SceneNode, Surface,
    SurfaceError, SurfaceEvent, SurfaceResult,
};
use image::{imageops, DynamicImage, Rgba, RgbaImage};
use kurbo::{BezPath, ParamCurveNearest, Point, Shape, Size};
use peniko::Color;
use std::collections::VecDeque;
use std::io::Cursor;

const NEAREST_ACCURACY: f64 = 1e-3;

/// In-memory retained scene.
#[derive(Debug)]
pub struct SceneSurface {
    size: Size,
    nodes: Vec<(NodeHandle, SceneNode)>,
    next_handle: u64,
    background: BackgroundLayer,
    guides: Vec<Guide>,
    zoom: f64,
    active: Option<NodeHandle>,
    events: VecDeque<SurfaceEvent>,
    disposed: bool,
}

impl SceneSurface {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            nodes: Vec::new(),
            next_handle: 1,
            background: BackgroundLayer::default(),
            guides: Vec::new(),
            zoom: 1.0,
            active: None,
            events: VecDeque::new(),
            disposed: false,
        }
    }

    /// Nodes in paint order.
    pub fn nodes(&self) -> impl Iterator<Item = &SceneNode> {
        self.nodes.iter().map(|(_, node)| node)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, handle: NodeHandle) -> Option<&SceneNode> {
        self.nodes.iter().find(|(h, _)| *h == handle).map(|(_, node)| node)
    }

    /// Topmost node under a canvas-space point.
    pub fn node_at(&self, point: Point) -> Option<NodeHandle> {
        self.nodes
            .iter()
            .rev()
            .find(|(_, node)| node.contains(point))
            .map(|(handle, _)| *handle)
    }

    pub fn background(&self) -> &BackgroundLayer {
        &self.background
    }

    pub fn guides(&self) -> &[Guide] {
        &self.guides
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn active(&self) -> Option<NodeHandle> {
        self.active
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Queue a manipulation event, as a pointer handler would.
    pub fn push_event(&mut self, event: SurfaceEvent) {
        self.events.push_back(event);
    }

    /// Queue a click at a canvas-space point: selects the topmost node, or
    /// deselects when nothing is hit.
    pub fn click(&mut self, point: Point) {
        let event = match self.node_at(point) {
            Some(handle) => SurfaceEvent::Selected(handle),
            None => SurfaceEvent::Deselected,
        };
        self.push_event(event);
    }

    /// Rasterize the scene into an RGBA image at canvas resolution.
    pub fn render(&self) -> RgbaImage {
        let width = self.size.width.round().max(1.0) as u32;
        let height = self.size.height.round().max(1.0) as u32;
        let mut target = match &self.background {
            BackgroundLayer::Color(color) => RgbaImage::from_pixel(width, height, rgba(*color)),
            BackgroundLayer::Image { resource, .. } => imageops::resize(
                resource.pixels(),
                width,
                height,
                imageops::FilterType::Triangle,
            ),
        };

        for (_, node) in &self.nodes {
            draw_node(&mut target, node);
        }
        target
    }
}

fn rgba(color: Color) -> Rgba<u8> {
    let c = color.to_rgba8();
    Rgba([c.r, c.g, c.b, c.a])
}

/// Source-over blend of `src` onto `dst`.
fn blend(dst: &mut Rgba<u8>, src: Rgba<u8>) {
    let alpha = src.0[3] as f64 / 255.0;
    if alpha <= 0.0 {
        return;
    }
    let dst_alpha = dst.0[3] as f64 / 255.0;
    let out_alpha = alpha + dst_alpha * (1.0 - alpha);
    for i in 0..3 {
        let value =
            (src.0[i] as f64 * alpha + dst.0[i] as f64 * dst_alpha * (1.0 - alpha)) / out_alpha;
        dst.0[i] = value.round().clamp(0.0, 255.0) as u8;
    }
    dst.0[3] = (out_alpha * 255.0).round() as u8;
}

fn near_outline(path: &BezPath, point: Point, half_width: f64) -> bool {
    let limit = half_width * half_width;
    path.segments()
        .any(|segment| segment.nearest(point, NEAREST_ACCURACY).distance_sq <= limit)
}

fn draw_node(target: &mut RgbaImage, node: &SceneNode) {
    if matches!(node.content, NodeContent::Text(_)) {
        return;
    }
    let inverse = node.transform.inverse();
    let bbox = node.bounding_box().inflate(2.0, 2.0);
    let x0 = bbox.x0.floor().max(0.0) as u32;
    let y0 = bbox.y0.floor().max(0.0) as u32;
    let x1 = (bbox.x1.ceil().max(0.0) as u32).min(target.width());
    let y1 = (bbox.y1.ceil().max(0.0) as u32).min(target.height());

    for y in y0..y1 {
        for x in x0..x1 {
            let local = inverse * Point::new(x as f64 + 0.5, y as f64 + 0.5);
            if let Some(color) = sample(node, local) {
                blend(target.get_pixel_mut(x, y), color);
            }
        }
    }
}

/// Color of a node at a local-space point, if it covers it.
fn sample(node: &SceneNode, local: Point) -> Option<Rgba<u8>> {
    match &node.content {
        NodeContent::Text(_) => None,
        NodeContent::Shape { path, fill, stroke } => {
            if let Some((color, width)) = stroke {
                if *width > 0.0 && near_outline(path, local, width / 2.0) {
                    return Some(rgba(*color));
                }
            }
            fill.as_ref().filter(|_| path.contains(local)).map(|c| rgba(*c))
        }
        NodeContent::Image {
            resource,
            flip_x,
            flip_y,
        } => {
            if local.x < 0.0 || local.y < 0.0 || local.x >= node.size.width || local.y >= node.size.height {
                return None;
            }
            let pixels = resource.pixels();
            let mut u = local.x / node.size.width;
            let mut v = local.y / node.size.height;
            if *flip_x {
                u = 1.0 - u;
            }
            if *flip_y {
                v = 1.0 - v;
            }
            let px = ((u * pixels.width() as f64) as u32).min(pixels.width().saturating_sub(1));
            let py = ((v * pixels.height() as f64) as u32).min(pixels.height().saturating_sub(1));
            Some(*pixels.get_pixel(px, py))
        }
    }
}

impl Surface for SceneSurface {
    fn size(&self) -> Size {
        self.size
    }

    fn set_size(&mut self, size: Size) {
        self.size = size;
    }

    fn insert_node(&mut self, index: usize, node: SceneNode) -> NodeHandle {
        let handle = NodeHandle(self.next_handle);
        self.next_handle += 1;
        let index = index.min(self.nodes.len());
        self.nodes.insert(index, (handle, node));
        handle
    }

    fn update_node(&mut self, handle: NodeHandle, node: SceneNode) -> SurfaceResult<()> {
        let slot = self
            .nodes
            .iter_mut()
            .find(|(h, _)| *h == handle)
            .ok_or(SurfaceError::UnknownNode(handle))?;
        slot.1 = node;
        Ok(())
    }

    fn remove_node(&mut self, handle: NodeHandle) {
        self.nodes.retain(|(h, _)| *h != handle);
        if self.active == Some(handle) {
            self.active = None;
        }
    }

    fn clear_nodes(&mut self) {
        self.nodes.clear();
        self.active = None;
    }

    fn set_background(&mut self, background: BackgroundLayer) {
        self.background = background;
    }

    fn set_guides(&mut self, guides: Vec<Guide>) {
        self.guides = guides;
    }

    fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom;
    }

    fn set_active(&mut self, handle: Option<NodeHandle>) {
        self.active = handle;
    }

    fn poll_events(&mut self) -> Vec<SurfaceEvent> {
        self.events.drain(..).collect()
    }

    fn export_raster(&self, format: RasterFormat) -> SurfaceResult<Vec<u8>> {
        if self.disposed {
            return Err(SurfaceError::Disposed);
        }
        let rendered = DynamicImage::ImageRgba8(self.render());
        let (image, format) = match format {
            RasterFormat::Png => (rendered, image::ImageFormat::Png),
            // JPEG has no alpha channel.
            RasterFormat::Jpeg => (DynamicImage::ImageRgb8(rendered.to_rgb8()), image::ImageFormat::Jpeg),
        };
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), format)
            .map_err(|e| SurfaceError::Export(e.to_string()))?;
        Ok(bytes)
    }

    fn dispose(&mut self) {
        self.nodes.clear();
        self.events.clear();
        self.guides.clear();
        self.active = None;
        self.disposed = true;
    }
}
