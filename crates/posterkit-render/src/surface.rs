//! Retained-mode drawing surface abstraction.
//!
//! A surface owns a flat list of scene nodes in paint order plus a background
//! layer and non-document guides. The bridge is the only code that talks to
//! it.

use crate::resources::ImageResource;
use kurbo::{Affine, BezPath, Line, Point, Rect, Size};
use peniko::Color;
use posterkit_core::element::{ElementId, ShapeStyle, TextStyle};
use posterkit_core::Element;
use thiserror::Error;

/// Surface errors.
#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("Surface has been disposed")]
    Disposed,
    #[error("Surface is not mounted")]
    NotMounted,
    #[error("Surface is already mounted")]
    AlreadyMounted,
    #[error("Unknown scene node {0:?}")]
    UnknownNode(NodeHandle),
    #[error("Export failed: {0}")]
    Export(String),
}

/// Result type for surface operations.
pub type SurfaceResult<T> = Result<T, SurfaceError>;

/// Opaque reference to a node owned by a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle(pub u64);

/// Drawable content of a node, in element-local coordinates.
#[derive(Debug, Clone)]
pub enum NodeContent {
    Text(TextStyle),
    Shape {
        path: BezPath,
        /// `None` for open outlines such as lines.
        fill: Option<Color>,
        stroke: Option<(Color, f64)>,
    },
    Image {
        resource: ImageResource,
        flip_x: bool,
        flip_y: bool,
    },
}

/// One retained drawing object, mirroring one element.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub element: ElementId,
    /// Local box size; content is laid out in `(0, 0)..size`.
    pub size: Size,
    /// Local to canvas transform.
    pub transform: Affine,
    pub content: NodeContent,
}

impl SceneNode {
    /// Node for a text or shape element.
    ///
    /// Returns `None` for images; those need a resolved resource, see
    /// [`SceneNode::image`].
    pub fn from_element(element: &Element) -> Option<Self> {
        let content = if let Some(style) = element.text_style() {
            NodeContent::Text(style.clone())
        } else if let Some(style) = element.shape_style() {
            shape_content(style, element.effective_size())
        } else {
            return None;
        };
        Some(Self {
            element: element.id(),
            size: element.effective_size(),
            transform: element.transform(),
            content,
        })
    }

    /// Node for an image element with its resolved resource.
    pub fn image(element: &Element, resource: ImageResource) -> Self {
        let (flip_x, flip_y) = element
            .image_style()
            .map(|s| (s.flip_x, s.flip_y))
            .unwrap_or_default();
        Self {
            element: element.id(),
            size: element.effective_size(),
            transform: element.transform(),
            content: NodeContent::Image {
                resource,
                flip_x,
                flip_y,
            },
        }
    }

    /// Canvas-space bounding box of the transformed node.
    pub fn bounding_box(&self) -> Rect {
        self.transform
            .transform_rect_bbox(Rect::from_origin_size(Point::ZERO, self.size))
    }

    /// Check whether a canvas-space point lies on the node's box.
    pub fn contains(&self, point: Point) -> bool {
        let local = self.transform.inverse() * point;
        Rect::from_origin_size(Point::ZERO, self.size).contains(local)
    }
}

fn shape_content(style: &ShapeStyle, size: Size) -> NodeContent {
    let stroke = style
        .has_stroke()
        .then(|| (Color::from(style.stroke_color), style.stroke_width));
    if style.shape_type.is_closed() {
        NodeContent::Shape {
            path: style.shape_type.outline(size),
            fill: Some(Color::from(style.fill_color)),
            stroke,
        }
    } else {
        // Open outlines are drawn with the fill color as their stroke.
        let width = if style.stroke_width > 0.0 { style.stroke_width } else { 2.0 };
        NodeContent::Shape {
            path: style.shape_type.outline(size),
            fill: None,
            stroke: Some((Color::from(style.fill_color), width)),
        }
    }
}

/// What the surface paints underneath all nodes.
#[derive(Debug, Clone)]
pub enum BackgroundLayer {
    Color(Color),
    /// Image stretched over `size`.
    Image { resource: ImageResource, size: Size },
}

impl Default for BackgroundLayer {
    fn default() -> Self {
        BackgroundLayer::Color(Color::WHITE)
    }
}

/// Non-document guide drawn on top of the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Guide {
    Grid(Line),
    Fold(Line),
    Bleed(Rect),
}

/// Which guides are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Overlays {
    pub grid: bool,
    pub folds: bool,
    pub bleed: bool,
}

impl Overlays {
    /// Guides for a canvas of `size`.
    pub fn guides(&self, size: Size, grid_spacing: f64, bleed: f64) -> Vec<Guide> {
        let mut guides = Vec::new();
        if self.grid && grid_spacing > 0.0 {
            let mut x = 0.0;
            while x <= size.width {
                guides.push(Guide::Grid(Line::new((x, 0.0), (x, size.height))));
                x += grid_spacing;
            }
            let mut y = 0.0;
            while y <= size.height {
                guides.push(Guide::Grid(Line::new((0.0, y), (size.width, y))));
                y += grid_spacing;
            }
        }
        if self.folds {
            for x in [size.width / 3.0, size.width * 2.0 / 3.0] {
                guides.push(Guide::Fold(Line::new((x, 0.0), (x, size.height))));
            }
        }
        if self.bleed {
            guides.push(Guide::Bleed(
                Rect::from_origin_size(Point::ZERO, size).inflate(bleed, bleed),
            ));
        }
        guides
    }
}

/// Raster export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RasterFormat {
    #[default]
    Png,
    Jpeg,
}

impl RasterFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            RasterFormat::Png => "png",
            RasterFormat::Jpeg => "jpg",
        }
    }
}

/// User manipulation reported by a surface, in terms of its own nodes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceEvent {
    Selected(NodeHandle),
    Deselected,
    /// Drag finished with the node's top-left at `position`.
    Moved { node: NodeHandle, position: Point },
    /// Resize finished with the node's box at `size`.
    Resized { node: NodeHandle, size: Size },
    /// Rotation handle moved by `delta` degrees.
    Rotated { node: NodeHandle, delta: f64 },
}

/// A retained-mode drawing surface.
///
/// Implementations are owned exclusively by a render bridge. After
/// [`Surface::dispose`] the bridge never calls into the surface again.
pub trait Surface {
    /// Canvas size in canvas units.
    fn size(&self) -> Size;

    /// Resize the canvas. Nodes keep their canvas coordinates.
    fn set_size(&mut self, size: Size);

    /// Insert a node at `index` in paint order (clamped to the node count).
    fn insert_node(&mut self, index: usize, node: SceneNode) -> NodeHandle;

    /// Replace the content of an existing node.
    fn update_node(&mut self, handle: NodeHandle, node: SceneNode) -> SurfaceResult<()>;

    /// Remove a node. Unknown handles are ignored.
    fn remove_node(&mut self, handle: NodeHandle);

    /// Remove every node.
    fn clear_nodes(&mut self);

    fn set_background(&mut self, background: BackgroundLayer);

    fn set_guides(&mut self, guides: Vec<Guide>);

    fn set_zoom(&mut self, zoom: f64);

    /// Highlight the active node, or none.
    fn set_active(&mut self, handle: Option<NodeHandle>);

    /// Drain pending user manipulation events.
    fn poll_events(&mut self) -> Vec<SurfaceEvent>;

    /// Rasterize the current contents.
    fn export_raster(&self, format: RasterFormat) -> SurfaceResult<Vec<u8>>;

    /// Release native resources.
    fn dispose(&mut self);
}
