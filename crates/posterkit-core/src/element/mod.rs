//! Poster elements.
//!
//! An [`Element`] is a flat value type: it never references another element,
//! and its kind is fixed by the variant of its style at construction time.

mod color;
mod image;
mod shape;
mod text;

pub use color::SerializableColor;
pub use image::{ImageFormat, ImageSource, ImageStyle, PLACEHOLDER_IMAGE};
pub use shape::{ShapeStyle, ShapeType};
pub use text::{FontStyle, FontWeight, LayoutBlock, TextAlign, TextDecoration, TextPreset, TextStyle};

use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for an element.
pub type ElementId = Uuid;

/// Position used when no position is supplied at creation.
pub const DEFAULT_POSITION: Point = Point::new(100.0, 100.0);

/// Element model errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ElementError {
    #[error("Invalid element kind: {0}")]
    InvalidKind(String),
    #[error("Attribute '{attribute}' does not apply to {kind} elements")]
    AttributeMismatch {
        kind: ElementKind,
        attribute: &'static str,
    },
    #[error("Invalid color: {0}")]
    InvalidColor(String),
    #[error("Invalid shape type: {0}")]
    InvalidShapeType(String),
}

/// Result type for element operations.
pub type ElementResult<T> = Result<T, ElementError>;

/// The variant tag of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Text,
    Image,
    Shape,
}

impl ElementKind {
    /// Name as used in serialized templates and documents.
    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::Text => "text",
            ElementKind::Image => "image",
            ElementKind::Shape => "shape",
        }
    }

    /// All element kinds.
    pub fn all() -> &'static [ElementKind] {
        &[ElementKind::Text, ElementKind::Image, ElementKind::Shape]
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ElementKind {
    type Err = ElementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "textbox" | "i-text" => Ok(ElementKind::Text),
            "image" => Ok(ElementKind::Image),
            "shape" => Ok(ElementKind::Shape),
            _ => Err(ElementError::InvalidKind(s.to_string())),
        }
    }
}

/// Kind-dependent style attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ElementStyle {
    Text(TextStyle),
    Image(ImageStyle),
    Shape(ShapeStyle),
}

impl ElementStyle {
    /// Default style for a kind.
    pub fn defaults(kind: ElementKind) -> Self {
        match kind {
            ElementKind::Text => ElementStyle::Text(TextStyle::default()),
            ElementKind::Image => ElementStyle::Image(ImageStyle::default()),
            ElementKind::Shape => ElementStyle::Shape(ShapeStyle::default()),
        }
    }

    /// The kind this style belongs to.
    pub fn kind(&self) -> ElementKind {
        match self {
            ElementStyle::Text(_) => ElementKind::Text,
            ElementStyle::Image(_) => ElementKind::Image,
            ElementStyle::Shape(_) => ElementKind::Shape,
        }
    }

    fn apply(&mut self, patch: &StylePatch) {
        match self {
            ElementStyle::Text(style) => style.apply(patch),
            ElementStyle::Image(style) => style.apply(patch),
            ElementStyle::Shape(style) => style.apply(patch),
        }
    }
}

/// Partial style update. Fields left as `None` are untouched.
///
/// Setting a field that belongs to another kind is rejected as a whole,
/// so a patch is either applied completely or not at all.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StylePatch {
    // Text
    pub content: Option<String>,
    pub color: Option<SerializableColor>,
    pub font_size: Option<f64>,
    pub font_family: Option<String>,
    pub font_weight: Option<FontWeight>,
    pub font_style: Option<FontStyle>,
    pub text_align: Option<TextAlign>,
    pub text_decoration: Option<TextDecoration>,
    // Image
    pub source: Option<String>,
    pub flip_x: Option<bool>,
    pub flip_y: Option<bool>,
    // Shape
    pub shape_type: Option<ShapeType>,
    pub fill_color: Option<SerializableColor>,
    pub stroke_color: Option<SerializableColor>,
    pub stroke_width: Option<f64>,
}

impl StylePatch {
    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self == &StylePatch::default()
    }

    /// First attribute set in this patch that a `kind` element does not have.
    pub fn foreign_attribute(&self, kind: ElementKind) -> Option<&'static str> {
        let attributes: [(&'static str, bool, ElementKind); 15] = [
            ("content", self.content.is_some(), ElementKind::Text),
            ("color", self.color.is_some(), ElementKind::Text),
            ("font_size", self.font_size.is_some(), ElementKind::Text),
            ("font_family", self.font_family.is_some(), ElementKind::Text),
            ("font_weight", self.font_weight.is_some(), ElementKind::Text),
            ("font_style", self.font_style.is_some(), ElementKind::Text),
            ("text_align", self.text_align.is_some(), ElementKind::Text),
            ("text_decoration", self.text_decoration.is_some(), ElementKind::Text),
            ("source", self.source.is_some(), ElementKind::Image),
            ("flip_x", self.flip_x.is_some(), ElementKind::Image),
            ("flip_y", self.flip_y.is_some(), ElementKind::Image),
            ("shape_type", self.shape_type.is_some(), ElementKind::Shape),
            ("fill_color", self.fill_color.is_some(), ElementKind::Shape),
            ("stroke_color", self.stroke_color.is_some(), ElementKind::Shape),
            ("stroke_width", self.stroke_width.is_some(), ElementKind::Shape),
        ];
        attributes
            .into_iter()
            .find(|(_, set, owner)| *set && *owner != kind)
            .map(|(name, _, _)| name)
    }

    /// Set the text content.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Set the font size.
    pub fn with_font_size(mut self, font_size: f64) -> Self {
        self.font_size = Some(font_size);
        self
    }

    /// Set the text color.
    pub fn with_color(mut self, color: SerializableColor) -> Self {
        self.color = Some(color);
        self
    }

    /// Set the image source.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Set the shape type.
    pub fn with_shape_type(mut self, shape_type: ShapeType) -> Self {
        self.shape_type = Some(shape_type);
        self
    }

    /// Set the shape fill color.
    pub fn with_fill_color(mut self, color: SerializableColor) -> Self {
        self.fill_color = Some(color);
        self
    }
}

/// Partial element update addressed to geometry and style.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementPatch {
    pub position: Option<Point>,
    pub size: Option<Size>,
    pub rotation: Option<f64>,
    pub style: StylePatch,
}

impl ElementPatch {
    /// Create an empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Patch containing only style changes.
    pub fn style(style: StylePatch) -> Self {
        Self {
            style,
            ..Self::default()
        }
    }

    /// Set the position.
    pub fn with_position(mut self, position: Point) -> Self {
        self.position = Some(position);
        self
    }

    /// Set the size.
    pub fn with_size(mut self, size: Size) -> Self {
        self.size = Some(size);
        self
    }

    /// Set the rotation in degrees.
    pub fn with_rotation(mut self, rotation: f64) -> Self {
        self.rotation = Some(rotation);
        self
    }

    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.position.is_none()
            && self.size.is_none()
            && self.rotation.is_none()
            && self.style.is_empty()
    }
}

/// A single visual object on the poster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub(crate) id: ElementId,
    /// Top-left anchor in canvas coordinates.
    pub position: Point,
    /// Nominal bounding box. Zero for auto-sized text.
    pub size: Size,
    /// Rotation in degrees around the element center.
    #[serde(default)]
    pub rotation: f64,
    style: ElementStyle,
}

impl Element {
    /// Create an element of `kind` with default attributes.
    pub fn new(kind: ElementKind) -> Self {
        let size = match kind {
            ElementKind::Text => Size::ZERO,
            ElementKind::Image => ImageStyle::DEFAULT_SIZE,
            ElementKind::Shape => ShapeStyle::DEFAULT_SIZE,
        };
        Self {
            id: Uuid::new_v4(),
            position: DEFAULT_POSITION,
            size,
            rotation: 0.0,
            style: ElementStyle::defaults(kind),
        }
    }

    /// Create an element of `kind` with defaults overridden by `attrs`.
    pub fn with_attrs(kind: ElementKind, attrs: &ElementPatch) -> ElementResult<Self> {
        let mut element = Self::new(kind);
        element.apply_patch(attrs)?;
        Ok(element)
    }

    /// Create a text element with the given content.
    pub fn text(content: impl Into<String>) -> Self {
        let mut element = Self::new(ElementKind::Text);
        if let ElementStyle::Text(style) = &mut element.style {
            style.content = content.into();
        }
        element
    }

    /// Create an image element referencing `source`.
    pub fn image(source: impl Into<String>) -> Self {
        let mut element = Self::new(ElementKind::Image);
        if let ElementStyle::Image(style) = &mut element.style {
            style.source = source.into();
        }
        element
    }

    /// Create a shape element of the given type.
    pub fn shape(shape_type: ShapeType) -> Self {
        let mut element = Self::new(ElementKind::Shape);
        if let ElementStyle::Shape(style) = &mut element.style {
            style.shape_type = shape_type;
        }
        element
    }

    /// Set the position.
    pub fn at(mut self, position: Point) -> Self {
        self.position = position;
        self
    }

    /// Set the size, clamping negative components to zero.
    pub fn sized(mut self, size: Size) -> Self {
        self.size = non_negative(size);
        self
    }

    /// Get the element ID.
    pub fn id(&self) -> ElementId {
        self.id
    }

    /// Get the element kind.
    pub fn kind(&self) -> ElementKind {
        self.style.kind()
    }

    /// Get the style attributes.
    pub fn style(&self) -> &ElementStyle {
        &self.style
    }

    /// Text attributes, if this is a text element.
    pub fn text_style(&self) -> Option<&TextStyle> {
        match &self.style {
            ElementStyle::Text(style) => Some(style),
            _ => None,
        }
    }

    /// Mutable text attributes, if this is a text element.
    pub fn text_style_mut(&mut self) -> Option<&mut TextStyle> {
        match &mut self.style {
            ElementStyle::Text(style) => Some(style),
            _ => None,
        }
    }

    /// Image attributes, if this is an image element.
    pub fn image_style(&self) -> Option<&ImageStyle> {
        match &self.style {
            ElementStyle::Image(style) => Some(style),
            _ => None,
        }
    }

    /// Mutable image attributes, if this is an image element.
    pub fn image_style_mut(&mut self) -> Option<&mut ImageStyle> {
        match &mut self.style {
            ElementStyle::Image(style) => Some(style),
            _ => None,
        }
    }

    /// Shape attributes, if this is a shape element.
    pub fn shape_style(&self) -> Option<&ShapeStyle> {
        match &self.style {
            ElementStyle::Shape(style) => Some(style),
            _ => None,
        }
    }

    /// Mutable shape attributes, if this is a shape element.
    pub fn shape_style_mut(&mut self) -> Option<&mut ShapeStyle> {
        match &mut self.style {
            ElementStyle::Shape(style) => Some(style),
            _ => None,
        }
    }

    /// Merge `patch` into this element.
    ///
    /// Fails without modifying anything if the patch carries attributes of
    /// a different kind.
    pub fn apply_patch(&mut self, patch: &ElementPatch) -> ElementResult<()> {
        let kind = self.kind();
        if let Some(attribute) = patch.style.foreign_attribute(kind) {
            return Err(ElementError::AttributeMismatch { kind, attribute });
        }
        if let Some(position) = patch.position {
            self.position = position;
        }
        if let Some(size) = patch.size {
            self.size = non_negative(size);
        }
        if let Some(rotation) = patch.rotation {
            self.rotation = rotation;
        }
        self.style.apply(&patch.style);
        Ok(())
    }

    /// Copy of this element with a fresh ID, shifted by `offset`.
    pub fn duplicate(&self, offset: Vec2) -> Self {
        Self {
            id: Uuid::new_v4(),
            position: self.position + offset,
            size: self.size,
            rotation: self.rotation,
            style: self.style.clone(),
        }
    }

    /// Effective size: the nominal size, or the approximate text extent for
    /// auto-sized text.
    pub fn effective_size(&self) -> Size {
        match &self.style {
            ElementStyle::Text(style) if self.size.is_zero_area() => style.approximate_size(),
            _ => self.size,
        }
    }

    /// Axis-aligned bounds before rotation.
    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.position, self.effective_size())
    }

    /// Rotation normalized to `[0, 360)`.
    pub fn normalized_rotation(&self) -> f64 {
        self.rotation.rem_euclid(360.0)
    }

    /// Transform from element-local space (origin at top-left, unrotated)
    /// to canvas space. Rotation is applied around the center.
    pub fn transform(&self) -> Affine {
        let size = self.effective_size();
        let center = Vec2::new(size.width / 2.0, size.height / 2.0);
        Affine::translate(self.position.to_vec2())
            * Affine::translate(center)
            * Affine::rotate(self.rotation.to_radians())
            * Affine::translate(-center)
    }

    /// Check whether a canvas-space point lies inside the rotated bounds.
    pub fn hit_test(&self, point: Point) -> bool {
        let local = self.transform().inverse() * point;
        Rect::from_origin_size(Point::ZERO, self.effective_size()).contains(local)
    }
}

fn non_negative(size: Size) -> Size {
    Size::new(size.width.max(0.0), size.height.max(0.0))
}

/// Create an element from a kind name and initial attributes.
pub fn create_element(kind: &str, attrs: &ElementPatch) -> ElementResult<Element> {
    let kind: ElementKind = kind.parse()?;
    Element::with_attrs(kind, attrs)
}

/// Deep copy of `element` with a new ID and position shifted by `offset`.
pub fn clone_element(element: &Element, offset: Vec2) -> Element {
    element.duplicate(offset)
}
