//! Templates: read-only seeds for a new document.
//!
//! Template element descriptors are kept as loose JSON and only interpreted
//! when materialized, so one malformed entry cannot spoil the rest of a
//! template. Two descriptor dialects are understood: the editor's own
//! (`type`, `x`, `y`, `content`, `style`, `shapeType`) and scene dumps
//! (`left`, `top`, `text`, `src`, `fill`, `angle`, `scale`).

use crate::element::{
    Element, ElementError, ElementKind, ElementResult, FontStyle, FontWeight, PLACEHOLDER_IMAGE,
    SerializableColor, ShapeType, TextAlign, TextDecoration,
};
use crate::services::{BoxFuture, ServiceError, ServiceResult};
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const BUILTIN_TEMPLATES: &str = include_str!("../templates/builtin.json");

/// A pre-authored design seed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, alias = "previewImage", alias = "preview_image")]
    pub preview: Option<String>,
    #[serde(default)]
    pub elements: Vec<ElementDescriptor>,
}

impl Template {
    /// Parse a single template from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// An uninterpreted template element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementDescriptor(Value);

/// Result of interpreting a descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum Materialized {
    /// Ready to add to a document.
    Element(Element),
    /// Needs its image resolved before it can be sized and added.
    Image(ImageRequest),
}

/// An image element waiting for its resource.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRequest {
    pub source: String,
    pub position: Point,
    pub rotation: f64,
    /// Explicit display size, if the descriptor gave one.
    pub size: Option<Size>,
    /// Scale applied to the natural size when no explicit size is given.
    pub scale: Option<f64>,
    pub flip_x: bool,
    pub flip_y: bool,
}

impl ImageRequest {
    /// Build the element once the natural size of the image is known.
    pub fn to_element(&self, natural: Size, default_scale: f64) -> Element {
        let size = self.size.unwrap_or_else(|| {
            let scale = self.scale.unwrap_or(default_scale);
            Size::new(natural.width * scale, natural.height * scale)
        });
        let mut element = Element::image(self.source.clone()).at(self.position).sized(size);
        element.rotation = self.rotation;
        if let Some(style) = element.image_style_mut() {
            style.flip_x = self.flip_x;
            style.flip_y = self.flip_y;
        }
        element
    }
}

/// Lookup helper over a descriptor's top-level fields and its `style` map.
struct Fields<'a> {
    top: &'a Map<String, Value>,
    style: Option<&'a Map<String, Value>>,
}

impl<'a> Fields<'a> {
    /// First top-level field present among `keys`.
    fn top(&self, keys: &[&str]) -> Option<&'a Value> {
        keys.iter().find_map(|k| self.top.get(*k))
    }

    /// First style field present among `keys`, falling back to top level.
    fn styled(&self, keys: &[&str]) -> Option<&'a Value> {
        self.style
            .and_then(|style| keys.iter().find_map(|k| style.get(*k)))
            .or_else(|| self.top(keys))
    }

    fn number(&self, keys: &[&str]) -> Option<f64> {
        self.styled(keys).and_then(number)
    }

    fn text(&self, keys: &[&str]) -> Option<&'a str> {
        self.styled(keys).and_then(Value::as_str)
    }

    fn flag(&self, keys: &[&str]) -> bool {
        self.styled(keys).and_then(Value::as_bool).unwrap_or(false)
    }

    fn color(&self, keys: &[&str]) -> ElementResult<Option<SerializableColor>> {
        self.text(keys).map(SerializableColor::from_hex).transpose()
    }

    fn position(&self) -> Point {
        let x = self.top(&["x", "left"]).and_then(number).unwrap_or(0.0);
        let y = self.top(&["y", "top"]).and_then(number).unwrap_or(0.0);
        Point::new(x, y)
    }

    fn rotation(&self) -> f64 {
        self.number(&["rotation", "angle"]).unwrap_or(0.0)
    }

    fn size(&self) -> Option<Size> {
        match (self.number(&["width"]), self.number(&["height"])) {
            (Some(w), Some(h)) => Some(Size::new(w, h)),
            _ => None,
        }
    }
}

/// Numbers may be JSON numbers or strings such as `"32px"`.
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches("px").trim().parse().ok(),
        _ => None,
    }
}

/// Map a descriptor type to an element kind, treating bare shape names as shapes.
fn classify(kind: &str) -> ElementResult<(ElementKind, Option<ShapeType>)> {
    if let Ok(kind) = kind.parse::<ElementKind>() {
        return Ok((kind, None));
    }
    if kind.eq_ignore_ascii_case("rect") {
        return Ok((ElementKind::Shape, Some(ShapeType::Square)));
    }
    kind.parse::<ShapeType>()
        .map(|shape_type| (ElementKind::Shape, Some(shape_type)))
        .map_err(|_| ElementError::InvalidKind(kind.to_string()))
}

impl ElementDescriptor {
    /// Wrap a JSON value.
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// The raw JSON.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// The declared type, if any.
    pub fn kind_name(&self) -> Option<&str> {
        self.0
            .get("type")
            .or_else(|| self.0.get("kind"))
            .and_then(Value::as_str)
    }

    /// Interpret the descriptor.
    ///
    /// Fails with [`ElementError::InvalidKind`] when the type is missing or
    /// unknown, and with other element errors for malformed attributes.
    pub fn materialize(&self) -> ElementResult<Materialized> {
        let top = self
            .0
            .as_object()
            .ok_or_else(|| ElementError::InvalidKind(self.0.to_string()))?;
        let kind_name = self.kind_name().unwrap_or_default();
        let (kind, shape_type) = classify(kind_name)?;
        let fields = Fields {
            top,
            style: top.get("style").and_then(Value::as_object),
        };

        match kind {
            ElementKind::Text => text_element(&fields).map(Materialized::Element),
            ElementKind::Shape => shape_element(&fields, shape_type).map(Materialized::Element),
            ElementKind::Image => Ok(Materialized::Image(image_request(&fields))),
        }
    }
}

fn text_element(fields: &Fields<'_>) -> ElementResult<Element> {
    let content = fields.top(&["content", "text"]).and_then(Value::as_str).unwrap_or_default();
    let mut element = Element::text(content).at(fields.position());
    element.rotation = fields.rotation();
    if let Some(size) = fields.size() {
        element = element.sized(size);
    }

    let color = fields.color(&["color", "fill"])?;
    if let Some(style) = element.text_style_mut() {
        if let Some(color) = color {
            style.color = color;
        }
        if let Some(font_size) = fields.number(&["fontSize", "font_size"]) {
            style.font_size = font_size.max(1.0);
        }
        if let Some(font_family) = fields.text(&["fontFamily", "font_family"]) {
            style.font_family = font_family.to_string();
        }
        if let Some(weight) = fields.styled(&["fontWeight", "font_weight"]) {
            let weight = match weight {
                Value::Number(n) => n.to_string(),
                other => other.as_str().unwrap_or_default().to_string(),
            };
            style.font_weight = FontWeight::parse(&weight).unwrap_or_default();
        }
        if let Some(font_style) = fields.text(&["fontStyle", "font_style"]) {
            style.font_style = if font_style.eq_ignore_ascii_case("italic") {
                FontStyle::Italic
            } else {
                FontStyle::Normal
            };
        }
        if let Some(align) = fields.text(&["textAlign", "text_align"]).and_then(TextAlign::parse) {
            style.text_align = align;
        }
        if let Some(decoration) = fields.text(&["textDecoration", "text_decoration"]) {
            style.text_decoration = match decoration.trim().to_ascii_lowercase().as_str() {
                "underline" => TextDecoration::Underline,
                "line-through" | "linethrough" => TextDecoration::LineThrough,
                _ => TextDecoration::None,
            };
        }
    }
    Ok(element)
}

fn shape_element(fields: &Fields<'_>, implied: Option<ShapeType>) -> ElementResult<Element> {
    let shape_type = match fields.text(&["shapeType", "shape_type"]) {
        Some(name) => name.parse::<ShapeType>()?,
        None => implied.unwrap_or_default(),
    };
    let mut element = Element::shape(shape_type).at(fields.position());
    element.rotation = fields.rotation();
    if let Some(size) = fields.size() {
        element = element.sized(size);
    }

    let fill = fields.color(&["backgroundColor", "fill", "fillColor", "fill_color"])?;
    let stroke = fields.color(&["stroke", "strokeColor", "borderColor", "stroke_color"])?;
    if let Some(style) = element.shape_style_mut() {
        if let Some(fill) = fill {
            style.fill_color = fill;
        }
        if let Some(stroke) = stroke {
            style.stroke_color = stroke;
        }
        if let Some(width) = fields.number(&["strokeWidth", "borderWidth", "stroke_width"]) {
            style.stroke_width = width.max(0.0);
        }
    }
    Ok(element)
}

fn image_request(fields: &Fields<'_>) -> ImageRequest {
    let source = fields
        .top(&["src", "source", "content"])
        .or_else(|| fields.styled(&["src", "source"]))
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(PLACEHOLDER_IMAGE);

    ImageRequest {
        source: source.to_string(),
        position: fields.position(),
        rotation: fields.rotation(),
        size: fields.size(),
        scale: fields.top(&["scale"]).and_then(number),
        flip_x: fields.flag(&["flipX", "flip_x"]),
        flip_y: fields.flag(&["flipY", "flip_y"]),
    }
}

/// Source of templates.
#[cfg(not(target_arch = "wasm32"))]
pub trait TemplateCatalog: Send + Sync {
    /// List templates, optionally restricted to a category.
    fn list_templates(&self, category: Option<&str>) -> BoxFuture<'_, ServiceResult<Vec<Template>>>;

    /// Fetch a single template by ID.
    fn template(&self, id: &str) -> BoxFuture<'_, ServiceResult<Template>> {
        let id = id.to_string();
        Box::pin(async move {
            self.list_templates(None)
                .await?
                .into_iter()
                .find(|t| t.id == id)
                .ok_or(ServiceError::NotFound(id))
        })
    }
}

/// Source of templates (WASM version without Send + Sync).
#[cfg(target_arch = "wasm32")]
pub trait TemplateCatalog {
    /// List templates, optionally restricted to a category.
    fn list_templates(&self, category: Option<&str>) -> BoxFuture<'_, ServiceResult<Vec<Template>>>;

    /// Fetch a single template by ID.
    fn template(&self, id: &str) -> BoxFuture<'_, ServiceResult<Template>> {
        let id = id.to_string();
        Box::pin(async move {
            self.list_templates(None)
                .await?
                .into_iter()
                .find(|t| t.id == id)
                .ok_or(ServiceError::NotFound(id))
        })
    }
}

/// The templates shipped with the editor.
#[derive(Debug, Clone)]
pub struct BuiltinCatalog {
    templates: Vec<Template>,
}

impl BuiltinCatalog {
    /// Load the bundled templates.
    pub fn new() -> ServiceResult<Self> {
        let templates: Vec<Template> = serde_json::from_str(BUILTIN_TEMPLATES)
            .map_err(|e| ServiceError::Catalog(format!("Bundled templates are invalid: {}", e)))?;
        Ok(Self { templates })
    }

    /// A catalog over an arbitrary set of templates.
    pub fn from_templates(templates: Vec<Template>) -> Self {
        Self { templates }
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }
}

impl TemplateCatalog for BuiltinCatalog {
    fn list_templates(&self, category: Option<&str>) -> BoxFuture<'_, ServiceResult<Vec<Template>>> {
        let category = category.map(|c| c.trim().to_string());
        Box::pin(async move {
            Ok(self
                .templates
                .iter()
                .filter(|t| {
                    category
                        .as_deref()
                        .is_none_or(|c| t.category.eq_ignore_ascii_case(c))
                })
                .cloned()
                .collect())
        })
    }
}
