//! Shape element attributes and outlines.

use super::{ElementError, SerializableColor, StylePatch};
use kurbo::{BezPath, Circle, Ellipse, Line, Point, Rect, Shape as KurboShape, Size};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

/// Tolerance used when flattening curved outlines.
const PATH_TOLERANCE: f64 = 0.1;

/// Kinds of vector shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeType {
    #[default]
    Square,
    Circle,
    Triangle,
    Star,
    Rectangle,
    Line,
    Ellipse,
}

impl ShapeType {
    /// Name as used in templates.
    pub fn name(&self) -> &'static str {
        match self {
            ShapeType::Square => "square",
            ShapeType::Circle => "circle",
            ShapeType::Triangle => "triangle",
            ShapeType::Star => "star",
            ShapeType::Rectangle => "rectangle",
            ShapeType::Line => "line",
            ShapeType::Ellipse => "ellipse",
        }
    }

    /// All shape types.
    pub fn all() -> &'static [ShapeType] {
        &[
            ShapeType::Square,
            ShapeType::Circle,
            ShapeType::Triangle,
            ShapeType::Star,
            ShapeType::Rectangle,
            ShapeType::Line,
            ShapeType::Ellipse,
        ]
    }

    /// Outline of this shape inside a box of `size` with its origin at (0, 0).
    pub fn outline(&self, size: Size) -> BezPath {
        let (w, h) = (size.width, size.height);
        match self {
            ShapeType::Square => Rect::new(0.0, 0.0, w, h).to_path(PATH_TOLERANCE),
            ShapeType::Rectangle => {
                // Rectangles occupy the upper 60% of their box.
                Rect::new(0.0, 0.0, w, h * 0.6).to_path(PATH_TOLERANCE)
            }
            ShapeType::Circle => {
                let radius = w.min(h) / 2.0;
                Circle::new(Point::new(w / 2.0, h / 2.0), radius).to_path(PATH_TOLERANCE)
            }
            ShapeType::Ellipse => {
                Ellipse::from_rect(Rect::new(0.0, 0.0, w, h)).to_path(PATH_TOLERANCE)
            }
            ShapeType::Triangle => polygon(&[
                Point::new(w / 2.0, 0.0),
                Point::new(w, h),
                Point::new(0.0, h),
            ]),
            ShapeType::Star => polygon(&star_points(size)),
            ShapeType::Line => Line::new((0.0, h / 2.0), (w, h / 2.0)).to_path(PATH_TOLERANCE),
        }
    }

    /// Whether the outline encloses an area that can be filled.
    pub fn is_closed(&self) -> bool {
        !matches!(self, ShapeType::Line)
    }
}

impl fmt::Display for ShapeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ShapeType {
    type Err = ElementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ShapeType::all()
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ElementError::InvalidShapeType(s.to_string()))
    }
}

fn polygon(points: &[Point]) -> BezPath {
    let mut path = BezPath::new();
    if let Some((first, rest)) = points.split_first() {
        path.move_to(*first);
        for point in rest {
            path.line_to(*point);
        }
        path.close_path();
    }
    path
}

/// Five-pointed star alternating outer and inner vertices.
fn star_points(size: Size) -> Vec<Point> {
    let center = Point::new(size.width / 2.0, size.height / 2.0);
    let outer = Point::new(size.width / 2.0, size.height / 2.0);
    let inner = Point::new(outer.x * 0.4, outer.y * 0.4);
    (0..10)
        .map(|i| {
            let angle = -PI / 2.0 + i as f64 * PI / 5.0;
            let radius = if i % 2 == 0 { outer } else { inner };
            Point::new(
                center.x + radius.x * angle.cos(),
                center.y + radius.y * angle.sin(),
            )
        })
        .collect()
}

/// Attributes of a shape element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeStyle {
    pub shape_type: ShapeType,
    pub fill_color: SerializableColor,
    /// Stroke color; transparent means no stroke.
    pub stroke_color: SerializableColor,
    pub stroke_width: f64,
}

impl ShapeStyle {
    /// Size of a shape element created without explicit dimensions.
    pub const DEFAULT_SIZE: Size = Size::new(50.0, 50.0);

    /// Whether a stroke should be drawn.
    pub fn has_stroke(&self) -> bool {
        self.stroke_width > 0.0 && !self.stroke_color.is_transparent()
    }

    pub(super) fn apply(&mut self, patch: &StylePatch) {
        if let Some(shape_type) = patch.shape_type {
            self.shape_type = shape_type;
        }
        if let Some(fill_color) = patch.fill_color {
            self.fill_color = fill_color;
        }
        if let Some(stroke_color) = patch.stroke_color {
            self.stroke_color = stroke_color;
        }
        if let Some(stroke_width) = patch.stroke_width {
            self.stroke_width = stroke_width.max(0.0);
        }
    }
}

impl Default for ShapeStyle {
    fn default() -> Self {
        Self {
            shape_type: ShapeType::Square,
            fill_color: SerializableColor::black(),
            stroke_color: SerializableColor::transparent(),
            stroke_width: 0.0,
        }
    }
}
