//! Document state: the ordered element list and canvas-level properties.
//!
//! Every mutation takes `&self` and returns a new [`DocumentState`], so the
//! history can keep independent snapshots.

use crate::category::DesignCategory;
use crate::element::{Element, ElementError, ElementId, ElementPatch, SerializableColor};
use kurbo::{Point, Size, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;
use thiserror::Error;

/// Default canvas size (US letter at 96 dpi).
pub const DEFAULT_CANVAS_SIZE: Size = Size::new(816.0, 1056.0);

/// Document errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DocumentError {
    #[error("Duplicate element id: {0}")]
    DuplicateId(ElementId),
    #[error("Element not found: {0}")]
    NotFound(ElementId),
    #[error(transparent)]
    Element(#[from] ElementError),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for document operations.
pub type DocumentResult<T> = Result<T, DocumentError>;

/// Direction for a single z-order step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReorderDirection {
    /// One step toward the front.
    Up,
    /// One step toward the back.
    Down,
}

impl FromStr for ReorderDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" | "forward" => Ok(ReorderDirection::Up),
            "down" | "backward" => Ok(ReorderDirection::Down),
            other => Err(format!("Unknown reorder direction: {}", other)),
        }
    }
}

/// Canvas background.
///
/// Color and image are stored independently; when both are set the image is
/// what gets rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Background {
    pub color: SerializableColor,
    pub image: Option<String>,
}

/// What the background actually renders as.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackgroundFill<'a> {
    Image(&'a str),
    Color(SerializableColor),
}

impl Background {
    /// The fill to render, image taking precedence over color.
    pub fn fill(&self) -> BackgroundFill<'_> {
        match &self.image {
            Some(image) => BackgroundFill::Image(image),
            None => BackgroundFill::Color(self.color),
        }
    }
}

impl Default for Background {
    fn default() -> Self {
        Self {
            color: SerializableColor::white(),
            image: None,
        }
    }
}

/// The full editable poster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentState {
    /// Elements in paint order (last is on top).
    elements: Vec<Element>,
    #[serde(default)]
    background: Background,
    /// Always the category whose size is `canvas_size`, or `Custom`.
    #[serde(default)]
    category: DesignCategory,
    canvas_size: Size,
}

impl Default for DocumentState {
    fn default() -> Self {
        Self::new(DEFAULT_CANVAS_SIZE)
    }
}

impl DocumentState {
    /// Create an empty document with the given canvas size.
    ///
    /// The category is the first preset of that size, otherwise `Custom`.
    pub fn new(canvas_size: Size) -> Self {
        Self {
            elements: Vec::new(),
            background: Background::default(),
            category: DesignCategory::for_size(canvas_size),
            canvas_size,
        }
    }

    /// Create an empty document sized for `category`.
    pub fn for_category(category: DesignCategory) -> Self {
        Self::new(Size::ZERO).set_category(category)
    }

    /// Elements in paint order.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Look up an element by ID.
    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.iter().find(|e| e.id() == id)
    }

    /// Paint-order index of an element.
    pub fn index_of(&self, id: ElementId) -> Option<usize> {
        self.elements.iter().position(|e| e.id() == id)
    }

    /// Check whether an element is present.
    pub fn contains(&self, id: ElementId) -> bool {
        self.index_of(id).is_some()
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Check if the document has no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn background(&self) -> &Background {
        &self.background
    }

    pub fn canvas_size(&self) -> Size {
        self.canvas_size
    }

    pub fn category(&self) -> DesignCategory {
        self.category
    }

    /// Topmost element under a canvas-space point.
    pub fn element_at(&self, point: Point) -> Option<&Element> {
        self.elements.iter().rev().find(|e| e.hit_test(point))
    }

    /// Append an element on top of the z-order.
    pub fn add_element(&self, element: Element) -> DocumentResult<Self> {
        if self.contains(element.id()) {
            return Err(DocumentError::DuplicateId(element.id()));
        }
        let mut next = self.clone();
        next.elements.push(element);
        Ok(next)
    }

    /// Merge `patch` into the element with the given ID.
    pub fn update_element(&self, id: ElementId, patch: &ElementPatch) -> DocumentResult<Self> {
        let index = self.index_of(id).ok_or(DocumentError::NotFound(id))?;
        let mut next = self.clone();
        next.elements[index].apply_patch(patch)?;
        Ok(next)
    }

    /// Remove an element. Removing an absent ID returns an identical state.
    pub fn remove_element(&self, id: ElementId) -> Self {
        let mut next = self.clone();
        next.elements.retain(|e| e.id() != id);
        next
    }

    /// Move an element one step in z-order. No-op at either end.
    pub fn reorder_element(&self, id: ElementId, direction: ReorderDirection) -> Self {
        let mut next = self.clone();
        if let Some(index) = self.index_of(id) {
            match direction {
                ReorderDirection::Up if index + 1 < next.elements.len() => {
                    next.elements.swap(index, index + 1);
                }
                ReorderDirection::Down if index > 0 => {
                    next.elements.swap(index, index - 1);
                }
                _ => {}
            }
        }
        next
    }

    /// Move an element to the top of the z-order.
    pub fn bring_to_front(&self, id: ElementId) -> Self {
        let mut next = self.clone();
        if let Some(index) = self.index_of(id) {
            let element = next.elements.remove(index);
            next.elements.push(element);
        }
        next
    }

    /// Move an element to the bottom of the z-order.
    pub fn send_to_back(&self, id: ElementId) -> Self {
        let mut next = self.clone();
        if let Some(index) = self.index_of(id) {
            let element = next.elements.remove(index);
            next.elements.insert(0, element);
        }
        next
    }

    /// Append a copy of an element shifted by `offset`.
    ///
    /// Returns the new state and the ID of the copy.
    pub fn duplicate_element(&self, id: ElementId, offset: Vec2) -> DocumentResult<(Self, ElementId)> {
        let original = self.element(id).ok_or(DocumentError::NotFound(id))?;
        let copy = original.duplicate(offset);
        let copy_id = copy.id();
        Ok((self.add_element(copy)?, copy_id))
    }

    pub fn set_background_color(&self, color: SerializableColor) -> Self {
        let mut next = self.clone();
        next.background.color = color;
        next
    }

    pub fn set_background_image(&self, source: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.background.image = Some(source.into());
        next
    }

    /// Explicit "remove background" action: drops the background image.
    pub fn remove_background_image(&self) -> Self {
        let mut next = self.clone();
        next.background.image = None;
        next
    }

    /// Switch category, taking its canvas size. Existing elements are not
    /// rescaled.
    pub fn set_category(&self, category: DesignCategory) -> Self {
        let size = category.canvas_size();
        let mut next = self.clone();
        next.canvas_size = Size::new(size.width.max(1.0), size.height.max(1.0));
        next.category = match category {
            DesignCategory::Custom { .. } => DesignCategory::Custom {
                width: next.canvas_size.width,
                height: next.canvas_size.height,
            },
            preset => preset,
        };
        next
    }

    /// Change the canvas size, making the category `Custom`. Existing
    /// elements are not rescaled.
    pub fn set_canvas_size(&self, size: Size) -> Self {
        self.set_category(DesignCategory::Custom {
            width: size.width,
            height: size.height,
        })
    }

    /// Empty document with the same canvas.
    pub fn cleared(&self) -> Self {
        Self {
            category: self.category,
            ..Self::new(self.canvas_size)
        }
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON, rejecting documents with repeated element IDs.
    pub fn from_json(json: &str) -> DocumentResult<Self> {
        let mut document: Self =
            serde_json::from_str(json).map_err(|e| DocumentError::Serialization(e.to_string()))?;
        document.validate()?;
        if document.category.canvas_size() != document.canvas_size {
            document.category = DesignCategory::for_size(document.canvas_size);
        }
        Ok(document)
    }

    /// Check that every element ID is unique.
    pub fn validate(&self) -> DocumentResult<()> {
        let mut seen = HashSet::with_capacity(self.elements.len());
        for element in &self.elements {
            if !seen.insert(element.id()) {
                return Err(DocumentError::DuplicateId(element.id()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{ElementKind, ShapeType, StylePatch};

    fn ids(document: &DocumentState) -> Vec<ElementId> {
        document.elements().iter().map(|e| e.id()).collect()
    }

    fn three_shapes() -> (DocumentState, [ElementId; 3]) {
        let a = Element::shape(ShapeType::Square);
        let b = Element::shape(ShapeType::Circle);
        let c = Element::shape(ShapeType::Star);
        let all = [a.id(), b.id(), c.id()];
        let doc = DocumentState::default()
            .add_element(a)
            .and_then(|d| d.add_element(b))
            .and_then(|d| d.add_element(c))
            .unwrap();
        (doc, all)
    }

    #[test]
    fn test_document_creation() {
        let doc = DocumentState::default();
        assert!(doc.is_empty());
        assert_eq!(doc.canvas_size(), DEFAULT_CANVAS_SIZE);
        assert_eq!(doc.background().color, SerializableColor::white());
    }

    #[test]
    fn test_add_appends_on_top() {
        let (doc, [a, b, c]) = three_shapes();
        assert_eq!(ids(&doc), vec![a, b, c]);
    }

    #[test]
    fn test_add_does_not_touch_original() {
        let doc = DocumentState::default();
        let next = doc.add_element(Element::text("Hello")).unwrap();
        assert!(doc.is_empty());
        assert_eq!(next.len(), 1);
    }

    #[test]
    fn test_add_duplicate_id() {
        let element = Element::text("Hello");
        let doc = DocumentState::default().add_element(element.clone()).unwrap();
        assert_eq!(
            doc.add_element(element.clone()),
            Err(DocumentError::DuplicateId(element.id()))
        );
    }

    #[test]
    fn test_update_element() {
        let element = Element::text("Hello");
        let id = element.id();
        let doc = DocumentState::default().add_element(element).unwrap();
        let patch = ElementPatch::style(StylePatch::default().with_font_size(40.0))
            .with_rotation(15.0);

        let next = doc.update_element(id, &patch).unwrap();
        let updated = next.element(id).unwrap();
        assert!((updated.text_style().unwrap().font_size - 40.0).abs() < f64::EPSILON);
        assert!((updated.rotation - 15.0).abs() < f64::EPSILON);
        assert_eq!(updated.text_style().unwrap().content, "Hello");
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let doc = DocumentState::default();
        let id = ElementId::new_v4();
        assert_eq!(
            doc.update_element(id, &ElementPatch::new().with_rotation(5.0)),
            Err(DocumentError::NotFound(id))
        );
    }

    #[test]
    fn test_update_rejects_foreign_attribute() {
        let element = Element::shape(ShapeType::Circle);
        let id = element.id();
        let doc = DocumentState::default().add_element(element).unwrap();
        let patch = ElementPatch::style(StylePatch::default().with_content("x"));
        assert!(matches!(
            doc.update_element(id, &patch),
            Err(DocumentError::Element(ElementError::AttributeMismatch { .. }))
        ));
    }

    #[test]
    fn test_remove_element() {
        let (doc, [a, b, c]) = three_shapes();
        let next = doc.remove_element(b);
        assert_eq!(ids(&next), vec![a, c]);
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let (doc, _) = three_shapes();
        let next = doc.remove_element(ElementId::new_v4());
        assert_eq!(next, doc);
    }

    #[test]
    fn test_reorder_up_and_down() {
        let (doc, [a, b, c]) = three_shapes();

        let up = doc.reorder_element(a, ReorderDirection::Up);
        assert_eq!(ids(&up), vec![b, a, c]);

        let down = doc.reorder_element(c, ReorderDirection::Down);
        assert_eq!(ids(&down), vec![a, c, b]);
    }

    #[test]
    fn test_reorder_at_boundaries_is_noop() {
        let (doc, [a, _, c]) = three_shapes();
        assert_eq!(doc.reorder_element(c, ReorderDirection::Up), doc);
        assert_eq!(doc.reorder_element(a, ReorderDirection::Down), doc);
    }

    #[test]
    fn test_front_and_back() {
        let (doc, [a, b, c]) = three_shapes();
        assert_eq!(ids(&doc.bring_to_front(a)), vec![b, c, a]);
        assert_eq!(ids(&doc.send_to_back(c)), vec![c, a, b]);
    }

    #[test]
    fn test_duplicate_element() {
        let element = Element::shape(ShapeType::Triangle).at(Point::new(10.0, 10.0));
        let id = element.id();
        let doc = DocumentState::default().add_element(element).unwrap();

        let (next, copy_id) = doc.duplicate_element(id, Vec2::new(20.0, 20.0)).unwrap();
        assert_eq!(next.len(), 2);
        assert_ne!(copy_id, id);
        assert_eq!(next.element(copy_id).unwrap().position, Point::new(30.0, 30.0));
        assert_eq!(next.index_of(copy_id), Some(1));
    }

    #[test]
    fn test_background_precedence() {
        let doc = DocumentState::default()
            .set_background_color(SerializableColor::rgb(200, 0, 0))
            .set_background_image("/bg.png");
        assert_eq!(doc.background().fill(), BackgroundFill::Image("/bg.png"));
        // The color is kept in storage.
        assert_eq!(doc.background().color, SerializableColor::rgb(200, 0, 0));

        let removed = doc.remove_background_image();
        assert_eq!(
            removed.background().fill(),
            BackgroundFill::Color(SerializableColor::rgb(200, 0, 0))
        );
    }

    #[test]
    fn test_canvas_resize_keeps_elements() {
        let element = Element::shape(ShapeType::Square).at(Point::new(700.0, 900.0));
        let id = element.id();
        let doc = DocumentState::default().add_element(element).unwrap();
        let resized = doc.set_canvas_size(Size::new(400.0, 400.0));

        assert_eq!(resized.canvas_size(), Size::new(400.0, 400.0));
        assert_eq!(resized.element(id).unwrap().position, Point::new(700.0, 900.0));
        assert_eq!(resized.category(), DesignCategory::Custom { width: 400.0, height: 400.0 });
    }

    #[test]
    fn test_category_sets_canvas_size() {
        let doc = DocumentState::default();
        assert_eq!(doc.category(), DesignCategory::PosterFlyerLetter);

        let social = doc.set_category(DesignCategory::SocialMediaGraphic);
        assert_eq!(social.canvas_size(), Size::new(1080.0, 1080.0));
        assert_eq!(social.category(), DesignCategory::SocialMediaGraphic);
        assert_eq!(social.cleared().category(), DesignCategory::SocialMediaGraphic);

        // Same size, different category: still a change.
        let event = DocumentState::for_category(DesignCategory::EventFlyer);
        assert_ne!(event, event.set_category(DesignCategory::BusinessPoster));
    }

    #[test]
    fn test_json_without_category_infers_it() {
        let json = r#"{ "elements": [], "canvas_size": { "width": 1080.0, "height": 1920.0 } }"#;
        let doc = DocumentState::from_json(json).unwrap();
        assert_eq!(doc.category(), DesignCategory::InstagramReelPost);
    }

    #[test]
    fn test_element_at_prefers_topmost() {
        let bottom = Element::shape(ShapeType::Square).at(Point::ZERO).sized(Size::new(100.0, 100.0));
        let top = Element::shape(ShapeType::Square).at(Point::new(50.0, 50.0)).sized(Size::new(100.0, 100.0));
        let top_id = top.id();
        let doc = DocumentState::default()
            .add_element(bottom)
            .and_then(|d| d.add_element(top))
            .unwrap();
        assert_eq!(doc.element_at(Point::new(75.0, 75.0)).map(|e| e.id()), Some(top_id));
        assert!(doc.element_at(Point::new(500.0, 500.0)).is_none());
    }

    #[test]
    fn test_json_round_trip() {
        let doc = DocumentState::default()
            .add_element(Element::text("Hello"))
            .and_then(|d| d.add_element(Element::image("/cat.png")))
            .and_then(|d| d.add_element(Element::new(ElementKind::Shape)))
            .unwrap()
            .set_background_image("/bg.jpg");
        let json = doc.to_json().unwrap();
        assert_eq!(DocumentState::from_json(&json).unwrap(), doc);
    }

    #[test]
    fn test_from_json_rejects_duplicate_ids() {
        let element = Element::text("Twice");
        let mut doc = DocumentState::default().add_element(element.clone()).unwrap();
        doc.elements.push(element.clone());
        let json = doc.to_json().unwrap();
        assert_eq!(
            DocumentState::from_json(&json),
            Err(DocumentError::DuplicateId(element.id()))
        );
    }
}
