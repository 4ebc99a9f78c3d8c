//! Document edits driven through the undo history.

use kurbo::{Point, Vec2};
use posterkit_core::element::{StylePatch, TextStyle};
use posterkit_core::{
    clone_element, create_element, DocumentState, Element, ElementPatch, History, HistoryError,
    ReorderDirection, ShapeType,
};
use std::collections::HashSet;

fn font_size(document: &DocumentState, index: usize) -> f64 {
    document.elements()[index].text_style().map(|s| s.font_size).unwrap_or_default()
}

#[test]
fn test_hello_font_size_undo() {
    let mut document = DocumentState::default();
    let mut history = History::new(document.clone());

    let hello = Element::text("Hello");
    let id = hello.id();
    document = document.add_element(hello).unwrap();
    history.record(document.clone());

    let patch = ElementPatch::style(StylePatch::default().with_font_size(40.0));
    document = document.update_element(id, &patch).unwrap();
    history.record(document.clone());
    assert!((font_size(&document, 0) - 40.0).abs() < f64::EPSILON);

    document = history.undo().unwrap().clone();
    assert_eq!(document.len(), 1);
    let style = document.element(id).and_then(Element::text_style).unwrap();
    assert_eq!(style.content, "Hello");
    assert!((style.font_size - TextStyle::DEFAULT_FONT_SIZE).abs() < f64::EPSILON);
}

#[test]
fn test_edits_keep_unique_ids_and_insertion_order() {
    let mut document = DocumentState::default();
    let mut ids = Vec::new();
    for i in 0..12 {
        let element = match i % 3 {
            0 => Element::text(format!("Line {}", i)),
            1 => Element::shape(ShapeType::Star),
            _ => Element::image("/placeholder-image.jpg"),
        };
        ids.push(element.id());
        document = document.add_element(element).unwrap();
    }

    let moved = ElementPatch::new().with_position(Point::new(5.0, 5.0));
    document = document.update_element(ids[4], &moved).unwrap();
    let (first, eighth) = (ids[0], ids[7]);
    document = document.remove_element(eighth);
    document = document.remove_element(first);
    ids.retain(|id| *id != first && *id != eighth);

    let actual: Vec<_> = document.elements().iter().map(Element::id).collect();
    assert_eq!(actual, ids);
    let unique: HashSet<_> = actual.iter().collect();
    assert_eq!(unique.len(), actual.len());

    document = document.reorder_element(ids[1], ReorderDirection::Down);
    assert_eq!(document.elements()[0].id(), ids[1]);
}

#[test]
fn test_undo_after_record_discards_redo_branch() {
    let s0 = DocumentState::default();
    let s1 = s0.add_element(Element::text("one")).unwrap();
    let s2 = s1.add_element(Element::text("two")).unwrap();
    let s3 = s1.add_element(Element::shape(ShapeType::Circle)).unwrap();

    let mut history = History::new(s0.clone());
    history.record(s1.clone());
    history.record(s2);
    history.undo().unwrap();
    history.record(s3.clone());

    assert_eq!(history.redo(), Err(HistoryError::AtNewest));
    assert_eq!(history.len(), 3);
    assert_eq!(history.current(), Some(&s3));
    assert_eq!(history.undo().unwrap(), &s1);
    assert_eq!(history.undo().unwrap(), &s0);
    assert_eq!(history.undo(), Err(HistoryError::AtOldest));
}

#[test]
fn test_undo_redo_round_trip() {
    let s0 = DocumentState::default();
    let s1 = s0.add_element(Element::text("a")).unwrap();
    let mut history = History::new(s0);
    history.record(s1.clone());

    history.undo().unwrap();
    assert_eq!(history.redo().unwrap(), &s1);
}

#[test]
fn test_clone_shifts_position_and_keeps_style() {
    let original = create_element(
        "shape",
        &ElementPatch::style(StylePatch::default().with_shape_type(ShapeType::Triangle))
            .with_position(Point::new(40.0, 60.0)),
    )
    .unwrap();

    let copy = clone_element(&original, Vec2::new(20.0, -10.0));
    assert_ne!(copy.id(), original.id());
    assert_eq!(copy.position, Point::new(60.0, 50.0));
    assert_eq!(copy.style(), original.style());
}

#[test]
fn test_removing_absent_id_changes_nothing() {
    let document = DocumentState::default().add_element(Element::text("kept")).unwrap();
    let stray = Element::text("never added");

    assert_eq!(document.remove_element(stray.id()), document);
}
