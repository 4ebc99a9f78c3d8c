//! Template loading.
//!
//! A template is split into the part that can be added immediately (text
//! and shapes) and image requests that must wait for their resources. An
//! entry that cannot be interpreted is logged and skipped so the rest of the
//! template still loads.

use posterkit_core::element::ElementError;
use posterkit_core::template::{Materialized, Template};
use posterkit_core::{DocumentState, ImageRequest};

/// A template entry that was skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedEntry {
    /// Position of the entry in the template.
    pub index: usize,
    pub error: ElementError,
}

/// Result of materializing a template.
#[derive(Debug, Clone)]
pub struct TemplateLoad {
    /// Document holding every immediately available element, in template order.
    pub document: DocumentState,
    /// Images to resolve, in template order.
    pub images: Vec<ImageRequest>,
    pub skipped: Vec<SkippedEntry>,
}

/// Materialize `template` on top of a cleared copy of `current`.
///
/// The canvas size of `current` is kept.
pub fn materialize_template(template: &Template, current: &DocumentState) -> TemplateLoad {
    let mut document = current.cleared();
    let mut images = Vec::new();
    let mut skipped = Vec::new();

    for (index, descriptor) in template.elements.iter().enumerate() {
        match descriptor.materialize() {
            Ok(Materialized::Element(element)) => match document.add_element(element) {
                Ok(next) => document = next,
                Err(e) => log::error!("Template {} entry {}: {}", template.id, index, e),
            },
            Ok(Materialized::Image(request)) => images.push(request),
            Err(error) => {
                log::warn!("Skipping entry {} of template {}: {}", index, template.id, error);
                skipped.push(SkippedEntry { index, error });
            }
        }
    }

    log::info!(
        "Loaded template {} ({} elements, {} images pending, {} skipped)",
        template.id,
        document.len(),
        images.len(),
        skipped.len()
    );
    TemplateLoad {
        document,
        images,
        skipped,
    }
}
