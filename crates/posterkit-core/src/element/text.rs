//! Text element attributes.

use super::{Element, ElementKind, SerializableColor, StylePatch};
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};

/// Font weight options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

impl FontWeight {
    /// Parse a CSS-like weight (`bold`, `normal`, or a numeric weight).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "bold" | "bolder" => Some(FontWeight::Bold),
            "normal" | "lighter" => Some(FontWeight::Normal),
            other => other
                .parse::<u16>()
                .ok()
                .map(|w| if w >= 600 { FontWeight::Bold } else { FontWeight::Normal }),
        }
    }
}

/// Font style options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
}

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl TextAlign {
    /// Parse an alignment name.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" => Some(TextAlign::Left),
            "center" => Some(TextAlign::Center),
            "right" => Some(TextAlign::Right),
            "justify" => Some(TextAlign::Justify),
            _ => None,
        }
    }
}

/// Text decoration options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextDecoration {
    #[default]
    None,
    Underline,
    LineThrough,
}

/// Attributes of a text element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextStyle {
    /// The text content.
    pub content: String,
    pub color: SerializableColor,
    /// Font size in pixels.
    pub font_size: f64,
    pub font_family: String,
    pub font_weight: FontWeight,
    pub font_style: FontStyle,
    pub text_align: TextAlign,
    pub text_decoration: TextDecoration,
}

impl TextStyle {
    /// Default font size in pixels.
    pub const DEFAULT_FONT_SIZE: f64 = 20.0;
    /// Default font family.
    pub const DEFAULT_FONT_FAMILY: &'static str = "Arial";
    /// Content of a freshly created text element.
    pub const DEFAULT_CONTENT: &'static str = "New Text";

    /// Approximate laid-out size, used when a text element has no explicit size.
    pub fn approximate_size(&self) -> Size {
        let longest_line = self
            .content
            .lines()
            .map(|line| line.chars().count())
            .max()
            .unwrap_or(0);
        let mut line_count = self.content.lines().count().max(1);
        if self.content.ends_with('\n') {
            line_count += 1;
        }

        let char_width_factor = match self.font_weight {
            FontWeight::Normal => 0.52,
            FontWeight::Bold => 0.58,
        };
        let width = (longest_line as f64 * self.font_size * char_width_factor).max(20.0);
        Size::new(width, line_count as f64 * self.font_size * 1.2)
    }

    pub(super) fn apply(&mut self, patch: &StylePatch) {
        if let Some(content) = &patch.content {
            self.content.clone_from(content);
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
        if let Some(font_size) = patch.font_size {
            self.font_size = font_size.max(1.0);
        }
        if let Some(font_family) = &patch.font_family {
            self.font_family.clone_from(font_family);
        }
        if let Some(font_weight) = patch.font_weight {
            self.font_weight = font_weight;
        }
        if let Some(font_style) = patch.font_style {
            self.font_style = font_style;
        }
        if let Some(text_align) = patch.text_align {
            self.text_align = text_align;
        }
        if let Some(text_decoration) = patch.text_decoration {
            self.text_decoration = text_decoration;
        }
    }
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            content: Self::DEFAULT_CONTENT.to_string(),
            color: SerializableColor::black(),
            font_size: Self::DEFAULT_FONT_SIZE,
            font_family: Self::DEFAULT_FONT_FAMILY.to_string(),
            font_weight: FontWeight::Normal,
            font_style: FontStyle::Normal,
            text_align: TextAlign::Left,
            text_decoration: TextDecoration::None,
        }
    }
}

/// Typographic presets offered by the text panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextPreset {
    Heading,
    Subheading,
    Body,
}

impl TextPreset {
    /// Display name for UI.
    pub fn display_name(&self) -> &'static str {
        match self {
            TextPreset::Heading => "Heading",
            TextPreset::Subheading => "Subheading",
            TextPreset::Body => "Body",
        }
    }

    /// All presets.
    pub fn all() -> &'static [TextPreset] {
        &[TextPreset::Heading, TextPreset::Subheading, TextPreset::Body]
    }

    /// Style patch for this preset.
    pub fn patch(&self) -> StylePatch {
        let (font_size, font_weight, text_align) = match self {
            TextPreset::Heading => (40.0, FontWeight::Bold, TextAlign::Center),
            TextPreset::Subheading => (30.0, FontWeight::Normal, TextAlign::Center),
            TextPreset::Body => (20.0, FontWeight::Normal, TextAlign::Left),
        };
        StylePatch {
            content: Some(self.display_name().to_string()),
            font_size: Some(font_size),
            font_weight: Some(font_weight),
            text_align: Some(text_align),
            ..StylePatch::default()
        }
    }

    /// New text element styled with this preset.
    pub fn element(&self) -> Element {
        let mut element = Element::new(ElementKind::Text);
        if let Some(style) = element.text_style_mut() {
            style.apply(&self.patch());
        }
        element
    }
}

/// Pre-written multi-line text blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutBlock {
    Schedule,
    Menu,
}

impl LayoutBlock {
    /// Text of the block.
    pub fn content(&self) -> &'static str {
        match self {
            LayoutBlock::Schedule => "Event Schedule\n9:00 AM - Opening\n10:00 AM - Keynote",
            LayoutBlock::Menu => "Menu\nAppetizer: Salad\nMain: Pasta",
        }
    }

    /// New text element holding this block.
    pub fn element(&self) -> Element {
        Element::text(self.content()).at(Point::new(100.0, 100.0))
    }
}
