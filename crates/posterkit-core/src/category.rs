//! Design categories and their canvas sizes.

use crate::document::DEFAULT_CANVAS_SIZE;
use kurbo::Size;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A design category picks the canvas size for a new design.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DesignCategory {
    #[default]
    PosterFlyerLetter,
    InstagramReelPost,
    EventFlyer,
    BusinessPoster,
    SocialMediaGraphic,
    Custom { width: f64, height: f64 },
}

impl DesignCategory {
    /// The preset categories (everything except `Custom`).
    pub fn presets() -> &'static [DesignCategory] {
        &[
            DesignCategory::PosterFlyerLetter,
            DesignCategory::InstagramReelPost,
            DesignCategory::EventFlyer,
            DesignCategory::BusinessPoster,
            DesignCategory::SocialMediaGraphic,
        ]
    }

    /// Display name, also used to match template categories.
    pub fn name(&self) -> &'static str {
        match self {
            DesignCategory::PosterFlyerLetter => "Poster Flyer Letter",
            DesignCategory::InstagramReelPost => "Instagram Reel Post",
            DesignCategory::EventFlyer => "Event Flyer",
            DesignCategory::BusinessPoster => "Business Poster",
            DesignCategory::SocialMediaGraphic => "Social Media Graphic",
            DesignCategory::Custom { .. } => "Custom",
        }
    }

    /// Canvas size in pixels.
    pub fn canvas_size(&self) -> Size {
        match self {
            DesignCategory::PosterFlyerLetter => DEFAULT_CANVAS_SIZE,
            DesignCategory::InstagramReelPost => Size::new(1080.0, 1920.0),
            DesignCategory::EventFlyer | DesignCategory::BusinessPoster => Size::new(800.0, 1200.0),
            DesignCategory::SocialMediaGraphic => Size::new(1080.0, 1080.0),
            DesignCategory::Custom { width, height } => Size::new(*width, *height),
        }
    }

    /// The first preset with this canvas size, otherwise `Custom`.
    pub fn for_size(size: Size) -> Self {
        Self::presets()
            .iter()
            .copied()
            .find(|c| c.canvas_size() == size)
            .unwrap_or(DesignCategory::Custom {
                width: size.width,
                height: size.height,
            })
    }

    /// Look up a category by display name. `Custom` starts at the default size.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.eq_ignore_ascii_case("custom") {
            return Some(DesignCategory::Custom {
                width: DEFAULT_CANVAS_SIZE.width,
                height: DEFAULT_CANVAS_SIZE.height,
            });
        }
        Self::presets()
            .iter()
            .copied()
            .find(|c| c.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for DesignCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
