//! PosterKit Render Library
//!
//! Projects the document onto a retained-mode drawing surface and turns
//! user manipulation of that surface back into document edits.
//! [`SceneSurface`] is a headless surface that rasterizes with the `image`
//! crate.

pub mod bridge;
pub mod lifecycle;
pub mod loader;
pub mod resources;
pub mod scene;
pub mod session;
pub mod surface;

pub use bridge::{BridgeSettings, Gesture, LoadFailure, RenderBridge};
pub use lifecycle::{LifecycleState, SurfaceLifecycle};
pub use loader::{materialize_template, SkippedEntry, TemplateLoad};
pub use resources::{DecodingResolver, ImageResolver, ImageResource, ResourceError, ResourceResult};
pub use scene::SceneSurface;
pub use session::{EditorSession, SessionError, SessionResult};
pub use surface::{
    BackgroundLayer, Guide, NodeContent, NodeHandle, Overlays, RasterFormat, SceneNode, Surface,
    SurfaceError, SurfaceEvent, SurfaceResult,
};
