//! Surface lifecycle: `Uninitialized -> Mounted -> Disposed`.
//!
//! All access to the native surface goes through [`SurfaceLifecycle`], which
//! only hands the surface out while it is mounted. `Disposed` is terminal.

use crate::surface::{Surface, SurfaceError, SurfaceResult};

/// Observable lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Mounted,
    Disposed,
}

/// Guarded owner of a surface.
#[derive(Debug, Default)]
pub enum SurfaceLifecycle<S> {
    #[default]
    Uninitialized,
    Mounted(S),
    Disposed,
}

impl<S: Surface> SurfaceLifecycle<S> {
    pub fn new() -> Self {
        SurfaceLifecycle::Uninitialized
    }

    pub fn state(&self) -> LifecycleState {
        match self {
            SurfaceLifecycle::Uninitialized => LifecycleState::Uninitialized,
            SurfaceLifecycle::Mounted(_) => LifecycleState::Mounted,
            SurfaceLifecycle::Disposed => LifecycleState::Disposed,
        }
    }

    /// Whether deferred work may still touch the surface.
    pub fn is_live(&self) -> bool {
        matches!(self, SurfaceLifecycle::Mounted(_))
    }

    /// Take ownership of a surface.
    pub fn mount(&mut self, surface: S) -> SurfaceResult<()> {
        match self {
            SurfaceLifecycle::Uninitialized => {
                *self = SurfaceLifecycle::Mounted(surface);
                log::debug!("Surface mounted");
                Ok(())
            }
            SurfaceLifecycle::Mounted(_) => Err(SurfaceError::AlreadyMounted),
            SurfaceLifecycle::Disposed => Err(SurfaceError::Disposed),
        }
    }

    /// Run `f` against the surface if it is mounted.
    pub fn with_live<R>(&mut self, f: impl FnOnce(&mut S) -> R) -> Option<R> {
        match self {
            SurfaceLifecycle::Mounted(surface) => Some(f(surface)),
            _ => None,
        }
    }

    /// Borrow the mounted surface.
    pub fn get(&self) -> SurfaceResult<&S> {
        match self {
            SurfaceLifecycle::Mounted(surface) => Ok(surface),
            SurfaceLifecycle::Uninitialized => Err(SurfaceError::NotMounted),
            SurfaceLifecycle::Disposed => Err(SurfaceError::Disposed),
        }
    }

    /// Dispose the surface exactly once.
    ///
    /// Returns `true` if this call performed the disposal; later calls are
    /// no-ops. Disposing an unmounted lifecycle also makes it terminal.
    pub fn dispose(&mut self) -> bool {
        match std::mem::replace(self, SurfaceLifecycle::Disposed) {
            SurfaceLifecycle::Mounted(mut surface) => {
                surface.dispose();
                log::debug!("Surface disposed");
                true
            }
            SurfaceLifecycle::Uninitialized => true,
            SurfaceLifecycle::Disposed => false,
        }
    }
}
