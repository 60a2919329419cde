//! Application state shared across request handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use vaxishare_allocator::{RequestScheduler, ResourcePool};

/// Shared application state.
///
/// This is passed to all request handlers via Axum's state extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    scheduler: Arc<RequestScheduler>,
    frontend_dir: Option<PathBuf>,
}

impl AppState {
    /// Create a new application state around an already-built scheduler.
    pub fn new(scheduler: Arc<RequestScheduler>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                scheduler,
                frontend_dir: None,
            }),
        }
    }

    /// Serve static assets from `dir` for paths the API does not claim.
    pub fn with_frontend_dir(scheduler: Arc<RequestScheduler>, dir: PathBuf) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                scheduler,
                frontend_dir: Some(dir),
            }),
        }
    }

    pub fn scheduler(&self) -> &Arc<RequestScheduler> {
        &self.inner.scheduler
    }

    pub fn pool(&self) -> &Arc<ResourcePool> {
        self.inner.scheduler.pool()
    }

    pub fn frontend_dir(&self) -> Option<&Path> {
        self.inner.frontend_dir.as_deref()
    }
}
