//! Local mutations against the windowed collection
//!
//! Pins are applied to the cache first and never rolled back. Deletes change
//! the alignment of every later index, so they always end in a full reset and
//! reload from page 0, whether or not the backend call succeeded.

use crate::bridge::CommandBridge;
use crate::collection::WindowedCollection;
use crate::coordinator::FetchReport;
use tracing::{debug, warn};

impl<B: CommandBridge> WindowedCollection<B> {
    /// Optimistically sets `pinned` on every cached copy of `id`, then tells the backend.
    pub async fn set_pinned(&self, id: &str, desired: bool) {
        let touched = self.state().cache_mut().set_pinned(id, desired);
        debug!(id, desired, touched, "applied optimistic pin");
        if let Err(e) = self.bridge.set_pinned(id, desired).await {
            warn!(id, desired, error = %e, "pin failed on backend; cached flag kept");
        }
    }

    /// Flips the cached pin state of `id`. Returns the new state, or `None` if `id` is not cached.
    pub async fn toggle_pin(&self, id: &str) -> Option<bool> {
        let desired = !self.state().cache().find(id)?.pinned;
        self.set_pinned(id, desired).await;
        Some(desired)
    }

    pub async fn delete(&self, id: &str) -> FetchReport {
        if let Err(e) = self.bridge.delete_item(id).await {
            warn!(id, error = %e, "delete failed on backend; reloading anyway");
        }
        self.reload().await
    }

    pub async fn delete_all(&self) -> FetchReport {
        if let Err(e) = self.bridge.delete_all().await {
            warn!(error = %e, "delete-all failed on backend; reloading anyway");
        }
        self.reload().await
    }

    /// Drops every cached page, starts a new generation, and re-runs the initial load.
    pub async fn reload(&self) -> FetchReport {
        self.state().reset();
        self.load_initial().await
    }
}
