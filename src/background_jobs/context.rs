use crate::inventory_store::InventoryStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Context provided to jobs during execution: shared store handles and a
/// cancellation token for graceful shutdown.
#[derive(Clone)]
pub struct JobContext {
    /// Token to check for cancellation/shutdown requests.
    pub cancellation_token: CancellationToken,

    /// Access to uploaded files, host records and settings.
    pub inventory_store: Arc<dyn InventoryStore>,
}

impl JobContext {
    pub fn new(
        cancellation_token: CancellationToken,
        inventory_store: Arc<dyn InventoryStore>,
    ) -> Self {
        Self {
            cancellation_token,
            inventory_store,
        }
    }

    /// Check if cancellation has been requested. Jobs should call this
    /// between units of work and return `JobError::Cancelled` if true.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }
}
