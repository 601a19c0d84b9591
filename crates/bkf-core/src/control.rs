//! Cancellation hook for a running export.
//!
//! The CLI hands one token to both the orchestrator and the transport. Setting
//! it stops the workflow at the next check: before a phase, before a progress
//! check, during the inter-poll delay, or inside an in-flight curl transfer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared abort flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct AbortToken {
    flag: Arc<AtomicBool>,
}

impl AbortToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the export stop. Idempotent.
    pub fn request_abort(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
