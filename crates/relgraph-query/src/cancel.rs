//! Cooperative cancellation for running queries.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use relgraph_core::{Error, Result};

/// A cloneable cancellation flag shared between a query and whoever may
/// want to stop it, typically from another thread.
#[derive(Debug, Clone, Default)]
pub struct QueryCancel {
    flag: Arc<AtomicBool>,
}

impl QueryCancel {
    /// Create a fresh, un-cancelled flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. The running query observes it before its next fetch.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Fail with `Error::Interrupted` if cancellation has been requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Interrupted)
        } else {
            Ok(())
        }
    }
}
