//! Cooperative cancellation for the driver's indefinite retry loops.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cloneable stop flag shared between the driver and whoever supervises it.
///
/// Both retry loops in [`KaPsu`](crate::psu::KaPsu) check their token once
/// per iteration, so a stuck instrument can hold the calling thread for at
/// most one more round-trip after the flag is raised.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask any in-flight operation to bail out at its next check.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
