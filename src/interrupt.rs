//! Cooperative interruption of a driving thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A flag that any thread may raise to abort a blocking engine operation.
///
/// Blocking waits poll the flag after each bounded timeout; a raised flag turns
/// the wait into a fatal error for that operation.
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle {
    flag: Arc<AtomicBool>,
}

impl InterruptHandle {
    pub fn new() -> Self { Self::default() }

    pub fn interrupt(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_interrupted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
