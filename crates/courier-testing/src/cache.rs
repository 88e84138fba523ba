//! Recording cache double for dispatch tests.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use courier_dispatch::{DispatchCache, DispatchError};
use parking_lot::Mutex;

/// Cache that records every write for later assertions.
#[derive(Default)]
pub struct RecordingCache {
    entries: Mutex<Vec<(String, String)>>,
    fail_writes: AtomicBool,
}

impl RecordingCache {
    /// Creates an empty recording cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded writes, in order.
    pub fn entries(&self) -> Vec<(String, String)> {
        self.entries.lock().clone()
    }

    /// Number of recorded writes.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Makes every write fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl DispatchCache for RecordingCache {
    async fn set(&self, key: &str, value: &str) -> Result<(), DispatchError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DispatchError::cache("injected cache failure"));
        }
        self.entries.lock().push((key.to_string(), value.to_string()));
        Ok(())
    }
}
