use std::sync::{Mutex, MutexGuard};

use ld_core::ports::LocationPort;

/// Location held in memory, for headless runs where there is no address bar.
///
/// Keeps every replaced query string so callers can inspect the write order.
#[derive(Default)]
pub struct MemoryLocation {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    current: String,
    history: Vec<String>,
}

impl MemoryLocation {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                current: initial.into().trim_start_matches('?').to_string(),
                history: Vec::new(),
            }),
        }
    }

    /// Every query string passed to `replace_query_string`, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.lock().history.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl LocationPort for MemoryLocation {
    fn query_string(&self) -> String {
        self.lock().current.clone()
    }

    fn replace_query_string(&self, query: &str) {
        let mut inner = self.lock();
        inner.current = query.to_string();
        inner.history.push(query.to_string());
    }
}
