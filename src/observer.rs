//! Diagnostic observers for resolution traceability.
//!
//! Observers hook into the provider's resolution path for structured
//! tracing and debugging. Calls are made synchronously during
//! resolution; keep implementations lightweight.

use std::sync::Arc;
use std::time::Duration;

use crate::error::DiError;
use crate::key::TypeKey;

/// Observer of resolution events.
pub trait DiObserver: Send + Sync {
    /// Called when a root resolution starts for `key`.
    fn resolving(&self, key: &TypeKey);

    /// Called when a root resolution for `key` completes.
    fn resolved(&self, key: &TypeKey, duration: Duration);

    /// Called when a root resolution for `key` fails.
    fn resolve_failed(&self, key: &TypeKey, error: &DiError);
}

/// Observer fan-out held by the provider.
#[derive(Clone, Default)]
pub(crate) struct Observers {
    list: Vec<Arc<dyn DiObserver>>,
}

impl Observers {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&mut self, observer: Arc<dyn DiObserver>) {
        self.list.push(observer);
    }

    pub(crate) fn has_observers(&self) -> bool {
        !self.list.is_empty()
    }

    pub(crate) fn resolving(&self, key: &TypeKey) {
        for observer in &self.list {
            observer.resolving(key);
        }
    }

    pub(crate) fn resolved(&self, key: &TypeKey, duration: Duration) {
        for observer in &self.list {
            observer.resolved(key, duration);
        }
    }

    pub(crate) fn resolve_failed(&self, key: &TypeKey, error: &DiError) {
        for observer in &self.list {
            observer.resolve_failed(key, error);
        }
    }
}

/// Ready-made observer that writes resolution events to stderr.
#[derive(Debug, Default)]
pub struct LoggingObserver;

impl LoggingObserver {
    /// Creates a new logging observer.
    pub fn new() -> Self {
        Self
    }
}

impl DiObserver for LoggingObserver {
    fn resolving(&self, key: &TypeKey) {
        eprintln!("[wireplan] resolving {}", key);
    }

    fn resolved(&self, key: &TypeKey, duration: Duration) {
        eprintln!("[wireplan] resolved {} in {:?}", key, duration);
    }

    fn resolve_failed(&self, key: &TypeKey, error: &DiError) {
        eprintln!("[wireplan] failed {}: {}", key, error);
    }
}
