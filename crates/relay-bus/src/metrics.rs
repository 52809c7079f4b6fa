//! Metrics for the event dispatcher.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Dispatcher counters, shared by every listener worker.
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Events accepted by `dispatch`.
    pub events_dispatched: AtomicU64,
    /// Successful listener deliveries.
    pub deliveries: AtomicU64,
    /// Deliveries where the listener returned an error.
    pub delivery_failures: AtomicU64,
    /// Deliveries where the listener panicked.
    pub listener_panics: AtomicU64,
    /// Events that could not be queued for a listener.
    pub events_dropped: AtomicU64,
    /// Currently registered listeners.
    pub listeners: AtomicU64,
}

impl DispatchMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_dispatch(&self) {
        self.events_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivery(&self) {
        self.deliveries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.delivery_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_panic(&self) {
        self.listener_panics.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_listeners(&self, count: usize) {
        self.listeners.store(count as u64, Ordering::Relaxed);
    }

    /// Get a snapshot of current metrics.
    pub fn snapshot(&self) -> DispatchMetricsSnapshot {
        DispatchMetricsSnapshot {
            events_dispatched: self.events_dispatched.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            listener_panics: self.listener_panics.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            listeners: self.listeners.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of dispatcher metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchMetricsSnapshot {
    pub events_dispatched: u64,
    pub deliveries: u64,
    pub delivery_failures: u64,
    pub listener_panics: u64,
    pub events_dropped: u64,
    pub listeners: u64,
}
