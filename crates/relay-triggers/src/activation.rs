//! Lifecycle gate for polling.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// Whether this instance is allowed to do work. Toggled by whatever decides
/// readiness (service discovery, a health endpoint, an operator).
#[derive(Debug, Clone)]
pub struct Activation {
    active: Arc<AtomicBool>,
}

impl Activation {
    pub fn active() -> Self {
        Self {
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn stopped() -> Self {
        Self {
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn enable(&self) {
        if !self.active.swap(true, Ordering::SeqCst) {
            info!("Activation enabled");
        }
    }

    pub fn disable(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            info!("Activation disabled");
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl Default for Activation {
    fn default() -> Self {
        Self::active()
    }
}
