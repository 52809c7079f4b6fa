//! Compiled, anchored trigger patterns.
//!
//! Branch, tag and artifact patterns come from pipeline configuration and are
//! evaluated for every event, so each distinct pattern is compiled once.

use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Upper bound on cached patterns; the cache is emptied when reached.
const MAX_CACHED: usize = 1024;

/// Pattern source to its compiled form, `None` when it does not compile.
static COMPILED: Lazy<DashMap<String, Option<Regex>>> = Lazy::new(DashMap::new);

/// Anchored regex for `pattern`. `None` if it does not compile.
pub(crate) fn anchored(pattern: &str) -> Option<Regex> {
    if let Some(cached) = COMPILED.get(pattern) {
        return cached.value().clone();
    }

    let compiled = Regex::new(&format!("^(?:{pattern})$")).ok();
    if compiled.is_none() {
        debug!(pattern, "Pattern does not compile");
    }
    if COMPILED.len() >= MAX_CACHED {
        COMPILED.clear();
    }
    COMPILED.insert(pattern.to_string(), compiled.clone());
    compiled
}

#[cfg(test)]
pub(crate) fn is_cached(pattern: &str) -> bool {
    COMPILED.contains_key(pattern)
}
