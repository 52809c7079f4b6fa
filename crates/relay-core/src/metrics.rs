//! Tagged counters and gauges.
//!
//! A lock-free registry keyed by metric name plus a sorted tag set. Handles are
//! `Arc`s, so hot paths can keep one around instead of looking it up again.

use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Metric name plus its tags, sorted by key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricId {
    pub name: String,
    pub tags: Vec<(String, String)>,
}

impl MetricId {
    pub fn new(name: &str, tags: &[(&str, &str)]) -> Self {
        let mut tags: Vec<(String, String)> = tags
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        tags.sort();
        Self {
            name: name.to_string(),
            tags,
        }
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.tags.is_empty() {
            let tags: Vec<String> = self.tags.iter().map(|(k, v)| format!("{k}={v}")).collect();
            write!(f, "{{{}}}", tags.join(","))?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn increment(&self) {
        self.add(1);
    }

    pub fn add(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn set(&self, value: u64) {
        self.0.store(value, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// A point-in-time reading of one metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSample {
    pub id: MetricId,
    pub value: u64,
}

#[derive(Debug, Default)]
pub struct MetricsRegistry {
    counters: DashMap<MetricId, Arc<Counter>>,
    gauges: DashMap<MetricId, Arc<Gauge>>,
}

impl MetricsRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Get or create the counter for `name` and `tags`.
    pub fn counter(&self, name: &str, tags: &[(&str, &str)]) -> Arc<Counter> {
        self.counters
            .entry(MetricId::new(name, tags))
            .or_default()
            .clone()
    }

    /// Get or create the gauge for `name` and `tags`.
    pub fn gauge(&self, name: &str, tags: &[(&str, &str)]) -> Arc<Gauge> {
        self.gauges
            .entry(MetricId::new(name, tags))
            .or_default()
            .clone()
    }

    /// Sum of every counter named `name`, across all tag sets.
    pub fn count(&self, name: &str) -> u64 {
        self.counters
            .iter()
            .filter(|entry| entry.key().name == name)
            .map(|entry| entry.value().get())
            .sum()
    }

    /// Counters first, then gauges, each sorted by id.
    pub fn snapshot(&self) -> Vec<MetricSample> {
        let mut counters: Vec<MetricSample> = self
            .counters
            .iter()
            .map(|entry| MetricSample {
                id: entry.key().clone(),
                value: entry.value().get(),
            })
            .collect();
        counters.sort_by(|a, b| a.id.cmp(&b.id));

        let mut gauges: Vec<MetricSample> = self
            .gauges
            .iter()
            .map(|entry| MetricSample {
                id: entry.key().clone(),
                value: entry.value().get(),
            })
            .collect();
        gauges.sort_by(|a, b| a.id.cmp(&b.id));

        counters.extend(gauges);
        counters
    }
}
