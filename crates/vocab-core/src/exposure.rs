//! Process-wide exposure tracking and the Sympson-Hetter exposure gate.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::bank::ItemBank;

#[derive(Debug, Clone, Copy)]
struct ItemExposure {
    administered_count: u64,
    last_administered_at: DateTime<Utc>,
}

/// Maintains per-item `(administered_count, last_administered_at)` and the
/// process-wide `sessions_started` denominator. Increments are
/// lock-free per key; `sessions_started` is a single atomic counter.
pub struct ExposureController {
    counts: DashMap<i64, ItemExposure>,
    sessions_started: AtomicU64,
}

impl Default for ExposureController {
    fn default() -> Self {
        Self::new()
    }
}

impl ExposureController {
    pub fn new() -> Self {
        Self {
            counts: DashMap::new(),
            sessions_started: AtomicU64::new(0),
        }
    }

    pub fn record_session_started(&self) {
        self.sessions_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_administered(&self, item_id: i64, now: DateTime<Utc>) {
        self.counts
            .entry(item_id)
            .and_modify(|entry| {
                entry.administered_count += 1;
                entry.last_administered_at = now;
            })
            .or_insert(ItemExposure {
                administered_count: 1,
                last_administered_at: now,
            });
    }

    pub fn sessions_started(&self) -> u64 {
        self.sessions_started.load(Ordering::Relaxed)
    }

    /// `administered_count / sessions_started`, 0.0 before any session starts.
    pub fn exposure_rate(&self, item_id: i64) -> f64 {
        let started = self.sessions_started();
        if started == 0 {
            return 0.0;
        }
        let count = self
            .counts
            .get(&item_id)
            .map(|entry| entry.administered_count)
            .unwrap_or(0);
        count as f64 / started as f64
    }

    pub fn overused(&self, bank: &ItemBank, threshold: f64) -> Vec<i64> {
        bank.all_items()
            .filter(|item| self.exposure_rate(item.id) > threshold)
            .map(|item| item.id)
            .collect()
    }

    pub fn underused(&self, bank: &ItemBank, threshold: f64) -> Vec<i64> {
        bank.all_items()
            .filter(|item| self.exposure_rate(item.id) < threshold)
            .map(|item| item.id)
            .collect()
    }

    pub fn unused(&self, bank: &ItemBank) -> Vec<i64> {
        bank.all_items()
            .filter(|item| !self.counts.contains_key(&item.id))
            .map(|item| item.id)
            .collect()
    }
}
