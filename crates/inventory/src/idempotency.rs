//! Transient idempotency ledger for free-item deductions.
//!
//! Advisory only: entries expire after a TTL, and the durable order status /
//! per-line flags remain the source of truth.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use orderkit_sales::OrderId;

use crate::stock::StockTarget;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// `{order}:{target}`, used when an order is placed.
    pub fn placement(order: OrderId, target: &StockTarget) -> Self {
        Self(format!("{order}:{target}"))
    }

    /// `{order}:{target}:edit:{fingerprint}`, scoped to one edited free-item
    /// set so a recent placement does not suppress the edit's delta.
    pub fn edit(order: OrderId, target: &StockTarget, fingerprint: u64) -> Self {
        Self(format!("{order}:{target}:edit:{fingerprint:016x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct IdempotencyLedger {
    ttl: Duration,
    entries: HashMap<IdempotencyKey, DateTime<Utc>>,
}

impl IdempotencyLedger {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Claim `key` at `now`. Returns `false` when the key was already claimed
    /// within the TTL.
    pub fn try_claim(&mut self, key: &IdempotencyKey, now: DateTime<Utc>) -> bool {
        self.evict_expired(now);
        if self.entries.contains_key(key) {
            return false;
        }
        self.entries.insert(key.clone(), now);
        true
    }

    pub fn contains(&self, key: &IdempotencyKey, now: DateTime<Utc>) -> bool {
        self.entries
            .get(key)
            .is_some_and(|claimed| now - *claimed < self.ttl)
    }

    /// Drop a claim whose write failed, so a retry may proceed.
    pub fn release(&mut self, key: &IdempotencyKey) {
        self.entries.remove(key);
    }

    pub fn evict_expired(&mut self, now: DateTime<Utc>) {
        let ttl = self.ttl;
        self.entries.retain(|_, claimed| now - *claimed < ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
