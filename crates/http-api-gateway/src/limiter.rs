// Path: crates/http-api-gateway/src/limiter.rs
//! Sliding-window rate limiters.
//!
//! Advisory limits at the external surface, separate from the contract's
//! block-delay throttle. A window keeps the timestamps of recent hits per
//! key; a request is admitted while fewer than `limit` hits fall inside the
//! trailing window.

use dashmap::DashMap;
use std::collections::VecDeque;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// The outcome of a limiter probe.
#[derive(Clone, Copy, Debug)]
pub struct LimitDecision {
    /// Whether the request is admitted.
    pub allowed: bool,
    /// How many further requests the window currently has room for.
    pub remaining: u32,
}

/// A per-key sliding-window counter.
pub struct SlidingWindow<K: Eq + Hash> {
    hits: DashMap<K, VecDeque<Instant>>,
    limit: u32,
    window: Duration,
}

impl<K: Eq + Hash> SlidingWindow<K> {
    /// A limiter admitting `limit` requests per `window` per key.
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            hits: DashMap::new(),
            limit,
            window,
        }
    }

    /// Records a probe for `key` and decides it.
    pub fn check(&self, key: K) -> LimitDecision {
        let now = Instant::now();
        let mut entry = self.hits.entry(key).or_default();
        while let Some(oldest) = entry.front() {
            if now.duration_since(*oldest) >= self.window {
                entry.pop_front();
            } else {
                break;
            }
        }
        if (entry.len() as u32) < self.limit {
            entry.push_back(now);
            LimitDecision {
                allowed: true,
                remaining: self.limit - entry.len() as u32,
            }
        } else {
            LimitDecision {
                allowed: false,
                remaining: 0,
            }
        }
    }
}
