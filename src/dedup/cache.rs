//! Time-windowed dedup cache for reported IPs.

use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::telemetry::counters;

/// Bounded set of recently-reported IPs.
///
/// Answers "was this IP reported within the last TTL window?" in O(1)
/// amortized time. Entries expire TTL after insertion; expired entries
/// read as absent even before they are physically removed. When full,
/// inserting a new IP evicts the entry with the nearest expiry, which
/// under a uniform TTL is also the oldest insertion.
#[derive(Debug)]
pub struct DedupCache {
    /// Live entries: IP -> expiry
    entries: HashMap<IpAddr, Instant>,

    /// Insertion order; refreshed IPs leave stale entries behind that
    /// are skipped during eviction
    order: VecDeque<(IpAddr, Instant)>,

    max_entries: usize,
    ttl: Duration,
}

impl DedupCache {
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            entries: HashMap::with_capacity(max_entries),
            order: VecDeque::with_capacity(max_entries),
            max_entries,
            ttl,
        }
    }

    /// Whether `ip` has a live entry. Expired entries are dropped on sight.
    pub fn contains(&mut self, ip: IpAddr) -> bool {
        match self.entries.get(&ip) {
            Some(expiry) if *expiry > Instant::now() => true,
            Some(_) => {
                self.entries.remove(&ip);
                false
            }
            None => false,
        }
    }

    /// Insert or refresh `ip` with expiry = now + TTL.
    pub fn insert(&mut self, ip: IpAddr) {
        let now = Instant::now();
        self.drop_expired(now);

        if !self.entries.contains_key(&ip) && self.entries.len() >= self.max_entries {
            self.evict_oldest();
        }

        let expiry = now + self.ttl;
        self.entries.insert(ip, expiry);
        self.order.push_back((ip, expiry));
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop entries whose TTL has elapsed.
    fn drop_expired(&mut self, now: Instant) {
        while let Some((ip, expiry)) = self.order.front().copied() {
            if expiry > now {
                break;
            }
            self.order.pop_front();
            // Only remove when the queue entry is still the live one;
            // a refreshed IP has a newer entry further back.
            if self.entries.get(&ip) == Some(&expiry) {
                self.entries.remove(&ip);
            }
        }
    }

    /// Evict the live entry with the nearest expiry.
    fn evict_oldest(&mut self) {
        while let Some((ip, expiry)) = self.order.pop_front() {
            if self.entries.get(&ip) == Some(&expiry) {
                self.entries.remove(&ip);
                debug!(ip = %ip, "evicted from dedup cache");
                counters::cache_evicted();
                return;
            }
        }
    }
}
