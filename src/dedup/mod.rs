//! Per-IP report deduplication.

mod cache;

pub use cache::DedupCache;
