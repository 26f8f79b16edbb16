//! Adaptive per-client rate limiting
//!
//! Every guarded route belongs to one of four policies:
//! - Login - IP-based, blocks the client once the burst is used up
//! - Register - IP-based, warn only
//! - Search - IP-based, warn only
//! - General - IP-based, blocks on repeated violation
//!
//! Each policy owns a registry of lazily refilled token buckets, one per
//! client. Blocks are tracked in a single block list shared by all policies
//! and are consulted before any bucket is touched. A periodic reaper evicts
//! idle buckets and expired blocks.

pub mod block_list;
pub mod bucket;
pub mod extractors;
pub mod manager;
pub mod middleware;
pub mod policy;
pub mod reaper;
pub mod registry;
pub mod rejection;

pub use block_list::BlockList;
pub use bucket::TokenBucket;
pub use extractors::{ClientIdentity, ClientIdentityExtractor};
pub use manager::{Decision, ReapStats, SecurityManager};
pub use middleware::RateLimitLayer;
pub use policy::{BlockRule, Policy, PolicyParams};
pub use registry::{LimiterEntry, LimiterRegistry};
pub use reaper::setup_reaper;
pub use rejection::{JsonRejection, PlainRejection, Rejection, RejectionFormatter, RejectionReason};

use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

// Lock poisoning is ignored, the guarded state is plain counters and
// timestamps that are never left half-written.

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
