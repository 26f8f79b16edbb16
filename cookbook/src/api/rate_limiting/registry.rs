use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use governor::clock::{Clock, Reference};
use tracing::debug;

use super::bucket::TokenBucket;
use super::extractors::ClientIdentity;
use super::policy::{Policy, PolicyParams};
use super::{lock, read, write};

/// Limiter state for one (policy, client) pair
pub struct LimiterEntry<C: Clock> {
    bucket: TokenBucket<C>,
    /// Only used for reaping, never for rate decisions
    last_seen: Mutex<C::Instant>,
    /// Consecutive denials since the last allowed request
    violations: AtomicU32,
}

impl<C: Clock> LimiterEntry<C> {
    fn new(bucket: TokenBucket<C>, now: C::Instant) -> Self {
        Self {
            bucket,
            last_seen: Mutex::new(now),
            violations: AtomicU32::new(0),
        }
    }

    pub fn bucket(&self) -> &TokenBucket<C> {
        &self.bucket
    }

    pub fn last_seen(&self) -> C::Instant {
        *lock(&self.last_seen)
    }

    pub fn touch(&self, now: C::Instant) {
        let mut last_seen = lock(&self.last_seen);
        if now > *last_seen {
            *last_seen = now;
        }
    }

    pub fn violations(&self) -> u32 {
        self.violations.load(Ordering::Acquire)
    }

    pub(crate) fn record_violation(&self) -> u32 {
        self.violations.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub(crate) fn clear_violations(&self) {
        self.violations.store(0, Ordering::Release);
    }
}

/// All limiter entries of one policy, keyed by client.
///
/// The map lock is only held for lookups, inserts and sweeps. Token
/// accounting happens on the entry itself after the map lock is released.
pub struct LimiterRegistry<C: Clock> {
    policy: Policy,
    params: PolicyParams,
    clock: C,
    entries: RwLock<HashMap<ClientIdentity, Arc<LimiterEntry<C>>>>,
}

impl<C: Clock + Clone> LimiterRegistry<C> {
    pub fn new(policy: Policy, params: PolicyParams, clock: C) -> Self {
        Self {
            policy,
            params,
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    pub fn params(&self) -> &PolicyParams {
        &self.params
    }

    /// Return the entry for `client`, creating a full bucket on first use.
    ///
    /// The entry is touched while the map lock is still held, so a
    /// concurrent sweep either runs before the lookup or sees the fresh
    /// `last_seen`.
    pub fn get_or_create(&self, client: &ClientIdentity) -> Arc<LimiterEntry<C>> {
        let now = self.clock.now();
        {
            let entries = read(&self.entries);
            if let Some(entry) = entries.get(client) {
                entry.touch(now);
                return Arc::clone(entry);
            }
        }

        let mut entries = write(&self.entries);
        // Another request may have created it between the two locks.
        let entry = entries.entry(client.clone()).or_insert_with(|| {
            debug!(client = %client, policy = %self.policy, "Creating rate limiter entry");
            Arc::new(LimiterEntry::new(
                TokenBucket::new(self.clock.clone(), &self.params),
                now,
            ))
        });
        entry.touch(now);
        Arc::clone(entry)
    }

    /// Look up an entry without creating or touching it
    pub fn get(&self, client: &ClientIdentity) -> Option<Arc<LimiterEntry<C>>> {
        read(&self.entries).get(client).cloned()
    }

    pub fn len(&self) -> usize {
        read(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove entries idle for longer than `retention`, returns the number removed
    pub fn reap(&self, retention: Duration) -> usize {
        let now = self.clock.now();
        let mut entries = write(&self.entries);
        let initial_count = entries.len();

        entries.retain(|client, entry| {
            let idle: Duration = now.duration_since(entry.last_seen()).into();
            let keep = idle <= retention;
            if !keep {
                debug!(
                    client = %client,
                    policy = %self.policy,
                    idle_secs = idle.as_secs(),
                    "Evicting idle rate limiter entry"
                );
            }
            keep
        });

        initial_count - entries.len()
    }
}
