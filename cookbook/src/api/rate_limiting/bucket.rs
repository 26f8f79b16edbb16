//! Token bucket with lazy, continuous refill

use std::sync::Mutex;
use std::time::Duration;

use governor::clock::{Clock, Reference};

use super::lock;
use super::policy::PolicyParams;

#[derive(Debug)]
struct BucketState<I> {
    /// Fractional token balance, never above the burst
    tokens: f64,
    /// Refill is accounted up to this instant. May lie in the future while
    /// the bucket is on hold.
    last_refill: I,
}

/// Token bucket for a single (policy, client) pair.
///
/// Tokens accumulate at one per `refill_every` up to `burst`. Elapsed time is
/// applied on every call instead of running a timer per bucket. The balance
/// is guarded by the bucket's own mutex, so two concurrent `allow()` calls
/// can never spend the same token.
pub struct TokenBucket<C: Clock> {
    clock: C,
    refill_every: Duration,
    burst: u32,
    state: Mutex<BucketState<C::Instant>>,
}

impl<C: Clock> TokenBucket<C> {
    /// Create a full bucket
    pub fn new(clock: C, params: &PolicyParams) -> Self {
        let now = clock.now();
        Self {
            clock,
            refill_every: params.refill_every(),
            burst: params.burst(),
            state: Mutex::new(BucketState {
                tokens: params.burst() as f64,
                last_refill: now,
            }),
        }
    }

    /// Try to spend one token.
    pub fn allow(&self) -> bool {
        let now = self.clock.now();
        let mut state = lock(&self.state);
        self.refill(&mut state, now);

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Whole tokens currently available, after refill
    pub fn available(&self) -> u32 {
        let now = self.clock.now();
        let mut state = lock(&self.state);
        self.refill(&mut state, now);
        state.tokens.floor() as u32
    }

    pub fn burst(&self) -> u32 {
        self.burst
    }

    pub fn refill_every(&self) -> Duration {
        self.refill_every
    }

    /// Stop refilling until `until`. The current balance is kept as is.
    pub fn hold_until(&self, until: C::Instant) {
        let now = self.clock.now();
        let mut state = lock(&self.state);
        self.refill(&mut state, now);
        if until > state.last_refill {
            state.last_refill = until;
        }
    }

    fn refill(&self, state: &mut BucketState<C::Instant>, now: C::Instant) {
        // Covers both a bucket on hold and a clock that went backwards.
        if now <= state.last_refill {
            return;
        }

        let elapsed: Duration = now.duration_since(state.last_refill).into();
        let earned = elapsed.as_secs_f64() / self.refill_every.as_secs_f64();
        state.tokens = (state.tokens + earned).min(self.burst as f64);
        state.last_refill = now;
    }
}
