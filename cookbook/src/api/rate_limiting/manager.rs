use std::fmt;
use std::time::Duration;

use cookbook_core::settings::rate_limiting::{RateLimitingConfig, RateLimitingValidationError};
use governor::clock::{Clock, DefaultClock};
use tracing::{info, warn};

use super::block_list::BlockList;
use super::extractors::ClientIdentity;
use super::policy::{Policy, PolicyParams};
use super::registry::LimiterRegistry;

/// Outcome of a single rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    /// Out of tokens, the client may retry after roughly one refill interval
    Throttled { retry_after: Duration },
    /// Refused on every policy until the block expires
    Blocked { remaining: Duration },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReapStats {
    pub limiter_entries: usize,
    pub expired_blocks: usize,
}

impl ReapStats {
    pub fn total(&self) -> usize {
        self.limiter_entries + self.expired_blocks
    }
}

/// Owns all rate limiting state of the process.
///
/// Built once at startup and shared by every policy wrapper. Tests build
/// their own instances with a fake clock.
pub struct SecurityManager<C: Clock = DefaultClock> {
    clock: C,
    registries: [LimiterRegistry<C>; 4],
    block_list: BlockList<C>,
    reap_interval: Duration,
    retention: Duration,
}

impl SecurityManager<DefaultClock> {
    pub fn new(config: &RateLimitingConfig) -> Result<Self, RateLimitingValidationError> {
        Self::with_clock(config, DefaultClock::default())
    }
}

impl<C: Clock + Clone> SecurityManager<C> {
    pub fn with_clock(
        config: &RateLimitingConfig,
        clock: C,
    ) -> Result<Self, RateLimitingValidationError> {
        config.reaper.validate()?;

        let registry = |policy: Policy| -> Result<LimiterRegistry<C>, RateLimitingValidationError> {
            let params = PolicyParams::try_from(policy.config(config)).map_err(|e| {
                RateLimitingValidationError::new(format!("{}: {}", policy, e.message))
            })?;
            Ok(LimiterRegistry::new(policy, params, clock.clone()))
        };

        Ok(Self {
            registries: [
                registry(Policy::Login)?,
                registry(Policy::Register)?,
                registry(Policy::Search)?,
                registry(Policy::General)?,
            ],
            block_list: BlockList::new(clock.clone()),
            reap_interval: config.reaper.interval.as_duration(),
            retention: config.reaper.retention.as_duration(),
            clock,
        })
    }

    /// Decide whether `client` may pass `policy` right now.
    ///
    /// The block list is consulted first; a blocked client never reaches
    /// its bucket, so no tokens are spent and no entry is created.
    pub fn check(&self, policy: Policy, client: &ClientIdentity) -> Decision {
        if let Some(remaining) = self.block_list.blocked_for(client) {
            return Decision::Blocked { remaining };
        }

        let registry = self.registry(policy);
        let entry = registry.get_or_create(client);

        if entry.bucket().allow() {
            entry.clear_violations();
            return Decision::Allowed;
        }

        let violations = entry.record_violation();
        match registry.params().block() {
            Some(rule) if violations >= rule.after_violations => {
                let until = self.block_list.block(client, rule.duration);
                entry.bucket().hold_until(until);
                // Blocked requests never touch the entry, keep it alive
                // for a full retention period after the hold ends.
                entry.touch(until);
                entry.clear_violations();
                warn!(
                    client = %client,
                    policy = %policy,
                    action = "blocked",
                    violations,
                    block_secs = rule.duration.as_secs(),
                    "Rate limit exceeded"
                );
                Decision::Blocked {
                    remaining: rule.duration,
                }
            }
            _ => {
                warn!(
                    client = %client,
                    policy = %policy,
                    action = "warned",
                    violations,
                    "Rate limit exceeded"
                );
                Decision::Throttled {
                    retry_after: registry.params().refill_every(),
                }
            }
        }
    }

    pub fn is_blocked(&self, client: &ClientIdentity) -> (bool, Duration) {
        self.block_list.is_blocked(client)
    }

    /// Block `client` on every policy, replacing any existing block
    pub fn block(&self, client: &ClientIdentity, duration: Duration) {
        self.block_list.block(client, duration);
        warn!(
            client = %client,
            action = "blocked",
            block_secs = duration.as_secs(),
            "Client blocked"
        );
    }

    pub fn registry(&self, policy: Policy) -> &LimiterRegistry<C> {
        &self.registries[policy.index()]
    }

    pub fn block_list(&self) -> &BlockList<C> {
        &self.block_list
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Run one sweep over all registries and the block list.
    ///
    /// Each registry is locked on its own, live traffic on the other
    /// policies keeps flowing while one is swept.
    pub fn reap(&self) -> ReapStats {
        let limiter_entries = self
            .registries
            .iter()
            .map(|registry| registry.reap(self.retention))
            .sum();
        let stats = ReapStats {
            limiter_entries,
            expired_blocks: self.block_list.reap(),
        };

        if stats.total() > 0 {
            info!(
                limiter_entries = stats.limiter_entries,
                expired_blocks = stats.expired_blocks,
                "Reaped idle rate limiting state"
            );
        }
        stats
    }

    pub fn reap_interval(&self) -> Duration {
        self.reap_interval
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }
}

impl<C: Clock + Clone> fmt::Debug for SecurityManager<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("SecurityManager");
        for registry in &self.registries {
            s.field(registry.policy().name(), &registry.len());
        }
        s.field("blocked", &self.block_list.len())
            .field("reap_interval", &self.reap_interval)
            .field("retention", &self.retention)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cookbook_core::settings::duration::SettingsDuration;
    use governor::clock::FakeRelativeClock;

    fn manager() -> (SecurityManager<FakeRelativeClock>, FakeRelativeClock) {
        let clock = FakeRelativeClock::default();
        let manager =
            SecurityManager::with_clock(&RateLimitingConfig::default(), clock.clone()).unwrap();
        (manager, clock)
    }

    #[test]
    fn test_login_blocks_on_first_violation() {
        let (manager, _clock) = manager();
        let client = ClientIdentity::new("1.2.3.4");

        for _ in 0..5 {
            assert_eq!(manager.check(Policy::Login, &client), Decision::Allowed);
        }
        assert_eq!(
            manager.check(Policy::Login, &client),
            Decision::Blocked {
                remaining: Duration::from_secs(30 * 60)
            }
        );
        assert!(manager.is_blocked(&client).0);
    }

    #[test]
    fn test_sweep_after_block_keeps_refill_hold() {
        let (manager, clock) = manager();
        let client = ClientIdentity::new("1.2.3.4");

        for _ in 0..6 {
            manager.check(Policy::Login, &client);
        }

        clock.advance(Duration::from_secs(30 * 60 + 30));
        let stats = manager.reap();
        assert_eq!(stats.limiter_entries, 0);
        assert_eq!(stats.expired_blocks, 1);

        clock.advance(Duration::from_secs(30));
        let entry = manager.registry(Policy::Login).get(&client).unwrap();
        assert_eq!(entry.bucket().available(), 0);
        assert!(matches!(
            manager.check(Policy::Login, &client),
            Decision::Blocked { .. }
        ));
    }

    #[test]
    fn test_held_entry_is_reaped_after_retention() {
        let (manager, clock) = manager();
        let client = ClientIdentity::new("1.2.3.4");

        for _ in 0..6 {
            manager.check(Policy::Login, &client);
        }

        clock.advance(Duration::from_secs(59 * 60));
        assert_eq!(manager.reap().limiter_entries, 0);

        clock.advance(Duration::from_secs(2 * 60));
        assert_eq!(manager.reap().limiter_entries, 1);
        assert!(manager.registry(Policy::Login).is_empty());
    }

    #[derive(Clone, Default)]
    struct WarnCounter(std::sync::Arc<std::sync::atomic::AtomicUsize>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for WarnCounter {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            if *event.metadata().level() == tracing::Level::WARN {
                self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn test_block_logs_one_warning() {
        use tracing_subscriber::layer::SubscriberExt;

        let counter = WarnCounter::default();
        let subscriber = tracing_subscriber::registry().with(counter.clone());
        let (manager, _clock) = manager();
        let client = ClientIdentity::new("1.2.3.4");

        tracing::subscriber::with_default(subscriber, || {
            for _ in 0..6 {
                manager.check(Policy::Login, &client);
            }
        });
        assert_eq!(counter.0.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn test_register_only_warns() {
        let (manager, _clock) = manager();
        let client = ClientIdentity::new("1.2.3.4");

        for _ in 0..3 {
            assert!(manager.check(Policy::Register, &client).is_allowed());
        }
        for _ in 0..10 {
            assert_eq!(
                manager.check(Policy::Register, &client),
                Decision::Throttled {
                    retry_after: Duration::from_secs(20 * 60)
                }
            );
        }
        assert!(!manager.is_blocked(&client).0);
    }

    #[test]
    fn test_general_blocks_after_repeated_violations() {
        let (manager, _clock) = manager();
        let client = ClientIdentity::new("1.2.3.4");

        for _ in 0..100 {
            assert!(manager.check(Policy::General, &client).is_allowed());
        }
        assert!(matches!(
            manager.check(Policy::General, &client),
            Decision::Throttled { .. }
        ));
        assert!(matches!(
            manager.check(Policy::General, &client),
            Decision::Throttled { .. }
        ));
        assert!(matches!(
            manager.check(Policy::General, &client),
            Decision::Blocked { .. }
        ));
    }

    #[test]
    fn test_allowed_request_resets_violation_streak() {
        let (manager, clock) = manager();
        let client = ClientIdentity::new("1.2.3.4");

        for _ in 0..100 {
            manager.check(Policy::General, &client);
        }
        for _ in 0..2 {
            assert!(matches!(
                manager.check(Policy::General, &client),
                Decision::Throttled { .. }
            ));
        }

        clock.advance(Duration::from_millis(600));
        assert!(manager.check(Policy::General, &client).is_allowed());

        for _ in 0..2 {
            assert!(matches!(
                manager.check(Policy::General, &client),
                Decision::Throttled { .. }
            ));
        }
        assert!(!manager.is_blocked(&client).0);
    }

    #[test]
    fn test_block_applies_to_every_policy() {
        let (manager, _clock) = manager();
        let client = ClientIdentity::new("1.2.3.4");

        manager.block(&client, Duration::from_secs(60));

        for policy in Policy::ALL {
            assert!(matches!(
                manager.check(policy, &client),
                Decision::Blocked { .. }
            ));
            assert!(manager.registry(policy).is_empty());
        }
    }

    #[test]
    fn test_reap_counts() {
        let (manager, clock) = manager();
        manager.check(Policy::Search, &ClientIdentity::new("1.1.1.1"));
        manager.check(Policy::General, &ClientIdentity::new("1.1.1.1"));
        manager.block(&ClientIdentity::new("2.2.2.2"), Duration::from_secs(60));

        clock.advance(Duration::from_secs(31 * 60));

        assert_eq!(
            manager.reap(),
            ReapStats {
                limiter_entries: 2,
                expired_blocks: 1,
            }
        );
        assert_eq!(manager.reap().total(), 0);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = RateLimitingConfig::default();
        config.search.burst = 0;
        let err = SecurityManager::new(&config).unwrap_err();
        assert!(err.to_string().contains("search"));

        let mut config = RateLimitingConfig::default();
        config.reaper.interval = SettingsDuration::from_secs(0);
        assert!(SecurityManager::new(&config).is_err());
    }
}
