use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use cookbook_core::settings::rate_limiting::MAX_DURATION;
use governor::clock::{Clock, Reference};
use governor::nanos::Nanos;
use tracing::debug;

use super::extractors::ClientIdentity;
use super::{read, write};

/// Clients that are currently refused on every policy, with their expiry.
///
/// Expired entries are dropped lazily on lookup and in bulk by the reaper.
pub struct BlockList<C: Clock> {
    clock: C,
    entries: RwLock<HashMap<ClientIdentity, C::Instant>>,
}

impl<C: Clock> BlockList<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Remaining block time, `None` when the client is not blocked
    pub fn blocked_for(&self, client: &ClientIdentity) -> Option<Duration> {
        let now = self.clock.now();
        {
            let entries = read(&self.entries);
            match entries.get(client) {
                None => return None,
                Some(until) if *until > now => {
                    return Some(until.duration_since(now).into());
                }
                Some(_) => {}
            }
        }

        let mut entries = write(&self.entries);
        // Re-check, the block may have been renewed in between.
        match entries.get(client) {
            Some(until) if *until > now => Some(until.duration_since(now).into()),
            Some(_) => {
                entries.remove(client);
                debug!(client = %client, "Block expired");
                None
            }
            None => None,
        }
    }

    pub fn is_blocked(&self, client: &ClientIdentity) -> (bool, Duration) {
        match self.blocked_for(client) {
            Some(remaining) => (true, remaining),
            None => (false, Duration::ZERO),
        }
    }

    /// Block `client` for `duration` from now, replacing any existing block.
    ///
    /// Durations above `MAX_DURATION` are clamped. Returns the instant the
    /// block ends.
    pub fn block(&self, client: &ClientIdentity, duration: Duration) -> C::Instant {
        let duration = duration.min(MAX_DURATION.as_duration());
        let until = self.clock.now() + Nanos::from(duration);
        write(&self.entries).insert(client.clone(), until);
        debug!(
            client = %client,
            duration_secs = duration.as_secs(),
            "Block list entry set"
        );
        until
    }

    pub fn len(&self) -> usize {
        read(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop expired blocks, returns the number removed
    pub fn reap(&self) -> usize {
        let now = self.clock.now();
        let mut entries = write(&self.entries);
        let initial_count = entries.len();
        entries.retain(|_, until| *until > now);
        initial_count - entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use governor::clock::FakeRelativeClock;

    #[test]
    fn test_unknown_client_is_not_blocked() {
        let list = BlockList::new(FakeRelativeClock::default());
        assert_eq!(
            list.is_blocked(&ClientIdentity::new("1.2.3.4")),
            (false, Duration::ZERO)
        );
    }

    #[test]
    fn test_block_reports_remaining_time() {
        let clock = FakeRelativeClock::default();
        let list = BlockList::new(clock.clone());
        let client = ClientIdentity::new("1.2.3.4");

        list.block(&client, Duration::from_secs(30 * 60));
        clock.advance(Duration::from_secs(10 * 60));

        assert_eq!(
            list.is_blocked(&client),
            (true, Duration::from_secs(20 * 60))
        );
    }

    #[test]
    fn test_expired_block_is_removed_on_lookup() {
        let clock = FakeRelativeClock::default();
        let list = BlockList::new(clock.clone());
        let client = ClientIdentity::new("1.2.3.4");

        list.block(&client, Duration::from_secs(60));
        clock.advance(Duration::from_secs(60));

        assert_eq!(list.blocked_for(&client), None);
        assert!(list.is_empty());
    }

    #[test]
    fn test_later_block_replaces_earlier() {
        let clock = FakeRelativeClock::default();
        let list = BlockList::new(clock.clone());
        let client = ClientIdentity::new("1.2.3.4");

        list.block(&client, Duration::from_secs(600));
        list.block(&client, Duration::from_secs(60));

        assert_eq!(list.blocked_for(&client), Some(Duration::from_secs(60)));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_reap_drops_only_expired() {
        let clock = FakeRelativeClock::default();
        let list = BlockList::new(clock.clone());

        list.block(&ClientIdentity::new("1.1.1.1"), Duration::from_secs(60));
        list.block(&ClientIdentity::new("2.2.2.2"), Duration::from_secs(600));
        clock.advance(Duration::from_secs(120));

        assert_eq!(list.reap(), 1);
        assert_eq!(list.len(), 1);
        assert!(list.blocked_for(&ClientIdentity::new("2.2.2.2")).is_some());
    }

    #[test]
    fn test_overlong_block_is_clamped() {
        let clock = FakeRelativeClock::default();
        let list = BlockList::new(clock.clone());
        let client = ClientIdentity::new("1.2.3.4");

        list.block(&client, Duration::from_secs(6_000_000 * 3600));

        assert_eq!(list.blocked_for(&client), Some(MAX_DURATION.as_duration()));
    }
}
