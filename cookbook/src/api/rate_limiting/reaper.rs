use std::sync::Arc;
use std::time::Duration;

use clokwerk::{AsyncScheduler, Interval};
use governor::clock::Clock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::manager::SecurityManager;
use crate::stop_flag::StopFlag;

/// Schedule the periodic sweep of idle limiter entries and expired blocks.
///
/// The task ends once `stop_flag` is set.
pub fn setup_reaper<C>(
    manager: Arc<SecurityManager<C>>,
    stop_flag: StopFlag,
) -> JoinHandle<anyhow::Result<()>>
where
    C: Clock + Clone + Send + Sync + 'static,
{
    let interval = scheduler_interval(manager.reap_interval());
    info!(
        interval_secs = manager.reap_interval().as_secs(),
        retention_secs = manager.retention().as_secs(),
        "Starting rate limiting reaper"
    );

    let mut scheduler = AsyncScheduler::new();
    scheduler.every(interval).run(move || {
        let manager = manager.clone();
        async move {
            let stats = manager.reap();
            debug!(
                limiter_entries = stats.limiter_entries,
                expired_blocks = stats.expired_blocks,
                "Rate limiting reaper run finished"
            );
        }
    });

    tokio::spawn(async move {
        while !stop_flag.is_stopped() {
            scheduler.run_pending().await;
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        info!("Rate limiting reaper stopped");
        Ok(())
    })
}

fn scheduler_interval(every: Duration) -> Interval {
    let secs = u32::try_from(every.as_secs()).unwrap_or(u32::MAX);
    Interval::Seconds(secs.max(1))
}
