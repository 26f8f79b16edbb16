use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tokio::{signal, sync::Notify};
use tracing::{error, info};

#[derive(Clone, Debug, Default)]
pub struct StopFlag {
    flag: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Resolves once `stop()` was called, immediately if it already was
    pub async fn wait(&self) {
        // Register before checking the flag, a stop in between is not lost.
        let notified = self.notify.notified();
        if self.is_stopped() {
            return;
        }
        notified.await;
    }
}

pub fn register_signal_handler(stop_flag: &StopFlag) {
    {
        let stop_flag = stop_flag.clone();
        tokio::spawn(async move {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
                return;
            }
            info!("Ctrl-C received, initiating graceful shutdown...");
            stop_flag.stop();
        });
    }

    #[cfg(unix)]
    {
        let stop_flag = stop_flag.clone();
        tokio::spawn(async move {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut terminate) => {
                    terminate.recv().await;
                    info!("Terminate signal received, initiating graceful shutdown...");
                    stop_flag.stop();
                }
                Err(e) => error!("Failed to install terminate signal handler: {}", e),
            }
        });
    }
}
