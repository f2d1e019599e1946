//! Periodic connection-pool metrics.
//!
//! Owned by `main` and started/stopped explicitly; nothing runs at import time.

use std::time::Duration;

use sqlx::PgPool;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub size: u32,
    pub idle: usize,
}

impl PoolSnapshot {
    pub fn in_use(&self) -> usize {
        (self.size as usize).saturating_sub(self.idle)
    }
}

pub struct DbMetricsMonitor {
    pool: PgPool,
    interval: Duration,
    running: Option<(watch::Sender<bool>, JoinHandle<()>)>,
}

impl DbMetricsMonitor {
    pub fn new(pool: PgPool, interval: Duration) -> Self {
        Self {
            pool,
            interval: interval.max(Duration::from_secs(1)),
            running: None,
        }
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        sample(&self.pool)
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Spawns the sampling task. Calling `start` twice is a no-op.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let pool = self.pool.clone();
        let period = self.interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let snapshot = sample(&pool);
                        debug!(
                            "DB pool: {} connections, {} idle, {} in use",
                            snapshot.size,
                            snapshot.idle,
                            snapshot.in_use()
                        );
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });

        info!("DB metrics monitor started (every {:?})", self.interval);
        self.running = Some((stop_tx, handle));
    }

    /// Signals the sampling task and waits for it to finish.
    pub async fn stop(&mut self) {
        let Some((stop_tx, handle)) = self.running.take() else {
            return;
        };
        let _ = stop_tx.send(true);
        if let Err(e) = handle.await {
            warn!("DB metrics monitor task ended abnormally: {e}");
        }
        let last = self.snapshot();
        info!(
            "DB metrics monitor stopped ({} connections, {} idle)",
            last.size, last.idle
        );
    }
}

fn sample(pool: &PgPool) -> PoolSnapshot {
    PoolSnapshot {
        size: pool.size(),
        idle: pool.num_idle(),
    }
}
