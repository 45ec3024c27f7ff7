//! Background Expiry Sweeper
//!
//! Lazy expiry hides an expired key from every read, but a key that is never
//! touched again would stay in memory forever. The sweeper is a Tokio task
//! that wakes on a fixed interval and removes every expired entry under the
//! store's write lock.
//!
//! The task holds only a weak reference to the store. It stops when its
//! [`ExpirySweeper`] handle is stopped or dropped, or when the store itself
//! is gone.

use crate::storage::StorageEngine;
use std::sync::Weak;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

/// Configuration for the expiry sweeper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryConfig {
    /// Time between sweeps (default: 1s)
    pub interval: Duration,
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
        }
    }
}

/// A handle to the running expiry sweeper.
///
/// When this handle is dropped, the sweeper task will be stopped.
#[derive(Debug)]
pub struct ExpirySweeper {
    shutdown_tx: watch::Sender<bool>,
}

impl ExpirySweeper {
    /// Spawns the sweeper loop for `engine`.
    ///
    /// Most callers want [`StorageEngine::with_sweeper`], which ties the
    /// sweeper to the store's lifetime. Must be called from within a Tokio
    /// runtime.
    pub fn start(engine: Weak<StorageEngine>, config: ExpiryConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(sweeper_loop(engine, config, shutdown_rx));

        info!(
            interval_ms = config.interval.as_millis() as u64,
            "Background expiry sweeper started"
        );

        Self { shutdown_tx }
    }

    /// Stops the expiry sweeper. Returns `true` only for the call that
    /// actually requested the stop.
    ///
    /// This is called automatically when the handle is dropped.
    pub fn stop(&self) -> bool {
        let requested = self
            .shutdown_tx
            .send_if_modified(|stopped| !std::mem::replace(stopped, true));

        if requested && !self.shutdown_tx.is_closed() {
            info!("Background expiry sweeper stopped");
        }
        requested
    }

    /// Whether the sweeper task is still alive.
    pub fn is_running(&self) -> bool {
        !self.shutdown_tx.is_closed()
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

async fn sweeper_loop(
    engine: Weak<StorageEngine>,
    config: ExpiryConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(config.interval) => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("Expiry sweeper received shutdown signal");
                    return;
                }
            }
        }

        let Some(engine) = engine.upgrade() else {
            debug!("Store dropped, expiry sweeper exiting");
            return;
        };

        let removed = engine.cleanup_expired();
        if removed > 0 {
            debug!(
                removed = removed,
                keys_remaining = engine.len(),
                "Expired keys cleaned up"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::sync::Arc;

    fn fast() -> ExpiryConfig {
        ExpiryConfig {
            interval: Duration::from_millis(10),
        }
    }

    #[tokio::test]
    async fn test_sweeper_cleans_expired_keys() {
        let engine = StorageEngine::with_sweeper(fast());

        for i in 0..10 {
            engine.set_with_ttl(
                Bytes::from(format!("key{}", i)),
                Bytes::from("value"),
                Duration::from_millis(30),
            );
        }
        engine.set(Bytes::from("persistent"), Bytes::from("value"));

        assert_eq!(engine.len(), 11);

        tokio::time::sleep(Duration::from_millis(200)).await;

        // Reclaimed physically, not just hidden
        assert_eq!(engine.stats().expired, 10);
        assert_eq!(engine.len(), 1);
        assert!(engine.exists(b"persistent"));
    }

    #[tokio::test]
    async fn test_sweeper_stops_on_request() {
        let engine = StorageEngine::with_sweeper(fast());
        let sweeper = engine.sweeper().unwrap();
        assert!(sweeper.is_running());

        assert!(sweeper.stop());
        assert!(!sweeper.stop());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!sweeper.is_running());

        engine.set_with_ttl(
            Bytes::from("key"),
            Bytes::from("value"),
            Duration::from_millis(10),
        );
        tokio::time::sleep(Duration::from_millis(100)).await;

        // Nothing swept, but lazy expiry still hides the key
        assert_eq!(engine.stats().expired, 0);
        assert!(!engine.exists(b"key"));
        assert_eq!(engine.cleanup_expired(), 1);
    }

    #[tokio::test]
    async fn test_sweeper_exits_when_store_dropped() {
        let engine = Arc::new(StorageEngine::new());
        let sweeper = ExpirySweeper::start(Arc::downgrade(&engine), fast());

        drop(engine);
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(!sweeper.is_running());
    }
}
