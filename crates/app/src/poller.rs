use std::sync::Arc;
use std::time::Duration;

use crate::service::MonitorService;

/// Spawns the sampling loop: one counter read folded into the engine per
/// tick, for the lifetime of the process. The first tick fires immediately so
/// the baseline is captured at startup. A failed read or a failed store write
/// skips the tick and leaves the state untouched; the loop never exits.
pub fn spawn(service: Arc<MonitorService>, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if let Err(err) = service.sample_once() {
                tracing::warn!("sample skipped: {err}");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    use monitor_store::StateStore;

    use crate::counter::{CounterError, CounterSource};
    use crate::engine::AccountingEngine;

    /// Fails on the first read, succeeds afterwards.
    struct FlakyCounter {
        calls: AtomicU64,
    }

    impl CounterSource for FlakyCounter {
        fn total_bytes_sent(&self) -> Result<u64, CounterError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(CounterError::Unavailable("first read fails".to_string()))
            } else {
                Ok(4096)
            }
        }
    }

    #[tokio::test]
    async fn failed_tick_is_skipped_and_the_loop_continues() {
        let dir = tempfile::tempdir().expect("temp dir");
        let engine = AccountingEngine::load(StateStore::new(dir.path().join("state.json")));
        let counter = Arc::new(FlakyCounter {
            calls: AtomicU64::new(0),
        });
        let service = Arc::new(MonitorService::new(engine, counter.clone(), 100));

        let handle = spawn(service.clone(), Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        // The first tick errored; later ticks still landed a sample.
        assert!(counter.calls.load(Ordering::SeqCst) >= 2);
        let state = service.state_snapshot().expect("snapshot");
        assert_eq!(state.last_observed_counter, 4096);
        assert!(state.current_month.is_some());
    }
}
