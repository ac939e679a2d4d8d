use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{SecondsFormat, Utc};

use monitor_core::{
    AccountingState, DailyUsage, GIB, UsageSnapshot, bytes_to_gb, gb_to_bytes, round2, status_for,
};

use crate::counter::CounterSource;
use crate::engine::AccountingEngine;
use crate::error::{AppError, Result};

/// Seam between the engine and its callers (poller, HTTP handlers).
///
/// Reads the clock and the counter source, then drives the engine under one
/// exclusive lock so a reader never observes a state mid-rollover and two
/// rollovers never race. The store write inside the engine is the only I/O
/// under the lock.
pub struct MonitorService {
    engine: Mutex<AccountingEngine>,
    counter: Arc<dyn CounterSource>,
    cap_bytes: u64,
}

impl MonitorService {
    pub fn new(engine: AccountingEngine, counter: Arc<dyn CounterSource>, cap_bytes: u64) -> Self {
        Self {
            engine: Mutex::new(engine),
            counter,
            cap_bytes,
        }
    }

    pub fn cap_bytes(&self) -> u64 {
        self.cap_bytes
    }

    fn lock_engine(&self) -> Result<MutexGuard<'_, AccountingEngine>> {
        self.engine
            .lock()
            .map_err(|_| AppError::Message("engine lock poisoned".to_string()))
    }

    /// One poll tick: read the counter, fold it into the engine.
    pub fn sample_once(&self) -> Result<()> {
        let counter = self.counter.total_bytes_sent()?;
        let mut engine = self.lock_engine()?;
        engine.record_sample(Utc::now(), counter)
    }

    pub fn usage_summary(&self) -> Result<UsageSnapshot> {
        let counter = self.counter.total_bytes_sent()?;
        let now = Utc::now();
        let mut engine = self.lock_engine()?;
        engine.reconcile(now, counter)?;
        let used_bytes = engine.current_usage_bytes();
        let state = engine.state();
        Ok(UsageSnapshot {
            month: state.current_month.clone().unwrap_or_default(),
            used_bytes,
            used_gb: round2(bytes_to_gb(used_bytes)),
            cap_gb: round2(self.cap_bytes as f64 / GIB as f64),
            status: status_for(used_bytes, self.cap_bytes),
            manual_offset_gb: round2(bytes_to_gb(state.manual_offset_bytes)),
            updated_at: now.to_rfc3339_opts(SecondsFormat::Secs, true),
        })
    }

    pub fn daily_usage(&self) -> Result<DailyUsage> {
        let counter = self.counter.total_bytes_sent()?;
        let now = Utc::now();
        let mut engine = self.lock_engine()?;
        engine.daily_series(now, counter)
    }

    /// Converts the operator-entered GB figure to bytes (multiply by 2^30,
    /// truncate) and overwrites the engine's offset. Non-finite input never
    /// reaches the engine.
    pub fn set_manual_offset_gb(&self, offset_gb: f64) -> Result<()> {
        if !offset_gb.is_finite() {
            return Err(AppError::InvalidInput(format!(
                "offset must be a finite number of GB, got {offset_gb}"
            )));
        }
        let mut engine = self.lock_engine()?;
        engine.set_manual_offset(gb_to_bytes(offset_gb))
    }

    /// Administrative full-state overwrite; all fields replaced atomically
    /// under the same lock every other operation uses.
    pub fn replace_state(&self, state: AccountingState) -> Result<AccountingState> {
        let mut engine = self.lock_engine()?;
        engine.replace_state(state)?;
        Ok(engine.state().clone())
    }

    pub fn state_snapshot(&self) -> Result<AccountingState> {
        Ok(self.lock_engine()?.state().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    use monitor_core::TrafficStatus;
    use monitor_store::StateStore;

    use crate::counter::CounterError;

    pub(crate) struct FixedCounter(pub AtomicU64);

    impl CounterSource for FixedCounter {
        fn total_bytes_sent(&self) -> std::result::Result<u64, CounterError> {
            Ok(self.0.load(Ordering::SeqCst))
        }
    }

    fn service_with(
        counter: Arc<FixedCounter>,
        cap_bytes: u64,
    ) -> (MonitorService, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("temp dir");
        let engine = AccountingEngine::load(StateStore::new(dir.path().join("state.json")));
        (MonitorService::new(engine, counter, cap_bytes), dir)
    }

    #[test]
    fn summary_reports_zero_usage_after_first_sample() {
        let counter = Arc::new(FixedCounter(AtomicU64::new(1000)));
        let (service, _dir) = service_with(counter, 100 * GIB);

        let summary = service.usage_summary().expect("summary");
        assert_eq!(summary.used_bytes, 0);
        assert_eq!(summary.used_gb, 0.0);
        assert_eq!(summary.status, TrafficStatus::Normal);
        assert!(!summary.month.is_empty());
        assert!(!summary.updated_at.is_empty());
    }

    #[test]
    fn status_at_exactly_the_cap_is_warning_not_over() {
        let counter = Arc::new(FixedCounter(AtomicU64::new(1000)));
        let (service, _dir) = service_with(counter.clone(), 100 * GIB);
        service.sample_once().expect("baseline sample");

        counter.0.store(1000 + 100 * GIB, Ordering::SeqCst);
        service.sample_once().expect("sample");
        let summary = service.usage_summary().expect("summary");
        assert_eq!(summary.used_bytes, (100 * GIB) as i64);
        assert_eq!(summary.status, TrafficStatus::Warning);

        counter.0.store(1000 + 100 * GIB + 1, Ordering::SeqCst);
        service.sample_once().expect("sample");
        let summary = service.usage_summary().expect("summary");
        assert_eq!(summary.status, TrafficStatus::Over);
    }

    #[test]
    fn offset_gb_is_truncated_to_bytes() {
        let counter = Arc::new(FixedCounter(AtomicU64::new(0)));
        let (service, _dir) = service_with(counter, 100 * GIB);
        service.set_manual_offset_gb(1.5).expect("offset");
        let state = service.state_snapshot().expect("snapshot");
        assert_eq!(state.manual_offset_bytes, 1_610_612_736);
    }

    #[test]
    fn non_finite_offset_is_rejected_before_the_engine() {
        let counter = Arc::new(FixedCounter(AtomicU64::new(0)));
        let (service, _dir) = service_with(counter, 100 * GIB);
        let err = service.set_manual_offset_gb(f64::NAN).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        let state = service.state_snapshot().expect("snapshot");
        assert_eq!(state.manual_offset_bytes, 0);
    }

    #[test]
    fn daily_usage_and_summary_agree_on_the_month() {
        let counter = Arc::new(FixedCounter(AtomicU64::new(5000)));
        let (service, _dir) = service_with(counter, 100 * GIB);
        let summary = service.usage_summary().expect("summary");
        let daily = service.daily_usage().expect("daily");
        assert_eq!(summary.month, daily.month);
        assert_eq!(daily.labels.len(), daily.values_gb.len());
        assert_eq!(daily.labels.first(), Some(&1));
    }
}
