use chrono::{DateTime, Datelike, NaiveDate, Utc};

use monitor_core::{AccountingState, DailyUsage, bytes_to_gb};
use monitor_store::StateStore;

use crate::error::Result;

/// Converts the raw cumulative counter into calendar-bucketed usage.
///
/// Time and the counter reading are always passed in explicitly, never read
/// ambiently, so every transition is reproducible in tests. The engine is not
/// thread-safe on its own; `MonitorService` serializes all access behind one
/// lock held for the full reconcile-then-read-or-write sequence.
pub struct AccountingEngine {
    state: AccountingState,
    store: StateStore,
}

impl AccountingEngine {
    /// Loads prior state from the store. A missing or unreadable record is
    /// treated as "no prior state": the engine starts zeroed and initializes
    /// itself on the first reconcile.
    pub fn load(store: StateStore) -> Self {
        let state = match store.load() {
            Ok(Some(state)) => state,
            Ok(None) => AccountingState::default(),
            Err(err) => {
                tracing::warn!("state file unreadable, starting fresh: {err}");
                AccountingState::default()
            }
        };
        Self { state, store }
    }

    pub fn state(&self) -> &AccountingState {
        &self.state
    }

    /// Aligns the state with the calendar before any read or mutation.
    ///
    /// The month check runs strictly before the day check: a new month always
    /// implies a new day, and checking month first keeps the outgoing day
    /// from being finalized into the wrong month.
    pub fn reconcile(&mut self, now: DateTime<Utc>, counter: u64) -> Result<()> {
        let month_key = now.format("%Y-%m").to_string();
        let day_key = now.format("%Y-%m-%d").to_string();

        if self.state.current_month.as_deref() != Some(month_key.as_str()) {
            self.state.current_month = Some(month_key);
            self.state.month_baseline = counter;
            self.state.last_observed_counter = counter;
            self.state.daily_totals.clear();
            self.state.daily_baseline = counter;
            self.state.current_day = Some(day_key);
            self.store.save(&self.state)?;
        } else if self.state.current_day.as_deref() != Some(day_key.as_str()) {
            // The outgoing day is finalized against the current reading, so
            // if polling straddled midnight the error is bounded by one
            // polling interval. Accepted, not reconciled further.
            if let Some(previous_day) = self.state.current_day.take() {
                let finalized = counter as i64 - self.state.daily_baseline as i64;
                self.state.daily_totals.insert(previous_day, finalized);
            }
            self.state.daily_baseline = counter;
            self.state.current_day = Some(day_key);
            self.store.save(&self.state)?;
        }
        Ok(())
    }

    pub fn record_sample(&mut self, now: DateTime<Utc>, counter: u64) -> Result<()> {
        self.reconcile(now, counter)?;
        self.state.last_observed_counter = counter;
        self.store.save(&self.state)?;
        Ok(())
    }

    /// True derived usage for the current month. Goes negative if the counter
    /// source reset before a new baseline was captured; the engine never
    /// clamps, callers do at presentation time.
    pub fn current_usage_bytes(&self) -> i64 {
        self.state.last_observed_counter as i64 - self.state.month_baseline as i64
            + self.state.manual_offset_bytes
    }

    /// Overwrites the correction offset. Not additive, and not reset by
    /// rollovers: a correction carries into the next period until replaced.
    pub fn set_manual_offset(&mut self, offset_bytes: i64) -> Result<()> {
        self.state.manual_offset_bytes = offset_bytes;
        self.store.save(&self.state)?;
        Ok(())
    }

    /// Replaces every field at once. Administrative recovery path; callers
    /// validate structure before this is reached.
    pub fn replace_state(&mut self, state: AccountingState) -> Result<()> {
        self.state = state;
        self.store.save(&self.state)?;
        Ok(())
    }

    /// One value per calendar day of the current month, day 1 to the last:
    /// the finalized total for past days, the in-progress delta for today,
    /// zero for future days and gaps where no samples were taken.
    pub fn daily_series(&mut self, now: DateTime<Utc>, counter: u64) -> Result<DailyUsage> {
        self.reconcile(now, counter)?;
        let year = now.year();
        let month = now.month();
        let days = days_in_month(year, month);
        let mut labels = Vec::with_capacity(days as usize);
        let mut values_gb = Vec::with_capacity(days as usize);
        for day in 1..=days {
            let key = format!("{year:04}-{month:02}-{day:02}");
            let bytes = if self.state.current_day.as_deref() == Some(key.as_str()) {
                counter as i64 - self.state.daily_baseline as i64
            } else {
                self.state.daily_totals.get(&key).copied().unwrap_or(0)
            };
            labels.push(day);
            values_gb.push(bytes_to_gb(bytes));
        }
        Ok(DailyUsage {
            month: now.format("%Y-%m").to_string(),
            month_display: now.format("%B %Y").to_string(),
            today: now.day(),
            labels,
            values_gb,
        })
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    match (
        NaiveDate::from_ymd_opt(year, month, 1),
        NaiveDate::from_ymd_opt(next_year, next_month, 1),
    ) {
        (Some(first), Some(next)) => (next - first).num_days() as u32,
        // Unreachable for dates coming out of a valid DateTime.
        _ => 30,
    }
}
