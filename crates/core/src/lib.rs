use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One binary gigabyte. Caps and offsets entered in GB are converted with this.
pub const GIB: u64 = 1 << 30;

pub fn bytes_to_gb(bytes: i64) -> f64 {
    bytes as f64 / GIB as f64
}

/// Truncates toward zero, matching how operator-entered offsets are stored.
pub fn gb_to_bytes(gb: f64) -> i64 {
    (gb * GIB as f64) as i64
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// The single persisted accounting record.
///
/// `current_month` and `current_day` are `None` only before the very first
/// sample; every reconcile after that keeps them set. `daily_totals` holds
/// finalized past days of the current month only and never contains an entry
/// for `current_day`. Totals are signed: a counter reset mid-day finalizes a
/// negative delta, which is reported as-is rather than patched over.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountingState {
    pub current_month: Option<String>,
    pub month_baseline: u64,
    pub last_observed_counter: u64,
    pub manual_offset_bytes: i64,
    pub daily_totals: BTreeMap<String, i64>,
    pub daily_baseline: u64,
    pub current_day: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrafficStatus {
    Normal,
    Warning,
    Over,
}

/// Strictly greater at both boundaries: usage equal to the cap is `Warning`,
/// usage equal to 80% of the cap is `Normal`.
pub fn status_for(usage_bytes: i64, cap_bytes: u64) -> TrafficStatus {
    if usage_bytes > cap_bytes as i64 {
        TrafficStatus::Over
    } else if usage_bytes as f64 > 0.8 * cap_bytes as f64 {
        TrafficStatus::Warning
    } else {
        TrafficStatus::Normal
    }
}

/// Current-month usage as served to the dashboard. `used_bytes` carries the
/// true derived value and may be negative after a counter reset; clamping is
/// left to the presentation side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    pub month: String,
    pub used_bytes: i64,
    pub used_gb: f64,
    pub cap_gb: f64,
    pub status: TrafficStatus,
    pub manual_offset_gb: f64,
    pub updated_at: String,
}

/// Per-day usage for the current month: one value per calendar day, in
/// ascending day order, zero for days without data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyUsage {
    pub month: String,
    pub month_display: String,
    pub today: u32,
    pub labels: Vec<u32>,
    pub values_gb: Vec<f64>,
}
