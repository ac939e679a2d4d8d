use std::sync::Mutex;

use sysinfo::Networks;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CounterError {
    #[error("counter source unavailable: {0}")]
    Unavailable(String),
}

/// Reads the host's cumulative outbound byte counter.
///
/// Monotonic under normal operation, but may reset to zero on reboot or
/// counter overflow; the accounting engine tolerates that.
pub trait CounterSource: Send + Sync {
    fn total_bytes_sent(&self) -> Result<u64, CounterError>;
}

/// System-wide counter summed across all network interfaces.
pub struct SysinfoCounter {
    networks: Mutex<Networks>,
}

impl SysinfoCounter {
    pub fn new() -> Self {
        Self {
            networks: Mutex::new(Networks::new_with_refreshed_list()),
        }
    }
}

impl Default for SysinfoCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterSource for SysinfoCounter {
    fn total_bytes_sent(&self) -> Result<u64, CounterError> {
        let mut networks = self
            .networks
            .lock()
            .map_err(|_| CounterError::Unavailable("networks lock poisoned".to_string()))?;
        // refresh_list picks up interfaces that appeared after startup.
        networks.refresh_list();
        let mut total = 0u64;
        for (_name, data) in networks.iter() {
            total += data.total_transmitted();
        }
        Ok(total)
    }
}
