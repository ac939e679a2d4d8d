pub mod config;
pub mod counter;
pub mod engine;
pub mod error;
pub mod poller;
pub mod service;

pub use config::MonitorConfig;
pub use counter::{CounterError, CounterSource, SysinfoCounter};
pub use engine::AccountingEngine;
pub use error::{ApiError, AppError, Result};
pub use service::MonitorService;
