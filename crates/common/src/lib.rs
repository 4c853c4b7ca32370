//! Common utilities for ipheth tools
//!
//! Logging setup, the shared error type, and the async channel bridge
//! between the Tokio runtime and the blocking USB worker thread.

pub mod channel;
pub mod error;
pub mod logging;

pub use channel::{LinkEvent, MonitorBridge, MonitorCommand, MonitorWorker, create_monitor_bridge};
pub use error::{Error, Result};
pub use logging::setup_logging;
