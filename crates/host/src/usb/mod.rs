//! USB side of the probe tool
//!
//! Device discovery, the rusb-backed framework host and the monitor worker
//! thread that owns it.

pub mod device;
pub mod discovery;
pub mod transfers;
pub mod worker;

pub use device::RusbHost;
pub use discovery::{DeviceFilter, TetherDevice, find_devices, select};
pub use worker::{MonitorWorkerThread, spawn_monitor_worker};
