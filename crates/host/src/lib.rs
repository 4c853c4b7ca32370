//! Userspace host for the ipheth driver core
//!
//! Runs [`ipheth_driver::IphoneSession`] against real hardware through
//! rusb, so a tethered phone can be probed and monitored without the kernel
//! driver.

pub mod config;
pub mod usb;

pub use config::{HostConfig, load_config};

use ipheth_protocol::devices::{DRIVER_DESCRIPTION, DRIVER_NAME};

/// Startup line naming the tool version and the driver it hosts
pub fn banner() -> String {
    format!(
        "ipheth probe v{} ({}: {})",
        env!("CARGO_PKG_VERSION"),
        DRIVER_NAME,
        DRIVER_DESCRIPTION
    )
}
