//! Device adaptation core for iPhone USB tethering
//!
//! Turns the tethering interface of an iPhone or iPad into a link-layer
//! network device. The USB networking framework drives the core through the
//! [`UsbNetDriver`] hooks and supplies the primitives of [`UsbNetHost`]:
//!
//! - [`UsbNetDriver::bind`] resolves the bulk pipes of alternate setting 1
//!   and reads the hardware address over the vendor control channel
//! - [`UsbNetDriver::reset`] selects alternate setting 1 on interface 2
//! - [`UsbNetDriver::check_connect`] polls the carrier and drives the
//!   carrier sinks
//! - [`UsbNetDriver::rx_fixup`] strips the alignment pad of every received
//!   frame
//! - [`UsbNetDriver::unbind`] releases the control scratch buffer
//!
//! Bulk scheduling, the network device itself and the device allow-list
//! belong to the framework.

pub mod control;
pub mod endpoint;
pub mod error;
pub mod fixup;
pub mod host;
pub mod session;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use control::{ControlBuffer, ControlChannel};
pub use endpoint::resolve;
pub use error::{DriverError, MissingEndpoint, Result};
pub use fixup::rx_fixup;
pub use host::{ControlRequest, UsbNetDriver, UsbNetHost};
pub use session::{IphoneSession, SessionState};
