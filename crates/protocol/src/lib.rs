//! Vendor protocol definitions for iPhone USB tethering
//!
//! This crate holds everything about the device that is data rather than
//! behaviour: the constants table of the vendor control protocol, the
//! descriptor and link types the driver works with, and the table of
//! supported devices. It performs no I/O.
//!
//! # Example
//!
//! ```
//! use ipheth_protocol::{MacAddress, VendorProtocol};
//!
//! let protocol = VendorProtocol::IPHETH;
//! assert_eq!(protocol.carrier_check, 0x45);
//!
//! let mac: MacAddress = "02:00:00:00:00:01".parse().unwrap();
//! assert_eq!(mac.to_string(), "02:00:00:00:00:01");
//! ```

pub mod constants;
pub mod descriptor;
pub mod devices;
pub mod error;
pub mod types;

pub use constants::VendorProtocol;
pub use descriptor::{AltSetting, Direction, EndpointDescriptor, TransferKind};
pub use devices::{SUPPORTED_DEVICES, SupportedDevice};
pub use error::TransferError;
pub use types::{BulkInPipe, BulkOutPipe, CarrierState, MacAddress, MacAddressError, Pipes};
