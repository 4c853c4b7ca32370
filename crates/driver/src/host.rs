//! Collaborator contracts
//!
//! [`UsbNetHost`] is what the USB networking framework provides to the
//! driver; [`UsbNetDriver`] is the fixed set of lifecycle hooks the framework
//! calls back into. The framework holds drivers as `Box<dyn UsbNetDriver>`
//! and hands itself to each hook as `&mut dyn UsbNetHost`.

use crate::control::ControlBuffer;
use crate::error::Result;
use bytes::BytesMut;
use ipheth_protocol::{AltSetting, CarrierState, MacAddress, TransferError};
use std::time::Duration;

/// Parameters of one control transfer, minus the data stage buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlRequest {
    /// Control endpoint number
    pub endpoint: u8,
    /// `bmRequestType`
    pub request_type: u8,
    /// `bRequest`
    pub request: u8,
    /// `wValue`
    pub value: u16,
    /// `wIndex`
    pub index: u16,
    pub timeout: Duration,
}

impl ControlRequest {
    /// Whether the data stage flows device to host
    pub fn is_in(&self) -> bool {
        self.request_type & 0x80 != 0
    }
}

/// Primitives the USB networking framework supplies to the driver
pub trait UsbNetHost {
    /// Run a device-to-host control transfer into `buf`
    ///
    /// Returns the number of bytes the device sent. Timeouts are reported
    /// as [`TransferError::Timeout`].
    fn control_in(
        &mut self,
        request: &ControlRequest,
        buf: &mut [u8],
    ) -> std::result::Result<usize, TransferError>;

    /// Look up an alternate setting of an interface in the device's active
    /// configuration
    fn alt_setting(&self, interface: u8, alternate: u8) -> Option<AltSetting>;

    /// Select an alternate setting
    fn set_interface(
        &mut self,
        interface: u8,
        alternate: u8,
    ) -> std::result::Result<(), TransferError>;

    /// Currently selected alternate setting, if the host tracks it
    fn active_alt_setting(&self, _interface: u8) -> Option<u8> {
        None
    }

    /// Publish the hardware address on the network interface
    fn set_mac_address(&mut self, mac: MacAddress);

    /// Link-up notification sink
    fn carrier_on(&mut self);

    /// Link-down notification sink
    fn carrier_off(&mut self);

    /// Obtain a control scratch buffer of `len` bytes
    fn allocate_scratch(&mut self, len: usize) -> Result<ControlBuffer> {
        ControlBuffer::try_new(len)
    }

    /// Give back a buffer obtained from [`UsbNetHost::allocate_scratch`]
    fn release_scratch(&mut self, buffer: ControlBuffer) {
        drop(buffer);
    }
}

/// Lifecycle hooks the framework invokes on a bound driver instance
pub trait UsbNetDriver: Send {
    /// Human-readable driver description
    fn description(&self) -> &'static str;

    /// Called once when a matching interface is attached
    fn bind(&mut self, host: &mut dyn UsbNetHost) -> Result<()>;

    /// Called once on detach; never fails
    fn unbind(&mut self, host: &mut dyn UsbNetHost);

    /// Called during recovery and before the interface is opened
    fn reset(&mut self, host: &mut dyn UsbNetHost) -> Result<()>;

    /// Poll the link state and publish it through the carrier sinks
    ///
    /// `Ok(CarrierState::Down)` is a successful check of a down link; only
    /// a failed check returns `Err`.
    fn check_connect(&mut self, host: &mut dyn UsbNetHost) -> Result<CarrierState>;

    /// Prepare one received frame for the network stack
    fn rx_fixup(&self, frame: &mut BytesMut) -> Result<()>;
}
