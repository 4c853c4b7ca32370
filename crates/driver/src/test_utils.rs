//! Test utilities for the driver
//!
//! [`MockHost`] is a scripted [`UsbNetHost`]: control replies are queued per
//! request code, every request is recorded, carrier notifications are
//! collected and scratch buffer allocations are counted so tests can check
//! that nothing leaks.
//!
//! # Example
//!
//! ```
//! use ipheth_driver::test_utils::MockHost;
//! use ipheth_driver::{IphoneSession, UsbNetDriver};
//! use ipheth_protocol::MacAddress;
//!
//! let mac = MacAddress([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
//! let mut host = MockHost::iphone(mac);
//!
//! let mut session = IphoneSession::attach(&mut host).unwrap();
//! assert_eq!(session.mac_address(), Some(mac));
//!
//! session.unbind(&mut host);
//! assert_eq!(host.live_scratch_buffers(), 0);
//! ```

use crate::control::ControlBuffer;
use crate::error::{DriverError, Result};
use crate::host::{ControlRequest, UsbNetHost};
use ipheth_protocol::constants::{ALT_SETTING, CARRIER_ON, CMD_CARRIER_CHECK, CMD_GET_MACADDR};
use ipheth_protocol::devices::{INTERFACE_CLASS, INTERFACE_PROTOCOL, INTERFACE_SUBCLASS};
use ipheth_protocol::{
    AltSetting, CarrierState, EndpointDescriptor, MacAddress, TransferError, TransferKind,
};
use std::collections::{HashMap, VecDeque};

/// Scripted outcome of one control transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockReply {
    /// Device answers with these bytes (truncated to the buffer)
    Data(Vec<u8>),
    /// Device answers with these bytes but the host reports a larger length
    Overreport(Vec<u8>, usize),
    /// Transfer fails with this status
    Fail(TransferError),
}

/// The interface 2 / alternate 1 setting of a tethering iPhone
pub fn iphone_alt_setting() -> AltSetting {
    AltSetting {
        interface_number: 2,
        alternate_setting: ALT_SETTING,
        class: INTERFACE_CLASS,
        subclass: INTERFACE_SUBCLASS,
        protocol: INTERFACE_PROTOCOL,
        endpoints: vec![
            EndpointDescriptor::new(0x81, TransferKind::Bulk, 512),
            EndpointDescriptor::new(0x02, TransferKind::Bulk, 512),
        ],
    }
}

/// The endpoint-less alternate 0 of the tethering interface
pub fn idle_alt_setting() -> AltSetting {
    AltSetting {
        alternate_setting: 0,
        endpoints: Vec::new(),
        ..iphone_alt_setting()
    }
}

/// Recording, scriptable host
#[derive(Debug, Default)]
pub struct MockHost {
    alt_settings: Vec<AltSetting>,
    replies: HashMap<u8, VecDeque<MockReply>>,
    requests: Vec<(ControlRequest, usize)>,
    active_alt: HashMap<u8, u8>,
    set_interface_calls: usize,
    set_interface_error: Option<TransferError>,
    mac: Option<MacAddress>,
    carrier_events: Vec<CarrierState>,
    fail_allocation: bool,
    allocations: usize,
    releases: usize,
}

impl MockHost {
    /// A host with no descriptors and no scripted replies
    pub fn new() -> Self {
        Self::default()
    }

    /// A host that looks like a tethering iPhone: both alternate settings
    /// present, the given MAC and carrier up
    pub fn iphone(mac: MacAddress) -> Self {
        let mut host = Self::new();
        host.alt_settings = vec![idle_alt_setting(), iphone_alt_setting()];
        host.reply(CMD_GET_MACADDR, MockReply::Data(mac.octets().to_vec()));
        host.reply(CMD_CARRIER_CHECK, MockReply::Data(vec![CARRIER_ON]));
        host
    }

    /// Replace all scripted replies for `request` with one sticky reply
    pub fn reply(&mut self, request: u8, reply: MockReply) {
        self.replies.insert(request, VecDeque::from([reply]));
    }

    /// Queue replies for `request`; the last one repeats once reached
    pub fn reply_sequence(&mut self, request: u8, replies: impl IntoIterator<Item = MockReply>) {
        self.replies.insert(request, replies.into_iter().collect());
    }

    /// Add or replace an alternate setting
    pub fn set_alt_setting(&mut self, setting: AltSetting) {
        self.alt_settings.retain(|s| {
            (s.interface_number, s.alternate_setting)
                != (setting.interface_number, setting.alternate_setting)
        });
        self.alt_settings.push(setting);
    }

    pub fn remove_alt_settings(&mut self) {
        self.alt_settings.clear();
    }

    pub fn fail_allocation(&mut self, fail: bool) {
        self.fail_allocation = fail;
    }

    pub fn fail_set_interface(&mut self, error: Option<TransferError>) {
        self.set_interface_error = error;
    }

    /// Every control request issued, with the buffer length offered
    pub fn requests(&self) -> &[(ControlRequest, usize)] {
        &self.requests
    }

    pub fn set_interface_calls(&self) -> usize {
        self.set_interface_calls
    }

    /// Address published through [`UsbNetHost::set_mac_address`]
    pub fn mac_address(&self) -> Option<MacAddress> {
        self.mac
    }

    /// Carrier notifications in the order they were sent
    pub fn carrier_events(&self) -> &[CarrierState] {
        &self.carrier_events
    }

    pub fn allocations(&self) -> usize {
        self.allocations
    }

    pub fn releases(&self) -> usize {
        self.releases
    }

    /// Scratch buffers handed out and not yet given back
    pub fn live_scratch_buffers(&self) -> usize {
        self.allocations - self.releases
    }

    fn next_reply(&mut self, request: u8) -> Option<MockReply> {
        let queue = self.replies.get_mut(&request)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

impl UsbNetHost for MockHost {
    fn control_in(
        &mut self,
        request: &ControlRequest,
        buf: &mut [u8],
    ) -> std::result::Result<usize, TransferError> {
        self.requests.push((*request, buf.len()));

        let copy_into = |buf: &mut [u8], data: &[u8]| {
            let len = data.len().min(buf.len());
            buf[..len].copy_from_slice(&data[..len]);
            len
        };

        match self.next_reply(request.request) {
            Some(MockReply::Data(data)) => Ok(copy_into(buf, &data)),
            Some(MockReply::Overreport(data, reported)) => {
                copy_into(buf, &data);
                Ok(reported)
            }
            Some(MockReply::Fail(error)) => Err(error),
            // Unknown vendor requests stall on real devices
            None => Err(TransferError::Pipe),
        }
    }

    fn alt_setting(&self, interface: u8, alternate: u8) -> Option<AltSetting> {
        self.alt_settings
            .iter()
            .find(|s| s.interface_number == interface && s.alternate_setting == alternate)
            .cloned()
    }

    fn set_interface(
        &mut self,
        interface: u8,
        alternate: u8,
    ) -> std::result::Result<(), TransferError> {
        self.set_interface_calls += 1;
        if let Some(error) = &self.set_interface_error {
            return Err(error.clone());
        }
        if self.alt_setting(interface, alternate).is_none() {
            return Err(TransferError::NotFound);
        }
        self.active_alt.insert(interface, alternate);
        Ok(())
    }

    fn active_alt_setting(&self, interface: u8) -> Option<u8> {
        self.active_alt.get(&interface).copied()
    }

    fn set_mac_address(&mut self, mac: MacAddress) {
        self.mac = Some(mac);
    }

    fn carrier_on(&mut self) {
        self.carrier_events.push(CarrierState::Up);
    }

    fn carrier_off(&mut self) {
        self.carrier_events.push(CarrierState::Down);
    }

    fn allocate_scratch(&mut self, len: usize) -> Result<ControlBuffer> {
        if self.fail_allocation {
            return Err(DriverError::Allocation { size: len });
        }
        let buffer = ControlBuffer::try_new(len)?;
        self.allocations += 1;
        Ok(buffer)
    }

    fn release_scratch(&mut self, buffer: ControlBuffer) {
        self.releases += 1;
        drop(buffer);
    }
}
