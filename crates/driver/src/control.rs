//! Vendor control channel
//!
//! Both vendor requests share one shape: a control-IN transfer on endpoint 0
//! with the same request type, value, index, buffer and timeout. They differ
//! only in the request code and in how the reply is read, so both are built
//! on [`ControlChannel::vendor_query`].

use crate::error::{DriverError, Result};
use crate::host::{ControlRequest, UsbNetHost};
use ipheth_protocol::{CarrierState, MacAddress, VendorProtocol};
use tracing::{debug, error, info, warn};

/// Fixed-size scratch buffer for control transfer payloads
///
/// Owned by exactly one session. Cleared before every request so nothing
/// carries over between replies.
#[derive(Debug)]
pub struct ControlBuffer {
    data: Box<[u8]>,
}

impl ControlBuffer {
    /// Allocate a zeroed buffer, reporting allocation failure instead of
    /// aborting
    pub fn try_new(len: usize) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| DriverError::Allocation { size: len })?;
        data.resize(len, 0);
        Ok(Self {
            data: data.into_boxed_slice(),
        })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
    }
}

/// Vendor request client bound to one session's scratch buffer
#[derive(Debug)]
pub struct ControlChannel {
    buffer: ControlBuffer,
    protocol: VendorProtocol,
}

impl ControlChannel {
    pub fn new(buffer: ControlBuffer, protocol: VendorProtocol) -> Self {
        Self { buffer, protocol }
    }

    /// Give the scratch buffer back, ending the channel
    pub fn into_buffer(self) -> ControlBuffer {
        self.buffer
    }

    /// Build the control request for a vendor request code
    pub fn request(&self, request: u8) -> ControlRequest {
        ControlRequest {
            endpoint: self.protocol.control_endpoint,
            request_type: self.protocol.request_type,
            request,
            value: self.protocol.value,
            index: self.protocol.index,
            timeout: self.protocol.control_timeout,
        }
    }

    /// Issue one vendor control-IN request and hand the reply bytes to
    /// `interpret`
    ///
    /// The reply slice is never longer than the scratch buffer, whatever
    /// length the host reports.
    pub fn vendor_query<T>(
        &mut self,
        host: &mut dyn UsbNetHost,
        request: u8,
        interpret: impl FnOnce(&[u8]) -> Result<T>,
    ) -> Result<T> {
        self.buffer.clear();
        let control = self.request(request);

        let len = host
            .control_in(&control, self.buffer.as_mut_slice())
            .map_err(|e| {
                error!("usb control transfer {:#04x} failed: {}", request, e);
                DriverError::Transfer(e)
            })?;
        let len = len.min(self.buffer.len());

        debug!("Control reply {:#04x}: {} bytes", request, len);
        interpret(&self.buffer.as_slice()[..len])
    }

    /// Read the device's hardware address
    ///
    /// The reply must carry at least six bytes; the first six are the
    /// address.
    pub fn get_mac_address(&mut self, host: &mut dyn UsbNetHost) -> Result<MacAddress> {
        let mac_len = self.protocol.mac_len;
        let mac = self.vendor_query(host, self.protocol.get_macaddr, |reply| {
            if reply.len() < mac_len {
                error!("usb control transfer: short packet: {} bytes", reply.len());
                return Err(DriverError::ShortReply {
                    expected: mac_len,
                    actual: reply.len(),
                });
            }
            MacAddress::try_from(reply).map_err(|_| DriverError::ShortReply {
                expected: mac_len,
                actual: reply.len(),
            })
        })?;

        if mac.is_multicast() {
            warn!("Device reported a multicast hardware address: {}", mac);
        }
        info!("Device hardware address: {}", mac);
        Ok(mac)
    }

    /// Ask the device whether tethering has a carrier
    ///
    /// Only the sentinel byte means up; every other first byte means down.
    pub fn check_carrier(&mut self, host: &mut dyn UsbNetHost) -> Result<CarrierState> {
        let carrier_on = self.protocol.carrier_on;
        self.vendor_query(host, self.protocol.carrier_check, |reply| match reply.first() {
            Some(&status) if status == carrier_on => Ok(CarrierState::Up),
            Some(_) => Ok(CarrierState::Down),
            None => {
                error!("usb control transfer: empty carrier reply");
                Err(DriverError::ShortReply {
                    expected: 1,
                    actual: 0,
                })
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockHost, MockReply};
    use ipheth_protocol::TransferError;
    use ipheth_protocol::constants::{CMD_CARRIER_CHECK, CMD_GET_MACADDR};

    fn channel() -> ControlChannel {
        ControlChannel::new(
            ControlBuffer::try_new(64).unwrap(),
            VendorProtocol::IPHETH,
        )
    }

    #[test]
    fn test_mac_from_exact_reply() {
        let mut host = MockHost::new();
        host.reply(
            CMD_GET_MACADDR,
            MockReply::Data(vec![0x02, 0x00, 0x00, 0x00, 0x00, 0x01]),
        );

        let mac = channel().get_mac_address(&mut host).unwrap();
        assert_eq!(mac.to_string(), "02:00:00:00:00:01");
    }

    #[test]
    fn test_mac_ignores_trailing_bytes() {
        let mut host = MockHost::new();
        host.reply(
            CMD_GET_MACADDR,
            MockReply::Data(vec![0x3a, 0x1b, 0x2c, 0x3d, 0x4e, 0x5f, 0xaa, 0xbb]),
        );

        let mac = channel().get_mac_address(&mut host).unwrap();
        assert_eq!(mac.octets(), [0x3a, 0x1b, 0x2c, 0x3d, 0x4e, 0x5f]);
    }

    #[test]
    fn test_multicast_mac_is_passed_through() {
        let mut host = MockHost::new();
        host.reply(
            CMD_GET_MACADDR,
            MockReply::Data(vec![0x01, 0x00, 0x5e, 0x00, 0x00, 0x01]),
        );

        let mac = channel().get_mac_address(&mut host).unwrap();
        assert!(mac.is_multicast());
        assert_eq!(mac.to_string(), "01:00:5e:00:00:01");
    }

    #[test]
    fn test_mac_short_reply() {
        let mut host = MockHost::new();
        host.reply(
            CMD_GET_MACADDR,
            MockReply::Data(vec![0x02, 0x00, 0x00, 0x00, 0x00]),
        );

        let err = channel().get_mac_address(&mut host).unwrap_err();
        assert_eq!(
            err,
            DriverError::ShortReply {
                expected: 6,
                actual: 5
            }
        );
        assert_eq!(err.errno(), -22);
    }

    #[test]
    fn test_mac_transfer_failure() {
        let mut host = MockHost::new();
        host.reply(CMD_GET_MACADDR, MockReply::Fail(TransferError::Timeout));

        let err = channel().get_mac_address(&mut host).unwrap_err();
        assert_eq!(err, DriverError::Transfer(TransferError::Timeout));
    }

    #[test]
    fn test_carrier_states() {
        let mut host = MockHost::new();
        let mut channel = channel();

        host.reply(CMD_CARRIER_CHECK, MockReply::Data(vec![0x04, 0x00]));
        assert_eq!(channel.check_carrier(&mut host).unwrap(), CarrierState::Up);

        host.reply(CMD_CARRIER_CHECK, MockReply::Data(vec![0x00]));
        assert_eq!(
            channel.check_carrier(&mut host).unwrap(),
            CarrierState::Down
        );

        host.reply(CMD_CARRIER_CHECK, MockReply::Data(vec![0x05]));
        assert_eq!(
            channel.check_carrier(&mut host).unwrap(),
            CarrierState::Down
        );
    }

    #[test]
    fn test_carrier_failure_is_not_down() {
        let mut host = MockHost::new();
        host.reply(CMD_CARRIER_CHECK, MockReply::Fail(TransferError::Pipe));

        let result = channel().check_carrier(&mut host);
        assert!(matches!(
            result,
            Err(DriverError::Transfer(TransferError::Pipe))
        ));
    }

    #[test]
    fn test_carrier_empty_reply() {
        let mut host = MockHost::new();
        host.reply(CMD_CARRIER_CHECK, MockReply::Data(vec![]));

        assert_eq!(
            channel().check_carrier(&mut host),
            Err(DriverError::ShortReply {
                expected: 1,
                actual: 0
            })
        );
    }

    #[test]
    fn test_no_carry_over_between_requests() {
        let mut host = MockHost::new();
        let mut channel = channel();

        host.reply(
            CMD_GET_MACADDR,
            MockReply::Data(vec![0x04, 0x11, 0x22, 0x33, 0x44, 0x55]),
        );
        channel.get_mac_address(&mut host).unwrap();

        // A zero-length carrier reply must not see the 0x04 left by the MAC
        host.reply(CMD_CARRIER_CHECK, MockReply::Data(vec![]));
        assert!(channel.check_carrier(&mut host).is_err());
        assert!(channel.buffer.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_request_shape() {
        let mut host = MockHost::new();
        host.reply(CMD_CARRIER_CHECK, MockReply::Data(vec![0x04]));
        channel().check_carrier(&mut host).unwrap();

        let sent = host.requests();
        assert_eq!(sent.len(), 1);
        let (request, len) = sent[0];
        assert_eq!(request.endpoint, 0x00);
        assert_eq!(request.request_type, 0xc0);
        assert_eq!(request.request, 0x45);
        assert_eq!(request.value, 0x00);
        assert_eq!(request.index, 0x02);
        assert_eq!(request.timeout, std::time::Duration::from_secs(5));
        assert_eq!(len, 64);
    }

    #[test]
    fn test_oversized_length_is_clamped() {
        let mut host = MockHost::new();
        host.reply(CMD_GET_MACADDR, MockReply::Overreport(vec![1, 2, 3, 4, 5, 6], 4096));

        let mut channel = channel();
        let len = channel
            .vendor_query(&mut host, CMD_GET_MACADDR, |reply| Ok(reply.len()))
            .unwrap();
        assert_eq!(len, 64);
    }
}
