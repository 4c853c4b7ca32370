//! Lifecycle integration tests
//!
//! Drives sessions exactly as the USB networking framework would:
//! attach -> reset -> carrier polling -> receive -> detach, including
//! failure paths and several devices attached at once.
//!
//! Run with: `cargo test -p ipheth-driver --test lifecycle_tests`

use bytes::BytesMut;
use ipheth_driver::test_utils::{MockHost, MockReply};
use ipheth_driver::{DriverError, IphoneSession, SessionState, UsbNetDriver, UsbNetHost};
use ipheth_protocol::constants::{CMD_CARRIER_CHECK, CMD_GET_MACADDR};
use ipheth_protocol::{CarrierState, MacAddress, TransferError};

fn mac(last: u8) -> MacAddress {
    MacAddress([0x02, 0x00, 0x00, 0x00, 0x00, last])
}

// ============================================================================
// Framework simulation
// ============================================================================

/// Minimal stand-in for the framework's per-device record
struct Attached {
    driver: Box<dyn UsbNetDriver>,
    host: MockHost,
}

impl Attached {
    fn probe(mut host: MockHost) -> Result<Self, (DriverError, MockHost)> {
        let mut driver: Box<dyn UsbNetDriver> = Box::new(IphoneSession::new());
        match driver.bind(&mut host) {
            Ok(()) => Ok(Self { driver, host }),
            Err(e) => {
                driver.unbind(&mut host);
                Err((e, host))
            }
        }
    }

    fn open(&mut self) -> Result<(), DriverError> {
        self.driver.reset(&mut self.host)
    }

    fn poll(&mut self) -> Result<CarrierState, DriverError> {
        self.driver.check_connect(&mut self.host)
    }

    fn receive(&self, raw: &[u8]) -> Result<BytesMut, DriverError> {
        let mut frame = BytesMut::from(raw);
        self.driver.rx_fixup(&mut frame)?;
        Ok(frame)
    }

    fn disconnect(mut self) -> MockHost {
        self.driver.unbind(&mut self.host);
        self.host
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_full_attach_cycle() {
    let mut device = Attached::probe(MockHost::iphone(mac(1))).unwrap();
    assert_eq!(device.host.mac_address(), Some(mac(1)));

    device.open().unwrap();
    assert_eq!(device.host.active_alt_setting(2), Some(1));

    assert_eq!(device.poll().unwrap(), CarrierState::Up);

    let frame = device
        .receive(&[0x00, 0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff])
        .unwrap();
    assert_eq!(&frame[..], &[0xff; 6]);

    let host = device.disconnect();
    assert_eq!(host.live_scratch_buffers(), 0);
    assert_eq!(host.allocations(), 1);
}

#[test]
fn test_bind_then_unbind_leaves_nothing_allocated() {
    let mut host = MockHost::iphone(mac(1));
    let mut session = IphoneSession::new();

    session.bind(&mut host).unwrap();
    session.unbind(&mut host);

    assert_eq!(session.state(), SessionState::Unbound);
    assert!(!session.has_scratch());
    assert_eq!(host.live_scratch_buffers(), 0);
}

#[test]
fn test_failed_bind_then_cleanup_unbind() {
    let mut host = MockHost::iphone(mac(1));
    host.reply(CMD_GET_MACADDR, MockReply::Fail(TransferError::Timeout));

    let (err, host) = match Attached::probe(host) {
        Ok(_) => panic!("bind should fail"),
        Err(failure) => failure,
    };

    assert_eq!(err, DriverError::Transfer(TransferError::Timeout));
    assert_eq!(host.allocations(), 1);
    assert_eq!(host.releases(), 1);
    assert_eq!(host.live_scratch_buffers(), 0);
}

#[test]
fn test_reattach_after_detach() {
    let mut host = MockHost::iphone(mac(1));
    let mut session = IphoneSession::new();

    for _ in 0..3 {
        session.bind(&mut host).unwrap();
        session.reset(&mut host).unwrap();
        session.check_connect(&mut host).unwrap();
        session.unbind(&mut host);
    }

    assert_eq!(host.allocations(), 3);
    assert_eq!(host.live_scratch_buffers(), 0);
    assert_eq!(host.set_interface_calls(), 1);
}

#[test]
fn test_carrier_flapping() {
    let mut host = MockHost::iphone(mac(1));
    host.reply_sequence(
        CMD_CARRIER_CHECK,
        [
            MockReply::Data(vec![0x04]),
            MockReply::Data(vec![0x00]),
            MockReply::Fail(TransferError::Io),
            MockReply::Data(vec![0x04]),
        ],
    );

    let mut device = Attached::probe(host).unwrap();
    assert_eq!(device.poll(), Ok(CarrierState::Up));
    assert_eq!(device.poll(), Ok(CarrierState::Down));
    assert!(matches!(
        device.poll(),
        Err(DriverError::Transfer(TransferError::Io))
    ));
    assert_eq!(device.poll(), Ok(CarrierState::Up));

    assert_eq!(
        device.host.carrier_events(),
        &[CarrierState::Up, CarrierState::Down, CarrierState::Up]
    );
}

#[test]
fn test_every_request_uses_vendor_in_shape() {
    let mut device = Attached::probe(MockHost::iphone(mac(1))).unwrap();
    device.poll().unwrap();
    device.poll().unwrap();

    let requests = device.host.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].0.request, CMD_GET_MACADDR);
    assert_eq!(requests[1].0.request, CMD_CARRIER_CHECK);
    for (request, len) in requests {
        assert!(request.is_in());
        assert_eq!(request.request_type, 0xc0);
        assert_eq!(request.endpoint, 0);
        assert_eq!(request.index, 2);
        assert_eq!(*len, 64);
    }
}

#[test]
fn test_descriptor_mismatch_is_fatal() {
    let mut host = MockHost::iphone(mac(1));
    host.remove_alt_settings();

    let (err, host) = match Attached::probe(host) {
        Ok(_) => panic!("bind should fail"),
        Err(failure) => failure,
    };
    assert!(!err.is_transient());
    assert_eq!(err.errno(), -19);
    assert_eq!(host.live_scratch_buffers(), 0);
}

// ============================================================================
// Multiple devices
// ============================================================================

#[test]
fn test_sessions_do_not_share_state() {
    let mut first = Attached::probe(MockHost::iphone(mac(1))).unwrap();
    let mut second = Attached::probe(MockHost::iphone(mac(2))).unwrap();

    second
        .host
        .reply(CMD_CARRIER_CHECK, MockReply::Data(vec![0x00]));

    assert_eq!(first.poll(), Ok(CarrierState::Up));
    assert_eq!(second.poll(), Ok(CarrierState::Down));

    let first_host = first.disconnect();
    assert_eq!(first_host.mac_address(), Some(mac(1)));

    // Detaching one device leaves the other fully usable
    assert_eq!(second.poll(), Ok(CarrierState::Down));
    let second_host = second.disconnect();
    assert_eq!(second_host.mac_address(), Some(mac(2)));
    assert_eq!(second_host.live_scratch_buffers(), 0);
}

#[test]
fn test_rx_fixup_across_threads() {
    let session = std::sync::Arc::new(IphoneSession::new());

    let handles: Vec<_> = (0..4u8)
        .map(|i| {
            let session = session.clone();
            std::thread::spawn(move || {
                let mut frame = BytesMut::from(&[0xaa, 0xbb, i, i, i][..]);
                session.rx_fixup(&mut frame).unwrap();
                frame.to_vec()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), vec![i as u8; 3]);
    }
}
