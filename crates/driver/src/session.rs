//! Device lifecycle
//!
//! An [`IphoneSession`] is the binding between one attached device and the
//! driver. It owns the control scratch buffer for exactly as long as it is
//! bound, so two devices never share control state.
//!
//! ```text
//! Unbound --bind--> Binding --ok--> Bound --unbind--> Unbound
//!                      |
//!                      +--error--> Unbound
//! ```
//!
//! Every hook that touches the control channel takes `&mut self`, which
//! serialises control transfers per session.

use crate::control::ControlChannel;
use crate::endpoint;
use crate::error::{DriverError, Result};
use crate::fixup;
use crate::host::{UsbNetDriver, UsbNetHost};
use bytes::BytesMut;
use ipheth_protocol::devices::DRIVER_DESCRIPTION;
use ipheth_protocol::{CarrierState, MacAddress, Pipes, VendorProtocol};
use tracing::{debug, info, warn};

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unbound,
    Binding,
    Bound,
}

/// Per-device driver instance
#[derive(Debug)]
pub struct IphoneSession {
    protocol: VendorProtocol,
    state: SessionState,
    /// Present only while bound
    channel: Option<ControlChannel>,
    pipes: Option<Pipes>,
    mac: Option<MacAddress>,
    carrier: Option<CarrierState>,
}

impl Default for IphoneSession {
    fn default() -> Self {
        Self::new()
    }
}

impl IphoneSession {
    /// Create an unbound session speaking the iPhone protocol
    pub fn new() -> Self {
        Self::with_protocol(VendorProtocol::IPHETH)
    }

    pub fn with_protocol(protocol: VendorProtocol) -> Self {
        Self {
            protocol,
            state: SessionState::Unbound,
            channel: None,
            pipes: None,
            mac: None,
            carrier: None,
        }
    }

    /// Create a session and bind it in one step
    pub fn attach(host: &mut dyn UsbNetHost) -> Result<Self> {
        let mut session = Self::new();
        session.bind(host)?;
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_bound(&self) -> bool {
        self.state == SessionState::Bound
    }

    pub fn protocol(&self) -> &VendorProtocol {
        &self.protocol
    }

    /// Hardware address read during bind
    pub fn mac_address(&self) -> Option<MacAddress> {
        self.mac
    }

    /// Data pipes; `None` until bound, and after a reset that could not
    /// re-resolve them
    pub fn pipes(&self) -> Option<Pipes> {
        self.pipes
    }

    /// Last carrier state observed by [`UsbNetDriver::check_connect`]
    pub fn carrier(&self) -> Option<CarrierState> {
        self.carrier
    }

    /// Whether the session currently owns a scratch buffer
    pub fn has_scratch(&self) -> bool {
        self.channel.is_some()
    }

    /// Look up the tethering alternate setting and resolve its pipes
    fn resolve_pipes(&self, host: &dyn UsbNetHost) -> Result<Pipes> {
        let interface = self.protocol.interface_number;
        let alternate = self.protocol.alt_setting;

        let setting = host.alt_setting(interface, alternate).ok_or_else(|| {
            warn!("Unable to find alternate settings interface");
            DriverError::AlternateSettingNotFound {
                interface,
                alternate,
            }
        })?;

        endpoint::resolve(&setting.endpoints)
    }

    fn probe(
        &self,
        host: &mut dyn UsbNetHost,
        channel: &mut ControlChannel,
    ) -> Result<(Pipes, MacAddress)> {
        let pipes = self.resolve_pipes(host)?;
        let mac = channel.get_mac_address(host)?;
        Ok((pipes, mac))
    }

    fn clear(&mut self) {
        self.pipes = None;
        self.mac = None;
        self.carrier = None;
        self.state = SessionState::Unbound;
    }
}

impl UsbNetDriver for IphoneSession {
    fn description(&self) -> &'static str {
        DRIVER_DESCRIPTION
    }

    fn bind(&mut self, host: &mut dyn UsbNetHost) -> Result<()> {
        if self.channel.is_some() {
            debug!("Rebinding a bound session");
            self.unbind(host);
        }

        self.state = SessionState::Binding;

        let buffer = match host.allocate_scratch(self.protocol.control_buffer_size) {
            Ok(buffer) => buffer,
            Err(e) => {
                self.clear();
                return Err(e);
            }
        };
        let mut channel = ControlChannel::new(buffer, self.protocol);

        match self.probe(host, &mut channel) {
            Ok((pipes, mac)) => {
                host.set_mac_address(mac);
                self.channel = Some(channel);
                self.pipes = Some(pipes);
                self.mac = Some(mac);
                self.carrier = None;
                self.state = SessionState::Bound;
                info!("iPhone USB Ethernet device attached ({}, {})", mac, pipes);
                Ok(())
            }
            Err(e) => {
                host.release_scratch(channel.into_buffer());
                self.clear();
                Err(e)
            }
        }
    }

    fn unbind(&mut self, host: &mut dyn UsbNetHost) {
        if let Some(channel) = self.channel.take() {
            host.release_scratch(channel.into_buffer());
            debug!("Released control buffer");
        }
        self.clear();
    }

    fn reset(&mut self, host: &mut dyn UsbNetHost) -> Result<()> {
        let interface = self.protocol.interface_number;
        let alternate = self.protocol.alt_setting;

        if host.active_alt_setting(interface) == Some(alternate) {
            debug!(
                "Alternate setting {} already active on interface {}",
                alternate, interface
            );
        } else {
            host.set_interface(interface, alternate)?;
            debug!(
                "Selected alternate setting {} on interface {}",
                alternate, interface
            );
        }

        if self.is_bound() {
            self.pipes = None;
            self.pipes = Some(self.resolve_pipes(host)?);
        }
        Ok(())
    }

    fn check_connect(&mut self, host: &mut dyn UsbNetHost) -> Result<CarrierState> {
        let channel = self.channel.as_mut().ok_or(DriverError::NotBound)?;
        let carrier = channel.check_carrier(host)?;

        match carrier {
            CarrierState::Up => host.carrier_on(),
            CarrierState::Down => host.carrier_off(),
        }

        if self.carrier != Some(carrier) {
            debug!("Carrier {}", carrier);
        }
        self.carrier = Some(carrier);
        Ok(carrier)
    }

    fn rx_fixup(&self, frame: &mut BytesMut) -> Result<()> {
        fixup::rx_fixup(frame, self.protocol.rx_pad)
    }
}
