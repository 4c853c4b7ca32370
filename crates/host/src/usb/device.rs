//! rusb-backed USB networking host
//!
//! [`RusbHost`] stands in for the USB networking framework in userspace: it
//! owns the device handle, answers the driver's descriptor lookups from the
//! active configuration, and records what the driver publishes (hardware
//! address and carrier) instead of driving a kernel network interface.

use super::transfers::{map_rusb_error, read_frame};
use bytes::BytesMut;
use ipheth_driver::{ControlRequest, UsbNetHost};
use ipheth_protocol::{
    AltSetting, BulkInPipe, CarrierState, EndpointDescriptor, MacAddress, TransferError,
    TransferKind,
};
use rusb::{Context, Device, DeviceHandle};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Userspace stand-in for the USB networking framework
pub struct RusbHost {
    device: Device<Context>,
    handle: DeviceHandle<Context>,
    /// Interfaces claimed by us
    claimed_interfaces: Vec<u8>,
    /// Alternate setting selected per interface since open
    active_settings: HashMap<u8, u8>,
    mac: Option<MacAddress>,
    carrier: Option<CarrierState>,
}

impl RusbHost {
    /// Open the device
    ///
    /// Interfaces are claimed lazily, the first time the driver selects an
    /// alternate setting on them.
    pub fn open(device: Device<Context>) -> Result<Self, TransferError> {
        let handle = device.open().map_err(|e| {
            warn!("Failed to open device: {}", e);
            map_rusb_error(e)
        })?;

        debug!(
            "Opened device on bus {:03} address {:03}",
            device.bus_number(),
            device.address()
        );

        Ok(Self {
            device,
            handle,
            claimed_interfaces: Vec::new(),
            active_settings: HashMap::new(),
            mac: None,
            carrier: None,
        })
    }

    /// Hardware address last published by the driver
    pub fn mac_address(&self) -> Option<MacAddress> {
        self.mac
    }

    /// Carrier last signalled by the driver
    pub fn carrier(&self) -> Option<CarrierState> {
        self.carrier
    }

    /// Read one received frame, alignment pad included
    pub fn read_frame(
        &self,
        pipe: BulkInPipe,
        buffer_size: usize,
        timeout: Duration,
    ) -> Result<BytesMut, TransferError> {
        read_frame(&self.handle, pipe, buffer_size, timeout)
    }

    /// Detach the kernel driver if active and claim the interface
    fn claim(&mut self, interface: u8) -> Result<(), rusb::Error> {
        if self.claimed_interfaces.contains(&interface) {
            return Ok(());
        }

        match self.handle.kernel_driver_active(interface) {
            Ok(true) => {
                debug!("Detaching kernel driver from interface {}", interface);
                if let Err(e) = self.handle.detach_kernel_driver(interface) {
                    warn!(
                        "Failed to detach kernel driver from interface {}: {}",
                        interface, e
                    );
                }
            }
            Ok(false) => {}
            Err(e) => {
                debug!(
                    "Could not check kernel driver status for interface {}: {}",
                    interface, e
                );
            }
        }

        self.handle.claim_interface(interface)?;
        debug!("Claimed interface {}", interface);
        self.claimed_interfaces.push(interface);
        Ok(())
    }

    /// Release claimed interfaces and hand them back to the kernel
    pub fn close(&mut self) {
        for interface in self.claimed_interfaces.drain(..) {
            if let Err(e) = self.handle.release_interface(interface) {
                warn!("Failed to release interface {}: {}", interface, e);
            }

            if let Err(e) = self.handle.attach_kernel_driver(interface) {
                debug!(
                    "Could not reattach kernel driver to interface {}: {}",
                    interface, e
                );
            } else {
                debug!("Reattached kernel driver to interface {}", interface);
            }
        }
        self.active_settings.clear();
    }
}

impl Drop for RusbHost {
    fn drop(&mut self) {
        self.close();
    }
}

fn map_transfer_type(kind: rusb::TransferType) -> TransferKind {
    match kind {
        rusb::TransferType::Control => TransferKind::Control,
        rusb::TransferType::Isochronous => TransferKind::Isochronous,
        rusb::TransferType::Bulk => TransferKind::Bulk,
        rusb::TransferType::Interrupt => TransferKind::Interrupt,
    }
}

impl UsbNetHost for RusbHost {
    fn control_in(
        &mut self,
        request: &ControlRequest,
        buf: &mut [u8],
    ) -> Result<usize, TransferError> {
        if request.endpoint != 0 || !request.is_in() {
            return Err(TransferError::InvalidParam);
        }

        self.handle
            .read_control(
                request.request_type,
                request.request,
                request.value,
                request.index,
                buf,
                request.timeout,
            )
            .map_err(map_rusb_error)
    }

    fn alt_setting(&self, interface: u8, alternate: u8) -> Option<AltSetting> {
        let config = self.device.active_config_descriptor().ok()?;

        let setting = config
            .interfaces()
            .filter(|i| i.number() == interface)
            .flat_map(|i| i.descriptors())
            .find(|d| d.setting_number() == alternate)?;

        let endpoints = setting
            .endpoint_descriptors()
            .map(|ep| {
                EndpointDescriptor::new(
                    ep.address(),
                    map_transfer_type(ep.transfer_type()),
                    ep.max_packet_size(),
                )
            })
            .collect();

        Some(AltSetting {
            interface_number: setting.interface_number(),
            alternate_setting: setting.setting_number(),
            class: setting.class_code(),
            subclass: setting.sub_class_code(),
            protocol: setting.protocol_code(),
            endpoints,
        })
    }

    fn set_interface(&mut self, interface: u8, alternate: u8) -> Result<(), TransferError> {
        self.claim(interface).map_err(|e| {
            warn!("Failed to claim interface {}: {}", interface, e);
            map_rusb_error(e)
        })?;

        self.handle
            .set_alternate_setting(interface, alternate)
            .map_err(map_rusb_error)?;
        self.active_settings.insert(interface, alternate);
        Ok(())
    }

    fn active_alt_setting(&self, interface: u8) -> Option<u8> {
        self.active_settings.get(&interface).copied()
    }

    fn set_mac_address(&mut self, mac: MacAddress) {
        debug!("Hardware address {}", mac);
        self.mac = Some(mac);
    }

    fn carrier_on(&mut self) {
        if self.carrier != Some(CarrierState::Up) {
            info!("Link up");
        }
        self.carrier = Some(CarrierState::Up);
    }

    fn carrier_off(&mut self) {
        if self.carrier != Some(CarrierState::Down) {
            info!("Link down");
        }
        self.carrier = Some(CarrierState::Down);
    }
}
