//! Device discovery
//!
//! Finds attached devices that the driver can bind: a vendor/product pair
//! from the supported table (or a configured extra filter) and an interface
//! with the tethering class triple.

use ipheth_protocol::devices;
use rusb::{Context, Device, UsbContext};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// VID:PID pattern, either half may be `*`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceFilter {
    pub vendor_id: Option<u16>,
    pub product_id: Option<u16>,
}

impl DeviceFilter {
    pub fn matches(&self, vendor_id: u16, product_id: u16) -> bool {
        self.vendor_id.is_none_or(|v| v == vendor_id)
            && self.product_id.is_none_or(|p| p == product_id)
    }

    fn parse_id(id: &str, name: &str) -> Result<Option<u16>, String> {
        if id == "*" {
            return Ok(None);
        }

        let hex_part = id
            .strip_prefix("0x")
            .or_else(|| id.strip_prefix("0X"))
            .ok_or_else(|| {
                format!(
                    "Invalid {} '{}', must start with '0x' (e.g., '0x05ac')",
                    name, id
                )
            })?;

        if hex_part.is_empty() || hex_part.len() > 4 {
            return Err(format!(
                "Invalid {} '{}', hex part must be 1-4 digits",
                name, id
            ));
        }

        u16::from_str_radix(hex_part, 16)
            .map(Some)
            .map_err(|_| format!("Invalid {} '{}', not a valid hex number", name, id))
    }
}

impl FromStr for DeviceFilter {
    type Err = String;

    fn from_str(filter: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = filter.split(':').collect();
        if parts.len() != 2 {
            return Err(format!(
                "Invalid filter format '{}', expected VID:PID (e.g., '0x05ac:0x12a8' or '0x05ac:*')",
                filter
            ));
        }

        Ok(Self {
            vendor_id: Self::parse_id(parts[0], "VID")?,
            product_id: Self::parse_id(parts[1], "PID")?,
        })
    }
}

/// An attached device the driver can bind
#[derive(Debug)]
pub struct TetherDevice {
    pub device: Device<Context>,
    pub bus_number: u8,
    pub address: u8,
    pub vendor_id: u16,
    pub product_id: u16,
    pub name: String,
}

impl fmt::Display for TetherDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Bus {:03} Device {:03}: {:04x}:{:04x} {}",
            self.bus_number, self.address, self.vendor_id, self.product_id, self.name
        )
    }
}

/// Identify a device by table entry or extra filter
///
/// Returns the display name for supported devices.
pub fn identify(vendor_id: u16, product_id: u16, extra: &[DeviceFilter]) -> Option<String> {
    if let Some(supported) = devices::lookup(vendor_id, product_id) {
        return Some(supported.name.to_string());
    }
    extra
        .iter()
        .any(|f| f.matches(vendor_id, product_id))
        .then(|| format!("Tethering device {:04x}:{:04x}", vendor_id, product_id))
}

/// Whether any interface of the active configuration is a tethering
/// interface
fn has_tethering_interface(device: &Device<Context>) -> bool {
    let Ok(config) = device.active_config_descriptor() else {
        return false;
    };

    config.interfaces().any(|interface| {
        interface.descriptors().any(|setting| {
            devices::matches_interface(
                setting.class_code(),
                setting.sub_class_code(),
                setting.protocol_code(),
            )
        })
    })
}

/// Enumerate attached devices the driver can bind
pub fn find_devices(
    context: &Context,
    extra: &[DeviceFilter],
) -> Result<Vec<TetherDevice>, rusb::Error> {
    let mut found = Vec::new();

    for device in context.devices()?.iter() {
        let Ok(descriptor) = device.device_descriptor() else {
            continue;
        };
        let (vendor_id, product_id) = (descriptor.vendor_id(), descriptor.product_id());

        let Some(name) = identify(vendor_id, product_id, extra) else {
            continue;
        };

        if !has_tethering_interface(&device) {
            debug!(
                "Device {:04x}:{:04x} has no tethering interface (tethering disabled?)",
                vendor_id, product_id
            );
            continue;
        }

        found.push(TetherDevice {
            bus_number: device.bus_number(),
            address: device.address(),
            vendor_id,
            product_id,
            name,
            device,
        });
    }

    debug!("Found {} tethering device(s)", found.len());
    Ok(found)
}

/// Pick a device by location, or the first one when no location is given
pub fn select(
    devices: Vec<TetherDevice>,
    bus_number: Option<u8>,
    address: Option<u8>,
) -> Option<TetherDevice> {
    devices.into_iter().find(|d| {
        bus_number.is_none_or(|b| b == d.bus_number) && address.is_none_or(|a| a == d.address)
    })
}
