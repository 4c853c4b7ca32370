//! Link-level type definitions
//!
//! Hardware addresses, carrier state and the transfer pipe handles the data
//! path is given once a device has been bound.

use crate::constants::MAC_ADDRESS_LEN;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ethernet hardware address reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MacAddress(pub [u8; MAC_ADDRESS_LEN]);

impl MacAddress {
    /// Raw address bytes
    pub fn octets(&self) -> [u8; MAC_ADDRESS_LEN] {
        self.0
    }

    /// Group bit (LSB of the first octet)
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

/// Error returned when a hardware address cannot be built
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MacAddressError {
    #[error("Hardware address needs 6 bytes, got {0}")]
    TooShort(usize),

    #[error("Malformed hardware address: {0}")]
    Malformed(String),
}

/// Takes the first six bytes; anything after them is ignored
impl TryFrom<&[u8]> for MacAddress {
    type Error = MacAddressError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let octets: [u8; MAC_ADDRESS_LEN] = bytes
            .get(..MAC_ADDRESS_LEN)
            .and_then(|head| head.try_into().ok())
            .ok_or(MacAddressError::TooShort(bytes.len()))?;
        Ok(Self(octets))
    }
}

impl FromStr for MacAddress {
    type Err = MacAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.len() != MAC_ADDRESS_LEN {
            return Err(MacAddressError::Malformed(s.to_string()));
        }

        let mut octets = [0u8; MAC_ADDRESS_LEN];
        for (octet, part) in octets.iter_mut().zip(parts) {
            if part.is_empty() || part.len() > 2 {
                return Err(MacAddressError::Malformed(s.to_string()));
            }
            *octet = u8::from_str_radix(part, 16)
                .map_err(|_| MacAddressError::Malformed(s.to_string()))?;
        }
        Ok(Self(octets))
    }
}

/// Link state as reported by the vendor carrier check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CarrierState {
    /// Tethering is active on the phone
    Up,
    /// Tethering is off or the phone has no upstream
    Down,
}

impl CarrierState {
    pub fn is_up(&self) -> bool {
        matches!(self, CarrierState::Up)
    }
}

impl fmt::Display for CarrierState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CarrierState::Up => f.write_str("up"),
            CarrierState::Down => f.write_str("down"),
        }
    }
}

/// Host-side handle for receiving from a bulk-in endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BulkInPipe(pub u8);

/// Host-side handle for sending to a bulk-out endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BulkOutPipe(pub u8);

impl BulkInPipe {
    /// Endpoint address including the direction bit
    pub fn endpoint(&self) -> u8 {
        self.0
    }
}

impl BulkOutPipe {
    /// Endpoint address including the direction bit
    pub fn endpoint(&self) -> u8 {
        self.0
    }
}

/// The pair of data pipes handed to the bulk transfer path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pipes {
    pub input: BulkInPipe,
    pub output: BulkOutPipe,
}

impl fmt::Display for Pipes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "in={:#04x} out={:#04x}", self.input.0, self.output.0)
    }
}
