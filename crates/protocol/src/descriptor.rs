//! Endpoint and interface descriptors
//!
//! A trimmed view of the USB 2.0 descriptors the driver inspects. Hosts
//! translate whatever their USB stack exposes into these structs.

use serde::{Deserialize, Serialize};

/// Data direction, relative to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Device to host
    In,
    /// Host to device
    Out,
}

/// Endpoint transfer type (bits 0..1 of `bmAttributes`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferKind {
    Control,
    Isochronous,
    Bulk,
    Interrupt,
}

impl TransferKind {
    /// `bmAttributes` transfer type bits for this kind
    pub fn attribute_bits(&self) -> u8 {
        match self {
            TransferKind::Control => 0x00,
            TransferKind::Isochronous => 0x01,
            TransferKind::Bulk => 0x02,
            TransferKind::Interrupt => 0x03,
        }
    }
}

/// One endpoint descriptor of an alternate setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    /// `bEndpointAddress` (bit 7 = direction, bits 0..3 = number)
    pub address: u8,
    /// `bmAttributes`
    pub attributes: u8,
    /// `wMaxPacketSize`
    pub max_packet_size: u16,
}

impl EndpointDescriptor {
    pub fn new(address: u8, kind: TransferKind, max_packet_size: u16) -> Self {
        Self {
            address,
            attributes: kind.attribute_bits(),
            max_packet_size,
        }
    }

    pub fn direction(&self) -> Direction {
        if self.address & 0x80 != 0 {
            Direction::In
        } else {
            Direction::Out
        }
    }

    pub fn transfer_kind(&self) -> TransferKind {
        match self.attributes & 0x03 {
            0x00 => TransferKind::Control,
            0x01 => TransferKind::Isochronous,
            0x02 => TransferKind::Bulk,
            _ => TransferKind::Interrupt,
        }
    }

    pub fn is_bulk_in(&self) -> bool {
        self.transfer_kind() == TransferKind::Bulk && self.direction() == Direction::In
    }

    pub fn is_bulk_out(&self) -> bool {
        self.transfer_kind() == TransferKind::Bulk && self.direction() == Direction::Out
    }
}

/// One alternate setting of an interface, with its endpoint set in
/// descriptor order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AltSetting {
    pub interface_number: u8,
    pub alternate_setting: u8,
    pub class: u8,
    pub subclass: u8,
    pub protocol: u8,
    pub endpoints: Vec<EndpointDescriptor>,
}
