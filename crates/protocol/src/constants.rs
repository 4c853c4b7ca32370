//! Vendor protocol constants
//!
//! Every magic number the device protocol depends on lives in
//! [`VendorProtocol`]. A revision of the device protocol is a new table, not
//! a change to the driver logic.

use std::time::Duration;

/// Control endpoint used for all vendor requests
pub const CONTROL_ENDPOINT: u8 = 0x00;

/// Size of the per-session control scratch buffer
pub const CONTROL_BUFFER_SIZE: usize = 0x40;

/// Timeout applied to every vendor control transfer
pub const CONTROL_TIMEOUT: Duration = Duration::from_secs(5);

/// `bRequest` of the MAC address query
pub const CMD_GET_MACADDR: u8 = 0x00;

/// `bRequest` of the carrier state query
pub const CMD_CARRIER_CHECK: u8 = 0x45;

/// `bmRequestType`: vendor, device-to-host, device recipient
pub const REQUEST_TYPE_VENDOR_IN: u8 = 0xc0;

/// `wValue` sent with every vendor request
pub const REQUEST_VALUE: u16 = 0x00;

/// `wIndex` sent with every vendor request
pub const REQUEST_INDEX: u16 = 0x02;

/// First reply byte of a carrier check when the link is up
pub const CARRIER_ON: u8 = 0x04;

/// Interface number carrying the tethering endpoints
pub const INTERFACE_NUMBER: u8 = 2;

/// Alternate setting that activates the bulk endpoints
pub const ALT_SETTING: u8 = 1;

/// Alignment padding the device prepends to every received frame
pub const RX_ALIGN_PAD: usize = 2;

/// Length of an Ethernet hardware address
pub const MAC_ADDRESS_LEN: usize = 6;

/// Largest frame the data path reads from the bulk-in pipe
pub const RX_BUFFER_SIZE: usize = 1518;

/// Cadence for periodic carrier polling
pub const CARRIER_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Complete description of one revision of the vendor protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VendorProtocol {
    pub control_endpoint: u8,
    pub control_buffer_size: usize,
    pub control_timeout: Duration,
    pub get_macaddr: u8,
    pub carrier_check: u8,
    pub request_type: u8,
    pub value: u16,
    pub index: u16,
    pub carrier_on: u8,
    pub interface_number: u8,
    pub alt_setting: u8,
    pub rx_pad: usize,
    pub mac_len: usize,
    pub rx_buffer_size: usize,
    pub carrier_check_interval: Duration,
}

impl VendorProtocol {
    /// The protocol spoken by iPhone and iPad tethering interfaces
    pub const IPHETH: Self = Self {
        control_endpoint: CONTROL_ENDPOINT,
        control_buffer_size: CONTROL_BUFFER_SIZE,
        control_timeout: CONTROL_TIMEOUT,
        get_macaddr: CMD_GET_MACADDR,
        carrier_check: CMD_CARRIER_CHECK,
        request_type: REQUEST_TYPE_VENDOR_IN,
        value: REQUEST_VALUE,
        index: REQUEST_INDEX,
        carrier_on: CARRIER_ON,
        interface_number: INTERFACE_NUMBER,
        alt_setting: ALT_SETTING,
        rx_pad: RX_ALIGN_PAD,
        mac_len: MAC_ADDRESS_LEN,
        rx_buffer_size: RX_BUFFER_SIZE,
        carrier_check_interval: CARRIER_CHECK_INTERVAL,
    };
}

impl Default for VendorProtocol {
    fn default() -> Self {
        Self::IPHETH
    }
}
