//! Supported device table
//!
//! Only interfaces whose vendor/product pair is listed here and whose class
//! triple matches [`INTERFACE_CLASS`], [`INTERFACE_SUBCLASS`] and
//! [`INTERFACE_PROTOCOL`] are handed to the driver.

/// Name the driver registers under
pub const DRIVER_NAME: &str = "iphone_usb";

/// Human-readable driver description
pub const DRIVER_DESCRIPTION: &str = "Iphone USB Device";

pub const VID_APPLE: u16 = 0x05ac;

pub const INTERFACE_CLASS: u8 = 255;
pub const INTERFACE_SUBCLASS: u8 = 253;
pub const INTERFACE_PROTOCOL: u8 = 1;

/// One entry of the allow-list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupportedDevice {
    pub vendor_id: u16,
    pub product_id: u16,
    pub name: &'static str,
}

const fn apple(product_id: u16, name: &'static str) -> SupportedDevice {
    SupportedDevice {
        vendor_id: VID_APPLE,
        product_id,
        name,
    }
}

pub const SUPPORTED_DEVICES: &[SupportedDevice] = &[
    apple(0x1290, "iPhone"),
    apple(0x1292, "iPhone 3G"),
    apple(0x1294, "iPhone 3GS"),
    apple(0x1297, "iPhone 4"),
    apple(0x129a, "iPad"),
    apple(0x12a2, "iPad 2"),
    apple(0x12a6, "iPad 3"),
    apple(0x12ab, "iPad mini"),
    apple(0x129c, "iPhone 4 (Verizon)"),
    apple(0x12a0, "iPhone 4S"),
    apple(0x12a8, "iPhone 5"),
];

/// Look up a vendor/product pair in the allow-list
pub fn lookup(vendor_id: u16, product_id: u16) -> Option<&'static SupportedDevice> {
    SUPPORTED_DEVICES
        .iter()
        .find(|d| d.vendor_id == vendor_id && d.product_id == product_id)
}

/// Check an interface class triple against the tethering interface
pub fn matches_interface(class: u8, subclass: u8, protocol: u8) -> bool {
    class == INTERFACE_CLASS && subclass == INTERFACE_SUBCLASS && protocol == INTERFACE_PROTOCOL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(lookup(0x05ac, 0x12a8).map(|d| d.name), Some("iPhone 5"));
        assert_eq!(lookup(0x05ac, 0x1290).map(|d| d.name), Some("iPhone"));
        assert!(lookup(0x05ac, 0x1234).is_none());
        assert!(lookup(0x1234, 0x12a8).is_none());
    }

    #[test]
    fn test_table_is_unique() {
        assert_eq!(SUPPORTED_DEVICES.len(), 11);
        for (i, a) in SUPPORTED_DEVICES.iter().enumerate() {
            for b in &SUPPORTED_DEVICES[i + 1..] {
                assert_ne!(a.product_id, b.product_id);
            }
        }
    }

    #[test]
    fn test_matches_interface() {
        assert!(matches_interface(255, 253, 1));
        assert!(!matches_interface(255, 254, 2));
        assert!(!matches_interface(2, 6, 0));
    }
}
