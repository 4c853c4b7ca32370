//! Receive framing fixup

use crate::error::{DriverError, Result};
use bytes::{Buf, BytesMut};
use tracing::trace;

/// Strip the device's alignment pad from the front of a received frame
///
/// The pad carries no data and is not inspected. The frame is advanced in
/// place; calling this twice on one frame strips payload. A frame shorter
/// than the pad is left untouched and rejected.
pub fn rx_fixup(frame: &mut BytesMut, pad: usize) -> Result<()> {
    if frame.len() < pad {
        return Err(DriverError::RuntFrame {
            len: frame.len(),
            pad,
        });
    }

    trace!("rx frame ({} bytes): {:02x?}", frame.len(), &frame[..]);
    frame.advance(pad);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_pad() {
        let mut frame = BytesMut::from(&[0xaa, 0xbb, 0x01, 0x02, 0x03][..]);
        rx_fixup(&mut frame, 2).unwrap();
        assert_eq!(&frame[..], &[0x01, 0x02, 0x03]);
    }

    #[test]
    fn test_not_idempotent() {
        let mut frame = BytesMut::from(&[0xaa, 0xbb, 0x01, 0x02, 0x03][..]);
        rx_fixup(&mut frame, 2).unwrap();
        rx_fixup(&mut frame, 2).unwrap();
        assert_eq!(&frame[..], &[0x03]);
    }

    #[test]
    fn test_pad_only_frame() {
        let mut frame = BytesMut::from(&[0x00, 0x00][..]);
        rx_fixup(&mut frame, 2).unwrap();
        assert!(frame.is_empty());
    }

    #[test]
    fn test_runt_frame() {
        let mut frame = BytesMut::from(&[0xaa][..]);
        assert_eq!(
            rx_fixup(&mut frame, 2),
            Err(DriverError::RuntFrame { len: 1, pad: 2 })
        );
        assert_eq!(&frame[..], &[0xaa]);
    }
}
