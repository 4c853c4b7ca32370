//! USB transfer helpers
//!
//! Maps rusb errors onto the protocol's transfer status and runs the one
//! bulk transfer the probe tool needs: reading a received frame.

use bytes::BytesMut;
use ipheth_protocol::{BulkInPipe, TransferError};
use rusb::{Context, DeviceHandle};
use std::time::Duration;
use tracing::debug;

/// Read one frame from the bulk-in pipe into a buffer of `buffer_size`
/// bytes
///
/// The returned buffer is truncated to the received length and still
/// carries the device's alignment pad.
pub fn read_frame(
    handle: &DeviceHandle<Context>,
    pipe: BulkInPipe,
    buffer_size: usize,
    timeout: Duration,
) -> Result<BytesMut, TransferError> {
    let mut frame = BytesMut::zeroed(buffer_size);

    let len = handle
        .read_bulk(pipe.endpoint(), &mut frame, timeout)
        .map_err(map_rusb_error)?;
    frame.truncate(len);

    debug!(
        "Bulk transfer on endpoint {:#04x}: {} bytes",
        pipe.endpoint(),
        len
    );
    Ok(frame)
}

/// Map rusb::Error to the protocol's TransferError
pub fn map_rusb_error(err: rusb::Error) -> TransferError {
    match err {
        rusb::Error::Timeout => TransferError::Timeout,
        rusb::Error::Pipe => TransferError::Pipe,
        rusb::Error::NoDevice => TransferError::NoDevice,
        rusb::Error::NotFound => TransferError::NotFound,
        rusb::Error::Busy => TransferError::Busy,
        rusb::Error::Overflow => TransferError::Overflow,
        rusb::Error::Io => TransferError::Io,
        rusb::Error::InvalidParam => TransferError::InvalidParam,
        rusb::Error::Access => TransferError::Access,
        _ => TransferError::Other {
            message: err.to_string(),
        },
    }
}
