//! Transfer status errors

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure status of a USB transfer
///
/// A timed-out transfer is reported as [`TransferError::Timeout`]; callers of
/// the driver only ever see it wrapped as a transfer failure.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum TransferError {
    #[error("Transfer timed out")]
    Timeout,

    #[error("Endpoint stalled")]
    Pipe,

    #[error("Device was disconnected")]
    NoDevice,

    #[error("Device or endpoint not found")]
    NotFound,

    #[error("Device is busy")]
    Busy,

    #[error("Buffer overflow")]
    Overflow,

    #[error("I/O error")]
    Io,

    #[error("Invalid parameter")]
    InvalidParam,

    #[error("Access denied")]
    Access,

    #[error("Transfer failed: {message}")]
    Other { message: String },
}

impl TransferError {
    /// Negative kernel-style status for this failure
    pub fn errno(&self) -> i32 {
        match self {
            TransferError::Timeout => -110,     // ETIMEDOUT
            TransferError::Pipe => -32,         // EPIPE
            TransferError::NoDevice => -19,     // ENODEV
            TransferError::NotFound => -2,      // ENOENT
            TransferError::Busy => -16,         // EBUSY
            TransferError::Overflow => -75,     // EOVERFLOW
            TransferError::Io => -5,            // EIO
            TransferError::InvalidParam => -22, // EINVAL
            TransferError::Access => -13,       // EACCES
            TransferError::Other { .. } => -5,
        }
    }
}
