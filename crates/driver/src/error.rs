//! Driver error types

use ipheth_protocol::TransferError;
use std::fmt;
use thiserror::Error;

/// Which of the two data endpoints a descriptor set lacked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingEndpoint {
    BulkIn,
    BulkOut,
    Both,
}

impl fmt::Display for MissingEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingEndpoint::BulkIn => f.write_str("bulk-in"),
            MissingEndpoint::BulkOut => f.write_str("bulk-out"),
            MissingEndpoint::Both => f.write_str("bulk-in and bulk-out"),
        }
    }
}

/// Errors surfaced by the lifecycle hooks
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// The control scratch buffer could not be obtained
    #[error("Unable to allocate {size} byte control buffer")]
    Allocation { size: usize },

    /// The interface does not expose the required alternate setting
    #[error("Unable to find alternate setting {alternate} on interface {interface}")]
    AlternateSettingNotFound { interface: u8, alternate: u8 },

    /// The alternate setting lacks a bulk-in or bulk-out endpoint
    #[error("Unable to find endpoints: no {missing} endpoint")]
    EndpointNotFound { missing: MissingEndpoint },

    /// A control transfer failed or timed out
    #[error("USB control transfer failed: {0}")]
    Transfer(#[from] TransferError),

    /// A control transfer succeeded with fewer bytes than the reply needs
    #[error("Short reply: expected at least {expected} bytes, got {actual}")]
    ShortReply { expected: usize, actual: usize },

    /// A hook that needs the control channel ran outside the bound state
    #[error("Session is not bound")]
    NotBound,

    /// A received frame is too small to carry the alignment pad
    #[error("Frame of {len} bytes is shorter than the {pad} byte alignment pad")]
    RuntFrame { len: usize, pad: usize },
}

impl DriverError {
    /// Negative kernel-style status for framework glue that speaks integers
    pub fn errno(&self) -> i32 {
        match self {
            DriverError::Allocation { .. } => -12, // ENOMEM
            DriverError::AlternateSettingNotFound { .. }
            | DriverError::EndpointNotFound { .. }
            | DriverError::NotBound => -19, // ENODEV
            DriverError::Transfer(e) => e.errno(),
            DriverError::ShortReply { .. } | DriverError::RuntFrame { .. } => -22, // EINVAL
        }
    }

    /// Whether retrying the same hook later may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, DriverError::Transfer(_))
    }
}

pub type Result<T> = std::result::Result<T, DriverError>;
