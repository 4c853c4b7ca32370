//! Endpoint resolution
//!
//! Classifies the endpoints of the tethering alternate setting into the
//! bulk-in and bulk-out pipes used by the data path. Pure: no I/O.

use crate::error::{DriverError, MissingEndpoint, Result};
use ipheth_protocol::{BulkInPipe, BulkOutPipe, EndpointDescriptor, Pipes};
use tracing::{debug, error};

/// Find the bulk-in and bulk-out endpoints of a descriptor set
///
/// Scans once in descriptor order. When a direction appears more than once
/// the last endpoint seen wins. Endpoints of other transfer types are
/// skipped.
pub fn resolve(endpoints: &[EndpointDescriptor]) -> Result<Pipes> {
    let mut input = None;
    let mut output = None;

    for endpoint in endpoints {
        if endpoint.is_bulk_in() {
            input = Some(BulkInPipe(endpoint.address));
        } else if endpoint.is_bulk_out() {
            output = Some(BulkOutPipe(endpoint.address));
        }
    }

    match (input, output) {
        (Some(input), Some(output)) => {
            let pipes = Pipes { input, output };
            debug!("Resolved data pipes: {}", pipes);
            Ok(pipes)
        }
        (input, output) => {
            let missing = match (input, output) {
                (None, Some(_)) => MissingEndpoint::BulkIn,
                (Some(_), None) => MissingEndpoint::BulkOut,
                _ => MissingEndpoint::Both,
            };
            error!("Unable to find endpoints: no {}", missing);
            Err(DriverError::EndpointNotFound { missing })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipheth_protocol::TransferKind;

    fn bulk(address: u8) -> EndpointDescriptor {
        EndpointDescriptor::new(address, TransferKind::Bulk, 512)
    }

    fn interrupt(address: u8) -> EndpointDescriptor {
        EndpointDescriptor::new(address, TransferKind::Interrupt, 8)
    }

    #[test]
    fn test_resolve_pair() {
        let pipes = resolve(&[bulk(0x81), bulk(0x02)]).unwrap();
        assert_eq!(pipes.input, BulkInPipe(0x81));
        assert_eq!(pipes.output, BulkOutPipe(0x02));
    }

    #[test]
    fn test_resolve_order_independent() {
        let pipes = resolve(&[bulk(0x04), interrupt(0x83), bulk(0x85)]).unwrap();
        assert_eq!(pipes.input, BulkInPipe(0x85));
        assert_eq!(pipes.output, BulkOutPipe(0x04));
    }

    #[test]
    fn test_resolve_last_seen_wins() {
        let pipes = resolve(&[bulk(0x81), bulk(0x02), bulk(0x83), bulk(0x04)]).unwrap();
        assert_eq!(pipes.input, BulkInPipe(0x83));
        assert_eq!(pipes.output, BulkOutPipe(0x04));
    }

    #[test]
    fn test_resolve_missing() {
        assert_eq!(
            resolve(&[bulk(0x81)]),
            Err(DriverError::EndpointNotFound {
                missing: MissingEndpoint::BulkOut
            })
        );
        assert_eq!(
            resolve(&[bulk(0x02), interrupt(0x83)]),
            Err(DriverError::EndpointNotFound {
                missing: MissingEndpoint::BulkIn
            })
        );
        assert_eq!(
            resolve(&[]),
            Err(DriverError::EndpointNotFound {
                missing: MissingEndpoint::Both
            })
        );
    }

    #[test]
    fn test_interrupt_endpoints_are_not_bulk() {
        let result = resolve(&[interrupt(0x81), interrupt(0x02)]);
        assert!(matches!(result, Err(DriverError::EndpointNotFound { .. })));
    }
}
