//! Property tests for endpoint resolution

use ipheth_driver::{DriverError, resolve};
use ipheth_protocol::{BulkInPipe, BulkOutPipe, EndpointDescriptor, TransferKind};
use proptest::prelude::*;

/// Endpoints that are never bulk: control, isochronous and interrupt in
/// either direction
fn non_bulk_strategy() -> impl Strategy<Value = EndpointDescriptor> {
    (
        1u8..16,
        any::<bool>(),
        prop_oneof![
            Just(TransferKind::Control),
            Just(TransferKind::Isochronous),
            Just(TransferKind::Interrupt),
        ],
    )
        .prop_map(|(number, is_in, kind)| {
            let address = if is_in { number | 0x80 } else { number };
            EndpointDescriptor::new(address, kind, 64)
        })
}

fn bulk(address: u8) -> EndpointDescriptor {
    EndpointDescriptor::new(address, TransferKind::Bulk, 512)
}

proptest! {
    /// Property: exactly one bulk-in and one bulk-out, anywhere in the set,
    /// resolve to that pair
    #[test]
    fn prop_resolves_the_single_pair(
        others in proptest::collection::vec(non_bulk_strategy(), 0..8),
        in_number in 1u8..16,
        out_number in 1u8..16,
        in_pos in any::<prop::sample::Index>(),
        out_pos in any::<prop::sample::Index>(),
    ) {
        let mut endpoints = others;
        let in_at = in_pos.index(endpoints.len() + 1);
        endpoints.insert(in_at, bulk(0x80 | in_number));
        let out_at = out_pos.index(endpoints.len() + 1);
        endpoints.insert(out_at, bulk(out_number));

        let pipes = resolve(&endpoints).unwrap();
        prop_assert_eq!(pipes.input, BulkInPipe(0x80 | in_number));
        prop_assert_eq!(pipes.output, BulkOutPipe(out_number));
    }

    /// Property: a set without a bulk-in endpoint never resolves
    #[test]
    fn prop_missing_bulk_in_fails(
        others in proptest::collection::vec(non_bulk_strategy(), 0..8),
        outs in proptest::collection::vec(1u8..16, 0..3),
    ) {
        let mut endpoints = others;
        endpoints.extend(outs.into_iter().map(bulk));

        let is_not_found = matches!(
            resolve(&endpoints),
            Err(DriverError::EndpointNotFound { .. })
        );
        prop_assert!(is_not_found);
    }

    /// Property: a set without a bulk-out endpoint never resolves
    #[test]
    fn prop_missing_bulk_out_fails(
        others in proptest::collection::vec(non_bulk_strategy(), 0..8),
        ins in proptest::collection::vec(1u8..16, 0..3),
    ) {
        let mut endpoints = others;
        endpoints.extend(ins.into_iter().map(|n| bulk(0x80 | n)));

        let is_not_found = matches!(
            resolve(&endpoints),
            Err(DriverError::EndpointNotFound { .. })
        );
        prop_assert!(is_not_found);
    }

    /// Property: with duplicates, the last endpoint of each direction wins
    #[test]
    fn prop_last_seen_wins(
        ins in proptest::collection::vec(1u8..16, 1..4),
        outs in proptest::collection::vec(1u8..16, 1..4),
    ) {
        let mut endpoints: Vec<_> = ins.iter().map(|&n| bulk(0x80 | n)).collect();
        endpoints.extend(outs.iter().map(|&n| bulk(n)));

        let pipes = resolve(&endpoints).unwrap();
        prop_assert_eq!(pipes.input, BulkInPipe(0x80 | ins[ins.len() - 1]));
        prop_assert_eq!(pipes.output, BulkOutPipe(outs[outs.len() - 1]));
    }
}
