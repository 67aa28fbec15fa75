#![cfg(not(target_arch = "wasm32"))]

use gfxcmd_stream::{CommandContainer, CommandStream, HostSegmentAllocator, NoopCloser, Segment};
use proptest::prelude::*;

proptest! {
    #[test]
    fn reserve_advances_by_exactly_n(sizes in prop::collection::vec(0usize..64, 0..32)) {
        let total: usize = sizes.iter().sum();
        let mut stream = CommandStream::new(Segment::zeroed(total, Some(0x10_0000)), 0);
        for n in sizes {
            let before = stream.used();
            let r = stream.reserve(n).unwrap();
            prop_assert_eq!(r.offset, before);
            prop_assert_eq!(r.len(), n);
            prop_assert_eq!(r.gpu_address, Some(0x10_0000 + before as u64));
            prop_assert_eq!(stream.used(), before + n);
        }
        prop_assert_eq!(stream.used(), total);
    }

    #[test]
    fn margin_holds_after_every_reservation(
        segment_size in 32usize..256,
        tail in 0usize..16,
        sizes in prop::collection::vec(0usize..48, 1..64),
    ) {
        let mut container = CommandContainer::new(
            HostSegmentAllocator::new(usize::MAX),
            NoopCloser::new(tail),
            segment_size,
        );
        let mut stream = container.open_stream().unwrap();
        for n in sizes {
            let before = stream.segment().id();
            let r = stream.reserve(n).unwrap();
            let chained = r.segment != before;
            prop_assert_eq!(r.len(), n);
            if chained {
                prop_assert_eq!(r.offset, 0);
            }
            prop_assert!(stream.used() + stream.tail_margin() <= stream.capacity());
        }
        let (last, used) = stream.finish();
        container.close_final(last, used);

        for retired in container.segments() {
            prop_assert!(retired.used <= retired.segment.capacity());
        }
    }
}
