#![cfg(not(target_arch = "wasm32"))]

use gfxcmd_hw::{HwGeneration, HwProfile};
use gfxcmd_stream::{CommandStream, Segment};
use gfxcmd_swtags::{
    scan_markers, CallNameBeginTag, HeapHeader, HostHeapAllocator, KernelNameTag,
    PipeControlReasonTag, SwTagsConfig, SwTagsManager, TagOutcome,
};
use proptest::prelude::*;

proptest! {
    #[test]
    fn inserted_tags_are_contiguous_and_announced(
        kinds in proptest::collection::vec(0u8..3, 0..64),
        max_tag_count in 0u32..40,
        heap_dwords in 4usize..512,
    ) {
        let profile = HwProfile::for_generation(HwGeneration::Gen12Lp);
        let config = SwTagsConfig { max_tag_count, tag_heap_size: heap_dwords * 4 };
        let mut m = SwTagsManager::new(HostHeapAllocator::new(0, 1 << 20), profile, config);
        m.initialize().unwrap();
        let mut stream = CommandStream::new(Segment::zeroed(64 * 8, None), 0);

        let mut offsets = Vec::new();
        for (i, kind) in kinds.iter().enumerate() {
            let before = m.heap_offset();
            let outcome = match kind {
                0 => m.insert_tag(&mut stream, &KernelNameTag::new("k", i as u32)),
                1 => m.insert_tag(&mut stream, &PipeControlReasonTag::new("r", i as u32)),
                _ => m.insert_tag(&mut stream, &CallNameBeginTag::new("c", i as u32)),
            }
            .unwrap();
            if let TagOutcome::Inserted { offset } = outcome {
                prop_assert_eq!(offset, before);
                offsets.push(offset);
            } else {
                prop_assert_eq!(m.heap_offset(), before);
            }
        }

        prop_assert!(m.tag_count() <= max_tag_count);
        prop_assert_eq!(m.tag_count() as usize, offsets.len());
        prop_assert!(m.heap_offset() <= heap_dwords * 4);
        prop_assert!(offsets.first().map_or(true, |&o| o == HeapHeader::SIZE_BYTES));
        prop_assert_eq!(stream.used(), offsets.len() * m.markers_size());

        let found: Vec<_> = scan_markers(stream.written())
            .iter()
            .map(|p| p.heap_offset)
            .collect();
        prop_assert_eq!(found, offsets);
    }
}
