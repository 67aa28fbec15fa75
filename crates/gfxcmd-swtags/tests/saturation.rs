use gfxcmd_hw::{HwGeneration, HwProfile};
use gfxcmd_stream::{CommandStream, Segment};
use gfxcmd_swtags::{
    GpuHeap, HeapHeader, HostHeapAllocator, KernelNameTag, PipeControlReasonTag, SwTag,
    SwTagsConfig, SwTagsManager, TagOutcome,
};
use pretty_assertions::assert_eq;

fn manager(config: SwTagsConfig) -> SwTagsManager<HostHeapAllocator> {
    let profile = HwProfile::for_generation(HwGeneration::XeHpg);
    let mut m = SwTagsManager::new(HostHeapAllocator::new(0x2_0000_0000, 1 << 20), profile, config);
    m.initialize().unwrap();
    m
}

#[test]
fn tag_after_max_count_changes_nothing() {
    let max = 5;
    let mut m = manager(SwTagsConfig {
        max_tag_count: max,
        ..SwTagsConfig::default()
    });
    let mut stream = CommandStream::new(Segment::zeroed(4096, None), 0);

    for i in 0..max {
        let outcome = m
            .insert_tag(&mut stream, &PipeControlReasonTag::new("flush", i))
            .unwrap();
        assert!(matches!(outcome, TagOutcome::Inserted { .. }));
    }
    assert_eq!(m.tag_count(), max);

    let used = stream.used();
    let heap = m.tag_heap().unwrap().contents().to_vec();
    let locks = m.tag_heap().unwrap().lock_count();

    let outcome = m
        .insert_tag(&mut stream, &PipeControlReasonTag::new("flush", max))
        .unwrap();
    assert_eq!(outcome, TagOutcome::Dropped);
    assert_eq!(stream.used(), used);
    assert_eq!(m.tag_heap().unwrap().contents(), &heap[..]);
    assert_eq!(m.tag_heap().unwrap().lock_count(), locks);
    assert_eq!(m.tag_count(), max);
}

#[test]
fn tag_that_overruns_heap_is_dropped() {
    let heap_size = HeapHeader::SIZE_BYTES + 2 * PipeControlReasonTag::size_bytes();
    let mut m = manager(SwTagsConfig {
        max_tag_count: 100,
        tag_heap_size: heap_size,
    });
    let mut stream = CommandStream::new(Segment::zeroed(256, None), 0);

    for _ in 0..2 {
        let outcome = m
            .insert_tag(&mut stream, &PipeControlReasonTag::new("dc flush", 7))
            .unwrap();
        assert!(matches!(outcome, TagOutcome::Inserted { .. }));
    }
    assert_eq!(m.heap_offset(), m.tag_heap().unwrap().len());

    let used = stream.used();
    let outcome = m
        .insert_tag(&mut stream, &PipeControlReasonTag::new("dc flush", 7))
        .unwrap();
    assert_eq!(outcome, TagOutcome::Dropped);
    assert_eq!(stream.used(), used);
}

#[test]
fn larger_tag_can_saturate_before_smaller_one() {
    // 44 bytes left: the 76-byte kernel tag no longer fits, a 44-byte one still does.
    let heap_size = HeapHeader::SIZE_BYTES + KernelNameTag::size_bytes() + 44;
    let mut m = manager(SwTagsConfig {
        max_tag_count: 100,
        tag_heap_size: heap_size,
    });
    let mut stream = CommandStream::new(Segment::zeroed(256, None), 0);

    m.insert_tag(&mut stream, &KernelNameTag::new("a", 1)).unwrap();
    assert_eq!(
        m.insert_tag(&mut stream, &KernelNameTag::new("b", 1)).unwrap(),
        TagOutcome::Dropped
    );
    assert_eq!(
        m.insert_tag(&mut stream, &PipeControlReasonTag::new("c", 1)).unwrap(),
        TagOutcome::Inserted {
            offset: HeapHeader::SIZE_BYTES + KernelNameTag::size_bytes()
        }
    );
}
