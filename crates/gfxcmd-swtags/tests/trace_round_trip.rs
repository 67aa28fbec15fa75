use gfxcmd_hw::{CmdDwords, HwGeneration, HwProfile};
use gfxcmd_stream::{CommandStream, Segment};
use gfxcmd_swtags::{
    decode_tag, read_descriptor, scan_markers, GpuHeap, HostHeapAllocator, LayoutDocument, OpCode,
    SwTagsConfig, SwTagsManager, DESCRIPTOR_HEAP_MAGIC, TAG_HEAP_MAGIC,
};
use pretty_assertions::assert_eq;

fn manager() -> SwTagsManager<HostHeapAllocator> {
    let profile = HwProfile::for_generation(HwGeneration::Gen12Lp);
    let mut m = SwTagsManager::new(
        HostHeapAllocator::new(0x4000_0000, 1 << 20),
        profile,
        SwTagsConfig::default(),
    );
    m.initialize().unwrap();
    m
}

#[test]
fn heap_addresses_are_stamped_with_magics() {
    let m = manager();
    let mut stream = CommandStream::new(Segment::zeroed(128, None), 0);
    m.insert_heap_addresses(&mut stream).unwrap();
    assert_eq!(stream.used(), m.heap_addresses_size());

    let descriptor = m.descriptor_heap().unwrap().gpu_address();
    let tags = m.tag_heap().unwrap().gpu_address();
    assert_eq!(descriptor, 0x4000_0000);
    assert_eq!(tags, 0x4001_0000);
    assert_eq!(
        CmdDwords::from_le_bytes(stream.written()).as_slice(),
        &[
            0x1000_0002,
            0x4000_0000,
            0,
            DESCRIPTOR_HEAP_MAGIC,
            0x1000_0002,
            0x4001_0000,
            0,
            TAG_HEAP_MAGIC,
        ]
    );
}

#[test]
fn descriptor_heap_holds_layout_document() {
    let m = manager();
    let doc = read_descriptor(m.descriptor_heap().unwrap().contents()).unwrap();
    assert_eq!(doc, LayoutDocument::current());
}

#[test]
fn call_scope_decodes_from_stream_and_heap() {
    let mut m = manager();
    let mut stream = CommandStream::new(Segment::zeroed(512, None), 0);

    m.insert_heap_addresses(&mut stream).unwrap();
    let call_id = m.begin_call(&mut stream, "enqueueNDRangeKernel").unwrap();
    m.insert_kernel_name(&mut stream, "vector_add").unwrap();
    m.insert_pipe_control_reason(&mut stream, "post sync").unwrap();
    m.end_call(&mut stream, "enqueueNDRangeKernel", call_id).unwrap();

    let pairs = scan_markers(stream.written());
    assert_eq!(pairs.len(), 4);

    let heap = m.tag_heap().unwrap().contents();
    let decoded: Vec<_> = pairs
        .iter()
        .map(|pair| decode_tag(heap, pair).unwrap())
        .collect();

    let kinds: Vec<_> = decoded.iter().map(|t| t.opcode).collect();
    assert_eq!(
        kinds,
        [
            OpCode::CallNameBegin,
            OpCode::KernelName,
            OpCode::PipeControlReason,
            OpCode::CallNameEnd
        ]
    );
    assert_eq!(decoded[0].text, "enqueueNDRangeKernel");
    assert_eq!(decoded[1].text, "vector_add");
    assert_eq!(decoded[2].text, "post sync");
    assert_eq!(decoded[3].text, "enqueueNDRangeKernel");

    assert_eq!(decoded[0].call_id, call_id);
    assert_eq!(decoded[3].call_id, call_id);
    for (pair, tag) in pairs.iter().zip(&decoded) {
        assert_eq!(pair.call_id_low, tag.call_id & 0x1fff);
    }
}
