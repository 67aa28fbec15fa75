//! Offline reader for captured command streams and heap snapshots.
//!
//! Nothing here runs on the submission path. A trace tool walks a segment's bytes with
//! [`scan_markers`], then resolves each pair against a snapshot of the tag heap.

use bytemuck::Pod;

use crate::error::SwTagsError;
use crate::heap::HeapHeader;
use crate::layout::LayoutDocument;
use crate::manager::{DESCRIPTOR_HEAP_MAGIC, TAG_HEAP_MAGIC};
use crate::marker::{CALL_ID_MASK, OFFSET_MARKER_BIT};
use crate::tags::{
    read_fixed_str, CallNameBeginTag, CallNameEndTag, KernelNameTag, OpCode, PipeControlReasonTag,
    SwTag, TagHeader,
};

const CMD_TYPE_SHIFT: u32 = 29;
const CMD_TYPE_MI: u32 = 0;
const MI_OPCODE_SHIFT: u32 = 23;
const MI_OPCODE_MASK: u32 = 0x3f;
const MI_NOOP: u32 = 0x00;
const MI_BATCH_BUFFER_END: u32 = 0x0a;
const NOOP_REGISTER_WRITE_ENABLE: u32 = 1 << 22;
const NOOP_ID_MASK: u32 = 0x3f_ffff;
const OFFSET_DWORDS_MASK: u32 = 0xf_ffff;

/// One marker/offset no-op pair found in a command stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MarkerPair {
    pub opcode: u8,
    /// Low 13 bits of the call id.
    pub call_id_low: u32,
    /// Payload offset in the tag heap, in bytes.
    pub heap_offset: usize,
    /// Byte offset of the marker no-op in the scanned stream.
    pub stream_offset: usize,
}

/// A tag payload resolved from the tag heap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedTag {
    pub opcode: OpCode,
    pub call_id: u32,
    /// Kernel name, reason or call name depending on `opcode`.
    pub text: String,
}

/// Dwords occupied by the command whose header is `header`.
fn command_len_dwords(header: u32) -> usize {
    match header >> CMD_TYPE_SHIFT {
        CMD_TYPE_MI => match (header >> MI_OPCODE_SHIFT) & MI_OPCODE_MASK {
            MI_NOOP | MI_BATCH_BUFFER_END => 1,
            _ => (header & 0xff) as usize + 2,
        },
        // 3D/GPGPU and blitter commands carry an 8-bit length bias of 2 like MI commands.
        2 | 3 => (header & 0xff) as usize + 2,
        _ => 1,
    }
}

fn is_noop(dw: u32) -> bool {
    dw >> MI_OPCODE_SHIFT == MI_NOOP
}

/// Find every marker no-op immediately followed by its offset no-op.
///
/// Trailing bytes that do not form a whole dword are ignored.
pub fn scan_markers(stream: &[u8]) -> Vec<MarkerPair> {
    let dwords: Vec<u32> = stream
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    let mut pairs = Vec::new();
    let mut i = 0;
    while i < dwords.len() {
        let dw = dwords[i];
        let marker = is_noop(dw)
            && dw & NOOP_REGISTER_WRITE_ENABLE != 0
            && dw & OFFSET_MARKER_BIT == 0;
        if marker {
            if let Some(&next) = dwords.get(i + 1) {
                if is_noop(next)
                    && next & NOOP_REGISTER_WRITE_ENABLE == 0
                    && next & OFFSET_MARKER_BIT != 0
                {
                    let id = dw & NOOP_ID_MASK;
                    pairs.push(MarkerPair {
                        opcode: (id & 0xff) as u8,
                        call_id_low: (id >> 8) & CALL_ID_MASK,
                        heap_offset: ((next & OFFSET_DWORDS_MASK) as usize) * 4,
                        stream_offset: i * 4,
                    });
                    i += 2;
                    continue;
                }
            }
        }
        i += command_len_dwords(dw);
    }
    pairs
}

fn read_pod<T: Pod>(bytes: &[u8], offset: usize) -> Result<T, SwTagsError> {
    let needed = core::mem::size_of::<T>();
    let slice = offset
        .checked_add(needed)
        .and_then(|end| bytes.get(offset..end))
        .ok_or(SwTagsError::Truncated {
            offset,
            needed,
            len: bytes.len(),
        })?;
    Ok(bytemuck::pod_read_unaligned(slice))
}

/// Read and validate the header at the start of a heap snapshot.
pub fn read_heap_header(bytes: &[u8], expected_magic: u32) -> Result<HeapHeader, SwTagsError> {
    let header: HeapHeader = read_pod(bytes, 0)?;
    if header.magic != expected_magic {
        return Err(SwTagsError::BadMagic {
            expected: expected_magic,
            found: header.magic,
        });
    }
    Ok(header)
}

/// Parse the layout document out of a descriptor heap snapshot.
pub fn read_descriptor(bytes: &[u8]) -> Result<LayoutDocument, SwTagsError> {
    let header = read_heap_header(bytes, DESCRIPTOR_HEAP_MAGIC)?;
    let len = header.payload_size as usize;
    let json = bytes
        .get(HeapHeader::SIZE_BYTES..HeapHeader::SIZE_BYTES + len)
        .ok_or(SwTagsError::Truncated {
            offset: HeapHeader::SIZE_BYTES,
            needed: len,
            len: bytes.len(),
        })?;
    Ok(serde_json::from_slice(json)?)
}

fn decode_as<T: SwTag>(
    tag_heap: &[u8],
    offset: usize,
    fields: impl FnOnce(&T) -> (u32, &[u8]),
) -> Result<DecodedTag, SwTagsError> {
    let tag: T = read_pod(tag_heap, offset)?;
    let (call_id, text) = fields(&tag);
    Ok(DecodedTag {
        opcode: T::OPCODE,
        call_id,
        text: read_fixed_str(text),
    })
}

/// Resolve the payload a marker pair points at.
///
/// `tag_heap` is a snapshot of the whole tag heap, header included.
pub fn decode_tag(tag_heap: &[u8], pair: &MarkerPair) -> Result<DecodedTag, SwTagsError> {
    read_heap_header(tag_heap, TAG_HEAP_MAGIC)?;

    let offset = pair.heap_offset;
    let header: TagHeader = read_pod(tag_heap, offset)?;
    if header.opcode != pair.opcode {
        return Err(SwTagsError::OpcodeMismatch {
            offset,
            expected: pair.opcode,
            found: header.opcode,
        });
    }

    match OpCode::from_u8(header.opcode).ok_or(SwTagsError::UnknownOpcode(header.opcode))? {
        OpCode::KernelName => {
            decode_as::<KernelNameTag>(tag_heap, offset, |t| (t.call_id, &t.kernel_name[..]))
        }
        OpCode::PipeControlReason => {
            decode_as::<PipeControlReasonTag>(tag_heap, offset, |t| (t.call_id, &t.reason[..]))
        }
        OpCode::CallNameBegin => {
            decode_as::<CallNameBeginTag>(tag_heap, offset, |t| (t.call_id, &t.call_name[..]))
        }
        OpCode::CallNameEnd => {
            decode_as::<CallNameEndTag>(tag_heap, offset, |t| (t.call_id, &t.call_name[..]))
        }
    }
}
