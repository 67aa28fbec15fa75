//! Identification numbers carried by the two `MI_NOOP`s that announce each tag.
//!
//! Marker: opcode in bits 0..=7, low 13 bits of the call id in bits 8..=20, bit 21 clear, sent
//! with the register-write-enable bit set. Offset: the payload's dword offset into the tag heap
//! in bits 0..=19 and bit 21 set, without register write.

use crate::tags::OpCode;

pub const OFFSET_MARKER_BIT: u32 = 1 << 21;
pub const CALL_ID_MASK: u32 = 0x1fff;
pub const MAX_OFFSET_DWORDS: usize = 1 << 20;

pub fn marker_noop_id(opcode: OpCode, call_id: u32) -> u32 {
    opcode as u32 | ((call_id & CALL_ID_MASK) << 8)
}

pub fn offset_noop_id(byte_offset: usize) -> u32 {
    assert!(byte_offset % 4 == 0, "tag offset {byte_offset} is not dword aligned");
    let dwords = byte_offset / 4;
    assert!(
        dwords < MAX_OFFSET_DWORDS,
        "tag offset {byte_offset} does not fit the offset marker"
    );
    dwords as u32 | OFFSET_MARKER_BIT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_keeps_offset_bit_clear() {
        let id = marker_noop_id(OpCode::CallNameEnd, u32::MAX);
        assert_eq!(id, 0x1f_ff04);
        assert_eq!(id & OFFSET_MARKER_BIT, 0);
    }

    #[test]
    fn offset_is_in_dwords() {
        assert_eq!(offset_noop_id(16), OFFSET_MARKER_BIT | 4);
        assert_eq!(offset_noop_id(4 * (MAX_OFFSET_DWORDS - 1)), OFFSET_MARKER_BIT | 0xf_ffff);
    }

    #[test]
    #[should_panic(expected = "does not fit")]
    fn offset_overflow_panics() {
        offset_noop_id(4 * MAX_OFFSET_DWORDS);
    }
}
