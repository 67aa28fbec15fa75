//! Dword-level bit packing for hardware command layouts.
//!
//! Every command the GPU front-end consumes is a little-endian sequence of 32-bit dwords whose
//! fields are documented as inclusive bit ranges (`BITFIELD_RANGE(lo, hi)` in the hardware
//! reference). [`BitField`] and [`AddressField`] name such ranges; [`CmdDwords`] is the
//! zero-initialised buffer they are written into.
//!
//! Writing a value that does not fit its range is a programming error and panics: a value that
//! spills into a neighbouring field is a silent GPU hang, not a recoverable condition.

use core::fmt;

/// An inclusive bit range `lo..=hi` inside one dword of a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BitField {
    pub dword: u8,
    pub lo: u8,
    pub hi: u8,
}

impl BitField {
    pub const fn new(dword: u8, lo: u8, hi: u8) -> Self {
        assert!(lo <= hi && hi < 32);
        Self { dword, lo, hi }
    }

    /// A single-bit field.
    pub const fn flag(dword: u8, bit: u8) -> Self {
        Self::new(dword, bit, bit)
    }

    pub const fn width(self) -> u32 {
        (self.hi - self.lo + 1) as u32
    }

    /// Largest value representable by the field.
    pub const fn max_value(self) -> u32 {
        if self.width() == 32 {
            u32::MAX
        } else {
            (1u32 << self.width()) - 1
        }
    }

    pub const fn mask(self) -> u32 {
        self.max_value() << self.lo
    }
}

/// A graphics address occupying bits `lo..=63` of the qword formed by two consecutive dwords
/// (`dword` holds the low half).
///
/// The address is stored in place: bits below `lo` are reserved and must be zero in the
/// address, which is why callers must pass a suitably aligned value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AddressField {
    pub dword: u8,
    pub lo: u8,
}

impl AddressField {
    pub const fn new(dword: u8, lo: u8) -> Self {
        assert!(lo < 64);
        Self { dword, lo }
    }

    /// Required alignment of addresses written to this field, in bytes.
    pub const fn alignment(self) -> u64 {
        1u64 << self.lo
    }

    const fn low_mask(self) -> u64 {
        self.alignment() - 1
    }
}

/// Build a fixed-size command template whose first dword is `header` and whose remaining dwords
/// are zero.
pub const fn template<const N: usize>(header: u32) -> [u32; N] {
    let mut dwords = [0u32; N];
    dwords[0] = header;
    dwords
}

/// A command (or run of commands) under construction.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CmdDwords {
    dwords: Vec<u32>,
}

impl CmdDwords {
    /// Start from a layout's default-initialised template.
    pub fn from_template(template: &[u32]) -> Self {
        Self {
            dwords: template.to_vec(),
        }
    }

    pub fn zeroed(len_dwords: usize) -> Self {
        Self {
            dwords: vec![0; len_dwords],
        }
    }

    /// Reinterpret little-endian bytes previously produced by [`CmdDwords::write_le`].
    ///
    /// Panics if `bytes` is not a whole number of dwords.
    pub fn from_le_bytes(bytes: &[u8]) -> Self {
        assert!(
            bytes.len() % 4 == 0,
            "command bytes must be dword aligned (got {} bytes)",
            bytes.len()
        );
        let dwords = bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Self { dwords }
    }

    pub fn len_dwords(&self) -> usize {
        self.dwords.len()
    }

    pub fn len_bytes(&self) -> usize {
        self.dwords.len() * 4
    }

    pub fn is_empty(&self) -> bool {
        self.dwords.is_empty()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.dwords
    }

    pub fn raw(&self, index: usize) -> u32 {
        self.dwords[index]
    }

    pub fn set_raw(&mut self, index: usize, value: u32) {
        self.dwords[index] = value;
    }

    pub fn set(&mut self, field: BitField, value: u32) {
        assert!(
            value <= field.max_value(),
            "value {value:#x} does not fit bits {}..={} of dword {}",
            field.lo,
            field.hi,
            field.dword
        );
        let dw = &mut self.dwords[field.dword as usize];
        *dw = (*dw & !field.mask()) | (value << field.lo);
    }

    pub fn set_flag(&mut self, field: BitField, value: bool) {
        self.set(field, value as u32);
    }

    pub fn get(&self, field: BitField) -> u32 {
        (self.dwords[field.dword as usize] & field.mask()) >> field.lo
    }

    pub fn flag(&self, field: BitField) -> bool {
        self.get(field) != 0
    }

    pub fn set_address(&mut self, field: AddressField, address: u64) {
        assert!(
            address & field.low_mask() == 0,
            "address {address:#x} is not {}-byte aligned",
            field.alignment()
        );
        let lo_idx = field.dword as usize;
        let old = self.qword(lo_idx);
        let new = (old & field.low_mask()) | address;
        self.dwords[lo_idx] = new as u32;
        self.dwords[lo_idx + 1] = (new >> 32) as u32;
    }

    pub fn address(&self, field: AddressField) -> u64 {
        self.qword(field.dword as usize) & !field.low_mask()
    }

    fn qword(&self, lo_idx: usize) -> u64 {
        u64::from(self.dwords[lo_idx]) | (u64::from(self.dwords[lo_idx + 1]) << 32)
    }

    /// Append another command block after this one.
    pub fn extend(&mut self, other: &CmdDwords) {
        self.dwords.extend_from_slice(&other.dwords);
    }

    /// Serialise into `dst`, which must be exactly [`CmdDwords::len_bytes`] long.
    pub fn write_le(&self, dst: &mut [u8]) {
        assert_eq!(dst.len(), self.len_bytes());
        for (chunk, dw) in dst.chunks_exact_mut(4).zip(&self.dwords) {
            chunk.copy_from_slice(&dw.to_le_bytes());
        }
    }

    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.len_bytes()];
        self.write_le(&mut out);
        out
    }
}

impl fmt::Debug for CmdDwords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.dwords.iter().map(|dw| format!("{dw:#010x}")))
            .finish()
    }
}
