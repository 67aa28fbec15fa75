//! Command layouts and the hardware enumerations their fields carry.
//!
//! Layouts are plain data: a default-initialised template (header dword pre-filled, every
//! other bit zero) plus the positions of the fields the encoders program. Fields a generation
//! does not have are `None`; encoders must leave them alone.

use crate::bits::{AddressField, BitField};

/// `MI_MATH`: header followed by `N` inline ALU instruction dwords.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MiMathLayout {
    pub header: u32,
    /// Holds `N - 1` (total dwords minus two).
    pub dword_length: BitField,
    pub mocs: Option<BitField>,
    /// Largest `N` the length field can describe.
    pub max_instructions: usize,
}

/// One `MI_MATH_ALU_INST_INLINE` dword.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AluInstLayout {
    pub opcode: BitField,
    pub operand1: BitField,
    pub operand2: BitField,
}

/// `MI_SEMAPHORE_WAIT`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SemaphoreWaitLayout {
    pub template: &'static [u32],
    pub compare_operation: BitField,
    pub wait_mode: BitField,
    pub register_poll_mode: BitField,
    pub indirect_data: Option<BitField>,
    pub data: BitField,
    pub address: AddressField,
    pub wait_token: Option<BitField>,
    /// Hardware encodings indexed by [`CompareOperation::index`].
    pub compare_values: [u32; 6],
}

/// Base address, cache control and modify-enable bit of one heap in `STATE_BASE_ADDRESS`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeapBaseFields {
    pub modify_enable: BitField,
    pub mocs: BitField,
    pub address: AddressField,
}

/// Buffer size (in 4 KiB pages) and its modify-enable bit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferSizeFields {
    pub modify_enable: BitField,
    pub size: BitField,
}

/// `STATE_BASE_ADDRESS`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateBaseAddressLayout {
    pub template: &'static [u32],
    pub general_state: HeapBaseFields,
    pub general_state_size: BufferSizeFields,
    pub stateless_mocs: BitField,
    pub surface_state: HeapBaseFields,
    pub dynamic_state: HeapBaseFields,
    pub dynamic_state_size: BufferSizeFields,
    pub indirect_object: HeapBaseFields,
    pub indirect_object_size: BufferSizeFields,
    pub instruction: HeapBaseFields,
    pub instruction_size: BufferSizeFields,
    pub bindless_surface_state: HeapBaseFields,
    /// Number of surface states in the bindless heap, minus one.
    pub bindless_surface_state_size: BitField,
    pub bindless_sampler_state: Option<HeapBaseFields>,
    pub bindless_sampler_state_size: Option<BitField>,
    pub l1_cache_policy: Option<BitField>,
}

/// `STATE_SYSTEM_MEM_FENCE_ADDRESS`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemFenceLayout {
    pub template: &'static [u32],
    pub address: AddressField,
}

/// `MI_NOOP`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NoopLayout {
    pub template: &'static [u32],
    pub identification_number: BitField,
    pub register_write_enable: BitField,
}

/// `MI_STORE_DATA_IMM` carrying a single data dword.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoreDataImmLayout {
    pub template: &'static [u32],
    pub address: AddressField,
    pub data: BitField,
}

/// `MI_BATCH_BUFFER_START`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchBufferStartLayout {
    pub template: &'static [u32],
    pub address: AddressField,
}

/// `MI_BATCH_BUFFER_END`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchBufferEndLayout {
    pub template: &'static [u32],
}

macro_rules! layout_size {
    ($($ty:ident),* $(,)?) => {
        $(
            impl $ty {
                /// Encoded size in bytes.
                pub const fn size_bytes(&self) -> usize {
                    self.template.len() * 4
                }
            }
        )*
    };
}

layout_size!(
    SemaphoreWaitLayout,
    StateBaseAddressLayout,
    MemFenceLayout,
    NoopLayout,
    StoreDataImmLayout,
    BatchBufferStartLayout,
    BatchBufferEndLayout,
);

/// ALU instruction opcodes understood by the command streamer's math unit.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AluOpcode {
    Noop = 0x000,
    Load = 0x080,
    LoadInverted = 0x480,
    Load0 = 0x081,
    Load1 = 0x481,
    Add = 0x100,
    Sub = 0x101,
    And = 0x102,
    Or = 0x103,
    Xor = 0x104,
    Shl = 0x105,
    Shr = 0x106,
    Store = 0x180,
    StoreInverted = 0x580,
}

impl AluOpcode {
    pub const fn from_u32(v: u32) -> Option<Self> {
        match v {
            0x000 => Some(Self::Noop),
            0x080 => Some(Self::Load),
            0x480 => Some(Self::LoadInverted),
            0x081 => Some(Self::Load0),
            0x481 => Some(Self::Load1),
            0x100 => Some(Self::Add),
            0x101 => Some(Self::Sub),
            0x102 => Some(Self::And),
            0x103 => Some(Self::Or),
            0x104 => Some(Self::Xor),
            0x105 => Some(Self::Shl),
            0x106 => Some(Self::Shr),
            0x180 => Some(Self::Store),
            0x580 => Some(Self::StoreInverted),
            _ => None,
        }
    }
}

/// ALU operand registers.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AluRegister {
    R0 = 0x00,
    R1 = 0x01,
    R2 = 0x02,
    R3 = 0x03,
    R4 = 0x04,
    R5 = 0x05,
    R6 = 0x06,
    R7 = 0x07,
    R8 = 0x08,
    R9 = 0x09,
    R10 = 0x0a,
    R11 = 0x0b,
    R12 = 0x0c,
    R13 = 0x0d,
    R14 = 0x0e,
    R15 = 0x0f,
    SrcA = 0x20,
    SrcB = 0x21,
    Accu = 0x31,
    Zf = 0x32,
    Cf = 0x33,
}

impl AluRegister {
    /// General purpose register `index` (0..=15).
    pub fn gpr(index: u8) -> Self {
        const GPRS: [AluRegister; 16] = [
            AluRegister::R0,
            AluRegister::R1,
            AluRegister::R2,
            AluRegister::R3,
            AluRegister::R4,
            AluRegister::R5,
            AluRegister::R6,
            AluRegister::R7,
            AluRegister::R8,
            AluRegister::R9,
            AluRegister::R10,
            AluRegister::R11,
            AluRegister::R12,
            AluRegister::R13,
            AluRegister::R14,
            AluRegister::R15,
        ];
        GPRS[index as usize]
    }
}

/// Semaphore comparison, read as "semaphore memory value `op` inline data".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompareOperation {
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
    Equal,
    NotEqual,
}

impl CompareOperation {
    pub const ALL: [CompareOperation; 6] = [
        Self::GreaterThan,
        Self::GreaterOrEqual,
        Self::LessThan,
        Self::LessOrEqual,
        Self::Equal,
        Self::NotEqual,
    ];

    pub const fn index(self) -> usize {
        match self {
            Self::GreaterThan => 0,
            Self::GreaterOrEqual => 1,
            Self::LessThan => 2,
            Self::LessOrEqual => 3,
            Self::Equal => 4,
            Self::NotEqual => 5,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WaitMode {
    /// Wait for a semaphore signal before re-evaluating.
    Signal,
    /// Poll the semaphore address continuously.
    Polling,
}

/// L1 cache policy for stateless accesses (`L1_CACHE_POLICY`).
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CachePolicy {
    WriteBackPartial = 0,
    Uncached = 1,
    WriteBack = 2,
    WriteThrough = 3,
    Streaming = 4,
}

impl CachePolicy {
    pub const fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(Self::WriteBackPartial),
            1 => Some(Self::Uncached),
            2 => Some(Self::WriteBack),
            3 => Some(Self::WriteThrough),
            4 => Some(Self::Streaming),
            _ => None,
        }
    }
}
