//! Fixed-layout tag payloads written into the tag heap.
//!
//! Every payload starts with a [`TagHeader`] and is a whole number of dwords, so the offset
//! no-op can address it in dwords.

use bytemuck::{Pod, Zeroable};

pub const KERNEL_NAME_LEN: usize = 64;
pub const REASON_LEN: usize = 32;
pub const CALL_NAME_LEN: usize = 32;

/// Component id stamped into every tag and heap header.
pub const COMPONENT_ID: u16 = 1;

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpCode {
    KernelName = 1,
    PipeControlReason = 2,
    CallNameBegin = 3,
    CallNameEnd = 4,
}

impl OpCode {
    pub const ALL: [OpCode; 4] = [
        Self::KernelName,
        Self::PipeControlReason,
        Self::CallNameBegin,
        Self::CallNameEnd,
    ];

    pub fn from_u8(v: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|op| *op as u8 == v)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::KernelName => "KernelName",
            Self::PipeControlReason => "PipeControlReason",
            Self::CallNameBegin => "CallNameBegin",
            Self::CallNameEnd => "CallNameEnd",
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct TagHeader {
    pub opcode: u8,
    pub reserved: u8,
    pub component: u16,
    /// Payload size including this header.
    pub dword_count: u32,
}

impl TagHeader {
    fn for_tag<T: SwTag>() -> Self {
        Self {
            opcode: T::OPCODE as u8,
            reserved: 0,
            component: COMPONENT_ID,
            dword_count: (core::mem::size_of::<T>() / 4) as u32,
        }
    }
}

/// A payload kind the tag manager can insert.
pub trait SwTag: Pod {
    const OPCODE: OpCode;

    fn call_id(&self) -> u32;

    fn size_bytes() -> usize {
        core::mem::size_of::<Self>()
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct KernelNameTag {
    pub header: TagHeader,
    pub call_id: u32,
    pub kernel_name: [u8; KERNEL_NAME_LEN],
}

impl KernelNameTag {
    pub fn new(kernel_name: &str, call_id: u32) -> Self {
        Self {
            header: TagHeader::for_tag::<Self>(),
            call_id,
            kernel_name: fixed_str(kernel_name),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct PipeControlReasonTag {
    pub header: TagHeader,
    pub call_id: u32,
    pub reason: [u8; REASON_LEN],
}

impl PipeControlReasonTag {
    pub fn new(reason: &str, call_id: u32) -> Self {
        Self {
            header: TagHeader::for_tag::<Self>(),
            call_id,
            reason: fixed_str(reason),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct CallNameBeginTag {
    pub header: TagHeader,
    pub call_id: u32,
    pub call_name: [u8; CALL_NAME_LEN],
}

impl CallNameBeginTag {
    pub fn new(call_name: &str, call_id: u32) -> Self {
        Self {
            header: TagHeader::for_tag::<Self>(),
            call_id,
            call_name: fixed_str(call_name),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct CallNameEndTag {
    pub header: TagHeader,
    pub call_id: u32,
    pub call_name: [u8; CALL_NAME_LEN],
}

impl CallNameEndTag {
    pub fn new(call_name: &str, call_id: u32) -> Self {
        Self {
            header: TagHeader::for_tag::<Self>(),
            call_id,
            call_name: fixed_str(call_name),
        }
    }
}

macro_rules! impl_sw_tag {
    ($($ty:ty => $op:expr),* $(,)?) => {
        $(
            impl SwTag for $ty {
                const OPCODE: OpCode = $op;

                fn call_id(&self) -> u32 {
                    self.call_id
                }
            }

            const _: () = assert!(core::mem::size_of::<$ty>() % 4 == 0);
        )*
    };
}

impl_sw_tag!(
    KernelNameTag => OpCode::KernelName,
    PipeControlReasonTag => OpCode::PipeControlReason,
    CallNameBeginTag => OpCode::CallNameBegin,
    CallNameEndTag => OpCode::CallNameEnd,
);

/// Payload size in bytes for `opcode`.
pub fn payload_size(opcode: OpCode) -> usize {
    match opcode {
        OpCode::KernelName => KernelNameTag::size_bytes(),
        OpCode::PipeControlReason => PipeControlReasonTag::size_bytes(),
        OpCode::CallNameBegin => CallNameBeginTag::size_bytes(),
        OpCode::CallNameEnd => CallNameEndTag::size_bytes(),
    }
}

/// NUL-terminated copy of `s`, truncated to fit.
fn fixed_str<const N: usize>(s: &str) -> [u8; N] {
    let mut out = [0u8; N];
    let mut len = s.len().min(N - 1);
    while !s.is_char_boundary(len) {
        len -= 1;
    }
    out[..len].copy_from_slice(&s.as_bytes()[..len]);
    out
}

/// Text up to the first NUL.
pub(crate) fn read_fixed_str(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}
