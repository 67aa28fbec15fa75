use gfxcmd_stream::{AllocError, StreamError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SwTagsError {
    #[error("failed to allocate tag heap: {0}")]
    Alloc(#[from] AllocError),
    #[error(transparent)]
    Stream(#[from] StreamError),
    #[error("failed to encode or parse the layout document: {0}")]
    Layout(#[from] serde_json::Error),
    #[error("heap magic mismatch: expected {expected:#010x}, found {found:#010x}")]
    BadMagic { expected: u32, found: u32 },
    #[error("heap snapshot too short: need {needed} bytes at offset {offset}, have {len}")]
    Truncated {
        offset: usize,
        needed: usize,
        len: usize,
    },
    #[error("tag at offset {offset} has opcode {found}, marker says {expected}")]
    OpcodeMismatch {
        offset: usize,
        expected: u8,
        found: u8,
    },
    #[error("unknown tag opcode {0}")]
    UnknownOpcode(u8),
}
