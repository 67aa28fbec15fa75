use thiserror::Error;

use crate::segment::CmdLocation;

/// Failure to obtain backing memory for a new segment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocError {
    #[error("out of command buffer memory: requested {requested} bytes, {remaining} remaining")]
    OutOfMemory { requested: usize, remaining: usize },
}

/// Failure to continue a stream in a fresh segment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error(transparent)]
    Alloc(#[from] AllocError),
    #[error("segment provider no longer accepts chaining requests")]
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    #[error("failed to chain command stream: {0}")]
    Chain(#[from] ChainError),
    #[error("command at {0:?} is not in a segment that can be patched")]
    StaleLocation(CmdLocation),
}
