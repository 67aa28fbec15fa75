use core::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_SEGMENT_ID: AtomicU32 = AtomicU32::new(1);

/// Process-unique identity of one command buffer segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentId(pub u32);

/// One physical command buffer: CPU-visible bytes plus the GPU virtual address they are mapped
/// at (absent until the memory is bound).
///
/// The memory itself belongs to whoever allocated it; a [`crate::CommandStream`] only borrows
/// it for the duration of recording and hands it back through
/// [`crate::CommandStream::finish`] or [`crate::CommandStream::replace_buffer`].
pub struct Segment {
    id: SegmentId,
    bytes: Box<[u8]>,
    gpu_base: Option<u64>,
}

impl Segment {
    pub fn new(bytes: impl Into<Box<[u8]>>, gpu_base: Option<u64>) -> Self {
        Self {
            id: SegmentId(NEXT_SEGMENT_ID.fetch_add(1, Ordering::Relaxed)),
            bytes: bytes.into(),
            gpu_base,
        }
    }

    /// A zero-filled segment of `capacity` bytes.
    pub fn zeroed(capacity: usize, gpu_base: Option<u64>) -> Self {
        Self::new(vec![0u8; capacity], gpu_base)
    }

    pub fn id(&self) -> SegmentId {
        self.id
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    pub fn gpu_base(&self) -> Option<u64> {
        self.gpu_base
    }

    pub fn set_gpu_base(&mut self, gpu_base: Option<u64>) {
        self.gpu_base = gpu_base;
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    pub fn into_bytes(self) -> Box<[u8]> {
        self.bytes
    }
}

impl fmt::Debug for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Segment")
            .field("id", &self.id)
            .field("capacity", &self.bytes.len())
            .field("gpu_base", &self.gpu_base.map(|a| format!("{a:#x}")))
            .finish()
    }
}

/// Where an already-emitted command lives, so it can be referenced or patched later.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CmdLocation {
    pub segment: SegmentId,
    pub offset: usize,
    pub len_bytes: usize,
    pub gpu_address: Option<u64>,
}
