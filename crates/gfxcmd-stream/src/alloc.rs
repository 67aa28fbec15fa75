use crate::error::AllocError;
use crate::segment::Segment;

/// Source of backing memory for new command buffer segments.
pub trait SegmentAllocator {
    fn allocate(&mut self, capacity: usize) -> Result<Segment, AllocError>;
}

pub const PAGE_SIZE: u64 = 0x1000;

/// GPU virtual address the first host segment is placed at.
pub const DEFAULT_GPU_BASE: u64 = 0x0000_0001_0000_0000;

/// Host-memory segments at synthetic, page-aligned GPU addresses, limited by a byte budget.
#[derive(Debug, Clone)]
pub struct HostSegmentAllocator {
    next_gpu_address: u64,
    remaining: usize,
}

impl HostSegmentAllocator {
    pub fn new(budget: usize) -> Self {
        Self::with_gpu_base(DEFAULT_GPU_BASE, budget)
    }

    pub fn with_gpu_base(gpu_base: u64, budget: usize) -> Self {
        assert!(
            gpu_base % PAGE_SIZE == 0,
            "gpu base {gpu_base:#x} is not page aligned"
        );
        Self {
            next_gpu_address: gpu_base,
            remaining: budget,
        }
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }
}

impl SegmentAllocator for HostSegmentAllocator {
    fn allocate(&mut self, capacity: usize) -> Result<Segment, AllocError> {
        if capacity > self.remaining {
            return Err(AllocError::OutOfMemory {
                requested: capacity,
                remaining: self.remaining,
            });
        }
        self.remaining -= capacity;

        let gpu = self.next_gpu_address;
        self.next_gpu_address += (capacity as u64).next_multiple_of(PAGE_SIZE).max(PAGE_SIZE);
        Ok(Segment::zeroed(capacity, Some(gpu)))
    }
}
