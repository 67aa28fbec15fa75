//! GPU-resident heaps and the scoped CPU write discipline used to fill them.

use bytemuck::{Pod, Zeroable};
use gfxcmd_stream::AllocError;

/// Header at offset zero of both tag manager heaps.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct HeapHeader {
    pub magic: u32,
    pub component: u16,
    pub version: u16,
    /// Bytes of content following the header.
    pub payload_size: u32,
    pub reserved: u32,
}

impl HeapHeader {
    pub const SIZE_BYTES: usize = core::mem::size_of::<Self>();
}

/// A GPU allocation whose memory can be mapped for CPU writes.
///
/// The mapping only exists between [`GpuHeap::lock`] and [`GpuHeap::unlock`]; use
/// [`HeapLock`] rather than calling these directly.
pub trait GpuHeap {
    fn gpu_address(&self) -> u64;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&mut self);

    fn unlock(&mut self);

    /// CPU view of the allocation. Only valid while locked.
    fn mapped_mut(&mut self) -> &mut [u8];
}

pub trait HeapAllocator {
    type Heap: GpuHeap;

    fn allocate(&mut self, size: usize) -> Result<Self::Heap, AllocError>;

    fn free(&mut self, heap: Self::Heap);
}

/// Keeps a heap locked for CPU access until dropped.
pub struct HeapLock<'a, H: GpuHeap> {
    heap: &'a mut H,
}

impl<'a, H: GpuHeap> HeapLock<'a, H> {
    pub fn new(heap: &'a mut H) -> Self {
        heap.lock();
        Self { heap }
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        self.heap.mapped_mut()
    }
}

impl<H: GpuHeap> Drop for HeapLock<'_, H> {
    fn drop(&mut self) {
        self.heap.unlock();
    }
}

/// Copy `data` into `heap` at `offset` under a lock.
///
/// Panics if the write would run past the end of the heap.
pub fn transfer_to_heap<H: GpuHeap>(heap: &mut H, offset: usize, data: &[u8]) {
    let end = offset + data.len();
    assert!(
        end <= heap.len(),
        "heap write {offset}..{end} exceeds heap of {} bytes",
        heap.len()
    );
    let mut lock = HeapLock::new(heap);
    lock.bytes_mut()[offset..end].copy_from_slice(data);
}

/// Heap backed by host memory.
#[derive(Debug)]
pub struct HostHeap {
    gpu_address: u64,
    bytes: Box<[u8]>,
    locked: bool,
    lock_count: u32,
}

impl HostHeap {
    pub fn new(gpu_address: u64, size: usize) -> Self {
        Self {
            gpu_address,
            bytes: vec![0; size].into_boxed_slice(),
            locked: false,
            lock_count: 0,
        }
    }

    /// What the GPU would read.
    pub fn contents(&self) -> &[u8] {
        &self.bytes
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Number of completed lock/unlock cycles.
    pub fn lock_count(&self) -> u32 {
        self.lock_count
    }
}

impl GpuHeap for HostHeap {
    fn gpu_address(&self) -> u64 {
        self.gpu_address
    }

    fn len(&self) -> usize {
        self.bytes.len()
    }

    fn lock(&mut self) {
        assert!(!self.locked, "heap at {:#x} is already locked", self.gpu_address);
        self.locked = true;
    }

    fn unlock(&mut self) {
        assert!(self.locked, "heap at {:#x} is not locked", self.gpu_address);
        self.locked = false;
        self.lock_count += 1;
    }

    fn mapped_mut(&mut self) -> &mut [u8] {
        assert!(self.locked, "heap at {:#x} written while unlocked", self.gpu_address);
        &mut self.bytes
    }
}

const HEAP_ALIGNMENT: u64 = 0x1_0000;

/// Hands out [`HostHeap`]s at synthetic 64 KiB-aligned GPU addresses.
#[derive(Debug)]
pub struct HostHeapAllocator {
    next_gpu_address: u64,
    remaining: usize,
    live: usize,
}

impl HostHeapAllocator {
    pub fn new(gpu_base: u64, budget: usize) -> Self {
        Self {
            next_gpu_address: gpu_base.next_multiple_of(HEAP_ALIGNMENT),
            remaining: budget,
            live: 0,
        }
    }

    /// Heaps allocated and not yet freed.
    pub fn live_heaps(&self) -> usize {
        self.live
    }
}

impl HeapAllocator for HostHeapAllocator {
    type Heap = HostHeap;

    fn allocate(&mut self, size: usize) -> Result<HostHeap, AllocError> {
        if size > self.remaining {
            return Err(AllocError::OutOfMemory {
                requested: size,
                remaining: self.remaining,
            });
        }
        self.remaining -= size;
        self.live += 1;

        let gpu_address = self.next_gpu_address;
        self.next_gpu_address += (size as u64).next_multiple_of(HEAP_ALIGNMENT).max(HEAP_ALIGNMENT);
        Ok(HostHeap::new(gpu_address, size))
    }

    fn free(&mut self, heap: HostHeap) {
        assert!(!heap.is_locked(), "freeing a locked heap");
        self.remaining += heap.len();
        self.live -= 1;
    }
}
