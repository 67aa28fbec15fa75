//! Owner of the descriptor and tag heaps, and the entry point for inserting tags.

use core::sync::atomic::{AtomicU32, Ordering};

use gfxcmd_encode::misc::build_noop;
use gfxcmd_encode::{encode_store_data_imm, DebugOverrides};
use gfxcmd_hw::HwProfile;
use gfxcmd_stream::CommandStream;
use tracing::{debug, trace, warn};

use crate::error::SwTagsError;
use crate::heap::{transfer_to_heap, GpuHeap, HeapAllocator, HeapHeader};
use crate::layout::{LayoutDocument, LAYOUT_VERSION};
use crate::marker::{marker_noop_id, offset_noop_id, MAX_OFFSET_DWORDS};
use crate::tags::{
    CallNameBeginTag, CallNameEndTag, KernelNameTag, PipeControlReasonTag, SwTag, COMPONENT_ID,
};

pub const DESCRIPTOR_HEAP_MAGIC: u32 = 0xDEB0_6D0C;
pub const TAG_HEAP_MAGIC: u32 = 0xDEB0_6DD1;

pub const MAX_TAG_COUNT: u32 = 200;
pub const DEFAULT_TAG_HEAP_SIZE: usize = 64 * 1024;
/// Largest tag heap whose offsets still fit the offset marker.
pub const MAX_TAG_HEAP_SIZE: usize = 4 * MAX_OFFSET_DWORDS;

static CALL_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Allocate the next process-wide call id. Ids start at 1.
pub fn next_call_id() -> u32 {
    CALL_COUNTER.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
}

/// The most recently allocated call id, or 0 if none has been allocated.
pub fn current_call_id() -> u32 {
    CALL_COUNTER.load(Ordering::Relaxed)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwTagsConfig {
    pub max_tag_count: u32,
    /// Total tag heap size in bytes, header included.
    pub tag_heap_size: usize,
}

impl Default for SwTagsConfig {
    fn default() -> Self {
        Self {
            max_tag_count: MAX_TAG_COUNT,
            tag_heap_size: DEFAULT_TAG_HEAP_SIZE,
        }
    }
}

impl SwTagsConfig {
    /// Apply the `GFXCMD_SW_TAGS_*` overrides. An unusable heap size is adjusted to the nearest
    /// valid one and logged rather than rejected.
    pub fn from_overrides(overrides: &DebugOverrides) -> Self {
        let defaults = Self::default();
        Self {
            max_tag_count: overrides.sw_tags_max_count.unwrap_or(defaults.max_tag_count),
            tag_heap_size: overrides
                .sw_tags_heap_size
                .map_or(defaults.tag_heap_size, usable_heap_size),
        }
    }
}

fn usable_heap_size(requested: usize) -> usize {
    let size = (requested & !3).clamp(HeapHeader::SIZE_BYTES, MAX_TAG_HEAP_SIZE);
    if size != requested {
        warn!(requested, size, "adjusted software tag heap size override");
    }
    size
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagOutcome {
    /// The payload was written at `offset` in the tag heap and both markers were emitted.
    Inserted { offset: usize },
    /// The ring is saturated; nothing was written.
    Dropped,
}

struct Heaps<H> {
    descriptor: H,
    tags: H,
    next_offset: usize,
    tag_count: u32,
    saturation_logged: bool,
}

/// Software tag manager.
///
/// `initialize` allocates both heaps and writes their headers; tags may only be inserted between
/// `initialize` and `shutdown`. Once the configured tag count or the tag heap is exhausted,
/// further insertions are dropped without touching the heap or the stream.
pub struct SwTagsManager<A: HeapAllocator> {
    allocator: A,
    profile: &'static HwProfile,
    config: SwTagsConfig,
    heaps: Option<Heaps<A::Heap>>,
}

impl<A: HeapAllocator> SwTagsManager<A> {
    pub fn new(allocator: A, profile: &'static HwProfile, config: SwTagsConfig) -> Self {
        assert!(
            config.tag_heap_size >= HeapHeader::SIZE_BYTES && config.tag_heap_size % 4 == 0,
            "tag heap size {} must be a dword multiple of at least {} bytes",
            config.tag_heap_size,
            HeapHeader::SIZE_BYTES
        );
        assert!(
            config.tag_heap_size <= MAX_TAG_HEAP_SIZE,
            "tag heap size {} is not addressable by the offset marker",
            config.tag_heap_size
        );
        Self {
            allocator,
            profile,
            config,
            heaps: None,
        }
    }

    /// Build a manager only when `GFXCMD_ENABLE_SW_TAGS` asked for one.
    pub fn from_overrides(
        allocator: A,
        profile: &'static HwProfile,
        overrides: &DebugOverrides,
    ) -> Option<Self> {
        if !overrides.enable_sw_tags {
            return None;
        }
        Some(Self::new(allocator, profile, SwTagsConfig::from_overrides(overrides)))
    }

    pub fn config(&self) -> SwTagsConfig {
        self.config
    }

    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    pub fn is_initialized(&self) -> bool {
        self.heaps.is_some()
    }

    pub fn initialize(&mut self) -> Result<(), SwTagsError> {
        assert!(self.heaps.is_none(), "tag manager initialized twice");

        let document = serde_json::to_vec(&LayoutDocument::current())?;
        let descriptor_size = (HeapHeader::SIZE_BYTES + document.len()).next_multiple_of(4);

        let mut descriptor = self.allocator.allocate(descriptor_size)?;
        let mut tags = match self.allocator.allocate(self.config.tag_heap_size) {
            Ok(heap) => heap,
            Err(err) => {
                self.allocator.free(descriptor);
                return Err(err.into());
            }
        };

        let descriptor_header = HeapHeader {
            magic: DESCRIPTOR_HEAP_MAGIC,
            component: COMPONENT_ID,
            version: LAYOUT_VERSION,
            payload_size: document.len() as u32,
            reserved: 0,
        };
        transfer_to_heap(&mut descriptor, 0, bytemuck::bytes_of(&descriptor_header));
        transfer_to_heap(&mut descriptor, HeapHeader::SIZE_BYTES, &document);

        let tag_header = HeapHeader {
            magic: TAG_HEAP_MAGIC,
            component: COMPONENT_ID,
            version: LAYOUT_VERSION,
            payload_size: (tags.len() - HeapHeader::SIZE_BYTES) as u32,
            reserved: 0,
        };
        transfer_to_heap(&mut tags, 0, bytemuck::bytes_of(&tag_header));

        debug!(
            descriptor_gpu_address = descriptor.gpu_address(),
            descriptor_size,
            tag_heap_gpu_address = tags.gpu_address(),
            tag_heap_size = tags.len(),
            max_tag_count = self.config.max_tag_count,
            "software tag heaps allocated"
        );

        self.heaps = Some(Heaps {
            descriptor,
            tags,
            next_offset: HeapHeader::SIZE_BYTES,
            tag_count: 0,
            saturation_logged: false,
        });
        Ok(())
    }

    /// Free both heaps. A no-op when not initialized.
    pub fn shutdown(&mut self) {
        if let Some(heaps) = self.heaps.take() {
            debug!(tags_inserted = heaps.tag_count, "software tag heaps released");
            self.allocator.free(heaps.descriptor);
            self.allocator.free(heaps.tags);
        }
    }

    pub fn descriptor_heap(&self) -> Option<&A::Heap> {
        self.heaps.as_ref().map(|h| &h.descriptor)
    }

    pub fn tag_heap(&self) -> Option<&A::Heap> {
        self.heaps.as_ref().map(|h| &h.tags)
    }

    /// Tags successfully inserted since `initialize`.
    pub fn tag_count(&self) -> u32 {
        self.heaps.as_ref().map_or(0, |h| h.tag_count)
    }

    /// Byte offset in the tag heap where the next payload goes.
    pub fn heap_offset(&self) -> usize {
        self.heaps.as_ref().map_or(0, |h| h.next_offset)
    }

    /// Bytes of command stream taken by the two markers of one tag.
    pub fn markers_size(&self) -> usize {
        2 * self.profile.noop.size_bytes()
    }

    pub fn heap_addresses_size(&self) -> usize {
        2 * self.profile.store_data_imm.size_bytes()
    }

    /// Write `tag` into the tag heap and emit its marker and offset no-ops.
    ///
    /// Panics if the manager is not initialized.
    pub fn insert_tag<T: SwTag>(
        &mut self,
        stream: &mut CommandStream<'_>,
        tag: &T,
    ) -> Result<TagOutcome, SwTagsError> {
        let Some(heaps) = self.heaps.as_mut() else {
            panic!("software tag inserted while the tag manager is uninitialized");
        };

        let size = T::size_bytes();
        if heaps.tag_count >= self.config.max_tag_count
            || heaps.next_offset + size > heaps.tags.len()
        {
            if !heaps.saturation_logged {
                heaps.saturation_logged = true;
                warn!(
                    tag_count = heaps.tag_count,
                    heap_offset = heaps.next_offset,
                    heap_size = heaps.tags.len(),
                    "software tag ring saturated, dropping further tags"
                );
            }
            return Ok(TagOutcome::Dropped);
        }

        let offset = heaps.next_offset;
        let mut markers = build_noop(self.profile, marker_noop_id(T::OPCODE, tag.call_id()), true);
        markers.extend(&build_noop(self.profile, offset_noop_id(offset), false));

        // Reserve before committing anything: a failed chain must leave the ring untouched.
        let reservation = stream.reserve(markers.len_bytes())?;
        transfer_to_heap(&mut heaps.tags, offset, bytemuck::bytes_of(tag));
        heaps.next_offset += size;
        heaps.tag_count += 1;
        markers.write_le(reservation.bytes);

        trace!(
            opcode = T::OPCODE.name(),
            call_id = tag.call_id(),
            offset,
            "software tag inserted"
        );
        Ok(TagOutcome::Inserted { offset })
    }

    /// Emit two store-data-immediate commands stamping each heap's magic at its GPU address, so
    /// a trace of the command stream names both heaps.
    pub fn insert_heap_addresses(&self, stream: &mut CommandStream<'_>) -> Result<(), SwTagsError> {
        let Some(heaps) = self.heaps.as_ref() else {
            panic!("heap addresses inserted while the tag manager is uninitialized");
        };
        encode_store_data_imm(
            stream,
            self.profile,
            heaps.descriptor.gpu_address(),
            DESCRIPTOR_HEAP_MAGIC,
        )?;
        encode_store_data_imm(stream, self.profile, heaps.tags.gpu_address(), TAG_HEAP_MAGIC)?;
        Ok(())
    }

    /// Open a traced call: allocate a call id and insert its begin tag.
    ///
    /// The id is allocated even if the tag is dropped, so `end_call` can still be paired.
    pub fn begin_call(
        &mut self,
        stream: &mut CommandStream<'_>,
        call_name: &str,
    ) -> Result<u32, SwTagsError> {
        let call_id = next_call_id();
        self.insert_tag(stream, &CallNameBeginTag::new(call_name, call_id))?;
        Ok(call_id)
    }

    pub fn end_call(
        &mut self,
        stream: &mut CommandStream<'_>,
        call_name: &str,
        call_id: u32,
    ) -> Result<TagOutcome, SwTagsError> {
        self.insert_tag(stream, &CallNameEndTag::new(call_name, call_id))
    }

    /// Name the kernel dispatched by the current call.
    pub fn insert_kernel_name(
        &mut self,
        stream: &mut CommandStream<'_>,
        kernel_name: &str,
    ) -> Result<TagOutcome, SwTagsError> {
        self.insert_tag(stream, &KernelNameTag::new(kernel_name, current_call_id()))
    }

    pub fn insert_pipe_control_reason(
        &mut self,
        stream: &mut CommandStream<'_>,
        reason: &str,
    ) -> Result<TagOutcome, SwTagsError> {
        self.insert_tag(stream, &PipeControlReasonTag::new(reason, current_call_id()))
    }
}

impl<A: HeapAllocator> Drop for SwTagsManager<A> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<A: HeapAllocator> core::fmt::Debug for SwTagsManager<A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SwTagsManager")
            .field("generation", &self.profile.generation)
            .field("config", &self.config)
            .field("initialized", &self.is_initialized())
            .field("tag_count", &self.tag_count())
            .field("heap_offset", &self.heap_offset())
            .finish()
    }
}
