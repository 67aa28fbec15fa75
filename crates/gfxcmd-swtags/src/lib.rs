//! Software tags: a diagnostic side channel correlated with command stream order.
//!
//! A [`SwTagsManager`] owns two GPU heaps. The descriptor heap holds a JSON description of the
//! payload layouts; the tag heap holds the payloads themselves. Each inserted tag is written into
//! the tag heap from the CPU and then announced in the command stream by two `MI_NOOP`s, one
//! naming the tag kind and call, one giving the payload's heap offset. The GPU never writes
//! anything back, so an offline reader ([`decode`]) can pair markers with payloads from a
//! captured stream and heap snapshots alone.

pub mod decode;
pub mod error;
pub mod heap;
pub mod layout;
pub mod manager;
pub mod marker;
pub mod tags;

pub use decode::{
    decode_tag, read_descriptor, read_heap_header, scan_markers, DecodedTag, MarkerPair,
};
pub use error::SwTagsError;
pub use heap::{
    transfer_to_heap, GpuHeap, HeapAllocator, HeapHeader, HeapLock, HostHeap, HostHeapAllocator,
};
pub use layout::{FieldKind, FieldLayout, LayoutDocument, TagLayout};
pub use manager::{
    current_call_id, next_call_id, SwTagsConfig, SwTagsManager, TagOutcome, DESCRIPTOR_HEAP_MAGIC,
    TAG_HEAP_MAGIC,
};
pub use tags::{
    CallNameBeginTag, CallNameEndTag, KernelNameTag, OpCode, PipeControlReasonTag, SwTag,
};
