//! Append-only GPU command buffers.
//!
//! A [`CommandStream`] is a bounds-checked cursor over one [`Segment`] of command memory. When a
//! [`SegmentProvider`] is attached (normally a [`CommandContainer`]), a reservation that would
//! run into the segment's reserved tail closes the segment and transparently continues in a
//! fresh one. Without a provider, overflowing the segment is a programming error and panics.

pub mod alloc;
pub mod container;
pub mod error;
pub mod segment;
pub mod stream;

pub use alloc::{HostSegmentAllocator, SegmentAllocator};
pub use container::{CommandContainer, NoopCloser, RetiredSegment, SegmentCloser};
pub use error::{AllocError, ChainError, StreamError};
pub use segment::{CmdLocation, Segment, SegmentId};
pub use stream::{ChainRequest, CommandStream, Reservation, SegmentProvider};
