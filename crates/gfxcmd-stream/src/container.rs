//! Segment chaining: a concrete [`SegmentProvider`] that retires full segments and keeps the
//! whole chain around for submission.

use tracing::{debug, trace};

use crate::alloc::SegmentAllocator;
use crate::error::ChainError;
use crate::segment::Segment;
use crate::stream::{ChainRequest, CommandStream, SegmentProvider};

/// Writes the command that ends a segment into its reserved tail.
pub trait SegmentCloser {
    /// Bytes the closing command occupies. Streams opened by a container keep this much free.
    fn tail_size(&self) -> usize;

    /// Fill `tail` (exactly [`SegmentCloser::tail_size`] bytes). `next_gpu_address` is the
    /// segment execution continues in, or `None` when this is the last segment of the chain.
    fn close(&self, tail: &mut [u8], next_gpu_address: Option<u64>);
}

/// Closer that zero-fills the tail, i.e. pads with no-op commands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NoopCloser {
    pub tail_size: usize,
}

impl NoopCloser {
    pub const fn new(tail_size: usize) -> Self {
        Self { tail_size }
    }
}

impl SegmentCloser for NoopCloser {
    fn tail_size(&self) -> usize {
        self.tail_size
    }

    fn close(&self, tail: &mut [u8], _next_gpu_address: Option<u64>) {
        tail.fill(0);
    }
}

/// A segment that is no longer being written, with its final byte count (closing command
/// included).
#[derive(Debug)]
pub struct RetiredSegment {
    pub segment: Segment,
    pub used: usize,
}

impl RetiredSegment {
    pub fn bytes(&self) -> &[u8] {
        &self.segment.bytes()[..self.used]
    }
}

pub struct CommandContainer<A, C> {
    allocator: A,
    closer: C,
    segment_size: usize,
    retired: Vec<RetiredSegment>,
    chains: usize,
}

impl<A: SegmentAllocator, C: SegmentCloser> CommandContainer<A, C> {
    pub fn new(allocator: A, closer: C, segment_size: usize) -> Self {
        assert!(
            closer.tail_size() <= segment_size,
            "segment size {segment_size} cannot hold a {}-byte closing command",
            closer.tail_size()
        );
        Self {
            allocator,
            closer,
            segment_size,
            retired: Vec::new(),
            chains: 0,
        }
    }

    pub fn segment_size(&self) -> usize {
        self.segment_size
    }

    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    pub fn closer(&self) -> &C {
        &self.closer
    }

    /// Number of times a stream continued into a new segment.
    pub fn chain_count(&self) -> usize {
        self.chains
    }

    /// Allocate a first segment and start a stream that chains through this container.
    pub fn open_stream(&mut self) -> Result<CommandStream<'_>, ChainError> {
        let segment = self.allocator.allocate(self.segment_size)?;
        let tail = self.closer.tail_size();
        Ok(CommandStream::with_provider(segment, tail, self))
    }

    /// Close the last segment of a finished stream (see [`CommandStream::finish`]).
    pub fn close_final(&mut self, mut segment: Segment, used: usize) {
        let end = used + self.closer.tail_size();
        self.closer.close(&mut segment.bytes_mut()[used..end], None);
        trace!(segment = segment.id().0, used = end, "closed final segment");
        self.retired.push(RetiredSegment { segment, used: end });
    }

    /// All closed segments in execution order.
    pub fn segments(&self) -> &[RetiredSegment] {
        &self.retired
    }

    pub fn into_segments(self) -> Vec<RetiredSegment> {
        self.retired
    }
}

impl<A: SegmentAllocator, C: SegmentCloser> SegmentProvider for CommandContainer<A, C> {
    fn obtain_next_segment(
        &mut self,
        current: &mut Segment,
        request: ChainRequest,
    ) -> Result<(), ChainError> {
        let tail = self.closer.tail_size();
        assert!(
            tail <= request.tail_margin,
            "stream reserves {} tail bytes, closing command needs {tail}",
            request.tail_margin
        );

        let next = self
            .allocator
            .allocate(self.segment_size.max(request.min_capacity))?;
        let end = request.used + tail;
        self.closer
            .close(&mut current.bytes_mut()[request.used..end], next.gpu_base());

        let retired = core::mem::replace(current, next);
        debug!(
            segment = retired.id().0,
            used = end,
            next_gpu_address = ?current.gpu_base(),
            "retired command buffer segment"
        );
        self.retired.push(RetiredSegment {
            segment: retired,
            used: end,
        });
        self.chains += 1;
        Ok(())
    }
}
