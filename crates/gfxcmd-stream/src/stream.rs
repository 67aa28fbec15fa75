//! Bounded, append-only command cursor over one [`Segment`] at a time.

use gfxcmd_hw::CmdDwords;
use tracing::debug;

use crate::error::{ChainError, StreamError};
use crate::segment::{CmdLocation, Segment, SegmentId};

/// What a [`SegmentProvider`] needs to know to retire the current segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainRequest {
    /// Bytes already written to the segment being retired.
    pub used: usize,
    /// Bytes reserved after `used` for the closing command.
    pub tail_margin: usize,
    /// Smallest capacity the replacement must have: the pending reservation plus the margin.
    pub min_capacity: usize,
}

/// Capability to continue a full stream in fresh memory.
pub trait SegmentProvider {
    /// Close `current` by writing into its reserved tail, then replace it in place with a fresh
    /// segment of at least `request.min_capacity` bytes.
    ///
    /// On error `current` must be left untouched.
    fn obtain_next_segment(
        &mut self,
        current: &mut Segment,
        request: ChainRequest,
    ) -> Result<(), ChainError>;
}

/// A writable region handed out by [`CommandStream::reserve`].
#[derive(Debug)]
pub struct Reservation<'a> {
    pub segment: SegmentId,
    pub offset: usize,
    pub gpu_address: Option<u64>,
    pub bytes: &'a mut [u8],
}

impl Reservation<'_> {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn location(&self) -> CmdLocation {
        CmdLocation {
            segment: self.segment,
            offset: self.offset,
            len_bytes: self.bytes.len(),
            gpu_address: self.gpu_address,
        }
    }
}

/// Append-only command buffer cursor.
///
/// `used` never exceeds the segment capacity. With a provider attached, every reservation also
/// keeps `tail_margin` bytes free at the end of the segment for the command that closes it;
/// a reservation that would eat into the margin retires the segment and continues in a new one.
/// Without a provider, running out of space is a programming error and panics.
///
/// A stream is not `Clone`: two cursors over one segment would hand out overlapping regions.
pub struct CommandStream<'p> {
    segment: Segment,
    used: usize,
    tail_margin: usize,
    provider: Option<&'p mut dyn SegmentProvider>,
}

impl CommandStream<'static> {
    /// A standalone stream with no chaining capability.
    pub fn new(segment: Segment, tail_margin: usize) -> Self {
        Self::build(segment, tail_margin, None)
    }
}

impl<'p> CommandStream<'p> {
    pub fn with_provider(
        segment: Segment,
        tail_margin: usize,
        provider: &'p mut dyn SegmentProvider,
    ) -> Self {
        Self::build(segment, tail_margin, Some(provider))
    }

    fn build(
        segment: Segment,
        tail_margin: usize,
        provider: Option<&'p mut dyn SegmentProvider>,
    ) -> Self {
        assert!(
            tail_margin <= segment.capacity(),
            "tail margin {tail_margin} exceeds segment capacity {}",
            segment.capacity()
        );
        Self {
            segment,
            used: 0,
            tail_margin,
            provider,
        }
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn capacity(&self) -> usize {
        self.segment.capacity()
    }

    /// Bytes left before the end of the segment, ignoring the tail margin.
    pub fn available(&self) -> usize {
        self.segment.capacity() - self.used
    }

    pub fn tail_margin(&self) -> usize {
        self.tail_margin
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    pub fn segment(&self) -> &Segment {
        &self.segment
    }

    /// Bytes emitted into the current segment so far.
    pub fn written(&self) -> &[u8] {
        &self.segment.bytes()[..self.used]
    }

    /// GPU address at which the next reserved byte will live, once the segment is bound.
    pub fn current_gpu_address(&self) -> Option<u64> {
        self.segment.gpu_base().map(|base| base + self.used as u64)
    }

    /// Reserve exactly `size` contiguous bytes at the write cursor.
    ///
    /// `reserve(0)` returns the cursor without advancing it and never chains.
    pub fn reserve(&mut self, size: usize) -> Result<Reservation<'_>, StreamError> {
        if size > 0 {
            self.ensure_space(size)?;
        }

        let offset = self.used;
        self.used += size;
        let gpu_address = self.segment.gpu_base().map(|base| base + offset as u64);
        let segment = self.segment.id();
        Ok(Reservation {
            segment,
            offset,
            gpu_address,
            bytes: &mut self.segment.bytes_mut()[offset..offset + size],
        })
    }

    fn ensure_space(&mut self, size: usize) -> Result<(), StreamError> {
        let capacity = self.segment.capacity();
        let Some(provider) = self.provider.as_deref_mut() else {
            assert!(
                self.used + size <= capacity,
                "command stream overflow: {} used + {size} requested > {capacity} capacity",
                self.used,
            );
            return Ok(());
        };

        if capacity - self.used >= self.tail_margin + size {
            return Ok(());
        }

        let request = ChainRequest {
            used: self.used,
            tail_margin: self.tail_margin,
            min_capacity: self.tail_margin + size,
        };
        let retired = self.segment.id();
        provider.obtain_next_segment(&mut self.segment, request)?;
        assert_ne!(
            self.segment.id(),
            retired,
            "segment provider did not replace the full segment"
        );
        assert!(
            self.segment.capacity() >= request.min_capacity,
            "segment provider returned {} bytes, {} required",
            self.segment.capacity(),
            request.min_capacity
        );
        debug!(
            retired = retired.0,
            next = self.segment.id().0,
            retired_used = request.used,
            requested = size,
            "command stream chained to new segment"
        );
        self.used = 0;
        Ok(())
    }

    /// Reserve space for `cmd` and copy it in as one block.
    pub fn reserve_cmd(&mut self, cmd: &CmdDwords) -> Result<CmdLocation, StreamError> {
        let reservation = self.reserve(cmd.len_bytes())?;
        cmd.write_le(reservation.bytes);
        Ok(reservation.location())
    }

    /// Read back a command emitted into the current segment.
    pub fn read_dwords(&self, location: CmdLocation) -> Result<CmdDwords, StreamError> {
        let range = self.patchable_range(location)?;
        Ok(CmdDwords::from_le_bytes(&self.segment.bytes()[range]))
    }

    /// Overwrite a command emitted into the current segment.
    ///
    /// Commands in retired segments are out of reach and yield [`StreamError::StaleLocation`].
    pub fn patch_dwords(
        &mut self,
        location: CmdLocation,
        cmd: &CmdDwords,
    ) -> Result<(), StreamError> {
        let range = self.patchable_range(location)?;
        assert_eq!(
            cmd.len_bytes(),
            location.len_bytes,
            "patched command must keep its size"
        );
        cmd.write_le(&mut self.segment.bytes_mut()[range]);
        Ok(())
    }

    fn patchable_range(
        &self,
        location: CmdLocation,
    ) -> Result<core::ops::Range<usize>, StreamError> {
        let end = location.offset + location.len_bytes;
        if location.segment != self.segment.id() || end > self.used {
            return Err(StreamError::StaleLocation(location));
        }
        Ok(location.offset..end)
    }

    /// Pad with zero bytes (no-op commands) until `used` is a multiple of `alignment`.
    pub fn align_to(&mut self, alignment: usize) -> Result<(), StreamError> {
        assert!(alignment.is_power_of_two(), "alignment must be a power of two");
        let pad = self.used.next_multiple_of(alignment) - self.used;
        if pad > 0 {
            self.reserve(pad)?.bytes.fill(0);
        }
        Ok(())
    }

    /// Swap in new backing memory for a recycled stream and return the old segment.
    pub fn replace_buffer(&mut self, segment: Segment) -> Segment {
        assert!(
            self.tail_margin <= segment.capacity(),
            "tail margin {} exceeds segment capacity {}",
            self.tail_margin,
            segment.capacity()
        );
        self.used = 0;
        core::mem::replace(&mut self.segment, segment)
    }

    /// Rebind the current memory at a different GPU address and start over.
    pub fn replace_graphics_allocation(&mut self, gpu_base: Option<u64>) {
        self.segment.set_gpu_base(gpu_base);
        self.used = 0;
    }

    /// Stop recording and hand back the current segment with its used byte count.
    pub fn finish(self) -> (Segment, usize) {
        (self.segment, self.used)
    }
}

impl core::fmt::Debug for CommandStream<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CommandStream")
            .field("segment", &self.segment)
            .field("used", &self.used)
            .field("tail_margin", &self.tail_margin)
            .field("has_provider", &self.provider.is_some())
            .finish()
    }
}
