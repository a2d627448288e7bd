//! Per-frame transient allocator.
//!
//! A [`HostBuffer`] packs many small, short-lived writes (vertex data,
//! uniform blocks, instance data) into a handful of large blocks drawn from
//! an injected [`Allocator`]. Writes bump a cursor through the active block;
//! when a write doesn't fit, the buffer rolls over to the next block, reusing
//! one retained from an earlier frame when it can. Writes larger than a whole
//! block get a dedicated one-off buffer that never joins the block chain.
//!
//! Call [`HostBuffer::reset`] once per frame. Reset rewinds to block 0 and
//! drops any block that has not been written for more than
//! `frames_in_flight` frames, so the chain tracks the trailing peak demand
//! rather than the all-time peak.
//!
//! Not thread-safe by design: one host buffer per producing thread.

use super::allocator::{AllocationError, Allocator, BufferDescriptor, DeviceBuffer};
use super::buffer_view::BufferView;
use super::range::{checked_align_up, normalize_alignment, BufferRange};
use super::tracker::{events, UsageTracker};
use bytemuck::Pod;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Capacity of an ordinary block.
pub const DEFAULT_BLOCK_SIZE: usize = 1_024_000;

/// Frames a block may sit idle before [`HostBuffer::reset`] drops it.
pub const FRAMES_IN_FLIGHT: usize = 3;

/// Minimum offset alignment for uniform data (matches the common
/// `min_uniform_buffer_offset_alignment` of desktop GPUs).
pub const DEFAULT_UNIFORM_ALIGNMENT: usize = 256;

const BLOCK_LABEL: &str = "host buffer block";
const ONE_OFF_LABEL: &str = "host buffer one-off";

/// Tuning knobs for a [`HostBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostBufferConfig {
    pub block_size: usize,
    pub frames_in_flight: usize,
    pub uniform_alignment: usize,
}

impl Default for HostBufferConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            frames_in_flight: FRAMES_IN_FLIGHT,
            uniform_alignment: DEFAULT_UNIFORM_ALIGNMENT,
        }
    }
}

impl HostBufferConfig {
    pub fn validate(&self) -> Result<(), HostBufferError> {
        if self.block_size == 0 {
            return Err(HostBufferError::ZeroBlockSize);
        }
        if self.frames_in_flight == 0 {
            return Err(HostBufferError::ZeroFramesInFlight);
        }
        if !self.uniform_alignment.is_power_of_two() {
            return Err(HostBufferError::UniformAlignment(self.uniform_alignment));
        }
        Ok(())
    }
}

/// Errors raised while constructing a [`HostBuffer`].
///
/// Emplace never returns this: a failed emplace yields the null view.
#[derive(Debug, Error)]
pub enum HostBufferError {
    #[error("block size must be non-zero")]
    ZeroBlockSize,

    #[error("frames in flight must be at least 1")]
    ZeroFramesInFlight,

    #[error("uniform alignment {0} is not a power of two")]
    UniformAlignment(usize),

    #[error("failed to allocate the initial block: {0}")]
    Allocation(#[from] AllocationError),
}

/// Snapshot of the bookkeeping, for tests and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostBufferState {
    /// Index of the block receiving writes.
    pub current_block: usize,
    /// Position of the frame epoch inside the frames-in-flight window.
    pub current_frame: usize,
    pub total_block_count: usize,
}

struct Block {
    buffer: Arc<dyn DeviceBuffer>,
    cursor: usize,
    last_used_epoch: u64,
}

impl Block {
    fn new(buffer: Arc<dyn DeviceBuffer>, epoch: u64) -> Self {
        Self {
            buffer,
            cursor: 0,
            last_used_epoch: epoch,
        }
    }

    /// Aligned start offset for a `size` byte write, if it fits.
    fn fit(&self, size: usize, alignment: usize) -> Option<usize> {
        let offset = checked_align_up(self.cursor, alignment)?;
        let end = offset.checked_add(size)?;
        (end <= self.buffer.size()).then_some(offset)
    }
}

pub struct HostBuffer {
    allocator: Arc<dyn Allocator>,
    config: HostBufferConfig,
    blocks: Vec<Block>,
    current_block: usize,
    frame_epoch: u64,
    usage: UsageTracker,
}

impl HostBuffer {
    /// Create a host buffer with the default configuration.
    pub fn new(allocator: Arc<dyn Allocator>) -> Result<Self, HostBufferError> {
        Self::with_config(allocator, HostBufferConfig::default())
    }

    /// Create a host buffer, eagerly allocating block 0.
    pub fn with_config(
        allocator: Arc<dyn Allocator>,
        config: HostBufferConfig,
    ) -> Result<Self, HostBufferError> {
        config.validate()?;
        let first = create_buffer(
            allocator.as_ref(),
            BufferDescriptor::new(config.block_size, BLOCK_LABEL),
        )?;
        debug!(block_size = config.block_size, "host buffer created");

        Ok(Self {
            allocator,
            config,
            blocks: vec![Block::new(first, 0)],
            current_block: 0,
            frame_epoch: 0,
            usage: UsageTracker::new(config.frames_in_flight),
        })
    }

    pub fn config(&self) -> &HostBufferConfig {
        &self.config
    }

    pub fn allocator(&self) -> &Arc<dyn Allocator> {
        &self.allocator
    }

    /// Number of resets since construction.
    pub fn frame_epoch(&self) -> u64 {
        self.frame_epoch
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn usage(&self) -> &UsageTracker {
        &self.usage
    }

    pub fn state(&self) -> HostBufferState {
        HostBufferState {
            current_block: self.current_block,
            current_frame: (self.frame_epoch % self.config.frames_in_flight as u64) as usize,
            total_block_count: self.blocks.len(),
        }
    }

    /// Copy `value` in, aligned to its natural alignment.
    pub fn emplace<T: Pod>(&mut self, value: &T) -> BufferView {
        self.emplace_bytes(bytemuck::bytes_of(value), std::mem::align_of::<T>())
    }

    /// Copy a slice of values in, aligned to the element alignment.
    pub fn emplace_slice<T: Pod>(&mut self, values: &[T]) -> BufferView {
        self.emplace_bytes(bytemuck::cast_slice(values), std::mem::align_of::<T>())
    }

    /// Copy `value` in at an offset suitable for binding as a uniform block.
    pub fn emplace_uniform<T: Pod>(&mut self, value: &T) -> BufferView {
        let alignment = std::mem::align_of::<T>().max(self.config.uniform_alignment);
        self.emplace_bytes(bytemuck::bytes_of(value), alignment)
    }

    /// Copy `bytes` in at an offset that is a multiple of `alignment`.
    pub fn emplace_bytes(&mut self, bytes: &[u8], alignment: usize) -> BufferView {
        self.place(bytes.len(), alignment, Some(bytes))
            .unwrap_or_else(|_| BufferView::null())
    }

    /// Reserve `size` bytes without writing them.
    pub fn reserve(&mut self, size: usize, alignment: usize) -> BufferView {
        self.try_reserve(size, alignment)
            .unwrap_or_else(|_| BufferView::null())
    }

    /// Reserve `size` bytes and let `writer` fill them.
    ///
    /// `alignment` must be 0, 1 or a power of two. Returns the null view if
    /// a backing allocation was needed and the allocator refused it; the
    /// buffer's state is untouched in that case and `writer` is not called.
    ///
    /// `writer` fills a staging slice that is copied in afterwards, so it may
    /// read earlier views, including ones in the same block.
    pub fn emplace_with(
        &mut self,
        size: usize,
        alignment: usize,
        writer: impl FnOnce(&mut [u8]),
    ) -> BufferView {
        self.try_emplace_with(size, alignment, writer)
            .unwrap_or_else(|_| BufferView::null())
    }

    /// Like [`emplace_with`](Self::emplace_with), reporting why it failed.
    pub fn try_emplace_with(
        &mut self,
        size: usize,
        alignment: usize,
        writer: impl FnOnce(&mut [u8]),
    ) -> Result<BufferView, AllocationError> {
        let view = self.place(size, alignment, None)?;
        if let (Some(buffer), false) = (view.buffer(), view.range().is_empty()) {
            let mut staged = vec![0u8; size];
            writer(&mut staged);
            buffer.write(view.range(), &mut |dst: &mut [u8]| dst.copy_from_slice(&staged));
        }
        Ok(view)
    }

    /// Like [`reserve`](Self::reserve), reporting why it failed.
    pub fn try_reserve(
        &mut self,
        size: usize,
        alignment: usize,
    ) -> Result<BufferView, AllocationError> {
        self.place(size, alignment, None)
    }

    /// Advance to the next frame.
    ///
    /// Rewinds to block 0 and drops every other block whose last write is
    /// more than `frames_in_flight` epochs old. Block 0 is never dropped.
    pub fn reset(&mut self) {
        self.frame_epoch += 1;
        self.current_block = 0;
        self.blocks[0].cursor = 0;

        let epoch = self.frame_epoch;
        let window = self.config.frames_in_flight as u64;
        let before = self.blocks.len();
        let mut index = 0;
        self.blocks.retain(|block| {
            let keep = index == 0 || epoch - block.last_used_epoch <= window;
            index += 1;
            keep
        });

        let evicted = before - self.blocks.len();
        if evicted > 0 {
            debug!(evicted, remaining = self.blocks.len(), epoch, "evicted idle host buffer blocks");
        }
        for _ in 0..evicted {
            self.usage.record_event(events::BLOCK_EVICTED);
        }

        trace!(epoch, frame_bytes = self.usage.frame_bytes(), "host buffer reset");
        self.usage.end_frame();
    }

    fn place(
        &mut self,
        size: usize,
        alignment: usize,
        source: Option<&[u8]>,
    ) -> Result<BufferView, AllocationError> {
        let alignment = normalize_alignment(alignment);

        if size == 0 {
            let block = &self.blocks[self.current_block];
            return Ok(BufferView::new(
                block.buffer.clone(),
                BufferRange::new(block.cursor, 0),
            ));
        }

        if size > self.config.block_size {
            return self.place_one_off(size, source);
        }

        let offset = match self.blocks[self.current_block].fit(size, alignment) {
            Some(offset) => offset,
            None => {
                self.advance_block()?;
                0
            }
        };

        let epoch = self.frame_epoch;
        let block = &mut self.blocks[self.current_block];
        let range = BufferRange::new(offset, size);
        if let Some(source) = source {
            block.buffer.write(range, &mut |dst: &mut [u8]| dst.copy_from_slice(source));
        }
        block.cursor = range.end();
        block.last_used_epoch = epoch;
        self.usage.record_emplace(size);

        Ok(BufferView::new(block.buffer.clone(), range))
    }

    fn place_one_off(
        &mut self,
        size: usize,
        source: Option<&[u8]>,
    ) -> Result<BufferView, AllocationError> {
        let buffer = match create_buffer(
            self.allocator.as_ref(),
            BufferDescriptor::new(size, ONE_OFF_LABEL),
        ) {
            Ok(buffer) => buffer,
            Err(err) => return Err(self.allocation_failed(size, err)),
        };

        let range = BufferRange::new(0, size);
        if let Some(source) = source {
            buffer.write(range, &mut |dst: &mut [u8]| dst.copy_from_slice(source));
        }
        debug!(size, "emplaced one-off host buffer");
        self.usage.record_event(events::ONE_OFF);
        self.usage.record_emplace(size);

        Ok(BufferView::new(buffer, range))
    }

    /// Make the block after the current one active, creating it if needed.
    fn advance_block(&mut self) -> Result<(), AllocationError> {
        let next = self.current_block + 1;
        if next < self.blocks.len() {
            self.blocks[next].cursor = 0;
            self.usage.record_event(events::BLOCK_REUSED);
        } else {
            let buffer = match create_buffer(
                self.allocator.as_ref(),
                BufferDescriptor::new(self.config.block_size, BLOCK_LABEL),
            ) {
                Ok(buffer) => buffer,
                Err(err) => return Err(self.allocation_failed(self.config.block_size, err)),
            };
            self.blocks.push(Block::new(buffer, self.frame_epoch));
            debug!(blocks = self.blocks.len(), epoch = self.frame_epoch, "host buffer grew");
            self.usage.record_event(events::BLOCK_CREATED);
        }

        self.current_block = next;
        self.usage.record_event(events::ROLLOVER);
        Ok(())
    }

    fn allocation_failed(&mut self, size: usize, err: AllocationError) -> AllocationError {
        warn!(size, error = %err, "host buffer allocation failed");
        self.usage.record_event(events::ALLOCATION_FAILURE);
        err
    }
}

/// Request a buffer, rejecting allocators that hand back less than asked.
fn create_buffer(
    allocator: &dyn Allocator,
    desc: BufferDescriptor,
) -> Result<Arc<dyn DeviceBuffer>, AllocationError> {
    let buffer = allocator.create_buffer(&desc)?;
    if buffer.size() < desc.size {
        return Err(AllocationError::Rejected {
            requested: desc.size,
            reason: format!("allocator returned only {} bytes", buffer.size()),
        });
    }
    Ok(buffer)
}

impl fmt::Debug for HostBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostBuffer")
            .field("config", &self.config)
            .field("blocks", &self.blocks.len())
            .field("current_block", &self.current_block)
            .field("frame_epoch", &self.frame_epoch)
            .finish_non_exhaustive()
    }
}
