//! Memory management utilities
//!
//! Per-frame transient allocation for data headed to the GPU:
//! - [`HostBuffer`]: bump allocator over recycled blocks, reset once per frame
//! - [`BufferView`]: the (buffer, range) handle every emplace returns
//! - [`Allocator`] / [`DeviceBuffer`]: the injected capability blocks come from
//! - [`HeapAllocator`]: host-memory implementation with live-byte accounting

mod allocator;
mod buffer_view;
mod heap;
mod host_buffer;
pub mod range;
pub mod tracker;

pub use allocator::{AllocationError, Allocator, BufferDescriptor, DeviceBuffer};
pub use buffer_view::BufferView;
pub use heap::{HeapAllocator, HeapBuffer};
pub use host_buffer::{
    HostBuffer, HostBufferConfig, HostBufferError, HostBufferState, DEFAULT_BLOCK_SIZE,
    DEFAULT_UNIFORM_ALIGNMENT, FRAMES_IN_FLIGHT,
};
pub use range::{align_up, BufferRange};
pub use tracker::UsageTracker;
