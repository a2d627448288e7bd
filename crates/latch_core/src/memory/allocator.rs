//! The allocation capability a [`HostBuffer`](super::HostBuffer) draws its
//! blocks from.
//!
//! The host buffer never reserves memory itself. Whoever owns it injects an
//! [`Allocator`]; production code passes a device- or heap-backed allocator,
//! tests pass doubles that fail on demand.

use super::range::BufferRange;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Reasons an [`Allocator`] may refuse a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    #[error("out of memory while allocating {requested} bytes")]
    OutOfMemory { requested: usize },

    #[error("allocating {requested} bytes would exceed the {budget} byte budget ({in_use} in use)")]
    BudgetExceeded {
        requested: usize,
        in_use: usize,
        budget: usize,
    },

    #[error("allocator rejected a {requested} byte request: {reason}")]
    Rejected { requested: usize, reason: String },
}

/// Parameters for a single buffer request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDescriptor {
    pub size: usize,
    pub label: &'static str,
}

impl BufferDescriptor {
    pub const fn new(size: usize, label: &'static str) -> Self {
        Self { size, label }
    }
}

/// A fixed-size, contiguous byte region handed out by an [`Allocator`].
///
/// Buffers are shared (`Arc<dyn DeviceBuffer>`) between the block that owns
/// them and every view pointing into them, so access goes through callbacks
/// rather than returned references. Identity is pointer identity of the
/// shared handle.
pub trait DeviceBuffer: fmt::Debug + Send + Sync {
    /// Capacity in bytes. Never changes.
    fn size(&self) -> usize;

    fn label(&self) -> &str;

    /// Run `writer` over the bytes in `range`.
    ///
    /// `range` must lie within `0..size()`. Implementations may hold a lock
    /// for the duration of the callback, so `writer` and `reader` must not
    /// touch the same buffer again.
    fn write(&self, range: BufferRange, writer: &mut dyn FnMut(&mut [u8]));

    /// Run `reader` over the bytes in `range`.
    ///
    /// `range` must lie within `0..size()`.
    fn read(&self, range: BufferRange, reader: &mut dyn FnMut(&[u8]));
}

/// Creates backing buffers. Implementations must be safe to call again after
/// a failure; callers never retry on their own.
pub trait Allocator: Send + Sync {
    fn create_buffer(
        &self,
        desc: &BufferDescriptor,
    ) -> Result<Arc<dyn DeviceBuffer>, AllocationError>;
}

impl<A: Allocator + ?Sized> Allocator for Arc<A> {
    fn create_buffer(
        &self,
        desc: &BufferDescriptor,
    ) -> Result<Arc<dyn DeviceBuffer>, AllocationError> {
        (**self).create_buffer(desc)
    }
}

impl<A: Allocator + ?Sized> Allocator for Box<A> {
    fn create_buffer(
        &self,
        desc: &BufferDescriptor,
    ) -> Result<Arc<dyn DeviceBuffer>, AllocationError> {
        (**self).create_buffer(desc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_errors_describe_the_request() {
        let err = AllocationError::BudgetExceeded {
            requested: 64,
            in_use: 960,
            budget: 1000,
        };
        assert_eq!(
            err.to_string(),
            "allocating 64 bytes would exceed the 1000 byte budget (960 in use)"
        );

        let err = AllocationError::OutOfMemory { requested: 8 };
        assert_eq!(err.to_string(), "out of memory while allocating 8 bytes");
    }
}
