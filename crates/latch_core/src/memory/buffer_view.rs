//! The handle returned by every emplace call.

use super::allocator::DeviceBuffer;
use super::range::BufferRange;
use std::sync::Arc;

/// A byte range inside a device buffer.
///
/// A view with no buffer and an empty range is the null view: it signals
/// that the allocation behind an emplace failed. Check [`is_valid`] before
/// binding or reading a view.
///
/// Views keep their buffer alive, but the [`HostBuffer`] that produced them
/// will hand the same bytes out again once the owning block is rewound.
/// Treat a view as valid only until the frames-in-flight window after the
/// frame that produced it has passed.
///
/// [`is_valid`]: BufferView::is_valid
/// [`HostBuffer`]: super::HostBuffer
#[derive(Debug, Clone, Default)]
pub struct BufferView {
    buffer: Option<Arc<dyn DeviceBuffer>>,
    range: BufferRange,
}

impl BufferView {
    pub(crate) fn new(buffer: Arc<dyn DeviceBuffer>, range: BufferRange) -> Self {
        debug_assert!(range.end() <= buffer.size());
        Self {
            buffer: Some(buffer),
            range,
        }
    }

    /// The failure view: no buffer, range `(0, 0)`.
    pub const fn null() -> Self {
        Self {
            buffer: None,
            range: BufferRange::new(0, 0),
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.buffer.is_some()
    }

    pub fn buffer(&self) -> Option<&Arc<dyn DeviceBuffer>> {
        self.buffer.as_ref()
    }

    #[inline]
    pub fn range(&self) -> BufferRange {
        self.range
    }

    /// True if both views point into the same device buffer.
    pub fn same_buffer(&self, other: &BufferView) -> bool {
        match (&self.buffer, &other.buffer) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Run `f` over the viewed bytes. Returns `None` for the null view.
    pub fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Option<R> {
        let buffer = self.buffer.as_ref()?;
        let mut f = Some(f);
        let mut result = None;
        buffer.read(self.range, &mut |bytes| {
            if let Some(f) = f.take() {
                result = Some(f(bytes));
            }
        });
        result
    }

    pub fn to_vec(&self) -> Option<Vec<u8>> {
        self.with_bytes(<[u8]>::to_vec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{Allocator, BufferDescriptor, HeapAllocator};

    #[test]
    fn null_view_is_invalid() {
        let view = BufferView::null();
        assert!(!view.is_valid());
        assert!(view.buffer().is_none());
        assert_eq!(view.range(), BufferRange::new(0, 0));
        assert_eq!(view.to_vec(), None);
        assert!(!BufferView::default().is_valid());
        assert!(!view.same_buffer(&BufferView::null()));
    }

    #[test]
    fn views_read_their_own_range() {
        let allocator = HeapAllocator::new();
        let buffer = allocator
            .create_buffer(&BufferDescriptor::new(8, "view"))
            .unwrap();
        buffer.write(BufferRange::new(0, 8), &mut |bytes| {
            bytes.copy_from_slice(&[0, 1, 2, 3, 4, 5, 6, 7])
        });

        let a = BufferView::new(buffer.clone(), BufferRange::new(2, 3));
        let b = BufferView::new(buffer, BufferRange::new(6, 2));
        assert!(a.is_valid());
        assert!(a.same_buffer(&b));
        assert_eq!(a.to_vec(), Some(vec![2, 3, 4]));
        assert_eq!(b.with_bytes(|bytes| bytes.len()), Some(2));
    }
}
