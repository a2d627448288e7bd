//! Host-memory allocator.
//!
//! Buffers are zero-initialized boxed byte slices. Every buffer reports back
//! to the allocator that created it when dropped, so `live_bytes` reflects
//! exactly what is still reachable from blocks or views.

use super::allocator::{AllocationError, Allocator, BufferDescriptor, DeviceBuffer};
use super::range::BufferRange;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Default)]
struct HeapStats {
    live_bytes: AtomicUsize,
    live_buffers: AtomicUsize,
}

/// Allocates buffers from the process heap, optionally capped by a byte
/// budget. Clones share the same accounting.
#[derive(Debug, Clone, Default)]
pub struct HeapAllocator {
    stats: Arc<HeapStats>,
    budget: Option<usize>,
}

impl HeapAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse any request that would push live bytes past `budget`.
    pub fn with_budget(budget: usize) -> Self {
        Self {
            stats: Arc::default(),
            budget: Some(budget),
        }
    }

    pub fn budget(&self) -> Option<usize> {
        self.budget
    }

    /// Bytes held by buffers that have not been dropped yet.
    pub fn live_bytes(&self) -> usize {
        self.stats.live_bytes.load(Ordering::Acquire)
    }

    pub fn live_buffers(&self) -> usize {
        self.stats.live_buffers.load(Ordering::Acquire)
    }

    fn charge(&self, requested: usize) -> Result<(), AllocationError> {
        let budget = self.budget;
        self.stats
            .live_bytes
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |in_use| {
                let next = in_use.checked_add(requested)?;
                match budget {
                    Some(limit) if next > limit => None,
                    _ => Some(next),
                }
            })
            .map(|_| ())
            .map_err(|in_use| match budget {
                Some(budget) => AllocationError::BudgetExceeded {
                    requested,
                    in_use,
                    budget,
                },
                None => AllocationError::OutOfMemory { requested },
            })
    }

    fn refund(&self, amount: usize) {
        self.stats.live_bytes.fetch_sub(amount, Ordering::AcqRel);
    }
}

impl Allocator for HeapAllocator {
    fn create_buffer(
        &self,
        desc: &BufferDescriptor,
    ) -> Result<Arc<dyn DeviceBuffer>, AllocationError> {
        self.charge(desc.size)?;

        let mut bytes = Vec::new();
        if bytes.try_reserve_exact(desc.size).is_err() {
            self.refund(desc.size);
            return Err(AllocationError::OutOfMemory {
                requested: desc.size,
            });
        }
        bytes.resize(desc.size, 0u8);

        self.stats.live_buffers.fetch_add(1, Ordering::AcqRel);
        Ok(Arc::new(HeapBuffer {
            label: desc.label,
            size: desc.size,
            bytes: Mutex::new(bytes.into_boxed_slice()),
            stats: self.stats.clone(),
        }))
    }
}

/// A buffer returned by [`HeapAllocator`].
pub struct HeapBuffer {
    label: &'static str,
    size: usize,
    bytes: Mutex<Box<[u8]>>,
    stats: Arc<HeapStats>,
}

impl DeviceBuffer for HeapBuffer {
    fn size(&self) -> usize {
        self.size
    }

    fn label(&self) -> &str {
        self.label
    }

    fn write(&self, range: BufferRange, writer: &mut dyn FnMut(&mut [u8])) {
        let mut bytes = self.bytes.lock().unwrap_or_else(PoisonError::into_inner);
        writer(&mut bytes[range.as_range()]);
    }

    fn read(&self, range: BufferRange, reader: &mut dyn FnMut(&[u8])) {
        let bytes = self.bytes.lock().unwrap_or_else(PoisonError::into_inner);
        reader(&bytes[range.as_range()]);
    }
}

impl fmt::Debug for HeapBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeapBuffer")
            .field("label", &self.label)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

impl Drop for HeapBuffer {
    fn drop(&mut self) {
        self.stats.live_bytes.fetch_sub(self.size, Ordering::AcqRel);
        self.stats.live_buffers.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffers_start_zeroed_and_round_trip_writes() {
        let allocator = HeapAllocator::new();
        let buffer = allocator
            .create_buffer(&BufferDescriptor::new(8, "test"))
            .unwrap();
        assert_eq!(buffer.size(), 8);
        assert_eq!(buffer.label(), "test");

        buffer.write(BufferRange::new(2, 3), &mut |bytes| bytes.copy_from_slice(&[1, 2, 3]));

        let mut seen = Vec::new();
        buffer.read(BufferRange::new(0, 8), &mut |bytes| seen.extend_from_slice(bytes));
        assert_eq!(seen, vec![0, 0, 1, 2, 3, 0, 0, 0]);
    }

    #[test]
    fn dropping_buffers_returns_bytes() {
        let allocator = HeapAllocator::new();
        let a = allocator.create_buffer(&BufferDescriptor::new(100, "a")).unwrap();
        let b = allocator.create_buffer(&BufferDescriptor::new(28, "b")).unwrap();
        assert_eq!(allocator.live_bytes(), 128);
        assert_eq!(allocator.live_buffers(), 2);

        drop(a);
        assert_eq!(allocator.live_bytes(), 28);
        assert_eq!(allocator.live_buffers(), 1);

        drop(b);
        assert_eq!(allocator.live_bytes(), 0);
        assert_eq!(allocator.live_buffers(), 0);
    }

    #[test]
    fn budget_rejects_requests_past_the_limit() {
        let allocator = HeapAllocator::with_budget(1000);
        assert_eq!(allocator.budget(), Some(1000));
        assert_eq!(HeapAllocator::new().budget(), None);
        let _held = allocator.create_buffer(&BufferDescriptor::new(960, "held")).unwrap();

        let err = allocator
            .create_buffer(&BufferDescriptor::new(64, "spill"))
            .unwrap_err();
        assert_eq!(
            err,
            AllocationError::BudgetExceeded {
                requested: 64,
                in_use: 960,
                budget: 1000,
            }
        );

        // A failed request leaves the accounting untouched.
        assert_eq!(allocator.live_bytes(), 960);
        assert!(allocator.create_buffer(&BufferDescriptor::new(40, "fits")).is_ok());
    }

    #[test]
    fn clones_share_accounting() {
        let allocator = HeapAllocator::new();
        let clone = allocator.clone();
        let _buffer = clone.create_buffer(&BufferDescriptor::new(16, "shared")).unwrap();
        assert_eq!(allocator.live_bytes(), 16);
    }
}
