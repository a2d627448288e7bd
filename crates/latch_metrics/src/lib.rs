//! Latch Metrics - Common utilities for allocation tracking
//!
//! Provides zero-cost abstractions for metrics collection that completely
//! vanish in production builds via feature flags.
//!
//! # Feature Flags
//!
//! - `metrics` - Enable metrics collection (default: disabled)
//!
//! # Usage
//!
//! ```ignore
//! use latch_metrics::{Counter, RingBuffer};
//!
//! let mut frame_bytes = RingBuffer::new(3); // Track last 3 frames
//! frame_bytes.push(4096usize);
//! println!("peak: {} bytes", frame_bytes.peak());
//! ```
//!
//! In production builds (without `metrics` feature), all instrumentation
//! is compiled out to zero overhead.

#[cfg(feature = "metrics")]
mod ring_buffer;
#[cfg(feature = "metrics")]
mod counter;

#[cfg(feature = "metrics")]
pub use ring_buffer::RingBuffer;
#[cfg(feature = "metrics")]
pub use counter::Counter;

// ============================================================================
// Macros for conditional compilation
// ============================================================================

/// Execute code only when metrics are enabled
#[macro_export]
macro_rules! metrics {
    ($($tt:tt)*) => {
        #[cfg(feature = "metrics")]
        {
            $($tt)*
        }
    };
}

// ============================================================================
// No-op stubs when metrics disabled
// ============================================================================

#[cfg(not(feature = "metrics"))]
pub struct RingBuffer<T>(std::marker::PhantomData<T>);

#[cfg(not(feature = "metrics"))]
impl<T: Copy> RingBuffer<T> {
    pub fn new(_capacity: usize) -> Self { Self(std::marker::PhantomData) }
    pub fn push(&mut self, _sample: T) {}
    pub fn capacity(&self) -> usize { 0 }
    pub fn len(&self) -> usize { 0 }
    pub fn is_empty(&self) -> bool { true }
    pub fn latest(&self) -> Option<T> { None }
    pub fn clear(&mut self) {}
}

#[cfg(not(feature = "metrics"))]
impl RingBuffer<usize> {
    pub fn peak(&self) -> usize { 0 }
    pub fn sum(&self) -> usize { 0 }
    pub fn average(&self) -> usize { 0 }
}

#[cfg(not(feature = "metrics"))]
pub struct Counter;

#[cfg(not(feature = "metrics"))]
impl Counter {
    pub fn new() -> Self { Self }
    pub fn increment(&mut self, _name: &'static str, _value: u64) {}
    pub fn get(&self, _name: &str) -> u64 { 0 }
    pub fn reset_all(&mut self) {}
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ { std::iter::empty() }
}

#[cfg(not(feature = "metrics"))]
impl Default for Counter {
    fn default() -> Self { Self }
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_compiles_without_metrics() {
        // Ensure stubs compile when metrics feature is disabled
        let mut _buffer = super::RingBuffer::<usize>::new(3);
        let mut _counter = super::Counter::new();
        _buffer.push(1);
        _counter.increment("rollover", 1);
    }
}
