//! Per-frame usage statistics for a host buffer.

use latch_metrics::{metrics, Counter, RingBuffer};

/// Event names recorded by [`UsageTracker::record_event`].
pub mod events {
    pub const ROLLOVER: &str = "rollover";
    pub const BLOCK_CREATED: &str = "block_created";
    pub const BLOCK_REUSED: &str = "block_reused";
    pub const ONE_OFF: &str = "one_off";
    pub const ALLOCATION_FAILURE: &str = "allocation_failure";
    pub const BLOCK_EVICTED: &str = "block_evicted";
}

/// Bytes handed out this frame, plus (with the `metrics` feature) a
/// trailing window of past frames and named event counts.
pub struct UsageTracker {
    frame_bytes: usize,
    frame_emplacements: usize,
    history: RingBuffer<usize>,
    events: Counter,
}

impl UsageTracker {
    /// `window` is the number of completed frames kept for
    /// [`trailing_peak_bytes`](Self::trailing_peak_bytes).
    pub fn new(window: usize) -> Self {
        Self {
            frame_bytes: 0,
            frame_emplacements: 0,
            history: RingBuffer::new(window),
            events: Counter::new(),
        }
    }

    pub fn record_emplace(&mut self, size: usize) {
        self.frame_bytes += size;
        self.frame_emplacements += 1;
    }

    pub fn record_event(&mut self, name: &'static str) {
        self.events.increment(name, 1);
    }

    /// Close the current frame and start counting a new one.
    pub fn end_frame(&mut self) {
        metrics! {
            self.history.push(self.frame_bytes);
        }
        self.frame_bytes = 0;
        self.frame_emplacements = 0;
    }

    pub fn frame_bytes(&self) -> usize {
        self.frame_bytes
    }

    pub fn frame_emplacements(&self) -> usize {
        self.frame_emplacements
    }

    /// Largest per-frame byte total over the completed frames in the
    /// window. Always zero without the `metrics` feature.
    pub fn trailing_peak_bytes(&self) -> usize {
        self.history.peak()
    }

    /// How often `name` has been recorded. Always zero without the
    /// `metrics` feature.
    pub fn event_count(&self, name: &str) -> u64 {
        self.events.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_bytes_reset_each_frame() {
        let mut tracker = UsageTracker::new(3);
        tracker.record_emplace(64);
        tracker.record_emplace(32);
        assert_eq!(tracker.frame_bytes(), 96);
        assert_eq!(tracker.frame_emplacements(), 2);

        tracker.end_frame();
        assert_eq!(tracker.frame_bytes(), 0);
        assert_eq!(tracker.frame_emplacements(), 0);
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn trailing_peak_forgets_old_frames() {
        let mut tracker = UsageTracker::new(2);
        tracker.record_emplace(1000);
        tracker.end_frame();
        tracker.record_emplace(10);
        tracker.end_frame();
        assert_eq!(tracker.trailing_peak_bytes(), 1000);

        tracker.end_frame();
        assert_eq!(tracker.trailing_peak_bytes(), 10);
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn events_are_counted_by_name() {
        let mut tracker = UsageTracker::new(3);
        tracker.record_event(events::ROLLOVER);
        tracker.record_event(events::ROLLOVER);
        tracker.record_event(events::ONE_OFF);
        assert_eq!(tracker.event_count(events::ROLLOVER), 2);
        assert_eq!(tracker.event_count(events::ONE_OFF), 1);
        assert_eq!(tracker.event_count(events::BLOCK_EVICTED), 0);
    }
}
