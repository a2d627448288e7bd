//! Fixed-capacity ring of per-frame samples

pub struct RingBuffer<T> {
    samples: Vec<T>,
    capacity: usize,
    index: usize,
}

impl<T: Copy> RingBuffer<T> {
    /// `capacity` is clamped to at least one sample.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
            index: 0,
        }
    }

    /// Record a sample, overwriting the oldest one once the window is full.
    pub fn push(&mut self, sample: T) {
        if self.samples.len() < self.capacity {
            self.samples.push(sample);
        } else {
            self.samples[self.index] = sample;
        }
        self.index = (self.index + 1) % self.capacity;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Most recently pushed sample.
    pub fn latest(&self) -> Option<T> {
        if self.samples.is_empty() {
            return None;
        }
        let last = (self.index + self.capacity - 1) % self.capacity;
        Some(self.samples[last])
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.index = 0;
    }
}

// Byte and count windows (common case)
impl RingBuffer<usize> {
    /// Largest sample in the window, or zero when empty.
    pub fn peak(&self) -> usize {
        self.samples.iter().copied().max().unwrap_or(0)
    }

    pub fn sum(&self) -> usize {
        self.samples.iter().sum()
    }

    pub fn average(&self) -> usize {
        if self.samples.is_empty() {
            return 0;
        }
        self.sum() / self.samples.len()
    }
}
