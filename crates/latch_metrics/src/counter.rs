//! Named counters for tracking events

use std::collections::HashMap;

pub struct Counter {
    counters: HashMap<&'static str, u64>,
}

impl Counter {
    pub fn new() -> Self {
        Self {
            counters: HashMap::new(),
        }
    }

    pub fn increment(&mut self, name: &'static str, value: u64) {
        *self.counters.entry(name).or_insert(0) += value;
    }

    pub fn get(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    pub fn reset_all(&mut self) {
        self.counters.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        self.counters.iter().map(|(name, value)| (*name, *value))
    }
}

impl Default for Counter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_accumulates_by_name() {
        let mut counter = Counter::new();
        counter.increment("rollover", 1);
        counter.increment("rollover", 2);
        counter.increment("one_off", 1);

        assert_eq!(counter.get("rollover"), 3);
        assert_eq!(counter.get("one_off"), 1);
        assert_eq!(counter.get("missing"), 0);
        assert_eq!(counter.iter().count(), 2);

        counter.reset_all();
        assert_eq!(counter.get("rollover"), 0);
    }
}
