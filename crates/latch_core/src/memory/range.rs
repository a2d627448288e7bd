//! Byte ranges inside a device buffer and the alignment arithmetic that
//! produces them.

use std::fmt;
use std::ops::Range;

/// Round `x` up to the next multiple of `alignment`.
///
/// An alignment of 0 or 1 means "no alignment" and returns `x` unchanged.
/// Any other alignment must be a power of two.
#[inline]
pub fn align_up(x: usize, alignment: usize) -> usize {
    if alignment <= 1 {
        return x;
    }
    debug_assert!(alignment.is_power_of_two(), "alignment {alignment} is not a power of two");
    (x + alignment - 1) & !(alignment - 1)
}

/// Like [`align_up`], but returns `None` instead of wrapping.
#[inline]
pub fn checked_align_up(x: usize, alignment: usize) -> Option<usize> {
    if alignment <= 1 {
        return Some(x);
    }
    debug_assert!(alignment.is_power_of_two(), "alignment {alignment} is not a power of two");
    Some(x.checked_add(alignment - 1)? & !(alignment - 1))
}

/// Normalize a caller-supplied alignment to a usable power of two.
///
/// Debug builds reject a non-power-of-two alignment outright; release builds
/// round it up so the returned range is still aligned at least as strictly
/// as requested.
#[inline]
pub(crate) fn normalize_alignment(alignment: usize) -> usize {
    debug_assert!(
        alignment <= 1 || alignment.is_power_of_two(),
        "alignment {alignment} is not a power of two"
    );
    alignment.max(1).next_power_of_two()
}

/// `length` bytes starting at `offset`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BufferRange {
    pub offset: usize,
    pub length: usize,
}

impl BufferRange {
    #[inline]
    pub const fn new(offset: usize, length: usize) -> Self {
        Self { offset, length }
    }

    /// One past the last byte.
    #[inline]
    pub const fn end(&self) -> usize {
        self.offset + self.length
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    #[inline]
    pub fn as_range(&self) -> Range<usize> {
        self.offset..self.end()
    }

    /// True if `other` lies entirely within `self`.
    pub fn contains(&self, other: &BufferRange) -> bool {
        other.offset >= self.offset && other.end() <= self.end()
    }

    /// True if the two ranges share at least one byte.
    pub fn overlaps(&self, other: &BufferRange) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.offset < other.end()
            && other.offset < self.end()
    }
}

impl From<BufferRange> for Range<usize> {
    fn from(range: BufferRange) -> Self {
        range.as_range()
    }
}

impl fmt::Display for BufferRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.offset, self.end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_up_rounds_to_next_multiple() {
        assert_eq!(align_up(0, 16), 0);
        assert_eq!(align_up(1, 16), 16);
        assert_eq!(align_up(16, 16), 16);
        assert_eq!(align_up(21, 16), 32);
        assert_eq!(align_up(33, 4), 36);
    }

    #[test]
    fn align_up_zero_and_one_are_identity() {
        for x in [0usize, 1, 7, 1023] {
            assert_eq!(align_up(x, 0), x);
            assert_eq!(align_up(x, 1), x);
        }
    }

    #[test]
    fn checked_align_up_detects_overflow() {
        assert_eq!(checked_align_up(usize::MAX, 2), None);
        assert_eq!(checked_align_up(usize::MAX, 1), Some(usize::MAX));
        assert_eq!(checked_align_up(30, 8), Some(32));
    }

    #[test]
    fn normalize_alignment_maps_zero_to_one() {
        assert_eq!(normalize_alignment(0), 1);
        assert_eq!(normalize_alignment(1), 1);
        assert_eq!(normalize_alignment(64), 64);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "not a power of two")]
    fn normalize_alignment_rejects_odd_alignment_in_debug() {
        normalize_alignment(24);
    }

    #[cfg(not(debug_assertions))]
    #[test]
    fn normalize_alignment_rounds_odd_alignment_up() {
        assert_eq!(normalize_alignment(24), 32);
        assert_eq!(normalize_alignment(3), 4);
    }

    #[test]
    fn ranges_compare_and_overlap() {
        let a = BufferRange::new(0, 16);
        let b = BufferRange::new(16, 16);
        let c = BufferRange::new(8, 4);

        assert_eq!(a.end(), 16);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(a.contains(&c));
        assert!(!a.contains(&b));
        assert!(!BufferRange::new(4, 0).overlaps(&a));
        assert_eq!(Range::from(b), 16..32);
        assert_eq!(b.to_string(), "16..32");
    }
}
