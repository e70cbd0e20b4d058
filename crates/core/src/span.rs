//! Source ranges.
//!
//! Spans are half-open byte ranges `[start, end)`. Recovery bookkeeping
//! compares against *inclusive* last offsets, which is how the parser
//! records edit positions, so [`Span::last`] is what most of the recovery
//! code reads.

use serde::{Deserialize, Serialize};

/// A half-open byte range in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    #[must_use]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// A zero-width span sitting at `offset`.
    #[must_use]
    pub const fn empty_at(offset: u32) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    #[must_use]
    pub const fn len(self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.start >= self.end
    }

    /// Inclusive offset of the last byte. A zero-width span at `s` ends at
    /// `s - 1`, which can be `-1`.
    #[must_use]
    pub const fn last(self) -> i64 {
        self.end as i64 - 1
    }

    /// True when the inclusive range `start..=end` lies inside this span.
    #[must_use]
    pub const fn encloses(self, start: u32, end: u32) -> bool {
        start >= self.start && (end as i64) <= self.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_is_inclusive() {
        assert_eq!(Span::new(4, 9).last(), 8);
        assert_eq!(Span::empty_at(7).last(), 6);
        assert_eq!(Span::empty_at(0).last(), -1);
    }

    #[test]
    fn encloses_uses_inclusive_envelope() {
        let span = Span::new(10, 20);
        assert!(span.encloses(10, 19));
        assert!(span.encloses(12, 12));
        assert!(!span.encloses(10, 20));
        assert!(!span.encloses(9, 15));
    }

    #[test]
    fn len_of_inverted_span_is_zero() {
        assert_eq!(Span::new(5, 3).len(), 0);
        assert!(Span::new(5, 3).is_empty());
    }
}
