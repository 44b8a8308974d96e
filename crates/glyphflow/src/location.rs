#![forbid(unsafe_code)]

//! Text ranges, locations and selections.
//!
//! Offsets are byte offsets into a line's UTF-8 text and must always fall on
//! `char` boundaries. Lines never contain line terminators; the terminator
//! only exists in flattened text (see [`crate::offsets`]).

use std::cmp::Ordering;
use std::fmt;

/// A half-open byte range `[begin, end)` within one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextRange {
    /// Start offset (inclusive).
    pub begin: usize,
    /// End offset (exclusive).
    pub end: usize,
}

impl TextRange {
    /// Create a new range.
    ///
    /// # Panics
    ///
    /// Panics if `begin > end`.
    #[inline]
    #[track_caller]
    pub fn new(begin: usize, end: usize) -> Self {
        assert!(begin <= end, "non-monotonic text range {begin}..{end}");
        Self { begin, end }
    }

    /// An empty range positioned at `at`.
    #[inline]
    pub const fn empty_at(at: usize) -> Self {
        Self { begin: at, end: at }
    }

    /// Length in bytes.
    #[inline]
    pub const fn len(&self) -> usize {
        self.end - self.begin
    }

    /// Whether the range covers no bytes.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    /// `begin <= index < end`.
    #[inline]
    pub const fn contains(&self, index: usize) -> bool {
        index >= self.begin && index < self.end
    }

    /// `begin <= index <= end`.
    #[inline]
    pub const fn inclusive_contains(&self, index: usize) -> bool {
        index >= self.begin && index <= self.end
    }

    /// Whether `other` lies entirely within this range.
    #[inline]
    pub const fn encloses(&self, other: &TextRange) -> bool {
        other.begin >= self.begin && other.end <= self.end
    }

    /// Intersection of two ranges.
    ///
    /// Returns `None` when the ranges are disjoint; ranges that only touch
    /// produce an empty intersection.
    #[must_use]
    pub fn intersect(&self, other: &TextRange) -> Option<TextRange> {
        let begin = self.begin.max(other.begin);
        let end = self.end.min(other.end);
        (begin <= end).then_some(TextRange { begin, end })
    }

    /// Intersection, or `None` if it would be empty.
    #[must_use]
    pub fn non_empty_intersect(&self, other: &TextRange) -> Option<TextRange> {
        self.intersect(other).filter(|r| !r.is_empty())
    }

    /// The range moved right by `amount` bytes.
    #[inline]
    #[must_use]
    pub const fn shifted_right(&self, amount: usize) -> Self {
        Self {
            begin: self.begin + amount,
            end: self.end + amount,
        }
    }

    /// The range moved left by `amount` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `amount > begin`.
    #[inline]
    #[must_use]
    #[track_caller]
    pub fn shifted_left(&self, amount: usize) -> Self {
        assert!(amount <= self.begin, "range {self} shifted before zero");
        Self {
            begin: self.begin - amount,
            end: self.end - amount,
        }
    }

    /// As a standard library range.
    #[inline]
    pub const fn as_range(&self) -> std::ops::Range<usize> {
        self.begin..self.end
    }
}

impl From<std::ops::Range<usize>> for TextRange {
    #[track_caller]
    fn from(range: std::ops::Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

impl fmt::Display for TextRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.begin, self.end)
    }
}

/// A logical position in a layout: line index plus byte offset in that line.
///
/// Ordered lexicographically by `(line_index, offset)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextLocation {
    /// Index of the line model.
    pub line_index: usize,
    /// Byte offset within the line's text.
    pub offset: usize,
}

impl TextLocation {
    /// Create a new location.
    #[inline]
    pub const fn new(line_index: usize, offset: usize) -> Self {
        Self { line_index, offset }
    }
}

impl Ord for TextLocation {
    fn cmp(&self, other: &Self) -> Ordering {
        self.line_index
            .cmp(&other.line_index)
            .then(self.offset.cmp(&other.offset))
    }
}

impl PartialOrd for TextLocation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for TextLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line_index, self.offset)
    }
}

/// A selection between two locations, normalised so `beginning <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextSelection {
    beginning: TextLocation,
    end: TextLocation,
}

impl TextSelection {
    /// Create a selection from two locations in any order.
    pub fn new(a: TextLocation, b: TextLocation) -> Self {
        if a <= b {
            Self {
                beginning: a,
                end: b,
            }
        } else {
            Self {
                beginning: b,
                end: a,
            }
        }
    }

    /// The earlier location.
    #[inline]
    pub const fn beginning(&self) -> TextLocation {
        self.beginning
    }

    /// The later location.
    #[inline]
    pub const fn end(&self) -> TextLocation {
        self.end
    }

    /// Whether the selection covers no text.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.beginning == self.end
    }
}
