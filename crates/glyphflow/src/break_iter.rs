#![forbid(unsafe_code)]

//! Break iterators.
//!
//! A break iterator walks the legal boundaries of a string. The layout
//! engine uses a line break iterator to find soft-wrap opportunities and a
//! word break iterator to select words. Boundaries are byte offsets; the
//! start of the string is the initial position but is never returned by
//! forward moves.
//!
//! # Example
//!
//! ```
//! use glyphflow::break_iter::{BreakIterator, LineBreakIterator};
//!
//! let mut iter = LineBreakIterator::new();
//! iter.set_string("Hello world");
//! assert_eq!(iter.move_to_next(), Some(6));
//! assert_eq!(iter.move_to_next(), Some(11));
//! assert_eq!(iter.move_to_next(), None);
//! ```

use icu_segmenter::LineSegmenter;
use icu_segmenter::options::LineBreakOptions;
use unicode_segmentation::UnicodeSegmentation;

/// Cursor over the boundaries of a string.
pub trait BreakIterator: std::fmt::Debug {
    /// Compute boundaries for `text` and move to its start.
    fn set_string(&mut self, text: &str);

    /// Forget the current string.
    fn clear_string(&mut self);

    /// Move to the next boundary.
    fn move_to_next(&mut self) -> Option<usize>;

    /// Move to the previous boundary.
    fn move_to_previous(&mut self) -> Option<usize>;

    /// Move to the first boundary after `index`.
    ///
    /// On failure the cursor rests on the last boundary.
    fn move_to_candidate_after(&mut self, index: usize) -> Option<usize>;

    /// Move to the last boundary before `index`.
    ///
    /// On failure the cursor rests on the first boundary.
    fn move_to_candidate_before(&mut self, index: usize) -> Option<usize>;

    /// Move back to the start of the string.
    fn reset_to_beginning(&mut self) -> usize;

    /// The boundary the cursor is on.
    fn current_position(&self) -> usize;
}

// ---------------------------------------------------------------------------
// Shared cursor
// ---------------------------------------------------------------------------

/// Sorted boundary list, always starting at 0 and ending at the text length.
#[derive(Debug, Clone, Default)]
struct BoundaryCursor {
    boundaries: Vec<usize>,
    position: usize,
}

impl BoundaryCursor {
    fn reset(&mut self, boundaries: Vec<usize>) {
        debug_assert!(boundaries.windows(2).all(|w| w[0] < w[1]));
        self.boundaries = boundaries;
        self.position = 0;
    }

    fn clear(&mut self) {
        self.boundaries.clear();
        self.position = 0;
    }

    fn current(&self) -> usize {
        self.boundaries.get(self.position).copied().unwrap_or(0)
    }

    fn next(&mut self) -> Option<usize> {
        if self.position + 1 >= self.boundaries.len() {
            return None;
        }
        self.position += 1;
        Some(self.boundaries[self.position])
    }

    fn previous(&mut self) -> Option<usize> {
        if self.position == 0 || self.boundaries.is_empty() {
            return None;
        }
        self.position -= 1;
        Some(self.boundaries[self.position])
    }

    fn after(&mut self, index: usize) -> Option<usize> {
        let next = self.boundaries.partition_point(|&b| b <= index);
        if next < self.boundaries.len() {
            self.position = next;
            Some(self.boundaries[next])
        } else {
            self.position = self.boundaries.len().saturating_sub(1);
            None
        }
    }

    fn before(&mut self, index: usize) -> Option<usize> {
        let count = self.boundaries.partition_point(|&b| b < index);
        if count > 0 {
            self.position = count - 1;
            Some(self.boundaries[self.position])
        } else {
            self.position = 0;
            None
        }
    }

    fn to_start(&mut self) -> usize {
        self.position = 0;
        self.current()
    }
}

macro_rules! delegate_cursor {
    () => {
        fn clear_string(&mut self) {
            self.cursor.clear();
        }

        fn move_to_next(&mut self) -> Option<usize> {
            self.cursor.next()
        }

        fn move_to_previous(&mut self) -> Option<usize> {
            self.cursor.previous()
        }

        fn move_to_candidate_after(&mut self, index: usize) -> Option<usize> {
            self.cursor.after(index)
        }

        fn move_to_candidate_before(&mut self, index: usize) -> Option<usize> {
            self.cursor.before(index)
        }

        fn reset_to_beginning(&mut self) -> usize {
            self.cursor.to_start()
        }

        fn current_position(&self) -> usize {
            self.cursor.current()
        }
    };
}

// ---------------------------------------------------------------------------
// Line breaks
// ---------------------------------------------------------------------------

/// Soft-wrap opportunities following UAX #14.
///
/// Boundaries come from the ICU4X line segmenter, so no-break spaces glue
/// their neighbours and closing punctuation stays with the text before it.
/// The end of the text is always a boundary.
#[derive(Debug, Clone, Default)]
pub struct LineBreakIterator {
    cursor: BoundaryCursor,
}

impl LineBreakIterator {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Soft-wrap boundaries of `text`, including 0 and `text.len()`.
pub fn line_boundaries(text: &str) -> Vec<usize> {
    let mut boundaries = vec![0];
    if text.is_empty() {
        return boundaries;
    }
    let segmenter = LineSegmenter::new_auto(LineBreakOptions::default());
    boundaries.extend(segmenter.segment_str(text).filter(|&b| b > 0));
    if boundaries.last() != Some(&text.len()) {
        boundaries.push(text.len());
    }
    boundaries
}

impl BreakIterator for LineBreakIterator {
    fn set_string(&mut self, text: &str) {
        self.cursor.reset(line_boundaries(text));
    }

    delegate_cursor!();
}

// ---------------------------------------------------------------------------
// Word breaks
// ---------------------------------------------------------------------------

/// UAX #29 word boundaries.
#[derive(Debug, Clone, Default)]
pub struct WordBreakIterator {
    cursor: BoundaryCursor,
}

impl WordBreakIterator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BreakIterator for WordBreakIterator {
    fn set_string(&mut self, text: &str) {
        let mut boundaries: Vec<usize> = text
            .split_word_bound_indices()
            .map(|(index, _)| index)
            .collect();
        if boundaries.first() != Some(&0) {
            boundaries.insert(0, 0);
        }
        if !text.is_empty() {
            boundaries.push(text.len());
        }
        self.cursor.reset(boundaries);
    }

    delegate_cursor!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_forward(iter: &mut dyn BreakIterator) -> Vec<usize> {
        let mut out = Vec::new();
        while let Some(b) = iter.move_to_next() {
            out.push(b);
        }
        out
    }

    #[test]
    fn line_breaks_after_whitespace_runs() {
        let mut iter = LineBreakIterator::new();
        iter.set_string("Hello world");
        assert_eq!(all_forward(&mut iter), vec![6, 11]);

        iter.set_string("a  b");
        assert_eq!(all_forward(&mut iter), vec![3, 4]);
    }

    #[test]
    fn line_breaks_trailing_whitespace_only_at_end() {
        let mut iter = LineBreakIterator::new();
        iter.set_string("ab  ");
        assert_eq!(all_forward(&mut iter), vec![4]);
    }

    #[test]
    fn line_breaks_after_hyphen() {
        let mut iter = LineBreakIterator::new();
        iter.set_string("well-known");
        assert_eq!(all_forward(&mut iter), vec![5, 10]);
    }

    #[test]
    fn line_breaks_around_wide_graphemes() {
        let mut iter = LineBreakIterator::new();
        iter.set_string("a你好");
        // "你" and "好" are three bytes each.
        assert_eq!(all_forward(&mut iter), vec![1, 4, 7]);
    }

    #[test]
    fn no_break_spaces_glue_their_neighbours() {
        assert_eq!(line_boundaries("a\u{00A0}b"), vec![0, 4]);
        assert_eq!(line_boundaries("10\u{202F}kg"), vec![0, 7]);
        assert_eq!(line_boundaries("1\u{2007}000 x"), vec![0, 8, 9]);
    }

    #[test]
    fn closing_punctuation_stays_with_preceding_text() {
        // "。" is a closing mark; "！" an exclamation.
        assert_eq!(line_boundaries("中文。"), vec![0, 3, 9]);
        assert_eq!(line_boundaries("好！"), vec![0, 6]);
        assert_eq!(line_boundaries("(word) next"), vec![0, 7, 11]);
    }

    #[test]
    fn empty_string_has_no_boundaries() {
        let mut iter = LineBreakIterator::new();
        iter.set_string("");
        assert_eq!(iter.move_to_next(), None);
        assert_eq!(iter.current_position(), 0);
    }

    #[test]
    fn word_breaks_follow_uax29() {
        let mut iter = WordBreakIterator::new();
        iter.set_string("hello  world");
        assert_eq!(all_forward(&mut iter), vec![5, 7, 12]);
    }

    #[test]
    fn candidate_moves_and_previous() {
        let mut iter = WordBreakIterator::new();
        iter.set_string("hello  world");
        assert_eq!(iter.move_to_candidate_after(2), Some(5));
        assert_eq!(iter.move_to_previous(), Some(0));
        assert_eq!(iter.move_to_previous(), None);
        assert_eq!(iter.move_to_candidate_after(5), Some(7));
        assert_eq!(iter.move_to_candidate_before(7), Some(5));
        assert_eq!(iter.move_to_candidate_before(0), None);
        assert_eq!(iter.current_position(), 0);
        assert_eq!(iter.move_to_candidate_after(12), None);
        assert_eq!(iter.current_position(), 12);
        assert_eq!(iter.reset_to_beginning(), 0);
    }

    #[test]
    fn clear_string_forgets_boundaries() {
        let mut iter = LineBreakIterator::new();
        iter.set_string("a b");
        iter.clear_string();
        assert_eq!(iter.move_to_next(), None);
        assert_eq!(iter.move_to_candidate_after(0), None);
    }
}
