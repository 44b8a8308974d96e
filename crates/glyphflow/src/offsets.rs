#![forbid(unsafe_code)]

//! Mapping between line locations and offsets into the flattened text.
//!
//! The flattened text joins every line with [`LINE_TERMINATOR`].
//!
//! # Example
//!
//! ```
//! use glyphflow::location::TextLocation;
//! use glyphflow::offsets::TextOffsetLocations;
//!
//! let offsets = TextOffsetLocations::from_line_lengths([5, 3]);
//! assert_eq!(offsets.text_location_to_offset(TextLocation::new(1, 2)), Some(8));
//! assert_eq!(offsets.offset_to_text_location(8), Some(TextLocation::new(1, 2)));
//! assert_eq!(offsets.text_length(), 9);
//! ```

use crate::location::{TextLocation, TextRange};

/// Separator between lines in flattened text.
pub const LINE_TERMINATOR: &str = "\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LineOffset {
    flat_start: usize,
    length: usize,
}

impl LineOffset {
    fn range(&self) -> TextRange {
        TextRange::new(self.flat_start, self.flat_start + self.length)
    }
}

/// Start offset and length of every line in the flattened text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextOffsetLocations {
    lines: Vec<LineOffset>,
}

impl TextOffsetLocations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the byte length of each line.
    pub fn from_line_lengths(lengths: impl IntoIterator<Item = usize>) -> Self {
        let mut out = Self::new();
        for length in lengths {
            out.push_line(length);
        }
        out
    }

    pub(crate) fn push_line(&mut self, length: usize) {
        let flat_start = self
            .lines
            .last()
            .map_or(0, |l| l.flat_start + l.length + LINE_TERMINATOR.len());
        self.lines.push(LineOffset { flat_start, length });
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Flattened offset of `location`, or `None` for a line that does not
    /// exist.
    pub fn text_location_to_offset(&self, location: TextLocation) -> Option<usize> {
        self.lines
            .get(location.line_index)
            .map(|line| line.flat_start + location.offset)
    }

    /// Location of a flattened offset. Offsets on a line terminator map to
    /// the end of the preceding line.
    pub fn offset_to_text_location(&self, offset: usize) -> Option<TextLocation> {
        let index = self
            .lines
            .partition_point(|line| line.flat_start <= offset)
            .checked_sub(1)?;
        let line = self.lines[index];
        line.range()
            .inclusive_contains(offset)
            .then(|| TextLocation::new(index, offset - line.flat_start))
    }

    /// Length of the flattened text, terminators included.
    pub fn text_length(&self) -> usize {
        self.lines
            .last()
            .map_or(0, |l| l.flat_start + l.length)
    }
}
