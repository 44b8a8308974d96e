#![forbid(unsafe_code)]

//! Bidirectional text analysis.
//!
//! Splits a range of line text into directional runs in visual order using
//! the Unicode Bidirectional Algorithm (UAX #9, via `unicode-bidi`). Shaping
//! backends shape each directional run on its own and concatenate the results.
//!
//! # Example
//!
//! ```
//! use glyphflow::bidi::{visual_runs, TextDirection, TextFlowDirection};
//! use glyphflow::location::TextRange;
//!
//! let runs = visual_runs("abc", TextRange::new(0, 3), TextFlowDirection::Auto);
//! assert_eq!(runs.len(), 1);
//! assert_eq!(runs[0].direction, TextDirection::LeftToRight);
//! ```

use unicode_bidi::{BidiInfo, Level};

use crate::location::TextRange;

/// Resolved direction of a run of glyphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TextDirection {
    #[default]
    LeftToRight,
    RightToLeft,
}

impl TextDirection {
    /// Whether this is right-to-left.
    #[inline]
    pub const fn is_rtl(self) -> bool {
        matches!(self, Self::RightToLeft)
    }

    fn from_level(level: Level) -> Self {
        if level.is_rtl() {
            Self::RightToLeft
        } else {
            Self::LeftToRight
        }
    }
}

/// Requested base direction of a paragraph.
///
/// `Auto` resolves from the first strong character (rules P2/P3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TextFlowDirection {
    #[default]
    Auto,
    LeftToRight,
    RightToLeft,
}

impl TextFlowDirection {
    fn default_level(self) -> Option<Level> {
        match self {
            Self::Auto => None,
            Self::LeftToRight => Some(Level::ltr()),
            Self::RightToLeft => Some(Level::rtl()),
        }
    }
}

/// A maximal range of text with one resolved direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectionalRun {
    /// Absolute byte range in the line text.
    pub range: TextRange,
    pub direction: TextDirection,
}

/// Resolve the base direction of `text[range]`.
pub fn resolve_base_direction(text: &str, range: TextRange, base: TextFlowDirection) -> TextDirection {
    match base {
        TextFlowDirection::LeftToRight => TextDirection::LeftToRight,
        TextFlowDirection::RightToLeft => TextDirection::RightToLeft,
        TextFlowDirection::Auto => {
            let slice = &text[range.as_range()];
            let info = BidiInfo::new(slice, None);
            info.paragraphs
                .first()
                .map_or(TextDirection::LeftToRight, |para| {
                    TextDirection::from_level(para.level)
                })
        }
    }
}

/// Split `text[range]` into directional runs, in visual (left-to-right
/// display) order.
///
/// Empty ranges produce no runs. Text without right-to-left content under a
/// non-RTL base direction produces a single left-to-right run without running
/// the full algorithm.
pub fn visual_runs(text: &str, range: TextRange, base: TextFlowDirection) -> Vec<DirectionalRun> {
    if range.is_empty() {
        return Vec::new();
    }

    let slice = &text[range.as_range()];
    let info = BidiInfo::new(slice, base.default_level());

    if !info.has_rtl() {
        return vec![DirectionalRun {
            range,
            direction: TextDirection::LeftToRight,
        }];
    }

    let mut runs = Vec::new();
    for para in &info.paragraphs {
        let (levels, level_runs) = info.visual_runs(para, para.range.clone());
        for run in level_runs {
            if run.is_empty() {
                continue;
            }
            runs.push(DirectionalRun {
                range: TextRange::new(range.begin + run.start, range.begin + run.end),
                direction: TextDirection::from_level(levels[run.start]),
            });
        }
    }

    tracing::trace!(
        begin = range.begin,
        end = range.end,
        run_count = runs.len(),
        "bidi visual runs"
    );
    runs
}

/// The single direction of `text[range]`, or the resolved base direction when
/// the range mixes directions.
pub fn dominant_direction(text: &str, range: TextRange, base: TextFlowDirection) -> TextDirection {
    let runs = visual_runs(text, range, base);
    match runs.as_slice() {
        [] => resolve_base_direction(text, range, base),
        [first, rest @ ..] if rest.iter().all(|r| r.direction == first.direction) => {
            first.direction
        }
        _ => resolve_base_direction(text, range, base),
    }
}
