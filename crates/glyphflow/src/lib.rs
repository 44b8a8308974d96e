#![forbid(unsafe_code)]

//! Shaped-text layout and glyph caching.
//!
//! # Role
//! `glyphflow` turns lines of styled runs into positioned layout blocks. It
//! wraps lines at break opportunities, justifies soft lines, places
//! highlights, maps points to text locations and back, and applies edits
//! incrementally. Shaping goes through a pluggable [`TextShaper`] and every
//! line caches its shaped glyphs.
//!
//! # This crate provides
//! - [`TextLayout`], the layout engine, configured by [`LayoutConfig`].
//! - Run types: [`TextRun`], [`HyperlinkRun`], [`WidgetRun`], [`ImageRun`].
//! - [`ShapedTextCache`] and the shaping utilities built on it.
//! - [`MonospaceShaper`], a deterministic shaper, and `RustybuzzShaper`
//!   behind the `shaping` feature.
//! - [`PaintSink`], the surface a renderer implements to draw a layout.
//!
//! # How it fits together
//! Lines own their runs and a shaped-text cache. A layout pass computes
//! break candidates per line, greedily fills soft lines, cuts runs into
//! blocks, then positions and justifies them. Painting walks the resulting
//! views and forwards draw calls to the sink.

/// Bidirectional text analysis.
pub mod bidi;
/// Layout blocks and hit-test results.
pub mod block;
/// Line and word break iterators.
pub mod break_iter;
/// Recoverable errors.
pub mod error;
/// Points, rectangles, margins.
pub mod geometry;
/// The layout engine.
pub mod layout;
/// Line models and soft-line views.
pub mod line;
/// Ranges, locations, selections.
pub mod location;
/// Flattened-text offsets.
pub mod offsets;
/// Painting surface.
pub mod paint;
/// Runs.
pub mod run;
/// Shaped-text cache.
pub mod shaped_cache;
/// Measurement and hit testing over shaped text.
pub mod shaped_util;
/// Shaping backends and glyph sequences.
pub mod shaping;
/// Fonts, colors, run styles.
pub mod style;

pub use bidi::{TextDirection, TextFlowDirection};
pub use block::{BlockDefinition, LayoutBlock, RunHandle, RunRenderer, TextHitPoint};
pub use break_iter::{BreakIterator, LineBreakIterator, WordBreakIterator};
pub use error::{LayoutError, Result};
pub use geometry::{LayoutRect, Margin, Vec2};
pub use layout::{DirtyState, Justification, LayoutConfig, TextLayout, TextLayoutSize};
pub use line::{
    BreakCandidate, LineHighlighter, LineModel, LineView, LineViewHighlight, RunModel,
    TextLineHighlight, TextRunRenderer,
};
pub use location::{TextLocation, TextRange, TextSelection};
pub use offsets::{LINE_TERMINATOR, TextOffsetLocations};
pub use paint::{PaintGeometry, PaintSink, RunPaint, SolidHighlighter};
pub use run::{
    HyperlinkRun, ImageRun, OBJECT_REPLACEMENT_CHAR, Run, RunAttributes, RunTextContext, TextRun,
    WidgetRun,
};
pub use shaped_cache::{ShapedTextCache, ShapedTextCacheKey, ShapedTextCacheStats};
pub use shaping::{
    FontMetrics, MonospaceShaper, ShapedGlyph, ShapedGlyphSequence, ShapedTextContext,
    ShapingMethod, TextShaper,
};
#[cfg(feature = "shaping")]
pub use shaping::RustybuzzShaper;
pub use style::{
    Color, FontFeature, FontFeatures, FontId, FontInfo, HyperlinkStyle, ImageBrush, OutlineStyle,
    ShadowStyle, TextStyle,
};
