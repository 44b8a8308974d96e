#![forbid(unsafe_code)]

//! Text shaping backend and shaped glyph sequences.
//!
//! Shaping converts a range of line text into positioned glyphs: grapheme
//! clustering, ligature substitution, kerning and bidi reordering. The layout
//! engine treats the backend as an opaque, possibly expensive operation and
//! caches its output in [`crate::shaped_cache::ShapedTextCache`].
//!
//! # Architecture
//!
//! ```text
//! Run::measure / hit test / paint
//!     │
//!     ▼
//! ┌──────────────────┐
//! │ ShapedTextCache  │──hit──▶ Rc<ShapedGlyphSequence>
//! └────────┬─────────┘
//!          │ miss / dirty
//!          ▼
//! ┌──────────────────┐
//! │ TextShaper       │  trait (MonospaceShaper | RustybuzzShaper)
//! └────────┬─────────┘
//!          ▼
//!   ShapedGlyphSequence
//! ```
//!
//! Source indices in glyphs are absolute byte offsets into the line text, so
//! a sequence shaped for a whole run can answer questions about any
//! cluster-aligned sub-range of it.
//!
//! # Example
//!
//! ```
//! use glyphflow::bidi::TextDirection;
//! use glyphflow::location::TextRange;
//! use glyphflow::shaping::{MonospaceShaper, ShapingMethod, TextShaper};
//! use glyphflow::style::{FontId, FontInfo};
//!
//! let shaper = MonospaceShaper::new();
//! let font = FontInfo::new(FontId(0), 20.0);
//! let seq = shaper.shape_unidirectional(
//!     "Hello",
//!     TextRange::new(0, 5),
//!     &font,
//!     1.0,
//!     TextDirection::LeftToRight,
//!     ShapingMethod::Auto,
//! );
//! assert_eq!(seq.glyphs().len(), 5);
//! assert_eq!(seq.measured_width(), 50.0);
//! ```

use std::cell::Cell;

use rustc_hash::FxHashMap;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::bidi::{self, TextDirection, TextFlowDirection};
use crate::location::TextRange;
use crate::style::FontInfo;

// ---------------------------------------------------------------------------
// Shaping context
// ---------------------------------------------------------------------------

/// How much shaping work the backend should perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ShapingMethod {
    /// Let the backend decide.
    #[default]
    Auto,
    /// Only apply pairwise kerning; no ligatures or contextual substitution.
    KerningOnly,
    /// Full OpenType shaping.
    FullShaping,
}

/// Parameters shared by every run of a layout that affect shaping output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShapedTextContext {
    pub shaping_method: ShapingMethod,
    pub base_direction: TextFlowDirection,
}

impl ShapedTextContext {
    pub const fn new(shaping_method: ShapingMethod, base_direction: TextFlowDirection) -> Self {
        Self {
            shaping_method,
            base_direction,
        }
    }
}

/// Vertical font metrics in scaled pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FontMetrics {
    /// Distance from the baseline to the top of the line box.
    pub ascent: f32,
    /// Distance from the baseline to the bottom of the line box (positive).
    pub descent: f32,
}

impl FontMetrics {
    #[inline]
    pub const fn new(ascent: f32, descent: f32) -> Self {
        Self { ascent, descent }
    }

    /// `ascent + descent`.
    #[inline]
    pub fn height(&self) -> f32 {
        self.ascent + self.descent
    }
}

// ---------------------------------------------------------------------------
// Shaped output types
// ---------------------------------------------------------------------------

/// A single positioned glyph.
///
/// Metric values are scaled pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapedGlyph {
    /// Glyph ID from the font.
    pub glyph_id: u32,
    /// Absolute byte offset of this glyph's cluster in the line text.
    pub source_index: usize,
    /// Byte length of the cluster.
    pub source_len: usize,
    /// Number of user-perceived characters in the cluster; more than one for
    /// ligatures.
    pub num_chars: u16,
    /// Horizontal advance, excluding kerning.
    pub x_advance: f32,
    /// Horizontal offset from the pen position.
    pub x_offset: f32,
    /// Kerning with the logically preceding glyph.
    pub kerning: i8,
    /// Whether anything is drawn for this glyph.
    pub is_visible: bool,
    pub direction: TextDirection,
}

impl ShapedGlyph {
    /// End of the cluster (exclusive).
    #[inline]
    pub const fn source_end(&self) -> usize {
        self.source_index + self.source_len
    }

    /// Source range covered by this glyph.
    #[inline]
    pub const fn source_range(&self) -> TextRange {
        TextRange {
            begin: self.source_index,
            end: self.source_index + self.source_len,
        }
    }

    /// Whether this glyph covers more than one character.
    #[inline]
    pub const fn is_ligature(&self) -> bool {
        self.num_chars > 1
    }
}

/// A glyph located by [`ShapedGlyphSequence::glyph_at_offset_in`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphHit {
    /// Index into [`ShapedGlyphSequence::glyphs`].
    pub glyph_index: usize,
    /// Left edge, relative to the start of the measured range.
    pub left: f32,
    /// Width including kerning.
    pub width: f32,
}

/// The result of shaping a range of text with one font at one scale.
///
/// Glyphs are stored in visual order. The first logical glyph carries no
/// kerning. A sequence is marked dirty when the font data it was built from
/// is invalidated; caches treat dirty sequences as absent.
#[derive(Debug)]
pub struct ShapedGlyphSequence {
    glyphs: Vec<ShapedGlyph>,
    source_range: TextRange,
    measured_width: f32,
    metrics: FontMetrics,
    dirty: Cell<bool>,
}

impl ShapedGlyphSequence {
    /// Build a sequence from glyphs in visual order.
    pub fn new(glyphs: Vec<ShapedGlyph>, source_range: TextRange, metrics: FontMetrics) -> Self {
        let measured_width = glyphs
            .iter()
            .map(|g| g.x_advance + f32::from(g.kerning))
            .sum();
        Self {
            glyphs,
            source_range,
            measured_width,
            metrics,
            dirty: Cell::new(false),
        }
    }

    /// Glyphs in visual order.
    #[inline]
    pub fn glyphs(&self) -> &[ShapedGlyph] {
        &self.glyphs
    }

    /// Consume the sequence, returning its glyphs.
    pub fn into_glyphs(self) -> Vec<ShapedGlyph> {
        self.glyphs
    }

    #[inline]
    pub fn source_range(&self) -> TextRange {
        self.source_range
    }

    /// Total advance of the sequence.
    #[inline]
    pub fn measured_width(&self) -> f32 {
        self.measured_width
    }

    #[inline]
    pub fn metrics(&self) -> FontMetrics {
        self.metrics
    }

    #[inline]
    pub fn text_height(&self) -> f32 {
        self.metrics.height()
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    /// Flag the sequence as built from stale font data.
    pub fn mark_dirty(&self) {
        self.dirty.set(true);
    }

    /// Whether `range` lies within the sequence and starts and ends on
    /// cluster boundaries.
    pub fn is_cluster_aligned(&self, range: TextRange) -> bool {
        if !self.source_range.encloses(&range) {
            return false;
        }
        self.glyphs.iter().all(|g| {
            let splits_begin = g.source_index < range.begin && range.begin < g.source_end();
            let splits_end = g.source_index < range.end && range.end < g.source_end();
            !splits_begin && !splits_end
        })
    }

    fn glyphs_in(&self, range: TextRange) -> impl Iterator<Item = (usize, &ShapedGlyph)> {
        self.glyphs
            .iter()
            .enumerate()
            .filter(move |(_, g)| range.contains(g.source_index))
    }

    fn width_in_range(glyph: &ShapedGlyph, range: TextRange) -> f32 {
        if glyph.source_index == range.begin {
            glyph.x_advance
        } else {
            glyph.x_advance + f32::from(glyph.kerning)
        }
    }

    /// Width of the glyphs for `range`, excluding kerning with text before it.
    ///
    /// Returns `None` if `range` splits a cluster or leaves the sequence.
    pub fn measured_width_in(&self, range: TextRange) -> Option<f32> {
        if !self.is_cluster_aligned(range) {
            return None;
        }
        Some(
            self.glyphs_in(range)
                .map(|(_, g)| Self::width_in_range(g, range))
                .sum(),
        )
    }

    /// Kerning of the glyph whose cluster starts at `index`.
    pub fn kerning_at(&self, index: usize) -> Option<i8> {
        self.glyphs
            .iter()
            .find(|g| g.source_index == index)
            .map(|g| g.kerning)
    }

    /// Find the glyph under `x`, walking the glyphs of `range` in visual order.
    ///
    /// `x` is relative to the left edge of the range. Returns `None` if `x`
    /// is outside the range's extent or `range` is not cluster aligned.
    pub fn glyph_at_offset_in(&self, range: TextRange, x: f32) -> Option<GlyphHit> {
        if !self.is_cluster_aligned(range) {
            return None;
        }
        let mut pen = 0.0;
        for (glyph_index, glyph) in self.glyphs_in(range) {
            let width = Self::width_in_range(glyph, range);
            if x >= pen && x < pen + width {
                return Some(GlyphHit {
                    glyph_index,
                    left: pen,
                    width,
                });
            }
            pen += width;
        }
        None
    }

    /// Visually leftmost and rightmost glyphs of `range`.
    pub fn edge_glyphs_in(&self, range: TextRange) -> Option<(&ShapedGlyph, &ShapedGlyph)> {
        let mut iter = self.glyphs_in(range).map(|(_, g)| g);
        let first = iter.next()?;
        let last = iter.last().unwrap_or(first);
        Some((first, last))
    }

    /// Extract the glyphs of `range` as a new sequence without re-shaping.
    ///
    /// Only possible for left-to-right glyphs on cluster boundaries.
    pub fn sub_sequence(&self, range: TextRange) -> Option<ShapedGlyphSequence> {
        if range.is_empty() || !self.is_cluster_aligned(range) {
            return None;
        }
        let mut glyphs: Vec<ShapedGlyph> = self.glyphs_in(range).map(|(_, g)| *g).collect();
        if glyphs.is_empty() || glyphs.iter().any(|g| g.direction.is_rtl()) {
            return None;
        }
        for glyph in glyphs.iter_mut().filter(|g| g.source_index == range.begin) {
            glyph.kerning = 0;
        }
        Some(Self::new(glyphs, range, self.metrics))
    }
}

// ---------------------------------------------------------------------------
// TextShaper trait
// ---------------------------------------------------------------------------

/// Abstract text shaping backend.
///
/// `text` is always the full line text and `range` the part to shape, so
/// glyph source indices come out absolute.
pub trait TextShaper {
    /// Shape `text[range]` in a single direction.
    fn shape_unidirectional(
        &self,
        text: &str,
        range: TextRange,
        font: &FontInfo,
        scale: f32,
        direction: TextDirection,
        method: ShapingMethod,
    ) -> ShapedGlyphSequence;

    /// Vertical metrics of `font` at `scale`.
    fn font_metrics(&self, font: &FontInfo, scale: f32) -> FontMetrics;

    /// Shape `text[range]`, splitting it into directional runs first.
    ///
    /// Glyphs of every directional run are concatenated in visual order.
    fn shape_bidirectional(
        &self,
        text: &str,
        range: TextRange,
        font: &FontInfo,
        scale: f32,
        base_direction: TextFlowDirection,
        method: ShapingMethod,
    ) -> ShapedGlyphSequence {
        let mut glyphs = Vec::new();
        for run in bidi::visual_runs(text, range, base_direction) {
            let shaped =
                self.shape_unidirectional(text, run.range, font, scale, run.direction, method);
            glyphs.extend(shaped.into_glyphs());
        }
        ShapedGlyphSequence::new(glyphs, range, self.font_metrics(font, scale))
    }
}

// ---------------------------------------------------------------------------
// MonospaceShaper: deterministic cell-based backend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Ligature {
    sequence: String,
    glyph_id: u32,
}

/// Deterministic shaper for fixed-advance fonts.
///
/// Maps each grapheme cluster to one glyph whose advance is its display
/// width in cells times the cell advance. Wide characters take two cells;
/// whitespace takes one. Optional ligature and kerning-pair tables make the
/// backend useful for exercising ligature and kerning handling without real
/// font data.
///
/// Ligatures are disabled under [`ShapingMethod::KerningOnly`] or when the
/// font requests `liga = 0`.
#[derive(Debug, Clone)]
pub struct MonospaceShaper {
    advance_em: f32,
    ascent_em: f32,
    descent_em: f32,
    ligatures: Vec<Ligature>,
    kerning_pairs: FxHashMap<(char, char), i8>,
}

impl Default for MonospaceShaper {
    fn default() -> Self {
        Self::new()
    }
}

impl MonospaceShaper {
    /// Half-em cells, 0.8em ascent, 0.2em descent.
    pub fn new() -> Self {
        Self {
            advance_em: 0.5,
            ascent_em: 0.8,
            descent_em: 0.2,
            ligatures: Vec::new(),
            kerning_pairs: FxHashMap::default(),
        }
    }

    /// Builder: cell advance as a fraction of the font size.
    #[must_use]
    pub fn with_advance_em(mut self, advance_em: f32) -> Self {
        self.advance_em = advance_em;
        self
    }

    /// Builder: ascent and descent as fractions of the font size.
    #[must_use]
    pub fn with_metrics(mut self, ascent_em: f32, descent_em: f32) -> Self {
        self.ascent_em = ascent_em;
        self.descent_em = descent_em;
        self
    }

    /// Builder: substitute `sequence` with a single glyph.
    ///
    /// Longer sequences take priority over shorter ones.
    #[must_use]
    pub fn with_ligature(mut self, sequence: &str, glyph_id: u32) -> Self {
        if !sequence.is_empty() {
            self.ligatures.push(Ligature {
                sequence: sequence.to_owned(),
                glyph_id,
            });
            self.ligatures
                .sort_by(|a, b| b.sequence.len().cmp(&a.sequence.len()));
        }
        self
    }

    /// Builder: kern `right` by `pixels` (unscaled) when it follows `left`.
    #[must_use]
    pub fn with_kerning_pair(mut self, left: char, right: char, pixels: i8) -> Self {
        self.kerning_pairs.insert((left, right), pixels);
        self
    }

    /// Width of one cell in scaled pixels.
    #[inline]
    pub fn cell_width(&self, font: &FontInfo, scale: f32) -> f32 {
        font.size_px() * self.advance_em * scale
    }

    fn kerning(&self, left: Option<char>, right: char, scale: f32) -> i8 {
        let Some(left) = left else {
            return 0;
        };
        self.kerning_pairs
            .get(&(left, right))
            .map_or(0, |&px| (f32::from(px) * scale).round().clamp(-128.0, 127.0) as i8)
    }

    /// Match a ligature at grapheme `start`; returns (glyph id, grapheme count).
    fn match_ligature(
        &self,
        graphemes: &[(usize, &str)],
        start: usize,
        slice: &str,
    ) -> Option<(u32, usize)> {
        let rest = &slice[graphemes[start].0..];
        self.ligatures.iter().find_map(|lig| {
            if !rest.starts_with(lig.sequence.as_str()) {
                return None;
            }
            let mut consumed = 0;
            let mut count = 0;
            for (_, g) in &graphemes[start..] {
                if consumed >= lig.sequence.len() {
                    break;
                }
                consumed += g.len();
                count += 1;
            }
            // Ligatures never split a grapheme cluster.
            (consumed == lig.sequence.len() && count > 1).then_some((lig.glyph_id, count))
        })
    }
}

/// Display width of a grapheme in cells.
fn grapheme_cells(grapheme: &str) -> usize {
    if grapheme.chars().all(char::is_whitespace) {
        return 1;
    }
    grapheme.width()
}

impl TextShaper for MonospaceShaper {
    fn shape_unidirectional(
        &self,
        text: &str,
        range: TextRange,
        font: &FontInfo,
        scale: f32,
        direction: TextDirection,
        method: ShapingMethod,
    ) -> ShapedGlyphSequence {
        let slice = &text[range.as_range()];
        let cell = self.cell_width(font, scale);
        let ligatures_enabled = method != ShapingMethod::KerningOnly
            && font.features.value_of(*b"liga") != Some(0)
            && !self.ligatures.is_empty();

        let graphemes: Vec<(usize, &str)> = slice.grapheme_indices(true).collect();
        let mut glyphs = Vec::with_capacity(graphemes.len());
        let mut previous_char = None;
        let mut i = 0;

        while i < graphemes.len() {
            let (offset, grapheme) = graphemes[i];
            let ligature = if ligatures_enabled {
                self.match_ligature(&graphemes, i, slice)
            } else {
                None
            };
            let (glyph_id, count) = ligature.unwrap_or_else(|| {
                let first = grapheme.chars().next().unwrap_or('\0');
                (first as u32, 1)
            });

            let cluster = &graphemes[i..i + count];
            let source_len: usize = cluster.iter().map(|(_, g)| g.len()).sum();
            let cells: usize = cluster.iter().map(|(_, g)| grapheme_cells(g)).sum();
            let cluster_text = &slice[offset..offset + source_len];
            let first_char = cluster_text.chars().next().unwrap_or('\0');

            glyphs.push(ShapedGlyph {
                glyph_id,
                source_index: range.begin + offset,
                source_len,
                num_chars: count as u16,
                x_advance: cells as f32 * cell,
                x_offset: 0.0,
                kerning: self.kerning(previous_char, first_char, scale),
                is_visible: !cluster_text.chars().all(char::is_whitespace),
                direction,
            });

            previous_char = cluster_text.chars().next_back();
            i += count;
        }

        if direction.is_rtl() {
            glyphs.reverse();
        }

        ShapedGlyphSequence::new(glyphs, range, self.font_metrics(font, scale))
    }

    fn font_metrics(&self, font: &FontInfo, scale: f32) -> FontMetrics {
        let px = font.size_px() * scale;
        FontMetrics::new(px * self.ascent_em, px * self.descent_em)
    }
}

// ---------------------------------------------------------------------------
// RustybuzzShaper: OpenType backend (feature-gated)
// ---------------------------------------------------------------------------

#[cfg(feature = "shaping")]
mod rustybuzz_backend {
    use super::*;
    use crate::style::FontFeature;

    /// HarfBuzz-compatible shaper using the rustybuzz pure-Rust engine.
    ///
    /// Wraps one `rustybuzz::Face`; every [`FontInfo`] is shaped with that
    /// face at the requested size. Kerning is folded into the advances by
    /// the engine, so glyphs report zero explicit kerning.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let font_data: &'static [u8] = include_bytes!("path/to/font.ttf");
    /// let face = rustybuzz::Face::from_slice(font_data, 0).unwrap();
    /// let shaper = RustybuzzShaper::new(face);
    /// ```
    pub struct RustybuzzShaper {
        face: rustybuzz::Face<'static>,
    }

    impl RustybuzzShaper {
        /// Create a shaper from a rustybuzz face.
        pub fn new(face: rustybuzz::Face<'static>) -> Self {
            Self { face }
        }

        fn px_per_unit(&self, font: &FontInfo, scale: f32) -> f32 {
            font.size_px() * scale / f32::from(self.face.units_per_em())
        }

        fn to_rb_direction(direction: TextDirection) -> rustybuzz::Direction {
            match direction {
                TextDirection::LeftToRight => rustybuzz::Direction::LeftToRight,
                TextDirection::RightToLeft => rustybuzz::Direction::RightToLeft,
            }
        }

        fn to_rb_feature(feature: &FontFeature) -> rustybuzz::Feature {
            let tag = rustybuzz::ttf_parser::Tag::from_bytes(&feature.tag);
            rustybuzz::Feature::new(tag, feature.value, ..)
        }
    }

    impl TextShaper for RustybuzzShaper {
        fn shape_unidirectional(
            &self,
            text: &str,
            range: TextRange,
            font: &FontInfo,
            scale: f32,
            direction: TextDirection,
            method: ShapingMethod,
        ) -> ShapedGlyphSequence {
            let slice = &text[range.as_range()];
            let mut buffer = rustybuzz::UnicodeBuffer::new();
            buffer.push_str(slice);
            buffer.set_direction(Self::to_rb_direction(direction));

            let mut features: Vec<rustybuzz::Feature> =
                font.features.iter().map(Self::to_rb_feature).collect();
            if method == ShapingMethod::KerningOnly {
                for tag in [*b"liga", *b"clig", *b"calt"] {
                    features.push(Self::to_rb_feature(&FontFeature::disabled(tag)));
                }
            }

            let output = rustybuzz::shape(&self.face, &features, buffer);
            let infos = output.glyph_infos();
            let positions = output.glyph_positions();

            let mut cluster_starts: Vec<usize> =
                infos.iter().map(|info| info.cluster as usize).collect();
            cluster_starts.sort_unstable();
            cluster_starts.dedup();

            let ppu = self.px_per_unit(font, scale);
            let mut glyphs = Vec::with_capacity(infos.len());
            for (info, pos) in infos.iter().zip(positions.iter()) {
                let start = info.cluster as usize;
                let next = cluster_starts.partition_point(|&s| s <= start);
                let end = cluster_starts.get(next).copied().unwrap_or(slice.len());
                let cluster_text = &slice[start..end];

                glyphs.push(ShapedGlyph {
                    glyph_id: info.glyph_id,
                    source_index: range.begin + start,
                    source_len: end - start,
                    num_chars: cluster_text.graphemes(true).count().max(1) as u16,
                    x_advance: pos.x_advance as f32 * ppu,
                    x_offset: pos.x_offset as f32 * ppu,
                    kerning: 0,
                    is_visible: !cluster_text.chars().all(char::is_whitespace),
                    direction,
                });
            }

            ShapedGlyphSequence::new(glyphs, range, self.font_metrics(font, scale))
        }

        fn font_metrics(&self, font: &FontInfo, scale: f32) -> FontMetrics {
            let ppu = self.px_per_unit(font, scale);
            FontMetrics::new(
                f32::from(self.face.ascender()) * ppu,
                -f32::from(self.face.descender()) * ppu,
            )
        }
    }
}

#[cfg(feature = "shaping")]
pub use rustybuzz_backend::RustybuzzShaper;

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{FontFeature, FontFeatures, FontId};

    fn font() -> FontInfo {
        FontInfo::new(FontId(0), 20.0)
    }

    fn shape(shaper: &MonospaceShaper, text: &str, direction: TextDirection) -> ShapedGlyphSequence {
        shaper.shape_unidirectional(
            text,
            TextRange::new(0, text.len()),
            &font(),
            1.0,
            direction,
            ShapingMethod::Auto,
        )
    }

    // -----------------------------------------------------------------------
    // MonospaceShaper
    // -----------------------------------------------------------------------

    #[test]
    fn monospace_advances_by_cells() {
        let seq = shape(&MonospaceShaper::new(), "ab 你", TextDirection::LeftToRight);
        let advances: Vec<f32> = seq.glyphs().iter().map(|g| g.x_advance).collect();
        assert_eq!(advances, vec![10.0, 10.0, 10.0, 20.0]);
        assert_eq!(seq.measured_width(), 50.0);
        assert!(!seq.glyphs()[2].is_visible);
    }

    #[test]
    fn monospace_metrics_follow_font_size_and_scale() {
        let metrics = MonospaceShaper::new().font_metrics(&font(), 2.0);
        assert_eq!(metrics.ascent, 32.0);
        assert_eq!(metrics.descent, 8.0);
        assert_eq!(metrics.height(), 40.0);
    }

    #[test]
    fn monospace_source_indices_are_absolute() {
        let shaper = MonospaceShaper::new();
        let seq = shaper.shape_unidirectional(
            "xxabc",
            TextRange::new(2, 5),
            &font(),
            1.0,
            TextDirection::LeftToRight,
            ShapingMethod::Auto,
        );
        let indices: Vec<usize> = seq.glyphs().iter().map(|g| g.source_index).collect();
        assert_eq!(indices, vec![2, 3, 4]);
    }

    #[test]
    fn monospace_rtl_reverses_visual_order() {
        let seq = shape(&MonospaceShaper::new(), "abc", TextDirection::RightToLeft);
        let indices: Vec<usize> = seq.glyphs().iter().map(|g| g.source_index).collect();
        assert_eq!(indices, vec![2, 1, 0]);
    }

    #[test]
    fn ligature_forms_single_glyph() {
        let shaper = MonospaceShaper::new().with_ligature("ffi", 0xFB03);
        let seq = shape(&shaper, "office", TextDirection::LeftToRight);
        assert_eq!(seq.glyphs().len(), 4);
        let lig = seq.glyphs()[1];
        assert_eq!(lig.glyph_id, 0xFB03);
        assert_eq!(lig.source_index, 1);
        assert_eq!(lig.source_len, 3);
        assert_eq!(lig.num_chars, 3);
        assert!(lig.is_ligature());
        assert_eq!(lig.x_advance, 30.0);
    }

    #[test]
    fn ligatures_disabled_for_kerning_only_and_liga_off() {
        let shaper = MonospaceShaper::new().with_ligature("fi", 1);
        let seq = shaper.shape_unidirectional(
            "fi",
            TextRange::new(0, 2),
            &font(),
            1.0,
            TextDirection::LeftToRight,
            ShapingMethod::KerningOnly,
        );
        assert_eq!(seq.glyphs().len(), 2);

        let no_liga =
            font().with_features(FontFeatures::from_slice(&[FontFeature::disabled(*b"liga")]));
        let seq = shaper.shape_unidirectional(
            "fi",
            TextRange::new(0, 2),
            &no_liga,
            1.0,
            TextDirection::LeftToRight,
            ShapingMethod::Auto,
        );
        assert_eq!(seq.glyphs().len(), 2);
    }

    #[test]
    fn longest_ligature_wins() {
        let shaper = MonospaceShaper::new()
            .with_ligature("ff", 1)
            .with_ligature("ffi", 2);
        let seq = shape(&shaper, "ffi", TextDirection::LeftToRight);
        assert_eq!(seq.glyphs().len(), 1);
        assert_eq!(seq.glyphs()[0].glyph_id, 2);
    }

    #[test]
    fn kerning_pairs_apply_to_following_glyph() {
        let shaper = MonospaceShaper::new().with_kerning_pair('A', 'V', -2);
        let seq = shape(&shaper, "AVA", TextDirection::LeftToRight);
        let kerning: Vec<i8> = seq.glyphs().iter().map(|g| g.kerning).collect();
        assert_eq!(kerning, vec![0, -2, 0]);
        assert_eq!(seq.measured_width(), 28.0);
        assert_eq!(seq.kerning_at(1), Some(-2));
        assert_eq!(seq.kerning_at(7), None);
    }

    // -----------------------------------------------------------------------
    // ShapedGlyphSequence queries
    // -----------------------------------------------------------------------

    #[test]
    fn measured_width_in_sub_ranges() {
        let shaper = MonospaceShaper::new().with_kerning_pair('A', 'V', -2);
        let seq = shape(&shaper, "AVAB", TextDirection::LeftToRight);
        // Kerning of the first glyph in the range is excluded.
        assert_eq!(seq.measured_width_in(TextRange::new(1, 3)), Some(20.0));
        assert_eq!(seq.measured_width_in(TextRange::new(0, 2)), Some(18.0));
        assert_eq!(seq.measured_width_in(TextRange::empty_at(2)), Some(0.0));
        assert_eq!(seq.measured_width_in(TextRange::new(2, 9)), None);
    }

    #[test]
    fn measured_width_in_rejects_split_ligature() {
        let shaper = MonospaceShaper::new().with_ligature("ffi", 7);
        let seq = shape(&shaper, "ffix", TextDirection::LeftToRight);
        assert_eq!(seq.measured_width_in(TextRange::new(0, 3)), Some(30.0));
        assert_eq!(seq.measured_width_in(TextRange::new(1, 4)), None);
        assert_eq!(seq.measured_width_in(TextRange::new(0, 2)), None);
    }

    #[test]
    fn glyph_at_offset_walks_visual_order() {
        let seq = shape(&MonospaceShaper::new(), "abc", TextDirection::RightToLeft);
        let hit = seq.glyph_at_offset_in(TextRange::new(0, 3), 5.0).unwrap();
        // Leftmost visual glyph of an RTL run is the logical last.
        assert_eq!(seq.glyphs()[hit.glyph_index].source_index, 2);
        assert_eq!(hit.left, 0.0);
        assert_eq!(hit.width, 10.0);

        let hit = seq.glyph_at_offset_in(TextRange::new(0, 3), 25.0).unwrap();
        assert_eq!(seq.glyphs()[hit.glyph_index].source_index, 0);
        assert!(seq.glyph_at_offset_in(TextRange::new(0, 3), 30.0).is_none());
        assert!(seq.glyph_at_offset_in(TextRange::new(0, 3), -1.0).is_none());
    }

    #[test]
    fn sub_sequence_is_ltr_only() {
        let shaper = MonospaceShaper::new().with_kerning_pair('b', 'c', 3);
        let seq = shape(&shaper, "abcd", TextDirection::LeftToRight);
        let sub = seq.sub_sequence(TextRange::new(2, 4)).unwrap();
        assert_eq!(sub.source_range(), TextRange::new(2, 4));
        assert_eq!(sub.glyphs().len(), 2);
        assert_eq!(sub.glyphs()[0].kerning, 0);
        assert_eq!(sub.measured_width(), 20.0);

        let rtl = shape(&shaper, "abcd", TextDirection::RightToLeft);
        assert!(rtl.sub_sequence(TextRange::new(1, 3)).is_none());
        assert!(seq.sub_sequence(TextRange::empty_at(1)).is_none());
    }

    #[test]
    fn dirty_flag_is_shared_through_reference() {
        let seq = shape(&MonospaceShaper::new(), "a", TextDirection::LeftToRight);
        assert!(!seq.is_dirty());
        let shared = &seq;
        shared.mark_dirty();
        assert!(seq.is_dirty());
    }

    #[test]
    fn bidirectional_shaping_concatenates_runs() {
        let text = "ab \u{05d0}\u{05d1}";
        let seq = MonospaceShaper::new().shape_bidirectional(
            text,
            TextRange::new(0, text.len()),
            &font(),
            1.0,
            TextFlowDirection::LeftToRight,
            ShapingMethod::Auto,
        );
        assert_eq!(seq.glyphs().len(), 5);
        assert_eq!(seq.glyphs()[0].direction, TextDirection::LeftToRight);
        assert_eq!(seq.glyphs()[3].direction, TextDirection::RightToLeft);
        // Hebrew letters are two bytes each; visually reversed.
        assert_eq!(seq.glyphs()[3].source_index, 5);
        assert_eq!(seq.glyphs()[4].source_index, 3);
        assert_eq!(seq.measured_width(), 50.0);
    }
}
