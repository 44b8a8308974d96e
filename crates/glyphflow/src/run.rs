#![forbid(unsafe_code)]

//! Runs: styled spans of one line's text.
//!
//! Every run of a line shares the line's backing text (`Rc<str>`) and covers
//! a contiguous byte range of it. Text runs measure themselves through the
//! line's [`ShapedTextCache`]; widget and image runs cover a single
//! placeholder character and report a fixed size.

use std::fmt;
use std::rc::Rc;

use crate::bidi::{self, TextDirection};
use crate::block::{BlockDefinition, LayoutBlock, TextHitPoint};
use crate::geometry::{LayoutRect, Vec2};
use crate::location::TextRange;
use crate::paint::{PaintGeometry, PaintSink, RunPaint};
use crate::shaped_cache::{ShapedTextCache, ShapedTextCacheKey};
use crate::shaped_util::{
    find_character_index_at_offset, get_shaped_glyph_kerning, get_shaped_text_sub_sequence,
    measure_shaped_text,
};
use crate::shaping::ShapedTextContext;
use crate::style::{HyperlinkStyle, ImageBrush, TextStyle};

/// Character standing in for widgets and images in line text.
pub const OBJECT_REPLACEMENT_CHAR: char = '\u{FFFC}';

bitflags::bitflags! {
    /// Capabilities of a run.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RunAttributes: u8 {
        /// Text may be inserted into the run.
        const SUPPORTS_TEXT = 0b0001;
    }
}

/// Per-line state a run needs to answer shaping questions.
pub struct RunTextContext<'a> {
    pub cache: &'a mut ShapedTextCache,
    pub text_context: ShapedTextContext,
}

impl<'a> RunTextContext<'a> {
    pub fn new(cache: &'a mut ShapedTextCache, text_context: ShapedTextContext) -> Self {
        Self {
            cache,
            text_context,
        }
    }
}

/// A styled span of text, or an embedded object, within one line.
///
/// Indices are byte offsets into [`Run::text`] and must lie within
/// [`Run::text_range`]; violating that is a bug and panics.
pub trait Run: fmt::Debug {
    fn text_range(&self) -> TextRange;

    /// Adjust the run's extent without touching its text.
    fn set_text_range(&mut self, range: TextRange);

    /// The line text this run points into.
    fn text(&self) -> &Rc<str>;

    fn attributes(&self) -> RunAttributes;

    /// Distance from the top of the run to its baseline, scaled.
    fn ascent(&self, scale: f32, ctx: &mut RunTextContext<'_>) -> f32;

    /// Distance from the baseline to the bottom of the run, scaled.
    fn descent(&self, scale: f32, ctx: &mut RunTextContext<'_>) -> f32;

    fn max_height(&self, scale: f32, ctx: &mut RunTextContext<'_>) -> f32 {
        self.ascent(scale, ctx) + self.descent(scale, ctx)
    }

    /// Size of `[begin, end)`. Empty ranges have no width but full height.
    fn measure(&self, begin: usize, end: usize, scale: f32, ctx: &mut RunTextContext<'_>) -> Vec2;

    /// Kerning between the character at `index` and the previous one.
    fn kerning(&self, index: usize, scale: f32, ctx: &mut RunTextContext<'_>) -> i8;

    fn create_block(
        &self,
        definition: &BlockDefinition,
        size: Vec2,
        text_context: ShapedTextContext,
    ) -> LayoutBlock;

    /// Character index under `location`, or `None` outside the block.
    fn text_index_at(
        &self,
        block: &LayoutBlock,
        location: Vec2,
        scale: f32,
        ctx: &mut RunTextContext<'_>,
    ) -> Option<(usize, TextHitPoint)>;

    /// Layout-space position of `offset`, or `None` outside the block.
    fn location_at(
        &self,
        block: &LayoutBlock,
        offset: usize,
        scale: f32,
        ctx: &mut RunTextContext<'_>,
    ) -> Option<Vec2>;

    /// Point the run at new text.
    fn move_to(&mut self, text: Rc<str>, range: TextRange);

    fn clone_run(&self) -> Box<dyn Run>;

    fn append_text_to(&self, out: &mut String) {
        out.push_str(&self.text()[self.text_range().as_range()]);
    }

    fn append_text_range_to(&self, out: &mut String, range: TextRange) {
        assert_enclosed(self.text_range(), range);
        out.push_str(&self.text()[range.as_range()]);
    }

    fn begin_layout(&mut self) {}

    fn end_layout(&mut self) {}

    fn painter(&self) -> Option<&dyn RunPaint> {
        None
    }
}

#[track_caller]
fn assert_valid_range(text: &str, range: TextRange) {
    assert!(
        range.end <= text.len(),
        "run range {range} exceeds text length {}",
        text.len()
    );
    assert!(
        text.is_char_boundary(range.begin) && text.is_char_boundary(range.end),
        "run range {range} splits a character"
    );
}

#[track_caller]
fn assert_enclosed(outer: TextRange, inner: TextRange) {
    assert!(outer.encloses(&inner), "range {inner} outside run {outer}");
}

// ---------------------------------------------------------------------------
// TextRun
// ---------------------------------------------------------------------------

/// Plain styled text.
#[derive(Debug, Clone)]
pub struct TextRun {
    text: Rc<str>,
    range: TextRange,
    style: TextStyle,
}

impl TextRun {
    #[track_caller]
    pub fn new(text: Rc<str>, range: TextRange, style: TextStyle) -> Self {
        assert_valid_range(&text, range);
        Self { text, range, style }
    }

    /// A run covering all of `text`.
    pub fn whole(text: Rc<str>, style: TextStyle) -> Self {
        let range = TextRange::new(0, text.len());
        Self::new(text, range, style)
    }

    #[inline]
    pub fn style(&self) -> &TextStyle {
        &self.style
    }

    fn cache_key(&self, scale: f32, text_context: ShapedTextContext) -> ShapedTextCacheKey {
        ShapedTextCacheKey::new(self.range, scale, text_context, self.style.font.clone())
    }
}

impl Run for TextRun {
    fn text_range(&self) -> TextRange {
        self.range
    }

    #[track_caller]
    fn set_text_range(&mut self, range: TextRange) {
        assert_valid_range(&self.text, range);
        self.range = range;
    }

    fn text(&self) -> &Rc<str> {
        &self.text
    }

    fn attributes(&self) -> RunAttributes {
        RunAttributes::SUPPORTS_TEXT
    }

    fn ascent(&self, scale: f32, ctx: &mut RunTextContext<'_>) -> f32 {
        ctx.cache.shaper().font_metrics(&self.style.font, scale).ascent
    }

    fn descent(&self, scale: f32, ctx: &mut RunTextContext<'_>) -> f32 {
        ctx.cache.shaper().font_metrics(&self.style.font, scale).descent
    }

    fn measure(&self, begin: usize, end: usize, scale: f32, ctx: &mut RunTextContext<'_>) -> Vec2 {
        let range = TextRange::new(begin, end);
        assert_enclosed(self.range, range);
        if range.is_empty() {
            return Vec2::height_only(self.max_height(scale, ctx));
        }
        let key = self.cache_key(scale, ctx.text_context);
        measure_shaped_text(ctx.cache, &key, range, &self.text)
    }

    fn kerning(&self, index: usize, scale: f32, ctx: &mut RunTextContext<'_>) -> i8 {
        if index <= self.range.begin || index >= self.range.end {
            return 0;
        }
        let key = self.cache_key(scale, ctx.text_context);
        get_shaped_glyph_kerning(ctx.cache, &key, index, &self.text)
    }

    fn create_block(
        &self,
        definition: &BlockDefinition,
        size: Vec2,
        text_context: ShapedTextContext,
    ) -> LayoutBlock {
        let direction =
            bidi::dominant_direction(&self.text, definition.range, text_context.base_direction);
        LayoutBlock::new(definition, size, text_context, direction)
    }

    fn text_index_at(
        &self,
        block: &LayoutBlock,
        location: Vec2,
        scale: f32,
        ctx: &mut RunTextContext<'_>,
    ) -> Option<(usize, TextHitPoint)> {
        if !block.rect().contains(location) {
            return None;
        }
        let range = block.text_range();
        let key = self.cache_key(scale, block.text_context());
        let index = find_character_index_at_offset(
            ctx.cache,
            &key,
            range,
            &self.text,
            location.x - block.location_offset().x,
        );
        let hit = if index == range.end {
            TextHitPoint::RightGutter
        } else {
            TextHitPoint::WithinText
        };
        Some((index, hit))
    }

    fn location_at(
        &self,
        block: &LayoutBlock,
        offset: usize,
        scale: f32,
        ctx: &mut RunTextContext<'_>,
    ) -> Option<Vec2> {
        let range = block.text_range();
        if !range.inclusive_contains(offset) {
            return None;
        }
        let measured = if block.direction().is_rtl() {
            TextRange::new(offset, range.end)
        } else {
            TextRange::new(range.begin, offset)
        };
        let width = if measured.is_empty() {
            0.0
        } else {
            let key = self.cache_key(scale, block.text_context());
            measure_shaped_text(ctx.cache, &key, measured, &self.text).x
        };
        let origin = block.location_offset();
        Some(Vec2::new(origin.x + width, origin.y))
    }

    #[track_caller]
    fn move_to(&mut self, text: Rc<str>, range: TextRange) {
        assert_valid_range(&text, range);
        self.text = text;
        self.range = range;
    }

    fn clone_run(&self) -> Box<dyn Run> {
        Box::new(self.clone())
    }

    fn painter(&self) -> Option<&dyn RunPaint> {
        Some(self)
    }
}

impl RunPaint for TextRun {
    fn paint(
        &self,
        block: &LayoutBlock,
        geometry: &PaintGeometry,
        ctx: &mut RunTextContext<'_>,
        sink: &mut dyn PaintSink,
    ) {
        let range = block.text_range();
        if range.is_empty() {
            return;
        }
        let key = self.cache_key(geometry.scale, block.text_context());
        let glyphs =
            get_shaped_text_sub_sequence(ctx.cache, &key, range, &self.text, block.direction());
        let origin = geometry.block_rect(block).origin;
        if let Some(shadow) = self.style.shadow {
            sink.draw_shaped_text(&glyphs, origin + shadow.offset * geometry.scale, shadow.color, None);
        }
        sink.draw_shaped_text(&glyphs, origin, self.style.color, self.style.outline);
    }
}

// ---------------------------------------------------------------------------
// HyperlinkRun
// ---------------------------------------------------------------------------

/// Text that links somewhere; painted with an underline.
#[derive(Debug, Clone)]
pub struct HyperlinkRun {
    inner: TextRun,
    url: String,
    style: HyperlinkStyle,
}

impl HyperlinkRun {
    #[track_caller]
    pub fn new(text: Rc<str>, range: TextRange, url: impl Into<String>, style: HyperlinkStyle) -> Self {
        Self {
            inner: TextRun::new(text, range, style.text.clone()),
            url: url.into(),
            style,
        }
    }

    #[inline]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[inline]
    pub fn style(&self) -> &HyperlinkStyle {
        &self.style
    }
}

impl Run for HyperlinkRun {
    fn text_range(&self) -> TextRange {
        self.inner.text_range()
    }

    fn set_text_range(&mut self, range: TextRange) {
        self.inner.set_text_range(range);
    }

    fn text(&self) -> &Rc<str> {
        self.inner.text()
    }

    fn attributes(&self) -> RunAttributes {
        self.inner.attributes()
    }

    fn ascent(&self, scale: f32, ctx: &mut RunTextContext<'_>) -> f32 {
        self.inner.ascent(scale, ctx)
    }

    fn descent(&self, scale: f32, ctx: &mut RunTextContext<'_>) -> f32 {
        self.inner.descent(scale, ctx)
    }

    fn measure(&self, begin: usize, end: usize, scale: f32, ctx: &mut RunTextContext<'_>) -> Vec2 {
        self.inner.measure(begin, end, scale, ctx)
    }

    fn kerning(&self, index: usize, scale: f32, ctx: &mut RunTextContext<'_>) -> i8 {
        self.inner.kerning(index, scale, ctx)
    }

    fn create_block(
        &self,
        definition: &BlockDefinition,
        size: Vec2,
        text_context: ShapedTextContext,
    ) -> LayoutBlock {
        self.inner.create_block(definition, size, text_context)
    }

    fn text_index_at(
        &self,
        block: &LayoutBlock,
        location: Vec2,
        scale: f32,
        ctx: &mut RunTextContext<'_>,
    ) -> Option<(usize, TextHitPoint)> {
        self.inner.text_index_at(block, location, scale, ctx)
    }

    fn location_at(
        &self,
        block: &LayoutBlock,
        offset: usize,
        scale: f32,
        ctx: &mut RunTextContext<'_>,
    ) -> Option<Vec2> {
        self.inner.location_at(block, offset, scale, ctx)
    }

    fn move_to(&mut self, text: Rc<str>, range: TextRange) {
        self.inner.move_to(text, range);
    }

    fn clone_run(&self) -> Box<dyn Run> {
        Box::new(self.clone())
    }

    fn painter(&self) -> Option<&dyn RunPaint> {
        Some(self)
    }
}

impl RunPaint for HyperlinkRun {
    fn paint(
        &self,
        block: &LayoutBlock,
        geometry: &PaintGeometry,
        ctx: &mut RunTextContext<'_>,
        sink: &mut dyn PaintSink,
    ) {
        self.inner.paint(block, geometry, ctx, sink);
        if block.text_range().is_empty() {
            return;
        }
        let rect = geometry.block_rect(block);
        let baseline = rect.top() + self.inner.ascent(geometry.scale, ctx);
        let thickness = self.style.underline_thickness * geometry.scale;
        let underline = LayoutRect::new(
            Vec2::new(rect.left(), baseline + thickness),
            Vec2::new(rect.size.x, thickness),
        );
        sink.draw_box(underline, self.style.underline_color);
    }
}

// ---------------------------------------------------------------------------
// Opaque runs
// ---------------------------------------------------------------------------

fn opaque_text_index_at(block: &LayoutBlock, location: Vec2) -> Option<(usize, TextHitPoint)> {
    let rect = block.rect();
    if !rect.contains(location) {
        return None;
    }
    let range = block.text_range();
    if location.x <= rect.left() + rect.size.x * 0.5 {
        Some((range.begin, TextHitPoint::WithinText))
    } else {
        Some((range.end, TextHitPoint::RightGutter))
    }
}

fn opaque_location_at(block: &LayoutBlock, offset: usize) -> Option<Vec2> {
    let range = block.text_range();
    let origin = block.location_offset();
    if offset == range.begin {
        Some(origin)
    } else if offset == range.end {
        Some(Vec2::new(origin.x + block.size().x, origin.y))
    } else {
        None
    }
}

/// An embedded host widget occupying one placeholder character.
#[derive(Debug, Clone)]
pub struct WidgetRun {
    text: Rc<str>,
    range: TextRange,
    widget_id: u64,
    size: Vec2,
    baseline: f32,
}

impl WidgetRun {
    /// `size` and `baseline` are unscaled; `baseline` is measured up from
    /// the bottom of the widget.
    #[track_caller]
    pub fn new(text: Rc<str>, range: TextRange, widget_id: u64, size: Vec2, baseline: f32) -> Self {
        assert_valid_range(&text, range);
        Self {
            text,
            range,
            widget_id,
            size,
            baseline,
        }
    }

    #[inline]
    pub fn widget_id(&self) -> u64 {
        self.widget_id
    }

    fn object_size(&self) -> Vec2 {
        self.size
    }
}

/// An inline image occupying one placeholder character.
#[derive(Debug, Clone)]
pub struct ImageRun {
    text: Rc<str>,
    range: TextRange,
    brush: ImageBrush,
    baseline: f32,
}

impl ImageRun {
    /// `baseline` is unscaled and measured up from the bottom of the image.
    #[track_caller]
    pub fn new(text: Rc<str>, range: TextRange, brush: ImageBrush, baseline: f32) -> Self {
        assert_valid_range(&text, range);
        Self {
            text,
            range,
            brush,
            baseline,
        }
    }

    #[inline]
    pub fn brush(&self) -> &ImageBrush {
        &self.brush
    }

    fn object_size(&self) -> Vec2 {
        self.brush.size
    }
}

macro_rules! impl_opaque_run {
    ($ty:ident) => {
        impl Run for $ty {
            fn text_range(&self) -> TextRange {
                self.range
            }

            #[track_caller]
            fn set_text_range(&mut self, range: TextRange) {
                assert_valid_range(&self.text, range);
                self.range = range;
            }

            fn text(&self) -> &Rc<str> {
                &self.text
            }

            fn attributes(&self) -> RunAttributes {
                RunAttributes::empty()
            }

            fn ascent(&self, scale: f32, _ctx: &mut RunTextContext<'_>) -> f32 {
                (self.object_size().y - self.baseline) * scale
            }

            fn descent(&self, scale: f32, _ctx: &mut RunTextContext<'_>) -> f32 {
                self.baseline * scale
            }

            fn measure(
                &self,
                begin: usize,
                end: usize,
                scale: f32,
                ctx: &mut RunTextContext<'_>,
            ) -> Vec2 {
                assert_enclosed(self.range, TextRange::new(begin, end));
                if begin == end {
                    return Vec2::height_only(self.max_height(scale, ctx));
                }
                self.object_size() * scale
            }

            fn kerning(&self, _index: usize, _scale: f32, _ctx: &mut RunTextContext<'_>) -> i8 {
                0
            }

            fn create_block(
                &self,
                definition: &BlockDefinition,
                size: Vec2,
                text_context: ShapedTextContext,
            ) -> LayoutBlock {
                LayoutBlock::new(definition, size, text_context, TextDirection::LeftToRight)
            }

            fn text_index_at(
                &self,
                block: &LayoutBlock,
                location: Vec2,
                _scale: f32,
                _ctx: &mut RunTextContext<'_>,
            ) -> Option<(usize, TextHitPoint)> {
                opaque_text_index_at(block, location)
            }

            fn location_at(
                &self,
                block: &LayoutBlock,
                offset: usize,
                _scale: f32,
                _ctx: &mut RunTextContext<'_>,
            ) -> Option<Vec2> {
                opaque_location_at(block, offset)
            }

            #[track_caller]
            fn move_to(&mut self, text: Rc<str>, range: TextRange) {
                assert_valid_range(&text, range);
                self.text = text;
                self.range = range;
            }

            fn clone_run(&self) -> Box<dyn Run> {
                Box::new(self.clone())
            }

            fn painter(&self) -> Option<&dyn RunPaint> {
                Some(self)
            }
        }
    };
}

impl_opaque_run!(WidgetRun);
impl_opaque_run!(ImageRun);

impl RunPaint for WidgetRun {
    fn paint(
        &self,
        block: &LayoutBlock,
        geometry: &PaintGeometry,
        _ctx: &mut RunTextContext<'_>,
        sink: &mut dyn PaintSink,
    ) {
        sink.draw_widget(self.widget_id, geometry.block_rect(block));
    }
}

impl RunPaint for ImageRun {
    fn paint(
        &self,
        block: &LayoutBlock,
        geometry: &PaintGeometry,
        _ctx: &mut RunTextContext<'_>,
        sink: &mut dyn PaintSink,
    ) {
        sink.draw_image(&self.brush, geometry.block_rect(block));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::RunHandle;
    use crate::shaping::MonospaceShaper;
    use crate::style::{FontId, FontInfo};

    fn style() -> TextStyle {
        TextStyle::new(FontInfo::new(FontId(0), 20.0))
    }

    fn cache() -> ShapedTextCache {
        ShapedTextCache::new(Rc::new(MonospaceShaper::new()))
    }

    fn block_for(run: &dyn Run, range: TextRange, ctx: &mut RunTextContext<'_>) -> LayoutBlock {
        let size = run.measure(range.begin, range.end, 1.0, ctx);
        run.create_block(
            &BlockDefinition {
                handle: RunHandle::default(),
                range,
                renderer: None,
            },
            size,
            ctx.text_context,
        )
    }

    #[test]
    fn text_run_measures_through_cache() {
        let mut cache = cache();
        let mut ctx = RunTextContext::new(&mut cache, ShapedTextContext::default());
        let run = TextRun::whole(Rc::from("Hello world"), style());
        assert_eq!(run.measure(0, 5, 1.0, &mut ctx), Vec2::new(50.0, 20.0));
        assert_eq!(run.measure(3, 3, 1.0, &mut ctx), Vec2::height_only(20.0));
        assert_eq!(run.ascent(1.0, &mut ctx), 16.0);
        assert_eq!(run.descent(1.0, &mut ctx), 4.0);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    #[should_panic(expected = "outside run")]
    fn measuring_outside_the_run_panics() {
        let mut cache = cache();
        let mut ctx = RunTextContext::new(&mut cache, ShapedTextContext::default());
        let run = TextRun::new(Rc::from("Hello world"), TextRange::new(0, 5), style());
        let _ = run.measure(4, 8, 1.0, &mut ctx);
    }

    #[test]
    fn kerning_is_zero_at_run_boundaries() {
        let mut cache = ShapedTextCache::new(Rc::new(
            MonospaceShaper::new().with_kerning_pair('A', 'V', -2),
        ));
        let mut ctx = RunTextContext::new(&mut cache, ShapedTextContext::default());
        let run = TextRun::new(Rc::from("AVAV"), TextRange::new(1, 4), style());
        assert_eq!(run.kerning(1, 1.0, &mut ctx), 0);
        assert_eq!(run.kerning(3, 1.0, &mut ctx), -2);
        assert_eq!(run.kerning(4, 1.0, &mut ctx), 0);
    }

    #[test]
    fn text_run_hit_test_and_location() {
        let mut cache = cache();
        let mut ctx = RunTextContext::new(&mut cache, ShapedTextContext::default());
        let run = TextRun::whole(Rc::from("Hello"), style());
        let mut block = block_for(&run, TextRange::new(0, 5), &mut ctx);
        block.set_location_offset(Vec2::new(100.0, 0.0));

        assert_eq!(
            run.text_index_at(&block, Vec2::new(113.0, 5.0), 1.0, &mut ctx),
            Some((1, TextHitPoint::WithinText))
        );
        assert_eq!(
            run.text_index_at(&block, Vec2::new(147.0, 5.0), 1.0, &mut ctx),
            Some((5, TextHitPoint::RightGutter))
        );
        assert_eq!(run.text_index_at(&block, Vec2::new(99.0, 5.0), 1.0, &mut ctx), None);
        assert_eq!(run.text_index_at(&block, Vec2::new(110.0, 25.0), 1.0, &mut ctx), None);

        assert_eq!(run.location_at(&block, 0, 1.0, &mut ctx), Some(Vec2::new(100.0, 0.0)));
        assert_eq!(run.location_at(&block, 3, 1.0, &mut ctx), Some(Vec2::new(130.0, 0.0)));
        assert_eq!(run.location_at(&block, 5, 1.0, &mut ctx), Some(Vec2::new(150.0, 0.0)));
        assert_eq!(run.location_at(&block, 6, 1.0, &mut ctx), None);
    }

    #[test]
    fn move_and_clone_keep_independent_identity() {
        let mut run = TextRun::new(Rc::from("abc"), TextRange::new(0, 3), style());
        let copy = run.clone_run();
        run.move_to(Rc::from("xyzabc"), TextRange::new(3, 6));
        let mut out = String::new();
        run.append_text_to(&mut out);
        copy.append_text_range_to(&mut out, TextRange::new(1, 3));
        assert_eq!(out, "abcbc");
        assert_eq!(copy.text_range(), TextRange::new(0, 3));
    }

    #[test]
    fn hyperlink_run_delegates_to_text() {
        let mut cache = cache();
        let mut ctx = RunTextContext::new(&mut cache, ShapedTextContext::default());
        let run = HyperlinkRun::new(
            Rc::from("docs"),
            TextRange::new(0, 4),
            "https://example.com/docs",
            HyperlinkStyle::new(style()),
        );
        assert_eq!(run.url(), "https://example.com/docs");
        assert!(run.attributes().contains(RunAttributes::SUPPORTS_TEXT));
        assert_eq!(run.measure(0, 4, 1.0, &mut ctx), Vec2::new(40.0, 20.0));
        assert!(run.painter().is_some());
    }

    #[test]
    fn widget_run_is_opaque_and_fixed_size() {
        let mut cache = cache();
        let mut ctx = RunTextContext::new(&mut cache, ShapedTextContext::default());
        let text: Rc<str> = Rc::from(OBJECT_REPLACEMENT_CHAR.to_string());
        let range = TextRange::new(0, text.len());
        let run = WidgetRun::new(Rc::clone(&text), range, 7, Vec2::new(30.0, 24.0), 4.0);
        assert!(run.attributes().is_empty());
        assert_eq!(run.measure(0, 3, 2.0, &mut ctx), Vec2::new(60.0, 48.0));
        assert_eq!(run.measure(0, 0, 1.0, &mut ctx), Vec2::height_only(24.0));
        assert_eq!(run.ascent(1.0, &mut ctx), 20.0);
        assert_eq!(run.descent(1.0, &mut ctx), 4.0);
        assert_eq!(run.kerning(1, 1.0, &mut ctx), 0);

        let block = block_for(&run, range, &mut ctx);
        assert_eq!(
            run.text_index_at(&block, Vec2::new(10.0, 1.0), 1.0, &mut ctx),
            Some((0, TextHitPoint::WithinText))
        );
        assert_eq!(
            run.text_index_at(&block, Vec2::new(20.0, 1.0), 1.0, &mut ctx),
            Some((3, TextHitPoint::RightGutter))
        );
        assert_eq!(run.location_at(&block, 3, 1.0, &mut ctx), Some(Vec2::new(30.0, 0.0)));
        assert_eq!(run.location_at(&block, 1, 1.0, &mut ctx), None);
    }

    #[test]
    fn image_run_uses_brush_size() {
        let mut cache = cache();
        let mut ctx = RunTextContext::new(&mut cache, ShapedTextContext::default());
        let text: Rc<str> = Rc::from(OBJECT_REPLACEMENT_CHAR.to_string());
        let run = ImageRun::new(
            Rc::clone(&text),
            TextRange::new(0, text.len()),
            ImageBrush::new(1, Vec2::new(16.0, 16.0)),
            0.0,
        );
        assert_eq!(run.measure(0, 3, 1.0, &mut ctx), Vec2::new(16.0, 16.0));
        assert_eq!(run.max_height(1.0, &mut ctx), 16.0);
    }
}
