#![forbid(unsafe_code)]

//! Line models and line views.
//!
//! A [`LineModel`] is one logical line: its text, its runs, cached break
//! candidates, and the decorations registered against it. A [`LineView`] is
//! one soft line produced from a model by wrapping. Views are rebuilt by
//! every layout pass; models persist until edited away.

use std::fmt;
use std::rc::Rc;

use crate::block::{BlockDefinition, LayoutBlock, RunRenderer};
use crate::break_iter::BreakIterator;
use crate::geometry::Vec2;
use crate::location::TextRange;
use crate::paint::{PaintGeometry, PaintSink};
use crate::run::{Run, RunTextContext};
use crate::shaped_cache::ShapedTextCache;
use crate::shaping::{ShapedTextContext, TextShaper};

// ---------------------------------------------------------------------------
// RunModel
// ---------------------------------------------------------------------------

/// A run plus the measurements taken while computing break candidates.
///
/// The memo lets block creation reuse break-candidate measurements instead
/// of measuring the same text again. It holds sorted, non-overlapping,
/// non-empty ranges measured at one scale.
#[derive(Debug)]
pub struct RunModel {
    run: Box<dyn Run>,
    measured: Vec<(TextRange, Vec2)>,
    measured_scale: f32,
}

impl RunModel {
    pub fn new(run: Box<dyn Run>) -> Self {
        Self {
            run,
            measured: Vec::new(),
            measured_scale: 0.0,
        }
    }

    #[inline]
    pub fn run(&self) -> &dyn Run {
        self.run.as_ref()
    }

    #[inline]
    pub fn text_range(&self) -> TextRange {
        self.run.text_range()
    }

    pub(crate) fn into_run(self) -> Box<dyn Run> {
        self.run
    }

    pub(crate) fn move_to(&mut self, text: Rc<str>, range: TextRange) {
        self.run.move_to(text, range);
        self.clear_cache();
    }

    /// Forget memoized measurements.
    pub fn clear_cache(&mut self) {
        self.measured.clear();
    }

    /// Number of memoized measurements.
    pub fn measured_len(&self) -> usize {
        self.measured.len()
    }

    /// Measure and remember the result.
    pub fn measure(&mut self, begin: usize, end: usize, scale: f32, ctx: &mut RunTextContext<'_>) -> Vec2 {
        let size = self.run.measure(begin, end, scale, ctx);
        if self.measured_scale != scale {
            self.measured.clear();
            self.measured_scale = scale;
        }
        self.measured.push((TextRange::new(begin, end), size));
        size
    }

    pub fn kerning(&self, index: usize, scale: f32, ctx: &mut RunTextContext<'_>) -> i8 {
        self.run.kerning(index, scale, ctx)
    }

    pub fn ascent(&self, scale: f32, ctx: &mut RunTextContext<'_>) -> f32 {
        self.run.ascent(scale, ctx)
    }

    pub fn descent(&self, scale: f32, ctx: &mut RunTextContext<'_>) -> f32 {
        self.run.descent(scale, ctx)
    }

    /// Size of `range` from contiguous memo entries, kerning included at
    /// the joins. `None` when the memo does not tile the range exactly.
    fn memoized_size(&self, range: TextRange, scale: f32, ctx: &mut RunTextContext<'_>) -> Option<Vec2> {
        if self.measured.is_empty() || self.measured_scale != scale || range.is_empty() {
            return None;
        }
        let start = self
            .measured
            .partition_point(|(r, _)| r.begin < range.begin);
        let (first, first_size) = self.measured.get(start)?;
        if first.begin != range.begin {
            return None;
        }
        let mut size = *first_size;
        let mut end = first.end;
        for (r, s) in &self.measured[start + 1..] {
            if end >= range.end {
                break;
            }
            if r.begin != end {
                return None;
            }
            size.x += s.x + f32::from(self.run.kerning(r.begin, scale, ctx));
            size.y = size.y.max(s.y);
            end = r.end;
        }
        (end == range.end).then_some(size)
    }

    /// Build a block, sizing it from memoized measurements when possible.
    pub fn create_block(
        &self,
        definition: &BlockDefinition,
        scale: f32,
        ctx: &mut RunTextContext<'_>,
    ) -> LayoutBlock {
        let range = definition.range;
        let size = self
            .memoized_size(range, scale, ctx)
            .unwrap_or_else(|| self.run.measure(range.begin, range.end, scale, ctx));
        self.run.create_block(definition, size, ctx.text_context)
    }

    pub fn begin_layout(&mut self) {
        self.run.begin_layout();
    }

    pub fn end_layout(&mut self) {
        self.run.end_layout();
    }
}

// ---------------------------------------------------------------------------
// Break candidates
// ---------------------------------------------------------------------------

/// A place where a soft line may end, with the measurements needed to decide
/// whether the text since the previous candidate fits.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BreakCandidate {
    /// Text since the previous candidate, trailing whitespace included.
    pub actual_range: TextRange,
    /// `actual_range` without trailing whitespace.
    pub trimmed_range: TextRange,
    pub actual_size: Vec2,
    pub trimmed_size: Vec2,
    /// Width of the first trailing whitespace character.
    pub first_trailing_whitespace_width: f32,
    pub max_above_baseline: f32,
    pub max_below_baseline: f32,
    /// Kerning with the character before `actual_range`.
    pub kerning: i8,
}

// ---------------------------------------------------------------------------
// Decorations
// ---------------------------------------------------------------------------

/// Paints a highlight behind or in front of a line view.
pub trait LineHighlighter: fmt::Debug {
    fn paint(
        &self,
        line: &LineView,
        highlight: &LineViewHighlight,
        geometry: &PaintGeometry,
        sink: &mut dyn PaintSink,
    );
}

/// A highlight registered against a range of one line.
#[derive(Debug, Clone)]
pub struct TextLineHighlight {
    pub line_index: usize,
    pub range: TextRange,
    /// Negative values paint under the text, positive values over it.
    pub z_order: i32,
    pub highlighter: Rc<dyn LineHighlighter>,
}

impl TextLineHighlight {
    pub fn new(line_index: usize, range: TextRange, z_order: i32, highlighter: Rc<dyn LineHighlighter>) -> Self {
        Self {
            line_index,
            range,
            z_order,
            highlighter,
        }
    }
}

/// A highlight placed on one line view.
#[derive(Debug, Clone)]
pub struct LineViewHighlight {
    /// Left edge relative to the line view's offset.
    pub offset_x: f32,
    pub width: f32,
    pub highlighter: Rc<dyn LineHighlighter>,
}

/// A custom renderer registered against a range of one line.
#[derive(Debug, Clone)]
pub struct TextRunRenderer {
    pub line_index: usize,
    pub range: TextRange,
    pub renderer: Rc<dyn RunRenderer>,
}

impl TextRunRenderer {
    /// # Panics
    ///
    /// Panics if `range` is empty.
    #[track_caller]
    pub fn new(line_index: usize, range: TextRange, renderer: Rc<dyn RunRenderer>) -> Self {
        assert!(!range.is_empty(), "run renderer range {range} is empty");
        Self {
            line_index,
            range,
            renderer,
        }
    }
}

// ---------------------------------------------------------------------------
// LineModel
// ---------------------------------------------------------------------------

/// One logical line.
pub struct LineModel {
    pub(crate) text: Rc<str>,
    pub(crate) runs: Vec<RunModel>,
    pub(crate) break_candidates: Vec<BreakCandidate>,
    pub(crate) run_renderers: Vec<TextRunRenderer>,
    pub(crate) line_highlights: Vec<TextLineHighlight>,
    pub(crate) has_wrapping_information: bool,
    pub(crate) renderers_dirty: bool,
    pub(crate) cache: ShapedTextCache,
}

impl fmt::Debug for LineModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineModel")
            .field("text", &self.text)
            .field("runs", &self.runs)
            .field("break_candidates", &self.break_candidates.len())
            .field("has_wrapping_information", &self.has_wrapping_information)
            .finish_non_exhaustive()
    }
}

impl LineModel {
    /// Create a line; every run is re-pointed at `text`.
    pub fn new(text: Rc<str>, runs: Vec<Box<dyn Run>>, shaper: Rc<dyn TextShaper>) -> Self {
        let runs = runs
            .into_iter()
            .map(|mut run| {
                let range = run.text_range();
                run.move_to(Rc::clone(&text), range);
                RunModel::new(run)
            })
            .collect::<Vec<_>>();
        debug_assert!(
            runs.windows(2)
                .all(|w| w[0].text_range().end == w[1].text_range().begin),
            "runs of a line must be contiguous"
        );
        Self {
            text,
            runs,
            break_candidates: Vec::new(),
            run_renderers: Vec::new(),
            line_highlights: Vec::new(),
            has_wrapping_information: false,
            renderers_dirty: false,
            cache: ShapedTextCache::new(shaper),
        }
    }

    #[inline]
    pub fn text(&self) -> &Rc<str> {
        &self.text
    }

    #[inline]
    pub fn runs(&self) -> &[RunModel] {
        &self.runs
    }

    #[inline]
    pub fn break_candidates(&self) -> &[BreakCandidate] {
        &self.break_candidates
    }

    #[inline]
    pub fn run_renderers(&self) -> &[TextRunRenderer] {
        &self.run_renderers
    }

    #[inline]
    pub fn line_highlights(&self) -> &[TextLineHighlight] {
        &self.line_highlights
    }

    /// Whether break candidates are current.
    #[inline]
    pub fn has_wrapping_information(&self) -> bool {
        self.has_wrapping_information
    }

    #[inline]
    pub fn shaped_cache(&self) -> &ShapedTextCache {
        &self.cache
    }

    /// Replace the line text, invalidating everything derived from it.
    ///
    /// Runs still point at the old text; callers re-point them with
    /// [`RunModel::move_to`] or [`LineModel::rebind_runs`].
    pub(crate) fn replace_text(&mut self, text: String) -> Rc<str> {
        self.text = Rc::from(text);
        self.invalidate_wrapping();
        self.cache.clear();
        Rc::clone(&self.text)
    }

    /// Point every run at the current text, keeping its range.
    pub(crate) fn rebind_runs(&mut self) {
        for run in &mut self.runs {
            let range = run.text_range();
            run.move_to(Rc::clone(&self.text), range);
        }
    }

    pub(crate) fn invalidate_wrapping(&mut self) {
        self.has_wrapping_information = false;
    }

    /// Split borrow of one run and a shaping context over the line cache.
    pub(crate) fn run_and_context(
        &mut self,
        run_index: usize,
        text_context: ShapedTextContext,
    ) -> (&mut RunModel, RunTextContext<'_>) {
        (
            &mut self.runs[run_index],
            RunTextContext::new(&mut self.cache, text_context),
        )
    }

    /// Recompute break candidates if they are stale.
    pub fn create_wrapping_cache(
        &mut self,
        iter: &mut dyn BreakIterator,
        scale: f32,
        text_context: ShapedTextContext,
    ) {
        if self.has_wrapping_information {
            return;
        }
        self.break_candidates.clear();
        self.has_wrapping_information = true;
        for run in &mut self.runs {
            run.clear_cache();
        }

        let text = Rc::clone(&self.text);
        iter.set_string(&text);
        let mut previous = 0;
        let mut run_index = 0;
        while let Some(current) = iter.move_to_next() {
            let candidate =
                self.create_break_candidate(&text, &mut run_index, previous, current, scale, text_context);
            self.break_candidates.push(candidate);
            previous = current;
        }
        iter.clear_string();
    }

    fn create_break_candidate(
        &mut self,
        text: &str,
        run_index: &mut usize,
        previous: usize,
        current: usize,
        scale: f32,
        text_context: ShapedTextContext,
    ) -> BreakCandidate {
        let mut ctx = RunTextContext::new(&mut self.cache, text_context);

        let mut kerning = 0;
        if let Some(run) = self.runs.get(*run_index) {
            let begin = previous.max(run.text_range().begin);
            if begin > 0 {
                kerning = run.kerning(begin, scale, &mut ctx);
            }
        }

        let mut measured = false;
        let mut actual_width = 0.0;
        let mut trimmed_width = 0.0;
        let mut first_trailing_whitespace_width = 0.0;
        let mut whitespace_stop = current;
        let mut max_above: f32 = 0.0;
        let mut max_below: f32 = 0.0;

        while *run_index < self.runs.len() {
            let run = &mut self.runs[*run_index];
            let range = run.text_range();
            let stop = range.end.min(current);
            let begin = previous.max(range.begin).min(stop);

            whitespace_stop = stop;
            while whitespace_stop > begin {
                match text[..whitespace_stop].chars().next_back() {
                    Some(c) if c.is_whitespace() => whitespace_stop -= c.len_utf8(),
                    _ => break,
                }
            }

            let (slice_actual, slice_trimmed) = if begin == stop {
                (0.0, 0.0)
            } else if begin == whitespace_stop {
                (run.measure(begin, stop, scale, &mut ctx).x, 0.0)
            } else if whitespace_stop != stop {
                let trimmed = run.measure(begin, whitespace_stop, scale, &mut ctx).x;
                let whitespace = run.measure(whitespace_stop, stop, scale, &mut ctx).x;
                let first_end = text[whitespace_stop..]
                    .chars()
                    .next()
                    .map_or(stop, |c| whitespace_stop + c.len_utf8());
                first_trailing_whitespace_width = if first_end == stop {
                    whitespace
                } else {
                    // Measured outside the memo to keep it sorted.
                    run.run().measure(whitespace_stop, first_end, scale, &mut ctx).x
                };
                (trimmed + whitespace, trimmed)
            } else {
                let width = run.measure(begin, stop, scale, &mut ctx).x;
                (width, width)
            };
            actual_width += slice_actual;
            trimmed_width += slice_trimmed;

            max_above = max_above.max(run.ascent(scale, &mut ctx));
            max_below = max_below.max(run.descent(scale, &mut ctx));

            if stop == current {
                measured = true;
                if stop == range.end {
                    *run_index += 1;
                }
                break;
            }
            *run_index += 1;
        }
        assert!(measured, "break at {current} is not covered by the line's runs");

        let height = max_above + max_below;
        BreakCandidate {
            actual_range: TextRange::new(previous, current),
            trimmed_range: TextRange::new(previous, whitespace_stop.max(previous)),
            actual_size: Vec2::new(actual_width, height),
            trimmed_size: Vec2::new(trimmed_width, height),
            first_trailing_whitespace_width,
            max_above_baseline: max_above,
            max_below_baseline: max_below,
            kerning,
        }
    }

    pub(crate) fn begin_layout(&mut self) {
        for run in &mut self.runs {
            run.begin_layout();
        }
    }

    pub(crate) fn end_layout(&mut self) {
        for run in &mut self.runs {
            run.end_layout();
        }
    }
}

// ---------------------------------------------------------------------------
// LineView
// ---------------------------------------------------------------------------

/// One soft line.
#[derive(Debug, Clone, Default)]
pub struct LineView {
    pub(crate) blocks: Vec<LayoutBlock>,
    pub(crate) underlay_highlights: Vec<LineViewHighlight>,
    pub(crate) overlay_highlights: Vec<LineViewHighlight>,
    pub(crate) offset: Vec2,
    pub(crate) size: Vec2,
    pub(crate) text_size: Vec2,
    pub(crate) range: TextRange,
    pub(crate) model_index: usize,
    pub(crate) justification_shift: f32,
}

impl LineView {
    #[inline]
    pub fn blocks(&self) -> &[LayoutBlock] {
        &self.blocks
    }

    #[inline]
    pub fn underlay_highlights(&self) -> &[LineViewHighlight] {
        &self.underlay_highlights
    }

    #[inline]
    pub fn overlay_highlights(&self) -> &[LineViewHighlight] {
        &self.overlay_highlights
    }

    /// Top-left corner in layout space.
    #[inline]
    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    /// Width of the blocks and line height including the line height
    /// percentage.
    #[inline]
    pub fn size(&self) -> Vec2 {
        self.size
    }

    /// Width of the blocks and the unadjusted text height.
    #[inline]
    pub fn text_size(&self) -> Vec2 {
        self.text_size
    }

    #[inline]
    pub fn range(&self) -> TextRange {
        self.range
    }

    /// Index of the line model this view was produced from.
    #[inline]
    pub fn model_index(&self) -> usize {
        self.model_index
    }

    pub(crate) fn translate(&mut self, delta: Vec2) {
        self.offset += delta;
        for block in &mut self.blocks {
            block.translate(delta);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::RunHandle;
    use crate::break_iter::LineBreakIterator;
    use crate::run::{TextRun, WidgetRun, OBJECT_REPLACEMENT_CHAR};
    use crate::shaping::MonospaceShaper;
    use crate::style::{FontId, FontInfo, TextStyle};

    fn style() -> TextStyle {
        TextStyle::new(FontInfo::new(FontId(0), 20.0))
    }

    fn shaper() -> Rc<dyn TextShaper> {
        Rc::new(MonospaceShaper::new())
    }

    fn single_run_line(text: &str) -> LineModel {
        let text: Rc<str> = Rc::from(text);
        let run = TextRun::whole(Rc::clone(&text), style());
        LineModel::new(text, vec![Box::new(run)], shaper())
    }

    fn wrap(line: &mut LineModel) {
        let mut iter = LineBreakIterator::new();
        line.create_wrapping_cache(&mut iter, 1.0, ShapedTextContext::default());
    }

    #[test]
    fn break_candidates_for_hello_world() {
        let mut line = single_run_line("Hello world");
        wrap(&mut line);
        let candidates = line.break_candidates();
        assert_eq!(candidates.len(), 2);

        let first = candidates[0];
        assert_eq!(first.actual_range, TextRange::new(0, 6));
        assert_eq!(first.trimmed_range, TextRange::new(0, 5));
        assert_eq!(first.actual_size, Vec2::new(60.0, 20.0));
        assert_eq!(first.trimmed_size.x, 50.0);
        assert_eq!(first.first_trailing_whitespace_width, 10.0);
        assert_eq!(first.max_above_baseline, 16.0);
        assert_eq!(first.max_below_baseline, 4.0);

        let second = candidates[1];
        assert_eq!(second.actual_range, TextRange::new(6, 11));
        assert_eq!(second.trimmed_range, TextRange::new(6, 11));
        assert_eq!(second.actual_size.x, 50.0);
        assert!(line.has_wrapping_information());
    }

    #[test]
    fn first_trailing_whitespace_of_a_longer_run() {
        let mut line = single_run_line("ab   cd");
        wrap(&mut line);
        let first = line.break_candidates()[0];
        assert_eq!(first.actual_size.x, 50.0);
        assert_eq!(first.trimmed_size.x, 20.0);
        assert_eq!(first.first_trailing_whitespace_width, 10.0);
        // The single-character measurement is not memoized.
        assert_eq!(line.runs()[0].measured_len(), 3);
    }

    #[test]
    fn candidates_span_runs() {
        let text: Rc<str> = Rc::from("abc def");
        let big = TextStyle::new(FontInfo::new(FontId(0), 40.0));
        let runs: Vec<Box<dyn Run>> = vec![
            Box::new(TextRun::new(Rc::clone(&text), TextRange::new(0, 2), style())),
            Box::new(TextRun::new(Rc::clone(&text), TextRange::new(2, 7), big)),
        ];
        let mut line = LineModel::new(text, runs, shaper());
        wrap(&mut line);
        let first = line.break_candidates()[0];
        assert_eq!(first.actual_range, TextRange::new(0, 4));
        // "ab" at 10px + "c " at 20px.
        assert_eq!(first.actual_size.x, 60.0);
        assert_eq!(first.trimmed_size.x, 40.0);
        assert_eq!(first.max_above_baseline, 32.0);
        assert_eq!(first.max_below_baseline, 8.0);
    }

    #[test]
    fn wrapping_cache_is_reused_until_invalidated() {
        let mut line = single_run_line("a b");
        wrap(&mut line);
        let before = line.break_candidates().to_vec();
        wrap(&mut line);
        assert_eq!(line.break_candidates(), before.as_slice());
        line.invalidate_wrapping();
        assert!(!line.has_wrapping_information());
        wrap(&mut line);
        assert_eq!(line.break_candidates(), before.as_slice());
    }

    #[test]
    fn memoized_block_size_matches_direct_measurement() {
        let mut line = single_run_line("Hello world");
        wrap(&mut line);
        let definition = BlockDefinition {
            handle: RunHandle::new(0, 0),
            range: TextRange::new(0, 11),
            renderer: None,
        };
        let (run, mut ctx) = line.run_and_context(0, ShapedTextContext::default());
        let block = run.create_block(&definition, 1.0, &mut ctx);
        assert_eq!(block.size(), Vec2::new(110.0, 20.0));

        let partial = BlockDefinition {
            range: TextRange::new(2, 6),
            ..definition
        };
        let block = run.create_block(&partial, 1.0, &mut ctx);
        assert_eq!(block.size(), Vec2::new(40.0, 20.0));
    }

    #[test]
    fn memo_is_ignored_at_other_scales() {
        let mut line = single_run_line("Hello world");
        wrap(&mut line);
        let definition = BlockDefinition {
            handle: RunHandle::new(0, 0),
            range: TextRange::new(0, 6),
            renderer: None,
        };
        let (run, mut ctx) = line.run_and_context(0, ShapedTextContext::default());
        let block = run.create_block(&definition, 2.0, &mut ctx);
        assert_eq!(block.size(), Vec2::new(120.0, 40.0));
    }

    #[test]
    fn opaque_runs_take_part_in_candidates() {
        let text: Rc<str> = Rc::from(format!("ab {OBJECT_REPLACEMENT_CHAR}"));
        let runs: Vec<Box<dyn Run>> = vec![
            Box::new(TextRun::new(Rc::clone(&text), TextRange::new(0, 3), style())),
            Box::new(WidgetRun::new(
                Rc::clone(&text),
                TextRange::new(3, 6),
                1,
                Vec2::new(30.0, 30.0),
                0.0,
            )),
        ];
        let mut line = LineModel::new(text, runs, shaper());
        wrap(&mut line);
        let candidates = line.break_candidates();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[1].actual_range, TextRange::new(3, 6));
        assert_eq!(candidates[1].actual_size, Vec2::new(30.0, 30.0));
    }
}
