#![forbid(unsafe_code)]

//! The text layout engine.
//!
//! [`TextLayout`] owns a list of [`LineModel`]s and turns them into
//! [`LineView`]s: one per soft line, each holding positioned
//! [`LayoutBlock`]s. Mutations only mark the layout dirty; the work happens
//! in [`TextLayout::update_if_needed`], which flows lines before placing
//! highlights.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use glyphflow::layout::{LayoutConfig, TextLayout};
//! use glyphflow::shaping::MonospaceShaper;
//! use glyphflow::style::{FontId, FontInfo, TextStyle};
//!
//! let config = LayoutConfig::default()
//!     .with_default_style(TextStyle::new(FontInfo::new(FontId(0), 20.0)))
//!     .with_wrapping_width(60.0);
//! let mut layout = TextLayout::with_config(Rc::new(MonospaceShaper::new()), config).unwrap();
//! layout.add_text_line("Hello world");
//! layout.update_if_needed();
//!
//! let ranges: Vec<_> = layout.line_views().iter().map(|v| v.range().as_range()).collect();
//! assert_eq!(ranges, vec![0..6, 6..11]);
//! ```

use std::fmt;
use std::rc::Rc;

use tracing::{debug, debug_span, trace};

use crate::block::{BlockDefinition, LayoutBlock, RunHandle, TextHitPoint};
use crate::break_iter::{BreakIterator, LineBreakIterator, WordBreakIterator};
use crate::error::{LayoutError, Result};
use crate::geometry::{Margin, Vec2};
use crate::line::{LineModel, LineView, LineViewHighlight, RunModel, TextLineHighlight, TextRunRenderer};
use crate::location::{TextLocation, TextRange, TextSelection};
use crate::offsets::{TextOffsetLocations, LINE_TERMINATOR};
use crate::paint::{PaintGeometry, PaintSink};
use crate::run::{Run, RunAttributes, TextRun};
use crate::shaping::{ShapedTextContext, TextShaper};
use crate::style::TextStyle;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Horizontal alignment of soft lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Justification {
    #[default]
    Left,
    Center,
    Right,
}

/// Layout parameters.
///
/// Margins and the wrapping width are unscaled; they are multiplied by
/// `scale` during layout.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LayoutConfig {
    pub scale: f32,
    /// Soft wrapping is disabled when this is zero.
    pub wrapping_width: f32,
    pub margin: Margin,
    pub justification: Justification,
    /// Multiplier applied to each soft line's natural height.
    pub line_height_percentage: f32,
    /// Style of runs created by edits beside opaque runs.
    pub default_style: TextStyle,
    pub text_context: ShapedTextContext,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            scale: 1.0,
            wrapping_width: 0.0,
            margin: Margin::default(),
            justification: Justification::Left,
            line_height_percentage: 1.0,
            default_style: TextStyle::default(),
            text_context: ShapedTextContext::default(),
        }
    }
}

impl LayoutConfig {
    #[must_use]
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    #[must_use]
    pub fn with_wrapping_width(mut self, wrapping_width: f32) -> Self {
        self.wrapping_width = wrapping_width;
        self
    }

    #[must_use]
    pub fn with_margin(mut self, margin: Margin) -> Self {
        self.margin = margin;
        self
    }

    #[must_use]
    pub fn with_justification(mut self, justification: Justification) -> Self {
        self.justification = justification;
        self
    }

    #[must_use]
    pub fn with_line_height_percentage(mut self, percentage: f32) -> Self {
        self.line_height_percentage = percentage;
        self
    }

    #[must_use]
    pub fn with_default_style(mut self, style: TextStyle) -> Self {
        self.default_style = style;
        self
    }

    #[must_use]
    pub fn with_text_context(mut self, text_context: ShapedTextContext) -> Self {
        self.text_context = text_context;
        self
    }

    /// Check every numeric field.
    pub fn validate(&self) -> Result<()> {
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(LayoutError::invalid_config("scale", self.scale));
        }
        if !(self.wrapping_width.is_finite() && self.wrapping_width >= 0.0) {
            return Err(LayoutError::invalid_config("wrapping_width", self.wrapping_width));
        }
        if !(self.line_height_percentage.is_finite() && self.line_height_percentage > 0.0) {
            return Err(LayoutError::invalid_config(
                "line_height_percentage",
                self.line_height_percentage,
            ));
        }
        let m = self.margin;
        for (field, value) in [
            ("margin.top", m.top),
            ("margin.right", m.right),
            ("margin.bottom", m.bottom),
            ("margin.left", m.left),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(LayoutError::invalid_config(field, value));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Dirty state
// ---------------------------------------------------------------------------

/// Which derived state is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DirtyState {
    #[default]
    Clean,
    LayoutDirty,
    HighlightsDirty,
    Both,
}

impl DirtyState {
    #[inline]
    pub fn is_layout_dirty(self) -> bool {
        matches!(self, Self::LayoutDirty | Self::Both)
    }

    #[inline]
    pub fn is_highlights_dirty(self) -> bool {
        matches!(self, Self::HighlightsDirty | Self::Both)
    }

    #[must_use]
    fn with_layout(self) -> Self {
        match self {
            Self::Clean | Self::LayoutDirty => Self::LayoutDirty,
            Self::HighlightsDirty | Self::Both => Self::Both,
        }
    }

    #[must_use]
    fn with_highlights(self) -> Self {
        match self {
            Self::Clean | Self::HighlightsDirty => Self::HighlightsDirty,
            Self::LayoutDirty | Self::Both => Self::Both,
        }
    }

    #[must_use]
    fn without_layout(self) -> Self {
        match self {
            Self::Clean | Self::LayoutDirty => Self::Clean,
            Self::HighlightsDirty | Self::Both => Self::HighlightsDirty,
        }
    }

    #[must_use]
    fn without_highlights(self) -> Self {
        match self {
            Self::Clean | Self::HighlightsDirty => Self::Clean,
            Self::LayoutDirty | Self::Both => Self::LayoutDirty,
        }
    }
}

/// Proof that the line views are current. Only a clean layout mints one.
#[derive(Debug)]
struct CleanLayout(());

/// Extent of the flowed text.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextLayoutSize {
    /// Widest soft line.
    pub draw_width: f32,
    /// Width the text was wrapped to.
    pub wrapped_width: f32,
    pub height: f32,
}

impl TextLayoutSize {
    #[inline]
    pub fn draw_size(&self) -> Vec2 {
        Vec2::new(self.draw_width, self.height)
    }

    #[inline]
    pub fn wrapped_size(&self) -> Vec2 {
        Vec2::new(self.wrapped_width, self.height)
    }
}

// ---------------------------------------------------------------------------
// Block segmentation
// ---------------------------------------------------------------------------

/// Progress through one line's runs and renderers.
#[derive(Debug, Clone, Copy)]
struct BlockCursor {
    run_index: usize,
    renderer_index: Option<usize>,
    previous_block_end: usize,
}

impl BlockCursor {
    fn new(line: &LineModel) -> Self {
        Self {
            run_index: 0,
            renderer_index: (!line.run_renderers.is_empty()).then_some(0),
            previous_block_end: 0,
        }
    }

    /// Skip past a soft line ending at `stop`.
    fn finish_soft_line(&mut self, line: &LineModel, stop: usize) {
        if line
            .runs
            .get(self.run_index)
            .is_some_and(|run| run.text_range().end == stop)
        {
            self.run_index += 1;
        }
        self.previous_block_end = stop;
    }
}

struct PendingBlock {
    block: LayoutBlock,
    ascent: f32,
    kerning: f32,
}

/// Blocks of one soft line before positioning.
#[derive(Default)]
struct BlockRow {
    blocks: Vec<PendingBlock>,
    max_above: f32,
    max_below: f32,
}

impl BlockRow {
    fn range(&self) -> Option<TextRange> {
        let first = self.blocks.first()?.block.text_range();
        let last = self.blocks.last()?.block.text_range();
        Some(TextRange::new(first.begin, last.end))
    }

    /// Lay the blocks out left to right from `offset`; returns the blocks
    /// and their total width.
    fn place(self, offset: Vec2) -> (Vec<LayoutBlock>, f32) {
        let mut x = 0.0;
        let max_above = self.max_above;
        let blocks = self
            .blocks
            .into_iter()
            .map(|pending| {
                let mut block = pending.block;
                block.set_location_offset(Vec2::new(
                    offset.x + x + pending.kerning,
                    offset.y + max_above - pending.ascent,
                ));
                x += block.size().x;
                block
            })
            .collect();
        (blocks, x)
    }
}

/// Cut runs into blocks up to `stop` (or the end of the runs), splitting at
/// run renderer boundaries.
fn segment_blocks(
    line: &mut LineModel,
    line_index: usize,
    stop: Option<usize>,
    cursor: &mut BlockCursor,
    scale: f32,
    text_context: ShapedTextContext,
) -> BlockRow {
    let mut row = BlockRow::default();
    while cursor.run_index < line.runs.len() {
        let run_range = line.runs[cursor.run_index].text_range();

        while let Some(index) = cursor.renderer_index {
            if line.run_renderers[index].range.end > cursor.previous_block_end {
                break;
            }
            cursor.renderer_index = (index + 1 < line.run_renderers.len()).then_some(index + 1);
        }

        let mut block_stop = run_range.end;
        let mut renderer = None;
        if let Some(index) = cursor.renderer_index {
            let active = &line.run_renderers[index];
            if cursor.previous_block_end >= active.range.begin {
                if active.range.end <= run_range.end {
                    block_stop = active.range.end;
                }
                renderer = Some(Rc::clone(&active.renderer));
            } else if active.range.begin <= run_range.end {
                block_stop = active.range.begin;
            }
        }
        if let Some(stop) = stop {
            block_stop = block_stop.min(stop);
        }
        let is_last_block = Some(block_stop) == stop;

        let block_begin = cursor.previous_block_end.max(run_range.begin);
        let range = if run_range.begin < block_stop && run_range.end > block_begin {
            TextRange::new(block_begin, block_stop)
        } else {
            run_range
        };

        let definition = BlockDefinition {
            handle: RunHandle::new(line_index, cursor.run_index),
            range,
            renderer,
        };
        let (run, mut ctx) = line.run_and_context(cursor.run_index, text_context);
        let block = run.create_block(&definition, scale, &mut ctx);
        let ascent = run.ascent(scale, &mut ctx);
        let descent = run.descent(scale, &mut ctx);
        let kerning = f32::from(run.kerning(range.begin, scale, &mut ctx));
        row.max_above = row.max_above.max(ascent);
        row.max_below = row.max_below.max(descent);
        row.blocks.push(PendingBlock {
            block,
            ascent,
            kerning,
        });

        cursor.previous_block_end = block_stop;
        if block_stop == run_range.end {
            cursor.run_index += 1;
        }
        if let Some(index) = cursor.renderer_index {
            if block_stop == line.run_renderers[index].range.end {
                cursor.renderer_index =
                    (index + 1 < line.run_renderers.len()).then_some(index + 1);
            }
        }
        if is_last_block {
            break;
        }
    }
    row
}

/// Measure where `highlight` falls on `view`.
fn place_highlight(
    line: &mut LineModel,
    view: &LineView,
    highlight: &TextLineHighlight,
    scale: f32,
) -> Option<LineViewHighlight> {
    let range = highlight.range;
    let applies = view.range.non_empty_intersect(&range).is_some()
        || (range.is_empty() && view.range.inclusive_contains(range.begin));
    if !applies {
        return None;
    }

    let mut offset_x = None;
    let mut width = 0.0;
    for block in &view.blocks {
        let block_range = block.text_range();
        let intersection = if range.is_empty() {
            if !block_range.inclusive_contains(range.begin) {
                continue;
            }
            TextRange::empty_at(range.begin)
        } else {
            match block_range.non_empty_intersect(&range) {
                Some(intersection) => intersection,
                None => continue,
            }
        };

        let (run, mut ctx) = line.run_and_context(block.handle().run, block.text_context());
        let run = run.run();
        if offset_x.is_none() {
            let lead = if block.direction().is_rtl() {
                TextRange::new(intersection.end, block_range.end)
            } else {
                TextRange::new(block_range.begin, intersection.begin)
            };
            let lead_width = if lead.is_empty() {
                0.0
            } else {
                run.measure(lead.begin, lead.end, scale, &mut ctx).x
            };
            offset_x = Some(block.location_offset().x - view.offset.x + lead_width);
        }
        if !intersection.is_empty() {
            width += run
                .measure(intersection.begin, intersection.end, scale, &mut ctx)
                .x;
        }
        if range.is_empty() {
            break;
        }
    }

    Some(LineViewHighlight {
        offset_x: offset_x.unwrap_or(0.0),
        width,
        highlighter: Rc::clone(&highlight.highlighter),
    })
}

fn default_text_run(text: &Rc<str>, range: TextRange, style: &TextStyle) -> RunModel {
    RunModel::new(Box::new(TextRun::new(Rc::clone(text), range, style.clone())))
}

fn supports_text(run: &RunModel) -> bool {
    run.run().attributes().contains(RunAttributes::SUPPORTS_TEXT)
}

#[track_caller]
fn assert_char_boundary(text: &str, location: TextLocation) {
    assert!(
        text.is_char_boundary(location.offset),
        "offset {location} is not a char boundary of a {}-byte line",
        text.len()
    );
}

// ---------------------------------------------------------------------------
// TextLayout
// ---------------------------------------------------------------------------

/// Lines of runs flowed into positioned blocks.
pub struct TextLayout {
    config: LayoutConfig,
    shaper: Rc<dyn TextShaper>,
    line_break_iterator: Box<dyn BreakIterator>,
    line_models: Vec<LineModel>,
    line_views: Vec<LineView>,
    dirty: DirtyState,
    /// Size of the flowed lines, margins excluded.
    content_size: TextLayoutSize,
    view_size: Vec2,
    scroll_offset: Vec2,
}

impl fmt::Debug for TextLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextLayout")
            .field("config", &self.config)
            .field("lines", &self.line_models.len())
            .field("views", &self.line_views.len())
            .field("dirty", &self.dirty)
            .field("content_size", &self.content_size)
            .finish_non_exhaustive()
    }
}

impl TextLayout {
    /// Create an empty layout with the default configuration.
    pub fn new(shaper: Rc<dyn TextShaper>) -> Self {
        Self {
            config: LayoutConfig::default(),
            shaper,
            line_break_iterator: Box::new(LineBreakIterator::new()),
            line_models: Vec::new(),
            line_views: Vec::new(),
            dirty: DirtyState::Clean,
            content_size: TextLayoutSize::default(),
            view_size: Vec2::ZERO,
            scroll_offset: Vec2::ZERO,
        }
    }

    /// Create an empty layout after validating `config`.
    pub fn with_config(shaper: Rc<dyn TextShaper>, config: LayoutConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new(shaper)
        })
    }

    // -- Accessors ---------------------------------------------------------

    #[inline]
    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    #[inline]
    pub fn shaper(&self) -> &Rc<dyn TextShaper> {
        &self.shaper
    }

    #[inline]
    pub fn line_models(&self) -> &[LineModel] {
        &self.line_models
    }

    #[inline]
    pub fn line_views(&self) -> &[LineView] {
        &self.line_views
    }

    #[inline]
    pub fn line_count(&self) -> usize {
        self.line_models.len()
    }

    #[inline]
    pub fn dirty_state(&self) -> DirtyState {
        self.dirty
    }

    #[inline]
    pub fn scale(&self) -> f32 {
        self.config.scale
    }

    #[inline]
    pub fn wrapping_width(&self) -> f32 {
        self.config.wrapping_width
    }

    #[inline]
    pub fn is_wrapping(&self) -> bool {
        self.config.wrapping_width > 0.0
    }

    #[inline]
    pub fn margin(&self) -> Margin {
        self.config.margin
    }

    #[inline]
    pub fn justification(&self) -> Justification {
        self.config.justification
    }

    #[inline]
    pub fn line_height_percentage(&self) -> f32 {
        self.config.line_height_percentage
    }

    #[inline]
    pub fn view_size(&self) -> Vec2 {
        self.view_size
    }

    #[inline]
    pub fn scroll_offset(&self) -> Vec2 {
        self.scroll_offset
    }

    /// Scaled size including margins.
    pub fn layout_size(&self) -> TextLayoutSize {
        let scale = self.config.scale;
        let margin = self.config.margin;
        TextLayoutSize {
            draw_width: self.content_size.draw_width + margin.horizontal_sum() * scale,
            wrapped_width: self.content_size.wrapped_width + margin.horizontal_sum() * scale,
            height: self.content_size.height + margin.vertical_sum() * scale,
        }
    }

    /// Scaled size including margins.
    pub fn draw_size(&self) -> Vec2 {
        self.layout_size().draw_size()
    }

    /// Unscaled size including margins.
    pub fn size(&self) -> Vec2 {
        self.draw_size() * (1.0 / self.config.scale)
    }

    /// Unscaled wrapped size including margins.
    pub fn wrapped_size(&self) -> Vec2 {
        self.layout_size().wrapped_size() * (1.0 / self.config.scale)
    }

    fn wrapping_draw_width(&self) -> f32 {
        ((self.config.wrapping_width - self.config.margin.horizontal_sum()) * self.config.scale)
            .max(0.01)
    }

    // -- Setters -----------------------------------------------------------

    fn mark_layout_dirty(&mut self) {
        self.dirty = self.dirty.with_layout();
    }

    fn mark_highlights_dirty(&mut self) {
        self.dirty = self.dirty.with_highlights();
    }

    fn clear_wrapping_cache(&mut self) {
        for line in &mut self.line_models {
            line.invalidate_wrapping();
        }
    }

    /// # Panics
    ///
    /// Panics unless `scale` is finite and positive.
    #[track_caller]
    pub fn set_scale(&mut self, scale: f32) {
        assert!(scale.is_finite() && scale > 0.0, "invalid layout scale {scale}");
        if self.config.scale != scale {
            self.config.scale = scale;
            self.mark_layout_dirty();
            self.clear_wrapping_cache();
        }
    }

    /// Zero disables wrapping.
    ///
    /// # Panics
    ///
    /// Panics if `width` is negative or not finite.
    #[track_caller]
    pub fn set_wrapping_width(&mut self, width: f32) {
        assert!(width.is_finite() && width >= 0.0, "invalid wrapping width {width}");
        if self.config.wrapping_width != width {
            self.config.wrapping_width = width;
            self.mark_layout_dirty();
        }
    }

    pub fn set_justification(&mut self, justification: Justification) {
        if self.config.justification != justification {
            self.config.justification = justification;
            self.mark_layout_dirty();
        }
    }

    /// # Panics
    ///
    /// Panics unless `percentage` is finite and positive.
    #[track_caller]
    pub fn set_line_height_percentage(&mut self, percentage: f32) {
        assert!(
            percentage.is_finite() && percentage > 0.0,
            "invalid line height percentage {percentage}"
        );
        if self.config.line_height_percentage != percentage {
            self.config.line_height_percentage = percentage;
            self.mark_layout_dirty();
        }
    }

    /// Without wrapping, a margin change moves the existing views instead of
    /// forcing a new layout.
    pub fn set_margin(&mut self, margin: Margin) {
        let old = self.config.margin;
        if old == margin {
            return;
        }
        self.config.margin = margin;
        if self.is_wrapping() {
            self.mark_layout_dirty();
            return;
        }
        let delta = (margin.top_left() - old.top_left()) * self.config.scale;
        if !delta.is_zero() {
            for view in &mut self.line_views {
                view.translate(delta);
            }
        }
        if self.config.justification != Justification::Left {
            self.mark_layout_dirty();
        }
    }

    pub fn set_text_context(&mut self, text_context: ShapedTextContext) {
        if self.config.text_context != text_context {
            self.config.text_context = text_context;
            self.mark_layout_dirty();
            self.clear_wrapping_cache();
        }
    }

    /// Style for runs created beside opaque runs by edits.
    pub fn set_default_style(&mut self, style: TextStyle) {
        self.config.default_style = style;
    }

    pub fn set_line_break_iterator(&mut self, iterator: Box<dyn BreakIterator>) {
        self.line_break_iterator = iterator;
        self.mark_layout_dirty();
        self.clear_wrapping_cache();
    }

    /// Update the visible region. Scrolling moves the existing views; a new
    /// view size needs a new layout only when lines are justified.
    pub fn set_visible_region(&mut self, view_size: Vec2, scroll_offset: Vec2) {
        if self.view_size != view_size {
            self.view_size = view_size;
            if self.config.justification != Justification::Left {
                self.mark_layout_dirty();
            }
        }
        if self.scroll_offset != scroll_offset {
            let delta = -(scroll_offset - self.scroll_offset);
            self.scroll_offset = scroll_offset;
            for view in &mut self.line_views {
                view.translate(delta);
            }
        }
    }

    /// Force a new layout, recomputing break candidates.
    pub fn dirty_layout(&mut self) {
        self.mark_layout_dirty();
        self.clear_wrapping_cache();
    }

    /// A run's measurements changed.
    pub fn dirty_run_layout(&mut self, handle: RunHandle) -> Result<()> {
        let line = self.line_mut(handle.line)?;
        assert!(
            handle.run < line.runs.len(),
            "run {} out of range for line {}",
            handle.run,
            handle.line
        );
        line.runs[handle.run].clear_cache();
        line.invalidate_wrapping();
        self.mark_layout_dirty();
        Ok(())
    }

    /// Mark every shaped sequence stale, e.g. after font data changed.
    pub fn invalidate_font_cache(&mut self) {
        for line in &mut self.line_models {
            line.cache.invalidate();
        }
        self.dirty_layout();
    }

    // -- Updating ----------------------------------------------------------

    fn clean_layout(&self) -> Option<CleanLayout> {
        (!self.dirty.is_layout_dirty()).then_some(CleanLayout(()))
    }

    /// Bring views and highlights up to date.
    pub fn update_if_needed(&mut self) {
        if self.dirty == DirtyState::Clean {
            return;
        }
        let proof = match self.clean_layout() {
            Some(proof) => proof,
            None => self.relayout(),
        };
        self.flow_highlights(proof);
    }

    /// Rebuild every line view.
    ///
    /// Highlights are left stale; [`Self::update_if_needed`] places them.
    pub fn update_layout(&mut self) {
        self.relayout();
        self.mark_highlights_dirty();
    }

    /// Place highlights, laying out first if needed.
    pub fn update_highlights(&mut self) {
        let proof = match self.clean_layout() {
            Some(proof) => proof,
            None => self.relayout(),
        };
        self.flow_highlights(proof);
    }

    fn relayout(&mut self) -> CleanLayout {
        let _span = debug_span!(
            "update_layout",
            lines = self.line_models.len(),
            wrapping = self.is_wrapping()
        )
        .entered();

        self.clear_view();
        self.begin_layout();
        self.flow_layout();
        self.justify_layout();
        self.end_layout();
        for line in &mut self.line_models {
            line.renderers_dirty = false;
        }
        self.dirty = self.dirty.without_layout();
        debug!(
            views = self.line_views.len(),
            height = self.content_size.height,
            "layout updated"
        );
        CleanLayout(())
    }

    fn clear_view(&mut self) {
        self.line_views.clear();
        self.content_size = TextLayoutSize::default();
    }

    fn begin_layout(&mut self) {
        for line in &mut self.line_models {
            line.begin_layout();
        }
    }

    fn end_layout(&mut self) {
        for line in &mut self.line_models {
            line.end_layout();
        }
    }

    fn create_wrapping_cache(&mut self) {
        if !self.is_wrapping() {
            return;
        }
        let _span = debug_span!("wrapping_cache").entered();
        let scale = self.config.scale;
        let text_context = self.config.text_context;
        for line in &mut self.line_models {
            line.create_wrapping_cache(self.line_break_iterator.as_mut(), scale, text_context);
        }
    }

    fn flow_layout(&mut self) {
        let wrapping_draw_width = self.wrapping_draw_width();
        self.create_wrapping_cache();
        for index in 0..self.line_models.len() {
            self.flow_line_layout(index, wrapping_draw_width);
        }
    }

    fn flow_line_layout(&mut self, line_index: usize, wrapping_draw_width: f32) {
        let mut cursor = BlockCursor::new(&self.line_models[line_index]);
        let candidate_count = self.line_models[line_index].break_candidates.len();
        if !self.is_wrapping() || candidate_count == 0 {
            self.create_line_view_blocks(line_index, None, 0.0, &mut cursor);
            return;
        }

        let mut current_width = 0.0;
        let mut break_index = 0;
        while break_index < candidate_count {
            let candidate = self.line_models[line_index].break_candidates[break_index];
            let is_last_break = break_index + 1 == candidate_count;
            let is_first_on_line = current_width == 0.0;
            let kerning = if is_first_on_line {
                f32::from(candidate.kerning)
            } else {
                0.0
            };
            let fits = current_width + candidate.actual_size.x + kerning <= wrapping_draw_width;

            if !fits || is_last_break {
                let trimmed_fits =
                    current_width + candidate.trimmed_size.x + kerning <= wrapping_draw_width;
                let step_back = break_index > 0 && !is_first_on_line && !trimmed_fits;
                let (final_break, width_before) = if step_back {
                    break_index -= 1;
                    let previous = self.line_models[line_index].break_candidates[break_index];
                    (previous, current_width - previous.actual_size.x)
                } else {
                    (candidate, current_width)
                };

                let wrapped_line_width = if step_back || (trimmed_fits && !is_last_break) {
                    width_before
                        + final_break.trimmed_size.x
                        + final_break.first_trailing_whitespace_width
                } else {
                    (width_before + final_break.actual_size.x).min(wrapping_draw_width)
                };

                let stop = final_break.actual_range.end;
                trace!(line = line_index, stop, "soft line break");
                self.create_line_view_blocks(line_index, Some(stop), wrapped_line_width, &mut cursor);
                cursor.finish_soft_line(&self.line_models[line_index], stop);
                current_width = 0.0;
            } else {
                current_width += candidate.actual_size.x;
            }
            break_index += 1;
        }
    }

    fn create_line_view_blocks(
        &mut self,
        line_index: usize,
        stop: Option<usize>,
        wrapped_line_width: f32,
        cursor: &mut BlockCursor,
    ) {
        let scale = self.config.scale;
        let row = segment_blocks(
            &mut self.line_models[line_index],
            line_index,
            stop,
            cursor,
            scale,
            self.config.text_context,
        );
        let Some(range) = row.range() else {
            return;
        };

        let margin = self.config.margin;
        let offset = Vec2::new(
            margin.left * scale - self.scroll_offset.x,
            margin.top * scale + self.content_size.height - self.scroll_offset.y,
        );
        let text_height = row.max_above + row.max_below;
        let (blocks, width) = row.place(offset);
        let size = Vec2::new(width, text_height * self.config.line_height_percentage);

        self.content_size.draw_width = self.content_size.draw_width.max(width);
        self.content_size.wrapped_width = self.content_size.wrapped_width.max(if stop.is_none() {
            width
        } else {
            wrapped_line_width
        });
        self.content_size.height += size.y;

        self.line_views.push(LineView {
            blocks,
            underlay_highlights: Vec::new(),
            overlay_highlights: Vec::new(),
            offset,
            size,
            text_size: Vec2::new(width, text_height),
            range,
            model_index: line_index,
            justification_shift: 0.0,
        });
    }

    fn justify_layout(&mut self) {
        let justification = self.config.justification;
        if justification == Justification::Left {
            return;
        }
        let scale = self.config.scale;
        let margin_width = self.config.margin.horizontal_sum() * scale;
        let mut available = self
            .content_size
            .draw_width
            .max(self.view_size.x * scale - margin_width);
        if self.is_wrapping() {
            available = available.max(self.wrapping_draw_width());
        }

        for view in &mut self.line_views {
            let extra = available - view.size.x;
            let shift = match justification {
                Justification::Left => 0.0,
                Justification::Center => extra * 0.5,
                Justification::Right => extra,
            };
            let delta = shift - view.justification_shift;
            if delta != 0.0 {
                view.translate(Vec2::new(delta, 0.0));
                view.justification_shift = shift;
            }
        }
    }

    fn flow_highlights(&mut self, _proof: CleanLayout) {
        let _span = debug_span!("update_highlights", views = self.line_views.len()).entered();
        self.rematerialize_renderers();

        let scale = self.config.scale;
        for view in &mut self.line_views {
            view.underlay_highlights.clear();
            view.overlay_highlights.clear();
            let line = &mut self.line_models[view.model_index];
            for index in 0..line.line_highlights.len() {
                let highlight = line.line_highlights[index].clone();
                let Some(placed) = place_highlight(line, view, &highlight, scale) else {
                    continue;
                };
                if highlight.z_order < 0 {
                    view.underlay_highlights.push(placed);
                } else {
                    view.overlay_highlights.push(placed);
                }
            }
        }
        self.dirty = self.dirty.without_highlights();
    }

    /// Re-cut the blocks of lines whose renderers changed, keeping each
    /// view's range and position.
    fn rematerialize_renderers(&mut self) {
        let scale = self.config.scale;
        let text_context = self.config.text_context;
        for line_index in 0..self.line_models.len() {
            let line = &mut self.line_models[line_index];
            if !line.renderers_dirty {
                continue;
            }
            line.renderers_dirty = false;

            let first = self.line_views.partition_point(|v| v.model_index < line_index);
            let end = self.line_views.partition_point(|v| v.model_index <= line_index);
            let mut cursor = BlockCursor::new(line);
            for view_index in first..end {
                let view = &mut self.line_views[view_index];
                let stop = (view_index + 1 < end).then_some(view.range.end);
                let row = segment_blocks(line, line_index, stop, &mut cursor, scale, text_context);
                view.blocks = row.place(view.offset).0;
                if let Some(stop) = stop {
                    cursor.finish_soft_line(line, stop);
                }
            }
            trace!(line = line_index, views = end - first, "renderers re-applied");
        }
    }

    // -- Lines -------------------------------------------------------------

    /// Rewrite the line index of highlights and renderers from `first` on,
    /// after lines were inserted or removed.
    fn renumber_lines_from(&mut self, first: usize) {
        for (index, line) in self.line_models.iter_mut().enumerate().skip(first) {
            for highlight in &mut line.line_highlights {
                highlight.line_index = index;
            }
            for renderer in &mut line.run_renderers {
                renderer.line_index = index;
            }
        }
    }

    fn line_mut(&mut self, index: usize) -> Result<&mut LineModel> {
        let count = self.line_models.len();
        self.line_models
            .get_mut(index)
            .ok_or_else(|| LayoutError::invalid_line(index, count))
    }

    /// Append a line. Without runs, one default text run covers the text.
    ///
    /// When the layout is clean the new line is flowed immediately.
    pub fn add_line(&mut self, text: impl Into<Rc<str>>, runs: Vec<Box<dyn Run>>) {
        let text = text.into();
        let runs = if runs.is_empty() {
            let run: Box<dyn Run> = Box::new(TextRun::new(
                Rc::clone(&text),
                TextRange::new(0, text.len()),
                self.config.default_style.clone(),
            ));
            vec![run]
        } else {
            runs
        };
        self.line_models
            .push(LineModel::new(text, runs, Rc::clone(&self.shaper)));
        let index = self.line_models.len() - 1;
        debug!(line = index, "line added");

        if self.dirty.is_layout_dirty() {
            return;
        }
        let scale = self.config.scale;
        let text_context = self.config.text_context;
        let wrapping_draw_width = self.wrapping_draw_width();
        if self.is_wrapping() {
            self.line_models[index].create_wrapping_cache(
                self.line_break_iterator.as_mut(),
                scale,
                text_context,
            );
        }
        self.line_models[index].begin_layout();
        self.flow_line_layout(index, wrapping_draw_width);
        self.justify_layout();
        self.line_models[index].end_layout();
    }

    /// Append a line of plain text in the default style.
    pub fn add_text_line(&mut self, text: &str) {
        self.add_line(text, Vec::new());
    }

    pub fn remove_line(&mut self, line_index: usize) -> Result<()> {
        self.line_mut(line_index)?;
        self.line_models.remove(line_index);
        self.renumber_lines_from(line_index);
        debug!(line = line_index, "line removed");
        self.mark_layout_dirty();
        Ok(())
    }

    pub fn clear_lines(&mut self) {
        self.line_models.clear();
        self.clear_view();
        self.mark_layout_dirty();
    }

    // -- Highlights and renderers -------------------------------------------

    /// Register a highlight; equal z-orders paint in insertion order.
    ///
    /// # Panics
    ///
    /// Panics if the z-order is zero.
    #[track_caller]
    pub fn add_line_highlight(&mut self, highlight: TextLineHighlight) -> Result<()> {
        assert!(highlight.z_order != 0, "line highlight z-order must not be zero");
        let line = self.line_mut(highlight.line_index)?;
        let at = line
            .line_highlights
            .partition_point(|h| h.z_order <= highlight.z_order);
        line.line_highlights.insert(at, highlight);
        self.mark_highlights_dirty();
        Ok(())
    }

    /// Replace every highlight.
    #[track_caller]
    pub fn set_line_highlights(&mut self, highlights: Vec<TextLineHighlight>) -> Result<()> {
        let count = self.line_models.len();
        if let Some(bad) = highlights.iter().find(|h| h.line_index >= count) {
            return Err(LayoutError::invalid_line(bad.line_index, count));
        }
        self.clear_line_highlights();
        for highlight in highlights {
            self.add_line_highlight(highlight)?;
        }
        Ok(())
    }

    pub fn clear_line_highlights(&mut self) {
        for line in &mut self.line_models {
            line.line_highlights.clear();
        }
        self.mark_highlights_dirty();
    }

    /// Register a renderer over a range of one line.
    ///
    /// # Panics
    ///
    /// Panics if the range overlaps another renderer of the line.
    #[track_caller]
    pub fn add_run_renderer(&mut self, renderer: TextRunRenderer) -> Result<()> {
        let line = self.line_mut(renderer.line_index)?;
        let at = line
            .run_renderers
            .partition_point(|r| r.range.begin < renderer.range.begin);
        if let Some(previous) = at.checked_sub(1).map(|i| &line.run_renderers[i]) {
            assert!(
                previous.range.end <= renderer.range.begin,
                "run renderer {} overlaps {}",
                renderer.range,
                previous.range
            );
        }
        if let Some(next) = line.run_renderers.get(at) {
            assert!(
                renderer.range.end <= next.range.begin,
                "run renderer {} overlaps {}",
                renderer.range,
                next.range
            );
        }
        line.run_renderers.insert(at, renderer);
        line.renderers_dirty = true;
        self.mark_highlights_dirty();
        Ok(())
    }

    /// Replace every run renderer.
    #[track_caller]
    pub fn set_run_renderers(&mut self, renderers: Vec<TextRunRenderer>) -> Result<()> {
        let count = self.line_models.len();
        if let Some(bad) = renderers.iter().find(|r| r.line_index >= count) {
            return Err(LayoutError::invalid_line(bad.line_index, count));
        }
        self.clear_run_renderers();
        for renderer in renderers {
            self.add_run_renderer(renderer)?;
        }
        Ok(())
    }

    pub fn clear_run_renderers(&mut self) {
        for line in &mut self.line_models {
            if !line.run_renderers.is_empty() {
                line.run_renderers.clear();
                line.renderers_dirty = true;
            }
        }
        self.mark_highlights_dirty();
    }

    // -- Locations ---------------------------------------------------------

    /// The character under `point`, in layout space.
    pub fn text_location_at(&mut self, point: Vec2) -> (TextLocation, TextHitPoint) {
        self.update_if_needed();
        let count = self.line_views.len();
        if count == 0 {
            return (TextLocation::default(), TextHitPoint::WithinText);
        }
        let below = self.line_views.partition_point(|v| v.offset.y <= point.y);
        let mut index = if below == count {
            count - 1
        } else {
            below.saturating_sub(1)
        };
        let view = &self.line_views[index];
        if view.offset.y + view.size.y < point.y && index + 1 < count {
            index += 1;
        }
        self.view_text_location_at(index, point.x)
    }

    /// The character of one view under horizontal position `x`.
    ///
    /// An out-of-range `view_index` gives the default location.
    pub fn view_text_location_at(&mut self, view_index: usize, x: f32) -> (TextLocation, TextHitPoint) {
        self.update_if_needed();
        let scale = self.config.scale;
        let Some(view) = self.line_views.get(view_index) else {
            return (TextLocation::default(), TextHitPoint::WithinText);
        };
        let model_index = view.model_index;
        let line = &mut self.line_models[model_index];

        for block in &view.blocks {
            let (run, mut ctx) = line.run_and_context(block.handle().run, block.text_context());
            let point = Vec2::new(x, block.location_offset().y);
            if let Some((index, hit)) = run.run().text_index_at(block, point, scale, &mut ctx) {
                return (TextLocation::new(model_index, index), hit);
            }
        }

        match view.blocks.first() {
            Some(first) if !line.text.is_empty() => {
                if x < first.location_offset().x {
                    (
                        TextLocation::new(model_index, view.range.begin),
                        TextHitPoint::LeftGutter,
                    )
                } else {
                    (
                        TextLocation::new(model_index, view.range.end),
                        TextHitPoint::RightGutter,
                    )
                }
            }
            _ => (TextLocation::new(model_index, 0), TextHitPoint::WithinText),
        }
    }

    /// Index of the view showing `location`. `inclusive` also accepts a
    /// location at the end of a view that is not the line's last.
    pub fn line_view_index_for_text_location(
        &self,
        location: TextLocation,
        inclusive: bool,
    ) -> Option<usize> {
        let offset = location.offset;
        let line = self.line_models.get(location.line_index)?;
        for (index, view) in self.line_views.iter().enumerate() {
            if view.model_index != location.line_index {
                continue;
            }
            if offset == 0 || line.text.is_empty() || view.range.contains(offset) {
                return Some(index);
            }
            let is_last_view_of_line = self
                .line_views
                .get(index + 1)
                .is_none_or(|next| next.model_index != location.line_index);
            if (is_last_view_of_line || inclusive) && view.range.end == offset {
                return Some(index);
            }
        }
        None
    }

    /// Layout-space position of `location`.
    pub fn location_at(&mut self, location: TextLocation, inclusive: bool) -> Option<Vec2> {
        self.update_if_needed();
        let view_index = self.line_view_index_for_text_location(location, inclusive)?;
        let scale = self.config.scale;
        let view = &self.line_views[view_index];
        let line = &mut self.line_models[view.model_index];
        for block in &view.blocks {
            if !block.text_range().inclusive_contains(location.offset) {
                continue;
            }
            let (run, mut ctx) = line.run_and_context(block.handle().run, block.text_context());
            if let Some(position) = run.run().location_at(block, location.offset, scale, &mut ctx) {
                return Some(position);
            }
        }
        None
    }

    // -- Text access -------------------------------------------------------

    /// Whether the layout holds no text.
    pub fn is_empty(&self) -> bool {
        match self.line_models.as_slice() {
            [] => true,
            [only] => only.text.is_empty(),
            _ => false,
        }
    }

    /// All lines joined with [`LINE_TERMINATOR`].
    pub fn get_as_text(&self) -> String {
        self.get_as_text_with_offsets().0
    }

    pub fn get_as_text_with_offsets(&self) -> (String, TextOffsetLocations) {
        let mut text = String::new();
        let mut offsets = TextOffsetLocations::new();
        for (index, line) in self.line_models.iter().enumerate() {
            if index > 0 {
                text.push_str(LINE_TERMINATOR);
            }
            let start = text.len();
            for run in &line.runs {
                run.run().append_text_to(&mut text);
            }
            offsets.push_line(text.len() - start);
        }
        (text, offsets)
    }

    pub fn text_offset_locations(&self) -> TextOffsetLocations {
        TextOffsetLocations::from_line_lengths(self.line_models.iter().map(|l| l.text.len()))
    }

    /// Text covered by `selection`, lines joined with [`LINE_TERMINATOR`].
    pub fn get_selection_as_text(&self, selection: TextSelection) -> String {
        let mut out = String::new();
        let begin = selection.beginning();
        let end = selection.end();
        for line_index in begin.line_index..=end.line_index {
            let Some(line) = self.line_models.get(line_index) else {
                break;
            };
            let len = line.text.len();
            let range_begin = if line_index == begin.line_index {
                begin.offset.min(len)
            } else {
                0
            };
            let range_end = if line_index == end.line_index {
                end.offset.min(len)
            } else {
                len
            };
            let range = TextRange::new(range_begin, range_end.max(range_begin));
            for run in &line.runs {
                let run_range = run.text_range();
                if run_range.begin > range.end {
                    break;
                }
                if let Some(intersection) = run_range.non_empty_intersect(&range) {
                    run.run().append_text_range_to(&mut out, intersection);
                }
            }
            if line_index != end.line_index {
                out.push_str(LINE_TERMINATOR);
            }
        }
        out
    }

    /// The word at `location`: the nearest segment ending after it that
    /// holds a non-whitespace character.
    pub fn get_word_at(&self, location: TextLocation) -> Option<TextSelection> {
        let line = self.line_models.get(location.line_index)?;
        let text = line.text.as_ref();
        let mut iter = WordBreakIterator::new();
        iter.set_string(text);

        let mut previous = match iter.move_to_candidate_after(location.offset) {
            Some(boundary) => boundary,
            None => iter.current_position(),
        };
        while let Some(current) = iter.move_to_previous() {
            if text[current..previous].chars().any(|c| !c.is_whitespace()) {
                return Some(TextSelection::new(
                    TextLocation::new(location.line_index, current),
                    TextLocation::new(location.line_index, previous),
                ));
            }
            previous = current;
        }
        None
    }

    // -- Editing -----------------------------------------------------------

    /// Insert text. It joins the run it lands in, or a new default text run
    /// when that run is opaque.
    ///
    /// # Panics
    ///
    /// Panics if the offset is not a char boundary of the line.
    #[track_caller]
    pub fn insert_at(&mut self, location: TextLocation, text: &str) -> Result<()> {
        let style = self.config.default_style.clone();
        let line = self.line_mut(location.line_index)?;
        assert_char_boundary(&line.text, location);
        let offset = location.offset;
        let inserted = text.len();

        let mut joined = String::with_capacity(line.text.len() + inserted);
        joined.push_str(&line.text[..offset]);
        joined.push_str(text);
        joined.push_str(&line.text[offset..]);
        let new_text = line.replace_text(joined);

        let runs = std::mem::take(&mut line.runs);
        let count = runs.len();
        let mut after = false;
        for (index, mut run) in runs.into_iter().enumerate() {
            let range = run.text_range();
            let is_last = index + 1 == count;
            if !after && (range.contains(offset) || is_last) {
                after = true;
                if supports_text(&run) {
                    run.move_to(Rc::clone(&new_text), TextRange::new(range.begin, range.end + inserted));
                    line.runs.push(run);
                } else if offset == range.begin {
                    line.runs.push(default_text_run(
                        &new_text,
                        TextRange::new(range.begin, range.begin + inserted),
                        &style,
                    ));
                    run.move_to(Rc::clone(&new_text), range.shifted_right(inserted));
                    line.runs.push(run);
                } else {
                    run.move_to(Rc::clone(&new_text), range);
                    line.runs.push(run);
                    line.runs.push(default_text_run(
                        &new_text,
                        TextRange::new(range.end, range.end + inserted),
                        &style,
                    ));
                }
            } else if after {
                run.move_to(Rc::clone(&new_text), range.shifted_right(inserted));
                line.runs.push(run);
            } else {
                run.move_to(Rc::clone(&new_text), range);
                line.runs.push(run);
            }
        }
        if line.runs.is_empty() {
            line.runs
                .push(default_text_run(&new_text, TextRange::new(0, new_text.len()), &style));
        }

        debug!(%location, bytes = inserted, "text inserted");
        self.mark_layout_dirty();
        Ok(())
    }

    /// Insert one character.
    #[track_caller]
    pub fn insert_char_at(&mut self, location: TextLocation, ch: char) -> Result<()> {
        let mut buf = [0u8; 4];
        self.insert_at(location, ch.encode_utf8(&mut buf))
    }

    /// Insert `run` with its text, splitting the run it lands in.
    ///
    /// An empty right-hand remainder is dropped unless
    /// `always_keep_right_run` is set.
    ///
    /// # Panics
    ///
    /// Panics if the offset is not a char boundary of the line.
    #[track_caller]
    pub fn insert_run_at(
        &mut self,
        location: TextLocation,
        run: Box<dyn Run>,
        always_keep_right_run: bool,
    ) -> Result<()> {
        let style = self.config.default_style.clone();
        let line = self.line_mut(location.line_index)?;
        assert_char_boundary(&line.text, location);
        let offset = location.offset;

        let mut inserted_text = String::new();
        run.append_text_to(&mut inserted_text);
        let inserted = inserted_text.len();
        let inserted_end = offset + inserted;

        let mut joined = String::with_capacity(line.text.len() + inserted);
        joined.push_str(&line.text[..offset]);
        joined.push_str(&inserted_text);
        joined.push_str(&line.text[offset..]);
        let new_text = line.replace_text(joined);

        let mut pending = Some(run);
        let runs = std::mem::take(&mut line.runs);
        let count = runs.len();
        for (index, mut existing) in runs.into_iter().enumerate() {
            let range = existing.text_range();
            let is_last = index + 1 == count;
            let mut new_run = match pending.take() {
                Some(new_run) if range.contains(offset) || is_last => new_run,
                other => {
                    let moved = if other.is_none() {
                        range.shifted_right(inserted)
                    } else {
                        range
                    };
                    pending = other;
                    existing.move_to(Rc::clone(&new_text), moved);
                    line.runs.push(existing);
                    continue;
                }
            };

            let right_range = TextRange::new(inserted_end, range.end + inserted);
            let (left, right) = if supports_text(&existing) {
                let mut left = existing.run().clone_run();
                left.move_to(Rc::clone(&new_text), TextRange::new(range.begin, offset));
                existing.move_to(Rc::clone(&new_text), right_range);
                (RunModel::new(left), existing)
            } else if offset == range.begin {
                let left = default_text_run(&new_text, TextRange::empty_at(offset), &style);
                existing.move_to(Rc::clone(&new_text), right_range);
                (left, existing)
            } else {
                existing.move_to(Rc::clone(&new_text), range);
                (existing, default_text_run(&new_text, right_range, &style))
            };

            new_run.move_to(Rc::clone(&new_text), TextRange::new(offset, inserted_end));
            if !left.text_range().is_empty() {
                line.runs.push(left);
            }
            line.runs.push(RunModel::new(new_run));
            if !right.text_range().is_empty() || always_keep_right_run {
                line.runs.push(right);
            }
        }
        if let Some(mut new_run) = pending {
            new_run.move_to(Rc::clone(&new_text), TextRange::new(offset, inserted_end));
            line.runs.push(RunModel::new(new_run));
        }

        debug!(%location, bytes = inserted, "run inserted");
        self.mark_layout_dirty();
        Ok(())
    }

    /// Remove up to `count` bytes starting at `location`.
    ///
    /// # Panics
    ///
    /// Panics if either end of the removal is not a char boundary.
    #[track_caller]
    pub fn remove_at(&mut self, location: TextLocation, count: usize) -> Result<()> {
        let style = self.config.default_style.clone();
        let line = self.line_mut(location.line_index)?;
        assert_char_boundary(&line.text, location);
        let offset = location.offset;
        let count = count.min(line.text.len() - offset);
        if count == 0 {
            return Err(LayoutError::EmptyRemoval { location });
        }
        let removed = TextRange::new(offset, offset + count);
        assert_char_boundary(&line.text, TextLocation::new(location.line_index, removed.end));

        let mut remaining = String::with_capacity(line.text.len() - count);
        remaining.push_str(&line.text[..removed.begin]);
        remaining.push_str(&line.text[removed.end..]);
        let new_text = line.replace_text(remaining);

        let mut index = line.runs.len();
        while index > 0 {
            index -= 1;
            let range = line.runs[index].text_range();
            match range.non_empty_intersect(&removed) {
                None if range.begin >= removed.end => {
                    line.runs[index].move_to(Rc::clone(&new_text), range.shifted_left(count));
                }
                None if range.is_empty() && removed.contains(range.begin) => {
                    line.runs.remove(index);
                }
                None => {
                    if range.end <= removed.begin {
                        break;
                    }
                }
                Some(intersection) => {
                    if intersection.len() == range.len() {
                        line.runs.remove(index);
                        if line.runs.is_empty() {
                            line.runs
                                .push(default_text_run(&new_text, TextRange::empty_at(0), &style));
                        }
                    } else if range.begin > removed.begin {
                        line.runs[index].move_to(
                            Rc::clone(&new_text),
                            TextRange::new(removed.begin, range.end - count),
                        );
                    } else {
                        line.runs[index].move_to(
                            Rc::clone(&new_text),
                            TextRange::new(range.begin, range.end - intersection.len()),
                        );
                    }
                    if range.begin <= removed.begin {
                        break;
                    }
                }
            }
        }
        line.rebind_runs();

        debug!(%location, bytes = count, "text removed");
        self.mark_layout_dirty();
        Ok(())
    }

    /// Split a line in two at `location`. Decorations of the line are
    /// dropped.
    ///
    /// # Panics
    ///
    /// Panics if the offset is not a char boundary of the line.
    #[track_caller]
    pub fn split_line_at(&mut self, location: TextLocation) -> Result<()> {
        let style = self.config.default_style.clone();
        let shaper = Rc::clone(&self.shaper);
        let line = self.line_mut(location.line_index)?;
        assert_char_boundary(&line.text, location);
        let offset = location.offset;

        let left_text: Rc<str> = Rc::from(&line.text[..offset]);
        let right_text: Rc<str> = Rc::from(&line.text[offset..]);
        let runs = std::mem::take(&mut line.runs);
        let count = runs.len();

        let mut left_runs: Vec<Box<dyn Run>> = Vec::new();
        let mut right_runs: Vec<Box<dyn Run>> = Vec::new();
        let mut before = true;
        for (index, model) in runs.into_iter().enumerate() {
            let range = model.text_range();
            let is_last = index + 1 == count;
            let opaque = !supports_text(&model);
            let mut run = model.into_run();
            if before && (range.contains(offset) || is_last) {
                before = false;
                let right_range = TextRange::new(0, range.end - offset);
                if !opaque {
                    let mut left = run.clone_run();
                    left.move_to(Rc::clone(&left_text), TextRange::new(range.begin, offset));
                    run.move_to(Rc::clone(&right_text), right_range);
                    left_runs.push(left);
                    right_runs.push(run);
                } else if offset == range.begin {
                    left_runs.push(default_text_run(&left_text, TextRange::empty_at(offset), &style).into_run());
                    run.move_to(Rc::clone(&right_text), right_range);
                    right_runs.push(run);
                } else {
                    run.move_to(Rc::clone(&left_text), TextRange::new(range.begin, offset));
                    left_runs.push(run);
                    right_runs.push(default_text_run(&right_text, right_range, &style).into_run());
                }
            } else if before {
                run.move_to(Rc::clone(&left_text), range);
                left_runs.push(run);
            } else {
                run.move_to(Rc::clone(&right_text), range.shifted_left(offset));
                right_runs.push(run);
            }
        }

        let index = location.line_index;
        self.line_models[index] = LineModel::new(left_text, left_runs, Rc::clone(&shaper));
        self.line_models
            .insert(index + 1, LineModel::new(right_text, right_runs, shaper));
        self.renumber_lines_from(index + 1);
        debug!(%location, "line split");
        self.mark_layout_dirty();
        Ok(())
    }

    /// Append the next line to `line_index` and remove it.
    pub fn join_line_with_next_line(&mut self, line_index: usize) -> Result<()> {
        let count = self.line_models.len();
        if line_index >= count {
            return Err(LayoutError::invalid_line(line_index, count));
        }
        if line_index + 1 >= count {
            return Err(LayoutError::invalid_line(line_index + 1, count));
        }

        let next = self.line_models.remove(line_index + 1);
        if !next.text.is_empty() {
            let line = &mut self.line_models[line_index];
            let shift = line.text.len();
            let mut joined = String::with_capacity(shift + next.text.len());
            joined.push_str(&line.text);
            joined.push_str(&next.text);
            let new_text = line.replace_text(joined);
            line.rebind_runs();
            for model in next.runs {
                let range = model.text_range();
                if range.is_empty() {
                    continue;
                }
                let mut run = model.into_run();
                run.move_to(Rc::clone(&new_text), range.shifted_right(shift));
                line.runs.push(RunModel::new(run));
            }
        }

        self.renumber_lines_from(line_index + 1);
        debug!(line = line_index, "lines joined");
        self.mark_layout_dirty();
        Ok(())
    }

    // -- Painting ----------------------------------------------------------

    /// Paint every view with its top-left corner at `origin`.
    pub fn paint(&mut self, origin: Vec2, sink: &mut dyn PaintSink) {
        self.update_if_needed();
        let geometry = PaintGeometry::new(origin, self.config.scale);
        for view in &self.line_views {
            for highlight in &view.underlay_highlights {
                highlight.highlighter.paint(view, highlight, &geometry, sink);
            }
            let line = &mut self.line_models[view.model_index];
            for block in &view.blocks {
                let (run, mut ctx) = line.run_and_context(block.handle().run, block.text_context());
                if let Some(renderer) = block.renderer() {
                    renderer.paint(block, &geometry, &mut ctx, sink);
                } else if let Some(painter) = run.run().painter() {
                    painter.paint(block, &geometry, &mut ctx, sink);
                }
            }
            for highlight in &view.overlay_highlights {
                highlight.highlighter.paint(view, highlight, &geometry, sink);
            }
        }
        trace!(views = self.line_views.len(), "painted");
    }
}
