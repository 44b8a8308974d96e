#![forbid(unsafe_code)]

//! Layout blocks: positioned fragments of one run on one soft line.
//!
//! Blocks are recreated on every layout pass. They refer back to their run
//! through a [`RunHandle`], which is only meaningful until the next edit.

use std::fmt;
use std::rc::Rc;

use crate::bidi::TextDirection;
use crate::geometry::{LayoutRect, Vec2};
use crate::location::TextRange;
use crate::paint::{PaintGeometry, PaintSink};
use crate::run::RunTextContext;
use crate::shaping::ShapedTextContext;

/// Index of a run within a layout: line model index plus run index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RunHandle {
    pub line: usize,
    pub run: usize,
}

impl RunHandle {
    #[inline]
    pub const fn new(line: usize, run: usize) -> Self {
        Self { line, run }
    }
}

/// Where a hit-test point landed relative to the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextHitPoint {
    #[default]
    WithinText,
    /// Left of the first character of a line view.
    LeftGutter,
    /// Right of the last character of a line view.
    RightGutter,
}

/// Custom painter for a range of a line, replacing the run's own painting.
pub trait RunRenderer: fmt::Debug {
    fn paint(
        &self,
        block: &LayoutBlock,
        geometry: &PaintGeometry,
        ctx: &mut RunTextContext<'_>,
        sink: &mut dyn PaintSink,
    );
}

/// Everything a run needs to construct a block.
#[derive(Debug, Clone)]
pub struct BlockDefinition {
    pub handle: RunHandle,
    pub range: TextRange,
    pub renderer: Option<Rc<dyn RunRenderer>>,
}

/// One visually contiguous fragment of a run.
#[derive(Debug, Clone)]
pub struct LayoutBlock {
    handle: RunHandle,
    range: TextRange,
    size: Vec2,
    location: Vec2,
    renderer: Option<Rc<dyn RunRenderer>>,
    text_context: ShapedTextContext,
    direction: TextDirection,
}

impl LayoutBlock {
    pub fn new(
        definition: &BlockDefinition,
        size: Vec2,
        text_context: ShapedTextContext,
        direction: TextDirection,
    ) -> Self {
        Self {
            handle: definition.handle,
            range: definition.range,
            size,
            location: Vec2::ZERO,
            renderer: definition.renderer.clone(),
            text_context,
            direction,
        }
    }

    #[inline]
    pub fn handle(&self) -> RunHandle {
        self.handle
    }

    #[inline]
    pub fn text_range(&self) -> TextRange {
        self.range
    }

    #[inline]
    pub fn size(&self) -> Vec2 {
        self.size
    }

    /// Top-left corner in layout space.
    #[inline]
    pub fn location_offset(&self) -> Vec2 {
        self.location
    }

    pub fn set_location_offset(&mut self, location: Vec2) {
        self.location = location;
    }

    /// Move the block by `delta`.
    pub fn translate(&mut self, delta: Vec2) {
        self.location += delta;
    }

    #[inline]
    pub fn renderer(&self) -> Option<&Rc<dyn RunRenderer>> {
        self.renderer.as_ref()
    }

    #[inline]
    pub fn text_context(&self) -> ShapedTextContext {
        self.text_context
    }

    #[inline]
    pub fn direction(&self) -> TextDirection {
        self.direction
    }

    /// Rectangle covered by the block.
    #[inline]
    pub fn rect(&self) -> LayoutRect {
        LayoutRect::new(self.location, self.size)
    }
}
