#![forbid(unsafe_code)]

//! Painting surface.
//!
//! The engine never draws anything itself. [`crate::layout::TextLayout::paint`]
//! walks the line views and forwards draw calls to a [`PaintSink`] that a
//! rendering backend implements.

use crate::block::LayoutBlock;
use crate::geometry::{LayoutRect, Vec2};
use crate::line::{LineHighlighter, LineView, LineViewHighlight};
use crate::run::RunTextContext;
use crate::shaping::ShapedGlyphSequence;
use crate::style::{Color, ImageBrush, OutlineStyle};

/// Receiver of draw calls.
pub trait PaintSink {
    /// Draw shaped glyphs with their left baseline-box corner at `position`.
    fn draw_shaped_text(
        &mut self,
        glyphs: &ShapedGlyphSequence,
        position: Vec2,
        color: Color,
        outline: Option<OutlineStyle>,
    );

    /// Fill a rectangle.
    fn draw_box(&mut self, rect: LayoutRect, color: Color);

    fn draw_image(&mut self, brush: &ImageBrush, rect: LayoutRect);

    /// Draw the host widget identified by `widget_id` into `rect`.
    fn draw_widget(&mut self, widget_id: u64, rect: LayoutRect);
}

/// Placement of a layout on the paint surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaintGeometry {
    /// Where the layout's top-left corner lands.
    pub origin: Vec2,
    /// Layout scale, for converting unscaled style values.
    pub scale: f32,
}

impl PaintGeometry {
    pub const fn new(origin: Vec2, scale: f32) -> Self {
        Self { origin, scale }
    }

    /// Absolute rectangle of `block`.
    pub fn block_rect(&self, block: &LayoutBlock) -> LayoutRect {
        block.rect().translate(self.origin)
    }
}

/// Optional paint capability of a run.
pub trait RunPaint {
    fn paint(
        &self,
        block: &LayoutBlock,
        geometry: &PaintGeometry,
        ctx: &mut RunTextContext<'_>,
        sink: &mut dyn PaintSink,
    );
}

/// Fills the highlighted span of a line view with a flat color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolidHighlighter {
    pub color: Color,
}

impl SolidHighlighter {
    pub const fn new(color: Color) -> Self {
        Self { color }
    }

    /// Absolute rectangle covered by `highlight` on `line`.
    pub fn highlight_rect(
        line: &LineView,
        highlight: &LineViewHighlight,
        geometry: &PaintGeometry,
    ) -> LayoutRect {
        LayoutRect::new(
            geometry.origin + line.offset() + Vec2::new(highlight.offset_x, 0.0),
            Vec2::new(highlight.width, line.size().y),
        )
    }
}

impl LineHighlighter for SolidHighlighter {
    fn paint(
        &self,
        line: &LineView,
        highlight: &LineViewHighlight,
        geometry: &PaintGeometry,
        sink: &mut dyn PaintSink,
    ) {
        if highlight.width > 0.0 {
            sink.draw_box(Self::highlight_rect(line, highlight, geometry), self.color);
        }
    }
}
