//! End-to-end scenarios driving `TextLayout` the way an editor would:
//! building lines, editing them, decorating ranges, and painting.

use std::ops::Range;
use std::rc::Rc;

use glyphflow::{
    Color, FontId, FontInfo, HyperlinkRun, HyperlinkStyle, ImageBrush, ImageRun, Justification,
    LayoutConfig, LayoutRect, LineHighlighter, LineView, LineViewHighlight, Margin,
    MonospaceShaper, OutlineStyle, PaintGeometry, PaintSink, Run, ShapedGlyphSequence,
    SolidHighlighter, TextHitPoint, TextLayout, TextLineHighlight, TextLocation, TextRange,
    TextRun, TextSelection, TextStyle, Vec2,
};

// ── Helpers ─────────────────────────────────────────────────────────────

fn style() -> TextStyle {
    TextStyle::new(FontInfo::new(FontId(0), 20.0))
}

fn layout_with(config: LayoutConfig) -> TextLayout {
    TextLayout::with_config(
        Rc::new(MonospaceShaper::new()),
        config.with_default_style(style()),
    )
    .unwrap()
}

fn view_ranges(layout: &TextLayout) -> Vec<(usize, Range<usize>)> {
    layout
        .line_views()
        .iter()
        .map(|v| (v.model_index(), v.range().as_range()))
        .collect()
}

#[derive(Debug, Default)]
struct RecordingSink {
    calls: Vec<String>,
}

impl PaintSink for RecordingSink {
    fn draw_shaped_text(
        &mut self,
        glyphs: &ShapedGlyphSequence,
        position: Vec2,
        _color: Color,
        _outline: Option<OutlineStyle>,
    ) {
        self.calls.push(format!(
            "text {} at {},{}",
            glyphs.glyphs().len(),
            position.x,
            position.y
        ));
    }

    fn draw_box(&mut self, rect: LayoutRect, _color: Color) {
        self.calls.push(format!(
            "box {},{} {}x{}",
            rect.left(),
            rect.top(),
            rect.size.x,
            rect.size.y
        ));
    }

    fn draw_image(&mut self, brush: &ImageBrush, rect: LayoutRect) {
        self.calls.push(format!(
            "image {} at {},{} {}x{}",
            brush.image_id,
            rect.left(),
            rect.top(),
            rect.size.x,
            rect.size.y
        ));
    }

    fn draw_widget(&mut self, widget_id: u64, rect: LayoutRect) {
        self.calls
            .push(format!("widget {widget_id} at {},{}", rect.left(), rect.top()));
    }
}

/// Records which views it was asked to paint.
#[derive(Debug, Default)]
struct CountingHighlighter {
    painted: std::cell::Cell<usize>,
}

impl LineHighlighter for CountingHighlighter {
    fn paint(
        &self,
        _line: &LineView,
        _highlight: &LineViewHighlight,
        _geometry: &PaintGeometry,
        _sink: &mut dyn PaintSink,
    ) {
        self.painted.set(self.painted.get() + 1);
    }
}

// ── Editing ─────────────────────────────────────────────────────────────

#[test]
fn editing_session_keeps_lines_and_views_consistent() {
    let mut layout = layout_with(LayoutConfig::default().with_wrapping_width(100.0));
    layout.add_text_line("The quick brown fox");
    layout.update_if_needed();
    assert_eq!(view_ranges(&layout), vec![(0, 0..10), (0, 10..19)]);

    layout.split_line_at(TextLocation::new(0, 10)).unwrap();
    layout.update_if_needed();
    assert_eq!(layout.get_as_text(), "The quick \nbrown fox");
    assert_eq!(view_ranges(&layout), vec![(0, 0..10), (1, 0..9)]);

    layout.insert_at(TextLocation::new(1, 9), " jumps").unwrap();
    layout.update_if_needed();
    assert_eq!(
        view_ranges(&layout),
        vec![(0, 0..10), (1, 0..10), (1, 10..15)]
    );

    layout.remove_at(TextLocation::new(1, 9), 6).unwrap();
    layout.join_line_with_next_line(0).unwrap();
    layout.update_if_needed();
    assert_eq!(layout.get_as_text(), "The quick brown fox");
    assert_eq!(view_ranges(&layout), vec![(0, 0..10), (0, 10..19)]);
}

#[test]
fn removing_a_line_reflows_the_rest() {
    let mut layout = layout_with(LayoutConfig::default());
    for text in ["one", "two", "three"] {
        layout.add_text_line(text);
    }
    layout.update_if_needed();
    assert_eq!(layout.draw_size(), Vec2::new(50.0, 60.0));

    layout.remove_line(1).unwrap();
    layout.update_if_needed();
    assert_eq!(layout.get_as_text(), "one\nthree");
    assert_eq!(layout.line_views()[1].offset(), Vec2::new(0.0, 20.0));
    assert_eq!(layout.draw_size(), Vec2::new(50.0, 40.0));
}

#[test]
fn selection_round_trips_through_flattened_offsets() {
    let mut layout = layout_with(LayoutConfig::default());
    layout.add_text_line("alpha beta");
    layout.add_text_line("gamma");
    let (text, offsets) = layout.get_as_text_with_offsets();

    let begin = offsets.text_location_to_offset(TextLocation::new(0, 6)).unwrap();
    let end = offsets.text_location_to_offset(TextLocation::new(1, 3)).unwrap();
    let selection = TextSelection::new(
        offsets.offset_to_text_location(begin).unwrap(),
        offsets.offset_to_text_location(end).unwrap(),
    );
    assert_eq!(layout.get_selection_as_text(selection), &text[begin..end]);
}

// ── Hit testing ─────────────────────────────────────────────────────────

#[test]
fn hit_testing_accounts_for_margins_and_justification() {
    let mut layout = layout_with(
        LayoutConfig::default()
            .with_margin(Margin::new(0.0, 0.0, 0.0, 10.0))
            .with_justification(Justification::Right),
    );
    layout.set_visible_region(Vec2::new(110.0, 40.0), Vec2::ZERO);
    layout.add_text_line("abcdefghij");
    layout.add_text_line("abc");
    layout.update_if_needed();

    // Available width is 110 - 10 of margin; the second line is pushed right.
    assert_eq!(layout.line_views()[1].offset().x, 80.0);
    assert_eq!(
        layout.text_location_at(Vec2::new(82.0, 25.0)),
        (TextLocation::new(1, 0), TextHitPoint::WithinText)
    );
    assert_eq!(
        layout.text_location_at(Vec2::new(40.0, 25.0)),
        (TextLocation::new(1, 0), TextHitPoint::LeftGutter)
    );
    assert_eq!(
        layout.location_at(TextLocation::new(1, 3), false),
        Some(Vec2::new(110.0, 20.0))
    );
}

#[test]
fn word_under_the_pointer() {
    let mut layout = layout_with(LayoutConfig::default());
    layout.add_text_line("select this word");
    layout.update_if_needed();
    let (location, _) = layout.text_location_at(Vec2::new(92.0, 10.0));
    assert_eq!(location, TextLocation::new(0, 9));
    let word = layout.get_word_at(location).unwrap();
    assert_eq!(layout.get_selection_as_text(word), "this");
}

// ── Decorations and painting ────────────────────────────────────────────

#[test]
fn hyperlinks_paint_text_and_underline() {
    let mut layout = layout_with(LayoutConfig::default());
    let text: Rc<str> = Rc::from("see docs");
    let runs: Vec<Box<dyn Run>> = vec![
        Box::new(TextRun::new(Rc::clone(&text), TextRange::new(0, 4), style())),
        Box::new(HyperlinkRun::new(
            Rc::clone(&text),
            TextRange::new(4, 8),
            "https://example.org/docs",
            HyperlinkStyle::new(style()),
        )),
    ];
    layout.add_line(text, runs);

    let mut sink = RecordingSink::default();
    layout.paint(Vec2::ZERO, &mut sink);
    assert_eq!(
        sink.calls,
        vec![
            "text 4 at 0,0".to_owned(),
            "text 4 at 40,0".to_owned(),
            "box 40,17 40x1".to_owned(),
        ]
    );
}

#[test]
fn images_sit_on_the_baseline() {
    let mut layout = layout_with(LayoutConfig::default());
    let text: Rc<str> = Rc::from("a\u{FFFC}");
    let runs: Vec<Box<dyn Run>> = vec![
        Box::new(TextRun::new(Rc::clone(&text), TextRange::new(0, 1), style())),
        Box::new(ImageRun::new(
            Rc::clone(&text),
            TextRange::new(1, 4),
            ImageBrush::new(3, Vec2::new(24.0, 24.0)),
            0.0,
        )),
    ];
    layout.add_line(text, runs);

    let mut sink = RecordingSink::default();
    layout.paint(Vec2::new(0.0, 100.0), &mut sink);
    // The image rises 24 above the baseline, the text 16.
    assert_eq!(
        sink.calls,
        vec![
            "text 1 at 0,108".to_owned(),
            "image 3 at 10,100 24x24".to_owned(),
        ]
    );
    assert_eq!(layout.line_views()[0].size(), Vec2::new(34.0, 28.0));
}

#[test]
fn selection_highlight_spans_wrapped_views() {
    let mut layout = layout_with(LayoutConfig::default().with_wrapping_width(60.0));
    layout.add_text_line("Hello world");
    let counter = Rc::new(CountingHighlighter::default());
    layout
        .add_line_highlight(TextLineHighlight::new(
            0,
            TextRange::new(2, 9),
            -1,
            Rc::clone(&counter) as Rc<dyn LineHighlighter>,
        ))
        .unwrap();
    layout
        .add_line_highlight(TextLineHighlight::new(
            0,
            TextRange::new(2, 9),
            1,
            Rc::new(SolidHighlighter::new(Color::BLACK)),
        ))
        .unwrap();

    let mut sink = RecordingSink::default();
    layout.paint(Vec2::ZERO, &mut sink);
    assert_eq!(counter.painted.get(), 2);
    let boxes: Vec<&String> = sink.calls.iter().filter(|c| c.starts_with("box")).collect();
    assert_eq!(boxes, vec!["box 20,0 40x20", "box 0,20 30x20"]);
}

#[test]
fn painting_a_dirty_layout_updates_it_first() {
    let mut layout = layout_with(LayoutConfig::default());
    layout.add_text_line("ab");
    layout.set_wrapping_width(500.0);
    assert!(layout.dirty_state().is_layout_dirty());
    let mut sink = RecordingSink::default();
    layout.paint(Vec2::ZERO, &mut sink);
    assert!(!layout.dirty_state().is_layout_dirty());
    assert_eq!(sink.calls, vec!["text 2 at 0,0".to_owned()]);
}

// ── Configuration ───────────────────────────────────────────────────────

#[cfg(feature = "serde")]
#[test]
fn config_round_trips_through_json() {
    let config = LayoutConfig::default()
        .with_wrapping_width(320.0)
        .with_margin(Margin::all(4.0))
        .with_justification(Justification::Center);
    let json = serde_json::to_string(&config).unwrap();
    let back: LayoutConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);

    // Missing fields fall back to defaults.
    let partial: LayoutConfig = serde_json::from_str(r#"{"scale": 2.0}"#).unwrap();
    assert_eq!(partial.scale, 2.0);
    assert_eq!(partial.wrapping_width, 0.0);
    assert!(partial.validate().is_ok());
}
