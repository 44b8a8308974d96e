#![forbid(unsafe_code)]

//! Composite queries layered over [`ShapedTextCache`].
//!
//! Every function first shapes (or fetches) the whole run and answers from
//! that sequence. When the wider shape cannot answer, for instance because
//! the requested range splits a cluster, the narrower range is shaped on its
//! own instead. Fallbacks are silent.

use std::rc::Rc;

use smallvec::SmallVec;
use unicode_segmentation::UnicodeSegmentation;

use crate::bidi::TextDirection;
use crate::geometry::Vec2;
use crate::location::TextRange;
use crate::shaped_cache::{ShapedTextCache, ShapedTextCacheKey};
use crate::shaping::{ShapedGlyph, ShapedGlyphSequence, ShapedTextContext, ShapingMethod};

/// The sequence that can answer questions about `range`: the run's full
/// shape when it is cluster aligned there, otherwise a shape of `range` alone.
fn sequence_for_range(
    cache: &mut ShapedTextCache,
    run_key: &ShapedTextCacheKey,
    range: TextRange,
    text: &str,
) -> Rc<ShapedGlyphSequence> {
    let full = cache.find_or_add_shaped_text(run_key, text, None);
    if full.is_cluster_aligned(range) {
        return full;
    }
    tracing::trace!(%range, "shaping narrower range");
    cache.find_or_add_shaped_text(&run_key.with_range(range), text, None)
}

/// Size of `text[range]` as shaped within the run keyed by `run_key`.
pub fn measure_shaped_text(
    cache: &mut ShapedTextCache,
    run_key: &ShapedTextCacheKey,
    range: TextRange,
    text: &str,
) -> Vec2 {
    let full = cache.find_or_add_shaped_text(run_key, text, None);
    if let Some(width) = full.measured_width_in(range) {
        return Vec2::new(width, full.text_height());
    }
    tracing::trace!(%range, "measurement fallback");
    let narrow = cache.find_or_add_shaped_text(&run_key.with_range(range), text, None);
    Vec2::new(narrow.measured_width(), narrow.text_height())
}

/// Logical character index under `x`, where `x` is relative to the left edge
/// of `range`.
///
/// Points left or right of the range resolve to the logical edge of the
/// visually outermost glyph.
pub fn find_character_index_at_offset(
    cache: &mut ShapedTextCache,
    run_key: &ShapedTextCacheKey,
    range: TextRange,
    text: &str,
    x: f32,
) -> usize {
    let seq = sequence_for_range(cache, run_key, range, text);
    let Some(hit) = seq.glyph_at_offset_in(range, x) else {
        return outside_hit_index(&seq, range, x);
    };
    let glyph = seq.glyphs()[hit.glyph_index];

    if glyph.is_ligature() {
        return ligature_constituent_at(cache, run_key, text, &glyph, hit.left, hit.width, x);
    }

    let first_half = x - hit.left < hit.width / 2.0;
    match (glyph.direction, first_half) {
        (TextDirection::LeftToRight, true) | (TextDirection::RightToLeft, false) => {
            glyph.source_index
        }
        (TextDirection::LeftToRight, false) | (TextDirection::RightToLeft, true) => {
            glyph.source_end()
        }
    }
}

fn outside_hit_index(seq: &ShapedGlyphSequence, range: TextRange, x: f32) -> usize {
    let Some((leftmost, rightmost)) = seq.edge_glyphs_in(range) else {
        return range.begin;
    };
    if x < 0.0 {
        if leftmost.direction.is_rtl() {
            leftmost.source_end()
        } else {
            leftmost.source_index
        }
    } else if rightmost.direction.is_rtl() {
        rightmost.source_index
    } else {
        rightmost.source_end()
    }
}

/// Walk the constituents of a ligature glyph, testing `x` against the visual
/// center of each one.
///
/// Returns the begin of the last constituent whose center `x` has reached,
/// or the first constituent when none has been reached. Right-to-left glyphs
/// are walked from their right edge leftwards.
fn ligature_constituent_at(
    cache: &mut ShapedTextCache,
    run_key: &ShapedTextCacheKey,
    text: &str,
    glyph: &ShapedGlyph,
    glyph_left: f32,
    glyph_width: f32,
    x: f32,
) -> usize {
    let cluster = glyph.source_range();
    let constituents: SmallVec<[TextRange; 4]> = text[cluster.as_range()]
        .grapheme_indices(true)
        .map(|(offset, g)| {
            let begin = cluster.begin + offset;
            TextRange::new(begin, begin + g.len())
        })
        .collect();

    let mut widths: SmallVec<[f32; 4]> = SmallVec::with_capacity(constituents.len());
    for constituent in &constituents {
        let seq = cache.find_or_add_shaped_text(
            &run_key.with_range(*constituent),
            text,
            Some(glyph.direction),
        );
        widths.push(seq.measured_width());
    }

    let mut found = cluster.begin;
    let rtl = glyph.direction.is_rtl();
    let mut pen = if rtl { glyph_left + glyph_width } else { glyph_left };

    for (i, (constituent, width)) in constituents.iter().zip(widths.iter()).enumerate() {
        if i > 0 {
            let kerning = f32::from(get_shaped_glyph_kerning(cache, run_key, constituent.begin, text));
            pen += if rtl { -kerning } else { kerning };
        }
        if rtl {
            let center = pen - width / 2.0;
            if x <= center {
                found = constituent.begin;
            }
            pen -= width;
        } else {
            let center = pen + width / 2.0;
            if x >= center {
                found = constituent.begin;
            }
            pen += width;
        }
    }
    found
}

/// Kerning between the character at `index` and the one logically before it.
///
/// Falls back to kerning-only shaping of the character pair when the run's
/// shape has no glyph starting at `index`.
pub fn get_shaped_glyph_kerning(
    cache: &mut ShapedTextCache,
    run_key: &ShapedTextCacheKey,
    index: usize,
    text: &str,
) -> i8 {
    let full = cache.find_or_add_shaped_text(run_key, text, None);
    if let Some(kerning) = full.kerning_at(index) {
        return kerning;
    }

    let Some(previous) = text[..index].chars().next_back() else {
        return 0;
    };
    let Some(next) = text[index..].chars().next() else {
        return 0;
    };
    let pair = TextRange::new(index - previous.len_utf8(), index + next.len_utf8());
    let key = ShapedTextCacheKey::new(
        pair,
        run_key.scale(),
        ShapedTextContext::new(
            ShapingMethod::KerningOnly,
            run_key.text_context.base_direction,
        ),
        run_key.font.clone(),
    );
    tracing::trace!(index, "kerning fallback");
    cache
        .find_or_add_shaped_text(&key, text, None)
        .kerning_at(index)
        .unwrap_or(0)
}

/// Renderable sequence for `range`, used at paint time.
///
/// Tries the exact sub-range key, then a left-to-right slice of the run's
/// existing shape, then shapes `range` in `direction`.
pub fn get_shaped_text_sub_sequence(
    cache: &mut ShapedTextCache,
    run_key: &ShapedTextCacheKey,
    range: TextRange,
    text: &str,
    direction: TextDirection,
) -> Rc<ShapedGlyphSequence> {
    let sub_key = run_key.with_range(range);
    if let Some(seq) = cache.find_shaped_text(&sub_key) {
        return seq;
    }
    if let Some(sub) = cache
        .find_shaped_text(run_key)
        .and_then(|full| full.sub_sequence(range))
    {
        return cache.add_shaped_sequence(sub_key, sub);
    }
    tracing::trace!(%range, "sub-sequence fallback");
    cache.add_shaped_text(sub_key, text, Some(direction))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bidi::TextFlowDirection;
    use crate::shaping::MonospaceShaper;
    use crate::style::{FontId, FontInfo};

    const ALEF_BET_GIMEL: &str = "\u{05d0}\u{05d1}\u{05d2}";

    fn cache_with(shaper: MonospaceShaper) -> ShapedTextCache {
        ShapedTextCache::new(Rc::new(shaper))
    }

    fn run_key(text: &str, base: TextFlowDirection) -> ShapedTextCacheKey {
        ShapedTextCacheKey::new(
            TextRange::new(0, text.len()),
            1.0,
            ShapedTextContext::new(ShapingMethod::Auto, base),
            FontInfo::new(FontId(0), 20.0),
        )
    }

    fn ltr_key(text: &str) -> ShapedTextCacheKey {
        run_key(text, TextFlowDirection::LeftToRight)
    }

    #[test]
    fn measure_sub_range_from_full_shape() {
        let mut cache = cache_with(MonospaceShaper::new());
        let text = "Hello world";
        let key = ltr_key(text);
        let size = measure_shaped_text(&mut cache, &key, TextRange::new(0, 6), text);
        assert_eq!(size, Vec2::new(60.0, 20.0));
        // Only the full run was shaped.
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn measure_falls_back_inside_ligature() {
        let mut cache = cache_with(MonospaceShaper::new().with_ligature("ffi", 9));
        let text = "ffi";
        let key = ltr_key(text);
        let size = measure_shaped_text(&mut cache, &key, TextRange::new(0, 2), text);
        assert_eq!(size.x, 20.0);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn single_glyph_hit_resolves_by_half() {
        let mut cache = cache_with(MonospaceShaper::new());
        let text = "abc";
        let key = ltr_key(text);
        let range = TextRange::new(0, 3);
        assert_eq!(find_character_index_at_offset(&mut cache, &key, range, text, 4.0), 0);
        assert_eq!(find_character_index_at_offset(&mut cache, &key, range, text, 6.0), 1);
        assert_eq!(find_character_index_at_offset(&mut cache, &key, range, text, 13.0), 1);
        assert_eq!(find_character_index_at_offset(&mut cache, &key, range, text, 17.0), 2);
        assert_eq!(find_character_index_at_offset(&mut cache, &key, range, text, -3.0), 0);
        assert_eq!(find_character_index_at_offset(&mut cache, &key, range, text, 99.0), 3);
    }

    #[test]
    fn rtl_single_glyph_hit_is_mirrored() {
        let mut cache = cache_with(MonospaceShaper::new());
        let text = "\u{05d0}\u{05d1}";
        let key = run_key(text, TextFlowDirection::Auto);
        let range = TextRange::new(0, text.len());
        // Visually: bet [0,10), alef [10,20).
        assert_eq!(find_character_index_at_offset(&mut cache, &key, range, text, 3.0), 4);
        assert_eq!(find_character_index_at_offset(&mut cache, &key, range, text, 7.0), 2);
        assert_eq!(find_character_index_at_offset(&mut cache, &key, range, text, 12.0), 2);
        assert_eq!(find_character_index_at_offset(&mut cache, &key, range, text, 18.0), 0);
        assert_eq!(find_character_index_at_offset(&mut cache, &key, range, text, 25.0), 0);
    }

    #[test]
    fn ligature_hit_walks_constituent_centers() {
        let mut cache = cache_with(MonospaceShaper::new().with_ligature("ffi", 9));
        let text = "ffi";
        let key = ltr_key(text);
        let range = TextRange::new(0, 3);
        assert_eq!(find_character_index_at_offset(&mut cache, &key, range, text, 4.0), 0);
        assert_eq!(find_character_index_at_offset(&mut cache, &key, range, text, 16.0), 1);
        assert_eq!(find_character_index_at_offset(&mut cache, &key, range, text, 26.0), 2);
    }

    #[test]
    fn rtl_ligature_walks_from_right_edge() {
        let shaper = MonospaceShaper::new().with_ligature(ALEF_BET_GIMEL, 9);
        let mut cache = cache_with(shaper);
        let text = ALEF_BET_GIMEL;
        let key = run_key(text, TextFlowDirection::Auto);
        let range = TextRange::new(0, text.len());
        assert_eq!(find_character_index_at_offset(&mut cache, &key, range, text, 28.0), 0);
        assert_eq!(find_character_index_at_offset(&mut cache, &key, range, text, 14.0), 2);
        assert_eq!(find_character_index_at_offset(&mut cache, &key, range, text, 3.0), 4);
    }

    #[test]
    fn kerning_lookup_and_fallback() {
        let shaper = MonospaceShaper::new()
            .with_ligature("fi", 9)
            .with_kerning_pair('f', 'i', -3)
            .with_kerning_pair('A', 'V', -2);
        let mut cache = cache_with(shaper);
        let text = "AVfi";
        let key = ltr_key(text);
        assert_eq!(get_shaped_glyph_kerning(&mut cache, &key, 1, text), -2);
        // No glyph starts inside the ligature; the pair is shaped without it.
        assert_eq!(get_shaped_glyph_kerning(&mut cache, &key, 3, text), -3);
        assert_eq!(get_shaped_glyph_kerning(&mut cache, &key, 0, text), 0);
    }

    #[test]
    fn sub_sequence_prefers_exact_then_slice() {
        let mut cache = cache_with(MonospaceShaper::new());
        let text = "Hello world";
        let key = ltr_key(text);
        let _ = cache.find_or_add_shaped_text(&key, text, None);
        let range = TextRange::new(6, 11);
        let sub = get_shaped_text_sub_sequence(&mut cache, &key, range, text, TextDirection::LeftToRight);
        assert_eq!(sub.source_range(), range);
        assert_eq!(sub.measured_width(), 50.0);
        let again = get_shaped_text_sub_sequence(&mut cache, &key, range, text, TextDirection::LeftToRight);
        assert!(Rc::ptr_eq(&sub, &again));
    }

    #[test]
    fn sub_sequence_reshapes_rtl() {
        let mut cache = cache_with(MonospaceShaper::new());
        let text = ALEF_BET_GIMEL;
        let key = run_key(text, TextFlowDirection::Auto);
        let _ = cache.find_or_add_shaped_text(&key, text, None);
        let range = TextRange::new(2, 6);
        let sub = get_shaped_text_sub_sequence(&mut cache, &key, range, text, TextDirection::RightToLeft);
        assert_eq!(sub.glyphs().len(), 2);
        assert_eq!(sub.glyphs()[0].source_index, 4);
    }
}
