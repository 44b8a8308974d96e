#![forbid(unsafe_code)]

//! Shaped-text cache.
//!
//! Maps `(text range, scale, shaping context, font)` to a previously shaped
//! [`ShapedGlyphSequence`]. There is no eviction: entries live until
//! [`ShapedTextCache::clear`]. Font invalidation marks entries dirty and the
//! next lookup replaces them.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use glyphflow::location::TextRange;
//! use glyphflow::shaped_cache::{ShapedTextCache, ShapedTextCacheKey};
//! use glyphflow::shaping::{MonospaceShaper, ShapedTextContext};
//! use glyphflow::style::FontInfo;
//!
//! let mut cache = ShapedTextCache::new(Rc::new(MonospaceShaper::new()));
//! let key = ShapedTextCacheKey::new(
//!     TextRange::new(0, 5),
//!     1.0,
//!     ShapedTextContext::default(),
//!     FontInfo::default(),
//! );
//! let a = cache.find_or_add_shaped_text(&key, "Hello", None);
//! let b = cache.find_or_add_shaped_text(&key, "Hello", None);
//! assert!(Rc::ptr_eq(&a, &b));
//! assert_eq!(cache.stats().hits, 1);
//! ```

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::bidi::TextDirection;
use crate::location::TextRange;
use crate::shaping::{ShapedGlyphSequence, ShapedTextContext, TextShaper};
use crate::style::FontInfo;

// ---------------------------------------------------------------------------
// Cache key
// ---------------------------------------------------------------------------

/// Structural key of a shaped sequence.
///
/// The scale is stored as its bit pattern so the key can be `Eq + Hash`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShapedTextCacheKey {
    pub text_range: TextRange,
    scale_bits: u32,
    pub text_context: ShapedTextContext,
    pub font: FontInfo,
}

impl ShapedTextCacheKey {
    pub fn new(
        text_range: TextRange,
        scale: f32,
        text_context: ShapedTextContext,
        font: FontInfo,
    ) -> Self {
        Self {
            text_range,
            scale_bits: scale.to_bits(),
            text_context,
            font,
        }
    }

    #[inline]
    pub fn scale(&self) -> f32 {
        f32::from_bits(self.scale_bits)
    }

    /// The same key for a different range.
    #[must_use]
    pub fn with_range(&self, text_range: TextRange) -> Self {
        Self {
            text_range,
            ..self.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Cache statistics for monitoring and tuning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShapedTextCacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that found nothing.
    pub misses: u64,
    /// Lookups that found a dirty entry and dropped it.
    pub stale_evictions: u64,
    /// Current number of entries.
    pub size: usize,
}

impl ShapedTextCacheStats {
    /// Hit rate in `[0, 1]`.
    #[inline]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// ---------------------------------------------------------------------------
// ShapedTextCache
// ---------------------------------------------------------------------------

/// Per-line cache of shaped glyph sequences.
pub struct ShapedTextCache {
    shaper: Rc<dyn TextShaper>,
    entries: FxHashMap<ShapedTextCacheKey, Rc<ShapedGlyphSequence>>,
    stats: ShapedTextCacheStats,
}

impl fmt::Debug for ShapedTextCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShapedTextCache")
            .field("entries", &self.entries.len())
            .field("stats", &self.stats)
            .finish()
    }
}

impl ShapedTextCache {
    /// Create an empty cache that shapes with `shaper`.
    pub fn new(shaper: Rc<dyn TextShaper>) -> Self {
        Self {
            shaper,
            entries: FxHashMap::default(),
            stats: ShapedTextCacheStats::default(),
        }
    }

    /// The shaping backend.
    #[inline]
    pub fn shaper(&self) -> &Rc<dyn TextShaper> {
        &self.shaper
    }

    /// Look up a clean entry.
    ///
    /// A dirty entry is removed and reported as absent.
    pub fn find_shaped_text(&mut self, key: &ShapedTextCacheKey) -> Option<Rc<ShapedGlyphSequence>> {
        match self.entries.get(key) {
            Some(seq) if !seq.is_dirty() => {
                self.stats.hits += 1;
                tracing::trace!(range = %key.text_range, "shaped text cache hit");
                Some(Rc::clone(seq))
            }
            Some(_) => {
                self.entries.remove(key);
                self.stats.stale_evictions += 1;
                self.stats.misses += 1;
                self.stats.size = self.entries.len();
                tracing::trace!(range = %key.text_range, "shaped text cache stale entry");
                None
            }
            None => {
                self.stats.misses += 1;
                tracing::trace!(range = %key.text_range, "shaped text cache miss");
                None
            }
        }
    }

    /// Shape `text[key.text_range]` and store it, replacing any entry.
    ///
    /// Shapes bidirectionally when `direction` is `None`.
    pub fn add_shaped_text(
        &mut self,
        key: ShapedTextCacheKey,
        text: &str,
        direction: Option<TextDirection>,
    ) -> Rc<ShapedGlyphSequence> {
        let scale = key.scale();
        let method = key.text_context.shaping_method;
        let seq = match direction {
            Some(direction) => self.shaper.shape_unidirectional(
                text,
                key.text_range,
                &key.font,
                scale,
                direction,
                method,
            ),
            None => self.shaper.shape_bidirectional(
                text,
                key.text_range,
                &key.font,
                scale,
                key.text_context.base_direction,
                method,
            ),
        };
        self.add_shaped_sequence(key, seq)
    }

    /// Store an already shaped sequence.
    pub fn add_shaped_sequence(
        &mut self,
        key: ShapedTextCacheKey,
        seq: ShapedGlyphSequence,
    ) -> Rc<ShapedGlyphSequence> {
        let seq = Rc::new(seq);
        self.entries.insert(key, Rc::clone(&seq));
        self.stats.size = self.entries.len();
        seq
    }

    /// Clean entry for `key`, shaping and inserting it on a miss.
    pub fn find_or_add_shaped_text(
        &mut self,
        key: &ShapedTextCacheKey,
        text: &str,
        direction: Option<TextDirection>,
    ) -> Rc<ShapedGlyphSequence> {
        if let Some(seq) = self.find_shaped_text(key) {
            return seq;
        }
        self.add_shaped_text(key.clone(), text, direction)
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.stats.size = 0;
    }

    /// Mark every entry dirty; they are replaced lazily on next access.
    pub fn invalidate(&mut self) {
        for seq in self.entries.values() {
            seq.mark_dirty();
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn stats(&self) -> ShapedTextCacheStats {
        self.stats
    }
}
