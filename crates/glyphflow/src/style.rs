#![forbid(unsafe_code)]

//! Style values passed explicitly to runs.
//!
//! Nothing here is looked up from global state: a run owns the style it was
//! created with and hands the relevant pieces to the shaper and the paint
//! sink.

use smallvec::SmallVec;

use crate::geometry::Vec2;

// ---------------------------------------------------------------------------
// Font identity types
// ---------------------------------------------------------------------------

/// Opaque identifier for a font face within the application.
///
/// The mapping from `FontId` to actual font data is owned by the shaping
/// backend. The layout engine treats it as a discriminant for cache keying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FontId(pub u32);

/// A single OpenType feature tag + value.
///
/// Value 0 disables the feature, 1 enables it, higher values select alternates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FontFeature {
    /// OpenType tag (4 ASCII bytes, e.g., `*b"liga"`).
    pub tag: [u8; 4],
    /// Feature value.
    pub value: u32,
}

impl FontFeature {
    /// Create a new feature from a tag and value.
    #[inline]
    pub const fn new(tag: [u8; 4], value: u32) -> Self {
        Self { tag, value }
    }

    /// Create an enabled feature from a tag.
    #[inline]
    pub const fn enabled(tag: [u8; 4]) -> Self {
        Self { tag, value: 1 }
    }

    /// Create a disabled feature from a tag.
    #[inline]
    pub const fn disabled(tag: [u8; 4]) -> Self {
        Self { tag, value: 0 }
    }
}

/// A set of OpenType features requested for shaping.
///
/// Stack-allocated for the common case of ≤4 features.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FontFeatures {
    features: SmallVec<[FontFeature; 4]>,
}

impl FontFeatures {
    /// Create an empty feature set.
    #[inline]
    pub fn new() -> Self {
        Self {
            features: SmallVec::new(),
        }
    }

    /// Add a feature to the set.
    #[inline]
    pub fn push(&mut self, feature: FontFeature) {
        self.features.push(feature);
    }

    /// Create from a slice of features, sorted by tag.
    pub fn from_slice(features: &[FontFeature]) -> Self {
        let mut set = Self {
            features: SmallVec::from_slice(features),
        };
        set.canonicalize();
        set
    }

    /// Number of features.
    #[inline]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the feature set is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Iterate over features.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &FontFeature> {
        self.features.iter()
    }

    /// Value of `tag`, if the set mentions it.
    pub fn value_of(&self, tag: [u8; 4]) -> Option<u32> {
        self.features.iter().find(|f| f.tag == tag).map(|f| f.value)
    }

    /// Sort features by tag so equal sets hash equally.
    pub fn canonicalize(&mut self) {
        self.features.sort_by_key(|f| f.tag);
    }
}

/// Everything about a font that affects shaping output.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FontInfo {
    /// Font face identity.
    pub font_id: FontId,
    /// Font size in 1/256th of a pixel.
    pub size_256ths: u32,
    /// Requested OpenType features.
    pub features: FontFeatures,
}

impl FontInfo {
    /// Create a font description from a pixel size.
    pub fn new(font_id: FontId, size_px: f32) -> Self {
        Self {
            font_id,
            size_256ths: (size_px.max(0.0) * 256.0).round() as u32,
            features: FontFeatures::new(),
        }
    }

    /// Builder: set the feature list.
    #[must_use]
    pub fn with_features(mut self, features: FontFeatures) -> Self {
        self.features = features;
        self
    }

    /// Size in pixels (unscaled).
    #[inline]
    pub fn size_px(&self) -> f32 {
        self.size_256ths as f32 / 256.0
    }
}

impl Default for FontInfo {
    fn default() -> Self {
        Self::new(FontId(0), 16.0)
    }
}

// ---------------------------------------------------------------------------
// Colors and decorations
// ---------------------------------------------------------------------------

/// Straight-alpha RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);

    /// Opaque color.
    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Color with explicit alpha.
    #[inline]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Whether painting with this color would be invisible.
    #[inline]
    pub const fn is_transparent(&self) -> bool {
        self.a == 0
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Drop shadow drawn behind glyphs.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShadowStyle {
    /// Offset from the glyph origin, unscaled.
    pub offset: Vec2,
    pub color: Color,
}

/// Glyph outline.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OutlineStyle {
    /// Outline thickness in pixels, unscaled.
    pub size: f32,
    pub color: Color,
}

// ---------------------------------------------------------------------------
// Run styles
// ---------------------------------------------------------------------------

/// Style of a plain text run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextStyle {
    pub font: FontInfo,
    pub color: Color,
    pub shadow: Option<ShadowStyle>,
    pub outline: Option<OutlineStyle>,
}

impl TextStyle {
    /// Create a style with the given font and default color.
    pub fn new(font: FontInfo) -> Self {
        Self {
            font,
            color: Color::default(),
            shadow: None,
            outline: None,
        }
    }

    #[must_use]
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    #[must_use]
    pub fn with_shadow(mut self, shadow: ShadowStyle) -> Self {
        self.shadow = Some(shadow);
        self
    }

    #[must_use]
    pub fn with_outline(mut self, outline: OutlineStyle) -> Self {
        self.outline = Some(outline);
        self
    }
}

impl Default for TextStyle {
    fn default() -> Self {
        Self::new(FontInfo::default())
    }
}

/// Style of a hyperlink run: text style plus an underline.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HyperlinkStyle {
    pub text: TextStyle,
    pub underline_color: Color,
    /// Underline thickness in pixels, unscaled.
    pub underline_thickness: f32,
}

impl HyperlinkStyle {
    /// Underline in the text color, one pixel thick.
    pub fn new(text: TextStyle) -> Self {
        Self {
            underline_color: text.color,
            underline_thickness: 1.0,
            text,
        }
    }
}

impl Default for HyperlinkStyle {
    fn default() -> Self {
        Self::new(TextStyle::default().with_color(Color::rgb(0x3b, 0x82, 0xf6)))
    }
}

/// An image to draw for an image run.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImageBrush {
    /// Host-defined image handle.
    pub image_id: u32,
    /// Desired size, unscaled.
    pub size: Vec2,
    pub tint: Color,
}

impl ImageBrush {
    pub const fn new(image_id: u32, size: Vec2) -> Self {
        Self {
            image_id,
            size,
            tint: Color::WHITE,
        }
    }
}
