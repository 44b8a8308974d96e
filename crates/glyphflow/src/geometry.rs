#![forbid(unsafe_code)]

//! Geometric primitives.
//!
//! Layout space is `f32` pixels with the origin at the top-left corner of the
//! layout. All values handed out by the engine are already multiplied by the
//! layout scale.

use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// A 2D vector used for positions, offsets and sizes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vec2 {
    /// Horizontal component.
    pub x: f32,
    /// Vertical component.
    pub y: f32,
}

impl Vec2 {
    /// The zero vector.
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    /// Create a new vector.
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// A size with no width, only height.
    #[inline]
    pub const fn height_only(height: f32) -> Self {
        Self { x: 0.0, y: height }
    }

    /// Whether both components are exactly zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

impl Add for Vec2 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Vec2 {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

/// An axis-aligned rectangle used for block geometry and hit testing.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LayoutRect {
    /// Top-left corner.
    pub origin: Vec2,
    /// Width and height.
    pub size: Vec2,
}

impl LayoutRect {
    /// Create a new rectangle.
    #[inline]
    pub const fn new(origin: Vec2, size: Vec2) -> Self {
        Self { origin, size }
    }

    /// Left edge (inclusive).
    #[inline]
    pub fn left(&self) -> f32 {
        self.origin.x
    }

    /// Top edge (inclusive).
    #[inline]
    pub fn top(&self) -> f32 {
        self.origin.y
    }

    /// Right edge (exclusive).
    #[inline]
    pub fn right(&self) -> f32 {
        self.origin.x + self.size.x
    }

    /// Bottom edge (exclusive).
    #[inline]
    pub fn bottom(&self) -> f32 {
        self.origin.y + self.size.y
    }

    /// Check if a point is inside the rectangle.
    #[inline]
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.left()
            && point.x < self.right()
            && point.y >= self.top()
            && point.y < self.bottom()
    }

    /// The same rectangle moved by `delta`.
    #[inline]
    pub fn translate(&self, delta: Vec2) -> Self {
        Self::new(self.origin + delta, self.size)
    }
}

/// Space around the text content, in unscaled layout units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Margin {
    /// Space above the first line.
    pub top: f32,
    /// Space right of the content.
    pub right: f32,
    /// Space below the last line.
    pub bottom: f32,
    /// Space left of the content.
    pub left: f32,
}

impl Margin {
    /// Create new margins with equal values.
    pub const fn all(val: f32) -> Self {
        Self {
            top: val,
            right: val,
            bottom: val,
            left: val,
        }
    }

    /// Create new margins with horizontal values only.
    pub const fn horizontal(val: f32) -> Self {
        Self {
            top: 0.0,
            right: val,
            bottom: 0.0,
            left: val,
        }
    }

    /// Create new margins with vertical values only.
    pub const fn vertical(val: f32) -> Self {
        Self {
            top: val,
            right: 0.0,
            bottom: val,
            left: 0.0,
        }
    }

    /// Create new margins with specific values.
    pub const fn new(top: f32, right: f32, bottom: f32, left: f32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// Sum of left and right.
    #[inline]
    pub fn horizontal_sum(&self) -> f32 {
        self.left + self.right
    }

    /// Sum of top and bottom.
    #[inline]
    pub fn vertical_sum(&self) -> f32 {
        self.top + self.bottom
    }

    /// Offset of the content's top-left corner.
    #[inline]
    pub fn top_left(&self) -> Vec2 {
        Vec2::new(self.left, self.top)
    }
}
