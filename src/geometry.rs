//! Orientation and coordinate transforms
//!
//! Four coordinate spaces meet in this module:
//! - normalized panel fractions (`NormalizedPoint`, fixed point in `0..=ONE`)
//! - logical screen pixels, in which the keyboard is always upright
//! - keyboard-local logical pixels (origin at the top-left of the keyboard)
//! - physical pixels of the keyboard surface as it lands in the framebuffer
//!
//! `Orientation` is the only thing that knows how they relate. Drawing and
//! hit-testing go through it instead of branching on the rotation themselves.

use crate::{Error, Result};

/// Fixed-point representation of 1.0 for normalized coordinates
pub const ONE: u32 = 0x10000;

/// Number of keyboard lines drawn at the bottom of the screen
pub const KEYBOARD_LINES: u32 = 5;

/// The keyboard takes the bottom third of the screen, five lines high
const ROW_HEIGHT_DIVISOR: u32 = 3 * KEYBOARD_LINES;

/// Fixed rotation between the physical framebuffer and logical "up"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Orientation {
    #[default]
    Upright,
    UpsideDown,
    /// Logical top-left appears at the physical top-right
    ClockwiseQuarter,
    /// Logical top-left appears at the physical bottom-left
    CounterClockwiseQuarter,
}

impl Orientation {
    pub const ALL: [Self; 4] = [
        Self::Upright,
        Self::UpsideDown,
        Self::ClockwiseQuarter,
        Self::CounterClockwiseQuarter,
    ];

    /// Map the fbcon rotation numbering (FB_ROTATE_UR, CW, UD, CCW)
    pub fn from_fb_rotate(rotate: u32) -> Option<Self> {
        match rotate {
            0 => Some(Self::Upright),
            1 => Some(Self::ClockwiseQuarter),
            2 => Some(Self::UpsideDown),
            3 => Some(Self::CounterClockwiseQuarter),
            _ => None,
        }
    }

    pub fn is_quarter_turn(self) -> bool {
        matches!(self, Self::ClockwiseQuarter | Self::CounterClockwiseQuarter)
    }

    /// Logical screen size for a physical framebuffer size
    pub fn logical_size(self, physical: Size) -> Size {
        if self.is_quarter_turn() {
            Size::new(physical.h, physical.w)
        } else {
            physical
        }
    }

    /// Physical panel fractions to logical screen fractions
    pub fn to_logical(self, p: NormalizedPoint) -> NormalizedPoint {
        match self {
            Self::Upright => p,
            Self::UpsideDown => NormalizedPoint::new(ONE - p.x, ONE - p.y),
            Self::ClockwiseQuarter => NormalizedPoint::new(p.y, ONE - p.x),
            Self::CounterClockwiseQuarter => NormalizedPoint::new(ONE - p.y, p.x),
        }
    }

    /// Inverse of [`Orientation::to_logical`]
    pub fn to_physical(self, p: NormalizedPoint) -> NormalizedPoint {
        match self {
            Self::Upright => p,
            Self::UpsideDown => NormalizedPoint::new(ONE - p.x, ONE - p.y),
            Self::ClockwiseQuarter => NormalizedPoint::new(ONE - p.y, p.x),
            Self::CounterClockwiseQuarter => NormalizedPoint::new(p.y, ONE - p.x),
        }
    }

    /// Linear part of the logical-to-physical pixel mapping.
    ///
    /// Also handed to the glyph rasterizer so glyphs come out pre-rotated
    /// and their advance vector points along the rotated baseline.
    pub fn matrix(self) -> RotationMatrix {
        match self {
            Self::Upright => RotationMatrix::IDENTITY,
            Self::UpsideDown => RotationMatrix { xx: -1, xy: 0, yx: 0, yy: -1 },
            Self::ClockwiseQuarter => RotationMatrix { xx: 0, xy: -1, yx: 1, yy: 0 },
            Self::CounterClockwiseQuarter => RotationMatrix { xx: 0, xy: 1, yx: -1, yy: 0 },
        }
    }
}

/// A signed permutation matrix; only quarter turns and mirrors are representable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationMatrix {
    xx: i32,
    xy: i32,
    yx: i32,
    yy: i32,
}

impl RotationMatrix {
    pub const IDENTITY: Self = Self { xx: 1, xy: 0, yx: 0, yy: 1 };

    pub fn apply(&self, x: i32, y: i32) -> (i32, i32) {
        (self.xx * x + self.xy * y, self.yx * x + self.yy * y)
    }

    /// Undo the rotation; the transpose, as every matrix here is orthogonal
    pub fn inverse(&self) -> Self {
        Self {
            xx: self.xx,
            xy: self.yx,
            yx: self.xy,
            yy: self.yy,
        }
    }
}

/// Width/height pair in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

impl Size {
    pub fn new(w: u32, h: u32) -> Self {
        Self { w, h }
    }
}

/// Pixel position (logical or physical depending on context)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned pixel rectangle; negative sizes collapse to empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w: w.max(0), h: h.max(0) }
    }

    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    #[cfg(test)]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.w / 2, self.y + self.h / 2)
    }
}

/// A touch location as fractions of the panel, independent of resolution.
///
/// Both components are fixed point in `0..=ONE`; construction clamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NormalizedPoint {
    pub x: u32,
    pub y: u32,
}

impl NormalizedPoint {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x: x.min(ONE), y: y.min(ONE) }
    }

    #[cfg(test)]
    pub fn from_fractions(x: f64, y: f64) -> Self {
        let fixed = |v: f64| (v.clamp(0.0, 1.0) * ONE as f64).round() as u32;
        Self::new(fixed(x), fixed(y))
    }
}

/// Fraction of `dim` to a pixel index in `0..dim`
fn fraction_to_pixel(fraction: u32, dim: u32) -> i32 {
    if dim == 0 {
        return 0;
    }
    let px = fraction as u64 * dim as u64 / ONE as u64;
    px.min(dim as u64 - 1) as i32
}

/// Pixel index to the fraction at the pixel's center
fn pixel_to_fraction(px: i32, dim: u32) -> u32 {
    if dim == 0 {
        return 0;
    }
    let px = px.clamp(0, dim as i32 - 1) as u64;
    ((2 * px + 1) * ONE as u64 / (2 * dim as u64)) as u32
}

/// Screen geometry fixed at startup: orientation plus derived sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenGeometry {
    orientation: Orientation,
    physical: Size,
    logical: Size,
    row_height: u32,
}

impl ScreenGeometry {
    /// Derive geometry from the framebuffer size.
    ///
    /// Rejects sizes too small to hold a keyboard line, so every later
    /// division by width or row height is safe.
    pub fn new(orientation: Orientation, physical: Size) -> Result<Self> {
        let logical = orientation.logical_size(physical);
        let row_height = logical.h / ROW_HEIGHT_DIVISOR;
        if logical.w == 0 || row_height == 0 {
            return Err(Error::InvalidGeometry {
                width: physical.w,
                height: physical.h,
            });
        }
        Ok(Self {
            orientation,
            physical,
            logical,
            row_height,
        })
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn physical(&self) -> Size {
        self.physical
    }

    pub fn logical(&self) -> Size {
        self.logical
    }

    pub fn row_height(&self) -> u32 {
        self.row_height
    }

    pub fn keyboard_height(&self) -> u32 {
        self.row_height * KEYBOARD_LINES
    }

    /// Logical y of the first keyboard line; everything above is the navigation area
    pub fn keyboard_top(&self) -> u32 {
        self.logical.h - self.keyboard_height()
    }

    /// Physical panel fractions to logical screen pixels
    pub fn to_pixel_space(&self, p: NormalizedPoint) -> Point {
        let logical = self.orientation.to_logical(p);
        Point::new(
            fraction_to_pixel(logical.x, self.logical.w),
            fraction_to_pixel(logical.y, self.logical.h),
        )
    }

    /// Logical screen pixels back to physical panel fractions
    #[cfg(test)]
    pub fn to_normalized(&self, x: i32, y: i32) -> NormalizedPoint {
        let logical = NormalizedPoint::new(
            pixel_to_fraction(x, self.logical.w),
            pixel_to_fraction(y, self.logical.h),
        );
        self.orientation.to_physical(logical)
    }

    /// Physical size of the keyboard surface
    pub fn surface_size(&self) -> Size {
        let kb = Size::new(self.logical.w, self.keyboard_height());
        if self.orientation.is_quarter_turn() {
            Size::new(kb.h, kb.w)
        } else {
            kb
        }
    }

    /// Physical pixel position of the surface's top-left corner in the framebuffer
    pub fn surface_origin(&self) -> (u32, u32) {
        let kb = self.keyboard_height();
        match self.orientation {
            Orientation::Upright => (0, self.physical.h - kb),
            Orientation::UpsideDown | Orientation::ClockwiseQuarter => (0, 0),
            Orientation::CounterClockwiseQuarter => (self.physical.w - kb, 0),
        }
    }

    /// Keyboard-local logical pixel to surface pixel
    pub fn surface_point(&self, x: i32, y: i32) -> Point {
        let s = self.surface_size();
        let (sw, sh) = (s.w as i32, s.h as i32);
        match self.orientation {
            Orientation::Upright => Point::new(x, y),
            Orientation::UpsideDown => Point::new(sw - 1 - x, sh - 1 - y),
            Orientation::ClockwiseQuarter => Point::new(sw - 1 - y, x),
            Orientation::CounterClockwiseQuarter => Point::new(y, sh - 1 - x),
        }
    }

    /// Keyboard-local logical rectangle to the surface rectangle it covers
    pub fn surface_rect(&self, rect: Rect) -> Rect {
        if rect.is_empty() {
            return Rect::default();
        }
        let a = self.surface_point(rect.x, rect.y);
        let b = self.surface_point(rect.x + rect.w - 1, rect.y + rect.h - 1);
        let (x0, x1) = (a.x.min(b.x), a.x.max(b.x));
        let (y0, y1) = (a.y.min(b.y), a.y.max(b.y));
        Rect::new(x0, y0, x1 - x0 + 1, y1 - y0 + 1)
    }
}
