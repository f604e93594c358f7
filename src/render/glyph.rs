//! Glyph rendering into the keyboard surface
//!
//! The rasterizer is a capability: it turns a character into a coverage
//! bitmap, already rotated by the orientation's matrix, with a placement
//! offset and a pen advance in surface space. The renderer only places and
//! blits; it never rotates anything itself.

use crate::geometry::{Orientation, Point, RotationMatrix, ScreenGeometry};

use super::Surface;

/// Padding between a text origin and the pen start
const PEN_INSET: i32 = 2;

/// A rasterized glyph in surface orientation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Glyph {
    pub width: usize,
    pub height: usize,
    /// Row-major coverage, `width * height` bytes
    pub coverage: Vec<u8>,
    /// Displacement of the bitmap's top-left pixel from the pen (y down)
    pub offset: (i32, i32),
    /// Pen movement after this glyph (y down)
    pub advance: (i32, i32),
}

impl Glyph {
    /// Rotate an upright glyph by `matrix`.
    ///
    /// Every pixel keeps its displacement from the pen, just rotated, so the
    /// glyph pivots around the pen position.
    pub fn transformed(self, matrix: RotationMatrix) -> Glyph {
        if matrix == RotationMatrix::IDENTITY {
            return self;
        }
        let advance = matrix.apply(self.advance.0, self.advance.1);
        if self.width == 0 || self.height == 0 {
            return Glyph {
                width: 0,
                height: 0,
                coverage: Vec::new(),
                offset: matrix.apply(self.offset.0, self.offset.1),
                advance,
            };
        }

        let (x0, y0) = self.offset;
        let a = matrix.apply(x0, y0);
        let b = matrix.apply(x0 + self.width as i32 - 1, y0 + self.height as i32 - 1);
        let min = (a.0.min(b.0), a.1.min(b.1));
        let width = (a.0 - b.0).unsigned_abs() as usize + 1;
        let height = (a.1 - b.1).unsigned_abs() as usize + 1;

        let mut coverage = vec![0u8; width * height];
        for row in 0..self.height {
            for col in 0..self.width {
                let (tx, ty) = matrix.apply(x0 + col as i32, y0 + row as i32);
                let dst = (ty - min.1) as usize * width + (tx - min.0) as usize;
                coverage[dst] = self.coverage[row * self.width + col];
            }
        }

        Glyph {
            width,
            height,
            coverage,
            offset: min,
            advance,
        }
    }
}

/// External glyph rasterization capability
pub trait GlyphRasterizer {
    /// Rasterize `ch` at `size` pixels, rotated by `matrix`.
    ///
    /// `None` when the font cannot produce the glyph.
    fn rasterize(&mut self, ch: char, size: u32, matrix: RotationMatrix) -> Option<Glyph>;

    /// Distance from the top of a line to the baseline at `size`
    fn ascender(&self, size: u32) -> i32;
}

/// Draws characters and strings at orientation-adjusted positions
pub struct GlyphRenderer<R> {
    rasterizer: R,
    size: u32,
    ascender: i32,
    matrix: RotationMatrix,
    /// Maps surface advances back to keyboard-local ones
    inverse: RotationMatrix,
}

impl<R: GlyphRasterizer> GlyphRenderer<R> {
    pub fn new(rasterizer: R, size: u32, orientation: Orientation) -> Self {
        let ascender = rasterizer.ascender(size);
        let matrix = orientation.matrix();
        Self {
            rasterizer,
            size,
            ascender,
            matrix,
            inverse: matrix.inverse(),
        }
    }

    /// Draw one character with its text box at keyboard-local `(x, y)`.
    ///
    /// Returns the advance in keyboard-local coordinates; a missing glyph
    /// draws nothing and advances by zero.
    pub fn draw_char(
        &mut self,
        surface: &mut Surface,
        geometry: &ScreenGeometry,
        x: i32,
        y: i32,
        ch: char,
    ) -> (i32, i32) {
        let pen = geometry.surface_point(x + PEN_INSET, y + self.ascender);
        let (dx, dy) = self.draw_at_pen(surface, pen, ch);
        self.inverse.apply(dx, dy)
    }

    /// Draw a string starting at keyboard-local `(x, y)`, each character at
    /// the previous one's advance.
    pub fn draw_text(
        &mut self,
        surface: &mut Surface,
        geometry: &ScreenGeometry,
        x: i32,
        y: i32,
        text: &str,
    ) {
        let (mut x, mut y) = (x, y);
        for ch in text.chars() {
            let (dx, dy) = self.draw_char(surface, geometry, x, y, ch);
            x += dx;
            y += dy;
        }
    }

    fn draw_at_pen(&mut self, surface: &mut Surface, pen: Point, ch: char) -> (i32, i32) {
        let Some(glyph) = self.rasterizer.rasterize(ch, self.size, self.matrix) else {
            return (0, 0);
        };
        let left = pen.x + glyph.offset.0;
        let top = pen.y + glyph.offset.1;
        for row in 0..glyph.height {
            for col in 0..glyph.width {
                let coverage = glyph.coverage[row * glyph.width + col];
                if coverage != 0 {
                    surface.put_coverage(left + col as i32, top + row as i32, coverage);
                }
            }
        }
        glyph.advance
    }
}
