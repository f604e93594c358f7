//! Keyboard rendering
//!
//! Provides:
//! - `Surface`, the owned pixel buffer holding the keyboard region
//! - Key drawing (border, fill, label) in keyboard-local logical coordinates
//! - Glyph placement through an external rasterizer (see [`glyph`])
//!
//! Everything is drawn in logical coordinates and mapped onto the surface by
//! `ScreenGeometry`, so no drawing routine branches on orientation.

pub mod font;
pub mod glyph;

use tracing::trace;

use crate::geometry::{Rect, ScreenGeometry};
use crate::keyboard::KeyboardState;
use crate::layout::{KeyGrid, Layout};
use crate::{Error, Result};

pub use font::FontRasterizer;
pub use glyph::{GlyphRasterizer, GlyphRenderer};

/// Keyboard colours, 0x00RRGGBB
pub mod colors {
    pub const BACKGROUND: u32 = 0x000000;
    pub const KEY: u32 = 0x111122;
    /// Touched key or engaged lock
    pub const HIGHLIGHT: u32 = 0x4444ee;
    pub const BORDER: u32 = 0xff0000;
}

/// Default inset of the key border from the cell edge
pub const DEFAULT_GAP: u32 = 2;

const BYTES_PER_PIXEL: usize = 4;

/// Label glyphs are a quarter of a keyboard line tall
pub fn glyph_size(geometry: &ScreenGeometry) -> u32 {
    geometry.row_height() / 4
}

/// Owned 32bpp pixel buffer for the keyboard region, in physical orientation.
///
/// Rows are `stride` bytes apart. For upright and upside-down screens the
/// stride equals the framebuffer line length so the whole buffer goes out in
/// one write; rotated surfaces are packed and go out row by row.
#[derive(Debug, Clone)]
pub struct Surface {
    width: usize,
    height: usize,
    stride: usize,
    pixels: Vec<u8>,
}

impl Surface {
    /// Allocate a zeroed surface; `stride` must fit a full row of pixels
    pub fn new(width: usize, height: usize, stride: usize) -> Result<Self> {
        if width == 0 || height == 0 || stride < width * BYTES_PER_PIXEL {
            return Err(Error::InvalidGeometry {
                width: width as u32,
                height: height as u32,
            });
        }
        Ok(Self {
            width,
            height,
            stride,
            pixels: vec![0; stride * height],
        })
    }

    /// Surface for the keyboard region of a framebuffer with `line_length` bytes per line
    pub fn for_geometry(geometry: &ScreenGeometry, line_length: usize) -> Result<Self> {
        let physical = geometry.physical();
        if line_length < physical.w as usize * BYTES_PER_PIXEL {
            return Err(Error::InvalidGeometry {
                width: physical.w,
                height: physical.h,
            });
        }
        let size = geometry.surface_size();
        let (width, height) = (size.w as usize, size.h as usize);
        let stride = if geometry.orientation().is_quarter_turn() {
            width * BYTES_PER_PIXEL
        } else {
            line_length
        };
        Self::new(width, height, stride)
    }

    #[cfg(test)]
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[cfg(test)]
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn fill(&mut self, color: u32) {
        self.fill_rect(Rect::new(0, 0, self.width as i32, self.height as i32), color);
    }

    /// Fill a surface rectangle, clipped to the surface
    pub fn fill_rect(&mut self, rect: Rect, color: u32) {
        let x0 = rect.x.max(0) as usize;
        let y0 = rect.y.max(0) as usize;
        let x1 = (rect.x + rect.w).clamp(0, self.width as i32) as usize;
        let y1 = (rect.y + rect.h).clamp(0, self.height as i32) as usize;
        if x0 >= x1 || y0 >= y1 {
            return;
        }
        let bytes = color.to_le_bytes();
        for y in y0..y1 {
            let start = y * self.stride + x0 * BYTES_PER_PIXEL;
            let end = y * self.stride + x1 * BYTES_PER_PIXEL;
            for px in self.pixels[start..end].chunks_exact_mut(BYTES_PER_PIXEL) {
                px.copy_from_slice(&bytes);
            }
        }
    }

    /// Write a grey level into the colour channels, leaving alpha alone
    pub fn put_coverage(&mut self, x: i32, y: i32, coverage: u8) {
        if let Some(offset) = self.offset(x, y) {
            self.pixels[offset..offset + 3].fill(coverage);
        }
    }

    /// Pixel bytes of one surface row, without stride padding
    pub fn row(&self, y: usize) -> &[u8] {
        let start = y * self.stride;
        &self.pixels[start..start + self.width * BYTES_PER_PIXEL]
    }

    /// The whole buffer, stride padding included
    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    #[cfg(test)]
    pub fn pixel(&self, x: i32, y: i32) -> Option<[u8; 4]> {
        let offset = self.offset(x, y)?;
        let mut px = [0; 4];
        px.copy_from_slice(&self.pixels[offset..offset + BYTES_PER_PIXEL]);
        Some(px)
    }

    fn offset(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(y as usize * self.stride + x as usize * BYTES_PER_PIXEL)
    }
}

/// Draws the whole keyboard for the current state
pub struct KeyboardRenderer<R> {
    glyphs: GlyphRenderer<R>,
    geometry: ScreenGeometry,
    grid: KeyGrid,
    gap: i32,
}

impl<R: GlyphRasterizer> KeyboardRenderer<R> {
    pub fn new(rasterizer: R, geometry: ScreenGeometry, gap: u32) -> Self {
        let glyphs = GlyphRenderer::new(rasterizer, glyph_size(&geometry), geometry.orientation());
        Self {
            glyphs,
            geometry,
            grid: KeyGrid::new(&geometry),
            gap: gap as i32,
        }
    }

    /// Redraw every visible key for the active page and highlight
    pub fn draw(&mut self, surface: &mut Surface, layout: &Layout, state: &KeyboardState) {
        let page = state.page();
        trace!(?page, pressed = ?state.pressed, "Drawing keyboard");
        surface.fill(colors::BACKGROUND);
        for (id, rect) in self.grid.drawn_keys() {
            let Some(cell) = layout.cell(page, id) else {
                continue;
            };
            let color = if state.is_highlighted(id) {
                colors::HIGHLIGHT
            } else {
                colors::KEY
            };
            self.draw_key(surface, rect, color);
            self.glyphs.draw_text(
                surface,
                &self.geometry,
                rect.x + self.gap + 2,
                rect.y + self.gap + 2,
                &cell.label,
            );
        }
    }

    /// One-pixel border inset by the gap, then the face inside it
    fn draw_key(&self, surface: &mut Surface, rect: Rect, color: u32) {
        let Rect { x, y, w, h } = rect;
        let gap = self.gap;
        let border = [
            Rect::new(x + gap, y + gap, w - 2 * gap, 1),
            Rect::new(x + gap, y + h - gap, w - 2 * gap, 1),
            Rect::new(x + gap, y + gap, 1, h - 2 * gap),
            Rect::new(x + w - gap, y + gap, 1, h - 2 * gap),
        ];
        for line in border {
            self.fill_logical(surface, line, colors::BORDER);
        }
        let face = Rect::new(x + gap + 1, y + gap + 1, w - 2 * gap - 2, h - 2 * gap - 2);
        self.fill_logical(surface, face, color);
    }

    fn fill_logical(&self, surface: &mut Surface, rect: Rect, color: u32) {
        surface.fill_rect(self.geometry.surface_rect(rect), color);
    }
}

#[cfg(test)]
mod tests {
    use super::glyph::tests::BoxRasterizer;
    use super::*;
    use crate::geometry::{Orientation, Size};
    use crate::layout::KeyId;

    fn rgb(color: u32) -> [u8; 4] {
        color.to_le_bytes()
    }

    #[test]
    fn test_surface_rejects_short_stride() {
        assert!(Surface::new(10, 10, 39).is_err());
        assert!(Surface::new(0, 10, 40).is_err());
        assert!(Surface::new(10, 10, 40).is_ok());
    }

    #[test]
    fn test_fill_rect_clips() {
        let mut surface = Surface::new(4, 3, 16).unwrap();
        surface.fill_rect(Rect::new(-2, 1, 10, 10), 0x00ff00);
        assert_eq!(surface.pixel(0, 0), Some([0, 0, 0, 0]));
        assert_eq!(surface.pixel(0, 1), Some(rgb(0x00ff00)));
        assert_eq!(surface.pixel(3, 2), Some(rgb(0x00ff00)));
        assert_eq!(surface.pixel(4, 2), None);
    }

    #[test]
    fn test_row_excludes_padding() {
        let mut surface = Surface::new(2, 2, 12).unwrap();
        surface.fill(0x010203);
        assert_eq!(surface.row(1).len(), 8);
        assert_eq!(surface.as_bytes().len(), 24);
        assert_eq!(&surface.as_bytes()[8..12], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_surface_stride_per_orientation() {
        let physical = Size::new(300, 600);
        let up = ScreenGeometry::new(Orientation::Upright, physical).unwrap();
        assert_eq!(Surface::for_geometry(&up, 1280).unwrap().stride(), 1280);

        let cw = ScreenGeometry::new(Orientation::ClockwiseQuarter, physical).unwrap();
        let surface = Surface::for_geometry(&cw, 1280).unwrap();
        assert_eq!(surface.width(), cw.keyboard_height() as usize);
        assert_eq!(surface.height(), 600);
        assert_eq!(surface.stride(), surface.width() * 4);

        assert!(Surface::for_geometry(&up, 1000).is_err());
    }

    fn render(orientation: Orientation, state: &KeyboardState) -> (ScreenGeometry, Surface) {
        let geometry = ScreenGeometry::new(orientation, Size::new(300, 600)).unwrap();
        let mut surface = Surface::for_geometry(&geometry, 1200).unwrap();
        let mut renderer = KeyboardRenderer::new(BoxRasterizer, geometry, DEFAULT_GAP);
        renderer.draw(&mut surface, &Layout::builtin(), state);
        (geometry, surface)
    }

    fn key_center(geometry: &ScreenGeometry, id: KeyId) -> (i32, i32) {
        let (_, rect) = KeyGrid::new(geometry)
            .drawn_keys()
            .into_iter()
            .find(|(key, _)| *key == id)
            .unwrap();
        // Lower right quadrant avoids the label
        (rect.x + rect.w * 3 / 4, rect.y + rect.h * 3 / 4)
    }

    #[test]
    fn test_draws_key_faces_and_borders() {
        let (geometry, surface) = render(Orientation::Upright, &KeyboardState::new());
        let (x, y) = key_center(&geometry, KeyId::SPACE);
        assert_eq!(surface.pixel(x, y), Some(rgb(colors::KEY)));
        // Top border of the space key sits at the gap inset
        let (_, rect) = KeyGrid::new(&geometry)
            .drawn_keys()
            .into_iter()
            .find(|(key, _)| *key == KeyId::SPACE)
            .unwrap();
        assert_eq!(surface.pixel(x, rect.y + 2), Some(rgb(colors::BORDER)));
        assert_eq!(surface.pixel(x, rect.y), Some(rgb(colors::BACKGROUND)));
    }

    #[test]
    fn test_highlight_touched_and_locked_keys() {
        let mut state = KeyboardState::new();
        state.locks.alt = true;
        state.contact(Some(KeyId::new(1, 11)));
        let (geometry, surface) = render(Orientation::Upright, &state);

        let (x, y) = key_center(&geometry, KeyId::ALT);
        assert_eq!(surface.pixel(x, y), Some(rgb(colors::HIGHLIGHT)));
        let (x, y) = key_center(&geometry, KeyId::new(1, 11));
        assert_eq!(surface.pixel(x, y), Some(rgb(colors::HIGHLIGHT)));
        let (x, y) = key_center(&geometry, KeyId::CTRL);
        assert_eq!(surface.pixel(x, y), Some(rgb(colors::KEY)));
    }

    #[test]
    fn test_rotated_render_maps_through_geometry() {
        let mut state = KeyboardState::new();
        state.contact(Some(KeyId::ENTER));
        for orientation in Orientation::ALL {
            let (geometry, surface) = render(orientation, &state);
            let (x, y) = key_center(&geometry, KeyId::ENTER);
            let p = geometry.surface_point(x, y);
            assert_eq!(surface.pixel(p.x, p.y), Some(rgb(colors::HIGHLIGHT)), "{:?}", orientation);
        }
    }
}
