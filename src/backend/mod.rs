//! Display output
//!
//! The keyboard surface is pushed to a seekable pixel sink once per frame.
//! Upright and upside-down surfaces share the framebuffer's stride and go out
//! as one contiguous write; quarter-turned surfaces are a column of the
//! framebuffer and go out one row at a time.

pub mod fbdev;

use std::io;

use crate::geometry::ScreenGeometry;
use crate::render::Surface;

pub use fbdev::Framebuffer;

/// A raw pixel device that accepts writes at byte offsets
pub trait DisplaySink {
    fn write_at(&mut self, offset: u64, bytes: &[u8]) -> io::Result<()>;
}

/// Copy the keyboard surface to its place in the framebuffer
pub fn present<D: DisplaySink>(
    sink: &mut D,
    surface: &Surface,
    geometry: &ScreenGeometry,
    line_length: usize,
) -> io::Result<()> {
    let (ox, oy) = geometry.surface_origin();
    let (ox, oy) = (ox as usize, oy as usize);
    if geometry.orientation().is_quarter_turn() {
        for y in 0..surface.height() {
            let offset = (oy + y) * line_length + ox * 4;
            sink.write_at(offset as u64, surface.row(y))?;
        }
        Ok(())
    } else {
        sink.write_at((oy * line_length) as u64, surface.as_bytes())
    }
}
