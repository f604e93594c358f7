//! TrueType glyph rasterization backed by fontdue

use std::collections::HashMap;
use std::path::Path;

use fontdue::{Font, FontSettings};
use tracing::{debug, info};

use super::glyph::{Glyph, GlyphRasterizer};
use crate::geometry::RotationMatrix;
use crate::{Error, Result};

/// Rasterizer for a single font face.
///
/// Upright bitmaps are cached per (character, size); rotation is applied on
/// every lookup since it only shuffles bytes.
pub struct FontRasterizer {
    font: Font,
    cache: HashMap<(char, u32), Option<Glyph>>,
}

impl FontRasterizer {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|source| Error::DeviceUnavailable {
            path: path.to_path_buf(),
            source,
        })?;
        let rasterizer = Self::from_bytes(&bytes)
            .map_err(|e| Error::Font(format!("{}: {}", path.display(), e)))?;
        info!("Loaded font from {:?}", path);
        Ok(rasterizer)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|e| Error::Font(e.to_string()))?;
        Ok(Self {
            font,
            cache: HashMap::new(),
        })
    }

    fn upright(&mut self, ch: char, size: u32) -> Option<Glyph> {
        let font = &self.font;
        self.cache
            .entry((ch, size))
            .or_insert_with(|| {
                if ch != ' ' && font.lookup_glyph_index(ch) == 0 {
                    debug!(?ch, "Font has no glyph");
                    return None;
                }
                let (metrics, coverage) = font.rasterize(ch, size as f32);
                Some(Glyph {
                    width: metrics.width,
                    height: metrics.height,
                    coverage,
                    offset: (metrics.xmin, -(metrics.ymin + metrics.height as i32)),
                    advance: (metrics.advance_width.round() as i32, 0),
                })
            })
            .clone()
    }
}

impl GlyphRasterizer for FontRasterizer {
    fn rasterize(&mut self, ch: char, size: u32, matrix: RotationMatrix) -> Option<Glyph> {
        self.upright(ch, size).map(|glyph| glyph.transformed(matrix))
    }

    fn ascender(&self, size: u32) -> i32 {
        self.font
            .horizontal_line_metrics(size as f32)
            .map(|m| m.ascent.round() as i32)
            .unwrap_or(size as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_font_rejected() {
        assert!(matches!(
            FontRasterizer::from_bytes(b"not a font"),
            Err(Error::Font(_))
        ));
    }

    #[test]
    fn test_missing_font_file() {
        let result = FontRasterizer::load(Path::new("/nonexistent/fbkeyboard-font.ttf"));
        assert!(matches!(result, Err(Error::DeviceUnavailable { .. })));
    }
}
