use std::collections::HashMap;

use super::TextureId;

/// Error returned by [`FontdueAtlas::from_font_bytes`].
#[derive(Debug, Clone, thiserror::Error)]
#[error("font load error: {0}")]
pub struct FontLoadError(pub String);

/// Borrowed view of a rasterized atlas bitmap, tightly packed rows.
#[derive(Debug, Copy, Clone)]
pub struct AtlasPixels<'a> {
    pub pixels: &'a [u8],
    pub width: u32,
    pub height: u32,
    pub bytes_per_pixel: u32,
}

impl AtlasPixels<'_> {
    /// Bytes per source row.
    #[inline]
    pub fn stride(&self) -> usize {
        self.width as usize * self.bytes_per_pixel as usize
    }
}

/// The GUI library's font atlas as seen by the backend.
///
/// The backend asks for the RGBA bitmap, uploads it, and publishes the
/// resulting texture handle back through [`set_tex_id`](FontAtlas::set_tex_id)
/// so draw commands can reference it.
pub trait FontAtlas {
    fn tex_data_as_rgba32(&mut self) -> AtlasPixels<'_>;

    fn tex_id(&self) -> Option<TextureId>;

    fn set_tex_id(&mut self, id: Option<TextureId>);
}

/// Placement of one glyph inside the atlas.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Glyph {
    pub uv_min: [f32; 2],
    pub uv_max: [f32; 2],
    /// Top-left of the bitmap relative to the pen position on the baseline.
    pub offset: [f32; 2],
    pub size: [f32; 2],
    pub advance: f32,
}

const ATLAS_WIDTH: u32 = 512;
const GLYPH_PADDING: u32 = 1;
const WHITE_BLOCK: u32 = 2;

/// RGBA font atlas rasterized with fontdue.
///
/// Covers printable ASCII. A small opaque white block at the origin backs
/// solid fills so untextured shapes and text can share one texture.
pub struct FontdueAtlas {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    glyphs: HashMap<char, Glyph>,
    white_uv: [f32; 2],
    ascent: f32,
    line_height: f32,
    tex_id: Option<TextureId>,
}

struct Raster {
    ch: char,
    metrics: fontdue::Metrics,
    coverage: Vec<u8>,
    x: u32,
    y: u32,
}

impl FontdueAtlas {
    /// An atlas holding only the white block. Text renders as nothing.
    pub fn white_only() -> Self {
        let mut atlas = Self::with_size(WHITE_BLOCK * 4, WHITE_BLOCK * 4);
        atlas.fill_white_block();
        atlas
    }

    /// Rasterizes printable ASCII from a TrueType/OpenType font at `size_px`.
    pub fn from_font_bytes(bytes: &[u8], size_px: f32) -> Result<Self, FontLoadError> {
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(|e| FontLoadError(e.to_string()))?;

        let (ascent, line_height) = match font.horizontal_line_metrics(size_px) {
            Some(m) => (m.ascent, m.new_line_size),
            None => (size_px, size_px * 1.2),
        };

        // Shelf-pack every glyph below the white block.
        let mut cursor_x = GLYPH_PADDING;
        let mut cursor_y = WHITE_BLOCK + GLYPH_PADDING;
        let mut row_height = 0;
        let mut rasters = Vec::new();

        for ch in (' '..='~').filter(|c| !c.is_control()) {
            let (metrics, coverage) = font.rasterize(ch, size_px);
            let (w, h) = (metrics.width as u32, metrics.height as u32);

            if w > 0 && cursor_x + w + GLYPH_PADDING > ATLAS_WIDTH {
                cursor_y += row_height + GLYPH_PADDING;
                cursor_x = GLYPH_PADDING;
                row_height = 0;
            }

            rasters.push(Raster { ch, metrics, coverage, x: cursor_x, y: cursor_y });

            if w > 0 {
                cursor_x += w + GLYPH_PADDING;
                row_height = row_height.max(h);
            }
        }

        let height = (cursor_y + row_height + GLYPH_PADDING).next_power_of_two();
        let mut atlas = Self::with_size(ATLAS_WIDTH, height);
        atlas.fill_white_block();
        atlas.ascent = ascent;
        atlas.line_height = line_height;

        let (aw, ah) = (atlas.width as f32, atlas.height as f32);
        for r in rasters {
            let (w, h) = (r.metrics.width as u32, r.metrics.height as u32);
            atlas.blit_coverage(r.x, r.y, w, h, &r.coverage);

            atlas.glyphs.insert(
                r.ch,
                Glyph {
                    uv_min: [r.x as f32 / aw, r.y as f32 / ah],
                    uv_max: [(r.x + w) as f32 / aw, (r.y + h) as f32 / ah],
                    offset: [
                        r.metrics.xmin as f32,
                        -(r.metrics.ymin as f32 + r.metrics.height as f32),
                    ],
                    size: [w as f32, h as f32],
                    advance: r.metrics.advance_width,
                },
            );
        }

        log::debug!(
            "font atlas rasterized: {} glyphs, {}x{} px",
            atlas.glyphs.len(),
            atlas.width,
            atlas.height
        );

        Ok(atlas)
    }

    fn with_size(width: u32, height: u32) -> Self {
        let white = WHITE_BLOCK as f32 * 0.5;
        Self {
            pixels: vec![0; (width * height * 4) as usize],
            width,
            height,
            glyphs: HashMap::new(),
            white_uv: [white / width as f32, white / height as f32],
            ascent: 0.0,
            line_height: 0.0,
            tex_id: None,
        }
    }

    fn fill_white_block(&mut self) {
        for y in 0..WHITE_BLOCK {
            for x in 0..WHITE_BLOCK {
                let at = ((y * self.width + x) * 4) as usize;
                self.pixels[at..at + 4].copy_from_slice(&[0xFF; 4]);
            }
        }
    }

    fn blit_coverage(&mut self, x: u32, y: u32, w: u32, h: u32, coverage: &[u8]) {
        for row in 0..h {
            for col in 0..w {
                let alpha = coverage[(row * w + col) as usize];
                let at = (((y + row) * self.width + x + col) * 4) as usize;
                self.pixels[at..at + 4].copy_from_slice(&[0xFF, 0xFF, 0xFF, alpha]);
            }
        }
    }

    /// UV of an opaque white texel, for solid fills.
    #[inline]
    pub fn white_uv(&self) -> [f32; 2] {
        self.white_uv
    }

    #[inline]
    pub fn glyph(&self, ch: char) -> Option<&Glyph> {
        self.glyphs.get(&ch)
    }

    /// Distance from the top of a line to its baseline.
    #[inline]
    pub fn ascent(&self) -> f32 {
        self.ascent
    }

    #[inline]
    pub fn line_height(&self) -> f32 {
        self.line_height
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl FontAtlas for FontdueAtlas {
    fn tex_data_as_rgba32(&mut self) -> AtlasPixels<'_> {
        AtlasPixels {
            pixels: &self.pixels,
            width: self.width,
            height: self.height,
            bytes_per_pixel: 4,
        }
    }

    fn tex_id(&self) -> Option<TextureId> {
        self.tex_id
    }

    fn set_tex_id(&mut self, id: Option<TextureId>) {
        self.tex_id = id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn white_only_atlas_has_opaque_origin() {
        let mut atlas = FontdueAtlas::white_only();
        let px = atlas.tex_data_as_rgba32();
        assert_eq!(px.bytes_per_pixel, 4);
        assert_eq!(px.pixels.len(), px.stride() * px.height as usize);
        assert_eq!(&px.pixels[0..4], &[0xFF; 4]);
        assert!(atlas.glyph('a').is_none());
    }

    #[test]
    fn white_uv_lands_inside_white_block() {
        let atlas = FontdueAtlas::white_only();
        let (w, h) = atlas.size();
        let uv = atlas.white_uv();
        assert!(uv[0] * (w as f32) < WHITE_BLOCK as f32);
        assert!(uv[1] * (h as f32) < WHITE_BLOCK as f32);
    }

    #[test]
    fn invalid_font_bytes_are_reported() {
        assert!(FontdueAtlas::from_font_bytes(b"not a font", 13.0).is_err());
    }

    #[test]
    fn tex_id_round_trips() {
        let mut atlas = FontdueAtlas::white_only();
        assert_eq!(atlas.tex_id(), None);
        atlas.set_tex_id(Some(TextureId::new(3)));
        assert_eq!(atlas.tex_id(), Some(TextureId::new(3)));
    }
}
