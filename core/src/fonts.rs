// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Built-in bitmap fonts
//!
//! Glyph bitmaps are packed LSB-first, row-major, `width * height` bits
//! rounded up to whole bytes. This is the same packing the firmware uses
//! for raw BAGL bitmaps and NBGL 1-bpp images, so OCR can compare drawn
//! bitmaps against these tables directly.

use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;

/// 8px monospace font
pub const BAGL_FONT_MONO_8PX: u16 = 0;
/// 16px monospace font (2x scale of the 8px font)
pub const BAGL_FONT_MONO_16PX: u16 = 1;
/// Symbol font, covering `0x80..=0xBF`
pub const BAGL_FONT_SYMBOLS: u16 = 2;

/// First symbol character
pub const SYMBOL_FIRST: u32 = 0x80;
/// Last symbol character
pub const SYMBOL_LAST: u32 = 0xBF;

/// 5x7 column-major ASCII glyphs for `0x20..=0x7E`, LSB at the top
const ASCII_5X7: [[u8; 5]; 95] = [
    [0x00, 0x00, 0x00, 0x00, 0x00],
    [0x00, 0x00, 0x5F, 0x00, 0x00],
    [0x00, 0x07, 0x00, 0x07, 0x00],
    [0x14, 0x7F, 0x14, 0x7F, 0x14],
    [0x24, 0x2A, 0x7F, 0x2A, 0x12],
    [0x23, 0x13, 0x08, 0x64, 0x62],
    [0x36, 0x49, 0x55, 0x22, 0x50],
    [0x00, 0x05, 0x03, 0x00, 0x00],
    [0x00, 0x1C, 0x22, 0x41, 0x00],
    [0x00, 0x41, 0x22, 0x1C, 0x00],
    [0x14, 0x08, 0x3E, 0x08, 0x14],
    [0x08, 0x08, 0x3E, 0x08, 0x08],
    [0x00, 0x50, 0x30, 0x00, 0x00],
    [0x08, 0x08, 0x08, 0x08, 0x08],
    [0x00, 0x60, 0x60, 0x00, 0x00],
    [0x20, 0x10, 0x08, 0x04, 0x02],
    [0x3E, 0x51, 0x49, 0x45, 0x3E],
    [0x00, 0x42, 0x7F, 0x40, 0x00],
    [0x42, 0x61, 0x51, 0x49, 0x46],
    [0x21, 0x41, 0x45, 0x4B, 0x31],
    [0x18, 0x14, 0x12, 0x7F, 0x10],
    [0x27, 0x45, 0x45, 0x45, 0x39],
    [0x3C, 0x4A, 0x49, 0x49, 0x30],
    [0x01, 0x71, 0x09, 0x05, 0x03],
    [0x36, 0x49, 0x49, 0x49, 0x36],
    [0x06, 0x49, 0x49, 0x29, 0x1E],
    [0x00, 0x36, 0x36, 0x00, 0x00],
    [0x00, 0x56, 0x36, 0x00, 0x00],
    [0x08, 0x14, 0x22, 0x41, 0x00],
    [0x14, 0x14, 0x14, 0x14, 0x14],
    [0x00, 0x41, 0x22, 0x14, 0x08],
    [0x02, 0x01, 0x51, 0x09, 0x06],
    [0x32, 0x49, 0x79, 0x41, 0x3E],
    [0x7E, 0x11, 0x11, 0x11, 0x7E],
    [0x7F, 0x49, 0x49, 0x49, 0x36],
    [0x3E, 0x41, 0x41, 0x41, 0x22],
    [0x7F, 0x41, 0x41, 0x22, 0x1C],
    [0x7F, 0x49, 0x49, 0x49, 0x41],
    [0x7F, 0x09, 0x09, 0x09, 0x01],
    [0x3E, 0x41, 0x49, 0x49, 0x7A],
    [0x7F, 0x08, 0x08, 0x08, 0x7F],
    [0x00, 0x41, 0x7F, 0x41, 0x00],
    [0x20, 0x40, 0x41, 0x3F, 0x01],
    [0x7F, 0x08, 0x14, 0x22, 0x41],
    [0x7F, 0x40, 0x40, 0x40, 0x40],
    [0x7F, 0x02, 0x0C, 0x02, 0x7F],
    [0x7F, 0x04, 0x08, 0x10, 0x7F],
    [0x3E, 0x41, 0x41, 0x41, 0x3E],
    [0x7F, 0x09, 0x09, 0x09, 0x06],
    [0x3E, 0x41, 0x51, 0x21, 0x5E],
    [0x7F, 0x09, 0x19, 0x29, 0x46],
    [0x46, 0x49, 0x49, 0x49, 0x31],
    [0x01, 0x01, 0x7F, 0x01, 0x01],
    [0x3F, 0x40, 0x40, 0x40, 0x3F],
    [0x1F, 0x20, 0x40, 0x20, 0x1F],
    [0x3F, 0x40, 0x38, 0x40, 0x3F],
    [0x63, 0x14, 0x08, 0x14, 0x63],
    [0x07, 0x08, 0x70, 0x08, 0x07],
    [0x61, 0x51, 0x49, 0x45, 0x43],
    [0x00, 0x7F, 0x41, 0x41, 0x00],
    [0x02, 0x04, 0x08, 0x10, 0x20],
    [0x00, 0x41, 0x41, 0x7F, 0x00],
    [0x04, 0x02, 0x01, 0x02, 0x04],
    [0x40, 0x40, 0x40, 0x40, 0x40],
    [0x00, 0x01, 0x02, 0x04, 0x00],
    [0x20, 0x54, 0x54, 0x54, 0x78],
    [0x7F, 0x48, 0x44, 0x44, 0x38],
    [0x38, 0x44, 0x44, 0x44, 0x20],
    [0x38, 0x44, 0x44, 0x48, 0x7F],
    [0x38, 0x54, 0x54, 0x54, 0x18],
    [0x08, 0x7E, 0x09, 0x01, 0x02],
    [0x0C, 0x52, 0x52, 0x52, 0x3E],
    [0x7F, 0x08, 0x04, 0x04, 0x78],
    [0x00, 0x44, 0x7D, 0x40, 0x00],
    [0x20, 0x40, 0x44, 0x3D, 0x00],
    [0x7F, 0x10, 0x28, 0x44, 0x00],
    [0x00, 0x41, 0x7F, 0x40, 0x00],
    [0x7C, 0x04, 0x18, 0x04, 0x78],
    [0x7C, 0x08, 0x04, 0x04, 0x78],
    [0x38, 0x44, 0x44, 0x44, 0x38],
    [0x7C, 0x14, 0x14, 0x14, 0x08],
    [0x08, 0x14, 0x14, 0x18, 0x7C],
    [0x7C, 0x08, 0x04, 0x04, 0x08],
    [0x48, 0x54, 0x54, 0x54, 0x20],
    [0x04, 0x3F, 0x44, 0x40, 0x20],
    [0x3C, 0x40, 0x40, 0x20, 0x7C],
    [0x1C, 0x20, 0x40, 0x20, 0x1C],
    [0x3C, 0x40, 0x30, 0x40, 0x3C],
    [0x44, 0x28, 0x10, 0x28, 0x44],
    [0x0C, 0x50, 0x50, 0x50, 0x3C],
    [0x44, 0x64, 0x54, 0x4C, 0x44],
    [0x00, 0x08, 0x36, 0x41, 0x00],
    [0x00, 0x00, 0x7F, 0x00, 0x00],
    [0x00, 0x41, 0x36, 0x08, 0x00],
    [0x08, 0x04, 0x08, 0x10, 0x08],
];

/// Hand drawn 8x8 symbols for the first few symbol codepoints (one row per byte)
const SYMBOLS_8X8: [[u8; 8]; 8] = [
    // check
    [0x00, 0x80, 0x40, 0x20, 0x11, 0x0A, 0x04, 0x00],
    // cross
    [0x00, 0x42, 0x24, 0x18, 0x18, 0x24, 0x42, 0x00],
    // left
    [0x00, 0x08, 0x04, 0x02, 0x04, 0x08, 0x00, 0x00],
    // right
    [0x00, 0x04, 0x08, 0x10, 0x08, 0x04, 0x00, 0x00],
    // up
    [0x00, 0x00, 0x08, 0x14, 0x22, 0x00, 0x00, 0x00],
    // down
    [0x00, 0x00, 0x22, 0x14, 0x08, 0x00, 0x00, 0x00],
    // dashboard
    [0x3C, 0x42, 0x81, 0x99, 0x99, 0x81, 0x42, 0x3C],
    // warning
    [0x18, 0x18, 0x3C, 0x24, 0x66, 0x42, 0xDB, 0xFF],
];

/// A single glyph bitmap
#[derive(Clone, PartialEq, Debug)]
pub struct Glyph {
    pub width: u16,
    pub height: u16,
    pub bitmap: Vec<u8>,
}

impl Glyph {
    fn from_fn(width: u16, height: u16, f: impl Fn(u16, u16) -> bool) -> Self {
        let mut bitmap = vec![0u8; (width as usize * height as usize + 7) / 8];
        for y in 0..height {
            for x in 0..width {
                if f(x, y) {
                    let i = y as usize * width as usize + x as usize;
                    bitmap[i / 8] |= 1 << (i % 8);
                }
            }
        }
        Self {
            width,
            height,
            bitmap,
        }
    }

    /// Fetch the bit at `(x, y)`
    pub fn bit(&self, x: u16, y: u16) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let i = y as usize * self.width as usize + x as usize;
        self.bitmap[i / 8] & (1 << (i % 8)) != 0
    }
}

/// A bitmap font
#[derive(Clone, PartialEq, Debug)]
pub struct Font {
    pub id: u16,
    /// Line height in pixels
    pub height: u16,
    /// Distance from the top of a line to the text baseline
    pub baseline: u16,
    pub glyphs: BTreeMap<char, Glyph>,
}

impl Font {
    /// Fetch the glyph for a character
    pub fn glyph(&self, c: char) -> Option<&Glyph> {
        self.glyphs.get(&c)
    }

    /// Compute the rendered width of a string
    pub fn text_width(&self, text: &str) -> u16 {
        text.chars()
            .map(|c| self.glyph(c).map(|g| g.width).unwrap_or(0))
            .sum()
    }
}

fn mono_font(id: u16, scale: u16) -> Font {
    let glyphs = ASCII_5X7
        .iter()
        .enumerate()
        .filter_map(|(i, cols)| {
            let c = char::from_u32(0x20 + i as u32)?;
            let g = Glyph::from_fn(6 * scale, 8 * scale, |x, y| {
                let (x, y) = (x / scale, y / scale);
                x < 5 && y < 7 && cols[x as usize] & (1 << y) != 0
            });
            Some((c, g))
        })
        .collect();

    Font {
        id,
        height: 8 * scale,
        baseline: 7 * scale,
        glyphs,
    }
}

fn symbol_font() -> Font {
    let glyphs = (SYMBOL_FIRST..=SYMBOL_LAST)
        .filter_map(|cp| {
            let c = char::from_u32(cp)?;
            let n = (cp - SYMBOL_FIRST) as usize;

            let g = match SYMBOLS_8X8.get(n) {
                Some(rows) => Glyph::from_fn(8, 8, |x, y| rows[y as usize] & (1 << x) != 0),
                // Remaining symbols are a frame with the symbol index in the middle
                None => Glyph::from_fn(8, 8, |x, y| match (x, y) {
                    (0 | 7, _) | (_, 0 | 7) => true,
                    (1..=6, 3 | 4) => n & (1 << (x - 1 + (y - 3) * 6)) != 0,
                    _ => false,
                }),
            };

            Some((c, g))
        })
        .collect();

    Font {
        id: BAGL_FONT_SYMBOLS,
        height: 8,
        baseline: 8,
        glyphs,
    }
}

static FONTS: Lazy<HashMap<u16, Font>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert(BAGL_FONT_MONO_8PX, mono_font(BAGL_FONT_MONO_8PX, 1));
    m.insert(BAGL_FONT_MONO_16PX, mono_font(BAGL_FONT_MONO_16PX, 2));
    m.insert(BAGL_FONT_SYMBOLS, symbol_font());
    m
});

/// Fetch a font by identifier, unknown identifiers fall back to the 8px font
pub fn font(id: u16) -> &'static Font {
    match FONTS.get(&id) {
        Some(f) => f,
        None => &FONTS[&BAGL_FONT_MONO_8PX],
    }
}

/// Iterate over all built-in fonts
pub fn fonts() -> impl Iterator<Item = &'static Font> {
    FONTS.values()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn glyph_packing() {
        let f = font(BAGL_FONT_MONO_8PX);
        let g = f.glyph('!').unwrap();

        assert_eq!((g.width, g.height), (6, 8));
        assert_eq!(g.bitmap.len(), 6);

        // Column 2 rows 0..5 set, row 5 clear, row 6 set
        assert!(g.bit(2, 0));
        assert!(!g.bit(2, 5));
        assert!(g.bit(2, 6));
        assert!(!g.bit(0, 0));
    }

    #[test]
    fn glyphs_are_distinct() {
        for f in fonts() {
            let mut seen = std::collections::HashSet::new();
            for (c, g) in &f.glyphs {
                if *c == ' ' {
                    continue;
                }
                assert!(seen.insert(g.bitmap.clone()), "duplicate glyph {c:?} in font {}", f.id);
            }
        }
    }

    #[test]
    fn scaled_font() {
        let f = font(BAGL_FONT_MONO_16PX);
        assert_eq!(f.height, 16);
        assert_eq!(f.text_width("Hi"), 24);

        // Unknown ids fall back
        assert_eq!(font(0x0ABC).id, BAGL_FONT_MONO_8PX);
    }

    #[test]
    fn symbols() {
        let f = font(BAGL_FONT_SYMBOLS);
        assert_eq!(f.glyphs.len(), 64);
        assert!(f.glyph('\u{80}').is_some());
        assert!(f.glyph('\u{bf}').is_some());
    }
}
