// Copyright (c) 2022-2023 The MobileCoin Foundation

//! BAGL renderer
//!
//! Handles `SCREEN_DISPLAY_STATUS` components and `SCREEN_DISPLAY_RAW_STATUS`
//! bitmaps, drawing into the [`Framebuffer`] and reporting label text to
//! the [`Ocr`].

use encdec::DecodeOwned;
use log::{debug, trace};

use speculos_mcu_proto::bagl::{
    Component, ComponentType, CustomIcon, RawBitmap, RawStatus, FONT_ALIGN_BOTTOM,
    FONT_ALIGN_CENTER, FONT_ALIGN_MIDDLE, FONT_ALIGN_RIGHT,
};

use crate::{
    fonts::{self, Font, Glyph, BAGL_FONT_SYMBOLS},
    Error, Framebuffer, Ocr, TextEvent,
};

/// Component `fill` value requesting a filled shape
pub const BAGL_FILL: u8 = 1;

/// Bitmap cursor, carried across raw status continuations
#[derive(Clone, PartialEq, Debug)]
pub struct DrawState {
    pub header: RawBitmap,
    pub cursor: usize,
}

/// BAGL renderer state
#[derive(Debug, Default)]
pub struct Bagl {
    draw: Option<DrawState>,
}

/// Unpack LSB-first pixel values from a bitmap
pub(crate) fn unpack(bitmap: &[u8], bpp: u8) -> Result<impl Iterator<Item = u8> + '_, Error> {
    if !matches!(bpp, 1 | 2 | 4 | 8) {
        return Err(Error::InvalidImage("unsupported bpp"));
    }

    let mask = ((1u16 << bpp) - 1) as u8;
    let per_byte = 8 / bpp;

    Ok(bitmap
        .iter()
        .flat_map(move |b| (0..per_byte).map(move |k| (b >> (k * bpp)) & mask)))
}

/// Quadrant signs for quarter circles
const QUADRANTS: [(i32, i32); 4] = [(-1, -1), (1, -1), (-1, 1), (1, 1)];

/// Fill a quarter circle using the midpoint algorithm
fn fill_quarter(fb: &mut Framebuffer, cx: i32, cy: i32, r: i32, (sx, sy): (i32, i32), color: u32) {
    let mut span = |row: i32, extent: i32| {
        for c in 0..=extent {
            fb.draw_point(cx + sx * c, cy + sy * row, color);
        }
    };

    let (mut dx, mut dy, mut err) = (r, 0, 1 - r);
    while dx >= dy {
        span(dy, dx);
        span(dx, dy);

        dy += 1;
        if err < 0 {
            err += 2 * dy + 1;
        } else {
            dx -= 1;
            err += 2 * (dy - dx) + 1;
        }
    }
}

/// Fill a rectangle with rounded corners
pub fn fill_rounded(fb: &mut Framebuffer, x: i32, y: i32, w: i32, h: i32, r: i32, color: u32) {
    if w <= 0 || h <= 0 {
        return;
    }

    let r = r.min(w / 2).min(h / 2).max(0);
    if r == 0 {
        fb.fill_rect(x, y, w, h, color);
        return;
    }

    fb.fill_rect(x + r, y, w - 2 * r, h, color);
    fb.fill_rect(x, y + r, r, h - 2 * r, color);
    fb.fill_rect(x + w - r, y + r, r, h - 2 * r, color);

    let (left, right) = (x + r, x + w - r - 1);
    let (top, bottom) = (y + r, y + h - r - 1);

    for (q, (cx, cy)) in QUADRANTS
        .iter()
        .zip([(left, top), (right, top), (left, bottom), (right, bottom)])
    {
        fill_quarter(fb, cx, cy, r, *q, color);
    }
}

fn fill_circle(fb: &mut Framebuffer, cx: i32, cy: i32, r: i32, color: u32) {
    if r < 0 {
        return;
    }
    for q in QUADRANTS {
        fill_quarter(fb, cx, cy, r, q, color);
    }
}

fn draw_glyph(fb: &mut Framebuffer, g: &Glyph, x: i32, y: i32, fg: u32, bg: u32) {
    for gy in 0..g.height {
        for gx in 0..g.width {
            let c = match g.bit(gx, gy) {
                true => fg,
                false => bg,
            };
            fb.draw_point(x + gx as i32, y + gy as i32, c);
        }
    }
}

/// Text layout for a single BAGL label
struct Label<'a> {
    font: &'a Font,
    bytes: &'a [u8],
}

impl<'a> Label<'a> {
    fn new(font_id: u16, ctx: &'a [u8]) -> Self {
        let end = ctx.iter().position(|b| *b == 0).unwrap_or(ctx.len());
        Self {
            font: fonts::font(font_id),
            bytes: &ctx[..end],
        }
    }

    fn glyph(&self, b: u8) -> Option<&'static Glyph> {
        match b {
            0x80..=0xBF => fonts::font(BAGL_FONT_SYMBOLS).glyph(b as char),
            _ => None,
        }
    }

    fn advance(&self, b: u8) -> i32 {
        match b {
            0xC0..=0xFF => (b & 0x3F) as i32,
            0x80..=0xBF => self.glyph(b).map(|g| g.width as i32).unwrap_or(0),
            _ => self.font.glyph(b as char).map(|g| g.width as i32).unwrap_or(0),
        }
    }

    fn width(&self) -> i32 {
        self.bytes.iter().map(|b| self.advance(*b)).sum()
    }

    /// Printable text, without symbols or blank advances
    fn text(&self) -> String {
        self.bytes
            .iter()
            .filter(|b| (0x20..0x7F).contains(*b))
            .map(|b| *b as char)
            .collect()
    }

    fn draw(&self, fb: &mut Framebuffer, x: i32, y: i32, fg: u32, bg: u32) {
        let mut cx = x;
        for b in self.bytes {
            let g = match b {
                0xC0..=0xFF => None,
                0x80..=0xBF => self.glyph(*b),
                _ => self.font.glyph(*b as char),
            };
            if let Some(g) = g {
                draw_glyph(fb, g, cx, y, fg, bg);
            }
            cx += self.advance(*b);
        }
    }
}

impl Bagl {
    /// Create a new renderer
    pub fn new() -> Self {
        Self::default()
    }

    /// Current raw bitmap cursor
    pub fn draw_state(&self) -> Option<&DrawState> {
        self.draw.as_ref()
    }

    /// Handle a `SCREEN_DISPLAY_STATUS` payload
    pub fn display_status(
        &mut self,
        fb: &mut Framebuffer,
        ocr: &mut Ocr,
        data: &[u8],
    ) -> Result<(), Error> {
        let (c, n) = Component::decode_owned(data)?;
        let ctx = &data[n..];

        trace!("bagl component: {:?}", c);

        let (x, y, w, h) = (c.x as i32, c.y as i32, c.width as i32, c.height as i32);

        match c.kind {
            ComponentType::None => (),
            ComponentType::Rectangle => {
                self.rectangle(fb, &c);

                if x <= 0 && y <= 0 && w >= fb.width() as i32 && h >= fb.height() as i32 {
                    ocr.clear_screen();
                }
            }
            ComponentType::Line => fb.fill_rect(x, y, w, h, c.fgcolor),
            ComponentType::Circle => {
                let r = c.radius as i32;
                let (cx, cy) = (x + r, y + r);

                fill_circle(fb, cx, cy, r, c.fgcolor);
                if c.fill != BAGL_FILL {
                    fill_circle(fb, cx, cy, r - c.stroke as i32, c.bgcolor);
                }
            }
            ComponentType::Label | ComponentType::Labeline => {
                if c.fill == BAGL_FILL {
                    fb.fill_rect(x, y, w, h, c.bgcolor);
                }
                self.label(fb, ocr, &c, ctx, c.fgcolor, c.bgcolor);
            }
            ComponentType::Button => {
                self.rectangle(fb, &c);

                let (fg, bg) = match c.fill == BAGL_FILL {
                    true => (c.bgcolor, c.fgcolor),
                    false => (c.fgcolor, c.bgcolor),
                };
                self.label(fb, ocr, &c, ctx, fg, bg);
            }
            ComponentType::Icon => self.icon(fb, &c, ctx)?,
        }

        Ok(())
    }

    fn rectangle(&mut self, fb: &mut Framebuffer, c: &Component) {
        let (x, y, w, h) = (c.x as i32, c.y as i32, c.width as i32, c.height as i32);
        let (r, s) = (c.radius as i32, c.stroke as i32);

        if c.fill == BAGL_FILL {
            fill_rounded(fb, x, y, w, h, r, c.fgcolor);
        } else {
            fill_rounded(fb, x, y, w, h, r, c.fgcolor);
            fill_rounded(fb, x + s, y + s, w - 2 * s, h - 2 * s, r - s, c.bgcolor);
        }
    }

    fn label(
        &mut self,
        fb: &mut Framebuffer,
        ocr: &mut Ocr,
        c: &Component,
        ctx: &[u8],
        fg: u32,
        bg: u32,
    ) {
        let label = Label::new(c.font(), ctx);
        if label.bytes.is_empty() {
            return;
        }

        let text_w = label.width();
        let font_h = label.font.height as i32;
        let (x, y, w, h) = (c.x as i32, c.y as i32, c.width as i32, c.height as i32);

        let tx = match c.halign() {
            FONT_ALIGN_RIGHT => x + w - text_w,
            FONT_ALIGN_CENTER => x + (w - text_w) / 2,
            _ => x,
        };

        let ty = match (c.kind, c.valign()) {
            (ComponentType::Labeline, _) => y - label.font.baseline as i32,
            (_, FONT_ALIGN_MIDDLE) => y + (h - font_h) / 2,
            (_, FONT_ALIGN_BOTTOM) => y + h - font_h,
            _ => y,
        };

        label.draw(fb, tx, ty, fg, bg);

        let text = label.text();
        if text.trim().is_empty() {
            return;
        }

        debug!("bagl text: '{}' at ({}, {})", text, tx, ty);

        ocr.add_event(TextEvent {
            text,
            x: tx.max(0) as u16,
            y: ty.max(0) as u16,
            w: text_w.max(0) as u16,
            h: font_h as u16,
            clear: false,
        });
    }

    fn icon(&mut self, fb: &mut Framebuffer, c: &Component, ctx: &[u8]) -> Result<(), Error> {
        let (x, y, w, h) = (c.x as i32, c.y as i32, c.width as i32, c.height as i32);

        if c.icon_id != 0 {
            let cp = 0x80 + (c.icon_id & 0x3F) as u32;
            let g = char::from_u32(cp).and_then(|ch| fonts::font(BAGL_FONT_SYMBOLS).glyph(ch));

            match g {
                Some(g) => {
                    let gx = x + (w - g.width as i32) / 2;
                    let gy = y + (h - g.height as i32) / 2;
                    draw_glyph(fb, g, gx, gy, c.fgcolor, c.bgcolor);
                }
                None => debug!("unknown bagl icon {}", c.icon_id),
            }
            return Ok(());
        }

        let (icon, _) = CustomIcon::decode_owned(ctx)?;
        let area = w.max(0) as usize * h.max(0) as usize;

        for (i, v) in unpack(&icon.bitmap, icon.bpp)?.take(area).enumerate() {
            let color = icon.colors.get(v as usize).copied().unwrap_or(0);
            fb.draw_point(x + (i % w as usize) as i32, y + (i / w as usize) as i32, color);
        }

        Ok(())
    }

    /// Handle a `SCREEN_DISPLAY_RAW_STATUS` payload
    pub fn display_raw_status(
        &mut self,
        fb: &mut Framebuffer,
        ocr: &mut Ocr,
        data: &[u8],
    ) -> Result<(), Error> {
        let (status, _) = RawStatus::decode_owned(data)?;

        let bitmap = match status {
            RawStatus::Start { header, bitmap } => {
                let ocr_enabled = fb.model().ocr_raw_status() && header.bpp == 1;
                if ocr_enabled && header.x >= 0 && header.y >= 0 {
                    ocr.analyze_bitmap(
                        &bitmap,
                        header.x as u16,
                        header.y as u16,
                        header.width,
                        header.height,
                    );
                }

                self.draw = Some(DrawState { header, cursor: 0 });
                bitmap
            }
            RawStatus::Continue { bitmap } => bitmap,
        };

        let state = self
            .draw
            .as_mut()
            .ok_or(Error::InvalidImage("raw continuation without start"))?;

        let hdr = &state.header;
        let (w, area) = (hdr.width as usize, hdr.width as usize * hdr.height as usize);
        if w == 0 {
            return Ok(());
        }

        for v in unpack(&bitmap, hdr.bpp)? {
            if state.cursor >= area {
                break;
            }

            let color = hdr.colors.get(v as usize).copied().unwrap_or(0);
            fb.draw_point(
                hdr.x as i32 + (state.cursor % w) as i32,
                hdr.y as i32 + (state.cursor / w) as i32,
                color,
            );
            state.cursor += 1;
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use encdec::Encode;

    use speculos_mcu_proto::bagl::FONT_ALIGN_LEFT;

    use super::*;
    use crate::Model;

    fn status(c: Component, ctx: &[u8]) -> Vec<u8> {
        let mut b = vec![0u8; Component::LEN];
        c.encode(&mut b).unwrap();
        b.extend_from_slice(ctx);
        b
    }

    #[test]
    fn filled_rectangle_clears() {
        let mut fb = Framebuffer::new(Model::NanoSP);
        let mut ocr = Ocr::new(Model::NanoSP);
        let mut b = Bagl::new();

        let c = Component {
            kind: ComponentType::Rectangle,
            width: 128,
            height: 64,
            fill: BAGL_FILL,
            fgcolor: 0xffffff,
            ..Default::default()
        };
        b.display_status(&mut fb, &mut ocr, &status(c, &[])).unwrap();

        assert_eq!(fb.pixel(0, 0), Some(0xffffff));
        assert_eq!(fb.pixel(127, 63), Some(0xffffff));

        ocr.add_char('a', 0, 0, 6, 8);
        assert!(ocr.get_events()[0].clear);
    }

    #[test]
    fn rounded_outline() {
        let mut fb = Framebuffer::new(Model::Stax);
        let mut ocr = Ocr::new(Model::Stax);
        let mut b = Bagl::new();

        let c = Component {
            kind: ComponentType::Rectangle,
            x: 10,
            y: 10,
            width: 40,
            height: 20,
            stroke: 2,
            radius: 6,
            fgcolor: 0x0000ff,
            bgcolor: 0x00ff00,
            ..Default::default()
        };
        b.display_status(&mut fb, &mut ocr, &status(c, &[])).unwrap();

        // Corners are left untouched, edges use the stroke, centre the background
        assert_eq!(fb.pixel(10, 10), Some(0));
        assert_eq!(fb.pixel(30, 10), Some(0x0000ff));
        assert_eq!(fb.pixel(30, 11), Some(0x0000ff));
        assert_eq!(fb.pixel(30, 20), Some(0x00ff00));
    }

    #[test]
    fn label_text_event() {
        let mut fb = Framebuffer::new(Model::NanoSP);
        let mut ocr = Ocr::new(Model::NanoSP);
        let mut b = Bagl::new();

        let c = Component {
            kind: ComponentType::Labeline,
            x: 0,
            y: 20,
            width: 128,
            height: 12,
            fgcolor: 0xffffff,
            font_id: FONT_ALIGN_CENTER,
            ..Default::default()
        };
        b.display_status(&mut fb, &mut ocr, &status(c, b"Hi\0")).unwrap();

        let ev = ocr.get_events();
        assert_eq!(ev.len(), 1);
        assert_eq!(ev[0].text, "Hi");
        // Centred 12px wide text, baseline at 20
        assert_eq!((ev[0].x, ev[0].y, ev[0].w, ev[0].h), (58, 13, 12, 8));
    }

    #[test]
    fn blank_advances() {
        let label = Label::new(FONT_ALIGN_LEFT, &[b'a', 0xC4, b'b']);
        assert_eq!(label.width(), 6 + 4 + 6);
        assert_eq!(label.text(), "ab");
    }

    #[test]
    fn raw_status_continuation() {
        let mut fb = Framebuffer::new(Model::NanoX);
        let mut ocr = Ocr::new(Model::NanoX);
        let mut b = Bagl::new();

        let start = RawStatus::Start {
            header: RawBitmap {
                x: 4,
                y: 4,
                width: 16,
                height: 1,
                bpp: 1,
                colors: vec![0x000000, 0xffffff],
            },
            bitmap: vec![0x01],
        };
        let mut buff = vec![0u8; start.encode_len().unwrap()];
        start.encode(&mut buff).unwrap();
        b.display_raw_status(&mut fb, &mut ocr, &buff).unwrap();

        assert_eq!(fb.pixel(4, 4), Some(0xffffff));
        assert_eq!(fb.pixel(5, 4), Some(0));
        assert_eq!(b.draw_state().unwrap().cursor, 8);

        b.display_raw_status(&mut fb, &mut ocr, &[0x01, 0x80]).unwrap();
        assert_eq!(fb.pixel(19, 4), Some(0xffffff));
        assert_eq!(b.draw_state().unwrap().cursor, 16);
    }

    #[test]
    fn continuation_without_start() {
        let mut fb = Framebuffer::new(Model::NanoX);
        let mut ocr = Ocr::new(Model::NanoX);

        assert!(Bagl::new()
            .display_raw_status(&mut fb, &mut ocr, &[0x01, 0xff])
            .is_err());
    }
}
