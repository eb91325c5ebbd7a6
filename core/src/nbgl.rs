// Copyright (c) 2022-2023 The MobileCoin Foundation

//! NBGL renderer

use std::io::Read;

use encdec::DecodeOwned;
use flate2::read::GzDecoder;
use log::{debug, trace};
use once_cell::sync::Lazy;

use speculos_mcu_proto::nbgl::{
    refresh_area, Area, Bpp, Compression, DrawImage, DrawImageFile, DrawImageRle, DrawLine,
    Transformation,
};

use crate::{rle, Error, Framebuffer, Ocr};

/// Color step per index for each bpp (1, 2, 4)
pub const NBGL_COLOR_STEP: [u32; 3] = [0xFFFFFF, 0x555555, 0x111111];

/// Identity 2-bpp color map
pub const IDENTITY_2BPP: u8 = 0b11_10_01_00;

/// Expand a 2-bit NBGL color (black, dark gray, light gray, white)
pub fn color_2bpp(c: u8) -> u32 {
    NBGL_COLOR_STEP[1] * (c & 0x03) as u32
}

fn lerp(front: u32, back: u32, i: u32) -> u32 {
    let mut c = 0;
    for shift in [16, 8, 0] {
        let f = (front >> shift) & 0xFF;
        let b = (back >> shift) & 0xFF;
        let v = (f * (15 - i) + b * i) / 15;
        c |= v << shift;
    }
    c
}

/// 4-bpp gradients indexed by `(front << 2) | back`, from front (0) to back (15)
static GRADIENTS: Lazy<[[u32; 16]; 16]> = Lazy::new(|| {
    let mut g = [[0u32; 16]; 16];
    for (k, row) in g.iter_mut().enumerate() {
        let front = color_2bpp((k >> 2) as u8);
        let back = color_2bpp(k as u8);
        for (i, c) in row.iter_mut().enumerate() {
            *c = lerp(front, back, i as u32);
        }
    }
    g
});

/// Map a pixel value to an RGB color
fn pixel_color(bpp: Bpp, back: u8, color_map: u8, v: u8) -> u32 {
    match bpp {
        Bpp::One if v != 0 => color_2bpp(color_map),
        Bpp::One => color_2bpp(back),
        Bpp::Two => color_2bpp(color_map >> (2 * (v & 0x03))),
        Bpp::Four if color_map == 0 => NBGL_COLOR_STEP[2] * (v & 0x0F) as u32,
        Bpp::Four => GRADIENTS[(color_map & 0x0F) as usize][(v & 0x0F) as usize],
    }
}

/// Compute the target position of pixel `i` for a transformation
pub fn position(i: usize, w: usize, h: usize, t: Transformation) -> Option<(usize, usize)> {
    if i >= w * h {
        return None;
    }

    let p = match t {
        Transformation::None => (w - 1 - i / h, i % h),
        Transformation::HorizontalMirror => (i / h, i % h),
        Transformation::VerticalMirror => (w - 1 - i / h, h - 1 - i % h),
        Transformation::BothMirror => (i / h, h - 1 - i % h),
        Transformation::Rotate90 => (i % w, i / w),
    };

    Some(p)
}

/// Unpack MSB-first pixel values
fn unpack(pixels: &[u8], bpp: Bpp) -> impl Iterator<Item = u8> + '_ {
    let bits = bpp.bits() as u8;
    let mask = ((1u16 << bits) - 1) as u8;
    let per_byte = 8 / bits;

    pixels
        .iter()
        .flat_map(move |b| (0..per_byte).map(move |k| (b >> (8 - bits * (k + 1))) & mask))
}

/// Decoded image, pixel values in row-major order
struct Image {
    width: usize,
    height: usize,
    values: Vec<u8>,
}

impl Image {
    fn place(width: usize, height: usize, t: Transformation, src: impl Iterator<Item = u8>) -> Self {
        let mut values = vec![0u8; width * height];
        for (i, v) in src.enumerate() {
            match position(i, width, height, t) {
                Some((x, y)) => values[y * width + x] = v,
                None => break,
            }
        }
        Self {
            width,
            height,
            values,
        }
    }

    /// Pack non-zero values as an LSB-first row-major bitmap
    fn bitmap(&self) -> Vec<u8> {
        let mut b = vec![0u8; (self.values.len() + 7) / 8];
        for (i, v) in self.values.iter().enumerate() {
            if *v != 0 {
                b[i / 8] |= 1 << (i % 8);
            }
        }
        b
    }
}

/// NBGL renderer
#[derive(Debug, Default)]
pub struct Nbgl;

impl Nbgl {
    /// Create a new renderer
    pub fn new() -> Self {
        Self
    }

    fn check_area(fb: &Framebuffer, a: &Area) -> Result<(), Error> {
        if a.y0 % 4 != 0 || a.height % 4 != 0 {
            return Err(Error::NbglMisaligned {
                y0: a.y0,
                h: a.height,
            });
        }

        if a.x0 as u32 + a.width as u32 > fb.width() as u32
            || a.y0 as u32 + a.height as u32 > fb.height() as u32
        {
            return Err(Error::NbglOutOfScreen);
        }

        Ok(())
    }

    /// Handle `NBGL_DRAW_RECT`
    pub fn draw_rect(&mut self, fb: &mut Framebuffer, ocr: &mut Ocr, data: &[u8]) -> Result<(), Error> {
        let (a, _) = Area::decode_owned(data)?;
        Self::check_area(fb, &a)?;

        trace!("nbgl rect: {:?}", a);

        fb.fill_rect(
            a.x0 as i32,
            a.y0 as i32,
            a.width as i32,
            a.height as i32,
            color_2bpp(a.color),
        );

        if a.x0 == 0 && a.y0 == 0 && a.width == fb.width() && a.height == fb.height() {
            ocr.clear_screen();
        }

        Ok(())
    }

    /// Handle `NBGL_DRAW_LINE`
    pub fn draw_line(&mut self, fb: &mut Framebuffer, data: &[u8]) -> Result<(), Error> {
        let (l, _) = DrawLine::decode_owned(data)?;
        let a = &l.area;
        Self::check_area(fb, a)?;

        for r in 0..a.height {
            let c = match r < 8 && l.mask & (1 << r) != 0 {
                true => l.color,
                false => a.color,
            };
            fb.fill_rect(a.x0 as i32, (a.y0 + r) as i32, a.width as i32, 1, color_2bpp(c));
        }

        Ok(())
    }

    /// Handle `NBGL_DRAW_IMAGE`
    pub fn draw_image(&mut self, fb: &mut Framebuffer, ocr: &mut Ocr, data: &[u8]) -> Result<(), Error> {
        let (img, _) = DrawImage::decode_owned(data)?;
        let a = img.area;
        Self::check_area(fb, &a)?;

        let decoded = Image::place(
            a.width as usize,
            a.height as usize,
            img.transformation,
            unpack(&img.pixels, a.bpp),
        );

        self.blit(fb, &a, a.bpp, img.color_map, &decoded);
        self.recognise(ocr, &a, a.bpp, img.stamped, &decoded);

        Ok(())
    }

    /// Handle `NBGL_DRAW_IMAGE_FILE`
    pub fn draw_image_file(
        &mut self,
        fb: &mut Framebuffer,
        ocr: &mut Ocr,
        data: &[u8],
    ) -> Result<(), Error> {
        let (img, _) = DrawImageFile::decode_owned(data)?;
        let a = img.area;
        Self::check_area(fb, &a)?;

        let f = &img.file;
        if f.width != a.width || f.height != a.height {
            return Err(Error::InvalidImage("image file size does not match area"));
        }
        let (w, h) = (a.width as usize, a.height as usize);

        trace!(
            "nbgl image file: {}x{} {} bpp, {} compression",
            w,
            h,
            f.bpp.bits(),
            f.compression
        );

        let decoded = match f.compression {
            Compression::None => Image::place(w, h, Transformation::None, unpack(&f.data, f.bpp)),
            Compression::Gzip => {
                let raw = gunzip_chunks(&f.data)?;
                Image::place(w, h, Transformation::None, unpack(&raw, f.bpp))
            }
            Compression::Rle => {
                let values = decode_rle(f.bpp, &f.data)?;
                Image::place(w, h, Transformation::None, values.into_iter())
            }
        };

        let color_map = match f.bpp {
            Bpp::One => 0,
            Bpp::Two => IDENTITY_2BPP,
            Bpp::Four => a.color & 0x03,
        };

        self.blit(fb, &a, f.bpp, color_map, &decoded);
        self.recognise(ocr, &a, f.bpp, img.stamped, &decoded);

        Ok(())
    }

    /// Handle `NBGL_DRAW_IMAGE_RLE`
    pub fn draw_image_rle(
        &mut self,
        fb: &mut Framebuffer,
        ocr: &mut Ocr,
        data: &[u8],
    ) -> Result<(), Error> {
        let (img, _) = DrawImageRle::decode_owned(data)?;
        let a = img.area;
        Self::check_area(fb, &a)?;

        let values = decode_rle(a.bpp, &img.data)?;
        let decoded = Image::place(
            a.width as usize,
            a.height as usize,
            Transformation::None,
            values.into_iter(),
        );

        self.blit(fb, &a, a.bpp, img.color_map, &decoded);
        self.recognise(ocr, &a, a.bpp, img.stamped, &decoded);

        Ok(())
    }

    /// Handle `NBGL_REFRESH`, returning the area to commit (`None` for the full screen)
    pub fn refresh(&mut self, fb: &Framebuffer, data: &[u8]) -> Result<Option<Area>, Error> {
        let a = refresh_area(data)?;
        if let Some(a) = &a {
            Self::check_area(fb, a)?;
        }
        Ok(a)
    }

    fn blit(&self, fb: &mut Framebuffer, a: &Area, bpp: Bpp, color_map: u8, img: &Image) {
        for (i, v) in img.values.iter().enumerate() {
            let x = a.x0 as i32 + (i % img.width) as i32;
            let y = a.y0 as i32 + (i / img.width) as i32;
            fb.draw_point(x, y, pixel_color(bpp, a.color, color_map, *v));
        }
    }

    fn recognise(&self, ocr: &mut Ocr, a: &Area, bpp: Bpp, stamped: Option<char>, img: &Image) {
        let (w, h) = (img.width as u16, img.height as u16);

        match stamped {
            Some(c) if !c.is_control() => ocr.add_char(c, a.x0, a.y0, w, h),
            Some(_) => (),
            None if bpp == Bpp::One => {
                if !ocr.analyze_bitmap(&img.bitmap(), a.x0, a.y0, w, h) {
                    debug!("no glyph match at ({}, {})", a.x0, a.y0);
                }
            }
            None => (),
        }
    }
}

/// Decode RLE image data to pixel values
fn decode_rle(bpp: Bpp, data: &[u8]) -> Result<Vec<u8>, Error> {
    match bpp {
        Bpp::Four => rle::decode_4bpp(data),
        Bpp::One => Ok(rle::decode_1bpp(data)),
        Bpp::Two => Err(Error::InvalidImage("rle not supported for 2 bpp")),
    }
}

/// Decompress concatenated `{len: u16le, gzip}` chunks
pub fn gunzip_chunks(data: &[u8]) -> Result<Vec<u8>, Error> {
    let mut out = vec![];
    let mut i = 0;

    while i < data.len() {
        if data.len() < i + 2 {
            return Err(Error::InvalidImage("truncated gzip chunk header"));
        }

        let len = u16::from_le_bytes([data[i], data[i + 1]]) as usize;
        i += 2;

        if data.len() < i + len {
            return Err(Error::InvalidImage("truncated gzip chunk"));
        }

        GzDecoder::new(&data[i..][..len])
            .read_to_end(&mut out)
            .map_err(|e| Error::Gzip(e.to_string()))?;
        i += len;
    }

    Ok(out)
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use encdec::Encode;
    use flate2::{write::GzEncoder, Compression as GzLevel};

    use speculos_mcu_proto::nbgl::ImageFile;

    use super::*;
    use crate::{fonts, Model};

    fn area(x0: u16, y0: u16, width: u16, height: u16, color: u8, bpp: Bpp) -> Area {
        Area {
            x0,
            y0,
            width,
            height,
            color,
            bpp,
        }
    }

    fn encode<T: Encode>(v: &T) -> Vec<u8>
    where
        <T as Encode>::Error: std::fmt::Debug,
    {
        let mut b = vec![0u8; v.encode_len().unwrap()];
        v.encode(&mut b).unwrap();
        b
    }

    #[test]
    fn full_screen_rect() {
        let mut fb = Framebuffer::new(Model::Stax);
        let mut ocr = Ocr::new(Model::Stax);

        let a = area(0, 0, 400, 672, 3, Bpp::Two);
        Nbgl::new().draw_rect(&mut fb, &mut ocr, &encode(&a)).unwrap();

        assert_eq!(fb.pixel(199, 335), Some(0xFFFFFF));
    }

    #[test]
    fn area_checks() {
        let mut fb = Framebuffer::new(Model::Stax);
        let mut ocr = Ocr::new(Model::Stax);
        let mut n = Nbgl::new();

        let a = area(0, 2, 10, 4, 0, Bpp::One);
        assert_eq!(
            n.draw_rect(&mut fb, &mut ocr, &encode(&a)),
            Err(Error::NbglMisaligned { y0: 2, h: 4 })
        );

        let a = area(395, 0, 10, 4, 0, Bpp::One);
        assert_eq!(
            n.draw_rect(&mut fb, &mut ocr, &encode(&a)),
            Err(Error::NbglOutOfScreen)
        );
    }

    #[test]
    fn draw_line_mask() {
        let mut fb = Framebuffer::new(Model::Flex);

        let mut b = encode(&area(0, 4, 4, 4, 0, Bpp::Two));
        b.extend_from_slice(&[0b0000_0101, 2]);
        Nbgl::new().draw_line(&mut fb, &b).unwrap();

        assert_eq!(fb.pixel(0, 4), Some(0xAAAAAA));
        assert_eq!(fb.pixel(0, 5), Some(0));
        assert_eq!(fb.pixel(3, 6), Some(0xAAAAAA));
    }

    #[test]
    fn transformations() {
        assert_eq!(position(0, 3, 2, Transformation::None), Some((2, 0)));
        assert_eq!(position(1, 3, 2, Transformation::None), Some((2, 1)));
        assert_eq!(position(2, 3, 2, Transformation::None), Some((1, 0)));
        assert_eq!(position(0, 3, 2, Transformation::HorizontalMirror), Some((0, 0)));
        assert_eq!(position(0, 3, 2, Transformation::VerticalMirror), Some((2, 1)));
        assert_eq!(position(0, 3, 2, Transformation::BothMirror), Some((0, 1)));
        assert_eq!(position(4, 3, 2, Transformation::Rotate90), Some((1, 1)));
        assert_eq!(position(6, 3, 2, Transformation::Rotate90), None);
    }

    #[test]
    fn gradients() {
        // Black to white is the grey ramp
        for i in 0..16u8 {
            assert_eq!(pixel_color(Bpp::Four, 0, 0b0011, i), 0x111111 * i as u32);
        }
        // Front index 0, back index 15
        assert_eq!(pixel_color(Bpp::Four, 0, 0b1100, 0), 0xFFFFFF);
        assert_eq!(pixel_color(Bpp::Four, 0, 0b1100, 15), 0x000000);

        assert_eq!(pixel_color(Bpp::Two, 0, IDENTITY_2BPP, 2), 0xAAAAAA);
        assert_eq!(pixel_color(Bpp::One, 3, 0, 0), 0xFFFFFF);
        assert_eq!(pixel_color(Bpp::One, 3, 0, 1), 0x000000);
    }

    #[test]
    fn stamped_image_ocr() {
        let mut fb = Framebuffer::new(Model::Stax);
        let mut ocr = Ocr::new(Model::Stax);

        let img = DrawImage {
            area: area(8, 8, 8, 8, 3, Bpp::One),
            transformation: Transformation::None,
            color_map: 0,
            pixels: vec![0xff; 8],
            stamped: Some('Z'),
        };
        Nbgl::new().draw_image(&mut fb, &mut ocr, &encode(&img)).unwrap();

        let ev = ocr.get_events();
        assert_eq!(ev[0].text, "Z");
        assert_eq!(fb.pixel(8, 8), Some(0));
    }

    #[test]
    fn legacy_image_ocr() {
        let mut fb = Framebuffer::new(Model::Stax);
        let mut ocr = Ocr::new(Model::Stax);

        // Render the 'K' glyph column by column from the right, MSB first
        let g = fonts::font(fonts::BAGL_FONT_MONO_8PX).glyph('K').unwrap();
        let mut pixels = vec![];
        for x in (0..g.width).rev() {
            let mut b = 0u8;
            for y in 0..g.height {
                if g.bit(x, y) {
                    b |= 0x80 >> y;
                }
            }
            pixels.push(b);
        }

        let img = DrawImage {
            area: area(16, 8, 6, 8, 3, Bpp::One),
            transformation: Transformation::None,
            color_map: 0,
            pixels,
            stamped: None,
        };
        Nbgl::new().draw_image(&mut fb, &mut ocr, &encode(&img)).unwrap();

        assert_eq!(ocr.get_events()[0].text, "K");
    }

    #[test]
    fn rle_image() {
        let mut fb = Framebuffer::new(Model::Stax);
        let mut ocr = Ocr::new(Model::Stax);

        let img = DrawImageRle {
            area: area(0, 0, 1, 4, 3, Bpp::Four),
            data: rle::encode_4bpp(&[0, 15, 15, 5]),
            color_map: 0,
            stamped: None,
        };
        Nbgl::new().draw_image_rle(&mut fb, &mut ocr, &encode(&img)).unwrap();

        assert_eq!(fb.pixel(0, 0), Some(0));
        assert_eq!(fb.pixel(0, 1), Some(0xFFFFFF));
        assert_eq!(fb.pixel(0, 3), Some(0x555555));
    }

    #[test]
    fn gzip_image_file() {
        let mut fb = Framebuffer::new(Model::Stax);
        let mut ocr = Ocr::new(Model::Stax);

        // 2x4 1bpp image, right column then left column
        let mut enc = GzEncoder::new(vec![], GzLevel::default());
        enc.write_all(&[0b1100_0011]).unwrap();
        let z = enc.finish().unwrap();

        let mut data = (z.len() as u16).to_le_bytes().to_vec();
        data.extend_from_slice(&z);

        let f = ImageFile {
            width: 2,
            height: 4,
            bpp: Bpp::One,
            compression: Compression::Gzip,
            data,
        };
        let mut b = encode(&area(4, 4, 2, 4, 3, Bpp::One));
        b.extend_from_slice(&encode(&f));

        Nbgl::new().draw_image_file(&mut fb, &mut ocr, &b).unwrap();

        // Set bits are black, clear bits the (white) area color
        assert_eq!(fb.pixel(5, 4), Some(0));
        assert_eq!(fb.pixel(5, 7), Some(0xFFFFFF));
        assert_eq!(fb.pixel(4, 4), Some(0xFFFFFF));
        assert_eq!(fb.pixel(4, 7), Some(0));
    }

    fn image_file(a: Area, width: u16, height: u16, bpp: Bpp, compression: Compression, data: Vec<u8>) -> Vec<u8> {
        let f = ImageFile {
            width,
            height,
            bpp,
            compression,
            data,
        };
        let mut b = encode(&a);
        b.extend_from_slice(&encode(&f));
        b
    }

    #[test]
    fn raw_image_file() {
        let mut fb = Framebuffer::new(Model::Stax);
        let mut ocr = Ocr::new(Model::Stax);

        let b = image_file(
            area(8, 8, 2, 4, 3, Bpp::One),
            2,
            4,
            Bpp::One,
            Compression::None,
            vec![0b1100_0011],
        );
        Nbgl::new().draw_image_file(&mut fb, &mut ocr, &b).unwrap();

        assert_eq!(fb.pixel(9, 8), Some(0));
        assert_eq!(fb.pixel(9, 11), Some(0xFFFFFF));
        assert_eq!(fb.pixel(8, 8), Some(0xFFFFFF));
        assert_eq!(fb.pixel(8, 11), Some(0));
    }

    #[test]
    fn rle_image_file() {
        let mut fb = Framebuffer::new(Model::Stax);
        let mut ocr = Ocr::new(Model::Stax);

        let b = image_file(
            area(0, 0, 1, 4, 3, Bpp::One),
            1,
            4,
            Bpp::One,
            Compression::Rle,
            rle::encode_1bpp(&[0, 1, 1, 0]),
        );
        Nbgl::new().draw_image_file(&mut fb, &mut ocr, &b).unwrap();

        assert_eq!(fb.pixel(0, 0), Some(0xFFFFFF));
        assert_eq!(fb.pixel(0, 1), Some(0));
        assert_eq!(fb.pixel(0, 2), Some(0));
        assert_eq!(fb.pixel(0, 3), Some(0xFFFFFF));
    }

    #[test]
    fn four_bpp_image_file() {
        let mut fb = Framebuffer::new(Model::Stax);
        let mut ocr = Ocr::new(Model::Stax);

        // Front is black, back is the (light gray) area color
        let b = image_file(
            area(0, 0, 1, 4, 2, Bpp::Four),
            1,
            4,
            Bpp::Four,
            Compression::None,
            vec![0x0F, 0x50],
        );
        Nbgl::new().draw_image_file(&mut fb, &mut ocr, &b).unwrap();

        assert_eq!(fb.pixel(0, 0), Some(0));
        assert_eq!(fb.pixel(0, 1), Some(0xAAAAAA));
        assert_eq!(fb.pixel(0, 2), Some(0x383838));
        assert_eq!(fb.pixel(0, 3), Some(0));
    }

    #[test]
    fn image_file_larger_than_area() {
        let mut fb = Framebuffer::new(Model::Stax);
        let mut ocr = Ocr::new(Model::Stax);
        let mut n = Nbgl::new();

        let white = area(0, 0, 8, 8, 3, Bpp::One);
        n.draw_rect(&mut fb, &mut ocr, &encode(&white)).unwrap();

        let b = image_file(
            area(0, 0, 4, 4, 3, Bpp::One),
            8,
            8,
            Bpp::One,
            Compression::None,
            vec![0xff; 8],
        );
        assert_eq!(
            n.draw_image_file(&mut fb, &mut ocr, &b),
            Err(Error::InvalidImage("image file size does not match area"))
        );

        assert_eq!(fb.pixel(0, 0), Some(0xFFFFFF));
        assert_eq!(fb.pixel(7, 7), Some(0xFFFFFF));
    }

    #[test]
    fn image_file_oversized_header() {
        let mut fb = Framebuffer::new(Model::Stax);
        let mut ocr = Ocr::new(Model::Stax);

        let b = image_file(
            area(0, 0, 4, 4, 3, Bpp::One),
            u16::MAX,
            u16::MAX,
            Bpp::One,
            Compression::None,
            vec![0xff; 4],
        );
        assert!(matches!(
            Nbgl::new().draw_image_file(&mut fb, &mut ocr, &b),
            Err(Error::InvalidImage(_))
        ));
    }
}
