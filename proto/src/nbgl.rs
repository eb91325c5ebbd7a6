// Copyright (c) 2022-2023 The MobileCoin Foundation

//! NBGL draw command payloads
//!
//! Every NBGL command starts with a packed little-endian area header:
//!
//! ```text
//! +-------+-------+-------+-------+-------+-------+
//! |  X0   |  Y0   |   W   |   H   | COLOR |  BPP  |
//! | u16le | u16le | u16le | u16le |  u8   |  u8   |
//! +-------+-------+-------+-------+-------+-------+
//! ```

use byteorder::{ByteOrder, LittleEndian};
use encdec::{DecodeOwned, Encode};
use num_enum::TryFromPrimitive;
use strum::Display;

use crate::{stamped_char, ProtoError};

/// NBGL bits-per-pixel enumeration
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, TryFromPrimitive)]
#[repr(u8)]
pub enum Bpp {
    One = 0,
    Two = 1,
    Four = 2,
}

impl Bpp {
    /// Number of bits per pixel
    pub fn bits(&self) -> usize {
        match self {
            Bpp::One => 1,
            Bpp::Two => 2,
            Bpp::Four => 4,
        }
    }

    /// Map a raw bit count (as found in image file headers) to a [`Bpp`]
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            1 => Some(Bpp::One),
            2 => Some(Bpp::Two),
            4 => Some(Bpp::Four),
            _ => None,
        }
    }

    /// Number of bytes required for `count` pixels
    pub fn packed_len(&self, count: usize) -> usize {
        (count * self.bits() + 7) / 8
    }
}

/// Image transformations
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, TryFromPrimitive)]
#[repr(u8)]
pub enum Transformation {
    /// Columns from the top right, the default firmware layout
    None = 0,
    HorizontalMirror = 1,
    VerticalMirror = 2,
    BothMirror = 3,
    /// Rows from the top left
    Rotate90 = 4,
}

/// Image file compression
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, TryFromPrimitive)]
#[repr(u8)]
pub enum Compression {
    None = 0,
    Gzip = 1,
    Rle = 2,
}

/// NBGL drawing area
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Area {
    pub x0: u16,
    pub y0: u16,
    pub width: u16,
    pub height: u16,
    pub color: u8,
    pub bpp: Bpp,
}

impl Area {
    /// Encoded area length
    pub const LEN: usize = 10;

    /// Number of pixels covered by the area
    pub fn pixels(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl Encode for Area {
    type Error = ProtoError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(Self::LEN)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        if buff.len() < Self::LEN {
            return Err(ProtoError::InvalidLength);
        }

        LittleEndian::write_u16(&mut buff[0..2], self.x0);
        LittleEndian::write_u16(&mut buff[2..4], self.y0);
        LittleEndian::write_u16(&mut buff[4..6], self.width);
        LittleEndian::write_u16(&mut buff[6..8], self.height);
        buff[8] = self.color;
        buff[9] = self.bpp as u8;

        Ok(Self::LEN)
    }
}

impl DecodeOwned for Area {
    type Output = Self;

    type Error = ProtoError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        if buff.len() < Self::LEN {
            return Err(ProtoError::InvalidLength);
        }

        let a = Self {
            x0: LittleEndian::read_u16(&buff[0..2]),
            y0: LittleEndian::read_u16(&buff[2..4]),
            width: LittleEndian::read_u16(&buff[4..6]),
            height: LittleEndian::read_u16(&buff[6..8]),
            color: buff[8],
            bpp: Bpp::try_from(buff[9]).map_err(|_| ProtoError::InvalidEncoding)?,
        };

        Ok((a, Self::LEN))
    }
}

/// `NBGL_DRAW_LINE` payload
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct DrawLine {
    pub area: Area,
    /// Bit `r` set selects `color` for row `r`
    pub mask: u8,
    pub color: u8,
}

impl DecodeOwned for DrawLine {
    type Output = Self;

    type Error = ProtoError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        let (area, n) = Area::decode_owned(buff)?;
        if buff.len() < n + 2 {
            return Err(ProtoError::InvalidLength);
        }

        Ok((
            Self {
                area,
                mask: buff[n],
                color: buff[n + 1],
            },
            n + 2,
        ))
    }
}

/// `NBGL_DRAW_IMAGE` payload
#[derive(Clone, PartialEq, Debug)]
pub struct DrawImage {
    pub area: Area,
    pub transformation: Transformation,
    pub color_map: u8,
    pub pixels: Vec<u8>,
    /// Codepoint appended by firmwares that stamp their glyphs
    pub stamped: Option<char>,
}

impl Encode for DrawImage {
    type Error = ProtoError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(Area::LEN + 2 + self.pixels.len() + self.stamped.map(|_| 4).unwrap_or(0))
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        let len = self.encode_len()?;
        if buff.len() < len {
            return Err(ProtoError::InvalidLength);
        }

        let mut index = self.area.encode(buff)?;
        buff[index] = self.transformation as u8;
        buff[index + 1] = self.color_map;
        index += 2;

        buff[index..][..self.pixels.len()].copy_from_slice(&self.pixels);
        index += self.pixels.len();

        if let Some(c) = self.stamped {
            LittleEndian::write_u32(&mut buff[index..][..4], c as u32);
            index += 4;
        }

        Ok(index)
    }
}

impl DecodeOwned for DrawImage {
    type Output = Self;

    type Error = ProtoError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        let (area, mut index) = Area::decode_owned(buff)?;
        if buff.len() < index + 2 {
            return Err(ProtoError::InvalidLength);
        }

        let transformation = Transformation::try_from(buff[index])
            .map_err(|_| ProtoError::InvalidEncoding)?;
        let color_map = buff[index + 1];
        index += 2;

        let n = area.bpp.packed_len(area.pixels()).min(buff.len() - index);
        let pixels = buff[index..][..n].to_vec();
        index += n;

        let stamped = stamped_char(&buff[index..]);

        Ok((
            Self {
                area,
                transformation,
                color_map,
                pixels,
                stamped,
            },
            buff.len(),
        ))
    }
}

/// Self-describing image file
///
/// ```text
/// +-------+-------+--------------+-------------+------------+
/// |   W   |   H   | BPP<<4|COMP  |  SIZE u24le |  DATA...   |
/// +-------+-------+--------------+-------------+------------+
/// ```
#[derive(Clone, PartialEq, Debug)]
pub struct ImageFile {
    pub width: u16,
    pub height: u16,
    pub bpp: Bpp,
    pub compression: Compression,
    pub data: Vec<u8>,
}

impl ImageFile {
    /// Encoded header length
    pub const HEADER_LEN: usize = 8;
}

impl Encode for ImageFile {
    type Error = ProtoError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        if self.data.len() > 0xFF_FFFF {
            return Err(ProtoError::PayloadTooLarge(self.data.len()));
        }
        Ok(Self::HEADER_LEN + self.data.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        let len = self.encode_len()?;
        if buff.len() < len {
            return Err(ProtoError::InvalidLength);
        }

        LittleEndian::write_u16(&mut buff[0..2], self.width);
        LittleEndian::write_u16(&mut buff[2..4], self.height);
        buff[4] = ((self.bpp.bits() as u8) << 4) | self.compression as u8;
        LittleEndian::write_u24(&mut buff[5..8], self.data.len() as u32);
        buff[8..len].copy_from_slice(&self.data);

        Ok(len)
    }
}

impl DecodeOwned for ImageFile {
    type Output = Self;

    type Error = ProtoError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        if buff.len() < Self::HEADER_LEN {
            return Err(ProtoError::InvalidLength);
        }

        let bpp = Bpp::from_bits(buff[4] >> 4).ok_or(ProtoError::InvalidEncoding)?;
        let compression =
            Compression::try_from(buff[4] & 0x0F).map_err(|_| ProtoError::InvalidEncoding)?;

        let size = LittleEndian::read_u24(&buff[5..8]) as usize;
        if buff.len() < Self::HEADER_LEN + size {
            return Err(ProtoError::InvalidLength);
        }

        let f = Self {
            width: LittleEndian::read_u16(&buff[0..2]),
            height: LittleEndian::read_u16(&buff[2..4]),
            bpp,
            compression,
            data: buff[Self::HEADER_LEN..][..size].to_vec(),
        };

        Ok((f, Self::HEADER_LEN + size))
    }
}

/// `NBGL_DRAW_IMAGE_FILE` payload
#[derive(Clone, PartialEq, Debug)]
pub struct DrawImageFile {
    pub area: Area,
    pub file: ImageFile,
    pub stamped: Option<char>,
}

impl DecodeOwned for DrawImageFile {
    type Output = Self;

    type Error = ProtoError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        let (area, n) = Area::decode_owned(buff)?;
        let (file, m) = ImageFile::decode_owned(&buff[n..])?;
        let stamped = stamped_char(&buff[n + m..]);

        Ok((
            Self {
                area,
                file,
                stamped,
            },
            buff.len(),
        ))
    }
}

/// `NBGL_DRAW_IMAGE_RLE` payload
#[derive(Clone, PartialEq, Debug)]
pub struct DrawImageRle {
    pub area: Area,
    pub data: Vec<u8>,
    pub color_map: u8,
    pub stamped: Option<char>,
}

impl Encode for DrawImageRle {
    type Error = ProtoError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(Area::LEN + 4 + self.data.len() + 1 + self.stamped.map(|_| 4).unwrap_or(0))
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        let len = self.encode_len()?;
        if buff.len() < len {
            return Err(ProtoError::InvalidLength);
        }

        let mut index = self.area.encode(buff)?;
        LittleEndian::write_u32(&mut buff[index..][..4], self.data.len() as u32);
        index += 4;

        buff[index..][..self.data.len()].copy_from_slice(&self.data);
        index += self.data.len();

        buff[index] = self.color_map;
        index += 1;

        if let Some(c) = self.stamped {
            LittleEndian::write_u32(&mut buff[index..][..4], c as u32);
            index += 4;
        }

        Ok(index)
    }
}

impl DecodeOwned for DrawImageRle {
    type Output = Self;

    type Error = ProtoError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        let (area, mut index) = Area::decode_owned(buff)?;
        if buff.len() < index + 4 {
            return Err(ProtoError::InvalidLength);
        }

        let size = LittleEndian::read_u32(&buff[index..][..4]) as usize;
        index += 4;

        if buff.len() < index + size + 1 {
            return Err(ProtoError::InvalidLength);
        }

        let data = buff[index..][..size].to_vec();
        index += size;

        let color_map = buff[index];
        index += 1;

        Ok((
            Self {
                area,
                data,
                color_map,
                stamped: stamped_char(&buff[index..]),
            },
            buff.len(),
        ))
    }
}

/// Decode an `NBGL_REFRESH` payload, an empty payload refreshes the whole screen
pub fn refresh_area(buff: &[u8]) -> Result<Option<Area>, ProtoError> {
    if buff.is_empty() {
        return Ok(None);
    }
    Area::decode_owned(buff).map(|(a, _)| Some(a))
}
