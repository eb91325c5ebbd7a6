// Copyright (c) 2022-2023 The MobileCoin Foundation

//! BAGL display status payloads

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use encdec::{DecodeOwned, Encode};
use num_enum::TryFromPrimitive;
use strum::Display;

use crate::ProtoError;

/// Touchable flag, masked off the component type
pub const TYPE_FLAGS_MASK: u8 = 0x80;

/// Horizontal alignment bits of `font_id`
pub const FONT_ALIGN_H_MASK: u16 = 0xC000;
pub const FONT_ALIGN_LEFT: u16 = 0x0000;
pub const FONT_ALIGN_RIGHT: u16 = 0x4000;
pub const FONT_ALIGN_CENTER: u16 = 0x8000;

/// Vertical alignment bits of `font_id`
pub const FONT_ALIGN_V_MASK: u16 = 0x3000;
pub const FONT_ALIGN_TOP: u16 = 0x0000;
pub const FONT_ALIGN_BOTTOM: u16 = 0x1000;
pub const FONT_ALIGN_MIDDLE: u16 = 0x2000;

/// Font identifier bits of `font_id`
pub const FONT_ID_MASK: u16 = 0x0FFF;

/// BAGL component types
#[derive(Copy, Clone, PartialEq, Debug, Display, TryFromPrimitive)]
#[repr(u8)]
pub enum ComponentType {
    None = 0,
    Button = 1,
    Label = 2,
    Rectangle = 3,
    Line = 4,
    Icon = 5,
    Circle = 6,
    Labeline = 7,
}

/// BAGL component header, sent as the first 24 bytes of a
/// `SCREEN_DISPLAY_STATUS` packet (packed little-endian)
///
/// ```text
///  0       1       2       4       6       8       10      11      12      13      17      21      23
/// +-------+-------+-------+-------+-------+-------+-------+-------+-------+-------+-------+-------+-------+
/// | TYPE  |USERID |   X   |   Y   | WIDTH |HEIGHT |STROKE |RADIUS | FILL  |  FG   |  BG   | FONT  | ICON  |
/// +-------+-------+-------+-------+-------+-------+-------+-------+-------+-------+-------+-------+-------+
/// ```
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Component {
    pub kind: ComponentType,
    pub user_id: u8,
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
    pub stroke: u8,
    pub radius: u8,
    pub fill: u8,
    pub fgcolor: u32,
    pub bgcolor: u32,
    pub font_id: u16,
    pub icon_id: u8,
}

impl Component {
    /// Encoded component length
    pub const LEN: usize = 24;

    /// Horizontal alignment bits
    pub fn halign(&self) -> u16 {
        self.font_id & FONT_ALIGN_H_MASK
    }

    /// Vertical alignment bits
    pub fn valign(&self) -> u16 {
        self.font_id & FONT_ALIGN_V_MASK
    }

    /// Font identifier without alignment bits
    pub fn font(&self) -> u16 {
        self.font_id & FONT_ID_MASK
    }
}

impl Default for Component {
    fn default() -> Self {
        Self {
            kind: ComponentType::None,
            user_id: 0,
            x: 0,
            y: 0,
            width: 0,
            height: 0,
            stroke: 0,
            radius: 0,
            fill: 0,
            fgcolor: 0,
            bgcolor: 0,
            font_id: 0,
            icon_id: 0,
        }
    }
}

impl Encode for Component {
    type Error = ProtoError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(Self::LEN)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        if buff.len() < Self::LEN {
            return Err(ProtoError::InvalidLength);
        }

        buff[0] = self.kind as u8;
        buff[1] = self.user_id;
        LittleEndian::write_i16(&mut buff[2..4], self.x);
        LittleEndian::write_i16(&mut buff[4..6], self.y);
        LittleEndian::write_u16(&mut buff[6..8], self.width);
        LittleEndian::write_u16(&mut buff[8..10], self.height);
        buff[10] = self.stroke;
        buff[11] = self.radius;
        buff[12] = self.fill;
        LittleEndian::write_u32(&mut buff[13..17], self.fgcolor);
        LittleEndian::write_u32(&mut buff[17..21], self.bgcolor);
        LittleEndian::write_u16(&mut buff[21..23], self.font_id);
        buff[23] = self.icon_id;

        Ok(Self::LEN)
    }
}

impl DecodeOwned for Component {
    type Output = Self;

    type Error = ProtoError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        if buff.len() < Self::LEN {
            return Err(ProtoError::InvalidLength);
        }

        let kind = ComponentType::try_from(buff[0] & !TYPE_FLAGS_MASK)
            .map_err(|_| ProtoError::InvalidEncoding)?;

        let c = Self {
            kind,
            user_id: buff[1],
            x: LittleEndian::read_i16(&buff[2..4]),
            y: LittleEndian::read_i16(&buff[4..6]),
            width: LittleEndian::read_u16(&buff[6..8]),
            height: LittleEndian::read_u16(&buff[8..10]),
            stroke: buff[10],
            radius: buff[11],
            fill: buff[12],
            fgcolor: LittleEndian::read_u32(&buff[13..17]),
            bgcolor: LittleEndian::read_u32(&buff[17..21]),
            font_id: LittleEndian::read_u16(&buff[21..23]),
            icon_id: buff[23],
        };

        Ok((c, Self::LEN))
    }
}

/// Bitmap header carried by raw status and custom icons
#[derive(Clone, PartialEq, Debug)]
pub struct RawBitmap {
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
    pub bpp: u8,
    pub colors: Vec<u32>,
}

/// `SCREEN_DISPLAY_RAW_STATUS` payload
#[derive(Clone, PartialEq, Debug)]
pub enum RawStatus {
    /// Start a new bitmap (prefix `0x00`)
    Start { header: RawBitmap, bitmap: Vec<u8> },
    /// Continue the current bitmap (prefix `0x01`)
    Continue { bitmap: Vec<u8> },
}

/// Read `count` colors of 4 bytes each using the provided reader
fn read_colors(buff: &[u8], bpp: u8, read: fn(&[u8]) -> u32) -> Result<(Vec<u32>, usize), ProtoError> {
    if bpp > 8 {
        return Err(ProtoError::InvalidEncoding);
    }

    let count = 1usize << bpp;
    if buff.len() < count * 4 {
        return Err(ProtoError::InvalidLength);
    }

    let colors = buff[..count * 4].chunks_exact(4).map(read).collect();
    Ok((colors, count * 4))
}

impl DecodeOwned for RawStatus {
    type Output = Self;

    type Error = ProtoError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        match buff.first() {
            Some(0x00) => {
                if buff.len() < 10 {
                    return Err(ProtoError::InvalidLength);
                }

                let bpp = buff[9];
                let (colors, n) = read_colors(&buff[10..], bpp, BigEndian::read_u32)?;

                let header = RawBitmap {
                    x: BigEndian::read_i16(&buff[1..3]),
                    y: BigEndian::read_i16(&buff[3..5]),
                    width: BigEndian::read_u16(&buff[5..7]),
                    height: BigEndian::read_u16(&buff[7..9]),
                    bpp,
                    colors,
                };

                let bitmap = buff[10 + n..].to_vec();
                Ok((RawStatus::Start { header, bitmap }, buff.len()))
            }
            Some(0x01) => Ok((
                RawStatus::Continue {
                    bitmap: buff[1..].to_vec(),
                },
                buff.len(),
            )),
            Some(_) => Err(ProtoError::InvalidEncoding),
            None => Err(ProtoError::InvalidLength),
        }
    }
}

impl Encode for RawStatus {
    type Error = ProtoError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        match self {
            RawStatus::Start { header, bitmap } => Ok(10 + header.colors.len() * 4 + bitmap.len()),
            RawStatus::Continue { bitmap } => Ok(1 + bitmap.len()),
        }
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        let len = self.encode_len()?;
        if buff.len() < len {
            return Err(ProtoError::InvalidLength);
        }

        let bitmap = match self {
            RawStatus::Start { header, bitmap } => {
                buff[0] = 0x00;
                BigEndian::write_i16(&mut buff[1..3], header.x);
                BigEndian::write_i16(&mut buff[3..5], header.y);
                BigEndian::write_u16(&mut buff[5..7], header.width);
                BigEndian::write_u16(&mut buff[7..9], header.height);
                buff[9] = header.bpp;
                for (i, c) in header.colors.iter().enumerate() {
                    BigEndian::write_u32(&mut buff[10 + i * 4..][..4], *c);
                }
                bitmap
            }
            RawStatus::Continue { bitmap } => {
                buff[0] = 0x01;
                bitmap
            }
        };

        buff[len - bitmap.len()..len].copy_from_slice(bitmap);

        Ok(len)
    }
}

/// Custom icon context (`icon_id == 0`)
#[derive(Clone, PartialEq, Debug)]
pub struct CustomIcon {
    pub bpp: u8,
    pub colors: Vec<u32>,
    pub bitmap: Vec<u8>,
}

impl DecodeOwned for CustomIcon {
    type Output = Self;

    type Error = ProtoError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        let bpp = *buff.first().ok_or(ProtoError::InvalidLength)?;
        let (colors, n) = read_colors(&buff[1..], bpp, LittleEndian::read_u32)?;

        let icon = Self {
            bpp,
            colors,
            bitmap: buff[1 + n..].to_vec(),
        };

        Ok((icon, buff.len()))
    }
}

/// Extract label text from a component context, stopping at the first NUL
pub fn context_text(ctx: &[u8]) -> String {
    let end = ctx.iter().position(|b| *b == 0).unwrap_or(ctx.len());
    String::from_utf8_lossy(&ctx[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::encode_decode;

    #[test]
    fn component_layout() {
        let c = Component {
            kind: ComponentType::Labeline,
            x: 0x0102,
            y: -1,
            width: 128,
            height: 12,
            fgcolor: 0xffffff,
            font_id: FONT_ALIGN_CENTER | 0x000a,
            ..Default::default()
        };

        let mut buff = [0u8; 24];
        encode_decode(&mut buff, &c);

        assert_eq!(&buff[..6], &[0x07, 0x00, 0x02, 0x01, 0xff, 0xff]);
        assert_eq!(&buff[13..17], &[0xff, 0xff, 0xff, 0x00]);
        assert_eq!(c.halign(), FONT_ALIGN_CENTER);
        assert_eq!(c.font(), 0x0a);
    }

    #[test]
    fn touchable_flag_masked() {
        let mut buff = [0u8; 24];
        buff[0] = 0x80 | ComponentType::Button as u8;
        let (c, _) = Component::decode_owned(&buff).unwrap();
        assert_eq!(c.kind, ComponentType::Button);
    }

    #[test]
    fn raw_status_start() {
        let b = [
            0x00, 0x00, 0x02, 0x00, 0x03, 0x00, 0x08, 0x00, 0x01, 0x01, // header
            0x00, 0x00, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff, // colors
            0xa5, // bitmap
        ];

        let (s, _) = RawStatus::decode_owned(&b).unwrap();
        assert_eq!(
            s,
            RawStatus::Start {
                header: RawBitmap {
                    x: 2,
                    y: 3,
                    width: 8,
                    height: 1,
                    bpp: 1,
                    colors: vec![0x000000, 0xffffff],
                },
                bitmap: vec![0xa5],
            }
        );

        let mut buff = [0u8; 32];
        assert_eq!(s.encode(&mut buff).unwrap(), b.len());
        assert_eq!(&buff[..b.len()], &b);
    }

    #[test]
    fn context_text_nul() {
        assert_eq!(context_text(b"Hi\0junk"), "Hi");
        assert_eq!(context_text(b"Hi"), "Hi");
    }
}
