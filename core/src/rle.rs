// Copyright (c) 2022-2023 The MobileCoin Foundation

//! NBGL run-length codecs
//!
//! Both codecs operate on unpacked pixel values (one `u8` per pixel).
//!
//! 4-bpp bytes take one of three forms:
//!
//! ```text
//! 11RRRRRR            R+1 white (0xF) pixels
//! 10RRVVVV [VVVV...]  R+3 single pixels, the first in the header byte,
//!                     the rest packed high nibble first in following bytes
//! 0RRRVVVV            R+1 pixels of value V
//! ```
//!
//! 1-bpp bytes are `ZZZZOOOO`, Z zero pixels followed by O one pixels.

use crate::Error;

/// White pixel value for 4-bpp images
pub const WHITE_4BPP: u8 = 0x0F;

const MAX_WHITE_RUN: usize = 64;
const MAX_RUN: usize = 8;
const MIN_SINGLES: usize = 3;
const MAX_SINGLES: usize = 6;
const MAX_RUN_1BPP: usize = 15;

/// Decode a 4-bpp RLE stream
pub fn decode_4bpp(data: &[u8]) -> Result<Vec<u8>, Error> {
    let mut out = Vec::with_capacity(data.len() * 2);
    let mut i = 0;

    while i < data.len() {
        let b = data[i];
        i += 1;

        match b >> 6 {
            0b11 => {
                let n = (b & 0x3F) as usize + 1;
                out.extend(std::iter::repeat(WHITE_4BPP).take(n));
            }
            0b10 => {
                let n = ((b >> 4) & 0x03) as usize + MIN_SINGLES;
                out.push(b & 0x0F);

                let rest = n - 1;
                let bytes = (rest + 1) / 2;
                if data.len() < i + bytes {
                    return Err(Error::InvalidImage("truncated rle singles"));
                }

                for k in 0..rest {
                    let v = data[i + k / 2];
                    out.push(match k % 2 {
                        0 => v >> 4,
                        _ => v & 0x0F,
                    });
                }
                i += bytes;
            }
            _ => {
                let n = ((b >> 4) & 0x07) as usize + 1;
                out.extend(std::iter::repeat(b & 0x0F).take(n));
            }
        }
    }

    Ok(out)
}

fn run_len(pixels: &[u8], max: usize) -> usize {
    let v = pixels[0];
    pixels.iter().take(max).take_while(|p| **p == v).count()
}

/// Encode 4-bpp pixels (values `0..=15`) to an RLE stream
pub fn encode_4bpp(pixels: &[u8]) -> Vec<u8> {
    let mut out = vec![];
    let mut i = 0;

    while i < pixels.len() {
        let v = pixels[i] & 0x0F;

        if v == WHITE_4BPP {
            let n = run_len(&pixels[i..], MAX_WHITE_RUN);
            out.push(0xC0 | (n - 1) as u8);
            i += n;
            continue;
        }

        let n = run_len(&pixels[i..], MAX_RUN);
        if n >= 2 {
            out.push(((n - 1) as u8) << 4 | v);
            i += n;
            continue;
        }

        // Count following pixels that would not start a run of their own
        let singles = (i..pixels.len())
            .take(MAX_SINGLES)
            .take_while(|j| pixels[*j] != WHITE_4BPP && run_len(&pixels[*j..], 2) == 1)
            .count();

        if singles >= MIN_SINGLES {
            out.push(0x80 | ((singles - MIN_SINGLES) as u8) << 4 | v);
            for pair in pixels[i + 1..i + singles].chunks(2) {
                let hi = pair[0] & 0x0F;
                let lo = pair.get(1).map(|p| p & 0x0F).unwrap_or(0);
                out.push(hi << 4 | lo);
            }
            i += singles;
        } else {
            out.push(v);
            i += 1;
        }
    }

    out
}

/// Decode a 1-bpp RLE stream
pub fn decode_1bpp(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * 8);

    for b in data {
        let zeros = (b >> 4) as usize;
        let ones = (b & 0x0F) as usize;
        out.extend(std::iter::repeat(0).take(zeros));
        out.extend(std::iter::repeat(1).take(ones));
    }

    out
}

/// Encode 1-bpp pixels (zero / non-zero) to an RLE stream
pub fn encode_1bpp(pixels: &[u8]) -> Vec<u8> {
    let mut out = vec![];
    let mut i = 0;

    while i < pixels.len() {
        let zeros = pixels[i..]
            .iter()
            .take(MAX_RUN_1BPP)
            .take_while(|p| **p == 0)
            .count();
        i += zeros;

        // A capped zero run followed by more zeros carries no ones
        let ones = match zeros == MAX_RUN_1BPP && pixels.get(i) == Some(&0) {
            true => 0,
            false => pixels[i..]
                .iter()
                .take(MAX_RUN_1BPP)
                .take_while(|p| **p != 0)
                .count(),
        };
        i += ones;

        out.push((zeros as u8) << 4 | ones as u8);
    }

    out
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn one_bpp_zeros_then_ones() {
        let px = decode_1bpp(&[0x3C]);

        assert_eq!(px.len(), 15);
        assert_eq!(&px[..3], &[0, 0, 0]);
        assert!(px[3..].iter().all(|p| *p == 1));

        assert_eq!(encode_1bpp(&px), vec![0x3C]);
    }

    #[test]
    fn one_bpp_long_runs() {
        let mut px = vec![0u8; 20];
        px.extend_from_slice(&[1; 17]);

        let enc = encode_1bpp(&px);
        assert_eq!(enc, vec![0xF0, 0x5F, 0x02]);
        assert_eq!(decode_1bpp(&enc), px);
    }

    #[test]
    fn four_bpp_forms() {
        // White run of 3
        assert_eq!(decode_4bpp(&[0xC2]).unwrap(), vec![0xF; 3]);

        // Run of 4 x 0x5
        assert_eq!(decode_4bpp(&[0x35]).unwrap(), vec![5; 4]);

        // 4 singles: 1 in the header, 2 3 4 packed (pad nibble ignored)
        assert_eq!(
            decode_4bpp(&[0x91, 0x23, 0x40]).unwrap(),
            vec![1, 2, 3, 4]
        );

        // Truncated singles
        assert!(decode_4bpp(&[0xB1, 0x23]).is_err());
    }

    #[test]
    fn four_bpp_encoder_preferences() {
        assert_eq!(encode_4bpp(&[0xF, 0xF]), vec![0xC1]);
        assert_eq!(encode_4bpp(&[2, 2, 2]), vec![0x22]);
        assert_eq!(encode_4bpp(&[1, 2, 3]), vec![0x81, 0x23]);
        assert_eq!(encode_4bpp(&[1, 2]), vec![0x01, 0x02]);
    }

    proptest! {
        #[test]
        fn four_bpp_round_trip(px in proptest::collection::vec(0u8..16, 0..512)) {
            let enc = encode_4bpp(&px);
            prop_assert_eq!(decode_4bpp(&enc).unwrap(), px);
        }

        #[test]
        fn one_bpp_round_trip(px in proptest::collection::vec(0u8..2, 0..512)) {
            let enc = encode_1bpp(&px);
            prop_assert_eq!(decode_1bpp(&enc), px);
        }
    }
}
