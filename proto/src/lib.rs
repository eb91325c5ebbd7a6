// Copyright (c) 2022-2023 The MobileCoin Foundation

//! SeProxyHal (SEPH) wire definitions
//!
//! This crate describes the packets exchanged between the emulated secure
//! element firmware and its MCU counterpart, along with the payload layouts
//! carried inside them (USB transfers, HID / NFC chunking, BAGL components
//! and NBGL draw commands).
//!
//! Every SEPH packet uses the same framing:
//!
//! ```text
//!  0                   1                   2
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |      TAG      |         LENGTH (BE)           |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! /                  PAYLOAD...                   /
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Encodings follow the firmware conventions: the SEPH header, USB and
//! chunk headers are big-endian, BAGL components and NBGL areas are packed
//! little-endian C structures.

pub mod bagl;
pub mod chunk;
pub mod event;
pub mod nbgl;
pub mod packet;
pub mod tag;
pub mod usb;

mod error;
pub use error::ProtoError;

pub use packet::{Packet, PacketHeader, MAX_PAYLOAD};
pub use tag::{SephTag, GENERAL_STATUS_LAST_COMMAND};

/// Helper to split a trailing stamped codepoint off a draw payload
///
/// Recent firmwares append the intended unicode character (as a little-endian
/// `u32`) after the image data so the host does not have to recognise glyphs.
pub(crate) fn stamped_char(rest: &[u8]) -> Option<char> {
    if rest.len() < 4 {
        return None;
    }

    let v = u32::from_le_bytes([rest[0], rest[1], rest[2], rest[3]]);
    char::from_u32(v)
}
