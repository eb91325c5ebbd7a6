// Copyright (c) 2022-2023 The MobileCoin Foundation

//! APDU chunk headers shared by the HID and NFC transports
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |        CHANNEL (BE)           |    COMMAND    |  SEQ (BE) ... |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |  ... SEQ      |     LENGTH (BE, seq 0 only)   |   DATA...     |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```

use byteorder::{BigEndian, ByteOrder};
use encdec::{DecodeOwned, Encode};

use crate::ProtoError;

/// Chunk command byte for APDU data
pub const CHUNK_COMMAND_APDU: u8 = 0x05;

/// HID logical channel
pub const HID_CHANNEL: u16 = 0x0101;
/// NFC logical channel
pub const NFC_CHANNEL: u16 = 0x0000;

/// HID frame size (one USB packet)
pub const HID_MTU: usize = 64;
/// NFC frame size
pub const NFC_MTU: usize = 140;

/// Chunk header
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct ChunkHeader {
    pub channel: u16,
    pub command: u8,
    pub seq: u16,
    /// Total APDU length, present on the first chunk only
    pub length: Option<u16>,
}

impl ChunkHeader {
    /// Create a header for APDU chunk `seq`, `length` is only kept for `seq == 0`
    pub fn new(channel: u16, seq: u16, length: u16) -> Self {
        Self {
            channel,
            command: CHUNK_COMMAND_APDU,
            seq,
            length: (seq == 0).then_some(length),
        }
    }
}

impl Encode for ChunkHeader {
    type Error = ProtoError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        match self.length {
            Some(_) => Ok(7),
            None => Ok(5),
        }
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        let len = self.encode_len()?;
        if buff.len() < len {
            return Err(ProtoError::InvalidLength);
        }

        BigEndian::write_u16(&mut buff[0..2], self.channel);
        buff[2] = self.command;
        BigEndian::write_u16(&mut buff[3..5], self.seq);
        if let Some(l) = self.length {
            BigEndian::write_u16(&mut buff[5..7], l);
        }

        Ok(len)
    }
}

impl DecodeOwned for ChunkHeader {
    type Output = Self;

    type Error = ProtoError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        if buff.len() < 5 {
            return Err(ProtoError::InvalidLength);
        }

        let seq = BigEndian::read_u16(&buff[3..5]);

        let (length, n) = match seq {
            0 if buff.len() >= 7 => (Some(BigEndian::read_u16(&buff[5..7])), 7),
            0 => return Err(ProtoError::InvalidLength),
            _ => (None, 5),
        };

        let h = Self {
            channel: BigEndian::read_u16(&buff[0..2]),
            command: buff[2],
            seq,
            length,
        };

        Ok((h, n))
    }
}

/// Split an APDU into `mtu` sized chunks, optionally zero-padding each
/// chunk to the full `mtu`
pub fn split(channel: u16, mtu: usize, pad: bool, apdu: &[u8]) -> Result<Vec<Vec<u8>>, ProtoError> {
    if apdu.len() > u16::MAX as usize {
        return Err(ProtoError::PayloadTooLarge(apdu.len()));
    }

    let mut chunks = vec![];
    let mut offset = 0;
    let mut seq = 0u16;

    loop {
        let hdr = ChunkHeader::new(channel, seq, apdu.len() as u16);
        let hdr_len = hdr.encode_len()?;

        let n = (apdu.len() - offset).min(mtu - hdr_len);

        let mut c = vec![0u8; hdr_len + n];
        hdr.encode(&mut c)?;
        c[hdr_len..].copy_from_slice(&apdu[offset..][..n]);
        if pad {
            c.resize(mtu, 0);
        }

        chunks.push(c);
        offset += n;
        seq = seq.wrapping_add(1);

        if offset >= apdu.len() {
            break;
        }
    }

    Ok(chunks)
}
