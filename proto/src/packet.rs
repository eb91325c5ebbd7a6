// Copyright (c) 2022-2023 The MobileCoin Foundation

//! SEPH packet framing

use byteorder::{BigEndian, ByteOrder};
use encdec::{DecodeOwned, Encode};

use crate::{ProtoError, SephTag};

/// Maximum payload length representable by the 16-bit length prefix
pub const MAX_PAYLOAD: usize = u16::MAX as usize;

/// SEPH packet header
///
/// ## Encoding
///
/// ```text
///  0                   1                   2
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |      TAG      |          LENGTH (BE)          |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct PacketHeader {
    /// Packet tag
    pub tag: SephTag,
    /// Payload length in bytes
    pub len: u16,
}

impl PacketHeader {
    /// Encoded header length
    pub const LEN: usize = 3;
}

impl Encode for PacketHeader {
    type Error = ProtoError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(Self::LEN)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        if buff.len() < Self::LEN {
            return Err(ProtoError::InvalidLength);
        }

        buff[0] = self.tag as u8;
        BigEndian::write_u16(&mut buff[1..3], self.len);

        Ok(Self::LEN)
    }
}

impl DecodeOwned for PacketHeader {
    type Output = Self;

    type Error = ProtoError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        if buff.len() < Self::LEN {
            return Err(ProtoError::InvalidLength);
        }

        let tag = SephTag::try_from(buff[0]).map_err(|_| ProtoError::UnknownTag(buff[0]))?;
        let len = BigEndian::read_u16(&buff[1..3]);

        Ok((Self { tag, len }, Self::LEN))
    }
}

/// SEPH packet, a tagged and length-prefixed payload
#[derive(Clone, PartialEq, Debug)]
pub struct Packet {
    /// Packet tag
    pub tag: SephTag,
    /// Packet payload
    pub payload: Vec<u8>,
}

impl Packet {
    /// Create a new packet, checking the payload fits the length prefix
    pub fn new(tag: SephTag, payload: impl Into<Vec<u8>>) -> Result<Self, ProtoError> {
        let payload = payload.into();
        if payload.len() > MAX_PAYLOAD {
            return Err(ProtoError::PayloadTooLarge(payload.len()));
        }
        Ok(Self { tag, payload })
    }

    /// Create a packet with an empty payload
    pub fn empty(tag: SephTag) -> Self {
        Self {
            tag,
            payload: vec![],
        }
    }

    /// Fetch the header for this packet
    pub fn header(&self) -> PacketHeader {
        PacketHeader {
            tag: self.tag,
            len: self.payload.len() as u16,
        }
    }

    /// Encode the packet into a freshly allocated buffer
    pub fn to_vec(&self) -> Result<Vec<u8>, ProtoError> {
        let mut buff = vec![0u8; self.encode_len()?];
        let n = self.encode(&mut buff)?;
        buff.truncate(n);
        Ok(buff)
    }
}

impl Encode for Packet {
    type Error = ProtoError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        if self.payload.len() > MAX_PAYLOAD {
            return Err(ProtoError::PayloadTooLarge(self.payload.len()));
        }
        Ok(PacketHeader::LEN + self.payload.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        let len = self.encode_len()?;
        if buff.len() < len {
            return Err(ProtoError::InvalidLength);
        }

        let mut index = self.header().encode(buff)?;
        buff[index..][..self.payload.len()].copy_from_slice(&self.payload);
        index += self.payload.len();

        Ok(index)
    }
}

impl DecodeOwned for Packet {
    type Output = Self;

    type Error = ProtoError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        let (hdr, mut index) = PacketHeader::decode_owned(buff)?;

        let len = hdr.len as usize;
        if buff.len() < index + len {
            return Err(ProtoError::InvalidLength);
        }

        let payload = buff[index..][..len].to_vec();
        index += len;

        Ok((
            Self {
                tag: hdr.tag,
                payload,
            },
            index,
        ))
    }
}
