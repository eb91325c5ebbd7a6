// Copyright (c) 2022-2023 The MobileCoin Foundation

use encdec::DecodeOwned;

use speculos_mcu_proto::chunk::{ChunkHeader, CHUNK_COMMAND_APDU};

use crate::Error;

/// Reassembles chunked APDUs (HID / NFC framing)
#[derive(Debug)]
pub struct Reassembler {
    channel: u16,
    seq: u16,
    length: usize,
    buff: Vec<u8>,
}

impl Reassembler {
    /// Create a reassembler for the provided logical channel
    pub fn new(channel: u16) -> Self {
        Self {
            channel,
            seq: 0,
            length: 0,
            buff: vec![],
        }
    }

    /// Push a chunk, returning the APDU once `length` bytes have been received
    ///
    /// A channel or sequence mismatch resets the reassembler.
    pub fn push(&mut self, frame: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        let (hdr, n) = ChunkHeader::decode_owned(frame)?;

        if hdr.channel != self.channel || hdr.command != CHUNK_COMMAND_APDU {
            self.reset();
            return Err(Error::ChannelMismatch {
                channel: hdr.channel,
                command: hdr.command,
            });
        }

        if hdr.seq != self.seq {
            let expected = self.seq;
            self.reset();
            return Err(Error::SequenceMismatch {
                expected,
                actual: hdr.seq,
            });
        }

        if let Some(l) = hdr.length {
            self.length = l as usize;
            self.buff.clear();
        }

        let take = (self.length - self.buff.len()).min(frame.len() - n);
        self.buff.extend_from_slice(&frame[n..][..take]);
        self.seq = self.seq.wrapping_add(1);

        if self.buff.len() < self.length {
            return Ok(None);
        }

        let apdu = std::mem::take(&mut self.buff);
        self.reset();

        Ok(Some(apdu))
    }

    fn reset(&mut self) {
        self.seq = 0;
        self.length = 0;
        self.buff.clear();
    }
}
