// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::collections::VecDeque;

use speculos_mcu_proto::{
    chunk::{split, NFC_CHANNEL, NFC_MTU},
    Packet, SephTag,
};

use super::{Reassembler, Transport};
use crate::Error;

/// NFC transport, APDUs travel as chunked `CAPDU_EVENT` packets
/// and responses as chunked `RAPDU` packets
#[derive(Debug)]
pub struct Nfc {
    rx: Reassembler,
    outbox: VecDeque<Packet>,
}

impl Default for Nfc {
    fn default() -> Self {
        Self {
            rx: Reassembler::new(NFC_CHANNEL),
            outbox: VecDeque::new(),
        }
    }
}

impl Transport for Nfc {
    fn config(&mut self, _data: &[u8]) -> Result<(), Error> {
        Ok(())
    }

    fn prepare(&mut self, _data: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        Ok(None)
    }

    fn send(&mut self, apdu: &[u8]) -> Result<(), Error> {
        for c in split(NFC_CHANNEL, NFC_MTU, false, apdu)? {
            self.outbox.push_back(Packet::new(SephTag::CapduEvent, c)?);
        }
        Ok(())
    }

    fn handle_rapdu(&mut self, data: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        self.rx.push(data)
    }

    fn poll(&mut self) -> Option<Packet> {
        self.outbox.pop_front()
    }
}
