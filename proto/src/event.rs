// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Outbound event payloads

use byteorder::{BigEndian, ByteOrder};
use num_enum::TryFromPrimitive;
use strum::Display;

use crate::{Packet, SephTag};

/// Finger event kinds
#[derive(Copy, Clone, PartialEq, Debug, Display, TryFromPrimitive)]
#[repr(u8)]
pub enum FingerKind {
    Touch = 0x01,
    Release = 0x02,
}

/// Build a `BUTTON_PUSH_EVENT` for the provided pressed-button mask
pub fn button_push(mask: u8) -> Packet {
    Packet {
        tag: SephTag::ButtonPushEvent,
        payload: vec![mask << 1],
    }
}

/// Build a `FINGER_EVENT` at `(x, y)`
pub fn finger(x: u16, y: u16, pressed: bool) -> Packet {
    let kind = match pressed {
        true => FingerKind::Touch,
        false => FingerKind::Release,
    };

    let mut payload = vec![kind as u8, 0, 0, 0, 0];
    BigEndian::write_u16(&mut payload[1..3], x);
    BigEndian::write_u16(&mut payload[3..5], y);

    Packet {
        tag: SephTag::FingerEvent,
        payload,
    }
}

/// Build a zero-length `DISPLAY_PROCESSED_EVENT`
pub fn display_processed() -> Packet {
    Packet::empty(SephTag::DisplayProcessedEvent)
}

/// Build a zero-length `TICKER_EVENT`
pub fn ticker() -> Packet {
    Packet::empty(SephTag::TickerEvent)
}
