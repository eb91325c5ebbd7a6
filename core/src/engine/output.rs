// Copyright (c) 2022-2023 The MobileCoin Foundation

use speculos_mcu_proto::Packet;

use crate::{automation::Action, framebuffer::Pixel, TextEvent};

/// [`Engine`][super::Engine] outputs, in the order they must be applied
#[derive(Clone, PartialEq, Debug)]
pub enum Output {
    /// Event to append to the outbound queue
    Event(Packet),

    /// Reply to the status just received, sent ahead of any queued event
    Reply(Packet),

    /// `GENERAL_STATUS` received, one queued event (or ticker) may be released
    StatusReceived,

    /// Response APDU from the firmware
    Apdu(Vec<u8>),

    /// Text recognised on screen
    Text(TextEvent),

    /// Input action requested by automation
    Action(Action),

    /// Pixels committed by a refresh
    Screen(Vec<Pixel>),

    /// Firmware powered off or automation requested exit
    Exit,
}
