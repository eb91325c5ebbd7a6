// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Speculos MCU bridge
//!
//! Async runtime for the SeProxyHal bridge: packet framing over the firmware
//! stream, a handshake-gated [Scheduler][scheduler::Scheduler], a periodic
//! [Ticker][ticker::Ticker], and the [Bridge] handle exposing APDU exchange,
//! button and finger input, automation and screenshots to host-side
//! services such as the TCP side channels in [server] and the [vnc] link.

pub use speculos_mcu_core::{proto, Graphics, Model, Origin, TextEvent, TransportKind};

pub mod codec;
pub mod scheduler;
pub mod server;
pub mod ticker;
pub mod vnc;

mod bridge;
pub use bridge::{ApduCallback, Bridge, Button};

mod error;
pub use error::Error;

mod options;
pub use options::Options;
