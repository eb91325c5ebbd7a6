// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Speculos MCU bridge core
//!
//! This provides the synchronous half of the MCU side of the SeProxyHal
//! protocol: an [Engine][engine::Engine] that consumes packets from the
//! emulated secure element and returns [Output][engine::Output]s describing
//! the replies, events, response APDUs, recognised text and screen updates
//! that result.
//!
//! ## Components
//!
//! - [transport] emulates the HID, U2F and NFC APDU transports, including
//!   the USB enumeration sequence and chunk reassembly
//! - [framebuffer] holds the device screen, committing draws on refresh
//! - [bagl] and [nbgl] render the two firmware graphics libraries
//! - [rle] provides the NBGL image run-length codecs
//! - [ocr] recovers on-screen text from stamped or drawn glyphs
//! - [automation] maps recognised text to input actions
//!
//! ## Handshake
//!
//! The firmware sends a burst of commands terminated by a `GENERAL_STATUS`.
//! Display statuses are answered with a `DISPLAY_PROCESSED_EVENT`
//! ([Output::Reply][engine::Output::Reply]), and once the `GENERAL_STATUS`
//! arrives ([Output::StatusReceived][engine::Output::StatusReceived]) one
//! queued event may be released to the firmware.

pub use speculos_mcu_proto::{self as proto};

pub mod automation;
pub mod bagl;
pub mod engine;
pub mod fonts;
pub mod framebuffer;
pub mod model;
pub mod nbgl;
pub mod ocr;
pub mod rle;
pub mod transport;

pub use automation::{Action, Automation, Origin};
pub use bagl::Bagl;
pub use engine::{Engine, Error, Output};
pub use framebuffer::{Framebuffer, Pixel};
pub use model::{Graphics, Model};
pub use nbgl::Nbgl;
pub use ocr::{Ocr, TextEvent};
pub use transport::TransportKind;
