// Copyright (c) 2022-2023 The MobileCoin Foundation

use speculos_mcu_proto::{ProtoError, SephTag};

/// [Engine][super::Engine] errors
///
/// With the exception of automation document errors (reported to API
/// callers) these are protocol faults which terminate the bridge.
#[derive(Clone, PartialEq, Debug, thiserror::Error)]
pub enum Error {
    /// Wire decoding failed
    #[error("protocol decode error: {0}")]
    Proto(#[from] ProtoError),

    /// Tag not valid in this direction or for the configured graphics
    #[error("unexpected tag {0}")]
    UnexpectedTag(SephTag),

    /// `GENERAL_STATUS` with an unknown subtag
    #[error("unexpected general status 0x{0:04x}")]
    UnexpectedStatus(u16),

    /// NBGL area not aligned to 4 rows
    #[error("nbgl area misaligned (y0: {y0}, h: {h})")]
    NbglMisaligned { y0: u16, h: u16 },

    /// NBGL area outside of the screen
    #[error("nbgl area out of screen")]
    NbglOutOfScreen,

    /// Chunk sequence mismatch during reassembly
    #[error("sequence mismatch (expected: {expected}, actual: {actual})")]
    SequenceMismatch { expected: u16, actual: u16 },

    /// Chunk channel or command mismatch during reassembly
    #[error("unexpected chunk channel 0x{channel:04x} / command 0x{command:02x}")]
    ChannelMismatch { channel: u16, command: u8 },

    /// More data than an endpoint or message buffer can hold
    #[error("endpoint buffer overflow ({0} bytes)")]
    EndpointOverflow(usize),

    /// Invalid image payload
    #[error("invalid image: {0}")]
    InvalidImage(&'static str),

    /// Gzip decompression failed
    #[error("gzip error: {0}")]
    Gzip(String),

    /// Invalid automation document
    #[error("invalid automation: {0}")]
    Automation(String),

    /// `file:` automation reference received over the network
    #[error("file: automation references are not allowed here")]
    FileNotAllowed,
}
