// Copyright (c) 2022-2023 The MobileCoin Foundation

use speculos_mcu_core::Error as EngineError;
use speculos_mcu_proto::ProtoError;

/// Bridge error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Firmware closed the SEPH stream
    #[error("firmware connection closed")]
    Eof,

    /// Handshake or framing violation
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// APDU exchange exceeded its tick budget
    #[error("timeout waiting for APDU response")]
    Timeout,

    /// Host-side peer disconnected
    #[error("peer disconnected")]
    PeerGone,

    /// Underlying I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Wire encoding error
    #[error("wire error: {0}")]
    Proto(#[from] ProtoError),

    /// Dispatcher error
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// Rejected API input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Screenshot encoding failed
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Bridge has shut down
    #[error("bridge closed")]
    Closed,
}

impl Error {
    /// Whether this error should terminate the bridge
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::Timeout | Error::PeerGone | Error::InvalidInput(_) | Error::Image(_)
        )
    }
}
