// Copyright (c) 2022-2023 The MobileCoin Foundation

/// SEPH wire encoding / decoding errors
#[derive(Copy, Clone, PartialEq, Debug, thiserror::Error)]
pub enum ProtoError {
    /// Buffer too short for the object being encoded / decoded
    #[error("Invalid length")]
    InvalidLength,

    /// Field value outside of the allowed encoding
    #[error("Invalid encoding")]
    InvalidEncoding,

    /// Tag byte does not match any known SEPH tag
    #[error("Unknown SEPH tag 0x{0:02x}")]
    UnknownTag(u8),

    /// Payload exceeds the 16-bit length prefix
    #[error("Payload too large ({0} bytes)")]
    PayloadTooLarge(usize),
}

impl From<encdec::Error> for ProtoError {
    fn from(_: encdec::Error) -> Self {
        ProtoError::InvalidLength
    }
}
