// Copyright (c) 2022-2023 The MobileCoin Foundation

//! USB payloads carried by `USB_CONFIG`, `USB_EP_PREPARE` and
//! `USB_EP_XFER_EVENT` packets

use encdec::{DecodeOwned, Encode};
use num_enum::TryFromPrimitive;
use strum::Display;

use crate::ProtoError;

/// Maximum endpoint buffer size
pub const EP_MAX_LEN: usize = 64;

/// HID IN endpoint (device → host)
pub const HID_EP_IN: u8 = 0x82;
/// HID OUT endpoint (host → device)
pub const HID_EP_OUT: u8 = 0x02;
/// U2F IN endpoint
pub const U2F_EP_IN: u8 = 0x81;
/// U2F OUT endpoint
pub const U2F_EP_OUT: u8 = 0x01;

/// `SET_ADDRESS` standard request
pub const USB_REQ_SET_ADDRESS: u8 = 0x05;
/// `SET_CONFIGURATION` standard request
pub const USB_REQ_SET_CONFIGURATION: u8 = 0x09;

/// Build an 8-byte setup packet for a standard request with `wValue = 1`
pub fn setup_request(request: u8) -> [u8; 8] {
    [0x00, request, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00]
}

/// `USB_CONFIG` subtags
#[derive(Copy, Clone, PartialEq, Debug, Display, TryFromPrimitive)]
#[repr(u8)]
pub enum ConfigKind {
    Connect = 0x01,
    Disconnect = 0x02,
    Addr = 0x03,
    Endpoints = 0x04,
}

/// Endpoint descriptor listed by `USB_CONFIG/ENDPOINTS`
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Endpoint {
    pub ep: u8,
    pub kind: u8,
    pub max_len: u8,
}

/// Decoded `USB_CONFIG` payload
#[derive(Clone, PartialEq, Debug)]
pub enum UsbConfig {
    Connect,
    Disconnect,
    Addr,
    Endpoints(Vec<Endpoint>),
}

impl UsbConfig {
    /// Fetch the subtag for this configuration message
    pub fn kind(&self) -> ConfigKind {
        match self {
            UsbConfig::Connect => ConfigKind::Connect,
            UsbConfig::Disconnect => ConfigKind::Disconnect,
            UsbConfig::Addr => ConfigKind::Addr,
            UsbConfig::Endpoints(_) => ConfigKind::Endpoints,
        }
    }
}

impl Encode for UsbConfig {
    type Error = ProtoError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        match self {
            UsbConfig::Endpoints(eps) => Ok(2 + eps.len() * 3),
            _ => Ok(1),
        }
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        let len = self.encode_len()?;
        if buff.len() < len {
            return Err(ProtoError::InvalidLength);
        }

        buff[0] = self.kind() as u8;

        if let UsbConfig::Endpoints(eps) = self {
            buff[1] = eps.len() as u8;
            for (i, e) in eps.iter().enumerate() {
                buff[2 + i * 3..][..3].copy_from_slice(&[e.ep, e.kind, e.max_len]);
            }
        }

        Ok(len)
    }
}

impl DecodeOwned for UsbConfig {
    type Output = Self;

    type Error = ProtoError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        if buff.is_empty() {
            return Err(ProtoError::InvalidLength);
        }

        let kind = ConfigKind::try_from(buff[0]).map_err(|_| ProtoError::InvalidEncoding)?;

        let c = match kind {
            ConfigKind::Connect => (UsbConfig::Connect, 1),
            ConfigKind::Disconnect => (UsbConfig::Disconnect, 1),
            ConfigKind::Addr => (UsbConfig::Addr, 1),
            ConfigKind::Endpoints => {
                let count = *buff.get(1).ok_or(ProtoError::InvalidLength)? as usize;
                let end = 2 + count * 3;
                if buff.len() < end {
                    return Err(ProtoError::InvalidLength);
                }

                let eps = buff[2..end]
                    .chunks_exact(3)
                    .map(|c| Endpoint {
                        ep: c[0],
                        kind: c[1],
                        max_len: c[2],
                    })
                    .collect();

                (UsbConfig::Endpoints(eps), end)
            }
        };

        Ok(c)
    }
}

/// Transfer kinds reported in `USB_EP_XFER_EVENT`
#[derive(Copy, Clone, PartialEq, Debug, Display, TryFromPrimitive)]
#[repr(u8)]
pub enum XferKind {
    Setup = 0x01,
    In = 0x02,
    Out = 0x04,
}

/// `USB_EP_XFER_EVENT` payload
///
/// ```text
/// +-------+-------+-------+-----------------+
/// |  EP   | XFER  |  LEN  |  DATA[LEN]...   |
/// +-------+-------+-------+-----------------+
/// ```
#[derive(Clone, PartialEq, Debug)]
pub struct XferEvent {
    pub ep: u8,
    pub kind: XferKind,
    pub data: Vec<u8>,
}

impl XferEvent {
    /// Create a new transfer event
    pub fn new(ep: u8, kind: XferKind, data: impl Into<Vec<u8>>) -> Self {
        Self {
            ep,
            kind,
            data: data.into(),
        }
    }

    /// Encode into an owned payload
    pub fn to_vec(&self) -> Result<Vec<u8>, ProtoError> {
        let mut buff = vec![0u8; self.encode_len()?];
        self.encode(&mut buff)?;
        Ok(buff)
    }
}

impl Encode for XferEvent {
    type Error = ProtoError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        if self.data.len() > u8::MAX as usize {
            return Err(ProtoError::PayloadTooLarge(self.data.len()));
        }
        Ok(3 + self.data.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        let len = self.encode_len()?;
        if buff.len() < len {
            return Err(ProtoError::InvalidLength);
        }

        buff[0] = self.ep;
        buff[1] = self.kind as u8;
        buff[2] = self.data.len() as u8;
        buff[3..][..self.data.len()].copy_from_slice(&self.data);

        Ok(len)
    }
}

impl DecodeOwned for XferEvent {
    type Output = Self;

    type Error = ProtoError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        if buff.len() < 3 {
            return Err(ProtoError::InvalidLength);
        }

        let kind = XferKind::try_from(buff[1]).map_err(|_| ProtoError::InvalidEncoding)?;
        let len = buff[2] as usize;
        if buff.len() < 3 + len {
            return Err(ProtoError::InvalidLength);
        }

        let ev = Self {
            ep: buff[0],
            kind,
            data: buff[3..][..len].to_vec(),
        };

        Ok((ev, 3 + len))
    }
}

/// Endpoint preparation directions for `USB_EP_PREPARE`
#[derive(Copy, Clone, PartialEq, Debug, Display, TryFromPrimitive)]
#[repr(u8)]
pub enum PrepareDir {
    Setup = 0x10,
    In = 0x20,
    Out = 0x30,
    Stall = 0x40,
    Unstall = 0x80,
}

/// `USB_EP_PREPARE` payload, same layout as [`XferEvent`]
#[derive(Clone, PartialEq, Debug)]
pub struct EpPrepare {
    pub ep: u8,
    pub dir: PrepareDir,
    pub data: Vec<u8>,
}

impl Encode for EpPrepare {
    type Error = ProtoError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        if self.data.len() > EP_MAX_LEN {
            return Err(ProtoError::PayloadTooLarge(self.data.len()));
        }
        Ok(3 + self.data.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Self::Error> {
        let len = self.encode_len()?;
        if buff.len() < len {
            return Err(ProtoError::InvalidLength);
        }

        buff[0] = self.ep;
        buff[1] = self.dir as u8;
        buff[2] = self.data.len() as u8;
        buff[3..][..self.data.len()].copy_from_slice(&self.data);

        Ok(len)
    }
}

impl DecodeOwned for EpPrepare {
    type Output = Self;

    type Error = ProtoError;

    /// Decode a prepare request, the declared length must match the
    /// remaining data and fit the endpoint buffer
    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Self::Error> {
        if buff.len() < 3 {
            return Err(ProtoError::InvalidLength);
        }

        let dir = PrepareDir::try_from(buff[1]).map_err(|_| ProtoError::InvalidEncoding)?;
        let len = buff[2] as usize;
        if len > EP_MAX_LEN {
            return Err(ProtoError::PayloadTooLarge(len));
        }
        if buff.len() != 3 + len {
            return Err(ProtoError::InvalidLength);
        }

        let p = Self {
            ep: buff[0],
            dir,
            data: buff[3..].to_vec(),
        };

        Ok((p, 3 + len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::encode_decode;

    #[test]
    fn endpoints_config() {
        let (c, n) = UsbConfig::decode_owned(&[0x04, 0x02, 0x82, 0x03, 0x40, 0x02, 0x03, 0x40])
            .unwrap();
        assert_eq!(n, 8);
        assert_eq!(
            c,
            UsbConfig::Endpoints(vec![
                Endpoint {
                    ep: HID_EP_IN,
                    kind: 3,
                    max_len: 64
                },
                Endpoint {
                    ep: HID_EP_OUT,
                    kind: 3,
                    max_len: 64
                },
            ])
        );

        let mut buff = [0u8; 16];
        encode_decode(&mut buff, &c);
    }

    #[test]
    fn setup_packets() {
        let ev = XferEvent::new(0, XferKind::Setup, setup_request(USB_REQ_SET_ADDRESS));
        assert_eq!(
            ev.to_vec().unwrap(),
            vec![0x00, 0x01, 0x08, 0x00, 0x05, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn prepare_overflow() {
        let mut b = vec![HID_EP_IN, PrepareDir::In as u8, 65];
        b.extend_from_slice(&[0u8; 65]);
        assert_eq!(
            EpPrepare::decode_owned(&b),
            Err(ProtoError::PayloadTooLarge(65))
        );
    }

    #[test]
    fn prepare_length_mismatch() {
        let b = [HID_EP_IN, PrepareDir::In as u8, 4, 0x01, 0x02];
        assert_eq!(EpPrepare::decode_owned(&b), Err(ProtoError::InvalidLength));
    }
}
