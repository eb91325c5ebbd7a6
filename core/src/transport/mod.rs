// Copyright (c) 2022-2023 The MobileCoin Foundation

//! APDU transports between the host and the emulated firmware
//!
//! Transports turn host APDUs into SEPH packets for the firmware (collected
//! via [`Transport::poll`]) and reassemble responses from the USB endpoint
//! preparations or `RAPDU` packets the firmware emits.

use strum::{Display, EnumString, EnumVariantNames};

use speculos_mcu_proto::Packet;

use crate::Error;

mod reassembler;
pub use reassembler::Reassembler;

mod usb;
pub use usb::{Hid, U2f, Usb, UsbFraming, UsbState};

mod nfc;
pub use nfc::Nfc;

/// Transport operations, driven by the engine
pub trait Transport {
    /// Handle a `USB_CONFIG` payload
    fn config(&mut self, data: &[u8]) -> Result<(), Error>;

    /// Handle a `USB_EP_PREPARE` payload, returning a completed response APDU
    fn prepare(&mut self, data: &[u8]) -> Result<Option<Vec<u8>>, Error>;

    /// Queue an APDU for delivery to the firmware
    fn send(&mut self, apdu: &[u8]) -> Result<(), Error>;

    /// Handle a `RAPDU` payload, returning a completed response APDU
    fn handle_rapdu(&mut self, data: &[u8]) -> Result<Option<Vec<u8>>, Error>;

    /// Fetch the next packet ready for the firmware
    fn poll(&mut self) -> Option<Packet>;
}

/// Transport selection
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Display, EnumString, EnumVariantNames)]
#[strum(serialize_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Hid,
    U2f,
    Nfc,
}

/// Generic transport (abstract over transport types)
#[derive(Debug, Display)]
pub enum GenericTransport {
    Hid(Usb<Hid>),
    U2f(Usb<U2f>),
    Nfc(Nfc),
}

impl GenericTransport {
    /// Create a transport of the provided kind
    pub fn new(kind: TransportKind) -> Self {
        match kind {
            TransportKind::Hid => Self::Hid(Usb::default()),
            TransportKind::U2f => Self::U2f(Usb::default()),
            TransportKind::Nfc => Self::Nfc(Nfc::default()),
        }
    }

    fn inner(&mut self) -> &mut dyn Transport {
        match self {
            Self::Hid(t) => t,
            Self::U2f(t) => t,
            Self::Nfc(t) => t,
        }
    }
}

impl From<Usb<Hid>> for GenericTransport {
    fn from(t: Usb<Hid>) -> Self {
        Self::Hid(t)
    }
}

impl From<Usb<U2f>> for GenericTransport {
    fn from(t: Usb<U2f>) -> Self {
        Self::U2f(t)
    }
}

impl From<Nfc> for GenericTransport {
    fn from(t: Nfc) -> Self {
        Self::Nfc(t)
    }
}

impl Transport for GenericTransport {
    fn config(&mut self, data: &[u8]) -> Result<(), Error> {
        self.inner().config(data)
    }

    fn prepare(&mut self, data: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        self.inner().prepare(data)
    }

    fn send(&mut self, apdu: &[u8]) -> Result<(), Error> {
        self.inner().send(apdu)
    }

    fn handle_rapdu(&mut self, data: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        self.inner().handle_rapdu(data)
    }

    fn poll(&mut self) -> Option<Packet> {
        self.inner().poll()
    }
}
