// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::collections::VecDeque;

use encdec::DecodeOwned;
use log::{debug, trace};
use strum::Display;

use speculos_mcu_proto::{
    chunk::{split, HID_CHANNEL, HID_MTU},
    usb::{
        setup_request, EpPrepare, PrepareDir, UsbConfig, XferEvent, XferKind, EP_MAX_LEN,
        HID_EP_IN, HID_EP_OUT, U2F_EP_IN, U2F_EP_OUT, USB_REQ_SET_ADDRESS,
        USB_REQ_SET_CONFIGURATION,
    },
    Packet, SephTag,
};

use super::{Reassembler, Transport};
use crate::Error;

/// USB device state
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display)]
pub enum UsbState {
    /// Powered, not yet connected
    Default,
    Disconnected,
    /// Address assigned
    Addressed,
    /// Configuration selected, endpoints may be used
    Configured,
}

/// Framing applied to APDUs carried over USB endpoints
pub trait UsbFraming: Default {
    /// Device → host endpoint
    const EP_IN: u8;
    /// Host → device endpoint
    const EP_OUT: u8;

    /// Split an APDU into endpoint-sized frames
    fn frames(&mut self, apdu: &[u8]) -> Result<Vec<Vec<u8>>, Error>;

    /// Receive a frame from the IN endpoint, returning a completed response
    fn receive(&mut self, frame: &[u8]) -> Result<Option<Vec<u8>>, Error>;
}

/// HID framing, chunked APDUs on channel `0x0101`
#[derive(Debug)]
pub struct Hid {
    rx: Reassembler,
}

impl Default for Hid {
    fn default() -> Self {
        Self {
            rx: Reassembler::new(HID_CHANNEL),
        }
    }
}

impl UsbFraming for Hid {
    const EP_IN: u8 = HID_EP_IN;
    const EP_OUT: u8 = HID_EP_OUT;

    fn frames(&mut self, apdu: &[u8]) -> Result<Vec<Vec<u8>>, Error> {
        Ok(split(HID_CHANNEL, HID_MTU, true, apdu)?)
    }

    fn receive(&mut self, frame: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        self.rx.push(frame)
    }
}

/// U2F framing, frames are passed through unwrapped
#[derive(Debug, Default)]
pub struct U2f;

impl UsbFraming for U2f {
    const EP_IN: u8 = U2F_EP_IN;
    const EP_OUT: u8 = U2F_EP_OUT;

    fn frames(&mut self, apdu: &[u8]) -> Result<Vec<Vec<u8>>, Error> {
        if apdu.is_empty() {
            return Ok(vec![vec![0u8; EP_MAX_LEN]]);
        }

        let frames = apdu
            .chunks(EP_MAX_LEN)
            .map(|c| {
                let mut f = c.to_vec();
                f.resize(EP_MAX_LEN, 0);
                f
            })
            .collect();

        Ok(frames)
    }

    fn receive(&mut self, frame: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        Ok(Some(frame.to_vec()))
    }
}

/// USB transport, tracking device state and buffering OUT transfers
/// until the device endpoints are configured
#[derive(Debug)]
pub struct Usb<F: UsbFraming> {
    state: UsbState,
    endpoints_ready: bool,
    framing: F,
    pending: VecDeque<Packet>,
    outbox: VecDeque<Packet>,
}

impl<F: UsbFraming> Default for Usb<F> {
    fn default() -> Self {
        Self {
            state: UsbState::Default,
            endpoints_ready: false,
            framing: F::default(),
            pending: VecDeque::new(),
            outbox: VecDeque::new(),
        }
    }
}

impl<F: UsbFraming> Usb<F> {
    /// Current device state
    pub fn state(&self) -> UsbState {
        self.state
    }

    /// Number of OUT transfers waiting for the device to be configured
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    fn xfer(ev: XferEvent) -> Result<Packet, Error> {
        Ok(Packet::new(SephTag::UsbEpXferEvent, ev.to_vec()?)?)
    }

    fn setup(&mut self, request: u8) -> Result<(), Error> {
        let ev = XferEvent::new(0x00, XferKind::Setup, setup_request(request));
        self.outbox.push_back(Self::xfer(ev)?);
        Ok(())
    }

    fn flush(&mut self) {
        self.outbox.extend(self.pending.drain(..));
    }
}

impl<F: UsbFraming> Transport for Usb<F> {
    fn config(&mut self, data: &[u8]) -> Result<(), Error> {
        let (cfg, _) = UsbConfig::decode_owned(data)?;

        debug!("usb config: {} (state: {})", cfg.kind(), self.state);

        match cfg {
            UsbConfig::Connect => {
                self.setup(USB_REQ_SET_ADDRESS)?;
                self.state = UsbState::Addressed;
            }
            UsbConfig::Addr => {
                self.setup(USB_REQ_SET_CONFIGURATION)?;
                self.state = UsbState::Configured;
            }
            UsbConfig::Endpoints(eps) => {
                if self.state == UsbState::Configured && eps.iter().any(|e| e.ep == F::EP_OUT) {
                    self.endpoints_ready = true;
                    self.flush();
                }
            }
            UsbConfig::Disconnect => {
                self.state = UsbState::Disconnected;
                self.endpoints_ready = false;
            }
        }

        Ok(())
    }

    fn prepare(&mut self, data: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        let (p, _) = EpPrepare::decode_owned(data).map_err(|e| match e {
            speculos_mcu_proto::ProtoError::PayloadTooLarge(n) => Error::EndpointOverflow(n),
            e => Error::Proto(e),
        })?;

        if p.dir != PrepareDir::In {
            trace!("usb prepare ep 0x{:02x} {} ignored", p.ep, p.dir);
            return Ok(None);
        }

        // Acknowledge every IN transfer
        let ack = XferEvent::new(p.ep, XferKind::In, vec![]);
        self.outbox.push_back(Self::xfer(ack)?);

        if p.ep != F::EP_IN {
            return Ok(None);
        }

        self.framing.receive(&p.data)
    }

    fn send(&mut self, apdu: &[u8]) -> Result<(), Error> {
        let ready = self.state == UsbState::Configured && self.endpoints_ready;

        for f in self.framing.frames(apdu)? {
            let pkt = Self::xfer(XferEvent::new(F::EP_OUT, XferKind::Out, f))?;

            match ready && self.pending.is_empty() {
                true => self.outbox.push_back(pkt),
                false => self.pending.push_back(pkt),
            }
        }

        if !ready {
            debug!("usb not configured, {} transfers held", self.pending.len());
        }

        Ok(())
    }

    fn handle_rapdu(&mut self, data: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        Ok(Some(data.to_vec()))
    }

    fn poll(&mut self) -> Option<Packet> {
        self.outbox.pop_front()
    }
}
