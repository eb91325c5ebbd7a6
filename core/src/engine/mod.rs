// Copyright (c) 2022-2023 The MobileCoin Foundation

//! The [Engine] implements the MCU side of the SeProxyHal protocol.
//!
//! Each packet received from the firmware is passed to [Engine::update],
//! which drives the graphics, OCR, automation and transport state and
//! returns a list of [Output]s for the caller to apply in order. The engine
//! does not perform any I/O, queueing and handshake gating are left to the
//! caller.

use image::RgbImage;
use log::{debug, info, trace};

use speculos_mcu_proto::{
    event::display_processed, nbgl::Area, Packet, SephTag, GENERAL_STATUS_LAST_COMMAND,
};

use crate::{
    automation::{Action, Automation},
    transport::{GenericTransport, Transport, TransportKind},
    Bagl, Framebuffer, Graphics, Model, Nbgl, Ocr,
};

mod output;
pub use output::Output;

mod error;
pub use error::Error;

/// Longest buffered `printf` output before it is logged without a newline
pub const PRINTF_MAX: usize = 1024;

/// Pending screen refresh
#[derive(Copy, Clone, PartialEq, Debug)]
enum Refresh {
    Full,
    Region { x0: u16, y0: u16, x1: u16, y1: u16 },
}

impl Refresh {
    fn merge(self, a: Option<Area>) -> Self {
        match (self, a) {
            (Refresh::Region { x0, y0, x1, y1 }, Some(a)) => Refresh::Region {
                x0: x0.min(a.x0),
                y0: y0.min(a.y0),
                x1: x1.max(a.x0 + a.width),
                y1: y1.max(a.y0 + a.height),
            },
            _ => Refresh::Full,
        }
    }

    fn from_area(a: Option<Area>) -> Self {
        match a {
            Some(a) => Refresh::Region {
                x0: a.x0,
                y0: a.y0,
                x1: a.x0 + a.width,
                y1: a.y0 + a.height,
            },
            None => Refresh::Full,
        }
    }
}

/// Engine configuration
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Config {
    pub model: Model,
    pub transport: TransportKind,
    /// Graphics override, defaults to the model's library
    pub graphics: Option<Graphics>,
}

/// SeProxyHal dispatcher
pub struct Engine {
    model: Model,
    graphics: Graphics,

    fb: Framebuffer,
    ocr: Ocr,
    bagl: Bagl,
    nbgl: Nbgl,

    transport: GenericTransport,
    automation: Option<Automation>,

    refresh: Option<Refresh>,
    printf: Vec<u8>,
}

impl Engine {
    /// Create a new engine instance
    pub fn new(cfg: &Config) -> Self {
        Self {
            model: cfg.model,
            graphics: cfg.graphics.unwrap_or_else(|| cfg.model.default_graphics()),
            fb: Framebuffer::new(cfg.model),
            ocr: Ocr::new(cfg.model),
            bagl: Bagl::new(),
            nbgl: Nbgl::new(),
            transport: GenericTransport::new(cfg.transport),
            automation: None,
            refresh: None,
            printf: vec![],
        }
    }

    /// Device model
    pub fn model(&self) -> Model {
        self.model
    }

    /// Graphics library in use
    pub fn graphics(&self) -> Graphics {
        self.graphics
    }

    /// Framebuffer access
    pub fn framebuffer(&self) -> &Framebuffer {
        &self.fb
    }

    /// Render the committed screen
    pub fn screenshot(&self) -> RgbImage {
        self.fb.to_image()
    }

    /// Replace (or clear) the automation rules
    pub fn set_automation(&mut self, a: Option<Automation>) {
        self.automation = a;
    }

    /// Submit an APDU to the transport, returning the events to queue
    pub fn send_apdu(&mut self, apdu: &[u8]) -> Result<Vec<Output>, Error> {
        debug!("apdu tx: {:02x?}", apdu);

        self.transport.send(apdu)?;

        let mut out = vec![];
        self.drain_transport(&mut out);
        Ok(out)
    }

    /// Handle a packet from the firmware
    pub fn update(&mut self, pkt: &Packet) -> Result<Vec<Output>, Error> {
        trace!("seph rx: {} ({} bytes)", pkt.tag, pkt.payload.len());

        if pkt.tag.is_event() {
            return Err(Error::UnexpectedTag(pkt.tag));
        }

        let mut out = vec![];
        let data = pkt.payload.as_slice();

        match pkt.tag {
            SephTag::GeneralStatus => self.general_status(data, &mut out)?,

            SephTag::ScreenDisplayStatus => {
                self.require(Graphics::Bagl, pkt.tag)?;
                self.bagl.display_status(&mut self.fb, &mut self.ocr, data)?;
                self.mark_refresh(None);
                self.reply(&mut out);
            }
            SephTag::ScreenDisplayRawStatus => {
                self.require(Graphics::Bagl, pkt.tag)?;
                self.bagl
                    .display_raw_status(&mut self.fb, &mut self.ocr, data)?;
                self.mark_refresh(None);
                self.reply(&mut out);
            }
            SephTag::PrintfStatus => {
                self.printf(data);
                self.reply(&mut out);
            }
            SephTag::PrintcStatus => {
                self.printf(data);
                if self.model == Model::Blue {
                    self.reply(&mut out);
                }
            }

            SephTag::Rapdu => {
                if let Some(apdu) = self.transport.handle_rapdu(data)? {
                    debug!("apdu rx: {:02x?}", apdu);
                    out.push(Output::Apdu(apdu));
                }
                self.drain_transport(&mut out);
            }
            SephTag::UsbConfig => {
                self.transport.config(data)?;
                self.drain_transport(&mut out);
            }
            SephTag::UsbEpPrepare => {
                let r = self.transport.prepare(data)?;
                self.drain_transport(&mut out);

                if let Some(apdu) = r {
                    debug!("apdu rx: {:02x?}", apdu);
                    out.push(Output::Apdu(apdu));
                }
            }

            SephTag::NbglDrawRect => {
                self.require(Graphics::Nbgl, pkt.tag)?;
                self.nbgl.draw_rect(&mut self.fb, &mut self.ocr, data)?;
            }
            SephTag::NbglDrawLine => {
                self.require(Graphics::Nbgl, pkt.tag)?;
                self.nbgl.draw_line(&mut self.fb, data)?;
            }
            SephTag::NbglDrawImage => {
                self.require(Graphics::Nbgl, pkt.tag)?;
                self.nbgl.draw_image(&mut self.fb, &mut self.ocr, data)?;
            }
            SephTag::NbglDrawImageFile => {
                self.require(Graphics::Nbgl, pkt.tag)?;
                self.nbgl
                    .draw_image_file(&mut self.fb, &mut self.ocr, data)?;
            }
            SephTag::NbglDrawImageRle => {
                self.require(Graphics::Nbgl, pkt.tag)?;
                self.nbgl
                    .draw_image_rle(&mut self.fb, &mut self.ocr, data)?;
            }
            SephTag::NbglRefresh => {
                self.require(Graphics::Nbgl, pkt.tag)?;
                let a = self.nbgl.refresh(&self.fb, data)?;
                self.mark_refresh(a);
            }

            SephTag::SePowerOff => {
                info!("firmware powered off");
                out.push(Output::Exit);
            }

            SephTag::BleSend
            | SephTag::BleRadioPower
            | SephTag::PlayTune
            | SephTag::Mcu
            | SephTag::RequestStatus => {
                debug!("ignoring {} ({} bytes)", pkt.tag, data.len());
            }

            // Events are rejected above
            SephTag::ButtonPushEvent
            | SephTag::FingerEvent
            | SephTag::DisplayProcessedEvent
            | SephTag::TickerEvent
            | SephTag::UsbEvent
            | SephTag::UsbEpXferEvent
            | SephTag::CapduEvent => return Err(Error::UnexpectedTag(pkt.tag)),
        }

        Ok(out)
    }

    fn require(&self, g: Graphics, tag: SephTag) -> Result<(), Error> {
        match self.graphics == g {
            true => Ok(()),
            false => Err(Error::UnexpectedTag(tag)),
        }
    }

    fn reply(&mut self, out: &mut Vec<Output>) {
        out.push(Output::Reply(display_processed()));
    }

    fn mark_refresh(&mut self, a: Option<Area>) {
        self.refresh = Some(match self.refresh {
            Some(r) => r.merge(a),
            None => Refresh::from_area(a),
        });
    }

    fn drain_transport(&mut self, out: &mut Vec<Output>) {
        while let Some(p) = self.transport.poll() {
            out.push(Output::Event(p));
        }
    }

    fn printf(&mut self, data: &[u8]) {
        self.printf.extend_from_slice(data);

        while let Some(i) = self.printf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.printf.drain(..=i).collect();
            info!("printf: {}", String::from_utf8_lossy(&line[..i]).trim_end());
        }

        if self.printf.len() >= PRINTF_MAX {
            let line: Vec<u8> = self.printf.drain(..).collect();
            info!("printf: {}", String::from_utf8_lossy(&line));
        }
    }

    fn general_status(&mut self, data: &[u8], out: &mut Vec<Output>) -> Result<(), Error> {
        if data.len() < 2 {
            return Err(speculos_mcu_proto::ProtoError::InvalidLength.into());
        }

        let subtag = u16::from_be_bytes([data[0], data[1]]);
        if subtag != GENERAL_STATUS_LAST_COMMAND {
            return Err(Error::UnexpectedStatus(subtag));
        }

        // Commit refreshed pixels
        if let Some(r) = self.refresh.take() {
            let px = match r {
                Refresh::Full => self.fb.screen_update(),
                Refresh::Region { x0, y0, x1, y1 } => {
                    self.fb.update_region(x0, y0, x1 - x0, y1 - y0)
                }
            };
            if !px.is_empty() {
                out.push(Output::Screen(px));
            }
        }

        // Emit text, then the actions it triggers
        let mut actions = vec![];

        for ev in self.ocr.get_events() {
            debug!("text: {:?}", ev);

            let matched = self
                .automation
                .as_ref()
                .and_then(|a| a.get_actions(&ev))
                .map(|a| a.to_vec())
                .unwrap_or_default();

            for a in matched {
                match a {
                    Action::SetBool { key, value } => {
                        if let Some(auto) = self.automation.as_mut() {
                            auto.set_bool(&key, value);
                        }
                    }
                    Action::Exit => actions.push(Output::Exit),
                    a => actions.push(Output::Action(a)),
                }
            }

            out.push(Output::Text(ev));
        }

        out.extend(actions);

        out.push(Output::StatusReceived);

        Ok(())
    }
}
