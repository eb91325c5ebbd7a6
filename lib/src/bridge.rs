// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Bridge handle, connecting the firmware stream to host-side I/O
//!
//! The bridge owns the [Engine] and the [Scheduler]. [Bridge::run] reads
//! packets from the firmware, applies the resulting [Output]s and writes
//! queued packets as the handshake allows. All other methods are safe to
//! call from any task while the bridge is running.

use std::{io::Cursor, sync::Arc, time::Duration};

use image::{DynamicImage, ImageOutputFormat, RgbImage};
use log::{debug, error, info, warn};
use strum::{Display, EnumString, FromRepr};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::{broadcast, oneshot, Mutex},
};

use speculos_mcu_core::{
    engine::{Config, Engine, Output},
    Action, Automation, Model, Origin, Pixel, TextEvent,
};
use speculos_mcu_proto::{
    event::{button_push, finger},
    Packet,
};

use crate::{
    codec::{read_packet, write_packet},
    scheduler::Scheduler,
    ticker::Ticker,
    Error, Options,
};

/// Physical buttons, values are the bits of the pressed mask
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumString, FromRepr)]
#[strum(serialize_all = "lowercase")]
#[repr(u8)]
pub enum Button {
    Left = 1,
    Right = 2,
    Both = 3,
}

/// Callback invoked with every response APDU
pub type ApduCallback = Box<dyn Fn(&[u8]) + Send + Sync>;

#[derive(Copy, Clone, PartialEq, Debug)]
enum Flow {
    Continue,
    Exit,
}

struct Inner {
    model: Model,
    engine: Mutex<Engine>,
    scheduler: Arc<Scheduler>,
    ticker: Ticker,

    buttons: Mutex<u8>,

    exchange: Mutex<()>,
    pending: Mutex<Option<oneshot::Sender<Vec<u8>>>>,
    callbacks: Mutex<Vec<ApduCallback>>,
    apdu_timeout_ticks: Option<u64>,

    events: broadcast::Sender<TextEvent>,
    screen: broadcast::Sender<Arc<Vec<Pixel>>>,
}

/// Handle to a running SeProxyHal bridge
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<Inner>,
}

impl Bridge {
    /// Create a new bridge, spawning its ticker on the current runtime
    pub fn new(opts: &Options) -> Result<Self, Error> {
        let mut engine = Engine::new(&Config {
            model: opts.model,
            transport: opts.transport,
            graphics: opts.graphics,
        });

        if let Some(doc) = &opts.automation {
            let a = Automation::load(doc, Origin::Local)?;
            info!("loaded {} automation rules", a.len());
            engine.set_automation(Some(a));
        }

        info!(
            "bridge for {} ({} graphics, {} transport)",
            opts.model,
            engine.graphics(),
            opts.transport
        );

        let scheduler = Arc::new(Scheduler::new());
        let ticker = Ticker::spawn(scheduler.clone(), opts.ticker_period());

        let (events, _) = broadcast::channel(64);
        let (screen, _) = broadcast::channel(16);

        Ok(Self {
            inner: Arc::new(Inner {
                model: opts.model,
                engine: Mutex::new(engine),
                scheduler,
                ticker,
                buttons: Mutex::new(0),
                exchange: Mutex::new(()),
                pending: Mutex::new(None),
                callbacks: Mutex::new(vec![]),
                apdu_timeout_ticks: opts.apdu_timeout_ticks,
                events,
                screen,
            }),
        })
    }

    /// Device model
    pub fn model(&self) -> Model {
        self.inner.model
    }

    /// Run the bridge over the firmware stream until exit or failure
    ///
    /// Returns `Ok(())` when the firmware powers off or automation exits,
    /// [Error::Eof] if the firmware closes the stream.
    pub async fn run<S: AsyncRead + AsyncWrite>(&self, stream: S) -> Result<(), Error> {
        let (mut r, mut w) = tokio::io::split(stream);
        let scheduler = &self.inner.scheduler;

        let send = async {
            while let Some(p) = scheduler.next().await {
                write_packet(&mut w, &p).await?;
            }
            Err::<(), _>(Error::Closed)
        };

        let recv = async {
            loop {
                let p = read_packet(&mut r).await?;

                if self.dispatch(&p).await? == Flow::Exit {
                    return Ok(());
                }
            }
        };

        let res = tokio::select! {
            r = recv => r,
            r = send => r,
        };

        self.shutdown().await;

        match &res {
            Ok(_) => info!("bridge exit"),
            Err(e) => error!("bridge terminated: {}", e),
        }

        res
    }

    async fn shutdown(&self) {
        self.inner.scheduler.close();

        // Dropping the sender aborts any pending exchange
        self.inner.pending.lock().await.take();
    }

    async fn dispatch(&self, p: &Packet) -> Result<Flow, Error> {
        let out = self.inner.engine.lock().await.update(p)?;
        self.apply(out).await
    }

    async fn apply(&self, out: Vec<Output>) -> Result<Flow, Error> {
        let scheduler = &self.inner.scheduler;
        let mut flow = Flow::Continue;

        for o in out {
            match o {
                Output::Event(p) => scheduler.push_back(p).await,
                Output::Reply(p) => scheduler.reply(p).await?,
                Output::StatusReceived => scheduler.status_received().await?,
                Output::Apdu(a) => self.deliver(a).await,
                Output::Text(t) => {
                    let _ = self.inner.events.send(t);
                }
                Output::Action(a) => self.action(a).await,
                Output::Screen(px) => {
                    let _ = self.inner.screen.send(Arc::new(px));
                }
                Output::Exit => flow = Flow::Exit,
            }
        }

        Ok(flow)
    }

    async fn deliver(&self, apdu: Vec<u8>) {
        for cb in self.inner.callbacks.lock().await.iter() {
            cb(&apdu);
        }

        match self.inner.pending.lock().await.take() {
            Some(tx) => {
                let _ = tx.send(apdu);
            }
            None => warn!("unsolicited response APDU: {:02x?}", apdu),
        }
    }

    async fn action(&self, a: Action) {
        debug!("automation: {:?}", a);

        let r = match a {
            Action::Button { button, pressed } => match Button::from_repr(button) {
                Some(b) => {
                    self.queue_button(b, pressed).await;
                    Ok(())
                }
                None => Err(Error::InvalidInput(format!("unknown button {button}"))),
            },
            Action::Finger { x, y, pressed } => self.queue_finger(x, y, pressed).await,
            // Handled by the engine
            Action::SetBool { .. } | Action::Exit => Ok(()),
        };

        if let Err(e) = r {
            warn!("automation action failed: {}", e);
        }
    }

    /// Exchange an APDU with the firmware using the configured timeout
    pub async fn exchange_apdu(&self, apdu: &[u8]) -> Result<Vec<u8>, Error> {
        self.exchange_apdu_timeout(apdu, self.inner.apdu_timeout_ticks)
            .await
    }

    /// Exchange an APDU with the firmware, timing out after `ticks` ticker periods
    pub async fn exchange_apdu_timeout(
        &self,
        apdu: &[u8],
        ticks: Option<u64>,
    ) -> Result<Vec<u8>, Error> {
        let _guard = self.inner.exchange.lock().await;

        let (tx, rx) = oneshot::channel();
        {
            // shutdown() closes the scheduler before taking the pending lock
            let mut pending = self.inner.pending.lock().await;
            if self.inner.scheduler.is_closed() {
                return Err(Error::Closed);
            }
            *pending = Some(tx);
        }

        let r = self.request(apdu, rx, ticks).await;

        if r.is_err() {
            self.inner.pending.lock().await.take();
        }

        r
    }

    async fn request(
        &self,
        apdu: &[u8],
        rx: oneshot::Receiver<Vec<u8>>,
        ticks: Option<u64>,
    ) -> Result<Vec<u8>, Error> {
        let out = self.inner.engine.lock().await.send_apdu(apdu)?;
        self.apply(out).await?;

        match ticks {
            Some(n) => tokio::select! {
                r = rx => r.map_err(|_| Error::Closed),
                r = self.inner.ticker.wait_ticks(n) => r.and(Err(Error::Timeout)),
            },
            None => rx.await.map_err(|_| Error::Closed),
        }
    }

    /// Register a callback to be invoked with every response APDU
    pub async fn register_apdu_callback(&self, f: impl Fn(&[u8]) + Send + Sync + 'static) {
        self.inner.callbacks.lock().await.push(Box::new(f));
    }

    /// Queue a button press or release
    pub async fn queue_button(&self, button: Button, pressed: bool) {
        let mut mask = self.inner.buttons.lock().await;

        match pressed {
            true => *mask |= button as u8,
            false => *mask &= !(button as u8),
        }

        debug!("button {} pressed: {} (mask: {})", button, pressed, *mask);

        self.inner.scheduler.push_back(button_push(*mask)).await;
    }

    /// Press a button, wait for `delay`, then release it
    pub async fn press_and_release(&self, button: Button, delay: Duration) {
        self.queue_button(button, true).await;
        tokio::time::sleep(delay).await;
        self.queue_button(button, false).await;
    }

    /// Queue a touch or release at `(x, y)`
    pub async fn queue_finger(&self, x: u16, y: u16, pressed: bool) -> Result<(), Error> {
        let (w, h) = self.inner.model.screen_size();
        if x >= w || y >= h {
            return Err(Error::InvalidInput(format!(
                "finger ({x}, {y}) outside {w}x{h} screen"
            )));
        }

        debug!("finger ({}, {}) pressed: {}", x, y, pressed);

        self.inner.scheduler.push_back(finger(x, y, pressed)).await;
        Ok(())
    }

    /// Replace (or clear) the automation rules
    pub async fn set_automation(&self, doc: Option<&str>, origin: Origin) -> Result<(), Error> {
        let a = doc
            .map(|d| Automation::load(d, origin))
            .transpose()
            .map_err(|e| Error::InvalidInput(e.to_string()))?;

        match &a {
            Some(a) => info!("loaded {} automation rules", a.len()),
            None => info!("automation cleared"),
        }

        self.inner.engine.lock().await.set_automation(a);
        Ok(())
    }

    /// Capture the committed screen
    pub async fn take_screenshot(&self) -> RgbImage {
        self.inner.engine.lock().await.screenshot()
    }

    /// Capture the committed screen as PNG
    pub async fn screenshot_png(&self) -> Result<Vec<u8>, Error> {
        let img = DynamicImage::ImageRgb8(self.take_screenshot().await);

        let mut buff = Cursor::new(vec![]);
        img.write_to(&mut buff, ImageOutputFormat::Png)?;

        Ok(buff.into_inner())
    }

    /// Subscribe to recognised text events
    pub fn subscribe_events(&self) -> broadcast::Receiver<TextEvent> {
        self.inner.events.subscribe()
    }

    /// Subscribe to committed screen updates
    pub fn subscribe_screen(&self) -> broadcast::Receiver<Arc<Vec<Pixel>>> {
        self.inner.screen.subscribe()
    }

    /// Pause the ticker, returning once any in-flight tick is processed
    pub async fn pause_ticker(&self) -> Result<(), Error> {
        self.inner.ticker.pause().await
    }

    /// Resume the ticker
    pub fn resume_ticker(&self) {
        self.inner.ticker.resume()
    }

    /// Deliver a single tick, returning the tick count once processed
    pub async fn tick_once(&self) -> Result<u64, Error> {
        self.inner.ticker.tick_once().await
    }

    /// Ticks processed by the firmware
    pub fn ticks(&self) -> u64 {
        self.inner.ticker.count()
    }
}
