#![allow(unused)]

use std::{str::FromStr, time::Duration};

use log::{debug, LevelFilter};
use simplelog::SimpleLogger;
use tokio::{io::DuplexStream, task::JoinHandle, time::timeout};

use speculos_mcu::{
    codec::{read_packet, write_packet},
    proto::{
        usb::{HID_EP_IN, HID_EP_OUT},
        Packet, SephTag,
    },
    Bridge, Error, Options,
};

/// Default receive timeout for firmware stubs
pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// Setup logging, using `LOG_LEVEL` from the environment if set
pub fn setup_logging() {
    let log_level = match std::env::var("LOG_LEVEL").map(|v| LevelFilter::from_str(&v)) {
        Ok(Ok(l)) => l,
        _ => LevelFilter::Debug,
    };

    let _ = SimpleLogger::init(log_level, Default::default());
}

/// Firmware stub speaking SEPH over an in-memory pipe
pub struct Firmware {
    s: DuplexStream,
}

impl Firmware {
    /// Send a packet to the bridge
    pub async fn send(&mut self, tag: SephTag, payload: &[u8]) -> anyhow::Result<()> {
        let p = Packet::new(tag, payload.to_vec())?;
        write_packet(&mut self.s, &p).await?;
        Ok(())
    }

    /// Receive a packet from the bridge
    pub async fn recv(&mut self) -> anyhow::Result<Packet> {
        let p = timeout(RECV_TIMEOUT, read_packet(&mut self.s)).await??;
        debug!("firmware rx: {} {:02x?}", p.tag, p.payload);
        Ok(p)
    }

    /// Receive a packet if one arrives within `d`
    pub async fn try_recv(&mut self, d: Duration) -> Option<Packet> {
        timeout(d, read_packet(&mut self.s)).await.ok()?.ok()
    }

    /// Send `GENERAL_STATUS / LAST_COMMAND` and receive the released packet
    pub async fn status(&mut self) -> anyhow::Result<Packet> {
        self.send(SephTag::GeneralStatus, &[0x00, 0x00]).await?;
        self.recv().await
    }

    /// Issue statuses until a packet other than a ticker is released
    pub async fn next_event(&mut self) -> anyhow::Result<Packet> {
        loop {
            let p = self.status().await?;
            if p.tag != SephTag::TickerEvent {
                return Ok(p);
            }
        }
    }

    /// Run the USB enumeration sequence
    pub async fn usb_connect(&mut self) -> anyhow::Result<()> {
        self.send(SephTag::UsbConfig, &[0x01]).await?;
        self.send(SephTag::UsbConfig, &[0x03]).await?;
        self.send(
            SephTag::UsbConfig,
            &[0x04, 0x02, HID_EP_IN, 0x03, 0x40, HID_EP_OUT, 0x03, 0x40],
        )
        .await?;
        Ok(())
    }

    /// Close the firmware side of the pipe
    pub fn close(self) {
        drop(self.s)
    }
}

/// Start a bridge connected to a firmware stub
pub fn setup(opts: Options) -> anyhow::Result<(Bridge, Firmware, JoinHandle<Result<(), Error>>)> {
    setup_logging();

    let (a, b) = tokio::io::duplex(64 * 1024);

    let bridge = Bridge::new(&opts)?;

    let b1 = bridge.clone();
    let h = tokio::spawn(async move { b1.run(a).await });

    Ok((bridge, Firmware { s: b }, h))
}

/// Options for fast-ticking tests
pub fn options() -> Options {
    Options {
        ticker_period_ms: 10,
        ..Default::default()
    }
}
