// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::{
    net::{IpAddr, Ipv4Addr},
    time::Duration,
};

use clap::Parser;

use speculos_mcu_core::{Graphics, Model, TransportKind};

use crate::ticker::TICKER_PERIOD;

/// Bridge options
#[derive(Clone, Debug, PartialEq, Parser)]
pub struct Options {
    /// Device model
    #[clap(long, default_value_t = Model::NanoSP)]
    pub model: Model,

    /// APDU transport
    #[clap(long, default_value_t = TransportKind::Hid)]
    pub transport: TransportKind,

    /// Graphics library override (defaults to the model's library)
    #[clap(long)]
    pub graphics: Option<Graphics>,

    /// Automation rules, inline JSON or `file:<path>`
    #[clap(long)]
    pub automation: Option<String>,

    /// Ticker period in milliseconds
    #[clap(long, default_value_t = 100)]
    pub ticker_period_ms: u64,

    /// Address for side channel listeners
    #[clap(long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub bind: IpAddr,

    /// APDU TCP port
    #[clap(long)]
    pub apdu_port: Option<u16>,

    /// Button TCP port
    #[clap(long)]
    pub button_port: Option<u16>,

    /// Finger TCP port
    #[clap(long)]
    pub finger_port: Option<u16>,

    /// APDU exchange timeout in ticker periods
    #[clap(long)]
    pub apdu_timeout_ticks: Option<u64>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            model: Model::default(),
            transport: TransportKind::default(),
            graphics: None,
            automation: None,
            ticker_period_ms: TICKER_PERIOD.as_millis() as u64,
            bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
            apdu_port: None,
            button_port: None,
            finger_port: None,
            apdu_timeout_ticks: None,
        }
    }
}

impl Options {
    /// Ticker period
    pub fn ticker_period(&self) -> Duration {
        Duration::from_millis(self.ticker_period_ms.max(1))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_defaults() {
        let o = Options::try_parse_from(["speculos-mcu"]).unwrap();
        assert_eq!(o, Options::default());
    }

    #[test]
    fn parse_args() {
        let o = Options::try_parse_from([
            "speculos-mcu",
            "--model",
            "stax",
            "--transport",
            "nfc",
            "--graphics",
            "nbgl",
            "--apdu-port",
            "9999",
        ])
        .unwrap();

        assert_eq!(o.model, Model::Stax);
        assert_eq!(o.transport, TransportKind::Nfc);
        assert_eq!(o.graphics, Some(Graphics::Nbgl));
        assert_eq!(o.apdu_port, Some(9999));
    }
}
