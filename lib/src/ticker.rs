// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Periodic `TICKER_EVENT` source

use std::{sync::Arc, time::Duration};

use log::debug;
use tokio::{
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};

use crate::{scheduler::Scheduler, Error};

/// Default ticker period
pub const TICKER_PERIOD: Duration = Duration::from_millis(100);

/// Ticker task, requesting a tick from the [Scheduler] each period
#[derive(Debug)]
pub struct Ticker {
    scheduler: Arc<Scheduler>,
    period: Duration,
    handle: JoinHandle<()>,
}

impl Ticker {
    /// Spawn a ticker task, must be called within a tokio runtime
    pub fn spawn(scheduler: Arc<Scheduler>, period: Duration) -> Self {
        let s = scheduler.clone();

        let handle = tokio::spawn(async move {
            let mut i = interval(period);
            i.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                i.tick().await;

                if s.is_closed() {
                    debug!("ticker exit");
                    break;
                }

                s.request_tick().await;
            }
        });

        Self {
            scheduler,
            period,
            handle,
        }
    }

    /// Ticker period
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Ticks processed by the firmware
    pub fn count(&self) -> u64 {
        self.scheduler.tick_status().count
    }

    /// Pause the ticker, returning once any in-flight tick is processed
    pub async fn pause(&self) -> Result<(), Error> {
        self.scheduler.pause().await
    }

    /// Resume the ticker
    pub fn resume(&self) {
        self.scheduler.resume()
    }

    /// Deliver a single tick, returning once the firmware has processed it
    pub async fn tick_once(&self) -> Result<u64, Error> {
        let t = self.scheduler.tick_status();
        let target = t.count + 1 + t.in_flight as u64;

        self.scheduler.force_tick().await;

        self.scheduler
            .wait_for(|t| t.count >= target)
            .await
            .map(|t| t.count)
    }

    /// Wait for `n` further ticks to be processed
    pub async fn wait_ticks(&self, n: u64) -> Result<(), Error> {
        let target = self.count() + n;

        self.scheduler
            .wait_for(|t| t.count >= target)
            .await
            .map(|_| ())
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
