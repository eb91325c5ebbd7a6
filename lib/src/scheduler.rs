// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Outbound packet queue gated by the firmware handshake
//!
//! Every status from the firmware opens a single reply slot, the sender
//! releases one packet per open slot. Display acknowledgements are pushed
//! to the head of the queue and open their slot atomically, unsolicited
//! events wait for a `GENERAL_STATUS`. When the queue is empty a pending
//! tick request is released instead.

use std::collections::VecDeque;

use log::{debug, trace};
use tokio::sync::{watch, Mutex, Notify};

use speculos_mcu_proto::{event::ticker, Packet};

use crate::Error;

/// Tick bookkeeping published to waiters
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct TickStatus {
    /// Ticks processed by the firmware
    pub count: u64,
    /// A tick has been written and not yet acknowledged
    pub in_flight: bool,
    /// Ticker paused
    pub paused: bool,
    /// Scheduler closed
    pub closed: bool,
}

#[derive(Debug, Default)]
struct State {
    queue: VecDeque<Packet>,
    slot: bool,
    tick_requested: bool,
    tick_forced: bool,
}

/// Packet scheduler
#[derive(Debug)]
pub struct Scheduler {
    state: Mutex<State>,
    notify: Notify,
    ticks: watch::Sender<TickStatus>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Create a new scheduler
    pub fn new() -> Self {
        let (ticks, _) = watch::channel(TickStatus::default());

        Self {
            state: Mutex::new(State::default()),
            notify: Notify::new(),
            ticks,
        }
    }

    /// Append an event to the queue
    pub async fn push_back(&self, p: Packet) {
        trace!("queue {}", p.tag);

        self.state.lock().await.queue.push_back(p);
        self.notify.notify_one();
    }

    /// Push a reply to the head of the queue and open its slot
    pub async fn reply(&self, p: Packet) -> Result<(), Error> {
        let mut s = self.state.lock().await;
        if s.slot {
            return Err(Error::Protocol(format!(
                "reply {} with a slot already open",
                p.tag
            )));
        }

        trace!("reply {}", p.tag);

        s.queue.push_front(p);
        s.slot = true;
        drop(s);

        self.notify.notify_one();
        Ok(())
    }

    /// Handle a `GENERAL_STATUS`, opening a slot for one event
    pub async fn status_received(&self) -> Result<(), Error> {
        let mut s = self.state.lock().await;
        if s.slot {
            return Err(Error::Protocol(
                "status received with a slot already open".to_string(),
            ));
        }
        s.slot = true;
        drop(s);

        self.ticks.send_if_modified(|t| match t.in_flight {
            true => {
                t.in_flight = false;
                t.count += 1;
                true
            }
            false => false,
        });

        self.notify.notify_one();
        Ok(())
    }

    /// Request a tick, ignored while paused
    pub async fn request_tick(&self) -> bool {
        if self.ticks.borrow().paused {
            return false;
        }
        self.state.lock().await.tick_requested = true;
        self.notify.notify_one();
        true
    }

    /// Request a tick regardless of pause state
    pub async fn force_tick(&self) {
        self.state.lock().await.tick_forced = true;
        self.notify.notify_one();
    }

    /// Pause ticks, returning once any in-flight tick has been processed
    pub async fn pause(&self) -> Result<(), Error> {
        self.ticks.send_modify(|t| t.paused = true);
        self.state.lock().await.tick_requested = false;

        debug!("ticker paused");

        self.wait_for(|t| !t.in_flight).await.map(|_| ())
    }

    /// Resume ticks
    pub fn resume(&self) {
        self.ticks.send_modify(|t| t.paused = false);

        debug!("ticker resumed");
    }

    /// Current tick status
    pub fn tick_status(&self) -> TickStatus {
        *self.ticks.borrow()
    }

    /// Wait until the provided predicate holds for the tick status
    pub async fn wait_for(&self, f: impl Fn(&TickStatus) -> bool) -> Result<TickStatus, Error> {
        let mut rx = self.ticks.subscribe();

        loop {
            let t = *rx.borrow_and_update();
            if f(&t) {
                return Ok(t);
            }
            if t.closed {
                return Err(Error::Closed);
            }

            rx.changed().await.map_err(|_| Error::Closed)?;
        }
    }

    /// Fetch the next packet to send, `None` once closed
    pub async fn next(&self) -> Option<Packet> {
        loop {
            if self.ticks.borrow().closed {
                return None;
            }

            let mut s = self.state.lock().await;
            if s.slot {
                if let Some(p) = s.queue.pop_front() {
                    s.slot = false;
                    return Some(p);
                }

                let paused = self.ticks.borrow().paused;
                if s.tick_forced || (s.tick_requested && !paused) {
                    s.tick_requested = false;
                    s.tick_forced = false;
                    s.slot = false;
                    drop(s);

                    self.ticks.send_modify(|t| t.in_flight = true);
                    return Some(ticker());
                }
            }
            drop(s);

            self.notify.notified().await;
        }
    }

    /// Number of queued packets
    pub async fn len(&self) -> usize {
        self.state.lock().await.queue.len()
    }

    /// Whether the queue is empty
    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.queue.is_empty()
    }

    /// Close the scheduler, waking all waiters
    pub fn close(&self) {
        self.ticks.send_modify(|t| t.closed = true);
        self.notify.notify_one();
    }

    /// Whether the scheduler has been closed
    pub fn is_closed(&self) -> bool {
        self.ticks.borrow().closed
    }
}
