// Live Countdown
// Publishes a fresh remaining-time frame every tick until the listing ends

use crate::application::constants::{COUNTDOWN_CADENCE, MIN_TICK_PERIOD};
use crate::application::shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
use crate::domain::{EndInstant, ExpiryClock, TimeRemaining, Urgency};
use crate::port::TimeProvider;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

/// One rendering of the countdown badge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownFrame {
    pub remaining: TimeRemaining,
    pub urgency: Urgency,
}

impl CountdownFrame {
    /// `2h 30m left`, `45s left` or `Expired`
    pub fn label(&self) -> String {
        if self.remaining.is_expired {
            self.remaining.format()
        } else {
            format!("{} left", self.remaining.format())
        }
    }

    pub fn is_expired(&self) -> bool {
        self.remaining.is_expired
    }
}

#[derive(Clone)]
pub struct Countdown {
    end: Option<DateTime<Utc>>,
    clock: ExpiryClock,
    time_provider: Arc<dyn TimeProvider>,
    cadence: Duration,
}

impl Countdown {
    pub fn new<E: EndInstant + ?Sized>(
        end: &E,
        clock: ExpiryClock,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            end: clock.end_instant(end),
            clock,
            time_provider,
            cadence: COUNTDOWN_CADENCE,
        }
    }

    /// Refresh period, at least one millisecond
    pub fn with_cadence(mut self, cadence: Duration) -> Self {
        self.cadence = cadence.max(MIN_TICK_PERIOD);
        self
    }

    /// Resolved end instant, if the listing has one
    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.end
    }

    /// Frame for the current instant
    pub fn frame(&self) -> CountdownFrame {
        let now = self.time_provider.now();
        CountdownFrame {
            remaining: self.clock.remaining(&self.end, now),
            urgency: self.clock.urgency(&self.end, now),
        }
    }

    /// Start ticking in the background
    ///
    /// The first frame is available immediately. The ticker stops after it
    /// publishes an expired frame, or when the handle is stopped or dropped.
    pub fn spawn(self) -> CountdownHandle {
        let first = self.frame();
        let (frame_tx, frame_rx) = watch::channel(first);
        let (shutdown_tx, shutdown) = shutdown_channel();

        let task = if first.is_expired() {
            None
        } else {
            Some(tokio::spawn(self.tick(frame_tx, shutdown)))
        };

        CountdownHandle {
            frames: frame_rx,
            shutdown: shutdown_tx,
            task,
        }
    }

    async fn tick(self, frames: watch::Sender<CountdownFrame>, mut shutdown: ShutdownToken) {
        let mut tick = interval(self.cadence);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately and its frame is already out
        tick.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.wait() => break,
                _ = tick.tick() => {
                    let frame = self.frame();
                    // Every receiver gone means nobody is watching
                    if frames.send(frame).is_err() || frame.is_expired() {
                        break;
                    }
                }
            }
        }
        debug!(end = ?self.end, "Countdown ticker stopped");
    }
}

/// Owner of a running countdown; dropping it stops the ticker
pub struct CountdownHandle {
    frames: watch::Receiver<CountdownFrame>,
    shutdown: ShutdownSender,
    task: Option<JoinHandle<()>>,
}

impl CountdownHandle {
    /// A receiver that sees every published frame
    pub fn frames(&self) -> watch::Receiver<CountdownFrame> {
        self.frames.clone()
    }

    pub fn current(&self) -> CountdownFrame {
        *self.frames.borrow()
    }

    pub fn stop(&self) {
        self.shutdown.shutdown();
    }

    /// Wait for the ticker to finish (expired or stopped)
    pub async fn join(mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for CountdownHandle {
    fn drop(&mut self) {
        self.shutdown.shutdown();
    }
}
