use crate::announcer::Announcer;
use crate::types::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{error, info};

/// Source of "run a tick now" signals.
#[async_trait]
pub trait Ticker: Send {
    /// Wait for the next tick. `false` stops the scheduler.
    async fn tick(&mut self) -> bool;
}

/// Wall-clock ticker. The first tick fires immediately; a late tick is
/// delayed rather than bunched up.
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) -> bool {
        self.interval.tick().await;
        true
    }
}

/// Ticks on demand; stops once every sender is dropped.
pub struct ManualTicker {
    rx: mpsc::UnboundedReceiver<()>,
}

impl ManualTicker {
    pub fn channel() -> (mpsc::UnboundedSender<()>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }
}

#[async_trait]
impl Ticker for ManualTicker {
    async fn tick(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }
}

pub struct Scheduler {
    announcer: Arc<Announcer>,
}

impl Scheduler {
    pub fn new(announcer: Arc<Announcer>) -> Self {
        Self { announcer }
    }

    /// Run one tick per signal from `ticker`. Ticks run back to back on this
    /// task, never concurrently. Returns the first persistence error.
    pub async fn run<T: Ticker>(&self, mut ticker: T) -> Result<()> {
        while ticker.tick().await {
            if let Err(e) = self.announcer.run_tick().await {
                error!("Stopping scheduler, state could not be persisted: {}", e);
                return Err(e);
            }
        }
        info!("Ticker closed, scheduler stopped");
        Ok(())
    }

    pub fn spawn<T: Ticker + 'static>(self, ticker: T) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run(ticker).await })
    }
}
