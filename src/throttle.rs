//! Permit stream at an approximate rate.
//!
//! High rates are not ticked at `rate` Hz. Instead the ticker runs at a divisor
//! `d` below 1000 Hz and every tick pushes `rate / d` permits, so the error is
//! bounded by `rate % d` permits per second.

use std::time::Duration;

use tokio::{
    sync::mpsc,
    time::{interval, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{task::Stoppable, Point};

/// Rates up to this value are ticked once per permit.
const EXACT_RATE_LIMIT: u64 = 1000;
const MIN_DIVISOR: u64 = 100;
const MAX_DIVISOR: u64 = 1000;
/// Upper bound on the permit buffer for very large rates.
const MAX_CAPACITY: usize = 1 << 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickPlan {
    /// Ticks per second.
    pub divisor: u64,
    /// Permits per tick.
    pub chunk: u64,
}
impl TickPlan {
    /// `None` means throttling is disabled.
    pub fn for_rate(rate: i64) -> Option<Self> {
        let rate = u64::try_from(rate).ok().filter(|&r| r > 0)?;
        if rate <= EXACT_RATE_LIMIT {
            return Some(Self {
                divisor: rate,
                chunk: 1,
            });
        }
        let mut divisor = MIN_DIVISOR;
        for d in MIN_DIVISOR..MAX_DIVISOR {
            if rate % d < rate % divisor {
                divisor = d;
            }
        }
        Some(Self {
            divisor,
            chunk: rate / divisor,
        })
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs(1) / self.divisor as u32
    }
    pub fn rate(&self) -> u64 {
        self.divisor * self.chunk
    }
}

/// Issues permits on a bounded channel holding one second's worth of them.
///
/// A closed permit stream means "do not throttle".
#[derive(Debug)]
pub struct Throttle {
    permits: mpsc::Receiver<()>,
    plan: Option<TickPlan>,
    task: Option<Stoppable>,
}
impl Throttle {
    /// Must be called inside a tokio runtime when `rate > 0`.
    pub fn new(rate: i64) -> Self {
        let Some(plan) = TickPlan::for_rate(rate) else {
            let (_, permits) = mpsc::channel(1);
            debug!(rate, "throttle disabled");
            return Self {
                permits,
                plan: None,
                task: None,
            };
        };
        let capacity = usize::try_from(rate).map_or(MAX_CAPACITY, |r| r.min(MAX_CAPACITY));
        let (tx, permits) = mpsc::channel(capacity);
        info!(
            rate,
            divisor = plan.divisor,
            chunk = plan.chunk,
            "throttle started"
        );
        let task = Stoppable::start(move |cancel| issue_permits(tx, plan, cancel));
        Self {
            permits,
            plan: Some(plan),
            task: Some(task),
        }
    }

    pub fn plan(&self) -> Option<TickPlan> {
        self.plan
    }
    pub fn is_disabled(&self) -> bool {
        self.plan.is_none()
    }
    pub fn permits(&mut self) -> &mut mpsc::Receiver<()> {
        &mut self.permits
    }

    /// Waits for a permit. Returns `false` once the stream is closed, in which
    /// case the caller should proceed without waiting.
    pub async fn acquire(&mut self) -> bool {
        self.permits.recv().await.is_some()
    }

    pub async fn stop(mut self) {
        if let Some(task) = self.task.take() {
            task.stop().await;
        }
    }
}

async fn issue_permits(tx: mpsc::Sender<()>, plan: TickPlan, cancel: CancellationToken) {
    let mut ticker = interval(plan.period());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    'ticks: loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        for _ in 0..plan.chunk {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break 'ticks,
                res = tx.send(()) => {
                    if res.is_err() {
                        // Every receiver is gone.
                        break 'ticks;
                    }
                }
            }
        }
    }
    debug!("throttle stopped");
    // `tx` drops here, closing the permit stream.
}

/// Forwards points from `input` to the returned channel at `rate` points per
/// second. A disabled rate forwards without pacing.
pub fn throttle_points(
    mut input: mpsc::Receiver<Point>,
    rate: i64,
    capacity: usize,
) -> (mpsc::Receiver<Point>, Stoppable) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let task = Stoppable::start(move |cancel| async move {
        let mut throttle = Throttle::new(rate);
        let mut paced = match throttle.plan() {
            Some(plan) => {
                debug!(effective_rate = plan.rate(), "pacing points");
                true
            }
            None => false,
        };
        loop {
            let point = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                point = input.recv() => point,
            };
            let Some(point) = point else {
                break;
            };
            if paced {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    granted = throttle.acquire() => paced = granted,
                }
            }
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                res = tx.send(point) => {
                    if res.is_err() {
                        break;
                    }
                }
            }
        }
        throttle.stop().await;
    });
    (rx, task)
}
