//! Poll pacing and cooperative cancellation for the join loop.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tokio::{sync::Notify, time::sleep};
use trait_variant::make;

/// Waits between two consecutive status polls
#[make(Send)]
pub trait Pacer {
    async fn pause(&self);
}

/// Sleeps a fixed interval between polls
#[derive(Clone, Copy, Debug)]
pub struct IntervalPacer {
    interval: Duration,
}

impl IntervalPacer {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Pacer for IntervalPacer {
    async fn pause(&self) {
        if !self.interval.is_zero() {
            sleep(self.interval).await;
        }
    }
}

/// Polls back to back
#[derive(Clone, Copy, Debug, Default)]
pub struct NoPacing;

impl Pacer for NoPacing {
    async fn pause(&self) {}
}

/// Cancellation flag shared between the join loop and whoever may interrupt it.
///
/// The loop looks at it once per iteration and also races every card
/// transaction and pause against [`CancelToken::cancelled`].
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<CancelState>);

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.cancelled.store(true, Ordering::SeqCst);
        self.0.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`CancelToken::cancel`] has been called on any clone
    pub async fn cancelled(&self) {
        loop {
            let notified = self.0.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}
