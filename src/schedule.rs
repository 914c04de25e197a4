//! The wait/execute loop around the [`Poller`].
//!
//! ```text
//! Idle ─► Polling ─► Sleeping ─► Idle ─► …
//! ```
//!
//! The loop owns all wall-clock pacing: it decides what "today" is for each
//! cycle and how long to wait before the next one.  Sleeping is a timed wait
//! on a stop channel, so whoever holds the sender can end the loop between
//! cycles.  A cycle that has started always runs to completion.

use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

use chrono::{Local, NaiveDate};

use crate::poll::{CycleReport, Poller};
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum LoopState {
    Idle,
    Polling,
    Sleeping,
}

pub struct Scheduler<T> {
    poller: Poller<T>,
    interval: Duration,
    clock: fn() -> NaiveDate,
}

impl<T: Transport> Scheduler<T> {
    pub fn new(poller: Poller<T>, interval: Duration) -> Self {
        Self {
            poller,
            interval,
            clock: local_today,
        }
    }

    /// Run one cycle with the current date.
    pub fn run_once(&self) -> CycleReport {
        let today = (self.clock)();
        let report = self.poller.run_cycle(today);
        for source in &report.sources {
            tracing::debug!(
                source = %source.source,
                fetch_failed = source.fetch_failed,
                fetched = source.fetched,
                notified = source.notified,
                suppressed = source.suppressed,
                store_failures = source.store_failures,
                dispatch_failures = source.dispatch_failures,
                "source polled"
            );
        }
        tracing::info!(
            %today,
            notified = report.notified(),
            failures = report.failures(),
            "poll cycle done"
        );
        report
    }

    /// Poll, sleep, repeat until `stop` receives a message or its sender is
    /// dropped.  Returns the number of cycles run.
    pub fn run(&self, stop: &Receiver<()>) -> usize {
        let mut cycles = 0;
        let mut state = LoopState::Idle;
        loop {
            state = transition(state, LoopState::Polling);
            self.run_once();
            cycles += 1;

            state = transition(state, LoopState::Sleeping);
            tracing::info!(minutes = self.interval.as_secs() / 60, "next cycle scheduled");
            match stop.recv_timeout(self.interval) {
                Err(RecvTimeoutError::Timeout) => {
                    state = transition(state, LoopState::Idle);
                }
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    tracing::info!(cycles, "scheduler stopped");
                    return cycles;
                }
            }
        }
    }
}

fn transition(from: LoopState, to: LoopState) -> LoopState {
    tracing::debug!(?from, ?to, "scheduler state");
    to
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
