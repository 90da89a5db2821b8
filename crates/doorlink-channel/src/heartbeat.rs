//! Ping/pong liveness bookkeeping for one connection.

use std::time::Duration;

use tokio::time::Instant;

/// Result of checking an outstanding ping against its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PingOutcome {
    /// No ping outstanding, or its deadline has not passed yet.
    Pending,
    /// The ping went unanswered; the connection is still considered alive.
    Missed { consecutive: u32 },
    /// Too many consecutive pings went unanswered.
    Dead,
}

/// Tracks the outstanding ping and the run of consecutive misses.
///
/// A fresh instance is created per connection.
#[derive(Debug)]
pub(crate) struct Heartbeat {
    timeout: Duration,
    max_missed: u32,
    awaiting_since: Option<Instant>,
    missed: u32,
}

impl Heartbeat {
    pub(crate) fn new(timeout: Duration, max_missed: u32) -> Self {
        Self {
            timeout,
            max_missed: max_missed.max(1),
            awaiting_since: None,
            missed: 0,
        }
    }

    /// Record that a ping went out at `now`.
    ///
    /// An unanswered earlier ping keeps its original deadline.
    pub(crate) fn ping_sent(&mut self, now: Instant) {
        if self.awaiting_since.is_none() {
            self.awaiting_since = Some(now);
        }
    }

    /// A pong arrived: the peer is alive.
    pub(crate) fn pong_received(&mut self) {
        self.awaiting_since = None;
        self.missed = 0;
    }

    /// Deadline of the outstanding ping, if any.
    pub(crate) fn deadline(&self) -> Option<Instant> {
        self.awaiting_since.map(|sent| sent + self.timeout)
    }

    /// Settle the outstanding ping if its deadline has passed.
    pub(crate) fn expire(&mut self, now: Instant) -> PingOutcome {
        match self.deadline() {
            Some(deadline) if deadline <= now => {
                self.awaiting_since = None;
                self.missed += 1;
                if self.missed >= self.max_missed {
                    PingOutcome::Dead
                } else {
                    PingOutcome::Missed {
                        consecutive: self.missed,
                    }
                }
            }
            _ => PingOutcome::Pending,
        }
    }
}
