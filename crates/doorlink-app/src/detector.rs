//! Doorbell ring detection
//!
//! A bell produces a burst of high analog readings. Ringing is declared when
//! at least `count_threshold` above-threshold samples land inside one window
//! of `period_ms`, measured from the first such sample. Once the window has
//! elapsed the count starts over.
//!
//! Each call to [`RingDetector::step`] runs, in order: count the sample,
//! recompute the ringing flag, report a transition if it changed, then reset
//! the count if the window has elapsed.

use doorlink_core::prelude::*;

/// Detection thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingDetectorConfig {
    /// Readings strictly above this count toward a ring
    pub analog_threshold: u16,
    /// Samples needed within one window
    pub count_threshold: u32,
    /// Window length in milliseconds
    pub period_ms: u64,
}

impl Default for RingDetectorConfig {
    fn default() -> Self {
        Self {
            analog_threshold: 200,
            count_threshold: 10,
            period_ms: 500,
        }
    }
}

/// Persistent detector state between samples
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RingDetectorState {
    /// Diagnostic only; never affects detection
    pub last_sample_value: Option<u16>,
    pub consecutive_above_threshold_count: u32,
    /// Monotonic time of the first above-threshold sample in the window
    pub window_start_ms: u64,
    pub is_ringing: bool,
}

/// A ringing transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingEdge {
    pub ringing: bool,
    /// Monotonic time of the sample that caused the transition
    pub at_ms: u64,
}

#[derive(Debug, Clone, Default)]
pub struct RingDetector {
    config: RingDetectorConfig,
    state: RingDetectorState,
}

impl RingDetector {
    pub fn new(config: RingDetectorConfig) -> Self {
        Self {
            config,
            state: RingDetectorState::default(),
        }
    }

    pub fn state(&self) -> &RingDetectorState {
        &self.state
    }

    pub fn is_ringing(&self) -> bool {
        self.state.is_ringing
    }

    /// Feed one sample taken at `now_ms`. Returns the transition, if any.
    pub fn step(&mut self, sample: u16, now_ms: u64) -> Option<RingEdge> {
        let state = &mut self.state;

        if state.last_sample_value != Some(sample) {
            trace!("[doorbell] sample changed: {}", sample);
            state.last_sample_value = Some(sample);
        }

        if sample > self.config.analog_threshold {
            if state.consecutive_above_threshold_count == 0 {
                state.window_start_ms = now_ms;
            }
            state.consecutive_above_threshold_count =
                state.consecutive_above_threshold_count.saturating_add(1);
        }

        let elapsed = now_ms.saturating_sub(state.window_start_ms);
        let ringing = state.consecutive_above_threshold_count >= self.config.count_threshold
            && elapsed <= self.config.period_ms;

        let edge = if ringing != state.is_ringing {
            state.is_ringing = ringing;
            info!(
                "[doorbell] ring {} at {}ms",
                if ringing { "started" } else { "stopped" },
                now_ms
            );
            Some(RingEdge {
                ringing,
                at_ms: now_ms,
            })
        } else {
            None
        };

        if elapsed > self.config.period_ms {
            state.consecutive_above_threshold_count = 0;
        }

        edge
    }
}
