//! Heartbeat clock — owns tick state and pause.

use crate::types::{RunId, Tick};
use serde::{Deserialize, Serialize};

/// Seconds between beats in the live dashboard.
pub const HEARTBEAT_INTERVAL_SECS: u64 = 5;

/// The displayed beat wraps here.
pub const HEARTBEAT_WRAP: Tick = 10_000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Heartbeat {
    pub run_id:       RunId,
    /// Monotonic. The event log is keyed by this, never by the wrapped beat.
    pub current_tick: Tick,
    pub paused:       bool,
}

impl Heartbeat {
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            current_tick: 0,
            paused: true,
        }
    }

    /// Advance one tick. Returns the new tick number.
    /// Panics if called while paused — callers must check.
    pub fn advance(&mut self) -> Tick {
        assert!(!self.paused, "advance() called on paused heartbeat");
        self.current_tick += 1;
        self.current_tick
    }

    pub fn pause(&mut self)  { self.paused = true;  }
    pub fn resume(&mut self) { self.paused = false; }

    /// The counter the dashboard header shows.
    pub fn beat(&self) -> Tick {
        self.current_tick % HEARTBEAT_WRAP
    }

    /// Wall-clock seconds the live dashboard would need to reach this tick.
    pub fn elapsed_secs(&self) -> u64 {
        self.current_tick * HEARTBEAT_INTERVAL_SECS
    }
}
