//! Realtime Session heartbeat bookkeeping. The socket itself, and the
//! `upgrading -> open -> terminal` transitions around it, are owned by
//! `routes::rtm` (it needs `rocket_ws` types this crate's core has no
//! business knowing about); the `open` state accepts `hello`/`ack`/`pong`
//! frames in any order and any number of times, so there is no separate
//! phase to track here beyond liveness.

use std::time::{Duration, Instant};

/// Tracks ping/pong liveness for one connection. The session is closed once
/// `missed_pings_before_close` consecutive pings go unanswered.
pub struct Heartbeat {
    period: Duration,
    missed_allowed: u32,
    last_pong: Instant,
    consecutive_misses: u32,
}

impl Heartbeat {
    pub fn new(period: Duration, missed_allowed: u32) -> Self {
        Self {
            period,
            missed_allowed,
            last_pong: Instant::now(),
            consecutive_misses: 0,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn on_pong(&mut self) {
        self.last_pong = Instant::now();
        self.consecutive_misses = 0;
    }

    /// Called on every heartbeat tick, before sending a `ping` frame.
    /// Returns `true` if the session should be closed instead.
    pub fn tick(&mut self) -> bool {
        if self.last_pong.elapsed() > self.period {
            self.consecutive_misses += 1;
        }
        self.consecutive_misses >= self.missed_allowed
    }
}
