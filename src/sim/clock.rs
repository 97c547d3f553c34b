/// Elapsed-time source and the fixed-interval tick gate.
///
/// The host owns wall-clock pacing; the engine only ever sees seconds
/// elapsed since the level was loaded. Pausing is the host not advancing
/// the clock.

use std::time::Duration;

/// Default simulation tick: 0.20s.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(200);

/// Monotonic, resettable elapsed-time source.
pub trait TimeSource {
    /// Seconds since the last reset.
    fn elapsed(&self) -> f64;
    /// Move time forward by `dt` seconds.
    fn advance(&mut self, dt: f64);
    /// Back to zero. Called on level load.
    fn reset(&mut self);
}

/// Frame-delta accumulator. The host feeds it the measured frame delta;
/// tests set it directly.
#[derive(Clone, Debug, Default)]
pub struct FrameClock {
    time: f64,
}

impl FrameClock {
    pub fn new() -> Self {
        FrameClock { time: 0.0 }
    }

    pub fn set(&mut self, time: f64) {
        self.time = time;
    }
}

impl TimeSource for FrameClock {
    fn elapsed(&self) -> f64 {
        self.time
    }

    fn advance(&mut self, dt: f64) {
        if dt > 0.0 {
            self.time += dt;
        }
    }

    fn reset(&mut self) {
        self.time = 0.0;
    }
}

/// Decides which frames run a simulation tick.
///
/// Starts one interval in the past so the first frame after a load ticks
/// immediately. A tick is due once `elapsed >= last_tick + interval`; the
/// gate then re-arms from the current time, not from the ideal schedule.
#[derive(Clone, Debug)]
pub struct TickGate {
    interval: f64,
    last_tick: f64,
}

impl TickGate {
    pub fn new(interval: Duration) -> Self {
        let interval = interval.as_secs_f64();
        TickGate { interval, last_tick: -interval }
    }

    pub fn reset(&mut self) {
        self.last_tick = -self.interval;
    }

    /// Returns true (and re-arms) if a tick is due at `elapsed`.
    pub fn poll(&mut self, elapsed: f64) -> bool {
        if elapsed >= self.last_tick + self.interval {
            self.last_tick = elapsed;
            true
        } else {
            false
        }
    }
}
