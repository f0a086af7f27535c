use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Time source for the frame loop.
pub trait Clock {
    /// Monotonic milliseconds, used to advance the timer.
    fn now(&self) -> f64;

    /// Wall-clock milliseconds since the Unix epoch, used as a live baseline.
    fn epoch_ms(&self) -> f64 {
        chrono::Utc::now().timestamp_millis() as f64
    }
}

pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Clock advanced by hand; clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
    epoch: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
            epoch: Rc::new(Cell::new(start)),
        }
    }

    pub fn advance(&self, ms: f64) {
        self.now.set(self.now.get() + ms);
        self.epoch.set(self.epoch.get() + ms);
    }

    pub fn set_epoch(&self, ms: f64) {
        self.epoch.set(ms);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.now.get()
    }

    fn epoch_ms(&self) -> f64 {
        self.epoch.get()
    }
}
