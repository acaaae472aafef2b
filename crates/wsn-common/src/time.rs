/// Monotonic time in milliseconds since an arbitrary epoch fixed at
/// `InterfaceContext` creation. Never wall-clock: the whole core reasons in
/// terms of deadlines and elapsed intervals, never calendar time.
pub type MonoMs = u64;

/// Source of monotonic time, abstracted so engine tests can drive a fake
/// clock instead of `Instant::now()`.
pub trait Clock {
    fn now_ms(&self) -> MonoMs;
}

/// Real wall clock, rooted at construction time.
pub struct SystemClock {
    start: std::time::Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock {
            start: std::time::Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> MonoMs {
        self.start.elapsed().as_millis() as u64
    }
}

/// Fake clock for tests: advances only when told to.
#[derive(Default)]
pub struct FakeClock {
    now: std::cell::Cell<MonoMs>,
}

impl FakeClock {
    pub fn new() -> Self {
        FakeClock {
            now: std::cell::Cell::new(0),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn set(&self, ms: u64) {
        self.now.set(ms);
    }
}

impl Clock for FakeClock {
    fn now_ms(&self) -> MonoMs {
        self.now.get()
    }
}
