use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock abstraction used to timestamp completed prints, in seconds
/// since the Unix epoch.
pub trait Clock {
    fn now_unix_secs(&self) -> f64;
}

/// Default clock backed by `std::time::SystemTime`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    #[inline]
    fn now_unix_secs(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }
}

pub mod manual {
    use super::Clock;

    /// Fixed clock for deterministic record timestamps.
    #[derive(Debug, Clone, Copy, Default, PartialEq)]
    pub struct ManualClock {
        now: f64,
    }

    impl ManualClock {
        pub fn new(now: f64) -> Self {
            Self { now }
        }
    }

    impl Clock for ManualClock {
        fn now_unix_secs(&self) -> f64 {
            self.now
        }
    }
}
