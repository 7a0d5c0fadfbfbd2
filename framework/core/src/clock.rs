use std::fmt::Debug;
use std::time::Instant;

/// Source of the start and end timestamps for a query execution.
///
/// Latency is always measured on the clock of the client that ran the query, so a fake client can
/// control exactly what a trial observes.
pub trait Clock: Debug + Send + Sync {
    fn now(&self) -> Instant;
}

/// The wall clock, backed by [Instant::now].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
