use bson::DateTime;

/// A source of wall-clock time, injected into the runner so deadline and timing
/// behavior are testable.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime;
}

/// The system wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime {
        DateTime::now()
    }
}
