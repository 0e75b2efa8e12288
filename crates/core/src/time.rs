use chrono::{DateTime, Duration, Utc};

/// A simple clock abstraction for deterministic time in services and tests.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// Returns a clock that uses the current system time.
    #[must_use]
    pub fn default_clock() -> Self {
        Self::Default
    }

    /// Returns a clock fixed at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    /// Returns the current time according to the clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// If this is a fixed clock, advance it by the given duration.
    ///
    /// Has no effect on `Clock::Default`.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }
}

/// Wall-clock study time of a signed-in session.
///
/// Accrues monotonically between `start` and `stop`; idle time counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StudyTimer {
    running_since: Option<DateTime<Utc>>,
    banked: Duration,
}

impl Default for StudyTimer {
    fn default() -> Self {
        Self {
            running_since: None,
            banked: Duration::zero(),
        }
    }
}

impl StudyTimer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts accruing. Calling it while running keeps the original start.
    pub fn start(&mut self, now: DateTime<Utc>) {
        if self.running_since.is_none() {
            self.running_since = Some(now);
        }
    }

    /// Stops accruing and banks the elapsed span.
    pub fn stop(&mut self, now: DateTime<Utc>) {
        if let Some(since) = self.running_since.take() {
            self.banked += non_negative(now - since);
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    /// Total accrued time as of `now`.
    #[must_use]
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        match self.running_since {
            Some(since) => self.banked + non_negative(now - since),
            None => self.banked,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

// A clock stepping backwards must not shrink the accrued time.
fn non_negative(span: Duration) -> Duration {
    span.max(Duration::zero())
}

/// Deterministic timestamp for tests and examples (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests and doc examples.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns a `Clock` fixed at the deterministic test timestamp.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}
