//! Wall-clock sources.
//!
//! Session expiry is an absolute timestamp, so the service needs "now".
//! Reading it through a [`Clock`] lets tests jump two minutes ahead
//! without sleeping.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Something that can tell the current wall-clock time.
pub trait Clock: Send + Sync + 'static {
    /// The current time.
    fn now(&self) -> SystemTime;
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same time, so a test can hand one clone to the
/// service and keep another to advance it.
///
/// ```rust
/// use std::time::Duration;
/// use gatehouse_session::{Clock, ManualClock};
///
/// let clock = ManualClock::new();
/// let before = clock.now();
/// clock.advance(Duration::from_secs(180));
/// assert_eq!(clock.now().duration_since(before).unwrap(), Duration::from_secs(180));
/// ```
#[derive(Debug, Clone)]
pub struct ManualClock {
    /// Milliseconds since the Unix epoch.
    millis: Arc<AtomicU64>,
}

impl ManualClock {
    /// Starts at the current system time.
    pub fn new() -> Self {
        Self::starting_at(SystemTime::now())
    }

    /// Starts at the given time. Times before the epoch clamp to it.
    pub fn starting_at(start: SystemTime) -> Self {
        Self {
            millis: Arc::new(AtomicU64::new(to_millis(start))),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let by = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.millis.fetch_add(by, Ordering::SeqCst);
    }

    /// Moves the clock backward, e.g. to simulate an NTP correction.
    pub fn rewind(&self, by: Duration) {
        let by = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        let _ = self
            .millis
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |now| {
                Some(now.saturating_sub(by))
            });
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_millis(self.millis.load(Ordering::SeqCst))
    }
}

fn to_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_clones_share_time() {
        let clock = ManualClock::starting_at(UNIX_EPOCH + Duration::from_secs(1_000));
        let handle = clock.clone();

        handle.advance(Duration::from_secs(60));

        assert_eq!(clock.now(), UNIX_EPOCH + Duration::from_secs(1_060));
    }

    #[test]
    fn test_manual_clock_rewind_saturates_at_epoch() {
        let clock = ManualClock::starting_at(UNIX_EPOCH + Duration::from_secs(5));
        clock.rewind(Duration::from_secs(10));
        assert_eq!(clock.now(), UNIX_EPOCH);
    }
}
