use crate::error::Result;
use std::time::{Duration, Instant};
use tracing::trace;

/// Shortest sleep between polls once the first check has failed.
const MIN_POLL: Duration = Duration::from_millis(1);

/// Exponential poll interval, doubling from `initial` up to `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
}

impl Backoff {
    pub const fn new(initial: Duration, max: Duration) -> Self {
        Self { initial, max }
    }

    fn next(&self, current: Duration) -> Duration {
        (current * 2).clamp(MIN_POLL, self.max.max(MIN_POLL))
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(1), Duration::from_millis(32))
    }
}

/// Polls `check` until it yields a value or `timeout` elapses.
///
/// `check` always runs at least once. Returns `Ok(None)` on timeout; errors
/// from `check` end the wait immediately.
pub fn poll_until<T>(
    backoff: Backoff,
    timeout: Duration,
    mut check: impl FnMut() -> Result<Option<T>>,
) -> Result<Option<T>> {
    let start = Instant::now();
    let mut delay = backoff.initial;
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        if let Some(value) = check()? {
            return Ok(Some(value));
        }

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            trace!("poll gave up after {} attempts ({:?})", attempts, elapsed);
            return Ok(None);
        }

        pause(delay.min(timeout - elapsed));
        delay = backoff.next(delay);
    }
}

/// Sleeps unless `duration` is zero.
pub fn pause(duration: Duration) {
    if !duration.is_zero() {
        std::thread::sleep(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let b = Backoff::new(Duration::from_millis(4), Duration::from_millis(10));
        assert_eq!(b.next(Duration::from_millis(4)), Duration::from_millis(8));
        assert_eq!(b.next(Duration::from_millis(8)), Duration::from_millis(10));
    }

    #[test]
    fn test_backoff_never_stays_at_zero() {
        let b = Backoff::new(Duration::ZERO, Duration::ZERO);
        assert_eq!(b.next(Duration::ZERO), MIN_POLL);
        assert_eq!(b.next(MIN_POLL), MIN_POLL);
    }

    #[test]
    fn test_zero_backoff_does_not_spin() {
        let mut calls = 0;
        let backoff = Backoff::new(Duration::ZERO, Duration::ZERO);
        let res: Option<()> = poll_until(backoff, Duration::from_millis(30), || {
            calls += 1;
            Ok(None)
        })
        .expect("poll");
        assert_eq!(res, None);
        assert!(calls < 40, "polled {} times in 30ms", calls);
    }

    #[test]
    fn test_poll_until_ready() {
        let mut calls = 0;
        let res = poll_until(Backoff::default(), Duration::from_secs(1), || {
            calls += 1;
            Ok((calls == 3).then_some(calls))
        })
        .expect("poll");
        assert_eq!(res, Some(3));
    }

    #[test]
    fn test_poll_until_timeout_runs_once() {
        let mut calls = 0;
        let res: Option<()> = poll_until(Backoff::default(), Duration::ZERO, || {
            calls += 1;
            Ok(None)
        })
        .expect("poll");
        assert_eq!(res, None);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_poll_until_propagates_errors() {
        let res: Result<Option<()>> = poll_until(Backoff::default(), Duration::from_secs(1), || {
            Err(Error::IndicatorNotFound)
        });
        assert!(matches!(res, Err(Error::IndicatorNotFound)));
    }
}
