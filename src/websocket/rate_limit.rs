use tokio::time::{Duration, Instant};

/// Drawing traffic is legitimately bursty, so the cap is high.
pub const RATE_LIMIT: u32 = 100;
pub const RATE_WINDOW: Duration = Duration::from_millis(1000);

#[derive(Debug, PartialEq, Eq)]
pub enum RateVerdict {
    Allowed,
    /// Dropped, and the sender should be told to slow down.
    DroppedWithWarning,
    /// Dropped silently; the warning for this window was already sent.
    Dropped,
}

/// Per-connection event counter over a sliding one-second window. Gates
/// every intent before it reaches a room; violations drop the intent and
/// warn once per window, never disconnect.
#[derive(Debug)]
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    count: u32,
    window_start: Instant,
    warned: bool,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            count: 0,
            window_start: Instant::now(),
            warned: false,
        }
    }

    pub fn check(&mut self) -> RateVerdict {
        self.check_at(Instant::now())
    }

    /// Clock-injected variant so the window math is testable.
    pub fn check_at(&mut self, now: Instant) -> RateVerdict {
        if now.duration_since(self.window_start) > self.window {
            self.window_start = now;
            self.count = 0;
            self.warned = false;
        }

        self.count += 1;
        if self.count <= self.limit {
            RateVerdict::Allowed
        } else if !self.warned {
            self.warned = true;
            RateVerdict::DroppedWithWarning
        } else {
            RateVerdict::Dropped
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RATE_LIMIT, RATE_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_up_to_the_cap() {
        let mut limiter = RateLimiter::new(5, Duration::from_secs(1));
        let now = Instant::now();
        for _ in 0..5 {
            assert_eq!(limiter.check_at(now), RateVerdict::Allowed);
        }
    }

    #[test]
    fn test_cap_plus_one_is_rejected_with_single_warning() {
        let mut limiter = RateLimiter::new(5, Duration::from_secs(1));
        let now = Instant::now();
        for _ in 0..5 {
            limiter.check_at(now);
        }
        assert_eq!(limiter.check_at(now), RateVerdict::DroppedWithWarning);
        assert_eq!(limiter.check_at(now), RateVerdict::Dropped);
        assert_eq!(limiter.check_at(now), RateVerdict::Dropped);
    }

    #[test]
    fn test_window_expiry_resets_count_and_warning() {
        let mut limiter = RateLimiter::new(2, Duration::from_secs(1));
        let start = Instant::now();
        limiter.check_at(start);
        limiter.check_at(start);
        assert_eq!(limiter.check_at(start), RateVerdict::DroppedWithWarning);

        let later = start + Duration::from_millis(1500);
        assert_eq!(limiter.check_at(later), RateVerdict::Allowed);
        limiter.check_at(later);
        // New window, new single warning.
        assert_eq!(limiter.check_at(later), RateVerdict::DroppedWithWarning);
    }
}
