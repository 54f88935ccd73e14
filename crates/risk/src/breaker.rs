use chrono::{DateTime, Duration, Utc};

/// A consecutive-failure circuit breaker for the order path.
///
/// Every gateway connectivity error or order failure counts; any success
/// resets the streak. Once the streak reaches the threshold the breaker
/// opens and stays open until an explicit reset, and resets are only
/// accepted after the cooldown has elapsed. Tripping is sticky on purpose:
/// a venue that just failed five times in a row does not get retried the
/// moment a timer expires.
#[derive(Debug)]
pub struct CircuitBreaker {
    threshold: u32,
    cooldown: Duration,
    consecutive_failures: u32,
    opened_at: Option<DateTime<Utc>>,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            threshold,
            cooldown,
            consecutive_failures: 0,
            opened_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.opened_at.is_some()
    }

    /// Records one failure. Returns true if this failure tripped the breaker.
    pub fn record_failure(&mut self, now: DateTime<Utc>) -> bool {
        self.consecutive_failures += 1;
        if self.opened_at.is_none() && self.consecutive_failures >= self.threshold {
            self.opened_at = Some(now);
            tracing::error!(
                failures = self.consecutive_failures,
                "circuit breaker tripped"
            );
            return true;
        }
        false
    }

    /// Records one success, which ends any failure streak. A success does not
    /// close an already-open breaker; only `try_reset` does.
    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    /// Attempts to close the breaker. Refused while the cooldown is still
    /// running; returns true once the breaker is closed again.
    pub fn try_reset(&mut self, now: DateTime<Utc>) -> bool {
        match self.opened_at {
            None => true,
            Some(opened_at) if now - opened_at >= self.cooldown => {
                self.opened_at = None;
                self.consecutive_failures = 0;
                tracing::info!("circuit breaker reset");
                true
            }
            Some(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trips_exactly_at_the_threshold() {
        let now = Utc::now();
        let mut breaker = CircuitBreaker::new(5, Duration::seconds(300));
        for _ in 0..4 {
            assert!(!breaker.record_failure(now));
            assert!(!breaker.is_open());
        }
        assert!(breaker.record_failure(now));
        assert!(breaker.is_open());
    }

    #[test]
    fn success_resets_the_streak() {
        let now = Utc::now();
        let mut breaker = CircuitBreaker::new(3, Duration::seconds(300));
        breaker.record_failure(now);
        breaker.record_failure(now);
        breaker.record_success();
        breaker.record_failure(now);
        breaker.record_failure(now);
        assert!(!breaker.is_open());
    }

    #[test]
    fn reset_is_refused_during_cooldown() {
        let now = Utc::now();
        let mut breaker = CircuitBreaker::new(1, Duration::seconds(300));
        breaker.record_failure(now);
        assert!(breaker.is_open());

        assert!(!breaker.try_reset(now + Duration::seconds(299)));
        assert!(breaker.is_open());

        assert!(breaker.try_reset(now + Duration::seconds(300)));
        assert!(!breaker.is_open());
    }

    #[test]
    fn success_alone_does_not_close_an_open_breaker() {
        let now = Utc::now();
        let mut breaker = CircuitBreaker::new(1, Duration::seconds(300));
        breaker.record_failure(now);
        breaker.record_success();
        assert!(breaker.is_open());
    }
}
