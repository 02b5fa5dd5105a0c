//! Exponential backoff with jitter for the reconnect policy.

use std::time::Duration;

use rand::Rng;

#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub cap: Duration,
    pub max_attempts: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            cap: Duration::from_secs(30),
            max_attempts: 5,
        }
    }
}

impl BackoffPolicy {
    /// `min(base * 2^attempt, cap)` with up to ±20% jitter. `attempt` is
    /// zero-based (first retry after a failure is `attempt = 0`).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.base.as_millis().saturating_mul(1u128 << attempt.min(20));
        let capped = exp.min(self.cap.as_millis());
        let jitter_frac = rand::thread_rng().gen_range(-0.2..=0.2);
        let jittered = (capped as f64 * (1.0 + jitter_frac)).max(0.0) as u64;
        Duration::from_millis(jittered)
    }

    pub fn exhausted(&self, attempt: u32) -> bool {
        attempt >= self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_with_attempt_and_stays_capped() {
        let policy = BackoffPolicy::default();
        let d0 = policy.delay_for(0);
        let d10 = policy.delay_for(10);
        assert!(d0.as_millis() <= 1_200);
        assert!(d10.as_millis() <= (policy.cap.as_millis() as u64 * 120 / 100) as u128);
    }

    #[test]
    fn exhausted_after_max_attempts() {
        let policy = BackoffPolicy::default();
        assert!(!policy.exhausted(4));
        assert!(policy.exhausted(5));
        assert!(policy.exhausted(6));
    }
}
