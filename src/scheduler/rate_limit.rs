//! Minimum-interval rate limiter
//!
//! Gates a new cycle on the time elapsed since the last successful publish
//! of any category. The boundary is inclusive: `elapsed == min_interval` is
//! allowed.

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::utils::format_seconds;

/// Outcome of a rate-limit check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateDecision {
    /// Whether the cycle may proceed
    pub allowed: bool,

    /// Allowed only because of a manual override
    pub forced: bool,

    /// Remaining wait when blocked, or skipped wait when forced
    pub remaining: Option<Duration>,

    /// Human-readable explanation
    pub explanation: String,
}

impl RateDecision {
    fn allow(explanation: impl Into<String>) -> Self {
        Self {
            allowed: true,
            forced: false,
            remaining: None,
            explanation: explanation.into(),
        }
    }
}

/// Rate limiter configured with the minimum interval
#[derive(Debug, Clone, Copy)]
pub struct RateLimiter {
    min_interval: Duration,
    allow_force: bool,
}

impl RateLimiter {
    /// Create a limiter
    ///
    /// `allow_force` controls whether a manual override is honored at all.
    pub fn new(min_interval: Duration, allow_force: bool) -> Self {
        Self {
            min_interval,
            allow_force,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Check whether a new publication may start at `now`
    pub fn can_publish(
        &self,
        last: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        manual_override: bool,
    ) -> RateDecision {
        let Some(last) = last else {
            return RateDecision::allow("first publication");
        };

        let elapsed = now - last;
        if elapsed >= self.min_interval {
            return RateDecision::allow(format!(
                "{} elapsed since last publication",
                format_seconds(elapsed.num_seconds())
            ));
        }

        let remaining = self.min_interval - elapsed;
        let wait = format_seconds(remaining.num_seconds());

        if manual_override && self.allow_force {
            warn!(remaining = %wait, "Manual override skips the minimum interval");
            return RateDecision {
                allowed: true,
                forced: true,
                remaining: Some(remaining),
                explanation: format!("forced publication, {wait} early"),
            };
        }

        if manual_override {
            info!("Manual override requested but forcing is disabled in configuration");
        }

        RateDecision {
            allowed: false,
            forced: false,
            remaining: Some(remaining),
            explanation: format!("wait {wait} before the next publication"),
        }
    }
}

/// Advance the gate timestamp without ever moving it backwards
pub fn advance_gate(previous: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    match previous {
        Some(prev) if prev > now => prev,
        _ => now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap()
    }

    fn limiter() -> RateLimiter {
        RateLimiter::new(Duration::minutes(30), true)
    }

    #[test]
    fn test_first_publication_allowed() {
        let decision = limiter().can_publish(None, base(), false);
        assert!(decision.allowed);
        assert!(!decision.forced);
        assert_eq!(decision.explanation, "first publication");
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let now = base() + Duration::minutes(30);
        assert!(limiter().can_publish(Some(base()), now, false).allowed);

        let just_before = now - Duration::seconds(1);
        let decision = limiter().can_publish(Some(base()), just_before, false);
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, Some(Duration::seconds(1)));
    }

    #[test]
    fn test_override_is_flagged_forced() {
        let now = base() + Duration::minutes(10);
        let decision = limiter().can_publish(Some(base()), now, true);
        assert!(decision.allowed);
        assert!(decision.forced);
        assert_eq!(decision.remaining, Some(Duration::minutes(20)));
    }

    #[test]
    fn test_override_ignored_when_disabled() {
        let limiter = RateLimiter::new(Duration::minutes(30), false);
        let now = base() + Duration::minutes(10);
        let decision = limiter.can_publish(Some(base()), now, true);
        assert!(!decision.allowed);
        assert!(decision.explanation.contains("20m 00s"));
    }

    #[test]
    fn test_advance_gate_never_moves_backwards() {
        let later = base() + Duration::hours(1);
        assert_eq!(advance_gate(Some(later), base()), later);
        assert_eq!(advance_gate(Some(base()), later), later);
        assert_eq!(advance_gate(None, base()), base());
    }
}
