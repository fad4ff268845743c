//! Hysteresis engine deciding when to raise or drop the shield.
//!
//! Pure logic. The caller samples the host and loads the marker, then asks
//! [`ShieldPolicy::decide`] what to do. At most one remote toggle follows
//! from any decision.
//!
//! | load vs threshold | marker                      | decision                 |
//! |-------------------|-----------------------------|--------------------------|
//! | above             | present, age <= cooldown    | `NoOp(RecentlyEnabled)`  |
//! | above             | absent / invalid / stale    | `EnableShield`           |
//! | at or below       | absent                      | `NoOp(NoMarker)`         |
//! | at or below       | invalid                     | `NoOp(InvalidMarker)`    |
//! | at or below       | present, age > cooldown     | `DisableShield`          |
//! | at or below       | present, age <= cooldown    | `NoOp(CoolingDown)`      |

use chrono::{Duration, NaiveDateTime};

use crate::error::CoreError;
use crate::marker::MarkerState;

/// Default 1-minute load average above which the shield is raised.
pub const DEFAULT_LOAD_THRESHOLD: f64 = 80.0;

/// Default minimum time the shield stays up after being enabled.
pub const DEFAULT_COOLDOWN_MINUTES: i64 = 15;

/// What the controller should do this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleDecision {
    EnableShield,
    DisableShield,
    NoOp(NoOpReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoOpReason {
    /// Load is high but the shield was enabled inside the cooldown window.
    RecentlyEnabled,
    /// Load is normal and the shield is still inside its cooldown window.
    CoolingDown,
    /// Load is normal and no shield is active.
    NoMarker,
    /// Load is normal and the stored marker is unreadable; it must be removed.
    InvalidMarker,
}

/// Threshold and cooldown applied to every sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShieldPolicy {
    threshold: f64,
    cooldown: Duration,
}

impl Default for ShieldPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_LOAD_THRESHOLD,
            cooldown: Duration::minutes(DEFAULT_COOLDOWN_MINUTES),
        }
    }
}

impl ShieldPolicy {
    /// Build a policy, rejecting thresholds that are negative or not finite
    /// and cooldowns shorter than one minute.
    pub fn new(threshold: f64, cooldown_minutes: i64) -> Result<Self, CoreError> {
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(CoreError::Validation(format!(
                "load threshold must be a finite, non-negative number, got {threshold}"
            )));
        }
        if cooldown_minutes < 1 {
            return Err(CoreError::Validation(format!(
                "cooldown must be at least 1 minute, got {cooldown_minutes}"
            )));
        }
        let cooldown = Duration::try_minutes(cooldown_minutes).ok_or_else(|| {
            CoreError::Validation(format!(
                "cooldown of {cooldown_minutes} minutes is out of range"
            ))
        })?;
        Ok(Self {
            threshold,
            cooldown,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Whether `load1` strictly exceeds the threshold.
    pub fn is_overloaded(&self, load1: f64) -> bool {
        load1 > self.threshold
    }

    /// Decide the action for one sample given the current marker.
    pub fn decide(&self, load1: f64, marker: &MarkerState, now: NaiveDateTime) -> ToggleDecision {
        let within_cooldown = marker
            .marker()
            .map(|m| m.age(now) <= self.cooldown);

        if self.is_overloaded(load1) {
            return match within_cooldown {
                Some(true) => ToggleDecision::NoOp(NoOpReason::RecentlyEnabled),
                // Stale markers are re-asserted: enable again and refresh.
                _ => ToggleDecision::EnableShield,
            };
        }

        match (marker, within_cooldown) {
            (MarkerState::Absent, _) => ToggleDecision::NoOp(NoOpReason::NoMarker),
            (MarkerState::Invalid(_), _) => ToggleDecision::NoOp(NoOpReason::InvalidMarker),
            (MarkerState::Present(_), Some(false)) => ToggleDecision::DisableShield,
            (MarkerState::Present(_), _) => ToggleDecision::NoOp(NoOpReason::CoolingDown),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marker::ShieldMarker;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn aged(minutes: i64) -> MarkerState {
        MarkerState::Present(ShieldMarker::new(now() - Duration::minutes(minutes)))
    }

    #[test]
    fn default_policy_matches_constants() {
        let policy = ShieldPolicy::default();
        assert_eq!(policy.threshold(), 80.0);
        assert_eq!(policy.cooldown(), Duration::minutes(15));
    }

    #[test]
    fn rejects_bad_thresholds() {
        assert!(ShieldPolicy::new(-1.0, 15).is_err());
        assert!(ShieldPolicy::new(f64::NAN, 15).is_err());
        assert!(ShieldPolicy::new(f64::INFINITY, 15).is_err());
        assert!(ShieldPolicy::new(0.0, 15).is_ok());
    }

    #[test]
    fn rejects_short_cooldown() {
        assert!(ShieldPolicy::new(80.0, 0).is_err());
        assert!(ShieldPolicy::new(80.0, 1).is_ok());
    }

    #[test]
    fn rejects_cooldown_beyond_duration_range() {
        assert!(ShieldPolicy::new(80.0, i64::MAX).is_err());
    }

    #[test]
    fn high_load_without_marker_enables() {
        let policy = ShieldPolicy::default();
        let decision = policy.decide(85.0, &MarkerState::Absent, now());
        assert_eq!(decision, ToggleDecision::EnableShield);
    }

    #[test]
    fn high_load_with_invalid_marker_enables() {
        let policy = ShieldPolicy::default();
        let decision = policy.decide(85.0, &MarkerState::Invalid(String::new()), now());
        assert_eq!(decision, ToggleDecision::EnableShield);
    }

    #[test]
    fn high_load_with_recent_marker_skips() {
        let policy = ShieldPolicy::default();
        assert_eq!(
            policy.decide(85.0, &aged(3), now()),
            ToggleDecision::NoOp(NoOpReason::RecentlyEnabled)
        );
        // Exactly at the window edge still counts as recent.
        assert_eq!(
            policy.decide(85.0, &aged(15), now()),
            ToggleDecision::NoOp(NoOpReason::RecentlyEnabled)
        );
    }

    #[test]
    fn high_load_with_stale_marker_enables_again() {
        let policy = ShieldPolicy::default();
        assert_eq!(policy.decide(85.0, &aged(16), now()), ToggleDecision::EnableShield);
    }

    #[test]
    fn load_equal_to_threshold_is_not_overloaded() {
        let policy = ShieldPolicy::default();
        assert_eq!(
            policy.decide(80.0, &MarkerState::Absent, now()),
            ToggleDecision::NoOp(NoOpReason::NoMarker)
        );
    }

    #[test]
    fn normal_load_with_invalid_marker_requests_cleanup() {
        let policy = ShieldPolicy::default();
        assert_eq!(
            policy.decide(50.0, &MarkerState::Invalid("garbage".into()), now()),
            ToggleDecision::NoOp(NoOpReason::InvalidMarker)
        );
    }

    #[test]
    fn normal_load_after_cooldown_disables() {
        let policy = ShieldPolicy::default();
        assert_eq!(policy.decide(50.0, &aged(20), now()), ToggleDecision::DisableShield);
    }

    #[test]
    fn normal_load_inside_cooldown_waits() {
        let policy = ShieldPolicy::default();
        assert_eq!(
            policy.decide(50.0, &aged(15), now()),
            ToggleDecision::NoOp(NoOpReason::CoolingDown)
        );
    }

    #[test]
    fn future_marker_counts_as_recent() {
        let policy = ShieldPolicy::default();
        assert_eq!(
            policy.decide(50.0, &aged(-30), now()),
            ToggleDecision::NoOp(NoOpReason::CoolingDown)
        );
    }

    #[test]
    fn custom_cooldown_is_honoured() {
        let policy = ShieldPolicy::new(4.0, 5).unwrap();
        assert_eq!(policy.decide(1.0, &aged(6), now()), ToggleDecision::DisableShield);
        assert_eq!(
            policy.decide(1.0, &aged(4), now()),
            ToggleDecision::NoOp(NoOpReason::CoolingDown)
        );
    }
}
