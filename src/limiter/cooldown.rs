//! Cooldown state machine.
//!
//! An account is either `Active` or `Cooling` until `cooldown_until`. Expiry is
//! evaluated lazily against the clock; nothing has to run when it passes.

use chrono::{DateTime, Duration, Utc};

use super::detector::{Severity, clamp_score};
use crate::config::CooldownConfig;
use crate::state::AccountProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownState {
    Active,
    Cooling { until: DateTime<Utc> },
}

impl CooldownState {
    pub fn is_cooling(&self) -> bool {
        matches!(self, CooldownState::Cooling { .. })
    }
}

/// Current state of the account at `now`.
pub fn state(profile: &AccountProfile, now: DateTime<Utc>) -> CooldownState {
    match profile.cooldown_until {
        Some(until) if until > now => CooldownState::Cooling { until },
        _ => CooldownState::Active,
    }
}

/// Cooldown length for a severity.
pub fn duration_for(severity: Severity, config: &CooldownConfig) -> Duration {
    let minutes = match severity {
        Severity::Warning => config.warning_minutes,
        Severity::Critical => config.critical_minutes,
        Severity::Suspension => config.suspension_minutes,
    };
    Duration::minutes(minutes)
}

/// Put the account into cooldown and nudge its suspicion score up by `bump`.
/// Returns the expiry.
pub fn trigger(
    profile: &mut AccountProfile,
    severity: Severity,
    now: DateTime<Utc>,
    config: &CooldownConfig,
    bump: f64,
) -> DateTime<Utc> {
    let until = now + duration_for(severity, config);
    profile.cooldown_until = Some(until);
    profile.suspicious_activity_score = clamp_score(profile.suspicious_activity_score + bump);
    until
}

/// Drop any cooldown, expired or not.
pub fn clear(profile: &mut AccountProfile) {
    profile.cooldown_until = None;
}
