//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("rate_limits.tiers.{tier}.{action}: min {min} exceeds max {max}")]
    InvertedRange {
        tier: &'static str,
        action: &'static str,
        min: u32,
        max: u32,
    },
    #[error("rate_limits.tiers.{tier}.{action}.max must be positive")]
    ZeroQuota {
        tier: &'static str,
        action: &'static str,
    },
    #[error("rate_limits.delay: min_ms {0} exceeds max_ms {1}")]
    InvertedDelay(u64, u64),
    #[error("{0} must be within [0, 1], got {1}")]
    OutOfUnitRange(&'static str, f64),
    #[error("{0} must be positive")]
    NotPositive(&'static str),
    #[error("rate_limits.weekly_cap {0} exceeds monthly_cap {1}")]
    WeeklyExceedsMonthly(u32, u32),
    #[error("rate_limits.ledger.retention {retention} is smaller than {window_name} {window}")]
    RetentionTooSmall {
        retention: usize,
        window_name: &'static str,
        window: usize,
    },
    #[error("rate_limits.utc_offset_minutes must be within ±1439, got {0}")]
    BadUtcOffset(i32),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let rl = &config.rate_limits;

    // Tier ranges
    for (tier, limits) in [
        ("new", &rl.tiers.new),
        ("established", &rl.tiers.established),
        ("premium", &rl.tiers.premium),
    ] {
        for (action, range) in limits.ranges() {
            if range.max == 0 {
                errors.push(ValidationError::ZeroQuota { tier, action });
            }
            if range.min > range.max {
                errors.push(ValidationError::InvertedRange {
                    tier,
                    action,
                    min: range.min,
                    max: range.max,
                });
            }
        }
    }

    // Caps
    if rl.weekly_cap == 0 {
        errors.push(ValidationError::NotPositive("rate_limits.weekly_cap"));
    }
    if rl.monthly_cap == 0 {
        errors.push(ValidationError::NotPositive("rate_limits.monthly_cap"));
    }
    if rl.weekly_cap > rl.monthly_cap {
        errors.push(ValidationError::WeeklyExceedsMonthly(rl.weekly_cap, rl.monthly_cap));
    }

    // Delay
    if rl.delay.min_ms > rl.delay.max_ms {
        errors.push(ValidationError::InvertedDelay(rl.delay.min_ms, rl.delay.max_ms));
    }

    // Fractions
    for (name, value) in [
        ("rate_limits.suspicion.rejection_rate_threshold", rl.suspicion.rejection_rate_threshold),
        ("rate_limits.suspicion.score_threshold", rl.suspicion.score_threshold),
        ("rate_limits.suspicion.rejection_score_threshold", rl.suspicion.rejection_score_threshold),
        ("rate_limits.suspicion.trigger_bump", rl.suspicion.trigger_bump),
        ("rate_limits.adjustment.high_success_threshold", rl.adjustment.high_success_threshold),
        ("rate_limits.adjustment.low_success_threshold", rl.adjustment.low_success_threshold),
        ("rate_limits.adjustment.low_success_penalty", rl.adjustment.low_success_penalty),
        ("rate_limits.delay.fast_success_threshold", rl.delay.fast_success_threshold),
    ] {
        if !(0.0..=1.0).contains(&value) {
            errors.push(ValidationError::OutOfUnitRange(name, value));
        }
    }

    // Cooldowns
    for (name, minutes) in [
        ("rate_limits.cooldown.warning_minutes", rl.cooldown.warning_minutes),
        ("rate_limits.cooldown.critical_minutes", rl.cooldown.critical_minutes),
        ("rate_limits.cooldown.suspension_minutes", rl.cooldown.suspension_minutes),
    ] {
        if minutes <= 0 {
            errors.push(ValidationError::NotPositive(name));
        }
    }

    if rl.suspicion.rapid_action_threshold == 0 {
        errors.push(ValidationError::NotPositive("rate_limits.suspicion.rapid_action_threshold"));
    }

    // Ledger must retain at least one full window
    for (window_name, window) in [
        ("rate_limits.ledger.stats_window", rl.ledger.stats_window),
        ("rate_limits.suspicion.score_window", rl.suspicion.score_window),
    ] {
        if rl.ledger.retention < window {
            errors.push(ValidationError::RetentionTooSmall {
                retention: rl.ledger.retention,
                window_name,
                window,
            });
        }
    }

    if rl.utc_offset_minutes.abs() >= 24 * 60 {
        errors.push(ValidationError::BadUtcOffset(rl.utc_offset_minutes));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_pass() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_inverted_tier_range_fails() {
        let toml = r#"
[rate_limits.tiers.new]
connections = { min = 12, max = 10 }
messages = { min = 10, max = 20 }
profile_views = { min = 20, max = 50 }
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(
            e,
            ValidationError::InvertedRange { tier: "new", action: "connections", .. }
        )));
    }

    #[test]
    fn test_collects_every_error() {
        let toml = r#"
[rate_limits]
weekly_cap = 3000
utc_offset_minutes = 1440

[rate_limits.delay]
min_ms = 10
max_ms = 5

[rate_limits.suspicion]
score_threshold = 1.5

[rate_limits.ledger]
retention = 10
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::WeeklyExceedsMonthly(3000, 2000)));
        assert!(errors.contains(&ValidationError::InvertedDelay(10, 5)));
        assert!(errors.contains(&ValidationError::BadUtcOffset(1440)));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::OutOfUnitRange(_, v) if *v == 1.5)));
        // Both the stats window (50) and the score window (20) exceed 10.
        assert_eq!(
            errors
                .iter()
                .filter(|e| matches!(e, ValidationError::RetentionTooSmall { .. }))
                .count(),
            2
        );
    }

    #[test]
    fn test_zero_cooldown_fails() {
        let toml = r#"
[rate_limits.cooldown]
warning_minutes = 0
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let errors = validate(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::NotPositive("rate_limits.cooldown.warning_minutes")]
        );
    }
}
