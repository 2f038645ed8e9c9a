//! Default value functions for configuration.
//!
//! Separated into its own module for clarity and reuse.

use super::rate_limits::{DailyRange, TierLimits};

// =============================================================================
// Tier Defaults
// =============================================================================

const fn range(min: u32, max: u32) -> DailyRange {
    DailyRange { min, max }
}

pub fn default_new_tier() -> TierLimits {
    TierLimits {
        connections: range(5, 10),
        messages: range(10, 20),
        profile_views: range(20, 50),
    }
}

pub fn default_established_tier() -> TierLimits {
    TierLimits {
        connections: range(15, 25),
        messages: range(30, 50),
        profile_views: range(50, 100),
    }
}

pub fn default_premium_tier() -> TierLimits {
    TierLimits {
        connections: range(25, 40),
        messages: range(50, 80),
        profile_views: range(100, 150),
    }
}

pub fn default_new_account_days() -> u32 {
    30
}

// =============================================================================
// Cap Defaults
// =============================================================================

pub fn default_weekly_cap() -> u32 {
    500
}

pub fn default_monthly_cap() -> u32 {
    2000
}

// =============================================================================
// Delay Defaults
// =============================================================================

pub fn default_delay_min_ms() -> u64 {
    30_000
}

pub fn default_delay_max_ms() -> u64 {
    90_000
}

pub fn default_new_multiplier() -> f64 {
    1.5
}

pub fn default_established_multiplier() -> f64 {
    1.0
}

pub fn default_premium_multiplier() -> f64 {
    0.8
}

pub fn default_fast_success_threshold() -> f64 {
    0.8
}

pub fn default_fast_success_factor() -> f64 {
    0.8
}

pub fn default_suspicion_weight() -> f64 {
    0.5
}

// =============================================================================
// Suspicion Defaults
// =============================================================================

pub fn default_rapid_window_secs() -> u64 {
    60
}

pub fn default_rapid_action_threshold() -> usize {
    5
}

pub fn default_rejection_rate_threshold() -> f64 {
    0.3
}

pub fn default_score_threshold() -> f64 {
    0.7
}

pub fn default_score_window() -> usize {
    20
}

pub fn default_score_min_records() -> usize {
    10
}

pub fn default_rate_per_minute_threshold() -> f64 {
    2.0
}

pub fn default_rate_weight() -> f64 {
    0.2
}

pub fn default_diversity_min_types() -> usize {
    2
}

pub fn default_diversity_min_actions() -> usize {
    5
}

pub fn default_diversity_weight() -> f64 {
    0.3
}

pub fn default_rejection_score_threshold() -> f64 {
    0.5
}

pub fn default_rejection_weight() -> f64 {
    0.4
}

pub fn default_trigger_bump() -> f64 {
    0.1
}

// =============================================================================
// Cooldown Defaults
// =============================================================================

pub fn default_warning_minutes() -> i64 {
    30
}

pub fn default_critical_minutes() -> i64 {
    120
}

pub fn default_suspension_minutes() -> i64 {
    1440
}

// =============================================================================
// Adjustment Defaults
// =============================================================================

pub fn default_high_success_threshold() -> f64 {
    0.6
}

pub fn default_high_success_bonus() -> f64 {
    0.10
}

pub fn default_low_success_threshold() -> f64 {
    0.3
}

pub fn default_low_success_penalty() -> f64 {
    0.20
}

// =============================================================================
// Ledger Defaults
// =============================================================================

pub fn default_retention() -> usize {
    1000
}

pub fn default_stats_window() -> usize {
    50
}

// =============================================================================
// Logging Defaults
// =============================================================================

pub fn default_log_level() -> String {
    "info".to_string()
}
