//! Rate limiting configuration: tier quotas, caps, delays, suspicion
//! thresholds and cooldowns.

use chrono::Duration;
use serde::Deserialize;

use super::defaults::*;
use crate::state::{AccountType, ActionType};

/// Static limiter configuration. Not mutated at runtime.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Daily quotas per account tier.
    #[serde(default)]
    pub tiers: TierTable,
    /// Accounts younger than this many days are `New` (default: 30).
    #[serde(default = "default_new_account_days")]
    pub new_account_days: u32,
    /// Actions of any type allowed per rolling week (default: 500).
    #[serde(default = "default_weekly_cap")]
    pub weekly_cap: u32,
    /// Actions of any type allowed per rolling 30 days (default: 2000).
    #[serde(default = "default_monthly_cap")]
    pub monthly_cap: u32,
    #[serde(default)]
    pub delay: DelayConfig,
    #[serde(default)]
    pub suspicion: SuspicionConfig,
    #[serde(default)]
    pub cooldown: CooldownConfig,
    #[serde(default)]
    pub adjustment: AdjustmentConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Offset from UTC, in minutes, that defines the calendar day used for
    /// daily quotas (default: 0).
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            tiers: TierTable::default(),
            new_account_days: default_new_account_days(),
            weekly_cap: default_weekly_cap(),
            monthly_cap: default_monthly_cap(),
            delay: DelayConfig::default(),
            suspicion: SuspicionConfig::default(),
            cooldown: CooldownConfig::default(),
            adjustment: AdjustmentConfig::default(),
            ledger: LedgerConfig::default(),
            utc_offset_minutes: 0,
        }
    }
}

impl RateLimitConfig {
    pub fn weekly_window(&self) -> Duration {
        Duration::days(7)
    }

    pub fn monthly_window(&self) -> Duration {
        Duration::days(30)
    }
}

/// Inclusive daily range for one action type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DailyRange {
    /// Conservative floor operators plan around.
    pub min: u32,
    /// Quota the limit calculator scales from.
    pub max: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TierLimits {
    pub connections: DailyRange,
    pub messages: DailyRange,
    pub profile_views: DailyRange,
}

impl TierLimits {
    /// Daily range for an action type. `Search` carries no daily quota.
    pub fn for_action(&self, action: ActionType) -> Option<DailyRange> {
        match action {
            ActionType::ConnectionRequest => Some(self.connections),
            ActionType::Message => Some(self.messages),
            ActionType::ProfileView => Some(self.profile_views),
            ActionType::Search => None,
        }
    }

    pub(crate) fn ranges(&self) -> [(&'static str, DailyRange); 3] {
        [
            ("connections", self.connections),
            ("messages", self.messages),
            ("profile_views", self.profile_views),
        ]
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TierTable {
    #[serde(default = "default_new_tier")]
    pub new: TierLimits,
    #[serde(default = "default_established_tier")]
    pub established: TierLimits,
    #[serde(default = "default_premium_tier")]
    pub premium: TierLimits,
}

impl Default for TierTable {
    fn default() -> Self {
        Self {
            new: default_new_tier(),
            established: default_established_tier(),
            premium: default_premium_tier(),
        }
    }
}

impl TierTable {
    pub fn for_tier(&self, tier: AccountType) -> &TierLimits {
        match tier {
            AccountType::New => &self.new,
            AccountType::Established => &self.established,
            AccountType::Premium => &self.premium,
        }
    }
}

/// Adaptive delay parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct DelayConfig {
    /// Lower bound of the sampled base delay (default: 30s).
    #[serde(default = "default_delay_min_ms")]
    pub min_ms: u64,
    /// Upper bound of the sampled base delay (default: 90s).
    #[serde(default = "default_delay_max_ms")]
    pub max_ms: u64,
    #[serde(default = "default_new_multiplier")]
    pub new_multiplier: f64,
    #[serde(default = "default_established_multiplier")]
    pub established_multiplier: f64,
    #[serde(default = "default_premium_multiplier")]
    pub premium_multiplier: f64,
    /// Success rate above which delays shrink (default: 0.8).
    #[serde(default = "default_fast_success_threshold")]
    pub fast_success_threshold: f64,
    #[serde(default = "default_fast_success_factor")]
    pub fast_success_factor: f64,
    /// Delay grows by `1 + weight * suspicious_activity_score`.
    #[serde(default = "default_suspicion_weight")]
    pub suspicion_weight: f64,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            min_ms: default_delay_min_ms(),
            max_ms: default_delay_max_ms(),
            new_multiplier: default_new_multiplier(),
            established_multiplier: default_established_multiplier(),
            premium_multiplier: default_premium_multiplier(),
            fast_success_threshold: default_fast_success_threshold(),
            fast_success_factor: default_fast_success_factor(),
            suspicion_weight: default_suspicion_weight(),
        }
    }
}

impl DelayConfig {
    pub fn tier_multiplier(&self, tier: AccountType) -> f64 {
        match tier {
            AccountType::New => self.new_multiplier,
            AccountType::Established => self.established_multiplier,
            AccountType::Premium => self.premium_multiplier,
        }
    }
}

/// Suspicious activity detection and scoring.
#[derive(Debug, Clone, Deserialize)]
pub struct SuspicionConfig {
    /// Trailing window for the rapid-actions signal (default: 60s).
    #[serde(default = "default_rapid_window_secs")]
    pub rapid_window_secs: u64,
    /// Actions inside the window that flag rapid activity (default: 5).
    #[serde(default = "default_rapid_action_threshold")]
    pub rapid_action_threshold: usize,
    /// Rejection rate above which the account is flagged (default: 0.3).
    #[serde(default = "default_rejection_rate_threshold")]
    pub rejection_rate_threshold: f64,
    /// Score above which the account is flagged (default: 0.7).
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f64,

    /// Records the score is computed from (default: 20).
    #[serde(default = "default_score_window")]
    pub score_window: usize,
    /// The score is only recomputed once the window holds more records
    /// than this (default: 10).
    #[serde(default = "default_score_min_records")]
    pub score_min_records: usize,
    #[serde(default = "default_rate_per_minute_threshold")]
    pub rate_per_minute_threshold: f64,
    #[serde(default = "default_rate_weight")]
    pub rate_weight: f64,
    #[serde(default = "default_diversity_min_types")]
    pub diversity_min_types: usize,
    #[serde(default = "default_diversity_min_actions")]
    pub diversity_min_actions: usize,
    #[serde(default = "default_diversity_weight")]
    pub diversity_weight: f64,
    #[serde(default = "default_rejection_score_threshold")]
    pub rejection_score_threshold: f64,
    #[serde(default = "default_rejection_weight")]
    pub rejection_weight: f64,
    /// Score added each time a cooldown is triggered (default: 0.1).
    #[serde(default = "default_trigger_bump")]
    pub trigger_bump: f64,
}

impl Default for SuspicionConfig {
    fn default() -> Self {
        Self {
            rapid_window_secs: default_rapid_window_secs(),
            rapid_action_threshold: default_rapid_action_threshold(),
            rejection_rate_threshold: default_rejection_rate_threshold(),
            score_threshold: default_score_threshold(),
            score_window: default_score_window(),
            score_min_records: default_score_min_records(),
            rate_per_minute_threshold: default_rate_per_minute_threshold(),
            rate_weight: default_rate_weight(),
            diversity_min_types: default_diversity_min_types(),
            diversity_min_actions: default_diversity_min_actions(),
            diversity_weight: default_diversity_weight(),
            rejection_score_threshold: default_rejection_score_threshold(),
            rejection_weight: default_rejection_weight(),
            trigger_bump: default_trigger_bump(),
        }
    }
}

impl SuspicionConfig {
    pub fn rapid_window(&self) -> Duration {
        Duration::seconds(i64::try_from(self.rapid_window_secs).unwrap_or(i64::MAX / 1000))
    }
}

/// Cooldown durations per severity, in minutes.
#[derive(Debug, Clone, Deserialize)]
pub struct CooldownConfig {
    #[serde(default = "default_warning_minutes")]
    pub warning_minutes: i64,
    #[serde(default = "default_critical_minutes")]
    pub critical_minutes: i64,
    #[serde(default = "default_suspension_minutes")]
    pub suspension_minutes: i64,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            warning_minutes: default_warning_minutes(),
            critical_minutes: default_critical_minutes(),
            suspension_minutes: default_suspension_minutes(),
        }
    }
}

/// Success-rate driven quota adjustment.
#[derive(Debug, Clone, Deserialize)]
pub struct AdjustmentConfig {
    #[serde(default = "default_high_success_threshold")]
    pub high_success_threshold: f64,
    /// Fractional quota increase at or above the high threshold (default: 0.10).
    #[serde(default = "default_high_success_bonus")]
    pub high_success_bonus: f64,
    #[serde(default = "default_low_success_threshold")]
    pub low_success_threshold: f64,
    /// Fractional quota decrease below the low threshold (default: 0.20).
    #[serde(default = "default_low_success_penalty")]
    pub low_success_penalty: f64,
}

impl Default for AdjustmentConfig {
    fn default() -> Self {
        Self {
            high_success_threshold: default_high_success_threshold(),
            high_success_bonus: default_high_success_bonus(),
            low_success_threshold: default_low_success_threshold(),
            low_success_penalty: default_low_success_penalty(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Records kept across all accounts (default: 1000).
    #[serde(default = "default_retention")]
    pub retention: usize,
    /// Records success/rejection rates are computed from (default: 50).
    #[serde(default = "default_stats_window")]
    pub stats_window: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            retention: default_retention(),
            stats_window: default_stats_window(),
        }
    }
}
