//! Effective daily quotas and adaptive delays.

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::RateLimitConfig;
use crate::state::{AccountProfile, ActionType};

/// Daily quotas currently in force for one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveLimits {
    pub connections: u32,
    pub messages: u32,
    pub profile_views: u32,
}

impl EffectiveLimits {
    /// Quota for an action type; `Search` has none.
    pub fn for_action(&self, action: ActionType) -> Option<u32> {
        match action {
            ActionType::ConnectionRequest => Some(self.connections),
            ActionType::Message => Some(self.messages),
            ActionType::ProfileView => Some(self.profile_views),
            ActionType::Search => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LimitCalculator {
    config: Arc<RateLimitConfig>,
}

impl LimitCalculator {
    pub fn new(config: Arc<RateLimitConfig>) -> Self {
        Self { config }
    }

    /// Fractional change applied to tier maxima from the account's success
    /// rate: `+bonus`, `-penalty` or `0`.
    pub fn success_adjustment(&self, profile: &AccountProfile) -> f64 {
        let adj = &self.config.adjustment;
        if !profile.has_rate_history() {
            0.0
        } else if profile.success_rate >= adj.high_success_threshold {
            adj.high_success_bonus
        } else if profile.success_rate < adj.low_success_threshold {
            -adj.low_success_penalty
        } else {
            0.0
        }
    }

    /// Tier maxima scaled by [`Self::success_adjustment`], floored, at least 1.
    pub fn current_limits(&self, profile: &AccountProfile) -> EffectiveLimits {
        let tier = self.config.tiers.for_tier(profile.account_type);
        let delta = self.success_adjustment(profile);
        // max + max*delta keeps integral results exact (10 - 2.0, not 10 * 0.8).
        let scale = |max: u32| -> u32 {
            let max = f64::from(max);
            let scaled = (max + max * delta).floor();
            if scaled < 1.0 { 1 } else { scaled as u32 }
        };
        EffectiveLimits {
            connections: scale(tier.connections.max),
            messages: scale(tier.messages.max),
            profile_views: scale(tier.profile_views.max),
        }
    }

    /// Randomized delay (ms) to wait before the next action.
    pub fn adaptive_delay(&self, profile: &AccountProfile) -> u64 {
        self.adaptive_delay_with(profile, &mut rand::thread_rng())
    }

    pub fn adaptive_delay_with<R: Rng + ?Sized>(&self, profile: &AccountProfile, rng: &mut R) -> u64 {
        let delay = &self.config.delay;
        let base = if delay.min_ms >= delay.max_ms {
            delay.min_ms
        } else {
            rng.gen_range(delay.min_ms..=delay.max_ms)
        };

        let tier = delay.tier_multiplier(profile.account_type);
        let success = if profile.has_rate_history() && profile.success_rate > delay.fast_success_threshold {
            delay.fast_success_factor
        } else {
            1.0
        };
        let suspicion = 1.0 + delay.suspicion_weight * profile.suspicious_activity_score;

        (base as f64 * tier * success * suspicion).floor() as u64
    }
}

/// Start of the calendar day containing `now`, and the start of the next one,
/// in a fixed UTC offset.
pub fn day_bounds(now: DateTime<Utc>, utc_offset_minutes: i32) -> (DateTime<Utc>, DateTime<Utc>) {
    let offset = Duration::minutes(i64::from(utc_offset_minutes));
    let local = now.naive_utc() + offset;
    let local_midnight = local.date().and_time(NaiveTime::MIN);
    let start = Utc.from_utc_datetime(&(local_midnight - offset));
    (start, start + Duration::days(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimitConfig;
    use crate::state::AccountType;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap()
    }

    fn calculator() -> LimitCalculator {
        LimitCalculator::new(Arc::new(RateLimitConfig::default()))
    }

    fn profile(tier: AccountType) -> AccountProfile {
        let created = match tier {
            AccountType::New => t0(),
            _ => t0() - Duration::days(60),
        };
        AccountProfile::new("acct", created, tier == AccountType::Premium, t0(), 30)
    }

    fn with_rate(mut p: AccountProfile, success_rate: f64) -> AccountProfile {
        p.success_rate = success_rate;
        p.rate_sample_size = 50;
        p
    }

    #[test]
    fn test_fresh_account_gets_tier_maxima() {
        let limits = calculator().current_limits(&profile(AccountType::New));
        assert_eq!(limits, EffectiveLimits { connections: 10, messages: 20, profile_views: 50 });
        assert_eq!(limits.for_action(ActionType::Search), None);
    }

    #[test]
    fn test_high_success_bonus() {
        let p = with_rate(profile(AccountType::Established), 0.6);
        let limits = calculator().current_limits(&p);
        // 25 * 1.1 = 27.5 -> 27
        assert_eq!(limits.connections, 27);
        assert_eq!(limits.messages, 55);
        assert_eq!(limits.profile_views, 110);
    }

    #[test]
    fn test_low_success_penalty() {
        let p = with_rate(profile(AccountType::New), 0.2);
        let limits = calculator().current_limits(&p);
        assert_eq!(limits.connections, 8);
        assert_eq!(limits.messages, 16);
        assert_eq!(limits.profile_views, 40);
    }

    #[test]
    fn test_middle_band_is_unadjusted() {
        let p = with_rate(profile(AccountType::Premium), 0.45);
        assert_eq!(calculator().success_adjustment(&p), 0.0);
        assert_eq!(calculator().current_limits(&p).connections, 40);
    }

    #[test]
    fn test_limit_never_below_one() {
        let mut config = RateLimitConfig::default();
        config.tiers.new.connections.max = 1;
        config.tiers.new.connections.min = 1;
        let calc = LimitCalculator::new(Arc::new(config));
        let p = with_rate(profile(AccountType::New), 0.0);
        assert_eq!(calc.current_limits(&p).connections, 1);
    }

    #[test]
    fn test_delay_within_tier_scaled_range() {
        let calc = calculator();
        let mut rng = StdRng::seed_from_u64(7);
        let new = profile(AccountType::New);
        let premium = profile(AccountType::Premium);
        for _ in 0..200 {
            let d = calc.adaptive_delay_with(&new, &mut rng);
            assert!((45_000..=135_000).contains(&d), "new-tier delay {d}");
            let d = calc.adaptive_delay_with(&premium, &mut rng);
            assert!((24_000..=72_000).contains(&d), "premium delay {d}");
        }
    }

    #[test]
    fn test_delay_factors_compose() {
        let mut config = RateLimitConfig::default();
        config.delay.min_ms = 10_000;
        config.delay.max_ms = 10_000;
        let calc = LimitCalculator::new(Arc::new(config));
        let mut rng = StdRng::seed_from_u64(1);

        let mut p = with_rate(profile(AccountType::Established), 0.9);
        p.suspicious_activity_score = 1.0;
        // 10_000 * 1.0 * 0.8 * 1.5
        assert_eq!(calc.adaptive_delay_with(&p, &mut rng), 12_000);

        let mut p = profile(AccountType::New);
        p.suspicious_activity_score = 0.5;
        // 10_000 * 1.5 * 1.0 * 1.25
        assert_eq!(calc.adaptive_delay_with(&p, &mut rng), 18_750);
    }

    #[test]
    fn test_day_bounds_utc_and_offset() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 23, 30, 0).unwrap();
        let (start, next) = day_bounds(now, 0);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 5, 10, 0, 0, 0).unwrap());
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 5, 11, 0, 0, 0).unwrap());

        // UTC+2: 23:30Z is 01:30 local on the 11th.
        let (start, next) = day_bounds(now, 120);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 5, 10, 22, 0, 0).unwrap());
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 5, 11, 22, 0, 0).unwrap());

        // UTC-5: 23:30Z is 18:30 local on the 10th.
        let (start, _) = day_bounds(now, -300);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 5, 10, 5, 0, 0).unwrap());
    }
}
