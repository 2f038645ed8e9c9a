//! Per-account profile state.
//!
//! Counters and rates on a profile are derived from the action ledger; the
//! ledger stays the source of truth.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::record::ActionType;
use crate::ledger::RollingStats;

/// Account maturity tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    New,
    Established,
    Premium,
}

impl AccountType {
    /// Derive the tier from account age. `is_premium` always wins.
    pub fn derive(age_days: i64, is_premium: bool, new_account_days: u32) -> Self {
        if is_premium {
            AccountType::Premium
        } else if age_days < i64::from(new_account_days) {
            AccountType::New
        } else {
            AccountType::Established
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::New => "new",
            AccountType::Established => "established",
            AccountType::Premium => "premium",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-type action counts for one calendar day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyUsage {
    pub connections: u32,
    pub messages: u32,
    pub profile_views: u32,
    pub searches: u32,
}

impl DailyUsage {
    pub fn get(&self, action: ActionType) -> u32 {
        match action {
            ActionType::ConnectionRequest => self.connections,
            ActionType::Message => self.messages,
            ActionType::ProfileView => self.profile_views,
            ActionType::Search => self.searches,
        }
    }

    fn bump(&mut self, action: ActionType) {
        let counter = match action {
            ActionType::ConnectionRequest => &mut self.connections,
            ActionType::Message => &mut self.messages,
            ActionType::ProfileView => &mut self.profile_views,
            ActionType::Search => &mut self.searches,
        };
        *counter = counter.saturating_add(1);
    }
}

/// State tracked for one automated account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountProfile {
    pub account_id: String,
    pub account_type: AccountType,
    /// Whole days since `created_at`.
    pub account_age: i64,
    pub is_premium: bool,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,

    pub total_connections: u64,
    pub total_messages: u64,
    pub total_profile_views: u64,
    #[serde(default)]
    pub total_searches: u64,

    pub success_rate: f64,
    pub rejection_rate: f64,
    /// Number of records `success_rate`/`rejection_rate` were computed from.
    #[serde(default)]
    pub rate_sample_size: u32,
    pub suspicious_activity_score: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_until: Option<DateTime<Utc>>,
    pub weekly_usage: u32,
    pub monthly_usage: u32,

    /// Start of the calendar day `today` counts belong to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub today: DailyUsage,
}

impl AccountProfile {
    pub(crate) fn new(
        account_id: impl Into<String>,
        created_at: DateTime<Utc>,
        is_premium: bool,
        now: DateTime<Utc>,
        new_account_days: u32,
    ) -> Self {
        let mut profile = Self {
            account_id: account_id.into(),
            account_type: AccountType::New,
            account_age: 0,
            is_premium,
            created_at,
            last_activity: now,
            total_connections: 0,
            total_messages: 0,
            total_profile_views: 0,
            total_searches: 0,
            success_rate: 0.0,
            rejection_rate: 0.0,
            rate_sample_size: 0,
            suspicious_activity_score: 0.0,
            cooldown_until: None,
            weekly_usage: 0,
            monthly_usage: 0,
            day_start: None,
            today: DailyUsage::default(),
        };
        profile.refresh_tier(now, new_account_days);
        profile
    }

    /// Recompute `account_age` and `account_type` for `now`.
    pub fn refresh_tier(&mut self, now: DateTime<Utc>, new_account_days: u32) {
        self.account_age = (now - self.created_at).num_days().max(0);
        self.account_type = AccountType::derive(self.account_age, self.is_premium, new_account_days);
    }

    /// Lifetime count for an action type.
    pub fn lifetime_total(&self, action: ActionType) -> u64 {
        match action {
            ActionType::ConnectionRequest => self.total_connections,
            ActionType::Message => self.total_messages,
            ActionType::ProfileView => self.total_profile_views,
            ActionType::Search => self.total_searches,
        }
    }

    pub(crate) fn bump_lifetime(&mut self, action: ActionType) {
        let counter = match action {
            ActionType::ConnectionRequest => &mut self.total_connections,
            ActionType::Message => &mut self.total_messages,
            ActionType::ProfileView => &mut self.total_profile_views,
            ActionType::Search => &mut self.total_searches,
        };
        *counter += 1;
    }

    pub(crate) fn apply_rates(&mut self, stats: RollingStats) {
        self.success_rate = stats.success_rate();
        self.rejection_rate = stats.rejection_rate();
        self.rate_sample_size = u32::try_from(stats.sample).unwrap_or(u32::MAX);
    }

    /// Whether `success_rate` reflects any recorded outcome yet.
    #[inline]
    pub fn has_rate_history(&self) -> bool {
        self.rate_sample_size > 0
    }

    /// Usage counters go stale once `window` has elapsed since the last
    /// activity. Returns the usage as it currently counts.
    pub fn usage_in_window(&self, usage: u32, window: Duration, now: DateTime<Utc>) -> u32 {
        if now - self.last_activity >= window {
            0
        } else {
            usage
        }
    }

    /// Instant at which a usage window anchored on `last_activity` expires.
    pub fn window_resets_at(&self, window: Duration) -> DateTime<Utc> {
        self.last_activity + window
    }

    /// Counts for the day starting at `day_start`; zero once the day has
    /// rolled over.
    pub fn usage_for_day(&self, day_start: DateTime<Utc>) -> DailyUsage {
        if self.day_start == Some(day_start) {
            self.today
        } else {
            DailyUsage::default()
        }
    }

    /// Count one action toward the day starting at `day_start`.
    pub(crate) fn record_daily(&mut self, day_start: DateTime<Utc>, action: ActionType) {
        if self.day_start != Some(day_start) {
            self.day_start = Some(day_start);
            self.today = DailyUsage::default();
        }
        self.today.bump(action);
    }

    /// Count one action toward weekly/monthly usage and stamp activity.
    pub(crate) fn record_usage(&mut self, now: DateTime<Utc>, week: Duration, month: Duration) {
        self.weekly_usage = self.usage_in_window(self.weekly_usage, week, now) + 1;
        self.monthly_usage = self.usage_in_window(self.monthly_usage, month, now) + 1;
        self.last_activity = now;
    }
}
