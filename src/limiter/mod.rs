//! Admission controller.
//!
//! [`AdmissionController`] decides whether an account may perform an action
//! now, records what actually happened, and keeps per-account profiles in
//! step with the action ledger.
//!
//! # Locking
//!
//! - Each profile is guarded by its `DashMap` entry for the duration of a
//!   read-modify-write.
//! - The ledger sits behind one `parking_lot::Mutex`. It is only ever locked
//!   while holding at most one profile entry, never the other way round.
//! - Snapshots read profiles first and then the ledger, holding neither while
//!   acquiring the other.
//! - Snapshot writes are serialized by the persist lock, which is only taken
//!   with no profile entry held.

pub mod cooldown;
pub mod detector;
pub mod limits;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::config::{Config, RateLimitConfig, ValidationError, validate};
use crate::error::{LimiterError, LimiterResult, PersistenceError};
use crate::ledger::ActionLedger;
use crate::metrics;
use crate::persistence::{JsonFileStore, MemoryStore, Snapshot, StateStore};
use crate::state::{
    AccountProfile, AccountType, ActionOutcome, ActionRecord, ActionType, DailyUsage,
};
use crate::telemetry::spans;

pub use cooldown::CooldownState;
pub use detector::{Severity, SuspicionDetector, SuspiciousPattern};
pub use limits::{EffectiveLimits, LimitCalculator, day_bounds};

/// Default number of records returned by [`AdmissionController::get_action_history`].
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// When mutations reach the [`StateStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteMode {
    /// Write the full snapshot before each mutating call returns.
    #[default]
    Immediate,
    /// Mark state dirty; a flush task or an explicit
    /// [`AdmissionController::flush`] writes it.
    Deferred,
}

/// Why an action was denied.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DenialReason {
    InCooldown,
    Suspicious { pattern: SuspiciousPattern },
    DailyLimit { action: ActionType },
    WeeklyCap,
    MonthlyCap,
}

impl DenialReason {
    /// Static label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            DenialReason::InCooldown => "in_cooldown",
            DenialReason::Suspicious { pattern } => pattern.label(),
            DenialReason::DailyLimit { .. } => "daily_limit",
            DenialReason::WeeklyCap => "weekly_cap",
            DenialReason::MonthlyCap => "monthly_cap",
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenialReason::InCooldown => f.write_str("in cooldown"),
            DenialReason::Suspicious { pattern } => write!(f, "suspicious activity: {pattern}"),
            DenialReason::DailyLimit { action } => write!(f, "daily limit reached for {action}"),
            DenialReason::WeeklyCap => f.write_str("weekly cap reached"),
            DenialReason::MonthlyCap => f.write_str("monthly cap reached"),
        }
    }
}

/// Result of [`AdmissionController::check_action`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdmissionDecision {
    pub allowed: bool,
    /// Allowed: wait this long before acting. Denied: earliest point at which
    /// asking again can succeed.
    pub delay_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DenialReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown_until: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjusted_limits: Option<EffectiveLimits>,
}

impl AdmissionDecision {
    fn allow(delay_ms: u64, limits: EffectiveLimits) -> Self {
        Self {
            allowed: true,
            delay_ms,
            reason: None,
            cooldown_until: None,
            adjusted_limits: Some(limits),
        }
    }

    fn deny(reason: DenialReason, delay_ms: u64, cooldown_until: Option<DateTime<Utc>>) -> Self {
        Self {
            allowed: false,
            delay_ms,
            reason: Some(reason),
            cooldown_until,
            adjusted_limits: None,
        }
    }
}

/// Point-in-time counters for operators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimiterStats {
    pub accounts: usize,
    pub ledger_len: usize,
    pub accounts_in_cooldown: usize,
    /// Snapshot writes that failed since startup.
    pub persist_failures: u64,
    /// Error of the most recent write, cleared by the next successful one.
    pub last_persist_error: Option<String>,
}

#[derive(Debug, Default)]
struct PersistStatus {
    failures: u64,
    last_error: Option<String>,
}

/// Adaptive rate limiter and admission controller for automated accounts.
pub struct AdmissionController {
    config: Arc<RateLimitConfig>,
    clock: Arc<dyn Clock>,
    store: Arc<dyn StateStore>,
    profiles: DashMap<String, AccountProfile>,
    ledger: Mutex<ActionLedger>,
    calculator: LimitCalculator,
    detector: SuspicionDetector,
    persist: Mutex<PersistStatus>,
    write_mode: WriteMode,
    dirty: AtomicBool,
}

impl AdmissionController {
    /// Create a controller, restoring whatever `store` holds.
    ///
    /// An unreadable store is logged and the controller starts empty.
    pub fn new(config: RateLimitConfig, clock: Arc<dyn Clock>, store: Arc<dyn StateStore>) -> Self {
        let config = Arc::new(config);
        let retention = config.ledger.retention;

        let (profiles, ledger): (DashMap<String, AccountProfile>, ActionLedger) = match store.load() {
            Ok(Some(snapshot)) => {
                info!(
                    store = %store.describe(),
                    profiles = snapshot.profiles.len(),
                    actions = snapshot.actions.len(),
                    last_saved = %snapshot.last_saved,
                    "Restored limiter state"
                );
                (
                    snapshot.profiles.into_iter().collect(),
                    ActionLedger::from_records(snapshot.actions, retention),
                )
            }
            Ok(None) => {
                info!(store = %store.describe(), "No saved limiter state, starting empty");
                (DashMap::new(), ActionLedger::new(retention))
            }
            Err(e) => {
                error!(
                    store = %store.describe(),
                    error = %e,
                    code = e.error_code(),
                    "Failed to load limiter state, starting empty"
                );
                (DashMap::new(), ActionLedger::new(retention))
            }
        };
        metrics::set_tracked_accounts(profiles.len());

        Self {
            calculator: LimitCalculator::new(Arc::clone(&config)),
            detector: SuspicionDetector::new(config.suspicion.clone()),
            config,
            clock,
            store,
            profiles,
            ledger: Mutex::new(ledger),
            persist: Mutex::new(PersistStatus::default()),
            write_mode: WriteMode::Immediate,
            dirty: AtomicBool::new(false),
        }
    }

    pub fn with_write_mode(mut self, mode: WriteMode) -> Self {
        self.write_mode = mode;
        self
    }

    /// Build from a validated [`Config`]: a JSON file store when a path is
    /// configured (in-memory otherwise), deferred writes when a flush interval
    /// is set.
    pub fn from_config(config: &Config, clock: Arc<dyn Clock>) -> Result<Self, Vec<ValidationError>> {
        validate(config)?;

        let store: Arc<dyn StateStore> = match &config.persistence.path {
            Some(path) => Arc::new(JsonFileStore::new(path)),
            None => Arc::new(MemoryStore::new()),
        };
        let mode = if config.persistence.flush_interval_ms > 0 {
            WriteMode::Deferred
        } else {
            WriteMode::Immediate
        };
        Ok(Self::new(config.rate_limits.clone(), clock, store).with_write_mode(mode))
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    pub fn write_mode(&self) -> WriteMode {
        self.write_mode
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Register (or re-register) an account. Re-registering replaces the
    /// previous profile; ledger history is kept.
    ///
    /// The creation time is seeded so the derived tier matches `account_type`.
    pub fn register_account(
        &self,
        account_id: &str,
        account_type: AccountType,
        is_premium: bool,
    ) -> AccountProfile {
        let now = self.clock.now();
        let created_at = match account_type {
            AccountType::New => now,
            AccountType::Established | AccountType::Premium => {
                now - Duration::days(i64::from(self.config.new_account_days))
            }
        };
        let is_premium = is_premium || account_type == AccountType::Premium;
        self.insert_profile(account_id, created_at, is_premium, now)
    }

    /// Register an account with a known creation time; the tier follows from
    /// its age.
    pub fn register_account_with_created_at(
        &self,
        account_id: &str,
        created_at: DateTime<Utc>,
        is_premium: bool,
    ) -> AccountProfile {
        let now = self.clock.now();
        self.insert_profile(account_id, created_at, is_premium, now)
    }

    fn insert_profile(
        &self,
        account_id: &str,
        created_at: DateTime<Utc>,
        is_premium: bool,
        now: DateTime<Utc>,
    ) -> AccountProfile {
        let profile = AccountProfile::new(
            account_id,
            created_at,
            is_premium,
            now,
            self.config.new_account_days,
        );
        let replaced = self
            .profiles
            .insert(account_id.to_string(), profile.clone())
            .is_some();

        info!(
            account = %account_id,
            tier = %profile.account_type,
            age_days = profile.account_age,
            replaced,
            "Account registered"
        );
        metrics::set_tracked_accounts(self.profiles.len());
        self.persist_after_mutation();
        profile
    }

    // ========================================================================
    // Admission
    // ========================================================================

    /// Decide whether `account_id` may perform `action` now.
    ///
    /// Steps run in order and the first denial wins: cooldown, suspicious
    /// activity (which starts a cooldown), daily quota, weekly cap, monthly
    /// cap. An allowed check records nothing; call
    /// [`record_action`](Self::record_action) once the action was performed.
    pub fn check_action(
        &self,
        account_id: &str,
        action: ActionType,
    ) -> LimiterResult<AdmissionDecision> {
        let _span = spans::check(account_id, action.as_str()).entered();
        let cfg = &*self.config;

        let mut entry = self
            .profiles
            .get_mut(account_id)
            .ok_or_else(|| LimiterError::UnregisteredAccount(account_id.to_string()))?;
        let now = self.clock.now();
        let profile = entry.value_mut();
        profile.refresh_tier(now, cfg.new_account_days);

        if let CooldownState::Cooling { until } = cooldown::state(profile, now) {
            drop(entry);
            return Ok(self.denied(
                action,
                DenialReason::InCooldown,
                millis_between(now, until),
                Some(until),
            ));
        }

        let recent_actions = self.ledger.lock().count_since(
            account_id,
            now - cfg.suspicion.rapid_window(),
            None,
        );

        if let Some(pattern) = self.detector.detect(profile, recent_actions) {
            let severity = pattern.severity();
            let until = cooldown::trigger(
                profile,
                severity,
                now,
                &cfg.cooldown,
                cfg.suspicion.trigger_bump,
            );
            warn!(
                account = %account_id,
                %pattern,
                %severity,
                cooldown_until = %until,
                score = profile.suspicious_activity_score,
                "Suspicious activity, cooldown started"
            );
            drop(entry);
            metrics::record_cooldown(severity.as_str());
            self.persist_after_mutation();
            return Ok(self.denied(
                action,
                DenialReason::Suspicious { pattern },
                millis_between(now, until),
                Some(until),
            ));
        }

        let (day_start, next_day) = day_bounds(now, cfg.utc_offset_minutes);
        let used_today = profile.usage_for_day(day_start).get(action);
        let limits = self.calculator.current_limits(profile);
        if let Some(limit) = limits.for_action(action)
            && used_today >= limit
        {
            drop(entry);
            return Ok(self.denied(
                action,
                DenialReason::DailyLimit { action },
                millis_between(now, next_day),
                None,
            ));
        }

        let week = cfg.weekly_window();
        if profile.usage_in_window(profile.weekly_usage, week, now) >= cfg.weekly_cap {
            let resets_at = profile.window_resets_at(week);
            drop(entry);
            return Ok(self.denied(
                action,
                DenialReason::WeeklyCap,
                millis_between(now, resets_at),
                None,
            ));
        }

        let month = cfg.monthly_window();
        if profile.usage_in_window(profile.monthly_usage, month, now) >= cfg.monthly_cap {
            let resets_at = profile.window_resets_at(month);
            drop(entry);
            return Ok(self.denied(
                action,
                DenialReason::MonthlyCap,
                millis_between(now, resets_at),
                None,
            ));
        }

        let delay_ms = self.calculator.adaptive_delay(profile);
        drop(entry);

        debug!(account = %account_id, %action, delay_ms, "Action allowed");
        metrics::record_check(action.as_str(), true);
        Ok(AdmissionDecision::allow(delay_ms, limits))
    }

    fn denied(
        &self,
        action: ActionType,
        reason: DenialReason,
        delay_ms: u64,
        cooldown_until: Option<DateTime<Utc>>,
    ) -> AdmissionDecision {
        debug!(%action, %reason, delay_ms, "Action denied");
        metrics::record_check(action.as_str(), false);
        metrics::record_denial(reason.label());
        AdmissionDecision::deny(reason, delay_ms, cooldown_until)
    }

    // ========================================================================
    // Recording
    // ========================================================================

    /// Record the outcome of an action the caller performed.
    ///
    /// Appends to the ledger, then refreshes lifetime counters, rolling rates
    /// and the suspicion score from it. Daily, weekly and monthly usage are
    /// counted on the profile.
    pub fn record_action(
        &self,
        account_id: &str,
        action: ActionType,
        outcome: ActionOutcome,
    ) -> LimiterResult<ActionRecord> {
        let _span = spans::record(account_id, action.as_str()).entered();
        let cfg = &*self.config;

        let mut entry = self
            .profiles
            .get_mut(account_id)
            .ok_or_else(|| LimiterError::UnregisteredAccount(account_id.to_string()))?;
        // Under the entry lock, so an account's records are appended in clock order.
        let now = self.clock.now();
        let profile = entry.value_mut();
        profile.refresh_tier(now, cfg.new_account_days);

        let delay_used = outcome
            .delay_ms
            .unwrap_or_else(|| self.calculator.adaptive_delay(profile));
        let record = ActionRecord {
            account_id: account_id.to_string(),
            action_type: action,
            timestamp: now,
            success: outcome.success,
            rejection_reason: outcome.rejection_reason,
            delay_used,
        };
        let outcome_label = if record.success {
            "success"
        } else if record.is_rejection() {
            "rejected"
        } else {
            "failed"
        };

        {
            let mut ledger = self.ledger.lock();
            let evicted = ledger.append(record.clone());
            if evicted > 0 {
                debug!(evicted, retained = ledger.len(), "Ledger trimmed");
            }

            profile.bump_lifetime(action);
            profile.apply_rates(ledger.window_stats(account_id, cfg.ledger.stats_window));

            let recent = ledger.recent(account_id, cfg.suspicion.score_window);
            if let Some(score) = self.detector.score(&recent, profile.rejection_rate) {
                profile.suspicious_activity_score = score;
            }
        }
        profile.record_daily(day_bounds(now, cfg.utc_offset_minutes).0, action);
        profile.record_usage(now, cfg.weekly_window(), cfg.monthly_window());

        debug!(
            account = %account_id,
            %action,
            outcome = outcome_label,
            success_rate = profile.success_rate,
            rejection_rate = profile.rejection_rate,
            score = profile.suspicious_activity_score,
            "Action recorded"
        );
        drop(entry);

        metrics::record_action(action.as_str(), outcome_label);
        self.persist_after_mutation();
        Ok(record)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Current profile with tier refreshed, or `None` if unregistered.
    pub fn get_account_profile(&self, account_id: &str) -> Option<AccountProfile> {
        let now = self.clock.now();
        let mut entry = self.profiles.get_mut(account_id)?;
        entry.refresh_tier(now, self.config.new_account_days);
        Some(entry.value().clone())
    }

    /// Daily quotas that apply to `profile`.
    pub fn get_current_limits(&self, profile: &AccountProfile) -> EffectiveLimits {
        self.calculator.current_limits(profile)
    }

    /// Up to `limit` ledger records, newest first, optionally for one account.
    pub fn get_action_history(&self, account_id: Option<&str>, limit: usize) -> Vec<ActionRecord> {
        self.ledger.lock().history(account_id, limit)
    }

    /// Per-type counts for the current calendar day.
    pub fn daily_usage(&self, account_id: &str) -> LimiterResult<DailyUsage> {
        let profile = self
            .profiles
            .get(account_id)
            .ok_or_else(|| LimiterError::UnregisteredAccount(account_id.to_string()))?;
        let (day_start, _) = day_bounds(self.clock.now(), self.config.utc_offset_minutes);
        Ok(profile.usage_for_day(day_start))
    }

    pub fn is_in_cooldown(&self, account_id: &str) -> LimiterResult<bool> {
        let profile = self
            .profiles
            .get(account_id)
            .ok_or_else(|| LimiterError::UnregisteredAccount(account_id.to_string()))?;
        Ok(cooldown::state(&profile, self.clock.now()).is_cooling())
    }

    pub fn stats(&self) -> LimiterStats {
        let now = self.clock.now();
        let accounts_in_cooldown = self
            .profiles
            .iter()
            .filter(|p| cooldown::state(p.value(), now).is_cooling())
            .count();
        let ledger_len = self.ledger.lock().len();
        let persist = self.persist.lock();

        LimiterStats {
            accounts: self.profiles.len(),
            ledger_len,
            accounts_in_cooldown,
            persist_failures: persist.failures,
            last_persist_error: persist.last_error.clone(),
        }
    }

    // ========================================================================
    // Maintenance
    // ========================================================================

    /// Clear cooldown, suspicion score and weekly/monthly usage. Lifetime
    /// counters and the ledger are left alone.
    pub fn reset_account_limits(&self, account_id: &str) -> LimiterResult<()> {
        {
            let mut profile = self
                .profiles
                .get_mut(account_id)
                .ok_or_else(|| LimiterError::UnregisteredAccount(account_id.to_string()))?;
            cooldown::clear(&mut profile);
            profile.suspicious_activity_score = 0.0;
            profile.weekly_usage = 0;
            profile.monthly_usage = 0;
        }
        info!(account = %account_id, "Account limits reset");
        self.persist_after_mutation();
        Ok(())
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Current state as a snapshot.
    pub fn snapshot(&self) -> Snapshot {
        let profiles: BTreeMap<_, _> = self
            .profiles
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        let actions = self.ledger.lock().snapshot();
        Snapshot {
            profiles,
            actions,
            last_saved: self.clock.now(),
        }
    }

    /// Whether mutations are waiting for a deferred write.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Write the current state now, regardless of write mode.
    ///
    /// Failures are logged and counted in [`LimiterStats`] before being
    /// returned.
    pub fn flush(&self) -> Result<(), PersistenceError> {
        let mut status = self.persist.lock();
        self.dirty.store(false, Ordering::Release);

        let snapshot = self.snapshot();
        let target = self.store.describe();
        let _span = spans::persist(&target).entered();
        let started = Instant::now();
        let result = self.store.save(&snapshot);
        metrics::record_persist(started.elapsed().as_secs_f64(), result.is_ok());

        match &result {
            Ok(()) => status.last_error = None,
            Err(e) => {
                status.failures += 1;
                status.last_error = Some(e.to_string());
                // Keep the state marked so the next flush retries.
                self.dirty.store(true, Ordering::Release);
                error!(
                    store = %target,
                    error = %e,
                    code = e.error_code(),
                    failures = status.failures,
                    "Failed to persist limiter state; in-memory state is authoritative"
                );
            }
        }
        result
    }

    fn persist_after_mutation(&self) {
        match self.write_mode {
            WriteMode::Immediate => {
                // Logged and counted by flush.
                let _ = self.flush();
            }
            WriteMode::Deferred => self.dirty.store(true, Ordering::Release),
        }
    }
}

impl fmt::Debug for AdmissionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdmissionController")
            .field("accounts", &self.profiles.len())
            .field("store", &self.store.describe())
            .field("write_mode", &self.write_mode)
            .finish_non_exhaustive()
    }
}

fn millis_between(from: DateTime<Utc>, to: DateTime<Utc>) -> u64 {
    u64::try_from((to - from).num_milliseconds()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 9, 0, 0).unwrap()
    }

    fn setup(config: RateLimitConfig) -> (AdmissionController, Arc<ManualClock>, Arc<MemoryStore>) {
        let clock = Arc::new(ManualClock::new(t0()));
        let store = Arc::new(MemoryStore::new());
        let limiter = AdmissionController::new(config, clock.clone(), store.clone());
        (limiter, clock, store)
    }

    #[test]
    fn test_unregistered_account_errors() {
        let (limiter, _, _) = setup(RateLimitConfig::default());
        let err = limiter.check_action("ghost", ActionType::Message).unwrap_err();
        assert_eq!(err, LimiterError::UnregisteredAccount("ghost".into()));
        assert!(limiter
            .record_action("ghost", ActionType::Message, ActionOutcome::success())
            .is_err());
        assert!(limiter.reset_account_limits("ghost").is_err());
        assert!(limiter.get_account_profile("ghost").is_none());
    }

    #[test]
    fn test_register_seeds_requested_tier() {
        let (limiter, _, _) = setup(RateLimitConfig::default());
        assert_eq!(
            limiter.register_account("a", AccountType::New, false).account_type,
            AccountType::New
        );
        assert_eq!(
            limiter.register_account("b", AccountType::Established, false).account_type,
            AccountType::Established
        );
        let premium = limiter.register_account("c", AccountType::Premium, false);
        assert_eq!(premium.account_type, AccountType::Premium);
        assert!(premium.is_premium);
    }

    #[test]
    fn test_reregister_overwrites_profile() {
        let (limiter, _, _) = setup(RateLimitConfig::default());
        limiter.register_account("a", AccountType::New, false);
        limiter
            .record_action("a", ActionType::Message, ActionOutcome::success())
            .unwrap();
        let fresh = limiter.register_account("a", AccountType::Established, false);
        assert_eq!(fresh.total_messages, 0);
        assert_eq!(limiter.daily_usage("a").unwrap().messages, 0);
        assert_eq!(limiter.get_action_history(Some("a"), 10).len(), 1);
    }

    #[test]
    fn test_allowed_check_records_nothing() {
        let (limiter, _, _) = setup(RateLimitConfig::default());
        limiter.register_account("a", AccountType::New, false);
        let decision = limiter.check_action("a", ActionType::Message).unwrap();
        assert!(decision.allowed);
        assert!(decision.reason.is_none());
        assert!((45_000..=135_000).contains(&decision.delay_ms));
        assert_eq!(decision.adjusted_limits.map(|l| l.messages), Some(20));
        assert!(limiter.get_action_history(None, 10).is_empty());
    }

    #[test]
    fn test_supplied_delay_is_recorded() {
        let (limiter, _, _) = setup(RateLimitConfig::default());
        limiter.register_account("a", AccountType::Established, false);
        let record = limiter
            .record_action("a", ActionType::Search, ActionOutcome::success().with_delay(4_321))
            .unwrap();
        assert_eq!(record.delay_used, 4_321);

        // Recomputed, with the fast-success factor from the first record.
        let record = limiter
            .record_action("a", ActionType::Search, ActionOutcome::success())
            .unwrap();
        assert!((24_000..=72_000).contains(&record.delay_used));
    }

    #[test]
    fn test_weekly_cap_denies_until_window_lapses() {
        let mut config = RateLimitConfig::default();
        config.weekly_cap = 3;
        let (limiter, clock, _) = setup(config);
        limiter.register_account("a", AccountType::Established, false);

        for _ in 0..3 {
            limiter
                .record_action("a", ActionType::Search, ActionOutcome::success())
                .unwrap();
            clock.advance(Duration::minutes(5));
        }
        let decision = limiter.check_action("a", ActionType::Search).unwrap();
        assert!(!decision.allowed);
        assert_eq!(decision.reason, Some(DenialReason::WeeklyCap));
        // Last activity was five minutes ago.
        let expected = (Duration::days(7) - Duration::minutes(5)).num_milliseconds() as u64;
        assert_eq!(decision.delay_ms, expected);

        clock.advance(Duration::days(7));
        assert!(limiter.check_action("a", ActionType::Search).unwrap().allowed);
    }

    #[test]
    fn test_monthly_cap() {
        let mut config = RateLimitConfig::default();
        config.weekly_cap = 10;
        config.monthly_cap = 2;
        let (limiter, clock, _) = setup(config);
        limiter.register_account("a", AccountType::Established, false);
        for _ in 0..2 {
            limiter
                .record_action("a", ActionType::ProfileView, ActionOutcome::success())
                .unwrap();
            clock.advance(Duration::minutes(5));
        }
        let decision = limiter.check_action("a", ActionType::ProfileView).unwrap();
        assert_eq!(decision.reason, Some(DenialReason::MonthlyCap));
        assert_eq!(decision.reason.map(|r| r.to_string()).as_deref(), Some("monthly cap reached"));
    }

    #[test]
    fn test_cooldown_denial_reports_remaining_time() {
        let (limiter, clock, _) = setup(RateLimitConfig::default());
        limiter.register_account("a", AccountType::Established, false);
        for _ in 0..5 {
            limiter
                .record_action("a", ActionType::Message, ActionOutcome::success())
                .unwrap();
            clock.advance(Duration::seconds(1));
        }
        let first = limiter.check_action("a", ActionType::Message).unwrap();
        assert_eq!(first.reason.as_ref().map(DenialReason::label), Some("rapid_actions"));
        assert!(limiter.is_in_cooldown("a").unwrap());

        clock.advance(Duration::minutes(10));
        let second = limiter.check_action("a", ActionType::Message).unwrap();
        assert_eq!(second.reason, Some(DenialReason::InCooldown));
        assert_eq!(second.cooldown_until, first.cooldown_until);
        assert_eq!(second.delay_ms, Duration::minutes(20).num_milliseconds() as u64);
        assert_eq!(limiter.stats().accounts_in_cooldown, 1);
    }

    #[test]
    fn test_deferred_mode_marks_dirty_until_flushed() {
        let (limiter, _, store) = setup(RateLimitConfig::default());
        let limiter = limiter.with_write_mode(WriteMode::Deferred);
        limiter.register_account("a", AccountType::New, false);
        assert!(limiter.is_dirty());
        assert_eq!(store.save_count(), 0);

        limiter.flush().unwrap();
        assert!(!limiter.is_dirty());
        assert_eq!(store.latest().map(|s| s.profiles.len()), Some(1));
    }

    #[test]
    fn test_write_failures_surface_in_stats() {
        let (limiter, _, store) = setup(RateLimitConfig::default());
        store.set_fail_writes(true);
        limiter.register_account("a", AccountType::New, false);

        let stats = limiter.stats();
        assert_eq!(stats.persist_failures, 1);
        assert!(stats.last_persist_error.is_some());
        // In-memory state is unaffected.
        assert!(limiter.get_account_profile("a").is_some());

        store.set_fail_writes(false);
        limiter.flush().unwrap();
        let stats = limiter.stats();
        assert_eq!(stats.persist_failures, 1);
        assert_eq!(stats.last_persist_error, None);
    }

    #[test]
    fn test_denial_reason_display() {
        let reason = DenialReason::DailyLimit { action: ActionType::ConnectionRequest };
        assert_eq!(reason.to_string(), "daily limit reached for connection_request");
        assert_eq!(DenialReason::InCooldown.to_string(), "in cooldown");
    }
}
