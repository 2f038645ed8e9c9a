//! pacekeeper - adaptive rate limiter and admission controller for automated
//! outbound actions.
//!
//! Automation workers ask [`AdmissionController::check_action`] before every
//! connection request, message, profile view or search, wait the returned
//! delay, perform the action and report the result with
//! [`AdmissionController::record_action`]. Quotas adapt to account maturity
//! and success rate; suspicious cadence or rejection patterns put the account
//! into a cooldown.
//!
//! ```no_run
//! use std::sync::Arc;
//! use pacekeeper::{
//!     AccountType, ActionOutcome, ActionType, AdmissionController, JsonFileStore,
//!     RateLimitConfig, SystemClock,
//! };
//!
//! let limiter = AdmissionController::new(
//!     RateLimitConfig::default(),
//!     Arc::new(SystemClock),
//!     Arc::new(JsonFileStore::new("pacekeeper-state.json")),
//! );
//! limiter.register_account("acct-1", AccountType::New, false);
//!
//! let decision = limiter.check_action("acct-1", ActionType::Message)?;
//! if decision.allowed {
//!     // sleep(decision.delay_ms), send the message, then:
//!     limiter.record_action(
//!         "acct-1",
//!         ActionType::Message,
//!         ActionOutcome::success().with_delay(decision.delay_ms),
//!     )?;
//! }
//! # Ok::<(), pacekeeper::LimiterError>(())
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod ledger;
pub mod limiter;
pub mod metrics;
pub mod persistence;
pub mod state;
pub mod telemetry;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, ConfigError, RateLimitConfig};
pub use error::{LimiterError, LimiterResult, PersistenceError};
pub use limiter::{
    AdmissionController, AdmissionDecision, DenialReason, EffectiveLimits, LimiterStats,
    Severity, SuspiciousPattern, WriteMode,
};
pub use persistence::{JsonFileStore, MemoryStore, Snapshot, StateStore, spawn_flush_task};
pub use state::{
    AccountProfile, AccountType, ActionOutcome, ActionRecord, ActionType, DailyUsage,
};
