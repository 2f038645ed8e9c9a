//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: top-level [`Config`], persistence and logging sections
//! - [`rate_limits`]: tier quotas, caps, delays, suspicion and cooldowns
//! - [`defaults`]: serde default functions
//! - [`validation`]: startup checks that collect every problem found

mod defaults;
mod rate_limits;
mod types;
pub mod validation;

pub use rate_limits::{
    AdjustmentConfig, CooldownConfig, DailyRange, DelayConfig, LedgerConfig, RateLimitConfig,
    SuspicionConfig, TierLimits, TierTable,
};
pub use types::{Config, ConfigError, LogFormat, LoggingConfig, PersistenceConfig};
pub use validation::{ValidationError, validate};
