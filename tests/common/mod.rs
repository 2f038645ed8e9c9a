//! Integration test common infrastructure.
//!
//! Builds limiters on a [`ManualClock`] so windows, cooldowns and day
//! boundaries can be stepped through deterministically.

use chrono::{DateTime, Duration, TimeZone, Utc};
use pacekeeper::{
    AccountType, ActionOutcome, ActionRecord, ActionType, AdmissionController, AdmissionDecision,
    ManualClock, MemoryStore, RateLimitConfig, StateStore,
};
use std::sync::Arc;

/// Friday 2024-05-10 09:00:00.250 UTC. The sub-second part makes timestamp
/// round-trips meaningful.
#[allow(dead_code)]
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 10, 9, 0, 0).unwrap() + Duration::milliseconds(250)
}

pub struct Harness {
    pub limiter: AdmissionController,
    pub clock: Arc<ManualClock>,
    pub store: Arc<MemoryStore>,
}

#[allow(dead_code)]
impl Harness {
    pub fn new() -> Self {
        Self::with_config(RateLimitConfig::default())
    }

    pub fn with_config(config: RateLimitConfig) -> Self {
        let clock = Arc::new(ManualClock::new(t0()));
        let store = Arc::new(MemoryStore::new());
        let limiter = AdmissionController::new(config, clock.clone(), store.clone());
        Self {
            limiter,
            clock,
            store,
        }
    }

    /// Same config and clock, different store.
    pub fn limiter_on(&self, config: RateLimitConfig, store: Arc<dyn StateStore>) -> AdmissionController {
        AdmissionController::new(config, self.clock.clone(), store)
    }

    pub fn register(&self, id: &str, tier: AccountType) {
        self.limiter.register_account(id, tier, false);
    }

    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    pub fn check(&self, id: &str, action: ActionType) -> AdmissionDecision {
        self.limiter
            .check_action(id, action)
            .expect("account is registered")
    }

    pub fn record(&self, id: &str, action: ActionType, outcome: ActionOutcome) -> ActionRecord {
        self.limiter
            .record_action(id, action, outcome)
            .expect("account is registered")
    }
}
