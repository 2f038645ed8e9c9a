//! Prometheus metrics for the admission controller.
//!
//! Metrics are registered into a process-wide registry by [`init`]; recording
//! before `init` is a silent no-op, so hosts that do not scrape metrics pay
//! nothing beyond an atomic load.
//!
//! - `pacekeeper_checks_total{action,result}` - admission checks by outcome
//! - `pacekeeper_denials_total{reason}` - denials by reason
//! - `pacekeeper_cooldowns_total{severity}` - cooldowns triggered
//! - `pacekeeper_actions_recorded_total{action,outcome}` - recorded actions
//! - `pacekeeper_persist_failures_total` - snapshot writes that failed
//! - `pacekeeper_persist_duration_seconds` - snapshot write latency
//! - `pacekeeper_tracked_accounts` - registered accounts

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Counters
// ========================================================================

pub static CHECKS: OnceLock<IntCounterVec> = OnceLock::new();

pub static DENIALS: OnceLock<IntCounterVec> = OnceLock::new();

pub static COOLDOWNS: OnceLock<IntCounterVec> = OnceLock::new();

pub static ACTIONS_RECORDED: OnceLock<IntCounterVec> = OnceLock::new();

/// Snapshot writes that failed. Non-zero means in-memory state is at risk of
/// loss on restart.
pub static PERSIST_FAILURES: OnceLock<IntCounter> = OnceLock::new();

// ========================================================================
// Gauges / Histograms
// ========================================================================

pub static PERSIST_DURATION: OnceLock<Histogram> = OnceLock::new();

pub static TRACKED_ACCOUNTS: OnceLock<IntGauge> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Safe to call more than once; only the first call registers.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            if $metric.get().is_none() {
                let m = $init.expect(concat!(stringify!($metric), " creation failed"));
                if let Err(e) = r.register(Box::new(m.clone())) {
                    tracing::warn!(error = %e, concat!("Failed to register metric ", stringify!($metric)));
                }
                let _ = $metric.set(m);
            }
        };
    }

    register!(CHECKS, IntCounterVec::new(Opts::new("pacekeeper_checks_total", "Admission checks by action and result"), &["action", "result"]));
    register!(DENIALS, IntCounterVec::new(Opts::new("pacekeeper_denials_total", "Admission denials by reason"), &["reason"]));
    register!(COOLDOWNS, IntCounterVec::new(Opts::new("pacekeeper_cooldowns_total", "Cooldowns triggered by severity"), &["severity"]));
    register!(ACTIONS_RECORDED, IntCounterVec::new(Opts::new("pacekeeper_actions_recorded_total", "Recorded actions by type and outcome"), &["action", "outcome"]));
    register!(PERSIST_FAILURES, IntCounter::new("pacekeeper_persist_failures_total", "Snapshot writes that failed"));
    register!(PERSIST_DURATION, Histogram::with_opts(
        HistogramOpts::new("pacekeeper_persist_duration_seconds", "Snapshot write latency")
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0])));
    register!(TRACKED_ACCOUNTS, IntGauge::new("pacekeeper_tracked_accounts", "Registered accounts"));
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

// ============================================================================
// Helper functions
// ============================================================================

#[inline]
pub fn record_check(action: &str, allowed: bool) {
    if let Some(c) = CHECKS.get() {
        c.with_label_values(&[action, if allowed { "allowed" } else { "denied" }])
            .inc();
    }
}

#[inline]
pub fn record_denial(reason: &str) {
    if let Some(c) = DENIALS.get() {
        c.with_label_values(&[reason]).inc();
    }
}

#[inline]
pub fn record_cooldown(severity: &str) {
    if let Some(c) = COOLDOWNS.get() {
        c.with_label_values(&[severity]).inc();
    }
}

#[inline]
pub fn record_action(action: &str, outcome: &str) {
    if let Some(c) = ACTIONS_RECORDED.get() {
        c.with_label_values(&[action, outcome]).inc();
    }
}

#[inline]
pub fn record_persist(duration_secs: f64, ok: bool) {
    if let Some(h) = PERSIST_DURATION.get() {
        h.observe(duration_secs);
    }
    if !ok && let Some(c) = PERSIST_FAILURES.get() {
        c.inc();
    }
}

#[inline]
pub fn set_tracked_accounts(count: usize) {
    if let Some(g) = TRACKED_ACCOUNTS.get() {
        g.set(i64::try_from(count).unwrap_or(i64::MAX));
    }
}
