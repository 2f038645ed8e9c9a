//! Suspicious activity detection.
//!
//! Two jobs:
//! - [`SuspicionDetector::detect`] decides, at check time, whether the account
//!   looks flagged right now. Signals are evaluated in a fixed order (rapid
//!   actions, rejection rate, pattern score) and the first hit wins.
//! - [`SuspicionDetector::score`] recomputes the bounded anomaly score from
//!   the most recent records after each recorded action.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::config::SuspicionConfig;
use crate::state::{AccountProfile, ActionRecord};

/// How hard to back off once a pattern is detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Critical,
    Suspension,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "warning",
            Severity::Critical => "critical",
            Severity::Suspension => "suspension",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected behavior pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "pattern", rename_all = "snake_case")]
pub enum SuspiciousPattern {
    RapidActions { count: usize, window_secs: u64 },
    HighRejectionRate { rate: f64 },
    UnusualPattern { score: f64 },
}

impl SuspiciousPattern {
    pub fn severity(&self) -> Severity {
        match self {
            SuspiciousPattern::RapidActions { .. } => Severity::Warning,
            SuspiciousPattern::HighRejectionRate { .. } => Severity::Critical,
            SuspiciousPattern::UnusualPattern { .. } => Severity::Suspension,
        }
    }

    /// Static label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            SuspiciousPattern::RapidActions { .. } => "rapid_actions",
            SuspiciousPattern::HighRejectionRate { .. } => "high_rejection_rate",
            SuspiciousPattern::UnusualPattern { .. } => "unusual_pattern",
        }
    }
}

impl fmt::Display for SuspiciousPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuspiciousPattern::RapidActions { count, window_secs } => {
                write!(f, "rapid actions ({count} in {window_secs}s)")
            }
            SuspiciousPattern::HighRejectionRate { rate } => {
                write!(f, "high rejection rate ({:.0}%)", rate * 100.0)
            }
            SuspiciousPattern::UnusualPattern { score } => {
                write!(f, "unusual activity pattern (score {score:.2})")
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct SuspicionDetector {
    config: SuspicionConfig,
}

impl SuspicionDetector {
    pub fn new(config: SuspicionConfig) -> Self {
        Self { config }
    }

    /// Check the account's current signals.
    ///
    /// `recent_actions` is the number of ledger records inside the trailing
    /// rapid-action window.
    pub fn detect(&self, profile: &AccountProfile, recent_actions: usize) -> Option<SuspiciousPattern> {
        let cfg = &self.config;

        if recent_actions >= cfg.rapid_action_threshold {
            return Some(SuspiciousPattern::RapidActions {
                count: recent_actions,
                window_secs: cfg.rapid_window_secs,
            });
        }
        if profile.rejection_rate > cfg.rejection_rate_threshold {
            return Some(SuspiciousPattern::HighRejectionRate {
                rate: profile.rejection_rate,
            });
        }
        if profile.suspicious_activity_score > cfg.score_threshold {
            return Some(SuspiciousPattern::UnusualPattern {
                score: profile.suspicious_activity_score,
            });
        }
        None
    }

    /// Recompute the anomaly score from `recent` (newest first, at most
    /// `score_window` records).
    ///
    /// Returns `None` when there are not yet enough records; the caller keeps
    /// the previous score.
    pub fn score(&self, recent: &[&ActionRecord], rejection_rate: f64) -> Option<f64> {
        let cfg = &self.config;
        if recent.len() <= cfg.score_min_records {
            return None;
        }

        let mut score = 0.0;

        // Cadence: actions per minute across the window.
        if let (Some(newest), Some(oldest)) = (recent.first(), recent.last()) {
            let span_secs = (newest.timestamp - oldest.timestamp).num_milliseconds() as f64 / 1000.0;
            let per_minute = if span_secs > 0.0 {
                recent.len() as f64 / (span_secs / 60.0)
            } else {
                f64::INFINITY
            };
            if per_minute > cfg.rate_per_minute_threshold {
                score += cfg.rate_weight;
            }
        }

        // Diversity: bots tend to repeat one action type.
        let distinct: HashSet<_> = recent.iter().map(|r| r.action_type).collect();
        if recent.len() > cfg.diversity_min_actions && distinct.len() < cfg.diversity_min_types {
            score += cfg.diversity_weight;
        }

        if rejection_rate > cfg.rejection_score_threshold {
            score += cfg.rejection_weight;
        }

        Some(clamp_score(score))
    }
}

/// Clamp a score into [0, 1].
#[inline]
pub fn clamp_score(score: f64) -> f64 {
    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ActionType;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap()
    }

    fn detector() -> SuspicionDetector {
        SuspicionDetector::new(SuspicionConfig::default())
    }

    fn profile() -> AccountProfile {
        AccountProfile::new("acct", t0() - Duration::days(90), false, t0(), 30)
    }

    /// `n` records spaced `gap_secs` apart, cycling through `types`; returned
    /// newest first.
    fn records(n: usize, gap_secs: i64, types: &[ActionType]) -> Vec<ActionRecord> {
        let mut out: Vec<_> = (0..n)
            .map(|i| ActionRecord {
                account_id: "acct".into(),
                action_type: types[i % types.len()],
                timestamp: t0() + Duration::seconds(i as i64 * gap_secs),
                success: true,
                rejection_reason: None,
                delay_used: 0,
            })
            .collect();
        out.reverse();
        out
    }

    #[test]
    fn test_clean_account_not_flagged() {
        assert_eq!(detector().detect(&profile(), 4), None);
    }

    #[test]
    fn test_rapid_actions_flag_warning() {
        let hit = detector().detect(&profile(), 5).unwrap();
        assert_eq!(hit, SuspiciousPattern::RapidActions { count: 5, window_secs: 60 });
        assert_eq!(hit.severity(), Severity::Warning);
        assert_eq!(hit.to_string(), "rapid actions (5 in 60s)");
    }

    #[test]
    fn test_rejection_rate_flags_critical() {
        let mut p = profile();
        p.rejection_rate = 0.31;
        let hit = detector().detect(&p, 0).unwrap();
        assert_eq!(hit.severity(), Severity::Critical);
        assert_eq!(hit.label(), "high_rejection_rate");
    }

    #[test]
    fn test_score_flags_suspension() {
        let mut p = profile();
        p.suspicious_activity_score = 0.71;
        assert_eq!(detector().detect(&p, 0).unwrap().severity(), Severity::Suspension);
    }

    #[test]
    fn test_first_signal_wins() {
        let mut p = profile();
        p.rejection_rate = 0.9;
        p.suspicious_activity_score = 1.0;
        assert_eq!(detector().detect(&p, 9).unwrap().label(), "rapid_actions");
        assert_eq!(detector().detect(&p, 0).unwrap().label(), "high_rejection_rate");
    }

    #[test]
    fn test_score_needs_more_than_ten_records() {
        let recs = records(10, 1, &[ActionType::Message]);
        let refs: Vec<_> = recs.iter().collect();
        assert_eq!(detector().score(&refs, 1.0), None);
    }

    #[test]
    fn test_score_contributions_add_up() {
        // 11 identical actions, one second apart: fast and monotonous.
        let recs = records(11, 1, &[ActionType::ConnectionRequest]);
        let refs: Vec<_> = recs.iter().collect();
        let score = detector().score(&refs, 0.0).unwrap();
        assert!((score - 0.5).abs() < 1e-9, "score {score}");

        let score = detector().score(&refs, 0.6).unwrap();
        assert!((score - 0.9).abs() < 1e-9, "score {score}");
    }

    #[test]
    fn test_calm_varied_activity_scores_zero() {
        // 20 mixed actions, ten minutes apart.
        let recs = records(20, 600, &[ActionType::Message, ActionType::ProfileView]);
        let refs: Vec<_> = recs.iter().collect();
        assert_eq!(detector().score(&refs, 0.1), Some(0.0));
    }

    #[test]
    fn test_simultaneous_records_count_as_fast() {
        let recs = records(12, 0, &[ActionType::Message, ActionType::Search]);
        let refs: Vec<_> = recs.iter().collect();
        let score = detector().score(&refs, 0.0).unwrap();
        assert!((score - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_score_is_clamped() {
        let mut config = SuspicionConfig::default();
        config.rate_weight = 0.7;
        config.diversity_weight = 0.7;
        config.rejection_weight = 0.7;
        let detector = SuspicionDetector::new(config);
        let recs = records(15, 1, &[ActionType::Message]);
        let refs: Vec<_> = recs.iter().collect();
        assert_eq!(detector.score(&refs, 1.0), Some(1.0));
        assert_eq!(clamp_score(-0.5), 0.0);
    }
}
