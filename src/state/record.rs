//! Action records: the immutable entries of the action ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of outbound action an automation worker performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    ConnectionRequest,
    Message,
    ProfileView,
    Search,
}

impl ActionType {
    pub const ALL: [ActionType; 4] = [
        ActionType::ConnectionRequest,
        ActionType::Message,
        ActionType::ProfileView,
        ActionType::Search,
    ];

    /// Stable label used in logs, metrics and denial reasons.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::ConnectionRequest => "connection_request",
            ActionType::Message => "message",
            ActionType::ProfileView => "profile_view",
            ActionType::Search => "search",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded action. Never mutated after it enters the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub account_id: String,
    pub action_type: ActionType,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    /// Delay (ms) applied before this action.
    pub delay_used: u64,
}

impl ActionRecord {
    /// A failed action the platform explicitly rejected.
    ///
    /// Failures without a reason (timeouts, scraper errors) are neither
    /// successes nor rejections.
    #[inline]
    pub fn is_rejection(&self) -> bool {
        !self.success && self.rejection_reason.is_some()
    }
}

/// Outcome reported back by the caller after performing an action.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionOutcome {
    pub success: bool,
    pub rejection_reason: Option<String>,
    /// Delay the caller actually waited. When absent, the adaptive delay is
    /// recomputed at record time.
    pub delay_ms: Option<u64>,
}

impl ActionOutcome {
    pub fn success() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            rejection_reason: Some(reason.into()),
            delay_ms: None,
        }
    }

    /// A failure with no platform verdict attached.
    pub fn failed() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = Some(delay_ms);
        self
    }
}
