//! Append-only, bounded action ledger.
//!
//! Holds the most recent `retention` records across all accounts, evicting
//! oldest-first. A per-account index mirrors the global deque so per-account
//! queries touch only that account's records.
//!
//! Each account's records are appended in clock order; window scans walk
//! newest-first and stop at the first record older than the window.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::state::{ActionRecord, ActionType};

/// Success/rejection counts over a window of recent records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RollingStats {
    pub sample: usize,
    pub successes: usize,
    pub rejections: usize,
}

impl RollingStats {
    pub fn success_rate(&self) -> f64 {
        if self.sample == 0 {
            0.0
        } else {
            self.successes as f64 / self.sample as f64
        }
    }

    pub fn rejection_rate(&self) -> f64 {
        if self.sample == 0 {
            0.0
        } else {
            self.rejections as f64 / self.sample as f64
        }
    }
}

#[derive(Debug)]
pub struct ActionLedger {
    records: VecDeque<Arc<ActionRecord>>,
    by_account: HashMap<String, VecDeque<Arc<ActionRecord>>>,
    retention: usize,
}

impl ActionLedger {
    pub fn new(retention: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(retention.min(4096)),
            by_account: HashMap::new(),
            retention,
        }
    }

    /// Rebuild from persisted records (oldest first), trimming to retention.
    pub fn from_records(records: Vec<ActionRecord>, retention: usize) -> Self {
        let mut ledger = Self::new(retention);
        for record in records {
            ledger.push(Arc::new(record));
        }
        ledger.trim();
        ledger
    }

    /// Append a record and evict past retention. Returns how many records
    /// were evicted.
    pub fn append(&mut self, record: ActionRecord) -> usize {
        self.push(Arc::new(record));
        self.trim()
    }

    fn push(&mut self, record: Arc<ActionRecord>) {
        self.by_account
            .entry(record.account_id.clone())
            .or_default()
            .push_back(Arc::clone(&record));
        self.records.push_back(record);
    }

    fn trim(&mut self) -> usize {
        let mut evicted = 0;
        while self.records.len() > self.retention {
            let Some(oldest) = self.records.pop_front() else {
                break;
            };
            // The globally oldest record is also the oldest of its account.
            if let Some(per_account) = self.by_account.get_mut(&oldest.account_id) {
                per_account.pop_front();
                if per_account.is_empty() {
                    self.by_account.remove(&oldest.account_id);
                }
            }
            evicted += 1;
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Up to `n` most recent records for an account, newest first.
    pub fn recent(&self, account_id: &str, n: usize) -> Vec<&ActionRecord> {
        self.by_account
            .get(account_id)
            .map(|records| records.iter().rev().take(n).map(Arc::as_ref).collect())
            .unwrap_or_default()
    }

    /// Number of records for an account at or after `since`, optionally
    /// restricted to one action type.
    pub fn count_since(
        &self,
        account_id: &str,
        since: DateTime<Utc>,
        action: Option<ActionType>,
    ) -> usize {
        let Some(records) = self.by_account.get(account_id) else {
            return 0;
        };
        records
            .iter()
            .rev()
            .take_while(|r| r.timestamp >= since)
            .filter(|r| action.is_none_or(|a| r.action_type == a))
            .count()
    }

    /// Success/rejection stats over the `window` most recent records.
    pub fn window_stats(&self, account_id: &str, window: usize) -> RollingStats {
        let mut stats = RollingStats::default();
        for record in self.recent(account_id, window) {
            stats.sample += 1;
            if record.success {
                stats.successes += 1;
            } else if record.is_rejection() {
                stats.rejections += 1;
            }
        }
        stats
    }

    /// Most recent records first, optionally for one account.
    pub fn history(&self, account_id: Option<&str>, limit: usize) -> Vec<ActionRecord> {
        match account_id {
            Some(id) => self.recent(id, limit).into_iter().cloned().collect(),
            None => self
                .records
                .iter()
                .rev()
                .take(limit)
                .map(|r| r.as_ref().clone())
                .collect(),
        }
    }

    /// All retained records, oldest first.
    pub fn snapshot(&self) -> Vec<ActionRecord> {
        self.records.iter().map(|r| r.as_ref().clone()).collect()
    }
}
