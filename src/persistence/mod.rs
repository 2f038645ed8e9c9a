//! Durable snapshot storage.
//!
//! The limiter writes its full state as one [`Snapshot`] document: every
//! profile plus the retained ledger. Stores are synchronous; callers that
//! must not block an async runtime go through [`flush::spawn_flush_task`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::PersistenceError;
use crate::state::{AccountProfile, ActionRecord};

pub mod flush;
mod json;
mod memory;

pub use flush::spawn_flush_task;
pub use json::JsonFileStore;
pub use memory::MemoryStore;

/// Full persisted state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub profiles: BTreeMap<String, AccountProfile>,
    /// Retained ledger, oldest first.
    pub actions: Vec<ActionRecord>,
    pub last_saved: DateTime<Utc>,
}

impl Snapshot {
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            profiles: BTreeMap::new(),
            actions: Vec::new(),
            last_saved: now,
        }
    }
}

/// Backend for [`Snapshot`]s.
pub trait StateStore: Send + Sync {
    /// Load the last saved snapshot. `Ok(None)` means nothing was saved yet.
    fn load(&self) -> Result<Option<Snapshot>, PersistenceError>;

    /// Replace the stored snapshot.
    fn save(&self, snapshot: &Snapshot) -> Result<(), PersistenceError>;

    /// Short description for logs (a path, or "memory").
    fn describe(&self) -> String;
}
