//! Account and action state types.
//!
//! - [`profile`]: per-account profile ([`AccountProfile`], [`AccountType`], [`DailyUsage`])
//! - [`record`]: ledger entries ([`ActionRecord`], [`ActionType`], [`ActionOutcome`])

mod profile;
mod record;

pub use profile::{AccountProfile, AccountType, DailyUsage};
pub use record::{ActionOutcome, ActionRecord, ActionType};
