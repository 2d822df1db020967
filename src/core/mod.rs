pub mod engine;
pub mod ledger;
pub mod session;

pub use crate::domain::model::{Event, LedgerEntry, Member, Notice, ReplyKind};
pub use crate::domain::ports::{RosterProvider, Transport};
pub use crate::utils::error::Result;
