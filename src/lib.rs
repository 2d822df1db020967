pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{Cadence, Scheduler, TelegramClient, TelegramTransport, UpdatePoller};
pub use config::BotConfig;
pub use self::core::{engine::RotationEngine, ledger::RotationLedger, session::NegotiationSession};
pub use utils::error::{Result, RotationError};
