// Adapters layer: concrete implementations for external systems (chat transport, scheduling).

pub mod scheduler;
pub mod telegram;

pub use scheduler::{Cadence, Scheduler, WeeklySchedule};
pub use telegram::{TelegramClient, TelegramTransport, UpdatePoller};
