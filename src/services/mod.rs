pub mod digest;
pub mod normalizer;
pub mod notifier;
pub mod pipeline;
pub mod scheduler;
pub mod sync_service;

pub use notifier::{Messenger, NoopMessenger, Notifier, TelegramMessenger};
pub use pipeline::{CycleOutcome, Pipeline};
pub use scheduler::SyncScheduler;
pub use sync_service::{SyncService, SyncSummary};
