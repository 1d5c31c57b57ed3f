pub mod reminder;

pub use reminder::{ArchiveReason, ArchivedReminder, ReminderRecord};
