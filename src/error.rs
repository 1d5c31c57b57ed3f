//! Error taxonomy for the reminder core.
//!
//! None of these are fatal to the process. They are carried inside
//! `anyhow::Error` and recovered with `downcast_ref` where they are handled.

use thiserror::Error;

use crate::db::models::ReminderRecord;

#[derive(Debug, Error)]
pub enum ReminderError {
    #[error("reminder already stored: {0}")]
    DuplicateRecord(ReminderRecord),

    #[error("language model output did not contain a (description, date, time) triple")]
    ExtractionFailed,

    #[error("{collaborator} unavailable: {reason}")]
    CollaboratorUnavailable {
        collaborator: &'static str,
        reason: String,
    },

    #[error("no speech detected")]
    CaptureEmpty,
}

impl ReminderError {
    pub fn unavailable(collaborator: &'static str, reason: impl ToString) -> Self {
        ReminderError::CollaboratorUnavailable {
            collaborator,
            reason: reason.to_string(),
        }
    }
}
