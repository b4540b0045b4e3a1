//! Domain aggregates exposed by the CRM service layer.

use thiserror::Error;

use crate::domain::deal::DealStage;

pub mod activity;
pub mod contact;
pub mod deal;
pub mod types;
pub mod user;

/// Business rule broken by a requested state change.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RuleViolation {
    #[error("Deal value must be positive.")]
    NonPositiveDealValue,
    #[error("Expected close date cannot be in the past.")]
    CloseDateInPast,
    #[error("Cannot move deal from `{from}` to `{to}`.")]
    InvalidStageTransition { from: DealStage, to: DealStage },
    #[error("Deal is already closed.")]
    DealAlreadyClosed,
    #[error("Activity must be linked to a contact or a deal.")]
    MissingActivityTarget,
    #[error("Duration must be positive.")]
    NonPositiveDuration,
    #[error("Activity is already completed or cancelled.")]
    ActivityClosed,
}
