use thiserror::Error;

use crate::alerts::{Alert, AlertLevel};
use crate::domain::bid::BidStatus;
use crate::domain::tender::TenderStatus;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid tender transition from {from:?} to {to:?}")]
    InvalidTenderTransition { from: TenderStatus, to: TenderStatus },
    #[error("invalid bid transition from {from:?} to {to:?}")]
    InvalidBidTransition { from: BidStatus, to: BidStatus },
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    /// A guarded batch lost a race: the record changed under the
    /// precondition before the write landed.
    #[error("write conflict: {0}")]
    Conflict(String),
    #[error("authentication failure: {0}")]
    Auth(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    /// Converts a failed action into the transient alert shown to the
    /// operator. Validation problems are warnings the operator can fix;
    /// everything else is an error.
    pub fn to_alert(&self) -> Alert {
        match self {
            Self::Domain(DomainError::Validation(message)) => Alert::warning(message.clone()),
            Self::Domain(error) => Alert::warning(error.to_string()),
            Self::Conflict(message) => Alert::error(message.clone()),
            Self::Persistence(_) => {
                Alert::error("The change could not be saved. Please try again.")
            }
            Self::Auth(_) => Alert::error("Sign-in failed. Please reconnect and try again."),
            Self::Configuration(_) => Alert::error("The application is misconfigured."),
        }
    }

    pub fn alert_level(&self) -> AlertLevel {
        self.to_alert().level
    }
}
