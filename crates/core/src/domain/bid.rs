use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::tender::TenderId;
use crate::domain::user::{UserId, UserProfile};
use crate::errors::DomainError;
use crate::fees::split_amount;
use crate::validation::BidDraft;

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BidId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BidStatus {
    Pending,
    Awarded,
    Rejected,
    Paid,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    /// Assigned by the document store on create; empty until then.
    #[serde(default)]
    pub id: BidId,
    pub tender_id: TenderId,
    pub contractor_id: UserId,
    pub contractor_name: String,
    pub amount: Decimal,
    pub duration_days: u32,
    /// Frozen at submission time together with `net_earnings`; the award and
    /// payment transitions reuse these figures as-is.
    pub platform_fee: Decimal,
    pub net_earnings: Decimal,
    pub status: BidStatus,
    pub submitted_at: DateTime<Utc>,
}

impl Bid {
    /// Builds a pending bid from a validated draft, computing the commission
    /// split exactly once.
    pub fn submit(
        draft: BidDraft,
        tender_id: TenderId,
        contractor: &UserProfile,
        now: DateTime<Utc>,
    ) -> Self {
        let fees = split_amount(draft.amount);
        Self {
            id: BidId::default(),
            tender_id,
            contractor_id: contractor.id.clone(),
            contractor_name: contractor.name.clone(),
            amount: draft.amount,
            duration_days: draft.duration_days,
            platform_fee: fees.platform_fee,
            net_earnings: fees.net_earnings,
            status: BidStatus::Pending,
            submitted_at: now,
        }
    }

    pub fn can_transition_to(&self, next: BidStatus) -> bool {
        matches!(
            (self.status, next),
            (BidStatus::Pending, BidStatus::Awarded)
                | (BidStatus::Pending, BidStatus::Rejected)
                | (BidStatus::Awarded, BidStatus::Paid)
        )
    }

    pub fn transition_to(&mut self, next: BidStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            self.status = next;
            return Ok(());
        }

        Err(DomainError::InvalidBidTransition { from: self.status, to: next })
    }

    pub fn is_pending(&self) -> bool {
        self.status == BidStatus::Pending
    }
}
