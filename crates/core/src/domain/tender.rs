use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::bid::{Bid, BidId};
use crate::domain::user::{UserId, UserProfile};
use crate::errors::DomainError;
use crate::validation::TenderDraft;

/// Bidding stays open for a fixed week after posting.
pub const BIDDING_WINDOW_DAYS: i64 = 7;

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenderId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenderStatus {
    Open,
    Awarded,
    Paid,
}

/// Award metadata copied from the chosen bid at award time. The fee figures
/// are the ones frozen when the bid was submitted; they are never recomputed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TenderAward {
    pub bid_id: BidId,
    pub contractor_id: UserId,
    pub amount: Decimal,
    pub platform_fee: Decimal,
    pub awarded_at: DateTime<Utc>,
}

impl TenderAward {
    pub fn from_bid(bid: &Bid, awarded_at: DateTime<Utc>) -> Self {
        Self {
            bid_id: bid.id.clone(),
            contractor_id: bid.contractor_id.clone(),
            amount: bid.amount,
            platform_fee: bid.platform_fee,
            awarded_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tender {
    /// Assigned by the document store on create; empty until then.
    #[serde(default)]
    pub id: TenderId,
    pub client_id: UserId,
    pub client_name: String,
    pub title: String,
    pub description: String,
    pub location: String,
    pub regulatory_id: String,
    pub status: TenderStatus,
    pub created_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub award: Option<TenderAward>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_date: Option<DateTime<Utc>>,
}

impl Tender {
    /// Opens a new tender from an already validated draft.
    pub fn open(draft: TenderDraft, client: &UserProfile, now: DateTime<Utc>) -> Self {
        Self {
            id: TenderId::default(),
            client_id: client.id.clone(),
            client_name: client.name.clone(),
            title: draft.title,
            description: draft.description,
            location: draft.location,
            regulatory_id: draft.regulatory_id,
            status: TenderStatus::Open,
            created_at: now,
            deadline: now + Duration::days(BIDDING_WINDOW_DAYS),
            award: None,
            payment_date: None,
        }
    }

    pub fn can_transition_to(&self, next: TenderStatus) -> bool {
        matches!(
            (self.status, next),
            (TenderStatus::Open, TenderStatus::Awarded) | (TenderStatus::Awarded, TenderStatus::Paid)
        )
    }

    pub fn accepts_bids(&self) -> bool {
        self.status == TenderStatus::Open
    }

    /// Applies the award transition, binding the status change and the award
    /// metadata together so neither can exist without the other.
    pub fn award(&mut self, award: TenderAward) -> Result<(), DomainError> {
        if !self.can_transition_to(TenderStatus::Awarded) {
            return Err(DomainError::InvalidTenderTransition {
                from: self.status,
                to: TenderStatus::Awarded,
            });
        }
        self.status = TenderStatus::Awarded;
        self.award = Some(award);
        Ok(())
    }

    pub fn mark_paid(&mut self, payment_date: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.can_transition_to(TenderStatus::Paid) {
            return Err(DomainError::InvalidTenderTransition {
                from: self.status,
                to: TenderStatus::Paid,
            });
        }
        self.status = TenderStatus::Paid;
        self.payment_date = Some(payment_date);
        Ok(())
    }
}
