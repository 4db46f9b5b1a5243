use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use tenderbid_core::errors::{ApplicationError, DomainError};
use tenderbid_core::{
    Bid, BidDraft, BidId, MessageDraft, Role, Tender, TenderAward, TenderDraft, TenderId,
    TenderStatus, UserProfile,
};
use tenderbid_store::{DocumentId, DocumentPatch, DocumentStore, FieldGuard};

use crate::collections::Collections;
use crate::read_model::ReadModel;

/// The phrase the operator has to type before an irreversible award goes
/// through.
pub const AWARD_CONFIRMATION_PHRASE: &str = "AWARD";

/// Validates actions, computes derived fields, and issues the atomic writes.
/// All state it reads comes from the session's read model; all state it
/// writes goes through the store, which remains the sole source of truth.
pub struct LifecycleManager {
    store: Arc<dyn DocumentStore>,
    collections: Collections,
    read_model: Arc<ReadModel>,
    user: UserProfile,
}

impl LifecycleManager {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        collections: Collections,
        read_model: Arc<ReadModel>,
        user: UserProfile,
    ) -> Self {
        Self { store, collections, read_model, user }
    }

    pub fn user(&self) -> &UserProfile {
        &self.user
    }

    pub async fn post_tender(&self, draft: TenderDraft) -> Result<DocumentId, ApplicationError> {
        draft.validate()?;
        if self.user.role != Role::Client {
            return Err(DomainError::Validation("only clients can post tenders".to_string()).into());
        }

        let tender = Tender::open(draft, &self.user, Utc::now());
        let body = encode(&tender)?;
        let id = self.store.create(&self.collections.tenders(), body).await?;

        tracing::info!(
            event_name = "tender.posted",
            tender_id = %id.0,
            client_id = %self.user.id.0,
            "tender posted"
        );
        Ok(id)
    }

    pub async fn place_bid(
        &self,
        tender_id: &TenderId,
        draft: BidDraft,
    ) -> Result<DocumentId, ApplicationError> {
        draft.validate()?;
        if self.user.role != Role::Contractor {
            return Err(
                DomainError::Validation("only contractors can place bids".to_string()).into()
            );
        }

        let tender = self.require_tender(tender_id).await?;
        if !tender.accepts_bids() {
            return Err(DomainError::Validation(
                "bidding is closed for this tender".to_string(),
            )
            .into());
        }

        let bid = Bid::submit(draft, tender_id.clone(), &self.user, Utc::now());
        let body = encode(&bid)?;
        let id = self.store.create(&self.collections.bids(), body).await?;

        tracing::info!(
            event_name = "bid.submitted",
            bid_id = %id.0,
            tender_id = %tender_id.0,
            contractor_id = %self.user.id.0,
            amount = %bid.amount,
            platform_fee = %bid.platform_fee,
            "bid submitted"
        );
        Ok(id)
    }

    /// Awards one pending bid: the tender moves to `Awarded` with the award
    /// metadata, the chosen bid to `Awarded`, every other pending sibling to
    /// `Rejected` — one batch, all or nothing. The batch is conditioned on
    /// the tender still being `Open`, so a concurrent award loses cleanly.
    pub async fn award(
        &self,
        tender_id: &TenderId,
        bid_id: &BidId,
        confirmation: &str,
    ) -> Result<(), ApplicationError> {
        if confirmation.trim() != AWARD_CONFIRMATION_PHRASE {
            return Err(DomainError::Validation(format!(
                "type {AWARD_CONFIRMATION_PHRASE} to confirm the award"
            ))
            .into());
        }

        let tender = self.require_tender(tender_id).await?;
        self.require_owner(&tender)?;
        if !tender.can_transition_to(TenderStatus::Awarded) {
            return Err(DomainError::InvalidTenderTransition {
                from: tender.status,
                to: TenderStatus::Awarded,
            }
            .into());
        }

        let bids = self.read_model.bids_for(tender_id).await;
        let chosen = bids.iter().find(|bid| &bid.id == bid_id).ok_or_else(|| {
            DomainError::Validation("that bid no longer exists for this tender".to_string())
        })?;
        if !chosen.is_pending() {
            return Err(DomainError::InvalidBidTransition {
                from: chosen.status,
                to: tenderbid_core::BidStatus::Awarded,
            }
            .into());
        }

        let award = TenderAward::from_bid(chosen, Utc::now());
        let mut patches = vec![
            DocumentPatch::guarded(
                self.collections.tenders(),
                DocumentId(tender.id.0.clone()),
                json!({ "status": "awarded", "award": encode(&award)? }),
                FieldGuard::equals("status", "open"),
            ),
            DocumentPatch::update(
                self.collections.bids(),
                DocumentId(chosen.id.0.clone()),
                json!({ "status": "awarded" }),
            ),
        ];
        for sibling in bids.iter().filter(|bid| bid.is_pending() && bid.id != chosen.id) {
            patches.push(DocumentPatch::update(
                self.collections.bids(),
                DocumentId(sibling.id.0.clone()),
                json!({ "status": "rejected" }),
            ));
        }

        self.store.atomic_batch(patches).await.map_err(|error| {
            match ApplicationError::from(error) {
                ApplicationError::Conflict(_) => ApplicationError::Conflict(
                    "This tender was already awarded in another session.".to_string(),
                ),
                other => other,
            }
        })?;

        tracing::info!(
            event_name = "tender.awarded",
            tender_id = %tender_id.0,
            bid_id = %chosen.id.0,
            contractor_id = %chosen.contractor_id.0,
            amount = %award.amount,
            platform_fee = %award.platform_fee,
            "tender awarded"
        );
        Ok(())
    }

    /// Records payment for the already-awarded bid: tender to `Paid` with the
    /// payment date, awarded bid to `Paid`. Reuses the fee figures frozen at
    /// bid time; nothing is recomputed. Conditioned on the tender still
    /// being `Awarded`.
    pub async fn pay(&self, tender_id: &TenderId) -> Result<(), ApplicationError> {
        let tender = self.require_tender(tender_id).await?;
        self.require_owner(&tender)?;
        if !tender.can_transition_to(TenderStatus::Paid) {
            return Err(DomainError::InvalidTenderTransition {
                from: tender.status,
                to: TenderStatus::Paid,
            }
            .into());
        }
        let award = tender.award.as_ref().ok_or_else(|| {
            DomainError::InvariantViolation("awarded tender is missing its award".to_string())
        })?;

        let payment_date = Utc::now();
        let patches = vec![
            DocumentPatch::guarded(
                self.collections.tenders(),
                DocumentId(tender.id.0.clone()),
                json!({ "status": "paid", "payment_date": encode(&payment_date)? }),
                FieldGuard::equals("status", "awarded"),
            ),
            DocumentPatch::update(
                self.collections.bids(),
                DocumentId(award.bid_id.0.clone()),
                json!({ "status": "paid" }),
            ),
        ];

        self.store.atomic_batch(patches).await.map_err(|error| {
            match ApplicationError::from(error) {
                ApplicationError::Conflict(_) => ApplicationError::Conflict(
                    "This payment was already recorded in another session.".to_string(),
                ),
                other => other,
            }
        })?;

        tracing::info!(
            event_name = "tender.paid",
            tender_id = %tender_id.0,
            bid_id = %award.bid_id.0,
            amount = %award.amount,
            "payment recorded"
        );
        Ok(())
    }

    pub async fn send_message(
        &self,
        tender_id: &TenderId,
        draft: MessageDraft,
    ) -> Result<DocumentId, ApplicationError> {
        draft.validate()?;
        self.require_tender(tender_id).await?;

        let message = tenderbid_core::ChatMessage::compose(
            tender_id.clone(),
            &self.user,
            draft.text,
            Utc::now(),
        );
        let body = encode(&message)?;
        let id = self.store.create(&self.collections.chat(tender_id), body).await?;
        Ok(id)
    }

    async fn require_tender(&self, tender_id: &TenderId) -> Result<Tender, ApplicationError> {
        self.read_model.tender(tender_id).await.ok_or_else(|| {
            DomainError::Validation("that tender is not available".to_string()).into()
        })
    }

    fn require_owner(&self, tender: &Tender) -> Result<(), ApplicationError> {
        if tender.client_id != self.user.id {
            return Err(DomainError::Validation(
                "only the tender's owner can do that".to_string(),
            )
            .into());
        }
        Ok(())
    }
}

fn encode<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, ApplicationError> {
    serde_json::to_value(value).map_err(|error| ApplicationError::Persistence(error.to_string()))
}
