use serde::de::DeserializeOwned;
use tokio::sync::RwLock;

use tenderbid_core::{ranking, Bid, Tender, TenderId};
use tenderbid_store::Document;

/// Per-session cache of the shared store, refreshed wholesale on every
/// subscription snapshot.
///
/// Eventually consistent by design: there is no guarantee a session observes
/// its own just-written change before the feed delivers it, so nothing here
/// may be treated as read-after-write state.
#[derive(Default)]
pub struct ReadModel {
    tenders: RwLock<Vec<Tender>>,
    bids: RwLock<Vec<Bid>>,
}

impl ReadModel {
    pub async fn replace_tenders(&self, snapshot: &[Document]) {
        *self.tenders.write().await = decode_all(snapshot, "tender");
    }

    pub async fn replace_bids(&self, snapshot: &[Document]) {
        *self.bids.write().await = decode_all(snapshot, "bid");
    }

    pub async fn tenders(&self) -> Vec<Tender> {
        self.tenders.read().await.clone()
    }

    pub async fn tender(&self, id: &TenderId) -> Option<Tender> {
        self.tenders.read().await.iter().find(|tender| &tender.id == id).cloned()
    }

    /// A tender's bids in insertion order.
    pub async fn bids_for(&self, tender_id: &TenderId) -> Vec<Bid> {
        let bids = self.bids.read().await;
        ranking::bids_for_tender(&bids, tender_id).into_iter().cloned().collect()
    }

    /// All of a tender's bids, cheapest first.
    pub async fn ranked_bids_for(&self, tender_id: &TenderId) -> Vec<Bid> {
        let bids = self.bids.read().await;
        ranking::ranked(&bids, tender_id).into_iter().cloned().collect()
    }

    /// Pending bids offered as award choices, cheapest first.
    pub async fn pending_bids_for(&self, tender_id: &TenderId) -> Vec<Bid> {
        let bids = self.bids.read().await;
        ranking::pending_choices(&bids, tender_id).into_iter().cloned().collect()
    }

    /// The suggested (never enforced) award default.
    pub async fn lowest_bid_for(&self, tender_id: &TenderId) -> Option<Bid> {
        let bids = self.bids.read().await;
        ranking::lowest_bid(&bids, tender_id).cloned()
    }
}

/// Documents that fail to decode are logged and dropped from the snapshot
/// rather than poisoning the whole refresh.
fn decode_all<T: DeserializeOwned>(snapshot: &[Document], kind: &'static str) -> Vec<T> {
    snapshot
        .iter()
        .filter_map(|document| match serde_json::from_value::<T>(document.body.clone()) {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::warn!(
                    event_name = "read_model.decode_failed",
                    kind,
                    document_id = %document.id.0,
                    error = %error,
                    "dropping undecodable document from snapshot"
                );
                None
            }
        })
        .collect()
}
