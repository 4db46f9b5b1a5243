use crate::domain::bid::Bid;
use crate::domain::tender::TenderId;

/// Bids for one tender in insertion order.
pub fn bids_for_tender<'a>(bids: &'a [Bid], tender_id: &TenderId) -> Vec<&'a Bid> {
    bids.iter().filter(|bid| &bid.tender_id == tender_id).collect()
}

/// All of a tender's bids, cheapest first. `sort_by` is stable, so bids with
/// equal amounts keep their insertion order and the ranking is deterministic.
pub fn ranked<'a>(bids: &'a [Bid], tender_id: &TenderId) -> Vec<&'a Bid> {
    let mut ranked = bids_for_tender(bids, tender_id);
    ranked.sort_by(|a, b| a.amount.cmp(&b.amount));
    ranked
}

/// The pending bids a client can choose between when awarding, cheapest first.
pub fn pending_choices<'a>(bids: &'a [Bid], tender_id: &TenderId) -> Vec<&'a Bid> {
    let mut pending: Vec<&Bid> =
        bids_for_tender(bids, tender_id).into_iter().filter(|bid| bid.is_pending()).collect();
    pending.sort_by(|a, b| a.amount.cmp(&b.amount));
    pending
}

/// The lowest bid shown on the tender summary. Suggested as the award
/// default, never enforced.
pub fn lowest_bid<'a>(bids: &'a [Bid], tender_id: &TenderId) -> Option<&'a Bid> {
    ranked(bids, tender_id).into_iter().next()
}
