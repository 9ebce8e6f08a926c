//! Bid placement, withdrawal and selection over one lead aggregate.
//!
//! These functions only mutate the aggregate they are given; the store runs
//! each of them inside one atomic unit.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::bid::{Bid, BidStatus, NewBid};
use super::errors::DomainError;
use super::events::DomainEvent;
use super::lead::{LeadAggregate, LeadStatus};
use super::lifecycle::{self, BidSelection, LifecycleEvent};

pub fn submit(agg: &mut LeadAggregate, new_bid: &NewBid, now: DateTime<Utc>) -> Result<Vec<DomainEvent>, DomainError> {
    if agg.lead.status != LeadStatus::Searching {
        return Err(DomainError::LeadNotAcceptingBids);
    }
    if agg
        .bids
        .iter()
        .any(|b| b.is_active() && b.professional_id == new_bid.professional_id)
    {
        return Err(DomainError::DuplicateActiveBid);
    }

    let bid = Bid {
        id: new_bid.id,
        lead_id: agg.lead.id,
        professional_id: new_bid.professional_id,
        proposed_price: new_bid.offer.proposed_price.clone(),
        estimated_time: new_bid.offer.estimated_time,
        message: new_bid.offer.message.clone(),
        status: BidStatus::Active,
        created_at: now,
        updated_at: now,
    };
    let event = DomainEvent::bid_created(&bid);
    agg.bids.push(bid);
    Ok(vec![event])
}

pub fn withdraw(
    agg: &mut LeadAggregate,
    bid_id: Uuid,
    requester_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Vec<DomainEvent>, DomainError> {
    let lead_id = agg.lead.id;
    let bid = agg.bid_mut(bid_id).ok_or(DomainError::BidNotFound)?;
    if bid.professional_id != requester_id {
        return Err(DomainError::NotBidOwner);
    }
    if !bid.is_active() {
        return Err(DomainError::BidNotActive);
    }

    bid.status = BidStatus::Withdrawn;
    bid.updated_at = now;
    Ok(vec![DomainEvent::BidWithdrawn {
        lead_id,
        bid_id,
        professional_id: requester_id,
    }])
}

/// Selects `bid_id` as the lead's winner: the bid becomes `selected`, every
/// other active bid `rejected`, and the lead `assigned` to the bidder.
///
/// Lead state is checked before bid state so that a caller who lost a race
/// always sees `LeadAlreadyAssigned`, even though their bid was just rejected.
pub fn select(
    agg: &mut LeadAggregate,
    bid_id: Uuid,
    client_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Vec<DomainEvent>, DomainError> {
    let professional_id = agg.bid(bid_id).ok_or(DomainError::BidNotFound)?.professional_id;
    if agg.lead.client_id != client_id {
        return Err(DomainError::NotLeadOwner);
    }
    match agg.lead.status {
        LeadStatus::Searching => {}
        LeadStatus::Cancelled => return Err(DomainError::LeadNotAcceptingBids),
        _ => return Err(DomainError::LeadAlreadyAssigned),
    }
    if !agg.bid(bid_id).is_some_and(Bid::is_active) {
        return Err(DomainError::BidNotActive);
    }

    let lead = lifecycle::transition(
        &agg.lead,
        LifecycleEvent::BidSelected(BidSelection::new(professional_id)),
        now,
    )?;

    let mut rejected_bid_ids = Vec::new();
    for bid in agg.bids.iter_mut().filter(|b| b.is_active()) {
        if bid.id == bid_id {
            bid.status = BidStatus::Selected;
        } else {
            bid.status = BidStatus::Rejected;
            rejected_bid_ids.push(bid.id);
        }
        bid.updated_at = now;
    }
    agg.lead = lead;

    Ok(vec![
        DomainEvent::BidSelected {
            lead_id: agg.lead.id,
            bid_id,
            professional_id,
            rejected_bid_ids,
        },
        DomainEvent::lead_updated(&agg.lead),
    ])
}

/// Closes every still-active bid, used when the lead itself closes.
pub fn reject_active(agg: &mut LeadAggregate, now: DateTime<Utc>) {
    for bid in agg.bids.iter_mut().filter(|b| b.is_active()) {
        bid.status = BidStatus::Rejected;
        bid.updated_at = now;
    }
}
