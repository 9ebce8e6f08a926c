use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use super::bid::Bid;
use super::lead::Lead;

/// Aggregate type written to the outbox; the CDC relay routes on it.
pub const AGGREGATE_TYPE: &str = "Lead";

/// State changes the engine announces to realtime observers.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    LeadCreated {
        lead_id: Uuid,
        client_id: Uuid,
        service_category: String,
    },
    LeadUpdated {
        lead_id: Uuid,
        status: String,
        assigned_professional_id: Option<Uuid>,
    },
    BidCreated {
        lead_id: Uuid,
        bid_id: Uuid,
        professional_id: Uuid,
        proposed_price: BigDecimal,
    },
    BidWithdrawn {
        lead_id: Uuid,
        bid_id: Uuid,
        professional_id: Uuid,
    },
    BidSelected {
        lead_id: Uuid,
        bid_id: Uuid,
        professional_id: Uuid,
        rejected_bid_ids: Vec<Uuid>,
    },
    QuoteSent {
        lead_id: Uuid,
        professional_id: Uuid,
        total: BigDecimal,
        item_count: usize,
    },
    QuoteAccepted {
        lead_id: Uuid,
        client_id: Uuid,
        agreed_price: BigDecimal,
        agreed_at: DateTime<Utc>,
    },
}

impl DomainEvent {
    pub fn lead_updated(lead: &Lead) -> Self {
        Self::LeadUpdated {
            lead_id: lead.id,
            status: lead.status.to_string(),
            assigned_professional_id: lead.assigned_professional_id,
        }
    }

    pub fn bid_created(bid: &Bid) -> Self {
        Self::BidCreated {
            lead_id: bid.lead_id,
            bid_id: bid.id,
            professional_id: bid.professional_id,
            proposed_price: bid.proposed_price.clone(),
        }
    }

    pub fn lead_id(&self) -> Uuid {
        match self {
            Self::LeadCreated { lead_id, .. }
            | Self::LeadUpdated { lead_id, .. }
            | Self::BidCreated { lead_id, .. }
            | Self::BidWithdrawn { lead_id, .. }
            | Self::BidSelected { lead_id, .. }
            | Self::QuoteSent { lead_id, .. }
            | Self::QuoteAccepted { lead_id, .. } => *lead_id,
        }
    }

    /// Topic name used as the outbox `event_type`.
    pub fn topic(&self) -> &'static str {
        match self {
            Self::LeadCreated { .. } => "lead.created",
            Self::LeadUpdated { .. } => "lead.updated",
            Self::BidCreated { .. } => "bid.created",
            Self::BidWithdrawn { .. } => "bid.withdrawn",
            Self::BidSelected { .. } => "bid.selected",
            Self::QuoteSent { .. } => "quote.sent",
            Self::QuoteAccepted { .. } => "quote.accepted",
        }
    }

    pub fn payload(&self) -> Value {
        match self {
            Self::LeadCreated {
                lead_id,
                client_id,
                service_category,
            } => json!({
                "lead_id": lead_id,
                "client_id": client_id,
                "service_category": service_category,
            }),
            Self::LeadUpdated {
                lead_id,
                status,
                assigned_professional_id,
            } => json!({
                "lead_id": lead_id,
                "status": status,
                "assigned_professional_id": assigned_professional_id,
            }),
            Self::BidCreated {
                lead_id,
                bid_id,
                professional_id,
                proposed_price,
            } => json!({
                "lead_id": lead_id,
                "bid_id": bid_id,
                "professional_id": professional_id,
                "proposed_price": proposed_price.to_string(),
            }),
            Self::BidWithdrawn {
                lead_id,
                bid_id,
                professional_id,
            } => json!({
                "lead_id": lead_id,
                "bid_id": bid_id,
                "professional_id": professional_id,
            }),
            Self::BidSelected {
                lead_id,
                bid_id,
                professional_id,
                rejected_bid_ids,
            } => json!({
                "lead_id": lead_id,
                "bid_id": bid_id,
                "professional_id": professional_id,
                "rejected_bid_ids": rejected_bid_ids,
            }),
            Self::QuoteSent {
                lead_id,
                professional_id,
                total,
                item_count,
            } => json!({
                "lead_id": lead_id,
                "professional_id": professional_id,
                "total": total.to_string(),
                "item_count": item_count,
            }),
            Self::QuoteAccepted {
                lead_id,
                client_id,
                agreed_price,
                agreed_at,
            } => json!({
                "lead_id": lead_id,
                "client_id": client_id,
                "agreed_price": agreed_price.to_string(),
                "agreed_at": agreed_at.to_rfc3339(),
            }),
        }
    }
}

/// An event as recorded in the outbox.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxEvent {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub event_type: String,
    pub actor_id: Option<Uuid>,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

impl OutboxEvent {
    pub fn record(event: &DomainEvent, actor_id: Option<Uuid>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            lead_id: event.lead_id(),
            event_type: event.topic().to_string(),
            actor_id,
            payload: event.payload(),
            created_at: now,
        }
    }
}
