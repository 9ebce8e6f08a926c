use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::bid::{Bid, BidStatus};
use crate::domain::errors::DomainError;
use crate::domain::events::{OutboxEvent, AGGREGATE_TYPE};
use crate::domain::geo::Coordinate;
use crate::domain::lead::{Lead, LeadStatus, NegotiationStatus, QuoteItem};
use crate::domain::professional::{ProfessionalStats, VerificationStatus};
use crate::schema::{bids, lead_outbox, lead_quote_items, leads, professional_profiles};

fn corrupt(what: &str, detail: impl std::fmt::Display) -> DomainError {
    DomainError::Infrastructure(format!("Corrupt {what} row: {detail}"))
}

// ── Leads ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Insertable, AsChangeset)]
#[diesel(table_name = leads)]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct LeadRow {
    pub id: Uuid,
    pub client_id: Uuid,
    pub service_category: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub status: String,
    pub assigned_professional_id: Option<Uuid>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub negotiation_status: String,
    pub quote_sent_at: Option<DateTime<Utc>>,
    pub agreed_price: Option<BigDecimal>,
    pub agreed_at: Option<DateTime<Utc>>,
    pub agreed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Lead> for LeadRow {
    fn from(lead: &Lead) -> Self {
        Self {
            id: lead.id,
            client_id: lead.client_id,
            service_category: lead.service_category.clone(),
            description: lead.description.clone(),
            latitude: lead.location.lat(),
            longitude: lead.location.lng(),
            status: lead.status.as_str().to_string(),
            assigned_professional_id: lead.assigned_professional_id,
            assigned_at: lead.assigned_at,
            negotiation_status: lead.negotiation_status.as_str().to_string(),
            quote_sent_at: lead.quote_sent_at,
            agreed_price: lead.agreed_price.clone(),
            agreed_at: lead.agreed_at,
            agreed_by: lead.agreed_by,
            created_at: lead.created_at,
            updated_at: lead.updated_at,
        }
    }
}

impl LeadRow {
    pub fn into_lead(self, items: Vec<QuoteItemRow>) -> Result<Lead, DomainError> {
        let location = Coordinate::new(self.latitude, self.longitude).map_err(|e| corrupt("lead", e))?;
        Ok(Lead {
            id: self.id,
            client_id: self.client_id,
            service_category: self.service_category,
            description: self.description,
            location,
            status: LeadStatus::from_str(&self.status)?,
            assigned_professional_id: self.assigned_professional_id,
            assigned_at: self.assigned_at,
            negotiation_status: NegotiationStatus::from_str(&self.negotiation_status)?,
            quote_items: items.into_iter().map(QuoteItemRow::into_item).collect(),
            quote_sent_at: self.quote_sent_at,
            agreed_price: self.agreed_price,
            agreed_at: self.agreed_at,
            agreed_by: self.agreed_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = lead_quote_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct QuoteItemRow {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub position: i32,
    pub concept: String,
    pub quantity: BigDecimal,
    pub unit_price: BigDecimal,
    pub subtotal: BigDecimal,
}

impl QuoteItemRow {
    pub fn new(lead_id: Uuid, position: i32, item: &QuoteItem) -> Self {
        Self {
            id: Uuid::new_v4(),
            lead_id,
            position,
            concept: item.concept.clone(),
            quantity: item.quantity.clone(),
            unit_price: item.unit_price.clone(),
            subtotal: item.subtotal.clone(),
        }
    }

    /// The stored subtotal is informational only and recomputed here.
    pub fn into_item(self) -> QuoteItem {
        QuoteItem::new(self.concept, self.quantity, self.unit_price)
    }
}

// ── Bids ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = bids)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BidRow {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub professional_id: Uuid,
    pub proposed_price: BigDecimal,
    pub estimated_time: Option<i32>,
    pub message: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Bid> for BidRow {
    fn from(bid: &Bid) -> Self {
        Self {
            id: bid.id,
            lead_id: bid.lead_id,
            professional_id: bid.professional_id,
            proposed_price: bid.proposed_price.clone(),
            estimated_time: bid.estimated_time,
            message: bid.message.clone(),
            status: bid.status.as_str().to_string(),
            created_at: bid.created_at,
            updated_at: bid.updated_at,
        }
    }
}

impl TryFrom<BidRow> for Bid {
    type Error = DomainError;

    fn try_from(row: BidRow) -> Result<Self, Self::Error> {
        Ok(Bid {
            id: row.id,
            lead_id: row.lead_id,
            professional_id: row.professional_id,
            proposed_price: row.proposed_price,
            estimated_time: row.estimated_time,
            message: row.message,
            status: BidStatus::from_str(&row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// ── Professional profiles ────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = professional_profiles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProfileRow {
    pub professional_id: Uuid,
    pub average_rating: f64,
    pub total_jobs_completed: i32,
    pub verification_status: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub service_categories: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProfileRow> for ProfessionalStats {
    /// A stored location outside the valid range is treated as unknown.
    fn from(row: ProfileRow) -> Self {
        let location = match (row.latitude, row.longitude) {
            (Some(lat), Some(lng)) => Coordinate::new(lat, lng).ok(),
            _ => None,
        };
        ProfessionalStats {
            professional_id: row.professional_id,
            average_rating: row.average_rating,
            total_jobs_completed: u32::try_from(row.total_jobs_completed).unwrap_or(0),
            verification_status: VerificationStatus::from(row.verification_status.as_str()),
            location,
            service_categories: row.service_categories,
        }
    }
}

// ── Outbox ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = lead_outbox)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OutboxEventRow {
    pub id: Uuid,
    pub seq: i64,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub actor_id: Option<Uuid>,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<OutboxEventRow> for OutboxEvent {
    type Error = DomainError;

    fn try_from(row: OutboxEventRow) -> Result<Self, Self::Error> {
        let lead_id = Uuid::parse_str(&row.aggregate_id).map_err(|e| corrupt("outbox", e))?;
        Ok(OutboxEvent {
            id: row.id,
            lead_id,
            event_type: row.event_type,
            actor_id: row.actor_id,
            payload: row.payload,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = lead_outbox)]
pub struct NewOutboxEventRow {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub actor_id: Option<Uuid>,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

impl From<OutboxEvent> for NewOutboxEventRow {
    fn from(event: OutboxEvent) -> Self {
        Self {
            id: event.id,
            aggregate_type: AGGREGATE_TYPE.to_string(),
            aggregate_id: event.lead_id.to_string(),
            event_type: event.event_type,
            actor_id: event.actor_id,
            payload: event.payload,
            created_at: event.created_at,
        }
    }
}
