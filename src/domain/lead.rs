use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::bid::Bid;
use super::errors::DomainError;
use super::geo::Coordinate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeadStatus {
    Searching,
    Assigned,
    InProgress,
    Completed,
    Cancelled,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Searching => "searching",
            Self::Assigned => "assigned",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// States in which a professional is attached to the lead.
    pub fn has_assignee(&self) -> bool {
        matches!(self, Self::Assigned | Self::InProgress | Self::Completed)
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "searching" => Ok(Self::Searching),
            "assigned" => Ok(Self::Assigned),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(DomainError::Infrastructure(format!(
                "unknown lead status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NegotiationStatus {
    None,
    QuoteSent,
    QuoteAccepted,
}

impl NegotiationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::QuoteSent => "quote_sent",
            Self::QuoteAccepted => "quote_accepted",
        }
    }
}

impl fmt::Display for NegotiationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NegotiationStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "quote_sent" => Ok(Self::QuoteSent),
            "quote_accepted" => Ok(Self::QuoteAccepted),
            other => Err(DomainError::Infrastructure(format!(
                "unknown negotiation status '{other}'"
            ))),
        }
    }
}

/// One priced line of a quote. `subtotal` is always `quantity * unit_price`.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteItem {
    pub concept: String,
    pub quantity: BigDecimal,
    pub unit_price: BigDecimal,
    pub subtotal: BigDecimal,
}

impl QuoteItem {
    pub fn new(concept: String, quantity: BigDecimal, unit_price: BigDecimal) -> Self {
        let subtotal = &quantity * &unit_price;
        Self {
            concept,
            quantity,
            unit_price,
            subtotal,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lead {
    pub id: Uuid,
    pub client_id: Uuid,
    pub service_category: String,
    pub description: String,
    pub location: Coordinate,
    pub status: LeadStatus,
    pub assigned_professional_id: Option<Uuid>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub negotiation_status: NegotiationStatus,
    /// Display order is insertion order.
    pub quote_items: Vec<QuoteItem>,
    pub quote_sent_at: Option<DateTime<Utc>>,
    pub agreed_price: Option<BigDecimal>,
    pub agreed_at: Option<DateTime<Utc>>,
    pub agreed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Matches the `leads.service_category` column width.
pub const MAX_CATEGORY_LEN: usize = 100;

/// Input for creating a lead, before validation.
#[derive(Debug, Clone)]
pub struct NewLead {
    pub client_id: Uuid,
    pub service_category: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Lead {
    /// Validates the request and opens a lead in `searching`.
    pub fn open(id: Uuid, input: NewLead, now: DateTime<Utc>) -> Result<Self, DomainError> {
        let service_category = normalize_category(&input.service_category);
        if service_category.is_empty() {
            return Err(DomainError::MissingField("service_category"));
        }
        if service_category.chars().count() > MAX_CATEGORY_LEN {
            return Err(DomainError::FieldTooLong {
                field: "service_category",
                max: MAX_CATEGORY_LEN,
            });
        }
        let description = input.description.trim().to_string();
        if description.is_empty() {
            return Err(DomainError::MissingField("description"));
        }
        let location = Coordinate::new(input.latitude, input.longitude)?;

        Ok(Self {
            id,
            client_id: input.client_id,
            service_category,
            description,
            location,
            status: LeadStatus::Searching,
            assigned_professional_id: None,
            assigned_at: None,
            negotiation_status: NegotiationStatus::None,
            quote_items: Vec::new(),
            quote_sent_at: None,
            agreed_price: None,
            agreed_at: None,
            agreed_by: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn quote_total(&self) -> BigDecimal {
        self.quote_items
            .iter()
            .fold(BigDecimal::from(0), |acc, item| acc + &item.subtotal)
    }

    /// Returns the first violated data-model invariant, if any.
    pub fn invariant_violation(&self) -> Option<&'static str> {
        if self.status.has_assignee() != self.assigned_professional_id.is_some() {
            return Some("assigned_professional_id must be set iff the lead is assigned, in progress or completed");
        }
        if !self.quote_items.is_empty() && self.negotiation_status == NegotiationStatus::None {
            return Some("quote items require a negotiation in progress");
        }
        if self
            .quote_items
            .iter()
            .any(|i| i.subtotal != &i.quantity * &i.unit_price)
        {
            return Some("quote item subtotal must equal quantity * unit_price");
        }
        if (self.negotiation_status == NegotiationStatus::QuoteAccepted) != self.agreed_price.is_some() {
            return Some("agreed_price is set exactly when the quote is accepted");
        }
        None
    }
}

/// Category slugs are compared case-insensitively.
pub fn normalize_category(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// A lead together with every bid placed on it: the unit of atomic change.
#[derive(Debug, Clone, PartialEq)]
pub struct LeadAggregate {
    pub lead: Lead,
    pub bids: Vec<Bid>,
}

impl LeadAggregate {
    pub fn new(lead: Lead) -> Self {
        Self {
            lead,
            bids: Vec::new(),
        }
    }

    pub fn bid(&self, bid_id: Uuid) -> Option<&Bid> {
        self.bids.iter().find(|b| b.id == bid_id)
    }

    pub fn bid_mut(&mut self, bid_id: Uuid) -> Option<&mut Bid> {
        self.bids.iter_mut().find(|b| b.id == bid_id)
    }
}
