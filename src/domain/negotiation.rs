//! Quote submission and binding acceptance.

use std::str::FromStr;

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::DomainError;
use super::events::DomainEvent;
use super::lead::{LeadAggregate, LeadStatus, NegotiationStatus, QuoteItem};

/// A quote line as received from the professional. Any subtotal they computed
/// is ignored; it is always recomputed here.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteLineInput {
    pub concept: String,
    pub quantity: String,
    pub unit_price: String,
}

/// Parses and prices each line, preserving order.
pub fn price_items(lines: &[QuoteLineInput]) -> Result<Vec<QuoteItem>, DomainError> {
    if lines.is_empty() {
        return Err(DomainError::EmptyQuote);
    }
    lines.iter().map(price_line).collect()
}

fn price_line(line: &QuoteLineInput) -> Result<QuoteItem, DomainError> {
    let concept = line.concept.trim().to_string();
    let quantity = parse_amount(&concept, "quantity", &line.quantity)?;
    let unit_price = parse_amount(&concept, "unit_price", &line.unit_price)?;

    if concept.is_empty() {
        return Err(DomainError::InvalidQuoteItem {
            concept,
            reason: "concept is required".into(),
        });
    }
    if quantity <= BigDecimal::zero() {
        return Err(DomainError::InvalidQuoteItem {
            concept,
            reason: format!("quantity must be positive, got {quantity}"),
        });
    }
    if unit_price < BigDecimal::zero() {
        return Err(DomainError::InvalidQuoteItem {
            concept,
            reason: format!("unit price cannot be negative, got {unit_price}"),
        });
    }
    Ok(QuoteItem::new(concept, quantity, unit_price))
}

fn parse_amount(concept: &str, field: &str, raw: &str) -> Result<BigDecimal, DomainError> {
    BigDecimal::from_str(raw.trim()).map_err(|_| DomainError::SubtotalMismatch {
        concept: concept.to_string(),
        reason: format!("{field} '{raw}' is not a number"),
    })
}

pub fn submit_quote(
    agg: &mut LeadAggregate,
    professional_id: Uuid,
    lines: &[QuoteLineInput],
    now: DateTime<Utc>,
) -> Result<Vec<DomainEvent>, DomainError> {
    let lead = &mut agg.lead;
    if lead.assigned_professional_id != Some(professional_id) {
        return Err(DomainError::NotAssignedProfessional);
    }
    if lead.negotiation_status == NegotiationStatus::QuoteAccepted {
        return Err(DomainError::AlreadyAccepted);
    }
    if !matches!(lead.status, LeadStatus::Assigned | LeadStatus::InProgress) {
        return Err(DomainError::IllegalTransition {
            from: lead.status,
            action: "quote",
        });
    }

    let items = price_items(lines)?;
    lead.quote_items = items;
    lead.negotiation_status = NegotiationStatus::QuoteSent;
    lead.quote_sent_at = Some(now);
    lead.updated_at = now;

    Ok(vec![DomainEvent::QuoteSent {
        lead_id: lead.id,
        professional_id,
        total: lead.quote_total(),
        item_count: lead.quote_items.len(),
    }])
}

/// Binds the client to the pending quote. Irreversible: nothing in the engine
/// resets an accepted negotiation.
pub fn accept_quote(
    agg: &mut LeadAggregate,
    client_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Vec<DomainEvent>, DomainError> {
    let lead = &mut agg.lead;
    if lead.client_id != client_id {
        return Err(DomainError::NotLeadClient);
    }
    if lead.negotiation_status == NegotiationStatus::QuoteAccepted {
        return Err(DomainError::AlreadyAccepted);
    }
    // Acceptance binds the client to the assigned professional.
    if !matches!(lead.status, LeadStatus::Assigned | LeadStatus::InProgress) {
        return Err(DomainError::IllegalTransition {
            from: lead.status,
            action: "accept a quote on",
        });
    }
    if lead.negotiation_status == NegotiationStatus::None {
        return Err(DomainError::NoQuotePending);
    }

    let agreed_price = lead.quote_total();
    lead.negotiation_status = NegotiationStatus::QuoteAccepted;
    lead.agreed_price = Some(agreed_price.clone());
    lead.agreed_at = Some(now);
    lead.agreed_by = Some(client_id);
    lead.updated_at = now;

    Ok(vec![DomainEvent::QuoteAccepted {
        lead_id: lead.id,
        client_id,
        agreed_price,
        agreed_at: now,
    }])
}
