use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::bid::NewBid;
use super::bid_registry;
use super::errors::DomainError;
use super::events::DomainEvent;
use super::lead::{LeadAggregate, LeadStatus};
use super::lifecycle::{self, LifecycleEvent};
use super::negotiation::{self, QuoteLineInput};

/// A state change on one lead, applied by a [`LeadStore`](super::ports::LeadStore)
/// inside a single atomic unit.
#[derive(Debug, Clone)]
pub enum LeadCommand {
    SubmitBid(NewBid),
    WithdrawBid { bid_id: Uuid, professional_id: Uuid },
    SelectBid { bid_id: Uuid, client_id: Uuid },
    StartWork { professional_id: Uuid },
    CompleteWork { professional_id: Uuid },
    Cancel { client_id: Uuid },
    SubmitQuote {
        professional_id: Uuid,
        items: Vec<QuoteLineInput>,
    },
    AcceptQuote { client_id: Uuid },
}

impl LeadCommand {
    /// Who issued the command, recorded on every event it emits.
    pub fn actor_id(&self) -> Uuid {
        match self {
            Self::SubmitBid(bid) => bid.professional_id,
            Self::WithdrawBid { professional_id, .. }
            | Self::StartWork { professional_id }
            | Self::CompleteWork { professional_id }
            | Self::SubmitQuote { professional_id, .. } => *professional_id,
            Self::SelectBid { client_id, .. } | Self::Cancel { client_id } | Self::AcceptQuote { client_id } => {
                *client_id
            }
        }
    }

    /// Mutates `agg` in place. On error the aggregate may be partially
    /// changed and must be discarded by the caller.
    pub fn execute(&self, agg: &mut LeadAggregate, now: DateTime<Utc>) -> Result<Vec<DomainEvent>, DomainError> {
        let events = match self {
            Self::SubmitBid(bid) => bid_registry::submit(agg, bid, now)?,
            Self::WithdrawBid {
                bid_id,
                professional_id,
            } => bid_registry::withdraw(agg, *bid_id, *professional_id, now)?,
            Self::SelectBid { bid_id, client_id } => bid_registry::select(agg, *bid_id, *client_id, now)?,
            Self::StartWork { professional_id } => {
                require_assignee(agg, *professional_id)?;
                advance(agg, LifecycleEvent::WorkStarted, now)?
            }
            Self::CompleteWork { professional_id } => {
                require_assignee(agg, *professional_id)?;
                advance(agg, LifecycleEvent::WorkCompleted, now)?
            }
            Self::Cancel { client_id } => {
                if agg.lead.client_id != *client_id {
                    return Err(DomainError::NotLeadOwner);
                }
                let was_searching = agg.lead.status == LeadStatus::Searching;
                let events = advance(agg, LifecycleEvent::Cancel, now)?;
                if was_searching {
                    bid_registry::reject_active(agg, now);
                }
                events
            }
            Self::SubmitQuote {
                professional_id,
                items,
            } => negotiation::submit_quote(agg, *professional_id, items, now)?,
            Self::AcceptQuote { client_id } => negotiation::accept_quote(agg, *client_id, now)?,
        };
        debug_assert!(agg.lead.invariant_violation().is_none());
        Ok(events)
    }
}

fn require_assignee(agg: &LeadAggregate, professional_id: Uuid) -> Result<(), DomainError> {
    if agg.lead.assigned_professional_id == Some(professional_id) {
        Ok(())
    } else {
        Err(DomainError::NotAssignedProfessional)
    }
}

fn advance(agg: &mut LeadAggregate, event: LifecycleEvent, now: DateTime<Utc>) -> Result<Vec<DomainEvent>, DomainError> {
    agg.lead = lifecycle::transition(&agg.lead, event, now)?;
    Ok(vec![DomainEvent::lead_updated(&agg.lead)])
}
