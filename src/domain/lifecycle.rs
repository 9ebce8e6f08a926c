//! Lead state machine.
//!
//! ```text
//! searching ──bidSelected──▶ assigned ──workStarted──▶ in_progress ──workCompleted──▶ completed
//!     │                         │
//!     └────────cancel───────────┴──▶ cancelled
//! ```

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::DomainError;
use super::lead::{Lead, LeadStatus};

/// Proof that a bid was selected. Only the bid registry can mint one, which
/// keeps every other caller from moving a lead to `assigned`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BidSelection {
    professional_id: Uuid,
}

impl BidSelection {
    pub(crate) fn new(professional_id: Uuid) -> Self {
        Self { professional_id }
    }

    pub fn professional_id(&self) -> Uuid {
        self.professional_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    BidSelected(BidSelection),
    WorkStarted,
    WorkCompleted,
    Cancel,
}

impl LifecycleEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::BidSelected(_) => "select a bid for",
            Self::WorkStarted => "start work on",
            Self::WorkCompleted => "complete",
            Self::Cancel => "cancel",
        }
    }
}

/// Applies `event` to a copy of `lead`. On an illegal transition the input is
/// untouched and `IllegalTransition` is returned.
pub fn transition(lead: &Lead, event: LifecycleEvent, now: DateTime<Utc>) -> Result<Lead, DomainError> {
    use LeadStatus::*;

    let mut next = lead.clone();
    match (lead.status, event) {
        (Searching, LifecycleEvent::BidSelected(selection)) => {
            next.status = Assigned;
            next.assigned_professional_id = Some(selection.professional_id);
            next.assigned_at = Some(now);
        }
        (Assigned, LifecycleEvent::WorkStarted) => next.status = InProgress,
        (InProgress, LifecycleEvent::WorkCompleted) => next.status = Completed,
        (Searching | Assigned, LifecycleEvent::Cancel) => {
            next.status = Cancelled;
            next.assigned_professional_id = None;
        }
        (from, event) => {
            return Err(DomainError::IllegalTransition {
                from,
                action: event.name(),
            })
        }
    }
    next.updated_at = now;
    Ok(next)
}
