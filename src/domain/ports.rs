use uuid::Uuid;

use super::bid::Bid;
use super::commands::LeadCommand;
use super::errors::DomainError;
use super::events::{DomainEvent, OutboxEvent};
use super::lead::{Lead, LeadAggregate};
use super::professional::ProfessionalStats;

/// Persistence for leads, their bids and the outbox.
pub trait LeadStore: Send + Sync + 'static {
    /// Persists a freshly opened lead together with its creation events.
    fn insert_lead(&self, lead: &Lead, events: &[DomainEvent]) -> Result<(), DomainError>;

    fn load(&self, lead_id: Uuid) -> Result<Option<LeadAggregate>, DomainError>;

    fn find_bid(&self, bid_id: Uuid) -> Result<Option<Bid>, DomainError>;

    /// Applies `command` to the lead as one atomic, serialized unit: the
    /// aggregate is read under exclusion, mutated, written back and its events
    /// appended to the outbox, or nothing changes at all. Concurrent commands
    /// on the same lead observe each other's effects.
    ///
    /// Returns the aggregate as committed.
    fn execute(&self, lead_id: Uuid, command: &LeadCommand) -> Result<LeadAggregate, DomainError>;

    /// Outbox entries for a lead, oldest first.
    fn events_for(&self, lead_id: Uuid) -> Result<Vec<OutboxEvent>, DomainError>;
}

/// Read-only view over professional profiles. Profiles are owned elsewhere.
pub trait ProfessionalDirectory: Send + Sync + 'static {
    fn professionals_offering(&self, category: &str) -> Result<Vec<ProfessionalStats>, DomainError>;

    /// Stats for the given professionals. Unknown ids are simply absent.
    fn stats_for(&self, professional_ids: &[Uuid]) -> Result<Vec<ProfessionalStats>, DomainError>;
}
