//! Process-local adapters. A single write lock serializes every command, which
//! gives the same single-winner guarantees as the row lock in PostgreSQL for
//! callers sharing one process. Used by tests and local demos.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use uuid::Uuid;

use crate::domain::bid::Bid;
use crate::domain::commands::LeadCommand;
use crate::domain::errors::DomainError;
use crate::domain::events::{DomainEvent, OutboxEvent};
use crate::domain::lead::{Lead, LeadAggregate};
use crate::domain::ports::{LeadStore, ProfessionalDirectory};
use crate::domain::professional::ProfessionalStats;

fn poisoned(what: &str) -> DomainError {
    DomainError::Infrastructure(format!("Lock poisoned: {what}"))
}

#[derive(Default)]
struct LeadTables {
    leads: HashMap<Uuid, LeadAggregate>,
    bid_to_lead: HashMap<Uuid, Uuid>,
    outbox: Vec<OutboxEvent>,
}

#[derive(Clone, Default)]
pub struct InMemoryLeadStore {
    tables: Arc<RwLock<LeadTables>>,
}

impl InMemoryLeadStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LeadStore for InMemoryLeadStore {
    fn insert_lead(&self, lead: &Lead, events: &[DomainEvent]) -> Result<(), DomainError> {
        let mut tables = self.tables.write().map_err(|_| poisoned("leads"))?;
        let now = Utc::now();
        tables.leads.insert(lead.id, LeadAggregate::new(lead.clone()));
        tables.outbox.extend(
            events
                .iter()
                .map(|e| OutboxEvent::record(e, Some(lead.client_id), now)),
        );
        Ok(())
    }

    fn load(&self, lead_id: Uuid) -> Result<Option<LeadAggregate>, DomainError> {
        let tables = self.tables.read().map_err(|_| poisoned("leads"))?;
        Ok(tables.leads.get(&lead_id).cloned())
    }

    fn find_bid(&self, bid_id: Uuid) -> Result<Option<Bid>, DomainError> {
        let tables = self.tables.read().map_err(|_| poisoned("leads"))?;
        Ok(tables
            .bid_to_lead
            .get(&bid_id)
            .and_then(|lead_id| tables.leads.get(lead_id))
            .and_then(|agg| agg.bid(bid_id))
            .cloned())
    }

    fn execute(&self, lead_id: Uuid, command: &LeadCommand) -> Result<LeadAggregate, DomainError> {
        let mut tables = self.tables.write().map_err(|_| poisoned("leads"))?;
        let mut next = tables
            .leads
            .get(&lead_id)
            .cloned()
            .ok_or(DomainError::LeadNotFound)?;

        let now = Utc::now();
        let events = command.execute(&mut next, now)?;

        // nothing below can fail, so the commit is all-or-nothing
        for bid in &next.bids {
            tables.bid_to_lead.insert(bid.id, lead_id);
        }
        let actor = Some(command.actor_id());
        tables
            .outbox
            .extend(events.iter().map(|e| OutboxEvent::record(e, actor, now)));
        tables.leads.insert(lead_id, next.clone());
        Ok(next)
    }

    fn events_for(&self, lead_id: Uuid) -> Result<Vec<OutboxEvent>, DomainError> {
        let tables = self.tables.read().map_err(|_| poisoned("outbox"))?;
        Ok(tables
            .outbox
            .iter()
            .filter(|e| e.lead_id == lead_id)
            .cloned()
            .collect())
    }
}

/// Directory seeded in-process, in insertion order.
#[derive(Clone, Default)]
pub struct InMemoryDirectory {
    profiles: Arc<RwLock<Vec<ProfessionalStats>>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a profile, replacing any previous one for the same professional.
    pub fn upsert(&self, stats: ProfessionalStats) -> Result<(), DomainError> {
        let mut profiles = self.profiles.write().map_err(|_| poisoned("profiles"))?;
        match profiles
            .iter_mut()
            .find(|p| p.professional_id == stats.professional_id)
        {
            Some(existing) => *existing = stats,
            None => profiles.push(stats),
        }
        Ok(())
    }
}

impl ProfessionalDirectory for InMemoryDirectory {
    fn professionals_offering(&self, category: &str) -> Result<Vec<ProfessionalStats>, DomainError> {
        let profiles = self.profiles.read().map_err(|_| poisoned("profiles"))?;
        Ok(profiles.iter().filter(|p| p.offers(category)).cloned().collect())
    }

    fn stats_for(&self, professional_ids: &[Uuid]) -> Result<Vec<ProfessionalStats>, DomainError> {
        let profiles = self.profiles.read().map_err(|_| poisoned("profiles"))?;
        Ok(profiles
            .iter()
            .filter(|p| professional_ids.contains(&p.professional_id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use bigdecimal::BigDecimal;

    use super::*;
    use crate::domain::bid::{BidOffer, NewBid};
    use crate::domain::lead::NewLead;

    fn open_lead(store: &InMemoryLeadStore) -> Lead {
        let lead = Lead::open(
            Uuid::new_v4(),
            NewLead {
                client_id: Uuid::new_v4(),
                service_category: "carpinteria".into(),
                description: "Puerta atorada".into(),
                latitude: 20.67,
                longitude: -103.35,
            },
            Utc::now(),
        )
        .unwrap();
        store.insert_lead(&lead, &[]).unwrap();
        lead
    }

    fn submit(pro: Uuid) -> LeadCommand {
        LeadCommand::SubmitBid(NewBid {
            id: Uuid::new_v4(),
            professional_id: pro,
            offer: BidOffer {
                proposed_price: BigDecimal::from(300),
                estimated_time: None,
                message: None,
            },
        })
    }

    #[test]
    fn rejected_command_leaves_state_untouched() {
        let store = InMemoryLeadStore::new();
        let lead = open_lead(&store);
        let pro = Uuid::new_v4();
        store.execute(lead.id, &submit(pro)).unwrap();
        let before = store.load(lead.id).unwrap().unwrap();

        let err = store.execute(lead.id, &submit(pro)).unwrap_err();

        assert!(matches!(err, DomainError::DuplicateActiveBid));
        assert_eq!(store.load(lead.id).unwrap().unwrap(), before);
        assert_eq!(store.events_for(lead.id).unwrap().len(), 1);
    }

    #[test]
    fn bids_are_indexed_by_id() {
        let store = InMemoryLeadStore::new();
        let lead = open_lead(&store);
        let agg = store.execute(lead.id, &submit(Uuid::new_v4())).unwrap();
        let bid_id = agg.bids[0].id;

        assert_eq!(store.find_bid(bid_id).unwrap().unwrap().lead_id, lead.id);
        assert!(store.find_bid(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn missing_lead_is_reported() {
        let store = InMemoryLeadStore::new();
        assert!(matches!(
            store.execute(Uuid::new_v4(), &submit(Uuid::new_v4())),
            Err(DomainError::LeadNotFound)
        ));
    }

    #[test]
    fn upsert_replaces_existing_profile() {
        let directory = InMemoryDirectory::new();
        let id = Uuid::new_v4();
        directory
            .upsert(ProfessionalStats {
                service_categories: vec!["carpinteria".into()],
                ..ProfessionalStats::unknown(id)
            })
            .unwrap();
        directory
            .upsert(ProfessionalStats {
                average_rating: 4.5,
                service_categories: vec!["carpinteria".into()],
                ..ProfessionalStats::unknown(id)
            })
            .unwrap();

        let found = directory.professionals_offering("Carpinteria").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].average_rating, 4.5);
        assert_eq!(directory.stats_for(&[id]).unwrap().len(), 1);
    }
}
