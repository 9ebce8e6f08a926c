use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::bid::{Bid, BidOffer, NewBid};
use crate::domain::commands::LeadCommand;
use crate::domain::discovery;
use crate::domain::errors::{DomainError, ErrorCategory};
use crate::domain::events::{DomainEvent, OutboxEvent};
use crate::domain::geo::distance_km;
use crate::domain::lead::{Lead, LeadAggregate, NewLead};
use crate::domain::negotiation::QuoteLineInput;
use crate::domain::ports::{LeadStore, ProfessionalDirectory};
use crate::domain::professional::ProfessionalStats;
use crate::domain::ranking::{self, RankedBid, RankingWeights};

#[derive(Debug, Clone, Copy)]
pub struct MatchingSettings {
    pub default_radius_km: f64,
    pub weights: RankingWeights,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            default_radius_km: 15.0,
            weights: RankingWeights::default(),
        }
    }
}

/// A professional able to serve a lead, with their distance to it.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub professional: ProfessionalStats,
    pub distance_km: f64,
}

/// Result of a successful bid selection.
#[derive(Debug, Clone)]
pub struct Selection {
    pub lead: Lead,
    pub bid: Bid,
}

pub struct MatchingService {
    store: Arc<dyn LeadStore>,
    directory: Arc<dyn ProfessionalDirectory>,
    settings: MatchingSettings,
}

impl MatchingService {
    pub fn new(
        store: Arc<dyn LeadStore>,
        directory: Arc<dyn ProfessionalDirectory>,
        settings: MatchingSettings,
    ) -> Self {
        Self {
            store,
            directory,
            settings,
        }
    }

    // ── Leads ───────────────────────────────────────────────────────────────

    pub fn create_lead(&self, input: NewLead) -> Result<Lead, DomainError> {
        let lead = Lead::open(Uuid::new_v4(), input, Utc::now())?;
        let created = DomainEvent::LeadCreated {
            lead_id: lead.id,
            client_id: lead.client_id,
            service_category: lead.service_category.clone(),
        };
        self.store.insert_lead(&lead, &[created])?;
        log::info!("Lead {} opened for category '{}'", lead.id, lead.service_category);
        Ok(lead)
    }

    pub fn get_lead(&self, lead_id: Uuid) -> Result<Lead, DomainError> {
        Ok(self.aggregate(lead_id)?.lead)
    }

    /// Every bid on the lead in submission order, whatever its status.
    pub fn list_bids(&self, lead_id: Uuid) -> Result<Vec<Bid>, DomainError> {
        Ok(self.aggregate(lead_id)?.bids)
    }

    pub fn lead_events(&self, lead_id: Uuid) -> Result<Vec<OutboxEvent>, DomainError> {
        self.aggregate(lead_id)?;
        self.store.events_for(lead_id)
    }

    // ── Matching ────────────────────────────────────────────────────────────

    pub fn find_candidates(&self, lead_id: Uuid, radius_km: Option<f64>) -> Result<Vec<Candidate>, DomainError> {
        let lead = self.get_lead(lead_id)?;
        let radius_km = radius_km.unwrap_or(self.settings.default_radius_km);
        let directory = self.directory.professionals_offering(&lead.service_category)?;

        let candidates = discovery::find_candidates(&lead, directory, radius_km)?
            .into_iter()
            .filter_map(|professional| {
                let distance_km = distance_km(lead.location, professional.location?);
                Some(Candidate {
                    professional,
                    distance_km,
                })
            })
            .collect::<Vec<_>>();
        log::debug!("Lead {lead_id}: {} candidates within {radius_km} km", candidates.len());
        Ok(candidates)
    }

    pub fn rank_bids(&self, lead_id: Uuid) -> Result<Vec<RankedBid>, DomainError> {
        let agg = self.aggregate(lead_id)?;
        let bidders: Vec<Uuid> = agg
            .bids
            .iter()
            .filter(|b| b.is_active())
            .map(|b| b.professional_id)
            .collect();
        let stats: HashMap<Uuid, ProfessionalStats> = self
            .directory
            .stats_for(&bidders)?
            .into_iter()
            .map(|s| (s.professional_id, s))
            .collect();

        Ok(ranking::rank_bids(
            &agg.bids,
            &stats,
            &agg.lead,
            self.settings.weights,
            self.settings.default_radius_km,
        ))
    }

    // ── Bids ────────────────────────────────────────────────────────────────

    pub fn submit_bid(&self, lead_id: Uuid, professional_id: Uuid, offer: BidOffer) -> Result<Bid, DomainError> {
        let new_bid = NewBid {
            id: Uuid::new_v4(),
            professional_id,
            offer: offer.validate()?,
        };
        let bid_id = new_bid.id;
        let agg = self.run(lead_id, LeadCommand::SubmitBid(new_bid))?;
        log::info!("Bid {bid_id} placed on lead {lead_id} by {professional_id}");
        committed_bid(agg, bid_id)
    }

    pub fn withdraw_bid(&self, bid_id: Uuid, professional_id: Uuid) -> Result<Bid, DomainError> {
        let lead_id = self.lead_of(bid_id)?;
        let agg = self.run(
            lead_id,
            LeadCommand::WithdrawBid {
                bid_id,
                professional_id,
            },
        )?;
        log::info!("Bid {bid_id} withdrawn from lead {lead_id}");
        committed_bid(agg, bid_id)
    }

    /// Chooses the winning bid. Exactly one of any number of concurrent calls
    /// on the same lead can succeed; the rest fail with `LeadAlreadyAssigned`.
    pub fn select_bid(&self, bid_id: Uuid, client_id: Uuid) -> Result<Selection, DomainError> {
        let lead_id = self.lead_of(bid_id)?;
        let agg = self.run(lead_id, LeadCommand::SelectBid { bid_id, client_id })?;
        log::info!("Bid {bid_id} selected, lead {lead_id} assigned");
        let lead = agg.lead.clone();
        let bid = committed_bid(agg, bid_id)?;
        Ok(Selection { lead, bid })
    }

    // ── Lifecycle ───────────────────────────────────────────────────────────

    pub fn start_work(&self, lead_id: Uuid, professional_id: Uuid) -> Result<Lead, DomainError> {
        self.transition(lead_id, LeadCommand::StartWork { professional_id })
    }

    pub fn complete_work(&self, lead_id: Uuid, professional_id: Uuid) -> Result<Lead, DomainError> {
        self.transition(lead_id, LeadCommand::CompleteWork { professional_id })
    }

    pub fn cancel_lead(&self, lead_id: Uuid, client_id: Uuid) -> Result<Lead, DomainError> {
        self.transition(lead_id, LeadCommand::Cancel { client_id })
    }

    // ── Negotiation ─────────────────────────────────────────────────────────

    pub fn submit_quote(
        &self,
        lead_id: Uuid,
        professional_id: Uuid,
        items: Vec<QuoteLineInput>,
    ) -> Result<Lead, DomainError> {
        let lead = self
            .run(lead_id, LeadCommand::SubmitQuote { professional_id, items })?
            .lead;
        log::info!(
            "Quote of {} items ({}) sent on lead {lead_id}",
            lead.quote_items.len(),
            lead.quote_total()
        );
        Ok(lead)
    }

    pub fn accept_quote(&self, lead_id: Uuid, client_id: Uuid) -> Result<Lead, DomainError> {
        let lead = self.run(lead_id, LeadCommand::AcceptQuote { client_id })?.lead;
        log::info!(
            "Quote accepted on lead {lead_id} for {}",
            lead.agreed_price.clone().unwrap_or_default()
        );
        Ok(lead)
    }

    // ── helpers ─────────────────────────────────────────────────────────────

    fn aggregate(&self, lead_id: Uuid) -> Result<LeadAggregate, DomainError> {
        self.store.load(lead_id)?.ok_or(DomainError::LeadNotFound)
    }

    fn lead_of(&self, bid_id: Uuid) -> Result<Uuid, DomainError> {
        self.store
            .find_bid(bid_id)?
            .map(|b| b.lead_id)
            .ok_or(DomainError::BidNotFound)
    }

    fn transition(&self, lead_id: Uuid, command: LeadCommand) -> Result<Lead, DomainError> {
        let lead = self.run(lead_id, command)?.lead;
        log::info!("Lead {lead_id} is now {}", lead.status);
        Ok(lead)
    }

    fn run(&self, lead_id: Uuid, command: LeadCommand) -> Result<LeadAggregate, DomainError> {
        self.store.execute(lead_id, &command).inspect_err(|e| {
            if e.category() == ErrorCategory::StateConflict {
                log::debug!("Lead {lead_id}: {e}");
            }
        })
    }
}

fn committed_bid(agg: LeadAggregate, bid_id: Uuid) -> Result<Bid, DomainError> {
    agg.bids
        .into_iter()
        .find(|b| b.id == bid_id)
        .ok_or(DomainError::BidNotFound)
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;

    use bigdecimal::BigDecimal;

    use super::*;
    use crate::domain::bid::BidStatus;
    use crate::domain::geo::Coordinate;
    use crate::domain::lead::{LeadStatus, NegotiationStatus};
    use crate::domain::professional::VerificationStatus;
    use crate::infrastructure::memory::{InMemoryDirectory, InMemoryLeadStore};

    struct Fixture {
        service: Arc<MatchingService>,
        directory: Arc<InMemoryDirectory>,
        client: Uuid,
    }

    fn fixture() -> Fixture {
        let directory = Arc::new(InMemoryDirectory::default());
        let service = MatchingService::new(
            Arc::new(InMemoryLeadStore::default()),
            directory.clone(),
            MatchingSettings::default(),
        );
        Fixture {
            service: Arc::new(service),
            directory,
            client: Uuid::new_v4(),
        }
    }

    impl Fixture {
        fn lead(&self) -> Lead {
            self.service
                .create_lead(NewLead {
                    client_id: self.client,
                    service_category: "Plomeria".into(),
                    description: "Fuga bajo el fregadero".into(),
                    latitude: 19.43,
                    longitude: -99.13,
                })
                .unwrap()
        }

        fn professional(&self, rating: f64, jobs: u32, lat: f64) -> Uuid {
            let id = Uuid::new_v4();
            self.directory.upsert(ProfessionalStats {
                professional_id: id,
                average_rating: rating,
                total_jobs_completed: jobs,
                verification_status: VerificationStatus::Verified,
                location: Some(Coordinate::new(lat, -99.13).unwrap()),
                service_categories: vec!["plomeria".into()],
            })
            .unwrap();
            id
        }

        fn bid(&self, lead: Uuid, pro: Uuid, price: i64) -> Bid {
            self.service
                .submit_bid(
                    lead,
                    pro,
                    BidOffer {
                        proposed_price: BigDecimal::from(price),
                        estimated_time: Some(3),
                        message: Some("Puedo ir hoy".into()),
                    },
                )
                .unwrap()
        }
    }

    fn quote_line(concept: &str, quantity: &str, unit_price: &str) -> QuoteLineInput {
        QuoteLineInput {
            concept: concept.into(),
            quantity: quantity.into(),
            unit_price: unit_price.into(),
        }
    }

    #[test]
    fn happy_path_from_bids_to_agreed_price() {
        let f = fixture();
        let lead = f.lead();
        assert_eq!(lead.service_category, "plomeria");
        // 2 km and 8 km north of the lead
        let p1 = f.professional(4.9, 120, 19.448);
        let p2 = f.professional(4.2, 10, 19.502);
        let b1 = f.bid(lead.id, p1, 800);
        let b2 = f.bid(lead.id, p2, 650);

        let ranked = f.service.rank_bids(lead.id).unwrap();
        assert_eq!(ranked[0].bid.id, b1.id);
        assert_eq!(ranked[1].bid.id, b2.id);

        let selection = f.service.select_bid(b1.id, f.client).unwrap();
        assert_eq!(selection.lead.status, LeadStatus::Assigned);
        assert_eq!(selection.lead.assigned_professional_id, Some(p1));
        assert_eq!(selection.bid.status, BidStatus::Selected);
        let bids = f.service.list_bids(lead.id).unwrap();
        assert_eq!(bids.iter().find(|b| b.id == b2.id).unwrap().status, BidStatus::Rejected);

        let quoted = f
            .service
            .submit_quote(lead.id, p1, vec![quote_line("Diagnóstico", "1", "350")])
            .unwrap();
        assert_eq!(quoted.negotiation_status, NegotiationStatus::QuoteSent);

        let agreed = f.service.accept_quote(lead.id, f.client).unwrap();
        assert_eq!(agreed.negotiation_status, NegotiationStatus::QuoteAccepted);
        assert_eq!(agreed.agreed_price, Some(BigDecimal::from(350)));
    }

    #[test]
    fn concurrent_selection_has_a_single_winner() {
        let f = fixture();
        let lead = f.lead();
        let bids: Vec<Bid> = (0..8)
            .map(|i| f.bid(lead.id, f.professional(4.0, 5, 19.44), 500 + i))
            .collect();
        let barrier = Barrier::new(bids.len());

        let results: Vec<Result<Selection, DomainError>> = std::thread::scope(|s| {
            let handles: Vec<_> = bids
                .iter()
                .map(|bid| {
                    let service = &f.service;
                    let barrier = &barrier;
                    let client = f.client;
                    s.spawn(move || {
                        barrier.wait();
                        service.select_bid(bid.id, client)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let winners: Vec<&Selection> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(winners.len(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, DomainError::LeadAlreadyAssigned)));

        let lead = f.service.get_lead(lead.id).unwrap();
        assert_eq!(lead.status, LeadStatus::Assigned);
        assert_eq!(lead.assigned_professional_id, Some(winners[0].bid.professional_id));
        let after = f.service.list_bids(lead.id).unwrap();
        assert!(after.iter().all(|b| !b.is_active()));
        assert_eq!(after.iter().filter(|b| b.status == BidStatus::Selected).count(), 1);
    }

    #[test]
    fn selecting_after_a_withdrawal() {
        let f = fixture();
        let lead = f.lead();
        let pro = f.professional(4.5, 30, 19.44);
        let bid = f.bid(lead.id, pro, 700);

        let withdrawn = f.service.withdraw_bid(bid.id, pro).unwrap();
        assert_eq!(withdrawn.status, BidStatus::Withdrawn);

        let err = f.service.select_bid(bid.id, f.client).unwrap_err();
        assert!(matches!(err, DomainError::BidNotActive));
        assert_eq!(f.service.get_lead(lead.id).unwrap().status, LeadStatus::Searching);
    }

    #[test]
    fn candidates_are_filtered_by_radius_and_category() {
        let f = fixture();
        let lead = f.lead();
        let near = f.professional(4.0, 3, 19.448);
        let far = f.professional(4.0, 3, 19.70);
        f.directory
            .upsert(ProfessionalStats {
                service_categories: vec!["electricidad".into()],
                ..ProfessionalStats::unknown(Uuid::new_v4())
            })
            .unwrap();

        let candidates = f.service.find_candidates(lead.id, None).unwrap();
        let ids: Vec<Uuid> = candidates.iter().map(|c| c.professional.professional_id).collect();
        assert_eq!(ids, vec![near]);
        assert!((candidates[0].distance_km - 2.0).abs() < 0.05);

        let wide = f.service.find_candidates(lead.id, Some(50.0)).unwrap();
        assert_eq!(wide.len(), 2);
        assert!(wide.iter().any(|c| c.professional.professional_id == far));

        assert!(matches!(
            f.service.find_candidates(lead.id, Some(0.0)),
            Err(DomainError::InvalidRadius(_))
        ));
    }

    #[test]
    fn no_candidates_is_not_an_error() {
        let f = fixture();
        let lead = f.lead();
        assert!(f.service.find_candidates(lead.id, None).unwrap().is_empty());
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let f = fixture();
        assert!(matches!(f.service.get_lead(Uuid::new_v4()), Err(DomainError::LeadNotFound)));
        assert!(matches!(
            f.service.select_bid(Uuid::new_v4(), f.client),
            Err(DomainError::BidNotFound)
        ));
        assert!(matches!(
            f.service.lead_events(Uuid::new_v4()),
            Err(DomainError::LeadNotFound)
        ));
    }

    #[test]
    fn failed_commands_leave_no_events() {
        let f = fixture();
        let lead = f.lead();
        let pro = f.professional(4.0, 3, 19.44);
        f.bid(lead.id, pro, 500);

        let dup = f.service.submit_bid(
            lead.id,
            pro,
            BidOffer {
                proposed_price: BigDecimal::from(450),
                estimated_time: None,
                message: None,
            },
        );
        assert!(matches!(dup, Err(DomainError::DuplicateActiveBid)));

        let topics: Vec<String> = f
            .service
            .lead_events(lead.id)
            .unwrap()
            .into_iter()
            .map(|e| e.event_type)
            .collect();
        assert_eq!(topics, vec!["lead.created", "bid.created"]);
        assert_eq!(f.service.list_bids(lead.id).unwrap().len(), 1);
    }

    #[test]
    fn events_record_who_acted() {
        let f = fixture();
        let lead = f.lead();
        let pro = f.professional(4.0, 3, 19.44);
        let bid = f.bid(lead.id, pro, 500);
        f.service.select_bid(bid.id, f.client).unwrap();
        f.service.start_work(lead.id, pro).unwrap();
        f.service.complete_work(lead.id, pro).unwrap();

        let events = f.service.lead_events(lead.id).unwrap();
        let topics: Vec<&str> = events.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(
            topics,
            vec![
                "lead.created",
                "bid.created",
                "bid.selected",
                "lead.updated",
                "lead.updated",
                "lead.updated"
            ]
        );
        assert_eq!(events[0].actor_id, Some(f.client));
        assert_eq!(events[1].actor_id, Some(pro));
        assert_eq!(events[5].payload["status"], "completed");
    }

    #[test]
    fn invalid_offers_are_rejected_before_storage() {
        let f = fixture();
        let lead = f.lead();
        let err = f
            .service
            .submit_bid(
                lead.id,
                Uuid::new_v4(),
                BidOffer {
                    proposed_price: BigDecimal::from(0),
                    estimated_time: None,
                    message: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidPrice(_)));
        assert!(f.service.list_bids(lead.id).unwrap().is_empty());
    }

    #[test]
    fn cancelled_lead_takes_no_more_work() {
        let f = fixture();
        let lead = f.lead();
        let pro = f.professional(4.0, 3, 19.44);
        let bid = f.bid(lead.id, pro, 500);

        let cancelled = f.service.cancel_lead(lead.id, f.client).unwrap();
        assert_eq!(cancelled.status, LeadStatus::Cancelled);

        assert!(matches!(
            f.service.select_bid(bid.id, f.client),
            Err(DomainError::LeadNotAcceptingBids)
        ));
        assert!(f.service.rank_bids(lead.id).unwrap().is_empty());
    }

    #[test]
    fn quote_on_a_cancelled_lead_cannot_be_accepted() {
        let f = fixture();
        let lead = f.lead();
        let pro = f.professional(4.0, 3, 19.44);
        let bid = f.bid(lead.id, pro, 500);
        f.service.select_bid(bid.id, f.client).unwrap();
        f.service
            .submit_quote(lead.id, pro, vec![quote_line("Diagnóstico", "1", "350")])
            .unwrap();
        f.service.cancel_lead(lead.id, f.client).unwrap();

        let err = f.service.accept_quote(lead.id, f.client).unwrap_err();

        assert!(matches!(err, DomainError::IllegalTransition { .. }));
        let lead = f.service.get_lead(lead.id).unwrap();
        assert_eq!(lead.status, LeadStatus::Cancelled);
        assert_eq!(lead.negotiation_status, NegotiationStatus::QuoteSent);
        assert!(lead.agreed_price.is_none());
    }

    #[test]
    fn withdrawal_and_selection_on_one_lead_serialize() {
        for _ in 0..20 {
            let f = fixture();
            let lead = f.lead();
            let leaving = f.professional(4.0, 3, 19.44);
            let chosen = f.professional(4.5, 9, 19.45);
            let a = f.bid(lead.id, leaving, 500);
            let b = f.bid(lead.id, chosen, 600);
            let barrier = Barrier::new(2);

            let (withdrawal, selection) = std::thread::scope(|s| {
                let w = s.spawn(|| {
                    barrier.wait();
                    f.service.withdraw_bid(a.id, leaving)
                });
                let sel = s.spawn(|| {
                    barrier.wait();
                    f.service.select_bid(b.id, f.client)
                });
                (w.join().unwrap(), sel.join().unwrap())
            });

            assert_eq!(selection.unwrap().bid.status, BidStatus::Selected);
            let bids = f.service.list_bids(lead.id).unwrap();
            let a_after = bids.iter().find(|x| x.id == a.id).unwrap();
            match withdrawal {
                Ok(w) => {
                    assert_eq!(w.status, BidStatus::Withdrawn);
                    assert_eq!(a_after.status, BidStatus::Withdrawn);
                }
                Err(e) => {
                    assert!(matches!(e, DomainError::BidNotActive));
                    assert_eq!(a_after.status, BidStatus::Rejected);
                }
            }
            assert_eq!(bids.iter().find(|x| x.id == b.id).unwrap().status, BidStatus::Selected);
            assert_eq!(f.service.get_lead(lead.id).unwrap().assigned_professional_id, Some(chosen));
        }
    }
}
