use chrono::{SubsecRound, Utc};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::bid::Bid;
use crate::domain::commands::LeadCommand;
use crate::domain::errors::DomainError;
use crate::domain::events::{DomainEvent, OutboxEvent};
use crate::domain::lead::{normalize_category, Lead, LeadAggregate};
use crate::domain::ports::{LeadStore, ProfessionalDirectory};
use crate::domain::professional::ProfessionalStats;
use crate::schema::{bids, lead_outbox, lead_quote_items, leads, professional_profiles};

use super::models::{BidRow, LeadRow, NewOutboxEventRow, OutboxEventRow, ProfileRow, QuoteItemRow};

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<DieselError> for DomainError {
    fn from(e: DieselError) -> Self {
        if let DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) = &e {
            match info.constraint_name() {
                Some("bids_one_active_per_professional") => return DomainError::DuplicateActiveBid,
                Some("bids_one_selected_per_lead") => return DomainError::LeadAlreadyAssigned,
                _ => {}
            }
        }
        DomainError::Infrastructure(e.to_string())
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Infrastructure(e.to_string())
    }
}

// ── Lead store ───────────────────────────────────────────────────────────────

pub struct DieselLeadStore {
    pool: DbPool,
}

impl DieselLeadStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Postgres keeps microseconds; stamping with the same precision keeps the
/// committed aggregate equal to what a later load returns.
fn db_now() -> chrono::DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn load_aggregate(conn: &mut PgConnection, row: LeadRow) -> Result<LeadAggregate, DomainError> {
    let items = lead_quote_items::table
        .filter(lead_quote_items::lead_id.eq(row.id))
        .order(lead_quote_items::position.asc())
        .select(QuoteItemRow::as_select())
        .load(conn)?;
    let bid_rows = bids::table
        .filter(bids::lead_id.eq(row.id))
        .order((bids::created_at.asc(), bids::id.asc()))
        .select(BidRow::as_select())
        .load(conn)?;

    Ok(LeadAggregate {
        lead: row.into_lead(items)?,
        bids: bid_rows
            .into_iter()
            .map(Bid::try_from)
            .collect::<Result<_, _>>()?,
    })
}

fn append_outbox(
    conn: &mut PgConnection,
    events: &[DomainEvent],
    actor_id: Uuid,
    now: chrono::DateTime<Utc>,
) -> Result<(), DomainError> {
    if events.is_empty() {
        return Ok(());
    }
    let rows: Vec<NewOutboxEventRow> = events
        .iter()
        .map(|e| OutboxEvent::record(e, Some(actor_id), now).into())
        .collect();
    diesel::insert_into(lead_outbox::table)
        .values(&rows)
        .execute(conn)?;
    Ok(())
}

/// Writes the difference between `before` and `after`. The lead row is
/// guarded by its prior status so a writer that skipped the row lock can
/// never overwrite a newer state.
fn persist(conn: &mut PgConnection, before: &LeadAggregate, after: &LeadAggregate) -> Result<(), DomainError> {
    let lead_id = after.lead.id;

    if before.lead != after.lead {
        let updated = diesel::update(
            leads::table
                .filter(leads::id.eq(lead_id))
                .filter(leads::status.eq(before.lead.status.as_str())),
        )
        .set(&LeadRow::from(&after.lead))
        .execute(conn)?;
        if updated != 1 {
            return Err(DomainError::ConcurrentUpdate(lead_id));
        }
    }

    if before.lead.quote_items != after.lead.quote_items {
        diesel::delete(lead_quote_items::table.filter(lead_quote_items::lead_id.eq(lead_id))).execute(conn)?;
        let rows: Vec<QuoteItemRow> = (0i32..)
            .zip(&after.lead.quote_items)
            .map(|(position, item)| QuoteItemRow::new(lead_id, position, item))
            .collect();
        diesel::insert_into(lead_quote_items::table)
            .values(&rows)
            .execute(conn)?;
    }

    for bid in &after.bids {
        match before.bid(bid.id) {
            None => {
                diesel::insert_into(bids::table)
                    .values(&BidRow::from(bid))
                    .execute(conn)?;
            }
            Some(prior) if prior.status != bid.status => {
                diesel::update(bids::table.find(bid.id))
                    .set((
                        bids::status.eq(bid.status.as_str()),
                        bids::updated_at.eq(bid.updated_at),
                    ))
                    .execute(conn)?;
            }
            Some(_) => {}
        }
    }
    Ok(())
}

impl LeadStore for DieselLeadStore {
    fn insert_lead(&self, lead: &Lead, events: &[DomainEvent]) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            diesel::insert_into(leads::table)
                .values(&LeadRow::from(lead))
                .execute(conn)?;
            append_outbox(conn, events, lead.client_id, db_now())
        })
    }

    fn load(&self, lead_id: Uuid) -> Result<Option<LeadAggregate>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = leads::table
            .find(lead_id)
            .select(LeadRow::as_select())
            .first(&mut conn)
            .optional()?;
        row.map(|row| load_aggregate(&mut conn, row)).transpose()
    }

    fn find_bid(&self, bid_id: Uuid) -> Result<Option<Bid>, DomainError> {
        let mut conn = self.pool.get()?;

        bids::table
            .find(bid_id)
            .select(BidRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(Bid::try_from)
            .transpose()
    }

    fn execute(&self, lead_id: Uuid, command: &LeadCommand) -> Result<LeadAggregate, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // 1. Lock the lead row; concurrent commands on this lead queue here.
            let row = leads::table
                .find(lead_id)
                .select(LeadRow::as_select())
                .for_update()
                .first(conn)
                .optional()?
                .ok_or(DomainError::LeadNotFound)?;

            // 2. Apply the command to the loaded aggregate.
            let before = load_aggregate(conn, row)?;
            let mut after = before.clone();
            let now = db_now();
            let events = command.execute(&mut after, now)?;

            // 3. Write back and append the events to the outbox.
            //    Debezium's EventRouter SMT routes them by `aggregate_type`.
            persist(conn, &before, &after)?;
            append_outbox(conn, &events, command.actor_id(), now)?;

            Ok(after)
        })
    }

    fn events_for(&self, lead_id: Uuid) -> Result<Vec<OutboxEvent>, DomainError> {
        let mut conn = self.pool.get()?;

        lead_outbox::table
            .filter(lead_outbox::aggregate_id.eq(lead_id.to_string()))
            .order(lead_outbox::seq.asc())
            .select(OutboxEventRow::as_select())
            .load(&mut conn)?
            .into_iter()
            .map(OutboxEvent::try_from)
            .collect()
    }
}

// ── Professional directory ───────────────────────────────────────────────────

/// Reads the `professional_profiles` snapshot. Category slugs are stored
/// lowercase by the profile owner.
pub struct DieselProfessionalDirectory {
    pool: DbPool,
}

impl DieselProfessionalDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl ProfessionalDirectory for DieselProfessionalDirectory {
    fn professionals_offering(&self, category: &str) -> Result<Vec<ProfessionalStats>, DomainError> {
        let mut conn = self.pool.get()?;

        let rows = professional_profiles::table
            .filter(professional_profiles::service_categories.contains(vec![normalize_category(category)]))
            .order(professional_profiles::professional_id.asc())
            .select(ProfileRow::as_select())
            .load(&mut conn)?;
        Ok(rows.into_iter().map(ProfessionalStats::from).collect())
    }

    fn stats_for(&self, professional_ids: &[Uuid]) -> Result<Vec<ProfessionalStats>, DomainError> {
        if professional_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.pool.get()?;

        let rows = professional_profiles::table
            .filter(professional_profiles::professional_id.eq_any(professional_ids.to_vec()))
            .select(ProfileRow::as_select())
            .load(&mut conn)?;
        Ok(rows.into_iter().map(ProfessionalStats::from).collect())
    }
}
