use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::matching_service::{Candidate, MatchingService};
use crate::domain::events::OutboxEvent;
use crate::domain::geo::format_distance;
use crate::domain::lead::{Lead, NewLead, QuoteItem};
use crate::domain::negotiation::QuoteLineInput;
use crate::errors::AppError;

use super::identity::Caller;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateLeadRequest {
    /// Category slug, e.g. "plomeria". Matched case-insensitively.
    pub service_category: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuoteItemResponse {
    pub concept: String,
    pub quantity: String,
    pub unit_price: String,
    pub subtotal: String,
}

impl From<&QuoteItem> for QuoteItemResponse {
    fn from(item: &QuoteItem) -> Self {
        Self {
            concept: item.concept.clone(),
            quantity: item.quantity.to_string(),
            unit_price: item.unit_price.to_string(),
            subtotal: item.subtotal.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LeadResponse {
    pub id: Uuid,
    pub client_id: Uuid,
    pub service_category: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub status: String,
    pub assigned_professional_id: Option<Uuid>,
    pub assigned_at: Option<String>,
    pub negotiation_status: String,
    pub quote_items: Vec<QuoteItemResponse>,
    /// Sum of item subtotals, as a decimal string.
    pub quote_total: String,
    pub quote_sent_at: Option<String>,
    pub agreed_price: Option<String>,
    pub agreed_at: Option<String>,
    pub agreed_by: Option<Uuid>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Lead> for LeadResponse {
    fn from(lead: &Lead) -> Self {
        Self {
            id: lead.id,
            client_id: lead.client_id,
            service_category: lead.service_category.clone(),
            description: lead.description.clone(),
            latitude: lead.location.lat(),
            longitude: lead.location.lng(),
            status: lead.status.to_string(),
            assigned_professional_id: lead.assigned_professional_id,
            assigned_at: lead.assigned_at.map(|t| t.to_rfc3339()),
            negotiation_status: lead.negotiation_status.to_string(),
            quote_items: lead.quote_items.iter().map(QuoteItemResponse::from).collect(),
            quote_total: lead.quote_total().to_string(),
            quote_sent_at: lead.quote_sent_at.map(|t| t.to_rfc3339()),
            agreed_price: lead.agreed_price.as_ref().map(|p| p.to_string()),
            agreed_at: lead.agreed_at.map(|t| t.to_rfc3339()),
            agreed_by: lead.agreed_by,
            created_at: lead.created_at.to_rfc3339(),
            updated_at: lead.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CandidatesParams {
    /// Search radius in km. Defaults to the configured matching radius.
    pub radius_km: Option<f64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CandidateResponse {
    pub professional_id: Uuid,
    pub average_rating: f64,
    pub total_jobs_completed: u32,
    pub verification_status: String,
    pub distance_km: f64,
    /// e.g. "850 m" or "2.3 km"
    pub distance_label: String,
}

impl From<Candidate> for CandidateResponse {
    fn from(c: Candidate) -> Self {
        Self {
            professional_id: c.professional.professional_id,
            average_rating: c.professional.average_rating,
            total_jobs_completed: c.professional.total_jobs_completed,
            verification_status: c.professional.verification_status.as_str().to_string(),
            distance_km: c.distance_km,
            distance_label: format_distance(c.distance_km),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct QuoteItemRequest {
    pub concept: String,
    /// Decimal as string or JSON number, e.g. "2.5"
    #[schema(value_type = String)]
    pub quantity: Value,
    /// Decimal as string or JSON number, e.g. "350.00"
    #[schema(value_type = String)]
    pub unit_price: Value,
    /// Ignored; subtotals are always recomputed.
    #[schema(value_type = Option<String>)]
    #[serde(default)]
    pub subtotal: Option<Value>,
}

fn decimal_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl From<QuoteItemRequest> for QuoteLineInput {
    fn from(item: QuoteItemRequest) -> Self {
        Self {
            concept: item.concept,
            quantity: decimal_text(&item.quantity),
            unit_price: decimal_text(&item.unit_price),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitQuoteRequest {
    pub items: Vec<QuoteItemRequest>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LeadEventResponse {
    pub id: Uuid,
    pub event_type: String,
    pub actor_id: Option<Uuid>,
    #[schema(value_type = Object)]
    pub payload: Value,
    pub created_at: String,
}

impl From<OutboxEvent> for LeadEventResponse {
    fn from(e: OutboxEvent) -> Self {
        Self {
            id: e.id,
            event_type: e.event_type,
            actor_id: e.actor_id,
            payload: e.payload,
            created_at: e.created_at.to_rfc3339(),
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /leads
///
/// Opens a lead for the calling client in `searching`.
#[utoipa::path(
    post,
    path = "/leads",
    request_body = CreateLeadRequest,
    params(("X-User-Id" = Uuid, Header, description = "Calling client")),
    responses(
        (status = 201, description = "Lead created", body = LeadResponse),
        (status = 401, description = "Missing caller identity"),
        (status = 422, description = "Invalid category, description or coordinate"),
    ),
    tag = "leads"
)]
pub async fn create_lead(
    service: web::Data<MatchingService>,
    caller: Caller,
    body: web::Json<CreateLeadRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let input = NewLead {
        client_id: caller.0,
        service_category: body.service_category,
        description: body.description,
        latitude: body.latitude,
        longitude: body.longitude,
    };

    let lead = web::block(move || service.create_lead(input))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(LeadResponse::from(&lead)))
}

#[utoipa::path(
    get,
    path = "/leads/{id}",
    params(("id" = Uuid, Path, description = "Lead UUID")),
    responses(
        (status = 200, description = "Lead found", body = LeadResponse),
        (status = 404, description = "Lead not found"),
    ),
    tag = "leads"
)]
pub async fn get_lead(service: web::Data<MatchingService>, path: web::Path<Uuid>) -> Result<HttpResponse, AppError> {
    let lead_id = path.into_inner();

    let lead = web::block(move || service.get_lead(lead_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(LeadResponse::from(&lead)))
}

/// GET /leads/{id}/candidates
///
/// Professionals offering the lead's category within the radius, in
/// directory order. An empty list is a normal answer.
#[utoipa::path(
    get,
    path = "/leads/{id}/candidates",
    params(
        ("id" = Uuid, Path, description = "Lead UUID"),
        ("radius_km" = Option<f64>, Query, description = "Search radius in km"),
    ),
    responses(
        (status = 200, description = "Candidate professionals", body = [CandidateResponse]),
        (status = 404, description = "Lead not found"),
        (status = 422, description = "Invalid radius"),
    ),
    tag = "leads"
)]
pub async fn find_candidates(
    service: web::Data<MatchingService>,
    path: web::Path<Uuid>,
    query: web::Query<CandidatesParams>,
) -> Result<HttpResponse, AppError> {
    let lead_id = path.into_inner();
    let radius_km = query.into_inner().radius_km;

    let candidates = web::block(move || service.find_candidates(lead_id, radius_km))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    let body: Vec<CandidateResponse> = candidates.into_iter().map(CandidateResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

#[utoipa::path(
    post,
    path = "/leads/{id}/start",
    params(
        ("id" = Uuid, Path, description = "Lead UUID"),
        ("X-User-Id" = Uuid, Header, description = "Assigned professional"),
    ),
    responses(
        (status = 200, description = "Work started", body = LeadResponse),
        (status = 403, description = "Caller is not the assigned professional"),
        (status = 409, description = "Lead is not assigned"),
    ),
    tag = "lifecycle"
)]
pub async fn start_work(
    service: web::Data<MatchingService>,
    caller: Caller,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let lead_id = path.into_inner();

    let lead = web::block(move || service.start_work(lead_id, caller.0))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(LeadResponse::from(&lead)))
}

#[utoipa::path(
    post,
    path = "/leads/{id}/complete",
    params(
        ("id" = Uuid, Path, description = "Lead UUID"),
        ("X-User-Id" = Uuid, Header, description = "Assigned professional"),
    ),
    responses(
        (status = 200, description = "Work completed", body = LeadResponse),
        (status = 403, description = "Caller is not the assigned professional"),
        (status = 409, description = "Work has not started"),
    ),
    tag = "lifecycle"
)]
pub async fn complete_work(
    service: web::Data<MatchingService>,
    caller: Caller,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let lead_id = path.into_inner();

    let lead = web::block(move || service.complete_work(lead_id, caller.0))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(LeadResponse::from(&lead)))
}

#[utoipa::path(
    post,
    path = "/leads/{id}/cancel",
    params(
        ("id" = Uuid, Path, description = "Lead UUID"),
        ("X-User-Id" = Uuid, Header, description = "Lead client"),
    ),
    responses(
        (status = 200, description = "Lead cancelled", body = LeadResponse),
        (status = 403, description = "Caller does not own the lead"),
        (status = 409, description = "Lead can no longer be cancelled"),
    ),
    tag = "lifecycle"
)]
pub async fn cancel_lead(
    service: web::Data<MatchingService>,
    caller: Caller,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let lead_id = path.into_inner();

    let lead = web::block(move || service.cancel_lead(lead_id, caller.0))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(LeadResponse::from(&lead)))
}

/// POST /leads/{id}/quote
///
/// Submits or revises the itemized quote. Client-supplied subtotals are
/// ignored and recomputed.
#[utoipa::path(
    post,
    path = "/leads/{id}/quote",
    request_body = SubmitQuoteRequest,
    params(
        ("id" = Uuid, Path, description = "Lead UUID"),
        ("X-User-Id" = Uuid, Header, description = "Assigned professional"),
    ),
    responses(
        (status = 200, description = "Quote sent", body = LeadResponse),
        (status = 403, description = "Caller is not the assigned professional"),
        (status = 409, description = "Quote already accepted"),
        (status = 422, description = "Empty quote or invalid item"),
    ),
    tag = "negotiation"
)]
pub async fn submit_quote(
    service: web::Data<MatchingService>,
    caller: Caller,
    path: web::Path<Uuid>,
    body: web::Json<SubmitQuoteRequest>,
) -> Result<HttpResponse, AppError> {
    let lead_id = path.into_inner();
    let items: Vec<QuoteLineInput> = body.into_inner().items.into_iter().map(QuoteLineInput::from).collect();

    let lead = web::block(move || service.submit_quote(lead_id, caller.0, items))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(LeadResponse::from(&lead)))
}

/// POST /leads/{id}/quote/accept
///
/// Binds the client to the pending quote. A second call fails with
/// `ALREADY_ACCEPTED` and changes nothing.
#[utoipa::path(
    post,
    path = "/leads/{id}/quote/accept",
    params(
        ("id" = Uuid, Path, description = "Lead UUID"),
        ("X-User-Id" = Uuid, Header, description = "Lead client"),
    ),
    responses(
        (status = 200, description = "Quote accepted", body = LeadResponse),
        (status = 403, description = "Caller is not the lead client"),
        (status = 409, description = "No quote pending or already accepted"),
    ),
    tag = "negotiation"
)]
pub async fn accept_quote(
    service: web::Data<MatchingService>,
    caller: Caller,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let lead_id = path.into_inner();

    let lead = web::block(move || service.accept_quote(lead_id, caller.0))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(LeadResponse::from(&lead)))
}

#[utoipa::path(
    get,
    path = "/leads/{id}/events",
    params(("id" = Uuid, Path, description = "Lead UUID")),
    responses(
        (status = 200, description = "Activity timeline, oldest first", body = [LeadEventResponse]),
        (status = 404, description = "Lead not found"),
    ),
    tag = "leads"
)]
pub async fn lead_events(
    service: web::Data<MatchingService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let lead_id = path.into_inner();

    let events = web::block(move || service.lead_events(lead_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    let body: Vec<LeadEventResponse> = events.into_iter().map(LeadEventResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}
