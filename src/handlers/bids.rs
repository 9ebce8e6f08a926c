use std::str::FromStr;

use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::matching_service::MatchingService;
use crate::domain::bid::{Bid, BidOffer};
use crate::domain::errors::DomainError;
use crate::domain::geo::format_distance;
use crate::domain::ranking::RankedBid;
use crate::errors::AppError;

use super::identity::Caller;
use super::leads::LeadResponse;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitBidRequest {
    /// Decimal price as a string to avoid floating-point issues, e.g. "800.00"
    pub proposed_price: String,
    /// Estimated duration in hours.
    pub estimated_time: Option<i32>,
    pub message: Option<String>,
}

impl TryFrom<SubmitBidRequest> for BidOffer {
    type Error = DomainError;

    fn try_from(req: SubmitBidRequest) -> Result<Self, Self::Error> {
        let proposed_price = BigDecimal::from_str(req.proposed_price.trim())
            .map_err(|_| DomainError::InvalidPrice(format!("'{}' is not a decimal", req.proposed_price)))?;
        Ok(BidOffer {
            proposed_price,
            estimated_time: req.estimated_time,
            message: req.message,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BidResponse {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub professional_id: Uuid,
    pub proposed_price: String,
    pub estimated_time: Option<i32>,
    pub message: Option<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Bid> for BidResponse {
    fn from(bid: &Bid) -> Self {
        Self {
            id: bid.id,
            lead_id: bid.lead_id,
            professional_id: bid.professional_id,
            proposed_price: bid.proposed_price.to_string(),
            estimated_time: bid.estimated_time,
            message: bid.message.clone(),
            status: bid.status.to_string(),
            created_at: bid.created_at.to_rfc3339(),
            updated_at: bid.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ScoreResponse {
    pub rating: f64,
    pub experience: f64,
    pub price: f64,
    pub proximity: f64,
    pub total: f64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RankedBidResponse {
    pub bid: BidResponse,
    pub ranking_score: ScoreResponse,
    pub distance_km: Option<f64>,
    pub distance_label: Option<String>,
}

impl From<&RankedBid> for RankedBidResponse {
    fn from(r: &RankedBid) -> Self {
        Self {
            bid: BidResponse::from(&r.bid),
            ranking_score: ScoreResponse {
                rating: r.score.rating,
                experience: r.score.experience,
                price: r.score.price,
                proximity: r.score.proximity,
                total: r.score.total,
            },
            distance_km: r.distance_km,
            distance_label: r.distance_km.map(format_distance),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SelectionResponse {
    pub lead: LeadResponse,
    pub bid: BidResponse,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

#[utoipa::path(
    get,
    path = "/leads/{id}/bids",
    params(("id" = Uuid, Path, description = "Lead UUID")),
    responses(
        (status = 200, description = "All bids in submission order", body = [BidResponse]),
        (status = 404, description = "Lead not found"),
    ),
    tag = "bids"
)]
pub async fn list_bids(service: web::Data<MatchingService>, path: web::Path<Uuid>) -> Result<HttpResponse, AppError> {
    let lead_id = path.into_inner();

    let bids = web::block(move || service.list_bids(lead_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    let body: Vec<BidResponse> = bids.iter().map(BidResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// GET /leads/{id}/bids/ranked
///
/// Active bids, best first, with the score breakdown. Scores are computed on
/// every call and never stored.
#[utoipa::path(
    get,
    path = "/leads/{id}/bids/ranked",
    params(("id" = Uuid, Path, description = "Lead UUID")),
    responses(
        (status = 200, description = "Ranked active bids", body = [RankedBidResponse]),
        (status = 404, description = "Lead not found"),
    ),
    tag = "bids"
)]
pub async fn rank_bids(service: web::Data<MatchingService>, path: web::Path<Uuid>) -> Result<HttpResponse, AppError> {
    let lead_id = path.into_inner();

    let ranked = web::block(move || service.rank_bids(lead_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    let body: Vec<RankedBidResponse> = ranked.iter().map(RankedBidResponse::from).collect();
    Ok(HttpResponse::Ok().json(body))
}

#[utoipa::path(
    post,
    path = "/leads/{id}/bids",
    request_body = SubmitBidRequest,
    params(
        ("id" = Uuid, Path, description = "Lead UUID"),
        ("X-User-Id" = Uuid, Header, description = "Bidding professional"),
    ),
    responses(
        (status = 201, description = "Bid placed", body = BidResponse),
        (status = 404, description = "Lead not found"),
        (status = 409, description = "Lead not accepting bids, or an active bid already exists"),
        (status = 422, description = "Invalid price"),
    ),
    tag = "bids"
)]
pub async fn submit_bid(
    service: web::Data<MatchingService>,
    caller: Caller,
    path: web::Path<Uuid>,
    body: web::Json<SubmitBidRequest>,
) -> Result<HttpResponse, AppError> {
    let lead_id = path.into_inner();
    let offer = BidOffer::try_from(body.into_inner())?;

    let bid = web::block(move || service.submit_bid(lead_id, caller.0, offer))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(BidResponse::from(&bid)))
}

#[utoipa::path(
    post,
    path = "/bids/{id}/withdraw",
    params(
        ("id" = Uuid, Path, description = "Bid UUID"),
        ("X-User-Id" = Uuid, Header, description = "Bid owner"),
    ),
    responses(
        (status = 200, description = "Bid withdrawn", body = BidResponse),
        (status = 403, description = "Caller does not own the bid"),
        (status = 404, description = "Bid not found"),
        (status = 409, description = "Bid is no longer active"),
    ),
    tag = "bids"
)]
pub async fn withdraw_bid(
    service: web::Data<MatchingService>,
    caller: Caller,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let bid_id = path.into_inner();

    let bid = web::block(move || service.withdraw_bid(bid_id, caller.0))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(BidResponse::from(&bid)))
}

/// POST /bids/{id}/select
///
/// Picks the winning bid. The lead becomes `assigned`, the bid `selected` and
/// every other active bid `rejected`, all in one transaction. When several
/// selections race, exactly one succeeds and the others get
/// `409 LEAD_ALREADY_ASSIGNED`.
#[utoipa::path(
    post,
    path = "/bids/{id}/select",
    params(
        ("id" = Uuid, Path, description = "Bid UUID"),
        ("X-User-Id" = Uuid, Header, description = "Lead client"),
    ),
    responses(
        (status = 200, description = "Bid selected", body = SelectionResponse),
        (status = 403, description = "Caller does not own the lead"),
        (status = 404, description = "Bid not found"),
        (status = 409, description = "Lead already assigned or bid no longer active"),
    ),
    tag = "bids"
)]
pub async fn select_bid(
    service: web::Data<MatchingService>,
    caller: Caller,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let bid_id = path.into_inner();

    let selection = web::block(move || service.select_bid(bid_id, caller.0))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(SelectionResponse {
        lead: LeadResponse::from(&selection.lead),
        bid: BidResponse::from(&selection.bid),
    }))
}
