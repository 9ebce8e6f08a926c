pub mod bids;
pub mod identity;
pub mod leads;

use actix_web::web;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        leads::create_lead,
        leads::get_lead,
        leads::find_candidates,
        leads::start_work,
        leads::complete_work,
        leads::cancel_lead,
        leads::submit_quote,
        leads::accept_quote,
        leads::lead_events,
        bids::list_bids,
        bids::rank_bids,
        bids::submit_bid,
        bids::withdraw_bid,
        bids::select_bid,
    ),
    components(schemas(
        leads::CreateLeadRequest,
        leads::LeadResponse,
        leads::QuoteItemResponse,
        leads::CandidateResponse,
        leads::QuoteItemRequest,
        leads::SubmitQuoteRequest,
        leads::LeadEventResponse,
        bids::SubmitBidRequest,
        bids::BidResponse,
        bids::ScoreResponse,
        bids::RankedBidResponse,
        bids::SelectionResponse,
    )),
    tags(
        (name = "leads", description = "Lead intake and discovery"),
        (name = "bids", description = "Bidding and selection"),
        (name = "lifecycle", description = "Work progress"),
        (name = "negotiation", description = "Quotes"),
    )
)]
pub struct ApiDoc;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/leads")
            .route("", web::post().to(leads::create_lead))
            .route("/{id}", web::get().to(leads::get_lead))
            .route("/{id}/candidates", web::get().to(leads::find_candidates))
            .route("/{id}/bids", web::get().to(bids::list_bids))
            .route("/{id}/bids", web::post().to(bids::submit_bid))
            .route("/{id}/bids/ranked", web::get().to(bids::rank_bids))
            .route("/{id}/start", web::post().to(leads::start_work))
            .route("/{id}/complete", web::post().to(leads::complete_work))
            .route("/{id}/cancel", web::post().to(leads::cancel_lead))
            .route("/{id}/quote", web::post().to(leads::submit_quote))
            .route("/{id}/quote/accept", web::post().to(leads::accept_quote))
            .route("/{id}/events", web::get().to(leads::lead_events)),
    )
    .service(
        web::scope("/bids")
            .route("/{id}/withdraw", web::post().to(bids::withdraw_bid))
            .route("/{id}/select", web::post().to(bids::select_bid)),
    );
}
