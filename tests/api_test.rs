//! HTTP contract tests against the in-memory adapters. No infrastructure
//! needed:
//!
//!   cargo test --test api_test

use std::sync::Arc;

use actix_web::{http::StatusCode, test, web, App};
use lead_matching_service::application::matching_service::{MatchingService, MatchingSettings};
use lead_matching_service::domain::geo::Coordinate;
use lead_matching_service::domain::professional::{ProfessionalStats, VerificationStatus};
use lead_matching_service::handlers;
use lead_matching_service::infrastructure::memory::{InMemoryDirectory, InMemoryLeadStore};
use serde_json::{json, Value};
use uuid::Uuid;

fn service_with(directory: Arc<InMemoryDirectory>) -> web::Data<MatchingService> {
    web::Data::new(MatchingService::new(
        Arc::new(InMemoryLeadStore::new()),
        directory,
        MatchingSettings::default(),
    ))
}

fn plumber(directory: &InMemoryDirectory, rating: f64, lat: f64) -> Uuid {
    let id = Uuid::new_v4();
    directory
        .upsert(ProfessionalStats {
            professional_id: id,
            average_rating: rating,
            total_jobs_completed: 40,
            verification_status: VerificationStatus::Verified,
            location: Some(Coordinate::new(lat, -99.13).unwrap()),
            service_categories: vec!["plomeria".into()],
        })
        .unwrap();
    id
}

fn lead_body() -> Value {
    json!({
        "service_category": "Plomeria",
        "description": "Fuga bajo el fregadero",
        "latitude": 19.43,
        "longitude": -99.13
    })
}

macro_rules! app {
    ($service:expr) => {
        test::init_service(App::new().app_data($service.clone()).configure(handlers::configure)).await
    };
}

macro_rules! post_as {
    ($app:expr, $user:expr, $uri:expr, $body:expr) => {{
        let req = test::TestRequest::post()
            .uri(&$uri)
            .insert_header(("X-User-Id", $user.to_string()))
            .set_json($body)
            .to_request();
        let resp = test::call_service(&$app, req).await;
        let status = resp.status();
        let body: Value = test::read_body_json(resp).await;
        (status, body)
    }};
}

#[actix_web::test]
async fn create_lead_returns_201_in_searching() {
    let service = service_with(Arc::new(InMemoryDirectory::new()));
    let app = app!(service);
    let client = Uuid::new_v4();

    let (status, body) = post_as!(app, client, "/leads".to_string(), lead_body());

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "searching");
    assert_eq!(body["service_category"], "plomeria");
    assert_eq!(body["client_id"], client.to_string());
    assert_eq!(body["negotiation_status"], "none");
}

#[actix_web::test]
async fn missing_identity_is_401() {
    let service = service_with(Arc::new(InMemoryDirectory::new()));
    let app = app!(service);

    let req = test::TestRequest::post().uri("/leads").set_json(lead_body()).to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "UNAUTHENTICATED");
}

#[actix_web::test]
async fn out_of_range_coordinate_is_422() {
    let service = service_with(Arc::new(InMemoryDirectory::new()));
    let app = app!(service);

    let mut body = lead_body();
    body["latitude"] = json!(95.0);
    let (status, body) = post_as!(app, Uuid::new_v4(), "/leads".to_string(), body);

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "INVALID_COORDINATE");
}

#[actix_web::test]
async fn overlong_category_is_422_not_503() {
    let service = service_with(Arc::new(InMemoryDirectory::new()));
    let app = app!(service);

    let mut body = lead_body();
    body["service_category"] = json!("x".repeat(101));
    let (status, body) = post_as!(app, Uuid::new_v4(), "/leads".to_string(), body);

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "FIELD_TOO_LONG");
}

#[actix_web::test]
async fn unknown_lead_is_404() {
    let service = service_with(Arc::new(InMemoryDirectory::new()));
    let app = app!(service);

    let req = test::TestRequest::get()
        .uri(&format!("/leads/{}", Uuid::new_v4()))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "LEAD_NOT_FOUND");
}

#[actix_web::test]
async fn candidates_are_filtered_by_radius() {
    let directory = Arc::new(InMemoryDirectory::new());
    let near = plumber(&directory, 4.5, 19.44);
    plumber(&directory, 4.9, 19.80);
    let service = service_with(directory);
    let app = app!(service);

    let (_, lead) = post_as!(app, Uuid::new_v4(), "/leads".to_string(), lead_body());
    let req = test::TestRequest::get()
        .uri(&format!("/leads/{}/candidates?radius_km=5", lead["id"].as_str().unwrap()))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    let candidates = body.as_array().unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0]["professional_id"], near.to_string());
    assert!(candidates[0]["distance_label"].as_str().unwrap().ends_with("km"));
}

#[actix_web::test]
async fn bid_rank_select_then_second_select_conflicts() {
    let directory = Arc::new(InMemoryDirectory::new());
    let strong = plumber(&directory, 4.9, 19.44);
    let weak = plumber(&directory, 3.0, 19.50);
    let service = service_with(directory);
    let app = app!(service);
    let client = Uuid::new_v4();

    let (_, lead) = post_as!(app, client, "/leads".to_string(), lead_body());
    let lead_id = lead["id"].as_str().unwrap().to_string();

    let (status, strong_bid) = post_as!(
        app,
        strong,
        format!("/leads/{lead_id}/bids"),
        json!({"proposed_price": "800.00", "estimated_time": 2})
    );
    assert_eq!(status, StatusCode::CREATED);
    let (_, weak_bid) = post_as!(app, weak, format!("/leads/{lead_id}/bids"), json!({"proposed_price": "790.00"}));

    let req = test::TestRequest::get()
        .uri(&format!("/leads/{lead_id}/bids/ranked"))
        .to_request();
    let ranked: Value = test::call_and_read_body_json(&app, req).await;
    let ranked = ranked.as_array().unwrap();
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0]["bid"]["id"], strong_bid["id"]);
    assert!(ranked[0]["ranking_score"]["total"].as_f64() > ranked[1]["ranking_score"]["total"].as_f64());

    let strong_id = strong_bid["id"].as_str().unwrap();
    let (status, selection) = post_as!(app, client, format!("/bids/{strong_id}/select"), json!({}));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(selection["lead"]["status"], "assigned");
    assert_eq!(selection["lead"]["assigned_professional_id"], strong.to_string());
    assert_eq!(selection["bid"]["status"], "selected");

    let weak_id = weak_bid["id"].as_str().unwrap();
    let (status, body) = post_as!(app, client, format!("/bids/{weak_id}/select"), json!({}));
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "LEAD_ALREADY_ASSIGNED");
    assert_eq!(body["message"], "This opportunity is no longer available");

    let req = test::TestRequest::get().uri(&format!("/leads/{lead_id}/bids")).to_request();
    let bids: Value = test::call_and_read_body_json(&app, req).await;
    let statuses: Vec<&str> = bids.as_array().unwrap().iter().map(|b| b["status"].as_str().unwrap()).collect();
    assert_eq!(statuses, vec!["selected", "rejected"]);
}

#[actix_web::test]
async fn selecting_someone_elses_lead_is_403() {
    let directory = Arc::new(InMemoryDirectory::new());
    let pro = plumber(&directory, 4.0, 19.44);
    let service = service_with(directory);
    let app = app!(service);

    let (_, lead) = post_as!(app, Uuid::new_v4(), "/leads".to_string(), lead_body());
    let lead_id = lead["id"].as_str().unwrap().to_string();
    let (_, bid) = post_as!(app, pro, format!("/leads/{lead_id}/bids"), json!({"proposed_price": "500"}));

    let bid_id = bid["id"].as_str().unwrap();
    let (status, body) = post_as!(app, Uuid::new_v4(), format!("/bids/{bid_id}/select"), json!({}));

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "NOT_LEAD_OWNER");
    assert!(body["detail"].is_string());
}

#[actix_web::test]
async fn quote_accept_and_repeat_accept() {
    let directory = Arc::new(InMemoryDirectory::new());
    let pro = plumber(&directory, 4.0, 19.44);
    let service = service_with(directory);
    let app = app!(service);
    let client = Uuid::new_v4();

    let (_, lead) = post_as!(app, client, "/leads".to_string(), lead_body());
    let lead_id = lead["id"].as_str().unwrap().to_string();
    let (_, bid) = post_as!(app, pro, format!("/leads/{lead_id}/bids"), json!({"proposed_price": "450"}));
    let bid_id = bid["id"].as_str().unwrap();
    post_as!(app, client, format!("/bids/{bid_id}/select"), json!({}));

    let (status, body) = post_as!(
        app,
        client,
        format!("/leads/{lead_id}/quote"),
        json!({"items": [{"concept": "Visita", "quantity": 1, "unit_price": "350.00"}]})
    );
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "NOT_ASSIGNED_PROFESSIONAL");

    let (status, quoted) = post_as!(
        app,
        pro,
        format!("/leads/{lead_id}/quote"),
        json!({"items": [
            {"concept": "Visita", "quantity": 1, "unit_price": "350.00", "subtotal": "1"},
            {"concept": "Tubo", "quantity": "2", "unit_price": "50"}
        ]})
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quoted["negotiation_status"], "quote_sent");
    assert_eq!(quoted["quote_items"].as_array().unwrap().len(), 2);
    assert_eq!(quoted["quote_items"][1]["subtotal"], "100");

    let (status, accepted) = post_as!(app, client, format!("/leads/{lead_id}/quote/accept"), json!({}));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accepted["negotiation_status"], "quote_accepted");
    assert_eq!(accepted["agreed_price"], accepted["quote_total"]);
    assert_eq!(accepted["agreed_by"], client.to_string());

    let (status, body) = post_as!(app, client, format!("/leads/{lead_id}/quote/accept"), json!({}));
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "ALREADY_ACCEPTED");
}

#[actix_web::test]
async fn empty_quote_is_422() {
    let directory = Arc::new(InMemoryDirectory::new());
    let pro = plumber(&directory, 4.0, 19.44);
    let service = service_with(directory);
    let app = app!(service);
    let client = Uuid::new_v4();

    let (_, lead) = post_as!(app, client, "/leads".to_string(), lead_body());
    let lead_id = lead["id"].as_str().unwrap().to_string();
    let (_, bid) = post_as!(app, pro, format!("/leads/{lead_id}/bids"), json!({"proposed_price": "450"}));
    let bid_id = bid["id"].as_str().unwrap();
    post_as!(app, client, format!("/bids/{bid_id}/select"), json!({}));

    let (status, body) = post_as!(app, pro, format!("/leads/{lead_id}/quote"), json!({"items": []}));

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "EMPTY_QUOTE");
}

#[actix_web::test]
async fn lifecycle_and_event_timeline() {
    let directory = Arc::new(InMemoryDirectory::new());
    let pro = plumber(&directory, 4.0, 19.44);
    let service = service_with(directory);
    let app = app!(service);
    let client = Uuid::new_v4();

    let (_, lead) = post_as!(app, client, "/leads".to_string(), lead_body());
    let lead_id = lead["id"].as_str().unwrap().to_string();
    let (_, bid) = post_as!(app, pro, format!("/leads/{lead_id}/bids"), json!({"proposed_price": "450"}));
    let bid_id = bid["id"].as_str().unwrap();
    post_as!(app, client, format!("/bids/{bid_id}/select"), json!({}));

    let (status, body) = post_as!(app, pro, format!("/leads/{lead_id}/complete"), json!({}));
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "ILLEGAL_TRANSITION");

    let (status, started) = post_as!(app, pro, format!("/leads/{lead_id}/start"), json!({}));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(started["status"], "in_progress");

    let (status, done) = post_as!(app, pro, format!("/leads/{lead_id}/complete"), json!({}));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["status"], "completed");

    let (status, _) = post_as!(app, client, format!("/leads/{lead_id}/cancel"), json!({}));
    assert_eq!(status, StatusCode::CONFLICT);

    let req = test::TestRequest::get().uri(&format!("/leads/{lead_id}/events")).to_request();
    let events: Value = test::call_and_read_body_json(&app, req).await;
    let types: Vec<&str> = events
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["event_type"].as_str().unwrap())
        .collect();
    assert_eq!(types.first(), Some(&"lead.created"));
    assert!(types.contains(&"bid.selected"));
    assert!(types.iter().filter(|t| **t == "lead.updated").count() >= 3);
}
