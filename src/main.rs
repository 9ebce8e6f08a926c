use std::sync::Arc;

use actix_web::web;
use dotenvy::dotenv;
use lead_matching_service::application::matching_service::MatchingService;
use lead_matching_service::config::AppConfig;
use lead_matching_service::infrastructure::lead_store::{DieselLeadStore, DieselProfessionalDirectory};
use lead_matching_service::{build_server, create_pool, run_migrations};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = AppConfig::from_env().unwrap_or_else(|e| {
        log::error!("Invalid configuration: {e}");
        std::process::exit(1);
    });

    let pool = create_pool(&config.database_url, config.pool_size).expect("Failed to create database connection pool");
    run_migrations(&pool).expect("Failed to run database migrations");

    let service = MatchingService::new(
        Arc::new(DieselLeadStore::new(pool.clone())),
        Arc::new(DieselProfessionalDirectory::new(pool)),
        config.matching,
    );

    log::info!(
        "Starting server at http://{}:{} (matching radius {} km)",
        config.host,
        config.port,
        config.matching.default_radius_km
    );

    build_server(web::Data::new(service), &config.host, config.port)?.await
}
