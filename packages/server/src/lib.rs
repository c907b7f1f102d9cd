#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the kartlag map service.
//!
//! Republishes upstream `PostgREST` tables (wind power plants, flood
//! zones, hospitals, police/prison and fire/ambulance stations) as
//! `GeoJSON` feature collections for the Leaflet frontend.
//!
//! `GeoJSON` endpoints never fail on upstream trouble: they answer with an
//! empty collection and name the failure in the
//! [`handlers::UPSTREAM_ERROR_HEADER`] response header. Only missing
//! configuration produces a 500.

pub mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use kartlag_gateway::{GatewayConfig, PostgrestClient, RecordSource};

/// Shared application state.
pub struct AppState {
    /// Upstream gateway. Holds only read-only configuration.
    pub source: Arc<dyn RecordSource>,
}

/// Registers the `/api` routes.
///
/// `/power-plants/geojson` is registered before `/power-plants/{id}` so the
/// literal segment wins.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/layers", web::get().to(handlers::layers))
            .route("/layers/{layer}/geojson", web::get().to(handlers::layer_geojson))
            .route("/tables", web::get().to(handlers::tables))
            .route("/power-plants", web::get().to(handlers::power_plants))
            .route(
                "/power-plants/geojson",
                web::get().to(handlers::power_plants_geojson),
            )
            .route("/power-plants/{id}", web::get().to(handlers::power_plant))
            .route("/flood-zones", web::get().to(handlers::flood_zones)),
    );
}

/// Starts the kartlag API server.
///
/// Reads the gateway configuration from the environment (see
/// [`GatewayConfig::from_env`]), builds the upstream client and starts the
/// Actix-Web HTTP server. The caller provides the async runtime (e.g. via
/// `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the configuration is incomplete,
/// the HTTP client cannot be built, or the server fails to bind or
/// encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    log::info!("Reading gateway configuration...");
    let config = GatewayConfig::from_env()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    log::info!(
        "Upstream gateway at {} (timeout {:?})",
        config.base_url,
        config.timeout
    );

    let client = PostgrestClient::new(&config)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    let state = web::Data::new(AppState {
        source: Arc::new(client),
    });

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
