use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use domain::services::{AreaStore, LiveRelay, SurveyService};
use persistence::PgAreaStore;
use shared::jwt::{JwtConfig, JwtError};

use crate::config::Config;
use crate::middleware::{metrics_handler, metrics_middleware, security_headers_middleware, trace_id};
use crate::routes::{areas, coordinates, health, measurements, points, sessions};
use crate::services::firebase_relay::{DisabledRelay, FirebaseRelay};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub survey: Arc<SurveyService>,
    pub jwt: Arc<JwtConfig>,
}

/// Builds the live relay from `relay` settings.
///
/// A relay that fails to start is logged and replaced by the disabled relay;
/// live updates are best effort and never block startup.
pub fn build_relay(config: &Config) -> Arc<dyn LiveRelay> {
    if !config.relay.enabled {
        return Arc::new(DisabledRelay);
    }
    match FirebaseRelay::spawn(config.relay.clone()) {
        Ok(relay) => Arc::new(relay),
        Err(e) => {
            tracing::error!(error = %e, "Failed to start live relay, continuing without it");
            Arc::new(DisabledRelay)
        }
    }
}

/// Application wired to Postgres and the configured relay.
pub fn create_app(config: Config, pool: PgPool) -> Result<Router, JwtError> {
    let store: Arc<dyn AreaStore> = Arc::new(PgAreaStore::new(pool.clone()));
    let relay = build_relay(&config);
    create_app_with(config, pool, store, relay)
}

/// Application over an explicit store and relay.
pub fn create_app_with(
    config: Config,
    pool: PgPool,
    store: Arc<dyn AreaStore>,
    relay: Arc<dyn LiveRelay>,
) -> Result<Router, JwtError> {
    let jwt = Arc::new(config.jwt.build()?);
    let survey = Arc::new(SurveyService::new(store, relay, config.survey_settings()));
    let config = Arc::new(config);

    let state = AppState {
        pool,
        config: config.clone(),
        survey,
        jwt,
    };

    let cors = if config.security.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Bearer auth is enforced per handler by the `AuthUser` extractor.
    let api_routes = Router::new()
        .route(
            "/api/v1/areas",
            post(areas::create_area).get(areas::list_areas),
        )
        .route("/api/v1/areas/:area_id", get(areas::get_area))
        .route(
            "/api/v1/areas/:area_id/recompute",
            post(areas::recompute_area),
        )
        .route("/api/v1/areas/:area_id/stats", get(areas::area_statistics))
        .route("/api/v1/areas/:area_id/progress", get(areas::progress))
        .route(
            "/api/v1/areas/:area_id/points",
            post(points::create_points).get(points::list_points),
        )
        .route("/api/v1/areas/:area_id/points/next", get(points::next_point))
        .route(
            "/api/v1/areas/:area_id/points/reset",
            post(points::reset_points),
        )
        .route(
            "/api/v1/areas/:area_id/points/:point_id/complete",
            post(points::complete_point),
        )
        .route(
            "/api/v1/areas/:area_id/points/:point_id/skip",
            post(points::skip_point),
        )
        .route(
            "/api/v1/areas/:area_id/points/:point_id/coordinates",
            put(coordinates::update_point_coordinates),
        )
        .route(
            "/api/v1/areas/:area_id/coordinates",
            get(coordinates::list_coordinates).put(coordinates::bulk_update_coordinates),
        )
        .route(
            "/api/v1/areas/:area_id/coordinates/stats",
            get(coordinates::gps_statistics),
        )
        .route(
            "/api/v1/areas/:area_id/coordinates/estimate",
            post(coordinates::estimate_missing_coordinates),
        )
        .route(
            "/api/v1/areas/:area_id/session",
            post(sessions::start_session).get(sessions::session_status),
        )
        .route(
            "/api/v1/measurements",
            post(measurements::create_measurement).get(measurements::list_measurements),
        )
        .route(
            "/api/v1/measurements/:measurement_id",
            get(measurements::get_measurement)
                .patch(measurements::update_measurement)
                .delete(measurements::delete_measurement),
        );

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Ok(Router::new()
        .merge(public_routes)
        .merge(api_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            security_headers_middleware,
        ))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state))
}
