//! # Dizmen HTTP API Module
//!
//! JSON over HTTP, served with axum.
//!
//! ## Endpoints
//!
//! Public:
//! - `GET /health`
//! - `GET /menu/{restaurant_id}[?at=HH:mm]` - customer menu
//! - `GET /items/{id}/reviews` - only for verified restaurants, unless the caller
//!   owns the restaurant or is an administrator
//!
//! Owner (or administrator):
//! - `GET /users/{user_id}/onboarding`
//! - `GET|PUT|DELETE /users/{user_id}/draft`
//! - `POST /users/{user_id}/draft/advance`, `POST /users/{user_id}/draft/back`
//! - `POST /users/{user_id}/draft/documents`, `DELETE /users/{user_id}/draft/documents/{id}`
//! - `POST /restaurants` (header `Idempotency-Key`)
//! - `GET|PATCH /restaurants/{id}`, `GET|POST /restaurants/{id}/menus`
//! - `PATCH|DELETE /menus/{id}`, `POST /menus/{id}/toggle`, `POST /menus/{id}/items`
//! - `PATCH|DELETE /items/{id}`, `POST /items/{id}/toggle`, `POST /items/{id}/move`
//! - `GET /documents/{id}`
//!
//! Administrator:
//! - `GET /restaurants?status=`, `PATCH /restaurants/{id}/verification`
//!
//! Any signed-in user:
//! - `POST /items/{id}/reviews`

mod auth;
mod error;
mod handlers;
mod middleware;
mod types;

pub use auth::{Claims, Principal, Role, TokenService};
pub use error::ApiError;
pub use handlers::IDEMPOTENCY_KEY_HEADER;
pub use middleware::{GlobalRateLimiter, create_rate_limiter};
pub use types::{
    DeleteMenuResponse, DiscardResponse, DocumentResponse, DocumentUploadRequest,
    DocumentUploadResponse, ErrorResponse, HealthResponse, MoveItemRequest, OnboardingResponse,
    PublicMenuQuery, RestaurantListQuery, RestaurantListResponse, RestaurantUpdateRequest,
    VerificationRequest, WizardUpdate,
};

use crate::config::{Config, ServerConfig};
use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use dizmen_core::{DizmenError, Platform};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Largest accepted request body; base64 documents dominate.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
///
/// Queries take the platform's read lock, changes take the write lock, so two
/// submissions for the same owner can never interleave.
#[derive(Clone)]
pub struct AppState {
    pub platform: Arc<RwLock<Platform>>,
    pub tokens: Arc<TokenService>,
}

impl AppState {
    #[must_use]
    pub fn new(platform: Platform, tokens: TokenService) -> Self {
        Self {
            platform: Arc::new(RwLock::new(platform)),
            tokens: Arc::new(tokens),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

fn idempotency_header() -> HeaderName {
    HeaderName::from_static(IDEMPOTENCY_KEY_HEADER)
}

/// Build the CORS layer from `server.cors_origins`.
///
/// - `["*"]`: all origins (development only)
/// - empty: localhost only
/// - otherwise: the listed origins; invalid entries are skipped
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS: Allowing ALL origins. This is insecure for production!");
        return CorsLayer::permissive();
    }
    if origins.is_empty() {
        tracing::info!("CORS: No origins configured, defaulting to localhost only");
        return build_localhost_cors();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(hv) => {
                tracing::info!("CORS: Allowing origin: {}", origin);
                Some(hv)
            }
            Err(e) => {
                tracing::warn!("CORS: Invalid origin '{}': {}", origin, e);
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        tracing::warn!("CORS: No valid origins configured, defaulting to localhost only");
        build_localhost_cors()
    } else {
        with_api_methods(CorsLayer::new().allow_origin(allowed))
    }
}

fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();
    with_api_methods(CorsLayer::new().allow_origin(origins))
}

fn with_api_methods(layer: CorsLayer) -> CorsLayer {
    layer
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, idempotency_header()])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Body limit
/// 4. Rate limiting (if enabled)
///
/// Authentication happens per handler through the `Principal` extractor.
pub fn create_router(state: AppState, server: &ServerConfig) -> Router {
    let cors = build_cors_layer(&server.cors_origins);

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/menu/{restaurant_id}", get(handlers::public_menu_handler))
        // Onboarding
        .route("/users/{user_id}/onboarding", get(handlers::onboarding_handler))
        .route(
            "/users/{user_id}/draft",
            get(handlers::get_draft_handler)
                .put(handlers::save_draft_handler)
                .delete(handlers::discard_draft_handler),
        )
        .route("/users/{user_id}/draft/advance", post(handlers::advance_handler))
        .route("/users/{user_id}/draft/back", post(handlers::back_handler))
        .route(
            "/users/{user_id}/draft/documents",
            post(handlers::upload_document_handler),
        )
        .route(
            "/users/{user_id}/draft/documents/{document_id}",
            axum::routing::delete(handlers::remove_document_handler),
        )
        // Restaurants & verification
        .route(
            "/restaurants",
            get(handlers::list_restaurants_handler).post(handlers::submit_handler),
        )
        .route(
            "/restaurants/{id}",
            get(handlers::get_restaurant_handler).patch(handlers::update_restaurant_handler),
        )
        .route(
            "/restaurants/{id}/verification",
            axum::routing::patch(handlers::verification_handler),
        )
        .route("/documents/{id}", get(handlers::document_handler))
        // Catalog
        .route(
            "/restaurants/{id}/menus",
            get(handlers::list_menus_handler).post(handlers::create_menu_handler),
        )
        .route(
            "/menus/{id}",
            axum::routing::patch(handlers::update_menu_handler)
                .delete(handlers::delete_menu_handler),
        )
        .route("/menus/{id}/toggle", post(handlers::toggle_menu_handler))
        .route("/menus/{id}/items", post(handlers::add_item_handler))
        .route(
            "/items/{id}",
            axum::routing::patch(handlers::update_item_handler)
                .delete(handlers::delete_item_handler),
        )
        .route("/items/{id}/toggle", post(handlers::toggle_item_handler))
        .route("/items/{id}/move", post(handlers::move_item_handler))
        .route(
            "/items/{id}/reviews",
            get(handlers::list_reviews_handler).post(handlers::add_review_handler),
        );

    if server.rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", server.rate_limit);
        router = router.layer(axum_middleware::from_fn_with_state(
            create_rate_limiter(server.rate_limit),
            middleware::rate_limit_middleware,
        ));
    } else {
        tracing::info!("Rate limiting disabled");
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Open the configured platform and serve until Ctrl+C.
pub async fn run_server(config: &Config) -> Result<(), DizmenError> {
    let tokens = TokenService::from_config(config)?;
    let platform = config.open_platform()?;
    let state = AppState::new(platform, tokens);
    let router = create_router(state, &config.server);

    let addr = config.server.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| DizmenError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("Dizmen HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| DizmenError::IoError(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

// =============================================================================
// TESTS
// =============================================================================
