use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::warn;

use domain::services::{
    AuthorizationGate, EventBus, FanoutChannel, LinkService, LinkStore, MockPushNotifier,
    PushNotifier,
};
use persistence::repositories::LinkRepository;

use crate::config::Config;
use crate::middleware::{
    metrics_handler, metrics_middleware, rate_limit_middleware, require_user_auth,
    security_headers_middleware, RateLimiterState,
};
use crate::routes::{alerts, events, health, linking, locations};
use crate::services::push::HttpPushNotifier;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub link_service: LinkService,
    pub gate: AuthorizationGate,
    pub bus: EventBus,
    pub fanout: FanoutChannel,
    pub notifier: Arc<dyn PushNotifier>,
    pub rate_limiter: Option<Arc<RateLimiterState>>,
}

impl AppState {
    pub fn new(config: Config, pool: PgPool) -> Self {
        let config = Arc::new(config);
        let store: Arc<dyn LinkStore> = Arc::new(LinkRepository::new(pool.clone()));

        let link_service = LinkService::new(store.clone());
        let gate = AuthorizationGate::new(store.clone());
        let bus = EventBus::default();
        let fanout = FanoutChannel::new(bus.clone(), store);

        let notifier: Arc<dyn PushNotifier> = if config.push.enabled {
            match HttpPushNotifier::new(&config.push) {
                Ok(notifier) => Arc::new(notifier),
                Err(e) => {
                    warn!(error = %e, "Push gateway unavailable, falling back to mock notifier");
                    Arc::new(MockPushNotifier::new())
                }
            }
        } else {
            Arc::new(MockPushNotifier::new())
        };

        let rate_limiter = if config.security.rate_limit_per_minute > 0 {
            Some(Arc::new(RateLimiterState::new(
                config.security.rate_limit_per_minute,
            )))
        } else {
            None
        };

        Self {
            pool,
            config,
            link_service,
            gate,
            bus,
            fanout,
            notifier,
            rate_limiter,
        }
    }
}

pub fn create_app(config: Config, pool: PgPool) -> Router {
    let state = AppState::new(config, pool);

    // Build CORS layer based on configuration
    let cors = if state.config.security.cors_origins.is_empty() {
        // Default: allow any origin (for development)
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        use tower_http::cors::AllowOrigin;
        let origins: Vec<_> = state
            .config
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

    // Protected routes (require a valid identity-provider token)
    // Middleware order: auth runs first, then rate limiting (which needs
    // the authenticated account)
    let protected_routes = Router::new()
        // Linking protocol (v1)
        .route("/api/v1/link/code", post(linking::generate_code))
        .route("/api/v1/link/redeem", post(linking::redeem_code))
        .route("/api/v1/link/requests", get(linking::list_pending_requests))
        .route(
            "/api/v1/link/requests/:child_id/approve",
            post(linking::approve_link),
        )
        .route(
            "/api/v1/link/requests/:child_id/reject",
            post(linking::reject_link),
        )
        .route("/api/v1/link/children", get(linking::list_linked_children))
        .route(
            "/api/v1/link/children/:child_id",
            delete(linking::unlink_child),
        )
        .route("/api/v1/link/status", get(linking::child_link_status))
        // Location ingestion and scoped reads (v1)
        .route("/api/v1/locations", post(locations::upload_location))
        .route(
            "/api/v1/users/:user_id/locations",
            get(locations::list_locations),
        )
        .route(
            "/api/v1/users/:user_id/locations/latest",
            get(locations::latest_location),
        )
        // Alerts (v1)
        .route("/api/v1/alerts", post(alerts::create_alert))
        .route("/api/v1/users/:user_id/alerts", get(alerts::list_alerts))
        .route("/api/v1/alerts/:alert_id/resolve", post(alerts::resolve_alert))
        // Rate limiting runs after auth (needs the account from auth)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        // Auth runs first (outermost layer = runs first)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_user_auth,
        ));

    // The family event feed authenticates inside the handler: browsers
    // cannot set headers on WebSocket upgrades, so the token rides a query
    // parameter
    let feed_routes =
        Router::new().route("/api/v1/family/events", get(events::family_events));

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    let request_timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    Router::new()
        .merge(public_routes)
        .merge(feed_routes)
        .merge(protected_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}
