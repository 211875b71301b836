/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use trailhead_api::{app::AppState, config::Config};
/// use trailhead_shared::services::mailer::LogMailer;
/// use trailhead_shared::services::payments::HttpPaymentProvider;
/// use trailhead_shared::store::Stores;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let payments = HttpPaymentProvider::new(&config.payments.api_url, &config.payments.access_token)?;
/// let state = AppState::new(
///     Stores::memory(),
///     config.clone(),
///     Arc::new(LogMailer::new(&config.mail.from)),
///     Arc::new(payments),
/// );
/// let app = trailhead_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, OriginalUri},
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
use trailhead_shared::services::mailer::Mailer;
use trailhead_shared::services::payments::PaymentProvider;
use trailhead_shared::store::Stores;

use crate::{config::Config, error::ApiError, middleware::errors::expose_error_detail, routes};

/// Largest accepted request body
pub const BODY_LIMIT: usize = 10 * 1024;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Repositories of the configured backend
    pub stores: Stores,

    /// Application configuration
    pub config: Arc<Config>,

    pub mailer: Arc<dyn Mailer>,

    pub payments: Arc<dyn PaymentProvider>,
}

impl AppState {
    /// Creates new application state
    pub fn new(
        stores: Stores,
        config: Config,
        mailer: Arc<dyn Mailer>,
        payments: Arc<dyn PaymentProvider>,
    ) -> Self {
        Self {
            stores,
            config: Arc::new(config),
            mailer,
            payments,
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                         # Store connectivity (public)
/// ├── /, /tour/:slug, /login, ...     # Page context routes
/// └── /api/v1/
///     ├── /tours/                     # Tours, analytics, geo
///     │   └── /:id/reviews/           # Reviews of one tour
///     ├── /users/                     # Accounts and sessions
///     ├── /reviews/                   # Reviews (authenticated)
///     └── /bookings/                  # Checkout and bookings
/// ```
///
/// # Middleware Stack
///
/// Applied in order (outermost first):
/// 1. Logging (tower-http TraceLayer)
/// 2. Request body limit
/// 3. Development error detail
/// 4. Authentication and role checks (per-route basis)
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .nest("/tours", routes::tours::router(&state))
        .nest("/users", routes::users::router(&state))
        .nest("/reviews", routes::reviews::router(&state))
        .nest("/bookings", routes::bookings::router(&state));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .merge(routes::views::router(&state))
        .nest("/api/v1", api_routes)
        .fallback(unknown_route)
        .layer(from_fn_with_state(state.clone(), expose_error_detail))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

async fn unknown_route(OriginalUri(uri): OriginalUri) -> ApiError {
    ApiError::NotFound(format!("Can't find {} on this server!", uri.path()))
}
