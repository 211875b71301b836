/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `tours`: Tour CRUD, analytics and geo queries
/// - `users`: Sessions, account self-service and user administration
/// - `reviews`: Review CRUD, also mounted under a tour
/// - `bookings`: Checkout and booking administration
/// - `views`: Page context routes

pub mod bookings;
pub mod health;
pub mod reviews;
pub mod tours;
pub mod users;
pub mod views;

use axum::{http::HeaderMap, middleware::from_fn_with_state, routing::MethodRouter};
use trailhead_shared::auth::roles::AllowedRoles;

use crate::{
    app::AppState,
    middleware::auth::{protect, restrict_to},
};

/// Requires a session on every method of `route`
pub(crate) fn authenticated(
    state: &AppState,
    route: MethodRouter<AppState>,
) -> MethodRouter<AppState> {
    route.route_layer(from_fn_with_state(state.clone(), protect))
}

/// Requires a session whose role is in `roles`
pub(crate) fn guarded(
    state: &AppState,
    roles: AllowedRoles,
    route: MethodRouter<AppState>,
) -> MethodRouter<AppState> {
    let route = route.route_layer(from_fn_with_state(roles, restrict_to));
    authenticated(state, route)
}

/// Scheme and host the client used to reach us
pub(crate) fn base_url(headers: &HeaderMap) -> String {
    let host = headers
        .get("x-forwarded-host")
        .or_else(|| headers.get(axum::http::header::HOST))
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");

    format!("{}://{}", scheme, host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_base_url_prefers_forwarded_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("internal:3000"));
        assert_eq!(base_url(&headers), "http://internal:3000");

        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        headers.insert("x-forwarded-host", HeaderValue::from_static("trailhead.dev"));
        assert_eq!(base_url(&headers), "https://trailhead.dev");
    }
}
