/// Booking endpoints
///
/// # Endpoints
///
/// - `GET /api/v1/bookings/checkout-session/:tourId` - Start a hosted checkout
/// - `GET|POST /api/v1/bookings`, `GET|PATCH|DELETE /api/v1/bookings/:id` -
///   Admins and lead guides
///
/// A paid checkout returns the buyer to `/my-tours` with the booking in the
/// query string, where the page route records it.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use trailhead_shared::auth::roles::AllowedRoles;
use trailhead_shared::models::booking::Booking;
use trailhead_shared::models::tour::Tour;
use trailhead_shared::models::user::User;
use trailhead_shared::services::payments::{BackUrls, CheckoutItem, CheckoutRequest};

use super::{authenticated, base_url, guarded};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::CurrentUser,
    factory::{create_one, delete_one, get_all, get_one, parse_id, update_one},
};

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/checkout-session/:tourId",
            authenticated(state, get(checkout_session)),
        )
        .route(
            "/",
            guarded(
                state,
                AllowedRoles::TOUR_MANAGERS,
                get(get_all::<Booking>).post(create_one::<Booking>),
            ),
        )
        .route(
            "/:id",
            guarded(
                state,
                AllowedRoles::TOUR_MANAGERS,
                get(get_one::<Booking>)
                    .patch(update_one::<Booking>)
                    .delete(delete_one::<Booking>),
            ),
        )
}

/// Checkout preference for one seat on `tour`
pub fn checkout_request(base: &str, tour: &Tour, user: &User) -> CheckoutRequest {
    CheckoutRequest {
        items: vec![CheckoutItem {
            id: tour.id.to_string(),
            title: format!("{} Tour", tour.name),
            quantity: 1,
            unit_price: tour.price,
        }],
        back_urls: BackUrls {
            success: format!(
                "{}/my-tours?tour={}&user={}&price={}",
                base, tour.id, user.id, tour.price
            ),
            failure: format!("{}/tour/{}", base, tour.slug),
        },
    }
}

pub async fn checkout_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    CurrentUser(user): CurrentUser,
    Path(tour_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let tour = state
        .stores
        .tours
        .get(parse_id(&tour_id)?)
        .await?
        .ok_or_else(|| ApiError::not_found("tour"))?;

    let request = checkout_request(&base_url(&headers), &tour, &user);
    let session = state.payments.create_preference(&request).await?;

    tracing::info!(tour_id = %tour.id, user_id = %user.id, "Checkout session created");

    Ok(Json(json!({
        "status": "success",
        "data": session,
    })))
}
