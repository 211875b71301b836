/// Page routes
///
/// Each page answers with the JSON context a template would render: a
/// `title`, the logged-in `user` (or null) and the page's data.
///
/// - `/` - Tour overview
/// - `/tour/:slug` - One tour with reviews and guides (session required)
/// - `/login`, `/signup` - Forms
/// - `/me` - Account page (session required)
/// - `/my-tours` - Tours the user booked (session required)
///
/// `/` and `/my-tours` also record a booking when the payment provider's
/// success redirect lands on them with `tour`, `user` and `price` in the
/// query, then redirect to the bare path.

use axum::{
    extract::{OriginalUri, Path, Query, State},
    middleware::from_fn_with_state,
    response::{IntoResponse, Redirect, Response},
    routing::{get, MethodRouter},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use trailhead_shared::models::booking::CreateBooking;
use trailhead_shared::models::tour::Tour;
use trailhead_shared::models::user::User;
use trailhead_shared::models::Entity;
use trailhead_shared::query::{ListQuery, SortKey};
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{CurrentUser, MaybeUser},
    factory::{parse_id, populate, public_value},
    middleware::auth::{is_logged_in, protect_page},
};

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", soft_check(state, get(overview)))
        .route("/tour/:slug", session(state, get(tour_page)))
        .route("/login", soft_check(state, get(login_form)))
        .route("/signup", soft_check(state, get(signup_form)))
        .route("/me", session(state, get(account)))
        .route("/my-tours", session(state, get(my_tours)))
}

fn soft_check(state: &AppState, route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.route_layer(from_fn_with_state(state.clone(), is_logged_in))
}

fn session(state: &AppState, route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.route_layer(from_fn_with_state(state.clone(), protect_page))
}

fn page(title: &str, user: Option<&User>, data: Value) -> Json<Value> {
    let mut context = json!({
        "title": title,
        "user": user.map(User::public_profile),
    });
    if let (Value::Object(context), Value::Object(data)) = (&mut context, data) {
        context.extend(data);
    }
    Json(context)
}

/// Booking fields appended to the checkout success URL
#[derive(Debug, Default, Deserialize)]
pub struct BookingParams {
    pub tour: Option<String>,
    pub user: Option<String>,
    pub price: Option<String>,
}

impl BookingParams {
    /// The booking to record, when all three fields are present
    fn parse(&self) -> ApiResult<Option<CreateBooking>> {
        let (Some(tour), Some(user), Some(price)) = (&self.tour, &self.user, &self.price) else {
            return Ok(None);
        };

        let price: f64 = price
            .parse()
            .map_err(|_| ApiError::BadRequest(format!("Invalid price: {}.", price)))?;

        Ok(Some(CreateBooking {
            tour: parse_id(tour)?,
            user: parse_id(user)?,
            price,
            paid: true,
        }))
    }
}

/// Records the booking carried in the query, if any, and redirects to `path`
async fn record_booking(
    state: &AppState,
    params: &BookingParams,
    path: &str,
) -> ApiResult<Option<Response>> {
    let Some(booking) = params.parse()? else {
        return Ok(None);
    };
    booking.validate()?;

    let created = state.stores.bookings.create(booking).await?;
    tracing::info!(booking_id = %created.id, tour_id = %created.tour, "Booking recorded from checkout");

    Ok(Some(Redirect::to(path).into_response()))
}

pub async fn overview(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    MaybeUser(user): MaybeUser,
    Query(params): Query<BookingParams>,
) -> ApiResult<Response> {
    if let Some(redirect) = record_booking(&state, &params, uri.path()).await? {
        return Ok(redirect);
    }

    let query = ListQuery {
        sort: vec![SortKey {
            field: "createdAt".to_string(),
            descending: true,
        }],
        ..ListQuery::default()
    };
    let tours = state.stores.tours.list(&query).await?;

    Ok(page(
        "All Tours",
        user.as_ref(),
        json!({ "tours": public_value(&tours)? }),
    )
    .into_response())
}

pub async fn tour_page(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(slug): Path<String>,
) -> ApiResult<Json<Value>> {
    let tour = state
        .stores
        .tours
        .find_by_slug(&slug)
        .await?
        .ok_or_else(|| ApiError::NotFound("There is no tour with that name.".to_string()))?;

    let mut value = public_value(&tour)?;
    populate(&state.stores, Tour::POPULATE, tour.id, &mut value).await?;

    Ok(page(
        &format!("{} Tour", tour.name),
        Some(&user),
        json!({ "tour": value }),
    ))
}

pub async fn login_form(MaybeUser(user): MaybeUser) -> Json<Value> {
    page("Log into your account", user.as_ref(), json!({}))
}

pub async fn signup_form(MaybeUser(user): MaybeUser) -> Json<Value> {
    page("Create your account", user.as_ref(), json!({}))
}

pub async fn account(CurrentUser(user): CurrentUser) -> Json<Value> {
    page("Your account", Some(&user), json!({}))
}

pub async fn my_tours(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    CurrentUser(user): CurrentUser,
    Query(params): Query<BookingParams>,
) -> ApiResult<Response> {
    if let Some(redirect) = record_booking(&state, &params, uri.path()).await? {
        return Ok(redirect);
    }

    let bookings = state.stores.bookings.list_for_user(user.id).await?;
    let tour_ids: Vec<Uuid> = bookings.iter().map(|b| b.tour).collect();
    let tours = state.stores.tours.find_many(&tour_ids).await?;

    Ok(page(
        "My Tours",
        Some(&user),
        json!({ "tours": public_value(&tours)? }),
    )
    .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booking_params_need_all_fields() {
        let partial = BookingParams {
            tour: Some(Uuid::new_v4().to_string()),
            ..Default::default()
        };
        assert!(partial.parse().unwrap().is_none());

        let full = BookingParams {
            tour: Some(Uuid::new_v4().to_string()),
            user: Some(Uuid::new_v4().to_string()),
            price: Some("497".to_string()),
        };
        let booking = full.parse().unwrap().unwrap();
        assert_eq!(booking.price, 497.0);
        assert!(booking.paid);
    }

    #[test]
    fn test_booking_params_reject_bad_ids() {
        let params = BookingParams {
            tour: Some("not-a-uuid".to_string()),
            user: Some(Uuid::new_v4().to_string()),
            price: Some("497".to_string()),
        };
        assert!(params.parse().is_err());
    }

    #[test]
    fn test_page_context_merges_data() {
        let Json(context) = page("All Tours", None, json!({ "tours": [] }));
        assert_eq!(context["title"], "All Tours");
        assert!(context["user"].is_null());
        assert!(context["tours"].as_array().is_some());
    }
}
