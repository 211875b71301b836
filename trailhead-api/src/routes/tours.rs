/// Tour endpoints
///
/// # Endpoints
///
/// - `GET /api/v1/tours` - List (filter, sort, fields, page)
/// - `GET /api/v1/tours/top-5-cheap` - Best rated, then cheapest
/// - `GET /api/v1/tours/tour-stats` - Aggregates per difficulty
/// - `GET /api/v1/tours/monthly-plan/:year` - Starts per month (staff)
/// - `GET /api/v1/tours/tours-within/:distance/center/:latlng/unit/:unit`
/// - `GET /api/v1/tours/distances/:latlng/unit/:unit`
/// - `GET /api/v1/tours/:id` - One tour with its reviews and guides
/// - `POST|PATCH|DELETE` - Admins and lead guides
/// - `/api/v1/tours/:id/reviews` - Reviews of one tour

use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::{json, Value};
use trailhead_shared::auth::roles::AllowedRoles;
use trailhead_shared::models::tour::{
    GeoPoint, Tour, DEFAULT_RATING, EARTH_RADIUS_KM, EARTH_RADIUS_MI, METERS_TO_KM, METERS_TO_MI,
};
use trailhead_shared::query::ListQuery;

use super::{guarded, reviews};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    factory::{create_one, delete_one, get_all, get_one, list_records, public_value, update_one},
};

/// Parameters forced by the top-5-cheap alias
const TOP_CHEAP_ALIAS: [(&str, &str); 3] = [
    ("limit", "5"),
    ("sort", "-ratingsAverage,price"),
    ("fields", "name,price,ratingsAverage,summary,difficulty"),
];

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/top-5-cheap", get(top_five_cheap))
        .route("/tour-stats", get(tour_stats))
        .route(
            "/monthly-plan/:year",
            guarded(state, AllowedRoles::TOUR_STAFF, get(monthly_plan)),
        )
        .route(
            "/tours-within/:distance/center/:latlng/unit/:unit",
            get(tours_within),
        )
        .route("/distances/:latlng/unit/:unit", get(distances))
        .route(
            "/",
            get(get_all::<Tour>).merge(guarded(
                state,
                AllowedRoles::TOUR_MANAGERS,
                post(create_one::<Tour>),
            )),
        )
        .route(
            "/:id",
            get(get_one::<Tour>).merge(guarded(
                state,
                AllowedRoles::TOUR_MANAGERS,
                patch(update_one::<Tour>).delete(delete_one::<Tour>),
            )),
        )
        .nest("/:id/reviews", reviews::nested_router(state))
}

pub async fn top_five_cheap(
    State(state): State<AppState>,
    Query(mut params): Query<BTreeMap<String, String>>,
) -> ApiResult<Json<Value>> {
    for (key, value) in TOP_CHEAP_ALIAS {
        params.insert(key.to_string(), value.to_string());
    }

    list_records::<Tour>(&state, ListQuery::default(), params)
        .await
        .map(Json)
}

pub async fn tour_stats(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let stats = state.stores.tours.stats(DEFAULT_RATING).await?;

    Ok(Json(json!({
        "status": "success",
        "data": { "stats": stats },
    })))
}

pub async fn monthly_plan(
    State(state): State<AppState>,
    Path(year): Path<String>,
) -> ApiResult<Json<Value>> {
    let year: i32 = year
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid year: {}.", year)))?;

    let plan = state.stores.tours.monthly_plan(year).await?;

    Ok(Json(json!({
        "status": "success",
        "data": { "plan": plan },
    })))
}

/// Parses `lat,lng` into a point
pub fn parse_latlng(raw: &str) -> ApiResult<GeoPoint> {
    let invalid = || {
        ApiError::BadRequest(
            "Please provide latitude and longitude in the format lat,lng.".to_string(),
        )
    };

    let (lat, lng) = raw.split_once(',').ok_or_else(invalid)?;
    let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
    let lng: f64 = lng.trim().parse().map_err(|_| invalid())?;

    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(invalid());
    }

    Ok(GeoPoint::new(lng, lat))
}

fn in_miles(unit: &str) -> bool {
    unit == "mi"
}

pub async fn tours_within(
    State(state): State<AppState>,
    Path((distance, latlng, unit)): Path<(String, String, String)>,
) -> ApiResult<Json<Value>> {
    let distance: f64 = distance
        .parse()
        .ok()
        .filter(|d: &f64| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| ApiError::BadRequest(format!("Invalid distance: {}.", distance)))?;
    let center = parse_latlng(&latlng)?;

    let earth_radius = if in_miles(&unit) {
        EARTH_RADIUS_MI
    } else {
        EARTH_RADIUS_KM
    };

    let tours = state
        .stores
        .tours
        .within(&center, distance / earth_radius)
        .await?;

    Ok(Json(json!({
        "status": "success",
        "results": tours.len(),
        "data": { "data": public_value(&tours)? },
    })))
}

pub async fn distances(
    State(state): State<AppState>,
    Path((latlng, unit)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let origin = parse_latlng(&latlng)?;
    let multiplier = if in_miles(&unit) {
        METERS_TO_MI
    } else {
        METERS_TO_KM
    };

    let distances = state.stores.tours.distances(&origin, multiplier).await?;

    Ok(Json(json!({
        "status": "success",
        "data": { "data": distances },
    })))
}
