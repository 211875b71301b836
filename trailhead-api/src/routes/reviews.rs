/// Review endpoints
///
/// Mounted twice: at `/api/v1/reviews` and, for one tour's reviews, at
/// `/api/v1/tours/:id/reviews`. On the nested mount the tour id scopes the
/// list and becomes the `tour` of a created review. Every route requires a
/// session; only customers write reviews, and only customers and admins
/// edit or delete them.

use axum::{
    routing::{get, patch, post, MethodRouter},
    Router,
};
use trailhead_shared::auth::roles::AllowedRoles;
use trailhead_shared::models::review::Review;

use super::{authenticated, guarded};
use crate::{
    app::AppState,
    factory::{create_one, delete_one, get_all, get_one, update_one},
};

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new().route("/", collection(state)).route(
        "/:id",
        authenticated(state, get(get_one::<Review>)).merge(guarded(
            state,
            AllowedRoles::REVIEW_EDITORS,
            patch(update_one::<Review>).delete(delete_one::<Review>),
        )),
    )
}

/// Collection routes only, for mounting under a tour
pub fn nested_router(state: &AppState) -> Router<AppState> {
    Router::new().route("/", collection(state))
}

fn collection(state: &AppState) -> MethodRouter<AppState> {
    authenticated(state, get(get_all::<Review>)).merge(guarded(
        state,
        AllowedRoles::CUSTOMERS,
        post(create_one::<Review>),
    ))
}
