/// Session authentication and role checks
///
/// A session token is read from the `Authorization: Bearer` header, falling
/// back to the `jwt` cookie. Three gates build on it:
///
/// - [`protect`]: API routes; every failure is a 401
/// - [`protect_page`]: page routes; no token redirects to `/`
/// - [`is_logged_in`]: soft check; failures continue anonymously
///
/// Each inserts [`CurrentUser`] into the request extensions on success.
/// [`restrict_to`] then checks the user's role against an [`AllowedRoles`]
/// set and must be layered inside one of the gates.
///
/// # Example
///
/// ```ignore
/// use axum::{middleware::from_fn_with_state, routing::post};
/// use trailhead_shared::auth::roles::AllowedRoles;
///
/// let route = post(create_tour)
///     .route_layer(from_fn_with_state(AllowedRoles::TOUR_MANAGERS, restrict_to))
///     .route_layer(from_fn_with_state(state.clone(), protect));
/// ```

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use trailhead_shared::auth::identity::{resolve_identity, AuthError};
use trailhead_shared::auth::roles::AllowedRoles;
use trailhead_shared::models::user::User;

use crate::{app::AppState, error::ApiError, extract::CurrentUser};

/// Name of the session cookie
pub const JWT_COOKIE: &str = "jwt";

/// Placeholder value written to the cookie on logout
pub const LOGGED_OUT: &str = "loggedout";

/// Finds the session token in the request headers
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    match bearer {
        Some(token) => Some(token.to_string()),
        None => cookie_value(headers, JWT_COOKIE).filter(|token| token != LOGGED_OUT),
    }
}

/// Value of the first cookie named `name`
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<User, AuthError> {
    let token = extract_token(headers).ok_or(AuthError::MissingCredentials)?;
    resolve_identity(state.stores.users.as_ref(), &token, state.jwt_secret()).await
}

/// Requires a valid session on API routes
pub async fn protect(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(&state, req.headers()).await?;
    req.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(req).await)
}

/// Requires a valid session on page routes
pub async fn protect_page(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    match authenticate(&state, req.headers()).await {
        Ok(user) => {
            req.extensions_mut().insert(CurrentUser(user));
            Ok(next.run(req).await)
        }
        Err(AuthError::MissingCredentials) => Ok(Redirect::to("/").into_response()),
        Err(err) => Err(err.into()),
    }
}

/// Attaches the user when a valid session is present
pub async fn is_logged_in(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    match authenticate(&state, req.headers()).await {
        Ok(user) => {
            req.extensions_mut().insert(CurrentUser(user));
        }
        Err(AuthError::MissingCredentials) => {}
        Err(err) => tracing::debug!(error = %err, "Continuing anonymously"),
    }

    next.run(req).await
}

/// Rejects users whose role is not in `roles`
pub async fn restrict_to(
    State(roles): State<AllowedRoles>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let role = req
        .extensions()
        .get::<CurrentUser>()
        .map(|user| user.0.role)
        .ok_or_else(|| ApiError::from(AuthError::MissingCredentials))?;

    if !roles.permits(role) {
        tracing::debug!(role = role.as_str(), "Role not permitted on this route");
        return Err(ApiError::Forbidden(
            "You do not have permission to perform this action".to_string(),
        ));
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_bearer_header_wins_over_cookie() {
        let map = headers(&[
            (header::AUTHORIZATION, "Bearer header-token"),
            (header::COOKIE, "jwt=cookie-token"),
        ]);
        assert_eq!(extract_token(&map).as_deref(), Some("header-token"));
    }

    #[test]
    fn test_cookie_is_used_without_bearer() {
        let map = headers(&[(header::COOKIE, "theme=dark; jwt=cookie-token; lang=en")]);
        assert_eq!(extract_token(&map).as_deref(), Some("cookie-token"));
    }

    #[test]
    fn test_logged_out_cookie_is_no_token() {
        let map = headers(&[(header::COOKIE, "jwt=loggedout")]);
        assert_eq!(extract_token(&map), None);
    }

    #[test]
    fn test_non_bearer_authorization_is_ignored() {
        let map = headers(&[(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")]);
        assert_eq!(extract_token(&map), None);
    }
}
