/// Account and session endpoints
///
/// # Endpoints
///
/// Public:
/// - `POST /api/v1/users/signup` - Create an account and start a session
/// - `POST /api/v1/users/login` - Start a session
/// - `GET /api/v1/users/logout` - Overwrite the session cookie
/// - `POST /api/v1/users/forgotPassword` - Mail a reset link
/// - `PATCH /api/v1/users/resetPassword/:token` - Redeem a reset token
///
/// Authenticated:
/// - `PATCH /api/v1/users/updateMyPassword`
/// - `GET /api/v1/users/me`
/// - `PATCH /api/v1/users/updateMe` - Name and email only
/// - `DELETE /api/v1/users/deleteMe` - Deactivate the account
///
/// Admin:
/// - `GET /api/v1/users`, `GET|PATCH|DELETE /api/v1/users/:id`
///
/// Every endpoint that starts a session answers with the token in the body
/// and in an HttpOnly `jwt` cookie.

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Json, Router,
};
use chrono::Duration;
use serde::Deserialize;
use serde_json::{json, Value};
use trailhead_shared::auth::jwt::{create_token, Claims};
use trailhead_shared::auth::password::{hash_password, verify_password};
use trailhead_shared::auth::reset_token::{hash_token, IssuedResetToken};
use trailhead_shared::auth::roles::AllowedRoles;
use trailhead_shared::models::user::{NewPassword, PasswordChange, ProfileUpdate, SignupInput, User};
use trailhead_shared::services::mailer::{MailMessage, MailTemplate};
use validator::Validate;

use super::{authenticated, base_url, guarded};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{CurrentUser, JsonBody, ValidatedJson},
    factory::{delete_one, envelope, get_all, get_one, public_value, update_one},
    middleware::auth::{JWT_COOKIE, LOGGED_OUT},
};

/// Seconds the logout cookie survives
const LOGOUT_COOKIE_SECONDS: i64 = 10;

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/forgotPassword", post(forgot_password))
        .route("/resetPassword/:token", patch(reset_password))
        .route("/updateMyPassword", authenticated(state, patch(update_my_password)))
        .route("/me", authenticated(state, get(me)))
        .route("/updateMe", authenticated(state, patch(update_me)))
        .route("/deleteMe", authenticated(state, delete(delete_me)))
        .route(
            "/",
            guarded(state, AllowedRoles::ADMIN, get(get_all::<User>).post(create_user)),
        )
        .route(
            "/:id",
            guarded(
                state,
                AllowedRoles::ADMIN,
                get(get_one::<User>)
                    .patch(update_one::<User>)
                    .delete(delete_one::<User>),
            ),
        )
}

/// `Set-Cookie` value carrying a session token
pub fn session_cookie(token: &str, max_age_seconds: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; Path=/; Max-Age={}; SameSite=Lax",
        JWT_COOKIE, token, max_age_seconds
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Issues a session token for `user` as body and cookie
fn send_token(state: &AppState, user: &User, status: StatusCode) -> ApiResult<Response> {
    let claims = Claims::new(user.id, Duration::days(state.config.jwt.expires_in_days));
    let token = create_token(&claims, state.jwt_secret())?;

    let cookie = session_cookie(
        &token,
        state.config.jwt.cookie_expires_in_days * 24 * 60 * 60,
        state.config.is_production(),
    );

    let body = json!({
        "status": "success",
        "token": token,
        "data": { "user": public_value(user)? },
    });

    Ok((status, [(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

pub async fn signup(
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidatedJson(input): ValidatedJson<SignupInput>,
) -> ApiResult<Response> {
    let password_hash = hash_password(&input.password)?;
    let user = state.stores.users.create(input.into_create(password_hash)).await?;

    tracing::info!(user_id = %user.id, role = user.role.as_str(), "User signed up");

    let url = format!("{}/me", base_url(&headers));
    let welcome = MailMessage::new(&user.email, &user.name, MailTemplate::Welcome, &url);
    if let Err(err) = state.mailer.send(welcome).await {
        tracing::warn!(user_id = %user.id, error = %err, "Welcome mail was not sent");
    }

    send_token(&state, &user, StatusCode::CREATED)
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> ApiResult<Response> {
    let (Some(email), Some(password)) = (
        req.email.filter(|e| !e.trim().is_empty()),
        req.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::BadRequest(
            "Please provide email and password!".to_string(),
        ));
    };

    let incorrect = || ApiError::Unauthorized("Incorrect email or password".to_string());

    let user = state
        .stores
        .users
        .find_by_email(&email)
        .await?
        .ok_or_else(incorrect)?;

    if !verify_password(&password, &user.password_hash)? {
        tracing::debug!(user_id = %user.id, "Rejected login with wrong password");
        return Err(incorrect());
    }

    send_token(&state, &user, StatusCode::OK)
}

pub async fn logout(State(state): State<AppState>) -> Response {
    let cookie = session_cookie(LOGGED_OUT, LOGOUT_COOKIE_SECONDS, state.config.is_production());
    (
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "status": "success" })),
    )
        .into_response()
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
}

pub async fn forgot_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidatedJson(req): ValidatedJson<ForgotPasswordRequest>,
) -> ApiResult<Json<Value>> {
    let user = state
        .stores
        .users
        .find_by_email(&req.email)
        .await?
        .ok_or_else(|| ApiError::NotFound("There is no user with email address.".to_string()))?;

    let token = IssuedResetToken::issue();
    state
        .stores
        .users
        .set_reset_token(user.id, &token.hash, token.expires_at)
        .await?;

    let url = format!(
        "{}/api/v1/users/resetPassword/{}",
        base_url(&headers),
        token.plaintext
    );
    let message = MailMessage::new(&user.email, &user.name, MailTemplate::PasswordReset, &url);

    if let Err(err) = state.mailer.send(message).await {
        tracing::error!(user_id = %user.id, error = %err, "Password reset mail failed");
        state.stores.users.clear_reset_token(user.id).await?;
        return Err(ApiError::ServerFault(
            "There was an error sending the email. Try again later!".to_string(),
        ));
    }

    Ok(Json(json!({
        "status": "success",
        "message": "Token sent to email!",
    })))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    ValidatedJson(input): ValidatedJson<NewPassword>,
) -> ApiResult<Response> {
    let password_hash = hash_password(&input.password)?;

    let user = state
        .stores
        .users
        .redeem_reset_token(&hash_token(&token), &password_hash)
        .await?
        .ok_or_else(|| ApiError::BadRequest("Token is invalid or has expired".to_string()))?;

    tracing::info!(user_id = %user.id, "Password reset");

    send_token(&state, &user, StatusCode::OK)
}

pub async fn update_my_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidatedJson(input): ValidatedJson<PasswordChange>,
) -> ApiResult<Response> {
    if !verify_password(&input.password_current, &user.password_hash)? {
        return Err(ApiError::Unauthorized(
            "Your current password is wrong.".to_string(),
        ));
    }

    let password_hash = hash_password(&input.password)?;
    let user = state
        .stores
        .users
        .set_password(user.id, &password_hash)
        .await?
        .ok_or_else(|| ApiError::not_found("user"))?;

    send_token(&state, &user, StatusCode::OK)
}

pub async fn me(CurrentUser(user): CurrentUser) -> ApiResult<Json<Value>> {
    Ok(Json(envelope(public_value(&user)?)))
}

pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(body): JsonBody<ProfileUpdate>,
) -> ApiResult<Json<Value>> {
    if body.touches_password() {
        return Err(ApiError::BadRequest(
            "This route is not for password updates. Please use /updateMyPassword.".to_string(),
        ));
    }
    body.validate()?;

    // Only these fields are self-service; role and photo stay untouched.
    let patch = body.into_patch();

    let updated = state
        .stores
        .users
        .update(user.id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found("user"))?;

    Ok(Json(json!({
        "status": "success",
        "data": { "user": public_value(&updated)? },
    })))
}

pub async fn delete_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<StatusCode> {
    state.stores.users.deactivate(user.id).await?;
    tracing::info!(user_id = %user.id, "Account deactivated");

    Ok(StatusCode::NO_CONTENT)
}

/// Accounts are only created through signup
pub async fn create_user() -> ApiError {
    ApiError::BadRequest("This route is not defined! Please use /signup instead".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_flags() {
        assert_eq!(
            session_cookie("abc", 60, false),
            "jwt=abc; HttpOnly; Path=/; Max-Age=60; SameSite=Lax"
        );
        assert!(session_cookie("abc", 60, true).ends_with("; Secure"));
    }
}
