/// Resolving a presented session token to a live user
///
/// A token only identifies a user when:
///
/// 1. its signature, issuer and expiry check out,
/// 2. the user it names still exists and is active, and
/// 3. the user has not changed their password after the token was issued.

use super::jwt::{validate_token, JwtError};
use crate::models::user::User;
use crate::store::{Repository, StoreError, UserRepository};

/// Why a token could not be resolved to a user
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("You are not logged in! Please log in to get access.")]
    MissingCredentials,

    #[error("Invalid token. Please log in again!")]
    InvalidToken,

    #[error("Your token has expired! Please log in again.")]
    ExpiredToken,

    #[error("The user belonging to this token does no longer exist.")]
    UserGone,

    #[error("User recently changed password! Please log in again.")]
    PasswordChanged,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::ExpiredToken,
            _ => AuthError::InvalidToken,
        }
    }
}

/// Validates `token` and loads the user it was issued to
pub async fn resolve_identity(
    users: &dyn UserRepository,
    token: &str,
    secret: &str,
) -> Result<User, AuthError> {
    let claims = validate_token(token, secret)?;

    let user = users
        .get(claims.sub)
        .await?
        .ok_or(AuthError::UserGone)?;

    if user.changed_password_after(claims.iat) {
        tracing::debug!(user_id = %user.id, "Rejecting token issued before password change");
        return Err(AuthError::PasswordChanged);
    }

    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{create_token, Claims};
    use crate::auth::password::hash_password;
    use crate::models::user::CreateUser;
    use crate::store::memory::MemoryStore;
    use chrono::Duration;
    use uuid::Uuid;

    const SECRET: &str = "identity-test-secret-at-least-32-bytes";

    async fn seeded() -> (MemoryStore, User) {
        let store = MemoryStore::new();
        let user = Repository::<User>::create(
            &store,
            CreateUser {
                name: "Identity Tester".to_string(),
                email: "identity@example.com".to_string(),
                password_hash: hash_password("pass1234").unwrap(),
                role: Default::default(),
                photo: None,
            },
        )
        .await
        .unwrap();
        (store, user)
    }

    #[tokio::test]
    async fn test_valid_token_resolves_user() {
        let (store, user) = seeded().await;
        let token = create_token(&Claims::new(user.id, Duration::days(1)), SECRET).unwrap();

        let resolved = resolve_identity(&store, &token, SECRET).await.unwrap();
        assert_eq!(resolved.id, user.id);
    }

    #[tokio::test]
    async fn test_unknown_user_is_rejected() {
        let (store, _) = seeded().await;
        let token = create_token(&Claims::new(Uuid::new_v4(), Duration::days(1)), SECRET).unwrap();

        assert!(matches!(
            resolve_identity(&store, &token, SECRET).await,
            Err(AuthError::UserGone)
        ));
    }

    #[tokio::test]
    async fn test_deactivated_user_is_rejected() {
        let (store, user) = seeded().await;
        let token = create_token(&Claims::new(user.id, Duration::days(1)), SECRET).unwrap();
        store.deactivate(user.id).await.unwrap();

        assert!(matches!(
            resolve_identity(&store, &token, SECRET).await,
            Err(AuthError::UserGone)
        ));
    }

    #[tokio::test]
    async fn test_token_older_than_password_change_is_rejected() {
        let (store, user) = seeded().await;
        let mut claims = Claims::new(user.id, Duration::days(1));
        claims.iat -= 3600;
        claims.nbf -= 3600;
        let token = create_token(&claims, SECRET).unwrap();

        store
            .set_password(user.id, &hash_password("newpass123").unwrap())
            .await
            .unwrap();

        assert!(matches!(
            resolve_identity(&store, &token, SECRET).await,
            Err(AuthError::PasswordChanged)
        ));
    }

    #[tokio::test]
    async fn test_expired_and_garbage_tokens() {
        let (store, user) = seeded().await;
        let expired = create_token(&Claims::new(user.id, Duration::seconds(-60)), SECRET).unwrap();

        assert!(matches!(
            resolve_identity(&store, &expired, SECRET).await,
            Err(AuthError::ExpiredToken)
        ));
        assert!(matches!(
            resolve_identity(&store, "garbage", SECRET).await,
            Err(AuthError::InvalidToken)
        ));
    }
}
