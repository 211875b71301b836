/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`jwt`]: Session token signing and validation
/// - [`reset_token`]: One-time password reset tokens
/// - [`roles`]: The closed set of user roles and per-route allowed-role sets
/// - [`identity`]: Resolving a verified token to a live user
///
/// # Example
///
/// ```no_run
/// use trailhead_shared::auth::password::{hash_password, verify_password};
/// use trailhead_shared::auth::jwt::{create_token, validate_token, Claims};
/// use chrono::Duration;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let claims = Claims::new(Uuid::new_v4(), Duration::days(90));
/// let token = create_token(&claims, "secret-key-at-least-32-bytes-long!!")?;
/// let validated = validate_token(&token, "secret-key-at-least-32-bytes-long!!")?;
/// assert_eq!(validated.sub, claims.sub);
/// # Ok(())
/// # }
/// ```

pub mod identity;
pub mod jwt;
pub mod password;
pub mod reset_token;
pub mod roles;
