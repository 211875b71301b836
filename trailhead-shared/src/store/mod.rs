/// Persistence behind narrow per-entity repositories
///
/// Handlers only ever see the traits in this module. Two independent
/// backends implement all of them:
///
/// - [`postgres::PgStore`]: sqlx against the schema in `migrations/`
/// - [`memory::MemoryStore`]: in-process tables behind one lock, used by the
///   test suite and by `STORAGE_BACKEND=memory`
///
/// Both backends hide secret tours and deactivated users from every read,
/// enforce unique names/emails/(tour, user) reviews, check references, and
/// serialize rating recomputation per tour.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::booking::Booking;
use crate::models::review::Review;
use crate::models::tour::{DifficultyStats, GeoPoint, MonthlyPlan, Tour, TourDistance, DEFAULT_RATING};
use crate::models::user::User;
use crate::models::Entity;
use crate::query::{ListQuery, QueryError};

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint was violated; carries the offending field(s)
    #[error("Duplicate field value: {0}")]
    Duplicate(String),

    /// A referenced record does not exist
    #[error("Referenced {0} does not exist")]
    MissingReference(&'static str),

    /// The merged record breaks a rule the input alone could not check
    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("Record encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<validator::ValidationError> for StoreError {
    fn from(err: validator::ValidationError) -> Self {
        StoreError::Invalid(
            err.message
                .map(|message| message.into_owned())
                .unwrap_or_else(|| err.code.into_owned()),
        )
    }
}

/// CRUD shared by every entity
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    async fn create(&self, input: E::Create) -> Result<E, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<E>, StoreError>;

    /// Runs a validated list query (filter, sort, skip/limit)
    ///
    /// Projection is left to the caller.
    async fn list(&self, query: &ListQuery) -> Result<Vec<E>, StoreError>;

    async fn update(&self, id: Uuid, patch: E::Patch) -> Result<Option<E>, StoreError>;

    /// Removes a record and returns it
    async fn delete(&self, id: Uuid) -> Result<Option<E>, StoreError>;
}

#[async_trait]
pub trait TourRepository: Repository<Tour> {
    fn as_repository(&self) -> &dyn Repository<Tour>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tour>, StoreError>;

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<Tour>, StoreError>;

    /// Aggregates tours rated at least `min_rating`, grouped by difficulty
    async fn stats(&self, min_rating: f64) -> Result<Vec<DifficultyStats>, StoreError>;

    /// Start dates falling in `year`, grouped by month, busiest first
    async fn monthly_plan(&self, year: i32) -> Result<Vec<MonthlyPlan>, StoreError>;

    /// Tours whose start location lies within `radius` radians of `center`
    async fn within(&self, center: &GeoPoint, radius: f64) -> Result<Vec<Tour>, StoreError>;

    /// Distance of every tour from `origin`, in metres times `multiplier`, nearest first
    async fn distances(
        &self,
        origin: &GeoPoint,
        multiplier: f64,
    ) -> Result<Vec<TourDistance>, StoreError>;
}

/// A tour's rating aggregate after recomputation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingSummary {
    pub average: f64,
    pub quantity: i32,
}

impl RatingSummary {
    /// Builds the aggregate from a review count and mean rating
    ///
    /// The mean is rounded to one decimal; no reviews means the defaults.
    pub fn from_aggregate(count: i64, mean: Option<f64>) -> Self {
        match mean {
            Some(mean) if count > 0 => Self {
                average: (mean * 10.0).round() / 10.0,
                quantity: i32::try_from(count).unwrap_or(i32::MAX),
            },
            _ => Self {
                average: DEFAULT_RATING,
                quantity: 0,
            },
        }
    }
}

#[async_trait]
pub trait ReviewRepository: Repository<Review> {
    fn as_repository(&self) -> &dyn Repository<Review>;

    /// Reviews of one tour, newest first
    async fn list_for_tour(&self, tour_id: Uuid) -> Result<Vec<Review>, StoreError>;

    /// Recomputes and stores the tour's rating aggregate
    ///
    /// Concurrent calls for the same tour are serialized.
    async fn recalculate_ratings(&self, tour_id: Uuid) -> Result<RatingSummary, StoreError>;
}

#[async_trait]
pub trait UserRepository: Repository<User> {
    fn as_repository(&self) -> &dyn Repository<User>;

    /// Active user by (case-insensitive) email
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Active users among `ids`
    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<User>, StoreError>;

    async fn set_reset_token(
        &self,
        id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn clear_reset_token(&self, id: Uuid) -> Result<(), StoreError>;

    /// Sets a new password for the holder of an unexpired reset token
    ///
    /// Lookup, password change and token removal happen in one atomic
    /// write, so a token can be redeemed at most once.
    async fn redeem_reset_token(
        &self,
        token_hash: &str,
        password_hash: &str,
    ) -> Result<Option<User>, StoreError>;

    /// Replaces the password and stamps `password_changed_at`
    async fn set_password(&self, id: Uuid, password_hash: &str) -> Result<Option<User>, StoreError>;

    /// Soft delete; false when no active user matched
    async fn deactivate(&self, id: Uuid) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait BookingRepository: Repository<Booking> {
    fn as_repository(&self) -> &dyn Repository<Booking>;

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Booking>, StoreError>;
}

/// Connectivity probe used by `/health`
#[async_trait]
pub trait StoreHealth: Send + Sync {
    fn backend(&self) -> &'static str;

    async fn ping(&self) -> Result<(), StoreError>;
}

/// The repositories of one backend
#[derive(Clone)]
pub struct Stores {
    pub tours: Arc<dyn TourRepository>,
    pub reviews: Arc<dyn ReviewRepository>,
    pub users: Arc<dyn UserRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub health: Arc<dyn StoreHealth>,
}

impl Stores {
    pub fn postgres(pool: PgPool) -> Self {
        let store = Arc::new(postgres::PgStore::new(pool));
        Self {
            tours: store.clone(),
            reviews: store.clone(),
            users: store.clone(),
            bookings: store.clone(),
            health: store,
        }
    }

    pub fn memory() -> Self {
        let store = Arc::new(memory::MemoryStore::new());
        Self {
            tours: store.clone(),
            reviews: store.clone(),
            users: store.clone(),
            bookings: store.clone(),
            health: store,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_summary_rounds_to_one_decimal() {
        let summary = RatingSummary::from_aggregate(3, Some(4.666_666));
        assert_eq!(summary.average, 4.7);
        assert_eq!(summary.quantity, 3);
    }

    #[test]
    fn test_rating_summary_defaults_without_reviews() {
        assert_eq!(
            RatingSummary::from_aggregate(0, None),
            RatingSummary {
                average: 4.5,
                quantity: 0
            }
        );
    }
}
