/// In-process store backend
///
/// All tables live behind a single `tokio::sync::RwLock`, so every write
/// (including rating recomputation) is serialized. List queries are
/// evaluated against each record's serialized form, which keeps filtering
/// and sorting consistent with what clients see.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, Utc};
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    BookingRepository, RatingSummary, Repository, ReviewRepository, StoreError, StoreHealth,
    TourRepository, UserRepository,
};
use crate::models::booking::{Booking, CreateBooking, PatchBooking};
use crate::models::review::{CreateReview, PatchReview, Review, ReviewAuthor};
use crate::models::tour::{
    angular_distance, haversine_meters, CreateTour, DifficultyStats, GeoPoint, MonthlyPlan,
    PatchTour, Tour, TourDistance,
};
use crate::models::user::{normalize_email, CreateUser, UpdateUser, User, DEFAULT_PHOTO};
use crate::models::Entity;
use crate::query::{lookup, Column, ColumnKind, Condition, ListQuery, SortKey};

/// Review row as stored; the author is joined in on read
#[derive(Debug, Clone)]
struct StoredReview {
    id: Uuid,
    review: String,
    rating: i32,
    created_at: DateTime<Utc>,
    tour_id: Uuid,
    user_id: Uuid,
    version: i32,
}

#[derive(Debug, Default)]
struct Tables {
    tours: Vec<Tour>,
    reviews: Vec<StoredReview>,
    users: Vec<User>,
    bookings: Vec<Booking>,
}

impl Tables {
    fn visible_tour(&self, id: Uuid) -> Option<usize> {
        self.tours
            .iter()
            .position(|tour| tour.id == id && !tour.secret_tour)
    }

    fn active_user(&self, id: Uuid) -> Option<usize> {
        self.users.iter().position(|user| user.id == id && user.active)
    }

    /// Deactivated authors are left out, like every other user read
    fn review_view(&self, stored: &StoredReview) -> Review {
        let author = self
            .active_user(stored.user_id)
            .map(|idx| &self.users[idx])
            .map(|author| ReviewAuthor {
                id: author.id,
                name: author.name.clone(),
                photo: author.photo.clone(),
            });

        Review {
            id: stored.id,
            review: stored.review.clone(),
            rating: stored.rating,
            created_at: stored.created_at,
            tour: stored.tour_id,
            user: author,
            version: stored.version,
        }
    }

    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .iter()
            .any(|user| user.email == email && Some(user.id) != except)
    }

    fn name_taken(&self, name: &str, except: Option<Uuid>) -> bool {
        self.tours
            .iter()
            .any(|tour| tour.name == name && Some(tour.id) != except)
    }

    /// Removes what Postgres would cascade
    fn cascade_tour(&mut self, tour_id: Uuid) {
        self.reviews.retain(|review| review.tour_id != tour_id);
        self.bookings.retain(|booking| booking.tour != tour_id);
    }

    /// Removes the user's reviews and bookings, then recomputes every tour
    /// that lost a review
    fn cascade_user(&mut self, user_id: Uuid) {
        let mut touched: Vec<Uuid> = self
            .reviews
            .iter()
            .filter(|review| review.user_id == user_id)
            .map(|review| review.tour_id)
            .collect();
        touched.sort_unstable();
        touched.dedup();

        self.reviews.retain(|review| review.user_id != user_id);
        self.bookings.retain(|booking| booking.user != user_id);

        for tour_id in touched {
            self.recalculate(tour_id);
        }
    }

    fn recalculate(&mut self, tour_id: Uuid) -> RatingSummary {
        let ratings: Vec<i32> = self
            .reviews
            .iter()
            .filter(|review| review.tour_id == tour_id)
            .map(|review| review.rating)
            .collect();

        let count = ratings.len() as i64;
        let mean = (count > 0).then(|| ratings.iter().map(|r| f64::from(*r)).sum::<f64>() / count as f64);
        let summary = RatingSummary::from_aggregate(count, mean);

        if let Some(tour) = self.tours.iter_mut().find(|tour| tour.id == tour_id) {
            tour.ratings_average = summary.average;
            tour.ratings_quantity = summary.quantity;
        }

        summary
    }
}

/// Store backend holding everything in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Filters, sorts and pages records of `E`
fn run_query<E: Entity>(records: Vec<E>, query: &ListQuery) -> Result<Vec<E>, StoreError> {
    query.validate(E::COLUMNS)?;

    let mut rows = Vec::with_capacity(records.len());
    for record in records {
        let value = serde_json::to_value(&record)?;
        if matches_all(&value, E::COLUMNS, &query.conditions)? {
            rows.push((value, record));
        }
    }

    rows.sort_by(|(a, _), (b, _)| compare_rows(a, b, E::COLUMNS, &query.sort));

    let skip = usize::try_from(query.skip).unwrap_or(usize::MAX);
    let limit = usize::try_from(query.limit).unwrap_or(usize::MAX);

    Ok(rows
        .into_iter()
        .skip(skip)
        .take(limit)
        .map(|(_, record)| record)
        .collect())
}

// References serialize either as a bare id or as an object carrying one.
fn field_value<'a>(record: &'a Value, field: &str) -> &'a Value {
    let value = record.get(field).unwrap_or(&Value::Null);
    value.get("id").unwrap_or(value)
}

fn matches_all(record: &Value, columns: &[Column], conditions: &[Condition]) -> Result<bool, StoreError> {
    for condition in conditions {
        let operand = lookup(columns, &condition.field)?.parse(&condition.value)?;
        let satisfied = operand
            .compare_json(field_value(record, &condition.field))
            .map_or(false, |ordering| condition.op.accepts(ordering));

        if !satisfied {
            return Ok(false);
        }
    }
    Ok(true)
}

fn compare_rows(a: &Value, b: &Value, columns: &[Column], keys: &[SortKey]) -> Ordering {
    for key in keys {
        let Ok(column) = lookup(columns, &key.field) else {
            continue;
        };

        let ordering = compare_values(
            column.kind,
            field_value(a, &key.field),
            field_value(b, &key.field),
        );
        let ordering = if key.descending { ordering.reverse() } else { ordering };

        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn compare_values(kind: ColumnKind, a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        _ => match kind {
            ColumnKind::Integer | ColumnKind::Float => a
                .as_f64()
                .partial_cmp(&b.as_f64())
                .unwrap_or(Ordering::Equal),
            ColumnKind::Boolean => a.as_bool().cmp(&b.as_bool()),
            ColumnKind::Timestamp => parse_time(a).cmp(&parse_time(b)),
            ColumnKind::Text | ColumnKind::Enum | ColumnKind::Uuid => a.as_str().cmp(&b.as_str()),
        },
    }
}

fn parse_time(value: &Value) -> Option<DateTime<Utc>> {
    value
        .as_str()
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|ts| ts.with_timezone(&Utc))
}

fn newest_first<T>(records: &mut [T], created_at: impl Fn(&T) -> DateTime<Utc>) {
    records.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
}

#[async_trait]
impl Repository<Tour> for MemoryStore {
    async fn create(&self, input: CreateTour) -> Result<Tour, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.name_taken(&input.name, None) {
            return Err(StoreError::Duplicate("name".to_string()));
        }

        let tour = Tour::from_input(input);
        tables.tours.push(tour.clone());
        Ok(tour)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Tour>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.visible_tour(id).map(|idx| tables.tours[idx].clone()))
    }

    async fn list(&self, query: &ListQuery) -> Result<Vec<Tour>, StoreError> {
        let tours = {
            let tables = self.tables.read().await;
            tables
                .tours
                .iter()
                .filter(|tour| !tour.secret_tour)
                .cloned()
                .collect()
        };
        run_query(tours, query)
    }

    async fn update(&self, id: Uuid, patch: PatchTour) -> Result<Option<Tour>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(idx) = tables.visible_tour(id) else {
            return Ok(None);
        };

        if let Some(name) = &patch.name {
            if tables.name_taken(name, Some(id)) {
                return Err(StoreError::Duplicate("name".to_string()));
            }
        }

        let mut updated = tables.tours[idx].clone();
        patch.apply_to(&mut updated)?;
        updated.version += 1;

        tables.tours[idx] = updated.clone();
        Ok(Some(updated))
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Tour>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(idx) = tables.visible_tour(id) else {
            return Ok(None);
        };

        let removed = tables.tours.remove(idx);
        tables.cascade_tour(id);
        Ok(Some(removed))
    }
}

#[derive(Default)]
struct DifficultyBucket {
    tours: i64,
    ratings: i64,
    rating_sum: f64,
    price_sum: f64,
    min_price: f64,
    max_price: f64,
}

#[async_trait]
impl TourRepository for MemoryStore {
    fn as_repository(&self) -> &dyn Repository<Tour> {
        self
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tour>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .tours
            .iter()
            .find(|tour| tour.slug == slug && !tour.secret_tour)
            .cloned())
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<Tour>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .tours
            .iter()
            .filter(|tour| !tour.secret_tour && ids.contains(&tour.id))
            .cloned()
            .collect())
    }

    async fn stats(&self, min_rating: f64) -> Result<Vec<DifficultyStats>, StoreError> {
        let tables = self.tables.read().await;
        let mut buckets: BTreeMap<&'static str, DifficultyBucket> = BTreeMap::new();

        for tour in tables
            .tours
            .iter()
            .filter(|tour| !tour.secret_tour && tour.ratings_average >= min_rating)
        {
            let bucket = buckets.entry(tour.difficulty.as_str()).or_insert_with(|| DifficultyBucket {
                min_price: f64::MAX,
                max_price: f64::MIN,
                ..Default::default()
            });
            bucket.tours += 1;
            bucket.ratings += i64::from(tour.ratings_quantity);
            bucket.rating_sum += tour.ratings_average;
            bucket.price_sum += tour.price;
            bucket.min_price = bucket.min_price.min(tour.price);
            bucket.max_price = bucket.max_price.max(tour.price);
        }

        let mut stats: Vec<DifficultyStats> = buckets
            .into_iter()
            .map(|(difficulty, bucket)| DifficultyStats {
                difficulty: difficulty.to_uppercase(),
                num_tours: bucket.tours,
                num_ratings: bucket.ratings,
                avg_rating: bucket.rating_sum / bucket.tours as f64,
                avg_price: bucket.price_sum / bucket.tours as f64,
                min_price: bucket.min_price,
                max_price: bucket.max_price,
            })
            .collect();

        stats.sort_by(|a, b| a.avg_price.partial_cmp(&b.avg_price).unwrap_or(Ordering::Equal));
        Ok(stats)
    }

    async fn monthly_plan(&self, year: i32) -> Result<Vec<MonthlyPlan>, StoreError> {
        let tables = self.tables.read().await;
        let mut months: BTreeMap<u32, Vec<String>> = BTreeMap::new();

        for tour in tables.tours.iter().filter(|tour| !tour.secret_tour) {
            for start in tour.start_dates.iter().filter(|start| start.year() == year) {
                months.entry(start.month()).or_default().push(tour.name.clone());
            }
        }

        let mut plan: Vec<MonthlyPlan> = months
            .into_iter()
            .map(|(month, tours)| MonthlyPlan {
                month: month as i32,
                num_tour_starts: tours.len() as i64,
                tours,
            })
            .collect();

        plan.sort_by(|a, b| {
            b.num_tour_starts
                .cmp(&a.num_tour_starts)
                .then(a.month.cmp(&b.month))
        });
        plan.truncate(12);
        Ok(plan)
    }

    async fn within(&self, center: &GeoPoint, radius: f64) -> Result<Vec<Tour>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .tours
            .iter()
            .filter(|tour| !tour.secret_tour)
            .filter(|tour| angular_distance(center, &tour.start_location) <= radius)
            .cloned()
            .collect())
    }

    async fn distances(
        &self,
        origin: &GeoPoint,
        multiplier: f64,
    ) -> Result<Vec<TourDistance>, StoreError> {
        let tables = self.tables.read().await;
        let mut distances: Vec<TourDistance> = tables
            .tours
            .iter()
            .filter(|tour| !tour.secret_tour)
            .map(|tour| TourDistance {
                id: tour.id,
                name: tour.name.clone(),
                distance: haversine_meters(origin, &tour.start_location) * multiplier,
            })
            .collect();

        distances.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal));
        Ok(distances)
    }
}

#[async_trait]
impl Repository<Review> for MemoryStore {
    async fn create(&self, input: CreateReview) -> Result<Review, StoreError> {
        let tour_id = input.tour.ok_or(StoreError::MissingReference("tour"))?;
        let user_id = input.user.ok_or(StoreError::MissingReference("user"))?;

        let mut tables = self.tables.write().await;
        if !tables.tours.iter().any(|tour| tour.id == tour_id) {
            return Err(StoreError::MissingReference("tour"));
        }
        if !tables.users.iter().any(|user| user.id == user_id) {
            return Err(StoreError::MissingReference("user"));
        }
        if tables
            .reviews
            .iter()
            .any(|review| review.tour_id == tour_id && review.user_id == user_id)
        {
            return Err(StoreError::Duplicate("tour, user".to_string()));
        }

        let stored = StoredReview {
            id: Uuid::new_v4(),
            review: input.review,
            rating: input.rating,
            created_at: Utc::now(),
            tour_id,
            user_id,
            version: 0,
        };
        tables.reviews.push(stored.clone());

        Ok(tables.review_view(&stored))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Review>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .reviews
            .iter()
            .find(|review| review.id == id)
            .map(|review| tables.review_view(review)))
    }

    async fn list(&self, query: &ListQuery) -> Result<Vec<Review>, StoreError> {
        let reviews = {
            let tables = self.tables.read().await;
            tables
                .reviews
                .iter()
                .map(|review| tables.review_view(review))
                .collect()
        };
        run_query(reviews, query)
    }

    async fn update(&self, id: Uuid, patch: PatchReview) -> Result<Option<Review>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(stored) = tables.reviews.iter_mut().find(|review| review.id == id) else {
            return Ok(None);
        };

        if let Some(text) = patch.review {
            stored.review = text;
        }
        if let Some(rating) = patch.rating {
            stored.rating = rating;
        }
        stored.version += 1;

        let stored = stored.clone();
        Ok(Some(tables.review_view(&stored)))
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Review>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(idx) = tables.reviews.iter().position(|review| review.id == id) else {
            return Ok(None);
        };

        let view = tables.review_view(&tables.reviews[idx]);
        tables.reviews.remove(idx);
        Ok(Some(view))
    }
}

#[async_trait]
impl ReviewRepository for MemoryStore {
    fn as_repository(&self) -> &dyn Repository<Review> {
        self
    }

    async fn list_for_tour(&self, tour_id: Uuid) -> Result<Vec<Review>, StoreError> {
        let tables = self.tables.read().await;
        let mut reviews: Vec<Review> = tables
            .reviews
            .iter()
            .filter(|review| review.tour_id == tour_id)
            .map(|review| tables.review_view(review))
            .collect();

        newest_first(&mut reviews, |review| review.created_at);
        Ok(reviews)
    }

    async fn recalculate_ratings(&self, tour_id: Uuid) -> Result<RatingSummary, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables.recalculate(tour_id))
    }
}

#[async_trait]
impl Repository<User> for MemoryStore {
    async fn create(&self, input: CreateUser) -> Result<User, StoreError> {
        let email = normalize_email(&input.email);

        let mut tables = self.tables.write().await;
        if tables.email_taken(&email, None) {
            return Err(StoreError::Duplicate("email".to_string()));
        }

        let user = User {
            id: Uuid::new_v4(),
            name: input.name,
            email,
            photo: input.photo.unwrap_or_else(|| DEFAULT_PHOTO.to_string()),
            role: input.role,
            password_hash: input.password_hash,
            password_changed_at: None,
            password_reset_token: None,
            password_reset_expires: None,
            active: true,
            created_at: Utc::now(),
            version: 0,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn get(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.active_user(id).map(|idx| tables.users[idx].clone()))
    }

    async fn list(&self, query: &ListQuery) -> Result<Vec<User>, StoreError> {
        let users = {
            let tables = self.tables.read().await;
            tables.users.iter().filter(|user| user.active).cloned().collect()
        };
        run_query(users, query)
    }

    async fn update(&self, id: Uuid, patch: UpdateUser) -> Result<Option<User>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(idx) = tables.active_user(id) else {
            return Ok(None);
        };

        let email = patch.email.as_deref().map(normalize_email);
        if let Some(email) = &email {
            if tables.email_taken(email, Some(id)) {
                return Err(StoreError::Duplicate("email".to_string()));
            }
        }

        let user = &mut tables.users[idx];
        if let Some(name) = patch.name {
            user.name = name;
        }
        if let Some(email) = email {
            user.email = email;
        }
        if let Some(role) = patch.role {
            user.role = role;
        }
        if let Some(photo) = patch.photo {
            user.photo = photo;
        }
        user.version += 1;

        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(idx) = tables.active_user(id) else {
            return Ok(None);
        };

        let removed = tables.users.remove(idx);
        tables.cascade_user(id);
        Ok(Some(removed))
    }
}

// Stamped a second early so a token issued right after the change stays valid.
fn password_changed_now() -> DateTime<Utc> {
    Utc::now() - Duration::seconds(1)
}

#[async_trait]
impl UserRepository for MemoryStore {
    fn as_repository(&self) -> &dyn Repository<User> {
        self
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = normalize_email(email);
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|user| user.active && user.email == email)
            .cloned())
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .filter(|user| user.active && ids.contains(&user.id))
            .cloned()
            .collect())
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if let Some(idx) = tables.active_user(id) {
            let user = &mut tables.users[idx];
            user.password_reset_token = Some(token_hash.to_string());
            user.password_reset_expires = Some(expires_at);
        }
        Ok(())
    }

    async fn clear_reset_token(&self, id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if let Some(user) = tables.users.iter_mut().find(|user| user.id == id) {
            user.password_reset_token = None;
            user.password_reset_expires = None;
        }
        Ok(())
    }

    async fn redeem_reset_token(
        &self,
        token_hash: &str,
        password_hash: &str,
    ) -> Result<Option<User>, StoreError> {
        let now = Utc::now();
        let mut tables = self.tables.write().await;

        let Some(user) = tables.users.iter_mut().find(|user| {
            user.active
                && user.password_reset_token.as_deref() == Some(token_hash)
                && user.password_reset_expires.map_or(false, |expires| expires > now)
        }) else {
            return Ok(None);
        };

        user.password_hash = password_hash.to_string();
        user.password_changed_at = Some(password_changed_now());
        user.password_reset_token = None;
        user.password_reset_expires = None;
        user.version += 1;

        Ok(Some(user.clone()))
    }

    async fn set_password(&self, id: Uuid, password_hash: &str) -> Result<Option<User>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(idx) = tables.active_user(id) else {
            return Ok(None);
        };

        let user = &mut tables.users[idx];
        user.password_hash = password_hash.to_string();
        user.password_changed_at = Some(password_changed_now());
        user.version += 1;

        Ok(Some(user.clone()))
    }

    async fn deactivate(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.active_user(id) {
            Some(idx) => {
                tables.users[idx].active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl Repository<Booking> for MemoryStore {
    async fn create(&self, input: CreateBooking) -> Result<Booking, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.tours.iter().any(|tour| tour.id == input.tour) {
            return Err(StoreError::MissingReference("tour"));
        }
        if !tables.users.iter().any(|user| user.id == input.user) {
            return Err(StoreError::MissingReference("user"));
        }

        let booking = Booking {
            id: Uuid::new_v4(),
            tour: input.tour,
            user: input.user,
            price: input.price,
            paid: input.paid,
            created_at: Utc::now(),
            version: 0,
        };
        tables.bookings.push(booking.clone());
        Ok(booking)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.bookings.iter().find(|booking| booking.id == id).cloned())
    }

    async fn list(&self, query: &ListQuery) -> Result<Vec<Booking>, StoreError> {
        let bookings = self.tables.read().await.bookings.clone();
        run_query(bookings, query)
    }

    async fn update(&self, id: Uuid, patch: PatchBooking) -> Result<Option<Booking>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(booking) = tables.bookings.iter_mut().find(|booking| booking.id == id) else {
            return Ok(None);
        };

        if let Some(price) = patch.price {
            booking.price = price;
        }
        if let Some(paid) = patch.paid {
            booking.paid = paid;
        }
        booking.version += 1;

        Ok(Some(booking.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        let mut tables = self.tables.write().await;
        let idx = tables.bookings.iter().position(|booking| booking.id == id);
        Ok(idx.map(|idx| tables.bookings.remove(idx)))
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    fn as_repository(&self) -> &dyn Repository<Booking> {
        self
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Booking>, StoreError> {
        let tables = self.tables.read().await;
        let mut bookings: Vec<Booking> = tables
            .bookings
            .iter()
            .filter(|booking| booking.user == user_id)
            .cloned()
            .collect();

        newest_first(&mut bookings, |booking| booking.created_at);
        Ok(bookings)
    }
}

#[async_trait]
impl StoreHealth for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
