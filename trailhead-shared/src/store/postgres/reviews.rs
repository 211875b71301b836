use async_trait::async_trait;
use sqlx::{PgConnection, QueryBuilder};
use uuid::Uuid;

use super::rows::REVIEW_SELECT;
use super::{map_db_error, push_list_query, PgStore};
use crate::models::review::{CreateReview, PatchReview, Review};
use crate::models::Entity;
use crate::query::ListQuery;
use crate::store::{RatingSummary, Repository, ReviewRepository, StoreError};

impl PgStore {
    async fn review_by_id(&self, id: Uuid) -> Result<Option<Review>, StoreError> {
        let sql = format!("{REVIEW_SELECT} WHERE r.id = $1");

        let review = sqlx::query_as::<_, Review>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(review)
    }
}

#[async_trait]
impl Repository<Review> for PgStore {
    async fn create(&self, input: CreateReview) -> Result<Review, StoreError> {
        let tour_id = input.tour.ok_or(StoreError::MissingReference("tour"))?;
        let user_id = input.user.ok_or(StoreError::MissingReference("user"))?;

        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO reviews (review, rating, tour_id, user_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&input.review)
        .bind(input.rating)
        .bind(tour_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        self.review_by_id(id)
            .await?
            .ok_or(StoreError::MissingReference("user"))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Review>, StoreError> {
        self.review_by_id(id).await
    }

    async fn list(&self, query: &ListQuery) -> Result<Vec<Review>, StoreError> {
        let mut builder = QueryBuilder::new(format!("{REVIEW_SELECT} WHERE TRUE"));
        push_list_query(&mut builder, Review::COLUMNS, query, "r.id")?;

        let reviews = builder
            .build_query_as::<Review>()
            .fetch_all(&self.pool)
            .await?;

        Ok(reviews)
    }

    async fn update(&self, id: Uuid, patch: PatchReview) -> Result<Option<Review>, StoreError> {
        let updated = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE reviews
            SET review = COALESCE($2, review),
                rating = COALESCE($3, rating),
                version = version + 1
            WHERE id = $1
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(&patch.review)
        .bind(patch.rating)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        match updated {
            Some(id) => self.review_by_id(id).await,
            None => Ok(None),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Review>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("{REVIEW_SELECT} WHERE r.id = $1 FOR UPDATE OF r");
        let Some(review) = sqlx::query_as::<_, Review>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Some(review))
    }
}

#[async_trait]
impl ReviewRepository for PgStore {
    fn as_repository(&self) -> &dyn Repository<Review> {
        self
    }

    async fn list_for_tour(&self, tour_id: Uuid) -> Result<Vec<Review>, StoreError> {
        let sql = format!("{REVIEW_SELECT} WHERE r.tour_id = $1 ORDER BY r.created_at DESC");

        let reviews = sqlx::query_as::<_, Review>(&sql)
            .bind(tour_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(reviews)
    }

    async fn recalculate_ratings(&self, tour_id: Uuid) -> Result<RatingSummary, StoreError> {
        let mut tx = self.pool.begin().await?;
        let summary = recalculate_in(&mut tx, tour_id).await?;
        tx.commit().await?;

        Ok(summary)
    }
}

/// Recomputes one tour's aggregate inside the caller's transaction
pub(super) async fn recalculate_in(
    conn: &mut PgConnection,
    tour_id: Uuid,
) -> Result<RatingSummary, StoreError> {
    // The tour row lock serializes concurrent recomputations for one tour.
    let locked = sqlx::query_scalar::<_, Uuid>("SELECT id FROM tours WHERE id = $1 FOR UPDATE")
        .bind(tour_id)
        .fetch_optional(&mut *conn)
        .await?;
    if locked.is_none() {
        return Ok(RatingSummary::from_aggregate(0, None));
    }

    let (count, mean): (i64, Option<f64>) =
        sqlx::query_as("SELECT COUNT(*), AVG(rating)::float8 FROM reviews WHERE tour_id = $1")
            .bind(tour_id)
            .fetch_one(&mut *conn)
            .await?;

    let summary = RatingSummary::from_aggregate(count, mean);

    sqlx::query("UPDATE tours SET ratings_average = $2, ratings_quantity = $3 WHERE id = $1")
        .bind(tour_id)
        .bind(summary.average)
        .bind(summary.quantity)
        .execute(&mut *conn)
        .await?;

    tracing::debug!(
        tour_id = %tour_id,
        average = summary.average,
        quantity = summary.quantity,
        "Recalculated tour ratings"
    );

    Ok(summary)
}
