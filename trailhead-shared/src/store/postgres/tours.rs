use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::QueryBuilder;
use uuid::Uuid;

use super::rows::TOUR_COLUMNS;
use super::{map_db_error, push_list_query, PgStore};
use crate::models::tour::{
    CreateTour, DifficultyStats, GeoPoint, MonthlyPlan, PatchTour, Tour, TourDistance,
    EARTH_RADIUS_M,
};
use crate::models::Entity;
use crate::query::ListQuery;
use crate::store::{Repository, StoreError, TourRepository};

/// Central angle between `($1, $2)` as `(lng, lat)` and a tour's start location
const ANGLE_SQL: &str = "2 * ASIN(LEAST(1, SQRT( \
     POWER(SIN(RADIANS((start_location->'coordinates'->>1)::float8 - $2) / 2), 2) \
     + COS(RADIANS($2)) * COS(RADIANS((start_location->'coordinates'->>1)::float8)) \
     * POWER(SIN(RADIANS((start_location->'coordinates'->>0)::float8 - $1) / 2), 2))))";

#[async_trait]
impl Repository<Tour> for PgStore {
    async fn create(&self, input: CreateTour) -> Result<Tour, StoreError> {
        let tour = Tour::from_input(input);

        let sql = format!(
            r#"
            INSERT INTO tours (id, name, slug, duration, max_group_size, difficulty,
                               price, price_discount, summary, description, image_cover,
                               images, start_dates, secret_tour, start_location, locations, guides)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING {TOUR_COLUMNS}
            "#
        );

        let created = sqlx::query_as::<_, Tour>(&sql)
            .bind(tour.id)
            .bind(&tour.name)
            .bind(&tour.slug)
            .bind(tour.duration)
            .bind(tour.max_group_size)
            .bind(tour.difficulty)
            .bind(tour.price)
            .bind(tour.price_discount)
            .bind(&tour.summary)
            .bind(&tour.description)
            .bind(&tour.image_cover)
            .bind(&tour.images)
            .bind(&tour.start_dates)
            .bind(tour.secret_tour)
            .bind(Json(&tour.start_location))
            .bind(Json(&tour.locations))
            .bind(&tour.guides)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(created)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Tour>, StoreError> {
        let sql = format!("SELECT {TOUR_COLUMNS} FROM tours WHERE id = $1 AND secret_tour = FALSE");

        let tour = sqlx::query_as::<_, Tour>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(tour)
    }

    async fn list(&self, query: &ListQuery) -> Result<Vec<Tour>, StoreError> {
        let mut builder =
            QueryBuilder::new(format!("SELECT {TOUR_COLUMNS} FROM tours WHERE secret_tour = FALSE"));
        push_list_query(&mut builder, Tour::COLUMNS, query, "id")?;

        let tours = builder
            .build_query_as::<Tour>()
            .fetch_all(&self.pool)
            .await?;

        Ok(tours)
    }

    async fn update(&self, id: Uuid, patch: PatchTour) -> Result<Option<Tour>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let select = format!(
            "SELECT {TOUR_COLUMNS} FROM tours WHERE id = $1 AND secret_tour = FALSE FOR UPDATE"
        );
        let Some(mut tour) = sqlx::query_as::<_, Tour>(&select)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        patch.apply_to(&mut tour)?;

        let update = format!(
            r#"
            UPDATE tours
            SET name = $2, slug = $3, duration = $4, max_group_size = $5, difficulty = $6,
                price = $7, price_discount = $8, summary = $9, description = $10,
                image_cover = $11, images = $12, start_dates = $13, secret_tour = $14,
                start_location = $15, locations = $16, guides = $17,
                version = version + 1
            WHERE id = $1
            RETURNING {TOUR_COLUMNS}
            "#
        );

        let updated = sqlx::query_as::<_, Tour>(&update)
            .bind(tour.id)
            .bind(&tour.name)
            .bind(&tour.slug)
            .bind(tour.duration)
            .bind(tour.max_group_size)
            .bind(tour.difficulty)
            .bind(tour.price)
            .bind(tour.price_discount)
            .bind(&tour.summary)
            .bind(&tour.description)
            .bind(&tour.image_cover)
            .bind(&tour.images)
            .bind(&tour.start_dates)
            .bind(tour.secret_tour)
            .bind(Json(&tour.start_location))
            .bind(Json(&tour.locations))
            .bind(&tour.guides)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_db_error)?;

        tx.commit().await?;

        Ok(Some(updated))
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Tour>, StoreError> {
        let sql = format!(
            "DELETE FROM tours WHERE id = $1 AND secret_tour = FALSE RETURNING {TOUR_COLUMNS}"
        );

        let tour = sqlx::query_as::<_, Tour>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(tour)
    }
}

#[async_trait]
impl TourRepository for PgStore {
    fn as_repository(&self) -> &dyn Repository<Tour> {
        self
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tour>, StoreError> {
        let sql = format!(
            "SELECT {TOUR_COLUMNS} FROM tours WHERE slug = $1 AND secret_tour = FALSE LIMIT 1"
        );

        let tour = sqlx::query_as::<_, Tour>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        Ok(tour)
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<Tour>, StoreError> {
        let sql = format!(
            "SELECT {TOUR_COLUMNS} FROM tours WHERE id = ANY($1) AND secret_tour = FALSE \
             ORDER BY created_at DESC"
        );

        let tours = sqlx::query_as::<_, Tour>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(tours)
    }

    async fn stats(&self, min_rating: f64) -> Result<Vec<DifficultyStats>, StoreError> {
        let stats = sqlx::query_as::<_, DifficultyStats>(
            r#"
            SELECT UPPER(difficulty::text) AS difficulty,
                   COUNT(*) AS num_tours,
                   COALESCE(SUM(ratings_quantity), 0)::bigint AS num_ratings,
                   AVG(ratings_average) AS avg_rating,
                   AVG(price) AS avg_price,
                   MIN(price) AS min_price,
                   MAX(price) AS max_price
            FROM tours
            WHERE secret_tour = FALSE AND ratings_average >= $1
            GROUP BY difficulty
            ORDER BY avg_price ASC
            "#,
        )
        .bind(min_rating)
        .fetch_all(&self.pool)
        .await?;

        Ok(stats)
    }

    async fn monthly_plan(&self, year: i32) -> Result<Vec<MonthlyPlan>, StoreError> {
        let plan = sqlx::query_as::<_, MonthlyPlan>(
            r#"
            SELECT EXTRACT(MONTH FROM start_date AT TIME ZONE 'UTC')::int AS month,
                   COUNT(*) AS num_tour_starts,
                   ARRAY_AGG(name ORDER BY created_at) AS tours
            FROM tours, UNNEST(start_dates) AS start_date
            WHERE secret_tour = FALSE
              AND EXTRACT(YEAR FROM start_date AT TIME ZONE 'UTC')::int = $1
            GROUP BY month
            ORDER BY num_tour_starts DESC, month ASC
            LIMIT 12
            "#,
        )
        .bind(year)
        .fetch_all(&self.pool)
        .await?;

        Ok(plan)
    }

    async fn within(&self, center: &GeoPoint, radius: f64) -> Result<Vec<Tour>, StoreError> {
        let sql = format!(
            "SELECT {TOUR_COLUMNS} FROM tours WHERE secret_tour = FALSE AND {ANGLE_SQL} <= $3"
        );

        let tours = sqlx::query_as::<_, Tour>(&sql)
            .bind(center.lng())
            .bind(center.lat())
            .bind(radius)
            .fetch_all(&self.pool)
            .await?;

        Ok(tours)
    }

    async fn distances(
        &self,
        origin: &GeoPoint,
        multiplier: f64,
    ) -> Result<Vec<TourDistance>, StoreError> {
        let sql = format!(
            "SELECT id, name, {ANGLE_SQL} * $3 AS distance FROM tours \
             WHERE secret_tour = FALSE ORDER BY distance ASC"
        );

        let distances = sqlx::query_as::<_, TourDistance>(&sql)
            .bind(origin.lng())
            .bind(origin.lat())
            .bind(EARTH_RADIUS_M * multiplier)
            .fetch_all(&self.pool)
            .await?;

        Ok(distances)
    }
}
