use async_trait::async_trait;
use sqlx::QueryBuilder;
use uuid::Uuid;

use super::{map_db_error, push_list_query, PgStore};
use crate::models::booking::{Booking, CreateBooking, PatchBooking};
use crate::models::Entity;
use crate::query::ListQuery;
use crate::store::{BookingRepository, Repository, StoreError};

const BOOKING_COLUMNS: &str = "id, tour_id, user_id, price, paid, created_at, version";

#[async_trait]
impl Repository<Booking> for PgStore {
    async fn create(&self, input: CreateBooking) -> Result<Booking, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO bookings (tour_id, user_id, price, paid)
            VALUES ($1, $2, $3, $4)
            RETURNING {BOOKING_COLUMNS}
            "#
        );

        let booking = sqlx::query_as::<_, Booking>(&sql)
            .bind(input.tour)
            .bind(input.user)
            .bind(input.price)
            .bind(input.paid)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(booking)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1");

        let booking = sqlx::query_as::<_, Booking>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(booking)
    }

    async fn list(&self, query: &ListQuery) -> Result<Vec<Booking>, StoreError> {
        let mut builder = QueryBuilder::new(format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE TRUE"));
        push_list_query(&mut builder, Booking::COLUMNS, query, "id")?;

        let bookings = builder
            .build_query_as::<Booking>()
            .fetch_all(&self.pool)
            .await?;

        Ok(bookings)
    }

    async fn update(&self, id: Uuid, patch: PatchBooking) -> Result<Option<Booking>, StoreError> {
        let sql = format!(
            r#"
            UPDATE bookings
            SET price = COALESCE($2, price),
                paid = COALESCE($3, paid),
                version = version + 1
            WHERE id = $1
            RETURNING {BOOKING_COLUMNS}
            "#
        );

        let booking = sqlx::query_as::<_, Booking>(&sql)
            .bind(id)
            .bind(patch.price)
            .bind(patch.paid)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(booking)
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Booking>, StoreError> {
        let sql = format!("DELETE FROM bookings WHERE id = $1 RETURNING {BOOKING_COLUMNS}");

        let booking = sqlx::query_as::<_, Booking>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(booking)
    }
}

#[async_trait]
impl BookingRepository for PgStore {
    fn as_repository(&self) -> &dyn Repository<Booking> {
        self
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Booking>, StoreError> {
        let sql = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE user_id = $1 ORDER BY created_at DESC"
        );

        let bookings = sqlx::query_as::<_, Booking>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(bookings)
    }
}
