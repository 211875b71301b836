use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::QueryBuilder;
use uuid::Uuid;

use super::reviews::recalculate_in;
use super::{map_db_error, push_list_query, PgStore};
use crate::models::user::{normalize_email, CreateUser, UpdateUser, User, DEFAULT_PHOTO};
use crate::models::Entity;
use crate::query::ListQuery;
use crate::store::{Repository, StoreError, UserRepository};

const USER_COLUMNS: &str = "id, name, email, photo, role, password_hash, password_changed_at, \
     password_reset_token, password_reset_expires, active, created_at, version";

#[async_trait]
impl Repository<User> for PgStore {
    async fn create(&self, input: CreateUser) -> Result<User, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO users (name, email, photo, role, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        );

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(&input.name)
            .bind(normalize_email(&input.email))
            .bind(input.photo.as_deref().unwrap_or(DEFAULT_PHOTO))
            .bind(input.role)
            .bind(&input.password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(user)
    }

    async fn get(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND active = TRUE");

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn list(&self, query: &ListQuery) -> Result<Vec<User>, StoreError> {
        let mut builder =
            QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users WHERE active = TRUE"));
        push_list_query(&mut builder, User::COLUMNS, query, "id")?;

        let users = builder
            .build_query_as::<User>()
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }

    async fn update(&self, id: Uuid, patch: UpdateUser) -> Result<Option<User>, StoreError> {
        let sql = format!(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                email = COALESCE($3, email),
                role = COALESCE($4, role),
                photo = COALESCE($5, photo),
                version = version + 1
            WHERE id = $1 AND active = TRUE
            RETURNING {USER_COLUMNS}
            "#
        );

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(&patch.name)
            .bind(patch.email.as_deref().map(normalize_email))
            .bind(patch.role)
            .bind(&patch.photo)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(user)
    }

    /// Deletes the user and their reviews, then recomputes the ratings of
    /// every tour that lost a review, all in one transaction
    async fn delete(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM users WHERE id = $1 AND active = TRUE FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        if locked.is_none() {
            return Ok(None);
        }

        let mut tour_ids = sqlx::query_scalar::<_, Uuid>(
            "DELETE FROM reviews WHERE user_id = $1 RETURNING tour_id",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;
        tour_ids.sort_unstable();
        tour_ids.dedup();

        let sql = format!("DELETE FROM users WHERE id = $1 RETURNING {USER_COLUMNS}");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        for tour_id in tour_ids {
            recalculate_in(&mut *tx, tour_id).await?;
        }

        tx.commit().await?;

        Ok(Some(user))
    }
}

#[async_trait]
impl UserRepository for PgStore {
    fn as_repository(&self) -> &dyn Repository<User> {
        self
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND active = TRUE");

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<User>, StoreError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1) AND active = TRUE ORDER BY name"
        );

        let users = sqlx::query_as::<_, User>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_reset_token = $2, password_reset_expires = $3
            WHERE id = $1 AND active = TRUE
            "#,
        )
        .bind(id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn clear_reset_token(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_reset_token = NULL, password_reset_expires = NULL
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn redeem_reset_token(
        &self,
        token_hash: &str,
        password_hash: &str,
    ) -> Result<Option<User>, StoreError> {
        let sql = format!(
            r#"
            UPDATE users
            SET password_hash = $2,
                password_changed_at = NOW() - INTERVAL '1 second',
                password_reset_token = NULL,
                password_reset_expires = NULL,
                version = version + 1
            WHERE password_reset_token = $1
              AND password_reset_expires > NOW()
              AND active = TRUE
            RETURNING {USER_COLUMNS}
            "#
        );

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(token_hash)
            .bind(password_hash)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn set_password(&self, id: Uuid, password_hash: &str) -> Result<Option<User>, StoreError> {
        let sql = format!(
            r#"
            UPDATE users
            SET password_hash = $2,
                password_changed_at = NOW() - INTERVAL '1 second',
                version = version + 1
            WHERE id = $1 AND active = TRUE
            RETURNING {USER_COLUMNS}
            "#
        );

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(password_hash)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn deactivate(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE users SET active = FALSE WHERE id = $1 AND active = TRUE")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
