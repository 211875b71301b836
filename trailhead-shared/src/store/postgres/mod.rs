/// Postgres store backend
///
/// Every repository trait is implemented on [`PgStore`], one file per
/// entity. List queries are assembled with `sqlx::QueryBuilder`: column
/// names come only from the entity's declared columns and every operand is
/// bound, never interpolated.
///
/// Constraint violations are mapped onto [`StoreError`] variants by
/// [`map_db_error`] so the HTTP layer never has to look at SQLSTATE codes.

mod bookings;
mod reviews;
mod rows;
mod tours;
mod users;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::{StoreError, StoreHealth};
use crate::db::pool::health_check;
use crate::query::{lookup, Column, ColumnKind, ListQuery, TypedValue};

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const CHECK_VIOLATION: &str = "23514";

/// Store backed by a Postgres connection pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Translates constraint violations into store errors
pub fn map_db_error(err: sqlx::Error) -> StoreError {
    let sqlx::Error::Database(db_err) = &err else {
        return StoreError::Database(err);
    };

    let code = db_err.code().map(|code| code.into_owned());
    let constraint = db_err.constraint().unwrap_or_default();
    match code.as_deref() {
        Some(UNIQUE_VIOLATION) => StoreError::Duplicate(
            match constraint {
                "tours_name_key" => "name",
                "users_email_key" => "email",
                "reviews_tour_id_user_id_key" => "tour, user",
                other => other,
            }
            .to_string(),
        ),
        Some(FOREIGN_KEY_VIOLATION) if constraint.contains("tour_id") => {
            StoreError::MissingReference("tour")
        }
        Some(FOREIGN_KEY_VIOLATION) => StoreError::MissingReference("user"),
        Some(CHECK_VIOLATION) if constraint == "tours_discount_below_price" => {
            StoreError::Invalid("Discount price should be below regular price".to_string())
        }
        Some(CHECK_VIOLATION) => StoreError::Invalid(db_err.message().to_string()),
        _ => StoreError::Database(err),
    }
}

/// Appends `AND <column> <op> $n` for every condition, then ORDER BY,
/// LIMIT and OFFSET
///
/// `base` must already end in a WHERE clause. `id_column` breaks sort ties
/// so paging is stable.
fn push_list_query(
    builder: &mut QueryBuilder<'_, Postgres>,
    columns: &[Column],
    query: &ListQuery,
    id_column: &str,
) -> Result<(), StoreError> {
    query.validate(columns)?;

    for condition in &query.conditions {
        let column = lookup(columns, &condition.field)?;
        let operand = column.parse(&condition.value)?;

        builder.push(" AND ").push(column.column);
        if column.kind == ColumnKind::Enum {
            builder.push("::text");
        }
        builder.push(" ").push(condition.op.to_sql()).push(" ");

        match operand {
            TypedValue::Text(value) => builder.push_bind(value),
            TypedValue::Integer(value) => builder.push_bind(value),
            TypedValue::Float(value) => builder.push_bind(value),
            TypedValue::Boolean(value) => builder.push_bind(value),
            TypedValue::Timestamp(value) => builder.push_bind(value),
            TypedValue::Uuid(value) => builder.push_bind(value),
        };
    }

    builder.push(" ORDER BY ");
    for key in &query.sort {
        let column = lookup(columns, &key.field)?;
        builder
            .push(column.column)
            .push(if key.descending { " DESC NULLS LAST, " } else { " ASC NULLS FIRST, " });
    }
    builder.push(id_column);

    builder
        .push(" LIMIT ")
        .push_bind(i64::try_from(query.limit).unwrap_or(i64::MAX))
        .push(" OFFSET ")
        .push_bind(i64::try_from(query.skip).unwrap_or(i64::MAX));

    Ok(())
}

#[async_trait]
impl StoreHealth for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        health_check(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tour::Tour;
    use crate::models::Entity;
    use crate::query::{Comparison, Condition, QueryError, SortKey};

    fn built_sql(query: &ListQuery) -> Result<String, StoreError> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM tours WHERE TRUE");
        push_list_query(&mut builder, Tour::COLUMNS, query, "id")?;
        Ok(builder.sql().to_owned())
    }

    #[test]
    fn test_conditions_are_bound_not_interpolated() {
        let query = ListQuery {
            conditions: vec![
                Condition {
                    field: "price".to_string(),
                    op: Comparison::Lt,
                    value: "500".to_string(),
                },
                Condition {
                    field: "difficulty".to_string(),
                    op: Comparison::Eq,
                    value: "easy'; DROP TABLE tours; --".to_string(),
                },
            ],
            sort: vec![SortKey {
                field: "ratingsAverage".to_string(),
                descending: true,
            }],
            ..ListQuery::default()
        };

        let sql = built_sql(&query).unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM tours WHERE TRUE AND price < $1 AND difficulty::text = $2 \
             ORDER BY ratings_average DESC NULLS LAST, id LIMIT $3 OFFSET $4"
        );
    }

    #[test]
    fn test_unknown_sort_field_is_rejected() {
        let query = ListQuery {
            sort: vec![SortKey {
                field: "1; DROP TABLE tours".to_string(),
                descending: false,
            }],
            ..ListQuery::default()
        };

        assert!(matches!(
            built_sql(&query),
            Err(StoreError::Query(QueryError::UnknownField(_)))
        ));
    }

    #[test]
    fn test_non_database_errors_pass_through() {
        assert!(matches!(
            map_db_error(sqlx::Error::RowNotFound),
            StoreError::Database(sqlx::Error::RowNotFound)
        ));
    }
}
