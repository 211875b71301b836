/// Booking model
///
/// A booking records that a user paid for a tour at a given price. Bookings
/// are created from the payment provider's success redirect and managed by
/// staff through the generic CRUD routes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::Entity;
use crate::query::{Column, ColumnKind};
use crate::store::{Repository, Stores};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    #[sqlx(rename = "tour_id")]
    pub tour: Uuid,
    #[sqlx(rename = "user_id")]
    pub user: Uuid,
    pub price: f64,
    pub paid: bool,
    pub created_at: DateTime<Utc>,
    pub version: i32,
}

fn paid_by_default() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBooking {
    pub tour: Uuid,

    pub user: Uuid,

    #[validate(range(min = 0.0, message = "Booking must have a price."))]
    pub price: f64,

    #[serde(default = "paid_by_default")]
    pub paid: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct PatchBooking {
    #[validate(range(min = 0.0, message = "Booking must have a price."))]
    pub price: Option<f64>,

    pub paid: Option<bool>,
}

const COLUMNS: &[Column] = &[
    Column::new("id", "id", ColumnKind::Uuid),
    Column::new("tour", "tour_id", ColumnKind::Uuid),
    Column::new("user", "user_id", ColumnKind::Uuid),
    Column::new("price", "price", ColumnKind::Float),
    Column::new("paid", "paid", ColumnKind::Boolean),
    Column::new("createdAt", "created_at", ColumnKind::Timestamp),
];

impl Entity for Booking {
    type Create = CreateBooking;
    type Patch = PatchBooking;

    const NAME: &'static str = "booking";
    const COLUMNS: &'static [Column] = COLUMNS;

    fn id(&self) -> Uuid {
        self.id
    }

    fn repository(stores: &Stores) -> &dyn Repository<Self> {
        stores.bookings.as_repository()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_paid_defaults_to_true() {
        let input: CreateBooking = serde_json::from_value(json!({
            "tour": Uuid::new_v4(),
            "user": Uuid::new_v4(),
            "price": 497
        }))
        .unwrap();

        assert!(input.paid);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_negative_price_is_rejected() {
        let input = CreateBooking {
            tour: Uuid::new_v4(),
            user: Uuid::new_v4(),
            price: -1.0,
            paid: true,
        };
        assert!(input.validate().is_err());
    }
}
