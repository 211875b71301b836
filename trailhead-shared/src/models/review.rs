/// Review model
///
/// A review belongs to exactly one tour and one user, and a user may review
/// a tour only once. Every write recomputes the owning tour's rating
/// aggregate through [`Entity::after_write`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{Entity, ParentScope, WriteContext};
use crate::query::{Column, ColumnKind};
use crate::store::{Repository, StoreError, Stores};

/// Public profile of the review's author
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewAuthor {
    pub id: Uuid,
    pub name: String,
    pub photo: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub review: String,
    pub rating: i32,
    pub created_at: DateTime<Utc>,
    pub tour: Uuid,
    /// `None` once the author has deactivated their account
    pub user: Option<ReviewAuthor>,
    pub version: i32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateReview {
    #[validate(length(min = 1, message = "Review can not be empty!"))]
    pub review: String,

    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,

    #[validate(required(message = "Review must belong to a tour."))]
    pub tour: Option<Uuid>,

    #[validate(required(message = "Review must belong to a user"))]
    pub user: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct PatchReview {
    #[validate(length(min = 1, message = "Review can not be empty!"))]
    pub review: Option<String>,

    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: Option<i32>,
}

const COLUMNS: &[Column] = &[
    Column::new("id", "r.id", ColumnKind::Uuid),
    Column::new("review", "r.review", ColumnKind::Text),
    Column::new("rating", "r.rating", ColumnKind::Integer),
    Column::new("createdAt", "r.created_at", ColumnKind::Timestamp),
    Column::new("tour", "r.tour_id", ColumnKind::Uuid),
    Column::new("user", "r.user_id", ColumnKind::Uuid),
];

#[async_trait]
impl Entity for Review {
    type Create = CreateReview;
    type Patch = PatchReview;

    const NAME: &'static str = "review";
    const COLUMNS: &'static [Column] = COLUMNS;
    const PARENT: Option<ParentScope> = Some(ParentScope {
        param: "id",
        field: "tour",
    });

    fn id(&self) -> Uuid {
        self.id
    }

    fn repository(stores: &Stores) -> &dyn Repository<Self> {
        stores.reviews.as_repository()
    }

    /// Nested routes supply the tour, the session supplies the author
    fn apply_context(input: &mut CreateReview, ctx: &WriteContext) {
        if input.tour.is_none() {
            input.tour = ctx.parent_id;
        }
        if input.user.is_none() {
            input.user = ctx.user_id;
        }
    }

    async fn after_write(&self, stores: &Stores) -> Result<(), StoreError> {
        stores.reviews.recalculate_ratings(self.tour).await?;
        Ok(())
    }
}
