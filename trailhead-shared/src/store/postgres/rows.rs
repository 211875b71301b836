/// Row decoding for entities that don't map column-for-column
///
/// Tours keep their geo fields in JSONB; reviews are always read joined to
/// their author.

use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{FromRow, Row};
use uuid::Uuid;

use crate::models::review::{Review, ReviewAuthor};
use crate::models::tour::{GeoPoint, Location, Tour};

/// Column list matching the `Tour` row decoder
pub(super) const TOUR_COLUMNS: &str = "id, name, slug, duration, max_group_size, difficulty, \
     ratings_average, ratings_quantity, price, price_discount, summary, description, \
     image_cover, images, start_dates, secret_tour, start_location, locations, guides, \
     created_at, version";

/// Review select joined to its active author, ready for a WHERE clause
pub(super) const REVIEW_SELECT: &str = "SELECT r.id, r.review, r.rating, r.created_at, \
     r.tour_id, r.version, u.id AS author_id, u.name AS author_name, u.photo AS author_photo \
     FROM reviews r LEFT JOIN users u ON u.id = r.user_id AND u.active";

impl<'r> FromRow<'r, PgRow> for Tour {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let Json(start_location): Json<GeoPoint> = row.try_get("start_location")?;
        let Json(locations): Json<Vec<Location>> = row.try_get("locations")?;

        Ok(Tour {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            slug: row.try_get("slug")?,
            duration: row.try_get("duration")?,
            max_group_size: row.try_get("max_group_size")?,
            difficulty: row.try_get("difficulty")?,
            ratings_average: row.try_get("ratings_average")?,
            ratings_quantity: row.try_get("ratings_quantity")?,
            price: row.try_get("price")?,
            price_discount: row.try_get("price_discount")?,
            summary: row.try_get("summary")?,
            description: row.try_get("description")?,
            image_cover: row.try_get("image_cover")?,
            images: row.try_get("images")?,
            start_dates: row.try_get("start_dates")?,
            secret_tour: row.try_get("secret_tour")?,
            start_location,
            locations,
            guides: row.try_get("guides")?,
            created_at: row.try_get("created_at")?,
            version: row.try_get("version")?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for Review {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let author_id: Option<Uuid> = row.try_get("author_id")?;
        let author = match author_id {
            Some(id) => Some(ReviewAuthor {
                id,
                name: row.try_get("author_name")?,
                photo: row.try_get("author_photo")?,
            }),
            None => None,
        };

        Ok(Review {
            id: row.try_get("id")?,
            review: row.try_get("review")?,
            rating: row.try_get("rating")?,
            created_at: row.try_get("created_at")?,
            tour: row.try_get("tour_id")?,
            user: author,
            version: row.try_get("version")?,
        })
    }
}
