/// Tour model
///
/// Tours are the bookable product. Their rating aggregate
/// (`ratings_average`, `ratings_quantity`) is owned by the review write path
/// and is never accepted from clients.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE tour_difficulty AS ENUM ('easy', 'medium', 'difficult');
///
/// CREATE TABLE tours (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(40) NOT NULL,
///     slug VARCHAR(64) NOT NULL,
///     duration INTEGER NOT NULL,
///     max_group_size INTEGER NOT NULL,
///     difficulty tour_difficulty NOT NULL,
///     ratings_average DOUBLE PRECISION NOT NULL DEFAULT 4.5,
///     ratings_quantity INTEGER NOT NULL DEFAULT 0,
///     price DOUBLE PRECISION NOT NULL,
///     price_discount DOUBLE PRECISION,
///     summary TEXT NOT NULL,
///     description TEXT,
///     image_cover TEXT NOT NULL,
///     images TEXT[] NOT NULL DEFAULT '{}',
///     start_dates TIMESTAMPTZ[] NOT NULL DEFAULT '{}',
///     secret_tour BOOLEAN NOT NULL DEFAULT FALSE,
///     start_location JSONB NOT NULL,
///     locations JSONB NOT NULL DEFAULT '[]',
///     guides UUID[] NOT NULL DEFAULT '{}',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     version INTEGER NOT NULL DEFAULT 0
/// );
/// ```

use std::borrow::Cow;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::{slugify, Entity, Populate};
use crate::query::{Column, ColumnKind};
use crate::store::{Repository, Stores};

/// Rating a tour shows before anyone has reviewed it
pub const DEFAULT_RATING: f64 = 4.5;

/// Difficulty level of a tour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "tour_difficulty", rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Difficult,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Difficult => "difficult",
        }
    }
}

fn point_kind() -> String {
    "Point".to_string()
}

/// A GeoJSON point, `coordinates` being `[longitude, latitude]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(rename = "type", default = "point_kind")]
    pub kind: String,

    pub coordinates: [f64; 2],

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl GeoPoint {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self {
            kind: point_kind(),
            coordinates: [lng, lat],
            address: None,
            description: None,
        }
    }

    pub fn lng(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn lat(&self) -> f64 {
        self.coordinates[1]
    }
}

/// A stop on the tour itinerary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(flatten)]
    pub point: GeoPoint,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<i32>,
}

/// A tour as stored and returned
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tour {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub duration: i32,
    pub max_group_size: i32,
    pub difficulty: Difficulty,
    pub ratings_average: f64,
    pub ratings_quantity: i32,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_discount: Option<f64>,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub image_cover: String,
    pub images: Vec<String>,
    pub start_dates: Vec<DateTime<Utc>>,
    pub secret_tour: bool,
    pub start_location: GeoPoint,
    pub locations: Vec<Location>,
    pub guides: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub version: i32,
}

/// Input for creating a tour
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_new_pricing", skip_on_field_errors = false))]
pub struct CreateTour {
    #[validate(length(
        min = 10,
        max = 40,
        message = "A tour name must have between 10 and 40 characters"
    ))]
    pub name: String,

    #[validate(range(min = 1, message = "A tour must have a duration"))]
    pub duration: i32,

    #[validate(range(min = 1, message = "A tour must have a group size"))]
    pub max_group_size: i32,

    pub difficulty: Difficulty,

    pub price: f64,

    pub price_discount: Option<f64>,

    #[validate(length(min = 1, message = "A tour must have a summary"))]
    pub summary: String,

    pub description: Option<String>,

    #[validate(length(min = 1, message = "A tour must have a cover image"))]
    pub image_cover: String,

    #[serde(default)]
    pub images: Vec<String>,

    #[serde(default)]
    pub start_dates: Vec<DateTime<Utc>>,

    #[serde(default)]
    pub secret_tour: bool,

    #[validate(custom(function = "validate_point"))]
    pub start_location: GeoPoint,

    #[serde(default)]
    #[validate(custom(function = "validate_locations"))]
    pub locations: Vec<Location>,

    #[serde(default)]
    pub guides: Vec<Uuid>,
}

/// Partial update of a tour; absent fields are left alone
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_patch_pricing", skip_on_field_errors = false))]
pub struct PatchTour {
    #[validate(length(
        min = 10,
        max = 40,
        message = "A tour name must have between 10 and 40 characters"
    ))]
    pub name: Option<String>,

    #[validate(range(min = 1))]
    pub duration: Option<i32>,

    #[validate(range(min = 1))]
    pub max_group_size: Option<i32>,

    pub difficulty: Option<Difficulty>,

    pub price: Option<f64>,

    pub price_discount: Option<f64>,

    #[validate(length(min = 1))]
    pub summary: Option<String>,

    pub description: Option<String>,

    #[validate(length(min = 1))]
    pub image_cover: Option<String>,

    pub images: Option<Vec<String>>,

    pub start_dates: Option<Vec<DateTime<Utc>>>,

    pub secret_tour: Option<bool>,

    #[validate(custom(function = "validate_point"))]
    pub start_location: Option<GeoPoint>,

    #[validate(custom(function = "validate_locations"))]
    pub locations: Option<Vec<Location>>,

    pub guides: Option<Vec<Uuid>>,
}

fn validation_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

/// Checks a price and an optional discount against each other
pub fn check_pricing(price: f64, discount: Option<f64>) -> Result<(), ValidationError> {
    if price.is_nan() || price <= 0.0 {
        return Err(validation_error("price", "A tour must have a positive price"));
    }
    if let Some(discount) = discount {
        if discount < 0.0 || discount >= price {
            return Err(validation_error(
                "price_discount",
                "Discount price should be below regular price",
            ));
        }
    }
    Ok(())
}

fn validate_new_pricing(input: &CreateTour) -> Result<(), ValidationError> {
    check_pricing(input.price, input.price_discount)
}

// Cross-field check only when both sides arrive together; the store
// re-checks against the stored price.
fn validate_patch_pricing(input: &PatchTour) -> Result<(), ValidationError> {
    match (input.price, input.price_discount) {
        (Some(price), discount) => check_pricing(price, discount),
        (None, Some(discount)) if discount < 0.0 => Err(validation_error(
            "price_discount",
            "Discount price should be below regular price",
        )),
        _ => Ok(()),
    }
}

fn validate_point(point: &GeoPoint) -> Result<(), ValidationError> {
    if point.kind != "Point" {
        return Err(validation_error("geo_type", "Location type must be 'Point'"));
    }
    let (lng, lat) = (point.lng(), point.lat());
    if !(-180.0..=180.0).contains(&lng) || !(-90.0..=90.0).contains(&lat) {
        return Err(validation_error(
            "coordinates",
            "Coordinates must be [longitude, latitude]",
        ));
    }
    Ok(())
}

fn validate_locations(locations: &Vec<Location>) -> Result<(), ValidationError> {
    locations
        .iter()
        .try_for_each(|location| validate_point(&location.point))
}

/// Per-difficulty aggregate over well-rated tours
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyStats {
    /// Upper-cased difficulty (`EASY`)
    pub difficulty: String,
    pub num_tours: i64,
    pub num_ratings: i64,
    pub avg_rating: f64,
    pub avg_price: f64,
    pub min_price: f64,
    pub max_price: f64,
}

/// Tour starts within one month of a year
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyPlan {
    /// 1-12
    pub month: i32,
    pub num_tour_starts: i64,
    pub tours: Vec<String>,
}

/// Distance of a tour's start location from a reference point
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct TourDistance {
    pub id: Uuid,
    pub name: String,
    pub distance: f64,
}

/// Earth radius in miles and kilometres
pub const EARTH_RADIUS_MI: f64 = 3963.2;
pub const EARTH_RADIUS_KM: f64 = 6378.1;

/// Metres to miles and kilometres
pub const METERS_TO_MI: f64 = 0.000621371;
pub const METERS_TO_KM: f64 = 0.001;

/// Mean earth radius in metres
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Central angle in radians between two `[lng, lat]` points (haversine)
pub fn angular_distance(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let (lat1, lat2) = (a.lat().to_radians(), b.lat().to_radians());
    let d_lat = lat2 - lat1;
    let d_lng = (b.lng() - a.lng()).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * h.sqrt().min(1.0).asin()
}

/// Great-circle distance in metres
pub fn haversine_meters(a: &GeoPoint, b: &GeoPoint) -> f64 {
    angular_distance(a, b) * EARTH_RADIUS_M
}

impl Tour {
    /// Creates the stored form of a validated input
    pub fn from_input(input: CreateTour) -> Self {
        Self {
            id: Uuid::new_v4(),
            slug: slugify(&input.name),
            name: input.name,
            duration: input.duration,
            max_group_size: input.max_group_size,
            difficulty: input.difficulty,
            ratings_average: DEFAULT_RATING,
            ratings_quantity: 0,
            price: input.price,
            price_discount: input.price_discount,
            summary: input.summary,
            description: input.description,
            image_cover: input.image_cover,
            images: input.images,
            start_dates: input.start_dates,
            secret_tour: input.secret_tour,
            start_location: input.start_location,
            locations: input.locations,
            guides: input.guides,
            created_at: Utc::now(),
            version: 0,
        }
    }
}

impl PatchTour {
    /// Merges the patch into `tour`, regenerating the slug on rename
    ///
    /// Fails when the merged price and discount disagree; `tour` may be
    /// partially updated in that case and should be discarded.
    pub fn apply_to(self, tour: &mut Tour) -> Result<(), ValidationError> {
        if let Some(name) = self.name {
            tour.slug = slugify(&name);
            tour.name = name;
        }
        if let Some(duration) = self.duration {
            tour.duration = duration;
        }
        if let Some(max_group_size) = self.max_group_size {
            tour.max_group_size = max_group_size;
        }
        if let Some(difficulty) = self.difficulty {
            tour.difficulty = difficulty;
        }
        if let Some(price) = self.price {
            tour.price = price;
        }
        if self.price_discount.is_some() {
            tour.price_discount = self.price_discount;
        }
        if let Some(summary) = self.summary {
            tour.summary = summary;
        }
        if self.description.is_some() {
            tour.description = self.description;
        }
        if let Some(image_cover) = self.image_cover {
            tour.image_cover = image_cover;
        }
        if let Some(images) = self.images {
            tour.images = images;
        }
        if let Some(start_dates) = self.start_dates {
            tour.start_dates = start_dates;
        }
        if let Some(secret_tour) = self.secret_tour {
            tour.secret_tour = secret_tour;
        }
        if let Some(start_location) = self.start_location {
            tour.start_location = start_location;
        }
        if let Some(locations) = self.locations {
            tour.locations = locations;
        }
        if let Some(guides) = self.guides {
            tour.guides = guides;
        }

        check_pricing(tour.price, tour.price_discount)
    }
}

const COLUMNS: &[Column] = &[
    Column::new("id", "id", ColumnKind::Uuid),
    Column::new("name", "name", ColumnKind::Text),
    Column::new("slug", "slug", ColumnKind::Text),
    Column::new("duration", "duration", ColumnKind::Integer),
    Column::new("maxGroupSize", "max_group_size", ColumnKind::Integer),
    Column::new("difficulty", "difficulty", ColumnKind::Enum),
    Column::new("ratingsAverage", "ratings_average", ColumnKind::Float),
    Column::new("ratingsQuantity", "ratings_quantity", ColumnKind::Integer),
    Column::new("price", "price", ColumnKind::Float),
    Column::new("priceDiscount", "price_discount", ColumnKind::Float),
    Column::new("summary", "summary", ColumnKind::Text),
    Column::new("createdAt", "created_at", ColumnKind::Timestamp),
];

#[async_trait]
impl Entity for Tour {
    type Create = CreateTour;
    type Patch = PatchTour;

    const NAME: &'static str = "tour";
    const COLUMNS: &'static [Column] = COLUMNS;
    const POPULATE: &'static [Populate] = &[Populate::Guides, Populate::Reviews];

    fn id(&self) -> Uuid {
        self.id
    }

    fn repository(stores: &Stores) -> &dyn Repository<Self> {
        stores.tours.as_repository()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_input() -> serde_json::Value {
        json!({
            "name": "The Forest Hiker",
            "duration": 5,
            "maxGroupSize": 25,
            "difficulty": "easy",
            "price": 397,
            "summary": "Breathtaking hike through the Canadian Banff National Park",
            "imageCover": "tour-1-cover.jpg",
            "startLocation": {
                "coordinates": [-115.570154, 51.178456],
                "address": "224 Banff Ave, Banff, AB, Canada"
            }
        })
    }

    #[test]
    fn test_create_tour_deserializes_camel_case() {
        let input: CreateTour = serde_json::from_value(sample_input()).unwrap();

        assert_eq!(input.max_group_size, 25);
        assert_eq!(input.difficulty, Difficulty::Easy);
        assert_eq!(input.start_location.kind, "Point");
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_unknown_difficulty_is_rejected() {
        let mut value = sample_input();
        value["difficulty"] = json!("extreme");
        assert!(serde_json::from_value::<CreateTour>(value).is_err());
    }

    #[test]
    fn test_name_length_bounds() {
        let mut value = sample_input();
        value["name"] = json!("Short");
        let input: CreateTour = serde_json::from_value(value).unwrap();
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_discount_must_be_below_price() {
        let mut value = sample_input();
        value["priceDiscount"] = json!(500);
        let input: CreateTour = serde_json::from_value(value).unwrap();
        assert!(input.validate().is_err());

        let mut value = sample_input();
        value["priceDiscount"] = json!(100);
        let input: CreateTour = serde_json::from_value(value).unwrap();
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_coordinates_out_of_range() {
        let mut value = sample_input();
        value["startLocation"]["coordinates"] = json!([51.1, -215.5]);
        let input: CreateTour = serde_json::from_value(value).unwrap();
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_patch_validates_only_present_fields() {
        let patch: PatchTour = serde_json::from_value(json!({"duration": 7})).unwrap();
        assert!(patch.validate().is_ok());

        let patch: PatchTour = serde_json::from_value(json!({"name": "Tiny"})).unwrap();
        assert!(patch.validate().is_err());

        let patch: PatchTour =
            serde_json::from_value(json!({"price": 100, "priceDiscount": 150})).unwrap();
        assert!(patch.validate().is_err());
    }

    #[test]
    fn test_location_flattens_point() {
        let location: Location = serde_json::from_value(json!({
            "type": "Point",
            "coordinates": [-116.214531, 51.417611],
            "description": "Yoho National Park",
            "day": 2
        }))
        .unwrap();

        assert_eq!(location.day, Some(2));
        assert_eq!(location.point.description.as_deref(), Some("Yoho National Park"));
    }

    #[test]
    fn test_patch_apply_renames_and_rechecks_discount() {
        let input: CreateTour = serde_json::from_value(sample_input()).unwrap();
        let mut tour = Tour::from_input(input);
        assert_eq!(tour.slug, "the-forest-hiker");
        assert_eq!(tour.ratings_average, DEFAULT_RATING);

        let rename = PatchTour {
            name: Some("The Sea Explorer".to_string()),
            ..Default::default()
        };
        rename.apply_to(&mut tour).unwrap();
        assert_eq!(tour.slug, "the-sea-explorer");

        let discount = PatchTour {
            price_discount: Some(450.0),
            ..Default::default()
        };
        assert!(discount.apply_to(&mut tour).is_err());
    }

    #[test]
    fn test_haversine() {
        // Los Angeles to Las Vegas is roughly 368 km
        let la = GeoPoint::new(-118.2437, 34.0522);
        let vegas = GeoPoint::new(-115.1398, 36.1699);
        let km = haversine_meters(&la, &vegas) * METERS_TO_KM;

        assert!((km - 368.0).abs() < 5.0, "got {km}");
        assert_eq!(haversine_meters(&la, &la), 0.0);
    }
}
