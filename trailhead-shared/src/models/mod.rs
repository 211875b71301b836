/// Domain entities
///
/// Each entity has a stored representation (serialized outward in camelCase),
/// a create input and a patch input. Inputs carry their field rules as
/// `validator` derives, and the store enforces uniqueness and references.
///
/// # Entities
///
/// - [`tour::Tour`]: A bookable tour with pricing, dates and locations
/// - [`review::Review`]: A user's rating of a tour
/// - [`user::User`]: An account with a role
/// - [`booking::Booking`]: A paid reservation of a tour by a user
///
/// The [`Entity`] trait ties these together so the HTTP layer can serve
/// CRUD for any of them with one set of generic handlers.

pub mod booking;
pub mod review;
pub mod tour;
pub mod user;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::query::Column;
use crate::store::{Repository, StoreError, Stores};

/// Restricts list/create on a nested route to one parent record
///
/// Mounted under a parent's item route, `/tours/:id/reviews` lists only
/// reviews whose `tour` field equals the `id` path parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentScope {
    /// Path parameter carrying the parent id on the nested mount
    pub param: &'static str,
    /// Field of the child that references the parent
    pub field: &'static str,
}

/// Related records attached on single-record reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Populate {
    /// A tour's reviews
    Reviews,
    /// A tour's guides as public user profiles
    Guides,
}

/// Request-derived defaults available to a create
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteContext {
    /// Parent id from a nested route
    pub parent_id: Option<Uuid>,
    /// The authenticated caller, if any
    pub user_id: Option<Uuid>,
}

/// A resource served by the generic CRUD handlers
#[async_trait]
pub trait Entity: Serialize + Send + Sync + Sized + 'static {
    type Create: DeserializeOwned + Validate + Send + 'static;
    type Patch: DeserializeOwned + Validate + Send + 'static;

    /// Human name used in messages ("No tour found with that ID")
    const NAME: &'static str;

    /// Fields list queries may filter and sort on
    const COLUMNS: &'static [Column];

    const PARENT: Option<ParentScope> = None;

    const POPULATE: &'static [Populate] = &[];

    fn id(&self) -> Uuid;

    fn repository(stores: &Stores) -> &dyn Repository<Self>;

    /// Fills fields the client may omit from context (no-op by default)
    fn apply_context(_input: &mut Self::Create, _ctx: &WriteContext) {}

    /// Side effect run after a create, update or delete of `self`
    async fn after_write(&self, _stores: &Stores) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Lowercase, hyphen-separated form of a display name
///
/// ```
/// use trailhead_shared::models::slugify;
///
/// assert_eq!(slugify("The Forest Hiker"), "the-forest-hiker");
/// assert_eq!(slugify("  Sea & Sun!  "), "sea-sun");
/// ```
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for ch in name.chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(ch.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_collapses_separators() {
        assert_eq!(slugify("The Snow  Adventurer"), "the-snow-adventurer");
        assert_eq!(slugify("--Wine--Taster--"), "wine-taster");
        assert_eq!(slugify(""), "");
    }
}
