/// User roles and per-route role sets
///
/// Roles are a closed enumeration stored as the Postgres enum `user_role`
/// and serialized in kebab case (`lead-guide`). Routes declare the roles
/// they admit as an [`AllowedRoles`] constant.
///
/// # Example
///
/// ```
/// use trailhead_shared::auth::roles::{AllowedRoles, Role};
///
/// const STAFF: AllowedRoles = AllowedRoles::new(&[Role::Admin, Role::LeadGuide]);
///
/// assert!(STAFF.permits(Role::Admin));
/// assert!(!STAFF.permits(Role::Guide));
/// ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a user account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "kebab-case")]
#[sqlx(type_name = "user_role", rename_all = "kebab-case")]
pub enum Role {
    /// Regular customer
    #[default]
    User,
    /// Tour guide
    Guide,
    /// Lead guide, may manage tours
    LeadGuide,
    /// Administrator
    Admin,
}

impl Role {
    /// Wire name of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Guide => "guide",
            Role::LeadGuide => "lead-guide",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of roles admitted by a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllowedRoles(&'static [Role]);

impl AllowedRoles {
    /// Admins only
    pub const ADMIN: AllowedRoles = AllowedRoles(&[Role::Admin]);

    /// Staff allowed to manage tours and bookings
    pub const TOUR_MANAGERS: AllowedRoles = AllowedRoles(&[Role::Admin, Role::LeadGuide]);

    /// Everyone who works on tours
    pub const TOUR_STAFF: AllowedRoles =
        AllowedRoles(&[Role::Admin, Role::LeadGuide, Role::Guide]);

    /// Customers only (review authors)
    pub const CUSTOMERS: AllowedRoles = AllowedRoles(&[Role::User]);

    /// Review authors and admins
    pub const REVIEW_EDITORS: AllowedRoles = AllowedRoles(&[Role::User, Role::Admin]);

    pub const fn new(roles: &'static [Role]) -> Self {
        AllowedRoles(roles)
    }

    /// Whether `role` is a member of the set
    pub fn permits(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    pub fn roles(&self) -> &'static [Role] {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_wire_names() {
        assert_eq!(serde_json::to_string(&Role::LeadGuide).unwrap(), "\"lead-guide\"");
        assert_eq!(serde_json::from_str::<Role>("\"admin\"").unwrap(), Role::Admin);
        assert!(serde_json::from_str::<Role>("\"superuser\"").is_err());
        assert_eq!(Role::default(), Role::User);
    }

    #[test]
    fn test_allowed_roles() {
        assert!(AllowedRoles::TOUR_MANAGERS.permits(Role::LeadGuide));
        assert!(!AllowedRoles::TOUR_MANAGERS.permits(Role::Guide));
        assert!(AllowedRoles::TOUR_STAFF.permits(Role::Guide));
        assert!(!AllowedRoles::CUSTOMERS.permits(Role::Admin));
        assert!(AllowedRoles::REVIEW_EDITORS.permits(Role::Admin));
        assert_eq!(AllowedRoles::ADMIN.roles(), &[Role::Admin]);
    }

    #[test]
    fn test_display_matches_serde() {
        for role in [Role::User, Role::Guide, Role::LeadGuide, Role::Admin] {
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json.trim_matches('"'), role.to_string());
        }
    }
}
