//! User records and the persistence port for them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use craftowl_core::{Email, Entity, StoreResult};

use crate::Role;

/// Profile keys a caller may never set through a profile update.
const RESERVED_PROFILE_KEYS: [&str; 2] = ["email", "role"];

/// A marketplace user, keyed by email.
///
/// Profile fields are opaque to the backend and stored as given; `email` and
/// `role` are never part of the profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub email: Email,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,

    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

impl User {
    pub fn new(email: Email) -> Self {
        Self {
            email,
            role: None,
            profile: Map::new(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Some(Role::Admin)
    }

    /// Merge profile fields, dropping reserved keys so a self-update cannot
    /// rename the user or grant itself a role.
    pub fn merge_profile(&mut self, patch: Map<String, Value>) {
        for (key, value) in sanitize_profile(patch) {
            self.profile.insert(key, value);
        }
    }
}

/// Strip keys a profile update may not touch.
pub fn sanitize_profile(mut patch: Map<String, Value>) -> Map<String, Value> {
    for key in RESERVED_PROFILE_KEYS {
        patch.remove(key);
    }
    patch
}

impl Entity for User {
    type Id = Email;

    fn id(&self) -> &Self::Id {
        &self.email
    }
}

/// Persistence port for users.
///
/// Every mutation is a single-document operation keyed by email.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert the user if absent. An existing user keeps role and profile.
    async fn upsert(&self, email: &Email) -> StoreResult<User>;

    async fn find(&self, email: &Email) -> StoreResult<Option<User>>;

    /// Merge profile fields into the user, creating it if absent.
    async fn merge_profile(&self, email: &Email, profile: Map<String, Value>) -> StoreResult<User>;

    /// Set or clear the role. Returns `None` if no such user exists.
    async fn set_role(&self, email: &Email, role: Option<Role>) -> StoreResult<Option<User>>;

    /// All users, ascending by email.
    async fn list(&self) -> StoreResult<Vec<User>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_profile_ignores_reserved_keys() {
        let mut user = User::new(Email::parse("a@x.com").unwrap());
        let patch = json!({ "name": "Ann", "role": "admin", "email": "evil@x.com" });
        user.merge_profile(patch.as_object().unwrap().clone());

        assert_eq!(user.email.as_str(), "a@x.com");
        assert!(!user.is_admin());
        assert_eq!(user.profile.get("name"), Some(&json!("Ann")));
        assert_eq!(user.profile.len(), 1);
    }

    #[test]
    fn json_shape_flattens_profile_and_omits_absent_role() {
        let mut user = User::new(Email::parse("a@x.com").unwrap());
        user.merge_profile(json!({ "city": "Dhaka" }).as_object().unwrap().clone());
        assert_eq!(
            serde_json::to_value(&user).unwrap(),
            json!({ "email": "a@x.com", "city": "Dhaka" })
        );

        user.role = Some(Role::Admin);
        assert_eq!(serde_json::to_value(&user).unwrap()["role"], json!("admin"));
    }
}
