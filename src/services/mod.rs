//! Business workflows invoked by the HTTP handlers.
//!
//! Every function is generic over the repository traits it needs so the
//! handlers can pass the Diesel repository and tests can pass mocks.

use chrono::{NaiveDateTime, Utc};

use crate::auth::AuthenticatedUser;
use crate::domain::types::UserId;

pub mod activities;
pub mod auth;
pub mod contacts;
pub mod deals;
pub mod errors;
pub mod health;
pub mod tasks;
pub mod users;

pub use errors::{ServiceError, ServiceResult};

pub(crate) fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Records owned by other users are invisible to sales and support staff.
pub(crate) fn ensure_can_view(
    user: &AuthenticatedUser,
    owner_id: UserId,
    resource: &str,
) -> ServiceResult<()> {
    if user.can_view_all() || user.id == owner_id {
        Ok(())
    } else {
        Err(ServiceError::not_found(resource))
    }
}

/// Only admins modify records owned by someone else.
pub(crate) fn ensure_can_edit(
    user: &AuthenticatedUser,
    owner_id: UserId,
    resource: &str,
) -> ServiceResult<()> {
    ensure_can_view(user, owner_id, resource)?;
    if user.can_edit_all() || user.id == owner_id {
        Ok(())
    } else {
        Err(ServiceError::forbidden())
    }
}

pub(crate) fn ensure_can_view_all(user: &AuthenticatedUser) -> ServiceResult<()> {
    if user.can_view_all() {
        Ok(())
    } else {
        Err(ServiceError::forbidden())
    }
}

pub(crate) fn ensure_admin(user: &AuthenticatedUser) -> ServiceResult<()> {
    if user.role.can_manage_users() {
        Ok(())
    } else {
        Err(ServiceError::forbidden())
    }
}

#[cfg(test)]
pub(crate) fn principal(id: i32, role: crate::domain::user::UserRole) -> AuthenticatedUser {
    AuthenticatedUser {
        id: UserId::new(id).unwrap(),
        email: format!("user{id}@example.com"),
        role,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::UserRole;

    #[test]
    fn access_rules_by_role() {
        let owner = UserId::new(1).unwrap();
        let other = UserId::new(2).unwrap();

        let sales = principal(1, UserRole::Sales);
        assert!(ensure_can_edit(&sales, owner, "Contact").is_ok());
        assert!(matches!(
            ensure_can_view(&sales, other, "Contact"),
            Err(ServiceError::NotFound(_))
        ));

        let manager = principal(3, UserRole::Manager);
        assert!(ensure_can_view(&manager, other, "Contact").is_ok());
        assert!(matches!(
            ensure_can_edit(&manager, other, "Contact"),
            Err(ServiceError::Forbidden(_))
        ));

        let admin = principal(4, UserRole::Admin);
        assert!(ensure_can_edit(&admin, other, "Contact").is_ok());
        assert!(ensure_admin(&manager).is_err());
    }
}
