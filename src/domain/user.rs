use std::fmt::Display;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::types::{
    EmailAddress, PersonName, PhoneNumber, PublicId, TypeConstraintError, UserId,
};

/// Role determining what a user may see and change.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    #[default]
    Sales,
    Manager,
    Support,
}

impl UserRole {
    pub const ALL: [UserRole; 4] = [
        UserRole::Admin,
        UserRole::Sales,
        UserRole::Manager,
        UserRole::Support,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Sales => "sales",
            UserRole::Manager => "manager",
            UserRole::Support => "support",
        }
    }

    /// Human readable label.
    pub fn label(&self) -> &'static str {
        match self {
            UserRole::Admin => "Administrator",
            UserRole::Sales => "Sales Representative",
            UserRole::Manager => "Sales Manager",
            UserRole::Support => "Support Agent",
        }
    }

    /// Admins manage accounts.
    pub fn can_manage_users(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    /// Admins and managers can read records owned by other users.
    pub fn can_view_all(&self) -> bool {
        matches!(self, UserRole::Admin | UserRole::Manager)
    }

    /// Admins can modify records owned by other users.
    pub fn can_edit_all(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    /// Capability names reported by the permissions endpoint.
    pub fn capabilities(&self) -> Vec<&'static str> {
        let mut caps = vec![
            "contacts.view_own",
            "contacts.edit_own",
            "deals.view_own",
            "deals.edit_own",
            "activities.view_own",
            "activities.edit_own",
        ];
        if self.can_view_all() {
            caps.extend([
                "contacts.view_all",
                "deals.view_all",
                "activities.view_all",
                "users.view",
                "tasks.enqueue",
            ]);
        }
        if self.can_edit_all() {
            caps.extend([
                "contacts.edit_all",
                "deals.edit_all",
                "activities.edit_all",
                "users.manage",
            ]);
        }
        caps
    }
}

impl Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = TypeConstraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(UserRole::Admin),
            "sales" => Ok(UserRole::Sales),
            "manager" => Ok(UserRole::Manager),
            "support" => Ok(UserRole::Support),
            other => Err(TypeConstraintError::InvalidValue(format!(
                "unknown role `{other}`"
            ))),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: UserId,
    pub public_id: PublicId,
    pub email: EmailAddress,
    pub first_name: PersonName,
    pub last_name: PersonName,
    pub role: UserRole,
    pub phone: Option<PhoneNumber>,
    pub department: Option<String>,
    pub is_active: bool,
    pub email_verified: bool,
    pub date_joined: NaiveDateTime,
    pub last_login: Option<NaiveDateTime>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Stored credentials returned alongside the user during login.
#[derive(Clone, Debug)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

#[derive(Clone, Debug)]
pub struct NewUser {
    pub public_id: PublicId,
    pub email: EmailAddress,
    pub password_hash: String,
    pub first_name: PersonName,
    pub last_name: PersonName,
    pub role: UserRole,
    pub phone: Option<PhoneNumber>,
    pub department: Option<String>,
}

impl NewUser {
    #[must_use]
    pub fn new(
        email: EmailAddress,
        password_hash: String,
        first_name: PersonName,
        last_name: PersonName,
        role: UserRole,
    ) -> Self {
        Self {
            public_id: PublicId::new(),
            email,
            password_hash,
            first_name,
            last_name,
            role,
            phone: None,
            department: None,
        }
    }

    #[must_use]
    pub fn with_phone(mut self, phone: Option<PhoneNumber>) -> Self {
        self.phone = phone;
        self
    }

    #[must_use]
    pub fn with_department(mut self, department: Option<String>) -> Self {
        self.department = department
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        self
    }
}

/// Profile changes a user may apply to their own account.
#[derive(Clone, Debug, Default)]
pub struct UpdateUserProfile {
    pub first_name: Option<PersonName>,
    pub last_name: Option<PersonName>,
    pub phone: Option<PhoneNumber>,
    pub department: Option<String>,
}

impl UpdateUserProfile {
    /// Returns the user with the patch applied.
    pub fn apply(self, mut user: User) -> User {
        if let Some(first_name) = self.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = self.last_name {
            user.last_name = last_name;
        }
        if let Some(phone) = self.phone {
            user.phone = Some(phone);
        }
        if let Some(department) = self.department {
            let department = department.trim().to_string();
            user.department = (!department.is_empty()).then_some(department);
        }
        user
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_user() -> User {
        User {
            id: UserId::new(1).unwrap(),
            public_id: PublicId::new(),
            email: EmailAddress::new("jane@example.com").unwrap(),
            first_name: PersonName::new("Jane").unwrap(),
            last_name: PersonName::new("Doe").unwrap(),
            role: UserRole::Sales,
            phone: None,
            department: Some("EMEA".to_string()),
            is_active: true,
            email_verified: false,
            date_joined: Utc::now().naive_utc(),
            last_login: None,
        }
    }

    #[test]
    fn role_parsing_and_permissions() {
        assert_eq!("Manager".parse::<UserRole>().unwrap(), UserRole::Manager);
        assert!("owner".parse::<UserRole>().is_err());
        assert!(UserRole::Admin.can_manage_users());
        assert!(UserRole::Manager.can_view_all());
        assert!(!UserRole::Manager.can_edit_all());
        assert!(!UserRole::Support.can_view_all());
        assert!(UserRole::Admin.capabilities().contains(&"users.manage"));
        assert!(!UserRole::Sales.capabilities().contains(&"users.view"));
    }

    #[test]
    fn profile_patch_keeps_untouched_fields() {
        let patch = UpdateUserProfile {
            first_name: Some(PersonName::new("Janet").unwrap()),
            department: Some("  ".to_string()),
            ..UpdateUserProfile::default()
        };
        let user = patch.apply(sample_user());
        assert_eq!(user.full_name(), "Janet Doe");
        assert_eq!(user.department, None);
        assert_eq!(user.email.as_str(), "jane@example.com");
    }
}
