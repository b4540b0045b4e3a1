use serde::Deserialize;
use validator::Validate;

use crate::domain::types::{PersonName, PhoneNumber};
use crate::domain::user::{UpdateUserProfile, UserRole};
use crate::forms::{FormError, parse_field, parse_optional};
use crate::pagination::PageParams;

/// `GET /users/` filters.
#[derive(Debug, Default, Deserialize)]
pub struct UserListParams {
    pub search: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

impl UserListParams {
    pub fn paging(&self) -> PageParams {
        PageParams {
            page: self.page,
            page_size: self.page_size,
        }
    }

    pub fn role(&self) -> Result<Option<UserRole>, FormError> {
        parse_optional("role", self.role.clone(), |raw| raw.parse::<UserRole>())
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileForm {
    #[validate(length(min = 1, max = 150))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 150))]
    pub last_name: Option<String>,
    pub phone: Option<String>,
    #[validate(length(max = 100))]
    pub department: Option<String>,
}

impl TryFrom<UpdateProfileForm> for UpdateUserProfile {
    type Error = FormError;

    fn try_from(form: UpdateProfileForm) -> Result<Self, Self::Error> {
        form.validate()?;
        Ok(Self {
            first_name: form
                .first_name
                .map(|name| parse_field("first_name", PersonName::new(name)))
                .transpose()?,
            last_name: form
                .last_name
                .map(|name| parse_field("last_name", PersonName::new(name)))
                .transpose()?,
            phone: parse_optional("phone", form.phone, PhoneNumber::new)?,
            department: form.department.map(|d| ammonia::clean(&d)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_name_is_rejected() {
        let form = UpdateProfileForm {
            first_name: Some("   ".into()),
            ..Default::default()
        };
        assert!(UpdateUserProfile::try_from(form).is_err());
    }

    #[test]
    fn phone_is_normalized() {
        let form = UpdateProfileForm {
            phone: Some("+1 415 555 2671".into()),
            department: Some("Sales".into()),
            ..Default::default()
        };
        let patch = UpdateUserProfile::try_from(form).unwrap();
        assert_eq!(patch.phone.unwrap().as_str(), "+14155552671");
        assert_eq!(patch.department.as_deref(), Some("Sales"));
    }

    #[test]
    fn role_filter_is_parsed() {
        let params = UserListParams {
            role: Some("support".into()),
            ..Default::default()
        };
        assert_eq!(params.role().unwrap(), Some(UserRole::Support));
    }
}
