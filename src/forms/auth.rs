use serde::Deserialize;
use validator::Validate;

use crate::domain::types::{EmailAddress, PersonName, PhoneNumber};
use crate::domain::user::UserRole;
use crate::forms::{FormError, clean_text, parse_field, parse_optional};

#[derive(Debug, Deserialize, Validate)]
/// Self-service registration payload.
pub struct RegisterForm {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters long."))]
    pub password: String,
    pub password_confirm: String,
    #[validate(length(min = 1, max = 150, message = "First name is required."))]
    pub first_name: String,
    #[validate(length(min = 1, max = 150, message = "Last name is required."))]
    pub last_name: String,
    pub role: Option<String>,
    pub phone: Option<String>,
    #[validate(length(max = 100))]
    pub department: Option<String>,
}

/// Registration data after validation; the password is still plain text.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: EmailAddress,
    pub password: String,
    pub first_name: PersonName,
    pub last_name: PersonName,
    pub role: UserRole,
    pub phone: Option<PhoneNumber>,
    pub department: Option<String>,
}

impl TryFrom<RegisterForm> for Registration {
    type Error = FormError;

    fn try_from(form: RegisterForm) -> Result<Self, Self::Error> {
        form.validate()?;
        if form.password != form.password_confirm {
            return Err(FormError::field("password_confirm", "Passwords do not match."));
        }
        let role = match form.role.as_deref().map(str::trim) {
            None | Some("") => UserRole::default(),
            Some(raw) => parse_field("role", raw.parse::<UserRole>())?,
        };
        if role == UserRole::Admin {
            return Err(FormError::field(
                "role",
                "Administrator accounts cannot be self-registered.",
            ));
        }
        Ok(Self {
            email: parse_field("email", EmailAddress::new(form.email))?,
            password: form.password,
            first_name: parse_field("first_name", PersonName::new(form.first_name))?,
            last_name: parse_field("last_name", PersonName::new(form.last_name))?,
            role,
            phone: parse_optional("phone", form.phone, PhoneNumber::new)?,
            department: clean_text(form.department),
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginForm {
    #[validate(length(min = 1, message = "Email address is required."))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
}

impl LoginForm {
    /// Normalized email; malformed addresses are reported as bad credentials.
    pub fn email(&self) -> Option<EmailAddress> {
        EmailAddress::new(self.email.as_str()).ok()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshTokenForm {
    #[serde(default, alias = "refresh")]
    pub refresh_token: Option<String>,
}

impl RefreshTokenForm {
    pub fn token(&self) -> Option<&str> {
        self.refresh_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordForm {
    #[validate(length(min = 1, message = "Current password is required."))]
    pub old_password: String,
    #[validate(length(min = 8, message = "New password must be at least 8 characters long."))]
    pub new_password: String,
    pub new_password_confirm: String,
}

impl ChangePasswordForm {
    /// Checks the rules that do not need the stored hash.
    pub fn check(&self) -> Result<(), FormError> {
        self.validate()?;
        if self.old_password == self.new_password {
            return Err(FormError::field(
                "new_password",
                "New password must be different from current password.",
            ));
        }
        if self.new_password != self.new_password_confirm {
            return Err(FormError::field(
                "new_password_confirm",
                "New passwords do not match.",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register_form() -> RegisterForm {
        RegisterForm {
            email: "Ada@Example.com".into(),
            password: "analytical1".into(),
            password_confirm: "analytical1".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            role: Some("manager".into()),
            phone: None,
            department: Some("  <b>R&amp;D</b> ".into()),
        }
    }

    #[test]
    fn registration_is_normalized() {
        let registration = Registration::try_from(register_form()).unwrap();
        assert_eq!(registration.email.as_str(), "ada@example.com");
        assert_eq!(registration.role, UserRole::Manager);
        assert!(registration.department.is_some());
    }

    #[test]
    fn registration_rejects_mismatch_and_admin() {
        let mut form = register_form();
        form.password_confirm = "other-pass1".into();
        let err = Registration::try_from(form).unwrap_err();
        assert_eq!(err.details()[0].field.as_deref(), Some("password_confirm"));

        let mut form = register_form();
        form.role = Some("admin".into());
        assert!(Registration::try_from(form).is_err());

        let mut form = register_form();
        form.role = Some("janitor".into());
        assert!(Registration::try_from(form).is_err());
    }

    #[test]
    fn refresh_token_accepts_both_names() {
        let form: RefreshTokenForm = serde_json::from_str(r#"{"refresh":" abc "}"#).unwrap();
        assert_eq!(form.token(), Some("abc"));
        let form: RefreshTokenForm = serde_json::from_str("{}").unwrap();
        assert_eq!(form.token(), None);
    }

    #[test]
    fn change_password_rules() {
        let form = ChangePasswordForm {
            old_password: "old-pass1".into(),
            new_password: "old-pass1".into(),
            new_password_confirm: "old-pass1".into(),
        };
        assert!(form.check().is_err());
        let form = ChangePasswordForm {
            old_password: "old-pass1".into(),
            new_password: "new-pass1".into(),
            new_password_confirm: "new-pass2".into(),
        };
        assert_eq!(
            form.check().unwrap_err().details()[0].field.as_deref(),
            Some("new_password_confirm")
        );
    }
}
