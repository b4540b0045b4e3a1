use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::types::{
    EmailAddress, PersonName, PhoneNumber, PublicId, TypeConstraintError, UserId,
};
use crate::domain::user::{
    NewUser as DomainNewUser, User as DomainUser, UserCredentials as DomainUserCredentials,
};

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::users)]
/// Diesel model for [`crate::domain::user::User`].
pub struct User {
    pub id: i32,
    pub public_id: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub is_active: bool,
    pub email_verified: bool,
    pub date_joined: NaiveDateTime,
    pub last_login: Option<NaiveDateTime>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::users)]
pub struct NewUser<'a> {
    pub public_id: String,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub role: &'a str,
    pub phone: Option<&'a str>,
    pub department: Option<&'a str>,
    pub date_joined: NaiveDateTime,
}

#[derive(AsChangeset)]
#[diesel(table_name = crate::schema::users)]
#[diesel(treat_none_as_null = true)]
/// Profile columns written back on update.
pub struct UpdateUserProfile<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub phone: Option<&'a str>,
    pub department: Option<&'a str>,
}

impl<'a> From<&'a DomainNewUser> for NewUser<'a> {
    fn from(user: &'a DomainNewUser) -> Self {
        Self {
            public_id: user.public_id.to_string(),
            email: user.email.as_str(),
            password_hash: user.password_hash.as_str(),
            first_name: user.first_name.as_str(),
            last_name: user.last_name.as_str(),
            role: user.role.as_str(),
            phone: user.phone.as_ref().map(PhoneNumber::as_str),
            department: user.department.as_deref(),
            date_joined: chrono::Utc::now().naive_utc(),
        }
    }
}

impl<'a> From<&'a DomainUser> for UpdateUserProfile<'a> {
    fn from(user: &'a DomainUser) -> Self {
        Self {
            first_name: user.first_name.as_str(),
            last_name: user.last_name.as_str(),
            phone: user.phone.as_ref().map(PhoneNumber::as_str),
            department: user.department.as_deref(),
        }
    }
}

impl TryFrom<User> for DomainUser {
    type Error = TypeConstraintError;

    fn try_from(user: User) -> Result<Self, Self::Error> {
        Ok(Self {
            id: UserId::new(user.id)?,
            public_id: user.public_id.parse::<PublicId>()?,
            email: EmailAddress::new(user.email)?,
            first_name: PersonName::new(user.first_name)?,
            last_name: PersonName::new(user.last_name)?,
            role: user.role.parse()?,
            phone: user.phone.map(PhoneNumber::new).transpose()?,
            department: user.department,
            is_active: user.is_active,
            email_verified: user.email_verified,
            date_joined: user.date_joined,
            last_login: user.last_login,
        })
    }
}

impl TryFrom<User> for DomainUserCredentials {
    type Error = TypeConstraintError;

    fn try_from(user: User) -> Result<Self, Self::Error> {
        let password_hash = user.password_hash.clone();
        Ok(Self {
            user: DomainUser::try_from(user)?,
            password_hash,
        })
    }
}
