use chrono::NaiveDateTime;
use serde::Serialize;

use crate::auth::TokenPair;
use crate::domain::types::{PublicId, UserId};
use crate::domain::user::{User, UserRole};

#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: UserId,
    pub public_id: PublicId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub role: UserRole,
    pub role_display: &'static str,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub is_active: bool,
    pub email_verified: bool,
    pub date_joined: NaiveDateTime,
    pub last_login: Option<NaiveDateTime>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            full_name: user.full_name(),
            id: user.id,
            public_id: user.public_id,
            email: user.email.into_inner(),
            first_name: user.first_name.into_inner(),
            last_name: user.last_name.into_inner(),
            role: user.role,
            role_display: user.role.label(),
            phone: user.phone.map(|p| p.into_inner()),
            department: user.department,
            is_active: user.is_active,
            email_verified: user.email_verified,
            date_joined: user.date_joined,
            last_login: user.last_login,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: UserResponse,
}

impl LoginResponse {
    pub fn new(tokens: TokenPair, user: User) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            token_type: tokens.token_type,
            expires_in: tokens.expires_in,
            user: user.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PermissionsResponse {
    pub user_id: UserId,
    pub role: UserRole,
    pub permissions: Vec<&'static str>,
}

impl From<&User> for PermissionsResponse {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            role: user.role,
            permissions: user.role.capabilities(),
        }
    }
}
