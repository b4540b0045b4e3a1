//! Token issuing, password hashing and the bearer-token extractor.

use std::future::{Ready, ready};

use actix_web::http::header;
use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::types::UserId;
use crate::domain::user::{User, UserRole};
use crate::models::config::ServerConfig;
use crate::repository::{DieselRepository, UserReader};
use crate::services::errors::ServiceError;

pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authentication credentials were not provided.")]
    MissingToken,
    #[error("Token is invalid or expired.")]
    InvalidToken,
    #[error("Token has wrong type.")]
    WrongTokenKind,
    #[error("Token could not be issued: {0}")]
    Issue(String),
    #[error("Password hashing failed: {0}")]
    Hashing(String),
    #[error("User not found.")]
    UnknownUser,
    #[error("User account is disabled.")]
    InactiveUser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT payload shared by access and refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// User id as a decimal string.
    pub sub: String,
    pub email: String,
    pub role: UserRole,
    pub typ: TokenKind,
    /// Unique token id, used to revoke refresh tokens.
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Result<UserId, AuthError> {
        self.sub
            .parse::<i32>()
            .ok()
            .and_then(|id| UserId::new(id).ok())
            .ok_or(AuthError::InvalidToken)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

/// Signs and verifies HS256 tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(
            &config.secret,
            Duration::minutes(config.access_token_ttl_minutes),
            Duration::days(config.refresh_token_ttl_days),
        )
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn issue(&self, user: &User, kind: TokenKind) -> Result<(String, Claims), AuthError> {
        let now = Utc::now();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let claims = Claims {
            sub: user.id.get().to_string(),
            email: user.email.to_string(),
            role: user.role,
            typ: kind,
            jti: Uuid::new_v4().simple().to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Issue(e.to_string()))?;
        Ok((token, claims))
    }

    pub fn issue_pair(&self, user: &User) -> Result<TokenPair, AuthError> {
        let (access_token, _) = self.issue(user, TokenKind::Access)?;
        let (refresh_token, _) = self.issue(user, TokenKind::Refresh)?;
        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer",
            expires_in: self.access_ttl.num_seconds(),
        })
    }

    /// Verifies signature and expiry and checks the token type.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            log::debug!("Rejected token: {e}");
            AuthError::InvalidToken
        })?;
        if data.claims.typ != expected {
            return Err(AuthError::WrongTokenKind);
        }
        Ok(data.claims)
    }
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Returns `false` for a wrong password and for an unparsable hash.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            log::warn!("Stored password hash is malformed: {e}");
            false
        }
    }
}

/// Collects every password rule the candidate breaks.
pub fn validate_password_policy(password: &str, email: &str) -> Vec<String> {
    let mut problems = Vec::new();
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        problems.push(format!(
            "This password is too short. It must contain at least {MIN_PASSWORD_LENGTH} characters."
        ));
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        problems.push("This password is entirely numeric.".to_string());
    } else if !password.chars().any(|c| c.is_ascii_digit()) {
        problems.push("This password must contain at least one digit.".to_string());
    }
    if !password.chars().any(char::is_alphabetic) && !password.is_empty() {
        problems.push("This password must contain at least one letter.".to_string());
    }
    let local_part = email.split('@').next().unwrap_or_default();
    if password.eq_ignore_ascii_case(email)
        || (!local_part.is_empty() && password.eq_ignore_ascii_case(local_part))
    {
        problems.push("The password is too similar to the email address.".to_string());
    }
    problems
}

/// Identity taken from a valid access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: UserId,
    pub email: String,
    pub role: UserRole,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn can_view_all(&self) -> bool {
        self.role.can_view_all()
    }

    pub fn can_edit_all(&self) -> bool {
        self.role.can_edit_all()
    }

    /// Owner filter to apply to listings, `None` when the user sees everything.
    pub fn visible_owner(&self) -> Option<UserId> {
        if self.can_view_all() {
            None
        } else {
            Some(self.id)
        }
    }
}

impl From<&User> for AuthenticatedUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.as_str().to_string(),
            role: user.role,
        }
    }
}

/// Reloads the token's subject so deactivation and role changes apply at once.
pub fn resolve_principal<R>(repo: &R, claims: &Claims) -> Result<AuthenticatedUser, ServiceError>
where
    R: UserReader + ?Sized,
{
    let user = repo
        .get_user_by_id(claims.user_id()?)?
        .ok_or(AuthError::UnknownUser)?;
    if !user.is_active {
        return Err(AuthError::InactiveUser.into());
    }
    Ok(AuthenticatedUser::from(&user))
}

pub fn bearer_token(req: &HttpRequest) -> Result<&str, AuthError> {
    let value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AuthError::MissingToken)?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::InvalidToken)
}

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedUser, ServiceError> {
    let issuer = req
        .app_data::<web::Data<TokenIssuer>>()
        .ok_or_else(|| ServiceError::Internal("token issuer is not configured".into()))?;
    let token = bearer_token(req)?;
    let claims = issuer.verify(token, TokenKind::Access)?;
    let repo = req
        .app_data::<web::Data<DieselRepository>>()
        .ok_or_else(|| ServiceError::Internal("repository is not configured".into()))?;
    resolve_principal(repo.get_ref(), &claims)
}

impl FromRequest for AuthenticatedUser {
    type Error = ServiceError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}
