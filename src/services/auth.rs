//! Registration, login and token lifecycle.

use validator::Validate;

use crate::auth::{
    AuthenticatedUser, TokenIssuer, TokenKind, hash_password, validate_password_policy,
    verify_password,
};
use crate::domain::user::NewUser;
use crate::dto::MessageResponse;
use crate::dto::users::{AccessTokenResponse, LoginResponse, UserResponse};
use crate::forms::FormError;
use crate::forms::auth::{LoginForm, RefreshTokenForm, RegisterForm, Registration};
use crate::rate_limit::RateLimiter;
use crate::repository::{TokenStore, UserReader, UserWriter};
use crate::services::errors::ErrorDetail;
use crate::services::{ServiceError, ServiceResult, now};

const INVALID_CREDENTIALS: &str = "Invalid email or password.";
const ACCOUNT_DISABLED: &str = "User account is disabled.";

/// Fails with field details when the password breaks the policy.
pub(crate) fn check_password_policy(
    field: &str,
    password: &str,
    email: &str,
) -> ServiceResult<()> {
    let problems = validate_password_policy(password, email);
    if problems.is_empty() {
        return Ok(());
    }
    Err(ServiceError::Validation(
        problems
            .into_iter()
            .map(|message| ErrorDetail::field(field, message))
            .collect(),
    ))
}

pub fn register<R>(repo: &R, form: RegisterForm) -> ServiceResult<UserResponse>
where
    R: UserReader + UserWriter + ?Sized,
{
    let registration = Registration::try_from(form)?;
    check_password_policy(
        "password",
        &registration.password,
        registration.email.as_str(),
    )?;

    if repo.get_user_by_email(&registration.email)?.is_some() {
        return Err(ServiceError::Validation(vec![ErrorDetail::field(
            "email",
            "A user with this email already exists.",
        )]));
    }

    let password_hash = hash_password(&registration.password)?;
    let new_user = NewUser::new(
        registration.email,
        password_hash,
        registration.first_name,
        registration.last_name,
        registration.role,
    )
    .with_phone(registration.phone)
    .with_department(registration.department);

    let user = repo.create_user(&new_user)?;
    log::info!("Registered user {} with role {}", user.id, user.role);
    Ok(user.into())
}

/// Checks credentials and issues an access/refresh token pair.
///
/// `client_key` identifies the caller for throttling, normally its IP.
pub fn login<R>(
    repo: &R,
    issuer: &TokenIssuer,
    limiter: &RateLimiter,
    client_key: &str,
    form: LoginForm,
) -> ServiceResult<LoginResponse>
where
    R: UserReader + UserWriter + ?Sized,
{
    limiter.check(client_key).inspect_err(|_| {
        log::warn!("Login rate limit exceeded for {client_key}");
    })?;
    form.validate().map_err(FormError::from)?;

    let invalid = || ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string());
    let email = form.email().ok_or_else(invalid)?;
    let credentials = repo.get_credentials_by_email(&email)?.ok_or_else(invalid)?;
    if !verify_password(&form.password, &credentials.password_hash) {
        log::info!("Failed login for {email}");
        return Err(invalid());
    }

    let mut user = credentials.user;
    if !user.is_active {
        return Err(ServiceError::Unauthorized(ACCOUNT_DISABLED.to_string()));
    }

    let logged_in_at = now();
    repo.touch_last_login(user.id, logged_in_at)?;
    user.last_login = Some(logged_in_at);

    let tokens = issuer.issue_pair(&user)?;
    log::info!("User {} logged in", user.id);
    Ok(LoginResponse::new(tokens, user))
}

/// Revokes the caller's refresh token.
pub fn logout<R>(
    repo: &R,
    issuer: &TokenIssuer,
    user: &AuthenticatedUser,
    form: RefreshTokenForm,
) -> ServiceResult<MessageResponse>
where
    R: TokenStore + ?Sized,
{
    let token = form
        .token()
        .ok_or_else(|| ServiceError::Form("Refresh token is required.".into()))?;
    let invalid = || ServiceError::Form("Invalid refresh token.".into());

    let claims = issuer
        .verify(token, TokenKind::Refresh)
        .map_err(|_| invalid())?;
    if claims.user_id().map_err(|_| invalid())? != user.id {
        return Err(invalid());
    }

    repo.revoke_token(&claims.jti, user.id)?;
    log::info!("User {} logged out", user.id);
    Ok(MessageResponse::new("Successfully logged out."))
}

/// Exchanges a live refresh token for a new access token.
pub fn refresh<R>(
    repo: &R,
    issuer: &TokenIssuer,
    form: RefreshTokenForm,
) -> ServiceResult<AccessTokenResponse>
where
    R: TokenStore + UserReader + ?Sized,
{
    let token = form
        .token()
        .ok_or_else(|| ServiceError::Form("Refresh token is required.".into()))?;
    let claims = issuer.verify(token, TokenKind::Refresh)?;
    if repo.is_token_revoked(&claims.jti)? {
        return Err(ServiceError::Unauthorized("Token has been revoked.".into()));
    }

    let user = repo
        .get_user_by_id(claims.user_id()?)?
        .filter(|user| user.is_active)
        .ok_or_else(|| ServiceError::Unauthorized(ACCOUNT_DISABLED.to_string()))?;

    let (access_token, _) = issuer.issue(&user, TokenKind::Access)?;
    Ok(AccessTokenResponse {
        access_token,
        token_type: "Bearer",
        expires_in: issuer.access_ttl().num_seconds(),
    })
}

#[cfg(all(test, feature = "test-mocks"))]
mod tests {
    use std::time::Duration as StdDuration;

    use chrono::Duration;

    use super::*;
    use crate::domain::user::{UserCredentials, UserRole};
    use crate::fixtures;
    use crate::repository::mock::MockRepository;
    use crate::services::principal;

    fn issuer() -> TokenIssuer {
        TokenIssuer::new("unit-test-secret", Duration::minutes(5), Duration::days(1))
    }

    fn limiter() -> RateLimiter {
        RateLimiter::new(5, StdDuration::from_secs(60))
    }

    fn register_form(password: &str) -> RegisterForm {
        RegisterForm {
            email: "new@example.com".into(),
            password: password.into(),
            password_confirm: password.into(),
            first_name: "New".into(),
            last_name: "Person".into(),
            role: None,
            phone: None,
            department: None,
        }
    }

    fn login_form(password: &str) -> LoginForm {
        LoginForm {
            email: "user1@example.com".into(),
            password: password.into(),
        }
    }

    fn credentials(password: &str, active: bool) -> UserCredentials {
        let mut user = fixtures::user(1, UserRole::Sales);
        user.is_active = active;
        UserCredentials {
            user,
            password_hash: hash_password(password).unwrap(),
        }
    }

    #[test]
    fn register_creates_sales_user() {
        let mut repo = MockRepository::new();
        repo.expect_get_user_by_email().returning(|_| Ok(None));
        repo.expect_create_user()
            .withf(|new_user| {
                new_user.role == UserRole::Sales
                    && verify_password("s3cure-pass", &new_user.password_hash)
            })
            .times(1)
            .returning(|_| Ok(fixtures::user(9, UserRole::Sales)));

        let user = register(&repo, register_form("s3cure-pass")).unwrap();
        assert_eq!(user.id.get(), 9);
    }

    #[test]
    fn register_rejects_weak_password_and_duplicates() {
        let repo = MockRepository::new();
        let err = register(&repo, register_form("password")).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref d) if d[0].field.as_deref() == Some("password")));

        let mut repo = MockRepository::new();
        repo.expect_get_user_by_email()
            .returning(|_| Ok(Some(fixtures::user(2, UserRole::Sales))));
        let err = register(&repo, register_form("s3cure-pass")).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref d) if d[0].field.as_deref() == Some("email")));
    }

    #[test]
    fn login_issues_tokens_and_touches_last_login() {
        let mut repo = MockRepository::new();
        repo.expect_get_credentials_by_email()
            .returning(|_| Ok(Some(credentials("s3cure-pass", true))));
        repo.expect_touch_last_login().times(1).returning(|_, _| Ok(()));

        let issuer = issuer();
        let response = login(&repo, &issuer, &limiter(), "127.0.0.1", login_form("s3cure-pass"))
            .unwrap();
        assert!(response.user.last_login.is_some());
        let claims = issuer
            .verify(&response.refresh_token, TokenKind::Refresh)
            .unwrap();
        assert_eq!(claims.sub, "1");
    }

    #[test]
    fn login_rejects_bad_password_and_inactive_users() {
        let mut repo = MockRepository::new();
        repo.expect_get_credentials_by_email()
            .returning(|_| Ok(Some(credentials("s3cure-pass", true))));
        let err = login(&repo, &issuer(), &limiter(), "ip", login_form("wrong-pass1")).unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(ref m) if m == INVALID_CREDENTIALS));

        let mut repo = MockRepository::new();
        repo.expect_get_credentials_by_email()
            .returning(|_| Ok(Some(credentials("s3cure-pass", false))));
        let err = login(&repo, &issuer(), &limiter(), "ip", login_form("s3cure-pass")).unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(ref m) if m == ACCOUNT_DISABLED));
    }

    #[test]
    fn login_is_throttled_per_client() {
        let mut repo = MockRepository::new();
        repo.expect_get_credentials_by_email().returning(|_| Ok(None));
        let limiter = RateLimiter::new(2, StdDuration::from_secs(60));
        for _ in 0..2 {
            let err = login(&repo, &issuer(), &limiter, "10.0.0.1", login_form("x1")).unwrap_err();
            assert!(matches!(err, ServiceError::Unauthorized(_)));
        }
        let err = login(&repo, &issuer(), &limiter, "10.0.0.1", login_form("x1")).unwrap_err();
        assert!(matches!(err, ServiceError::RateLimited { .. }));
        assert!(login(&repo, &issuer(), &limiter, "10.0.0.2", login_form("x1")).is_err());
    }

    #[test]
    fn logout_revokes_refresh_token() {
        let issuer = issuer();
        let user = fixtures::user(1, UserRole::Sales);
        let (token, claims) = issuer.issue(&user, TokenKind::Refresh).unwrap();

        let mut repo = MockRepository::new();
        let jti = claims.jti.clone();
        repo.expect_revoke_token()
            .withf(move |id, owner| id == jti && owner.get() == 1)
            .times(1)
            .returning(|_, _| Ok(()));

        let form = RefreshTokenForm {
            refresh_token: Some(token),
        };
        let response = logout(&repo, &issuer, &principal(1, UserRole::Sales), form).unwrap();
        assert_eq!(response.message, "Successfully logged out.");
    }

    #[test]
    fn logout_requires_a_valid_token() {
        let repo = MockRepository::new();
        let err = logout(
            &repo,
            &issuer(),
            &principal(1, UserRole::Sales),
            RefreshTokenForm::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::Form(ref m) if m == "Refresh token is required."));

        let form = RefreshTokenForm {
            refresh_token: Some("garbage".into()),
        };
        let err = logout(&repo, &issuer(), &principal(1, UserRole::Sales), form).unwrap_err();
        assert!(matches!(err, ServiceError::Form(ref m) if m == "Invalid refresh token."));
    }

    #[test]
    fn refresh_rejects_revoked_tokens() {
        let issuer = issuer();
        let user = fixtures::user(1, UserRole::Sales);
        let (token, _) = issuer.issue(&user, TokenKind::Refresh).unwrap();

        let mut repo = MockRepository::new();
        repo.expect_is_token_revoked().returning(|_| Ok(true));
        let form = RefreshTokenForm {
            refresh_token: Some(token.clone()),
        };
        assert!(matches!(
            refresh(&repo, &issuer, form),
            Err(ServiceError::Unauthorized(_))
        ));

        let mut repo = MockRepository::new();
        repo.expect_is_token_revoked().returning(|_| Ok(false));
        repo.expect_get_user_by_id()
            .returning(|_| Ok(Some(fixtures::user(1, UserRole::Sales))));
        let form = RefreshTokenForm {
            refresh_token: Some(token),
        };
        let response = refresh(&repo, &issuer, form).unwrap();
        assert!(issuer.verify(&response.access_token, TokenKind::Access).is_ok());
    }
}
