use actix_web::{HttpRequest, HttpResponse, post, web};

use crate::auth::{AuthenticatedUser, TokenIssuer};
use crate::forms::auth::{LoginForm, RefreshTokenForm, RegisterForm};
use crate::rate_limit::RateLimiter;
use crate::repository::DieselRepository;
use crate::services::{ServiceError, auth as auth_service};

/// Rate-limit key: the peer address, proxies are not trusted.
fn client_key(req: &HttpRequest) -> String {
    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[post("/auth/register/")]
pub async fn register(
    repo: web::Data<DieselRepository>,
    web::Json(form): web::Json<RegisterForm>,
) -> Result<HttpResponse, ServiceError> {
    let user = auth_service::register(repo.get_ref(), form)?;
    Ok(HttpResponse::Created().json(user))
}

#[post("/auth/login/")]
pub async fn login(
    req: HttpRequest,
    repo: web::Data<DieselRepository>,
    issuer: web::Data<TokenIssuer>,
    limiter: web::Data<RateLimiter>,
    web::Json(form): web::Json<LoginForm>,
) -> Result<HttpResponse, ServiceError> {
    let response = auth_service::login(
        repo.get_ref(),
        issuer.get_ref(),
        limiter.get_ref(),
        &client_key(&req),
        form,
    )?;
    Ok(HttpResponse::Ok().json(response))
}

#[post("/auth/logout/")]
pub async fn logout(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    issuer: web::Data<TokenIssuer>,
    web::Json(form): web::Json<RefreshTokenForm>,
) -> Result<HttpResponse, ServiceError> {
    let message = auth_service::logout(repo.get_ref(), issuer.get_ref(), &user, form)?;
    Ok(HttpResponse::Ok().json(message))
}

#[post("/auth/refresh/")]
pub async fn refresh(
    repo: web::Data<DieselRepository>,
    issuer: web::Data<TokenIssuer>,
    web::Json(form): web::Json<RefreshTokenForm>,
) -> Result<HttpResponse, ServiceError> {
    let response = auth_service::refresh(repo.get_ref(), issuer.get_ref(), form)?;
    Ok(HttpResponse::Ok().json(response))
}
