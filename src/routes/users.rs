use actix_web::{HttpResponse, get, patch, post, web};

use crate::auth::AuthenticatedUser;
use crate::forms::auth::ChangePasswordForm;
use crate::forms::users::{UpdateProfileForm, UserListParams};
use crate::repository::DieselRepository;
use crate::services::{ServiceError, users as users_service};

#[get("/auth/users/")]
pub async fn list_users(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Query(params): web::Query<UserListParams>,
) -> Result<HttpResponse, ServiceError> {
    let page = users_service::list_users(repo.get_ref(), &user, params)?;
    Ok(HttpResponse::Ok().json(page))
}

#[get("/auth/users/me/")]
pub async fn show_me(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> Result<HttpResponse, ServiceError> {
    let me = users_service::current_user(repo.get_ref(), &user)?;
    Ok(HttpResponse::Ok().json(me))
}

#[patch("/auth/users/me/")]
pub async fn update_me(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Json(form): web::Json<UpdateProfileForm>,
) -> Result<HttpResponse, ServiceError> {
    let me = users_service::update_current_user(repo.get_ref(), &user, form)?;
    Ok(HttpResponse::Ok().json(me))
}

#[get("/auth/users/{user_id}/")]
pub async fn show_user(
    user_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> Result<HttpResponse, ServiceError> {
    let found = users_service::get_user(repo.get_ref(), &user, user_id.into_inner())?;
    Ok(HttpResponse::Ok().json(found))
}

#[post("/auth/users/{user_id}/change-password/")]
pub async fn change_password(
    user_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Json(form): web::Json<ChangePasswordForm>,
) -> Result<HttpResponse, ServiceError> {
    let message =
        users_service::change_password(repo.get_ref(), &user, user_id.into_inner(), form)?;
    Ok(HttpResponse::Ok().json(message))
}

#[post("/auth/users/{user_id}/deactivate/")]
pub async fn deactivate_user(
    user_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> Result<HttpResponse, ServiceError> {
    let message = users_service::deactivate_user(repo.get_ref(), &user, user_id.into_inner())?;
    Ok(HttpResponse::Ok().json(message))
}

#[post("/auth/users/{user_id}/activate/")]
pub async fn activate_user(
    user_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> Result<HttpResponse, ServiceError> {
    let message = users_service::activate_user(repo.get_ref(), &user, user_id.into_inner())?;
    Ok(HttpResponse::Ok().json(message))
}

#[get("/auth/users/{user_id}/permissions/")]
pub async fn user_permissions(
    user_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> Result<HttpResponse, ServiceError> {
    let permissions =
        users_service::user_permissions(repo.get_ref(), &user, user_id.into_inner())?;
    Ok(HttpResponse::Ok().json(permissions))
}
