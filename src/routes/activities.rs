use actix_web::{HttpResponse, delete, get, patch, post, web};

use crate::auth::AuthenticatedUser;
use crate::forms::activities::{
    ActivityListParams, CompleteForm, CreateActivityForm, RescheduleForm, SnoozeForm,
    UpdateActivityForm,
};
use crate::pagination::PageParams;
use crate::repository::DieselRepository;
use crate::services::{ServiceError, activities as activities_service};

#[get("/activities/")]
pub async fn list_activities(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Query(params): web::Query<ActivityListParams>,
) -> Result<HttpResponse, ServiceError> {
    let page = activities_service::list_activities(repo.get_ref(), &user, params)?;
    Ok(HttpResponse::Ok().json(page))
}

#[post("/activities/")]
pub async fn create_activity(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Json(form): web::Json<CreateActivityForm>,
) -> Result<HttpResponse, ServiceError> {
    let activity = activities_service::create_activity(repo.get_ref(), &user, form)?;
    Ok(HttpResponse::Created().json(activity))
}

#[get("/activities/upcoming/")]
pub async fn upcoming_activities(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Query(paging): web::Query<PageParams>,
) -> Result<HttpResponse, ServiceError> {
    let page = activities_service::upcoming_activities(repo.get_ref(), &user, paging)?;
    Ok(HttpResponse::Ok().json(page))
}

#[get("/activities/overdue/")]
pub async fn overdue_activities(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Query(paging): web::Query<PageParams>,
) -> Result<HttpResponse, ServiceError> {
    let page = activities_service::overdue_activities(repo.get_ref(), &user, paging)?;
    Ok(HttpResponse::Ok().json(page))
}

#[get("/activities/{activity_id}/")]
pub async fn show_activity(
    activity_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> Result<HttpResponse, ServiceError> {
    let activity =
        activities_service::get_activity(repo.get_ref(), &user, activity_id.into_inner())?;
    Ok(HttpResponse::Ok().json(activity))
}

#[patch("/activities/{activity_id}/")]
pub async fn update_activity(
    activity_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Json(form): web::Json<UpdateActivityForm>,
) -> Result<HttpResponse, ServiceError> {
    let activity = activities_service::update_activity(
        repo.get_ref(),
        &user,
        activity_id.into_inner(),
        form,
    )?;
    Ok(HttpResponse::Ok().json(activity))
}

#[delete("/activities/{activity_id}/")]
pub async fn delete_activity(
    activity_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> Result<HttpResponse, ServiceError> {
    activities_service::delete_activity(repo.get_ref(), &user, activity_id.into_inner())?;
    Ok(HttpResponse::NoContent().finish())
}

#[post("/activities/{activity_id}/complete/")]
pub async fn complete_activity(
    activity_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    form: Option<web::Json<CompleteForm>>,
) -> Result<HttpResponse, ServiceError> {
    let form = form.map(web::Json::into_inner).unwrap_or_default();
    let activity = activities_service::complete_activity(
        repo.get_ref(),
        &user,
        activity_id.into_inner(),
        form,
    )?;
    Ok(HttpResponse::Ok().json(activity))
}

#[post("/activities/{activity_id}/cancel/")]
pub async fn cancel_activity(
    activity_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> Result<HttpResponse, ServiceError> {
    let activity =
        activities_service::cancel_activity(repo.get_ref(), &user, activity_id.into_inner())?;
    Ok(HttpResponse::Ok().json(activity))
}

#[post("/activities/{activity_id}/snooze/")]
pub async fn snooze_activity(
    activity_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Json(form): web::Json<SnoozeForm>,
) -> Result<HttpResponse, ServiceError> {
    let activity = activities_service::snooze_activity(
        repo.get_ref(),
        &user,
        activity_id.into_inner(),
        form,
    )?;
    Ok(HttpResponse::Ok().json(activity))
}

#[post("/activities/{activity_id}/reschedule/")]
pub async fn reschedule_activity(
    activity_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Json(form): web::Json<RescheduleForm>,
) -> Result<HttpResponse, ServiceError> {
    let activity = activities_service::reschedule_activity(
        repo.get_ref(),
        &user,
        activity_id.into_inner(),
        form,
    )?;
    Ok(HttpResponse::Ok().json(activity))
}
