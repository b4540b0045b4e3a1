use actix_web::{HttpResponse, delete, get, patch, post, web};

use crate::auth::AuthenticatedUser;
use crate::forms::deals::{
    CloseLostForm, CloseWonForm, CreateDealForm, DealListParams, StageForm, UpdateDealForm,
};
use crate::repository::DieselRepository;
use crate::services::ServiceError;
use crate::services::deals::{self as deals_service, DealCache};

#[get("/deals/")]
pub async fn list_deals(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Query(params): web::Query<DealListParams>,
) -> Result<HttpResponse, ServiceError> {
    let page = deals_service::list_deals(repo.get_ref(), &user, params)?;
    Ok(HttpResponse::Ok().json(page))
}

#[post("/deals/")]
pub async fn create_deal(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Json(form): web::Json<CreateDealForm>,
) -> Result<HttpResponse, ServiceError> {
    let deal = deals_service::create_deal(repo.get_ref(), &user, form)?;
    Ok(HttpResponse::Created().json(deal))
}

#[get("/deals/pipeline/")]
pub async fn pipeline(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
) -> Result<HttpResponse, ServiceError> {
    let pipeline = deals_service::pipeline(repo.get_ref(), &user)?;
    Ok(HttpResponse::Ok().json(pipeline))
}

#[get("/deals/{deal_id}/")]
pub async fn show_deal(
    deal_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    cache: web::Data<DealCache>,
) -> Result<HttpResponse, ServiceError> {
    let deal =
        deals_service::get_deal(repo.get_ref(), cache.get_ref(), &user, deal_id.into_inner())?;
    Ok(HttpResponse::Ok().json(deal))
}

#[patch("/deals/{deal_id}/")]
pub async fn update_deal(
    deal_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    cache: web::Data<DealCache>,
    web::Json(form): web::Json<UpdateDealForm>,
) -> Result<HttpResponse, ServiceError> {
    let deal = deals_service::update_deal(
        repo.get_ref(),
        cache.get_ref(),
        &user,
        deal_id.into_inner(),
        form,
    )?;
    Ok(HttpResponse::Ok().json(deal))
}

#[delete("/deals/{deal_id}/")]
pub async fn delete_deal(
    deal_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    cache: web::Data<DealCache>,
) -> Result<HttpResponse, ServiceError> {
    deals_service::delete_deal(repo.get_ref(), cache.get_ref(), &user, deal_id.into_inner())?;
    Ok(HttpResponse::NoContent().finish())
}

#[post("/deals/{deal_id}/stage/")]
pub async fn change_stage(
    deal_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    cache: web::Data<DealCache>,
    web::Json(form): web::Json<StageForm>,
) -> Result<HttpResponse, ServiceError> {
    let deal = deals_service::change_stage(
        repo.get_ref(),
        cache.get_ref(),
        &user,
        deal_id.into_inner(),
        form,
    )?;
    Ok(HttpResponse::Ok().json(deal))
}

#[post("/deals/{deal_id}/close-won/")]
pub async fn close_won(
    deal_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    cache: web::Data<DealCache>,
    form: Option<web::Json<CloseWonForm>>,
) -> Result<HttpResponse, ServiceError> {
    let form = form.map(web::Json::into_inner).unwrap_or_default();
    let deal = deals_service::close_won(
        repo.get_ref(),
        cache.get_ref(),
        &user,
        deal_id.into_inner(),
        form,
    )?;
    Ok(HttpResponse::Ok().json(deal))
}

#[post("/deals/{deal_id}/close-lost/")]
pub async fn close_lost(
    deal_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    cache: web::Data<DealCache>,
    web::Json(form): web::Json<CloseLostForm>,
) -> Result<HttpResponse, ServiceError> {
    let deal = deals_service::close_lost(
        repo.get_ref(),
        cache.get_ref(),
        &user,
        deal_id.into_inner(),
        form,
    )?;
    Ok(HttpResponse::Ok().json(deal))
}

#[get("/deals/{deal_id}/history/")]
pub async fn stage_history(
    deal_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    cache: web::Data<DealCache>,
) -> Result<HttpResponse, ServiceError> {
    let history =
        deals_service::stage_history(repo.get_ref(), cache.get_ref(), &user, deal_id.into_inner())?;
    Ok(HttpResponse::Ok().json(history))
}
