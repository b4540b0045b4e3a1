use actix_web::{HttpResponse, delete, get, patch, post, web};

use crate::auth::AuthenticatedUser;
use crate::forms::contacts::{ContactListParams, CreateContactForm, TagForm, UpdateContactForm};
use crate::repository::DieselRepository;
use crate::services::contacts::{self as contacts_service, ContactCache};
use crate::services::ServiceError;

#[get("/contacts/")]
pub async fn list_contacts(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Query(params): web::Query<ContactListParams>,
) -> Result<HttpResponse, ServiceError> {
    let page = contacts_service::list_contacts(repo.get_ref(), &user, params)?;
    Ok(HttpResponse::Ok().json(page))
}

#[post("/contacts/")]
pub async fn create_contact(
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    web::Json(form): web::Json<CreateContactForm>,
) -> Result<HttpResponse, ServiceError> {
    let contact = contacts_service::create_contact(repo.get_ref(), &user, form)?;
    Ok(HttpResponse::Created().json(contact))
}

#[get("/contacts/{contact_id}/")]
pub async fn show_contact(
    contact_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    cache: web::Data<ContactCache>,
) -> Result<HttpResponse, ServiceError> {
    let contact = contacts_service::get_contact(
        repo.get_ref(),
        cache.get_ref(),
        &user,
        contact_id.into_inner(),
    )?;
    Ok(HttpResponse::Ok().json(contact))
}

#[patch("/contacts/{contact_id}/")]
pub async fn update_contact(
    contact_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    cache: web::Data<ContactCache>,
    web::Json(form): web::Json<UpdateContactForm>,
) -> Result<HttpResponse, ServiceError> {
    let contact = contacts_service::update_contact(
        repo.get_ref(),
        cache.get_ref(),
        &user,
        contact_id.into_inner(),
        form,
    )?;
    Ok(HttpResponse::Ok().json(contact))
}

#[delete("/contacts/{contact_id}/")]
pub async fn delete_contact(
    contact_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    cache: web::Data<ContactCache>,
) -> Result<HttpResponse, ServiceError> {
    contacts_service::delete_contact(
        repo.get_ref(),
        cache.get_ref(),
        &user,
        contact_id.into_inner(),
    )?;
    Ok(HttpResponse::NoContent().finish())
}

#[post("/contacts/{contact_id}/restore/")]
pub async fn restore_contact(
    contact_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    cache: web::Data<ContactCache>,
) -> Result<HttpResponse, ServiceError> {
    let contact = contacts_service::restore_contact(
        repo.get_ref(),
        cache.get_ref(),
        &user,
        contact_id.into_inner(),
    )?;
    Ok(HttpResponse::Ok().json(contact))
}

#[post("/contacts/{contact_id}/tags/")]
pub async fn add_tag(
    contact_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    cache: web::Data<ContactCache>,
    web::Json(form): web::Json<TagForm>,
) -> Result<HttpResponse, ServiceError> {
    let contact = contacts_service::add_tag(
        repo.get_ref(),
        cache.get_ref(),
        &user,
        contact_id.into_inner(),
        form,
    )?;
    Ok(HttpResponse::Ok().json(contact))
}

#[delete("/contacts/{contact_id}/tags/{tag}/")]
pub async fn remove_tag(
    path: web::Path<(i32, String)>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    cache: web::Data<ContactCache>,
) -> Result<HttpResponse, ServiceError> {
    let (contact_id, tag) = path.into_inner();
    let contact =
        contacts_service::remove_tag(repo.get_ref(), cache.get_ref(), &user, contact_id, &tag)?;
    Ok(HttpResponse::Ok().json(contact))
}

#[get("/contacts/{contact_id}/deals-summary/")]
pub async fn deals_summary(
    contact_id: web::Path<i32>,
    user: AuthenticatedUser,
    repo: web::Data<DieselRepository>,
    cache: web::Data<ContactCache>,
) -> Result<HttpResponse, ServiceError> {
    let summary = contacts_service::deals_summary(
        repo.get_ref(),
        cache.get_ref(),
        &user,
        contact_id.into_inner(),
    )?;
    Ok(HttpResponse::Ok().json(summary))
}
