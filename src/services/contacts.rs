//! Contact management with cached single-contact reads.

use std::time::Duration;

use crate::auth::AuthenticatedUser;
use crate::cache::SimpleCache;
use crate::domain::contact::{Contact, ContactDealSummary, ContactPatch};
use crate::domain::types::{ContactId, Tag};
use crate::dto::contacts::ContactResponse;
use crate::forms::contacts::{ContactListParams, CreateContactForm, TagForm, UpdateContactForm};
use crate::forms::parse_field;
use crate::pagination::Paginated;
use crate::repository::{ContactListQuery, ContactReader, ContactWriter};
use crate::services::errors::ErrorDetail;
use crate::services::{ServiceError, ServiceResult, ensure_can_edit, ensure_can_view, now};

pub type ContactCache = SimpleCache<Contact>;

pub const CONTACT_CACHE_PREFIX: &str = "contact_";

pub fn contact_cache(ttl: Duration) -> ContactCache {
    SimpleCache::new(CONTACT_CACHE_PREFIX, ttl)
}

fn duplicate_email() -> ServiceError {
    ServiceError::Validation(vec![ErrorDetail::field(
        "email",
        "A contact with this email already exists.",
    )])
}

/// Loads a visible contact, going through the cache for live records.
fn load_contact<R>(
    repo: &R,
    cache: &ContactCache,
    user: &AuthenticatedUser,
    id: ContactId,
) -> ServiceResult<Contact>
where
    R: ContactReader + ?Sized,
{
    let contact = cache
        .get_or_fetch(&id.to_string(), || repo.get_contact_by_id(id, false))?
        .ok_or_else(|| ServiceError::not_found("Contact"))?;
    ensure_can_view(user, contact.owner_id, "Contact")?;
    Ok(contact)
}

/// Loads a contact for modification, bypassing the cache.
fn load_for_edit<R>(
    repo: &R,
    user: &AuthenticatedUser,
    id: ContactId,
    include_deleted: bool,
) -> ServiceResult<Contact>
where
    R: ContactReader + ?Sized,
{
    let contact = repo
        .get_contact_by_id(id, include_deleted)?
        .ok_or_else(|| ServiceError::not_found("Contact"))?;
    ensure_can_edit(user, contact.owner_id, "Contact")?;
    Ok(contact)
}

pub fn list_contacts<R>(
    repo: &R,
    user: &AuthenticatedUser,
    params: ContactListParams,
) -> ServiceResult<Paginated<ContactResponse>>
where
    R: ContactReader + ?Sized,
{
    let paging = params.paging();
    let mut query = ContactListQuery::new().paginate(paging.page(), paging.per_page());
    if let Some(owner_id) = user.visible_owner() {
        query = query.owner(owner_id);
    }
    if let Some(term) = params.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        query = query.search(term);
    }
    if let Some(company) = params.company.as_deref().filter(|c| !c.trim().is_empty()) {
        query = query.company(company);
    }
    if let Some(tag) = params.tag()? {
        query = query.tag(tag);
    }
    if let Some(is_active) = params.is_active {
        query = query.is_active(is_active);
    }
    if params.include_deleted && user.is_admin() {
        query = query.include_deleted();
    }

    let (total, contacts) = repo.list_contacts(query)?;
    Ok(
        Paginated::new(contacts, paging.page(), paging.per_page(), total)
            .map(ContactResponse::from),
    )
}

pub fn create_contact<R>(
    repo: &R,
    user: &AuthenticatedUser,
    form: CreateContactForm,
) -> ServiceResult<ContactResponse>
where
    R: ContactReader + ContactWriter + ?Sized,
{
    let new_contact = form.into_new_contact(user.id)?;
    if repo.get_contact_by_email(&new_contact.email)?.is_some() {
        return Err(duplicate_email());
    }
    let contact = repo.create_contact(&new_contact)?;
    log::info!("Contact {} created by user {}", contact.id, user.id);
    Ok(contact.into())
}

pub fn get_contact<R>(
    repo: &R,
    cache: &ContactCache,
    user: &AuthenticatedUser,
    id: i32,
) -> ServiceResult<ContactResponse>
where
    R: ContactReader + ?Sized,
{
    Ok(load_contact(repo, cache, user, ContactId::new(id)?)?.into())
}

pub fn update_contact<R>(
    repo: &R,
    cache: &ContactCache,
    user: &AuthenticatedUser,
    id: i32,
    form: UpdateContactForm,
) -> ServiceResult<ContactResponse>
where
    R: ContactReader + ContactWriter + ?Sized,
{
    let id = ContactId::new(id)?;
    let patch = ContactPatch::try_from(form)?;
    let contact = load_for_edit(repo, user, id, false)?;

    if let Some(email) = patch.email.as_ref().filter(|email| **email != contact.email) {
        if repo.get_contact_by_email(email)?.is_some() {
            return Err(duplicate_email());
        }
    }

    let updated = repo.update_contact(&patch.apply(contact, now()))?;
    cache.delete(&id.to_string());
    Ok(updated.into())
}

/// Soft-deletes the contact.
pub fn delete_contact<R>(
    repo: &R,
    cache: &ContactCache,
    user: &AuthenticatedUser,
    id: i32,
) -> ServiceResult<()>
where
    R: ContactReader + ContactWriter + ?Sized,
{
    let id = ContactId::new(id)?;
    load_for_edit(repo, user, id, false)?;
    repo.soft_delete_contact(id, now())?;
    cache.delete(&id.to_string());
    log::info!("Contact {id} deleted by user {}", user.id);
    Ok(())
}

pub fn restore_contact<R>(
    repo: &R,
    cache: &ContactCache,
    user: &AuthenticatedUser,
    id: i32,
) -> ServiceResult<ContactResponse>
where
    R: ContactReader + ContactWriter + ?Sized,
{
    let id = ContactId::new(id)?;
    let contact = load_for_edit(repo, user, id, true)?;
    if !contact.is_deleted {
        return Err(ServiceError::BusinessRule("Contact is not deleted.".into()));
    }
    let restored = repo.restore_contact(id, now())?;
    cache.delete(&id.to_string());
    Ok(restored.into())
}

pub fn add_tag<R>(
    repo: &R,
    cache: &ContactCache,
    user: &AuthenticatedUser,
    id: i32,
    form: TagForm,
) -> ServiceResult<ContactResponse>
where
    R: ContactReader + ContactWriter + ?Sized,
{
    let id = ContactId::new(id)?;
    let tag = form.tag()?;
    let mut contact = load_for_edit(repo, user, id, false)?;
    if !contact.add_tag(tag) {
        return Ok(contact.into());
    }
    let updated = repo.set_contact_tags(id, &contact.tags)?;
    cache.delete(&id.to_string());
    Ok(updated.into())
}

pub fn remove_tag<R>(
    repo: &R,
    cache: &ContactCache,
    user: &AuthenticatedUser,
    id: i32,
    tag: &str,
) -> ServiceResult<ContactResponse>
where
    R: ContactReader + ContactWriter + ?Sized,
{
    let id = ContactId::new(id)?;
    let tag = parse_field("tag", Tag::new(tag))?;
    let mut contact = load_for_edit(repo, user, id, false)?;
    if !contact.remove_tag(&tag) {
        return Err(ServiceError::NotFound(format!(
            "Tag `{tag}` is not set on this contact."
        )));
    }
    let updated = repo.set_contact_tags(id, &contact.tags)?;
    cache.delete(&id.to_string());
    Ok(updated.into())
}

pub fn deals_summary<R>(
    repo: &R,
    cache: &ContactCache,
    user: &AuthenticatedUser,
    id: i32,
) -> ServiceResult<ContactDealSummary>
where
    R: ContactReader + ?Sized,
{
    let contact = load_contact(repo, cache, user, ContactId::new(id)?)?;
    Ok(repo.contact_deal_summary(contact.id)?)
}
