//! Deal pipeline workflows.

use std::time::Duration;

use crate::auth::AuthenticatedUser;
use crate::cache::SimpleCache;
use crate::domain::deal::{Deal, DealPatch, DealStageHistory, StageChange};
use crate::domain::types::{ContactId, DealId};
use crate::dto::deals::{DealResponse, PipelineResponse};
use crate::forms::deals::{
    CloseLostForm, CloseWonForm, CreateDealForm, DealListParams, StageForm, UpdateDealForm,
};
use crate::pagination::Paginated;
use crate::repository::{ContactReader, DealListQuery, DealReader, DealWriter};
use crate::services::errors::ErrorDetail;
use crate::services::{ServiceError, ServiceResult, ensure_can_edit, ensure_can_view, now};

pub type DealCache = SimpleCache<Deal>;

pub const DEAL_CACHE_PREFIX: &str = "deal_";

pub fn deal_cache(ttl: Duration) -> DealCache {
    SimpleCache::new(DEAL_CACHE_PREFIX, ttl)
}

fn load_deal<R>(
    repo: &R,
    cache: &DealCache,
    user: &AuthenticatedUser,
    id: DealId,
) -> ServiceResult<Deal>
where
    R: DealReader + ?Sized,
{
    let deal = cache
        .get_or_fetch(&id.to_string(), || repo.get_deal_by_id(id))?
        .filter(|deal| !deal.is_archived)
        .ok_or_else(|| ServiceError::not_found("Deal"))?;
    ensure_can_view(user, deal.owner_id, "Deal")?;
    Ok(deal)
}

fn load_for_edit<R>(repo: &R, user: &AuthenticatedUser, id: DealId) -> ServiceResult<Deal>
where
    R: DealReader + ?Sized,
{
    let deal = repo
        .get_deal_by_id(id)?
        .filter(|deal| !deal.is_archived)
        .ok_or_else(|| ServiceError::not_found("Deal"))?;
    ensure_can_edit(user, deal.owner_id, "Deal")?;
    Ok(deal)
}

/// The linked contact must exist and be visible to the user.
fn check_contact<R>(repo: &R, user: &AuthenticatedUser, id: ContactId) -> ServiceResult<()>
where
    R: ContactReader + ?Sized,
{
    let visible = repo
        .get_contact_by_id(id, false)?
        .is_some_and(|contact| ensure_can_view(user, contact.owner_id, "Contact").is_ok());
    if visible {
        Ok(())
    } else {
        Err(ServiceError::Validation(vec![ErrorDetail::field(
            "contact_id",
            "Contact not found.",
        )]))
    }
}

fn save_stage_change<R>(
    repo: &R,
    cache: &DealCache,
    deal: &Deal,
    change: &StageChange,
) -> ServiceResult<DealResponse>
where
    R: DealWriter + ?Sized,
{
    let saved = repo.record_stage_change(deal, change)?;
    cache.delete(&deal.id.to_string());
    log::info!(
        "Deal {} moved from {} to {}",
        deal.id,
        change.old_stage.as_str(),
        change.new_stage.as_str()
    );
    Ok(saved.into())
}

pub fn list_deals<R>(
    repo: &R,
    user: &AuthenticatedUser,
    params: DealListParams,
) -> ServiceResult<Paginated<DealResponse>>
where
    R: DealReader + ?Sized,
{
    let paging = params.paging();
    let mut query = DealListQuery::new().paginate(paging.page(), paging.per_page());
    if let Some(owner_id) = user.visible_owner() {
        query = query.owner(owner_id);
    }
    if let Some(stage) = params.stage()? {
        query = query.stage(stage);
    }
    if let Some(contact_id) = params.contact()? {
        query = query.contact(contact_id);
    }
    if params.open {
        query = query.open_only();
    }
    if let Some(days) = params.closing_within_days {
        if days < 0 {
            return Err(ServiceError::Validation(vec![ErrorDetail::field(
                "closing_within_days",
                "Must be zero or positive.",
            )]));
        }
        query = query.closing_within_days(now().date(), days);
    }
    if let Some(term) = params.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        query = query.search(term);
    }

    let (total, deals) = repo.list_deals(query)?;
    let now = now();
    Ok(
        Paginated::new(deals, paging.page(), paging.per_page(), total)
            .map(|deal| DealResponse::at(deal, now)),
    )
}

pub fn create_deal<R>(
    repo: &R,
    user: &AuthenticatedUser,
    form: CreateDealForm,
) -> ServiceResult<DealResponse>
where
    R: DealWriter + ContactReader + ?Sized,
{
    let new_deal = form.into_new_deal(user.id)?;
    new_deal.validate(now().date())?;
    check_contact(repo, user, new_deal.contact_id)?;

    let deal = repo.create_deal(&new_deal)?;
    log::info!("Deal {} created by user {}", deal.id, user.id);
    Ok(deal.into())
}

pub fn get_deal<R>(
    repo: &R,
    cache: &DealCache,
    user: &AuthenticatedUser,
    id: i32,
) -> ServiceResult<DealResponse>
where
    R: DealReader + ?Sized,
{
    Ok(load_deal(repo, cache, user, DealId::new(id)?)?.into())
}

pub fn update_deal<R>(
    repo: &R,
    cache: &DealCache,
    user: &AuthenticatedUser,
    id: i32,
    form: UpdateDealForm,
) -> ServiceResult<DealResponse>
where
    R: DealReader + DealWriter + ContactReader + ?Sized,
{
    let id = DealId::new(id)?;
    let patch = DealPatch::try_from(form)?;
    let deal = load_for_edit(repo, user, id)?;
    if let Some(contact_id) = patch.contact_id {
        check_contact(repo, user, contact_id)?;
    }

    let touches_rules = patch.value.is_some() || patch.expected_close_date.is_some();
    let now = now();
    let updated = patch.apply(deal, now);
    if touches_rules {
        updated.validate(now.date())?;
    }

    let saved = repo.update_deal(&updated)?;
    cache.delete(&id.to_string());
    Ok(DealResponse::at(saved, now))
}

/// Archives the deal; archived deals disappear from listings.
pub fn delete_deal<R>(
    repo: &R,
    cache: &DealCache,
    user: &AuthenticatedUser,
    id: i32,
) -> ServiceResult<()>
where
    R: DealReader + DealWriter + ?Sized,
{
    let id = DealId::new(id)?;
    let mut deal = load_for_edit(repo, user, id)?;
    deal.archive(now());
    repo.update_deal(&deal)?;
    cache.delete(&id.to_string());
    log::info!("Deal {id} archived by user {}", user.id);
    Ok(())
}

pub fn change_stage<R>(
    repo: &R,
    cache: &DealCache,
    user: &AuthenticatedUser,
    id: i32,
    form: StageForm,
) -> ServiceResult<DealResponse>
where
    R: DealReader + DealWriter + ?Sized,
{
    let mut deal = load_for_edit(repo, user, DealId::new(id)?)?;
    let change = deal.change_stage(form.stage, Some(user.id), now())?;
    save_stage_change(repo, cache, &deal, &change)
}

pub fn close_won<R>(
    repo: &R,
    cache: &DealCache,
    user: &AuthenticatedUser,
    id: i32,
    form: CloseWonForm,
) -> ServiceResult<DealResponse>
where
    R: DealReader + DealWriter + ?Sized,
{
    if form.final_value.is_some_and(|value| value.is_zero()) {
        return Err(ServiceError::Validation(vec![ErrorDetail::field(
            "final_value",
            "Final value must be positive.",
        )]));
    }
    let mut deal = load_for_edit(repo, user, DealId::new(id)?)?;
    let change = deal.close_as_won(form.final_value, Some(user.id), now())?;
    save_stage_change(repo, cache, &deal, &change)
}

pub fn close_lost<R>(
    repo: &R,
    cache: &DealCache,
    user: &AuthenticatedUser,
    id: i32,
    form: CloseLostForm,
) -> ServiceResult<DealResponse>
where
    R: DealReader + DealWriter + ?Sized,
{
    let reason = form.reason()?;
    let mut deal = load_for_edit(repo, user, DealId::new(id)?)?;
    let change = deal.close_as_lost(reason, Some(user.id), now())?;
    save_stage_change(repo, cache, &deal, &change)
}

pub fn stage_history<R>(
    repo: &R,
    cache: &DealCache,
    user: &AuthenticatedUser,
    id: i32,
) -> ServiceResult<Vec<DealStageHistory>>
where
    R: DealReader + ?Sized,
{
    let deal = load_deal(repo, cache, user, DealId::new(id)?)?;
    Ok(repo.list_stage_history(deal.id)?)
}

/// Pipeline summary over the deals the user can see.
pub fn pipeline<R>(repo: &R, user: &AuthenticatedUser) -> ServiceResult<PipelineResponse>
where
    R: DealReader + ?Sized,
{
    Ok(repo.pipeline_summary(user.visible_owner())?.into())
}
