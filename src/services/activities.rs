//! Scheduling and lifecycle of calls, meetings, tasks and other activities.

use validator::Validate;

use crate::auth::AuthenticatedUser;
use crate::domain::activity::{Activity, ActivityPatch, NewActivity};
use crate::domain::types::{ActivityId, ContactId, DealId};
use crate::dto::activities::ActivityResponse;
use crate::forms::FormError;
use crate::forms::activities::{
    ActivityListParams, CompleteForm, CreateActivityForm, RescheduleForm, SnoozeForm,
    UpdateActivityForm,
};
use crate::pagination::{PageParams, Paginated};
use crate::repository::{
    ActivityListQuery, ActivityReader, ActivityWriter, ContactReader, DealReader,
};
use crate::services::errors::ErrorDetail;
use crate::services::{ServiceError, ServiceResult, ensure_can_edit, ensure_can_view, now};

fn load_activity<R>(
    repo: &R,
    user: &AuthenticatedUser,
    id: ActivityId,
    for_edit: bool,
) -> ServiceResult<Activity>
where
    R: ActivityReader + ?Sized,
{
    let activity = repo
        .get_activity_by_id(id)?
        .ok_or_else(|| ServiceError::not_found("Activity"))?;
    if for_edit {
        ensure_can_edit(user, activity.owner_id, "Activity")?;
    } else {
        ensure_can_view(user, activity.owner_id, "Activity")?;
    }
    Ok(activity)
}

fn link_error(field: &str, message: &str) -> ServiceError {
    ServiceError::Validation(vec![ErrorDetail::field(field, message)])
}

/// Linked contact and deal must exist and be visible to the user.
fn check_links<R>(
    repo: &R,
    user: &AuthenticatedUser,
    links: &ActivityLinks,
) -> ServiceResult<()>
where
    R: ContactReader + DealReader + ?Sized,
{
    if let Some(contact_id) = links.contact_id {
        let visible = repo
            .get_contact_by_id(contact_id, false)?
            .is_some_and(|c| ensure_can_view(user, c.owner_id, "Contact").is_ok());
        if !visible {
            return Err(link_error("contact_id", "Contact not found."));
        }
    }
    if let Some(deal_id) = links.deal_id {
        let visible = repo
            .get_deal_by_id(deal_id)?
            .filter(|d| !d.is_archived)
            .is_some_and(|d| ensure_can_view(user, d.owner_id, "Deal").is_ok());
        if !visible {
            return Err(link_error("deal_id", "Deal not found."));
        }
    }
    Ok(())
}

/// The contact/deal pair an activity points at.
struct ActivityLinks {
    contact_id: Option<ContactId>,
    deal_id: Option<DealId>,
}

impl From<&NewActivity> for ActivityLinks {
    fn from(activity: &NewActivity) -> Self {
        Self {
            contact_id: activity.contact_id,
            deal_id: activity.deal_id,
        }
    }
}

impl From<&Activity> for ActivityLinks {
    fn from(activity: &Activity) -> Self {
        Self {
            contact_id: activity.contact_id,
            deal_id: activity.deal_id,
        }
    }
}

fn paginate(
    repo: &(impl ActivityReader + ?Sized),
    query: ActivityListQuery,
    paging: PageParams,
) -> ServiceResult<Paginated<ActivityResponse>> {
    let (total, activities) =
        repo.list_activities(query.paginate(paging.page(), paging.per_page()))?;
    let now = now();
    Ok(
        Paginated::new(activities, paging.page(), paging.per_page(), total)
            .map(|activity| ActivityResponse::at(activity, now)),
    )
}

fn scoped_query(user: &AuthenticatedUser) -> ActivityListQuery {
    match user.visible_owner() {
        Some(owner_id) => ActivityListQuery::new().owner(owner_id),
        None => ActivityListQuery::new(),
    }
}

pub fn list_activities<R>(
    repo: &R,
    user: &AuthenticatedUser,
    params: ActivityListParams,
) -> ServiceResult<Paginated<ActivityResponse>>
where
    R: ActivityReader + ?Sized,
{
    let mut query = scoped_query(user);
    if let Some(activity_type) = params.activity_type()? {
        query = query.activity_type(activity_type);
    }
    if let Some(contact_id) = params.contact()? {
        query = query.contact(contact_id);
    }
    if let Some(deal_id) = params.deal()? {
        query = query.deal(deal_id);
    }
    if let Some(completed) = params.completed {
        query = query.completed(completed);
    }
    paginate(repo, query, params.paging())
}

/// Open activities scheduled from now on, soonest first.
pub fn upcoming_activities<R>(
    repo: &R,
    user: &AuthenticatedUser,
    paging: PageParams,
) -> ServiceResult<Paginated<ActivityResponse>>
where
    R: ActivityReader + ?Sized,
{
    paginate(repo, scoped_query(user).upcoming(now()), paging)
}

/// Open activities whose time has passed, most recent first.
pub fn overdue_activities<R>(
    repo: &R,
    user: &AuthenticatedUser,
    paging: PageParams,
) -> ServiceResult<Paginated<ActivityResponse>>
where
    R: ActivityReader + ?Sized,
{
    paginate(repo, scoped_query(user).overdue(now()), paging)
}

pub fn create_activity<R>(
    repo: &R,
    user: &AuthenticatedUser,
    form: CreateActivityForm,
) -> ServiceResult<ActivityResponse>
where
    R: ActivityWriter + ContactReader + DealReader + ?Sized,
{
    let new_activity = form.into_new_activity(user.id)?;
    new_activity.validate()?;
    check_links(repo, user, &ActivityLinks::from(&new_activity))?;

    let activity = repo.create_activity(&new_activity)?;
    log::info!(
        "Activity {} ({}) scheduled by user {}",
        activity.id,
        activity.activity_type.as_str(),
        user.id
    );
    Ok(activity.into())
}

pub fn get_activity<R>(
    repo: &R,
    user: &AuthenticatedUser,
    id: i32,
) -> ServiceResult<ActivityResponse>
where
    R: ActivityReader + ?Sized,
{
    Ok(load_activity(repo, user, ActivityId::new(id)?, false)?.into())
}

pub fn update_activity<R>(
    repo: &R,
    user: &AuthenticatedUser,
    id: i32,
    form: UpdateActivityForm,
) -> ServiceResult<ActivityResponse>
where
    R: ActivityReader + ActivityWriter + ContactReader + DealReader + ?Sized,
{
    let patch = ActivityPatch::try_from(form)?;
    let relinks = patch.contact_id.is_some() || patch.deal_id.is_some();
    let activity = load_activity(repo, user, ActivityId::new(id)?, true)?;

    let updated = patch.apply(activity, now());
    updated.validate()?;
    if relinks {
        check_links(repo, user, &ActivityLinks::from(&updated))?;
    }
    Ok(repo.update_activity(&updated)?.into())
}

/// Removes the activity permanently.
pub fn delete_activity<R>(repo: &R, user: &AuthenticatedUser, id: i32) -> ServiceResult<()>
where
    R: ActivityReader + ActivityWriter + ?Sized,
{
    let activity = load_activity(repo, user, ActivityId::new(id)?, true)?;
    repo.delete_activity(activity.id)?;
    log::info!("Activity {} deleted by user {}", activity.id, user.id);
    Ok(())
}

pub fn complete_activity<R>(
    repo: &R,
    user: &AuthenticatedUser,
    id: i32,
    form: CompleteForm,
) -> ServiceResult<ActivityResponse>
where
    R: ActivityReader + ActivityWriter + ?Sized,
{
    let mut activity = load_activity(repo, user, ActivityId::new(id)?, true)?;
    if activity.is_completed {
        return Err(ServiceError::BusinessRule(
            "Activity is already completed.".into(),
        ));
    }
    if activity.is_cancelled {
        return Err(ServiceError::BusinessRule(
            "Cancelled activities cannot be completed.".into(),
        ));
    }
    activity.mark_completed(form.notes(), now());
    Ok(repo.update_activity(&activity)?.into())
}

pub fn cancel_activity<R>(
    repo: &R,
    user: &AuthenticatedUser,
    id: i32,
) -> ServiceResult<ActivityResponse>
where
    R: ActivityReader + ActivityWriter + ?Sized,
{
    let mut activity = load_activity(repo, user, ActivityId::new(id)?, true)?;
    if !activity.is_open() {
        return Err(ServiceError::BusinessRule(
            "Activity is already completed or cancelled.".into(),
        ));
    }
    activity.mark_cancelled(now());
    Ok(repo.update_activity(&activity)?.into())
}

pub fn snooze_activity<R>(
    repo: &R,
    user: &AuthenticatedUser,
    id: i32,
    form: SnoozeForm,
) -> ServiceResult<ActivityResponse>
where
    R: ActivityReader + ActivityWriter + ?Sized,
{
    form.validate().map_err(FormError::from)?;
    let mut activity = load_activity(repo, user, ActivityId::new(id)?, true)?;
    activity.snooze(form.minutes, now())?;
    Ok(repo.update_activity(&activity)?.into())
}

pub fn reschedule_activity<R>(
    repo: &R,
    user: &AuthenticatedUser,
    id: i32,
    form: RescheduleForm,
) -> ServiceResult<ActivityResponse>
where
    R: ActivityReader + ActivityWriter + ?Sized,
{
    let scheduled_at = form.scheduled_at()?;
    let mut activity = load_activity(repo, user, ActivityId::new(id)?, true)?;
    activity.reschedule(scheduled_at, now())?;
    Ok(repo.update_activity(&activity)?.into())
}

#[cfg(all(test, feature = "test-mocks"))]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::domain::user::UserRole;
    use crate::fixtures;
    use crate::repository::mock::MockRepository;
    use crate::services::principal;

    fn repo_with_activity(owner: i32) -> MockRepository {
        let mut repo = MockRepository::new();
        repo.expect_get_activity_by_id().returning(move |id| {
            Ok(Some(fixtures::activity(
                id.get(),
                owner,
                fixtures::now() + Duration::days(1),
            )))
        });
        repo
    }

    #[test]
    fn create_requires_visible_contact() {
        let mut repo = MockRepository::new();
        repo.expect_get_contact_by_id().returning(|_, _| Ok(None));
        let form: CreateActivityForm = serde_json::from_str(
            r#"{"activity_type":"call","title":"Intro","scheduled_at":"2031-01-01T10:00:00","contact_id":3}"#,
        )
        .unwrap();
        let err = create_activity(&repo, &principal(1, UserRole::Sales), form).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref d) if d[0].field.as_deref() == Some("contact_id")));
    }

    #[test]
    fn create_requires_a_target() {
        let repo = MockRepository::new();
        let form: CreateActivityForm = serde_json::from_str(
            r#"{"activity_type":"task","title":"Prepare","scheduled_at":"2031-01-01T10:00:00"}"#,
        )
        .unwrap();
        let err = create_activity(&repo, &principal(1, UserRole::Sales), form).unwrap_err();
        assert!(matches!(err, ServiceError::BusinessRule(_)));
    }

    #[test]
    fn complete_stores_notes_once() {
        let mut repo = repo_with_activity(1);
        repo.expect_update_activity()
            .withf(|a| a.is_completed && a.completion_notes.as_deref() == Some("Went well"))
            .times(1)
            .returning(|a| Ok(a.clone()));
        let form = CompleteForm {
            notes: Some(" Went well ".into()),
        };
        let response =
            complete_activity(&repo, &principal(1, UserRole::Sales), 2, form).unwrap();
        assert!(response.activity.is_completed);
    }

    #[test]
    fn completed_activity_cannot_be_snoozed() {
        let mut repo = MockRepository::new();
        repo.expect_get_activity_by_id().returning(|id| {
            let mut activity = fixtures::activity(id.get(), 1, fixtures::now());
            activity.is_completed = true;
            Ok(Some(activity))
        });
        let err = snooze_activity(
            &repo,
            &principal(1, UserRole::Sales),
            2,
            SnoozeForm { minutes: 30 },
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::BusinessRule(_)));
    }

    #[test]
    fn snooze_moves_schedule_and_rearms_reminder() {
        let mut repo = repo_with_activity(1);
        repo.expect_update_activity()
            .withf(|a| !a.reminder_sent && a.reminder_at == Some(a.scheduled_at - Duration::minutes(15)))
            .returning(|a| Ok(a.clone()));
        let before = fixtures::now() + Duration::days(1);
        let response = snooze_activity(
            &repo,
            &principal(1, UserRole::Sales),
            2,
            SnoozeForm { minutes: 60 },
        )
        .unwrap();
        assert!(response.activity.scheduled_at >= before + Duration::minutes(59));
    }

    #[test]
    fn snooze_limits_are_validated() {
        let repo = MockRepository::new();
        let err = snooze_activity(
            &repo,
            &principal(1, UserRole::Sales),
            2,
            SnoozeForm { minutes: 0 },
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn manager_cannot_cancel_others_activity() {
        let repo = repo_with_activity(9);
        let err = cancel_activity(&repo, &principal(2, UserRole::Manager), 2).unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[test]
    fn overdue_listing_is_scoped() {
        let mut repo = MockRepository::new();
        repo.expect_list_activities()
            .withf(|q| q.owner_id.map(|id| id.get()) == Some(4) && q.open_only && q.newest_first)
            .returning(|_| Ok((0, vec![])));
        let page =
            overdue_activities(&repo, &principal(4, UserRole::Support), PageParams::default())
                .unwrap();
        assert_eq!(page.total, 0);
    }

    #[test]
    fn delete_removes_row() {
        let mut repo = repo_with_activity(1);
        repo.expect_delete_activity()
            .withf(|id| id.get() == 2)
            .times(1)
            .returning(|_| Ok(()));
        delete_activity(&repo, &principal(1, UserRole::Sales), 2).unwrap();
    }
}
