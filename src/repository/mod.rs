use chrono::{Duration, NaiveDate, NaiveDateTime};
use diesel::r2d2::{ConnectionManager, PooledConnection};
use diesel::sqlite::SqliteConnection;
use serde::Serialize;

use crate::db::DbPool;
use crate::domain::activity::{Activity, ActivityType, NewActivity};
use crate::domain::contact::{Contact, ContactDealSummary, NewContact};
use crate::domain::deal::{Deal, DealStage, DealStageHistory, NewDeal, StageChange, StageSummary};
use crate::domain::types::{ActivityId, ContactId, DealId, EmailAddress, Tag, UserId};
use crate::domain::user::{NewUser, User, UserCredentials, UserRole};
use crate::repository::errors::RepositoryResult;

pub mod activity;
pub mod contact;
pub mod deal;
pub mod errors;
#[cfg(feature = "test-mocks")]
pub mod mock;
pub mod stats;
pub mod token;
pub mod user;

/// Diesel-backed implementation of every repository trait.
#[derive(Clone)]
pub struct DieselRepository {
    pool: DbPool,
}

impl DieselRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    fn conn(&self) -> RepositoryResult<PooledConnection<ConnectionManager<SqliteConnection>>> {
        Ok(self.pool.get()?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: usize,
    pub per_page: usize,
}

impl Pagination {
    pub(crate) fn offset(&self) -> i64 {
        ((self.page.max(1) - 1) * self.per_page) as i64
    }

    pub(crate) fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserListQuery {
    pub search: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
    pub pagination: Option<Pagination>,
}

impl UserListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn role(mut self, role: UserRole) -> Self {
        self.role = Some(role);
        self
    }

    pub fn is_active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }

    pub fn paginate(mut self, page: usize, per_page: usize) -> Self {
        self.pagination = Some(Pagination { page, per_page });
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContactListQuery {
    pub owner_id: Option<UserId>,
    pub search: Option<String>,
    pub company: Option<String>,
    pub tag: Option<Tag>,
    pub is_active: Option<bool>,
    pub include_deleted: bool,
    pub pagination: Option<Pagination>,
}

impl ContactListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn owner(mut self, owner_id: UserId) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn company(mut self, company: impl Into<String>) -> Self {
        self.company = Some(company.into());
        self
    }

    pub fn tag(mut self, tag: Tag) -> Self {
        self.tag = Some(tag);
        self
    }

    pub fn is_active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }

    pub fn include_deleted(mut self) -> Self {
        self.include_deleted = true;
        self
    }

    pub fn paginate(mut self, page: usize, per_page: usize) -> Self {
        self.pagination = Some(Pagination { page, per_page });
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct DealListQuery {
    pub owner_id: Option<UserId>,
    pub contact_id: Option<ContactId>,
    pub stage: Option<DealStage>,
    pub open_only: bool,
    /// Inclusive close-date window.
    pub closing_between: Option<(NaiveDate, NaiveDate)>,
    pub search: Option<String>,
    pub include_archived: bool,
    pub pagination: Option<Pagination>,
}

impl DealListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn owner(mut self, owner_id: UserId) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    pub fn contact(mut self, contact_id: ContactId) -> Self {
        self.contact_id = Some(contact_id);
        self
    }

    pub fn stage(mut self, stage: DealStage) -> Self {
        self.stage = Some(stage);
        self
    }

    pub fn open_only(mut self) -> Self {
        self.open_only = true;
        self
    }

    /// Open deals expected to close between `today` and `today + days`.
    pub fn closing_within_days(mut self, today: NaiveDate, days: i64) -> Self {
        self.open_only = true;
        self.closing_between = Some((today, today + Duration::days(days)));
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn include_archived(mut self) -> Self {
        self.include_archived = true;
        self
    }

    pub fn paginate(mut self, page: usize, per_page: usize) -> Self {
        self.pagination = Some(Pagination { page, per_page });
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ActivityListQuery {
    pub owner_id: Option<UserId>,
    pub contact_id: Option<ContactId>,
    pub deal_id: Option<DealId>,
    pub activity_type: Option<ActivityType>,
    pub is_completed: Option<bool>,
    /// Open activities only.
    pub open_only: bool,
    pub scheduled_from: Option<NaiveDateTime>,
    pub scheduled_to: Option<NaiveDateTime>,
    /// Sort by `scheduled_at` descending instead of ascending.
    pub newest_first: bool,
    pub pagination: Option<Pagination>,
}

impl ActivityListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn owner(mut self, owner_id: UserId) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    pub fn contact(mut self, contact_id: ContactId) -> Self {
        self.contact_id = Some(contact_id);
        self
    }

    pub fn deal(mut self, deal_id: DealId) -> Self {
        self.deal_id = Some(deal_id);
        self
    }

    pub fn activity_type(mut self, activity_type: ActivityType) -> Self {
        self.activity_type = Some(activity_type);
        self
    }

    pub fn completed(mut self, is_completed: bool) -> Self {
        self.is_completed = Some(is_completed);
        self
    }

    /// Open activities scheduled at or after `now`.
    pub fn upcoming(mut self, now: NaiveDateTime) -> Self {
        self.open_only = true;
        self.scheduled_from = Some(now);
        self
    }

    /// Open activities scheduled before `now`.
    pub fn overdue(mut self, now: NaiveDateTime) -> Self {
        self.open_only = true;
        self.scheduled_to = Some(now);
        self.newest_first = true;
        self
    }

    /// Open activities scheduled within the next `hours`.
    pub fn due_within_hours(mut self, now: NaiveDateTime, hours: i64) -> Self {
        self.open_only = true;
        self.scheduled_from = Some(now);
        self.scheduled_to = Some(now + Duration::hours(hours));
        self
    }

    pub fn scheduled_between(mut self, from: NaiveDateTime, to: NaiveDateTime) -> Self {
        self.scheduled_from = Some(from);
        self.scheduled_to = Some(to);
        self
    }

    pub fn paginate(mut self, page: usize, per_page: usize) -> Self {
        self.pagination = Some(Pagination { page, per_page });
        self
    }
}

/// Business counters reported by health and metrics endpoints.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct CrmCounts {
    pub users: usize,
    pub active_users: usize,
    pub contacts: usize,
    pub open_deals: usize,
    pub overdue_activities: usize,
}

pub trait UserReader {
    fn get_user_by_id(&self, id: UserId) -> RepositoryResult<Option<User>>;
    fn get_user_by_email(&self, email: &EmailAddress) -> RepositoryResult<Option<User>>;
    fn get_credentials_by_email(
        &self,
        email: &EmailAddress,
    ) -> RepositoryResult<Option<UserCredentials>>;
    fn get_credentials_by_id(&self, id: UserId) -> RepositoryResult<Option<UserCredentials>>;
    fn list_users(&self, query: UserListQuery) -> RepositoryResult<(usize, Vec<User>)>;
}

pub trait UserWriter {
    fn create_user(&self, new_user: &NewUser) -> RepositoryResult<User>;
    fn update_user_profile(&self, user: &User) -> RepositoryResult<User>;
    fn set_user_password(&self, id: UserId, password_hash: &str) -> RepositoryResult<()>;
    fn set_user_active(&self, id: UserId, is_active: bool) -> RepositoryResult<User>;
    fn touch_last_login(&self, id: UserId, at: NaiveDateTime) -> RepositoryResult<()>;
}

/// Storage of revoked refresh token identifiers.
pub trait TokenStore {
    fn revoke_token(&self, jti: &str, user_id: UserId) -> RepositoryResult<()>;
    fn is_token_revoked(&self, jti: &str) -> RepositoryResult<bool>;
}

pub trait ContactReader {
    fn get_contact_by_id(
        &self,
        id: ContactId,
        include_deleted: bool,
    ) -> RepositoryResult<Option<Contact>>;
    fn get_contact_by_email(&self, email: &EmailAddress) -> RepositoryResult<Option<Contact>>;
    fn list_contacts(&self, query: ContactListQuery) -> RepositoryResult<(usize, Vec<Contact>)>;
    fn contact_deal_summary(&self, id: ContactId) -> RepositoryResult<ContactDealSummary>;
}

pub trait ContactWriter {
    fn create_contact(&self, new_contact: &NewContact) -> RepositoryResult<Contact>;
    fn update_contact(&self, contact: &Contact) -> RepositoryResult<Contact>;
    fn set_contact_tags(&self, id: ContactId, tags: &[Tag]) -> RepositoryResult<Contact>;
    fn soft_delete_contact(&self, id: ContactId, at: NaiveDateTime) -> RepositoryResult<()>;
    fn restore_contact(&self, id: ContactId, at: NaiveDateTime) -> RepositoryResult<Contact>;
}

pub trait DealReader {
    fn get_deal_by_id(&self, id: DealId) -> RepositoryResult<Option<Deal>>;
    fn list_deals(&self, query: DealListQuery) -> RepositoryResult<(usize, Vec<Deal>)>;
    fn list_stage_history(&self, id: DealId) -> RepositoryResult<Vec<DealStageHistory>>;
    fn pipeline_summary(&self, owner_id: Option<UserId>) -> RepositoryResult<Vec<StageSummary>>;
}

pub trait DealWriter {
    fn create_deal(&self, new_deal: &NewDeal) -> RepositoryResult<Deal>;
    fn update_deal(&self, deal: &Deal) -> RepositoryResult<Deal>;
    /// Persists the deal and appends the history row atomically.
    fn record_stage_change(&self, deal: &Deal, change: &StageChange) -> RepositoryResult<Deal>;
}

pub trait ActivityReader {
    fn get_activity_by_id(&self, id: ActivityId) -> RepositoryResult<Option<Activity>>;
    fn list_activities(&self, query: ActivityListQuery)
    -> RepositoryResult<(usize, Vec<Activity>)>;
    /// Open activities whose reminder time has passed and was not yet sent.
    fn list_pending_reminders(&self, now: NaiveDateTime) -> RepositoryResult<Vec<Activity>>;
}

pub trait ActivityWriter {
    fn create_activity(&self, new_activity: &NewActivity) -> RepositoryResult<Activity>;
    fn update_activity(&self, activity: &Activity) -> RepositoryResult<Activity>;
    fn delete_activity(&self, id: ActivityId) -> RepositoryResult<()>;
    fn mark_reminder_sent(&self, id: ActivityId, at: NaiveDateTime) -> RepositoryResult<()>;
}

pub trait StatsReader {
    fn crm_counts(&self, now: NaiveDateTime) -> RepositoryResult<CrmCounts>;
}
