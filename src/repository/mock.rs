//! Mock repository implementations for isolating services in tests.

use chrono::NaiveDateTime;
use mockall::mock;

use crate::domain::activity::{Activity, NewActivity};
use crate::domain::contact::{Contact, ContactDealSummary, NewContact};
use crate::domain::deal::{Deal, DealStageHistory, NewDeal, StageChange, StageSummary};
use crate::domain::types::{ActivityId, ContactId, DealId, EmailAddress, Tag, UserId};
use crate::domain::user::{NewUser, User, UserCredentials};
use crate::repository::errors::RepositoryResult;
use crate::repository::{
    ActivityListQuery, ActivityReader, ActivityWriter, ContactListQuery, ContactReader,
    ContactWriter, CrmCounts, DealListQuery, DealReader, DealWriter, StatsReader, TokenStore,
    UserListQuery, UserReader, UserWriter,
};

mock! {
    pub Repository {}

    impl UserReader for Repository {
        fn get_user_by_id(&self, id: UserId) -> RepositoryResult<Option<User>>;
        fn get_user_by_email(&self, email: &EmailAddress) -> RepositoryResult<Option<User>>;
        fn get_credentials_by_email(
            &self,
            email: &EmailAddress,
        ) -> RepositoryResult<Option<UserCredentials>>;
        fn get_credentials_by_id(&self, id: UserId) -> RepositoryResult<Option<UserCredentials>>;
        fn list_users(&self, query: UserListQuery) -> RepositoryResult<(usize, Vec<User>)>;
    }

    impl UserWriter for Repository {
        fn create_user(&self, new_user: &NewUser) -> RepositoryResult<User>;
        fn update_user_profile(&self, user: &User) -> RepositoryResult<User>;
        fn set_user_password(&self, id: UserId, password_hash: &str) -> RepositoryResult<()>;
        fn set_user_active(&self, id: UserId, is_active: bool) -> RepositoryResult<User>;
        fn touch_last_login(&self, id: UserId, at: NaiveDateTime) -> RepositoryResult<()>;
    }

    impl TokenStore for Repository {
        fn revoke_token(&self, jti: &str, user_id: UserId) -> RepositoryResult<()>;
        fn is_token_revoked(&self, jti: &str) -> RepositoryResult<bool>;
    }

    impl ContactReader for Repository {
        fn get_contact_by_id(
            &self,
            id: ContactId,
            include_deleted: bool,
        ) -> RepositoryResult<Option<Contact>>;
        fn get_contact_by_email(&self, email: &EmailAddress) -> RepositoryResult<Option<Contact>>;
        fn list_contacts(&self, query: ContactListQuery) -> RepositoryResult<(usize, Vec<Contact>)>;
        fn contact_deal_summary(&self, id: ContactId) -> RepositoryResult<ContactDealSummary>;
    }

    impl ContactWriter for Repository {
        fn create_contact(&self, new_contact: &NewContact) -> RepositoryResult<Contact>;
        fn update_contact(&self, contact: &Contact) -> RepositoryResult<Contact>;
        fn set_contact_tags(&self, id: ContactId, tags: &[Tag]) -> RepositoryResult<Contact>;
        fn soft_delete_contact(&self, id: ContactId, at: NaiveDateTime) -> RepositoryResult<()>;
        fn restore_contact(&self, id: ContactId, at: NaiveDateTime) -> RepositoryResult<Contact>;
    }

    impl DealReader for Repository {
        fn get_deal_by_id(&self, id: DealId) -> RepositoryResult<Option<Deal>>;
        fn list_deals(&self, query: DealListQuery) -> RepositoryResult<(usize, Vec<Deal>)>;
        fn list_stage_history(&self, id: DealId) -> RepositoryResult<Vec<DealStageHistory>>;
        fn pipeline_summary(&self, owner_id: Option<UserId>) -> RepositoryResult<Vec<StageSummary>>;
    }

    impl DealWriter for Repository {
        fn create_deal(&self, new_deal: &NewDeal) -> RepositoryResult<Deal>;
        fn update_deal(&self, deal: &Deal) -> RepositoryResult<Deal>;
        fn record_stage_change(&self, deal: &Deal, change: &StageChange) -> RepositoryResult<Deal>;
    }

    impl ActivityReader for Repository {
        fn get_activity_by_id(&self, id: ActivityId) -> RepositoryResult<Option<Activity>>;
        fn list_activities(
            &self,
            query: ActivityListQuery,
        ) -> RepositoryResult<(usize, Vec<Activity>)>;
        fn list_pending_reminders(&self, now: NaiveDateTime) -> RepositoryResult<Vec<Activity>>;
    }

    impl ActivityWriter for Repository {
        fn create_activity(&self, new_activity: &NewActivity) -> RepositoryResult<Activity>;
        fn update_activity(&self, activity: &Activity) -> RepositoryResult<Activity>;
        fn delete_activity(&self, id: ActivityId) -> RepositoryResult<()>;
        fn mark_reminder_sent(&self, id: ActivityId, at: NaiveDateTime) -> RepositoryResult<()>;
    }

    impl StatsReader for Repository {
        fn crm_counts(&self, now: NaiveDateTime) -> RepositoryResult<CrmCounts>;
    }
}
