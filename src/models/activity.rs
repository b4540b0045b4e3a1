use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::activity::{Activity as DomainActivity, NewActivity as DomainNewActivity};
use crate::domain::types::{
    ActivityId, ContactId, DealId, PublicId, Title, TypeConstraintError, UserId, WebUrl,
};

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::activities)]
/// Diesel model for [`crate::domain::activity::Activity`].
pub struct Activity {
    pub id: i32,
    pub public_id: String,
    pub owner_id: i32,
    pub contact_id: Option<i32>,
    pub deal_id: Option<i32>,
    pub activity_type: String,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_at: NaiveDateTime,
    pub duration_minutes: Option<i32>,
    pub priority: String,
    pub is_completed: bool,
    pub is_cancelled: bool,
    pub completed_at: Option<NaiveDateTime>,
    pub completion_notes: Option<String>,
    pub reminder_minutes: Option<i32>,
    pub reminder_sent: bool,
    pub reminder_at: Option<NaiveDateTime>,
    pub location: Option<String>,
    pub video_conference_url: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::activities)]
pub struct NewActivity<'a> {
    pub public_id: String,
    pub owner_id: i32,
    pub contact_id: Option<i32>,
    pub deal_id: Option<i32>,
    pub activity_type: &'a str,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub scheduled_at: NaiveDateTime,
    pub duration_minutes: Option<i32>,
    pub priority: &'a str,
    pub reminder_minutes: Option<i32>,
    pub reminder_at: Option<NaiveDateTime>,
    pub location: Option<&'a str>,
    pub video_conference_url: Option<&'a str>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(AsChangeset)]
#[diesel(table_name = crate::schema::activities)]
#[diesel(treat_none_as_null = true)]
pub struct UpdateActivity<'a> {
    pub contact_id: Option<i32>,
    pub deal_id: Option<i32>,
    pub activity_type: &'a str,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub scheduled_at: NaiveDateTime,
    pub duration_minutes: Option<i32>,
    pub priority: &'a str,
    pub is_completed: bool,
    pub is_cancelled: bool,
    pub completed_at: Option<NaiveDateTime>,
    pub completion_notes: Option<&'a str>,
    pub reminder_minutes: Option<i32>,
    pub reminder_sent: bool,
    pub reminder_at: Option<NaiveDateTime>,
    pub location: Option<&'a str>,
    pub video_conference_url: Option<&'a str>,
    pub updated_at: NaiveDateTime,
}

impl<'a> From<&'a DomainNewActivity> for NewActivity<'a> {
    fn from(activity: &'a DomainNewActivity) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            public_id: activity.public_id.to_string(),
            owner_id: activity.owner_id.get(),
            contact_id: activity.contact_id.map(ContactId::get),
            deal_id: activity.deal_id.map(DealId::get),
            activity_type: activity.activity_type.as_str(),
            title: activity.title.as_str(),
            description: activity.description.as_deref(),
            scheduled_at: activity.scheduled_at,
            duration_minutes: activity.duration_minutes,
            priority: activity.priority.as_str(),
            reminder_minutes: activity.reminder_minutes,
            reminder_at: activity.reminder_at,
            location: activity.location.as_deref(),
            video_conference_url: activity.video_conference_url.as_ref().map(WebUrl::as_str),
            created_at: now,
            updated_at: now,
        }
    }
}

impl<'a> From<&'a DomainActivity> for UpdateActivity<'a> {
    fn from(activity: &'a DomainActivity) -> Self {
        Self {
            contact_id: activity.contact_id.map(ContactId::get),
            deal_id: activity.deal_id.map(DealId::get),
            activity_type: activity.activity_type.as_str(),
            title: activity.title.as_str(),
            description: activity.description.as_deref(),
            scheduled_at: activity.scheduled_at,
            duration_minutes: activity.duration_minutes,
            priority: activity.priority.as_str(),
            is_completed: activity.is_completed,
            is_cancelled: activity.is_cancelled,
            completed_at: activity.completed_at,
            completion_notes: activity.completion_notes.as_deref(),
            reminder_minutes: activity.reminder_minutes,
            reminder_sent: activity.reminder_sent,
            reminder_at: activity.reminder_at,
            location: activity.location.as_deref(),
            video_conference_url: activity.video_conference_url.as_ref().map(WebUrl::as_str),
            updated_at: activity.updated_at,
        }
    }
}

impl TryFrom<Activity> for DomainActivity {
    type Error = TypeConstraintError;

    fn try_from(activity: Activity) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ActivityId::new(activity.id)?,
            public_id: activity.public_id.parse::<PublicId>()?,
            owner_id: UserId::new(activity.owner_id)?,
            contact_id: activity.contact_id.map(ContactId::new).transpose()?,
            deal_id: activity.deal_id.map(DealId::new).transpose()?,
            activity_type: activity.activity_type.parse()?,
            title: Title::new(activity.title)?,
            description: activity.description,
            scheduled_at: activity.scheduled_at,
            duration_minutes: activity.duration_minutes,
            priority: activity.priority.parse()?,
            is_completed: activity.is_completed,
            is_cancelled: activity.is_cancelled,
            completed_at: activity.completed_at,
            completion_notes: activity.completion_notes,
            reminder_minutes: activity.reminder_minutes,
            reminder_sent: activity.reminder_sent,
            reminder_at: activity.reminder_at,
            location: activity.location,
            video_conference_url: activity
                .video_conference_url
                .map(WebUrl::new)
                .transpose()?,
            created_at: activity.created_at,
            updated_at: activity.updated_at,
        })
    }
}
