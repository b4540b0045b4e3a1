use chrono::{DateTime, NaiveDateTime};
use serde::Deserialize;
use validator::Validate;

use crate::domain::activity::{ActivityPatch, ActivityType, NewActivity, Priority};
use crate::domain::types::{ContactId, DealId, Title, UserId, WebUrl};
use crate::forms::{
    FormError, clean_text, double_option, parse_field, parse_nullable, parse_optional,
};
use crate::pagination::PageParams;

/// Accepts RFC 3339 (converted to UTC) or a naive `YYYY-MM-DDTHH:MM[:SS]`.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, String> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.naive_utc());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .ok_or_else(|| format!("`{raw}` is not a valid datetime."))
}

#[derive(Debug, Default, Deserialize)]
pub struct ActivityListParams {
    pub activity_type: Option<String>,
    pub contact: Option<i32>,
    pub deal: Option<i32>,
    pub completed: Option<bool>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

impl ActivityListParams {
    pub fn paging(&self) -> PageParams {
        PageParams {
            page: self.page,
            page_size: self.page_size,
        }
    }

    pub fn activity_type(&self) -> Result<Option<ActivityType>, FormError> {
        parse_optional("activity_type", self.activity_type.clone(), |raw| {
            raw.parse::<ActivityType>()
        })
    }

    pub fn contact(&self) -> Result<Option<ContactId>, FormError> {
        self.contact
            .map(|id| parse_field("contact", ContactId::new(id)))
            .transpose()
    }

    pub fn deal(&self) -> Result<Option<DealId>, FormError> {
        self.deal
            .map(|id| parse_field("deal", DealId::new(id)))
            .transpose()
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateActivityForm {
    pub activity_type: ActivityType,
    #[validate(length(min = 1, max = 200, message = "Title is required."))]
    pub title: String,
    pub description: Option<String>,
    pub scheduled_at: String,
    #[validate(range(min = 1, max = 1440))]
    pub duration_minutes: Option<i32>,
    #[serde(default)]
    pub priority: Priority,
    pub contact_id: Option<i32>,
    pub deal_id: Option<i32>,
    #[validate(range(min = 0, max = 10080))]
    pub reminder_minutes: Option<i32>,
    pub location: Option<String>,
    pub video_conference_url: Option<String>,
}

impl CreateActivityForm {
    pub fn into_new_activity(self, owner_id: UserId) -> Result<NewActivity, FormError> {
        self.validate()?;
        let mut activity = NewActivity::new(
            owner_id,
            self.activity_type,
            parse_field("title", Title::new(self.title))?,
            parse_field("scheduled_at", parse_timestamp(&self.scheduled_at))?,
        )
        .with_reminder(self.reminder_minutes);
        if let Some(id) = self.contact_id {
            activity = activity.for_contact(parse_field("contact_id", ContactId::new(id))?);
        }
        if let Some(id) = self.deal_id {
            activity = activity.for_deal(parse_field("deal_id", DealId::new(id))?);
        }
        activity.description = clean_text(self.description);
        activity.duration_minutes = self.duration_minutes;
        activity.priority = self.priority;
        activity.location = clean_text(self.location);
        activity.video_conference_url = parse_optional(
            "video_conference_url",
            self.video_conference_url,
            WebUrl::new,
        )?;
        Ok(activity)
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateActivityForm {
    pub activity_type: Option<ActivityType>,
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub scheduled_at: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub duration_minutes: Option<Option<i32>>,
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "double_option")]
    pub reminder_minutes: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub video_conference_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub contact_id: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub deal_id: Option<Option<i32>>,
    pub is_completed: Option<bool>,
}

fn nullable_id<T>(
    field: &'static str,
    value: Option<Option<i32>>,
    make: impl Fn(i32) -> Result<T, crate::domain::types::TypeConstraintError>,
) -> Result<Option<Option<T>>, FormError> {
    match value {
        None => Ok(None),
        Some(None) => Ok(Some(None)),
        Some(Some(id)) => parse_field(field, make(id)).map(|id| Some(Some(id))),
    }
}

impl TryFrom<UpdateActivityForm> for ActivityPatch {
    type Error = FormError;

    fn try_from(form: UpdateActivityForm) -> Result<Self, Self::Error> {
        form.validate()?;
        if matches!(form.duration_minutes, Some(Some(minutes)) if minutes <= 0) {
            return Err(FormError::field(
                "duration_minutes",
                "Duration must be positive.",
            ));
        }
        Ok(Self {
            activity_type: form.activity_type,
            title: form
                .title
                .map(|v| parse_field("title", Title::new(v)))
                .transpose()?,
            description: form.description.map(clean_text),
            scheduled_at: form
                .scheduled_at
                .map(|raw| parse_field("scheduled_at", parse_timestamp(&raw)))
                .transpose()?,
            duration_minutes: form.duration_minutes,
            priority: form.priority,
            reminder_minutes: form.reminder_minutes,
            location: form.location.map(clean_text),
            video_conference_url: parse_nullable(
                "video_conference_url",
                form.video_conference_url,
                WebUrl::new,
            )?,
            contact_id: nullable_id("contact_id", form.contact_id, ContactId::new)?,
            deal_id: nullable_id("deal_id", form.deal_id, DealId::new)?,
            is_completed: form.is_completed,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CompleteForm {
    pub notes: Option<String>,
}

impl CompleteForm {
    pub fn notes(self) -> Option<String> {
        clean_text(self.notes)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SnoozeForm {
    #[validate(range(min = 1, max = 10080, message = "Snooze must be between 1 minute and 7 days."))]
    pub minutes: i64,
}

#[derive(Debug, Deserialize)]
pub struct RescheduleForm {
    pub scheduled_at: String,
}

impl RescheduleForm {
    pub fn scheduled_at(&self) -> Result<NaiveDateTime, FormError> {
        parse_field("scheduled_at", parse_timestamp(&self.scheduled_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn timestamps_accept_offsets_and_naive_values() {
        let expected = NaiveDate::from_ymd_opt(2030, 5, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2030-05-01T12:00:00+02:00"), Ok(expected));
        assert_eq!(parse_timestamp("2030-05-01T10:00:00Z"), Ok(expected));
        assert_eq!(parse_timestamp("2030-05-01T10:00"), Ok(expected));
        assert!(parse_timestamp("tomorrow").is_err());
    }

    #[test]
    fn create_form_builds_activity_with_reminder() {
        let form: CreateActivityForm = serde_json::from_str(
            r#"{
                "activity_type": "call",
                "title": "Discovery call",
                "scheduled_at": "2030-05-01T10:00:00",
                "contact_id": 4,
                "reminder_minutes": 30
            }"#,
        )
        .unwrap();
        let activity = form.into_new_activity(UserId::new(2).unwrap()).unwrap();
        assert_eq!(activity.contact_id, Some(ContactId::new(4).unwrap()));
        assert_eq!(
            activity.reminder_at.map(|at| at.to_string()),
            Some("2030-05-01 09:30:00".to_string())
        );
        assert_eq!(activity.priority, Priority::Medium);
        assert!(activity.validate().is_ok());
    }

    #[test]
    fn patch_can_unlink_deal() {
        let form: UpdateActivityForm =
            serde_json::from_str(r#"{"deal_id": null, "is_completed": true}"#).unwrap();
        let patch = ActivityPatch::try_from(form).unwrap();
        assert_eq!(patch.deal_id, Some(None));
        assert_eq!(patch.is_completed, Some(true));
    }

    #[test]
    fn patch_rejects_zero_duration() {
        let form: UpdateActivityForm =
            serde_json::from_str(r#"{"duration_minutes": 0}"#).unwrap();
        assert!(ActivityPatch::try_from(form).is_err());
    }
}
