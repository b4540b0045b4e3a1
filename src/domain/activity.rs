use std::fmt::Display;
use std::str::FromStr;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::domain::RuleViolation;
use crate::domain::types::{
    ActivityId, ContactId, DealId, PublicId, Title, TypeConstraintError, UserId, WebUrl,
};

/// Window used by [`Activity::is_due_soon`] when deriving the status.
pub const DUE_SOON_HOURS: i64 = 24;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Call,
    Email,
    Meeting,
    Demo,
    Followup,
    Task,
    Note,
    Lunch,
    Webinar,
}

impl ActivityType {
    pub const ALL: [ActivityType; 9] = [
        ActivityType::Call,
        ActivityType::Email,
        ActivityType::Meeting,
        ActivityType::Demo,
        ActivityType::Followup,
        ActivityType::Task,
        ActivityType::Note,
        ActivityType::Lunch,
        ActivityType::Webinar,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Call => "call",
            ActivityType::Email => "email",
            ActivityType::Meeting => "meeting",
            ActivityType::Demo => "demo",
            ActivityType::Followup => "followup",
            ActivityType::Task => "task",
            ActivityType::Note => "note",
            ActivityType::Lunch => "lunch",
            ActivityType::Webinar => "webinar",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ActivityType::Call => "Phone Call",
            ActivityType::Email => "Email",
            ActivityType::Meeting => "Meeting",
            ActivityType::Demo => "Demo",
            ActivityType::Followup => "Follow-up",
            ActivityType::Task => "Task",
            ActivityType::Note => "Note",
            ActivityType::Lunch => "Lunch",
            ActivityType::Webinar => "Webinar",
        }
    }
}

impl Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ActivityType {
    type Err = TypeConstraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ActivityType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| {
                TypeConstraintError::InvalidValue(format!("unknown activity type `{s}`"))
            })
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    /// Bootstrap-style color class used by front-ends.
    pub fn color(&self) -> &'static str {
        match self {
            Priority::Low => "success",
            Priority::Medium => "info",
            Priority::High => "warning",
            Priority::Urgent => "danger",
        }
    }
}

impl Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Priority {
    type Err = TypeConstraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            other => Err(TypeConstraintError::InvalidValue(format!(
                "unknown priority `{other}`"
            ))),
        }
    }
}

/// Derived lifecycle state of an activity.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    Cancelled,
    Completed,
    Overdue,
    DueSoon,
    Scheduled,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Activity {
    pub id: ActivityId,
    pub public_id: PublicId,
    pub owner_id: UserId,
    pub contact_id: Option<ContactId>,
    pub deal_id: Option<DealId>,
    pub activity_type: ActivityType,
    pub title: Title,
    pub description: Option<String>,
    pub scheduled_at: NaiveDateTime,
    pub duration_minutes: Option<i32>,
    pub priority: Priority,
    pub is_completed: bool,
    pub is_cancelled: bool,
    pub completed_at: Option<NaiveDateTime>,
    pub completion_notes: Option<String>,
    pub reminder_minutes: Option<i32>,
    pub reminder_sent: bool,
    pub reminder_at: Option<NaiveDateTime>,
    pub location: Option<String>,
    pub video_conference_url: Option<WebUrl>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

fn reminder_time(scheduled_at: NaiveDateTime, reminder_minutes: Option<i32>) -> Option<NaiveDateTime> {
    reminder_minutes
        .filter(|minutes| *minutes > 0)
        .map(|minutes| scheduled_at - Duration::minutes(i64::from(minutes)))
}

fn check_targets(
    contact_id: Option<ContactId>,
    deal_id: Option<DealId>,
    duration_minutes: Option<i32>,
) -> Result<(), RuleViolation> {
    if contact_id.is_none() && deal_id.is_none() {
        return Err(RuleViolation::MissingActivityTarget);
    }
    if duration_minutes.is_some_and(|minutes| minutes <= 0) {
        return Err(RuleViolation::NonPositiveDuration);
    }
    Ok(())
}

impl Activity {
    pub fn is_open(&self) -> bool {
        !self.is_completed && !self.is_cancelled
    }

    pub fn is_overdue(&self, now: NaiveDateTime) -> bool {
        self.is_open() && self.scheduled_at < now
    }

    pub fn is_due_soon(&self, now: NaiveDateTime, hours: i64) -> bool {
        if !self.is_open() {
            return false;
        }
        let cutoff = now + Duration::hours(hours);
        now <= self.scheduled_at && self.scheduled_at <= cutoff
    }

    pub fn status(&self, now: NaiveDateTime) -> ActivityStatus {
        if self.is_cancelled {
            ActivityStatus::Cancelled
        } else if self.is_completed {
            ActivityStatus::Completed
        } else if self.is_overdue(now) {
            ActivityStatus::Overdue
        } else if self.is_due_soon(now, DUE_SOON_HOURS) {
            ActivityStatus::DueSoon
        } else {
            ActivityStatus::Scheduled
        }
    }

    pub fn validate(&self) -> Result<(), RuleViolation> {
        check_targets(self.contact_id, self.deal_id, self.duration_minutes)
    }

    /// Re-derives `reminder_at`; a changed reminder time re-arms the reminder.
    pub fn refresh_reminder(&mut self) {
        let reminder_at = reminder_time(self.scheduled_at, self.reminder_minutes);
        if reminder_at != self.reminder_at {
            self.reminder_sent = false;
        }
        self.reminder_at = reminder_at;
    }

    pub fn mark_completed(&mut self, notes: Option<String>, now: NaiveDateTime) {
        self.is_completed = true;
        self.completed_at = Some(now);
        if notes.is_some() {
            self.completion_notes = notes;
        }
        self.updated_at = now;
    }

    /// Clears completion tracking.
    pub fn reopen(&mut self, now: NaiveDateTime) {
        self.is_completed = false;
        self.completed_at = None;
        self.completion_notes = None;
        self.updated_at = now;
    }

    pub fn mark_cancelled(&mut self, now: NaiveDateTime) {
        self.is_cancelled = true;
        self.updated_at = now;
    }

    pub fn snooze(&mut self, minutes: i64, now: NaiveDateTime) -> Result<(), RuleViolation> {
        if !self.is_open() {
            return Err(RuleViolation::ActivityClosed);
        }
        if minutes <= 0 {
            return Err(RuleViolation::NonPositiveDuration);
        }
        self.scheduled_at += Duration::minutes(minutes);
        self.refresh_reminder();
        self.updated_at = now;
        Ok(())
    }

    pub fn reschedule(
        &mut self,
        scheduled_at: NaiveDateTime,
        now: NaiveDateTime,
    ) -> Result<(), RuleViolation> {
        if !self.is_open() {
            return Err(RuleViolation::ActivityClosed);
        }
        self.scheduled_at = scheduled_at;
        self.refresh_reminder();
        self.updated_at = now;
        Ok(())
    }

    pub fn mark_reminder_sent(&mut self, now: NaiveDateTime) {
        self.reminder_sent = true;
        self.updated_at = now;
    }

    /// `45 min`, `2 hr` or `1 hr 30 min`.
    pub fn duration_display(&self) -> Option<String> {
        let minutes = self.duration_minutes.filter(|m| *m > 0)?;
        if minutes < 60 {
            return Some(format!("{minutes} min"));
        }
        let (hours, rest) = (minutes / 60, minutes % 60);
        Some(if rest == 0 {
            format!("{hours} hr")
        } else {
            format!("{hours} hr {rest} min")
        })
    }
}

#[derive(Clone, Debug)]
pub struct NewActivity {
    pub public_id: PublicId,
    pub owner_id: UserId,
    pub contact_id: Option<ContactId>,
    pub deal_id: Option<DealId>,
    pub activity_type: ActivityType,
    pub title: Title,
    pub description: Option<String>,
    pub scheduled_at: NaiveDateTime,
    pub duration_minutes: Option<i32>,
    pub priority: Priority,
    pub reminder_minutes: Option<i32>,
    pub reminder_at: Option<NaiveDateTime>,
    pub location: Option<String>,
    pub video_conference_url: Option<WebUrl>,
}

impl NewActivity {
    pub fn new(
        owner_id: UserId,
        activity_type: ActivityType,
        title: Title,
        scheduled_at: NaiveDateTime,
    ) -> Self {
        Self {
            public_id: PublicId::new(),
            owner_id,
            contact_id: None,
            deal_id: None,
            activity_type,
            title,
            description: None,
            scheduled_at,
            duration_minutes: None,
            priority: Priority::default(),
            reminder_minutes: None,
            reminder_at: None,
            location: None,
            video_conference_url: None,
        }
    }

    #[must_use]
    pub fn for_contact(mut self, contact_id: ContactId) -> Self {
        self.contact_id = Some(contact_id);
        self
    }

    #[must_use]
    pub fn for_deal(mut self, deal_id: DealId) -> Self {
        self.deal_id = Some(deal_id);
        self
    }

    #[must_use]
    pub fn with_reminder(mut self, minutes: Option<i32>) -> Self {
        self.reminder_minutes = minutes;
        self.reminder_at = reminder_time(self.scheduled_at, minutes);
        self
    }

    pub fn validate(&self) -> Result<(), RuleViolation> {
        check_targets(self.contact_id, self.deal_id, self.duration_minutes)
    }
}

/// Partial update for an activity.
#[derive(Clone, Debug, Default)]
pub struct ActivityPatch {
    pub activity_type: Option<ActivityType>,
    pub title: Option<Title>,
    pub description: Option<Option<String>>,
    pub scheduled_at: Option<NaiveDateTime>,
    pub duration_minutes: Option<Option<i32>>,
    pub priority: Option<Priority>,
    pub reminder_minutes: Option<Option<i32>>,
    pub location: Option<Option<String>>,
    pub video_conference_url: Option<Option<WebUrl>>,
    pub contact_id: Option<Option<ContactId>>,
    pub deal_id: Option<Option<DealId>>,
    pub is_completed: Option<bool>,
}

impl ActivityPatch {
    pub fn apply(self, mut activity: Activity, now: NaiveDateTime) -> Activity {
        macro_rules! set {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = self.$field {
                    activity.$field = value;
                })*
            };
        }

        set!(
            activity_type,
            title,
            description,
            scheduled_at,
            duration_minutes,
            priority,
            reminder_minutes,
            location,
            video_conference_url,
            contact_id,
            deal_id,
        );

        match self.is_completed {
            Some(true) if !activity.is_completed => activity.mark_completed(None, now),
            Some(false) if activity.is_completed => activity.reopen(now),
            _ => {}
        }

        activity.refresh_reminder();
        activity.updated_at = now;
        activity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_activity(scheduled_at: NaiveDateTime) -> Activity {
        let now = Utc::now().naive_utc();
        Activity {
            id: ActivityId::new(1).unwrap(),
            public_id: PublicId::new(),
            owner_id: UserId::new(1).unwrap(),
            contact_id: Some(ContactId::new(1).unwrap()),
            deal_id: None,
            activity_type: ActivityType::Call,
            title: Title::new("Intro call").unwrap(),
            description: None,
            scheduled_at,
            duration_minutes: Some(30),
            priority: Priority::High,
            is_completed: false,
            is_cancelled: false,
            completed_at: None,
            completion_notes: None,
            reminder_minutes: Some(15),
            reminder_sent: false,
            reminder_at: reminder_time(scheduled_at, Some(15)),
            location: None,
            video_conference_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn status_precedence() {
        let now = Utc::now().naive_utc();
        let mut activity = sample_activity(now - Duration::hours(1));
        assert_eq!(activity.status(now), ActivityStatus::Overdue);

        activity.scheduled_at = now + Duration::hours(2);
        assert_eq!(activity.status(now), ActivityStatus::DueSoon);

        activity.scheduled_at = now + Duration::days(3);
        assert_eq!(activity.status(now), ActivityStatus::Scheduled);

        activity.mark_completed(Some("done".into()), now);
        assert_eq!(activity.status(now), ActivityStatus::Completed);

        activity.mark_cancelled(now);
        assert_eq!(activity.status(now), ActivityStatus::Cancelled);
    }

    #[test]
    fn reminder_follows_schedule() {
        let now = Utc::now().naive_utc();
        let mut activity = sample_activity(now + Duration::hours(1));
        assert_eq!(
            activity.reminder_at,
            Some(now + Duration::hours(1) - Duration::minutes(15))
        );
        activity.reminder_sent = true;
        activity.snooze(30, now).unwrap();
        assert_eq!(activity.scheduled_at, now + Duration::minutes(90));
        assert_eq!(activity.reminder_at, Some(now + Duration::minutes(75)));
        assert!(!activity.reminder_sent);
    }

    #[test]
    fn closed_activities_cannot_move() {
        let now = Utc::now().naive_utc();
        let mut activity = sample_activity(now);
        activity.mark_cancelled(now);
        assert_eq!(activity.snooze(10, now), Err(RuleViolation::ActivityClosed));
        assert_eq!(
            activity.reschedule(now + Duration::days(1), now),
            Err(RuleViolation::ActivityClosed)
        );
    }

    #[test]
    fn reopen_clears_completion() {
        let now = Utc::now().naive_utc();
        let mut activity = sample_activity(now);
        activity.mark_completed(Some("notes".into()), now);
        assert_eq!(activity.completed_at, Some(now));
        let patch = ActivityPatch {
            is_completed: Some(false),
            ..ActivityPatch::default()
        };
        let activity = patch.apply(activity, now);
        assert!(!activity.is_completed);
        assert_eq!(activity.completed_at, None);
        assert_eq!(activity.completion_notes, None);
    }

    #[test]
    fn validation_requires_target_and_positive_duration() {
        let now = Utc::now().naive_utc();
        let base = NewActivity::new(
            UserId::new(1).unwrap(),
            ActivityType::Meeting,
            Title::new("Sync").unwrap(),
            now,
        );
        assert_eq!(base.validate(), Err(RuleViolation::MissingActivityTarget));
        let mut with_deal = base.for_deal(DealId::new(4).unwrap());
        assert!(with_deal.validate().is_ok());
        with_deal.duration_minutes = Some(0);
        assert_eq!(with_deal.validate(), Err(RuleViolation::NonPositiveDuration));
    }

    #[test]
    fn duration_display_formats() {
        let now = Utc::now().naive_utc();
        let mut activity = sample_activity(now);
        activity.duration_minutes = Some(45);
        assert_eq!(activity.duration_display().as_deref(), Some("45 min"));
        activity.duration_minutes = Some(120);
        assert_eq!(activity.duration_display().as_deref(), Some("2 hr"));
        activity.duration_minutes = Some(90);
        assert_eq!(activity.duration_display().as_deref(), Some("1 hr 30 min"));
        activity.duration_minutes = None;
        assert_eq!(activity.duration_display(), None);
    }
}
