use chrono::{NaiveDateTime, Utc};
use serde::Serialize;

use crate::domain::activity::{Activity, ActivityStatus};

#[derive(Debug, Clone, Serialize)]
pub struct ActivityResponse {
    #[serde(flatten)]
    pub activity: Activity,
    pub status: ActivityStatus,
    pub is_overdue: bool,
    pub duration_display: Option<String>,
    pub priority_color: &'static str,
}

impl ActivityResponse {
    pub fn at(activity: Activity, now: NaiveDateTime) -> Self {
        Self {
            status: activity.status(now),
            is_overdue: activity.is_overdue(now),
            duration_display: activity.duration_display(),
            priority_color: activity.priority.color(),
            activity,
        }
    }
}

impl From<Activity> for ActivityResponse {
    fn from(activity: Activity) -> Self {
        Self::at(activity, Utc::now().naive_utc())
    }
}
