//! Messages exchanged between the web application and the task worker.

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskMessage {
    /// Write the contacts visible to `owner_id` (all when `None`) to CSV.
    ExportContacts {
        requested_by: i32,
        #[serde(default)]
        owner_id: Option<i32>,
    },
    PipelineReport {
        requested_by: i32,
    },
    ActivityReminders,
}

impl TaskMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            TaskMessage::ExportContacts { .. } => "export_contacts",
            TaskMessage::PipelineReport { .. } => "pipeline_report",
            TaskMessage::ActivityReminders => "activity_reminders",
        }
    }
}

/// Wire format of a queued task.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TaskEnvelope {
    pub id: Uuid,
    pub enqueued_at: NaiveDateTime,
    #[serde(default)]
    pub attempts: u32,
    #[serde(flatten)]
    pub task: TaskMessage,
}

impl TaskEnvelope {
    pub fn new(task: TaskMessage) -> Self {
        Self {
            id: Uuid::new_v4(),
            enqueued_at: Utc::now().naive_utc(),
            attempts: 0,
            task,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_is_flat_json() {
        let envelope = TaskEnvelope::new(TaskMessage::ExportContacts {
            requested_by: 1,
            owner_id: None,
        });
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["type"], "export_contacts");
        assert_eq!(value["requested_by"], 1);
        assert_eq!(value["attempts"], 0);

        let parsed: TaskEnvelope = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, envelope);
    }

    #[test]
    fn unit_task_parses_from_type_only() {
        let raw = format!(
            r#"{{"id":"{}","enqueued_at":"2030-01-01T00:00:00","type":"activity_reminders"}}"#,
            Uuid::new_v4()
        );
        let parsed: TaskEnvelope = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.task, TaskMessage::ActivityReminders);
        assert_eq!(parsed.task.kind(), "activity_reminders");
    }
}
