use serde::Serialize;
use uuid::Uuid;

use crate::models::zmq::TaskEnvelope;

/// `202 Accepted` body for queued tasks.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TaskAccepted {
    pub task_id: Uuid,
    pub task_type: &'static str,
    pub status: &'static str,
}

impl From<&TaskEnvelope> for TaskAccepted {
    fn from(envelope: &TaskEnvelope) -> Self {
        Self {
            task_id: envelope.id,
            task_type: envelope.task.kind(),
            status: "queued",
        }
    }
}
