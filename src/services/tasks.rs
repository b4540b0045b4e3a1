//! Enqueues background work for the worker process.

use crate::auth::AuthenticatedUser;
use crate::dto::tasks::TaskAccepted;
use crate::forms::tasks::ExportContactsForm;
use crate::models::zmq::{TaskEnvelope, TaskMessage};
use crate::services::{ServiceResult, ensure_can_view_all};
use crate::tasks::TaskQueue;

fn enqueue(
    queue: &dyn TaskQueue,
    user: &AuthenticatedUser,
    task: TaskMessage,
) -> ServiceResult<TaskAccepted> {
    ensure_can_view_all(user)?;
    let envelope = TaskEnvelope::new(task);
    queue.enqueue(&envelope)?;
    log::info!(
        "User {} queued task {} ({})",
        user.id,
        envelope.id,
        envelope.task.kind()
    );
    Ok(TaskAccepted::from(&envelope))
}

pub fn enqueue_export_contacts(
    queue: &dyn TaskQueue,
    user: &AuthenticatedUser,
    form: ExportContactsForm,
) -> ServiceResult<TaskAccepted> {
    let owner_id = form.owner()?;
    enqueue(
        queue,
        user,
        TaskMessage::ExportContacts {
            requested_by: user.id.get(),
            owner_id: owner_id.map(|id| id.get()),
        },
    )
}

pub fn enqueue_pipeline_report(
    queue: &dyn TaskQueue,
    user: &AuthenticatedUser,
) -> ServiceResult<TaskAccepted> {
    enqueue(
        queue,
        user,
        TaskMessage::PipelineReport {
            requested_by: user.id.get(),
        },
    )
}

pub fn enqueue_activity_reminders(
    queue: &dyn TaskQueue,
    user: &AuthenticatedUser,
) -> ServiceResult<TaskAccepted> {
    enqueue(queue, user, TaskMessage::ActivityReminders)
}

#[cfg(all(test, feature = "test-mocks"))]
mod tests {
    use super::*;
    use crate::domain::user::UserRole;
    use crate::services::{ServiceError, principal};
    use crate::tasks::{MockTaskQueue, TaskError};

    #[test]
    fn sales_cannot_queue_tasks() {
        let queue = MockTaskQueue::new();
        let result = enqueue_pipeline_report(&queue, &principal(3, UserRole::Sales));
        assert!(matches!(result, Err(ServiceError::Forbidden(_))));
    }

    #[test]
    fn export_carries_requester_and_owner() {
        let mut queue = MockTaskQueue::new();
        queue
            .expect_enqueue()
            .withf(|envelope| {
                envelope.task
                    == TaskMessage::ExportContacts {
                        requested_by: 2,
                        owner_id: Some(7),
                    }
            })
            .times(1)
            .returning(|_| Ok(()));

        let accepted = enqueue_export_contacts(
            &queue,
            &principal(2, UserRole::Manager),
            ExportContactsForm { owner_id: Some(7) },
        )
        .unwrap();
        assert_eq!(accepted.task_type, "export_contacts");
        assert_eq!(accepted.status, "queued");
    }

    #[test]
    fn broker_failure_is_internal_error() {
        let mut queue = MockTaskQueue::new();
        queue
            .expect_enqueue()
            .returning(|_| Err(TaskError::Queue("would block".into())));
        let result = enqueue_activity_reminders(&queue, &principal(1, UserRole::Admin));
        assert!(matches!(result, Err(ServiceError::Internal(_))));
    }
}
