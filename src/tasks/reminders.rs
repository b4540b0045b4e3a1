use chrono::NaiveDateTime;

use crate::repository::{ActivityReader, ActivityWriter};
use crate::tasks::TaskError;

/// Marks every due reminder as sent. Delivery is a log line.
///
/// A failure on one activity is logged and does not stop the sweep.
pub fn send_activity_reminders<R>(repo: &R, now: NaiveDateTime) -> Result<usize, TaskError>
where
    R: ActivityReader + ActivityWriter + ?Sized,
{
    let due = repo.list_pending_reminders(now)?;
    let mut sent = 0;
    for activity in due {
        log::info!(
            "Reminder for user {}: {} `{}` scheduled at {}",
            activity.owner_id,
            activity.activity_type.label(),
            activity.title,
            activity.scheduled_at
        );
        match repo.mark_reminder_sent(activity.id, now) {
            Ok(()) => sent += 1,
            Err(e) => log::error!("Cannot mark reminder for activity {}: {e}", activity.id),
        }
    }
    Ok(sent)
}

#[cfg(all(test, feature = "test-mocks"))]
mod tests {
    use super::*;
    use chrono::Duration;

    use crate::domain::types::ActivityId;
    use crate::fixtures;
    use crate::repository::errors::RepositoryError;
    use crate::repository::mock::MockRepository;

    #[test]
    fn due_reminders_are_marked() {
        let now = fixtures::now();
        let mut repo = MockRepository::new();
        repo.expect_list_pending_reminders().times(1).returning(move |_| {
            Ok(vec![
                fixtures::activity(1, 1, now + Duration::minutes(5)),
                fixtures::activity(2, 1, now + Duration::minutes(10)),
            ])
        });
        repo.expect_mark_reminder_sent()
            .withf(move |id, at| *id == ActivityId::new(1).unwrap() && *at == now)
            .times(1)
            .returning(|_, _| Ok(()));
        repo.expect_mark_reminder_sent()
            .withf(|id, _| *id == ActivityId::new(2).unwrap())
            .times(1)
            .returning(|_, _| Err(RepositoryError::NotFound));

        assert_eq!(send_activity_reminders(&repo, now).unwrap(), 1);
    }
}
