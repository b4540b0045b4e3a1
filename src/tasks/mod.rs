//! Background work: the web application PUSHes [`TaskEnvelope`]s over ZeroMQ
//! and the `crm-worker` binary PULLs and executes them.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{NaiveDateTime, Utc};
use thiserror::Error;

use crate::domain::types::UserId;
use crate::models::zmq::{TaskEnvelope, TaskMessage};
use crate::repository::errors::RepositoryError;
use crate::repository::{ActivityReader, ActivityWriter, ContactReader, DealReader, StatsReader};

pub mod export;
pub mod reminders;
pub mod report;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Task queue error: {0}")]
    Queue(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid task payload: {0}")]
    InvalidPayload(String),
}

impl From<zmq::Error> for TaskError {
    fn from(err: zmq::Error) -> Self {
        TaskError::Queue(err.to_string())
    }
}

/// Producer side of the task queue.
#[cfg_attr(feature = "test-mocks", mockall::automock)]
pub trait TaskQueue: Send + Sync {
    fn enqueue(&self, envelope: &TaskEnvelope) -> Result<(), TaskError>;
    fn is_healthy(&self) -> bool;
}

/// PUSH socket connected to the worker's PULL endpoint.
///
/// Messages are only queued on completed connections, so a send fails while
/// no worker is attached. Health reflects the outcome of the last send.
pub struct ZmqTaskSender {
    socket: Mutex<zmq::Socket>,
    endpoint: String,
    last_send_ok: AtomicBool,
}

impl ZmqTaskSender {
    pub fn connect(context: &zmq::Context, endpoint: &str) -> Result<Self, TaskError> {
        let socket = context.socket(zmq::PUSH)?;
        socket.set_linger(0)?;
        socket.set_sndhwm(1000)?;
        socket.set_immediate(true)?;
        socket.connect(endpoint)?;
        log::info!("Task queue connected to {endpoint}");
        Ok(Self {
            socket: Mutex::new(socket),
            endpoint: endpoint.to_string(),
            last_send_ok: AtomicBool::new(true),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl TaskQueue for ZmqTaskSender {
    fn enqueue(&self, envelope: &TaskEnvelope) -> Result<(), TaskError> {
        let payload = serde_json::to_vec(envelope)?;
        let socket = self
            .socket
            .lock()
            .map_err(|_| TaskError::Queue("task socket lock poisoned".into()))?;
        let sent = socket.send(payload, zmq::DONTWAIT);
        self.last_send_ok.store(sent.is_ok(), Ordering::Relaxed);
        if let Err(e) = sent {
            log::warn!(
                "Cannot hand task {} to a worker on {}: {e}",
                envelope.id,
                self.endpoint
            );
            return Err(e.into());
        }
        log::info!(
            "Enqueued task {} ({}) on {}",
            envelope.id,
            envelope.task.kind(),
            self.endpoint
        );
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        self.last_send_ok.load(Ordering::Relaxed) && !self.socket.is_poisoned()
    }
}

/// What a task produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    ContactsExported { path: PathBuf, rows: usize },
    ReportWritten { path: PathBuf },
    RemindersSent { count: usize },
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled for each further attempt.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

fn user_id(field: &str, value: i32) -> Result<UserId, TaskError> {
    UserId::new(value).map_err(|e| TaskError::InvalidPayload(format!("{field}: {e}")))
}

/// Executes a single task once.
pub fn run_task<R>(
    task: &TaskMessage,
    repo: &R,
    export_dir: &Path,
    now: NaiveDateTime,
) -> Result<TaskOutcome, TaskError>
where
    R: ContactReader + DealReader + StatsReader + ActivityReader + ActivityWriter,
{
    match task {
        TaskMessage::ExportContacts {
            requested_by,
            owner_id,
        } => {
            let requested_by = user_id("requested_by", *requested_by)?;
            let owner_id = owner_id.map(|id| user_id("owner_id", id)).transpose()?;
            let export = export::export_contacts(repo, requested_by, owner_id, export_dir, now)?;
            Ok(TaskOutcome::ContactsExported {
                path: export.path,
                rows: export.rows,
            })
        }
        TaskMessage::PipelineReport { requested_by } => {
            let requested_by = user_id("requested_by", *requested_by)?;
            let path = report::write_pipeline_report(repo, requested_by, export_dir, now)?;
            Ok(TaskOutcome::ReportWritten { path })
        }
        TaskMessage::ActivityReminders => {
            let count = reminders::send_activity_reminders(repo, now)?;
            Ok(TaskOutcome::RemindersSent { count })
        }
    }
}

/// Runs the task, retrying failures until the policy gives up.
///
/// Payload errors are not retried. Returns `None` when the task was dropped.
pub fn process_envelope<R>(
    mut envelope: TaskEnvelope,
    repo: &R,
    export_dir: &Path,
    policy: RetryPolicy,
) -> Option<TaskOutcome>
where
    R: ContactReader + DealReader + StatsReader + ActivityReader + ActivityWriter,
{
    log::info!("Starting task {} ({})", envelope.id, envelope.task.kind());
    loop {
        envelope.attempts += 1;
        match run_task(&envelope.task, repo, export_dir, Utc::now().naive_utc()) {
            Ok(outcome) => {
                log::info!(
                    "Task {} finished after {} attempt(s): {outcome:?}",
                    envelope.id,
                    envelope.attempts
                );
                return Some(outcome);
            }
            Err(e @ TaskError::InvalidPayload(_)) => {
                log::error!("Dropping task {}: {e}", envelope.id);
                return None;
            }
            Err(e) if envelope.attempts >= policy.max_attempts => {
                log::error!(
                    "Task {} failed after {} attempts, dropping it: {e}",
                    envelope.id,
                    envelope.attempts
                );
                return None;
            }
            Err(e) => {
                let delay = policy.delay_for(envelope.attempts);
                log::warn!(
                    "Task {} attempt {} failed: {e}; retrying in {delay:?}",
                    envelope.id,
                    envelope.attempts
                );
                std::thread::sleep(delay);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_delivers_to_an_attached_worker() {
        let context = zmq::Context::new();
        let worker = context.socket(zmq::PULL).unwrap();
        worker.bind("inproc://tasks-attached").unwrap();
        let sender = ZmqTaskSender::connect(&context, "inproc://tasks-attached").unwrap();

        let envelope = TaskEnvelope::new(TaskMessage::ActivityReminders);
        sender.enqueue(&envelope).unwrap();
        assert!(sender.is_healthy());

        let received: TaskEnvelope =
            serde_json::from_slice(&worker.recv_bytes(0).unwrap()).unwrap();
        assert_eq!(received.id, envelope.id);
    }

    #[test]
    fn sender_turns_unhealthy_without_a_worker() {
        let context = zmq::Context::new();
        let sender = ZmqTaskSender::connect(&context, "tcp://127.0.0.1:1").unwrap();
        assert!(sender.is_healthy());

        let envelope = TaskEnvelope::new(TaskMessage::ActivityReminders);
        assert!(matches!(sender.enqueue(&envelope), Err(TaskError::Queue(_))));
        assert!(!sender.is_healthy());
    }

    #[test]
    fn retry_delay_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(4));
    }
}

#[cfg(all(test, feature = "test-mocks"))]
mod mock_tests {
    use super::*;
    use crate::repository::mock::MockRepository;

    fn no_wait() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::ZERO,
        }
    }

    #[test]
    fn failing_task_is_retried_three_times() {
        let mut repo = MockRepository::new();
        repo.expect_list_pending_reminders()
            .times(3)
            .returning(|_| Err(RepositoryError::ConnectionError("down".into())));

        let envelope = TaskEnvelope::new(TaskMessage::ActivityReminders);
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(process_envelope(envelope, &repo, dir.path(), no_wait()), None);
    }

    #[test]
    fn recovered_task_reports_outcome() {
        let mut repo = MockRepository::new();
        let mut calls = 0;
        repo.expect_list_pending_reminders()
            .times(2)
            .returning(move |_| {
                calls += 1;
                if calls == 1 {
                    Err(RepositoryError::ConnectionError("blip".into()))
                } else {
                    Ok(vec![])
                }
            });

        let envelope = TaskEnvelope::new(TaskMessage::ActivityReminders);
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            process_envelope(envelope, &repo, dir.path(), no_wait()),
            Some(TaskOutcome::RemindersSent { count: 0 })
        );
    }

    #[test]
    fn invalid_payload_is_not_retried() {
        let repo = MockRepository::new();
        let envelope = TaskEnvelope::new(TaskMessage::PipelineReport { requested_by: 0 });
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(process_envelope(envelope, &repo, dir.path(), no_wait()), None);
    }
}
