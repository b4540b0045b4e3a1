//! Background worker pulling CRM tasks off the ZeroMQ queue.

use std::path::PathBuf;
use std::time::Duration;

use dotenvy::dotenv;
use env_logger::Env;

use crm_backend::db::establish_connection_pool;
use crm_backend::models::config::ServerConfig;
use crm_backend::models::zmq::{TaskEnvelope, TaskMessage};
use crm_backend::repository::DieselRepository;
use crm_backend::tasks::{RetryPolicy, process_envelope};

/// How often the worker sweeps for due reminders on its own.
const REMINDER_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

fn main() {
    dotenv().ok(); // Load .env file
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let server_config = match ServerConfig::load() {
        Ok(server_config) => server_config,
        Err(err) => {
            log::error!("Error loading server config: {err}");
            std::process::exit(1);
        }
    };

    let pool = match establish_connection_pool(&server_config.database_url) {
        Ok(pool) => pool,
        Err(e) => {
            log::error!("Failed to establish database connection: {e}");
            std::process::exit(1);
        }
    };
    let repo = DieselRepository::new(pool);
    let export_dir = PathBuf::from(&server_config.export_dir);

    let context = zmq::Context::new();
    let tasks = match context.socket(zmq::PULL) {
        Ok(socket) => socket,
        Err(e) => {
            log::error!("Cannot create zmq socket: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = tasks.bind(&server_config.zmq_tasks_pull) {
        log::error!(
            "Cannot bind zmq socket to {}: {e}",
            server_config.zmq_tasks_pull
        );
        std::process::exit(1);
    }

    let sweep_repo = repo.clone();
    let sweep_dir = export_dir.clone();
    std::thread::spawn(move || {
        loop {
            std::thread::sleep(REMINDER_SWEEP_INTERVAL);
            let envelope = TaskEnvelope::new(TaskMessage::ActivityReminders);
            process_envelope(envelope, &sweep_repo, &sweep_dir, RetryPolicy::default());
        }
    });

    log::info!(
        "Starting task worker on {}",
        server_config.zmq_tasks_pull
    );

    loop {
        let msg = match tasks.recv_bytes(0) {
            Ok(msg) => msg,
            Err(e) => {
                log::error!("Error receiving task message: {e}");
                continue;
            }
        };
        match serde_json::from_slice::<TaskEnvelope>(&msg) {
            Ok(envelope) => {
                process_envelope(envelope, &repo, &export_dir, RetryPolicy::default());
            }
            Err(e) => log::error!("Error parsing task message: {e}"),
        }
    }
}
