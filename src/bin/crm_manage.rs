//! `crm-manage`: database backups and account bootstrapping.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use env_logger::Env;

use crm_backend::db::{backup_database, establish_connection_pool, list_backups, restore_database};
use crm_backend::models::config::ServerConfig;
use crm_backend::repository::DieselRepository;
use crm_backend::services::users::create_admin;

/// CRM maintenance commands.
#[derive(Parser, Debug)]
#[command(name = "crm-manage", about = "CRM maintenance commands")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a backup of the database into the backup directory.
    Backup {
        /// Directory to write to (defaults to `backup_dir` from the config).
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Replace the database with a backup file. Stop the server first.
    Restore {
        /// Backup file to restore.
        file: PathBuf,
    },
    /// List backups, newest first.
    ListBackups {
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Create an administrator account.
    CreateAdmin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "Admin")]
        first_name: String,
        #[arg(long, default_value = "User")]
        last_name: String,
    },
}

fn exit_with(message: impl std::fmt::Display) -> ! {
    log::error!("{message}");
    std::process::exit(1);
}

fn main() {
    dotenv().ok(); // Load .env file
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let cli = Cli::parse();

    let server_config = match ServerConfig::load() {
        Ok(server_config) => server_config,
        Err(err) => exit_with(format!("Error loading server config: {err}")),
    };
    let backup_dir = |dir: Option<PathBuf>| dir.unwrap_or_else(|| PathBuf::from(&server_config.backup_dir));

    match cli.command {
        Commands::Backup { dir } => {
            let pool = establish_connection_pool(&server_config.database_url)
                .unwrap_or_else(|e| exit_with(format!("Failed to establish database connection: {e}")));
            match backup_database(&pool, &backup_dir(dir)) {
                Ok(path) => println!("{}", path.display()),
                Err(e) => exit_with(format!("Backup failed: {e}")),
            }
        }
        Commands::Restore { file } => {
            if let Err(e) = restore_database(&file, Path::new(&server_config.database_url)) {
                exit_with(format!("Restore failed: {e}"));
            }
            println!("Restored {}", file.display());
        }
        Commands::ListBackups { dir } => match list_backups(&backup_dir(dir)) {
            Ok(backups) => {
                for backup in backups {
                    println!("{}", backup.display());
                }
            }
            Err(e) => exit_with(format!("Cannot list backups: {e}")),
        },
        Commands::CreateAdmin {
            email,
            password,
            first_name,
            last_name,
        } => {
            let pool = establish_connection_pool(&server_config.database_url)
                .unwrap_or_else(|e| exit_with(format!("Failed to establish database connection: {e}")));
            let repo = DieselRepository::new(pool);
            match create_admin(&repo, &email, &password, &first_name, &last_name) {
                Ok(user) => println!("Created admin {} ({})", user.email, user.id),
                Err(e) => exit_with(format!("Cannot create admin: {e}")),
            }
        }
    }
}
