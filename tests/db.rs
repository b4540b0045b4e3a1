use crm_backend::db::{
    PoolStatus, backup_database, check_database, establish_connection_pool, list_backups,
    restore_database,
};
use crm_backend::domain::types::{EmailAddress, PersonName};
use crm_backend::domain::user::{NewUser, UserRole};
use crm_backend::repository::{DieselRepository, UserReader, UserWriter};

mod common;

fn seed_user(repo: &DieselRepository, email: &str) {
    repo.create_user(&NewUser::new(
        EmailAddress::new(email).unwrap(),
        "hash".into(),
        PersonName::new("Ada").unwrap(),
        PersonName::new("Lovelace").unwrap(),
        UserRole::Sales,
    ))
    .unwrap();
}

#[test]
fn test_creates_and_removes_db_files() {
    let test_db = common::TestDb::new("test_connection.db");
    let conn = test_db.pool().get();
    assert!(conn.is_ok());
    assert!(test_db.path().exists());
}

#[test]
fn test_check_database_reports_latency() {
    let test_db = common::TestDb::new("test_check_database.db");
    let check = check_database(&test_db.pool()).unwrap();
    assert!(check.latency_ms >= 0.0);
}

#[test]
fn test_pool_status_counts_connections() {
    let test_db = common::TestDb::new("test_pool_status.db");
    let pool = test_db.pool();
    let _held = pool.get().unwrap();
    let status = PoolStatus::from_pool(&pool);
    assert!(status.connections >= 1);
    assert!(status.in_use >= 1);
    assert_eq!(status.in_use + status.idle, status.connections);
}

#[test]
fn test_backup_and_restore_round_trip() {
    let test_db = common::TestDb::new("test_backup.db");
    let repo = DieselRepository::new(test_db.pool());
    seed_user(&repo, "before@example.com");

    let backup_dir = test_db.dir().join("backups");
    let backup = backup_database(&test_db.pool(), &backup_dir).unwrap();
    assert!(backup.is_file());
    assert_eq!(list_backups(&backup_dir).unwrap(), vec![backup.clone()]);

    let restored = test_db.dir().join("restored.db");
    restore_database(&backup, &restored).unwrap();

    let restored_pool = establish_connection_pool(restored.to_str().unwrap()).unwrap();
    let restored_repo = DieselRepository::new(restored_pool);
    let email = EmailAddress::new("before@example.com").unwrap();
    assert!(restored_repo.get_user_by_email(&email).unwrap().is_some());
}

#[test]
fn test_restore_missing_backup_fails() {
    let test_db = common::TestDb::new("test_restore_missing.db");
    let missing = test_db.dir().join("nope.sqlite3");
    assert!(restore_database(&missing, test_db.path()).is_err());
}

#[test]
fn test_list_backups_of_missing_dir_is_empty() {
    let test_db = common::TestDb::new("test_list_backups.db");
    assert!(list_backups(&test_db.dir().join("absent")).unwrap().is_empty());
}

#[test]
fn test_restore_discards_stale_wal_files() {
    let test_db = common::TestDb::new("test_restore_wal.db");
    let repo = DieselRepository::new(test_db.pool());
    seed_user(&repo, "kept@example.com");
    let backup = backup_database(&test_db.pool(), &test_db.dir().join("backups")).unwrap();

    let restored = test_db.dir().join("restored_wal.db");
    let wal = test_db.dir().join("restored_wal.db-wal");
    let shm = test_db.dir().join("restored_wal.db-shm");
    std::fs::write(&wal, b"stale write-ahead log").unwrap();
    std::fs::write(&shm, b"stale shared memory").unwrap();

    restore_database(&backup, &restored).unwrap();
    assert!(!wal.exists());
    assert!(!shm.exists());

    let restored_repo =
        DieselRepository::new(establish_connection_pool(restored.to_str().unwrap()).unwrap());
    let email = EmailAddress::new("kept@example.com").unwrap();
    assert!(restored_repo.get_user_by_email(&email).unwrap().is_some());
}

#[test]
fn test_restore_fails_when_wal_cannot_be_removed() {
    let test_db = common::TestDb::new("test_restore_wal_locked.db");
    let backup = backup_database(&test_db.pool(), &test_db.dir().join("backups")).unwrap();

    let restored = test_db.dir().join("blocked.db");
    std::fs::create_dir(test_db.dir().join("blocked.db-wal")).unwrap();

    assert!(restore_database(&backup, &restored).is_err());
    assert!(!restored.exists());
}
